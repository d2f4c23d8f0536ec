//! Tunable parameters for the optimizer, compiler, and coordinate converter.

use serde::{Deserialize, Serialize};

/// Default MIP solver time limit, in seconds (`spec.md` §4.D).
pub const DEFAULT_TIME_LIMIT_S: f64 = 30.0;
/// Default MIP gap tolerance (fraction).
pub const DEFAULT_MIP_GAP: f64 = 0.10;
/// Default branch-and-bound worker thread count.
pub const DEFAULT_THREADS: u32 = 4;
/// Default balance-objective weight.
pub const DEFAULT_W_BAL: f64 = 1.0;
/// Default distance-slack weight.
pub const DEFAULT_W_DIST: f64 = 0.6;
/// Default cell side, metres.
pub const DEFAULT_CELL_SIZE_M: f64 = 0.5;
/// Default inward wall-margin clamp, metres.
pub const DEFAULT_WALL_MARGIN_M: f64 = 0.25;
/// Door clearance scan depth, cells (`D_CLEAR`).
pub const DEFAULT_DOOR_CLEARANCE_CELLS: u32 = 1;

/// Parameters shared by the compiler, optimizer, and coordinate converter.
///
/// Deserializable from TOML so a caller (e.g. `furnigen-cli`) can override
/// defaults from a config file instead of constructing this by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerParams {
    /// Wall-clock time budget for `optimize()`, in seconds.
    pub time_limit_s: f64,
    /// Acceptable relative gap to the LP relaxation bound.
    pub mip_gap: f64,
    /// Worker thread count requested of the solver backend.
    ///
    /// The bundled `microlp` backend is single-threaded by construction (see
    /// `SPEC_FULL.md` Open Question 2); this field is retained so the schema
    /// is stable if a caller swaps in a multi-threaded `good_lp` backend.
    pub threads: u32,
    /// Weight of the per-room balance objective term.
    pub w_bal: f64,
    /// Weight of the summed distance-constraint slack terms.
    pub w_dist: f64,
    /// Grid cell side, in metres.
    pub cell_size_m: f64,
    /// Inward clamp applied to furniture centers near walls, in metres.
    pub wall_margin_m: f64,
    /// Door clearance scan depth, in cells.
    pub door_clearance_cells: u32,
    /// Accepted for schema compatibility with `spec.md` §5's "runs must be
    /// configured to single-threaded mode with a fixed seed to guarantee
    /// determinism": the bundled `microlp` backend is single-threaded and
    /// branches deterministically from a fixed model with no RNG-driven
    /// tie-break, so this field is not currently read by anything. It is
    /// kept so callers that later swap in a backend whose branch-and-bound
    /// does need a seed (e.g. to break ties) don't need an API change.
    pub seed: u64,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        OptimizerParams {
            time_limit_s: DEFAULT_TIME_LIMIT_S,
            mip_gap: DEFAULT_MIP_GAP,
            threads: DEFAULT_THREADS,
            w_bal: DEFAULT_W_BAL,
            w_dist: DEFAULT_W_DIST,
            cell_size_m: DEFAULT_CELL_SIZE_M,
            wall_margin_m: DEFAULT_WALL_MARGIN_M,
            door_clearance_cells: DEFAULT_DOOR_CLEARANCE_CELLS,
            seed: 0,
        }
    }
}

impl OptimizerParams {
    /// A deterministic single-threaded configuration suitable for tests,
    /// per `spec.md` §5's determinism requirement.
    pub fn deterministic(seed: u64) -> Self {
        OptimizerParams { threads: 1, seed, ..OptimizerParams::default() }
    }
}
