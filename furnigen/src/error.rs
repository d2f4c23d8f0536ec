//! Error taxonomy for the furniture-layout pipeline.
//!
//! Follows `calx::prefab::PrefabError`'s style for fallible parsing: a plain
//! enum with a hand-written `Display`/`Error` impl, no derive-macro error
//! crate in the dependency list.

use std::error::Error;
use std::fmt;

/// Which pipeline stage raised an error, per `spec.md` §7's "failures carry
/// the originating component tag" requirement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Component {
    Grid,
    Segmenter,
    Compiler,
    Optimizer,
    Coords,
    Scene,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Grid => "grid",
            Component::Segmenter => "segmenter",
            Component::Compiler => "compiler",
            Component::Optimizer => "optimizer",
            Component::Coords => "coords",
            Component::Scene => "scene",
        };
        write!(f, "{}", name)
    }
}

/// Error taxonomy from `spec.md` §7. `ConstraintReferencesMissingItem` and
/// `ClampImpossible` are intentionally absent: the spec requires those to be
/// handled in place (dropped-and-logged, and centered-instead-of-clamped,
/// respectively) rather than surfaced as failures.
#[derive(Debug)]
pub enum FurnigenError {
    /// Image unreadable, zero-sized, or has no saturated pixels.
    InputInvalid { component: Component, message: String },
    /// Segmenter produced zero room regions after noise filtering.
    NoRoomsDetected,
    /// The MIP's feasibility stage found no solution.
    InfeasibleLayout { tried_categories: Vec<String> },
    /// The MIP solver's time limit elapsed with no incumbent.
    SolverTimeout,
    /// A grid invariant from `spec.md` §3 was violated.
    GridInvariant(String),
}

impl fmt::Display for FurnigenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FurnigenError::InputInvalid { component, message } => {
                write!(f, "{}: invalid input: {}", component, message)
            }
            FurnigenError::NoRoomsDetected => {
                write!(f, "segmenter: no room regions detected after noise filtering")
            }
            FurnigenError::InfeasibleLayout { tried_categories } => write!(
                f,
                "optimizer: feasibility stage found no layout (active constraint \
                 categories: {})",
                tried_categories.join(", ")
            ),
            FurnigenError::SolverTimeout => {
                write!(f, "optimizer: time limit elapsed with no incumbent solution")
            }
            FurnigenError::GridInvariant(msg) => write!(f, "grid: invariant violated: {}", msg),
        }
    }
}

impl Error for FurnigenError {}

pub type Result<T> = std::result::Result<T, FurnigenError>;
