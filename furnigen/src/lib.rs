//! Floor-plan segmentation and constrained furniture-layout optimizer.
//!
//! Pipeline order (`spec.md` §2): [`segmenter`] builds a [`grid::Grid`],
//! [`furniture`] compiles metric specs/constraints into cell units,
//! [`optimizer`] solves the placement MIP, [`coords`] converts grid
//! placements to 3D, and [`scene`] joins the result with external catalog
//! metadata. [`validate`] re-checks the invariants any stage is expected to
//! uphold.

pub mod config;
pub mod coords;
pub mod error;
pub mod furniture;
pub mod geom;
pub mod grid;
pub mod optimizer;
pub mod placement;
pub mod scene;
pub mod segmenter;
pub mod validate;
