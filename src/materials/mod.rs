//! Material-group discovery and substitution.
//!
//! [`collect`] walks a loaded scene once and records, per node, which
//! meaningful materials it uses together with a baseline snapshot of every
//! mesh binding. [`build_groups`] clusters nodes with identical material sets,
//! and [`substitute`] turns per-group selections into a plan that is then
//! projected onto the scene.

pub mod classify;
pub mod collect;
pub mod groups;
pub mod substitute;

pub use classify::{is_placeholder_name, is_single_marked};
pub use collect::{Baseline, BaselineEntry, CollectedNode, Collection, MaterialLibrary, collect};
pub use groups::{MaterialGroup, build_groups};
pub use substitute::{
    Invalidation, MeshAction, MeshAssignment, Selections, SubstitutionPlan, apply_plan,
    apply_selections, plan,
};
