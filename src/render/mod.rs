//! Artifact rendering: HTCondor submit descriptions, wrapper scripts and
//! DAGMan manifests. Each writer replaces any previous file at its path.

pub mod dag;
pub mod descriptor;
pub mod wrapper;

pub use dag::compose;
pub use descriptor::build_descriptor;
pub use wrapper::build_wrapper;
