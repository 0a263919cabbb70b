//! Editing context tying the scene to its scheduler, cache and history.

#[allow(clippy::module_inception)]
pub mod document;
