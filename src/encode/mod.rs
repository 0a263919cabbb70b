//! Export targets for rendered frames.

pub mod sink;
