//! CLI command implementations.

pub mod apply;
pub mod plugins;
pub mod validate;
