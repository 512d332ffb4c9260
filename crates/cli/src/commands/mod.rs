//! CLI command implementations

pub mod controls;
pub mod events;
pub mod fleet;
pub mod predict;
