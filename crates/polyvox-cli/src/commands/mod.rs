//! CLI command implementations.

pub mod common;
pub mod info;
pub mod patches;
pub mod render;
pub mod tone;
