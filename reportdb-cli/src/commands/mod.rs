//! CLI command implementations.

pub mod format;
pub mod generate;
pub mod validate;
pub mod version;
