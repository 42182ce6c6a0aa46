//! reportdb CLI - Command-line interface for reportdb schemas.
//!
//! This crate provides the `reportdb` tool: schema validation, canonical
//! formatting and client code generation.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
