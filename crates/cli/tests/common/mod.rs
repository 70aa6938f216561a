//! Common utilities for CLI integration tests

pub mod cli;

pub use cli::{BuildrCommand, CommandResult, Sandbox};
