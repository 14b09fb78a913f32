//! sprocket-mcp: roller chain drive geometry and sprocket sizing
//!
//! This library relates center distance, chain length and sprocket tooth
//! counts for two-sprocket roller chain drives, and searches for tooth counts
//! that suit a center distance which can no longer be changed.
//!
//! # Architecture
//!
//! - **Calculations** ([`drive`]): pure functions, no I/O, no logging
//! - **Tools** ([`mcp`]): the calculations exposed to AI assistants over MCP
//! - **CLI** (`main.rs`): the same calculations as one-shot subcommands
//!
//! # Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`drive`] - Chain drive geometry, rounding and sprocket solvers
//! - [`error`] - Configuration error types
//! - [`mcp`] - MCP protocol implementation

pub mod config;
pub mod drive;
pub mod error;
pub mod mcp;
