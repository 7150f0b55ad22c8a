//! Hubroute CLI library.
//!
//! Argument parsing helpers, command handlers, logging setup and output
//! rendering for the `hubroute` binary.

pub mod args;
pub mod commands;
pub mod logging;
pub mod output;
pub mod terminal;
