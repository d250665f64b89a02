//! Command-line interface module
//!
//! This module handles CLI argument parsing using Clap.

pub mod args;
pub mod interactive;

pub use args::{Cli, Commands, ConvertArgs, ExportArgs, HistoryArgs, ListArgs, OutputArgs};
