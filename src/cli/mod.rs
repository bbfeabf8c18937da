//! CLI module for tickwatch - command-line interface and terminal output.

pub mod commands;
pub mod output;

pub use commands::Cli;
