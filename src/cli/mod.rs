//! CLI module for trapwise - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
