//! Command-line interface module.

mod args;
pub mod prompt;

pub use args::Cli;
