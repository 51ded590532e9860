//! tosc-inject - keep Lua scripts in sync with a TouchOSC project.

#![allow(dead_code)]

mod cli;
mod codec;
mod config;
mod core;
mod document;
mod inject;
mod logger;
mod pipeline;
mod session;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::InjectConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = InjectConfig::load(&cli)?;
    pipeline::run(&cli, &config)
}
