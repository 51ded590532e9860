//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Inject Lua scripts into a TouchOSC project and keep them in sync
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project file (.tosc). Prompted for when omitted
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub project: Option<PathBuf>,

    /// Scripts directory (default: `scripts/` next to the project file)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub scripts: Option<PathBuf>,

    /// Write `<stem>_DEBUG.json` and `<stem>_DEBUG.tosc`, implies --verbose
    #[arg(long)]
    pub debug: bool,

    /// Print debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: tosc-inject.toml)
    #[arg(short = 'C', long, default_value = "tosc-inject.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Inject once and exit instead of watching
    #[arg(long)]
    pub once: bool,

    /// Debounce window for script saves, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,
}
