//! Injector configuration from `tosc-inject.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[scripts]` | Scripts directory and script file extension    |
//! | `[watch]`   | Debounce window and load retry delay           |
//! | `[output]`  | Artifact suffix and debug dumps                |
//!
//! # Example
//!
//! ```toml
//! [scripts]
//! dir = "scripts"       # relative to the project file
//! extension = "lua"
//!
//! [watch]
//! debounce_ms = 200
//! retry_delay_ms = 2500
//!
//! [output]
//! suffix = "_INJECTED"
//! debug = false
//! ```
//!
//! The file is optional. CLI flags override file values.

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::log;

/// Root configuration structure representing tosc-inject.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectConfig {
    /// Absolute path to the config file, if one was loaded (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Scripts directory override from the CLI (internal use only)
    #[serde(skip)]
    pub scripts_override: Option<PathBuf>,

    /// Single pass, no watching (internal use only)
    #[serde(skip)]
    pub once: bool,

    pub scripts: ScriptsConfig,
    pub watch: WatchConfig,
    pub output: OutputConfig,
}

/// `[scripts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Directory holding the scripts, relative to the project file.
    pub dir: PathBuf,
    /// Script file extension, without the dot.
    pub extension: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scripts"),
            extension: "lua".to_string(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiescence window per script file. Collapses editor + formatter saves.
    pub debounce_ms: u64,
    /// Delay before retrying after a failed project load.
    pub retry_delay_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            retry_delay_ms: 2500,
        }
    }
}

impl WatchConfig {
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the project file stem to name the artifact.
    pub suffix: String,
    /// Write `<stem>_DEBUG.json` and `<stem>_DEBUG.tosc` on every load.
    pub debug: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_INJECTED".to_string(),
            debug: false,
        }
    }
}

impl InjectConfig {
    /// Load configuration and apply CLI overrides.
    ///
    /// A missing config file is not an error: defaults apply.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match Self::locate(cli) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = Some(crate::utils::path::normalize_path(&path));
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self::default()
            }
        };

        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// `--config` as given, else the same relative path next to the project.
    fn locate(cli: &Cli) -> Option<PathBuf> {
        if cli.config.exists() {
            return Some(cli.config.clone());
        }
        if cli.config.is_relative()
            && let Some(dir) = cli.project.as_deref().and_then(Path::parent)
        {
            let candidate = dir.join(&cli.config);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    fn apply_cli(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose || cli.debug);

        if cli.debug {
            self.output.debug = true;
        }
        if let Some(ms) = cli.debounce_ms {
            self.watch.debounce_ms = ms;
        }
        self.scripts_override = cli.scripts.clone();
        self.once = cli.once;
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scripts.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Validation(
                "[scripts] extension must not be empty".to_string(),
            ));
        }
        if self.output.suffix.is_empty() {
            return Err(ConfigError::Validation(
                "[output] suffix must not be empty, the project file would be overwritten"
                    .to_string(),
            ));
        }
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "[watch] debounce_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Script extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.scripts.extension.trim_start_matches('.')
    }

    /// Scripts directory for a given project file.
    pub fn scripts_dir(&self, project: &Path) -> PathBuf {
        if let Some(dir) = &self.scripts_override {
            return crate::utils::path::normalize_path(dir);
        }
        let base = project.parent().unwrap_or_else(|| Path::new("."));
        base.join(&self.scripts.dir)
    }
}

#[cfg(test)]
pub(crate) fn test_parse_config(content: &str) -> InjectConfig {
    InjectConfig::from_str(content).unwrap()
}
