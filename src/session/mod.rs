//! One document lifetime: load, full passes, single-script updates, writes.
//!
//! A [`Session`] is created from the project file and dropped on restart.
//! It is owned by exactly one task at a time, so nothing in here locks.

mod artifact;
mod error;
mod state;
mod strategy;

pub use artifact::Artifact;
pub use error::InjectError;
pub use state::SessionState;
pub use strategy::RebuildRequirement;

use strategy::{ScriptUpdate, apply_script_file};

use std::fs;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::config::InjectConfig;
use crate::document::{Document, GLOBALS_ID, ScriptRole};
use crate::utils::path::{file_stem, has_extension};
use crate::{debug, log};

const DEBUG_SUFFIX: &str = "_DEBUG";

pub struct Session {
    project: PathBuf,
    scripts_dir: PathBuf,
    extension: String,
    pub document: Document,
    pub state: SessionState,
    artifact: Artifact,
}

impl Session {
    /// Decode and parse the project, then run the initial full pass and
    /// write the artifact.
    pub fn load(project: &Path, config: &InjectConfig) -> Result<Self, InjectError> {
        let artifact = Artifact::for_project(project, &config.output.suffix)?;

        let xml = codec::decode(project)?;
        let document = codec::parse(&xml)?;
        debug!(
            "load";
            "parsed {} nodes from {}",
            document.root.walk().len(),
            project.display()
        );

        if config.output.debug {
            write_debug_dumps(project, &document)?;
        }

        let mut session = Self {
            project: project.to_path_buf(),
            scripts_dir: config.scripts_dir(project),
            extension: config.extension().to_string(),
            document,
            state: SessionState::default(),
            artifact,
        };

        session.apply_all()?;
        session.write()?;
        session.report();
        Ok(session)
    }

    pub fn project(&self) -> &Path {
        &self.project
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// True if `path` is a script this session cares about.
    pub fn is_script(&self, path: &Path) -> bool {
        has_extension(path, &self.extension)
    }

    /// Re-apply every script with quick patch disabled.
    ///
    /// Re-reads `_globals` first so every script sees the current prelude.
    /// Returns true if any script changed the document.
    pub fn apply_all(&mut self) -> Result<bool, InjectError> {
        let scripts = self.list_scripts()?;

        let globals_path = self.script_path(GLOBALS_ID);
        // An empty `_globals` prepends nothing
        self.state.globals = if globals_path.is_file() {
            Some(read_script(&globals_path)?).filter(|text| !text.is_empty())
        } else {
            None
        };

        self.state.log.begin_pass();
        let mut changed = false;
        for path in scripts {
            let Some(id) = file_stem(&path) else {
                continue;
            };
            if id == GLOBALS_ID {
                continue;
            }
            let text = match read_script(&path) {
                Ok(text) => text,
                Err(e) => {
                    log!("error"; "{}", e);
                    continue;
                }
            };
            let update = ScriptUpdate {
                id: &id,
                text: &text,
                deleted: false,
                allow_quick_patch: false,
            };
            let requirement =
                apply_script_file(&mut self.document, &mut self.state, &self.artifact, update);
            changed |= requirement.needs_write();
        }
        self.state.log.finish_pass();

        Ok(changed)
    }

    /// Apply one script file after it changed on disk.
    ///
    /// A missing file is a deletion. `_globals` triggers a full pass.
    pub fn apply_script_path(&mut self, path: &Path) -> Result<RebuildRequirement, InjectError> {
        let id = file_stem(path).ok_or_else(|| InjectError::MissingStem(path.to_path_buf()))?;

        if ScriptRole::of(&id) == ScriptRole::Globals {
            log!("inject"; "globals changed, reapplying all scripts");
            let changed = self.apply_all()?;
            return Ok(if changed {
                RebuildRequirement::FullRebuildNeeded
            } else {
                RebuildRequirement::None
            });
        }

        let deleted = !path.exists();
        let text = if deleted {
            String::new()
        } else {
            read_script(path)?
        };

        let update = ScriptUpdate {
            id: &id,
            text: &text,
            deleted,
            allow_quick_patch: true,
        };
        Ok(apply_script_file(
            &mut self.document,
            &mut self.state,
            &self.artifact,
            update,
        ))
    }

    /// Serialize the whole document to the artifact.
    pub fn write(&self) -> Result<(), InjectError> {
        let xml = codec::serialize(&self.document)?;
        self.artifact.write(&xml)?;
        debug!("write"; "{} ({} bytes)", self.artifact.path().display(), xml.len());
        Ok(())
    }

    /// Print the results table for the working injection log.
    pub fn report(&self) {
        crate::logger::print_results(&self.state.log.entries());
    }

    fn script_path(&self, id: &str) -> PathBuf {
        self.scripts_dir.join(format!("{id}.{}", self.extension))
    }

    /// Script files in the scripts directory, sorted by path.
    fn list_scripts(&self) -> Result<Vec<PathBuf>, InjectError> {
        let entries = fs::read_dir(&self.scripts_dir)
            .map_err(|e| InjectError::ScanScripts(self.scripts_dir.clone(), e))?;

        let mut scripts: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.is_script(path))
            .collect();
        scripts.sort();
        Ok(scripts)
    }
}

fn read_script(path: &Path) -> Result<String, InjectError> {
    fs::read_to_string(path).map_err(|e| InjectError::ReadScript(path.to_path_buf(), e))
}

/// `<stem>_DEBUG.json` and `<stem>_DEBUG.tosc` of the un-injected document.
fn write_debug_dumps(project: &Path, document: &Document) -> Result<(), InjectError> {
    let json_path = artifact::sibling(project, DEBUG_SUFFIX, "json")?;
    let json = serde_json::to_string_pretty(document)?;
    fs::write(&json_path, json).map_err(|e| InjectError::Write(json_path.clone(), e))?;

    let tosc_path = artifact::sibling(project, DEBUG_SUFFIX, "tosc")?;
    let xml = codec::serialize(document)?;
    fs::write(&tosc_path, xml).map_err(|e| InjectError::Write(tosc_path.clone(), e))?;

    debug!("debug"; "wrote {} and {}", json_path.display(), tosc_path.display());
    Ok(())
}

#[cfg(test)]
mod tests;
