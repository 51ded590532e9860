//! The written `<stem><suffix>.tosc` file and textual patches against it.
//!
//! A quick patch swaps every serialized `script` property holding the old
//! text for one holding the new text, without touching the rest of the file.
//! It only applies when the artifact contains exactly as many occurrences as
//! the in-memory document says it should; anything else means the file was
//! changed behind our back and the caller falls back to a full rebuild.

use std::fs;
use std::path::{Path, PathBuf};

use super::InjectError;
use crate::codec::{embeds_verbatim, script_fragment};
use crate::debug;
use crate::utils::path::file_stem;

const EXTENSION: &str = "tosc";

#[derive(Debug, Clone)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// `<dir>/<stem><suffix>.tosc` next to `project`.
    pub fn for_project(project: &Path, suffix: &str) -> Result<Self, InjectError> {
        let path = sibling(project, suffix, EXTENSION)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, xml: &str) -> Result<(), InjectError> {
        fs::write(&self.path, xml).map_err(|e| InjectError::Write(self.path.clone(), e))
    }

    /// Replace `expected` occurrences of `old` with `new`.
    ///
    /// `None` when the patch does not apply, including read and write
    /// failures: the caller rebuilds instead.
    pub fn quick_patch(&self, old: &str, new: &str, expected: usize) -> Option<usize> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("patch"; "cannot read {}: {}", self.path.display(), e);
                return None;
            }
        };

        let (patched, count) = patch_text(&content, old, new, expected)?;

        if let Err(e) = fs::write(&self.path, patched) {
            debug!("patch"; "cannot write {}: {}", self.path.display(), e);
            return None;
        }
        Some(count)
    }
}

/// `<dir>/<stem><suffix>.<ext>` next to `project`.
pub fn sibling(project: &Path, suffix: &str, ext: &str) -> Result<PathBuf, InjectError> {
    let stem = file_stem(project).ok_or_else(|| InjectError::MissingStem(project.to_path_buf()))?;
    let dir = project.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(format!("{stem}{suffix}.{ext}")))
}

/// Pure part of [`Artifact::quick_patch`].
///
/// Tries the text exactly as the serializer writes it, then the normalized
/// variant for artifacts produced by tools that reindent scripts.
pub fn patch_text(content: &str, old: &str, new: &str, expected: usize) -> Option<(String, usize)> {
    if expected == 0 || old.is_empty() || !embeds_verbatim(old) || !embeds_verbatim(new) {
        return None;
    }

    let replacement = script_fragment(new);
    let normalized = normalize_script(old);
    let candidates = if normalized == old {
        vec![old]
    } else {
        vec![old, normalized.as_str()]
    };

    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        let needle = script_fragment(candidate);
        let found = content.matches(&needle).count();
        if found == 0 {
            continue;
        }
        if found != expected {
            debug!("patch"; "found {} occurrences, expected {}", found, expected);
            return None;
        }
        return Some((content.replace(&needle, &replacement), found));
    }

    debug!("patch"; "old script text not found in artifact");
    None
}

/// Leading indentation stripped from every line, then trimmed.
pub fn normalize_script(text: &str) -> String {
    text.lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
