//! Script identifier → injection target.
//!
//! The file name of a script (without extension) is the whole protocol
//! between script authors and the injector:
//!
//! ```text
//! _root.lua       → Root
//! tag_knob.lua    → ByTag("knob")
//! fader1.lua      → ByName("fader1")
//! _globals.lua    → prepended to every other script, never injected
//! ```

use std::fmt;

use super::property::{NAME_KEY, TAG_KEY};

/// Identifier targeting the document root.
pub const ROOT_ID: &str = "_root";
/// Identifier of the shared prelude script.
pub const GLOBALS_ID: &str = "_globals";
/// Prefix selecting nodes by their `tag` property.
pub const TAG_PREFIX: &str = "tag_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Root,
    ByTag(String),
    ByName(String),
}

impl Selector {
    /// Resolve a script identifier. Total: unknown shapes become `ByName`.
    pub fn resolve(id: &str) -> Self {
        if id == ROOT_ID {
            Self::Root
        } else if let Some(tag) = id.strip_prefix(TAG_PREFIX) {
            Self::ByTag(tag.to_string())
        } else {
            Self::ByName(id.to_string())
        }
    }

    /// Property `(key, value)` a node must carry to match, `None` for `Root`.
    pub fn property(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::Root => None,
            Self::ByTag(tag) => Some((TAG_KEY, tag)),
            Self::ByName(name) => Some((NAME_KEY, name)),
        }
    }

    /// Key used in the injection log and results table.
    pub fn log_key(&self) -> String {
        self.to_string()
    }

    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str(ROOT_ID),
            Self::ByTag(tag) => write!(f, "{TAG_KEY}: {tag}"),
            Self::ByName(name) => write!(f, "{NAME_KEY}: {name}"),
        }
    }
}

/// What a script file is used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRole {
    Globals,
    Target(Selector),
}

impl ScriptRole {
    pub fn of(id: &str) -> Self {
        if id == GLOBALS_ID {
            Self::Globals
        } else {
            Self::Target(Selector::resolve(id))
        }
    }
}
