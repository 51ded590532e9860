//! Script cache and two-generation injection log.
//!
//! ```text
//! begin_pass:   previous ← current, current ← {}
//! (pass runs, recording into current)
//! finish_pass:  previous ← current
//! ```
//!
//! Single-script updates between full passes record into `current` and
//! consult `previous`, so "how many nodes did this selector hit last time"
//! never needs a tree scan.

use rustc_hash::FxHashMap;

/// Last-applied effective text per script identifier.
#[derive(Debug, Default)]
pub struct ScriptCache {
    texts: FxHashMap<String, String>,
}

impl ScriptCache {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.texts.get(id).map(String::as_str)
    }

    pub fn set(&mut self, id: &str, text: &str) {
        self.texts.insert(id.to_string(), text.to_string());
    }

    pub fn remove(&mut self, id: &str) {
        self.texts.remove(id);
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Selector key → number of nodes updated.
#[derive(Debug, Default)]
pub struct InjectionLog {
    previous: FxHashMap<String, usize>,
    current: FxHashMap<String, usize>,
}

impl InjectionLog {
    pub fn begin_pass(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    pub fn finish_pass(&mut self) {
        self.previous = self.current.clone();
    }

    pub fn record(&mut self, key: String, count: usize) {
        self.current.insert(key, count);
    }

    /// Keep last pass's count for a selector the current pass skipped.
    pub fn carry_over(&mut self, key: &str) {
        if self.current_count(key).is_some() {
            return;
        }
        if let Some(count) = self.previous_count(key) {
            self.current.insert(key.to_string(), count);
        }
    }

    pub fn previous_count(&self, key: &str) -> Option<usize> {
        self.previous.get(key).copied()
    }

    /// The last completed pass found nothing for this selector.
    pub fn is_known_orphan(&self, key: &str) -> bool {
        self.previous_count(key) == Some(0)
    }

    pub fn current_count(&self, key: &str) -> Option<usize> {
        self.current.get(key).copied()
    }

    /// Current generation sorted by key, for the results table.
    pub fn entries(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<_> = self.current.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Everything that lives for one document lifetime besides the tree.
#[derive(Debug, Default)]
pub struct SessionState {
    pub cache: ScriptCache,
    pub log: InjectionLog,
    /// Current `_globals` text, prepended to every other script.
    pub globals: Option<String>,
}

impl SessionState {
    /// Effective text of a script once globals are prepended.
    pub fn effective_text(&self, text: &str) -> String {
        match &self.globals {
            Some(globals) if !globals.is_empty() => format!("{globals}\n\n{text}"),
            _ => text.to_string(),
        }
    }
}
