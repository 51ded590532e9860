//! Decides how a single script change reaches the artifact.
//!
//! ```text
//! known orphan ───────────────────────────────► None
//! unchanged text (not _root) ─────────────────► None
//! cached + quick patch allowed + counts agree ► QuickPatched(n)
//! otherwise ──► inject into the Document ─────► FullRebuildNeeded
//! ```
//!
//! The in-memory document is updated on every path that changes a script,
//! so a later full rebuild never regresses a quick-patched node.

use super::artifact::Artifact;
use super::state::SessionState;
use crate::{debug, log};
use crate::document::{Document, Node, Selector};
use crate::inject::inject_document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildRequirement {
    /// Nothing to write.
    None,
    /// The artifact was patched in place for this many nodes.
    QuickPatched(usize),
    /// The document changed; serialize and write it.
    FullRebuildNeeded,
}

impl RebuildRequirement {
    pub const fn needs_write(self) -> bool {
        matches!(self, Self::FullRebuildNeeded)
    }
}

/// One script file event, already read from disk.
#[derive(Debug, Clone, Copy)]
pub struct ScriptUpdate<'a> {
    /// File stem of the script.
    pub id: &'a str,
    /// Raw file content, without globals. Empty when deleted.
    pub text: &'a str,
    pub deleted: bool,
    pub allow_quick_patch: bool,
}

pub fn apply_script_file(
    doc: &mut Document,
    state: &mut SessionState,
    artifact: &Artifact,
    update: ScriptUpdate<'_>,
) -> RebuildRequirement {
    let selector = Selector::resolve(update.id);
    let key = selector.log_key();
    let is_root = selector.is_root();

    if !is_root && state.log.is_known_orphan(&key) {
        log!(
            "inject";
            "💨 {} was previously not matched to any node, skipping update", update.id
        );
        state.log.carry_over(&key);
        return RebuildRequirement::None;
    }

    let new_text = if update.deleted {
        String::new()
    } else {
        state.effective_text(update.text)
    };
    let cached = state.cache.get(update.id).map(str::to_string);

    if !is_root && !update.deleted && cached.as_deref() == Some(new_text.as_str()) {
        debug!("inject"; "{} unchanged", update.id);
        state.log.carry_over(&key);
        return RebuildRequirement::None;
    }

    if update.allow_quick_patch
        && !is_root
        && !update.deleted
        && let Some(old) = cached.as_deref()
        && !old.is_empty()
        && let Some(count) = try_quick_patch(doc, artifact, &selector, old, &new_text)
    {
        let injected = inject_document(doc, &new_text, &selector);
        state.log.record(key, injected);
        state.cache.set(update.id, &new_text);
        return RebuildRequirement::QuickPatched(count);
    }

    let count = inject_document(doc, &new_text, &selector);
    if update.deleted {
        state.cache.remove(update.id);
        state.log.record(key, 0);
    } else {
        state.cache.set(update.id, &new_text);
        state.log.record(key, count);
    }
    RebuildRequirement::FullRebuildNeeded
}

/// Patch only when every node carrying `old` is one this selector targets,
/// and every node it targets carries `old`.
fn try_quick_patch(
    doc: &Document,
    artifact: &Artifact,
    selector: &Selector,
    old: &str,
    new: &str,
) -> Option<usize> {
    let (key, value) = selector.property()?;
    let matched: Vec<&Node> = doc
        .root
        .walk()
        .into_iter()
        .filter(|n| n.has_property(key, value))
        .collect();

    let targets = matched.iter().filter(|n| n.script() == Some(old)).count();
    if targets == 0 || targets != matched.len() || targets != doc.count_scripts(old) {
        debug!("patch"; "{} does not own `{}` exclusively, rebuilding", selector, key);
        return None;
    }

    artifact.quick_patch(old, new, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::document::{NAME_KEY, Property, PropertyValue, TAG_KEY};
    use std::fs;
    use tempfile::TempDir;

    fn leaf(id: &str, key: &str, value: &str) -> Node {
        Node::new(id, "BUTTON").with_property(Property::new(
            key,
            PropertyValue::String(value.to_string()),
        ))
    }

    fn document() -> Document {
        Document::new(
            Node::new("root", "GROUP")
                .with_child(leaf("a", NAME_KEY, "A"))
                .with_child(leaf("b", NAME_KEY, "B"))
                .with_child(
                    Node::new("g", "GROUP")
                        .with_child(leaf("k1", TAG_KEY, "knob"))
                        .with_child(leaf("k2", TAG_KEY, "knob")),
                ),
        )
    }

    struct Fixture {
        _dir: TempDir,
        doc: Document,
        state: SessionState,
        artifact: Artifact,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let artifact = Artifact::for_project(&dir.path().join("live.tosc"), "_INJECTED").unwrap();
            Self {
                _dir: dir,
                doc: document(),
                state: SessionState::default(),
                artifact,
            }
        }

        fn apply(&mut self, id: &str, text: &str, quick: bool) -> RebuildRequirement {
            let update = ScriptUpdate {
                id,
                text,
                deleted: false,
                allow_quick_patch: quick,
            };
            apply_script_file(&mut self.doc, &mut self.state, &self.artifact, update)
        }

        fn delete(&mut self, id: &str) -> RebuildRequirement {
            let update = ScriptUpdate {
                id,
                text: "",
                deleted: true,
                allow_quick_patch: true,
            };
            apply_script_file(&mut self.doc, &mut self.state, &self.artifact, update)
        }

        /// Full pass bookkeeping around a batch of updates.
        fn pass(&mut self, scripts: &[(&str, &str)]) {
            self.state.log.begin_pass();
            for (id, text) in scripts {
                self.apply(id, text, false);
            }
            self.state.log.finish_pass();
            self.write();
        }

        fn write(&self) {
            self.artifact.write(&codec::serialize(&self.doc).unwrap()).unwrap();
        }

        fn written(&self) -> Document {
            codec::parse(&fs::read_to_string(self.artifact.path()).unwrap()).unwrap()
        }

        fn script_of(&self, id: &str) -> Option<String> {
            self.doc
                .root
                .walk()
                .into_iter()
                .find(|n| n.id == id)
                .and_then(|n| n.script().map(str::to_string))
        }
    }

    #[test]
    fn test_first_application_rebuilds() {
        let mut fx = Fixture::new();
        assert_eq!(fx.apply("A", "print(1)", true), RebuildRequirement::FullRebuildNeeded);
        assert_eq!(fx.script_of("a").as_deref(), Some("print(1)"));
        assert_eq!(fx.state.log.current_count("name: A"), Some(1));
        assert_eq!(fx.state.cache.get("A"), Some("print(1)"));
    }

    #[test]
    fn test_tag_counts_all_matches() {
        let mut fx = Fixture::new();
        fx.pass(&[("tag_knob", "turn()")]);
        assert_eq!(fx.state.log.previous_count("tag: knob"), Some(2));
        assert_eq!(fx.script_of("k1").as_deref(), Some("turn()"));
        assert_eq!(fx.script_of("k2").as_deref(), Some("turn()"));
    }

    #[test]
    fn test_known_orphan_skipped() {
        let mut fx = Fixture::new();
        fx.pass(&[("ghost", "x()")]);
        let before = fs::read_to_string(fx.artifact.path()).unwrap();

        assert_eq!(fx.apply("ghost", "y()", true), RebuildRequirement::None);
        assert_eq!(fs::read_to_string(fx.artifact.path()).unwrap(), before);
        // Cache untouched by the skip
        assert_eq!(fx.state.cache.get("ghost"), Some("x()"));
    }

    #[test]
    fn test_unchanged_text_is_noop() {
        let mut fx = Fixture::new();
        fx.pass(&[("A", "same()")]);
        assert_eq!(fx.apply("A", "same()", true), RebuildRequirement::None);
    }

    #[test]
    fn test_quick_patch_matches_full_rebuild() {
        let mut fx = Fixture::new();
        fx.pass(&[("A", "one()"), ("tag_knob", "knob_v1()")]);

        assert_eq!(
            fx.apply("tag_knob", "knob_v2()", true),
            RebuildRequirement::QuickPatched(2)
        );
        // Artifact parses to the same tree a full rebuild would write
        assert_eq!(fx.written(), fx.doc);
        assert_eq!(fx.script_of("k2").as_deref(), Some("knob_v2()"));
        assert_eq!(fx.state.cache.get("tag_knob"), Some("knob_v2()"));
    }

    #[test]
    fn test_quick_patch_falls_back_after_external_edit() {
        let mut fx = Fixture::new();
        fx.pass(&[("A", "one()")]);

        // Someone rewrote the artifact
        let edited = fs::read_to_string(fx.artifact.path())
            .unwrap()
            .replace("one()", "hand_edited()");
        fs::write(fx.artifact.path(), edited).unwrap();

        assert_eq!(fx.apply("A", "two()", true), RebuildRequirement::FullRebuildNeeded);
        assert_eq!(fx.script_of("a").as_deref(), Some("two()"));
    }

    #[test]
    fn test_quick_patch_refused_when_text_shared() {
        let mut fx = Fixture::new();
        // B carries the same text, a textual patch would hit it too
        fx.pass(&[("A", "shared()"), ("B", "shared()")]);

        assert_eq!(fx.apply("A", "mine()", true), RebuildRequirement::FullRebuildNeeded);
        fx.write();
        let written = fx.written();
        let b = written.root.walk().into_iter().find(|n| n.id == "b").unwrap();
        assert_eq!(b.script(), Some("shared()"));
    }

    #[test]
    fn test_quick_patch_disabled() {
        let mut fx = Fixture::new();
        fx.pass(&[("A", "one()")]);
        assert_eq!(fx.apply("A", "two()", false), RebuildRequirement::FullRebuildNeeded);
    }

    #[test]
    fn test_root_always_rebuilds() {
        let mut fx = Fixture::new();
        fx.pass(&[("_root", "X")]);

        assert_eq!(fx.apply("_root", "Y", true), RebuildRequirement::FullRebuildNeeded);
        assert_eq!(fx.doc.root.script(), Some("Y"));
        assert_eq!(fx.state.log.current_count("_root"), Some(1));
        // Same text still rebuilds
        assert_eq!(fx.apply("_root", "Y", true), RebuildRequirement::FullRebuildNeeded);
    }

    #[test]
    fn test_globals_prepended() {
        let mut fx = Fixture::new();
        fx.state.globals = Some("G = 1".to_string());
        fx.apply("B", "print(G)", true);
        assert_eq!(fx.script_of("b").as_deref(), Some("G = 1\n\nprint(G)"));
    }

    #[test]
    fn test_delete_clears_script() {
        let mut fx = Fixture::new();
        fx.pass(&[("A", "one()")]);

        assert_eq!(fx.delete("A"), RebuildRequirement::FullRebuildNeeded);
        assert_eq!(fx.script_of("a").as_deref(), Some(""));
        assert_eq!(fx.state.cache.get("A"), None);
        assert_eq!(fx.state.log.current_count("name: A"), Some(0));
    }

    #[test]
    fn test_delete_known_orphan() {
        let mut fx = Fixture::new();
        fx.pass(&[("ghost", "x()")]);
        assert_eq!(fx.delete("ghost"), RebuildRequirement::None);
    }
}
