use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::TempDir;

use super::*;
use crate::config::InjectConfig;
use crate::document::Node;

const PROJECT: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<lexml version='3'>
  <node ID='root' type='GROUP'>
    <properties>
      <property type='s'><key><![CDATA[name]]></key><value><![CDATA[root]]></value></property>
    </properties>
    <values></values>
    <children>
      <node ID='a' type='BUTTON'>
        <properties><property type='s'><key><![CDATA[name]]></key><value><![CDATA[A]]></value></property></properties>
        <values></values>
        <messages><osc><enabled>1</enabled></osc></messages>
      </node>
      <node ID='b' type='LABEL'>
        <properties><property type='s'><key><![CDATA[name]]></key><value><![CDATA[B]]></value></property></properties>
        <values></values>
      </node>
      <node ID='g' type='GROUP'>
        <properties><property type='s'><key><![CDATA[name]]></key><value><![CDATA[knobs]]></value></property></properties>
        <values></values>
        <children>
          <node ID='k1' type='RADIAL'>
            <properties><property type='s'><key><![CDATA[tag]]></key><value><![CDATA[knob]]></value></property></properties>
            <values></values>
          </node>
          <node ID='k2' type='ENCODER'>
            <properties><property type='s'><key><![CDATA[tag]]></key><value><![CDATA[knob]]></value></property></properties>
            <values></values>
          </node>
        </children>
      </node>
    </children>
  </node>
</lexml>"#;

struct Project {
    dir: TempDir,
    path: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.tosc");
        fs::write(&path, PROJECT).unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        Self { dir, path }
    }

    fn script(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join("scripts").join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn load(&self) -> Session {
        Session::load(&self.path, &InjectConfig::default()).unwrap()
    }

    fn artifact_text(&self) -> String {
        fs::read_to_string(self.dir.path().join("live_INJECTED.tosc")).unwrap()
    }

    fn artifact(&self) -> Document {
        codec::parse(&self.artifact_text()).unwrap()
    }
}

fn script_of(doc: &Document, id: &str) -> Option<String> {
    doc.root
        .walk()
        .into_iter()
        .find(|n: &&Node| n.id == id)
        .and_then(|n| n.script().map(str::to_string))
}

#[test]
fn test_load_injects_by_name() {
    let project = Project::new();
    project.script("A.lua", "print('a')");
    project.script("B.lua", "print('b')");

    let session = project.load();
    let written = project.artifact();

    assert_eq!(script_of(&written, "a").as_deref(), Some("print('a')"));
    assert_eq!(script_of(&written, "b").as_deref(), Some("print('b')"));
    assert_eq!(session.state.log.previous_count("name: A"), Some(1));
    assert_eq!(session.state.log.previous_count("name: B"), Some(1));
    // Opaque blocks survive
    assert!(project.artifact_text().contains("<messages><osc><enabled>1</enabled></osc></messages>"));
}

#[test]
fn test_load_injects_by_tag() {
    let project = Project::new();
    project.script("tag_knob.lua", "turn()");

    let session = project.load();
    let written = project.artifact();

    assert_eq!(session.state.log.previous_count("tag: knob"), Some(2));
    assert_eq!(script_of(&written, "k1").as_deref(), Some("turn()"));
    assert_eq!(script_of(&written, "k2").as_deref(), Some("turn()"));
    assert_eq!(script_of(&written, "g"), None);
}

#[test]
fn test_ignores_other_extensions() {
    let project = Project::new();
    project.script("A.txt", "not a script");

    let session = project.load();
    assert!(session.state.log.entries().is_empty());
    assert!(!session.is_script(Path::new("A.txt")));
    assert!(session.is_script(Path::new("A.LUA")));
}

#[test]
fn test_root_replaced_through_full_rebuild() {
    let project = Project::new();
    let root = project.script("_root.lua", "X");
    let mut session = project.load();
    assert_eq!(project.artifact().root.script(), Some("X"));

    fs::write(&root, "Y").unwrap();
    let requirement = session.apply_script_path(&root).unwrap();
    assert_eq!(requirement, RebuildRequirement::FullRebuildNeeded);
    session.write().unwrap();

    let written = project.artifact();
    assert_eq!(written.root.script(), Some("Y"));
    assert_eq!(session.state.log.current_count("_root"), Some(1));
}

#[test]
fn test_orphan_update_does_not_write() {
    let project = Project::new();
    let ghost = project.script("ghost.lua", "x()");
    let mut session = project.load();
    assert!(session.state.log.is_known_orphan("name: ghost"));
    let before = project.artifact_text();

    fs::write(&ghost, "y()").unwrap();
    assert_eq!(
        session.apply_script_path(&ghost).unwrap(),
        RebuildRequirement::None
    );
    assert_eq!(project.artifact_text(), before);
}

#[test]
fn test_quick_patch_equals_full_rebuild() {
    let project = Project::new();
    let knob = project.script("tag_knob.lua", "v1()");
    project.script("A.lua", "a()");
    let mut session = project.load();

    fs::write(&knob, "v2()").unwrap();
    assert_eq!(
        session.apply_script_path(&knob).unwrap(),
        RebuildRequirement::QuickPatched(2)
    );

    let patched = project.artifact();
    assert_eq!(patched, session.document);
    assert_eq!(script_of(&patched, "k1").as_deref(), Some("v2()"));
    assert_eq!(script_of(&patched, "a").as_deref(), Some("a()"));
}

#[test]
fn test_quick_patch_fallback_after_artifact_edit() {
    let project = Project::new();
    let a = project.script("A.lua", "a()");
    let mut session = project.load();

    // Artifact edited by hand between two saves
    fs::write(
        session.artifact().path(),
        project.artifact_text().replace("a()", "other()"),
    )
    .unwrap();

    fs::write(&a, "a2()").unwrap();
    assert_eq!(
        session.apply_script_path(&a).unwrap(),
        RebuildRequirement::FullRebuildNeeded
    );
    session.write().unwrap();
    assert_eq!(script_of(&project.artifact(), "a").as_deref(), Some("a2()"));
}

#[test]
fn test_globals_propagate() {
    let project = Project::new();
    project.script("A.lua", "a()");
    project.script("tag_knob.lua", "k()");
    let mut session = project.load();

    let globals = project.script("_globals.lua", "G = 1");
    assert_eq!(
        session.apply_script_path(&globals).unwrap(),
        RebuildRequirement::FullRebuildNeeded
    );
    session.write().unwrap();

    let written = project.artifact();
    assert_eq!(script_of(&written, "a").as_deref(), Some("G = 1\n\na()"));
    assert_eq!(script_of(&written, "k2").as_deref(), Some("G = 1\n\nk()"));

    // Later single updates see the current globals
    let a = project.script("A.lua", "a2()");
    session.apply_script_path(&a).unwrap();
    assert_eq!(
        script_of(&session.document, "a").as_deref(),
        Some("G = 1\n\na2()")
    );

    // Removing globals strips the prelude again
    fs::remove_file(&globals).unwrap();
    assert_eq!(
        session.apply_script_path(&globals).unwrap(),
        RebuildRequirement::FullRebuildNeeded
    );
    assert_eq!(script_of(&session.document, "a").as_deref(), Some("a2()"));
}

#[test]
fn test_globals_never_injected() {
    let project = Project::new();
    project.script("_globals.lua", "G = 1");
    let session = project.load();

    assert!(session.state.log.entries().is_empty());
    assert_eq!(session.state.globals.as_deref(), Some("G = 1"));
    assert_eq!(session.document.count_scripts("G = 1"), 0);
}

#[test]
fn test_empty_globals_leave_scripts_untouched() {
    let project = Project::new();
    project.script("_globals.lua", "");
    project.script("A.lua", "a()");
    let session = project.load();

    assert_eq!(session.state.globals, None);
    assert_eq!(script_of(&project.artifact(), "a").as_deref(), Some("a()"));
}

#[test]
fn test_deleted_script_clears_nodes() {
    let project = Project::new();
    let a = project.script("A.lua", "a()");
    let mut session = project.load();

    fs::remove_file(&a).unwrap();
    assert_eq!(
        session.apply_script_path(&a).unwrap(),
        RebuildRequirement::FullRebuildNeeded
    );
    assert_eq!(script_of(&session.document, "a").as_deref(), Some(""));
    assert_eq!(session.state.cache.get("A"), None);
}

#[test]
fn test_missing_scripts_dir() {
    let project = Project::new();
    fs::remove_dir(project.dir.path().join("scripts")).unwrap();

    let result = Session::load(&project.path, &InjectConfig::default());
    assert!(matches!(result, Err(InjectError::ScanScripts(..))));
}

#[test]
fn test_malformed_project() {
    let project = Project::new();
    fs::write(&project.path, "<?xml version='1.0'?><lexml version='3'><node").unwrap();

    let result = Session::load(&project.path, &InjectConfig::default());
    assert!(matches!(result, Err(InjectError::Codec(_))));
}

#[test]
fn test_load_compressed_project() {
    let project = Project::new();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(PROJECT.as_bytes()).unwrap();
    fs::write(&project.path, encoder.finish().unwrap()).unwrap();
    project.script("B.lua", "b()");

    let session = project.load();
    assert_eq!(script_of(&session.document, "b").as_deref(), Some("b()"));
    // Artifact is always plain XML
    assert!(project.artifact_text().starts_with("<?xml"));
}

#[test]
fn test_debug_dumps() {
    let project = Project::new();
    project.script("A.lua", "a()");
    let mut config = InjectConfig::default();
    config.output.debug = true;

    Session::load(&project.path, &config).unwrap();

    let json = fs::read_to_string(project.dir.path().join("live_DEBUG.json")).unwrap();
    assert!(json.contains("\"BUTTON\""));
    // The debug tosc is the un-injected document
    let debug = fs::read_to_string(project.dir.path().join("live_DEBUG.tosc")).unwrap();
    let debug = codec::parse(&debug).unwrap();
    assert_eq!(script_of(&debug, "a"), None);
}
