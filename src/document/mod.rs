//! In-memory layout document.
//!
//! ```text
//! Document
//! └── root: Arc<Node>        (GROUP)
//!     ├── properties          name, tag, script, frame, color...
//!     ├── values              value descriptors
//!     ├── extra               opaque blocks (messages...)
//!     └── children: Arc<Node> (recursively)
//! ```
//!
//! Children sit behind `Arc` so a rewritten tree shares every subtree the
//! rewrite did not touch with the previous generation.

mod property;
mod selector;

use std::sync::Arc;

use serde::Serialize;

pub use property::{Color, Frame, NAME_KEY, Property, PropertyValue, SCRIPT_KEY, TAG_KEY};
pub use selector::{GLOBALS_ID, ROOT_ID, ScriptRole, Selector, TAG_PREFIX};

/// A value descriptor from a node's `values` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValueDescriptor {
    pub key: String,
    pub locked: String,
    pub locked_default_current: String,
    pub default: String,
    pub default_pull: Option<String>,
}

/// A node child element this crate does not model, kept as raw XML.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawBlock(pub String);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: String,
    pub properties: Vec<Property>,
    pub values: Vec<ValueDescriptor>,
    pub extra: Vec<RawBlock>,
    /// `Some` for container nodes, even when empty.
    pub children: Option<Vec<Arc<Node>>>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: Vec::new(),
            values: Vec::new(),
            extra: Vec::new(),
            children: None,
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .push(Arc::new(child));
        self
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// True if a string property `key` equals `value`.
    pub fn has_property(&self, key: &str, value: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.key == key && p.as_str() == Some(value))
    }

    pub fn script(&self) -> Option<&str> {
        self.property(SCRIPT_KEY).and_then(Property::as_str)
    }

    /// Replace the `script` property if present, else append one.
    pub fn upsert_script(&mut self, text: &str) {
        let property = Property::script(text);
        match self.properties.iter_mut().find(|p| p.key == SCRIPT_KEY) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn children(&self) -> &[Arc<Node>] {
        self.children.as_deref().unwrap_or_default()
    }

    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let node = out[i];
            out.extend(node.children().iter().map(Arc::as_ref));
            i += 1;
        }
        out
    }
}

/// Document-level metadata from the XML declaration and `lexml` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMeta {
    pub xml_version: String,
    pub encoding: String,
    pub lexml_version: String,
}

impl Default for DocumentMeta {
    fn default() -> Self {
        Self {
            xml_version: "1.0".to_string(),
            encoding: "UTF-8".to_string(),
            lexml_version: "3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub meta: DocumentMeta,
    pub root: Arc<Node>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self {
            meta: DocumentMeta::default(),
            root: Arc::new(root),
        }
    }

    /// Mutable root, cloning it only if another generation still shares it.
    pub fn root_mut(&mut self) -> &mut Node {
        Arc::make_mut(&mut self.root)
    }

    /// Number of nodes whose `script` equals `text`.
    pub fn count_scripts(&self, text: &str) -> usize {
        self.root
            .walk()
            .into_iter()
            .filter(|n| n.script() == Some(text))
            .count()
    }
}
