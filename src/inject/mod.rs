//! Copy-on-write script injection.
//!
//! Rewrites a tree post-order, upserting the `script` property on every node
//! that matches a [`Selector`]. Only nodes on a path to a match are rebuilt;
//! every other subtree is shared with the input tree through its `Arc`.

use std::sync::Arc;

use crate::document::{Document, Node, Selector};

/// Result of one injection.
#[derive(Debug)]
pub struct Injected {
    pub root: Arc<Node>,
    /// Number of nodes whose `script` was written. `0` means orphan.
    pub count: usize,
}

/// Inject `script` into every node under `node` matching `selector`.
///
/// `Selector::Root` only ever matches `node` itself: no tree search.
pub fn inject(node: &Arc<Node>, script: &str, selector: &Selector) -> Injected {
    if selector.is_root() {
        let mut root = Node::clone(node);
        root.upsert_script(script);
        return Injected {
            root: Arc::new(root),
            count: 1,
        };
    }

    let Some((key, value)) = selector.property() else {
        return Injected {
            root: Arc::clone(node),
            count: 0,
        };
    };

    match rewrite(node, script, key, value) {
        Some((root, count)) => Injected { root, count },
        None => Injected {
            root: Arc::clone(node),
            count: 0,
        },
    }
}

/// Inject into a document in place, returning the match count.
pub fn inject_document(doc: &mut Document, script: &str, selector: &Selector) -> usize {
    let Injected { root, count } = inject(&doc.root, script, selector);
    doc.root = root;
    count
}

/// Returns `None` when nothing in the subtree matched, so the caller can keep
/// sharing the original.
fn rewrite(node: &Arc<Node>, script: &str, key: &str, value: &str) -> Option<(Arc<Node>, usize)> {
    let mut count = 0;
    let mut new_children: Option<Vec<Arc<Node>>> = None;

    for (i, child) in node.children().iter().enumerate() {
        let Some((rewritten, n)) = rewrite(child, script, key, value) else {
            if let Some(children) = new_children.as_mut() {
                children.push(Arc::clone(child));
            }
            continue;
        };
        count += n;
        let children =
            new_children.get_or_insert_with(|| node.children()[..i].iter().cloned().collect());
        children.push(rewritten);
    }

    let matched = node.has_property(key, value);
    if new_children.is_none() && !matched {
        return None;
    }

    let mut rebuilt = Node {
        id: node.id.clone(),
        kind: node.kind.clone(),
        properties: node.properties.clone(),
        values: node.values.clone(),
        extra: node.extra.clone(),
        children: match new_children {
            Some(children) => Some(children),
            None => node.children.clone(),
        },
    };

    if matched {
        rebuilt.upsert_script(script);
        count += 1;
    }

    Some((Arc::new(rebuilt), count))
}
