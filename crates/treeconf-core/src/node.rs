//! Persistent configuration tree
//!
//! A [`Node`] is a map, a list or a leaf. Children are reference counted and
//! nodes are never modified once built: every edit returns a new node that
//! shares all untouched subtrees with the previous version.
//!
//! Addressed operations take the `parent` path of the receiver (used in error
//! messages and handed to leaf visitors) and the `sub_path` still to walk.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::creator;
use crate::error::{Error, Result};
use crate::path::{Path, PathElement};
use crate::value::{Scalar, Value};

/// A node of the configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Named children, keys are unique
    Map(IndexMap<String, Arc<Node>>),
    /// Indexed children without gaps
    List(Vec<Arc<Node>>),
    /// Non-null scalar
    Leaf(Scalar),
}

/// Whether a container left empty by a removal is removed as well
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub prune_empty_maps: bool,
    pub prune_empty_lists: bool,
}

impl RemoveOptions {
    pub fn new(prune_empty_maps: bool, prune_empty_lists: bool) -> Self {
        Self {
            prune_empty_maps,
            prune_empty_lists,
        }
    }

    /// Keep emptied maps and lists
    pub fn leave_empty_parents() -> Self {
        Self::new(false, false)
    }

    /// Remove emptied maps and lists
    pub fn prune_empty_parents() -> Self {
        Self::new(true, true)
    }

    /// Remove emptied maps only
    pub fn prune_empty_maps() -> Self {
        Self::new(true, false)
    }

    /// Remove emptied lists only
    pub fn prune_empty_lists() -> Self {
        Self::new(false, true)
    }
}

/// Outcome of a removing edit
enum Edit {
    Unchanged,
    Replaced(Node),
    Removed,
}

impl Node {
    pub fn empty_map() -> Self {
        Node::Map(IndexMap::new())
    }

    /// Build a detached node from a nested value
    pub fn from_value(value: &Value) -> Result<Self> {
        creator::node_for_value(&Path::root(), value)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map(_))
    }

    pub fn as_leaf(&self) -> Option<&Scalar> {
        match self {
            Node::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Empty map or list. A leaf is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Map(children) => children.is_empty(),
            Node::List(items) => items.is_empty(),
            Node::Leaf(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Map(_) => "mapping",
            Node::List(_) => "sequence",
            Node::Leaf(value) => value.type_name(),
        }
    }

    /// Node at `sub_path`, or `None` when any step does not match the node kind
    pub fn get(&self, sub_path: &Path) -> Option<&Node> {
        let mut current = self;
        for element in sub_path.elements() {
            current = match (current, element) {
                (Node::Map(children), PathElement::Named(name)) => children.get(name)?.as_ref(),
                (Node::List(items), PathElement::Indexed(index)) => items.get(*index)?.as_ref(),
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `value` at `sub_path`, replacing whatever is there.
    ///
    /// Existing maps and lists are descended when the path element kind matches.
    /// A leaf, or a container of the wrong kind, is discarded and a fresh subtree
    /// is built for the rest of the path. Index `len` appends to a list, larger
    /// indexes fail with a missing value error.
    pub fn add_or_replace(&self, parent: &Path, sub_path: &Path, value: &Value) -> Result<Node> {
        let Some(element) = sub_path.first() else {
            return creator::node_for_value(parent, value);
        };
        let rest = sub_path.remove_first();

        match (self, element) {
            (Node::Map(children), PathElement::Named(name)) => {
                let child_path = parent.key(name);
                let child = match children.get(name) {
                    Some(child) => child.add_or_replace(&child_path, &rest, value)?,
                    None => creator::node_at(&child_path, &rest, value)?,
                };
                let mut children = children.clone();
                children.insert(name.clone(), Arc::new(child));
                Ok(Node::Map(children))
            }
            (Node::List(items), PathElement::Indexed(index)) if *index > items.len() => {
                Err(Error::missing_value(parent.index(*index).to_string()).with_help(format!(
                    "The list has {} elements, write index {} first",
                    items.len(),
                    items.len()
                )))
            }
            (Node::List(items), PathElement::Indexed(index)) => {
                let child_path = parent.index(*index);
                let mut items = items.clone();
                if let Some(child) = items.get(*index) {
                    let child = child.add_or_replace(&child_path, &rest, value)?;
                    items[*index] = Arc::new(child);
                } else {
                    items.push(Arc::new(creator::node_at(&child_path, &rest, value)?));
                }
                Ok(Node::List(items))
            }
            _ => creator::node_at(parent, sub_path, value),
        }
    }

    /// Write `value` at `sub_path` only where nothing exists yet.
    ///
    /// Existing values are never overwritten and list elements are never created:
    /// the write is dropped when the missing part of the path contains an index.
    pub fn add_if_missing(&self, parent: &Path, sub_path: &Path, value: &Value) -> Result<Node> {
        Ok(self
            .fill_missing(parent, sub_path, value)?
            .unwrap_or_else(|| self.clone()))
    }

    fn fill_missing(&self, parent: &Path, sub_path: &Path, value: &Value) -> Result<Option<Node>> {
        let Some(element) = sub_path.first() else {
            return Ok(None);
        };
        let rest = sub_path.remove_first();

        match (self, element) {
            (Node::Map(children), PathElement::Named(name)) => {
                let child_path = parent.key(name);
                let child = match children.get(name) {
                    Some(child) => match child.fill_missing(&child_path, &rest, value)? {
                        Some(child) => child,
                        None => return Ok(None),
                    },
                    None if rest.elements().iter().any(PathElement::is_indexed) => {
                        log::debug!(
                            "Skipping default for '{}': list elements are not created",
                            child_path.join(&rest)
                        );
                        return Ok(None);
                    }
                    None => creator::node_at(&child_path, &rest, value)?,
                };
                let mut children = children.clone();
                children.insert(name.clone(), Arc::new(child));
                Ok(Some(Node::Map(children)))
            }
            (Node::List(items), PathElement::Indexed(index)) if *index < items.len() => {
                let child_path = parent.index(*index);
                match items[*index].fill_missing(&child_path, &rest, value)? {
                    Some(child) => {
                        let mut items = items.clone();
                        items[*index] = Arc::new(child);
                        Ok(Some(Node::List(items)))
                    }
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// Remove the map key or list element at `sub_path`.
    ///
    /// List removal shifts the following elements down. Returns `None` when the
    /// receiver itself became empty and `options` prune it. Kind mismatches and
    /// missing entries leave the tree unchanged.
    pub fn remove(&self, sub_path: &Path, options: RemoveOptions) -> Option<Node> {
        match self.remove_edit(sub_path, options) {
            Edit::Unchanged => Some(self.clone()),
            Edit::Replaced(node) => Some(node),
            Edit::Removed => None,
        }
    }

    fn remove_edit(&self, sub_path: &Path, options: RemoveOptions) -> Edit {
        let Some(element) = sub_path.first() else {
            return Edit::Unchanged;
        };
        let rest = sub_path.remove_first();

        match (self, element) {
            (Node::Map(children), PathElement::Named(name)) => {
                let Some(child) = children.get(name) else {
                    return Edit::Unchanged;
                };
                let edit = match rest.is_root() {
                    true => Edit::Removed,
                    false => child.remove_edit(&rest, options),
                };
                let mut children = children.clone();
                match edit {
                    Edit::Unchanged => return Edit::Unchanged,
                    Edit::Replaced(node) => {
                        children.insert(name.clone(), Arc::new(node));
                    }
                    Edit::Removed => {
                        children.shift_remove(name);
                    }
                }
                if children.is_empty() && options.prune_empty_maps {
                    Edit::Removed
                } else {
                    Edit::Replaced(Node::Map(children))
                }
            }
            (Node::List(items), PathElement::Indexed(index)) if *index < items.len() => {
                let edit = match rest.is_root() {
                    true => Edit::Removed,
                    false => items[*index].remove_edit(&rest, options),
                };
                let mut items = items.clone();
                match edit {
                    Edit::Unchanged => return Edit::Unchanged,
                    Edit::Replaced(node) => items[*index] = Arc::new(node),
                    Edit::Removed => {
                        items.remove(*index);
                    }
                }
                if items.is_empty() && options.prune_empty_lists {
                    Edit::Removed
                } else {
                    Edit::Replaced(Node::List(items))
                }
            }
            _ => Edit::Unchanged,
        }
    }

    /// Merge with `other` supplying defaults.
    ///
    /// Maps merge key by key, recursively. Lists and leaves are kept as they are,
    /// whatever `other` holds at the same position.
    pub fn with_defaults(&self, other: &Node) -> Node {
        match (self, other) {
            (Node::Map(children), Node::Map(defaults)) => {
                let mut merged = children.clone();
                for (key, default) in defaults {
                    match children.get(key) {
                        Some(child)
                            if child.is_map() && default.is_map() && !Arc::ptr_eq(child, default) =>
                        {
                            merged.insert(key.clone(), Arc::new(child.with_defaults(default)));
                        }
                        Some(_) => {}
                        None => {
                            merged.insert(key.clone(), Arc::clone(default));
                        }
                    }
                }
                Node::Map(merged)
            }
            _ => self.clone(),
        }
    }

    /// Replace every leaf with `mapper(path, leaf)`, depth first.
    /// Subtrees without a changed leaf are shared with the receiver.
    pub fn map_leaves<F>(&self, parent: &Path, mapper: &mut F) -> Result<Node>
    where
        F: FnMut(&Path, &Scalar) -> Result<Scalar>,
    {
        Ok(self
            .map_changed(parent, mapper)?
            .unwrap_or_else(|| self.clone()))
    }

    fn map_changed<F>(&self, path: &Path, mapper: &mut F) -> Result<Option<Node>>
    where
        F: FnMut(&Path, &Scalar) -> Result<Scalar>,
    {
        match self {
            Node::Leaf(value) => {
                let mapped = mapper(path, value)?;
                Ok((mapped != *value).then_some(Node::Leaf(mapped)))
            }
            Node::Map(children) => {
                let mut changed: Option<IndexMap<String, Arc<Node>>> = None;
                for (key, child) in children {
                    if let Some(mapped) = child.map_changed(&path.key(key), mapper)? {
                        changed
                            .get_or_insert_with(|| children.clone())
                            .insert(key.clone(), Arc::new(mapped));
                    }
                }
                Ok(changed.map(Node::Map))
            }
            Node::List(items) => {
                let mut changed: Option<Vec<Arc<Node>>> = None;
                for (index, item) in items.iter().enumerate() {
                    if let Some(mapped) = item.map_changed(&path.index(index), mapper)? {
                        changed.get_or_insert_with(|| items.clone())[index] = Arc::new(mapped);
                    }
                }
                Ok(changed.map(Node::List))
            }
        }
    }

    /// Drop every leaf for which `predicate(path, leaf)` is false.
    ///
    /// Containers left empty, including ones that were empty already, are dropped
    /// as `options` say. Returns `None` when the receiver itself is dropped.
    pub fn filter_leaves<F>(&self, parent: &Path, predicate: &mut F, options: RemoveOptions) -> Option<Node>
    where
        F: FnMut(&Path, &Scalar) -> bool,
    {
        match self.filter_edit(parent, predicate, options) {
            Edit::Unchanged => Some(self.clone()),
            Edit::Replaced(node) => Some(node),
            Edit::Removed => None,
        }
    }

    fn filter_edit<F>(&self, path: &Path, predicate: &mut F, options: RemoveOptions) -> Edit
    where
        F: FnMut(&Path, &Scalar) -> bool,
    {
        match self {
            Node::Leaf(value) => match predicate(path, value) {
                true => Edit::Unchanged,
                false => Edit::Removed,
            },
            Node::Map(children) => {
                let mut kept = IndexMap::with_capacity(children.len());
                let mut changed = false;
                for (key, child) in children {
                    match child.filter_edit(&path.key(key), predicate, options) {
                        Edit::Unchanged => {
                            kept.insert(key.clone(), Arc::clone(child));
                        }
                        Edit::Replaced(node) => {
                            changed = true;
                            kept.insert(key.clone(), Arc::new(node));
                        }
                        Edit::Removed => changed = true,
                    }
                }
                if kept.is_empty() && options.prune_empty_maps {
                    Edit::Removed
                } else if changed {
                    Edit::Replaced(Node::Map(kept))
                } else {
                    Edit::Unchanged
                }
            }
            Node::List(items) => {
                let mut kept = Vec::with_capacity(items.len());
                let mut changed = false;
                for (index, item) in items.iter().enumerate() {
                    match item.filter_edit(&path.index(index), predicate, options) {
                        Edit::Unchanged => kept.push(Arc::clone(item)),
                        Edit::Replaced(node) => {
                            changed = true;
                            kept.push(Arc::new(node));
                        }
                        Edit::Removed => changed = true,
                    }
                }
                if kept.is_empty() && options.prune_empty_lists {
                    Edit::Removed
                } else if changed {
                    Edit::Replaced(Node::List(kept))
                } else {
                    Edit::Unchanged
                }
            }
        }
    }

    /// True when any leaf satisfies `predicate`. Stops at the first match.
    pub fn any_leaf<F>(&self, predicate: &mut F) -> bool
    where
        F: FnMut(&Scalar) -> bool,
    {
        match self {
            Node::Leaf(value) => predicate(value),
            Node::Map(children) => children.values().any(|child| child.any_leaf(predicate)),
            Node::List(items) => items.iter().any(|item| item.any_leaf(predicate)),
        }
    }

    /// All leaves with their absolute paths, depth first
    pub fn entries(&self, parent: &Path) -> Vec<(Path, Scalar)> {
        let mut entries = Vec::new();
        self.collect_entries(parent, &mut entries);
        entries
    }

    fn collect_entries(&self, path: &Path, entries: &mut Vec<(Path, Scalar)>) {
        match self {
            Node::Leaf(value) => entries.push((path.clone(), value.clone())),
            Node::Map(children) => {
                for (key, child) in children {
                    child.collect_entries(&path.key(key), entries);
                }
            }
            Node::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    item.collect_entries(&path.index(index), entries);
                }
            }
        }
    }

    /// Unwrap into a nested value. Unresolved expressions unwrap to their template.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Leaf(value) => value.to_value(),
            Node::Map(children) => Value::Mapping(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_value()))
                    .collect(),
            ),
            Node::List(items) => Value::Sequence(items.iter().map(|item| item.to_value()).collect()),
        }
    }
}
