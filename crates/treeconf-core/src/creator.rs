//! Tree construction from nested values
//!
//! Mapping keys are parsed as paths, so `{"a.b[0]": 1}` builds three levels.
//! Null entries are skipped: absence is never stored as a leaf.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::path::{Path, PathElement};
use crate::value::Value;

/// Build the node for `value` as it will sit at `path`
pub(crate) fn node_for_value(path: &Path, value: &Value) -> Result<Node> {
    match value {
        Value::Null => Err(Error::value_conversion(
            path.to_string(),
            "a non-null value",
            "null",
        )),
        Value::Config(config) => Ok(config.root().clone()),
        Value::Mapping(map) => {
            let mut node = Node::empty_map();
            for (key, child) in map {
                if child.is_null() {
                    log::debug!("Skipping null value at '{}'", path.key(key));
                    continue;
                }
                let key_path = Path::parse_absolute(key)?;
                node = node.add_or_replace(path, &key_path, child)?;
            }
            Ok(node)
        }
        Value::Sequence(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items.iter().filter(|item| !item.is_null()) {
                let node = node_for_value(&path.index(nodes.len()), item)?;
                nodes.push(Arc::new(node));
            }
            Ok(Node::List(nodes))
        }
        scalar => match scalar.to_scalar() {
            Some(leaf) => Ok(Node::Leaf(leaf)),
            None => Err(Error::internal(format!(
                "Unsupported {} value at '{}'",
                scalar.type_name(),
                path
            ))),
        },
    }
}

/// Build a fresh chain of maps and lists leading from `parent` through `sub_path`
/// down to the node for `value`. New lists can only be started at index 0.
pub(crate) fn node_at(parent: &Path, sub_path: &Path, value: &Value) -> Result<Node> {
    let full_path = parent.join(sub_path);
    let mut node = node_for_value(&full_path, value)?;
    for element in sub_path.elements().iter().rev() {
        node = match element {
            PathElement::Named(name) => {
                let mut children = IndexMap::with_capacity(1);
                children.insert(name.clone(), Arc::new(node));
                Node::Map(children)
            }
            PathElement::Indexed(0) => Node::List(vec![Arc::new(node)]),
            PathElement::Indexed(index) => {
                return Err(Error::missing_value(full_path.to_string()).with_help(format!(
                    "A new list starts at index 0, got {}",
                    index
                )));
            }
        };
    }
    Ok(node)
}
