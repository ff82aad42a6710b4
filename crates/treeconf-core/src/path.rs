//! Tree addresses
//!
//! A [`Path`] is an immutable sequence of [`PathElement`]s. Named elements address
//! map keys, indexed elements address list positions. The textual form joins names
//! with `.` and writes indexes in brackets: `servers[0].host`, `matrix[1][2]`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A single step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    /// Map key, never blank
    Named(String),
    /// List position
    Indexed(usize),
}

impl PathElement {
    /// Create a named element, rejecting blank names and names that could not
    /// be printed back unambiguously
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_path(name, "Blank path segment"));
        }
        if name.contains(['.', '[', ']']) {
            return Err(Error::invalid_path(
                name,
                "Path segment name may not contain '.', '[' or ']'",
            ));
        }
        Ok(PathElement::Named(name))
    }

    /// Create an indexed element
    pub fn indexed(index: usize) -> Self {
        PathElement::Indexed(index)
    }

    pub fn is_named(&self) -> bool {
        matches!(self, PathElement::Named(_))
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, PathElement::Indexed(_))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PathElement::Named(name) => Some(name),
            PathElement::Indexed(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathElement::Named(_) => None,
            PathElement::Indexed(index) => Some(*index),
        }
    }
}

/// Immutable address into a configuration tree. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// The root path (no elements)
    pub fn root() -> Self {
        Self::default()
    }

    /// Path made of a single element
    pub fn single(element: PathElement) -> Self {
        Self {
            elements: vec![element],
        }
    }

    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// Parse a textual path. The empty string parses to the root.
    ///
    /// Chunks are separated by `.`; each chunk is a name optionally followed by
    /// one or more `[n]` indexes, or only indexes, which then continue the
    /// previous chunk (`a.[0]` is the same path as `a[0]`).
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self::root());
        }

        let mut elements = Vec::new();
        for chunk in input.split('.') {
            let (name, indexes) = match chunk.find('[') {
                Some(pos) => chunk.split_at(pos),
                None => (chunk, ""),
            };
            if !name.is_empty() {
                elements.push(PathElement::named(name).map_err(|e| {
                    Error::invalid_path(input, e.cause.unwrap_or_default())
                })?);
            } else if indexes.is_empty() {
                return Err(Error::invalid_path(input, "Blank path segment"));
            }
            parse_indexes(input, indexes, &mut elements)?;
        }

        Ok(Self { elements })
    }

    /// Parse a path that must start with a named element
    pub fn parse_absolute(input: &str) -> Result<Self> {
        let path = Self::parse(input)?;
        match path.first() {
            Some(PathElement::Named(_)) => Ok(path),
            _ => Err(Error::invalid_path(
                input,
                "Expected non empty path starting with a named element, e.g. 'a.b'",
            )),
        }
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// First element, `None` on the root
    pub fn first(&self) -> Option<&PathElement> {
        self.elements.first()
    }

    /// Last element, `None` on the root
    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Path without its first element (root stays root)
    pub fn remove_first(&self) -> Path {
        Self {
            elements: self.elements.iter().skip(1).cloned().collect(),
        }
    }

    /// Path without its last element (root stays root)
    pub fn remove_last(&self) -> Path {
        let end = self.elements.len().saturating_sub(1);
        Self {
            elements: self.elements[..end].to_vec(),
        }
    }

    /// New path with `element` appended
    pub fn child(&self, element: PathElement) -> Path {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(element);
        Self { elements }
    }

    /// New path with a named element appended. The name is trusted to come from
    /// an existing tree key.
    pub fn key(&self, name: &str) -> Path {
        self.child(PathElement::Named(name.to_string()))
    }

    /// New path with an indexed element appended
    pub fn index(&self, index: usize) -> Path {
        self.child(PathElement::Indexed(index))
    }

    /// New path with all elements of `sub_path` appended
    pub fn join(&self, sub_path: &Path) -> Path {
        let mut elements = self.elements.clone();
        elements.extend_from_slice(&sub_path.elements);
        Self { elements }
    }

    /// Element-wise prefix check. A path starts with itself and with the root.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Strip `prefix` from the front of this path
    pub fn remove_prefix(&self, prefix: &Path) -> Result<Path> {
        if !self.starts_with(prefix) {
            return Err(Error::invalid_path(
                self.to_string(),
                format!("Path does not start with prefix '{}'", prefix),
            ));
        }
        Ok(Self {
            elements: self.elements[prefix.len()..].to_vec(),
        })
    }

    /// Names of all named elements, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(PathElement::as_name)
    }
}

fn parse_indexes(input: &str, mut rest: &str, elements: &mut Vec<PathElement>) -> Result<()> {
    while !rest.is_empty() {
        let body = rest
            .strip_prefix('[')
            .ok_or_else(|| Error::invalid_path(input, format!("Unexpected text '{}'", rest)))?;
        let close = body
            .find(']')
            .ok_or_else(|| Error::invalid_path(input, "Unterminated '[' in path"))?;
        let digits = &body[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_path(
                input,
                format!("Expected non negative index, got '{}'", digits),
            ));
        }
        let index = digits
            .parse::<usize>()
            .map_err(|e| Error::invalid_path(input, format!("Invalid index: {}", e)))?;
        elements.push(PathElement::Indexed(index));
        rest = &body[close + 1..];
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PathElement::Named(name) if i == 0 => write!(f, "{}", name)?,
                PathElement::Named(name) => write!(f, ".{}", name)?,
                PathElement::Indexed(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl From<PathElement> for Path {
    fn from(element: PathElement) -> Self {
        Path::single(element)
    }
}
