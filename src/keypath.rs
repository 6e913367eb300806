//! Key path addressing into nested configuration trees.
//!
//! A key such as `database:host` is split on a separator into segments
//! (`["database", "host"]`) that address a value inside nested mappings.
//! Empty segments are dropped, so an empty key addresses the tree root.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;

/// Default separator between key segments.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Split `key` on `separator`, dropping empty segments.
///
/// An empty separator disables splitting: the whole key is one segment.
pub fn split(key: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return if key.is_empty() {
            Vec::new()
        } else {
            vec![key.to_string()]
        };
    }

    key.split(separator)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join segments back into a key string.
pub fn join<S: AsRef<str>>(segments: &[S], separator: &str) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(separator)
}

/// A parsed key path. The empty path denotes the root of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a key string using `separator`.
    pub fn parse(key: &str, separator: &str) -> Self {
        Self {
            segments: split(key, separator),
        }
    }

    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments, dropping empty ones.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Return a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut path = self.clone();
        let segment = segment.into();
        if !segment.is_empty() {
            path.segments.push(segment);
        }
        path
    }

    /// Serialize the path with `separator`.
    pub fn join(&self, separator: &str) -> String {
        join(&self.segments, separator)
    }

    /// Look up the value at this path.
    ///
    /// Returns `None` when any segment is missing or an intermediate value
    /// is not a mapping.
    pub fn get<'a>(&self, tree: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(tree, |node, segment| node.as_object()?.get(segment))
    }

    pub fn get_mut<'a>(&self, tree: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(tree, |node, segment| node.as_object_mut()?.get_mut(segment))
    }

    /// Set the value at this path, creating intermediate mappings.
    ///
    /// Setting the root replaces the whole tree. Fails with
    /// [`Error::InvalidPath`] when an intermediate value is a scalar or
    /// sequence.
    pub fn set(&self, tree: &mut Value, value: Value) -> Result<()> {
        let Some((leaf, parents)) = self.segments.split_last() else {
            *tree = value;
            return Ok(());
        };

        let mut node = tree;
        let mut walked: Vec<&str> = Vec::with_capacity(parents.len());
        for segment in parents {
            let map = node
                .as_object_mut()
                .ok_or_else(|| self.blocked_at(&walked))?;
            walked.push(segment);
            node = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let map = node
            .as_object_mut()
            .ok_or_else(|| self.blocked_at(&walked))?;
        map.insert(leaf.clone(), value);
        Ok(())
    }

    /// Check that [`KeyPath::set`] would succeed on `tree` without changing it.
    pub fn ensure_settable(&self, tree: &Value) -> Result<()> {
        let Some((_, parents)) = self.segments.split_last() else {
            return Ok(());
        };

        let mut node = tree;
        for (depth, segment) in parents.iter().enumerate() {
            let map = node.as_object().ok_or_else(|| {
                self.blocked_at(&parents[..depth].iter().map(String::as_str).collect::<Vec<_>>())
            })?;
            match map.get(segment) {
                Some(child) => node = child,
                // Everything below a missing segment gets created
                None => return Ok(()),
            }
        }

        if node.is_object() {
            Ok(())
        } else {
            Err(self.blocked_at(&parents.iter().map(String::as_str).collect::<Vec<_>>()))
        }
    }

    /// Remove the value at this path. Returns whether anything was removed.
    ///
    /// Ancestors left empty by the removal stay in place. Deleting the root
    /// empties the tree.
    pub fn delete(&self, tree: &mut Value) -> bool {
        let Some((leaf, parents)) = self.segments.split_last() else {
            let had_content = !matches!(tree, Value::Object(m) if m.is_empty());
            *tree = Value::Object(Map::new());
            return had_content;
        };

        let parent = KeyPath {
            segments: parents.to_vec(),
        };
        parent
            .get_mut(tree)
            .and_then(Value::as_object_mut)
            .is_some_and(|map| map.shift_remove(leaf).is_some())
    }

    fn blocked_at(&self, walked: &[&str]) -> Error {
        let segment = if walked.is_empty() {
            "(root)".to_string()
        } else {
            walked.join(DEFAULT_SEPARATOR)
        };
        Error::invalid_path(self.join(DEFAULT_SEPARATOR), segment)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(DEFAULT_SEPARATOR))
    }
}
