//! Ordered registry of named sources and the merged composite view.
//!
//! Sources are kept in priority order (index 0 wins). [`Hierarchy::load`]
//! folds them from lowest to highest priority through [`deep_merge_into`]
//! and caches the result; reads and writes then go against that composite.
//! Durable sources only ever persist their own tree, so values that arrived
//! through argv or the environment never reach a saved file.

use crate::error::{Error, Result, SourceFailure};
use crate::keypath::{DEFAULT_SEPARATOR, KeyPath};
use crate::merge::{deep_merge, deep_merge_into};
use crate::source::{Source, empty_tree};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed placement for sources that must sit above or below everything
/// registered in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Above every ordered source (`overrides()`).
    Top,
    Ordered,
    /// Below every ordered source (`defaults()`).
    Bottom,
}

#[derive(Debug)]
struct SourceEntry {
    name: String,
    placement: Placement,
    source: Box<dyn Source>,
}

/// How a source's tree relates to one key path.
enum Layer<'a> {
    /// The source does not define the path or any prefix of it.
    Missing,
    /// A prefix holds a non-mapping, hiding everything below it.
    Shadowed,
    Found(&'a Value),
}

fn layer_at<'a>(tree: &'a Value, path: &KeyPath) -> Layer<'a> {
    let mut node = tree;
    for segment in path.segments() {
        let Some(map) = node.as_object() else {
            return Layer::Shadowed;
        };
        match map.get(segment) {
            Some(child) => node = child,
            None => return Layer::Missing,
        }
    }
    Layer::Found(node)
}

/// Merge `value` into whatever sits at `path`, or set it if nothing does.
fn merge_at(path: &KeyPath, tree: &mut Value, value: Value) -> Result<()> {
    match path.get_mut(tree) {
        Some(existing) => {
            deep_merge_into(existing, value);
            Ok(())
        }
        None => path.set(tree, value),
    }
}

/// Hierarchical configuration over a prioritized list of sources.
///
/// # Example
/// ```
/// use hierconf::{ArgvOptions, EnvOptions, Hierarchy};
/// use serde_json::json;
///
/// let mut config = Hierarchy::new();
/// config
///     .argv_from(ArgvOptions::default(), ["--db:host", "10.0.0.1"])?
///     .env_from(EnvOptions::default().separator("__"), [("db__port", "5432")])?
///     .defaults(json!({"db": {"host": "localhost", "pool": 4}}))?;
///
/// config.load()?;
/// assert_eq!(config.get("db:host")?, Some(&json!("10.0.0.1")));
/// assert_eq!(config.get("db:port")?, Some(&json!("5432")));
/// assert_eq!(config.get("db:pool")?, Some(&json!(4)));
/// # Ok::<(), hierconf::Error>(())
/// ```
#[derive(Debug)]
pub struct Hierarchy {
    entries: Vec<SourceEntry>,
    separator: String,
    strict: bool,
    composite: Option<Arc<Value>>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            strict: false,
            composite: None,
        }
    }

    /// Use `separator` between key segments instead of `:`.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// In strict mode registering an existing name fails with
    /// [`Error::DuplicateName`] instead of replacing the source.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    // ---------------------------------------------------------------------
    // Registry
    // ---------------------------------------------------------------------

    /// Register a source below every source registered before it.
    pub fn add_source(&mut self, name: &str, source: Box<dyn Source>) -> Result<&mut Self> {
        self.register(name, source, Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register a source at a priority index (0 = highest).
    ///
    /// The index is clamped so the source stays below `overrides()` and
    /// above `defaults()`.
    pub fn add_source_at(
        &mut self,
        name: &str,
        source: Box<dyn Source>,
        position: usize,
    ) -> Result<&mut Self> {
        self.register(name, source, Placement::Ordered, Some(position))?;
        Ok(self)
    }

    pub(crate) fn register(
        &mut self,
        name: &str,
        mut source: Box<dyn Source>,
        placement: Placement,
        position: Option<usize>,
    ) -> Result<()> {
        let existing = self.position_of(name);
        if existing.is_some() && self.strict {
            return Err(Error::duplicate_name(name));
        }

        // Once loaded, only the incoming source touches its backing medium
        if self.is_loaded() {
            source.load().map_err(|e| Error::source_load(name, e))?;
        }

        if let Some(index) = existing {
            debug!(source = %name, kind = %source.kind(), index, "Replacing source");
            self.entries[index].source = source;
        } else {
            let index = self.insertion_index(placement, position);
            debug!(source = %name, kind = %source.kind(), index, "Registering source");
            self.entries.insert(
                index,
                SourceEntry {
                    name: name.to_string(),
                    placement,
                    source,
                },
            );
        }

        self.refold();
        Ok(())
    }

    fn insertion_index(&self, placement: Placement, position: Option<usize>) -> usize {
        let top_end = self
            .entries
            .iter()
            .take_while(|e| e.placement == Placement::Top)
            .count();
        let bottom_start = self
            .entries
            .iter()
            .position(|e| e.placement == Placement::Bottom)
            .unwrap_or(self.entries.len());

        match placement {
            Placement::Top => top_end,
            Placement::Bottom => self.entries.len(),
            Placement::Ordered => position.map_or(bottom_start, |p| p.clamp(top_end, bottom_start)),
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.position_of(name).ok_or_else(|| Error::not_found(name))
    }

    /// Remove a source by name and return it.
    ///
    /// When loaded, the composite is rebuilt from the remaining stores.
    pub fn clear(&mut self, name: &str) -> Result<Box<dyn Source>> {
        let index = self.index_of(name)?;
        let entry = self.entries.remove(index);
        debug!(source = %name, "Removed source");
        self.refold();
        Ok(entry.source)
    }

    pub fn source(&self, name: &str) -> Result<&dyn Source> {
        let index = self.index_of(name)?;
        Ok(self.entries[index].source.as_ref())
    }

    pub fn source_mut(&mut self, name: &str) -> Result<&mut dyn Source> {
        let index = self.index_of(name)?;
        Ok(self.entries[index].source.as_mut())
    }

    /// Registered names, highest priority first.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Load every source and cache the merged composite.
    ///
    /// Either every source is refreshed or none is: on failure each store
    /// is put back as it was and the previously cached composite (if any)
    /// is kept.
    pub fn load(&mut self) -> Result<Arc<Value>> {
        let previous: Vec<Value> = self
            .entries
            .iter()
            .map(|e| e.source.store().clone())
            .collect();

        let mut composite = empty_tree();
        for index in (0..self.entries.len()).rev() {
            let entry = &mut self.entries[index];
            match entry.source.load() {
                Ok(tree) => {
                    debug!(source = %entry.name, kind = %entry.source.kind(), "Merging source");
                    deep_merge_into(&mut composite, tree);
                }
                Err(cause) => {
                    let err = Error::source_load(&entry.name, cause);
                    for (entry, store) in self.entries.iter_mut().zip(previous) {
                        *entry.source.store_mut() = store;
                    }
                    return Err(err);
                }
            }
        }

        let composite = Arc::new(composite);
        self.composite = Some(Arc::clone(&composite));
        Ok(composite)
    }

    /// Rebuild a cached composite from the sources' current stores, without
    /// reloading any of them. Does nothing while unloaded.
    fn refold(&mut self) {
        if self.composite.is_none() {
            return;
        }
        let mut composite = empty_tree();
        for entry in self.entries.iter().rev() {
            deep_merge_into(&mut composite, entry.source.store().clone());
        }
        self.composite = Some(Arc::new(composite));
    }

    pub fn is_loaded(&self) -> bool {
        self.composite.is_some()
    }

    /// Shared handle to the current composite, loading first if needed.
    ///
    /// Later mutations never show through a snapshot already handed out.
    pub fn snapshot(&mut self) -> Result<Arc<Value>> {
        self.ensure_loaded()?;
        Ok(self
            .composite
            .get_or_insert_with(|| Arc::new(empty_tree()))
            .clone())
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.composite.is_none() {
            self.load()?;
        }
        Ok(())
    }

    fn composite(&mut self) -> Result<&Value> {
        self.ensure_loaded()?;
        let composite: &Arc<Value> = self
            .composite
            .get_or_insert_with(|| Arc::new(empty_tree()));
        Ok(composite.as_ref())
    }

    fn composite_mut(&mut self) -> Result<&mut Value> {
        self.ensure_loaded()?;
        let composite = self
            .composite
            .get_or_insert_with(|| Arc::new(empty_tree()));
        Ok(Arc::make_mut(composite))
    }

    fn path(&self, key: &str) -> KeyPath {
        KeyPath::parse(key, &self.separator)
    }

    /// Parse `key` for a source that may declare its own separator.
    fn path_for(&self, index: usize, key: &str) -> KeyPath {
        let separator = self.entries[index]
            .source
            .separator()
            .unwrap_or(&self.separator);
        KeyPath::parse(key, separator)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Value at `key` in the composite. Loads first if nothing is cached.
    pub fn get(&mut self, key: &str) -> Result<Option<&Value>> {
        let path = self.path(key);
        let tree = self.composite()?;
        Ok(path.get(tree))
    }

    /// Value at `key` computed from the sources' current trees, bypassing
    /// the cached composite. No source is reloaded.
    pub fn get_live(&self, key: &str) -> Option<Value> {
        let path = self.path(key);
        let mut found: Option<Value> = None;
        for entry in self.entries.iter().rev() {
            match layer_at(entry.source.store(), &path) {
                Layer::Missing => {}
                Layer::Shadowed => found = None,
                Layer::Found(value) => {
                    found = Some(match found {
                        Some(base) => deep_merge(base, value.clone()),
                        None => value.clone(),
                    });
                }
            }
        }
        found
    }

    /// The first of `keys` that has a value.
    pub fn any(&mut self, keys: &[&str]) -> Result<Option<&Value>> {
        let paths: Vec<KeyPath> = keys.iter().map(|k| self.path(k)).collect();
        let tree = self.composite()?;
        Ok(paths.iter().find_map(|path| path.get(tree)))
    }

    /// Fail with [`Error::MissingKeys`] naming every absent key.
    pub fn required(&mut self, keys: &[&str]) -> Result<()> {
        let paths: Vec<(String, KeyPath)> = keys
            .iter()
            .map(|k| (k.to_string(), self.path(k)))
            .collect();
        let tree = self.composite()?;
        let missing: Vec<String> = paths
            .into_iter()
            .filter(|(_, path)| path.get(tree).is_none())
            .map(|(key, _)| key)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingKeys { keys: missing })
        }
    }

    // ---------------------------------------------------------------------
    // Writes against the composite
    // ---------------------------------------------------------------------

    /// Set `key` in the composite only. Not persisted by [`Hierarchy::save`].
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let path = self.path(key);
        path.set(self.composite_mut()?, value)
    }

    /// Deep-merge `value` into the composite value at `key`.
    pub fn merge(&mut self, key: &str, value: Value) -> Result<()> {
        let path = self.path(key);
        merge_at(&path, self.composite_mut()?, value)
    }

    /// Remove `key` from the composite. Returns whether it was present.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let path = self.path(key);
        Ok(path.delete(self.composite_mut()?))
    }

    // ---------------------------------------------------------------------
    // Writes targeted at one source
    // ---------------------------------------------------------------------

    /// Set `key` in the composite and in the named source's own tree, so a
    /// later save persists it. Nothing changes if either side would fail.
    pub fn set_in(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        let index = self.index_of(name)?;
        let path = self.path(key);
        let source_path = self.path_for(index, key);

        path.ensure_settable(self.composite()?)?;
        source_path.ensure_settable(self.entries[index].source.store())?;

        source_path.set(self.entries[index].source.store_mut(), value.clone())?;
        path.set(self.composite_mut()?, value)
    }

    /// Targeted form of [`Hierarchy::merge`].
    pub fn merge_in(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        let index = self.index_of(name)?;
        let path = self.path(key);
        let source_path = self.path_for(index, key);

        path.ensure_settable(self.composite()?)?;
        source_path.ensure_settable(self.entries[index].source.store())?;

        merge_at(
            &source_path,
            self.entries[index].source.store_mut(),
            value.clone(),
        )?;
        merge_at(&path, self.composite_mut()?, value)
    }

    /// Remove `key` from the composite and from the named source.
    pub fn delete_in(&mut self, name: &str, key: &str) -> Result<bool> {
        let index = self.index_of(name)?;
        let path = self.path(key);
        let source_path = self.path_for(index, key);

        let from_composite = path.delete(self.composite_mut()?);
        let from_source = source_path.delete(self.entries[index].source.store_mut());
        Ok(from_composite || from_source)
    }

    /// Empty every source and the composite.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.source.reset();
        }
        self.composite = Some(Arc::new(empty_tree()));
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Save every durable source's own tree.
    ///
    /// Each source is saved independently: a failure does not stop the
    /// remaining sources, and sources already written stay written. All
    /// failures are reported together in [`Error::SaveFailed`].
    pub fn save(&mut self) -> Result<()> {
        self.ensure_loaded()?;

        let mut failures = Vec::new();
        for entry in self.entries.iter().filter(|e| e.source.is_durable()) {
            match entry.source.save(&entry.name, entry.source.store()) {
                Ok(()) => debug!(source = %entry.name, "Saved source"),
                Err(cause) => {
                    warn!(source = %entry.name, error = %cause, "Failed to save source");
                    failures.push(SourceFailure {
                        name: entry.name.clone(),
                        cause,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::SaveFailed { failures })
        }
    }

    /// Save one source. Fails with [`Error::NotDurable`] for argv, env and
    /// in-memory sources.
    pub fn save_source(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        if !self.entries[index].source.is_durable() {
            return Err(Error::not_durable(name));
        }
        self.ensure_loaded()?;

        let entry = &self.entries[index];
        entry.source.save(&entry.name, entry.source.store())
    }
}
