use super::{Source, SourceKind};
use crate::error::Result;
use serde_json::Value;

/// In-memory tree. Backs both `Memory` and `Literal` sources; the two differ
/// only in the kind they report.
#[derive(Debug, Clone)]
pub struct MemorySource {
    kind: SourceKind,
    store: Value,
}

impl MemorySource {
    pub fn memory(store: Value) -> Self {
        Self {
            kind: SourceKind::Memory,
            store,
        }
    }

    /// A literal source, as registered by `defaults()` and `overrides()`.
    pub fn literal(store: Value) -> Self {
        Self {
            kind: SourceKind::Literal,
            store,
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::memory(super::empty_tree())
    }
}

impl Source for MemorySource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn load(&mut self) -> Result<Value> {
        Ok(self.store.clone())
    }

    fn store(&self) -> &Value {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Value {
        &mut self.store
    }
}
