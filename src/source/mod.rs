//! Configuration sources.
//!
//! Every source produces a nested snapshot on [`Source::load`] and keeps its
//! last-known tree available through [`Source::store`]. Only durable sources
//! (files) can be written back with [`Source::save`].
//!
//! | Kind          | Type           | Durable |
//! |---------------|----------------|---------|
//! | `Literal`     | `MemorySource` | no      |
//! | `Memory`      | `MemorySource` | no      |
//! | `Environment` | `EnvSource`    | no      |
//! | `Argv`        | `ArgvSource`   | no      |
//! | `File`        | `FileSource`   | yes     |

mod argv;
mod env;
mod file;
mod memory;

pub use argv::{ArgvOptions, ArgvSource};
pub use env::{EnvOptions, EnvSource};
pub use file::{FileOptions, FileSource};
pub use memory::MemorySource;

use crate::error::{Error, Result};
use crate::format::FileFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// The variant a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Literal,
    Environment,
    Argv,
    File,
    Memory,
}

impl SourceKind {
    /// Transient kinds are read-only projections that never reach disk.
    pub fn is_transient(self) -> bool {
        matches!(self, SourceKind::Environment | SourceKind::Argv)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Literal => write!(f, "literal"),
            SourceKind::Environment => write!(f, "env"),
            SourceKind::Argv => write!(f, "argv"),
            SourceKind::File => write!(f, "file"),
            SourceKind::Memory => write!(f, "memory"),
        }
    }
}

/// A named provider of a nested configuration snapshot.
///
/// Implement this trait to plug in a custom source (for example a remote
/// store). The hierarchy only relies on these methods.
pub trait Source: fmt::Debug {
    fn kind(&self) -> SourceKind;

    fn is_durable(&self) -> bool {
        false
    }

    /// Separator for keys addressed directly at this source, if it differs
    /// from the hierarchy's.
    fn separator(&self) -> Option<&str> {
        None
    }

    /// Refresh the store from the backing medium and return a snapshot.
    fn load(&mut self) -> Result<Value>;

    /// Last-known tree, including direct mutations since the last load.
    fn store(&self) -> &Value;

    fn store_mut(&mut self) -> &mut Value;

    /// Empty the in-memory store.
    fn reset(&mut self) {
        *self.store_mut() = empty_tree();
    }

    /// Persist `tree` to the backing medium.
    ///
    /// `name` is the registered source name, used in errors.
    fn save(&self, name: &str, tree: &Value) -> Result<()> {
        let _ = tree;
        Err(Error::not_durable(name))
    }
}

/// Serializable source descriptor accepted by [`crate::Hierarchy::add`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceOptions {
    File {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
        /// Defaults to detection by file extension.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<FileFormat>,
        #[serde(default)]
        search: bool,
    },
    Env {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        whitelist: Option<HashSet<String>>,
        #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
        match_pattern: Option<String>,
        #[serde(default)]
        lower_case: bool,
        #[serde(default)]
        parse_values: bool,
    },
    Argv {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
        #[serde(default)]
        parse_values: bool,
    },
    Memory {
        #[serde(default = "empty_tree")]
        store: Value,
    },
    Literal {
        #[serde(default = "empty_tree")]
        store: Value,
    },
}

impl SourceOptions {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceOptions::File { .. } => SourceKind::File,
            SourceOptions::Env { .. } => SourceKind::Environment,
            SourceOptions::Argv { .. } => SourceKind::Argv,
            SourceOptions::Memory { .. } => SourceKind::Memory,
            SourceOptions::Literal { .. } => SourceKind::Literal,
        }
    }

    /// Build the source this descriptor describes.
    ///
    /// Env and argv sources read the live process environment and arguments.
    pub fn build(self) -> Result<Box<dyn Source>> {
        let source: Box<dyn Source> = match self {
            SourceOptions::File {
                path,
                separator,
                format,
                search,
            } => {
                let mut options = FileOptions::new(path).search(search);
                if let Some(sep) = separator {
                    options = options.separator(sep);
                }
                if let Some(format) = format {
                    options = options.format(format);
                }
                Box::new(FileSource::new(options))
            }
            SourceOptions::Env {
                separator,
                whitelist,
                match_pattern,
                lower_case,
                parse_values,
            } => {
                let mut options = EnvOptions::default()
                    .lower_case(lower_case)
                    .parse_values(parse_values);
                if let Some(sep) = separator {
                    options = options.separator(sep);
                }
                if let Some(names) = whitelist {
                    options = options.whitelist(names);
                }
                if let Some(pattern) = match_pattern {
                    options = options.match_pattern(&pattern)?;
                }
                Box::new(EnvSource::new(options))
            }
            SourceOptions::Argv {
                separator,
                parse_values,
            } => {
                let mut options = ArgvOptions::default().parse_values(parse_values);
                if let Some(sep) = separator {
                    options = options.separator(sep);
                }
                Box::new(ArgvSource::new(options))
            }
            SourceOptions::Memory { store } => Box::new(MemorySource::memory(store)),
            SourceOptions::Literal { store } => Box::new(MemorySource::literal(store)),
        };
        Ok(source)
    }
}

pub(crate) fn empty_tree() -> Value {
    Value::Object(Default::default())
}

/// Interpret a raw string the way `parse_values` options ask for: JSON if it
/// parses, the raw string otherwise.
pub(crate) fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
