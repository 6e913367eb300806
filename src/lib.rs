//! Hierarchical configuration.
//!
//! A [`Hierarchy`] holds named sources in priority order: command-line
//! arguments, environment variables, files and in-memory literals. Loading
//! deep-merges them into one composite tree, read and written with
//! separator-delimited keys such as `database:host`.

pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod keypath;
pub mod logging;
pub mod merge;
pub mod source;

pub use error::{Error, ErrorCode, Result, SourceFailure};
pub use format::{FileFormat, Format, JsonFormat, YamlFormat};
pub use hierarchy::Hierarchy;
pub use keypath::{DEFAULT_SEPARATOR, KeyPath};
pub use merge::{deep_merge, deep_merge_all, deep_merge_into};
pub use source::{
    ArgvOptions, ArgvSource, EnvOptions, EnvSource, FileOptions, FileSource, MemorySource, Source,
    SourceKind, SourceOptions,
};
