//! Convenience registration for the common source layouts.
//!
//! These extend [`Hierarchy`] with one call per source kind. Names are fixed
//! for the transient sources (`argv`, `env`) and the pinned literals
//! (`defaults`, `overrides`); files take a caller-chosen name.

use crate::error::Result;
use crate::hierarchy::{Hierarchy, Placement};
use crate::source::{
    ArgvOptions, ArgvSource, EnvOptions, EnvSource, FileOptions, FileSource, MemorySource,
    SourceOptions,
};
use serde_json::Value;
use std::path::PathBuf;

pub const ARGV: &str = "argv";
pub const ENV: &str = "env";
pub const DEFAULTS: &str = "defaults";
pub const OVERRIDES: &str = "overrides";

impl Hierarchy {
    /// Register a source described by a serializable descriptor.
    pub fn add(&mut self, name: &str, options: SourceOptions) -> Result<&mut Self> {
        let source = options.build()?;
        self.register(name, source, Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register the process arguments as `"argv"`.
    pub fn argv(&mut self, options: ArgvOptions) -> Result<&mut Self> {
        self.register(ARGV, Box::new(ArgvSource::new(options)), Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register explicit argument tokens as `"argv"`.
    pub fn argv_from<I, S>(&mut self, options: ArgvOptions, args: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = ArgvSource::from_args(options, args);
        self.register(ARGV, Box::new(source), Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register the process environment as `"env"`.
    pub fn env(&mut self, options: EnvOptions) -> Result<&mut Self> {
        self.register(ENV, Box::new(EnvSource::new(options)), Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register explicit variables as `"env"`.
    pub fn env_from<I, K, V>(&mut self, options: EnvOptions, vars: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = EnvSource::from_vars(options, vars);
        self.register(ENV, Box::new(source), Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register a file with default options.
    pub fn file(&mut self, name: &str, path: impl Into<PathBuf>) -> Result<&mut Self> {
        self.file_with(name, FileOptions::new(path))
    }

    pub fn file_with(&mut self, name: &str, options: FileOptions) -> Result<&mut Self> {
        let source = FileSource::new(options);
        self.register(name, Box::new(source), Placement::Ordered, None)?;
        Ok(self)
    }

    /// Register `tree` as `"defaults"`, below every other source.
    pub fn defaults(&mut self, tree: Value) -> Result<&mut Self> {
        let source = MemorySource::literal(tree);
        self.register(DEFAULTS, Box::new(source), Placement::Bottom, None)?;
        Ok(self)
    }

    /// Register `tree` as `"overrides"`, above every other source.
    pub fn overrides(&mut self, tree: Value) -> Result<&mut Self> {
        let source = MemorySource::literal(tree);
        self.register(OVERRIDES, Box::new(source), Placement::Top, None)?;
        Ok(self)
    }
}
