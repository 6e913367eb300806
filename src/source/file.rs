use super::{Source, SourceKind, empty_tree};
use crate::error::{Error, Result};
use crate::format::{FileFormat, Format};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Options for [`FileSource`].
#[derive(Debug)]
pub struct FileOptions {
    pub path: PathBuf,
    pub separator: Option<String>,
    /// Built-in format; `None` picks one from the file extension.
    pub format: Option<FileFormat>,
    /// Custom encoder, taking precedence over `format`.
    pub encoder: Option<Box<dyn Format>>,
    /// Look for the file in the start directory and each of its ancestors.
    pub search: bool,
    /// Where a search starts (default: the current directory).
    pub search_from: Option<PathBuf>,
}

impl FileOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            separator: None,
            format: None,
            encoder: None,
            search: false,
            search_from: None,
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn encoder(mut self, encoder: Box<dyn Format>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn search(mut self, search: bool) -> Self {
        self.search = search;
        self
    }

    pub fn search_from(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search = true;
        self.search_from = Some(dir.into());
        self
    }
}

/// Durable source backed by a structured file on disk.
///
/// A missing file loads as an empty mapping. Saves go through a temporary
/// file in the same directory and a rename, so readers see either the old
/// content or the new content in full.
#[derive(Debug)]
pub struct FileSource {
    /// Path as configured.
    configured: PathBuf,
    /// Path actually read and written, after any search.
    path: PathBuf,
    separator: Option<String>,
    search: bool,
    search_from: Option<PathBuf>,
    format: Box<dyn Format>,
    store: Value,
}

impl FileSource {
    pub fn new(options: FileOptions) -> Self {
        let format = match (options.encoder, options.format) {
            (Some(encoder), _) => encoder,
            (None, Some(format)) => format.encoder(),
            (None, None) => FileFormat::from_path(&options.path).encoder(),
        };
        let mut source = Self {
            path: options.path.clone(),
            configured: options.path,
            separator: options.separator,
            search: options.search,
            search_from: options.search_from,
            format,
            store: empty_tree(),
        };
        source.path = source.resolve_path();
        source
    }

    /// The file this source reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    fn resolve_path(&self) -> PathBuf {
        if !self.search || self.configured.is_absolute() {
            return self.configured.clone();
        }
        let start = self
            .search_from
            .clone()
            .or_else(|| std::env::current_dir().ok());
        match start {
            Some(start) => find_upwards(&start, &self.configured)
                .unwrap_or_else(|| start.join(&self.configured)),
            None => self.configured.clone(),
        }
    }
}

/// Nearest `relative` file in `start` or one of its ancestors.
fn find_upwards(start: &Path, relative: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(relative))
        .find(|candidate| candidate.is_file())
}

impl Source for FileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    fn load(&mut self) -> Result<Value> {
        self.path = self.resolve_path();

        let tree = match fs::read_to_string(&self.path) {
            Ok(text) => {
                let tree = self
                    .format
                    .parse(&text)
                    .map_err(|e| Error::parse(&self.path, e))?;
                if !tree.is_object() {
                    return Err(Error::parse(
                        &self.path,
                        "expected a mapping at the top level",
                    ));
                }
                tree
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Config file not found, using empty mapping");
                empty_tree()
            }
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        debug!(path = %self.path.display(), format = self.format.name(), "Loaded config file");
        self.store = tree;
        Ok(self.store.clone())
    }

    fn store(&self) -> &Value {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Value {
        &mut self.store
    }

    fn save(&self, name: &str, tree: &Value) -> Result<()> {
        let text = self
            .format
            .stringify(tree)
            .map_err(|e| Error::serialize(&self.path, e))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        temp.write_all(text.as_bytes())
            .map_err(|e| Error::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;

        info!(source = %name, path = %self.path.display(), "Saved config file");
        Ok(())
    }
}
