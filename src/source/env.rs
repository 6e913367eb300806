use super::{Source, SourceKind, empty_tree, parse_value};
use crate::error::{Error, Result};
use crate::keypath::{KeyPath, split};
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Options for [`EnvSource`].
#[derive(Debug, Clone, Default)]
pub struct EnvOptions {
    /// Splits variable names into nested keys. `None` keeps names flat.
    pub separator: Option<String>,
    pub whitelist: Option<HashSet<String>>,
    pub match_pattern: Option<Regex>,
    pub lower_case: bool,
    pub parse_values: bool,
}

impl EnvOptions {
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn whitelist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Keep variables whose name matches `pattern`.
    pub fn match_pattern(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.match_pattern = Some(re);
        Ok(self)
    }

    pub fn lower_case(mut self, lower_case: bool) -> Self {
        self.lower_case = lower_case;
        self
    }

    pub fn parse_values(mut self, parse_values: bool) -> Self {
        self.parse_values = parse_values;
        self
    }

    /// With no whitelist and no pattern every variable is kept; otherwise a
    /// variable is kept if it is whitelisted or matches the pattern.
    fn accepts(&self, name: &str) -> bool {
        if self.whitelist.is_none() && self.match_pattern.is_none() {
            return true;
        }
        let listed = self
            .whitelist
            .as_ref()
            .is_some_and(|names| names.contains(name));
        let matched = self
            .match_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(name));
        listed || matched
    }
}

/// Read-only projection of environment variables into a nested tree.
#[derive(Debug, Clone)]
pub struct EnvSource {
    options: EnvOptions,
    /// Injected variables; `None` reads the process environment on load.
    vars: Option<Vec<(String, String)>>,
    store: Value,
}

impl EnvSource {
    pub fn new(options: EnvOptions) -> Self {
        Self {
            options,
            vars: None,
            store: empty_tree(),
        }
    }

    /// Project an explicit set of variables instead of the process
    /// environment.
    pub fn from_vars<I, K, V>(options: EnvOptions, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            options,
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            store: empty_tree(),
        }
    }

    pub fn options(&self) -> &EnvOptions {
        &self.options
    }

    fn build_tree(&self) -> Value {
        let mut vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };
        vars.sort();

        let mut tree = empty_tree();
        for (name, raw) in vars {
            if !self.options.accepts(&name) {
                continue;
            }

            let key = if self.options.lower_case {
                name.to_lowercase()
            } else {
                name.clone()
            };
            let segments = match &self.options.separator {
                Some(sep) => split(&key, sep),
                None => vec![key],
            };
            let path = KeyPath::from_segments(segments);
            if path.is_root() {
                continue;
            }

            let value = if self.options.parse_values {
                parse_value(&raw)
            } else {
                Value::String(raw)
            };
            if let Err(e) = path.set(&mut tree, value) {
                warn!(variable = %name, error = %e, "Skipping environment variable");
            }
        }
        tree
    }
}

impl Source for EnvSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Environment
    }

    fn load(&mut self) -> Result<Value> {
        self.store = self.build_tree();
        debug!(
            keys = self.store.as_object().map_or(0, |m| m.len()),
            "Loaded environment"
        );
        Ok(self.store.clone())
    }

    fn store(&self) -> &Value {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Value {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(options: EnvOptions, vars: &[(&str, &str)]) -> Value {
        let mut source = EnvSource::from_vars(options, vars.iter().copied());
        source.load().unwrap()
    }

    #[test]
    fn test_flat_keys_without_separator() {
        let tree = load(
            EnvOptions::default(),
            &[("FOO", "bar"), ("candy__bonbon", "sweet")],
        );
        assert_eq!(tree, json!({"FOO": "bar", "candy__bonbon": "sweet"}));
    }

    #[test]
    fn test_separator_nests_keys() {
        let tree = load(
            EnvOptions::default().separator("__"),
            &[("candy__bonbon", "sweet"), ("FOO", "bar")],
        );
        assert_eq!(tree, json!({"FOO": "bar", "candy": {"bonbon": "sweet"}}));
    }

    #[test]
    fn test_whitelist_and_pattern() {
        let options = EnvOptions::default()
            .whitelist(["HOME"])
            .match_pattern("^APP_")
            .unwrap();
        let tree = load(
            options,
            &[("HOME", "/root"), ("APP_PORT", "80"), ("PATH", "/bin")],
        );
        assert_eq!(tree, json!({"APP_PORT": "80", "HOME": "/root"}));
    }

    #[test]
    fn test_lower_case_and_parse_values() {
        let options = EnvOptions::default()
            .separator("__")
            .lower_case(true)
            .parse_values(true);
        let tree = load(
            options,
            &[("DB__PORT", "5984"), ("DB__SECURE", "true"), ("DB__HOST", "localhost")],
        );
        assert_eq!(
            tree,
            json!({"db": {"host": "localhost", "port": 5984, "secure": true}})
        );
    }

    #[test]
    fn test_values_stay_strings_by_default() {
        let tree = load(EnvOptions::default(), &[("PORT", "5984")]);
        assert_eq!(tree, json!({"PORT": "5984"}));
    }

    #[test]
    fn test_collision_with_scalar_is_skipped() {
        let tree = load(
            EnvOptions::default().separator("__"),
            &[("A__B", "nested"), ("A", "flat")],
        );
        // Sorted order applies "A" first, so "A__B" cannot descend into it
        assert_eq!(tree, json!({"A": "flat"}));
    }

    #[test]
    fn test_empty_segments_are_dropped() {
        let tree = load(
            EnvOptions::default().separator("__"),
            &[("__X____Y__", "1"), ("____", "ignored")],
        );
        assert_eq!(tree, json!({"X": {"Y": "1"}}));
    }

    #[test]
    fn test_separator_does_not_leak_into_key_addressing() {
        let source = EnvSource::new(EnvOptions::default().separator("__"));
        assert_eq!(source.separator(), None);
        assert_eq!(source.kind(), SourceKind::Environment);
    }
}
