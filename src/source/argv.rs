use super::{Source, SourceKind, empty_tree, parse_value};
use crate::error::Result;
use crate::keypath::{DEFAULT_SEPARATOR, KeyPath, split};
use serde_json::Value;
use tracing::{debug, warn};

/// Options for [`ArgvSource`].
#[derive(Debug, Clone)]
pub struct ArgvOptions {
    /// Splits flag names into nested keys (default `:`).
    pub separator: String,
    pub parse_values: bool,
}

impl Default for ArgvOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            parse_values: false,
        }
    }
}

impl ArgvOptions {
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn parse_values(mut self, parse_values: bool) -> Self {
        self.parse_values = parse_values;
        self
    }
}

/// Read-only projection of command-line flags into a nested tree.
///
/// Recognized forms:
/// - `--key value` and `--key=value`
/// - `--flag` (no value follows) → `true`
/// - `--no-flag` → `false`
/// - `-k` is read like `--k`
/// - a lone `--` ends flag parsing; everything after it is positional
#[derive(Debug, Clone)]
pub struct ArgvSource {
    options: ArgvOptions,
    /// Injected tokens; `None` reads `std::env::args().skip(1)` on load.
    args: Option<Vec<String>>,
    positionals: Vec<String>,
    store: Value,
}

impl ArgvSource {
    pub fn new(options: ArgvOptions) -> Self {
        Self {
            options,
            args: None,
            positionals: Vec::new(),
            store: empty_tree(),
        }
    }

    pub fn from_args<I, S>(options: ArgvOptions, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options,
            args: Some(args.into_iter().map(Into::into).collect()),
            positionals: Vec::new(),
            store: empty_tree(),
        }
    }

    /// Tokens from the last load that were neither flags nor flag values.
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    fn parse(&self, args: &[String]) -> (Value, Vec<String>) {
        let mut tree = empty_tree();
        let mut positionals = Vec::new();
        let mut tokens = args.iter().peekable();

        while let Some(token) = tokens.next() {
            if token == "--" {
                positionals.extend(tokens.by_ref().cloned());
                break;
            }

            let Some(body) = flag_body(token) else {
                positionals.push(token.clone());
                continue;
            };

            let (name, value) = if let Some((name, raw)) = body.split_once('=') {
                (name, self.value_of(raw))
            } else if let Some(name) = body.strip_prefix("no-") {
                (name, Value::Bool(false))
            } else if let Some(raw) = tokens.next_if(|next| flag_body(next).is_none() && *next != "--")
            {
                (body, self.value_of(raw))
            } else {
                (body, Value::Bool(true))
            };

            let path = KeyPath::from_segments(split(name, &self.options.separator));
            if path.is_root() {
                continue;
            }
            if let Err(e) = path.set(&mut tree, value) {
                warn!(flag = %token, error = %e, "Skipping command-line flag");
            }
        }

        (tree, positionals)
    }

    fn value_of(&self, raw: &str) -> Value {
        if self.options.parse_values {
            parse_value(raw)
        } else {
            Value::String(raw.to_string())
        }
    }
}

/// The flag name without its dashes, or `None` for a non-flag token.
/// Negative numbers are values, not flags.
fn flag_body(token: &str) -> Option<&str> {
    let body = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    if body.is_empty() || body.parse::<f64>().is_ok() {
        return None;
    }
    Some(body)
}

impl Source for ArgvSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Argv
    }

    fn load(&mut self) -> Result<Value> {
        let args: Vec<String> = match &self.args {
            Some(args) => args.clone(),
            None => std::env::args().skip(1).collect(),
        };
        let (tree, positionals) = self.parse(&args);
        debug!(tokens = args.len(), positionals = positionals.len(), "Loaded argv");
        self.store = tree;
        self.positionals = positionals;
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

    fn load(options: ArgvOptions, args: &[&str]) -> ArgvSource {
        let mut source = ArgvSource::from_args(options, args.iter().copied());
        source.load().unwrap();
        source
    }

    #[test]
    fn test_key_value_pairs() {
        let source = load(ArgvOptions::default(), &["--foo", "foo", "--bar", "bar"]);
        assert_eq!(source.store(), &json!({"foo": "foo", "bar": "bar"}));
    }

    #[test]
    fn test_nested_keys_default_separator() {
        let source = load(
            ArgvOptions::default(),
            &["--candy:something", "foo", "--candy:something5:second", "bar"],
        );
        assert_eq!(
            source.store(),
            &json!({"candy": {"something": "foo", "something5": {"second": "bar"}}})
        );
    }

    #[test]
    fn test_custom_separator() {
        let source = load(
            ArgvOptions::default().separator("--"),
            &["--candy--something", "foo", "--candy--something5--second", "bar"],
        );
        assert_eq!(
            source.store(),
            &json!({"candy": {"something": "foo", "something5": {"second": "bar"}}})
        );
    }

    #[test]
    fn test_boolean_flags() {
        let source = load(
            ArgvOptions::default(),
            &["--verbose", "--no-color", "--debug", "-x"],
        );
        assert_eq!(
            source.store(),
            &json!({"verbose": true, "color": false, "debug": true, "x": true})
        );
    }

    #[test]
    fn test_equals_form_and_negative_numbers() {
        let source = load(
            ArgvOptions::default().parse_values(true),
            &["--port=8080", "--offset", "-5", "--name=a=b"],
        );
        assert_eq!(
            source.store(),
            &json!({"port": 8080, "offset": -5, "name": "a=b"})
        );
    }

    #[test]
    fn test_values_stay_strings_by_default() {
        let source = load(ArgvOptions::default(), &["--port", "8080"]);
        assert_eq!(source.store(), &json!({"port": "8080"}));
    }

    #[test]
    fn test_positionals_and_terminator() {
        let source = load(
            ArgvOptions::default(),
            &["serve", "--flag", "--", "--not-a-flag", "file.txt"],
        );
        assert_eq!(source.store(), &json!({"flag": true}));
        assert_eq!(source.positionals(), ["serve", "--not-a-flag", "file.txt"]);
    }

    #[test]
    fn test_later_flags_override() {
        let source = load(ArgvOptions::default(), &["--a", "1", "--a", "2"]);
        assert_eq!(source.store(), &json!({"a": "2"}));
    }

    #[test]
    fn test_collision_with_scalar_is_skipped() {
        let source = load(ArgvOptions::default(), &["--a", "flat", "--a:b", "nested"]);
        assert_eq!(source.store(), &json!({"a": "flat"}));
    }
}
