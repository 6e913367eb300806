//! File encodings for file-backed sources.
//!
//! A [`Format`] converts between on-disk text and a nested [`Value`].
//! JSON is the default; YAML is selected explicitly or by extension.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Encoding capability used by [`crate::source::FileSource`].
pub trait Format: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Parse file contents into a nested value.
    fn parse(&self, text: &str) -> Result<Value, String>;

    /// Serialize a nested value into file contents.
    fn stringify(&self, value: &Value) -> Result<String, String>;
}

/// Pretty-printed JSON with two-space indentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<Value, String> {
        // An empty file behaves like a missing one
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    fn stringify(&self, value: &Value) -> Result<String, String> {
        let mut text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
        text.push('\n');
        Ok(text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl Format for YamlFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, text: &str) -> Result<Value, String> {
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    }

    fn stringify(&self, value: &Value) -> Result<String, String> {
        serde_yaml::to_string(value).map_err(|e| e.to_string())
    }
}

/// Built-in format selector, usable from serialized source descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Json,
    Yaml,
}

impl FileFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    /// Pick a format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
            .unwrap_or_default()
    }

    pub fn encoder(self) -> Box<dyn Format> {
        match self {
            FileFormat::Json => Box::new(JsonFormat),
            FileFormat::Yaml => Box::new(YamlFormat),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Json => write!(f, "json"),
            FileFormat::Yaml => write!(f, "yaml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_str() {
        assert_eq!(FileFormat::from_str("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_str("yml"), Some(FileFormat::Yaml));
        assert_eq!(FileFormat::from_str("toml"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path(Path::new("a/config.yaml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("config.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("config")), FileFormat::Json);
    }

    #[test]
    fn test_json_pretty_output() {
        let text = JsonFormat
            .stringify(&json!({"database": {"host": "127.0.0.1"}}))
            .unwrap();
        assert_eq!(text, "{\n  \"database\": {\n    \"host\": \"127.0.0.1\"\n  }\n}\n");
    }

    #[test]
    fn test_json_parse_error() {
        assert!(JsonFormat.parse("{\"a\": ").is_err());
    }

    #[test]
    fn test_empty_text_is_empty_mapping() {
        assert_eq!(JsonFormat.parse("  \n").unwrap(), json!({}));
        assert_eq!(YamlFormat.parse("").unwrap(), json!({}));
    }

    #[test]
    fn test_yaml_parse_nested() {
        let value = YamlFormat
            .parse("server:\n  port: 9000\n  tags: [a, b]\n")
            .unwrap();
        assert_eq!(value, json!({"server": {"port": 9000, "tags": ["a", "b"]}}));
    }

    #[test]
    fn test_yaml_stringify_parses_back() {
        let value = json!({"a": {"b": [1, 2]}, "c": "text"});
        let text = YamlFormat.stringify(&value).unwrap();
        assert_eq!(YamlFormat.parse(&text).unwrap(), value);
    }
}
