//! YAML-backed configuration with dotted-key lookup.
//!
//! A configuration document is a mapping of sections to options. Section
//! names may themselves contain dots (`canari.local`), so dotted lookup
//! keys split at the last dot: `"canari.local.path"` reads option `path`
//! from section `canari.local`. Values arrive already coerced to a typed
//! [`ConfigValue`]; transforms receive the whole object through
//! `do_transform` and the message layer never touches it.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Error type for configuration loading and key handling.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    /// A lookup or set key without a section prefix.
    InvalidKey(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConfigError::InvalidKey(key) => {
                write!(f, "Configuration keys must be \"section.option\", got {:?}", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

/// A typed configuration value.
///
/// Untagged: YAML scalars deserialize into the first matching variant, so
/// `true` is a bool, `8080` an int, `1.5` a float, and anything else a
/// string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers coerce to float here; YAML `10` is a valid float option.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(fl) => write!(f, "{}", fl),
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::List(l) => write!(f, "{:?}", l),
        }
    }
}

/// Section-structured configuration with dotted-key access.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    sections: IndexMap<String, IndexMap<String, ConfigValue>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Option lookup by dotted key, split at the last dot. Missing sections
    /// and missing options both read as `None`.
    pub fn get(&self, dotted_key: &str) -> Option<&ConfigValue> {
        let (section, option) = dotted_key.rsplit_once('.')?;
        self.sections.get(section)?.get(option)
    }

    /// Inserts an option, creating its section on first use.
    pub fn set(&mut self, dotted_key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let (section, option) = dotted_key
            .rsplit_once('.')
            .ok_or_else(|| ConfigError::InvalidKey(dotted_key.to_string()))?;
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value);
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, ConfigValue>> {
        self.sections.get(name)
    }
}
