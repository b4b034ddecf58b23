//! Configuration value tree
//!
//! The raw configuration is an open-ended tree of mappings, lists and
//! scalars, plus two leaf kinds file formats cannot express on their own:
//! compiled regular expressions and predicate functions. Mappings keep
//! insertion order; declaration order decides which of two conflicting
//! declarations wins.

use buildconf_matcher::{MatcherError, Pattern, Predicate};
use indexmap::IndexMap;
use regex_lite::Regex;
use serde_json::{Number, Value};

use crate::error::ConfigError;

/// Ordered mapping node.
pub type ConfigMap = IndexMap<String, ConfigValue>;

#[derive(Debug, Clone)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
    Regex(Regex),
    Predicate(Predicate),
}

impl ConfigValue {
    pub fn map() -> Self {
        ConfigValue::Map(ConfigMap::new())
    }

    pub fn string(s: impl Into<String>) -> Self {
        ConfigValue::String(s.into())
    }

    /// Compile a regex leaf for the setting at `key`.
    pub fn regex(key: &str, source: &str) -> Result<Self, ConfigError> {
        Regex::new(source)
            .map(ConfigValue::Regex)
            .map_err(|e| ConfigError::Pattern {
                key: key.to_string(),
                source: MatcherError::InvalidRegex {
                    pattern: source.to_string(),
                    reason: e.to_string(),
                },
            })
    }

    pub fn predicate<F>(func: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        ConfigValue::Predicate(Predicate::new(func))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, ConfigValue::Map(_))
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigValue::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Number(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::List(_) => "list",
            ConfigValue::Map(_) => "mapping",
            ConfigValue::Regex(_) => "regex",
            ConfigValue::Predicate(_) => "predicate",
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map()?.get(key)
    }

    /// Look up a dot-separated path (`paths.public`).
    pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
        let mut current = self;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Convert into a matcher pattern. `key` names the field in errors.
    pub fn to_pattern(&self, key: &str) -> Result<Pattern, ConfigError> {
        match self {
            ConfigValue::String(s) => Pattern::parse(s).map_err(|source| ConfigError::Pattern {
                key: key.to_string(),
                source,
            }),
            ConfigValue::Regex(re) => Ok(Pattern::Regex(re.clone())),
            ConfigValue::Predicate(p) => Ok(Pattern::Predicate(p.clone())),
            ConfigValue::List(items) => items
                .iter()
                .map(|item| item.to_pattern(key))
                .collect::<Result<Vec<_>, _>>()
                .map(Pattern::Any),
            other => Err(ConfigError::structural(
                key,
                format!(
                    "expected a string, regex, predicate or list of patterns, got {}",
                    other.kind()
                ),
            )),
        }
    }

    /// Render as JSON. Regexes become `/source/`, predicates `"[predicate]"`.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::Null => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Number(n) => Value::Number(n.clone()),
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ConfigValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            ConfigValue::Regex(re) => Value::String(format!("/{}/", re.as_str())),
            ConfigValue::Predicate(_) => Value::String("[predicate]".to_string()),
        }
    }
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigValue::Null, ConfigValue::Null) => true,
            (ConfigValue::Bool(a), ConfigValue::Bool(b)) => a == b,
            (ConfigValue::Number(a), ConfigValue::Number(b)) => a == b,
            (ConfigValue::String(a), ConfigValue::String(b)) => a == b,
            (ConfigValue::List(a), ConfigValue::List(b)) => a == b,
            (ConfigValue::Map(a), ConfigValue::Map(b)) => a == b,
            (ConfigValue::Regex(a), ConfigValue::Regex(b)) => a.as_str() == b.as_str(),
            (ConfigValue::Predicate(a), ConfigValue::Predicate(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => ConfigValue::Number(n),
            Value::String(s) => ConfigValue::String(s),
            Value::Array(items) => ConfigValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                ConfigValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<u16> for ConfigValue {
    fn from(n: u16) -> Self {
        ConfigValue::Number(n.into())
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(map: ConfigMap) -> Self {
        ConfigValue::Map(map)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> Self {
        ConfigValue::List(items)
    }
}

/// Mutable helpers for mapping nodes.
pub trait ConfigMapExt {
    /// Insert `value` when `key` is missing or null.
    fn set_default(&mut self, key: &str, value: impl Into<ConfigValue>);

    /// Mapping child under `key`, replacing a missing, null or non-mapping
    /// value with an empty mapping first.
    fn map_entry(&mut self, key: &str) -> &mut ConfigMap;

    /// Whether `key` holds a non-null value.
    fn has(&self, key: &str) -> bool;
}

impl ConfigMapExt for ConfigMap {
    fn set_default(&mut self, key: &str, value: impl Into<ConfigValue>) {
        if !self.has(key) {
            self.insert(key.to_string(), value.into());
        }
    }

    fn map_entry(&mut self, key: &str) -> &mut ConfigMap {
        let slot = self.entry(key.to_string()).or_insert_with(ConfigValue::map);
        if !slot.is_map() {
            *slot = ConfigValue::map();
        }
        match slot {
            ConfigValue::Map(map) => map,
            _ => unreachable!("slot was just set to a mapping"),
        }
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }
}

/// Strings of a value that is either one string or a list of strings.
///
/// Returns `None` when the value has any other shape.
pub fn string_or_list(value: &ConfigValue) -> Option<Vec<String>> {
    match value {
        ConfigValue::String(s) => Some(vec![s.clone()]),
        ConfigValue::List(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}
