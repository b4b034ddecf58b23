//! Config file loading
//!
//! Reads the raw configuration tree from a TOML or JSON file. TOML is
//! converted through JSON so both formats produce the same tree shape.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::value::ConfigValue;

/// File extensions recognized as configuration files, in lookup order.
pub const CONFIG_EXTENSIONS: &[&str] = &["toml", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

/// A raw configuration tree with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub value: ConfigValue,
    pub path: PathBuf,
    /// SHA-256 digest of the raw file bytes
    pub digest: String,
}

/// Find the config file for `base` (a path without extension).
///
/// Tries each of [`CONFIG_EXTENSIONS`] in order.
pub fn locate_config(base: &Path) -> Result<PathBuf, ConfigError> {
    let candidates: Vec<PathBuf> = CONFIG_EXTENSIONS
        .iter()
        .map(|ext| base.with_extension(ext))
        .collect();
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            ConfigError::NotFound(
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            )
        })
}

/// Load and parse a config file, returning the tree and digest
pub fn load_config_file(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: format!("invalid UTF-8: {}", e),
    })?;

    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: format!("unsupported extension, expected one of: {}", CONFIG_EXTENSIONS.join(", ")),
    })?;

    let value = parse_config_str(&contents, format).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(LoadedConfig {
        value,
        path: path.to_path_buf(),
        digest,
    })
}

/// Parse config text in the given format.
pub fn parse_config_str(contents: &str, format: ConfigFormat) -> Result<ConfigValue, String> {
    let json = match format {
        ConfigFormat::Json => {
            serde_json::from_str::<Value>(contents).map_err(|e| format!("JSON parse error: {}", e))?
        }
        ConfigFormat::Toml => {
            let table: toml::Value =
                toml::from_str(contents).map_err(|e| format!("TOML parse error: {}", e))?;
            toml_to_json(table)
        }
    };
    Ok(json.into())
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    #[test]
    fn test_load_toml_file() {
        let mut temp = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(temp, "[files.javascripts]").unwrap();
        writeln!(temp, "joinTo = \"app.js\"").unwrap();
        writeln!(temp, "[server]").unwrap();
        writeln!(temp, "port = 8080").unwrap();

        let loaded = load_config_file(temp.path()).unwrap();

        assert_eq!(
            loaded.value.get_path("files.javascripts.joinTo").and_then(ConfigValue::as_str),
            Some("app.js")
        );
        assert_eq!(loaded.value.get_path("server.port").and_then(ConfigValue::as_u64), Some(8080));
        assert_eq!(loaded.digest.len(), 64);
    }

    #[test]
    fn test_load_json_file_keeps_order() {
        let mut temp = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            temp,
            r#"{{"files": {{"javascripts": {{"joinTo": {{"z.js": "/^z/", "a.js": "/^a/"}}}}}}}}"#
        )
        .unwrap();

        let loaded = load_config_file(temp.path()).unwrap();
        let join_to = loaded.value.get_path("files.javascripts.joinTo").unwrap();
        let keys: Vec<&String> = join_to.as_map().unwrap().keys().collect();
        assert_eq!(keys, ["z.js", "a.js"]);
    }

    #[test]
    fn test_digest_is_stable() {
        let mut a = Builder::new().suffix(".json").tempfile().unwrap();
        let mut b = Builder::new().suffix(".json").tempfile().unwrap();
        write!(a, r#"{{"files": {{}}}}"#).unwrap();
        write!(b, r#"{{"files": {{}}}}"#).unwrap();
        assert_eq!(
            load_config_file(a.path()).unwrap().digest,
            load_config_file(b.path()).unwrap().digest
        );
    }

    #[test]
    fn test_invalid_toml_errors() {
        let mut temp = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(temp, "this is not valid toml {{{{}}}}").unwrap();
        let err = load_config_file(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_unknown_extension_errors() {
        let temp = Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = load_config_file(temp.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported extension"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config_file(Path::new("/nonexistent/buildconf.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_locate_prefers_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("buildconf.json"), "{}").unwrap();
        fs::write(dir.path().join("buildconf.toml"), "").unwrap();
        let found = locate_config(&dir.path().join("buildconf")).unwrap();
        assert_eq!(found.extension().and_then(|e| e.to_str()), Some("toml"));
    }

    #[test]
    fn test_locate_falls_back_to_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("buildconf.json"), "{}").unwrap();
        let found = locate_config(&dir.path().join("buildconf")).unwrap();
        assert_eq!(found.extension().and_then(|e| e.to_str()), Some("json"));
    }

    #[test]
    fn test_locate_not_found() {
        let dir = TempDir::new().unwrap();
        let err = locate_config(&dir.path().join("buildconf")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(ref tried) if tried.len() == 2));
    }
}
