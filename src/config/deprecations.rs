//! Legacy field detection
//!
//! Legacy fields are reported, never rejected. The only one with an effect
//! is `onCompile`, which moves to `hooks.onCompile`.

use crate::diagnostics::Diagnostics;
use crate::value::{ConfigMap, ConfigMapExt, ConfigValue};

/// Report legacy fields in `config` and migrate `onCompile`.
pub fn check_deprecations(config: &mut ConfigMap, diags: &mut Diagnostics) {
    if let Some(ConfigValue::Map(paths)) = config.get("paths") {
        check_paths(paths, diags);
    }

    if let Some(ConfigValue::Map(files)) = config.get("files") {
        for (asset_type, type_section) in files {
            if type_section.get("defaultExtension").is_some() {
                diags.deprecation(format!(
                    "config.files.{}.defaultExtension was removed, the extension is taken from the compiler",
                    asset_type
                ));
            }
        }
    }

    if let Some(on_compile) = config.get("onCompile").filter(|v| !v.is_null()).cloned() {
        // A malformed `hooks` is left for the validator to reject.
        if matches!(config.get("hooks"), None | Some(ConfigValue::Null | ConfigValue::Map(_))) {
            config.map_entry("hooks").set_default("onCompile", on_compile);
        }
        diags.deprecation("config.onCompile was moved to config.hooks.onCompile");
    }

    if config.has("rootPath") {
        diags.deprecation("config.rootPath was renamed to config.paths.root");
    }
    if config.has("buildPath") {
        diags.deprecation("config.buildPath was renamed to config.paths.public");
    }
}

fn check_paths(paths: &ConfigMap, diags: &mut Diagnostics) {
    if paths.has("app") {
        diags.deprecation("config.paths.app was removed, use config.paths.watched");
    }
    for key in ["test", "vendor", "assets"] {
        match paths.get(key) {
            Some(ConfigValue::List(_)) => diags.deprecation(format!(
                "config.paths.{} as a list is deprecated, use config.conventions.{}",
                key,
                if key == "test" { "ignored" } else { key }
            )),
            Some(value) if !value.is_null() => diags.deprecation(format!(
                "config.paths.{} was removed, use config.paths.watched",
                key
            )),
            _ => {}
        }
    }
    if paths.has("ignored") {
        diags.deprecation("config.paths.ignored was moved to config.conventions.ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use serde_json::json;

    fn run(value: serde_json::Value) -> (ConfigMap, Vec<String>) {
        let mut config = match ConfigValue::from(value) {
            ConfigValue::Map(map) => map,
            _ => panic!("test config must be a mapping"),
        };
        let mut diags = Diagnostics::new();
        check_deprecations(&mut config, &mut diags);
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::Deprecation));
        let messages = diags.iter().map(|d| d.message.clone()).collect();
        (config, messages)
    }

    #[test]
    fn test_clean_config_has_no_diagnostics() {
        let (_, messages) = run(json!({"files": {"javascripts": {"joinTo": "app.js"}}}));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_legacy_paths() {
        let (_, messages) = run(json!({
            "paths": {"app": "app", "vendor": ["vendor"], "assets": "assets", "ignored": "/_/"}
        }));
        assert_eq!(messages.len(), 4);
        assert!(messages[0].contains("paths.app"));
        assert!(messages[1].contains("conventions.vendor"));
        assert!(messages[2].contains("paths.assets was removed"));
        assert!(messages[3].contains("conventions.ignored"));
    }

    #[test]
    fn test_default_extension() {
        let (_, messages) = run(json!({"files": {"stylesheets": {"defaultExtension": "scss"}}}));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("files.stylesheets.defaultExtension"));
    }

    #[test]
    fn test_on_compile_migrated() {
        let (config, messages) = run(json!({"onCompile": "notify"}));
        assert_eq!(messages, ["config.onCompile was moved to config.hooks.onCompile"]);
        assert_eq!(
            config["hooks"].get("onCompile").and_then(ConfigValue::as_str),
            Some("notify")
        );
    }

    #[test]
    fn test_on_compile_does_not_clobber_hook() {
        let (config, _) = run(json!({"onCompile": "old", "hooks": {"onCompile": "new"}}));
        assert_eq!(
            config["hooks"].get("onCompile").and_then(ConfigValue::as_str),
            Some("new")
        );
    }

    #[test]
    fn test_root_and_build_path() {
        let (_, messages) = run(json!({"rootPath": ".", "buildPath": "out"}));
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("paths.root"));
        assert!(messages[1].contains("paths.public"));
    }
}
