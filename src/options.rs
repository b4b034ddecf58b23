//! Invocation options
//!
//! Command-line style options are turned into two things: the ordered list
//! of environments for the override cascade, and a configuration delta that
//! is merged after every environment (command line wins over the file).

use crate::value::{ConfigMap, ConfigMapExt, ConfigValue};

/// Environment variable naming one more environment to apply last.
pub const ENV_VAR: &str = "BUILDCONF_ENV";

/// Environment implied by the production flag.
pub const PRODUCTION_ENV: &str = "production";

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Environments given on the command line, in order.
    pub env: Vec<String>,
    /// Production build forced from the command line.
    pub production: bool,
    /// Overrides `paths.public`.
    pub public_path: Option<String>,
    /// Run the development server.
    pub server: bool,
    /// Development server port, only used with `server`.
    pub port: Option<u16>,
    /// Keep watching after the first build.
    pub persistent: bool,
    /// Path the config was loaded from.
    pub config_path: Option<String>,
    /// Value of [`ENV_VAR`] for this process.
    pub process_env: Option<String>,
}

impl ResolveOptions {
    /// Parse a comma-separated environment list (`"staging,debug"`).
    pub fn parse_env(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Capture [`ENV_VAR`] from the process environment.
    pub fn with_process_env(mut self) -> Self {
        self.process_env = std::env::var(ENV_VAR).ok().filter(|v| !v.trim().is_empty());
        self
    }

    /// Environments in application order; later entries win.
    ///
    /// `production` comes first when forced by the flag, then the explicit
    /// list, then the process environment.
    pub fn environments(&self) -> Vec<String> {
        let mut envs: Vec<String> = Vec::new();
        if self.production {
            envs.push(PRODUCTION_ENV.to_string());
        }
        for env in &self.env {
            if !envs.contains(env) {
                envs.push(env.clone());
            }
        }
        if let Some(process_env) = self.process_env.as_deref().map(str::trim) {
            envs.retain(|env| env != process_env);
            envs.push(process_env.to_string());
        }
        envs
    }

    pub fn is_production(&self) -> bool {
        self.production || self.environments().iter().any(|env| env == PRODUCTION_ENV)
    }

    /// Configuration delta contributed by the command line.
    pub fn cli_delta(&self) -> ConfigMap {
        let mut delta = ConfigMap::new();
        if let Some(public) = &self.public_path {
            delta
                .map_entry("paths")
                .insert("public".to_string(), public.as_str().into());
        }
        if self.server {
            let server = delta.map_entry("server");
            server.insert("run".to_string(), true.into());
            if let Some(port) = self.port {
                server.insert("port".to_string(), port.into());
            }
        }
        delta.insert("persistent".to_string(), ConfigValue::Bool(self.persistent));
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_env() {
        assert_eq!(ResolveOptions::parse_env("staging, debug,,"), envs(&["staging", "debug"]));
        assert!(ResolveOptions::parse_env("").is_empty());
    }

    #[test]
    fn test_environments_in_order() {
        let opts = ResolveOptions {
            env: envs(&["staging", "debug"]),
            ..Default::default()
        };
        assert_eq!(opts.environments(), envs(&["staging", "debug"]));
        assert!(!opts.is_production());
    }

    #[test]
    fn test_production_flag_prepends() {
        let opts = ResolveOptions {
            env: envs(&["staging"]),
            production: true,
            ..Default::default()
        };
        assert_eq!(opts.environments(), envs(&["production", "staging"]));
        assert!(opts.is_production());
    }

    #[test]
    fn test_production_env_without_flag() {
        let opts = ResolveOptions {
            env: envs(&["production"]),
            ..Default::default()
        };
        assert!(opts.is_production());
    }

    #[test]
    fn test_process_env_applied_last() {
        let opts = ResolveOptions {
            env: envs(&["ci", "staging"]),
            process_env: Some("ci".to_string()),
            ..Default::default()
        };
        assert_eq!(opts.environments(), envs(&["staging", "ci"]));
    }

    #[test]
    fn test_cli_delta() {
        let opts = ResolveOptions {
            public_path: Some("dist".to_string()),
            server: true,
            port: Some(8080),
            persistent: true,
            ..Default::default()
        };
        let delta = ConfigValue::Map(opts.cli_delta());
        assert_eq!(delta.get_path("paths.public").and_then(ConfigValue::as_str), Some("dist"));
        assert_eq!(delta.get_path("server.run"), Some(&ConfigValue::Bool(true)));
        assert_eq!(delta.get_path("server.port").and_then(ConfigValue::as_u64), Some(8080));
        assert_eq!(delta.get("persistent"), Some(&ConfigValue::Bool(true)));
    }

    #[test]
    fn test_cli_delta_port_needs_server() {
        let opts = ResolveOptions {
            port: Some(8080),
            ..Default::default()
        };
        let delta = ConfigValue::Map(opts.cli_delta());
        assert!(delta.get("server").is_none());
    }
}
