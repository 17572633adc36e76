use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// Filter directive, e.g. `info` or `info,depot_core=debug`.
pub const ENV_LEVEL: &str = "DEPOT_LOG";
/// `text`, `json` or `journald`.
pub const ENV_FORMAT: &str = "DEPOT_LOG_FORMAT";
/// `true`/`false`; `NO_COLOR` also disables color.
pub const ENV_COLOR: &str = "DEPOT_LOG_COLOR";

/// Logger settings of a worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Any `EnvFilter` directive.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `DEPOT_LOG*` variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(level) = lookup(ENV_LEVEL).filter(|l| !l.trim().is_empty()) {
            cfg.level = level;
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            cfg.format = format.parse()?;
        }
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            cfg.use_color = false;
        }
        if let Some(color) = lookup(ENV_COLOR) {
            cfg.use_color = color.trim().parse().map_err(|_| LoggerError::InvalidEnv {
                var: ENV_COLOR,
                reason: format!("expected true or false, got {color:?}"),
            })?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"level":"debug"}"#).unwrap();
        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert!(cfg.with_targets);
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = LoggerConfig::from_lookup(lookup(&[
            (ENV_LEVEL, "warn,depot_core=trace"),
            (ENV_FORMAT, "json"),
            ("NO_COLOR", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.level, "warn,depot_core=trace");
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert!(!cfg.use_color);
    }

    #[test]
    fn empty_env_keeps_defaults() {
        let cfg = LoggerConfig::from_lookup(lookup(&[(ENV_LEVEL, "  ")])).unwrap();
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.format, LoggerFormat::Text);
    }

    #[test]
    fn bad_color_flag_is_rejected() {
        let err = LoggerConfig::from_lookup(lookup(&[(ENV_COLOR, "sometimes")])).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidEnv { var, .. } if var == ENV_COLOR));
    }

    #[test]
    fn bad_format_is_rejected() {
        let err = LoggerConfig::from_lookup(lookup(&[(ENV_FORMAT, "xml")])).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFormat(_)));
    }
}
