// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_LOG_FILTER, DEFAULT_MAX_CONCURRENCY, MAX_CONCURRENCY_LIMIT};
use crate::errors::{ConfigError, FailureStrategy};
use crate::rules::{EngineOptions, EventCollisionPolicy};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Engine configuration.
///
/// Every section and field is optional; an empty file yields the defaults.
///
/// # Fields
/// * `pipeline` - Concurrency and rule failure handling
/// * `logging` - Log filter used by the binary
///
/// # Example
/// ```yaml
/// pipeline:
///   max_concurrency: 8
///   failure_strategy: fail_fast
///   event_collision: overwrite
/// logging:
///   filter: "strom=debug,info"
/// ```
///
/// The same document in TOML:
/// ```toml
/// [pipeline]
/// max_concurrency = 8
/// failure_strategy = "fail_fast"
///
/// [logging]
/// filter = "strom=debug,info"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub pipeline: PipelineOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pipeline execution options.
///
/// # Fields
/// * `max_concurrency` - Pipelines running at once on the blocking pool (defaults to 4)
/// * `failure_strategy` - `continue_on_error` (default) or `fail_fast`
/// * `event_collision` - `reject` (default) or `overwrite` when two event rules share a name
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineOptions {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default)]
    pub event_collision: EventCollisionPolicy,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            failure_strategy: FailureStrategy::default(),
            event_collision: EventCollisionPolicy::default(),
        }
    }
}

impl PipelineOptions {
    /// Rule engine options carried by this section.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            failure_strategy: self.failure_strategy,
            event_collision: self.event_collision,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        let concurrency = self.pipeline.max_concurrency;
        if concurrency == 0 || concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "pipeline.max_concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY_LIMIT, concurrency
            )));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".to_string()));
        }
        Ok(self)
    }
}

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<EngineConfig, ConfigError> {
    let cfg: EngineConfig = match format {
        // serde_yaml reads an empty document as unit, not an empty map
        ConfigFormat::Yaml if content.trim().is_empty() => EngineConfig::default(),
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    cfg.validate()
}

/// Load a config from a `.yaml`, `.yml` or `.toml` file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let cfg = parse_config("", ConfigFormat::Yaml).unwrap();

        assert_eq!(cfg.pipeline.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(cfg.pipeline.failure_strategy, FailureStrategy::ContinueOnError);
        assert_eq!(cfg.pipeline.event_collision, EventCollisionPolicy::Reject);
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn test_load_yaml_config() {
        let file = write_config(
            ".yaml",
            r#"
pipeline:
  max_concurrency: 8
  failure_strategy: fail_fast
  event_collision: overwrite
logging:
  filter: "strom=debug"
"#,
        );

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.pipeline.max_concurrency, 8);
        assert_eq!(cfg.pipeline.failure_strategy, FailureStrategy::FailFast);
        assert_eq!(cfg.pipeline.engine_options().event_collision, EventCollisionPolicy::Overwrite);
        assert_eq!(cfg.logging.filter, "strom=debug");
    }

    #[test]
    fn test_load_toml_config_partial_override() {
        let file = write_config(
            ".toml",
            r#"
[pipeline]
failure_strategy = "fail_fast"
"#,
        );

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.pipeline.failure_strategy, FailureStrategy::FailFast);
        assert_eq!(cfg.pipeline.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(cfg.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_config_errors() {
        struct TestCase {
            name: &'static str,
            suffix: &'static str,
            content: &'static str,
            expected: &'static str,
        }

        let cases = vec![
            TestCase {
                name: "unknown extension",
                suffix: ".json",
                content: "{}",
                expected: "unsupported config format 'json'",
            },
            TestCase {
                name: "zero concurrency",
                suffix: ".yml",
                content: "pipeline:\n  max_concurrency: 0\n",
                expected: "pipeline.max_concurrency must be between 1 and",
            },
            TestCase {
                name: "unknown strategy",
                suffix: ".yaml",
                content: "pipeline:\n  failure_strategy: retry\n",
                expected: "invalid YAML config",
            },
            TestCase {
                name: "unknown key",
                suffix: ".toml",
                content: "[pipeline]\nworkers = 3\n",
                expected: "invalid TOML config",
            },
            TestCase {
                name: "blank log filter",
                suffix: ".yaml",
                content: "logging:\n  filter: \"  \"\n",
                expected: "logging.filter must not be empty",
            },
        ];

        for case in cases {
            let file = write_config(case.suffix, case.content);
            let err = load_config(file.path()).unwrap_err().to_string();
            assert!(err.contains(case.expected), "{}: got '{}'", case.name, err);
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
