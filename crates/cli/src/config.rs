//! Analyzer configuration for `isl check`.
//!
//! Loaded from `--config PATH`, or from `isl.toml` in the working directory
//! when that file exists. Every key is optional.
//!
//! # Example
//!
//! ```toml
//! [analyzer]
//! disable = ["unused-symbols"]
//! max_nesting_depth = 8
//! parallel = true
//!
//! [output]
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use isl_analyze::AnalyzerOptions;
use serde::Deserialize;
use thiserror::Error;

use crate::OutputFormat;

/// Name of the configuration file looked up in the working directory.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "isl.toml";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub analyzer: AnalyzerSection,
    pub output: OutputSection,
}

/// `[analyzer]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AnalyzerSection {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub max_nesting_depth: Option<usize>,
    pub parallel: Option<bool>,
}

/// `[output]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct OutputSection {
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Analyzer options with file values applied over the defaults.
    pub(crate) fn analyzer_options(&self) -> AnalyzerOptions {
        let defaults = AnalyzerOptions::default();
        AnalyzerOptions {
            only: None,
            enable: self.analyzer.enable.clone(),
            disable: self.analyzer.disable.clone(),
            max_nesting_depth: self.analyzer.max_nesting_depth.unwrap_or(defaults.max_nesting_depth),
            parallel: self.analyzer.parallel.unwrap_or(defaults.parallel),
        }
    }
}

pub(crate) fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Read the explicit config file, or `isl.toml` if present, or fall back to defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&content, &path)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config("", Path::new("isl.toml")).unwrap();
        let options = config.analyzer_options();
        assert_eq!(options.max_nesting_depth, isl_analyze::DEFAULT_MAX_NESTING_DEPTH);
        assert!(!options.parallel);
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_full_config() {
        let content = r#"
[analyzer]
enable = ["cyclic-dependencies"]
disable = ["unused-symbols"]
max_nesting_depth = 8
parallel = true

[output]
format = "json"
"#;
        let config = parse_config(content, Path::new("isl.toml")).unwrap();
        let options = config.analyzer_options();
        assert_eq!(options.disable, vec!["unused-symbols"]);
        assert_eq!(options.enable, vec!["cyclic-dependencies"]);
        assert_eq!(options.max_nesting_depth, 8);
        assert!(options.parallel);
        assert_eq!(config.output.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse_config("[analyzer]\nmax_depth = 3\n", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("does/not/exist.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
