//! Runner configuration.
//!
//! Loaded from YAML; every field has a default so an empty file (or no file)
//! is a valid configuration. Command-line flags are applied on top.

use std::path::Path;
use std::time::Duration;

use at_protocol::ParserChain;
use at_wrapper::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Default read timeout for protocol executions, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Default number of probe rounds.
pub const DEFAULT_PROBE_RETRIES: u32 = 3;

/// Classifier chain pushed for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// No classifier; replies stay raw.
    None,
    /// Identity chain; framed lines left unclassified.
    Raw,
    /// Outcome classification only.
    DataOnly,
    /// Outcome classification plus prefix stripping.
    #[default]
    Simple,
}

impl ParserKind {
    /// The chain for this kind, if any.
    pub fn chain(self) -> Option<ParserChain> {
        match self {
            ParserKind::None => None,
            ParserKind::Raw => Some(ParserChain::raw()),
            ParserKind::DataOnly => Some(ParserChain::data_only()),
            ParserKind::Simple => Some(ParserChain::simple()),
        }
    }
}

/// Configuration for one scripted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Address of the TCP-exposed modem port (`host:port`).
    pub connect: Option<String>,
    /// Read timeout for protocol executions, in seconds.
    pub timeout_secs: f64,
    /// Classifier chain used for replies.
    pub parser: ParserKind,
    /// Probe rounds before the first command; 0 skips probing.
    pub probe_retries: u32,
    /// Default executions and attributes for the registry.
    pub registry: RegistryConfig,
    /// Commands to run, in order.
    pub commands: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            connect: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            parser: ParserKind::default(),
            probe_retries: DEFAULT_PROBE_RETRIES,
            registry: RegistryConfig::default(),
            commands: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(text: &str) -> RunnerResult<Self> {
        let config: RunnerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> RunnerResult<()> {
        if self.timeout_secs <= 0.0 {
            return Err(RunnerError::InvalidArgument(format!(
                "timeout_secs must be positive, got {}",
                self.timeout_secs
            )));
        }
        seconds("timeout_secs", self.timeout_secs)?;
        if let Some(secs) = self.registry.timeout_secs {
            seconds("registry.timeout_secs", secs)?;
        }
        Ok(())
    }

    /// The execution timeout.
    ///
    /// A `registry.timeout_secs` entry takes precedence over `timeout_secs`.
    /// Values that do not convert to a [`Duration`] are skipped.
    pub fn timeout(&self) -> Duration {
        self.registry
            .timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .or_else(|| Duration::try_from_secs_f64(self.timeout_secs).ok())
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }
}

fn seconds(name: &str, secs: f64) -> RunnerResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| RunnerError::InvalidArgument(format!("{} = {}: {}", name, secs, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_protocol::ExecMode;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RunnerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.parser, ParserKind::Simple);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
connect: "127.0.0.1:9000"
timeout_secs: 2.5
parser: data_only
probe_retries: 0
registry:
  defaults:
    cops: { mnemonic: "AT+COPS", mode: read }
  attributes: { AR: 0, ER: "one" }
commands:
  - cgmi
  - "cops 0,2"
  - "AT+CSQ"
"#;
        let config = RunnerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.connect.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.parser, ParserKind::DataOnly);
        assert_eq!(config.probe_retries, 0);
        assert_eq!(config.registry.defaults["cops"].mode, ExecMode::Read);
        assert_eq!(config.registry.attributes.len(), 2);
        assert_eq!(config.commands, vec!["cgmi", "cops 0,2", "AT+CSQ"]);
    }

    #[test]
    fn test_registry_timeout_overrides() {
        let yaml = "timeout_secs: 2\nregistry:\n  timeout_secs: 0.5\n";
        let config = RunnerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = RunnerConfig::from_yaml("timeout_secs: 0").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidArgument(_)));
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let err = RunnerConfig::from_yaml("timeout_secs: 1e20").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidArgument(_)));

        let err = RunnerConfig::from_yaml("registry:\n  timeout_secs: 1e20\n").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidArgument(_)));

        let err = RunnerConfig::from_yaml("timeout_secs: .nan").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidArgument(_)));
    }

    #[test]
    fn test_timeout_skips_unconvertible_values() {
        let config = RunnerConfig {
            timeout_secs: 1e20,
            ..RunnerConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let mut config = RunnerConfig::default();
        config.timeout_secs = 2.0;
        config.registry.timeout_secs = Some(-1.0);
        assert_eq!(config.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_unknown_parser_rejected() {
        let err = RunnerConfig::from_yaml("parser: fancy").unwrap_err();
        assert!(matches!(err, RunnerError::Config(_)));
    }

    #[test]
    fn test_parser_kind_chain() {
        assert!(ParserKind::None.chain().is_none());
        assert_eq!(
            ParserKind::Simple.chain().unwrap().stage_names(),
            ParserChain::simple().stage_names()
        );
    }
}
