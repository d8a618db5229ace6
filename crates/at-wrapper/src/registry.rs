//! Capability registry.
//!
//! The registry holds the providers in priority order, the default protocol
//! execution for every protocol-style name, and named attributes exported by
//! command sets. Sets are merged in from a [`Catalog`]: the standard set at
//! start-up, vendor sets once the device has been identified.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use at_protocol::{
    encode_command, normalize, read_until_str, ExecMode, FieldValue, IoOptions, RawResponse,
    Transport, FINAL_RESULT_PATTERN,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WrapperResult;
use crate::provider::Provider;
use crate::reply::{CallOptions, Reply};

/// Read timeout for protocol executions when the caller gives none.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(5);

/// How a protocol-style name is executed when no provider implements it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultExecution {
    /// Mnemonic sent to the device, e.g. `AT+CGMI`.
    pub mnemonic: String,
    /// How the mnemonic is sent.
    #[serde(default)]
    pub mode: ExecMode,
}

impl DefaultExecution {
    /// Create a default execution.
    pub fn new(mnemonic: impl Into<String>, mode: ExecMode) -> Self {
        DefaultExecution {
            mnemonic: mnemonic.into(),
            mode,
        }
    }

    /// The execution synthesized for a name without a registered default.
    pub fn synthesized(name: &str) -> Self {
        DefaultExecution::new(format!("AT+{}", normalize(name).to_uppercase()), ExecMode::Exec)
    }
}

/// Attribute value as written in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Integer constant.
    Int(i64),
    /// Text constant.
    Text(String),
}

impl From<AttributeValue> for FieldValue {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Int(v) => FieldValue::Int(v),
            AttributeValue::Text(s) => FieldValue::Text(s),
        }
    }
}

/// Registry settings loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Default executions keyed by capability name.
    pub defaults: BTreeMap<String, DefaultExecution>,
    /// Named constants exported to callers.
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Read timeout for protocol executions, in seconds.
    pub timeout_secs: Option<f64>,
}

/// A provider together with its registration data.
pub struct RegisteredProvider {
    /// Registration name; a later registration with the same name replaces it.
    pub name: String,
    /// Lower values are consulted first.
    pub priority: u32,
    /// The provider.
    pub provider: Box<dyn Provider>,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Providers, defaults and attributes to merge into a registry.
#[derive(Debug, Default)]
pub struct ProviderSet {
    providers: Vec<RegisteredProvider>,
    defaults: Vec<(String, DefaultExecution)>,
    attributes: Vec<(String, FieldValue)>,
}

impl ProviderSet {
    /// Create an empty set.
    pub fn new() -> Self {
        ProviderSet::default()
    }

    /// Add a provider.
    pub fn with_provider<P: Provider + 'static>(
        mut self,
        name: &str,
        priority: u32,
        provider: P,
    ) -> Self {
        self.providers.push(RegisteredProvider {
            name: name.to_string(),
            priority,
            provider: Box::new(provider),
        });
        self
    }

    /// Add a default execution for `name`.
    pub fn with_default(mut self, name: &str, mnemonic: &str, mode: ExecMode) -> Self {
        self.defaults
            .push((name.to_string(), DefaultExecution::new(mnemonic, mode)));
        self
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    /// Add the defaults and attributes of a configuration.
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.defaults.extend(config.defaults);
        self.attributes.extend(
            config
                .attributes
                .into_iter()
                .map(|(name, value)| (name, value.into())),
        );
        self
    }
}

/// Source of command sets.
pub trait Catalog {
    /// The standard set, loaded when a session is created.
    fn standard(&self) -> ProviderSet;

    /// The set for an identified vendor and model, if there is one.
    fn vendor(&self, vendor: &str, model: &str) -> Option<ProviderSet>;
}

/// Ordered providers plus the protocol fallback table.
#[derive(Debug)]
pub struct CommandRegistry {
    providers: Vec<RegisteredProvider>,
    defaults: HashMap<String, DefaultExecution>,
    attributes: BTreeMap<String, FieldValue>,
    timeout: Duration,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        CommandRegistry::new()
    }
}

/// Lookup key for default executions.
fn default_key(name: &str) -> String {
    normalize(name).to_ascii_lowercase()
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CommandRegistry {
            providers: Vec::new(),
            defaults: HashMap::new(),
            attributes: BTreeMap::new(),
            timeout: DEFAULT_EXEC_TIMEOUT,
        }
    }

    /// Create a registry holding `set`.
    pub fn from_set(set: ProviderSet) -> Self {
        let mut registry = CommandRegistry::new();
        registry.merge(set);
        registry
    }

    /// Apply the timeout of a configuration; defaults and attributes go
    /// through [`ProviderSet::with_config`].
    pub fn configure(&mut self, config: &RegistryConfig) {
        if let Some(secs) = config.timeout_secs {
            match Duration::try_from_secs_f64(secs) {
                Ok(timeout) => self.timeout = timeout,
                Err(e) => warn!("ignoring invalid execution timeout {}: {}", secs, e),
            }
        }
    }

    /// Merge `set` into the registry.
    ///
    /// Providers keep ascending priority order; equal priorities keep
    /// registration order. A provider, default or attribute registered under
    /// an existing name replaces the earlier one.
    pub fn merge(&mut self, set: ProviderSet) {
        for entry in set.providers {
            self.providers.retain(|p| p.name != entry.name);
            debug!(
                "registering provider {} (priority {})",
                entry.name, entry.priority
            );
            self.providers.push(entry);
        }
        self.providers.sort_by_key(|p| p.priority);

        for (name, default) in set.defaults {
            self.defaults.insert(default_key(&name), default);
        }
        self.attributes.extend(set.attributes);
    }

    /// Providers in lookup order.
    pub fn providers(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.providers.iter()
    }

    /// Provider registration names in lookup order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(name)
    }

    /// Read timeout used by [`CommandRegistry::execute`] when the caller gives none.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the execution read timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The execution used for `name` when no provider implements it.
    ///
    /// Every name has one: names without a registered default are sent as
    /// `AT+<NAME>` in [`ExecMode::Exec`].
    pub fn default_execution(&self, name: &str) -> DefaultExecution {
        self.defaults
            .get(&default_key(name))
            .cloned()
            .unwrap_or_else(|| DefaultExecution::synthesized(name))
    }

    /// Send `mnemonic` in `mode` and collect the raw response.
    ///
    /// Reads until a final result line or the timeout. A timed-out exchange
    /// still returns what was read.
    pub fn execute(
        &self,
        transport: &mut dyn Transport,
        mnemonic: &str,
        mode: ExecMode,
        args: &[FieldValue],
        options: &CallOptions,
    ) -> WrapperResult<Reply> {
        let line = encode_command(mnemonic, mode, args);
        transport.write(&line, &IoOptions { quiet: options.quiet })?;

        let timeout = options.timeout.unwrap_or(self.timeout);
        let outcome = read_until_str(transport, FINAL_RESULT_PATTERN, timeout)?;
        if !outcome.matched() && !options.quiet {
            warn!(
                "{} ({}) got no final result within {:?}",
                mnemonic, mode, timeout
            );
        }

        Ok(Reply::Raw(RawResponse::Text(outcome.text)))
    }
}
