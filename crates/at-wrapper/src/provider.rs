//! Capability providers.
//!
//! A provider answers capability lookups by name in one of two call
//! conventions: a direct call with just the arguments, or a transport call
//! that also receives the attached transport. [`CommandSet`] is the
//! table-driven provider used by catalogs and tests.

use std::collections::HashMap;

use at_protocol::{FieldValue, Transport};

use crate::error::{WrapperError, WrapperResult};
use crate::reply::{CallOptions, Reply};

/// Implementation of a direct-call capability.
pub type DirectFn = Box<dyn Fn(&[FieldValue], &CallOptions) -> WrapperResult<Reply>>;

/// Implementation of a transport-call capability.
pub type TransportFn =
    Box<dyn Fn(&mut dyn Transport, &[FieldValue], &CallOptions) -> WrapperResult<Reply>>;

/// A capability implementation, tagged with its call convention.
pub enum Capability {
    /// Called with the arguments only.
    Direct(DirectFn),
    /// Called with the attached transport first.
    Transport(TransportFn),
}

impl Capability {
    /// Name of the call convention, for diagnostics.
    pub fn convention(&self) -> &'static str {
        match self {
            Capability::Direct(_) => "direct",
            Capability::Transport(_) => "transport",
        }
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Capability::{}", self.convention())
    }
}

/// A source of named capabilities.
///
/// Both methods report [`WrapperError::CapabilityAbsent`] for names the
/// provider does not know in that convention; the resolver treats that as a
/// miss and moves on to the next provider.
pub trait Provider {
    /// Provider name, for diagnostics.
    fn name(&self) -> &str;

    /// Invoke `capability` with the direct call convention.
    fn call(
        &self,
        capability: &str,
        _args: &[FieldValue],
        _options: &CallOptions,
    ) -> WrapperResult<Reply> {
        Err(WrapperError::CapabilityAbsent(capability.to_string()))
    }

    /// Invoke `capability` with the transport call convention.
    fn call_with_transport(
        &self,
        capability: &str,
        _transport: &mut dyn Transport,
        _args: &[FieldValue],
        _options: &CallOptions,
    ) -> WrapperResult<Reply> {
        Err(WrapperError::CapabilityAbsent(capability.to_string()))
    }
}

struct Entry {
    capability: Capability,
    arity: Option<usize>,
}

/// Provider backed by a name → capability table.
pub struct CommandSet {
    name: String,
    entries: HashMap<String, Entry>,
}

impl CommandSet {
    /// Create an empty command set.
    pub fn new(name: impl Into<String>) -> Self {
        CommandSet {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// Register a capability. Replaces any existing capability with the same name.
    ///
    /// With `arity` set, calls with a different number of arguments fail with
    /// [`WrapperError::WrongArguments`].
    pub fn register(&mut self, name: &str, arity: Option<usize>, capability: Capability) {
        self.entries
            .insert(name.to_string(), Entry { capability, arity });
    }

    /// Builder form of [`CommandSet::register`] for a direct-call capability.
    pub fn with_direct<F>(mut self, name: &str, arity: Option<usize>, f: F) -> Self
    where
        F: Fn(&[FieldValue], &CallOptions) -> WrapperResult<Reply> + 'static,
    {
        self.register(name, arity, Capability::Direct(Box::new(f)));
        self
    }

    /// Builder form of [`CommandSet::register`] for a transport-call capability.
    pub fn with_transport<F>(mut self, name: &str, arity: Option<usize>, f: F) -> Self
    where
        F: Fn(&mut dyn Transport, &[FieldValue], &CallOptions) -> WrapperResult<Reply> + 'static,
    {
        self.register(name, arity, Capability::Transport(Box::new(f)));
        self
    }

    /// Registered capability names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_arity(name: &str, arity: Option<usize>, args: &[FieldValue]) -> WrapperResult<()> {
    match arity {
        Some(expected) if expected != args.len() => Err(WrapperError::WrongArguments {
            name: name.to_string(),
            reason: format!("expected {} arguments, got {}", expected, args.len()),
        }),
        _ => Ok(()),
    }
}

impl Provider for CommandSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(
        &self,
        capability: &str,
        args: &[FieldValue],
        options: &CallOptions,
    ) -> WrapperResult<Reply> {
        match self.entries.get(capability) {
            Some(Entry {
                capability: Capability::Direct(f),
                arity,
            }) => {
                check_arity(capability, *arity, args)?;
                f(args, options)
            }
            _ => Err(WrapperError::CapabilityAbsent(capability.to_string())),
        }
    }

    fn call_with_transport(
        &self,
        capability: &str,
        transport: &mut dyn Transport,
        args: &[FieldValue],
        options: &CallOptions,
    ) -> WrapperResult<Reply> {
        match self.entries.get(capability) {
            Some(Entry {
                capability: Capability::Transport(f),
                arity,
            }) => {
                check_arity(capability, *arity, args)?;
                f(transport, args, options)
            }
            _ => Err(WrapperError::CapabilityAbsent(capability.to_string())),
        }
    }
}

impl std::fmt::Debug for CommandSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSet")
            .field("name", &self.name)
            .field("capabilities", &self.names())
            .finish()
    }
}
