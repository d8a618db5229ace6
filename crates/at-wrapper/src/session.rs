//! Sessions: one device, one registry, one classifier stack.
//!
//! A [`Session`] owns everything a caller needs to talk to one device: the
//! attached transport, the registry of command sets, and the stack of
//! classifier chains applied to protocol replies. Capability calls go through
//! [`Session::call`].

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use at_protocol::{
    probe, read_until_str, ExecMode, FieldValue, ParserChain, ParserStack, ReadOutcome, Response,
    Transport,
};
use tracing::{debug, info};

use crate::error::{WrapperError, WrapperResult};
use crate::registry::{Catalog, CommandRegistry};
use crate::reply::{CallOptions, Reply};

/// Environment variable holding debug switches.
pub const DEBUG_ENV_VAR: &str = "AT_WRAPPER_DEBUG";

/// Switch in [`DEBUG_ENV_VAR`] enabling resolution diagnostics.
pub const DEBUG_SENTINEL: &str = "WRAP;";

/// Read the debug switch from the environment.
pub fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV_VAR)
        .map(|value| value.to_uppercase().contains(DEBUG_SENTINEL))
        .unwrap_or(false)
}

/// State for talking to one device.
pub struct Session {
    pub(crate) transport: Option<Box<dyn Transport>>,
    pub(crate) registry: CommandRegistry,
    pub(crate) parsers: ParserStack,
    pub(crate) debug: bool,
}

impl Session {
    /// Create a session over `registry` with no transport attached.
    ///
    /// The debug switch is read from the environment here, once.
    pub fn new(registry: CommandRegistry) -> Self {
        Session {
            transport: None,
            registry,
            parsers: ParserStack::new(),
            debug: debug_from_env(),
        }
    }

    /// Create a session holding the standard set of `catalog`.
    pub fn from_catalog(catalog: &dyn Catalog) -> Self {
        Session::new(CommandRegistry::from_set(catalog.standard()))
    }

    // -- Transport --

    /// Attach `transport`, returning the one it replaces.
    pub fn attach(&mut self, transport: Box<dyn Transport>) -> Option<Box<dyn Transport>> {
        self.transport.replace(transport)
    }

    /// Detach and return the current transport.
    pub fn detach(&mut self) -> Option<Box<dyn Transport>> {
        self.transport.take()
    }

    /// The attached transport.
    pub fn transport(&self) -> Option<&dyn Transport> {
        self.transport.as_deref()
    }

    /// The attached transport, mutably.
    pub fn transport_mut(&mut self) -> Option<&mut (dyn Transport + 'static)> {
        self.transport.as_deref_mut()
    }

    fn require_transport(&mut self, what: &str) -> WrapperResult<&mut (dyn Transport + 'static)> {
        self.transport
            .as_deref_mut()
            .ok_or_else(|| WrapperError::InterfaceNotSet(what.to_string()))
    }

    // -- Registry --

    /// The capability registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// The capability registry, mutably.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Look up an attribute exported by a loaded command set.
    pub fn attribute(&self, name: &str) -> Option<&FieldValue> {
        self.registry.attribute(name)
    }

    // -- Classifiers --

    /// The classifier stack.
    pub fn parsers(&self) -> &ParserStack {
        &self.parsers
    }

    /// Make `chain` the active classifier.
    pub fn push_parser(&mut self, chain: ParserChain) {
        self.parsers.push(chain);
    }

    /// Drop the active classifier; `false` if only the base layer is left.
    pub fn pop_parser(&mut self) -> bool {
        self.parsers.pop()
    }

    /// Run `f` with `chain` active.
    ///
    /// The stack is cut back to its depth before the push once `f` returns or
    /// unwinds, including any layers `f` left behind.
    pub fn with_parser<R>(&mut self, chain: ParserChain, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut scope = ParserScope::new(self, chain);
        f(&mut *scope)
    }

    /// Classify `reply` for `command` with the active chain.
    ///
    /// Without an active chain, or for [`Reply::None`], the reply is returned
    /// as is. A reply the chain cannot handle is also returned as is.
    pub(crate) fn apply_parser(&self, command: &str, reply: Reply) -> Reply {
        let Some(chain) = self.parsers.active() else {
            return reply;
        };
        if reply.is_none() {
            return reply;
        }

        match reply.classify(command, chain) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("leaving reply to {} unclassified: {}", command, e);
                reply
            }
        }
    }

    // -- Debug --

    /// Whether resolution diagnostics are enabled.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Enable or disable resolution diagnostics.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    // -- Protocol helpers --

    /// Check whether the attached transport answers at all.
    pub fn probe(&mut self, retry: u32) -> WrapperResult<bool> {
        let transport = self.require_transport("probe")?;
        Ok(probe(transport, retry)?)
    }

    /// Read from the attached transport until `pattern` matches a line start.
    pub fn read_until(&mut self, pattern: &str, timeout: Duration) -> WrapperResult<ReadOutcome> {
        let transport = self.require_transport("read_until")?;
        Ok(read_until_str(transport, pattern, timeout)?)
    }

    /// Send `command` verbatim and classify the reply with the active chain.
    pub fn send(&mut self, command: &str, options: &CallOptions) -> WrapperResult<Reply> {
        let transport = self
            .transport
            .as_deref_mut()
            .ok_or_else(|| WrapperError::InterfaceNotSet(command.to_string()))?;
        let reply = self
            .registry
            .execute(transport, command, ExecMode::Exec, &[], options)?;
        Ok(self.apply_parser(command, reply))
    }

    // -- Vendor sets --

    /// Identify the device and merge its vendor command set.
    ///
    /// Queries `cgmi` and `cgmm` with a data-only classifier active and uses
    /// the last data line of each as vendor and model id. Returns whether the
    /// catalog had a set for the device.
    pub fn load_vendor(&mut self, catalog: &dyn Catalog) -> WrapperResult<bool> {
        let (vendor, model) = self.with_parser(ParserChain::data_only(), |session| {
            let options = CallOptions::default();
            let vendor = session.call("cgmi", &[], &options)?;
            let vendor = last_data_line(&vendor)
                .ok_or_else(|| WrapperError::VendorIdentification("vendor ID".to_string()))?;
            let model = session.call("cgmm", &[], &options)?;
            let model = last_data_line(&model)
                .ok_or_else(|| WrapperError::VendorIdentification("module ID".to_string()))?;
            Ok::<_, WrapperError>((vendor, model))
        })?;

        match catalog.vendor(&vendor, &model) {
            Some(set) => {
                info!("loading command set for {} {}", vendor, model);
                self.registry.merge(set);
                Ok(true)
            }
            None => {
                debug!("no command set for {} {}", vendor, model);
                Ok(false)
            }
        }
    }
}

/// Pushed classifier layer, removed on drop.
struct ParserScope<'a> {
    session: &'a mut Session,
    depth: usize,
}

impl<'a> ParserScope<'a> {
    fn new(session: &'a mut Session, chain: ParserChain) -> Self {
        let depth = session.parsers.depth();
        session.parsers.push(chain);
        ParserScope { session, depth }
    }
}

impl Deref for ParserScope<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for ParserScope<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for ParserScope<'_> {
    fn drop(&mut self) {
        if self.session.parsers.depth() != self.depth + 1 {
            debug!(
                "classifier stack at depth {} on scope exit, expected {}",
                self.session.parsers.depth(),
                self.depth + 1
            );
        }
        self.session.parsers.truncate(self.depth);
    }
}

fn last_data_line(reply: &Reply) -> Option<String> {
    match reply {
        Reply::Parsed(Response::Data(lines)) => lines.last().cloned(),
        _ => None,
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("attached", &self.transport.is_some())
            .field("registry", &self.registry)
            .field("parsers", &self.parsers)
            .field("debug", &self.debug)
            .finish()
    }
}
