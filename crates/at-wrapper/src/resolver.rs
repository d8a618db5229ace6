//! Capability resolution.
//!
//! A capability name is either protocol-style (lowercase letters, digits and
//! underscores once normalized, e.g. `cgmi`) or function-style (anything
//! else, e.g. `getImei`). Resolution walks the providers in priority order:
//!
//! 1. Function-style names are first tried with the direct call convention;
//!    a lookup miss or an argument mismatch moves on.
//! 2. Every name is then tried with the transport call convention, if a
//!    transport is attached; a lookup miss moves on.
//! 3. The first success wins. Any other provider error is returned as is.
//!
//! When no provider answers, function-style names fail. Protocol-style names
//! fall back to the registry's default execution for the name, sent over the
//! attached transport. Protocol-style replies are classified with the active
//! chain of the session's classifier stack.

use at_protocol::{is_bare_name, normalize, FieldValue};
use tracing::{trace, warn};

use crate::error::{WrapperError, WrapperResult};
use crate::reply::{CallOptions, Reply};
use crate::session::Session;

/// Whether `name` resolves as a function-style capability.
pub fn is_function_style(name: &str) -> bool {
    !is_bare_name(normalize(name))
}

impl Session {
    /// Resolve and run the capability `name`.
    pub fn call(
        &mut self,
        name: &str,
        args: &[FieldValue],
        options: &CallOptions,
    ) -> WrapperResult<Reply> {
        let function_style = is_function_style(name);
        let mut resolved = None;

        for entry in self.registry.providers() {
            if function_style {
                match entry.provider.call(name, args, options) {
                    Ok(reply) => {
                        trace!("{} resolved by {} (direct)", name, entry.name);
                        resolved = Some(reply);
                        break;
                    }
                    Err(e) if e.is_absent() || e.is_wrong_arguments() => {
                        trace!("{}: {} has no direct match: {}", name, entry.name, e);
                    }
                    Err(e) => return Err(e),
                }
            }

            let Some(transport) = self.transport.as_deref_mut() else {
                continue;
            };
            match entry
                .provider
                .call_with_transport(name, transport, args, options)
            {
                Ok(reply) => {
                    trace!("{} resolved by {} (transport)", name, entry.name);
                    resolved = Some(reply);
                    break;
                }
                Err(e) if e.is_absent() => continue,
                Err(e) => return Err(e),
            }
        }

        let (command, reply) = match resolved {
            Some(reply) => (name.to_string(), reply),
            None => {
                if self.debug {
                    warn!(
                        "{} is not found in known functions (function-style: {})",
                        name, function_style
                    );
                }
                if function_style {
                    return Err(WrapperError::UnrecognizedCapability(name.to_string()));
                }

                let transport = self
                    .transport
                    .as_deref_mut()
                    .ok_or_else(|| WrapperError::InterfaceNotSet(name.to_string()))?;
                let default = self.registry.default_execution(name);
                trace!("{} falls back to {} ({})", name, default.mnemonic, default.mode);
                let reply = self.registry.execute(
                    transport,
                    &default.mnemonic,
                    default.mode,
                    args,
                    options,
                )?;
                (default.mnemonic, reply)
            }
        };

        if function_style {
            return Ok(reply);
        }
        Ok(self.apply_parser(&command, reply))
    }
}
