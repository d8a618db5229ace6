//! Capability resolution for AT-speaking devices.
//!
//! This crate sits on top of [`at_protocol`] and decides, per requested
//! operation, whether to run a registered capability implementation or to
//! synthesize a protocol exchange from the registry's default execution.
//!
//! # Overview
//!
//! - A [`Catalog`] supplies [`ProviderSet`]s: providers with priorities,
//!   default executions and attributes.
//! - A [`CommandRegistry`] keeps providers in priority order and executes
//!   fallback mnemonics over a transport.
//! - A [`Session`] owns the attached transport, the registry and the
//!   classifier stack, and resolves calls by name with [`Session::call`].
//!
//! # Example
//!
//! ```rust
//! use at_protocol::{ParserChain, Response, ScriptedTransport};
//! use at_wrapper::{CallOptions, CommandRegistry, Reply, Session};
//!
//! let mut transport = ScriptedTransport::new();
//! transport.on_command("AT+CGMI", &["AT+CGMI\r\r\n", "+CGMI: ACME\r\n", "OK\r\n"]);
//!
//! let mut session = Session::new(CommandRegistry::new());
//! session.attach(Box::new(transport));
//! session.push_parser(ParserChain::simple());
//!
//! let reply = session.call("cgmi", &[], &CallOptions::default())?;
//! assert_eq!(reply, Reply::Parsed(Response::Data(vec!["ACME".to_string()])));
//! # Ok::<(), at_wrapper::WrapperError>(())
//! ```

mod error;
mod provider;
mod registry;
mod reply;
mod resolver;
mod session;

pub use error::*;
pub use provider::*;
pub use registry::*;
pub use reply::*;
pub use resolver::*;
pub use session::*;
