//! AT command protocol primitives.
//!
//! This crate provides the building blocks for talking to modems and similar
//! devices that speak a line-based AT command protocol over a character
//! stream (serial port, TCP-exposed UART, simulator).
//!
//! # Protocol Overview
//!
//! - **Commands** (host → device): `AT`, an optional sigil (`+`, `^`, `@`), a
//!   name and an optional `?` / `=args` suffix, terminated with `\r`.
//! - **Responses** (device → host): an optional echo of the command, zero or
//!   more data lines (often `+NAME: payload`), then a final result line
//!   (`OK`, `ERROR`, `+CME ERROR: n`, `+CMS ERROR: n`).
//!
//! # Pipeline
//!
//! - [`read_until`] collects raw text from a [`Transport`] until a final line
//!   matches, bounded by a deadline.
//! - [`frame`] splits the text into lines and drops the echo.
//! - A [`ParserChain`] classifies the lines into a [`Response`].
//! - [`split`] breaks data lines into typed [`FieldValue`]s.
//!
//! # Example
//!
//! ```rust
//! use at_protocol::{split, FieldValue, ParserChain, RawResponse, Response};
//!
//! let raw = RawResponse::from("AT+CSQ\r\r\n+CSQ: 21,99\r\n\r\nOK\r\n");
//! let response = ParserChain::simple().parse("AT+CSQ", &raw)?;
//! assert_eq!(response, Response::Data(vec!["21,99".to_string()]));
//!
//! let fields = split(&response.lines()[0], ",", true);
//! assert_eq!(fields, vec![FieldValue::Int(21), FieldValue::Int(99)]);
//! # Ok::<(), at_protocol::ProtocolError>(())
//! ```

mod classifier;
mod codec;
mod command;
mod error;
mod framer;
mod read_loop;
mod stack;
mod tokenizer;
mod transport;

pub use classifier::*;
pub use codec::*;
pub use command::*;
pub use error::*;
pub use framer::*;
pub use read_loop::*;
pub use stack::*;
pub use tokenizer::*;
pub use transport::*;
