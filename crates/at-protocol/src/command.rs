//! Command names, execution modes and command-line encoding.
//!
//! A command name is either a bare capability name (`cgmi`, `signal_quality`)
//! or a protocol mnemonic of the form `[AT][^+@]NAME[?|=...]`. Both reduce to
//! a canonical key by [`normalize`], which drives echo detection, response
//! prefix matching and registry lookups.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolResult;
use crate::tokenizer::FieldValue;

/// Command line terminator expected by the device.
pub const COMMAND_TERMINATOR: char = '\r';

/// Reduce a command name to its canonical key.
///
/// Drops everything from the first `?` or `=`, then an optional leading
/// `AT` marker (any case), then at most one sigil out of `^`, `+` and `@`.
///
/// ```rust
/// use at_protocol::normalize;
///
/// assert_eq!(normalize("AT+CGMI"), "CGMI");
/// assert_eq!(normalize("at^sysinfo=?"), "sysinfo");
/// assert_eq!(normalize("cgmi"), "cgmi");
/// ```
pub fn normalize(name: &str) -> &str {
    let end = name.find(['?', '=']).unwrap_or(name.len());
    let mut rest = &name[..end];

    if rest.len() >= 2 && rest.as_bytes()[..2].eq_ignore_ascii_case(b"AT") {
        rest = &rest[2..];
    }
    if let Some(stripped) = rest.strip_prefix(['^', '+', '@']) {
        rest = stripped;
    }
    rest
}

/// Whether `name` only contains lowercase letters, digits and underscores.
///
/// Such names are protocol-style capability names; anything else is treated
/// as a function-style name.
pub fn is_bare_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Pattern recognising the device's echo of `command` on the first line.
///
/// Any two leading characters plus any sigil character are accepted in front
/// of the normalized name, so `AT+CGMI`, `at^CGMI` and `AT@cgmi` all echo
/// `CGMI`.
///
/// A command with an empty normalized name, such as a bare `AT`, yields
/// `(?i)^...`, which matches any first line of three or more characters. On a
/// device with echo disabled that line is a result line (`ERROR` included) and
/// is framed away like an echo would be.
pub fn echo_pattern(command: &str) -> ProtocolResult<Regex> {
    let pattern = format!("(?i)^...{}", regex::escape(normalize(command)));
    Ok(Regex::new(&pattern)?)
}

/// Pattern capturing the payload of a `+NAME: payload` data line.
pub fn data_prefix_pattern(command: &str) -> ProtocolResult<Regex> {
    let name = normalize(command).to_uppercase();
    let pattern = format!("^.{}: (.*)", regex::escape(&name));
    Ok(Regex::new(&pattern)?)
}

/// Test whether `pattern` matches at the very start of `line`.
pub fn matches_at_start(pattern: &Regex, line: &str) -> bool {
    pattern.find(line).is_some_and(|m| m.start() == 0)
}

/// How a mnemonic is sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    /// `MN`, or `MN=args` when arguments are supplied.
    #[default]
    Exec,
    /// `MN?`
    Read,
    /// `MN=?`
    Test,
    /// `MN=args`
    Write,
}

impl ExecMode {
    /// Get the mode name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Exec => "exec",
            ExecMode::Read => "read",
            ExecMode::Test => "test",
            ExecMode::Write => "write",
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exec" => Ok(ExecMode::Exec),
            "read" => Ok(ExecMode::Read),
            "test" => Ok(ExecMode::Test),
            "write" => Ok(ExecMode::Write),
            other => Err(format!("unknown execution mode: {}", other)),
        }
    }
}

/// Build the command line for `mnemonic` in `mode`, including the terminator.
pub fn encode_command(mnemonic: &str, mode: ExecMode, args: &[FieldValue]) -> String {
    let joined = args
        .iter()
        .map(FieldValue::to_argument)
        .collect::<Vec<_>>()
        .join(",");

    let mut line = match mode {
        ExecMode::Exec if args.is_empty() => mnemonic.to_string(),
        ExecMode::Exec | ExecMode::Write => format!("{}={}", mnemonic, joined),
        ExecMode::Read => format!("{}?", mnemonic),
        ExecMode::Test => format!("{}=?", mnemonic),
    };
    line.push(COMMAND_TERMINATOR);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mnemonics() {
        assert_eq!(normalize("AT+CGMI"), "CGMI");
        assert_eq!(normalize("AT^SYSINFO"), "SYSINFO");
        assert_eq!(normalize("at@tst?"), "tst");
        assert_eq!(normalize("AT+COPS=0,2"), "COPS");
        assert_eq!(normalize("+CSQ"), "CSQ");
        assert_eq!(normalize("ATI"), "I");
    }

    #[test]
    fn test_normalize_bare_names() {
        assert_eq!(normalize("cgmi"), "cgmi");
        assert_eq!(normalize("signal_quality"), "signal_quality");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_is_bare_name() {
        assert!(is_bare_name("cgmi"));
        assert!(is_bare_name("get_imei2"));
        assert!(!is_bare_name("getImei"));
        assert!(!is_bare_name("AT+CGMI"));
        assert!(!is_bare_name(""));
    }

    #[test]
    fn test_echo_pattern() {
        let pattern = echo_pattern("AT+CGMI").unwrap();
        assert!(matches_at_start(&pattern, "AT+CGMI"));
        assert!(matches_at_start(&pattern, "at+cgmi"));
        assert!(!matches_at_start(&pattern, "+CGMI: VENDOR"));
        assert!(!matches_at_start(&pattern, "VENDOR"));
    }

    #[test]
    fn test_data_prefix_pattern() {
        let pattern = data_prefix_pattern("at+csq").unwrap();
        let caps = pattern.captures("+CSQ: 21,99").unwrap();
        assert_eq!(&caps[1], "21,99");
        assert!(pattern.captures("+CSQX: 1").is_none());
    }

    #[test]
    fn test_encode_modes() {
        assert_eq!(encode_command("AT+CGMI", ExecMode::Exec, &[]), "AT+CGMI\r");
        assert_eq!(encode_command("AT+CSQ", ExecMode::Read, &[]), "AT+CSQ?\r");
        assert_eq!(encode_command("AT+COPS", ExecMode::Test, &[]), "AT+COPS=?\r");
        assert_eq!(
            encode_command(
                "AT+CGDCONT",
                ExecMode::Write,
                &[FieldValue::Int(1), FieldValue::from("IP")]
            ),
            "AT+CGDCONT=1,\"IP\"\r"
        );
        assert_eq!(
            encode_command("AT+CFUN", ExecMode::Exec, &[FieldValue::Int(1)]),
            "AT+CFUN=1\r"
        );
    }

    #[test]
    fn test_exec_mode_from_str() {
        assert_eq!("READ".parse::<ExecMode>(), Ok(ExecMode::Read));
        assert!("bogus".parse::<ExecMode>().is_err());
    }
}
