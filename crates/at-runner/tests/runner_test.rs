//! End-to-end runs against a scripted device.

use std::io::Write;
use std::time::Duration;

use at_protocol::ScriptedTransport;
use at_runner::{ParserKind, Runner, RunnerConfig, RunnerError};
use at_wrapper::{CommandSet, ProviderSet, Reply};

fn modem() -> ScriptedTransport {
    let mut transport = ScriptedTransport::new();
    transport
        .on_command("at", &["OK\r\n"])
        .on_command("AT+CGMI", &["AT+CGMI\r\r\n", "+CGMI: ACME\r\n", "OK\r\n"])
        .on_command("AT+COPS=0,2", &["OK\r\n"])
        .on_command("AT+CSQ", &["+CSQ: 20,99\r\n", "OK\r\n"])
        .on_command("AT+CFUN", &["ERROR\r\n"]);
    transport
}

fn config(commands: &[&str]) -> RunnerConfig {
    RunnerConfig {
        timeout_secs: 0.5,
        probe_retries: 1,
        commands: commands.iter().map(|c| c.to_string()).collect(),
        ..RunnerConfig::default()
    }
}

#[test]
fn test_run_mixed_commands() {
    let mut runner = Runner::new(config(&["cgmi", "cops 0,2", "AT+CSQ", "cfun"]));
    runner.attach(Box::new(modem()));

    let mut out = Vec::new();
    let summary = runner.run(&mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(summary.commands, 4);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        vec![
            "cgmi -> ACME",
            "cops 0,2 -> OK",
            "AT+CSQ -> 20,99",
            "cfun -> ERROR",
        ]
    );
}

#[test]
fn test_run_unrecognized_call_continues() {
    let mut runner = Runner::new(config(&["getImei", "AT+CSQ"]));
    runner.attach(Box::new(modem()));

    let mut out = Vec::new();
    let summary = runner.run(&mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(out.starts_with("getImei !! getImei is not recognized as an API"));
}

#[test]
fn test_run_uses_merged_providers() {
    let mut runner = Runner::new(config(&["getImei"]));
    runner.attach(Box::new(modem()));
    runner.session_mut().registry_mut().merge(ProviderSet::new().with_provider(
        "extra",
        10,
        CommandSet::new("extra").with_direct("getImei", Some(0), |_, _| Ok(Reply::Flag(true))),
    ));

    let mut out = Vec::new();
    runner.run(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "getImei -> true\n");
}

#[test]
fn test_run_without_parser_prints_raw() {
    let mut config = config(&["AT+CSQ"]);
    config.parser = ParserKind::None;
    let mut runner = Runner::new(config);
    runner.attach(Box::new(modem()));

    let mut out = Vec::new();
    runner.run(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "AT+CSQ -> +CSQ: 20,99 | OK\n");
}

#[test]
fn test_run_fails_when_probe_unanswered() {
    let mut runner = Runner::new(config(&["AT+CSQ"]));
    runner.attach(Box::new(ScriptedTransport::new()));

    let err = runner.run(&mut Vec::new()).unwrap_err();
    assert!(matches!(err, RunnerError::NoResponse(1)));
}

#[test]
fn test_wait_for_unsolicited_line() {
    let mut transport = ScriptedTransport::new();
    transport.push_line("RING\r\n").push_line("+CLIP: \"123\"\r\n");
    let mut runner = Runner::new(config(&[]));
    runner.attach(Box::new(transport));

    let outcome = runner.wait_for(r"^\+CLIP", Duration::from_secs(1)).unwrap();
    assert!(outcome.matched());
    assert_eq!(outcome.text, "RING\r\n+CLIP: \"123\"\r\n");
}

#[test]
fn test_load_config_file_and_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
timeout_secs: 0.5
parser: data_only
probe_retries: 0
registry:
  defaults:
    manufacturer: {{ mnemonic: "AT+CGMI" }}
  attributes: {{ AR: 0 }}
commands:
  - manufacturer
"#
    )
    .unwrap();

    let config = RunnerConfig::load(file.path()).unwrap();
    let mut runner = Runner::new(config);
    runner.attach(Box::new(modem()));
    assert!(runner.session().attribute("AR").is_some());

    let mut out = Vec::new();
    let summary = runner.run(&mut out).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "manufacturer -> +CGMI: ACME\n");
}
