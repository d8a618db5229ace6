//! `atwrap`: run AT commands and capability calls against a modem port.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use at_protocol::TcpTransport;
use at_runner::{init_logging, ParserKind, Runner, RunnerConfig, RunnerError, RunnerResult};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "atwrap")]
#[command(about = "Run AT commands and capability calls against a TCP-exposed modem port")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Modem port address (host:port)
    #[arg(long)]
    connect: Option<String>,

    /// Read timeout for each command, in seconds
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Classifier applied to replies
    #[arg(short, long, value_enum)]
    parser: Option<ParserKind>,

    /// Probe rounds before running commands; 0 disables probing
    #[arg(long, value_name = "ROUNDS")]
    probe: Option<u32>,

    /// After the commands, wait for a line matching this pattern
    #[arg(short, long)]
    wait: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Commands to run after the configured ones
    #[arg(value_name = "COMMAND")]
    commands: Vec<String>,
}

fn build_config(args: &Args) -> RunnerResult<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };

    if let Some(connect) = &args.connect {
        config.connect = Some(connect.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
        config.registry.timeout_secs = None;
    }
    if let Some(parser) = args.parser {
        config.parser = parser;
    }
    if let Some(rounds) = args.probe {
        config.probe_retries = rounds;
    }
    config.commands.extend(args.commands.iter().cloned());

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> RunnerResult<bool> {
    let config = build_config(args)?;
    let address = config
        .connect
        .clone()
        .ok_or_else(|| RunnerError::InvalidArgument("no address to connect to".to_string()))?;
    let timeout = config.timeout();

    let transport = TcpTransport::connect(address.as_str(), timeout)?;
    info!("connected to {}", address);

    let mut runner = Runner::new(config);
    runner.attach(Box::new(transport));

    let mut stdout = std::io::stdout().lock();
    let summary = runner.run(&mut stdout)?;

    if let Some(pattern) = &args.wait {
        let outcome = runner.wait_for(pattern, timeout.max(Duration::from_secs(1)))?;
        print!("{}", outcome.text);
        if !outcome.matched() {
            return Ok(false);
        }
    }

    Ok(summary.failed == 0)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}
