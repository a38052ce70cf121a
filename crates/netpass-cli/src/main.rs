//! Pass kiosk demo (netpass) - Main entry point
//!
//! Runs the kiosk runtime over a mock token reader and an in-memory profile
//! service. The real-time loop is a 16 ms tokio interval; operator commands
//! arrive on stdin:
//!
//! ```text
//! scan <id>        present a pass to the reader
//! profile <slot>   print the slot's editable metadata as JSON
//! save <slot>      upload the slot's profile and release it
//! join on|off      open or close player registration
//! enable <slot>    enable a slot
//! disable <slot>   disable a slot
//! unplug           make the next reader read fail
//! status           print the slot table as JSON
//! quit             exit
//! ```
//!
//! Slots are numbered from 1, as printed on the cabinet.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use netpass_core::{EditableMetadata, ProfileBundle, SlotIndex};
use netpass_hardware::mock::{MockChannel, MockChannelHandle};
use netpass_kiosk::{
    Environment, KioskConfig, NetPassRuntime, Notification, NotificationSink, StaticEnvironment,
};
use netpass_network::MemoryTransferClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Real-time tick period.
const TICK: Duration = Duration::from_millis(16);

/// Command-line arguments for netpass
#[derive(Parser, Debug)]
#[command(name = "netpass")]
#[command(about = "Networked pass kiosk demo driven from stdin")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "NETPASS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(short, long, default_value = "info", env = "NETPASS_LOG_LEVEL")]
    log_level: String,
}

/// Operator command read from stdin. Slot numbers are zero-based here and
/// checked against the slot table when the command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Scan(String),
    Profile(usize),
    Save(usize),
    Join(bool),
    Enable(usize),
    Disable(usize),
    Unplug,
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command");
        };
        let argument = words.next();

        let command = match (verb, argument) {
            ("scan", Some(id)) => Command::Scan(id.to_string()),
            ("profile", Some(slot)) => Command::Profile(parse_slot(slot)?),
            ("save", Some(slot)) => Command::Save(parse_slot(slot)?),
            ("join", Some("on")) => Command::Join(true),
            ("join", Some("off")) => Command::Join(false),
            ("enable", Some(slot)) => Command::Enable(parse_slot(slot)?),
            ("disable", Some(slot)) => Command::Disable(parse_slot(slot)?),
            ("unplug", None) => Command::Unplug,
            ("status", None) => Command::Status,
            ("quit" | "exit", None) => Command::Quit,
            _ => bail!("unrecognized command: {line}"),
        };
        Ok(command)
    }
}

/// Parse a 1-based slot number, optionally prefixed with `P`.
fn parse_slot(text: &str) -> Result<usize> {
    let digits = text.strip_prefix(['P', 'p']).unwrap_or(text);
    let number: usize = digits
        .parse()
        .with_context(|| format!("invalid slot number: {text}"))?;
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("slots are numbered from 1"))
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<KioskConfig> {
    match path {
        Some(path) => KioskConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(KioskConfig::default()),
    }
}

/// Print notifications as JSON lines for whatever presentation layer is
/// listening on stdout.
fn print_notification(notification: Notification) {
    match serde_json::to_string(&notification) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode notification"),
    }
}

/// Apply one operator command. Returns `false` when the operator quits.
fn execute<E, S>(
    command: Command,
    runtime: &mut NetPassRuntime<E, S>,
    reader: &MockChannelHandle,
    env: &StaticEnvironment,
) -> Result<bool>
where
    E: Environment,
    S: NotificationSink,
{
    let slot_count = runtime.orchestrator().slot_count();
    let slot = |number: usize| SlotIndex::checked(number, slot_count);

    match command {
        Command::Scan(id) => reader.present(id)?,
        Command::Profile(number) => {
            let mut metadata = EditableMetadata::default();
            runtime.load_profile(slot(number)?, &mut metadata)?;
            println!("{}", serde_json::to_string(&metadata)?);
        }
        Command::Save(number) => {
            let slot = slot(number)?;
            let mut profile = ProfileBundle::new("", None);
            runtime.load_profile(slot, &mut profile)?;
            let task = runtime.save_profile(slot, profile.stats().clone())?;
            info!(%slot, %task, "save submitted");
        }
        Command::Join(open) => {
            env.set_join_open(open);
            info!(open, "join window changed");
        }
        Command::Enable(number) => env.set_slot_enabled(slot(number)?, true),
        Command::Disable(number) => env.set_slot_enabled(slot(number)?, false),
        Command::Unplug => reader.inject_read_failure()?,
        Command::Status => println!("{}", serde_json::to_string(&runtime.snapshot())?),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = load_config(args.config.as_ref())?;
    info!(slots = config.slots, reject_mode = ?config.reject_mode, "Starting netpass kiosk");

    let (channel, reader) = MockChannel::with_name("Mock Pass Reader".to_string());
    let service = MemoryTransferClient::new().with_auto_provision();
    let env = Arc::new(StaticEnvironment::new(config.slots));

    let mut runtime = NetPassRuntime::start(
        &config,
        channel,
        service,
        Arc::clone(&env),
        print_notification,
    )
    .context("Failed to start kiosk runtime")?;

    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = runtime.tick();
                if !report.is_idle() {
                    debug!(?report, "tick");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => match execute(command, &mut runtime, &reader, &env) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => warn!(error = %e, "command failed"),
                    },
                    Err(e) => warn!(error = %e, "ignoring input"),
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }

    runtime.shutdown();
    info!("netpass kiosk shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "scan 0004417023".parse::<Command>().unwrap(),
            Command::Scan("0004417023".to_string())
        );
        assert_eq!("save 2".parse::<Command>().unwrap(), Command::Save(1));
        assert_eq!("profile p2".parse::<Command>().unwrap(), Command::Profile(1));
        assert_eq!("join off".parse::<Command>().unwrap(), Command::Join(false));
        assert_eq!("disable P1".parse::<Command>().unwrap(), Command::Disable(0));
        assert_eq!("  status ".parse::<Command>().unwrap(), Command::Status);
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_reject_bad_commands() {
        for line in ["", "scan", "join maybe", "save 0", "save x", "status now", "dance"] {
            assert!(line.parse::<Command>().is_err(), "accepted {line:?}");
        }
    }

    #[test]
    fn test_slot_beyond_table_is_rejected() {
        let (channel, reader) = MockChannel::new();
        let config = KioskConfig::default();
        let env = Arc::new(StaticEnvironment::new(config.slots));
        let mut runtime = NetPassRuntime::start(
            &config,
            channel,
            MemoryTransferClient::new(),
            Arc::clone(&env),
            Vec::<Notification>::new(),
        )
        .unwrap();

        let command = "disable 3".parse::<Command>().unwrap();
        let error = execute(command, &mut runtime, &reader, &env).unwrap_err();
        assert!(error.to_string().contains("out of range"));

        let command = "profile 1".parse::<Command>().unwrap();
        assert!(execute(command, &mut runtime, &reader, &env).is_err());
        runtime.shutdown();
    }

    #[test]
    fn test_default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), KioskConfig::default());
    }
}
