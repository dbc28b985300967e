//! cc-heads-up - Claude Code notification hook
//!
//! Reads a Stop or Notification hook event from stdin and tells the user
//! what the session needs from them, on the desktop or through a remote
//! channel.
//!
//! Always exits 0: a failing notifier must never block Claude Code.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cc_heads_up::clock::{Clock, SystemClock};
use cc_heads_up::config::Config;
use cc_heads_up::format::{Channel, NotificationPayload};
use cc_heads_up::hook::{parse_hook_event, HookEvent};
use cc_heads_up::notify::{deliver, deliver_fallback, gate, Gate, Notifier};
use cc_heads_up::pipeline::{Outcome, Pipeline};
use cc_heads_up::presence::{activity_marker_path, load_last_activity, store_last_activity};
use cc_heads_up::scenario::Scenario;
use cc_heads_up::suggestion::{condensed, Condensed};
use cc_heads_up::NotifyError;

#[derive(Debug, Parser)]
#[command(name = "cc-heads-up", version, about = "Claude Code notification hook")]
struct Cli {
    /// Delivery channel: desktop, email, slack, telegram or webhook.
    /// Overrides `notification_method` from the config file.
    #[arg(long)]
    channel: Option<Channel>,

    /// Config file (default: <config dir>/cc-heads-up/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the scenario and rendered payload as JSON instead of delivering
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Handle a hook event read from stdin (default)
    Hook,
    /// Record that the user is active in the terminal
    Activity,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command.unwrap_or(Command::Hook) {
        Command::Hook => run_hook(&cli).await,
        Command::Activity => record_activity(),
    };
    if let Err(e) = result {
        tracing::error!("cc-heads-up: {e:#}");
    }

    ExitCode::SUCCESS
}

/// Logs go to stderr; stdout belongs to the hook protocol and `--dry-run`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .compact()
        .init();
}

async fn run_hook(cli: &Cli) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        Config::default()
    });
    let channel = cli.channel.unwrap_or(config.notification_method);
    let clock = SystemClock;

    let last_activity = activity_marker_path().and_then(|p| load_last_activity(&p));
    let presence = config.presence.tracker().with_last_activity(last_activity);
    let gate_state = gate(&config, &presence, clock.now());

    let pipeline = Pipeline::with_clock(channel, clock).transcript_lines(config.transcript_lines);
    let rendered = match pipeline.process(&input).await {
        Ok(Outcome::Ignored { .. }) => return Ok(()),
        Ok(Outcome::Rendered(rendered)) => rendered,
        Err(e) => {
            tracing::error!("failed to process hook event: {e}");
            if cli.dry_run {
                return Ok(());
            }
            let event = parse_hook_event(&input).unwrap_or_default();
            return send_fallback(&config, gate_state, &event).await;
        }
    };

    if cli.dry_run {
        let report = DryRun {
            scenario: &rendered.scenario,
            suggestion: condensed(&rendered.suggestion),
            payload: &rendered.payload,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match gate_state {
        Gate::Open => {}
        Gate::Disabled => {
            tracing::info!("notifications disabled, skipping");
            return Ok(());
        }
        Gate::UserPresent => return Ok(()),
    }

    if let Err(e) = send(&config, channel, &rendered.payload).await {
        match &e {
            NotifyError::LicenseRejected => {
                tracing::error!("{channel} notification rejected: check `license_key` in the config");
            }
            e if e.is_delivery() => tracing::error!("{channel} delivery failed: {e}"),
            e => tracing::error!("{channel} notification not sent: {e}"),
        }
        let event = HookEvent {
            hook_event_name: Some(rendered.context.hook_event_name.clone()),
            cwd: Some(rendered.context.cwd.clone()),
            message: rendered.context.message.clone(),
            ..HookEvent::default()
        };
        send_fallback(&config, gate_state, &event).await?;
    }
    Ok(())
}

/// What `--dry-run` prints: the classification next to the payload.
#[derive(Serialize)]
struct DryRun<'a> {
    scenario: &'a Scenario,
    suggestion: Condensed,
    payload: &'a NotificationPayload,
}

async fn send(config: &Config, channel: Channel, payload: &NotificationPayload) -> cc_heads_up::Result<()> {
    config.validate_for(channel)?;
    let notifier = Notifier::new(config.clone(), channel)?;
    deliver(&notifier, payload).await
}

async fn send_fallback(config: &Config, gate: Gate, event: &HookEvent) -> anyhow::Result<()> {
    let notifier = Notifier::new(config.clone(), Channel::Desktop)?;
    deliver_fallback(&notifier, gate, event)
        .await
        .context("fallback notification failed")?;
    Ok(())
}

fn record_activity() -> anyhow::Result<()> {
    let path = activity_marker_path().context("no cache directory for the activity marker")?;
    store_last_activity(&path, SystemClock.now())?;
    tracing::debug!("activity recorded in {}", path.display());
    Ok(())
}
