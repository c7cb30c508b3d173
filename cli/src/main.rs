//! yieldshare: inspect epochs and run scripted reward simulations.

mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use yieldshare_epoch::EpochSchedule;
use yieldshare_hub::{HubConfig, RewardHub};
use yieldshare_nullables::{NullClock, NullGateway};
use yieldshare_types::{AccountId, AssetId, EventBus, RewardEvent, Tick};
use yieldshare_utils::{init_logging, LogFormat};

use crate::script::{Action, Script};

#[derive(Parser)]
#[command(name = "yieldshare", about = "Epoch-based staking reward engine")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true, env = "YIELDSHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overriding the configuration file.
    #[arg(long, global = true, env = "YIELDSHARE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format ("human" or "json"), overriding the configuration file.
    #[arg(long, global = true, env = "YIELDSHARE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show the epoch containing a counter value.
    Epoch {
        /// Counter value to look up.
        #[arg(long)]
        at: u64,
    },
    /// Run a simulation script and print every event as a JSON line.
    Simulate {
        /// TOML script of `[[step]]` tables.
        #[arg(long)]
        script: PathBuf,

        /// State file loaded before the run (if present) and written after it.
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => HubConfig::from_toml_file(path)?,
        None => HubConfig::default(),
    };
    let format: LogFormat = cli
        .log_format
        .as_deref()
        .unwrap_or(&config.log_format)
        .parse()?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(format, level);

    match cli.command {
        Command::Epoch { at } => show_epoch(&config, at),
        Command::Simulate { script, state } => simulate(config, &script, state.as_deref()),
    }
}

fn show_epoch(config: &HubConfig, at: u64) -> anyhow::Result<()> {
    let schedule = EpochSchedule::new(Tick::new(config.origin), config.epoch_length)?;
    let now = Tick::new(at);
    let epoch = schedule.epoch_of(now)?;

    println!("epoch        {}", epoch.index);
    println!("start        {}", epoch.start);
    println!("end          {}", epoch.end);
    println!(
        "claim window {}..={} ({})",
        epoch.start,
        epoch.claim_deadline(),
        if epoch.claim_window_open(now) {
            "open"
        } else {
            "closed"
        }
    );
    Ok(())
}

fn simulate(config: HubConfig, script_path: &Path, state: Option<&Path>) -> anyhow::Result<()> {
    let script = Script::from_file(script_path)?;
    let governor = config.governor.clone();

    let clock = Arc::new(NullClock::new(config.origin));
    let mut bus = EventBus::new();
    bus.subscribe(Box::new(|event: &RewardEvent| {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(event = event.name(), error = %e, "unprintable event"),
        }
    }));
    let gateway = Arc::new(NullGateway::new());
    let hub = RewardHub::new(config, gateway.clone(), clock.clone(), Arc::new(bus))?;

    if let Some(path) = state.filter(|p| p.exists()) {
        hub.load_state(path)
            .with_context(|| format!("failed to load state from {}", path.display()))?;
        restore_custody(&hub, &gateway);
    }

    let mut rejected = 0usize;
    for (i, step) in script.steps.iter().enumerate() {
        clock.set(step.at);
        let outcome = match &step.action {
            Action::Stake { owner, amount } => {
                hub.stake(&AccountId::new(owner.as_str()), u128::from(*amount))
            }
            Action::Unstake { owner, amount } => {
                hub.unstake(&AccountId::new(owner.as_str()), u128::from(*amount))
            }
            Action::Claim { owner } => hub.claim(&AccountId::new(owner.as_str())).map(|_| ()),
            Action::Deposit {
                depositor,
                assets,
                amounts,
                epoch,
            } => {
                let depositor = AccountId::new(depositor.as_str());
                let assets: Vec<AssetId> = assets.iter().map(|a| AssetId::new(a.as_str())).collect();
                let amounts: Vec<u128> = amounts.iter().map(|&a| u128::from(a)).collect();
                match epoch {
                    Some(epoch) => hub.deposit(&depositor, &assets, &amounts, *epoch),
                    None => hub.deposit_current(&depositor, &assets, &amounts).map(|_| ()),
                }
            }
            Action::Rollover { target, source } => hub.rollover(*target, *source).map(|_| ()),
            Action::Allow {
                asset,
                allowed,
                caller,
            } => {
                let caller = AccountId::new(caller.as_deref().unwrap_or(&governor));
                hub.set_allowlist(&caller, &AssetId::new(asset.as_str()), *allowed)
            }
        };
        if let Err(e) = outcome {
            rejected += 1;
            tracing::warn!(step = i + 1, at = step.at, op = step.action.name(), error = %e, "step rejected");
        }
    }

    tracing::info!(
        steps = script.steps.len(),
        rejected,
        total_staked = hub.total_staked(),
        "simulation finished"
    );

    if let Some(path) = state {
        hub.save_state(path)
            .with_context(|| format!("failed to save state to {}", path.display()))?;
    }
    Ok(())
}

/// The in-memory gateway starts empty; give it the custody a resumed state
/// implies so payouts and unstakes can be released.
fn restore_custody(hub: &RewardHub, gateway: &NullGateway) {
    for (asset, amount) in hub.held_balances() {
        tracing::debug!(%asset, amount, "custody restored");
        gateway.set_custody(&asset, amount);
    }
}
