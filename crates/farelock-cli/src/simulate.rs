//! # Simulate Subcommand
//!
//! Replays a YAML scenario against an in-memory engine driven by a manual
//! clock. Each step names a command, the calling account, an optional
//! clock advance applied before the command, and the expected outcome
//! (`ok` or an error code such as `INVALID_STATE`).
//!
//! ```yaml
//! start: "2026-01-01T08:00:00Z"
//! balances:
//!   alice: 500
//! steps:
//!   - { command: register_driver, caller: bob, name: Bob }
//!   - { command: request_ride, caller: alice, amount: 120 }
//!   - { command: accept, caller: bob, ride: 1 }
//!   - { command: claim_refund_not_funded, caller: alice, ride: 1, expect: TIMEOUT_NOT_REACHED }
//!   - { command: claim_refund_not_funded, caller: alice, ride: 1, advance_secs: 900 }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use farelock_core::{AccountId, Amount, Location, ManualClock, RideId, Timestamp};
use farelock_engine::{EngineConfig, EngineError, EventJournal, RideEngine, TracingSink};
use farelock_escrow::{EscrowTotals, InMemoryLedger};
use farelock_state::{RefundKind, RideState};

/// Arguments for `farelock simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario script (YAML).
    pub script: PathBuf,

    /// Write the resulting event journal to this file as JSON.
    #[arg(long)]
    pub journal_out: Option<PathBuf>,

    /// Override the accept timeout, in seconds.
    #[arg(long)]
    pub accept_timeout_secs: Option<u64>,

    /// Override the start timeout, in seconds.
    #[arg(long)]
    pub start_timeout_secs: Option<u64>,

    /// Print the step reports as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

// ─── Script Format ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Initial clock reading. Defaults to the Unix epoch.
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub accept_timeout_secs: Option<u64>,
    #[serde(default)]
    pub start_timeout_secs: Option<u64>,
    /// Opening ledger balances.
    #[serde(default)]
    pub balances: BTreeMap<String, u64>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    /// Seconds to advance the clock before running the command.
    #[serde(default)]
    pub advance_secs: u64,
    /// `ok` or an error code.
    #[serde(default = "expect_ok")]
    pub expect: String,
    #[serde(flatten)]
    pub command: Command,
}

fn expect_ok() -> String {
    "ok".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    RegisterDriver {
        caller: AccountId,
        name: String,
    },
    VerifyIdentity {
        caller: AccountId,
    },
    RequestRide {
        caller: AccountId,
        amount: u64,
        #[serde(default)]
        pickup: Location,
        #[serde(default)]
        destination: Location,
    },
    Accept {
        caller: AccountId,
        ride: RideId,
    },
    Fund {
        caller: AccountId,
        ride: RideId,
        amount: u64,
    },
    Start {
        caller: AccountId,
        ride: RideId,
    },
    Complete {
        caller: AccountId,
        ride: RideId,
    },
    Confirm {
        caller: AccountId,
        ride: RideId,
    },
    Cancel {
        caller: AccountId,
        ride: RideId,
    },
    ClaimRefundNotFunded {
        caller: AccountId,
        ride: RideId,
    },
    ClaimRefundNotStarted {
        caller: AccountId,
        ride: RideId,
    },
    RateDriver {
        caller: AccountId,
        ride: RideId,
        rating: u8,
    },
    RateRider {
        caller: AccountId,
        ride: RideId,
        rating: u8,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterDriver { .. } => "register_driver",
            Self::VerifyIdentity { .. } => "verify_identity",
            Self::RequestRide { .. } => "request_ride",
            Self::Accept { .. } => "accept",
            Self::Fund { .. } => "fund",
            Self::Start { .. } => "start",
            Self::Complete { .. } => "complete",
            Self::Confirm { .. } => "confirm",
            Self::Cancel { .. } => "cancel",
            Self::ClaimRefundNotFunded { .. } => "claim_refund_not_funded",
            Self::ClaimRefundNotStarted { .. } => "claim_refund_not_started",
            Self::RateDriver { .. } => "rate_driver",
            Self::RateRider { .. } => "rate_rider",
        }
    }

    pub fn caller(&self) -> &AccountId {
        match self {
            Self::RegisterDriver { caller, .. }
            | Self::VerifyIdentity { caller }
            | Self::RequestRide { caller, .. }
            | Self::Accept { caller, .. }
            | Self::Fund { caller, .. }
            | Self::Start { caller, .. }
            | Self::Complete { caller, .. }
            | Self::Confirm { caller, .. }
            | Self::Cancel { caller, .. }
            | Self::ClaimRefundNotFunded { caller, .. }
            | Self::ClaimRefundNotStarted { caller, .. }
            | Self::RateDriver { caller, .. }
            | Self::RateRider { caller, .. } => caller,
        }
    }
}

// ─── Reports ─────────────────────────────────────────────────────────

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub command: &'static str,
    pub caller: AccountId,
    pub at: Timestamp,
    /// `ok` or the error code.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ride touched by the command and its state afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride: Option<RideId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RideState>,
    pub expected: String,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StepReport>,
    pub failures: usize,
    pub escrow: EscrowTotals,
    pub escrow_conserved: bool,
}

impl SimulationReport {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

// ─── Runner ──────────────────────────────────────────────────────────

/// Engine, ledger and journal wired the way the server wires them, but
/// on a manual clock.
pub struct Simulation {
    pub engine: RideEngine,
    pub ledger: Arc<InMemoryLedger>,
    pub journal: Arc<EventJournal>,
    pub clock: Arc<ManualClock>,
}

impl Simulation {
    pub fn new(config: EngineConfig, start: Timestamp) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let ledger = Arc::new(InMemoryLedger::new());
        let journal = Arc::new(EventJournal::new());
        let engine = RideEngine::new(config, clock.clone(), ledger.clone())
            .with_sink(Arc::new(TracingSink))
            .with_sink(journal.clone());
        Self {
            engine,
            ledger,
            journal,
            clock,
        }
    }

    /// Run every step, continuing past failed expectations.
    pub fn run(&self, steps: &[Step]) -> SimulationReport {
        let reports: Vec<StepReport> = steps
            .iter()
            .enumerate()
            .map(|(index, step)| self.run_step(index, step))
            .collect();
        let failures = reports.iter().filter(|r| !r.passed).count();
        let escrow = self.engine.escrow_totals();
        SimulationReport {
            steps: reports,
            failures,
            escrow_conserved: escrow.is_conserved() && self.ledger.custody() == escrow.held,
            escrow,
        }
    }

    fn run_step(&self, index: usize, step: &Step) -> StepReport {
        if step.advance_secs > 0 {
            self.clock.advance(Duration::from_secs(step.advance_secs));
        }
        let result = self.execute(&step.command);
        let (outcome, message, ride, state) = match result {
            Ok((ride, state)) => ("ok".to_string(), None, ride, state),
            Err(e) => (e.kind().as_str().to_string(), Some(e.to_string()), None, None),
        };
        let passed = outcome.eq_ignore_ascii_case(&step.expect);
        if !passed {
            tracing::warn!(step = index, command = step.command.name(), %outcome, expected = %step.expect, "expectation failed");
        }
        StepReport {
            index,
            command: step.command.name(),
            caller: step.command.caller().clone(),
            at: self.engine.now(),
            outcome,
            message,
            ride,
            state,
            expected: step.expect.clone(),
            passed,
        }
    }

    fn execute(&self, command: &Command) -> Result<(Option<RideId>, Option<RideState>), EngineError> {
        let engine = &self.engine;
        let receipt = match command {
            Command::RegisterDriver { caller, name } => {
                engine.register_driver(caller, name)?;
                return Ok((None, None));
            }
            Command::VerifyIdentity { caller } => {
                engine.verify_identity(caller)?;
                return Ok((None, None));
            }
            Command::RequestRide {
                caller,
                amount,
                pickup,
                destination,
            } => engine.request_ride(caller, Amount::new(*amount), pickup.clone(), destination.clone())?,
            Command::Accept { caller, ride } => engine.accept_ride(*ride, caller)?,
            Command::Fund {
                caller,
                ride,
                amount,
            } => engine.fund_ride(*ride, caller, Amount::new(*amount))?,
            Command::Start { caller, ride } => engine.start_ride(*ride, caller)?,
            Command::Complete { caller, ride } => engine.complete_ride(*ride, caller)?,
            Command::Confirm { caller, ride } => engine.confirm_arrival(*ride, caller)?,
            Command::Cancel { caller, ride } => engine.cancel_ride(*ride, caller)?,
            Command::ClaimRefundNotFunded { caller, ride } => {
                engine.claim_refund(*ride, caller, RefundKind::NotFunded)?
            }
            Command::ClaimRefundNotStarted { caller, ride } => {
                engine.claim_refund(*ride, caller, RefundKind::NotStarted)?
            }
            Command::RateDriver {
                caller,
                ride,
                rating,
            } => {
                engine.rate_driver(*ride, caller, *rating)?;
                return Ok((Some(*ride), Some(engine.ride(*ride)?.state)));
            }
            Command::RateRider {
                caller,
                ride,
                rating,
            } => {
                engine.rate_rider(*ride, caller, *rating)?;
                return Ok((Some(*ride), Some(engine.ride(*ride)?.state)));
            }
        };
        Ok((Some(receipt.ride.id), Some(receipt.ride.state)))
    }
}

/// Parse a YAML scenario.
pub fn parse_script(yaml: &str) -> Result<Script> {
    serde_yaml::from_str(yaml).context("invalid scenario script")
}

/// Build the simulation for `script`, applying CLI overrides on top of the
/// script's own settings.
pub fn prepare(script: &Script, args: &SimulateArgs) -> Result<Simulation> {
    let defaults = EngineConfig::default();
    let accept = args
        .accept_timeout_secs
        .or(script.accept_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(defaults.accept_timeout());
    let start_timeout = args
        .start_timeout_secs
        .or(script.start_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(defaults.start_timeout());
    let config = EngineConfig::new(accept, start_timeout)?;

    let start = match &script.start {
        Some(raw) => Timestamp::parse(raw).with_context(|| format!("invalid start time {raw:?}"))?,
        None => Timestamp::from_epoch_secs(0)?,
    };

    let sim = Simulation::new(config, start);
    for (account, balance) in &script.balances {
        let account = AccountId::new(account.as_str())
            .with_context(|| format!("invalid account {account:?} in balances"))?;
        sim.ledger.credit(&account, Amount::new(*balance))?;
    }
    Ok(sim)
}

/// Execute `farelock simulate`. Returns 0 when every expectation held.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let yaml = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read {}", args.script.display()))?;
    let script = parse_script(&yaml)?;
    let sim = prepare(&script, args)?;
    let report = sim.run(&script.steps);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(path) = &args.journal_out {
        write_journal(&sim.journal, path)?;
        println!("journal: {} entries written to {}", sim.journal.len(), path.display());
    }

    Ok(if report.passed() { 0 } else { 1 })
}

fn print_report(report: &SimulationReport) {
    for step in &report.steps {
        let mark = if step.passed { "OK  " } else { "FAIL" };
        let ride = step.ride.map(|r| format!(" {r}")).unwrap_or_default();
        let state = step.state.map(|s| format!(" -> {s}")).unwrap_or_default();
        println!(
            "{mark} [{:>2}] {} {}{ride}: {}{state}",
            step.index, step.caller, step.command, step.outcome
        );
        if !step.passed {
            println!("       expected {}", step.expected);
        }
        if let Some(message) = &step.message {
            println!("       {message}");
        }
    }
    let escrow = &report.escrow;
    println!(
        "escrow: held {} deposited {} released {} refunded {} ({})",
        escrow.held,
        escrow.deposited,
        escrow.released,
        escrow.refunded,
        if report.escrow_conserved { "conserved" } else { "NOT CONSERVED" }
    );
    println!("{} steps, {} failed", report.steps.len(), report.failures);
}

fn write_journal(journal: &EventJournal, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&journal.entries())?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: &str = r#"
start: "2026-01-01T08:00:00Z"
balances:
  alice: 500
steps:
  - { command: register_driver, caller: bob, name: Bob }
  - { command: request_ride, caller: alice, amount: 120 }
  - { command: accept, caller: bob, ride: 1 }
  - { command: fund, caller: alice, ride: 1, amount: 120 }
  - { command: start, caller: alice, ride: 1, expect: NOT_AUTHORIZED }
  - { command: start, caller: bob, ride: 1 }
  - { command: complete, caller: bob, ride: 1 }
  - { command: confirm, caller: alice, ride: 1 }
  - { command: rate_driver, caller: alice, ride: 1, rating: 5 }
"#;

    fn args() -> SimulateArgs {
        SimulateArgs {
            script: PathBuf::from("unused.yaml"),
            journal_out: None,
            accept_timeout_secs: None,
            start_timeout_secs: None,
            json: false,
        }
    }

    fn simulate(yaml: &str) -> (Simulation, SimulationReport) {
        let script = parse_script(yaml).unwrap();
        let sim = prepare(&script, &args()).unwrap();
        let report = sim.run(&script.steps);
        (sim, report)
    }

    #[test]
    fn happy_path_script_passes() {
        let (sim, report) = simulate(HAPPY_PATH);
        assert!(report.passed(), "{report:#?}");
        assert!(report.escrow_conserved);
        assert_eq!(report.steps[7].state, Some(RideState::Finalized));
        assert_eq!(report.steps[4].outcome, "NOT_AUTHORIZED");
        let bob = AccountId::new("bob").unwrap();
        assert_eq!(sim.ledger.balance(&bob), Amount::new(120));
        assert_eq!(sim.engine.driver_rating(&bob).average_scaled_by_10, 50);
        sim.journal.verify().unwrap();
    }

    #[test]
    fn unmet_expectation_is_reported() {
        let yaml = r#"
steps:
  - { command: request_ride, caller: alice, amount: 10 }
  - { command: start, caller: alice, ride: 1 }
"#;
        let (_, report) = simulate(yaml);
        assert_eq!(report.failures, 1);
        assert_eq!(report.steps[1].outcome, "INVALID_STATE");
        assert!(!report.steps[1].passed);
    }

    #[test]
    fn clock_advance_opens_refund_window() {
        let yaml = r#"
start: "2026-01-01T08:00:00Z"
accept_timeout_secs: 60
steps:
  - { command: register_driver, caller: bob, name: Bob }
  - { command: request_ride, caller: alice, amount: 10 }
  - { command: accept, caller: bob, ride: 1 }
  - { command: claim_refund_not_funded, caller: alice, ride: 1, advance_secs: 59, expect: TIMEOUT_NOT_REACHED }
  - { command: claim_refund_not_funded, caller: alice, ride: 1, advance_secs: 1 }
"#;
        let (_, report) = simulate(yaml);
        assert!(report.passed(), "{report:#?}");
        assert_eq!(report.steps[4].state, Some(RideState::Refunded));
    }

    #[test]
    fn cli_override_beats_script_timeout() {
        let yaml = "accept_timeout_secs: 60\nsteps: []\n";
        let script = parse_script(yaml).unwrap();
        let mut args = args();
        args.accept_timeout_secs = Some(5);
        let sim = prepare(&script, &args).unwrap();
        assert_eq!(sim.engine.config().accept_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn unknown_command_is_a_parse_error() {
        assert!(parse_script("steps:\n  - { command: teleport, caller: a }\n").is_err());
    }

    #[test]
    fn writes_verifiable_journal() {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("happy.yaml");
        let journal_path = dir.path().join("journal.json");
        std::fs::write(&script_path, HAPPY_PATH).unwrap();

        let args = SimulateArgs {
            script: script_path,
            journal_out: Some(journal_path.clone()),
            accept_timeout_secs: None,
            start_timeout_secs: None,
            json: true,
        };
        assert_eq!(run_simulate(&args).unwrap(), 0);

        let entries: Vec<farelock_engine::JournalEntry> =
            serde_json::from_str(&std::fs::read_to_string(journal_path).unwrap()).unwrap();
        assert_eq!(entries.len(), 8);
        farelock_engine::verify_chain(&entries).unwrap();
    }

    #[test]
    fn bundled_scenarios_pass() {
        for yaml in [
            include_str!("../scenarios/happy_path.yaml"),
            include_str!("../scenarios/refund_timeouts.yaml"),
        ] {
            let (sim, report) = simulate(yaml);
            assert!(report.passed(), "{report:#?}");
            assert!(report.escrow_conserved);
            assert_eq!(report.escrow.held, Amount::ZERO);
            sim.journal.verify().unwrap();
        }
    }
}
