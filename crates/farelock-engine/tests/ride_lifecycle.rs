//! # Ride Lifecycle Integration Tests
//!
//! Drives the engine end to end against an in-memory ledger and a manual
//! clock: the reference scenarios, terminal-state behaviour, and an
//! exhaustive attempt of every command from every state.

use std::sync::Arc;
use std::time::Duration;

use farelock_core::{AccountId, Amount, Location, ManualClock, RideId, Timestamp};
use farelock_engine::{EngineConfig, ErrorKind, EventJournal, RideEngine};
use farelock_escrow::InMemoryLedger;
use farelock_state::{RideState, RefundKind, RefundWindow};

const FARE: Amount = Amount::new(1_000);
const OPENING_BALANCE: Amount = Amount::new(10_000);

struct World {
    clock: Arc<ManualClock>,
    ledger: Arc<InMemoryLedger>,
    journal: Arc<EventJournal>,
    engine: RideEngine,
    rider: AccountId,
    driver: AccountId,
}

impl World {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Timestamp::parse("2026-04-01T08:00:00Z").unwrap(),
        ));
        let ledger = Arc::new(InMemoryLedger::new());
        let journal = Arc::new(EventJournal::new());
        let engine = RideEngine::new(EngineConfig::default(), clock.clone(), ledger.clone())
            .with_sink(journal.clone());
        let rider = AccountId::new("rider").unwrap();
        let driver = AccountId::new("driver").unwrap();
        ledger.credit(&rider, OPENING_BALANCE).unwrap();
        engine.register_driver(&driver, "Dana").unwrap();
        Self {
            clock,
            ledger,
            journal,
            engine,
            rider,
            driver,
        }
    }

    fn request(&self) -> RideId {
        self.engine
            .request_ride(&self.rider, FARE, Location::default(), Location::default())
            .unwrap()
            .ride
            .id
    }

    fn advance_mins(&self, mins: u64) {
        self.clock.advance(Duration::from_secs(mins * 60));
    }

    fn state(&self, id: RideId) -> RideState {
        self.engine.ride(id).unwrap().state
    }

    /// A fresh ride brought into `target` by the legitimate parties.
    fn ride_in(&self, target: RideState) -> RideId {
        let id = self.request();
        let path: &[RideState] = match target {
            RideState::Requested => &[],
            RideState::Accepted => &[RideState::Accepted],
            RideState::Funded => &[RideState::Accepted, RideState::Funded],
            RideState::Started => &[RideState::Accepted, RideState::Funded, RideState::Started],
            RideState::CompletedByDriver => &[
                RideState::Accepted,
                RideState::Funded,
                RideState::Started,
                RideState::CompletedByDriver,
            ],
            RideState::Finalized => &[
                RideState::Accepted,
                RideState::Funded,
                RideState::Started,
                RideState::CompletedByDriver,
                RideState::Finalized,
            ],
            RideState::Cancelled => &[RideState::Cancelled],
            RideState::Refunded => &[RideState::Accepted, RideState::Refunded],
        };
        for step in path {
            match step {
                RideState::Accepted => self.engine.accept_ride(id, &self.driver).map(drop),
                RideState::Funded => self.engine.fund_ride(id, &self.rider, FARE).map(drop),
                RideState::Started => self.engine.start_ride(id, &self.driver).map(drop),
                RideState::CompletedByDriver => self.engine.complete_ride(id, &self.driver).map(drop),
                RideState::Finalized => self.engine.confirm_arrival(id, &self.rider).map(drop),
                RideState::Cancelled => self.engine.cancel_ride(id, &self.rider).map(drop),
                RideState::Refunded => {
                    self.advance_mins(15);
                    self.engine.claim_refund_not_funded(id, &self.rider).map(drop)
                }
                RideState::Requested => Ok(()),
            }
            .unwrap();
        }
        assert_eq!(self.state(id), target);
        id
    }
}

// ─── Reference scenarios ────────────────────────────────────────────

#[test]
fn happy_path_pays_the_driver() {
    let w = World::new();
    let id = w.request();
    let escrow_before = w.engine.escrow_totals().held;

    w.engine.accept_ride(id, &w.driver).unwrap();
    w.engine.fund_ride(id, &w.rider, FARE).unwrap();
    assert_eq!(w.engine.escrow_held_for(id).unwrap(), FARE);
    w.engine.start_ride(id, &w.driver).unwrap();
    w.engine.complete_ride(id, &w.driver).unwrap();
    let receipt = w.engine.confirm_arrival(id, &w.rider).unwrap();

    assert_eq!(receipt.ride.state, RideState::Finalized);
    assert_eq!(w.ledger.balance(&w.driver), FARE);
    assert_eq!(w.ledger.balance(&w.rider), Amount::new(9_000));
    assert_eq!(w.engine.escrow_totals().held, escrow_before);
    assert_eq!(w.ledger.custody(), Amount::ZERO);

    let ride = receipt.ride;
    assert!(ride.accepted_at.is_some() && ride.funded_at.is_some());
    assert!(ride.started_at.is_some() && ride.completed_at.is_some());
    assert!(ride.finalized_at.is_some());
    assert_eq!(ride.closed_at, None);
    assert_eq!(ride.transitions.len(), 5);
}

#[test]
fn unfunded_ride_refunds_after_accept_timeout() {
    let w = World::new();
    let id = w.request();
    w.engine.accept_ride(id, &w.driver).unwrap();
    w.advance_mins(16);

    let receipt = w.engine.claim_refund_not_funded(id, &w.rider).unwrap();
    assert_eq!(receipt.ride.state, RideState::Refunded);
    assert!(receipt.ride.closed_at.is_some());
    assert_eq!(w.ledger.balance(&w.rider), OPENING_BALANCE);
    assert_eq!(w.engine.escrow_totals().deposited, Amount::ZERO);
}

#[test]
fn rider_cancels_funded_ride_and_is_refunded() {
    let w = World::new();
    let id = w.request();
    w.engine.accept_ride(id, &w.driver).unwrap();
    w.engine.fund_ride(id, &w.rider, FARE).unwrap();
    assert_eq!(w.ledger.balance(&w.rider), Amount::new(9_000));

    let receipt = w.engine.cancel_ride(id, &w.rider).unwrap();
    assert_eq!(receipt.ride.state, RideState::Cancelled);
    assert_eq!(w.ledger.balance(&w.rider), OPENING_BALANCE);
    assert_eq!(w.engine.escrow_held_for(id).unwrap(), Amount::ZERO);
    assert!(w.engine.escrow_totals().is_conserved());
}

#[test]
fn started_ride_cannot_be_cancelled() {
    let w = World::new();
    let id = w.ride_in(RideState::Started);
    for caller in [&w.rider, &w.driver] {
        let err = w.engine.cancel_ride(id, caller).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
    assert_eq!(w.state(id), RideState::Started);
    assert_eq!(w.engine.escrow_held_for(id).unwrap(), FARE);
}

#[test]
fn driver_average_across_two_rides() {
    let w = World::new();
    for score in [4, 5] {
        let id = w.ride_in(RideState::Finalized);
        w.engine.rate_driver(id, &w.rider, score).unwrap();
    }
    let summary = w.engine.driver_rating(&w.driver);
    assert!(summary.is_registered);
    assert_eq!(summary.average_scaled_by_10, 45);
    assert_eq!(summary.rating_count, 2);
}

#[test]
fn underfunding_is_rejected() {
    let w = World::new();
    let id = w.ride_in(RideState::Accepted);
    let err = w.engine.fund_ride(id, &w.rider, Amount::new(500)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientValue);
    assert_eq!(w.state(id), RideState::Accepted);
    assert_eq!(w.ledger.balance(&w.rider), OPENING_BALANCE);
}

// ─── Authorization ──────────────────────────────────────────────────

#[test]
fn commands_reject_the_wrong_party() {
    let w = World::new();
    let stranger = AccountId::new("stranger").unwrap();
    let id = w.ride_in(RideState::Accepted);

    assert_eq!(
        w.engine.fund_ride(id, &w.driver, FARE).unwrap_err().kind(),
        ErrorKind::NotAuthorized
    );
    assert_eq!(
        w.engine.cancel_ride(id, &stranger).unwrap_err().kind(),
        ErrorKind::NotAuthorized
    );

    w.engine.fund_ride(id, &w.rider, FARE).unwrap();
    assert_eq!(
        w.engine.start_ride(id, &w.rider).unwrap_err().kind(),
        ErrorKind::NotAuthorized
    );
    w.advance_mins(30);
    assert_eq!(
        w.engine.claim_refund_not_started(id, &w.driver).unwrap_err().kind(),
        ErrorKind::NotAuthorized
    );
    assert_eq!(w.state(id), RideState::Funded);
}

#[test]
fn state_is_checked_before_identity() {
    let w = World::new();
    let id = w.ride_in(RideState::Requested);
    let stranger = AccountId::new("stranger").unwrap();
    let err = w.engine.start_ride(id, &stranger).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn driver_may_cancel_before_start() {
    let w = World::new();
    let id = w.ride_in(RideState::Funded);
    let receipt = w.engine.cancel_ride(id, &w.driver).unwrap();
    assert_eq!(receipt.ride.state, RideState::Cancelled);
    assert_eq!(w.ledger.balance(&w.rider), OPENING_BALANCE);
}

// ─── Refund windows ─────────────────────────────────────────────────

#[test]
fn refund_before_timeout_reports_eligibility() {
    let w = World::new();
    let id = w.ride_in(RideState::Funded);
    let funded_at = w.engine.ride(id).unwrap().funded_at.unwrap();
    w.advance_mins(29);

    let err = w.engine.claim_refund_not_started(id, &w.rider).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TimeoutNotReached);
    assert!(err.to_string().contains(&funded_at.saturating_add(Duration::from_secs(1800)).to_string()));

    match w.engine.refund_status(id).unwrap() {
        RefundWindow::Pending {
            kind,
            remaining_secs,
            ..
        } => {
            assert_eq!(kind, RefundKind::NotStarted);
            assert_eq!(remaining_secs, 60);
        }
        other => panic!("expected pending window, got {other:?}"),
    }

    w.advance_mins(1);
    let receipt = w.engine.claim_refund_not_started(id, &w.rider).unwrap();
    assert_eq!(receipt.ride.state, RideState::Refunded);
    assert_eq!(w.ledger.balance(&w.rider), OPENING_BALANCE);
}

#[test]
fn wrong_refund_kind_is_invalid_state() {
    let w = World::new();
    let id = w.ride_in(RideState::Accepted);
    w.advance_mins(60);
    assert_eq!(
        w.engine.claim_refund_not_started(id, &w.rider).unwrap_err().kind(),
        ErrorKind::InvalidState
    );
}

// ─── Terminal states ────────────────────────────────────────────────

#[test]
fn terminal_rides_reject_every_mutation_and_read_stably() {
    let w = World::new();
    for terminal in [RideState::Finalized, RideState::Cancelled, RideState::Refunded] {
        let id = w.ride_in(terminal);
        let before = w.engine.ride(id).unwrap();
        w.advance_mins(60);

        let attempts = [
            w.engine.accept_ride(id, &w.driver),
            w.engine.fund_ride(id, &w.rider, FARE),
            w.engine.start_ride(id, &w.driver),
            w.engine.complete_ride(id, &w.driver),
            w.engine.confirm_arrival(id, &w.rider),
            w.engine.cancel_ride(id, &w.rider),
            w.engine.claim_refund_not_funded(id, &w.rider),
            w.engine.claim_refund_not_started(id, &w.rider),
        ];
        for result in attempts {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidState);
        }
        assert_eq!(w.engine.ride(id).unwrap(), before);
        assert_eq!(w.engine.ride(id).unwrap(), w.engine.ride(id).unwrap());
    }
}

// ─── Exhaustive transition table ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Accept,
    Fund,
    Start,
    Complete,
    Confirm,
    Cancel,
    RefundNotFunded,
    RefundNotStarted,
}

const COMMANDS: [Command; 8] = [
    Command::Accept,
    Command::Fund,
    Command::Start,
    Command::Complete,
    Command::Confirm,
    Command::Cancel,
    Command::RefundNotFunded,
    Command::RefundNotStarted,
];

fn allowed(from: RideState, command: Command) -> Option<RideState> {
    use Command::*;
    use RideState::*;
    match (from, command) {
        (Requested, Accept) => Some(Accepted),
        (Accepted, Fund) => Some(Funded),
        (Funded, Start) => Some(Started),
        (Started, Complete) => Some(CompletedByDriver),
        (CompletedByDriver, Confirm) => Some(Finalized),
        (Requested | Accepted | Funded, Cancel) => Some(Cancelled),
        (Accepted, RefundNotFunded) => Some(Refunded),
        (Funded, RefundNotStarted) => Some(Refunded),
        _ => None,
    }
}

#[test]
fn only_documented_edges_succeed() {
    for from in RideState::ALL {
        for command in COMMANDS {
            let w = World::new();
            let id = w.ride_in(from);
            // Past every timeout so refund edges are only gated by state.
            w.advance_mins(60);

            let result = match command {
                Command::Accept => w.engine.accept_ride(id, &w.driver),
                Command::Fund => w.engine.fund_ride(id, &w.rider, FARE),
                Command::Start => w.engine.start_ride(id, &w.driver),
                Command::Complete => w.engine.complete_ride(id, &w.driver),
                Command::Confirm => w.engine.confirm_arrival(id, &w.rider),
                Command::Cancel => w.engine.cancel_ride(id, &w.rider),
                Command::RefundNotFunded => w.engine.claim_refund_not_funded(id, &w.rider),
                Command::RefundNotStarted => w.engine.claim_refund_not_started(id, &w.rider),
            };

            match allowed(from, command) {
                Some(to) => {
                    let receipt = result.unwrap_or_else(|e| {
                        panic!("{command:?} from {from} should succeed, got {e}")
                    });
                    assert_eq!(receipt.ride.state, to, "{command:?} from {from}");
                }
                None => {
                    let err = result.expect_err("undocumented edge succeeded");
                    assert_eq!(err.kind(), ErrorKind::InvalidState, "{command:?} from {from}");
                    assert_eq!(w.state(id), from);
                }
            }
            assert!(w.engine.escrow_totals().is_conserved());
        }
    }
}

// ─── Journal ────────────────────────────────────────────────────────

#[test]
fn journal_records_one_event_per_command() {
    let w = World::new();
    let id = w.ride_in(RideState::Finalized);
    w.engine.rate_driver(id, &w.rider, 5).unwrap();
    w.engine.rate_rider(id, &w.driver, 4).unwrap();

    let names: Vec<_> = w
        .journal
        .for_ride(id)
        .iter()
        .map(|entry| entry.event.name())
        .collect();
    assert_eq!(
        names,
        vec![
            "ride_requested",
            "ride_accepted",
            "ride_funded",
            "ride_started",
            "ride_completed",
            "ride_finalized",
            "driver_rated",
            "rider_rated",
        ]
    );
    assert_eq!(w.journal.len(), names.len() + 1);
    w.journal.verify().unwrap();
}

#[test]
fn failed_commands_emit_nothing() {
    let w = World::new();
    let id = w.ride_in(RideState::Accepted);
    let before = w.journal.len();
    assert!(w.engine.fund_ride(id, &w.rider, Amount::new(1)).is_err());
    assert!(w.engine.start_ride(id, &w.driver).is_err());
    assert!(w.engine.register_driver(&w.driver, "again").is_err());
    assert_eq!(w.journal.len(), before);
}
