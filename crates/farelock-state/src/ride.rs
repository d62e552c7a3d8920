//! # Ride Lifecycle State Machine
//!
//! One `Ride` per request. The state is a closed enum and every transition
//! is a method that checks the current state, then the caller's identity,
//! then applies the effect. A rejected call leaves the ride untouched.
//!
//! ## States
//!
//! ```text
//! Requested ──▶ Accepted ──▶ Funded ──▶ Started ──▶ CompletedByDriver ──▶ Finalized
//!     │            │  │        │  │
//!     │            │  │        │  └──▶ Refunded (start timeout)
//!     │            │  └──▶ Refunded (accept timeout)
//!     └────────────┴───────────┴──▶ Cancelled
//! ```
//!
//! `Finalized`, `Cancelled` and `Refunded` are terminal.
//!
//! ## Value movement
//!
//! The ride never moves value itself. Methods that imply a transfer return
//! what must be moved (payout recipient, refund amount); the engine applies
//! the transition to a staged copy, performs the transfer, and only then
//! commits the copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::{AccountId, Amount, Location, RideId, Timestamp};

use crate::rating::RatingDirection;
use crate::refund::{RefundKind, RefundWindow, RideTimeouts};

// ─── Ride State ──────────────────────────────────────────────────────

/// The lifecycle state of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideState {
    /// Rider has asked for a ride; no driver yet.
    Requested,
    /// A registered driver took the ride; waiting for the rider to fund.
    Accepted,
    /// Fare is held in escrow; waiting for the driver to start.
    Funded,
    /// Trip is underway.
    Started,
    /// Driver reports arrival; waiting for the rider to confirm.
    CompletedByDriver,
    /// Rider confirmed; driver paid (terminal).
    Finalized,
    /// Aborted before the trip started (terminal).
    Cancelled,
    /// Rider recovered through a timeout path (terminal).
    Refunded,
}

impl RideState {
    /// Every state, in lifecycle order.
    pub const ALL: [RideState; 8] = [
        Self::Requested,
        Self::Accepted,
        Self::Funded,
        Self::Started,
        Self::CompletedByDriver,
        Self::Finalized,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// States from which `cancel` is legal.
    pub const CANCELLABLE: [RideState; 3] = [Self::Requested, Self::Accepted, Self::Funded];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Cancelled | Self::Refunded)
    }

    /// Whether the fare is held in escrow while the ride is in this state.
    pub fn holds_escrow(&self) -> bool {
        matches!(self, Self::Funded | Self::Started | Self::CompletedByDriver)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "REQUESTED",
            Self::Accepted => "ACCEPTED",
            Self::Funded => "FUNDED",
            Self::Started => "STARTED",
            Self::CompletedByDriver => "COMPLETED_BY_DRIVER",
            Self::Finalized => "FINALIZED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Short human-readable description for display surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Requested => "Waiting for a driver",
            Self::Accepted => "Driver assigned, waiting for payment",
            Self::Funded => "Paid, waiting for pickup",
            Self::Started => "On the way",
            Self::CompletedByDriver => "Arrived, waiting for rider confirmation",
            Self::Finalized => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for RideState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transition Table ────────────────────────────────────────────────

/// Who may issue a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Rider,
    /// Any account in the driver registry.
    RegisteredDriver,
    /// The driver who accepted the ride.
    AssignedDriver,
    RiderOrDriver,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::RegisteredDriver => "registered driver",
            Self::AssignedDriver => "assigned driver",
            Self::RiderOrDriver => "rider or driver",
        }
    }
}

/// One legal edge of the ride machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub command: &'static str,
    pub from: RideState,
    pub to: RideState,
    pub party: Party,
    /// Extra condition beyond state and caller, if any.
    pub guard: Option<&'static str>,
}

const fn rule(
    command: &'static str,
    from: RideState,
    to: RideState,
    party: Party,
    guard: Option<&'static str>,
) -> TransitionRule {
    TransitionRule {
        command,
        from,
        to,
        party,
        guard,
    }
}

/// Every legal transition. Anything not listed is rejected.
pub const TRANSITIONS: [TransitionRule; 10] = [
    rule("accept", RideState::Requested, RideState::Accepted, Party::RegisteredDriver, None),
    rule("fund", RideState::Accepted, RideState::Funded, Party::Rider, Some("value >= fare")),
    rule("start", RideState::Funded, RideState::Started, Party::AssignedDriver, None),
    rule("complete", RideState::Started, RideState::CompletedByDriver, Party::AssignedDriver, None),
    rule("confirm", RideState::CompletedByDriver, RideState::Finalized, Party::Rider, None),
    rule("cancel", RideState::Requested, RideState::Cancelled, Party::RiderOrDriver, None),
    rule("cancel", RideState::Accepted, RideState::Cancelled, Party::RiderOrDriver, None),
    rule("cancel", RideState::Funded, RideState::Cancelled, Party::RiderOrDriver, None),
    rule(
        "claim_refund_not_funded",
        RideState::Accepted,
        RideState::Refunded,
        Party::Rider,
        Some("accept timeout elapsed"),
    ),
    rule(
        "claim_refund_not_started",
        RideState::Funded,
        RideState::Refunded,
        Party::Rider,
        Some("start timeout elapsed"),
    ),
];

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by ride transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RideError {
    /// The ride is not in a state that allows the operation.
    #[error("{ride_id} is {current}, expected {}", format_states(.expected))]
    InvalidState {
        ride_id: RideId,
        current: RideState,
        expected: Vec<RideState>,
    },

    #[error("{caller} is not the rider of {ride_id}")]
    NotRider { ride_id: RideId, caller: AccountId },

    #[error("{caller} is not the driver of {ride_id}")]
    NotDriver { ride_id: RideId, caller: AccountId },

    #[error("{caller} is neither rider nor driver of {ride_id}")]
    NotParticipant { ride_id: RideId, caller: AccountId },

    /// Funding offered less than the fare.
    #[error("fare is {required}, but only {provided} was offered")]
    InsufficientValue { required: Amount, provided: Amount },

    /// A refund was claimed before its window elapsed.
    #[error("{kind} refund for {ride_id} not available until {eligible_at} (now {now})")]
    TimeoutNotReached {
        ride_id: RideId,
        kind: RefundKind,
        now: Timestamp,
        eligible_at: Timestamp,
    },

    /// A post-acceptance ride with no driver. Unreachable through the
    /// transition methods.
    #[error("{0} has no driver assigned")]
    DriverUnset(RideId),
}

fn format_states(states: &[RideState]) -> String {
    match states {
        [one] => one.to_string(),
        many => {
            let names: Vec<&str> = many.iter().map(RideState::as_str).collect();
            format!("one of [{}]", names.join(", "))
        }
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a ride state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideTransitionRecord {
    pub from_state: RideState,
    pub to_state: RideState,
    pub at: Timestamp,
    /// Account that issued the command.
    pub actor: AccountId,
}

// ─── Ride ────────────────────────────────────────────────────────────

/// A ride and its full transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ride {
    pub id: RideId,
    pub rider: AccountId,
    /// `None` until a driver accepts.
    pub driver: Option<AccountId>,
    /// Fare, fixed at request time.
    pub amount: Amount,
    pub state: RideState,
    pub pickup: Location,
    pub destination: Location,
    pub requested_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub funded_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub finalized_at: Option<Timestamp>,
    /// When the ride was cancelled or refunded.
    pub closed_at: Option<Timestamp>,
    pub transitions: Vec<RideTransitionRecord>,
}

impl Ride {
    /// Create a ride in `REQUESTED`.
    pub fn request(
        id: RideId,
        rider: AccountId,
        amount: Amount,
        pickup: Location,
        destination: Location,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            rider,
            driver: None,
            amount,
            state: RideState::Requested,
            pickup,
            destination,
            requested_at: now,
            accepted_at: None,
            funded_at: None,
            started_at: None,
            completed_at: None,
            finalized_at: None,
            closed_at: None,
            transitions: Vec::new(),
        }
    }

    /// REQUESTED → ACCEPTED. The caller must already be known to be a
    /// registered driver.
    pub fn accept(&mut self, driver: AccountId, now: Timestamp) -> Result<(), RideError> {
        self.require_state(RideState::Requested)?;
        self.driver = Some(driver.clone());
        self.accepted_at = Some(now);
        self.do_transition(RideState::Accepted, driver, now);
        Ok(())
    }

    /// ACCEPTED → FUNDED. Returns the part of `offered` above the fare,
    /// which is never collected.
    pub fn fund(
        &mut self,
        caller: &AccountId,
        offered: Amount,
        now: Timestamp,
    ) -> Result<Amount, RideError> {
        self.require_state(RideState::Accepted)?;
        self.require_rider(caller)?;
        if offered < self.amount {
            return Err(RideError::InsufficientValue {
                required: self.amount,
                provided: offered,
            });
        }
        self.funded_at = Some(now);
        self.do_transition(RideState::Funded, caller.clone(), now);
        Ok(offered.saturating_sub(self.amount))
    }

    /// FUNDED → STARTED.
    pub fn start(&mut self, caller: &AccountId, now: Timestamp) -> Result<(), RideError> {
        self.require_state(RideState::Funded)?;
        self.require_driver(caller)?;
        self.started_at = Some(now);
        self.do_transition(RideState::Started, caller.clone(), now);
        Ok(())
    }

    /// STARTED → COMPLETED_BY_DRIVER.
    pub fn complete(&mut self, caller: &AccountId, now: Timestamp) -> Result<(), RideError> {
        self.require_state(RideState::Started)?;
        self.require_driver(caller)?;
        self.completed_at = Some(now);
        self.do_transition(RideState::CompletedByDriver, caller.clone(), now);
        Ok(())
    }

    /// COMPLETED_BY_DRIVER → FINALIZED. Returns the driver, who is owed the
    /// escrowed fare.
    pub fn confirm_arrival(
        &mut self,
        caller: &AccountId,
        now: Timestamp,
    ) -> Result<AccountId, RideError> {
        self.require_state(RideState::CompletedByDriver)?;
        self.require_rider(caller)?;
        let driver = self.driver.clone().ok_or(RideError::DriverUnset(self.id))?;
        self.finalized_at = Some(now);
        self.do_transition(RideState::Finalized, caller.clone(), now);
        Ok(driver)
    }

    /// REQUESTED | ACCEPTED | FUNDED → CANCELLED. Returns the amount owed
    /// back to the rider: the fare when it was escrowed, zero otherwise.
    pub fn cancel(&mut self, caller: &AccountId, now: Timestamp) -> Result<Amount, RideError> {
        self.require_any_state(&RideState::CANCELLABLE)?;
        if !self.is_participant(caller) {
            return Err(RideError::NotParticipant {
                ride_id: self.id,
                caller: caller.clone(),
            });
        }
        let refund = self.escrowed();
        self.closed_at = Some(now);
        self.do_transition(RideState::Cancelled, caller.clone(), now);
        Ok(refund)
    }

    /// ACCEPTED → REFUNDED (`NotFunded`) or FUNDED → REFUNDED
    /// (`NotStarted`), once the matching timeout has elapsed. Returns the
    /// amount owed back to the rider.
    pub fn claim_refund(
        &mut self,
        kind: RefundKind,
        caller: &AccountId,
        timeouts: &RideTimeouts,
        now: Timestamp,
    ) -> Result<Amount, RideError> {
        let required = match kind {
            RefundKind::NotFunded => RideState::Accepted,
            RefundKind::NotStarted => RideState::Funded,
        };
        self.require_state(required)?;
        self.require_rider(caller)?;
        match self.refund_window(timeouts, now) {
            RefundWindow::Eligible { .. } => {}
            RefundWindow::Pending { eligible_at, .. } => {
                return Err(RideError::TimeoutNotReached {
                    ride_id: self.id,
                    kind,
                    now,
                    eligible_at,
                });
            }
            RefundWindow::NotApplicable => {
                return Err(self.invalid_state(vec![required]));
            }
        }
        let refund = self.escrowed();
        self.closed_at = Some(now);
        self.do_transition(RideState::Refunded, caller.clone(), now);
        Ok(refund)
    }

    /// Refund eligibility at `now`. Pure.
    pub fn refund_window(&self, timeouts: &RideTimeouts, now: Timestamp) -> RefundWindow {
        match (self.state, self.accepted_at, self.funded_at) {
            (RideState::Accepted, Some(since), _) => {
                RefundWindow::evaluate(RefundKind::NotFunded, since, timeouts.accept, now)
            }
            (RideState::Funded, _, Some(since)) => {
                RefundWindow::evaluate(RefundKind::NotStarted, since, timeouts.start, now)
            }
            _ => RefundWindow::NotApplicable,
        }
    }

    /// Check that `caller` may submit a rating in `direction`. Returns the
    /// account being rated.
    pub fn authorize_rating(
        &self,
        caller: &AccountId,
        direction: RatingDirection,
    ) -> Result<AccountId, RideError> {
        self.require_state(RideState::Finalized)?;
        match direction {
            RatingDirection::RiderToDriver => {
                self.require_rider(caller)?;
                self.driver.clone().ok_or(RideError::DriverUnset(self.id))
            }
            RatingDirection::DriverToRider => {
                self.require_driver(caller)?;
                Ok(self.rider.clone())
            }
        }
    }

    /// The fare currently held in escrow for this ride.
    pub fn escrowed(&self) -> Amount {
        if self.state.holds_escrow() {
            self.amount
        } else {
            Amount::ZERO
        }
    }

    pub fn is_rider(&self, account: &AccountId) -> bool {
        &self.rider == account
    }

    /// An unset driver never matches.
    pub fn is_driver(&self, account: &AccountId) -> bool {
        self.driver.as_ref() == Some(account)
    }

    pub fn is_participant(&self, account: &AccountId) -> bool {
        self.is_rider(account) || self.is_driver(account)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn require_state(&self, expected: RideState) -> Result<(), RideError> {
        self.require_any_state(&[expected])
    }

    fn require_any_state(&self, expected: &[RideState]) -> Result<(), RideError> {
        if expected.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(expected.to_vec()))
        }
    }

    fn invalid_state(&self, expected: Vec<RideState>) -> RideError {
        RideError::InvalidState {
            ride_id: self.id,
            current: self.state,
            expected,
        }
    }

    fn require_rider(&self, caller: &AccountId) -> Result<(), RideError> {
        if self.is_rider(caller) {
            Ok(())
        } else {
            Err(RideError::NotRider {
                ride_id: self.id,
                caller: caller.clone(),
            })
        }
    }

    fn require_driver(&self, caller: &AccountId) -> Result<(), RideError> {
        if self.is_driver(caller) {
            Ok(())
        } else {
            Err(RideError::NotDriver {
                ride_id: self.id,
                caller: caller.clone(),
            })
        }
    }

    fn do_transition(&mut self, to: RideState, actor: AccountId, at: Timestamp) {
        self.transitions.push(RideTransitionRecord {
            from_state: self.state,
            to_state: to,
            at,
            actor,
        });
        self.state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
