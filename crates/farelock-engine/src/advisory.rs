//! # Advisory View
//!
//! A read-side projection of one ride for one caller: their role, a
//! human label for the state, and which commands they could issue right
//! now. Display surfaces use it to decide which buttons to show.
//!
//! The projection is a pure function of a ride snapshot. It is never
//! consulted by the engine, which re-checks every precondition when a
//! command runs, so a stale view can only mislead the UI, never the ledger.

use serde::{Deserialize, Serialize};

use farelock_core::{AccountId, Amount, RideId, Timestamp};
use farelock_state::{RefundWindow, Ride, RideState, RideTimeouts};

/// The caller's relationship to a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
    Stranger,
}

impl Role {
    /// Identity match only. An unset driver never matches.
    pub fn of(ride: &Ride, caller: &AccountId) -> Self {
        if ride.is_rider(caller) {
            Self::Rider
        } else if ride.is_driver(caller) {
            Self::Driver
        } else {
            Self::Stranger
        }
    }
}

/// What a caller may do with a ride at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideView {
    pub ride_id: RideId,
    pub role: Role,
    pub state: RideState,
    pub state_label: String,
    pub amount: Amount,
    pub can_accept: bool,
    pub can_fund: bool,
    pub can_start: bool,
    pub can_complete: bool,
    pub can_confirm: bool,
    pub can_cancel: bool,
    pub refund: RefundWindow,
}

/// Project `ride` for `caller`.
///
/// `caller_is_registered_driver` is the registry's answer for the caller;
/// it only affects `can_accept`.
pub fn project(
    ride: &Ride,
    caller: &AccountId,
    caller_is_registered_driver: bool,
    timeouts: &RideTimeouts,
    now: Timestamp,
) -> RideView {
    let state = ride.state;
    let is_rider = ride.is_rider(caller);
    let is_driver = ride.is_driver(caller);
    RideView {
        ride_id: ride.id,
        role: Role::of(ride, caller),
        state,
        state_label: state.label().to_string(),
        amount: ride.amount,
        can_accept: state == RideState::Requested && caller_is_registered_driver,
        can_fund: state == RideState::Accepted && is_rider,
        can_start: state == RideState::Funded && is_driver,
        can_complete: state == RideState::Started && is_driver,
        can_confirm: state == RideState::CompletedByDriver && is_rider,
        can_cancel: RideState::CANCELLABLE.contains(&state) && (is_rider || is_driver),
        refund: ride.refund_window(timeouts, now),
    }
}
