//! # Ride Events
//!
//! Every successful command emits exactly one [`RideEvent`] to every
//! registered [`EventSink`]. Sinks are fire-and-forget: they cannot fail a
//! command and the engine does not wait for acknowledgement.
//!
//! Events are float-free, so they canonicalize for the hash-chained
//! journal without loss.

use serde::{Deserialize, Serialize};

use farelock_core::{AccountId, Amount, Location, RideId, Timestamp};
use farelock_state::RefundKind;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RideRequested {
        ride_id: RideId,
        rider: AccountId,
        amount: Amount,
        pickup: Location,
        destination: Location,
    },
    RideAccepted {
        ride_id: RideId,
        driver: AccountId,
    },
    RideFunded {
        ride_id: RideId,
        amount: Amount,
        /// Offered above the fare and left with the payer.
        excess_returned: Amount,
    },
    RideStarted {
        ride_id: RideId,
    },
    RideCompleted {
        ride_id: RideId,
    },
    RideFinalized {
        ride_id: RideId,
        driver: AccountId,
        payout: Amount,
    },
    RideCancelled {
        ride_id: RideId,
        by: AccountId,
        refunded: Amount,
    },
    RefundClaimed {
        ride_id: RideId,
        kind: RefundKind,
        refunded: Amount,
    },
    DriverRegistered {
        driver: AccountId,
        name: String,
    },
    IdentityVerified {
        driver: AccountId,
    },
    DriverRated {
        ride_id: RideId,
        driver: AccountId,
        rating: u8,
    },
    RiderRated {
        ride_id: RideId,
        rider: AccountId,
        rating: u8,
    },
}

impl EventKind {
    /// Operation name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RideRequested { .. } => "ride_requested",
            Self::RideAccepted { .. } => "ride_accepted",
            Self::RideFunded { .. } => "ride_funded",
            Self::RideStarted { .. } => "ride_started",
            Self::RideCompleted { .. } => "ride_completed",
            Self::RideFinalized { .. } => "ride_finalized",
            Self::RideCancelled { .. } => "ride_cancelled",
            Self::RefundClaimed { .. } => "refund_claimed",
            Self::DriverRegistered { .. } => "driver_registered",
            Self::IdentityVerified { .. } => "identity_verified",
            Self::DriverRated { .. } => "driver_rated",
            Self::RiderRated { .. } => "rider_rated",
        }
    }

    /// The ride this event concerns, if any. Registry events have none.
    pub fn ride_id(&self) -> Option<RideId> {
        match self {
            Self::RideRequested { ride_id, .. }
            | Self::RideAccepted { ride_id, .. }
            | Self::RideFunded { ride_id, .. }
            | Self::RideStarted { ride_id }
            | Self::RideCompleted { ride_id }
            | Self::RideFinalized { ride_id, .. }
            | Self::RideCancelled { ride_id, .. }
            | Self::RefundClaimed { ride_id, .. }
            | Self::DriverRated { ride_id, .. }
            | Self::RiderRated { ride_id, .. } => Some(*ride_id),
            Self::DriverRegistered { .. } | Self::IdentityVerified { .. } => None,
        }
    }
}

/// One committed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideEvent {
    /// Clock reading when the command ran.
    pub at: Timestamp,
    /// Account that issued the command.
    pub actor: AccountId,
    pub event: EventKind,
}

impl RideEvent {
    pub fn ride_id(&self) -> Option<RideId> {
        self.event.ride_id()
    }

    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

/// Receives committed events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RideEvent);
}

/// Logs every event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RideEvent) {
        match event.ride_id() {
            Some(ride_id) => tracing::info!(
                event = event.name(),
                ride_id = %ride_id,
                actor = %event.actor,
                at = %event.at,
                "ride event"
            ),
            None => tracing::info!(
                event = event.name(),
                actor = %event.actor,
                at = %event.at,
                "registry event"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = RideEvent {
            at: Timestamp::parse("2026-02-01T10:00:00Z").unwrap(),
            actor: AccountId::new("rider-1").unwrap(),
            event: EventKind::RideFunded {
                ride_id: RideId::FIRST,
                amount: Amount::new(1_000),
                excess_returned: Amount::ZERO,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"]["type"], "RIDE_FUNDED");
        assert_eq!(json["event"]["ride_id"], 1);
        assert_eq!(json["event"]["amount"], 1000);
        assert_eq!(json["actor"], "rider-1");

        let back: RideEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn registry_events_have_no_ride() {
        let kind = EventKind::IdentityVerified {
            driver: AccountId::new("d").unwrap(),
        };
        assert_eq!(kind.ride_id(), None);
        assert_eq!(kind.name(), "identity_verified");
    }
}
