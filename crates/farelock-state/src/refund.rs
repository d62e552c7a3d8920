//! # Refund Windows
//!
//! A rider can recover from a stalled ride through two timeout paths:
//!
//! - **Not funded**: the ride sat in `ACCEPTED` for at least the accept
//!   timeout. Nothing was escrowed, so nothing moves.
//! - **Not started**: the ride sat in `FUNDED` for at least the start
//!   timeout. The escrowed fare goes back to the rider.
//!
//! Expiry is never scheduled. It is evaluated from stored timestamps and the
//! caller-supplied "now" every time someone asks, and asking changes nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use farelock_core::Timestamp;

/// Default accept timeout: 15 minutes.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default start timeout: 30 minutes.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// The two timeout durations governing refund eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideTimeouts {
    /// How long an accepted ride may wait for funding.
    pub accept: Duration,
    /// How long a funded ride may wait for the driver to start.
    pub start: Duration,
}

impl Default for RideTimeouts {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT_TIMEOUT,
            start: DEFAULT_START_TIMEOUT,
        }
    }
}

/// Which timeout path a refund uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundKind {
    /// Accepted but never funded.
    NotFunded,
    /// Funded but never started.
    NotStarted,
}

impl RefundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFunded => "NOT_FUNDED",
            Self::NotStarted => "NOT_STARTED",
        }
    }
}

impl std::fmt::Display for RefundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refund eligibility of a ride at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundWindow {
    /// The ride is in a state with no timeout path.
    NotApplicable,
    /// The window is open but has not elapsed yet.
    Pending {
        kind: RefundKind,
        eligible_at: Timestamp,
        remaining_secs: u64,
    },
    /// The rider may claim the refund now.
    Eligible {
        kind: RefundKind,
        eligible_at: Timestamp,
    },
}

impl RefundWindow {
    /// Evaluate a window that opened at `since` and lasts `timeout`.
    ///
    /// Exactly at the boundary counts as expired.
    pub fn evaluate(kind: RefundKind, since: Timestamp, timeout: Duration, now: Timestamp) -> Self {
        let eligible_at = since.saturating_add(timeout);
        if now >= eligible_at {
            Self::Eligible { kind, eligible_at }
        } else {
            let remaining = eligible_at.seconds_since(&now);
            Self::Pending {
                kind,
                eligible_at,
                remaining_secs: u64::try_from(remaining).unwrap_or(0),
            }
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    pub fn kind(&self) -> Option<RefundKind> {
        match self {
            Self::NotApplicable => None,
            Self::Pending { kind, .. } | Self::Eligible { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn boundary_is_eligible() {
        let since = ts("2026-05-01T10:00:00Z");
        let w = RefundWindow::evaluate(
            RefundKind::NotFunded,
            since,
            DEFAULT_ACCEPT_TIMEOUT,
            ts("2026-05-01T10:15:00Z"),
        );
        assert!(w.is_eligible());
    }

    #[test]
    fn one_second_short_is_pending() {
        let since = ts("2026-05-01T10:00:00Z");
        let w = RefundWindow::evaluate(
            RefundKind::NotStarted,
            since,
            DEFAULT_START_TIMEOUT,
            ts("2026-05-01T10:29:59Z"),
        );
        assert_eq!(
            w,
            RefundWindow::Pending {
                kind: RefundKind::NotStarted,
                eligible_at: ts("2026-05-01T10:30:00Z"),
                remaining_secs: 1,
            }
        );
    }

    #[test]
    fn serializes_with_status_tag() {
        let w = RefundWindow::Eligible {
            kind: RefundKind::NotFunded,
            eligible_at: ts("2026-05-01T10:15:00Z"),
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["status"], "ELIGIBLE");
        assert_eq!(json["kind"], "NOT_FUNDED");
        assert_eq!(
            serde_json::to_value(RefundWindow::NotApplicable).unwrap()["status"],
            "NOT_APPLICABLE"
        );
    }
}
