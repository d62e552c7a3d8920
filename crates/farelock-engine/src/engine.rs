//! # Ride Engine
//!
//! Owns every ride, the escrow vault, the driver registry, the rating
//! ledger and the rider/driver indices, and runs lifecycle commands
//! against them atomically.
//!
//! ## Command protocol
//!
//! Each ride lives behind its own mutex. A command:
//!
//! 1. locks the ride's slot,
//! 2. applies the transition to a staged copy (state and identity checks),
//! 3. performs any value transfer through the vault,
//! 4. updates registry and indices,
//! 5. commits the staged copy and emits one event.
//!
//! Any failure before step 5 returns the error with nothing committed.
//! Commands against different rides only meet on the shared locks below.
//!
//! ## Lock order
//!
//! ride table → ride slot → vault → registry → ratings → indices → sinks.
//! The ride table lock is only held to allocate an id or clone a slot
//! handle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use farelock_core::{AccountId, Amount, Clock, Location, RideId, Timestamp};
use farelock_escrow::{EscrowHolding, EscrowTotals, EscrowVault, ValueTransfer};
use farelock_state::{
    DriverRatingSummary, DriverRecord, DriverRegistry, Rating, RatingDirection, RatingLedger,
    RefundKind, RefundWindow, RegistryError, Ride, RideRatingSnapshot,
};

use crate::advisory::{project, RideView};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::{EventKind, EventSink, RideEvent};

/// Result of a committed ride command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideReceipt {
    /// The ride after the command.
    pub ride: Ride,
    /// The event emitted for it.
    pub event: RideEvent,
}

#[derive(Debug, Default)]
struct RideIndices {
    by_rider: HashMap<AccountId, Vec<RideId>>,
    by_driver: HashMap<AccountId, Vec<RideId>>,
}

/// The ride engine.
pub struct RideEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    vault: EscrowVault,
    rides: RwLock<Vec<Arc<Mutex<Ride>>>>,
    registry: RwLock<DriverRegistry>,
    ratings: Mutex<RatingLedger>,
    indices: RwLock<RideIndices>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for RideEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RideEngine")
            .field("config", &self.config)
            .field("rides", &self.ride_count())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl RideEngine {
    /// An engine with no rides, no drivers and no sinks.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, transfer: Arc<dyn ValueTransfer>) -> Self {
        Self {
            config,
            clock,
            vault: EscrowVault::new(transfer),
            rides: RwLock::new(Vec::new()),
            registry: RwLock::new(DriverRegistry::new()),
            ratings: Mutex::new(RatingLedger::new()),
            indices: RwLock::new(RideIndices::default()),
            sinks: Vec::new(),
        }
    }

    /// Attach an event sink. Sinks receive events in registration order.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Timeouts the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current reading of the engine's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ─── Ride commands ──────────────────────────────────────────────

    /// Create a ride in `REQUESTED` for `rider`.
    pub fn request_ride(
        &self,
        rider: &AccountId,
        amount: Amount,
        pickup: Location,
        destination: Location,
    ) -> Result<RideReceipt, EngineError> {
        let now = self.clock.now();
        let ride = {
            let mut rides = self.rides.write();
            let next = rides.len() as u64 + 1;
            let id = RideId::new(next).map_err(|_| EngineError::RideIdsExhausted)?;
            let ride = Ride::request(id, rider.clone(), amount, pickup.clone(), destination.clone(), now);
            rides.push(Arc::new(Mutex::new(ride.clone())));
            ride
        };
        let id = ride.id;
        self.indices
            .write()
            .by_rider
            .entry(rider.clone())
            .or_default()
            .push(id);

        let event = RideEvent {
            at: now,
            actor: rider.clone(),
            event: EventKind::RideRequested {
                ride_id: id,
                rider: rider.clone(),
                amount,
                pickup,
                destination,
            },
        };
        tracing::info!(ride_id = %id, op = "request_ride", state = %ride.state, "ride transition committed");
        self.emit(&event);
        Ok(RideReceipt { ride, event })
    }

    /// REQUESTED → ACCEPTED. The caller must be a registered driver.
    pub fn accept_ride(&self, ride_id: RideId, caller: &AccountId) -> Result<RideReceipt, EngineError> {
        self.transition("accept_ride", ride_id, caller, |ride, now| {
            if !self.registry.read().is_registered(caller) {
                return Err(RegistryError::NotRegistered(caller.clone()).into());
            }
            ride.accept(caller.clone(), now)?;
            self.registry.write().record_ride(caller, ride.id)?;
            self.indices
                .write()
                .by_driver
                .entry(caller.clone())
                .or_default()
                .push(ride.id);
            Ok(EventKind::RideAccepted {
                ride_id: ride.id,
                driver: caller.clone(),
            })
        })
    }

    /// ACCEPTED → FUNDED. Collects exactly the fare from the rider; any
    /// excess in `offered` is reported back and never collected.
    pub fn fund_ride(
        &self,
        ride_id: RideId,
        caller: &AccountId,
        offered: Amount,
    ) -> Result<RideReceipt, EngineError> {
        self.transition("fund_ride", ride_id, caller, |ride, now| {
            let excess_returned = ride.fund(caller, offered, now)?;
            self.vault.deposit(ride.id, caller, ride.amount, now)?;
            Ok(EventKind::RideFunded {
                ride_id: ride.id,
                amount: ride.amount,
                excess_returned,
            })
        })
    }

    /// FUNDED → STARTED.
    pub fn start_ride(&self, ride_id: RideId, caller: &AccountId) -> Result<RideReceipt, EngineError> {
        self.transition("start_ride", ride_id, caller, |ride, now| {
            ride.start(caller, now)?;
            Ok(EventKind::RideStarted { ride_id: ride.id })
        })
    }

    /// STARTED → COMPLETED_BY_DRIVER.
    pub fn complete_ride(&self, ride_id: RideId, caller: &AccountId) -> Result<RideReceipt, EngineError> {
        self.transition("complete_ride", ride_id, caller, |ride, now| {
            ride.complete(caller, now)?;
            Ok(EventKind::RideCompleted { ride_id: ride.id })
        })
    }

    /// COMPLETED_BY_DRIVER → FINALIZED, paying the escrowed fare to the
    /// driver.
    pub fn confirm_arrival(&self, ride_id: RideId, caller: &AccountId) -> Result<RideReceipt, EngineError> {
        self.transition("confirm_arrival", ride_id, caller, |ride, now| {
            let driver = ride.confirm_arrival(caller, now)?;
            let payout = self.vault.release(ride.id, &driver, now)?;
            Ok(EventKind::RideFinalized {
                ride_id: ride.id,
                driver,
                payout,
            })
        })
    }

    /// REQUESTED | ACCEPTED | FUNDED → CANCELLED, refunding the rider when
    /// the fare was escrowed.
    pub fn cancel_ride(&self, ride_id: RideId, caller: &AccountId) -> Result<RideReceipt, EngineError> {
        self.transition("cancel_ride", ride_id, caller, |ride, now| {
            let owed = ride.cancel(caller, now)?;
            let refunded = self.refund_owed(ride, owed, now)?;
            Ok(EventKind::RideCancelled {
                ride_id: ride.id,
                by: caller.clone(),
                refunded,
            })
        })
    }

    /// ACCEPTED → REFUNDED once the accept timeout has elapsed.
    pub fn claim_refund_not_funded(
        &self,
        ride_id: RideId,
        caller: &AccountId,
    ) -> Result<RideReceipt, EngineError> {
        self.claim_refund(ride_id, caller, RefundKind::NotFunded)
    }

    /// FUNDED → REFUNDED once the start timeout has elapsed, returning the
    /// escrowed fare.
    pub fn claim_refund_not_started(
        &self,
        ride_id: RideId,
        caller: &AccountId,
    ) -> Result<RideReceipt, EngineError> {
        self.claim_refund(ride_id, caller, RefundKind::NotStarted)
    }

    /// Either timeout refund, selected by `kind`.
    pub fn claim_refund(
        &self,
        ride_id: RideId,
        caller: &AccountId,
        kind: RefundKind,
    ) -> Result<RideReceipt, EngineError> {
        let op = match kind {
            RefundKind::NotFunded => "claim_refund_not_funded",
            RefundKind::NotStarted => "claim_refund_not_started",
        };
        self.transition(op, ride_id, caller, |ride, now| {
            let owed = ride.claim_refund(kind, caller, &self.config.timeouts, now)?;
            let refunded = self.refund_owed(ride, owed, now)?;
            Ok(EventKind::RefundClaimed {
                ride_id: ride.id,
                kind,
                refunded,
            })
        })
    }

    // ─── Registry commands ──────────────────────────────────────────

    /// Register the caller as a driver.
    pub fn register_driver(&self, caller: &AccountId, name: &str) -> Result<DriverRecord, EngineError> {
        let now = self.clock.now();
        let result = self
            .registry
            .write()
            .register(caller.clone(), name.to_string(), now)
            .map(DriverRecord::clone)
            .map_err(EngineError::from);
        let record = observe("register_driver", caller, result)?;
        tracing::info!(driver = %caller, op = "register_driver", "driver registered");
        self.emit(&RideEvent {
            at: now,
            actor: caller.clone(),
            event: EventKind::DriverRegistered {
                driver: caller.clone(),
                name: record.name.clone(),
            },
        });
        Ok(record)
    }

    /// Persist a successful identity verification for the caller, who
    /// must be registered. Verifying twice is a no-op and emits nothing.
    pub fn verify_identity(&self, caller: &AccountId) -> Result<DriverRecord, EngineError> {
        let now = self.clock.now();
        let result = {
            let mut registry = self.registry.write();
            registry.verify(caller, now).and_then(|flipped| {
                registry
                    .get(caller)
                    .cloned()
                    .map(|record| (flipped, record))
                    .ok_or_else(|| RegistryError::NotRegistered(caller.clone()))
            })
        };
        let (flipped, record) = observe("verify_identity", caller, result.map_err(EngineError::from))?;
        if flipped {
            tracing::info!(driver = %caller, op = "verify_identity", "driver verified");
            self.emit(&RideEvent {
                at: now,
                actor: caller.clone(),
                event: EventKind::IdentityVerified {
                    driver: caller.clone(),
                },
            });
        }
        Ok(record)
    }

    // ─── Rating commands ────────────────────────────────────────────

    /// Rider rates the driver of a finalized ride. The score feeds the
    /// driver's aggregate.
    pub fn rate_driver(
        &self,
        ride_id: RideId,
        caller: &AccountId,
        rating: u8,
    ) -> Result<RideRatingSnapshot, EngineError> {
        observe(
            "rate_driver",
            caller,
            self.rate(ride_id, caller, rating, RatingDirection::RiderToDriver),
        )
    }

    /// Driver rates the rider of a finalized ride. Stays on the ride.
    pub fn rate_rider(
        &self,
        ride_id: RideId,
        caller: &AccountId,
        rating: u8,
    ) -> Result<RideRatingSnapshot, EngineError> {
        observe(
            "rate_rider",
            caller,
            self.rate(ride_id, caller, rating, RatingDirection::DriverToRider),
        )
    }

    fn rate(
        &self,
        ride_id: RideId,
        caller: &AccountId,
        value: u8,
        direction: RatingDirection,
    ) -> Result<RideRatingSnapshot, EngineError> {
        let slot = self.slot(ride_id)?;
        let ride = slot.lock();
        let rated = ride.authorize_rating(caller, direction)?;
        let rating = Rating::new(value)?;
        let now = self.clock.now();

        let event = match direction {
            RatingDirection::RiderToDriver => {
                let mut registry = self.registry.write();
                if !registry.is_registered(&rated) {
                    return Err(RegistryError::NotRegistered(rated).into());
                }
                self.ratings.lock().submit(ride_id, direction, rating)?;
                registry.record_rating(&rated, rating)?;
                EventKind::DriverRated {
                    ride_id,
                    driver: rated,
                    rating: rating.value(),
                }
            }
            RatingDirection::DriverToRider => {
                self.ratings.lock().submit(ride_id, direction, rating)?;
                EventKind::RiderRated {
                    ride_id,
                    rider: rated,
                    rating: rating.value(),
                }
            }
        };
        let snapshot = self.ratings.lock().get(ride_id).snapshot();
        tracing::info!(ride_id = %ride_id, op = event.name(), rating = rating.value(), "rating recorded");
        self.emit(&RideEvent {
            at: now,
            actor: caller.clone(),
            event,
        });
        Ok(snapshot)
    }

    // ─── Reads ──────────────────────────────────────────────────────

    /// Snapshot of a ride. `RideNotFound` for ids never assigned.
    pub fn ride(&self, ride_id: RideId) -> Result<Ride, EngineError> {
        Ok(self.slot(ride_id)?.lock().clone())
    }

    /// Highest assigned ride id, or 0 when none.
    pub fn ride_count(&self) -> u64 {
        self.rides.read().len() as u64
    }

    /// Rides requested by `rider`, oldest first.
    pub fn rides_for_rider(&self, rider: &AccountId) -> Vec<RideId> {
        self.indices.read().by_rider.get(rider).cloned().unwrap_or_default()
    }

    /// Rides accepted by `driver`, oldest first.
    pub fn rides_for_driver(&self, driver: &AccountId) -> Vec<RideId> {
        self.indices.read().by_driver.get(driver).cloned().unwrap_or_default()
    }

    /// The ride's rating record; empty before any submission.
    pub fn ride_rating(&self, ride_id: RideId) -> Result<RideRatingSnapshot, EngineError> {
        self.slot(ride_id)?;
        Ok(self.ratings.lock().get(ride_id).snapshot())
    }

    /// Aggregate rider→driver score. Zero count for unrated or unknown
    /// accounts.
    pub fn driver_rating(&self, account: &AccountId) -> DriverRatingSummary {
        self.registry.read().rating(account)
    }

    /// Registry record, or `None` when the account never registered.
    pub fn driver(&self, account: &AccountId) -> Option<DriverRecord> {
        self.registry.read().get(account).cloned()
    }

    /// Registered drivers in registration order.
    pub fn drivers(&self) -> Vec<DriverRecord> {
        self.registry.read().list().cloned().collect()
    }

    /// Refund eligibility of a ride right now.
    pub fn refund_status(&self, ride_id: RideId) -> Result<RefundWindow, EngineError> {
        self.refund_status_at(ride_id, self.clock.now())
    }

    /// Refund eligibility of a ride at `now`.
    pub fn refund_status_at(&self, ride_id: RideId, now: Timestamp) -> Result<RefundWindow, EngineError> {
        Ok(self
            .slot(ride_id)?
            .lock()
            .refund_window(&self.config.timeouts, now))
    }

    /// Vault-wide held amount and lifetime flows.
    pub fn escrow_totals(&self) -> EscrowTotals {
        self.vault.totals()
    }

    /// Amount currently escrowed for one ride.
    pub fn escrow_held_for(&self, ride_id: RideId) -> Result<Amount, EngineError> {
        self.slot(ride_id)?;
        Ok(self.vault.held_for(ride_id))
    }

    /// The ride's holding with its transaction log, if it was ever funded.
    pub fn escrow_holding(&self, ride_id: RideId) -> Result<Option<EscrowHolding>, EngineError> {
        self.slot(ride_id)?;
        Ok(self.vault.holding(ride_id))
    }

    /// Advisory projection of a ride for `caller`.
    pub fn view(&self, ride_id: RideId, caller: &AccountId) -> Result<RideView, EngineError> {
        let slot = self.slot(ride_id)?;
        let ride = slot.lock();
        let registered = self.registry.read().is_registered(caller);
        Ok(project(
            &ride,
            caller,
            registered,
            &self.config.timeouts,
            self.clock.now(),
        ))
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn slot(&self, ride_id: RideId) -> Result<Arc<Mutex<Ride>>, EngineError> {
        let index = usize::try_from(ride_id.get() - 1).map_err(|_| EngineError::RideNotFound(ride_id))?;
        self.rides
            .read()
            .get(index)
            .cloned()
            .ok_or(EngineError::RideNotFound(ride_id))
    }

    /// Run `apply` against a staged copy of the ride and commit it only if
    /// `apply` succeeds.
    fn transition<F>(
        &self,
        op: &'static str,
        ride_id: RideId,
        caller: &AccountId,
        apply: F,
    ) -> Result<RideReceipt, EngineError>
    where
        F: FnOnce(&mut Ride, Timestamp) -> Result<EventKind, EngineError>,
    {
        let slot = observe(op, caller, self.slot(ride_id))?;
        let mut ride = slot.lock();
        let now = self.clock.now();
        let mut staged = ride.clone();
        let kind = observe(op, caller, apply(&mut staged, now))?;

        *ride = staged;
        tracing::info!(ride_id = %ride_id, op, state = %ride.state, "ride transition committed");
        let event = RideEvent {
            at: now,
            actor: caller.clone(),
            event: kind,
        };
        self.emit(&event);
        Ok(RideReceipt {
            ride: ride.clone(),
            event,
        })
    }

    /// Return `owed` to the rider out of escrow. Nothing moves when the
    /// ride never reached FUNDED.
    fn refund_owed(&self, ride: &Ride, owed: Amount, now: Timestamp) -> Result<Amount, EngineError> {
        if owed.is_zero() {
            return Ok(Amount::ZERO);
        }
        Ok(self.vault.refund(ride.id, &ride.rider, now)?)
    }

    fn emit(&self, event: &RideEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

fn observe<T>(op: &'static str, caller: &AccountId, result: Result<T, EngineError>) -> Result<T, EngineError> {
    if let Err(e) = &result {
        tracing::debug!(op, caller = %caller, kind = %e.kind(), error = %e, "command rejected");
    }
    result
}
