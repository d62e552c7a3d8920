//! # farelock-engine
//!
//! The ride engine: owns rides, escrow, the driver registry and the rating
//! ledger, and exposes every lifecycle command as one atomic operation.
//!
//! ## Components
//!
//! - [`RideEngine`]: command and read surface.
//! - [`EventSink`]: receives one [`RideEvent`] per committed command.
//!   [`TracingSink`] logs them; [`EventJournal`] hash-chains them.
//! - [`project`]: advisory [`RideView`] for display surfaces.
//! - [`EngineConfig`]: refund timeouts, loadable from the environment.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use farelock_core::{AccountId, Amount, Location, SystemClock};
//! use farelock_escrow::InMemoryLedger;
//! use farelock_engine::{EngineConfig, RideEngine, TracingSink};
//!
//! let ledger = Arc::new(InMemoryLedger::new());
//! let engine = RideEngine::new(EngineConfig::default(), Arc::new(SystemClock), ledger)
//!     .with_sink(Arc::new(TracingSink));
//! let rider = AccountId::new("rider-1").unwrap();
//! let receipt = engine
//!     .request_ride(&rider, Amount::new(1_200), Location::default(), Location::default())
//!     .unwrap();
//! assert_eq!(receipt.ride.id.get(), 1);
//! ```

pub mod advisory;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod journal;

pub use advisory::{project, Role, RideView};
pub use config::{ConfigError, EngineConfig};
pub use engine::{RideEngine, RideReceipt};
pub use error::{EngineError, ErrorKind};
pub use event::{EventKind, EventSink, RideEvent, TracingSink};
pub use journal::{verify_chain, EventJournal, JournalEntry, JournalError};
