//! # Event Journal
//!
//! An append-only, hash-chained log of [`RideEvent`]s. It is itself an
//! [`EventSink`], so attaching it to the engine records every committed
//! command.
//!
//! ## Integrity Model
//!
//! 1. Entry `n` carries `prev_digest`, the digest of entry `n - 1` (the
//!    all-zero genesis digest for `n = 0`).
//! 2. `digest = SHA-256(JCS({sequence, prev_digest, event}))`, computed via
//!    [`CanonicalBytes`] → [`sha256_digest`].
//! 3. [`verify_chain`] recomputes every digest and link and reports the
//!    first break. Editing, dropping or reordering any entry is detected.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, RideId};

use crate::event::{EventSink, RideEvent};

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: u64, actual: u64 },

    #[error("entry #{sequence} does not link to its predecessor")]
    BrokenLink { sequence: u64 },

    #[error("entry #{sequence} digest does not match its content")]
    DigestMismatch { sequence: u64 },
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, from 0.
    pub sequence: u64,
    /// Hex digest of the previous entry.
    pub prev_digest: String,
    /// Hex digest of this entry.
    pub digest: String,
    pub event: RideEvent,
}

#[derive(Serialize)]
struct DigestInput<'a> {
    sequence: u64,
    prev_digest: &'a str,
    event: &'a RideEvent,
}

fn entry_digest(
    sequence: u64,
    prev_digest: &str,
    event: &RideEvent,
) -> Result<String, CanonicalizationError> {
    let canonical = CanonicalBytes::new(&DigestInput {
        sequence,
        prev_digest,
        event,
    })?;
    Ok(sha256_digest(&canonical).to_hex())
}

/// Check the whole chain. `Ok` for an empty slice.
pub fn verify_chain(entries: &[JournalEntry]) -> Result<(), JournalError> {
    let mut prev = ContentDigest::genesis().to_hex();
    for (expected, entry) in (0u64..).zip(entries) {
        if entry.sequence != expected {
            return Err(JournalError::SequenceMismatch {
                expected,
                actual: entry.sequence,
            });
        }
        if entry.prev_digest != prev {
            return Err(JournalError::BrokenLink {
                sequence: entry.sequence,
            });
        }
        if entry_digest(entry.sequence, &entry.prev_digest, &entry.event)? != entry.digest {
            return Err(JournalError::DigestMismatch {
                sequence: entry.sequence,
            });
        }
        prev = entry.digest.clone();
    }
    Ok(())
}

/// In-memory hash-chained journal.
#[derive(Debug, Default)]
pub struct EventJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` and return the new entry.
    pub fn append(&self, event: RideEvent) -> Result<JournalEntry, JournalError> {
        let mut entries = self.entries.lock();
        let sequence = entries.len() as u64;
        let prev_digest = entries
            .last()
            .map(|e| e.digest.clone())
            .unwrap_or_else(|| ContentDigest::genesis().to_hex());
        let digest = entry_digest(sequence, &prev_digest, &event)?;
        let entry = JournalEntry {
            sequence,
            prev_digest,
            digest,
            event,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    /// Events concerning one ride, in order.
    pub fn for_ride(&self, ride_id: RideId) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.event.ride_id() == Some(ride_id))
            .cloned()
            .collect()
    }

    /// Digest of the latest entry, or the genesis digest when empty.
    pub fn head(&self) -> String {
        self.entries
            .lock()
            .last()
            .map(|e| e.digest.clone())
            .unwrap_or_else(|| ContentDigest::genesis().to_hex())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn verify(&self) -> Result<(), JournalError> {
        verify_chain(&self.entries.lock())
    }
}

impl EventSink for EventJournal {
    fn emit(&self, event: &RideEvent) {
        if let Err(e) = self.append(event.clone()) {
            tracing::error!(event = event.name(), error = %e, "journal append failed");
        }
    }
}
