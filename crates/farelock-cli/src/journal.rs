//! # Verify-Journal Subcommand
//!
//! Re-derives every digest of an exported event journal and checks that
//! each entry links to its predecessor.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use farelock_engine::{verify_chain, JournalEntry};

/// Arguments for `farelock verify-journal`.
#[derive(Args, Debug)]
pub struct VerifyJournalArgs {
    /// Journal file as written by `simulate --journal-out`.
    pub file: PathBuf,
}

/// Load journal entries from a JSON array.
pub fn load_entries(json: &str) -> Result<Vec<JournalEntry>> {
    serde_json::from_str(json).context("journal is not a JSON array of entries")
}

/// Execute `farelock verify-journal`. Returns 0 for an intact chain, 1 for
/// a broken one.
pub fn run_verify_journal(args: &VerifyJournalArgs) -> Result<u8> {
    let json = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let entries = load_entries(&json)?;

    match verify_chain(&entries) {
        Ok(()) => {
            let head = entries.last().map(|e| e.digest.as_str()).unwrap_or("(empty)");
            println!("OK: {} entries, head {head}", entries.len());
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {e}");
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farelock_core::{AccountId, Timestamp};
    use farelock_engine::{EventJournal, EventKind, RideEvent};

    fn journal_json(events: usize) -> String {
        let journal = EventJournal::new();
        for i in 0..events {
            let driver = AccountId::new(format!("driver-{i}")).unwrap();
            journal
                .append(RideEvent {
                    at: Timestamp::from_epoch_secs(1_700_000_000).unwrap(),
                    actor: driver.clone(),
                    event: EventKind::IdentityVerified { driver },
                })
                .unwrap();
        }
        serde_json::to_string(&journal.entries()).unwrap()
    }

    fn write(dir: &tempfile::TempDir, json: &str) -> VerifyJournalArgs {
        let file = dir.path().join("journal.json");
        std::fs::write(&file, json).unwrap();
        VerifyJournalArgs { file }
    }

    #[test]
    fn intact_journal_verifies() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_verify_journal(&write(&dir, &journal_json(3))).unwrap(), 0);
    }

    #[test]
    fn tampered_journal_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tampered = journal_json(3).replace("driver-1", "driver-9");
        assert_eq!(run_verify_journal(&write(&dir, &tampered)).unwrap(), 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_verify_journal(&write(&dir, "{not json")).is_err());
    }
}
