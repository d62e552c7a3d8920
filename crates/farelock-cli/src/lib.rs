//! # farelock-cli — Command-Line Tooling
//!
//! The `farelock` binary exercises the ride engine without the HTTP
//! server.
//!
//! ## Subcommands
//!
//! - `farelock simulate` — replay a YAML scenario on a manual clock.
//! - `farelock verify-journal` — check an exported journal's hash chain.
//! - `farelock transitions` — print the ride transition table.
//!
//! ```bash
//! farelock simulate crates/farelock-cli/scenarios/happy_path.yaml --journal-out journal.json
//! farelock verify-journal journal.json
//! ```

pub mod journal;
pub mod simulate;
pub mod transitions;
