//! # Transitions Subcommand
//!
//! Prints the ride transition table, with the refund timeouts in effect.

use anyhow::Result;
use clap::Args;

use farelock_engine::EngineConfig;
use farelock_state::{TransitionRule, TRANSITIONS};

/// Arguments for `farelock transitions`.
#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Format `rules` as an aligned text table.
pub fn render_table(rules: &[TransitionRule], config: &EngineConfig) -> String {
    let mut out = format!(
        "{:<26} {:<20} {:<20} {:<18} {}\n",
        "COMMAND", "FROM", "TO", "CALLER", "GUARD"
    );
    for rule in rules {
        out.push_str(&format!(
            "{:<26} {:<20} {:<20} {:<18} {}\n",
            rule.command,
            rule.from.as_str(),
            rule.to.as_str(),
            rule.party.as_str(),
            rule.guard.unwrap_or("-"),
        ));
    }
    out.push_str(&format!(
        "\naccept timeout: {}s, start timeout: {}s\n",
        config.accept_timeout().as_secs(),
        config.start_timeout().as_secs()
    ));
    out
}

/// Execute `farelock transitions`. Timeouts follow the `FARELOCK_*`
/// environment overrides.
pub fn run_transitions(args: &TransitionsArgs) -> Result<u8> {
    let config = EngineConfig::from_env()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&TRANSITIONS)?);
    } else {
        print!("{}", render_table(&TRANSITIONS, &config));
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_rule() {
        let table = render_table(&TRANSITIONS, &EngineConfig::default());
        assert_eq!(table.lines().filter(|l| l.starts_with("cancel")).count(), 3);
        assert!(table.contains("COMPLETED_BY_DRIVER"));
        assert!(table.contains("accept timeout: 900s, start timeout: 1800s"));
    }

    #[test]
    fn rules_serialize_as_json() {
        let json = serde_json::to_value(TRANSITIONS).unwrap();
        assert_eq!(json[0]["command"], "accept");
        assert_eq!(json[0]["party"], "registered_driver");
    }
}
