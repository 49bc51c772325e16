//! Utils

use clap::Parser;

use crate::config::AssignmentConfig;

/// Arguments for the assignment demo
#[derive(Debug, Parser)]
pub struct ExampleAssignArgs {
    /// Number of participants to take from the fixture roster
    #[clap(short, long)]
    pub n: Option<usize>,

    /// Fixture set to load rankings and config from
    #[clap(short, long, default_value = "workshop")]
    pub fixture: String,

    /// Typst output file name, written under `target/ilp-formulations`
    #[clap(short, long)]
    pub out: Option<String>,

    /// Shuffle participants before solving
    #[clap(long)]
    pub shuffle: bool,

    /// Seed for the participant shuffle; implies `--shuffle`
    #[clap(long)]
    pub seed: Option<u64>,

    /// Default log filter when `RUST_LOG` is unset
    #[clap(long, default_value = "info")]
    pub log_level: String,
}

impl ExampleAssignArgs {
    /// Apply the command line overrides to a fixture's configuration.
    pub fn apply_to(&self, config: AssignmentConfig) -> AssignmentConfig {
        let config = if self.shuffle {
            config.with_shuffle(true)
        } else {
            config
        };

        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_fixture_config() {
        let args = ExampleAssignArgs::parse_from(["assign", "--seed", "11", "-f", "trio"]);

        let config = args.apply_to(AssignmentConfig::default());

        assert_eq!(args.fixture, "trio");
        assert_eq!(config.seed, Some(11));
        assert!(config.shuffles());
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let args = ExampleAssignArgs::parse_from(["assign"]);
        let base = AssignmentConfig::default().with_seed(3);

        assert_eq!(args.fixture, "workshop");
        assert_eq!(args.apply_to(base), base);
    }
}
