//! Fixtures
//!
//! YAML problem sets for demos and tests. A set named `name` consists of
//! `rankings/{name}.yml` and, optionally, `config/{name}.yml` under the base
//! path.

use std::{fs, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::{AssignmentConfig, ConfigError},
    ids::{OptionId, ParticipantId},
    preferences::Ranking,
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Configuration file error
    #[error("Failed to load fixture config: {0}")]
    Config(#[from] ConfigError),

    /// No rankings loaded
    #[error("No rankings loaded; cannot create a problem")]
    NoRankings,

    /// Not enough participants in fixture
    #[error(
        "Not enough participants in fixture, available: {available}, requested: {requested}"
    )]
    NotEnoughParticipants {
        /// Number of participants defined in the fixture
        available: usize,
        /// Number of participants requested
        requested: usize,
    },
}

/// Rankings file layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RankingsFixture {
    /// Options offered even if nobody ranks them
    #[serde(default)]
    options: Vec<OptionId>,

    /// One ranking per participant, in roster order
    rankings: Vec<Ranking>,
}

/// A loaded fixture set.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Stand-alone options
    options: Vec<OptionId>,

    /// Participant rankings, in roster order
    rankings: Vec<Ranking>,

    /// Run configuration for the set
    config: AssignmentConfig,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            options: Vec::new(),
            rankings: Vec::new(),
            config: AssignmentConfig::default(),
        }
    }

    /// Load rankings from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_rankings(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("rankings").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: RankingsFixture = serde_norway::from_str(&contents)?;

        self.options.extend(fixture.options);
        self.rankings.extend(fixture.rankings);

        Ok(self)
    }

    /// Load the run configuration from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_config(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("config").join(format!("{name}.yml"));

        self.config = AssignmentConfig::from_path(file_path)?;

        Ok(self)
    }

    /// Load a complete fixture set: rankings, plus config when the set has one
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::from_set_in(name, "./fixtures")
    }

    /// Load a complete fixture set from a custom base path
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set_in(name: &str, base_path: impl Into<PathBuf>) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(base_path);

        fixture.load_rankings(name)?;

        if fixture
            .base_path
            .join("config")
            .join(format!("{name}.yml"))
            .exists()
        {
            fixture.load_config(name)?;
        }

        Ok(fixture)
    }

    /// Stand-alone options
    pub fn options(&self) -> &[OptionId] {
        &self.options
    }

    /// All rankings
    pub fn rankings(&self) -> &[Ranking] {
        &self.rankings
    }

    /// Run configuration
    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    /// Participants in roster order
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.rankings.iter().map(|r| r.participant.clone()).collect()
    }

    /// The first `n` participants (or all of them) with their rankings.
    ///
    /// # Errors
    ///
    /// Returns an error if no rankings are loaded or `n` exceeds the roster.
    pub fn problem(
        &self,
        n: Option<usize>,
    ) -> Result<(Vec<ParticipantId>, Vec<Ranking>), FixtureError> {
        if self.rankings.is_empty() {
            return Err(FixtureError::NoRankings);
        }

        let available = self.rankings.len();
        let n = n.unwrap_or(available);

        if n > available {
            return Err(FixtureError::NotEnoughParticipants {
                available,
                requested: n,
            });
        }

        let rankings: Vec<Ranking> = self.rankings.iter().take(n).cloned().collect();
        let participants = rankings.iter().map(|r| r.participant.clone()).collect();

        Ok((participants, rankings))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn loads_rankings_with_gaps_and_config() -> TestResult {
        let dir = tempdir()?;

        fs::create_dir_all(dir.path().join("rankings"))?;
        fs::create_dir_all(dir.path().join("config"))?;

        fs::write(
            dir.path().join("rankings/tiny.yml"),
            "options: [Z]\nrankings:\n  - participant: Alice\n    choices: [A, ~, B]\n  - participant: Bob\n    choices: [B]\n",
        )?;
        fs::write(dir.path().join("config/tiny.yml"), "seed: 5\n")?;

        let fixture = Fixture::from_set_in("tiny", dir.path())?;

        assert_eq!(fixture.options(), &[OptionId::from("Z")]);
        assert_eq!(fixture.rankings().len(), 2);
        assert_eq!(
            fixture.rankings().first().map(|r| r.choices.len()),
            Some(3)
        );
        assert_eq!(fixture.config().seed, Some(5));

        let (participants, rankings) = fixture.problem(Some(1))?;

        assert_eq!(participants, vec![ParticipantId::from("Alice")]);
        assert_eq!(rankings.len(), 1);

        Ok(())
    }

    #[test]
    fn config_is_optional() -> TestResult {
        let dir = tempdir()?;

        fs::create_dir_all(dir.path().join("rankings"))?;
        fs::write(
            dir.path().join("rankings/bare.yml"),
            "rankings:\n  - participant: Alice\n    choices: [A]\n",
        )?;

        let fixture = Fixture::from_set_in("bare", dir.path())?;

        assert_eq!(fixture.config(), &AssignmentConfig::default());

        Ok(())
    }

    #[test]
    fn problem_rejects_oversized_requests() -> TestResult {
        let dir = tempdir()?;

        fs::create_dir_all(dir.path().join("rankings"))?;
        fs::write(
            dir.path().join("rankings/one.yml"),
            "rankings:\n  - participant: Alice\n    choices: [A]\n",
        )?;

        let fixture = Fixture::from_set_in("one", dir.path())?;

        assert!(matches!(
            fixture.problem(Some(2)),
            Err(FixtureError::NotEnoughParticipants {
                available: 1,
                requested: 2
            })
        ));
        assert!(matches!(
            Fixture::new().problem(None),
            Err(FixtureError::NoRankings)
        ));

        Ok(())
    }

    #[test]
    fn missing_set_is_an_io_error() {
        let result = Fixture::from_set_in("nope", "/definitely/not/here");

        assert!(matches!(result, Err(FixtureError::Io(_))));
    }
}
