//! Assignment
//!
//! Runs a complete assignment: optional participant shuffling, preference
//! normalisation, model construction, solving and extraction, stopping at the
//! first validation failure.
//!
//! Participant order decides which of several equally good assignments the
//! backend settles on. Shuffling with a fixed seed makes that choice
//! reproducible; shuffling never changes the optimal objective value.

use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

use crate::{
    allocation::Allocation,
    config::AssignmentConfig,
    ids::{OptionId, ParticipantId},
    preferences::{PreferenceError, PreferenceIndex, Ranking},
    quota::QuotaError,
    solvers::{
        MilpBackend, SolverError,
        ilp::{GoodLpBackend, ILPObserver, ILPSolver, NoopObserver},
    },
};

/// Errors raised by an assignment run.
#[derive(Debug, Error)]
pub enum AssignmentError {
    /// The preference input is invalid.
    #[error(transparent)]
    Preference(#[from] PreferenceError),

    /// The quota configuration is invalid.
    #[error(transparent)]
    Quota(#[from] QuotaError),

    /// Model construction or the post-solve audit failed.
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Pre-scored preferences of one participant, most preferred first.
pub type ScoredPreferences = (ParticipantId, Vec<(OptionId, usize)>);

/// Composes preference normalisation, model building, solving and extraction.
#[derive(Debug, Clone)]
pub struct AssignmentOrchestrator<B = GoodLpBackend> {
    config: AssignmentConfig,
    backend: B,
}

impl AssignmentOrchestrator {
    /// Create an orchestrator using the default `good_lp` backend.
    pub fn new(config: AssignmentConfig) -> Self {
        Self::with_backend(config, GoodLpBackend)
    }
}

impl<B: MilpBackend> AssignmentOrchestrator<B> {
    /// Create an orchestrator using a specific backend.
    pub fn with_backend(config: AssignmentConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// Configuration used for every run.
    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    /// Assign participants from raw rankings.
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentError`] if the input is invalid or the solution
    /// fails its consistency checks. Infeasibility and backend failures are
    /// reported through [`Allocation::status`].
    pub fn solve(
        &self,
        participants: &[ParticipantId],
        options: &[OptionId],
        rankings: &[Ranking],
    ) -> Result<Allocation, AssignmentError> {
        self.solve_with_observer(participants, options, rankings, &mut NoopObserver)
    }

    /// Assign participants from raw rankings, reporting the model to `observer`.
    ///
    /// # Errors
    ///
    /// See [`AssignmentOrchestrator::solve`].
    #[tracing::instrument(
        name = "assignment.solve",
        skip_all,
        fields(
            participants = participants.len(),
            rankings = rankings.len(),
            shuffle = self.config.shuffles(),
            seed = self.config.seed
        ),
        err
    )]
    pub fn solve_with_observer(
        &self,
        participants: &[ParticipantId],
        options: &[OptionId],
        rankings: &[Ranking],
        observer: &mut dyn ILPObserver,
    ) -> Result<Allocation, AssignmentError> {
        let index = self.index(participants, options, rankings)?;

        self.solve_index(&index, observer)
    }

    /// Build the preference index a run would solve, shuffling first when configured.
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentError`] if the input is invalid.
    pub fn index(
        &self,
        participants: &[ParticipantId],
        options: &[OptionId],
        rankings: &[Ranking],
    ) -> Result<PreferenceIndex, AssignmentError> {
        let order = self.participant_order(participants);

        Ok(PreferenceIndex::from_rankings(&order, options, rankings)?)
    }

    /// Assign participants from preferences that already carry scores.
    ///
    /// # Errors
    ///
    /// See [`AssignmentOrchestrator::solve`].
    #[tracing::instrument(
        name = "assignment.solve_scored",
        skip_all,
        fields(participants = participants.len(), shuffle = self.config.shuffles()),
        err
    )]
    pub fn solve_scored(
        &self,
        participants: &[ParticipantId],
        options: &[OptionId],
        scored: &[ScoredPreferences],
    ) -> Result<Allocation, AssignmentError> {
        let order = self.participant_order(participants);
        let index = PreferenceIndex::from_scored(&order, options, scored)?;

        self.solve_index(&index, &mut NoopObserver)
    }

    fn participant_order(&self, participants: &[ParticipantId]) -> Vec<ParticipantId> {
        let mut order = participants.to_vec();

        if self.config.shuffles() {
            shuffle_participants(&mut order, self.config.seed);

            debug!(seeded = self.config.seed.is_some(), "shuffled participants");
        }

        order
    }

    /// Solve an already built preference index.
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentError`] if the solution fails its consistency checks.
    pub fn solve_index(
        &self,
        index: &PreferenceIndex,
        observer: &mut dyn ILPObserver,
    ) -> Result<Allocation, AssignmentError> {
        Ok(ILPSolver::solve_with(
            index,
            &self.config.quota,
            &self.config.limits,
            &self.backend,
            observer,
        )?)
    }
}

/// Assign participants with the default backend.
///
/// # Errors
///
/// See [`AssignmentOrchestrator::solve`].
pub fn solve(
    participants: &[ParticipantId],
    options: &[OptionId],
    rankings: &[Ranking],
    config: &AssignmentConfig,
) -> Result<Allocation, AssignmentError> {
    AssignmentOrchestrator::new(*config).solve(participants, options, rankings)
}

/// Shuffle `participants` in place.
///
/// With a seed the permutation is fully determined by it; without one it is
/// drawn from the thread-local generator.
pub fn shuffle_participants(participants: &mut [ParticipantId], seed: Option<u64>) {
    match seed {
        Some(seed) => participants.shuffle(&mut ChaCha8Rng::seed_from_u64(seed)),
        None => participants.shuffle(&mut rand::rng()),
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        ids::participants,
        quota::QuotaConfig,
        solvers::{SolveStatus, ilp::BinaryProgram},
    };

    use super::*;

    fn roster() -> Vec<ParticipantId> {
        participants(&["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"])
    }

    #[test]
    fn same_seed_gives_same_order() {
        let mut first = roster();
        let mut second = roster();

        shuffle_participants(&mut first, Some(42));
        shuffle_participants(&mut second, Some(42));

        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();

        assert_eq!(sorted, roster());
    }

    #[test]
    fn unshuffled_runs_keep_input_order() {
        let orchestrator = AssignmentOrchestrator::new(AssignmentConfig::default());

        assert_eq!(orchestrator.participant_order(&roster()), roster());
    }

    #[test]
    fn duplicate_option_fails_before_solving() {
        struct UnreachableBackend;

        impl MilpBackend for UnreachableBackend {
            fn solve(
                &self,
                _program: BinaryProgram,
                _limits: &crate::solvers::SolveLimits,
            ) -> crate::solvers::BackendOutcome {
                crate::solvers::BackendOutcome::error("backend must not be reached")
            }
        }

        let orchestrator =
            AssignmentOrchestrator::with_backend(AssignmentConfig::default(), UnreachableBackend);

        let result = orchestrator.solve(
            &participants(&["p1"]),
            &[],
            &[Ranking::of("p1", &["A", "A"])],
        );

        assert!(matches!(
            result,
            Err(AssignmentError::Preference(PreferenceError::DuplicateOption { .. }))
        ));
    }

    #[test]
    fn seeded_runs_reach_the_same_assignment() -> TestResult {
        let people = roster();
        let rankings: Vec<Ranking> = people
            .iter()
            .map(|p| Ranking::of(p.as_str(), &["A", "B"]))
            .collect();

        let config = AssignmentConfig::default()
            .with_quota(QuotaConfig::new(1, 4, 0.0)?)
            .with_seed(9);

        let first = solve(&people, &[], &rankings, &config)?;
        let second = solve(&people, &[], &rankings, &config)?;

        assert_eq!(first.status(), SolveStatus::Optimal);
        assert_eq!(first.assignments(), second.assignments());
        assert_eq!(first.outcomes(), second.outcomes());

        Ok(())
    }

    #[test]
    fn scored_preferences_are_solved() -> TestResult {
        let orchestrator = AssignmentOrchestrator::new(
            AssignmentConfig::default().with_quota(QuotaConfig::new(1, 2, 0.0)?),
        );

        let scored = vec![
            (
                ParticipantId::from("a"),
                vec![(OptionId::from("X"), 10), (OptionId::from("Y"), 1)],
            ),
            (
                ParticipantId::from("b"),
                vec![(OptionId::from("Y"), 10), (OptionId::from("X"), 1)],
            ),
        ];

        let allocation =
            orchestrator.solve_scored(&participants(&["a", "b"]), &[], &scored)?;

        assert_eq!(allocation.metrics().total_score, 20);
        assert_eq!(allocation.option_of("a"), Some(&OptionId::from("X")));
        assert_eq!(allocation.option_of("b"), Some(&OptionId::from("Y")));

        Ok(())
    }
}
