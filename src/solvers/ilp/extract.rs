//! Result Extraction
//!
//! Turns the variable values of an optimal solve back into an [`Allocation`],
//! auditing the quota and single-assignment guarantees on the way.

use std::collections::BTreeMap;

use good_lp::Variable;
use num_traits::ToPrimitive;
use tracing::debug;

use crate::{
    allocation::{Allocation, Metrics, OptionAssignment, ParticipantOutcome},
    ids::{OptionId, ParticipantId},
    preferences::PreferenceIndex,
    quota::QuotaConfig,
    solvers::{BackendOutcome, SolveStatus, SolverError, ilp::model::ModelLayout},
};

/// Threshold for interpreting a binary variable as selected.
///
/// Solvers may return values like 0.9999999 instead of exactly 1.0.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Reads solver output back in terms of participants and options.
#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor<'a> {
    index: &'a PreferenceIndex,
    quota: &'a QuotaConfig,
}

impl<'a> ResultExtractor<'a> {
    /// Create an extractor over the preferences and quotas the model was built from.
    pub fn new(index: &'a PreferenceIndex, quota: &'a QuotaConfig) -> Self {
        Self { index, quota }
    }

    /// Build the allocation for a backend outcome.
    ///
    /// Non-optimal outcomes produce an empty allocation carrying the status and
    /// any diagnostic.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if an optimal solution leaves participants
    /// unassigned, assigns a participant twice or breaks a quota.
    pub fn extract(
        &self,
        layout: &ModelLayout,
        outcome: BackendOutcome,
    ) -> Result<Allocation, SolverError> {
        if outcome.status != SolveStatus::Optimal {
            return Ok(Allocation::unsolved(outcome.status, outcome.diagnostic));
        }

        let is_chosen = |var: Variable| {
            outcome
                .values
                .get(&var)
                .is_some_and(|&value| value > BINARY_THRESHOLD)
        };

        let option_count = self.index.options().len();
        let mut members: Vec<Vec<ParticipantId>> = vec![Vec::new(); option_count];
        let mut outcomes = Vec::with_capacity(self.index.len());
        let mut unassigned = Vec::new();

        for (participant, vars) in self.index.participants().iter().zip(&layout.assignment) {
            let mut chosen = vars.iter().filter(|x| is_chosen(x.var));

            let Some(picked) = chosen.next() else {
                unassigned.push(participant.clone());
                continue;
            };

            if chosen.next().is_some() {
                return Err(SolverError::InvariantViolation {
                    message: "participant assigned to more than one option",
                });
            }

            let option = self
                .index
                .option(picked.option_idx)
                .ok_or(SolverError::InvariantViolation {
                    message: "assignment refers to an option outside the catalog",
                })?;

            members
                .get_mut(picked.option_idx)
                .ok_or(SolverError::InvariantViolation {
                    message: "assignment refers to an option outside the catalog",
                })?
                .push(participant.clone());

            outcomes.push(ParticipantOutcome {
                participant: participant.clone(),
                option: option.clone(),
                rank: picked.rank,
                score: picked.score,
            });
        }

        if !unassigned.is_empty() {
            return Err(SolverError::UnassignedParticipants(unassigned));
        }

        if members.iter().any(|m| !self.quota.admits(m.len())) {
            return Err(SolverError::InvariantViolation {
                message: "option head count outside quota bounds",
            });
        }

        let mut assignments = Vec::new();
        let mut unused_options = Vec::new();

        for (option, participants) in self.index.options().iter().zip(members) {
            if participants.is_empty() {
                unused_options.push(option.clone());
            } else {
                assignments.push(OptionAssignment {
                    option: option.clone(),
                    participants,
                });
            }
        }

        // With a zero minimum the solver may open options nobody joins, and the
        // objective still counts their weight.
        let opened = layout
            .activation
            .iter()
            .flatten()
            .filter(|&&y| is_chosen(y))
            .count();

        let metrics = self.metrics(&outcomes, assignments.len(), opened, unused_options);

        debug!(
            total_score = metrics.total_score,
            active_options = metrics.active_options,
            "extracted allocation"
        );

        Ok(Allocation::optimal(assignments, outcomes, metrics))
    }

    fn metrics(
        &self,
        outcomes: &[ParticipantOutcome],
        active_options: usize,
        opened_options: usize,
        unused_options: Vec<OptionId>,
    ) -> Metrics {
        let total_score: usize = outcomes.iter().map(|o| o.score).sum();

        let mut rank_distribution = BTreeMap::new();

        for outcome in outcomes {
            *rank_distribution.entry(outcome.rank).or_insert(0) += 1;
        }

        let total = total_score.to_f64().unwrap_or(f64::NAN);
        let opened = opened_options.to_f64().unwrap_or(f64::NAN);
        let participants = outcomes.len().to_f64().unwrap_or(f64::NAN);

        let average_score = if outcomes.is_empty() {
            0.0
        } else {
            total / participants
        };

        Metrics {
            total_score,
            active_options,
            unassigned_participants: Vec::new(),
            objective_value: total + self.quota.option_weight() * opened,
            average_score,
            rank_distribution,
            unused_options,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use testresult::TestResult;

    use crate::{
        ids::participants,
        preferences::Ranking,
        solvers::ilp::{builder::ModelBuilder, model::ModelLayout},
    };

    use super::*;

    fn index() -> Result<PreferenceIndex, crate::preferences::PreferenceError> {
        PreferenceIndex::from_rankings(
            &participants(&["Alice", "Bob", "Charlie"]),
            &[],
            &[
                Ranking::of("Alice", &["A", "B"]),
                Ranking::of("Bob", &["B", "A"]),
                Ranking::of("Charlie", &["A", "B"]),
            ],
        )
    }

    /// Pick the variable of each participant's `picks[p]`-th choice and open
    /// exactly the options somebody was picked into.
    fn values_for(layout: &ModelLayout, picks: &[usize]) -> HashMap<Variable, f64> {
        let mut values = HashMap::new();
        let mut opened = vec![false; layout.activation.len()];

        for (vars, &pick) in layout.assignment.iter().zip(picks) {
            for (idx, x) in vars.iter().enumerate() {
                let chosen = idx == pick;

                values.insert(x.var, if chosen { 0.999_999 } else { 1e-9 });

                if chosen && let Some(open) = opened.get_mut(x.option_idx) {
                    *open = true;
                }
            }
        }

        for (y, open) in layout.activation.iter().zip(opened) {
            if let Some(y) = y {
                values.insert(*y, if open { 1.0 } else { 0.0 });
            }
        }

        values
    }

    #[test]
    fn reads_assignments_and_metrics() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(1, 2, 1.0)?;
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        let values = values_for(&layout, &[0, 0, 0]);
        let allocation =
            ResultExtractor::new(&index, &quota).extract(&layout, BackendOutcome::optimal(values))?;

        assert!(allocation.is_optimal());
        assert_eq!(
            allocation.participants_for("A"),
            Some(participants(&["Alice", "Charlie"]).as_slice())
        );
        assert_eq!(
            allocation.participants_for("B"),
            Some(participants(&["Bob"]).as_slice())
        );

        let metrics = allocation.metrics();

        assert_eq!(metrics.total_score, 6);
        assert_eq!(metrics.active_options, 2);
        assert!(metrics.unassigned_participants.is_empty());
        assert!((metrics.objective_value - 8.0).abs() < f64::EPSILON);
        assert!((metrics.average_score - 2.0).abs() < f64::EPSILON);
        assert_eq!(metrics.rank_distribution.get(&1), Some(&3));
        assert!(metrics.unused_options.is_empty());

        Ok(())
    }

    #[test]
    fn objective_counts_options_opened_without_participants() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(0, 3, 1.5)?;
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        // Everyone in A, yet B's activation is switched on as well.
        let mut values = values_for(&layout, &[0, 1, 0]);

        for y in layout.activation.iter().flatten() {
            values.insert(*y, 1.0);
        }

        let allocation =
            ResultExtractor::new(&index, &quota).extract(&layout, BackendOutcome::optimal(values))?;

        let metrics = allocation.metrics();

        assert_eq!(metrics.total_score, 5);
        assert_eq!(metrics.active_options, 1);
        assert!((metrics.objective_value - 8.0).abs() < f64::EPSILON);

        Ok(())
    }

    #[test]
    fn missing_assignment_is_reported() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(0, 3, 1.0)?;
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        let mut values = values_for(&layout, &[0, 0, 0]);

        for x in layout.assignment.get(1).into_iter().flatten() {
            values.insert(x.var, 0.0);
        }

        let err = ResultExtractor::new(&index, &quota)
            .extract(&layout, BackendOutcome::optimal(values))
            .err();

        assert!(matches!(
            err,
            Some(SolverError::UnassignedParticipants(ref missing)) if missing == &participants(&["Bob"])
        ));

        Ok(())
    }

    #[test]
    fn double_assignment_is_an_invariant_violation() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(0, 3, 1.0)?;
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        let mut values = values_for(&layout, &[0, 0, 0]);

        for x in layout.assignment.first().into_iter().flatten() {
            values.insert(x.var, 1.0);
        }

        let err = ResultExtractor::new(&index, &quota)
            .extract(&layout, BackendOutcome::optimal(values))
            .err();

        assert!(matches!(err, Some(SolverError::InvariantViolation { .. })));

        Ok(())
    }

    #[test]
    fn quota_breach_is_an_invariant_violation() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(2, 3, 1.0)?;
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        // Bob alone in B breaks the minimum of two.
        let values = values_for(&layout, &[0, 0, 0]);

        let err = ResultExtractor::new(&index, &quota)
            .extract(&layout, BackendOutcome::optimal(values))
            .err();

        assert!(matches!(err, Some(SolverError::InvariantViolation { .. })));

        Ok(())
    }

    #[test]
    fn non_optimal_outcomes_yield_empty_allocations() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::default();
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        let extractor = ResultExtractor::new(&index, &quota);

        let infeasible = extractor.extract(&layout, BackendOutcome::infeasible())?;

        assert_eq!(infeasible.status(), SolveStatus::Infeasible);
        assert!(infeasible.assignments().is_empty());
        assert_eq!(infeasible.metrics().total_score, 0);

        let failed = extractor.extract(&layout, BackendOutcome::error("solver crashed"))?;

        assert_eq!(failed.status(), SolveStatus::Error);
        assert_eq!(failed.diagnostic(), Some("solver crashed"));

        Ok(())
    }

    #[test]
    fn unused_options_are_listed() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(1, 3, 0.0)?;
        let (_program, layout) = ModelBuilder::new(&index, &quota).build()?.into_parts();

        // Everyone in A: Bob's second choice.
        let values = values_for(&layout, &[0, 1, 0]);
        let allocation =
            ResultExtractor::new(&index, &quota).extract(&layout, BackendOutcome::optimal(values))?;

        let metrics = allocation.metrics();

        assert_eq!(metrics.unused_options, vec![OptionId::from("B")]);
        assert_eq!(metrics.total_score, 5);
        assert_eq!(metrics.rank_distribution.get(&2), Some(&1));
        assert!((metrics.objective_value - 5.0).abs() < f64::EPSILON);

        Ok(())
    }
}
