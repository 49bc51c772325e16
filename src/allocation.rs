//! Allocation

use std::collections::BTreeMap;

use crate::{
    ids::{OptionId, ParticipantId},
    solvers::SolveStatus,
};

/// Participants assigned to one active option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionAssignment {
    /// The active option
    pub option: OptionId,

    /// Assigned participants, in input order
    pub participants: Vec<ParticipantId>,
}

/// Where a single participant ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantOutcome {
    /// The participant
    pub participant: ParticipantId,

    /// Option they were assigned to
    pub option: OptionId,

    /// 1-based rank of that option in their list
    pub rank: usize,

    /// Preference score of that option
    pub score: usize,
}

/// Summary figures for an allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    /// Sum of the preference scores of every assigned pair
    pub total_score: usize,

    /// Number of options with at least one participant
    pub active_options: usize,

    /// Participants without an option; always empty for an optimal allocation
    pub unassigned_participants: Vec<ParticipantId>,

    /// Solver objective: `total_score` plus `option_weight` for every option
    /// the solution opened
    pub objective_value: f64,

    /// Mean preference score per participant
    pub average_score: f64,

    /// Number of participants who received their n-th choice, keyed by n
    pub rank_distribution: BTreeMap<usize, usize>,

    /// Catalog options that ended up inactive, sorted by identifier
    pub unused_options: Vec<OptionId>,
}

/// Result of an assignment solve.
///
/// Only an [`SolveStatus::Optimal`] allocation carries assignments; the others
/// report zeroed metrics and, for [`SolveStatus::Error`], a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    status: SolveStatus,
    assignments: Vec<OptionAssignment>,
    outcomes: Vec<ParticipantOutcome>,
    metrics: Metrics,
    diagnostic: Option<String>,
}

impl Allocation {
    /// Create an optimal allocation.
    #[must_use]
    pub fn optimal(
        assignments: Vec<OptionAssignment>,
        outcomes: Vec<ParticipantOutcome>,
        metrics: Metrics,
    ) -> Self {
        Self {
            status: SolveStatus::Optimal,
            assignments,
            outcomes,
            metrics,
            diagnostic: None,
        }
    }

    /// Create an allocation for a solve that produced no assignment.
    #[must_use]
    pub fn unsolved(status: SolveStatus, diagnostic: Option<String>) -> Self {
        Self {
            status,
            assignments: Vec::new(),
            outcomes: Vec::new(),
            metrics: Metrics::default(),
            diagnostic,
        }
    }

    /// Terminal solve status.
    #[must_use]
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Whether the allocation is optimal.
    #[must_use]
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Active options with their participants, sorted by option identifier.
    #[must_use]
    pub fn assignments(&self) -> &[OptionAssignment] {
        &self.assignments
    }

    /// Per-participant outcomes, in input order.
    #[must_use]
    pub fn outcomes(&self) -> &[ParticipantOutcome] {
        &self.outcomes
    }

    /// Summary metrics.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Backend failure description, present for [`SolveStatus::Error`].
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Participants assigned to `option`, if it is active.
    pub fn participants_for(&self, option: &str) -> Option<&[ParticipantId]> {
        self.assignments
            .iter()
            .find(|a| a.option.as_str() == option)
            .map(|a| a.participants.as_slice())
    }

    /// Option `participant` was assigned to.
    pub fn option_of(&self, participant: &str) -> Option<&OptionId> {
        self.outcomes
            .iter()
            .find(|o| o.participant.as_str() == participant)
            .map(|o| &o.option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Allocation {
        let assignments = vec![OptionAssignment {
            option: OptionId::from("A"),
            participants: vec![ParticipantId::from("Alice"), ParticipantId::from("Bob")],
        }];

        let outcomes = vec![
            ParticipantOutcome {
                participant: ParticipantId::from("Alice"),
                option: OptionId::from("A"),
                rank: 1,
                score: 2,
            },
            ParticipantOutcome {
                participant: ParticipantId::from("Bob"),
                option: OptionId::from("A"),
                rank: 2,
                score: 1,
            },
        ];

        let metrics = Metrics {
            total_score: 3,
            active_options: 1,
            ..Metrics::default()
        };

        Allocation::optimal(assignments, outcomes, metrics)
    }

    #[test]
    fn lookups_by_option_and_participant() {
        let allocation = sample();

        assert!(allocation.is_optimal());
        assert_eq!(allocation.participants_for("A").map(<[_]>::len), Some(2));
        assert_eq!(allocation.participants_for("B"), None);
        assert_eq!(allocation.option_of("Bob"), Some(&OptionId::from("A")));
        assert_eq!(allocation.option_of("Zed"), None);
    }

    #[test]
    fn unsolved_allocations_are_empty() {
        let allocation = Allocation::unsolved(SolveStatus::Error, Some("boom".to_string()));

        assert_eq!(allocation.status(), SolveStatus::Error);
        assert!(allocation.assignments().is_empty());
        assert!(allocation.outcomes().is_empty());
        assert_eq!(allocation.metrics(), &Metrics::default());
        assert_eq!(allocation.diagnostic(), Some("boom"));
    }
}
