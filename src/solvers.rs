//! Solvers for Assignment Problems

use std::{collections::HashMap, fmt};

use good_lp::Variable;
use serde::Deserialize;
use thiserror::Error;

use crate::{ids::ParticipantId, solvers::ilp::BinaryProgram};

pub mod ilp;

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// Score cannot be represented exactly as a solver coefficient.
    #[error("score cannot be represented exactly as a solver coefficient: {score}")]
    ScoreNotRepresentable {
        /// Preference score
        score: usize,
    },

    /// Quota bound cannot be represented exactly as a solver coefficient.
    #[error("quota cannot be represented exactly as a solver coefficient: {quota}")]
    QuotaNotRepresentable {
        /// Quota bound
        quota: usize,
    },

    /// The solver reported an optimal solution that leaves participants unassigned.
    #[error("optimal solution left {} participant(s) unassigned", .0.len())]
    UnassignedParticipants(Vec<ParticipantId>),

    /// Internal solver invariant was violated (this is a bug).
    #[error("solver invariant violated: {message}")]
    InvariantViolation {
        /// What invariant was violated
        message: &'static str,
    },
}

/// Terminal status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    /// A globally optimal assignment satisfying every constraint was found.
    Optimal,

    /// No assignment satisfies the single-assignment and quota constraints together.
    Infeasible,

    /// The backend failed; no result was produced.
    Error,
}

impl SolveStatus {
    /// Human readable status label.
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Error => "Error",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solve limit errors
#[derive(Debug, Error, PartialEq)]
pub enum LimitsError {
    /// The time limit is not a finite, positive number of seconds.
    #[error("time_limit_secs must be a finite, positive number, got {0}")]
    InvalidTimeLimit(f64),
}

/// Limits passed to the MILP backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawSolveLimits")]
pub struct SolveLimits {
    time_limit_secs: Option<f64>,
}

impl SolveLimits {
    /// No limits; the backend runs to completion.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Limit each solve to `seconds` of wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError::InvalidTimeLimit`] unless `seconds` is finite and
    /// greater than zero.
    pub fn with_time_limit(seconds: f64) -> Result<Self, LimitsError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(LimitsError::InvalidTimeLimit(seconds));
        }

        Ok(Self {
            time_limit_secs: Some(seconds),
        })
    }

    /// Wall-clock limit for a single solve, in seconds.
    pub fn time_limit_secs(&self) -> Option<f64> {
        self.time_limit_secs
    }

    /// Whether any limit is configured.
    pub fn is_limited(&self) -> bool {
        self.time_limit_secs.is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSolveLimits {
    #[serde(default)]
    time_limit_secs: Option<f64>,
}

impl TryFrom<RawSolveLimits> for SolveLimits {
    type Error = LimitsError;

    fn try_from(raw: RawSolveLimits) -> Result<Self, Self::Error> {
        raw.time_limit_secs
            .map_or_else(|| Ok(Self::unlimited()), Self::with_time_limit)
    }
}

/// What the backend reports after a solve.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    /// Classified terminal status
    pub status: SolveStatus,

    /// Value of every model variable; empty unless the status is [`SolveStatus::Optimal`]
    pub values: HashMap<Variable, f64>,

    /// Backend failure description for [`SolveStatus::Error`]
    pub diagnostic: Option<String>,
}

impl BackendOutcome {
    /// Outcome for a solve that found an optimal assignment.
    pub fn optimal(values: HashMap<Variable, f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values,
            diagnostic: None,
        }
    }

    /// Outcome for a model with no feasible assignment.
    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            values: HashMap::new(),
            diagnostic: None,
        }
    }

    /// Outcome for a failed solve.
    pub fn error(diagnostic: impl Into<String>) -> Self {
        Self {
            status: SolveStatus::Error,
            values: HashMap::new(),
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// MILP capability the assignment core depends on.
///
/// Implementations take ownership of the program for the duration of the solve
/// and must never return [`SolveStatus::Optimal`] with values that violate the
/// program's constraints.
pub trait MilpBackend {
    /// Solve the binary program within the given limits.
    fn solve(&self, program: BinaryProgram, limits: &SolveLimits) -> BackendOutcome;
}
