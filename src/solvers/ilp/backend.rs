//! MILP Backend
//!
//! Adapter between the assignment model and `good_lp`. The solver itself is
//! picked by cargo feature: the bundled `microlp` by default, HiGHS with
//! `solver-highs`.
//!
//! # Status classification
//!
//! - `Ok(solution)` whose values satisfy every recorded constraint: [`SolveStatus::Optimal`]
//! - [`ResolutionError::Infeasible`]: [`SolveStatus::Infeasible`]
//! - anything else (unbounded, numerical or internal failures): [`SolveStatus::Error`]
//!
//! # Limits
//!
//! HiGHS honours [`SolveLimits::time_limit_secs`]. When the limit expires it hands
//! back its best incumbent; an incumbent that satisfies every constraint is
//! reported as optimal for the purposes of the caller, and a limit reached with
//! no feasible incumbent surfaces as values that violate the model, which this
//! adapter reports as [`SolveStatus::Error`]. `microlp` has no limit support and
//! always runs to completion; configured limits are logged and ignored.

use std::collections::HashMap;

use good_lp::{ResolutionError, Solution, SolverModel, Variable};
use tracing::warn;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::WithTimeLimit;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::solvers::{
    BackendOutcome, MilpBackend, SolveLimits,
    ilp::model::{BinaryProgram, ConstraintRelation, ILPConstraint},
};

/// Slack allowed when checking returned values against the model constraints.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// [`MilpBackend`] backed by the `good_lp` default solver.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoodLpBackend;

impl MilpBackend for GoodLpBackend {
    fn solve(&self, program: BinaryProgram, limits: &SolveLimits) -> BackendOutcome {
        let (problem, declared, objective, constraints) = program.into_parts();

        let model = problem.maximise(objective).using(default_solver);
        let model = apply_limits(model, limits);
        let model = apply_recorded_constraints(model, &constraints);

        match model.solve() {
            Ok(solution) => {
                let values: HashMap<Variable, f64> = declared
                    .iter()
                    .map(|&var| (var, solution.value(var)))
                    .collect();

                classify_solution(values, &constraints)
            }
            Err(ResolutionError::Infeasible) => BackendOutcome::infeasible(),
            Err(err) => {
                warn!(error = %err, "MILP backend failed");

                BackendOutcome::error(err.to_string())
            }
        }
    }
}

fn classify_solution(values: HashMap<Variable, f64>, constraints: &[ILPConstraint]) -> BackendOutcome {
    let violated = constraints
        .iter()
        .filter(|constraint| !constraint.is_satisfied_by(&values, FEASIBILITY_TOLERANCE))
        .count();

    if violated > 0 {
        warn!(violated, "MILP backend returned values that violate the model");

        return BackendOutcome::error(format!(
            "backend returned values that violate {violated} model constraint(s)"
        ));
    }

    BackendOutcome::optimal(values)
}

fn apply_recorded_constraints<S: SolverModel>(mut model: S, constraints: &[ILPConstraint]) -> S {
    for constraint in constraints {
        let lhs = constraint.lhs.clone();

        model = match constraint.relation {
            ConstraintRelation::Eq => model.with(lhs.eq(constraint.rhs)),
            ConstraintRelation::Leq => model.with(lhs.leq(constraint.rhs)),
            ConstraintRelation::Geq => model.with(lhs.geq(constraint.rhs)),
        };
    }

    model
}

#[cfg(feature = "solver-highs")]
fn apply_limits<S: WithTimeLimit>(model: S, limits: &SolveLimits) -> S {
    match limits.time_limit_secs() {
        Some(seconds) => model.with_time_limit(seconds),
        None => model,
    }
}

#[cfg(not(feature = "solver-highs"))]
fn apply_limits<S>(model: S, limits: &SolveLimits) -> S {
    if limits.is_limited() {
        warn!(
            time_limit_secs = limits.time_limit_secs(),
            "the bundled MILP solver does not support limits; solving to completion"
        );
    }

    model
}
