//! Model Builder
//!
//! Builds the binary program for an assignment problem:
//!
//! - `x[p, o]` for every option `o` that participant `p` ranked, and nothing else
//! - `y[o]` for every option at least one participant ranked
//!
//! ```text
//! maximise    Σ score(p, o) · x[p, o]  +  option_weight · Σ y[o]
//! subject to  Σ_o x[p, o] = 1                          for every participant p
//!             Σ_p x[p, o] - min_quota · y[o] >= 0      for every ranked option o
//!             Σ_p x[p, o] - max_quota · y[o] <= 0      for every ranked option o
//! ```
//!
//! The pair of quota rows forces each option count to be either exactly zero
//! (`y[o] = 0`) or within `[min_quota, max_quota]` (`y[o] = 1`).

use good_lp::{Expression, Variable};
use num_traits::ToPrimitive;
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    preferences::PreferenceIndex,
    quota::QuotaConfig,
    solvers::{
        SolverError,
        ilp::{
            model::{AssignmentVar, BinaryProgram, DecisionModel, ModelLayout},
            observer::{ILPObserver, NoopObserver},
        },
    },
};

type ParticipantVars = SmallVec<[AssignmentVar; 5]>;
type OptionVars = SmallVec<[Variable; 8]>;

/// Builds a [`DecisionModel`] from validated preferences and quotas.
#[derive(Debug, Clone, Copy)]
pub struct ModelBuilder<'a> {
    index: &'a PreferenceIndex,
    quota: &'a QuotaConfig,
}

impl<'a> ModelBuilder<'a> {
    /// Create a builder over the given preferences and quota configuration.
    pub fn new(index: &'a PreferenceIndex, quota: &'a QuotaConfig) -> Self {
        Self { index, quota }
    }

    /// Build the model.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if a coefficient cannot be represented exactly or a
    /// participant has no ranked options.
    pub fn build(&self) -> Result<DecisionModel, SolverError> {
        self.build_with_observer(&mut NoopObserver)
    }

    /// Build the model, reporting every variable and constraint to `observer`.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if a coefficient cannot be represented exactly or a
    /// participant has no ranked options.
    pub fn build_with_observer<O: ILPObserver + ?Sized>(
        &self,
        observer: &mut O,
    ) -> Result<DecisionModel, SolverError> {
        let mut program = BinaryProgram::new();

        let (assignment, incoming) = self.add_assignment_variables(&mut program, observer)?;
        let activation = self.add_activation_variables(&mut program, &incoming, observer);

        add_single_assignment_constraints(&mut program, &assignment, observer)?;
        self.add_quota_constraints(&mut program, &incoming, &activation, observer)?;

        let layout = ModelLayout {
            assignment,
            activation,
        };

        debug!(
            participants = self.index.len(),
            options = self.index.options().len(),
            assignment_vars = layout.assignment_var_count(),
            activation_vars = layout.activation_var_count(),
            constraints = program.constraints().len(),
            "built assignment model"
        );

        Ok(DecisionModel::new(program, layout))
    }

    /// Declare `x[p, o]` for every ranked pair and add its score to the objective.
    ///
    /// Returns the per-participant layout and, per catalog option, the variables
    /// of every participant who ranked it.
    fn add_assignment_variables<O: ILPObserver + ?Sized>(
        &self,
        program: &mut BinaryProgram,
        observer: &mut O,
    ) -> Result<(Vec<ParticipantVars>, Vec<OptionVars>), SolverError> {
        let mut assignment = Vec::with_capacity(self.index.len());
        let mut incoming: Vec<OptionVars> = vec![SmallVec::new(); self.index.options().len()];

        for (participant_idx, (_participant, prefs)) in self.index.iter().enumerate() {
            let mut vars = SmallVec::new();

            for entry in prefs {
                let var = program.add_binary();

                let coeff = usize_to_f64_exact(entry.score)
                    .ok_or(SolverError::ScoreNotRepresentable { score: entry.score })?;

                program.add_to_objective(var, coeff);

                observer.on_assignment_variable(participant_idx, entry.option_idx, var, entry.score);
                observer.on_objective_term(var, coeff);

                incoming
                    .get_mut(entry.option_idx)
                    .ok_or(SolverError::InvariantViolation {
                        message: "preference refers to an option outside the catalog",
                    })?
                    .push(var);

                vars.push(AssignmentVar {
                    option_idx: entry.option_idx,
                    var,
                    rank: entry.rank,
                    score: entry.score,
                });
            }

            assignment.push(vars);
        }

        Ok((assignment, incoming))
    }

    /// Declare `y[o]` for every option with at least one incoming preference.
    fn add_activation_variables<O: ILPObserver + ?Sized>(
        &self,
        program: &mut BinaryProgram,
        incoming: &[OptionVars],
        observer: &mut O,
    ) -> Vec<Option<Variable>> {
        let weight = self.quota.option_weight();

        incoming
            .iter()
            .enumerate()
            .map(|(option_idx, vars)| {
                if vars.is_empty() {
                    return None;
                }

                let y = program.add_binary();

                observer.on_activation_variable(option_idx, y);

                if weight > 0.0 {
                    program.add_to_objective(y, weight);
                    observer.on_objective_term(y, weight);
                }

                Some(y)
            })
            .collect()
    }

    /// Link each option's head count to its activation variable.
    fn add_quota_constraints<O: ILPObserver + ?Sized>(
        &self,
        program: &mut BinaryProgram,
        incoming: &[OptionVars],
        activation: &[Option<Variable>],
        observer: &mut O,
    ) -> Result<(), SolverError> {
        let min_quota = self.quota.min_quota();
        let max_quota = self.quota.max_quota();

        let min_coeff = usize_to_f64_exact(min_quota)
            .ok_or(SolverError::QuotaNotRepresentable { quota: min_quota })?;
        let max_coeff = usize_to_f64_exact(max_quota)
            .ok_or(SolverError::QuotaNotRepresentable { quota: max_quota })?;

        for (option_idx, (vars, y)) in incoming.iter().zip(activation).enumerate() {
            let Some(y) = *y else {
                continue;
            };

            let count: Expression = vars.iter().copied().sum();

            let lower = count.clone() - min_coeff * y;
            observer.on_quota_constraint(option_idx, "minimum_quota", &lower, ">=", 0.0);
            program.add_geq_constraint(lower, 0.0);

            // With y = 0 this row pins the count to zero.
            let upper = count - max_coeff * y;
            observer.on_quota_constraint(option_idx, "maximum_quota", &upper, "<=", 0.0);
            program.add_leq_constraint(upper, 0.0);
        }

        Ok(())
    }
}

/// Every participant is assigned to exactly one of the options they ranked.
fn add_single_assignment_constraints<O: ILPObserver + ?Sized>(
    program: &mut BinaryProgram,
    assignment: &[ParticipantVars],
    observer: &mut O,
) -> Result<(), SolverError> {
    for (participant_idx, vars) in assignment.iter().enumerate() {
        if vars.is_empty() {
            return Err(SolverError::InvariantViolation {
                message: "participant has no ranked options",
            });
        }

        let expr: Expression = vars.iter().map(|x| x.var).sum();

        observer.on_single_assignment_constraint(participant_idx, &expr);

        program.add_eq_constraint(expr, 1.0);
    }

    Ok(())
}

/// Convert a `usize` to an `f64` if it can be represented exactly.
pub fn usize_to_f64_exact(v: usize) -> Option<f64> {
    let f = v.to_f64()?;

    (f.to_usize() == Some(v)).then_some(f)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use good_lp::Solution;
    use testresult::TestResult;

    use crate::{
        ids::{options, participants},
        preferences::Ranking,
    };

    use super::*;

    fn index() -> Result<PreferenceIndex, crate::preferences::PreferenceError> {
        PreferenceIndex::from_rankings(
            &participants(&["alice", "bob", "charlie"]),
            &options(&["unranked"]),
            &[
                Ranking::of("alice", &["A", "B"]),
                Ranking::of("bob", &["B", "A"]),
                Ranking::of("charlie", &["A"]),
            ],
        )
    }

    #[test]
    fn declares_only_ranked_pairs_and_ranked_options() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(1, 2, 0.0)?;

        let model = ModelBuilder::new(&index, &quota).build()?;
        let layout = model.layout();

        assert_eq!(layout.assignment_var_count(), 5);
        assert_eq!(layout.activation_var_count(), 2);

        // "unranked" sorts last in the catalog and gets no activation variable.
        assert_eq!(layout.activation.last(), Some(&None));
        assert_eq!(model.program().variables().len(), 7);

        Ok(())
    }

    #[test]
    fn records_one_assignment_row_and_two_quota_rows_per_option() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(1, 2, 0.0)?;

        let model = ModelBuilder::new(&index, &quota).build()?;

        // 3 single-assignment rows + 2 ranked options * 2 quota rows
        assert_eq!(model.program().constraints().len(), 7);

        Ok(())
    }

    #[test]
    fn objective_sums_scores_and_weighted_activations() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(1, 2, 1.5)?;

        let model = ModelBuilder::new(&index, &quota).build()?;

        let values: HashMap<Variable, f64> = model
            .program()
            .variables()
            .iter()
            .copied()
            .map(|v| (v, 1.0))
            .collect();

        // Scores: alice 2 + 1, bob 2 + 1, charlie 1 = 7; two activations * 1.5 = 3
        let expected = 10.0_f64;
        let actual = values.eval(model.program().objective());

        assert!((actual - expected).abs() <= f64::EPSILON);

        Ok(())
    }

    #[test]
    fn zero_weight_leaves_activations_out_of_the_objective() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(1, 2, 0.0)?;

        let model = ModelBuilder::new(&index, &quota).build()?;

        let activation: Vec<Variable> = model.layout().activation.iter().flatten().copied().collect();

        let values: HashMap<Variable, f64> = model
            .program()
            .variables()
            .iter()
            .copied()
            .map(|v| (v, if activation.contains(&v) { 1.0 } else { 0.0 }))
            .collect();

        assert!(values.eval(model.program().objective()).abs() <= f64::EPSILON);

        Ok(())
    }

    #[test]
    fn quota_rows_forbid_counts_below_minimum() -> TestResult {
        let index = index()?;
        let quota = QuotaConfig::new(2, 2, 0.0)?;

        let model = ModelBuilder::new(&index, &quota).build()?;
        let layout = model.layout();

        // Put only charlie on A with A active: violates the minimum of 2.
        let mut values: HashMap<Variable, f64> = model
            .program()
            .variables()
            .iter()
            .copied()
            .map(|v| (v, 0.0))
            .collect();

        let charlie_a = layout
            .assignment
            .get(2)
            .and_then(|vars| vars.first())
            .map(|x| x.var)
            .ok_or("missing charlie variable")?;
        let a_active = layout
            .activation
            .first()
            .copied()
            .flatten()
            .ok_or("missing activation variable")?;

        values.insert(charlie_a, 1.0);
        values.insert(a_active, 1.0);

        let satisfied = model
            .program()
            .constraints()
            .iter()
            .filter(|c| c.relation != crate::solvers::ilp::model::ConstraintRelation::Eq)
            .all(|c| c.is_satisfied_by(&values, 1e-9));

        assert!(!satisfied, "a lone participant must violate min_quota = 2");

        Ok(())
    }

    #[test]
    fn observer_sees_every_variable_and_constraint() -> TestResult {
        #[derive(Default)]
        struct CountingObserver {
            assignment: usize,
            activation: usize,
            objective_terms: usize,
            single: usize,
            quota: usize,
        }

        impl ILPObserver for CountingObserver {
            fn on_assignment_variable(&mut self, _: usize, _: usize, _: Variable, _: usize) {
                self.assignment += 1;
            }

            fn on_activation_variable(&mut self, _: usize, _: Variable) {
                self.activation += 1;
            }

            fn on_objective_term(&mut self, _: Variable, _: f64) {
                self.objective_terms += 1;
            }

            fn on_single_assignment_constraint(&mut self, _: usize, _: &Expression) {
                self.single += 1;
            }

            fn on_quota_constraint(&mut self, _: usize, _: &str, _: &Expression, _: &str, _: f64) {
                self.quota += 1;
            }
        }

        let index = index()?;
        let quota = QuotaConfig::new(1, 2, 1.0)?;

        let mut observer = CountingObserver::default();
        let _model = ModelBuilder::new(&index, &quota).build_with_observer(&mut observer)?;

        assert_eq!(observer.assignment, 5, "one x per ranked pair");
        assert_eq!(observer.activation, 2, "one y per ranked option");
        assert_eq!(observer.objective_terms, 7, "scores plus weighted activations");
        assert_eq!(observer.single, 3, "one row per participant");
        assert_eq!(observer.quota, 4, "two rows per ranked option");

        Ok(())
    }

    #[test]
    #[expect(
        clippy::cast_precision_loss,
        reason = "This is a test case for exact conversion"
    )]
    fn usize_to_f64_exact_accepts_exactly_representable_integers() {
        let cases: [usize; 4] = [0, 1, 123, 9_007_199_254_740_992]; // 2^53

        for v in cases {
            assert_eq!(usize_to_f64_exact(v), Some(v as f64));
        }
    }

    #[test]
    fn usize_to_f64_exact_rejects_nonrepresentable_integers() {
        assert_eq!(usize_to_f64_exact(9_007_199_254_740_993), None); // 2^53 + 1
    }
}
