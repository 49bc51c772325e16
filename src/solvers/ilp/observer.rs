//! ILP Observer

use good_lp::{Expression, Variable};

/// Observer trait for capturing the assignment model as it's built.
///
/// The builder fires these callbacks while it declares variables, objective
/// terms and constraints, so renderers and diagnostics can record the exact
/// formulation without duplicating any of the modelling logic.
///
/// When no observer is needed the solver passes a [`NoopObserver`].
pub trait ILPObserver: Send + Sync {
    /// Called when an assignment variable `x[p, o]` is created.
    ///
    /// # Parameters
    ///
    /// - `participant_idx`: Index of the participant in model order
    /// - `option_idx`: Index of the option in the catalog
    /// - `var`: The binary decision variable
    /// - `score`: Preference score the participant gave the option
    fn on_assignment_variable(
        &mut self,
        participant_idx: usize,
        option_idx: usize,
        var: Variable,
        score: usize,
    );

    /// Called when an activation variable `y[o]` is created.
    ///
    /// # Parameters
    ///
    /// - `option_idx`: Index of the option in the catalog
    /// - `var`: The binary activation variable
    fn on_activation_variable(&mut self, option_idx: usize, var: Variable);

    /// Called when a term is added to the objective function.
    fn on_objective_term(&mut self, _var: Variable, _coefficient: f64) {}

    /// Called when the single-assignment constraint for a participant is added.
    ///
    /// # Parameters
    ///
    /// - `participant_idx`: Index of the participant in model order
    /// - `constraint_expr`: Sum of the participant's assignment variables (`= 1`)
    fn on_single_assignment_constraint(
        &mut self,
        participant_idx: usize,
        constraint_expr: &Expression,
    );

    /// Called when a quota linkage constraint for an option is added.
    ///
    /// # Parameters
    ///
    /// - `option_idx`: Index of the option in the catalog
    /// - `constraint_type`: `"minimum_quota"` or `"maximum_quota"`
    /// - `constraint_expr`: The left-hand side expression
    /// - `relation`: Relation operator (`">="` or `"<="`)
    /// - `rhs`: Right-hand side value
    fn on_quota_constraint(
        &mut self,
        option_idx: usize,
        constraint_type: &str,
        constraint_expr: &Expression,
        relation: &str,
        rhs: f64,
    );
}

/// No-op observer for unobserved solves.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ILPObserver for NoopObserver {
    fn on_assignment_variable(&mut self, _: usize, _: usize, _: Variable, _: usize) {}

    fn on_activation_variable(&mut self, _: usize, _: Variable) {}

    fn on_single_assignment_constraint(&mut self, _: usize, _: &Expression) {}

    fn on_quota_constraint(&mut self, _: usize, _: &str, _: &Expression, _: &str, _: f64) {}
}
