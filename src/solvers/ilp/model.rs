//! Decision Model

use std::{collections::HashMap, fmt};

use good_lp::{Expression, ProblemVariables, Solution, Variable, variable};
use smallvec::SmallVec;

/// Relation operator for a linear ILP constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    /// Equality (`lhs == rhs`)
    Eq,

    /// Less than or equal (`lhs <= rhs`)
    Leq,

    /// Greater than or equal (`lhs >= rhs`)
    Geq,
}

impl ConstraintRelation {
    /// Operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintRelation::Eq => "=",
            ConstraintRelation::Leq => "<=",
            ConstraintRelation::Geq => ">=",
        }
    }
}

/// Recorded linear ILP constraint emitted during model construction.
#[derive(Debug, Clone)]
pub struct ILPConstraint {
    /// Left-hand side expression
    pub lhs: Expression,

    /// Relation operator
    pub relation: ConstraintRelation,

    /// Right-hand side scalar
    pub rhs: f64,
}

impl ILPConstraint {
    /// Whether `values` satisfy this constraint within `tolerance`.
    pub fn is_satisfied_by(&self, values: &HashMap<Variable, f64>, tolerance: f64) -> bool {
        let lhs = values.eval(&self.lhs);

        match self.relation {
            ConstraintRelation::Eq => (lhs - self.rhs).abs() <= tolerance,
            ConstraintRelation::Leq => lhs <= self.rhs + tolerance,
            ConstraintRelation::Geq => lhs >= self.rhs - tolerance,
        }
    }
}

/// The binary program handed to a MILP backend: variables, a maximisation
/// objective and linear constraints.
pub struct BinaryProgram {
    problem: ProblemVariables,
    declared: Vec<Variable>,
    objective: Expression,
    constraints: Vec<ILPConstraint>,
}

impl fmt::Debug for BinaryProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryProgram")
            .field("problem", &"<ProblemVariables>")
            .field("objective", &"<Expression>")
            .field("declared", &format!("[{} variables]", self.declared.len()))
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .finish()
    }
}

impl Default for BinaryProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryProgram {
    /// Create an empty program.
    pub fn new() -> Self {
        Self {
            problem: ProblemVariables::new(),
            declared: Vec::new(),
            objective: Expression::default(),
            constraints: Vec::new(),
        }
    }

    /// Declare a new binary variable.
    pub fn add_binary(&mut self) -> Variable {
        let var = self.problem.add(variable().binary());

        self.declared.push(var);

        var
    }

    /// Add `coefficient * var` to the objective.
    pub fn add_to_objective(&mut self, var: Variable, coefficient: f64) {
        self.objective += var * coefficient;
    }

    /// Record an equality constraint.
    pub fn add_eq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.push_constraint(lhs, ConstraintRelation::Eq, rhs);
    }

    /// Record a less-than-or-equal constraint.
    pub fn add_leq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.push_constraint(lhs, ConstraintRelation::Leq, rhs);
    }

    /// Record a greater-than-or-equal constraint.
    pub fn add_geq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.push_constraint(lhs, ConstraintRelation::Geq, rhs);
    }

    fn push_constraint(&mut self, lhs: Expression, relation: ConstraintRelation, rhs: f64) {
        self.constraints.push(ILPConstraint { lhs, relation, rhs });
    }

    /// Every declared variable, in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.declared
    }

    /// The objective expression (maximised).
    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    /// Recorded constraints, in insertion order.
    pub fn constraints(&self) -> &[ILPConstraint] {
        &self.constraints
    }

    /// Split the program for handing to a solver.
    pub fn into_parts(self) -> (ProblemVariables, Vec<Variable>, Expression, Vec<ILPConstraint>) {
        (self.problem, self.declared, self.objective, self.constraints)
    }
}

/// Assignment variable `x[p, o]` with the preference it stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentVar {
    /// Index of the option in the catalog
    pub option_idx: usize,

    /// Binary decision variable
    pub var: Variable,

    /// 1-based rank of the option in the participant's list
    pub rank: usize,

    /// Preference score
    pub score: usize,
}

/// Where each decision variable lives, used to read a solution back.
#[derive(Debug, Clone, Default)]
pub struct ModelLayout {
    /// Assignment variables per participant, in model order
    pub assignment: Vec<SmallVec<[AssignmentVar; 5]>>,

    /// Activation variable per catalog option; `None` for options nobody ranked
    pub activation: Vec<Option<Variable>>,
}

impl ModelLayout {
    /// Number of assignment variables.
    pub fn assignment_var_count(&self) -> usize {
        self.assignment.iter().map(SmallVec::len).sum()
    }

    /// Number of activation variables.
    pub fn activation_var_count(&self) -> usize {
        self.activation.iter().flatten().count()
    }
}

/// A built assignment model: the binary program plus its variable layout.
#[derive(Debug)]
pub struct DecisionModel {
    program: BinaryProgram,
    layout: ModelLayout,
}

impl DecisionModel {
    /// Pair a program with its layout.
    pub fn new(program: BinaryProgram, layout: ModelLayout) -> Self {
        Self { program, layout }
    }

    /// The binary program.
    pub fn program(&self) -> &BinaryProgram {
        &self.program
    }

    /// The variable layout.
    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// Separate the program (handed to the backend) from the layout (kept for extraction).
    pub fn into_parts(self) -> (BinaryProgram, ModelLayout) {
        (self.program, self.layout)
    }
}
