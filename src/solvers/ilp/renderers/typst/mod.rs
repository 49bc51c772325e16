//! ILP Typst Renderer
//!
//! Captures the assignment model as it is built and writes it out as a Typst
//! document.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use cohort::{
//!     preferences::{PreferenceIndex, Ranking},
//!     ids::participants,
//!     quota::QuotaConfig,
//!     solvers::{SolveLimits, ilp::{ILPSolver, renderers::typst::TypstRenderer}},
//! };
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = PreferenceIndex::from_rankings(
//!     &participants(&["Alice", "Bob"]),
//!     &[],
//!     &[Ranking::of("Alice", &["A", "B"]), Ranking::of("Bob", &["A", "B"])],
//! )?;
//! let quota = QuotaConfig::default();
//!
//! let mut renderer = TypstRenderer::new_with_index(PathBuf::from("formulation.typ"), &index);
//!
//! let _allocation =
//!     ILPSolver::solve_with_observer(&index, &quota, &SolveLimits::unlimited(), &mut renderer)?;
//!
//! renderer.write()?;
//! # Ok(())
//! # }
//! ```

use std::{
    fs::File,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use good_lp::{Expression, IntoAffineExpression, Variable};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{preferences::PreferenceIndex, solvers::ilp::ILPObserver};

/// Quota row: (option index, constraint type, lhs, relation, rhs).
type QuotaConstraint = (usize, String, Expression, String, f64);

/// Errors that can occur during Typst rendering.
#[derive(Debug, thiserror::Error)]
pub enum TypstRenderError {
    /// Failed to write to the output file.
    #[error("Failed to write to output file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Assignment variable captured by the observer.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentVariable {
    /// Participant index in model order
    pub participant_idx: usize,

    /// Option index in the catalog
    pub option_idx: usize,

    /// ILP decision variable
    pub var: Variable,

    /// Preference score
    pub score: usize,
}

/// Captured ILP formulation data.
#[derive(Debug, Clone, Default)]
pub struct ILPFormulation {
    /// Assignment variables, in creation order
    pub assignment_vars: SmallVec<[AssignmentVariable; 20]>,

    /// Activation variables: (`option_idx`, `var`), in creation order
    pub activation_vars: SmallVec<[(usize, Variable); 10]>,

    /// Variable display labels (`x_1`, `y_2`, ...)
    pub var_labels: FxHashMap<Variable, String>,

    /// Per-prefix counters for assigning labels
    pub var_counters: FxHashMap<String, usize>,

    /// Single-assignment rows: `participant_idx` -> expression
    pub single_assignment_constraints: FxHashMap<usize, Expression>,

    /// Quota rows, in creation order
    pub quota_constraints: SmallVec<[QuotaConstraint; 20]>,

    /// Objective terms: `var` -> coefficient
    pub objective_terms: FxHashMap<Variable, f64>,
}

impl ILPFormulation {
    /// Create a new empty formulation.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Typst renderer that implements `ILPObserver`.
#[derive(Debug, Clone)]
pub struct TypstRenderer {
    /// Captured formulation
    formulation: Arc<Mutex<ILPFormulation>>,

    /// Output path for the .typ file
    output_path: PathBuf,

    /// Participant index -> identifier
    participant_names: Vec<String>,

    /// Option index -> identifier
    option_names: Vec<String>,
}

impl TypstRenderer {
    /// Create a new Typst renderer.
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            formulation: Arc::new(Mutex::new(ILPFormulation::new())),
            output_path,
            participant_names: Vec::new(),
            option_names: Vec::new(),
        }
    }

    /// Create a renderer that names participants and options from `index`.
    pub fn new_with_index(output_path: PathBuf, index: &PreferenceIndex) -> Self {
        Self {
            formulation: Arc::new(Mutex::new(ILPFormulation::new())),
            output_path,
            participant_names: index.participants().iter().map(ToString::to_string).collect(),
            option_names: index.options().iter().map(ToString::to_string).collect(),
        }
    }

    /// Snapshot of the captured formulation.
    pub fn formulation(&self) -> ILPFormulation {
        self.formulation.lock().map_or_else(
            |poisoned| poisoned.into_inner().clone(),
            |formulation| formulation.clone(),
        )
    }

    /// Get the output path.
    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Render the captured ILP formulation to Typst syntax.
    pub fn render(&self) -> String {
        let mut output = String::new();
        let formulation = self.formulation();

        output.push_str("= ILP Formulation for Preference Assignment\n\n");

        output.push_str("== Decision Variables\n\n");
        self.render_variables(&formulation, &mut output);

        output.push_str("\n== Objective Function\n\n");
        Self::render_objective(&formulation, &mut output);

        output.push_str("\n== Constraints\n\n");
        self.render_constraints(&formulation, &mut output);

        output.push_str("\n== Full ILP in Standard Form\n\n");
        Self::render_standard_form(&formulation, &mut output);

        output
    }

    /// Write the rendered formulation to the output file.
    ///
    /// # Errors
    ///
    /// Returns [`TypstRenderError::IoError`] if the file cannot be created or written.
    pub fn write(&self) -> Result<(), TypstRenderError> {
        let content = self.render();
        let mut file = File::create(&self.output_path)?;

        file.write_all(content.as_bytes())?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ILPFormulation> {
        self.formulation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn participant_label(&self, participant_idx: usize) -> String {
        match self.participant_names.get(participant_idx) {
            Some(name) => format!("\"{name}\""),
            None => format!("participant {}", participant_idx + 1),
        }
    }

    fn option_label(&self, option_idx: usize) -> String {
        match self.option_names.get(option_idx) {
            Some(name) => format!("\"{name}\""),
            None => format!("option {}", option_idx + 1),
        }
    }

    fn render_number(value: f64) -> String {
        if (value - value.round()).abs() < 1e-9 {
            format!("{value:.0}")
        } else {
            format!("{value}")
        }
    }

    fn var_label(formulation: &ILPFormulation, var: Variable) -> String {
        formulation
            .var_labels
            .get(&var)
            .cloned()
            .unwrap_or_else(|| format!("v_({var:?})"))
    }

    /// Sort key placing every `x` before every `y`, each in label order.
    fn var_sort_key(formulation: &ILPFormulation, var: Variable) -> (usize, usize) {
        formulation
            .var_labels
            .get(&var)
            .and_then(|label| label.split_once('_'))
            .and_then(|(prefix, idx)| {
                let order = usize::from(prefix != "x");

                idx.parse().ok().map(|idx| (order, idx))
            })
            .unwrap_or((usize::MAX, usize::MAX))
    }

    /// Give `var` the next `{prefix}_n` label unless it already has one.
    fn assign_label(formulation: &mut ILPFormulation, var: Variable, prefix: &str) {
        if formulation.var_labels.contains_key(&var) {
            return;
        }

        let counter = formulation
            .var_counters
            .entry(prefix.to_string())
            .or_insert(0);

        *counter += 1;

        let label = format!("{prefix}_{}", *counter);

        formulation.var_labels.insert(var, label);
    }

    /// Render an Expression to Typst math notation.
    fn render_expression(formulation: &ILPFormulation, expr: &Expression) -> String {
        let mut terms: Vec<(Variable, f64)> = expr.linear_coefficients().collect();

        terms.sort_by_key(|(var, _)| Self::var_sort_key(formulation, *var));

        let mut out = String::new();

        for (var, coeff) in terms {
            if coeff.abs() < f64::EPSILON {
                continue;
            }

            let coeff_abs = coeff.abs();
            let label = Self::var_label(formulation, var);

            let term = if (coeff_abs - 1.0).abs() < f64::EPSILON {
                label
            } else {
                format!("{} {label}", Self::render_number(coeff_abs))
            };

            match (out.is_empty(), coeff < 0.0) {
                (true, true) => out.push_str("- "),
                (true, false) => {}
                (false, true) => out.push_str(" - "),
                (false, false) => out.push_str(" + "),
            }

            out.push_str(&term);
        }

        let constant = expr.constant();

        if constant.abs() >= f64::EPSILON {
            match (out.is_empty(), constant < 0.0) {
                (true, true) => out.push('-'),
                (true, false) => {}
                (false, true) => out.push_str(" - "),
                (false, false) => out.push_str(" + "),
            }

            out.push_str(&Self::render_number(constant.abs()));
        }

        if out.is_empty() {
            out.push('0');
        }

        out
    }

    fn render_objective_lines(formulation: &ILPFormulation, per_line: usize) -> Vec<String> {
        let mut sorted: Vec<(Variable, f64)> = formulation
            .objective_terms
            .iter()
            .map(|(var, coeff)| (*var, *coeff))
            .collect();

        sorted.sort_by_key(|(var, _)| Self::var_sort_key(formulation, *var));

        let tokens: Vec<String> = sorted
            .into_iter()
            .filter(|(_, coeff)| coeff.abs() >= f64::EPSILON)
            .enumerate()
            .map(|(idx, (var, coeff))| {
                let term = format!(
                    "{} dot {}",
                    Self::render_number(coeff.abs()),
                    Self::var_label(formulation, var)
                );

                match (idx == 0, coeff < 0.0) {
                    (_, true) => format!("- {term}"),
                    (true, false) => term,
                    (false, false) => format!("+ {term}"),
                }
            })
            .collect();

        if tokens.is_empty() {
            return vec![String::from("0")];
        }

        tokens
            .chunks(per_line.max(1))
            .map(|chunk| chunk.join(" "))
            .collect()
    }

    fn push_maximize(formulation: &ILPFormulation, output: &mut String) {
        let lines = Self::render_objective_lines(formulation, 4);

        if let Some(first) = lines.first() {
            output.push_str("$ \"maximize\" quad ");
            output.push_str(first);
            output.push_str(" $\n");
        }

        for line in lines.iter().skip(1) {
            output.push_str("$ quad ");
            output.push_str(line);
            output.push_str(" $\n");
        }
    }

    fn render_variables(&self, formulation: &ILPFormulation, output: &mut String) {
        output.push_str("All decision variables are binary.\n\n");

        output.push_str("=== Assignment Variables\n\n");

        for assignment in &formulation.assignment_vars {
            output.push_str("- $");
            output.push_str(&Self::var_label(formulation, assignment.var));
            output.push_str("$: ");
            output.push_str(&self.participant_label(assignment.participant_idx));
            output.push_str(" takes ");
            output.push_str(&self.option_label(assignment.option_idx));
            output.push_str(" (score ");
            output.push_str(&assignment.score.to_string());
            output.push_str(")\n");
        }

        output.push_str("\n=== Activation Variables\n\n");

        for (option_idx, var) in &formulation.activation_vars {
            output.push_str("- $");
            output.push_str(&Self::var_label(formulation, *var));
            output.push_str("$: ");
            output.push_str(&self.option_label(*option_idx));
            output.push_str(" runs\n");
        }
    }

    fn render_objective(formulation: &ILPFormulation, output: &mut String) {
        output.push_str("Maximize:\n\n");

        Self::push_maximize(formulation, output);
    }

    fn render_constraints(&self, formulation: &ILPFormulation, output: &mut String) {
        output.push_str("=== Single Assignment Constraints\n\n");

        output.push_str("Each participant takes exactly one of the options they ranked:\n\n");

        let mut rows: Vec<_> = formulation.single_assignment_constraints.iter().collect();

        rows.sort_by_key(|(participant_idx, _)| **participant_idx);

        for (participant_idx, expr) in rows {
            output.push_str("$ ");
            output.push_str(&Self::render_expression(formulation, expr));
            output.push_str(" = 1 $ (");
            output.push_str(&self.participant_label(*participant_idx));
            output.push_str(")\n\n");
        }

        if !formulation.quota_constraints.is_empty() {
            output.push_str("\n=== Quota Constraints\n\n");

            for (option_idx, constraint_type, expr, relation, rhs) in &formulation.quota_constraints
            {
                output.push_str("$ ");
                output.push_str(&Self::render_expression(formulation, expr));
                output.push(' ');
                output.push_str(relation);
                output.push(' ');
                output.push_str(&Self::render_number(*rhs));
                output.push_str(" $ (");
                output.push_str(constraint_type);
                output.push_str(" for ");
                output.push_str(&self.option_label(*option_idx));
                output.push_str(")\n\n");
            }
        }
    }

    fn render_standard_form(formulation: &ILPFormulation, output: &mut String) {
        Self::push_maximize(formulation, output);

        let mut rows: Vec<_> = formulation.single_assignment_constraints.iter().collect();
        rows.sort_by_key(|(participant_idx, _)| **participant_idx);

        let lines: Vec<String> = rows
            .into_iter()
            .map(|(_, expr)| format!("{} = 1", Self::render_expression(formulation, expr)))
            .chain(
                formulation
                    .quota_constraints
                    .iter()
                    .map(|(_, _, expr, relation, rhs)| {
                        format!(
                            "{} {relation} {}",
                            Self::render_expression(formulation, expr),
                            Self::render_number(*rhs)
                        )
                    }),
            )
            .collect();

        output.push_str("\n$ \"subject to\" quad ");

        match lines.split_first() {
            Some((first, rest)) => {
                output.push_str(first);
                output.push_str(" $\n");

                for line in rest {
                    output.push_str("$ quad ");
                    output.push_str(line);
                    output.push_str(" $\n");
                }
            }
            None => output.push_str("0 = 0 $\n"),
        }

        output.push_str("\n$ x_i, y_j in {0,1} $\n");
    }
}

impl ILPObserver for TypstRenderer {
    fn on_assignment_variable(
        &mut self,
        participant_idx: usize,
        option_idx: usize,
        var: Variable,
        score: usize,
    ) {
        let mut formulation = self.lock();

        Self::assign_label(&mut formulation, var, "x");

        formulation.assignment_vars.push(AssignmentVariable {
            participant_idx,
            option_idx,
            var,
            score,
        });
    }

    fn on_activation_variable(&mut self, option_idx: usize, var: Variable) {
        let mut formulation = self.lock();

        Self::assign_label(&mut formulation, var, "y");

        formulation.activation_vars.push((option_idx, var));
    }

    fn on_objective_term(&mut self, var: Variable, coefficient: f64) {
        let mut formulation = self.lock();

        *formulation.objective_terms.entry(var).or_insert(0.0) += coefficient;
    }

    fn on_single_assignment_constraint(
        &mut self,
        participant_idx: usize,
        constraint_expr: &Expression,
    ) {
        self.lock()
            .single_assignment_constraints
            .insert(participant_idx, constraint_expr.clone());
    }

    fn on_quota_constraint(
        &mut self,
        option_idx: usize,
        constraint_type: &str,
        constraint_expr: &Expression,
        relation: &str,
        rhs: f64,
    ) {
        self.lock().quota_constraints.push((
            option_idx,
            constraint_type.to_string(),
            constraint_expr.clone(),
            relation.to_string(),
            rhs,
        ));
    }
}
