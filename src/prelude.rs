//! Cohort prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    allocation::{Allocation, Metrics, OptionAssignment, ParticipantOutcome},
    assignment::{AssignmentError, AssignmentOrchestrator, solve},
    config::{AssignmentConfig, ConfigError},
    ids::{OptionId, ParticipantId},
    preferences::{PreferenceError, PreferenceIndex, Ranking},
    quota::{QuotaConfig, QuotaError},
    report::ReportError,
    solvers::{
        LimitsError, MilpBackend, SolveLimits, SolveStatus, SolverError,
        ilp::{
            GoodLpBackend, ILPObserver, ILPSolver, NoopObserver,
            renderers::typst::{TypstRenderError, TypstRenderer},
        },
    },
};
