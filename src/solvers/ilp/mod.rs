//! ILP Solver

use tracing::info;

use crate::{
    allocation::Allocation,
    preferences::PreferenceIndex,
    quota::QuotaConfig,
    solvers::{MilpBackend, SolveLimits, SolverError},
};

pub mod backend;
pub mod builder;
pub mod extract;
pub mod model;
pub mod observer;
pub mod renderers;

pub use backend::{FEASIBILITY_TOLERANCE, GoodLpBackend};
pub use builder::{ModelBuilder, usize_to_f64_exact};
pub use extract::{BINARY_THRESHOLD, ResultExtractor};
pub use model::{BinaryProgram, DecisionModel, ModelLayout};
pub use observer::{ILPObserver, NoopObserver};

/// Solver using Integer Linear Programming (ILP)
#[derive(Debug)]
pub struct ILPSolver;

impl ILPSolver {
    /// Solve an assignment problem with the default backend.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the model cannot be built or an optimal
    /// solution fails the post-solve audit.
    pub fn solve(
        index: &PreferenceIndex,
        quota: &QuotaConfig,
        limits: &SolveLimits,
    ) -> Result<Allocation, SolverError> {
        Self::solve_with(index, quota, limits, &GoodLpBackend, &mut NoopObserver)
    }

    /// Solve with an observer for capturing the ILP formulation.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the model cannot be built or an optimal
    /// solution fails the post-solve audit.
    pub fn solve_with_observer(
        index: &PreferenceIndex,
        quota: &QuotaConfig,
        limits: &SolveLimits,
        observer: &mut dyn ILPObserver,
    ) -> Result<Allocation, SolverError> {
        Self::solve_with(index, quota, limits, &GoodLpBackend, observer)
    }

    /// Build, solve and extract using the given backend and observer.
    ///
    /// Backend failures do not raise an error; they come back as an allocation
    /// whose status is not optimal.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the model cannot be built or an optimal
    /// solution fails the post-solve audit.
    #[tracing::instrument(
        name = "solvers.ilp.solve",
        skip_all,
        fields(
            participants = index.len(),
            options = index.options().len(),
            time_limit_secs = limits.time_limit_secs()
        ),
        err
    )]
    pub fn solve_with<B, O>(
        index: &PreferenceIndex,
        quota: &QuotaConfig,
        limits: &SolveLimits,
        backend: &B,
        observer: &mut O,
    ) -> Result<Allocation, SolverError>
    where
        B: MilpBackend + ?Sized,
        O: ILPObserver + ?Sized,
    {
        let (program, layout) = ModelBuilder::new(index, quota)
            .build_with_observer(observer)?
            .into_parts();

        let outcome = backend.solve(program, limits);

        let allocation = ResultExtractor::new(index, quota).extract(&layout, outcome)?;

        info!(
            status = %allocation.status(),
            total_score = allocation.metrics().total_score,
            active_options = allocation.metrics().active_options,
            "assignment solve finished"
        );

        Ok(allocation)
    }
}
