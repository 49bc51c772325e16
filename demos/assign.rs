//! Assignment Example
//!
//! Solves a fixture set and prints the allocation.
//!
//! Use `-f` to load a fixture set by name
//! Use `-n` to limit the number of participants taken from the roster
//! Use `-o` to specify the filename of a typst formatted output file in `target/ilp-formulations`
//! Use `--seed` / `--shuffle` to reorder participants before solving

use std::{fs::create_dir_all, io, path::PathBuf, time::Instant};

use anyhow::Result;
use clap::Parser;
use cohort::{
    assignment::AssignmentOrchestrator,
    fixtures::Fixture,
    solvers::ilp::renderers::typst::TypstRenderer,
    utils::ExampleAssignArgs,
};
use humanize_duration::{Truncate, prelude::DurationExt};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Assignment Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = ExampleAssignArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().compact().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_err| EnvFilter::new(&args.log_level)),
        )
        .try_init()?;

    let fixture = Fixture::from_set(&args.fixture)?;
    let (participants, rankings) = fixture.problem(args.n)?;

    let config = args.apply_to(*fixture.config());
    let orchestrator = AssignmentOrchestrator::new(config);

    let start = Instant::now();

    let allocation = if let Some(out) = args.out.as_deref() {
        let output_dir = PathBuf::from("target").join("ilp-formulations");
        create_dir_all(&output_dir)?;

        let index = orchestrator.index(&participants, fixture.options(), &rankings)?;
        let mut renderer = TypstRenderer::new_with_index(output_dir.join(out), &index);

        let allocation = orchestrator.solve_index(&index, &mut renderer)?;

        renderer.write()?;

        allocation
    } else {
        orchestrator.solve(&participants, fixture.options(), &rankings)?
    };

    let elapsed = start.elapsed();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    allocation.write_to(&mut handle)?;

    println!("\nSolution: {}", elapsed.human(Truncate::Nano));

    Ok(())
}
