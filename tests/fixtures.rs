//! Integration tests for the bundled fixture sets.

use testresult::TestResult;

use cohort::{
    assignment::AssignmentOrchestrator, fixtures::Fixture, ids::OptionId,
    preferences::PreferenceIndex, solvers::SolveStatus,
};

#[test]
fn workshop_fixture_solves_within_quota() -> TestResult {
    let fixture = Fixture::from_set("workshop")?;
    let (participants, rankings) = fixture.problem(None)?;
    let config = *fixture.config();

    assert_eq!(participants.len(), 12);
    assert_eq!(config.seed, Some(7));

    let allocation =
        AssignmentOrchestrator::new(config).solve(&participants, fixture.options(), &rankings)?;

    assert_eq!(allocation.status(), SolveStatus::Optimal);

    let assigned: usize = allocation
        .assignments()
        .iter()
        .map(|a| a.participants.len())
        .sum();

    assert_eq!(assigned, participants.len());

    for assignment in allocation.assignments() {
        assert!(
            config.quota.admits(assignment.participants.len()),
            "{} holds {} participants",
            assignment.option,
            assignment.participants.len()
        );
    }

    // Nobody ranks bookbinding, so it can never run.
    assert_eq!(allocation.participants_for("Bookbinding"), None);

    let mut report = Vec::new();
    allocation.write_to(&mut report)?;

    assert!(String::from_utf8(report)?.contains("Optimal"));

    Ok(())
}

#[test]
fn workshop_fixture_is_reproducible() -> TestResult {
    let fixture = Fixture::from_set("workshop")?;
    let (participants, rankings) = fixture.problem(Some(8))?;
    let orchestrator = AssignmentOrchestrator::new(*fixture.config());

    let first = orchestrator.solve(&participants, fixture.options(), &rankings)?;
    let second = orchestrator.solve(&participants, fixture.options(), &rankings)?;

    assert_eq!(first, second);

    Ok(())
}

#[test]
fn workshop_blank_cells_are_skipped() -> TestResult {
    let fixture = Fixture::from_set("workshop")?;
    let (participants, rankings) = fixture.problem(None)?;

    let index = PreferenceIndex::from_rankings(&participants, fixture.options(), &rankings)?;

    // Dana: Printmaking, Pottery, (blank), Weaving
    assert_eq!(index.score_of("Dana", "Printmaking"), Some(3));
    assert_eq!(index.score_of("Dana", "Weaving"), Some(1));
    assert_eq!(index.options().len(), 5);

    Ok(())
}

#[test]
fn trio_fixture_matches_known_optimum() -> TestResult {
    let fixture = Fixture::from_set("trio")?;
    let (participants, rankings) = fixture.problem(None)?;

    let allocation = AssignmentOrchestrator::new(*fixture.config()).solve(
        &participants,
        fixture.options(),
        &rankings,
    )?;

    assert_eq!(allocation.metrics().total_score, 6);
    assert_eq!(allocation.metrics().active_options, 2);
    assert_eq!(allocation.option_of("Bob").map(OptionId::as_str), Some("B"));

    Ok(())
}
