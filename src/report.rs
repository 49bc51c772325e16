//! Assignment Report

use std::io;

use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    allocation::Allocation,
    ids::{OptionId, ParticipantId},
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error
    #[error("IO error")]
    IO,
}

impl Allocation {
    /// Write a status and metrics summary followed by the option table.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::IO`] if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        write_summary(&mut out, self)?;

        if !self.assignments().is_empty() {
            write_option_table(&mut out, self)?;
            write_rank_table(&mut out, self)?;
        }

        Ok(())
    }
}

fn write_summary(out: &mut impl io::Write, allocation: &Allocation) -> Result<(), ReportError> {
    let metrics = allocation.metrics();

    writeln!(out, "\n Status: \x1b[1m{}\x1b[0m", allocation.status()).map_err(|_err| ReportError::IO)?;

    if let Some(diagnostic) = allocation.diagnostic() {
        writeln!(out, " Diagnostic: {diagnostic}").map_err(|_err| ReportError::IO)?;
    }

    if !allocation.is_optimal() {
        return Ok(());
    }

    writeln!(out, " Total score: {}", metrics.total_score).map_err(|_err| ReportError::IO)?;
    writeln!(out, " Active options: {}", metrics.active_options)
        .map_err(|_err| ReportError::IO)?;
    writeln!(out, " Objective value: {:.2}", metrics.objective_value)
        .map_err(|_err| ReportError::IO)?;
    writeln!(out, " Average score: {:.2}", metrics.average_score)
        .map_err(|_err| ReportError::IO)?;

    if !metrics.unused_options.is_empty() {
        let unused: Vec<&str> = metrics.unused_options.iter().map(OptionId::as_str).collect();

        writeln!(out, " Unused options: {}", unused.join(", ")).map_err(|_err| ReportError::IO)?;
    }

    Ok(())
}

fn write_option_table(out: &mut impl io::Write, allocation: &Allocation) -> Result<(), ReportError> {
    let mut builder = Builder::default();

    builder.push_record(["Option", "Participants", "Count"]);

    for assignment in allocation.assignments() {
        let names: Vec<&str> = assignment
            .participants
            .iter()
            .map(ParticipantId::as_str)
            .collect();

        builder.push_record([
            assignment.option.to_string(),
            names.join("\n"),
            assignment.participants.len().to_string(),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..3), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReportError::IO)
}

fn write_rank_table(out: &mut impl io::Write, allocation: &Allocation) -> Result<(), ReportError> {
    let mut builder = Builder::default();

    builder.push_record(["Choice", "Participants"]);

    for (rank, count) in &allocation.metrics().rank_distribution {
        builder.push_record([format!("#{rank}"), count.to_string()]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..2), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReportError::IO)
}
