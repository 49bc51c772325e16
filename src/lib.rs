//! Cohort
//!
//! Cohort assigns participants to options from their ranked preferences. Each
//! participant lands in exactly one option they ranked, every option runs with
//! either nobody or between a minimum and maximum number of participants, and
//! the total preference score (plus an optional reward per running option) is
//! maximised by solving a binary integer program.

pub mod allocation;
pub mod assignment;
pub mod config;
pub mod fixtures;
pub mod ids;
pub mod preferences;
pub mod prelude;
pub mod quota;
pub mod report;
pub mod solvers;
pub mod utils;
