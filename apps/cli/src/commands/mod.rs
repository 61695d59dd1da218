//! Command implementations for the `boxcar` binary.

pub mod convert;
pub mod fetch;
pub mod image;
pub mod inspect;
pub mod run;
pub mod types;
pub mod upload;

use boxcar_container::ExecOutcome;
use colored::Colorize;

/// Print a finished tool invocation.
pub(crate) fn print_outcome(label: &str, outcome: &ExecOutcome) {
    let elapsed = outcome.finished_at - outcome.started_at;
    println!(
        "{} {} {}",
        "✓".green(),
        label.bold(),
        format!("({:.1}s)", elapsed.num_milliseconds() as f64 / 1000.0).dimmed()
    );
    println!("  {}", outcome.command_line().dimmed());
}
