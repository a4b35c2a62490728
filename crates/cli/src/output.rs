//! Terminal output: cargo-style status lines, a spinner and run summaries.

use std::fmt::Display;
use std::time::Duration;

use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use rivet_core::TypeName;
use rivet_engine::UnitError;

/// Width of the right-aligned status verb.
const VERB_WIDTH: usize = 12;

fn verb(style: Style, verb: &str) -> String {
    style
        .bold()
        .apply_to(format!("{:>width$}", verb, width = VERB_WIDTH))
        .to_string()
}

/// Prints a right-aligned green verb followed by a message.
pub fn status(action: &str, message: impl Display) {
    println!("{} {}", verb(Style::new().green(), action), message);
}

/// Prints a right-aligned cyan verb, for lines that only inform.
pub fn note(action: &str, message: impl Display) {
    println!("{} {}", verb(Style::new().cyan(), action), message);
}

pub fn warning(message: impl Display) {
    eprintln!("{} {}", style("warning:").yellow().bold(), message);
}

pub fn error(message: impl Display) {
    eprintln!("{} {}", style("error:").red().bold(), message);
}

/// Prints a failed unit and the errors recorded for it.
pub fn unit_failed(name: &TypeName, errors: &[UnitError]) {
    eprintln!("{} {}", verb(Style::new().red(), "Failed"), name);
    for error in errors {
        eprintln!("{:width$} {}", "", style(error).dim(), width = VERB_WIDTH);
    }
}

/// Prints the unit counts of a run.
pub fn summary(transformed: usize, unchanged: usize, failed: usize) {
    let counts = format!("{transformed} transformed, {unchanged} unchanged, {failed} failed");
    if failed > 0 {
        eprintln!("{} {}", verb(Style::new().red(), "Aborted"), counts);
    } else {
        status("Finished", counts);
    }
}

/// Starts a spinner on stderr; finish it with [`ProgressBar::finish_and_clear`].
pub fn spinner(message: impl Display) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Prints a bold heading for a group of lines.
pub fn heading(title: &str) {
    println!("\n{}", style(format!("{title}:")).bold());
}

/// Prints an indented line under a heading.
pub fn item(text: impl Display) {
    println!("    {text}");
}

/// Prints an indented `key = value` line under a heading.
pub fn field(key: &str, value: impl Display) {
    println!("    {} = {}", style(key).dim(), value);
}
