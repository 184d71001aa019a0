//! Terminal styling helpers.
//!
//! Status lines go to stderr; analysis output goes to stdout so it can be
//! piped into other tools.

use std::collections::BTreeMap;

use console::style;
use depscout::reconcile::SuspectEntry;
use depscout::version::VersionDiff;

/// Decide once whether styled output is used.
///
/// `--no-color` and `NO_COLOR` disable colors, `FORCE_COLOR` enables them
/// even when stderr is not a terminal.
pub fn init_colors(no_color: bool) {
    let enabled = should_use_colors(no_color);
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

pub fn should_use_colors(no_color: bool) -> bool {
    if no_color || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

pub fn success(message: &str) {
    eprintln!("{} {}", style("✔").green().bold(), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}

/// Render kept dependencies as a `"dependencies"` block ready to paste into
/// package.json.
pub fn format_dependencies(versions: &BTreeMap<String, String>) -> String {
    if versions.is_empty() {
        return "\"dependencies\": {}".to_string();
    }

    let width = versions.keys().map(|name| name.len() + 2).max().unwrap_or(0);
    let lines: Vec<String> = versions
        .iter()
        .map(|(name, range)| {
            let key = format!("\"{name}\":");
            format!("  {key:<w$} \"{range}\"", w = width + 1)
        })
        .collect();

    format!("\"dependencies\": {{\n{}\n}}", lines.join(",\n"))
}

/// One line per package removed by reduction.
pub fn format_suspects(suspects: &BTreeMap<String, SuspectEntry>) -> Vec<String> {
    suspects
        .iter()
        .map(|(name, entry)| {
            format!(
                "{} {} ({}, required by {})",
                style("?").yellow(),
                style(name).bold(),
                entry.version,
                style(&entry.subsumed_by).cyan()
            )
        })
        .collect()
}

/// One line per added or updated package, relative to `declared`.
pub fn format_diff(diff: &VersionDiff, declared: &BTreeMap<String, String>) -> Vec<String> {
    let mut lines = Vec::with_capacity(diff.added.len() + diff.updated.len());
    for (name, range) in &diff.added {
        lines.push(format!("{} {name} {range}", style("+").green().bold()));
    }
    for (name, range) in &diff.updated {
        let previous = declared.get(name).map(String::as_str).unwrap_or("?");
        lines.push(format!(
            "{} {name} {} -> {range}",
            style("~").yellow().bold(),
            style(previous).dim()
        ));
    }
    lines
}
