//! `depscout analyze`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use console::style;
use depscout::events::{self, AnalysisEvent, EventReceiver};
use depscout::reconcile::SuspectEntry;
use depscout::version::VersionDiff;
use depscout::{AnalysisReport, Analyzer, TargetKind};
use serde::Serialize;
use tracing::debug;

use crate::cli::AnalyzeArgs;
use crate::config::DepscoutConfig;
use crate::error::Result;
use crate::ui;

/// JSON shape printed by `--json`.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    target: &'a PathBuf,
    kind: TargetKind,
    dependencies: BTreeMap<String, String>,
    suspect: &'a BTreeMap<String, SuspectEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_root: Option<&'a PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<VersionDiff>,
}

pub async fn execute(args: AnalyzeArgs) -> Result<()> {
    let config = DepscoutConfig::load(&args)?;
    debug!(?config, "loaded configuration");

    let (sender, receiver) = events::channel();
    let progress = tokio::spawn(log_events(receiver));

    let result = Analyzer::new()
        .options(config.to_options())
        .events(sender)
        .target(&args.target)
        .analyze()
        .await;
    // The sender is gone once the analyzer is dropped, which ends the task
    let _ = progress.await;
    let report = result?;

    if args.json {
        print_json(&report, args.diff)
    } else {
        print_human(&report, args.diff);
        Ok(())
    }
}

async fn log_events(mut receiver: EventReceiver) {
    while let Some(event) = receiver.recv().await {
        match event {
            AnalysisEvent::Dependencies(found) => {
                debug!(count = found.len(), "dependencies discovered");
            }
            AnalysisEvent::Search(kept) => {
                debug!(count = kept.len(), "installed versions assigned");
            }
            AnalysisEvent::Reduce { kept, suspect } => {
                debug!(kept = kept.len(), suspect = suspect.len(), "reduced");
            }
        }
    }
}

fn print_json(report: &AnalysisReport, with_diff: bool) -> Result<()> {
    let document = JsonReport {
        target: &report.target,
        kind: report.kind,
        dependencies: report.versions(),
        suspect: &report.manifest.suspect,
        installed_root: report.installed_root.as_ref(),
        diff: with_diff.then(|| report.diff_declared()),
    };
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn print_human(report: &AnalysisReport, with_diff: bool) {
    let versions = report.versions();
    ui::success(&format!(
        "Analyzed {} {} ({} dependencies)",
        report.kind,
        style(report.target.display()).bold(),
        style(versions.len()).cyan()
    ));

    println!("{}", ui::format_dependencies(&versions));

    if report.has_suspects() {
        ui::info("Already required by a sibling dependency:");
        for line in ui::format_suspects(&report.manifest.suspect) {
            eprintln!("  {line}");
        }
    }

    if report.installed_root.is_none() {
        ui::warning("node_modules was not consulted; unknown versions are \"*\"");
    }

    if with_diff {
        let diff = report.diff_declared();
        if diff.is_empty() {
            ui::info("Declared dependencies are up to date");
        } else {
            ui::info("Changes against declared dependencies:");
            for line in ui::format_diff(&diff, &report.declared) {
                println!("{line}");
            }
        }
    }
}
