use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use crate::pipeline::{RunReport, Stage};

/// Global quiet setting
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a message unless quiet
pub fn print_message(message: &str) {
    if !is_quiet() {
        println!("{message}");
    }
}

pub fn print_success(message: &str) {
    if !is_quiet() {
        println!("{} {message}", "✓".green().bold());
    }
}

/// Warnings go to stderr and are shown even when quiet
pub fn print_warning(message: &str) {
    eprintln!("{} {message}", "warning:".yellow().bold());
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Step")]
    step: &'static str,
    #[tabled(rename = "Count")]
    count: String,
}

fn row(step: &'static str, count: usize) -> ReportRow {
    ReportRow {
        step,
        count: count.to_string(),
    }
}

fn report_rows(report: &RunReport) -> Vec<ReportRow> {
    let mut rows = vec![
        row("Issues found", report.issues_found),
        row("Attachments found", report.attachments_found),
        row("Attachments downloaded", report.attachments_downloaded),
        row("Comments found", report.comments_found),
    ];

    let optional = [
        ("Issues without detail", report.issues_degraded),
        ("Attachments reused", report.attachments_reused),
        ("Issues skipped (done)", report.issues_skipped),
        ("Issues posted", report.issues_posted),
        ("Attachments uploaded", report.attachments_uploaded),
        ("Uploads skipped", report.uploads_skipped),
        ("Notes posted", report.notes_posted),
        ("Comments failed", report.comments_failed),
    ];
    rows.extend(
        optional
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(step, count)| row(step, count)),
    );

    rows
}

fn stage_colored(stage: Stage) -> String {
    match stage {
        Stage::Done => stage.to_string().green().bold().to_string(),
        Stage::Failed => stage.to_string().red().bold().to_string(),
        _ => stage.to_string().yellow().to_string(),
    }
}

/// Print the counts of a run as a table
pub fn print_report(report: &RunReport) {
    if is_quiet() {
        return;
    }

    let table = Table::new(report_rows(report))
        .with(Style::rounded())
        .to_string();
    println!("{table}");

    match (&report.current_issue, report.stage) {
        (Some(key), Stage::Failed) => {
            println!("Run {} while working on {}", stage_colored(report.stage), key.bold());
        }
        _ => println!("Run {}", stage_colored(report.stage)),
    }
}
