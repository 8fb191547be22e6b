use crate::cli::MigrateArgs;
use crate::config::Config;
use crate::error::Result;
use crate::gitlab::GitLabClient;
use crate::jira::JiraClient;
use crate::output;
use crate::pipeline::{Mode, Pipeline};
use crate::progress::ConsoleProgress;
use crate::snapshot::{self, SnapshotStore};

pub async fn run(config: &Config, args: MigrateArgs, show_progress: bool) -> Result<()> {
    let payloads = args
        .payloads
        .unwrap_or_else(|| config.settings.payloads_dir.clone());
    let mode = if args.apply { Mode::Apply } else { Mode::DryRun };

    if config.jira.insecure {
        output::print_warning("TLS certificate verification is disabled for JIRA");
    }
    if config.gitlab.insecure {
        output::print_warning("TLS certificate verification is disabled for GitLab");
    }

    let source = JiraClient::new(config)?;
    let destination = GitLabClient::new(config)?;
    let progress = ConsoleProgress::new(show_progress);
    let store = SnapshotStore::new(&payloads);

    output::print_message(&format!(
        "Migrating JIRA project {} to GitLab project {}",
        config.jira.project, config.gitlab.project
    ));

    let pipeline = Pipeline::new(&source, &destination, config, store, &progress);
    let report = match pipeline.run(mode).await {
        Ok(report) => report,
        Err(e) => {
            output::print_report(&pipeline.report());
            return Err(e);
        }
    };

    output::print_report(&report);
    match mode {
        Mode::DryRun => output::print_message(&format!(
            "Dry run: nothing was posted. Review {} and run again with --apply.",
            payloads.join(snapshot::INTERIM_ISSUES).display()
        )),
        Mode::Apply => output::print_success(&format!(
            "Posted {} issues and {} notes, results in {}",
            report.issues_posted,
            report.notes_posted,
            payloads.join(snapshot::POSTED_ISSUES).display()
        )),
    }

    Ok(())
}
