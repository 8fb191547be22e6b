//! The migration run: fetch everything from JIRA, transform it, snapshot it
//! and (in apply mode) post it to GitLab.

mod attachments;
mod bootstrap;
mod post;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::client::{DestinationApi, SourceApi};
use crate::config::Config;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::snapshot::{self, SnapshotStore};
use crate::types::{IssueMetadata, MigrationIssue};

use bootstrap::{Bootstrap, RunContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Stop after the transformed issues are snapshotted.
    DryRun,
    /// Also post everything to GitLab.
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Idle,
    BootstrapFetch,
    AttachmentFetch,
    Snapshot,
    PostPhase,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::BootstrapFetch => "bootstrap fetch",
            Stage::AttachmentFetch => "attachment fetch",
            Stage::Snapshot => "snapshot",
            Stage::PostPhase => "post phase",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
struct RunCounters {
    issues_found: AtomicUsize,
    issues_degraded: AtomicUsize,
    attachments_found: AtomicUsize,
    attachments_downloaded: AtomicUsize,
    attachments_reused: AtomicUsize,
    comments_found: AtomicUsize,
    issues_skipped: AtomicUsize,
    issues_posted: AtomicUsize,
    attachments_uploaded: AtomicUsize,
    uploads_skipped: AtomicUsize,
    notes_posted: AtomicUsize,
    comments_failed: AtomicUsize,
    current_issue: Mutex<Option<String>>,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn add(counter: &AtomicUsize, amount: usize) {
    counter.fetch_add(amount, Ordering::Relaxed);
}

/// Counts of one run, available whether it succeeded or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stage: Stage,
    pub issues_found: usize,
    pub issues_degraded: usize,
    pub attachments_found: usize,
    pub attachments_downloaded: usize,
    pub attachments_reused: usize,
    pub comments_found: usize,
    pub issues_skipped: usize,
    pub issues_posted: usize,
    pub attachments_uploaded: usize,
    pub uploads_skipped: usize,
    pub notes_posted: usize,
    pub comments_failed: usize,
    /// Last issue the run started working on.
    pub current_issue: Option<String>,
}

pub struct Pipeline<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    destination: &'a D,
    config: &'a Config,
    store: SnapshotStore,
    progress: &'a dyn ProgressSink,
    counters: RunCounters,
    stage: Mutex<Stage>,
}

impl<'a, S, D> Pipeline<'a, S, D>
where
    S: SourceApi + ?Sized,
    D: DestinationApi + ?Sized,
{
    pub fn new(
        source: &'a S,
        destination: &'a D,
        config: &'a Config,
        store: SnapshotStore,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            source,
            destination,
            config,
            store,
            progress,
            counters: RunCounters::default(),
            stage: Mutex::new(Stage::Idle),
        }
    }

    pub async fn run(&self, mode: Mode) -> Result<RunReport> {
        let result = self.execute(mode).await;
        self.progress.finish();

        match result {
            Ok(()) => {
                self.enter(Stage::Done);
                Ok(self.report())
            }
            Err(e) => {
                tracing::error!(stage = %self.stage(), error = %e, "migration failed");
                self.enter(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&self, mode: Mode) -> Result<()> {
        self.enter(Stage::BootstrapFetch);
        let (bootstrap, context) = self.bootstrap().await?;
        self.store.ensure_dir().await?;

        self.enter(Stage::AttachmentFetch);
        let (metadata, issues) = self.fetch_attachments(&bootstrap).await?;

        self.enter(Stage::Snapshot);
        self.write_fetch_snapshots(&bootstrap, &metadata, &issues)
            .await?;

        if mode == Mode::DryRun {
            tracing::info!(
                payloads = %self.store.dir().display(),
                "dry run finished, nothing was posted"
            );
            return Ok(());
        }

        self.enter(Stage::PostPhase);
        self.post_issues(&context, &issues).await
    }

    /// Everything fetched and transformed so far, written side by side.
    async fn write_fetch_snapshots(
        &self,
        bootstrap: &Bootstrap,
        metadata: &[IssueMetadata],
        issues: &[MigrationIssue],
    ) -> Result<()> {
        tokio::try_join!(
            self.store.write(snapshot::PROJECTS, &bootstrap.projects),
            self.store.write(snapshot::USERS, &bootstrap.users),
            self.store.write(snapshot::SOURCE_ISSUES, &bootstrap.issues),
            self.store.write(snapshot::INTERIM_ISSUES, issues),
            self.store.write(snapshot::ISSUE_METADATA, metadata),
        )?;

        tracing::info!(payloads = %self.store.dir().display(), "wrote fetch snapshots");
        Ok(())
    }

    pub fn stage(&self) -> Stage {
        self.stage.lock().map(|s| *s).unwrap_or(Stage::Failed)
    }

    fn enter(&self, stage: Stage) {
        if let Ok(mut current) = self.stage.lock() {
            let from = *current;
            tracing::debug!(%from, to = %stage, "stage transition");
            *current = stage;
        }
    }

    fn set_current_issue(&self, key: &str) {
        if let Ok(mut current) = self.counters.current_issue.lock() {
            *current = Some(key.to_string());
        }
    }

    pub fn report(&self) -> RunReport {
        let c = &self.counters;
        let load = |counter: &AtomicUsize| counter.load(Ordering::Relaxed);

        RunReport {
            stage: self.stage(),
            issues_found: load(&c.issues_found),
            issues_degraded: load(&c.issues_degraded),
            attachments_found: load(&c.attachments_found),
            attachments_downloaded: load(&c.attachments_downloaded),
            attachments_reused: load(&c.attachments_reused),
            comments_found: load(&c.comments_found),
            issues_skipped: load(&c.issues_skipped),
            issues_posted: load(&c.issues_posted),
            attachments_uploaded: load(&c.attachments_uploaded),
            uploads_skipped: load(&c.uploads_skipped),
            notes_posted: load(&c.notes_posted),
            comments_failed: load(&c.comments_failed),
            current_issue: c.current_issue.lock().ok().and_then(|k| k.clone()),
        }
    }
}
