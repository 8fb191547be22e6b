use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::try_join_all;

use crate::client::{DestinationApi, SourceApi};
use crate::error::{MigrateError, Result};
use crate::jira::attachment_path;
use crate::progress::{Phase, ProgressEvent};
use crate::transform::{map_issue, TransformOptions};
use crate::types::{
    IssueDetail, IssueMetadata, JiraAttachment, JiraComment, JiraIssue, MigrationIssue,
};

use super::{add, bump, Bootstrap, Pipeline};

impl<S, D> Pipeline<'_, S, D>
where
    S: SourceApi + ?Sized,
    D: DestinationApi + ?Sized,
{
    /// Fetch attachment and comment metadata for every issue, download the
    /// binaries and transform each issue. Results keep the source order.
    pub(super) async fn fetch_attachments(
        &self,
        bootstrap: &Bootstrap,
    ) -> Result<(Vec<IssueMetadata>, Vec<MigrationIssue>)> {
        let settings = &self.config.settings;
        let options = TransformOptions {
            users: &bootstrap.users,
            identity_map: &self.config.identity_map,
            match_by_username: settings.match_by_username,
            sudo: settings.sudo,
        };
        let options = &options;
        let total = bootstrap.issues.len();
        let completed = &AtomicUsize::new(0);

        let results = try_join_all(bootstrap.issues.iter().map(|issue| async move {
            let result = self.fetch_issue(issue, options).await;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            self.progress
                .event(ProgressEvent::new(Phase::Attachments, done, total, issue.key.as_str()));
            result
        }))
        .await?;

        tracing::info!(
            issues = total,
            attachments = self.counters.attachments_found.load(Ordering::Relaxed),
            comments = self.counters.comments_found.load(Ordering::Relaxed),
            "fetched attachments and comments"
        );

        Ok(results.into_iter().unzip())
    }

    async fn fetch_issue(
        &self,
        issue: &JiraIssue,
        options: &TransformOptions<'_>,
    ) -> Result<(IssueMetadata, MigrationIssue)> {
        let (mut attachments, comments) = self.issue_detail(issue).await;
        self.rename_duplicates(issue, &mut attachments);
        add(&self.counters.attachments_found, attachments.len());
        add(&self.counters.comments_found, comments.len());

        try_join_all(attachments.iter().map(|a| self.download(issue, a))).await?;

        let migrated = map_issue(issue, &attachments, &comments, options);
        let metadata = IssueMetadata {
            issue: issue.key.clone(),
            attachments,
            comments,
        };
        Ok((metadata, migrated))
    }

    /// Attachments and comments of `issue`, or nothing at all when the
    /// detail cannot be fetched. The issue itself is still migrated.
    async fn issue_detail(&self, issue: &JiraIssue) -> (Vec<JiraAttachment>, Vec<JiraComment>) {
        match self.source.fetch_issue_detail(issue).await {
            Ok(IssueDetail {
                fields: Some(fields),
            }) => (fields.attachment, fields.comment.comments),
            Ok(IssueDetail { fields: None }) => {
                tracing::warn!(key = %issue.key, "issue detail has no fields, migrating without attachments and comments");
                bump(&self.counters.issues_degraded);
                (Vec::new(), Vec::new())
            }
            Err(e) => {
                tracing::warn!(key = %issue.key, error = %e, "failed to fetch issue detail, migrating without attachments and comments");
                bump(&self.counters.issues_degraded);
                (Vec::new(), Vec::new())
            }
        }
    }

    /// Give every attachment of `issue` its own local file. The first
    /// attachment with a given name keeps it, later ones get a numeric
    /// suffix before the extension.
    fn rename_duplicates(&self, issue: &JiraIssue, attachments: &mut [JiraAttachment]) {
        let mut taken: HashSet<PathBuf> = attachments
            .iter()
            .map(|a| attachment_path(self.store.dir(), &issue.key, &a.filename))
            .collect();
        let mut seen = HashSet::new();

        for attachment in attachments.iter_mut() {
            let path = attachment_path(self.store.dir(), &issue.key, &attachment.filename);
            if seen.insert(path) {
                continue;
            }

            let renamed = (2..)
                .map(|n| numbered_filename(&attachment.filename, n))
                .find(|name| {
                    !taken.contains(&attachment_path(self.store.dir(), &issue.key, name))
                })
                .unwrap_or_default();
            tracing::warn!(key = %issue.key, file = %attachment.filename, renamed = %renamed, "duplicate attachment filename, storing under a new name");

            let path = attachment_path(self.store.dir(), &issue.key, &renamed);
            taken.insert(path.clone());
            seen.insert(path);
            attachment.filename = renamed;
        }
    }

    async fn download(&self, issue: &JiraIssue, attachment: &JiraAttachment) -> Result<()> {
        let dest = attachment_path(self.store.dir(), &issue.key, &attachment.filename);

        if self.config.settings.reuse_downloads
            && tokio::fs::try_exists(&dest).await.unwrap_or(false)
        {
            tracing::debug!(key = %issue.key, file = %dest.display(), "reusing downloaded attachment");
            bump(&self.counters.attachments_reused);
            return Ok(());
        }

        let bytes = self
            .source
            .download_attachment(attachment, &dest)
            .await
            .map_err(|e| MigrateError::Download {
                key: issue.key.clone(),
                filename: attachment.filename.clone(),
                source: Box::new(e),
            })?;

        tracing::debug!(key = %issue.key, file = %dest.display(), bytes, "downloaded attachment");
        bump(&self.counters.attachments_downloaded);
        Ok(())
    }
}

/// `image.png` becomes `image-2.png`; names without an extension get the
/// suffix appended.
fn numbered_filename(filename: &str, n: usize) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{filename}-{n}"),
    }
}
