use crate::client::{DestinationApi, SourceApi};
use crate::config::UploadFailurePolicy;
use crate::error::{MigrateError, Result};
use crate::jira::attachment_path;
use crate::progress::{Phase, ProgressEvent};
use crate::snapshot;
use crate::transform::{attachment_table_header, attribution, render_attachment_row, upload_url};
use crate::types::{
    MigrationAttachment, MigrationComment, MigrationIssue, Note, NoteDraft, PostedIssue,
    PostedNote, UserRef,
};

use super::{bump, Pipeline, RunContext};

/// What has reached GitLab so far.
#[derive(Debug, Default)]
struct Posted {
    issues: Vec<PostedIssue>,
    notes: Vec<PostedNote>,
}

impl<S, D> Pipeline<'_, S, D>
where
    S: SourceApi + ?Sized,
    D: DestinationApi + ?Sized,
{
    /// Post every issue in order, then snapshot what was posted.
    ///
    /// On failure, including a failed final snapshot, the issues posted so
    /// far are written to the error snapshot and the error is returned.
    pub(super) async fn post_issues(
        &self,
        context: &RunContext,
        issues: &[MigrationIssue],
    ) -> Result<()> {
        let mut posted = Posted::default();

        for (index, issue) in issues.iter().enumerate() {
            self.progress.event(ProgressEvent::new(
                Phase::Posting,
                index + 1,
                issues.len(),
                issue.source_key.as_str(),
            ));

            if issue.done && self.config.settings.ignore_done {
                tracing::info!(key = %issue.source_key, "skipping closed issue");
                bump(&self.counters.issues_skipped);
                continue;
            }

            self.set_current_issue(&issue.source_key);
            if let Err(e) = self.post_issue(context, issue, &mut posted).await {
                self.write_error_snapshot(&posted.issues).await;
                return Err(e);
            }
        }

        if let Err(e) = tokio::try_join!(
            self.store.write(snapshot::POSTED_ISSUES, &posted.issues),
            self.store.write(snapshot::POSTED_NOTES, &posted.notes),
        ) {
            self.write_error_snapshot(&posted.issues).await;
            return Err(e);
        }

        tracing::info!(
            issues = posted.issues.len(),
            notes = posted.notes.len(),
            "posted issues to GitLab"
        );
        Ok(())
    }

    async fn write_error_snapshot(&self, issues: &[PostedIssue]) {
        match self.store.write(snapshot::POSTED_ISSUES_ERROR, issues).await {
            Ok(path) => {
                tracing::warn!(path = %path.display(), posted = issues.len(), "wrote partial results");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to write partial results");
            }
        }
    }

    async fn post_issue(
        &self,
        context: &RunContext,
        issue: &MigrationIssue,
        posted: &mut Posted,
    ) -> Result<()> {
        let (attachments, rows) = self.upload_attachments(context, issue).await?;

        let mut description = issue.description.clone();
        if !rows.is_empty() {
            description.push_str(attachment_table_header());
            description.push_str(&rows);
        }

        let draft = issue.to_draft(description);
        let created = self
            .destination
            .create_issue(context.project_id, &draft, self.sudo_for(&issue.author))
            .await
            .map_err(|e| MigrateError::Creation {
                key: issue.source_key.clone(),
                source: Box::new(e),
            })?;

        tracing::debug!(key = %issue.source_key, iid = created.iid, "created issue");
        bump(&self.counters.issues_posted);
        posted.issues.push(PostedIssue {
            jira_key: issue.source_key.clone(),
            iid: created.iid,
            web_url: created.web_url,
            issue: draft,
            attachments,
        });

        for (index, comment) in issue.comments.iter().enumerate() {
            match self.post_comment(&created.links.notes, comment).await {
                Ok(note) => {
                    bump(&self.counters.notes_posted);
                    posted.notes.push(PostedNote {
                        jira_key: issue.source_key.clone(),
                        note_id: note.id,
                        body: note.body,
                    });
                }
                Err(e) => {
                    tracing::warn!(key = %issue.source_key, comment = index + 1, error = %e, "failed to post comment");
                    bump(&self.counters.comments_failed);
                }
            }
        }

        Ok(())
    }

    /// Upload the attachments of `issue` in order. Returns them with their
    /// GitLab URLs, along with the rendered attachment table rows.
    async fn upload_attachments(
        &self,
        context: &RunContext,
        issue: &MigrationIssue,
    ) -> Result<(Vec<MigrationAttachment>, String)> {
        let mut uploaded = Vec::with_capacity(issue.attachments.len());
        let mut rows = String::new();

        for attachment in &issue.attachments {
            let path = attachment_path(self.store.dir(), &issue.source_key, &attachment.filename);
            let upload = match self
                .destination
                .upload_file(context.project_id, &path, &attachment.mime_type)
                .await
            {
                Ok(upload) => upload,
                Err(e) => match self.config.settings.on_upload_error {
                    UploadFailurePolicy::Abort => {
                        return Err(MigrateError::Upload {
                            filename: attachment.filename.clone(),
                            source: Box::new(e),
                        });
                    }
                    UploadFailurePolicy::Skip => {
                        tracing::warn!(key = %issue.source_key, file = %attachment.filename, error = %e, "skipping attachment that failed to upload");
                        bump(&self.counters.uploads_skipped);
                        continue;
                    }
                },
            };

            let url = upload_url(&self.config.gitlab.url, &context.project_path, &upload);
            if upload.markdown.is_some() {
                rows.push_str(&render_attachment_row(&upload, &attachment.author, &url));
            }

            bump(&self.counters.attachments_uploaded);
            uploaded.push(MigrationAttachment {
                content: url,
                ..attachment.clone()
            });
        }

        Ok((uploaded, rows))
    }

    async fn post_comment(
        &self,
        notes_url: &str,
        comment: &MigrationComment,
    ) -> Result<Note> {
        let body = if self.config.settings.sudo {
            comment.body.clone()
        } else {
            format!("{}{}", attribution(&comment.author), comment.body)
        };

        let note = NoteDraft {
            body,
            created_at: comment.created_at.clone(),
        };
        self.destination
            .create_note(notes_url, &note, self.sudo_for(&comment.author))
            .await
    }

    /// Username to impersonate for content authored by `user`.
    fn sudo_for<'u>(&self, user: &'u UserRef) -> Option<&'u str> {
        if self.config.settings.sudo {
            user.sudo_username()
        } else {
            None
        }
    }
}
