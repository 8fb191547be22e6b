use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use const_format::concatcp;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{MigrateError, Result};
use crate::types::{
    CreatedIssue, GitLabProject, GitLabUser, IssueDetail, IssueDraft, JiraAttachment, JiraIssue,
    Note, NoteDraft, Upload,
};

const USER_AGENT: &str = concatcp!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Read side of the migration: the JIRA instance.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Every issue of the configured project, ascending by id.
    async fn list_issues(&self) -> Result<Vec<JiraIssue>>;

    /// Attachment and comment metadata of one issue.
    async fn fetch_issue_detail(&self, issue: &JiraIssue) -> Result<IssueDetail>;

    /// Download an attachment binary to `dest`, returning the number of bytes written.
    async fn download_attachment(&self, attachment: &JiraAttachment, dest: &Path) -> Result<u64>;
}

/// Write side of the migration: the GitLab instance.
///
/// `sudo` carries the username to impersonate, if any.
#[async_trait]
pub trait DestinationApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<GitLabUser>>;

    async fn search_projects(&self) -> Result<Vec<GitLabProject>>;

    async fn upload_file(&self, project_id: u64, path: &Path, mime_type: &str) -> Result<Upload>;

    async fn create_issue(
        &self,
        project_id: u64,
        issue: &IssueDraft,
        sudo: Option<&str>,
    ) -> Result<CreatedIssue>;

    async fn create_note(
        &self,
        notes_url: &str,
        note: &NoteDraft,
        sudo: Option<&str>,
    ) -> Result<Note>;
}

pub fn build_http(insecure: bool, timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(insecure)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Turn a response into `T`, classifying failures.
///
/// Non-2xx statuses become [`MigrateError::Remote`]; a 2xx body carrying an
/// `error` field becomes [`MigrateError::Rejected`].
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_success(response).await?;
    let body: Value = response.json().await?;

    if let Some(message) = rejection_message(&body) {
        return Err(MigrateError::Rejected { message });
    }

    Ok(serde_json::from_value(body)?)
}

pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(MigrateError::Remote {
        status: status.as_u16(),
        message: response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string()),
    })
}

/// Error text of a 2xx body that describes a failure: an `error` field, or
/// a `message` field on an object that carries no resource `id`.
fn rejection_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    let field = match object.get("error") {
        Some(error) if !error.is_null() => error,
        _ if object.contains_key("id") => return None,
        _ => object.get("message")?,
    };

    match field {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}
