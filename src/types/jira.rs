use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: JiraIssueFields,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct JiraIssueFields {
    #[serde(default)]
    pub summary: String,
    pub description: Option<String>,
    pub issuetype: Option<NameRef>,
    #[serde(rename = "fixVersions", default)]
    pub fix_versions: Vec<NameRef>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub resolution: Option<NameRef>,
    pub assignee: Option<JiraUser>,
    pub reporter: Option<JiraUser>,
}

/// Any JIRA object that is only interesting for its `name`
/// (issue types, fix versions, resolutions).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NameRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct JiraUser {
    pub name: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "emailAddress")]
    pub email_address: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JiraAttachment {
    pub author: Option<JiraUser>,
    pub filename: String,
    /// Download URL of the binary.
    pub content: String,
    pub created: Option<String>,
    #[serde(rename = "mimeType", default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JiraComment {
    pub author: Option<JiraUser>,
    #[serde(default)]
    pub body: String,
    pub created: Option<String>,
}

/// Response of the issue search endpoint.
#[derive(Deserialize, Debug)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
    #[serde(default)]
    pub total: usize,
}

/// Response of the issue endpoint restricted to `attachment,comment`.
///
/// `fields` is absent when the issue became inaccessible between the
/// search and the detail fetch.
#[derive(Deserialize, Debug, Default)]
pub struct IssueDetail {
    pub fields: Option<DetailFields>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DetailFields {
    #[serde(default)]
    pub attachment: Vec<JiraAttachment>,
    #[serde(default)]
    pub comment: CommentPage,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<JiraComment>,
}

/// Per-issue attachment and comment metadata, as persisted to `att-comm.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssueMetadata {
    pub issue: String,
    pub attachments: Vec<JiraAttachment>,
    pub comments: Vec<JiraComment>,
}
