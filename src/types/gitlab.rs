use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: String,
    /// Only visible to administrators; absent for regular tokens.
    pub email: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GitLabProject {
    pub id: u64,
    pub path_with_namespace: String,
    #[serde(default)]
    pub name: String,
}

/// Result of a project upload.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    #[serde(default)]
    pub alt: String,
    /// Project-relative URL, e.g. `/uploads/<secret>/file.png`.
    pub url: String,
    /// Suggested markdown, `![alt](url)` for images and `[alt](url)` otherwise.
    pub markdown: Option<String>,
}

impl Upload {
    /// The uploaded file name, taken from the last URL segment.
    pub fn file_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub id: u64,
    pub iid: u64,
    pub web_url: Option<String>,
    #[serde(rename = "_links")]
    pub links: IssueLinks,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IssueLinks {
    pub notes: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: u64,
    #[serde(default)]
    pub body: String,
}

/// Payload of an issue creation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub labels: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub assignee_ids: Vec<u64>,
}

/// Payload of a note creation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}
