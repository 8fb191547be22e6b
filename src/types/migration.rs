use serde::{Deserialize, Serialize};

use super::{GitLabUser, IssueDraft};

/// A destination user reference.
///
/// `id: None` is the "unknown user" value used whenever a JIRA user could
/// not be matched; it serializes as `{"id": null}`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRef {
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
}

impl UserRef {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.id.is_some()
    }

    /// Username usable for impersonation, if the user is known.
    pub fn sudo_username(&self) -> Option<&str> {
        if !self.is_known() {
            return None;
        }
        self.username.as_deref().filter(|u| !u.is_empty())
    }
}

impl From<&GitLabUser> for UserRef {
    fn from(user: &GitLabUser) -> Self {
        Self {
            id: Some(user.id),
            username: Some(user.username.clone()),
            name: Some(user.name.clone()),
            email: user.email.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MigrationComment {
    pub author: UserRef,
    pub body: String,
    pub created_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MigrationAttachment {
    pub author: UserRef,
    pub filename: String,
    /// JIRA download URL before posting, GitLab URL after upload.
    pub content: String,
    pub created_at: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// A JIRA issue transformed into GitLab's shape, not yet posted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MigrationIssue {
    pub title: String,
    pub description: String,
    pub labels: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub done: bool,
    pub assignee: UserRef,
    pub author: UserRef,
    pub comments: Vec<MigrationComment>,
    pub attachments: Vec<MigrationAttachment>,
    #[serde(rename = "jira_key")]
    pub source_key: String,
}

impl MigrationIssue {
    /// Creation payload for GitLab. The source key, comments and
    /// attachments are not part of it.
    pub fn to_draft(&self, description: String) -> IssueDraft {
        IssueDraft {
            title: self.title.clone(),
            description,
            labels: self.labels.clone(),
            created_at: self.created_at.clone(),
            assignee_ids: self.assignee.id.into_iter().collect(),
        }
    }
}

/// An issue that made it to GitLab, as recorded in the posted snapshots.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostedIssue {
    pub jira_key: String,
    pub iid: u64,
    pub web_url: Option<String>,
    #[serde(flatten)]
    pub issue: IssueDraft,
    pub attachments: Vec<MigrationAttachment>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostedNote {
    pub jira_key: String,
    pub note_id: u64,
    pub body: String,
}
