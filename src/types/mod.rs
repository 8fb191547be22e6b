mod gitlab;
mod jira;
mod migration;

pub use gitlab::{
    CreatedIssue, GitLabProject, GitLabUser, IssueDraft, IssueLinks, Note, NoteDraft, Upload,
};
pub use jira::{
    CommentPage, DetailFields, IssueDetail, IssueMetadata, JiraAttachment, JiraComment,
    JiraIssue, JiraIssueFields, JiraUser, NameRef, SearchPage,
};
pub use migration::{
    MigrationAttachment, MigrationComment, MigrationIssue, PostedIssue, PostedNote, UserRef,
};
