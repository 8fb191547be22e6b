//! Pure mapping from JIRA entities to their GitLab counterparts.
//!
//! Nothing here performs I/O or reads the clock: the same inputs always
//! produce the same output.

use chrono::DateTime;

use crate::config::IdentityMapping;
use crate::types::{
    GitLabUser, JiraAttachment, JiraComment, JiraIssue, JiraUser, MigrationAttachment,
    MigrationComment, MigrationIssue, Upload, UserRef,
};

/// JIRA resolutions that count as a closed issue.
const CLOSED_RESOLUTIONS: [&str; 3] = ["Fixed", "Done", "Duplicate"];

const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// How users are matched and issues attributed.
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions<'a> {
    pub users: &'a [GitLabUser],
    pub identity_map: &'a [IdentityMapping],
    pub match_by_username: bool,
    pub sudo: bool,
}

/// Resolve a JIRA user to a GitLab user, or [`UserRef::unknown`].
pub fn map_user(
    source: Option<&JiraUser>,
    users: &[GitLabUser],
    identity_map: &[IdentityMapping],
    match_by_username: bool,
) -> UserRef {
    let Some(email) = source.and_then(|u| u.email_address.as_deref()) else {
        return UserRef::unknown();
    };

    let email = mapped_email(email, identity_map);

    let found = if match_by_username {
        let username = derived_username(email);
        users.iter().find(|u| u.username == username)
    } else {
        users
            .iter()
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
    };

    found.map(UserRef::from).unwrap_or_default()
}

/// Destination email for `email`, following the identity map when it has
/// a non-empty entry.
fn mapped_email<'a>(email: &'a str, identity_map: &'a [IdentityMapping]) -> &'a str {
    identity_map
        .iter()
        .find(|m| m.source.eq_ignore_ascii_case(email))
        .map(|m| m.destination.as_str())
        .filter(|destination| !destination.is_empty())
        .unwrap_or(email)
}

fn derived_username(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

pub fn map_issue(
    issue: &JiraIssue,
    attachments: &[JiraAttachment],
    comments: &[JiraComment],
    options: &TransformOptions<'_>,
) -> MigrationIssue {
    let user = |source: Option<&JiraUser>| {
        map_user(
            source,
            options.users,
            options.identity_map,
            options.match_by_username,
        )
    };

    let fields = &issue.fields;
    let author = user(fields.reporter.as_ref());

    let mut description = format!("> JIRA issue: {}\n\n", issue.key);
    if !options.sudo {
        description.push_str(&attribution(&author));
    }
    description.push_str(fields.description.as_deref().unwrap_or_default());

    MigrationIssue {
        title: fields.summary.clone(),
        description,
        labels: labels(issue),
        created_at: fields.created.as_deref().map(normalize_timestamp),
        updated_at: fields.updated.as_deref().map(normalize_timestamp),
        done: is_done(issue),
        assignee: user(fields.assignee.as_ref()),
        author,
        comments: comments
            .iter()
            .map(|c| MigrationComment {
                author: user(c.author.as_ref()),
                body: c.body.clone(),
                created_at: c.created.as_deref().map(normalize_timestamp),
            })
            .collect(),
        attachments: attachments
            .iter()
            .map(|a| MigrationAttachment {
                author: user(a.author.as_ref()),
                filename: a.filename.clone(),
                content: a.content.clone(),
                created_at: a.created.as_deref().map(normalize_timestamp),
                mime_type: a.mime_type.clone(),
            })
            .collect(),
        source_key: issue.key.clone(),
    }
}

/// Issue type followed by every fix version, comma separated.
pub fn labels(issue: &JiraIssue) -> String {
    issue
        .fields
        .issuetype
        .iter()
        .chain(issue.fields.fix_versions.iter())
        .map(|n| n.name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn is_done(issue: &JiraIssue) -> bool {
    issue
        .fields
        .resolution
        .as_ref()
        .is_some_and(|r| CLOSED_RESOLUTIONS.contains(&r.name.as_str()))
}

/// `@username "Name"`, or `@Unknown` when the user could not be matched.
pub fn user_snippet(user: &UserRef) -> String {
    match (user.is_known(), user.username.as_deref()) {
        (true, Some(username)) => {
            format!("@{} \"{}\"", username, user.name.as_deref().unwrap_or_default())
        }
        _ => "@Unknown".to_string(),
    }
}

/// Quoted attribution line used when content is not posted as its author.
pub fn attribution(user: &UserRef) -> String {
    format!("> Originally by {}\n\n", user_snippet(user))
}

/// Absolute URL of an upload: uploads are served relative to the project page.
pub fn upload_url(gitlab_url: &str, project_path: &str, upload: &Upload) -> String {
    format!("{gitlab_url}/{project_path}{}", upload.url)
}

/// Heading and header row of the attachment table appended to descriptions.
pub fn attachment_table_header() -> &'static str {
    "\n\n### Attachments\n\n\n|Filename|Uploader|Attachment|\n|---|---|---|\n"
}

/// One row of the attachment table. Images are inlined as a thumbnail,
/// everything else uses the markdown GitLab suggested for the upload.
pub fn render_attachment_row(upload: &Upload, author: &UserRef, url: &str) -> String {
    let markdown = upload.markdown.as_deref().unwrap_or_default();
    let preview = if markdown.starts_with('!') {
        format!("<img src=\"{url}\" width=\"250px\">")
    } else {
        markdown.to_string()
    };

    format!("|{}|{}|{}|\n", upload.file_name(), user_snippet(author), preview)
}

/// JIRA timestamps (`2019-01-02T10:00:00.000+0000`) as RFC 3339; anything
/// else is passed through untouched.
pub fn normalize_timestamp(value: &str) -> String {
    DateTime::parse_from_str(value, JIRA_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::NameRef;

    fn gitlab_users() -> Vec<GitLabUser> {
        vec![
            GitLabUser {
                id: 1,
                username: "alice".to_string(),
                name: "Alice Liddell".to_string(),
                email: Some("alice@example.com".to_string()),
            },
            GitLabUser {
                id: 2,
                username: "bob".to_string(),
                name: "Bob".to_string(),
                email: Some("bob@example.com".to_string()),
            },
        ]
    }

    fn jira_user(email: &str) -> JiraUser {
        JiraUser {
            name: None,
            display_name: None,
            email_address: Some(email.to_string()),
        }
    }

    fn issue(resolution: Option<&str>, fix_versions: &[&str]) -> JiraIssue {
        serde_json::from_value(json!({
            "id": "10001",
            "key": "DEMO-1",
            "fields": {
                "summary": "Crash on start",
                "description": "It crashes.",
                "issuetype": {"name": "Bug"},
                "fixVersions": fix_versions.iter().map(|v| json!({"name": v})).collect::<Vec<_>>(),
                "created": "2019-01-02T10:00:00.000+0000",
                "updated": "2019-01-05T08:30:00.000+0100",
                "resolution": resolution.map(|r| json!({"name": r})),
                "reporter": {"emailAddress": "alice@example.com"},
                "assignee": {"emailAddress": "bob@example.com"}
            }
        }))
        .unwrap()
    }

    fn options<'a>(users: &'a [GitLabUser], sudo: bool) -> TransformOptions<'a> {
        TransformOptions {
            users,
            identity_map: &[],
            match_by_username: false,
            sudo,
        }
    }

    #[test]
    fn absent_user_maps_to_unknown() {
        let users = gitlab_users();
        assert_eq!(map_user(None, &users, &[], false), UserRef::unknown());
        assert_eq!(map_user(None, &[], &[], true), UserRef::unknown());

        let no_email = JiraUser::default();
        assert_eq!(map_user(Some(&no_email), &users, &[], false), UserRef::unknown());
    }

    #[test]
    fn unknown_user_serializes_as_null_id() {
        assert_eq!(
            serde_json::to_value(UserRef::unknown()).unwrap(),
            json!({"id": null})
        );
    }

    #[test]
    fn maps_user_by_email() {
        let users = gitlab_users();
        let mapped = map_user(Some(&jira_user("Bob@Example.com")), &users, &[], false);
        assert_eq!(mapped.id, Some(2));
        assert_eq!(mapped.username.as_deref(), Some("bob"));

        let missing = map_user(Some(&jira_user("carol@example.com")), &users, &[], false);
        assert!(!missing.is_known());
    }

    #[test]
    fn identity_map_substitutes_before_lookup() {
        let users = gitlab_users();
        let identity_map = vec![IdentityMapping {
            source: "a.liddell@corp.example".to_string(),
            destination: "alice@example.com".to_string(),
        }];

        let by_email = map_user(
            Some(&jira_user("a.liddell@corp.example")),
            &users,
            &identity_map,
            false,
        );
        assert_eq!(by_email.id, Some(1));

        let by_username = map_user(
            Some(&jira_user("a.liddell@corp.example")),
            &users,
            &identity_map,
            true,
        );
        assert_eq!(by_username.id, Some(1));
    }

    #[test]
    fn empty_identity_mapping_keeps_original_email() {
        let users = gitlab_users();
        let identity_map = vec![IdentityMapping {
            source: "bob@example.com".to_string(),
            destination: String::new(),
        }];

        let mapped = map_user(Some(&jira_user("bob@example.com")), &users, &identity_map, false);
        assert_eq!(mapped.id, Some(2));
    }

    #[test]
    fn matches_by_derived_username() {
        let users = gitlab_users();
        let mapped = map_user(Some(&jira_user("alice@corp.example")), &users, &[], true);
        assert_eq!(mapped.id, Some(1));

        let by_email = map_user(Some(&jira_user("alice@corp.example")), &users, &[], false);
        assert!(!by_email.is_known());
    }

    #[test]
    fn done_only_for_closed_resolutions() {
        for name in ["Fixed", "Done", "Duplicate"] {
            assert!(is_done(&issue(Some(name), &[])), "{name} should be done");
        }
        for name in ["Won't Fix", "Cannot Reproduce", "fixed", ""] {
            assert!(!is_done(&issue(Some(name), &[])), "{name} should not be done");
        }
        assert!(!is_done(&issue(None, &[])));
    }

    #[test]
    fn labels_join_type_and_fix_versions() {
        assert_eq!(labels(&issue(None, &["v1.0", "v1.1"])), "Bug,v1.0,v1.1");
        assert_eq!(labels(&issue(None, &[])), "Bug");

        let mut untyped = issue(None, &["v2"]);
        untyped.fields.issuetype = None;
        assert_eq!(labels(&untyped), "v2");
        untyped.fields.fix_versions = vec![NameRef::default()];
        assert_eq!(labels(&untyped), "");
    }

    #[test]
    fn bare_issue_with_sudo_keeps_only_reference_and_text() {
        let users = gitlab_users();
        let migrated = map_issue(&issue(None, &[]), &[], &[], &options(&users, true));

        assert!(migrated.attachments.is_empty());
        assert!(migrated.comments.is_empty());
        assert_eq!(migrated.description, "> JIRA issue: DEMO-1\n\nIt crashes.");
        assert_eq!(migrated.source_key, "DEMO-1");
        assert_eq!(migrated.author.id, Some(1));
        assert_eq!(migrated.assignee.id, Some(2));
    }

    #[test]
    fn attribution_added_without_sudo() {
        let users = gitlab_users();
        let migrated = map_issue(&issue(None, &[]), &[], &[], &options(&users, false));

        assert_eq!(
            migrated.description,
            "> JIRA issue: DEMO-1\n\n> Originally by @alice \"Alice Liddell\"\n\nIt crashes."
        );
    }

    #[test]
    fn missing_description_is_empty() {
        let mut source = issue(None, &[]);
        source.fields.description = None;
        let migrated = map_issue(&source, &[], &[], &options(&[], true));
        assert_eq!(migrated.description, "> JIRA issue: DEMO-1\n\n");
    }

    #[test]
    fn maps_comments_and_attachments_in_order() {
        let users = gitlab_users();
        let comments = vec![
            JiraComment {
                author: Some(jira_user("bob@example.com")),
                body: "first".to_string(),
                created: Some("2019-01-03T10:00:00.000+0000".to_string()),
            },
            JiraComment {
                author: None,
                body: "second".to_string(),
                created: None,
            },
        ];
        let attachments = vec![JiraAttachment {
            author: Some(jira_user("alice@example.com")),
            filename: "log.txt".to_string(),
            content: "https://jira.example.com/secure/attachment/1/log.txt".to_string(),
            created: None,
            mime_type: "text/plain".to_string(),
        }];

        let migrated = map_issue(
            &issue(None, &[]),
            &attachments,
            &comments,
            &options(&users, true),
        );

        assert_eq!(migrated.comments.len(), 2);
        assert_eq!(migrated.comments[0].body, "first");
        assert_eq!(migrated.comments[0].author.id, Some(2));
        assert_eq!(
            migrated.comments[0].created_at.as_deref(),
            Some("2019-01-03T10:00:00+00:00")
        );
        assert!(!migrated.comments[1].author.is_known());
        assert_eq!(migrated.attachments[0].mime_type, "text/plain");
        assert_eq!(migrated.attachments[0].author.id, Some(1));
    }

    #[test]
    fn transform_is_idempotent() {
        let users = gitlab_users();
        let source = issue(Some("Fixed"), &["v1.0"]);
        let first = map_issue(&source, &[], &[], &options(&users, false));
        let second = map_issue(&source, &[], &[], &options(&users, false));
        assert_eq!(first, second);
    }

    #[test]
    fn normalizes_jira_timestamps() {
        assert_eq!(
            normalize_timestamp("2019-01-05T08:30:00.000+0100"),
            "2019-01-05T08:30:00+01:00"
        );
        assert_eq!(
            normalize_timestamp("2019-01-05T08:30:00Z"),
            "2019-01-05T08:30:00+00:00"
        );
        assert_eq!(normalize_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn renders_image_rows_inline() {
        let upload = Upload {
            alt: "screen".to_string(),
            url: "/uploads/abc/DEMO-1_screen.png".to_string(),
            markdown: Some("![screen](/uploads/abc/DEMO-1_screen.png)".to_string()),
        };
        let url = upload_url("https://gitlab.example.com", "group/demo", &upload);
        assert_eq!(
            url,
            "https://gitlab.example.com/group/demo/uploads/abc/DEMO-1_screen.png"
        );

        let author = UserRef::from(&gitlab_users()[0]);
        assert_eq!(
            render_attachment_row(&upload, &author, &url),
            "|DEMO-1_screen.png|@alice \"Alice Liddell\"|<img src=\"https://gitlab.example.com/group/demo/uploads/abc/DEMO-1_screen.png\" width=\"250px\">|\n"
        );
    }

    #[test]
    fn renders_file_rows_with_upload_markdown() {
        let upload = Upload {
            alt: "log".to_string(),
            url: "/uploads/def/DEMO-1_log.txt".to_string(),
            markdown: Some("[log](/uploads/def/DEMO-1_log.txt)".to_string()),
        };

        assert_eq!(
            render_attachment_row(&upload, &UserRef::unknown(), "ignored"),
            "|DEMO-1_log.txt|@Unknown|[log](/uploads/def/DEMO-1_log.txt)|\n"
        );
    }
}
