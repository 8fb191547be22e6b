use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use url::Url;

use crate::client::{build_http, ensure_success, read_json, SourceApi};
use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::types::{IssueDetail, JiraAttachment, JiraIssue, SearchPage};

pub struct JiraClient {
    http: Client,
    base_url: String,
    project: String,
    username: String,
    password: String,
    page_size: usize,
}

impl JiraClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: build_http(config.jira.insecure, config.settings.timeout_secs)?,
            base_url: config.jira.url.clone(),
            project: config.jira.project.clone(),
            username: config.jira.username.clone(),
            password: config.jira_password()?,
            page_size: config.settings.page_size.max(1),
        })
    }

    fn search_url(&self, start_at: usize) -> Result<Url> {
        let jql = format!("project={} ORDER BY id ASC", self.project);
        let endpoint = format!("{}/rest/api/2/search", self.base_url);
        Url::parse_with_params(
            &endpoint,
            &[
                ("jql", jql),
                ("startAt", start_at.to_string()),
                ("maxResults", self.page_size.to_string()),
            ],
        )
        .map_err(|_| MigrateError::InvalidUrl(endpoint))
    }

    fn detail_url(&self, issue: &JiraIssue) -> Result<Url> {
        let endpoint = format!("{}/rest/api/2/issue/{}", self.base_url, issue.id);
        Url::parse_with_params(&endpoint, &[("fields", "attachment,comment")])
            .map_err(|_| MigrateError::InvalidUrl(endpoint))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    async fn search_page(&self, start_at: usize) -> Result<SearchPage> {
        let url = self.search_url(start_at)?;
        tracing::debug!(%url, "searching JIRA issues");
        let response = self.with_auth(self.http.get(url)).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl SourceApi for JiraClient {
    async fn list_issues(&self) -> Result<Vec<JiraIssue>> {
        let mut issues = Vec::new();
        let mut start_at = 0usize;

        loop {
            let page = self.search_page(start_at).await?;
            let page_len = page.issues.len();
            issues.extend(page.issues);
            start_at += page_len;

            if page_len == 0 || start_at >= page.total {
                break;
            }
        }

        tracing::info!(project = %self.project, count = issues.len(), "fetched JIRA issues");
        Ok(issues)
    }

    async fn fetch_issue_detail(&self, issue: &JiraIssue) -> Result<IssueDetail> {
        let url = self.detail_url(issue)?;
        tracing::debug!(key = %issue.key, %url, "fetching issue attachments and comments");
        let response = self.with_auth(self.http.get(url)).send().await?;
        read_json(response).await
    }

    async fn download_attachment(&self, attachment: &JiraAttachment, dest: &Path) -> Result<u64> {
        let url = Url::parse(&attachment.content)
            .map_err(|_| MigrateError::InvalidUrl(attachment.content.clone()))?;
        tracing::debug!(%url, dest = %dest.display(), "downloading attachment");

        let response = self.with_auth(self.http.get(url)).send().await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;

        Ok(bytes.len() as u64)
    }
}

/// Local path of a downloaded attachment: `<dir>/<issueKey>_<filename>`.
///
/// The name is unique per attachment, so concurrent downloads never share
/// a path and an existing file identifies an earlier download.
pub fn attachment_path(dir: &Path, issue_key: &str, filename: &str) -> PathBuf {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[/\\\x00]").unwrap());

    let filename = unsafe_chars.replace_all(filename, "_");
    dir.join(format!("{issue_key}_{filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.jira.url = base_url.to_string();
        config.jira.project = "DEMO".to_string();
        config.jira.username = "alice@example.com".to_string();
        config.jira.password = Some("secret".to_string());
        config.settings.page_size = 2;
        config
    }

    fn client(server: &MockServer) -> JiraClient {
        let mut client = JiraClient::new(&test_config(&server.uri())).unwrap();
        // Keep the tests independent from a JIRA_PASSWORD in the environment.
        client.password = "secret".to_string();
        client
    }

    fn issue_json(id: u32) -> serde_json::Value {
        serde_json::json!({
            "id": id.to_string(),
            "key": format!("DEMO-{id}"),
            "fields": {
                "summary": format!("Issue {id}"),
                "issuetype": {"name": "Bug"},
                "fixVersions": []
            }
        })
    }

    #[tokio::test]
    async fn lists_issues_across_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param("jql", "project=DEMO ORDER BY id ASC"))
            .and(query_param("startAt", "0"))
            .and(query_param("maxResults", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 3,
                "issues": [issue_json(1), issue_json(2)]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param("startAt", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 3,
                "issues": [issue_json(3)]
            })))
            .mount(&server)
            .await;

        let issues = client(&server).list_issues().await.unwrap();
        let keys: Vec<_> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["DEMO-1", "DEMO-2", "DEMO-3"]);
        assert_eq!(issues[0].fields.issuetype.as_ref().unwrap().name, "Bug");
    }

    #[tokio::test]
    async fn empty_search_returns_no_issues() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 0})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let issues = client(&server).list_issues().await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn search_failure_is_a_remote_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).list_issues().await.unwrap_err();
        match err {
            MigrateError::Remote { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "unauthorized");
            }
            other => panic!("expected Remote, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetches_detail_with_basic_auth() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/issue/10"))
            .and(query_param("fields", "attachment,comment"))
            .and(basic_auth("alice@example.com", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "fields": {
                    "attachment": [{
                        "filename": "log.txt",
                        "content": "https://jira.example.com/secure/attachment/1/log.txt",
                        "mimeType": "text/plain",
                        "created": "2019-01-02T10:00:00.000+0000"
                    }],
                    "comment": {"comments": [{"body": "first", "created": "2019-01-03T10:00:00.000+0000"}]}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let issue: JiraIssue = serde_json::from_value(issue_json(10)).unwrap();
        let detail = client(&server).fetch_issue_detail(&issue).await.unwrap();
        let fields = detail.fields.expect("fields");
        assert_eq!(fields.attachment.len(), 1);
        assert_eq!(fields.attachment[0].mime_type, "text/plain");
        assert_eq!(fields.comment.comments[0].body, "first");
    }

    #[tokio::test]
    async fn detail_without_fields_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/issue/11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let issue: JiraIssue = serde_json::from_value(issue_json(11)).unwrap();
        let detail = client(&server).fetch_issue_detail(&issue).await.unwrap();
        assert!(detail.fields.is_none());
    }

    #[tokio::test]
    async fn downloads_attachment_to_disk() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/secure/attachment/1/log.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;

        let attachment = JiraAttachment {
            author: None,
            filename: "log.txt".to_string(),
            content: format!("{}/secure/attachment/1/log.txt", server.uri()),
            created: None,
            mime_type: "text/plain".to_string(),
        };
        let dest = attachment_path(dir.path(), "DEMO-1", &attachment.filename);

        let written = client(&server)
            .download_attachment(&attachment, &dest)
            .await
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn attachment_path_is_keyed_by_issue_and_filename() {
        let dir = Path::new("payloads");
        assert_eq!(
            attachment_path(dir, "DEMO-1", "screen.png"),
            PathBuf::from("payloads/DEMO-1_screen.png")
        );
        assert_eq!(
            attachment_path(dir, "DEMO-1", "../etc/passwd"),
            PathBuf::from("payloads/DEMO-1_.._etc_passwd")
        );
    }
}
