use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use url::Url;

use crate::client::{build_http, ensure_success, read_json, DestinationApi};
use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::types::{
    CreatedIssue, GitLabProject, GitLabUser, IssueDraft, Note, NoteDraft, Upload,
};

const PER_PAGE: u32 = 100;

pub struct GitLabClient {
    http: Client,
    base_url: String,
    project_path: String,
    token: String,
}

impl GitLabClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: build_http(config.gitlab.insecure, config.settings.timeout_secs)?,
            base_url: config.gitlab.url.clone(),
            project_path: config.gitlab.project.clone(),
            token: config.gitlab_token()?,
        })
    }

    fn api_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let endpoint = format!("{}/api/v4/{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&endpoint)
        } else {
            Url::parse_with_params(&endpoint, params)
        };
        parsed.map_err(|_| MigrateError::InvalidUrl(endpoint))
    }

    fn authed(&self, request: RequestBuilder, sudo: Option<&str>) -> RequestBuilder {
        let request = request.header("PRIVATE-TOKEN", &self.token);
        match sudo {
            Some(username) => request.header("Sudo", username),
            None => request,
        }
    }

    /// Search term for the project lookup: the last segment of its path.
    fn project_search_term(&self) -> &str {
        self.project_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.project_path)
    }
}

#[async_trait]
impl DestinationApi for GitLabClient {
    async fn list_users(&self) -> Result<Vec<GitLabUser>> {
        let mut users = Vec::new();
        let mut page: u64 = 1;

        loop {
            let url = self.api_url(
                "users",
                &[
                    ("active", "true".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
            )?;
            tracing::debug!(%url, "listing GitLab users");

            let response = self.authed(self.http.get(url), None).send().await?;
            let response = ensure_success(response).await?;
            let next_page = response
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let batch: Vec<GitLabUser> = read_json(response).await?;
            users.extend(batch);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        tracing::info!(count = users.len(), "fetched GitLab users");
        Ok(users)
    }

    async fn search_projects(&self) -> Result<Vec<GitLabProject>> {
        let url = self.api_url(
            "projects",
            &[
                ("search", self.project_search_term().to_string()),
                ("per_page", PER_PAGE.to_string()),
            ],
        )?;
        tracing::debug!(%url, "searching GitLab projects");

        let response = self.authed(self.http.get(url), None).send().await?;
        read_json(response).await
    }

    async fn upload_file(&self, project_id: u64, path: &Path, mime_type: &str) -> Result<Upload> {
        let url = self.api_url(&format!("projects/{project_id}/uploads"), &[])?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        tracing::debug!(file = %path.display(), mime_type, "uploading attachment");

        let data = tokio::fs::read(path).await?;
        let part = Part::bytes(data).file_name(file_name).mime_str(mime_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .authed(self.http.post(url), None)
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    async fn create_issue(
        &self,
        project_id: u64,
        issue: &IssueDraft,
        sudo: Option<&str>,
    ) -> Result<CreatedIssue> {
        let url = self.api_url(&format!("projects/{project_id}/issues"), &[])?;
        tracing::debug!(title = %issue.title, sudo, "creating GitLab issue");

        let response = self
            .authed(self.http.post(url), sudo)
            .json(issue)
            .send()
            .await?;
        read_json(response).await
    }

    async fn create_note(
        &self,
        notes_url: &str,
        note: &NoteDraft,
        sudo: Option<&str>,
    ) -> Result<Note> {
        let url = Url::parse(notes_url).map_err(|_| MigrateError::InvalidUrl(notes_url.to_string()))?;
        tracing::debug!(%url, sudo, "posting GitLab note");

        let response = self
            .authed(self.http.post(url), sudo)
            .json(note)
            .send()
            .await?;
        read_json(response).await
    }
}
