use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MigrateError, Result};

const DEFAULT_PAYLOADS_DIR: &str = "payloads";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub gitlab: GitLabConfig,
    #[serde(default)]
    pub settings: Settings,
    /// Email pairs for users whose address differs between the two instances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_map: Vec<IdentityMapping>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct JiraConfig {
    pub url: String,
    /// Project key, e.g. `PROJ`.
    pub project: String,
    pub username: String,
    pub password: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: "https://jira.example.org".to_string(),
            project: "PROJ".to_string(),
            username: "user@example.org".to_string(),
            password: None,
            insecure: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GitLabConfig {
    pub url: String,
    /// Full project path, `namespace/project`.
    pub project: String,
    pub token: Option<String>,
    pub insecure: bool,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: "https://gitlab.com".to_string(),
            project: String::new(),
            token: None,
            insecure: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Create issues and notes as their original author (requires an admin token).
    pub sudo: bool,
    /// Do not post issues whose JIRA resolution counts as closed.
    pub ignore_done: bool,
    /// Match users on the local part of their email instead of the full address.
    pub match_by_username: bool,
    /// Keep attachment binaries already present in the payload directory.
    pub reuse_downloads: bool,
    pub on_upload_error: UploadFailurePolicy,
    pub payloads_dir: PathBuf,
    pub timeout_secs: u64,
    /// Issues requested per JIRA search page.
    pub page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sudo: true,
            ignore_done: false,
            match_by_username: false,
            reuse_downloads: false,
            on_upload_error: UploadFailurePolicy::Abort,
            payloads_dir: PathBuf::from(DEFAULT_PAYLOADS_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// What to do when an attachment upload fails during posting.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadFailurePolicy {
    /// Stop the whole run and write the error snapshot.
    #[default]
    Abort,
    /// Drop the attachment from its issue and carry on.
    Skip,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapping {
    /// Email address on JIRA.
    pub source: String,
    /// Email address on GitLab. Empty means "same as source".
    #[serde(default)]
    pub destination: String,
}

impl Config {
    /// Load the config file, writing the default template first if it is missing.
    ///
    /// A freshly written template is never usable as-is, so that case is
    /// reported as [`MigrateError::ConfigCreated`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::write_default(path)?;
            return Err(MigrateError::ConfigCreated(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| MigrateError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| MigrateError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.normalized()
    }

    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MigrateError::ConfigWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let contents = toml::to_string_pretty(&Config::default())?;
        std::fs::write(path, contents).map_err(|e| MigrateError::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Explicit path if given, otherwise `<config dir>/jira2gitlab/config.toml`.
    pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        ProjectDirs::from("", "", "jira2gitlab")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(MigrateError::NoConfigDir)
    }

    /// JIRA password with the env var taking precedence over the config file
    pub fn jira_password(&self) -> Result<String> {
        if let Ok(password) = std::env::var("JIRA_PASSWORD") {
            return Ok(password);
        }

        self.jira
            .password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or(MigrateError::MissingSetting("jira.password (or JIRA_PASSWORD)"))
    }

    /// GitLab token with the env var taking precedence over the config file
    pub fn gitlab_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var("GITLAB_TOKEN") {
            return Ok(token);
        }

        self.gitlab
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(MigrateError::MissingSetting("gitlab.token (or GITLAB_TOKEN)"))
    }

    fn normalized(mut self) -> Result<Self> {
        self.jira.url = normalize_base_url(&self.jira.url)?;
        self.gitlab.url = normalize_base_url(&self.gitlab.url)?;
        self.gitlab.project = self.gitlab.project.trim().trim_matches('/').to_string();
        self.jira.project = self.jira.project.trim().to_string();

        if self.jira.project.is_empty() {
            return Err(MigrateError::MissingSetting("jira.project"));
        }
        if self.gitlab.project.is_empty() {
            return Err(MigrateError::MissingSetting("gitlab.project"));
        }

        Ok(self)
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|_| MigrateError::InvalidUrl(trimmed.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(MigrateError::InvalidUrl(trimmed.to_string()));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
