use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Request rejected by server: {message}")]
    Rejected { message: String },

    #[error("Couldn't find project \"{0}\" on the GitLab instance")]
    ProjectNotFound(String),

    #[error("Couldn't find issues for \"{0}\" on the JIRA instance")]
    NoIssuesFound(String),

    #[error("Failed to upload attachment {filename}: {source}")]
    Upload {
        filename: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("Failed to create GitLab issue for {key}: {source}")]
    Creation {
        key: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("Failed to download attachment {filename} of {key}: {source}")]
    Download {
        key: String,
        filename: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("Failed to write snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render config template: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error(
        "No config file found. Wrote defaults to {0}; edit it with your instance details and run again"
    )]
    ConfigCreated(PathBuf),

    #[error("Config file already exists at {0} (use --force to overwrite)")]
    ConfigExists(PathBuf),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Missing configuration value: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
