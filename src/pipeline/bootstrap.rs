use crate::client::{DestinationApi, SourceApi};
use crate::error::{MigrateError, Result};
use crate::progress::{Phase, ProgressEvent};
use crate::types::{GitLabProject, GitLabUser, JiraIssue};

use super::{add, Pipeline};

/// Everything fetched up front, before any per-issue work.
#[derive(Debug)]
pub struct Bootstrap {
    pub users: Vec<GitLabUser>,
    pub projects: Vec<GitLabProject>,
    pub issues: Vec<JiraIssue>,
}

/// The destination project the run posts into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub project_id: u64,
    pub project_path: String,
}

/// Pick the project whose full path matches exactly; search results also
/// contain projects that merely share the last path segment.
pub fn resolve_project(projects: &[GitLabProject], project_path: &str) -> Result<RunContext> {
    projects
        .iter()
        .find(|p| p.path_with_namespace == project_path)
        .map(|p| RunContext {
            project_id: p.id,
            project_path: p.path_with_namespace.clone(),
        })
        .ok_or_else(|| MigrateError::ProjectNotFound(project_path.to_string()))
}

impl<S, D> Pipeline<'_, S, D>
where
    S: SourceApi + ?Sized,
    D: DestinationApi + ?Sized,
{
    pub(super) async fn bootstrap(&self) -> Result<(Bootstrap, RunContext)> {
        let jira_project = &self.config.jira.project;
        self.progress
            .event(ProgressEvent::new(Phase::Bootstrap, 0, 0, jira_project.as_str()));

        let (users, projects, issues) = tokio::try_join!(
            self.destination.list_users(),
            self.destination.search_projects(),
            self.source.list_issues(),
        )?;

        let context = resolve_project(&projects, &self.config.gitlab.project)?;
        if issues.is_empty() {
            return Err(MigrateError::NoIssuesFound(jira_project.clone()));
        }

        add(&self.counters.issues_found, issues.len());
        tracing::info!(
            users = users.len(),
            issues = issues.len(),
            project = %context.project_path,
            project_id = context.project_id,
            "bootstrap complete"
        );

        Ok((
            Bootstrap {
                users,
                projects,
                issues,
            },
            context,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: u64, path: &str) -> GitLabProject {
        GitLabProject {
            id,
            path_with_namespace: path.to_string(),
            name: String::new(),
        }
    }

    #[test]
    fn resolves_exact_path_only() {
        let projects = vec![project(7, "other/demo"), project(8, "group/demo")];

        let context = resolve_project(&projects, "group/demo").unwrap();
        assert_eq!(context.project_id, 8);

        let err = resolve_project(&projects, "group/dem").unwrap_err();
        assert!(matches!(err, MigrateError::ProjectNotFound(ref p) if p == "group/dem"));
    }
}
