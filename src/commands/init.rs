use std::path::Path;

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::output;

/// Write the default config template to `config_path`.
pub fn run(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        return Err(MigrateError::ConfigExists(config_path.to_path_buf()));
    }

    Config::write_default(config_path)?;

    output::print_success(&format!("Config written to {}", config_path.display()));
    output::print_message(
        "Set jira.url, jira.project, gitlab.url and gitlab.project, then run 'jira2gitlab migrate'.",
    );
    output::print_message(
        "Secrets can stay out of the file: JIRA_PASSWORD and GITLAB_TOKEN take precedence.",
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        run(&path, false).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[jira]"));
        assert!(contents.contains("[settings]"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let err = run(&path, false).unwrap_err();
        assert!(matches!(err, MigrateError::ConfigExists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        run(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[gitlab]"));
    }
}
