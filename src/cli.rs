use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "jira2gitlab")]
#[command(about = "Migrate the issues of a JIRA project to a GitLab project", version)]
#[command(after_help = "EXAMPLES:
    jira2gitlab init                  Write a config template to edit
    jira2gitlab migrate               Fetch and transform, write snapshots only
    jira2gitlab migrate --apply       Also post issues and comments to GitLab")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, short, global = true, env = "JIRA2GITLAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only print errors
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug logging and full error chains
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the migration
    #[command(after_help = "EXAMPLES:
    jira2gitlab migrate
    jira2gitlab migrate --payloads ./run-1
    jira2gitlab migrate --apply")]
    Migrate(MigrateArgs),
    /// Write the default config file
    #[command(after_help = "EXAMPLES:
    jira2gitlab init
    jira2gitlab init --force --config ./jira2gitlab.toml")]
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    jira2gitlab completions bash > ~/.bash_completion.d/jira2gitlab
    jira2gitlab completions zsh > ~/.zfunc/_jira2gitlab
    jira2gitlab completions fish > ~/.config/fish/completions/jira2gitlab.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Post issues, attachments and comments to GitLab (without it nothing is posted)
    #[arg(long, visible_alias = "go")]
    pub apply: bool,

    /// Directory for snapshots and downloaded attachments
    #[arg(long, value_name = "DIR")]
    pub payloads: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn go_is_an_alias_of_apply() {
        let cli = Cli::try_parse_from(["jira2gitlab", "migrate", "--go"]).unwrap();
        match cli.command {
            Commands::Migrate(args) => assert!(args.apply),
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn migrate_defaults_to_dry_run() {
        let cli =
            Cli::try_parse_from(["jira2gitlab", "migrate", "--payloads", "out", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Migrate(args) => {
                assert!(!args.apply);
                assert_eq!(args.payloads, Some(PathBuf::from("out")));
            }
            _ => panic!("expected migrate"),
        }
    }
}
