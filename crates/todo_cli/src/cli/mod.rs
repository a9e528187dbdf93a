use crate::board::Filter;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for the to-do task service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Base URL of the task service (defaults to TODO_API_URL or the config file)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List tasks, newest first
    ///
    /// Example: todo list --filter active --search milk
    List {
        #[arg(long, value_enum)]
        filter: Option<Filter>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a new task
    ///
    /// Example: todo add "Buy milk"
    Add { text: Option<String> },
    /// Flip a task between active and completed
    ///
    /// Example: todo toggle 3f2a...
    Toggle { id: String },
    /// Delete a task
    ///
    /// Example: todo delete 3f2a...
    Delete { id: String },
    /// Show completion counts and a focus message
    ///
    /// Example: todo summary
    Summary,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use crate::board::Filter;
    use clap::Parser;

    #[test]
    fn list_accepts_filter_and_search() {
        let cli = Cli::try_parse_from(["todo", "list", "--filter", "completed", "--search", "milk"])
            .unwrap();

        assert_eq!(
            cli.command,
            Command::List {
                filter: Some(Filter::Completed),
                search: Some("milk".to_string()),
            }
        );
    }

    #[test]
    fn list_rejects_unknown_filter() {
        let err = Cli::try_parse_from(["todo", "list", "--filter", "someday"]).unwrap_err();
        assert!(err.to_string().contains("someday"));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "todo",
            "add",
            "Buy milk",
            "--json",
            "--api-url",
            "http://127.0.0.1:9000",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.api_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(
            cli.command,
            Command::Add {
                text: Some("Buy milk".to_string())
            }
        );
    }

    #[test]
    fn add_text_is_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["todo", "add"]).unwrap();
        assert_eq!(cli.command, Command::Add { text: None });
    }

    #[test]
    fn toggle_requires_id() {
        assert!(Cli::try_parse_from(["todo", "toggle"]).is_err());
    }

    #[test]
    fn config_override_is_repeatable() {
        let cli = Cli::try_parse_from([
            "todo",
            "summary",
            "--config-override",
            "api_url=http://a",
            "--config-override",
            "port=1",
        ])
        .unwrap();

        assert_eq!(cli.config_override, vec!["api_url=http://a", "port=1"]);
    }
}
