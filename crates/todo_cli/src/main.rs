use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::UtcOffset;
use time::macros::format_description;
use todo_cli::board::{Board, Summary};
use todo_cli::cli::{Cli, Command};
use todo_cli::client::TaskClient;
use todo_core::config::resolve_config;
use todo_core::error::AppError;
use todo_core::model::Task;
use tracing_subscriber::EnvFilter;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "State")]
    state: &'static str,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl TaskRow {
    fn new(task: &Task, offset: UtcOffset) -> Self {
        let created = task
            .created_at
            .to_offset(offset)
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_else(|_| "-".to_string());

        Self {
            id: task.id.clone(),
            state: if task.is_completed() { "done" } else { "active" },
            text: task.text.clone(),
            created,
        }
    }
}

struct Session {
    client: TaskClient,
    board: Board,
}

impl Session {
    fn connect(api_url: Option<&str>, overrides: &[String]) -> Result<Self, AppError> {
        let loaded = resolve_config(overrides)?;
        if let Some(error) = loaded.error.as_ref() {
            tracing::warn!(%error, "ignoring config file, using defaults");
        }

        let url = match api_url {
            Some(url) => url.to_string(),
            None => loaded.config.api_url().to_string(),
        };
        tracing::debug!(api_url = %url, "connecting to task service");

        Ok(Self {
            client: TaskClient::new(&url)?,
            board: Board::new(),
        })
    }

    fn load(&mut self) -> Result<(), AppError> {
        self.board.load(&self.client).map(|_| ())
    }
}

fn print_tasks_plain(board: &Board) {
    if board.is_empty() {
        println!("No tasks yet. Add one to get started!");
        return;
    }

    let visible = board.visible();
    if visible.is_empty() {
        println!("No tasks match the current search or filter.");
        return;
    }

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let rows: Vec<TaskRow> = visible
        .into_iter()
        .map(|task| TaskRow::new(task, offset))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_summary_plain(summary: &Summary) {
    println!(
        "Total: {}  Active: {}  Completed: {}  ({:.0}%)",
        summary.total, summary.active, summary.completed, summary.percent
    );
    println!("{}", summary.focus_message());
}

fn print_summary_json(summary: &Summary) -> Result<(), AppError> {
    let mut value = serde_json::to_value(summary)?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "message".to_string(),
            serde_json::Value::String(summary.focus_message()),
        );
    }
    print_json(&value)
}

fn is_display_request(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
                quoted = false;
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(session: &mut Session, command: Command, json: bool) -> Result<(), AppError> {
    match command {
        Command::List { filter, search } => {
            if let Some(filter) = filter {
                session.board.set_filter(filter);
            }
            if let Some(search) = search {
                session.board.set_search(search);
            }

            if json {
                print_json(&session.board.visible())?;
            } else {
                print_tasks_plain(&session.board);
            }
        }
        Command::Add { text } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("text is required")),
            };

            let task = session
                .board
                .add(&session.client, &text)?
                .ok_or_else(|| AppError::invalid_input("text is required"))?;
            if json {
                print_json(&task)?;
            } else {
                println!("Added task: {} ({})", task.text, task.id);
            }
        }
        Command::Toggle { id } => {
            let task = session.board.toggle(&session.client, &id)?;
            if json {
                print_json(&task)?;
            } else if task.is_completed() {
                println!("Completed task: {} ({})", task.text, task.id);
            } else {
                println!("Reopened task: {} ({})", task.text, task.id);
            }
        }
        Command::Delete { id } => {
            session.board.delete(&session.client, &id)?;
            if json {
                print_json(&serde_json::json!({ "deleted": id.trim() }))?;
            } else {
                println!("Deleted task: {}", id.trim());
            }
        }
        Command::Summary => {
            let summary = session.board.summary();
            if json {
                print_summary_json(&summary)?;
            } else {
                print_summary_plain(&summary);
            }
        }
    }

    Ok(())
}

/// Reads commands line by line against a board loaded once at startup.
/// Search and filter persist between commands.
fn run_interactive() -> Result<(), AppError> {
    let mut session = Session::connect(None, &[])?;
    if let Err(err) = session.load() {
        eprintln!("ERROR: {}", err);
    }

    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("todo".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if is_display_request(&err) => {
                println!("{err}");
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = reject_connection_flags(&cli)
            .and_then(|()| run_command(&mut session, cli.command, cli.json))
        {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

// The session is already connected when commands arrive.
fn reject_connection_flags(cli: &Cli) -> Result<(), AppError> {
    if cli.api_url.is_some() || !cli.config_override.is_empty() {
        return Err(AppError::invalid_input(
            "--api-url and --config-override can only be given when starting the session",
        ));
    }
    Ok(())
}

fn run_once(cli: Cli) -> Result<(), AppError> {
    let mut session = Session::connect(cli.api_url.as_deref(), &cli.config_override)?;
    if matches!(cli.command, Command::List { .. } | Command::Summary) {
        session.load()?;
    }
    run_command(&mut session, cli.command, cli.json)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_display_request(&err) => err.exit(),
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_once(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::split_command_line;

    #[test]
    fn split_command_line_honours_quotes() {
        let args = split_command_line(r#"add "Buy milk" --json"#).unwrap();
        assert_eq!(args, vec!["add", "Buy milk", "--json"]);
    }

    #[test]
    fn split_command_line_keeps_escaped_quotes() {
        let args = split_command_line(r#"add "say \"hi\"""#).unwrap();
        assert_eq!(args, vec!["add", r#"say "hi""#]);
    }

    #[test]
    fn split_command_line_keeps_empty_quoted_argument() {
        let args = split_command_line(r#"list --search "" --json"#).unwrap();
        assert_eq!(args, vec!["list", "--search", "", "--json"]);
    }

    #[test]
    fn split_command_line_rejects_unterminated_quote() {
        let err = split_command_line(r#"add "Buy milk"#).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
