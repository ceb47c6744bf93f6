//! Console shell: line parsing and dispatch
//!
//! Each line is tokenized (double quotes group words), parsed with clap, and
//! dispatched to the catalog or the coordinator. Command failures are
//! rendered and the session keeps going; only IO on the output sink ends it.

use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::catalog::{BookListing, UserSummary};
use crate::config::ShellConfig;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::output::{emit_error, emit_report, emit_success, HumanOutput, OutputOptions};
use crate::status::{CheckInStatus, CheckoutStatus, Outcome, SearchStatus};

#[derive(Parser, Debug)]
#[command(name = "stacks", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    /// Add a book by title
    AddBook {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Remove a book (checks it back in if on loan)
    RemoveBook {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Add a user
    AddUser {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Remove a user (returns any books they hold)
    RemoveUser {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Check a book out to a user
    Checkout {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Borrower name
        #[arg(short, long)]
        user: String,
    },

    /// Return a book on behalf of a user
    Checkin {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Borrower name
        #[arg(short, long)]
        user: String,
    },

    /// List every book and its availability
    List,

    /// Look up a title
    Search {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// List users and what they hold
    Users,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Whether the session should keep reading lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Serialize)]
struct EntityReport<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<bool>,
}

#[derive(Serialize)]
struct LoanReport<'a, S> {
    title: &'a str,
    user: &'a str,
    #[serde(flatten)]
    outcome: Outcome<S>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    user_created: bool,
}

#[derive(Serialize)]
struct SearchReport<'a> {
    title: &'a str,
    #[serde(flatten)]
    outcome: Outcome<SearchStatus>,
}

/// A shell session bound to one catalog
#[derive(Debug, Clone)]
pub struct Session {
    coordinator: Coordinator,
    shell: ShellConfig,
    options: OutputOptions,
}

impl Session {
    pub fn new(coordinator: Coordinator, shell: ShellConfig, options: OutputOptions) -> Self {
        Self {
            coordinator,
            shell,
            options,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Read commands until EOF or `quit`, printing a prompt before each one
    pub async fn run_interactive<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<()> {
        let prompt = !self.options.json && !self.options.quiet;
        if prompt {
            write!(out, "{}", self.shell.prompt)?;
            out.flush()?;
        }
        for line in input.lines() {
            if self.execute(&line?, out).await? == Flow::Quit {
                return Ok(());
            }
            if prompt {
                write!(out, "{}", self.shell.prompt)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    /// Execute every line of a script; returns the number of commands run
    pub async fn run_script<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<usize> {
        let mut executed = 0;
        for line in input.lines() {
            let line = line?;
            if is_skippable(&line) {
                continue;
            }
            executed += 1;
            if self.execute(&line, out).await? == Flow::Quit {
                break;
            }
        }
        Ok(executed)
    }

    /// Parse and run one line.
    ///
    /// Errors returned here come from writing to `out`; command failures are
    /// rendered into `out` instead.
    pub async fn execute<W: Write>(&self, line: &str, out: &mut W) -> Result<Flow> {
        if is_skippable(line) {
            return Ok(Flow::Continue);
        }

        let tokens = match split_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                emit_error(out, "shell", &err, self.options.json)?;
                return Ok(Flow::Continue);
            }
        };

        let parsed = match ShellLine::try_parse_from(&tokens) {
            Ok(parsed) => parsed,
            Err(err) => {
                let rendered = err.render().to_string();
                if matches!(
                    err.kind(),
                    clap::error::ErrorKind::DisplayHelp
                        | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    write!(out, "{rendered}")?;
                } else {
                    let err = Error::InvalidArgument(rendered.trim().to_string());
                    emit_error(out, "shell", &err, self.options.json)?;
                }
                return Ok(Flow::Continue);
            }
        };

        let name = command_name(&parsed.command);
        match self.dispatch(parsed.command, out).await {
            Ok(flow) => Ok(flow),
            Err(err @ (Error::DuplicateKey { .. }
            | Error::InvalidArgument(_)
            | Error::LockTimeout { .. })) => {
                emit_error(out, name, &err, self.options.json)?;
                Ok(Flow::Continue)
            }
            Err(err) => Err(err),
        }
    }

    async fn dispatch<W: Write>(&self, command: ShellCommand, out: &mut W) -> Result<Flow> {
        let catalog = self.coordinator.catalog();
        match command {
            ShellCommand::AddBook { title } => {
                let title = title.join(" ");
                if catalog.book_exists(&title) {
                    let human = HumanOutput::new(format!("Book '{title}' already exists."));
                    let report = EntityReport {
                        name: &title,
                        created: Some(false),
                        removed: None,
                    };
                    emit_report(out, self.options, "add-book", false, &report, Some(&human))?;
                    return Ok(Flow::Continue);
                }
                catalog.add_book(&title)?;
                let human = HumanOutput::new(format!("Book '{title}' added."));
                let report = EntityReport {
                    name: &title,
                    created: Some(true),
                    removed: None,
                };
                emit_success(out, self.options, "add-book", &report, Some(&human))?;
            }
            ShellCommand::RemoveBook { title } => {
                let title = title.join(" ");
                let removed = catalog.remove_book(&title).await?;
                let header = if removed {
                    format!("Book '{title}' removed.")
                } else {
                    format!("Book '{title}' not found.")
                };
                let report = EntityReport {
                    name: &title,
                    created: None,
                    removed: Some(removed),
                };
                emit_report(
                    out,
                    self.options,
                    "remove-book",
                    removed,
                    &report,
                    Some(&HumanOutput::new(header)),
                )?;
            }
            ShellCommand::AddUser { name } => {
                let name = name.join(" ");
                if catalog.user_exists(&name) {
                    let human = HumanOutput::new(format!("User '{name}' already exists."));
                    let report = EntityReport {
                        name: &name,
                        created: Some(false),
                        removed: None,
                    };
                    emit_report(out, self.options, "add-user", false, &report, Some(&human))?;
                    return Ok(Flow::Continue);
                }
                catalog.add_user(&name)?;
                let human = HumanOutput::new(format!("User '{name}' added."));
                let report = EntityReport {
                    name: &name,
                    created: Some(true),
                    removed: None,
                };
                emit_success(out, self.options, "add-user", &report, Some(&human))?;
            }
            ShellCommand::RemoveUser { name } => {
                let name = name.join(" ");
                let removed = catalog.remove_user(&name).await?;
                let header = if removed {
                    format!("User '{name}' removed.")
                } else {
                    format!("User '{name}' not found.")
                };
                let report = EntityReport {
                    name: &name,
                    created: None,
                    removed: Some(removed),
                };
                emit_report(
                    out,
                    self.options,
                    "remove-user",
                    removed,
                    &report,
                    Some(&HumanOutput::new(header)),
                )?;
            }
            ShellCommand::Checkout { title, user } => {
                let title = title.join(" ");
                let user = user.trim().to_string();
                let user_created = self.shell.auto_create_users && !catalog.user_exists(&user);
                if user_created {
                    catalog.add_user(&user)?;
                }
                let outcome = self.coordinator.checkout_book(&title, &user).await?;
                self.emit_loan(out, "checkout", &title, &user, outcome, user_created)?;
            }
            ShellCommand::Checkin { title, user } => {
                let title = title.join(" ");
                let user = user.trim().to_string();
                let outcome = self.coordinator.check_in_book(&title, &user).await?;
                self.emit_loan(out, "checkin", &title, &user, outcome, false)?;
            }
            ShellCommand::List => {
                let listing = catalog.list_all_books();
                let human = listing_human(&listing);
                emit_report(
                    out,
                    self.options,
                    "list",
                    listing.outcome.success,
                    &listing,
                    Some(&human),
                )?;
            }
            ShellCommand::Search { title } => {
                let title = title.join(" ");
                let outcome = catalog.search_book(&title);
                let mut human = HumanOutput::new(outcome.message());
                human.push_summary("title", title.clone());
                if outcome.status == SearchStatus::BookNotFound {
                    human.push_next_step("list");
                }
                let report = SearchReport { title: &title, outcome };
                emit_report(out, self.options, "search", outcome.success, &report, Some(&human))?;
            }
            ShellCommand::Users => {
                let users = catalog.list_users();
                let human = users_human(&users);
                emit_success(out, self.options, "users", &users, Some(&human))?;
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn emit_loan<W: Write, S: LoanStatus>(
        &self,
        out: &mut W,
        command: &str,
        title: &str,
        user: &str,
        outcome: Outcome<S>,
        user_created: bool,
    ) -> Result<()> {
        let mut human = HumanOutput::new(outcome.message());
        human.push_summary("title", title);
        human.push_summary("user", user);
        if user_created {
            human.push_warning(format!("user '{user}' did not exist and was created"));
        }
        if let Some(step) = outcome.status.next_step() {
            human.push_next_step(step);
        }
        let report = LoanReport {
            title,
            user,
            outcome,
            user_created,
        };
        emit_report(out, self.options, command, outcome.success, &report, Some(&human))
    }
}

/// Statuses the shell knows how to follow up on
trait LoanStatus: crate::status::StatusCode {
    fn next_step(&self) -> Option<&'static str>;
}

impl LoanStatus for CheckoutStatus {
    fn next_step(&self) -> Option<&'static str> {
        match self {
            CheckoutStatus::UserNotFound => Some("add-user <NAME>"),
            CheckoutStatus::BookNotFound => Some("list"),
            CheckoutStatus::MaxBooksReached => Some("checkin <TITLE> --user <NAME>"),
            _ => None,
        }
    }
}

impl LoanStatus for CheckInStatus {
    fn next_step(&self) -> Option<&'static str> {
        match self {
            CheckInStatus::UserNotFound | CheckInStatus::BookNotBorrowedByUser => Some("users"),
            CheckInStatus::BookNotFound => Some("list"),
            _ => None,
        }
    }
}

fn listing_human(listing: &BookListing) -> HumanOutput {
    let mut human = HumanOutput::new(listing.outcome.message());
    for book in &listing.books {
        let state = if book.checked_out { "checked out" } else { "available" };
        human.push_detail(format!("{} ({state})", book.title));
    }
    if !listing.outcome.success {
        human.push_next_step("add-book <TITLE>");
    }
    human
}

fn users_human(users: &[UserSummary]) -> HumanOutput {
    let mut human = HumanOutput::new(format!("{} user(s)", users.len()));
    for user in users {
        if user.borrowed.is_empty() {
            human.push_detail(format!("{}: no books", user.name));
        } else {
            human.push_detail(format!("{}: {}", user.name, user.borrowed.join(", ")));
        }
    }
    human
}

fn command_name(command: &ShellCommand) -> &'static str {
    match command {
        ShellCommand::AddBook { .. } => "add-book",
        ShellCommand::RemoveBook { .. } => "remove-book",
        ShellCommand::AddUser { .. } => "add-user",
        ShellCommand::RemoveUser { .. } => "remove-user",
        ShellCommand::Checkout { .. } => "checkout",
        ShellCommand::Checkin { .. } => "checkin",
        ShellCommand::List => "list",
        ShellCommand::Search { .. } => "search",
        ShellCommand::Users => "users",
        ShellCommand::Quit => "quit",
    }
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Split a command line on whitespace; double quotes group words.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(Error::InvalidArgument("unterminated quote".to_string()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn session(json: bool) -> Session {
        let config = Config::default();
        Session::new(
            Coordinator::from_config(&config),
            config.shell,
            OutputOptions { json, quiet: false },
        )
    }

    async fn run(session: &Session, line: &str) -> String {
        let mut buf = Vec::new();
        session.execute(line, &mut buf).await.expect("execute");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn split_line_groups_quoted_words() {
        assert_eq!(
            split_line(r#"checkout "The Left Hand of Darkness" --user "Ursula K""#).unwrap(),
            vec!["checkout", "The Left Hand of Darkness", "--user", "Ursula K"]
        );
        assert_eq!(split_line("  list  ").unwrap(), vec!["list"]);
        assert_eq!(split_line(r#"search """#).unwrap(), vec!["search", ""]);
        assert!(matches!(split_line(r#"add-book "Dune"#), Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn unquoted_multi_word_titles_are_joined() {
        let session = session(false);
        run(&session, "add-book The Dispossessed").await;
        assert!(session.coordinator().catalog().book_exists("the dispossessed"));

        let text = run(&session, "checkout the dispossessed --user Shevek").await;
        assert!(text.contains("Book checked out successfully."));
        assert!(text.contains("user 'Shevek' did not exist and was created"));
    }

    #[tokio::test]
    async fn quoted_and_unquoted_titles_share_a_key() {
        let session = session(false);
        run(&session, r#"add-book "The  Dispossessed""#).await;
        let text = run(&session, "add-book The  Dispossessed").await;
        assert!(text.contains("already exists."));
        assert_eq!(session.coordinator().catalog().book_count(), 1);

        let text = run(&session, "checkout The Dispossessed --user Shevek").await;
        assert!(text.contains("Book checked out successfully."));
    }

    #[tokio::test]
    async fn duplicate_add_is_reported_not_fatal() {
        let session = session(false);
        run(&session, "add-user Alice").await;
        let text = run(&session, "add-user alice").await;
        assert!(text.contains("User 'alice' already exists."));
        assert_eq!(session.coordinator().catalog().user_count(), 1);
    }

    #[tokio::test]
    async fn json_lines_carry_status() {
        let session = session(true);
        let text = run(&session, "search Dune").await;
        let value: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(value["command"], "search");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["data"]["status"], "book_not_found");
        assert_eq!(value["data"]["success"], false);
    }

    #[tokio::test]
    async fn unknown_command_keeps_session_alive() {
        let session = session(false);
        let mut buf = Vec::new();
        let flow = session.execute("frobnicate", &mut buf).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(String::from_utf8(buf).unwrap().starts_with("error: Invalid argument"));
    }

    #[tokio::test]
    async fn script_stops_at_quit_and_skips_comments() {
        let session = session(false);
        let script = "# seed\nadd-book Dune\n\nquit\nadd-book Hyperion\n";
        let mut buf = Vec::new();
        let executed = session.run_script(script.as_bytes(), &mut buf).await.unwrap();
        assert_eq!(executed, 2);
        assert!(!session.coordinator().catalog().book_exists("Hyperion"));
    }

    #[tokio::test]
    async fn checkout_without_auto_create_reports_missing_user() {
        let mut shell = ShellConfig::default();
        shell.auto_create_users = false;
        let session = Session::new(
            Coordinator::from_config(&Config::default()),
            shell,
            OutputOptions::default(),
        );
        run(&session, "add-book Dune").await;
        let text = run(&session, "checkout Dune --user ghost").await;
        assert!(text.contains("User not found."));
        assert!(text.contains("add-user <NAME>"));
    }
}
