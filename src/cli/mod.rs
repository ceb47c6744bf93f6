//! Command-line interface for stacks
//!
//! The catalog is in-memory, so the binary is a console shell: commands are
//! read line by line from stdin (`stacks shell`) or from a script file
//! (`stacks run <FILE>`), and each line is dispatched to the core.

use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::output::OutputOptions;

mod shell;

pub use shell::{split_line, Flow, Session};

/// stacks - in-memory library catalog
///
/// Tracks books, users and loans with one borrower per book and a per-user
/// limit, safe under concurrent checkouts.
#[derive(Parser, Debug)]
#[command(name = "stacks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to .stacks.toml, then the user config dir)
    #[arg(long, global = true, env = "STACKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the per-user book limit
    #[arg(long, global = true)]
    pub max_books: Option<usize>,

    /// Output in JSON format (one envelope per line)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive shell reading commands from stdin
    Shell,

    /// Execute a script of shell commands
    Run {
        /// Script file, one command per line
        file: PathBuf,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let cwd = std::env::current_dir()?;
        let mut config = Config::resolve(self.config.as_deref(), &cwd)?;
        if let Some(max_books) = self.max_books {
            if max_books == 0 {
                return Err(Error::InvalidArgument(
                    "--max-books must be at least 1".to_string(),
                ));
            }
            config.loans.max_books_per_user = max_books;
        }

        let options = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let session = Session::new(
            Coordinator::from_config(&config),
            config.shell.clone(),
            options,
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        match self.command {
            Commands::Shell => {
                let stdin = io::stdin();
                runtime.block_on(session.run_interactive(stdin.lock(), &mut out))
            }
            Commands::Run { file } => {
                let script = std::fs::File::open(&file)?;
                tracing::info!(script = %file.display(), "running script");
                runtime
                    .block_on(session.run_script(BufReader::new(script), &mut out))
                    .map(|_| ())
            }
        }
    }
}
