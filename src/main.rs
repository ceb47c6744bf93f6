//! stacks - in-memory library catalog shell
//!
//! Reads catalog commands from stdin or a script and applies them to a
//! fresh in-memory catalog.

use clap::Parser;
use stacks::cli::Cli;
use stacks::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG; ignore invalid/huge filters.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        if json {
            let _ = emit_error(&mut std::io::stdout(), &command, &err, true);
        } else {
            let _ = emit_error(&mut std::io::stderr(), &command, &err, false);
        }
        std::process::exit(err.exit_code());
    }
}
