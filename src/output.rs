//! Shared output formatting for stacks commands.
//!
//! Every report goes out either as a JSON envelope or as a human block
//! (header, summary, details, warnings, next steps). Writers are injected so
//! the shell can render into any sink.

use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "stacks.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

/// Emit a command report.
///
/// `success` selects the envelope status. Failed outcomes are still
/// reports, not errors: a missing book is an answer, not a crash.
pub fn emit_report<W: Write, T: Serialize>(
    out: &mut W,
    options: OutputOptions,
    command: &str,
    success: bool,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: if success { "success" } else { "failed" },
            data,
            warnings,
            next_steps,
        };

        writeln!(out, "{}", serde_json::to_string(&payload)?)?;
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        writeln!(out, "{}", format_human(human))?;
    }

    Ok(())
}

/// Emit a successful command report
pub fn emit_success<W: Write, T: Serialize>(
    out: &mut W,
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    emit_report(out, options, command, true, data, human)
}

pub fn emit_error<W: Write>(out: &mut W, command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };

        writeln!(out, "{}", serde_json::to_string(&payload)?)?;
        return Ok(());
    }

    writeln!(out, "error: {err}")?;
    if let Some(hint) = next_steps.first() {
        writeln!(out, "hint: {hint}")?;
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// First positional argument, used to label top-level error envelopes
pub fn infer_command_name_from_args() -> String {
    std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with('-'))
        .unwrap_or_else(|| "stacks".to_string())
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "conflict",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::DuplicateKey { kind, key } => match kind {
            crate::error::KeyKind::Book => vec![format!("search {key}")],
            crate::error::KeyKind::User => vec!["users".to_string()],
        },
        Error::LockTimeout { .. } => vec!["retry, or raise [locks] timeout_ms".to_string()],
        Error::InvalidConfig(_) => vec!["fix .stacks.toml then retry".to_string()],
        Error::InvalidArgument(_) => vec!["help".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyKind;

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("emit");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn json_report_marks_failed_outcomes() {
        let text = render(|out| {
            emit_report(
                out,
                OutputOptions { json: true, quiet: false },
                "search",
                false,
                &serde_json::json!({ "title": "Dune" }),
                None,
            )
        });
        let value: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
        assert_eq!(value["command"], "search");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["data"]["title"], "Dune");
    }

    #[test]
    fn quiet_suppresses_human_output() {
        let human = HumanOutput::new("Book added.");
        let text = render(|out| {
            emit_success(
                out,
                OutputOptions { json: false, quiet: true },
                "add-book",
                &(),
                Some(&human),
            )
        });
        assert!(text.is_empty());
    }

    #[test]
    fn error_includes_hint() {
        let err = Error::DuplicateKey {
            kind: KeyKind::Book,
            key: "dune".to_string(),
        };
        let text = render(|out| emit_error(out, "add-book", &err, false));
        assert!(text.contains("error: Duplicate book: 'dune' already exists"));
        assert!(text.contains("hint: search dune"));
    }

    #[test]
    fn json_error_carries_code_and_details() {
        let err = Error::LockTimeout {
            kind: KeyKind::User,
            key: "alice".to_string(),
        };
        let text = render(|out| emit_error(out, "checkout", &err, true));
        let value: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["code"], 3);
        assert_eq!(value["error"]["kind"], "conflict");
        assert_eq!(value["error"]["details"]["key"], "alice");
    }
}
