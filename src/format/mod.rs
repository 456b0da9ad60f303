//! Code Formatting Module
//!
//! Templates emit valid Go with tab indentation but without gofmt's column
//! alignment of struct fields, and multi-field call records stay on one
//! line. When `gofmt` is on the PATH the CLI passes its output through it,
//! which aligns the columns and rejects syntax errors before a file is
//! written.

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

const GOFMT: &str = "gofmt";

/// Format Go code with gofmt, or return it unchanged when gofmt is missing
pub fn format_go(code: &str) -> Result<String, FormatError> {
    match find_gofmt() {
        Some(gofmt) => run_gofmt(&gofmt, code),
        None => {
            tracing::debug!("gofmt not found, leaving output unformatted");
            Ok(code.to_string())
        }
    }
}

/// Whether gofmt can be found on the PATH
pub fn is_formatter_available() -> bool {
    find_gofmt().is_some()
}

fn find_gofmt() -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        [GOFMT, "gofmt.exe"]
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

fn run_gofmt(gofmt: &PathBuf, code: &str) -> Result<String, FormatError> {
    let mut child = Command::new(gofmt)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(FormatError::Spawn)?;

    // gofmt reads all of stdin before writing, so this cannot fill the pipe
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(code.as_bytes())
            .map_err(FormatError::Spawn)?;
    }

    let output = child.wait_with_output().map_err(FormatError::Spawn)?;
    if !output.status.success() {
        return Err(FormatError::Rejected(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    String::from_utf8(output.stdout).map_err(|e| FormatError::Rejected(e.to_string()))
}

/// Formatting errors
#[derive(Error, Debug)]
pub enum FormatError {
    /// gofmt could not be started or talked to
    #[error("failed to run gofmt: {0}")]
    Spawn(#[source] std::io::Error),
    /// gofmt refused the code
    #[error("gofmt rejected the generated code: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_go_keeps_valid_code() {
        let code = "package fakes\n\ntype FakeStore struct {\n\tmutex int\n}\n";
        let formatted = format_go(code).unwrap();
        assert_eq!(formatted, code);
    }

    #[test]
    fn test_format_go_aligns_struct_fields() {
        if !is_formatter_available() {
            return;
        }
        let code = "package fakes\n\ntype FakeStore struct {\n\tGetStub func()\n\tgetCalls []struct{}\n}\n";
        let formatted = format_go(code).unwrap();
        assert!(formatted.contains("\tGetStub  func()\n\tgetCalls []struct{}\n"));
    }

    #[test]
    fn test_format_go_rejects_invalid_code() {
        if !is_formatter_available() {
            return;
        }
        let err = format_go("package fakes\n\nfunc {\n").unwrap_err();
        assert!(matches!(err, FormatError::Rejected(_)));
    }
}
