//! Human-editable breakpoint list format.
//!
//! One header line per breakpoint — optional `disabled`, `break` or
//! `trace`, optional name, `file:line` — followed by an informational
//! `in function` line and the tab-indented command script. The format
//! round-trips so an external editor can rewrite the whole set.

use std::fmt::Write as _;

use thiserror::Error;

use crate::record::PersistedBreakpoint;

/// A malformed line in an edited breakpoint list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed line {line}: {reason}")]
pub struct ListError {
    /// 1-based line number in the edited text.
    pub line: usize,
    /// What was wrong with it.
    pub reason: String,
}

const BAD_HEADER: &str =
    "bad header, expected 'disabled', 'break' or 'trace' followed by position";

/// Render records as an editable list.
pub fn render_list<'a>(records: impl IntoIterator<Item = &'a PersistedBreakpoint>) -> String {
    let mut out = String::new();
    for record in records {
        if !record.enabled {
            out.push_str("disabled ");
        }
        out.push_str(if record.tracepoint { "trace " } else { "break " });
        if !record.name.is_empty() {
            out.push_str(&record.name);
            out.push(' ');
        }
        let _ = writeln!(out, "{}:{}", record.filename, record.line);
        let _ = writeln!(out, "\tin function {}", record.function);
        out.push_str(&record.commands);
        if !record.commands.is_empty() && !record.commands.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Parse an edited list back into records.
///
/// The `in function` line is informational and ignored; everything a
/// breakpoint does on stop lives in its command script. File paths are
/// expected to be absolute, which is how a name token is told apart from
/// the position.
pub fn parse_list(text: &str) -> Result<Vec<PersistedBreakpoint>, ListError> {
    let mut records: Vec<PersistedBreakpoint> = Vec::new();
    let mut current: Option<PersistedBreakpoint> = None;
    let mut commands: Vec<&str> = Vec::new();

    fn flush(
        records: &mut Vec<PersistedBreakpoint>,
        current: &mut Option<PersistedBreakpoint>,
        commands: &mut Vec<&str>,
    ) {
        if let Some(mut record) = current.take() {
            record.commands = if commands.is_empty() {
                String::new()
            } else {
                let mut script = commands.join("\n");
                script.push('\n');
                script
            };
            commands.clear();
            records.push(record);
        }
    }

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('\t') {
            if current.is_none() {
                return Err(ListError {
                    line: lineno,
                    reason: "no header".to_string(),
                });
            }
            if !rest.starts_with("in function") {
                commands.push(line);
            }
            continue;
        }

        flush(&mut records, &mut current, &mut commands);

        let bad_header = |reason: &str| ListError {
            line: lineno,
            reason: reason.to_string(),
        };

        let (first, mut rest) = line.split_once(' ').ok_or_else(|| bad_header(BAD_HEADER))?;
        let enabled = first != "disabled";
        let kind = if enabled {
            first
        } else {
            let (kind, tail) = rest.split_once(' ').ok_or_else(|| bad_header(BAD_HEADER))?;
            rest = tail;
            kind
        };
        let tracepoint = match kind {
            "break" => false,
            "trace" => true,
            _ => return Err(bad_header(BAD_HEADER)),
        };

        let mut name = "";
        if !rest.starts_with('/') {
            let (n, tail) = rest.split_once(' ').ok_or_else(|| {
                bad_header("breakpoint name should be followed by position information")
            })?;
            name = n;
            rest = tail;
        }
        if !rest.starts_with('/') {
            return Err(bad_header(
                "breakpoint name should be followed by position information",
            ));
        }

        let (filename, line_str) = rest
            .rsplit_once(':')
            .ok_or_else(|| bad_header("malformed position"))?;
        let line = line_str.parse::<u64>().unwrap_or(0);

        current = Some(PersistedBreakpoint {
            name: name.into(),
            function: "".into(),
            filename: filename.to_string(),
            line,
            line_text: String::new(),
            enabled,
            tracepoint,
            commands: String::new(),
            id: 0,
        });
    }

    flush(&mut records, &mut current, &mut commands);
    Ok(records)
}
