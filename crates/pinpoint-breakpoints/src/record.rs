//! Persisted breakpoint records and their live-session counterparts.

use std::fmt::Write as _;
use std::fs;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A breakpoint as saved across sessions.
///
/// Invariant: while `enabled`, `(filename, line)` addresses a line that
/// belongs to `function`'s current compiled body; the reconciler restores
/// the invariant after a rebuild. `commands` is an opaque
/// newline-separated amend script replayed verbatim by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedBreakpoint {
    /// User-visible breakpoint name, unique within a store.
    pub name: SmolStr,
    /// Fully qualified name of the containing function.
    pub function: SmolStr,
    /// Source file the breakpoint lives in.
    pub filename: String,
    /// 1-based source line.
    pub line: u64,
    /// Snapshot of the source line's text, taken when the breakpoint was
    /// first observed; reconciliation trusts this over the line number.
    #[serde(default)]
    pub line_text: String,
    /// Whether the breakpoint should exist in the debuggee.
    #[serde(default)]
    pub enabled: bool,
    /// Tracepoints log and continue instead of stopping.
    #[serde(default)]
    pub tracepoint: bool,
    /// Amend-command script, one tab-indented command per line.
    #[serde(default)]
    pub commands: String,
    /// Live breakpoint id for the current session only.
    #[serde(skip)]
    pub id: i64,
}

/// A breakpoint as reported by the live debugger session.
///
/// Negative ids mark debugger-internal breakpoints, which are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBreakpoint {
    /// Debugger-assigned id.
    pub id: i64,
    /// User-assigned name; empty when the debugger numbered it.
    pub name: SmolStr,
    /// Fully qualified containing function name.
    pub function: SmolStr,
    /// Source file.
    pub file: String,
    /// 1-based source line.
    pub line: u64,
    /// Log-and-continue breakpoint.
    pub tracepoint: bool,
    /// Stop condition expression.
    pub condition: Option<String>,
    /// Whether to report the goroutine on stop.
    pub goroutine: bool,
    /// Stack depth to capture on stop, 0 for none.
    pub stacktrace: u64,
    /// Argument loading on stop.
    pub load_args: Option<LoadDetail>,
    /// Local-variable loading on stop.
    pub load_locals: Option<LoadDetail>,
    /// Expressions printed on stop.
    pub print_exprs: Vec<String>,
}

/// How much of a variable set to load when a breakpoint hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDetail {
    /// Shallow values only.
    Short,
    /// Full recursive loading.
    Full,
}

impl LiveBreakpoint {
    /// Render the breakpoint's stop behavior as an amend-command script.
    ///
    /// The script is replayed verbatim by the host on restore; the store
    /// never interprets it.
    #[must_use]
    pub fn commands_script(&self) -> String {
        let mut script = String::new();
        if let Some(condition) = &self.condition {
            if !condition.is_empty() {
                let _ = writeln!(script, "\tcond {condition}");
            }
        }
        if self.goroutine {
            script.push_str("\tgoroutine\n");
        }
        if self.stacktrace > 0 {
            let _ = writeln!(script, "\tstack {}", self.stacktrace);
        }
        match self.load_args {
            Some(LoadDetail::Short) => script.push_str("\targs\n"),
            Some(LoadDetail::Full) => script.push_str("\targs -v\n"),
            None => {}
        }
        match self.load_locals {
            Some(LoadDetail::Short) => script.push_str("\tlocals\n"),
            Some(LoadDetail::Full) => script.push_str("\tlocals -v\n"),
            None => {}
        }
        for expr in &self.print_exprs {
            let _ = writeln!(script, "\tprint {expr}");
        }
        script
    }
}

/// Read the text of `line` (1-based) from `file`.
///
/// Returns the empty string when the file is unreadable or too short, so a
/// later reconciliation can only fail the comparison, never crash.
#[must_use]
pub fn line_text(file: &str, line: u64) -> String {
    let Ok(text) = fs::read_to_string(file) else {
        return String::new();
    };
    let Some(index) = line.checked_sub(1) else {
        return String::new();
    };
    text.lines()
        .nth(usize::try_from(index).unwrap_or(usize::MAX))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> LiveBreakpoint {
        LiveBreakpoint {
            id: 1,
            name: "b1".into(),
            function: "main.main".into(),
            file: "/src/main.go".to_string(),
            line: 12,
            tracepoint: false,
            condition: None,
            goroutine: false,
            stacktrace: 0,
            load_args: None,
            load_locals: None,
            print_exprs: Vec::new(),
        }
    }

    #[test]
    fn empty_behavior_yields_empty_script() {
        assert_eq!(live().commands_script(), "");
    }

    #[test]
    fn script_covers_every_amend_command() {
        let bp = LiveBreakpoint {
            condition: Some("x == nil".to_string()),
            goroutine: true,
            stacktrace: 8,
            load_args: Some(LoadDetail::Short),
            load_locals: Some(LoadDetail::Full),
            print_exprs: vec!["x".to_string(), "y.z".to_string()],
            ..live()
        };
        assert_eq!(
            bp.commands_script(),
            "\tcond x == nil\n\tgoroutine\n\tstack 8\n\targs\n\tlocals -v\n\tprint x\n\tprint y.z\n"
        );
    }
}
