//! Breakpoint reconciliation after a rebuild.
//!
//! A rebuild shifts line numbers but usually preserves source text, so the
//! saved line number is only a hint: the saved line text is authoritative.
//! Reconciliation re-derives a valid line from the function's current
//! instruction attribution, or declares the breakpoint gone.

use std::fs;

use smol_str::SmolStr;
use thiserror::Error;

use pinpoint_debuginfo::DebugInfoProvider;

use crate::record::PersistedBreakpoint;

/// Result of reconciling one record against the rebuilt target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The saved line still carries the saved text.
    Unchanged,
    /// The statement moved; the record should adopt this line.
    Updated {
        /// New 1-based line for the breakpoint.
        line: u64,
    },
    /// The breakpoint cannot be placed anymore and should be removed.
    Dropped(DropReason),
}

/// Why a record could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    /// No function symbol carries the saved name anymore.
    #[error("function {0} not found")]
    FunctionNotFound(SmolStr),
    /// More than one symbol carries the saved name.
    #[error("function {0} is ambiguous")]
    FunctionAmbiguous(SmolStr),
    /// The function's entry or instruction stream was unavailable.
    #[error("could not disassemble {0}: {1}")]
    Disassembly(SmolStr, String),
    /// An instruction is attributed to a file other than the saved one;
    /// the function has structurally changed and nothing in it is trusted.
    #[error("function {function} has instructions in {file}")]
    ForeignFile {
        /// The saved function name.
        function: SmolStr,
        /// The unexpected file.
        file: String,
    },
    /// The function compiled to no instructions in the saved file.
    #[error("function {0} compiles to no source lines")]
    NoLines(SmolStr),
    /// The saved source file could not be read.
    #[error("could not read {0}: {1}")]
    SourceUnreadable(String, String),
    /// No line of the function carries the saved text anymore.
    #[error("statement no longer exists in {0}")]
    LineVanished(String),
}

/// Re-derive a valid line for `record` against the current target.
///
/// Never mutates the record; the owning store applies `Updated` lines and
/// removes `Dropped` records. All failures fold into
/// [`ReconcileOutcome::Dropped`] so one bad record cannot abort a batch.
pub fn reconcile(
    provider: &dyn DebugInfoProvider,
    record: &PersistedBreakpoint,
) -> ReconcileOutcome {
    let function = record.function.clone();
    let dropped = ReconcileOutcome::Dropped;

    let symbols = match provider.functions() {
        Ok(symbols) => symbols,
        Err(err) => return dropped(DropReason::Disassembly(function, err.to_string())),
    };
    match symbols.iter().filter(|s| s.name == function).count() {
        0 => return dropped(DropReason::FunctionNotFound(function)),
        1 => {}
        _ => return dropped(DropReason::FunctionAmbiguous(function)),
    }

    let entry = match provider.function_entry(&function, false) {
        Ok(entry) => entry,
        Err(err) => return dropped(DropReason::Disassembly(function, err.to_string())),
    };
    let instructions = match provider.disassemble(entry) {
        Ok(instructions) => instructions,
        Err(err) => return dropped(DropReason::Disassembly(function, err.to_string())),
    };

    let mut lines: Vec<u64> = Vec::new();
    for instruction in instructions {
        if instruction.file != record.filename {
            return dropped(DropReason::ForeignFile {
                function,
                file: instruction.file,
            });
        }
        lines.push(instruction.line);
    }
    if lines.is_empty() {
        return dropped(DropReason::NoLines(function));
    }
    lines.sort_unstable();
    lines.dedup();

    let text = match fs::read_to_string(&record.filename) {
        Ok(text) => text,
        Err(err) => {
            return dropped(DropReason::SourceUnreadable(
                record.filename.clone(),
                err.to_string(),
            ));
        }
    };
    let file_lines: Vec<&str> = text.lines().collect();
    let at = |line: u64| {
        line.checked_sub(1)
            .and_then(|idx| file_lines.get(usize::try_from(idx).ok()?))
            .copied()
    };

    if at(record.line) == Some(record.line_text.as_str()) {
        return ReconcileOutcome::Unchanged;
    }
    for line in lines {
        if at(line) == Some(record.line_text.as_str()) {
            return ReconcileOutcome::Updated { line };
        }
    }
    dropped(DropReason::LineVanished(record.filename.clone()))
}
