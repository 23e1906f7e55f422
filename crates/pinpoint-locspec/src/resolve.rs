//! Spec resolution against a debug info provider.
//!
//! Resolution turns a parsed [`LocationSpec`] into concrete addresses.
//! Each variant has its own matching and ambiguity policy; only the
//! normal variant can be ambiguous, and it reports at most
//! [`MAX_CANDIDATES`] names.

use regex::Regex;
use tracing::debug;

use pinpoint_debuginfo::{DebugInfoProvider, EvalValue, Scope};

use crate::error::LocateError;
use crate::offset::LineOffset;
use crate::spec::{parse_int_literal, partial_path_match, FunctionSpec, LocationSpec};

/// Cap on candidate names collected for a normal spec.
pub const MAX_CANDIDATES: usize = 5;

/// A named match collected while resolving a normal spec.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    /// A source file whose path matched the base.
    File(String),
    /// A function symbol whose name satisfied the function spec.
    Function(String),
}

impl Candidate {
    fn name(&self) -> &str {
        match self {
            Candidate::File(name) | Candidate::Function(name) => name,
        }
    }
}

/// Resolve a parsed spec to one or more addresses.
///
/// `scope` supplies the current frame for relative and expression specs;
/// passing `None` is valid for specs that do not need one. `text` is the
/// original location string, used only in error messages.
pub fn resolve(
    provider: &dyn DebugInfoProvider,
    scope: Option<&Scope>,
    spec: &LocationSpec,
    text: &str,
) -> Result<Vec<u64>, LocateError> {
    match spec {
        LocationSpec::Regex { pattern } => resolve_regex(provider, pattern),
        LocationSpec::Addr { expr } => resolve_addr(provider, scope, expr),
        LocationSpec::Normal {
            base,
            function,
            offset,
        } => resolve_normal(provider, base, function.as_ref(), offset, text),
        LocationSpec::Offset { delta } => {
            let scope = scope.ok_or(LocateError::ScopeRequired)?;
            let (file, line, _) = provider.address_to_line(scope.pc)?;
            let target = checked_line(i64::try_from(line).unwrap_or(i64::MAX).saturating_add(*delta))?;
            Ok(vec![provider.file_line_address(&file, target)?])
        }
        LocationSpec::Line { offset } => {
            let scope = scope.ok_or(LocateError::ScopeRequired)?;
            let (file, _, _) = provider.address_to_line(scope.pc)?;
            let line = offset.eval(&file, 0)?;
            Ok(vec![provider.file_line_address(&file, line)?])
        }
    }
}

/// Every function whose fully qualified name matches the pattern, entry
/// past the prologue. Individual resolution failures are skipped; this
/// variant exists to trace many functions at once, so a large match set is
/// not an ambiguity.
fn resolve_regex(provider: &dyn DebugInfoProvider, pattern: &str) -> Result<Vec<u64>, LocateError> {
    let rx = Regex::new(pattern).map_err(|err| LocateError::Malformed {
        offset: 0,
        reason: format!("malformed regular expression: {err}"),
    })?;
    let mut addrs = Vec::new();
    for sym in provider.functions()? {
        if !rx.is_match(&sym.name) {
            continue;
        }
        match provider.function_entry(&sym.name, true) {
            Ok(addr) => addrs.push(addr),
            Err(err) => debug!(function = %sym.name, %err, "skipping unresolvable match"),
        }
    }
    Ok(addrs)
}

fn resolve_addr(
    provider: &dyn DebugInfoProvider,
    scope: Option<&Scope>,
    expr: &str,
) -> Result<Vec<u64>, LocateError> {
    let Some(scope) = scope else {
        // Without a frame only literal addresses can be resolved.
        let addr = parse_int_literal(expr).ok_or(LocateError::ScopeRequired)?;
        #[allow(clippy::cast_sign_loss)]
        return Ok(vec![addr as u64]);
    };
    match provider.evaluate(scope, expr)? {
        EvalValue::Int(addr) => Ok(vec![addr]),
        EvalValue::Func { base } => {
            let (_, _, function) = provider.address_to_line(base)?;
            Ok(vec![provider.function_entry(&function, true)?])
        }
        EvalValue::Other(kind) => Err(LocateError::WrongKind(kind)),
    }
}

fn resolve_normal(
    provider: &dyn DebugInfoProvider,
    base: &str,
    function: Option<&FunctionSpec>,
    offset: &LineOffset,
    text: &str,
) -> Result<Vec<u64>, LocateError> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut truncated = false;

    for file in provider.source_files()? {
        if partial_path_match(base, &file) {
            if candidates.len() == MAX_CANDIDATES {
                truncated = true;
                break;
            }
            candidates.push(Candidate::File(file));
        }
    }

    if let (Some(spec), false) = (function, truncated) {
        for sym in provider.functions()? {
            if spec.matches(&sym) {
                if candidates.len() == MAX_CANDIDATES {
                    truncated = true;
                    break;
                }
                candidates.push(Candidate::Function(sym.name.to_string()));
            }
        }
    }

    match candidates.as_slice() {
        [] => Err(LocateError::NotFound(format!("location \"{text}\""))),

        [Candidate::File(file)] => {
            let LineOffset::Expr(expr) = offset else {
                return Err(LocateError::Malformed {
                    offset: 0,
                    reason: "no line offset specified".to_string(),
                });
            };
            let line = expr.eval(file, 0)?;
            Ok(vec![provider.file_line_address(file, line)?])
        }

        [Candidate::Function(name)] => {
            let entry = provider.function_entry(name, matches!(offset, LineOffset::None))?;
            if let LineOffset::Expr(expr) = offset {
                let (file, start, _) = provider.address_to_line(entry)?;
                let line = expr.eval(&file, start)?;
                return Ok(vec![provider.file_line_address(&file, line)?]);
            }
            Ok(vec![entry])
        }

        _ => Err(LocateError::Ambiguous {
            location: text.to_string(),
            candidates: candidates.iter().map(|c| c.name().to_string()).collect(),
            truncated,
        }),
    }
}

fn checked_line(line: i64) -> Result<u64, LocateError> {
    u64::try_from(line).map_err(|_| LocateError::NotFound(format!("line {line}")))
}
