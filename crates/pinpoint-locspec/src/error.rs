//! Parse and resolution errors.

use smol_str::SmolStr;
use thiserror::Error;

use pinpoint_debuginfo::DebugInfoError;

/// Errors produced while parsing or resolving a location spec.
#[derive(Debug, Error)]
pub enum LocateError {
    /// The location string does not follow the grammar. `offset` is the
    /// byte position of the offending character in the original input.
    #[error("malformed location at {offset}: {reason}")]
    Malformed {
        /// Byte offset of the offending character.
        offset: usize,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Zero candidates matched the spec.
    #[error("{0} not found")]
    NotFound(String),

    /// Two or more candidates matched; at most five are listed.
    #[error("location \"{location}\" ambiguous: {}", fmt_candidates(.candidates, .truncated))]
    Ambiguous {
        /// The original location string.
        location: String,
        /// Candidate names, capped at five.
        candidates: Vec<String>,
        /// Whether more candidates exist beyond the listed ones.
        truncated: bool,
    },

    /// The spec needs a current frame and none was supplied.
    #[error("could not determine current location (no current scope)")]
    ScopeRequired,

    /// An address expression evaluated to a non-integer, non-function value.
    #[error("wrong expression kind: {0}")]
    WrongKind(SmolStr),

    /// A source file could not be read during offset evaluation.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The debug info provider failed.
    #[error(transparent)]
    Provider(#[from] DebugInfoError),
}

fn fmt_candidates(candidates: &[String], truncated: &bool) -> String {
    let mut out = candidates.join(", ");
    if *truncated {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_display_marks_truncation() {
        let err = LocateError::Ambiguous {
            location: "Foo".into(),
            candidates: vec!["a.Foo".into(), "b.Foo".into()],
            truncated: true,
        };
        assert_eq!(err.to_string(), "location \"Foo\" ambiguous: a.Foo, b.Foo…");
    }
}
