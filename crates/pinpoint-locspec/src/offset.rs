//! Line-offset expressions.
//!
//! An offset expression is a chain of terms separated by `+` or `-`:
//! a bare count moves that many lines in the operator's direction, and a
//! `N/regex/` term moves to the Nth matching line scanning in the
//! operator's direction. Regex terms read the whole source file into
//! memory per evaluation; source files are assumed to fit.

use std::fs;

use regex::Regex;

use crate::error::LocateError;

/// Direction a term moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOffsetOp {
    /// Toward higher line numbers.
    Forward,
    /// Toward lower line numbers.
    Backward,
}

impl LineOffsetOp {
    fn delta(self) -> i64 {
        match self {
            LineOffsetOp::Forward => 1,
            LineOffsetOp::Backward => -1,
        }
    }
}

/// One term of an offset expression.
#[derive(Debug, Clone)]
pub struct LineOffsetTerm {
    /// Direction this term moves in.
    pub op: LineOffsetOp,
    /// Line count, or match count for regex terms.
    pub count: u64,
    /// Search pattern for regex terms.
    pub regex: Option<Regex>,
}

impl PartialEq for LineOffsetTerm {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
            && self.count == other.count
            && self.regex.as_ref().map(Regex::as_str) == other.regex.as_ref().map(Regex::as_str)
    }
}

/// A parsed offset expression; terms chain left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOffsetExpr {
    /// The terms, in source order.
    pub terms: Vec<LineOffsetTerm>,
}

impl LineOffsetExpr {
    /// A single forward move of `count` lines.
    #[must_use]
    pub fn forward(count: u64) -> Self {
        Self {
            terms: vec![LineOffsetTerm {
                op: LineOffsetOp::Forward,
                count,
                regex: None,
            }],
        }
    }

    /// Whether this is the `+0` no-op expression.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.terms.len() == 1
            && self.terms[0].regex.is_none()
            && self.terms[0].op == LineOffsetOp::Forward
            && self.terms[0].count == 0
    }

    /// Evaluate the chain starting from `base_line` in `file`.
    ///
    /// Each term consumes the line produced by the previous one. Only
    /// regex terms touch the file.
    pub fn eval(&self, file: &str, base_line: u64) -> Result<u64, LocateError> {
        let mut line = i64::try_from(base_line).unwrap_or(i64::MAX);
        for term in &self.terms {
            line = term.eval(file, line)?;
        }
        u64::try_from(line).map_err(|_| LocateError::NotFound(format!("line {line}")))
    }
}

/// The line-offset portion of a normal spec.
///
/// The `+0` expression is its own variant so the resolver can skip
/// re-derivation without inspecting term arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOffset {
    /// No offset was written.
    None,
    /// The explicit `+0` no-op offset.
    Zero,
    /// A non-trivial offset expression.
    Expr(LineOffsetExpr),
}

impl LineOffset {
    pub(crate) fn from_expr(expr: LineOffsetExpr) -> Self {
        if expr.is_noop() {
            LineOffset::Zero
        } else {
            LineOffset::Expr(expr)
        }
    }
}

impl LineOffsetTerm {
    fn eval(&self, file: &str, start: i64) -> Result<i64, LocateError> {
        let Some(rx) = &self.regex else {
            let count = i64::try_from(self.count).unwrap_or(i64::MAX);
            return Ok(start.saturating_add(self.op.delta().saturating_mul(count)));
        };
        let text = fs::read_to_string(file)?;
        let lines: Vec<&str> = text.split('\n').collect();
        let mut line = start;
        let mut found = 0u64;
        // Line numbers are 1-based; the scan includes the starting line.
        while line >= 1 && line <= lines.len() as i64 {
            if rx.is_match(lines[(line - 1) as usize]) {
                found += 1;
            }
            if found >= self.count {
                return Ok(line);
            }
            line += self.op.delta();
        }
        Err(LocateError::NotFound(format!(
            "match for regular expression /{}/",
            rx.as_str()
        )))
    }
}

/// Parse failure inside an offset expression, positioned relative to the
/// expression text (the spec parser maps it back into the full input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetExprError {
    /// Byte offset of the offending character within the expression.
    pub offset: usize,
    /// Human-readable description of the problem.
    pub reason: String,
}

/// Parse an offset expression such as `3/foo/+2`.
pub fn parse_offset_expr(input: &str) -> Result<LineOffsetExpr, OffsetExprError> {
    let mut s = input;
    let mut terms = Vec::new();
    let mut op = LineOffsetOp::Forward;
    let mut can_end = false;

    while !s.is_empty() {
        let ch = s.as_bytes()[0];
        if ch.is_ascii_digit() {
            let (count, rest) = read_int(s);
            s = rest;
            if s.starts_with('/') {
                s = read_regex_term(input, s, op, count, &mut terms)?;
            } else {
                terms.push(LineOffsetTerm {
                    op,
                    count,
                    regex: None,
                });
            }
        } else if ch == b'/' {
            s = read_regex_term(input, s, op, 1, &mut terms)?;
        } else {
            return Err(OffsetExprError {
                offset: input.len() - s.len(),
                reason: format!(
                    "unexpected character {} (expected number or regular expression)",
                    ch as char
                ),
            });
        }

        can_end = true;
        if !s.is_empty() {
            can_end = false;
            op = match s.as_bytes()[0] {
                b'+' => LineOffsetOp::Forward,
                b'-' => LineOffsetOp::Backward,
                other => {
                    return Err(OffsetExprError {
                        offset: input.len() - s.len(),
                        reason: format!(
                            "unexpected character {} (expecting operator)",
                            other as char
                        ),
                    });
                }
            };
            s = &s[1..];
        }
    }

    if !can_end {
        return Err(OffsetExprError {
            offset: input.len(),
            reason: "unexpected end of expression".to_string(),
        });
    }

    Ok(LineOffsetExpr { terms })
}

fn read_regex_term<'a>(
    input: &str,
    s: &'a str,
    op: LineOffsetOp,
    count: u64,
    terms: &mut Vec<LineOffsetTerm>,
) -> Result<&'a str, OffsetExprError> {
    let start = input.len() - s.len();
    let (pattern, rest) = read_regex(&s[1..]);
    if !rest.starts_with('/') {
        return Err(OffsetExprError {
            offset: start,
            reason: "non-terminated regular expression".to_string(),
        });
    }
    let rx = Regex::new(&pattern).map_err(|err| OffsetExprError {
        offset: start,
        reason: format!("malformed regular expression: {err}"),
    })?;
    terms.push(LineOffsetTerm {
        op,
        count,
        regex: Some(rx),
    });
    Ok(&rest[1..])
}

/// Read a `/`-delimited pattern. Backslash escapes only `/`; every other
/// escape passes through literally. Returns the unescaped pattern and the
/// unconsumed input starting at the closing `/`, or `""` if there is none.
pub(crate) fn read_regex(input: &str) -> (String, &str) {
    let mut out = String::with_capacity(input.len());
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        if escaped {
            if ch == '/' {
                out.push('/');
            } else {
                out.push('\\');
                out.push(ch);
            }
            escaped = false;
        } else {
            match ch {
                '\\' => escaped = true,
                '/' => return (out, &input[idx..]),
                _ => out.push(ch),
            }
        }
    }
    (out, "")
}

pub(crate) fn read_int(s: &str) -> (u64, &str) {
    let end = s
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(s.len());
    (s[..end].parse().unwrap_or(0), &s[end..])
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn term(op: LineOffsetOp, count: u64, regex: Option<&str>) -> LineOffsetTerm {
        LineOffsetTerm {
            op,
            count,
            regex: regex.map(|p| Regex::new(p).unwrap()),
        }
    }

    #[test]
    fn parses_chained_terms() {
        let expr = parse_offset_expr("3/foo/+2").unwrap();
        assert_eq!(
            expr.terms,
            vec![
                term(LineOffsetOp::Forward, 3, Some("foo")),
                term(LineOffsetOp::Forward, 2, None),
            ]
        );
    }

    #[test]
    fn operator_sets_direction_of_following_term() {
        let expr = parse_offset_expr("10-/ret/").unwrap();
        assert_eq!(
            expr.terms,
            vec![
                term(LineOffsetOp::Forward, 10, None),
                term(LineOffsetOp::Backward, 1, Some("ret")),
            ]
        );
    }

    #[test]
    fn trailing_operator_is_an_error() {
        let err = parse_offset_expr("3+").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.reason, "unexpected end of expression");
    }

    #[test]
    fn empty_expression_is_an_error() {
        let err = parse_offset_expr("").unwrap_err();
        assert_eq!(err.reason, "unexpected end of expression");
    }

    #[test]
    fn unterminated_regex_is_an_error() {
        let err = parse_offset_expr("/foo").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.reason, "non-terminated regular expression");
    }

    #[test]
    fn stray_character_reports_its_offset() {
        let err = parse_offset_expr("3+x").unwrap_err();
        assert_eq!(err.offset, 2);
        assert!(err.reason.contains("unexpected character x"));
    }

    #[test]
    fn escaped_slash_stays_in_pattern() {
        let expr = parse_offset_expr("/a\\/b/").unwrap();
        assert_eq!(expr.terms[0].regex.as_ref().unwrap().as_str(), "a/b");
    }

    #[test]
    fn zero_forward_term_is_noop() {
        assert!(parse_offset_expr("0").unwrap().is_noop());
        assert!(!parse_offset_expr("1").unwrap().is_noop());
        assert!(!parse_offset_expr("0+0").unwrap().is_noop());
    }

    fn source_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn eval_without_regex_never_reads_the_file() {
        let expr = parse_offset_expr("4+2-1").unwrap();
        assert_eq!(expr.eval("/no/such/file", 10).unwrap(), 15);
    }

    #[test]
    fn regex_term_finds_nth_match_forward() {
        let file = source_file(&["foo a", "bar", "foo b", "baz", "foo c", "tail"]);
        let path = file.path().to_str().unwrap();

        let expr = parse_offset_expr("3/foo/+2").unwrap();
        assert_eq!(expr.eval(path, 1).unwrap(), 7);

        let expr = parse_offset_expr("2/foo/").unwrap();
        assert_eq!(expr.eval(path, 1).unwrap(), 3);
    }

    #[test]
    fn regex_term_scans_backward() {
        let file = source_file(&["foo a", "bar", "foo b", "baz"]);
        let path = file.path().to_str().unwrap();

        let expr = parse_offset_expr("4-/foo/").unwrap();
        assert_eq!(expr.eval(path, 0).unwrap(), 3);
    }

    #[test]
    fn regex_term_errors_off_the_end() {
        let file = source_file(&["foo a", "bar"]);
        let path = file.path().to_str().unwrap();

        let expr = parse_offset_expr("3/foo/").unwrap();
        let err = expr.eval(path, 1).unwrap_err();
        assert!(matches!(err, LocateError::NotFound(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let expr = parse_offset_expr("/foo/").unwrap();
        let err = expr.eval("/no/such/file", 1).unwrap_err();
        assert!(matches!(err, LocateError::Io(_)));
    }
}
