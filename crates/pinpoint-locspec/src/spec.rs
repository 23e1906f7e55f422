//! Location-spec parsing.
//!
//! A location string names a position in the target program: a function,
//! a file and line, a raw address, a line relative to the current one, or
//! a function-name regex. Parsing dispatches on the first character and
//! never touches the target; resolution happens in [`crate::resolve`].

use smol_str::SmolStr;

use pinpoint_debuginfo::FunctionSymbol;

use crate::error::LocateError;
use crate::offset::{parse_offset_expr, read_regex, LineOffset, LineOffsetExpr};

/// A parsed location spec. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSpec {
    /// `base[:offset]` — a file path or dotted function name.
    Normal {
        /// The raw base string (before the colon, if any).
        base: String,
        /// Function interpretation of `base`, when it has one.
        function: Option<FunctionSpec>,
        /// Line offset following the colon.
        offset: LineOffset,
    },
    /// `/pattern/` — matched against fully qualified function names.
    Regex {
        /// The unescaped pattern.
        pattern: String,
    },
    /// `*expr` — a literal address or an evaluable expression.
    Addr {
        /// The raw expression text after the `*`.
        expr: String,
    },
    /// `+N` / `-N` — a line delta from the current location.
    Offset {
        /// Signed line delta.
        delta: i64,
    },
    /// A bare line number or offset expression in the current file.
    Line {
        /// Offset expression evaluated from line 0 of the current file.
        offset: LineOffsetExpr,
    },
}

/// Function interpretation of a dotted base name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionSpec {
    /// Package path, matched as a suffix unless `absolute_package`.
    pub package_name: SmolStr,
    /// Whether the package must match exactly.
    pub absolute_package: bool,
    /// Receiver type, decoration already stripped.
    pub receiver_name: SmolStr,
    /// A middle component that could be either a package or a receiver.
    pub package_or_receiver_name: SmolStr,
    /// Final name component; must match exactly.
    pub base_name: SmolStr,
}

/// Parse a location string into a [`LocationSpec`].
pub fn parse(text: &str) -> Result<LocationSpec, LocateError> {
    let malformed = |reason: String| LocateError::Malformed { offset: 0, reason };

    if text.is_empty() {
        return Err(malformed("empty string".to_string()));
    }

    match text.as_bytes()[0] {
        b'+' | b'-' => match text.parse::<i64>() {
            Ok(delta) => Ok(LocationSpec::Offset { delta }),
            Err(err) => Err(malformed(err.to_string())),
        },

        b'/' if text.len() >= 2 && text.ends_with('/') => {
            let (pattern, rest) = read_regex(&text[1..]);
            if rest.is_empty() {
                // The closing slash was consumed by an escape.
                return Err(malformed("non-terminated regular expression".to_string()));
            }
            if rest.len() > 1 {
                return Err(malformed(
                    "no line offset can be specified for regular expression locations".to_string(),
                ));
            }
            Ok(LocationSpec::Regex { pattern })
        }

        b'*' => Ok(LocationSpec::Addr {
            expr: text[1..].to_string(),
        }),

        // A lone `/…` with no closing slash is a file path.
        _ => parse_default(text),
    }
}

fn parse_default(text: &str) -> Result<LocationSpec, LocateError> {
    // Split on the last colon so absolute Windows paths keep their drive
    // letter in the base.
    let (base, rest) = match text.rfind(':') {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };

    if rest.is_none() {
        if let Some(line) = parse_int_literal(base) {
            if let Ok(count) = u64::try_from(line) {
                return Ok(LocationSpec::Line {
                    offset: LineOffsetExpr::forward(count),
                });
            }
        }
    }

    let offset = match rest {
        None => LineOffset::None,
        Some(expr_text) => {
            let expr = parse_offset_expr(expr_text).map_err(|err| LocateError::Malformed {
                offset: base.len() + 1 + err.offset,
                reason: err.reason,
            })?;
            LineOffset::from_expr(expr)
        }
    };

    Ok(LocationSpec::Normal {
        base: base.to_string(),
        function: FunctionSpec::parse(base),
        offset,
    })
}

impl FunctionSpec {
    /// Split a dotted name into its 1–3 components.
    ///
    /// Returns `None` when the split produces more than three components
    /// or a path separator ends up in the base or receiver, in which case
    /// no function match is attempted for the spec.
    #[must_use]
    pub fn parse(base: &str) -> Option<FunctionSpec> {
        let parts: Vec<&str> = base.split('.').collect();
        let mut spec = FunctionSpec::default();

        match parts.len() {
            1 => spec.base_name = parts[0].into(),
            2 => {
                spec.base_name = parts[1].into();
                let stripped = strip_receiver_decoration(parts[0]);
                if stripped != parts[0] {
                    spec.receiver_name = stripped.into();
                } else if stripped.contains('/') {
                    spec.package_name = stripped.into();
                } else {
                    spec.package_or_receiver_name = stripped.into();
                }
            }
            3 => {
                spec.base_name = parts[2].into();
                spec.receiver_name = strip_receiver_decoration(parts[1]).into();
                spec.package_name = parts[0].into();
            }
            _ => return None,
        }

        if let Some(package) = spec.package_name.strip_prefix('/').map(SmolStr::new) {
            spec.package_name = package;
            spec.absolute_package = true;
        }

        if spec.base_name.contains('/') || spec.receiver_name.contains('/') {
            return None;
        }

        Some(spec)
    }

    /// Whether a function symbol satisfies this spec.
    #[must_use]
    pub fn matches(&self, sym: &FunctionSymbol) -> bool {
        if self.base_name != sym.base_name {
            return false;
        }
        let receiver = strip_receiver_decoration(&sym.receiver_name);
        if !self.receiver_name.is_empty() && self.receiver_name != receiver {
            return false;
        }
        if !self.package_name.is_empty() {
            if self.absolute_package {
                if self.package_name != sym.package_name {
                    return false;
                }
            } else if !partial_path_match(&self.package_name, &sym.package_name) {
                return false;
            }
        }
        if !self.package_or_receiver_name.is_empty()
            && !partial_path_match(&self.package_or_receiver_name, &sym.package_name)
            && self.package_or_receiver_name != receiver
        {
            return false;
        }
        true
    }
}

/// Strip `(*T)` pointer decoration from a receiver name.
#[must_use]
pub fn strip_receiver_decoration(name: &str) -> &str {
    if name.len() < 3 {
        return name;
    }
    let bytes = name.as_bytes();
    if bytes[0] != b'(' || bytes[1] != b'*' || bytes[name.len() - 1] != b')' {
        return name;
    }
    &name[2..name.len() - 1]
}

/// Whether `expr` matches `path` exactly or as a path suffix starting at a
/// separator boundary.
pub(crate) fn partial_path_match(expr: &str, path: &str) -> bool {
    if cfg!(windows) {
        // Case-insensitive and slash-insensitive on Windows.
        let expr = expr.replace('\\', "/").to_ascii_lowercase();
        let path = path.replace('\\', "/").to_ascii_lowercase();
        return suffix_at_boundary(&expr, &path);
    }
    suffix_at_boundary(expr, path)
}

fn suffix_at_boundary(expr: &str, path: &str) -> bool {
    if expr.len() + 1 < path.len() {
        path.ends_with(expr) && path.as_bytes()[path.len() - expr.len() - 1] == b'/'
    } else {
        expr == path
    }
}

pub(crate) fn parse_int_literal(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => (false, text),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}
