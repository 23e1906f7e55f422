//! `pinpoint-locspec` - location specs for a debug target.
//!
//! Turns human- or tool-authored position strings (`main.go:12`,
//! `(*Conn).Close`, `/^Test/`, `*0x4591c0`, `+5`) into concrete program
//! addresses. Parsing is pure; resolution queries a
//! [`pinpoint_debuginfo::DebugInfoProvider`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod offset;
mod resolve;
mod spec;

pub use error::LocateError;
pub use offset::{
    parse_offset_expr, LineOffset, LineOffsetExpr, LineOffsetOp, LineOffsetTerm, OffsetExprError,
};
pub use resolve::{resolve, MAX_CANDIDATES};
pub use spec::{parse, strip_receiver_decoration, FunctionSpec, LocationSpec};

/// Parse a location string and resolve it in one step.
pub fn find(
    provider: &dyn pinpoint_debuginfo::DebugInfoProvider,
    scope: Option<&pinpoint_debuginfo::Scope>,
    text: &str,
) -> Result<Vec<u64>, LocateError> {
    let spec = parse(text)?;
    resolve(provider, scope, &spec, text)
}
