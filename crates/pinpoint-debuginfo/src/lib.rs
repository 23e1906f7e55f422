//! `pinpoint-debuginfo` - debug info provider interface.
//!
//! The resolver and the breakpoint reconciler never read symbol tables or
//! instruction streams themselves; they query a [`DebugInfoProvider`]
//! supplied by the process-control layer. This crate defines that trait and
//! the symbol, scope, and instruction types that cross it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Failures reported by a [`DebugInfoProvider`].
#[derive(Debug, Error)]
pub enum DebugInfoError {
    /// The requested function, file, or line has no address.
    #[error("{0} not found")]
    NotFound(String),

    /// A source file or the target binary could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying expression evaluator failed.
    #[error("{0}")]
    Eval(String),
}

/// A function symbol from the target's symbol table.
///
/// `name` is the fully qualified dotted name; the remaining fields are its
/// components as the debug info records them. The receiver may carry
/// pointer decoration (`(*T)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    /// Fully qualified name, e.g. `net/http.(*Server).Serve`.
    pub name: SmolStr,
    /// Package path component, empty for package-less symbols.
    pub package_name: SmolStr,
    /// Receiver component, empty for plain functions.
    pub receiver_name: SmolStr,
    /// Final name component.
    pub base_name: SmolStr,
}

impl FunctionSymbol {
    /// Build a symbol from its components, deriving the qualified name.
    pub fn new(package: &str, receiver: &str, base: &str) -> Self {
        let mut name = String::new();
        for part in [package, receiver, base] {
            if part.is_empty() {
                continue;
            }
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(part);
        }
        Self {
            name: name.into(),
            package_name: package.into(),
            receiver_name: receiver.into(),
            base_name: base.into(),
        }
    }
}

/// Current-frame context for relative specs and address expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    /// Program counter of the selected frame.
    pub pc: u64,
}

/// Result of evaluating an address expression in a frame scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalValue {
    /// Integer-kind result; the numeric value is the address.
    Int(u64),
    /// Function-kind result; `base` lies inside the function's body.
    Func {
        /// An address inside the target function.
        base: u64,
    },
    /// Any other kind, named for error reporting.
    Other(SmolStr),
}

/// Source attribution of one disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Source file the instruction was compiled from.
    pub file: String,
    /// 1-based source line.
    pub line: u64,
    /// Whether the instruction is at the current program counter.
    pub at_pc: bool,
}

/// Read-only queries against a compiled target's debug information.
///
/// All calls are synchronous. Implementations are supplied by the
/// process-control layer; the core never caches across calls.
pub trait DebugInfoProvider {
    /// Every function symbol known to the target.
    fn functions(&self) -> Result<Vec<FunctionSymbol>, DebugInfoError>;

    /// Every source file path referenced by the target's line table.
    fn source_files(&self) -> Result<Vec<String>, DebugInfoError>;

    /// Entry address of the named function, optionally past the prologue.
    fn function_entry(&self, name: &str, skip_prologue: bool) -> Result<u64, DebugInfoError>;

    /// First address attributed to `file:line`.
    fn file_line_address(&self, file: &str, line: u64) -> Result<u64, DebugInfoError>;

    /// Source position and containing function of an address.
    fn address_to_line(&self, addr: u64) -> Result<(String, u64, SmolStr), DebugInfoError>;

    /// Instruction-level source attribution for the function at `entry`.
    fn disassemble(&self, entry: u64) -> Result<Vec<Instruction>, DebugInfoError>;

    /// Evaluate an expression in the given frame scope.
    fn evaluate(&self, scope: &Scope, expr: &str) -> Result<EvalValue, DebugInfoError>;
}
