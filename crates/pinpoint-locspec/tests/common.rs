//! In-memory debug info provider for resolver tests.

use std::collections::{HashMap, HashSet};

use pinpoint_debuginfo::{
    DebugInfoError, DebugInfoProvider, EvalValue, FunctionSymbol, Instruction, Scope,
};

pub struct FakeFunction {
    pub sym: FunctionSymbol,
    pub entry: u64,
    pub post_prologue: u64,
    pub file: String,
    pub decl_line: u64,
}

#[derive(Default)]
pub struct FakeProvider {
    pub functions: Vec<FakeFunction>,
    pub files: Vec<String>,
    /// `(file, line) -> address` line table entries.
    pub lines: Vec<(String, u64, u64)>,
    /// Canned expression results.
    pub evals: HashMap<String, EvalValue>,
    /// Functions whose entry cannot be resolved.
    pub broken: HashSet<String>,
}

impl FakeProvider {
    pub fn add_function(
        &mut self,
        package: &str,
        receiver: &str,
        base: &str,
        entry: u64,
        file: &str,
        decl_line: u64,
    ) {
        self.functions.push(FakeFunction {
            sym: FunctionSymbol::new(package, receiver, base),
            entry,
            post_prologue: entry + 4,
            file: file.to_string(),
            decl_line,
        });
        if !self.files.iter().any(|f| f == file) {
            self.files.push(file.to_string());
        }
    }

    pub fn add_line(&mut self, file: &str, line: u64, addr: u64) {
        self.lines.push((file.to_string(), line, addr));
    }
}

impl DebugInfoProvider for FakeProvider {
    fn functions(&self) -> Result<Vec<FunctionSymbol>, DebugInfoError> {
        Ok(self.functions.iter().map(|f| f.sym.clone()).collect())
    }

    fn source_files(&self) -> Result<Vec<String>, DebugInfoError> {
        Ok(self.files.clone())
    }

    fn function_entry(&self, name: &str, skip_prologue: bool) -> Result<u64, DebugInfoError> {
        if self.broken.contains(name) {
            return Err(DebugInfoError::NotFound(format!("function {name}")));
        }
        let func = self
            .functions
            .iter()
            .find(|f| f.sym.name == name)
            .ok_or_else(|| DebugInfoError::NotFound(format!("function {name}")))?;
        Ok(if skip_prologue {
            func.post_prologue
        } else {
            func.entry
        })
    }

    fn file_line_address(&self, file: &str, line: u64) -> Result<u64, DebugInfoError> {
        self.lines
            .iter()
            .find(|(f, l, _)| f == file && *l == line)
            .map(|(_, _, addr)| *addr)
            .ok_or_else(|| DebugInfoError::NotFound(format!("{file}:{line}")))
    }

    fn address_to_line(
        &self,
        addr: u64,
    ) -> Result<(String, u64, smol_str::SmolStr), DebugInfoError> {
        self.functions
            .iter()
            .find(|f| addr == f.entry || addr == f.post_prologue)
            .map(|f| (f.file.clone(), f.decl_line, f.sym.name.clone()))
            .ok_or_else(|| DebugInfoError::NotFound(format!("address {addr:#x}")))
    }

    fn disassemble(&self, entry: u64) -> Result<Vec<Instruction>, DebugInfoError> {
        Err(DebugInfoError::NotFound(format!("disassembly at {entry:#x}")))
    }

    fn evaluate(&self, _scope: &Scope, expr: &str) -> Result<EvalValue, DebugInfoError> {
        self.evals
            .get(expr)
            .cloned()
            .ok_or_else(|| DebugInfoError::Eval(format!("could not evaluate {expr}")))
    }
}
