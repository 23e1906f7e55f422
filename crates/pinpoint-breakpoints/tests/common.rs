//! In-memory debug info provider and debugger host for store tests.

use std::collections::HashSet;

use smol_str::SmolStr;

use pinpoint_breakpoints::{BreakpointHost, HostError, PersistedBreakpoint};
use pinpoint_debuginfo::{
    DebugInfoError, DebugInfoProvider, EvalValue, FunctionSymbol, Instruction, Scope,
};

pub struct FakeFunction {
    pub sym: FunctionSymbol,
    pub entry: u64,
    pub file: String,
    pub decl_line: u64,
    pub instructions: Vec<Instruction>,
}

#[derive(Default)]
pub struct FakeProvider {
    pub functions: Vec<FakeFunction>,
}

impl FakeProvider {
    /// Add a function whose instructions all attribute to `file` at the
    /// given lines.
    pub fn add_function(&mut self, package: &str, base: &str, entry: u64, file: &str, lines: &[u64]) {
        self.functions.push(FakeFunction {
            sym: FunctionSymbol::new(package, "", base),
            entry,
            file: file.to_string(),
            decl_line: lines.first().copied().unwrap_or(1),
            instructions: lines
                .iter()
                .map(|&line| Instruction {
                    file: file.to_string(),
                    line,
                    at_pc: false,
                })
                .collect(),
        });
    }
}

impl DebugInfoProvider for FakeProvider {
    fn functions(&self) -> Result<Vec<FunctionSymbol>, DebugInfoError> {
        Ok(self.functions.iter().map(|f| f.sym.clone()).collect())
    }

    fn source_files(&self) -> Result<Vec<String>, DebugInfoError> {
        let mut files: Vec<String> = self.functions.iter().map(|f| f.file.clone()).collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn function_entry(&self, name: &str, skip_prologue: bool) -> Result<u64, DebugInfoError> {
        let func = self
            .functions
            .iter()
            .find(|f| f.sym.name == name)
            .ok_or_else(|| DebugInfoError::NotFound(format!("function {name}")))?;
        Ok(if skip_prologue { func.entry + 4 } else { func.entry })
    }

    fn file_line_address(&self, file: &str, line: u64) -> Result<u64, DebugInfoError> {
        self.functions
            .iter()
            .find(|f| f.file == file && f.instructions.iter().any(|i| i.line == line))
            .map(|f| f.entry)
            .ok_or_else(|| DebugInfoError::NotFound(format!("{file}:{line}")))
    }

    fn address_to_line(&self, addr: u64) -> Result<(String, u64, SmolStr), DebugInfoError> {
        self.functions
            .iter()
            .find(|f| addr == f.entry || addr == f.entry + 4)
            .map(|f| (f.file.clone(), f.decl_line, f.sym.name.clone()))
            .ok_or_else(|| DebugInfoError::NotFound(format!("address {addr:#x}")))
    }

    fn disassemble(&self, entry: u64) -> Result<Vec<Instruction>, DebugInfoError> {
        self.functions
            .iter()
            .find(|f| f.entry == entry)
            .map(|f| f.instructions.clone())
            .ok_or_else(|| DebugInfoError::NotFound(format!("disassembly at {entry:#x}")))
    }

    fn evaluate(&self, _scope: &Scope, expr: &str) -> Result<EvalValue, DebugInfoError> {
        Err(DebugInfoError::Eval(format!("could not evaluate {expr}")))
    }
}

#[derive(Default)]
pub struct FakeHost {
    pub next_id: i64,
    pub created: Vec<(i64, PersistedBreakpoint)>,
    pub cleared: Vec<i64>,
    pub replayed: Vec<(i64, String)>,
    /// Breakpoint names whose creation fails.
    pub fail_create: HashSet<SmolStr>,
    pub fail_replay: bool,
}

impl BreakpointHost for FakeHost {
    fn create(&mut self, record: &PersistedBreakpoint) -> Result<i64, HostError> {
        if self.fail_create.contains(&record.name) {
            return Err(HostError(format!("could not create {}", record.name)));
        }
        self.next_id += 1;
        self.created.push((self.next_id, record.clone()));
        Ok(self.next_id)
    }

    fn clear(&mut self, id: i64) -> Result<(), HostError> {
        self.cleared.push(id);
        Ok(())
    }

    fn replay_commands(&mut self, id: i64, script: &str) -> Result<(), HostError> {
        if self.fail_replay {
            return Err(HostError("commands rejected".to_string()));
        }
        self.replayed.push((id, script.to_string()));
        Ok(())
    }
}
