//! The breakpoint store.
//!
//! A store owns every persisted record for one target and is their sole
//! mutator. It performs no internal locking; concurrent callers must
//! serialize access, one mutation in flight per store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{info, warn};

use pinpoint_debuginfo::{DebugInfoError, DebugInfoProvider};
use pinpoint_locspec::LocateError;

use crate::list::ListError;
use crate::record::{line_text, LiveBreakpoint, PersistedBreakpoint};
use crate::reconcile::{reconcile, ReconcileOutcome};

/// Directory under the per-user config base holding breakpoint files.
pub const STORE_DIR: &str = "pinpoint";

/// Store persistence and list-format failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The breakpoint file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The breakpoint file is not valid JSON.
    #[error("breakpoint file: {0}")]
    Format(#[from] serde_json::Error),

    /// An edited breakpoint list was malformed.
    #[error(transparent)]
    List(#[from] ListError),

    /// Locating the target's main function failed.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// The debug info provider failed.
    #[error(transparent)]
    Provider(#[from] DebugInfoError),

    /// The target has no resolvable `main.main`.
    #[error("could not find main.main in the target")]
    NoMain,
}

/// A live-debugger operation failed.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HostError(pub String);

/// The live-debugger side of breakpoint management.
///
/// The command script passed to [`BreakpointHost::replay_commands`] is
/// opaque to the store; the host's command dispatcher replays it verbatim.
pub trait BreakpointHost {
    /// Create a breakpoint in the debuggee; returns its live id.
    fn create(&mut self, record: &PersistedBreakpoint) -> Result<i64, HostError>;

    /// Remove a live breakpoint.
    fn clear(&mut self, id: i64) -> Result<(), HostError>;

    /// Replay an amend-command script against a live breakpoint.
    fn replay_commands(&mut self, id: i64, script: &str) -> Result<(), HostError>;
}

/// Outcome counts of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records still present after the pass.
    pub kept: usize,
    /// Records present before the pass.
    pub total: usize,
}

/// Owns and persists the breakpoint records for one target.
#[derive(Debug, Default)]
pub struct BreakpointStore {
    path: Option<PathBuf>,
    breakpoints: IndexMap<SmolStr, PersistedBreakpoint>,
}

impl BreakpointStore {
    /// An empty store with no backing file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store backed by `path`.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            breakpoints: IndexMap::new(),
        }
    }

    /// Build a store from explicit records, e.g. a parsed edited list.
    /// Unnamed records are numbered `B1`, `B2`, … in order.
    #[must_use]
    pub fn from_records(path: Option<PathBuf>, records: Vec<PersistedBreakpoint>) -> Self {
        let mut breakpoints = IndexMap::new();
        for (idx, mut record) in records.into_iter().enumerate() {
            if record.name.is_empty() {
                record.name = SmolStr::new(format!("B{}", idx + 1));
            }
            breakpoints.insert(record.name.clone(), record);
        }
        Self { path, breakpoints }
    }

    /// Open the store for a target, deriving the backing file from the
    /// target's `main.main` source location and loading it if present.
    pub fn for_target(provider: &dyn DebugInfoProvider) -> Result<Self, StoreError> {
        let addrs = pinpoint_locspec::find(provider, None, "main.main")?;
        let addr = addrs.first().copied().ok_or(StoreError::NoMain)?;
        let (file, _, _) = provider.address_to_line(addr)?;
        let mut store = Self {
            path: storage_path(&file),
            breakpoints: IndexMap::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// The backing file, when one is configured.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Look up a record by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PersistedBreakpoint> {
        self.breakpoints.get(name)
    }

    /// Look up a record by source position.
    #[must_use]
    pub fn find_at(&self, file: &str, line: u64) -> Option<&PersistedBreakpoint> {
        self.breakpoints
            .values()
            .find(|bp| bp.filename == file && bp.line == line)
    }

    /// All records, in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &PersistedBreakpoint> {
        self.breakpoints.values()
    }

    /// Load records from the backing file. A missing file leaves the
    /// store empty; any other read failure is an error.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        self.breakpoints = serde_json::from_str(&text)?;
        for (name, record) in &mut self.breakpoints {
            record.name = name.clone();
            record.id = 0;
        }
        Ok(())
    }

    /// Write all records to the backing file, creating its directory as
    /// needed. A store without a path saves nothing.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(&self.breakpoints)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Refresh the store against the debugger's current breakpoint list.
    ///
    /// Records absent from `live` are marked disabled but kept; live
    /// breakpoints without a record get one, with the source line's text
    /// snapshotted for later reconciliation. Debugger-internal
    /// breakpoints (negative id) are ignored.
    pub fn sync_live(&mut self, live: &[LiveBreakpoint]) {
        for record in self.breakpoints.values_mut() {
            record.enabled = false;
            record.id = 0;
        }
        for bp in live {
            if bp.id < 0 {
                continue;
            }
            let key = if bp.name.is_empty() {
                SmolStr::new(format!("B{}", bp.id))
            } else {
                bp.name.clone()
            };
            let record = self
                .breakpoints
                .entry(key.clone())
                .or_insert_with(|| PersistedBreakpoint {
                    name: key,
                    function: bp.function.clone(),
                    filename: bp.file.clone(),
                    line: bp.line,
                    line_text: String::new(),
                    enabled: false,
                    tracepoint: false,
                    commands: String::new(),
                    id: 0,
                });
            if record.line_text.is_empty()
                || record.filename != bp.file
                || record.line != bp.line
            {
                record.line_text = line_text(&bp.file, bp.line);
            }
            record.id = bp.id;
            record.function = bp.function.clone();
            record.filename = bp.file.clone();
            record.line = bp.line;
            if bp.tracepoint {
                record.tracepoint = true;
            }
            record.commands = bp.commands_script();
            record.enabled = true;
        }
    }

    /// Reconcile every record against a rebuilt target.
    ///
    /// `Updated` lines are applied, `Dropped` records removed and logged;
    /// one bad record never aborts the pass.
    pub fn reconcile_all(&mut self, provider: &dyn DebugInfoProvider) -> ReconcileStats {
        let total = self.breakpoints.len();
        let mut dropped: Vec<SmolStr> = Vec::new();
        for (name, record) in &mut self.breakpoints {
            match reconcile(provider, record) {
                ReconcileOutcome::Unchanged => {}
                ReconcileOutcome::Updated { line } => {
                    info!(
                        name = %name,
                        file = %record.filename,
                        from = record.line,
                        to = line,
                        "adjusted breakpoint line"
                    );
                    record.line = line;
                }
                ReconcileOutcome::Dropped(reason) => {
                    warn!(name = %name, %reason, "removing breakpoint");
                    dropped.push(name.clone());
                }
            }
        }
        for name in &dropped {
            self.breakpoints.shift_remove(name);
        }
        ReconcileStats {
            kept: total - dropped.len(),
            total,
        }
    }

    /// Reconcile, then re-create every enabled record in the debuggee and
    /// replay its command script. A failed replay leaves the breakpoint
    /// created but un-amended; a failed creation disables the record.
    pub fn restore(
        &mut self,
        provider: &dyn DebugInfoProvider,
        host: &mut dyn BreakpointHost,
    ) -> ReconcileStats {
        let stats = self.reconcile_all(provider);
        for record in self.breakpoints.values_mut() {
            if !record.enabled {
                continue;
            }
            match host.create(record) {
                Ok(id) => {
                    record.id = id;
                    if !record.commands.trim().is_empty() {
                        if let Err(err) = host.replay_commands(id, &record.commands) {
                            warn!(
                                name = %record.name,
                                %err,
                                "could not reapply breakpoint commands"
                            );
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        name = %record.name,
                        file = %record.filename,
                        line = record.line,
                        %err,
                        "could not recreate breakpoint"
                    );
                    record.enabled = false;
                }
            }
        }
        info!(restored = stats.kept, total = stats.total, "breakpoint restore complete");
        stats
    }

    /// Remove a record, clearing its live breakpoint when it has one.
    /// A failed clear still removes the record.
    pub fn remove(
        &mut self,
        name: &str,
        host: &mut dyn BreakpointHost,
    ) -> Option<PersistedBreakpoint> {
        let record = self.breakpoints.shift_remove(name)?;
        if record.enabled && record.id != 0 {
            if let Err(err) = host.clear(record.id) {
                warn!(name = %record.name, %err, "could not clear breakpoint");
            }
        }
        Some(record)
    }
}

/// Backing-file path for a target whose main function lives in
/// `main_file`: base name, parent directory name, and a crc32 of the full
/// path keep different targets apart without unbounded filename length.
#[must_use]
pub fn storage_path(main_file: &str) -> Option<PathBuf> {
    let path = Path::new(main_file);
    let file = path.file_name()?.to_string_lossy();
    let dir = path
        .parent()
        .and_then(Path::file_name)
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(main_file.as_bytes());
    let name = format!("{file}_{dir}_{:08x}", hasher.finalize());
    Some(config_base()?.join(STORE_DIR).join(name))
}

fn config_base() -> Option<PathBuf> {
    let base = home::home_dir()?;
    if cfg!(target_os = "macos") {
        Some(base.join("Library"))
    } else if cfg!(windows) {
        Some(base)
    } else {
        Some(base.join(".config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_path_encodes_file_dir_and_hash() {
        let Some(path) = storage_path("/src/proj/main.go") else {
            // No home directory in this environment.
            return;
        };
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(b"/src/proj/main.go");
        let expected = format!("main.go_proj_{:08x}", hasher.finalize());
        assert_eq!(path.file_name().unwrap().to_string_lossy(), expected);
        assert_eq!(path.parent().unwrap().file_name().unwrap(), STORE_DIR);
    }

    #[test]
    fn from_records_numbers_unnamed_breakpoints() {
        let mut record = PersistedBreakpoint {
            name: "".into(),
            function: "main.main".into(),
            filename: "/src/main.go".to_string(),
            line: 3,
            line_text: String::new(),
            enabled: true,
            tracepoint: false,
            commands: String::new(),
            id: 0,
        };
        let named = PersistedBreakpoint {
            name: "stop".into(),
            ..record.clone()
        };
        record.line = 9;
        let store = BreakpointStore::from_records(None, vec![record, named]);
        assert!(store.get("B1").is_some());
        assert_eq!(store.get("B1").unwrap().line, 9);
        assert!(store.get("stop").is_some());
    }
}
