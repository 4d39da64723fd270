//! In-memory package host and engine used by the integration tests.
//!
//! The fake engine "type checks" by reading the staged file and reporting
//! one error per non-blank line, so tests can observe exactly what was
//! staged at invocation time.

#![allow(dead_code)]

use pycheck_worker::{
    event_channel, EngineError, EngineHandle, EngineOutput, EngineResult, EngineSession,
    EngineSpec, EventReceiver, Gateway, PackageHost, StagingArea, VersionTable,
};
use pycheck_protocol::Event;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub const HOST_VERSION: &str = "0.4.18";
pub const RUNTIME_VERSION: &str = "3.12.1";
pub const CLEAN_RUN_STDOUT: &str = "Success: no issues found in 1 source file\n";

#[derive(Default)]
pub struct FakeState {
    pub ensure_ready_calls: usize,
    pub installs: Vec<Vec<String>>,
    pub launches: usize,
    pub imports: usize,
    pub runs: Vec<Vec<String>>,
    /// "import", "checking", "run" in the order they happened
    pub ops: Vec<&'static str>,
    pub installed: Option<String>,
    /// Version a pinned artifact installs as
    pub artifact_versions: HashMap<String, String>,
    /// Forces the version reported after any install
    pub reported_version: Option<String>,
    pub fail_next_install: Option<String>,
    pub fail_import: Option<String>,
    pub fail_run: Option<String>,
    pub stderr: String,
}

#[derive(Clone, Default)]
pub struct Shared(Arc<Mutex<FakeState>>);

impl Shared {
    pub fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().unwrap()
    }

    pub fn record(&self, op: &'static str) {
        self.lock().ops.push(op);
    }
}

pub struct FakeHost {
    state: Shared,
}

impl FakeHost {
    pub fn new(state: Shared) -> Self {
        Self { state }
    }
}

impl PackageHost for FakeHost {
    fn ensure_ready(&mut self) -> EngineResult<()> {
        self.state.lock().ensure_ready_calls += 1;
        Ok(())
    }

    fn install(&mut self, packages: &[String]) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.installs.push(packages.to_vec());
        if let Some(message) = state.fail_next_install.take() {
            return Err(EngineError::Install(message));
        }

        let engine = packages.first().cloned().unwrap_or_default();
        let version = if let Some(forced) = state.reported_version.clone() {
            forced
        } else if let Some(version) = state.artifact_versions.get(&engine) {
            version.clone()
        } else if let Some((_, version)) = engine.split_once("==") {
            version.to_string()
        } else {
            "0.0.0".to_string()
        };
        state.installed = Some(version);
        Ok(())
    }

    fn installed_version(&self, package: &str) -> EngineResult<String> {
        self.state
            .lock()
            .installed
            .clone()
            .ok_or_else(|| EngineError::Query(format!("{} is not installed", package)))
    }

    fn host_version(&self) -> EngineResult<String> {
        Ok(HOST_VERSION.to_string())
    }

    fn runtime_version(&self) -> EngineResult<String> {
        Ok(RUNTIME_VERSION.to_string())
    }

    fn launch_engine(&mut self, _spec: &EngineSpec) -> EngineResult<Box<dyn EngineHandle>> {
        self.state.lock().launches += 1;
        Ok(Box::new(FakeEngine {
            state: self.state.clone(),
        }))
    }
}

pub struct FakeEngine {
    state: Shared,
}

impl EngineHandle for FakeEngine {
    fn import_entry_point(&mut self) -> EngineResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_import.clone() {
            return Err(EngineError::Import(message));
        }
        state.imports += 1;
        state.ops.push("import");
        Ok(())
    }

    fn run(&mut self, args: &[String]) -> EngineResult<EngineOutput> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_run.clone() {
            return Err(EngineError::Invocation(message));
        }
        state.ops.push("run");
        state.runs.push(args.to_vec());

        let path = &args[0];
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Invocation(format!("cannot read {}: {}", path, e)))?;

        let mut stdout = String::new();
        for (idx, line) in content.lines().enumerate() {
            if !line.trim().is_empty() {
                stdout.push_str(&format!("{}:{}: error: {}  [misc]\n", path, idx + 1, line.trim()));
            }
        }
        let status = if stdout.is_empty() { 0 } else { 1 };
        if stdout.is_empty() {
            stdout.push_str(CLEAN_RUN_STDOUT);
        }

        Ok(EngineOutput {
            stdout,
            stderr: state.stderr.clone(),
            status,
        })
    }
}

pub fn fake_session(staging_root: &Path, table: VersionTable) -> (EngineSession, Shared) {
    let state = Shared::default();
    let session = EngineSession::new(
        Box::new(FakeHost::new(state.clone())),
        table,
        EngineSpec::default(),
        StagingArea::new(staging_root).unwrap(),
    );
    (session, state)
}

pub fn fake_gateway(staging_root: &Path, default_version: &str) -> (Gateway, EventReceiver, Shared) {
    let (session, state) = fake_session(staging_root, VersionTable::default());
    let (tx, rx) = event_channel();
    (Gateway::new(session, tx, default_version), rx, state)
}

/// Everything emitted so far, without waiting.
pub fn drain(rx: &mut EventReceiver) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn kinds(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(|e| e.kind()).collect()
}
