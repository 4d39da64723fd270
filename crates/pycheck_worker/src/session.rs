//! Engine runtime session
//!
//! Owns the one engine handle and its lifecycle:
//!
//! ```text
//! Uninitialized --initialize--> Ready{warmed: false} --warm_up/run_check--> Ready{warmed: true}
//!        ^                              |
//!        +----- failed initialize ------+  (initialize again from any state)
//! ```
//!
//! Design principles:
//! - Constructed once per worker process and owned by the gateway
//! - Every operation takes `&mut self`, so the borrow checker enforces the
//!   single in-flight operation the engine requires
//! - A repeated `initialize` drops the old engine before installing

use pycheck_protocol::{parse_diagnostics, CheckRequest, CheckResult, VersionReport};
use std::time::Instant;
use tracing::{debug, info};

use crate::engine::{EngineHandle, EngineSpec};
use crate::error::{EngineError, EngineResult};
use crate::host::PackageHost;
use crate::installer::install_engine;
use crate::staging::StagingArea;
use crate::version_table::VersionTable;

enum SessionState {
    Uninitialized,
    Ready {
        engine: Box<dyn EngineHandle>,
        warmed: bool,
    },
}

pub struct EngineSession {
    host: Box<dyn PackageHost>,
    table: VersionTable,
    spec: EngineSpec,
    staging: StagingArea,
    state: SessionState,
}

impl EngineSession {
    pub fn new(
        host: Box<dyn PackageHost>,
        table: VersionTable,
        spec: EngineSpec,
        staging: StagingArea,
    ) -> Self {
        Self {
            host,
            table,
            spec,
            staging,
            state: SessionState::Uninitialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Ready { .. })
    }

    pub fn is_warm(&self) -> bool {
        matches!(self.state, SessionState::Ready { warmed: true, .. })
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Install `requested`, start a fresh engine and report versions.
    ///
    /// Legal in any state. On failure the session is left uninitialized.
    pub fn initialize(&mut self, requested: &str) -> EngineResult<VersionReport> {
        if self.is_initialized() {
            info!("Re-initializing: replacing running engine");
        }
        self.state = SessionState::Uninitialized;

        let installed = install_engine(self.host.as_mut(), &self.table, &self.spec, requested)?;
        let engine = self.host.launch_engine(&self.spec)?;

        let report = VersionReport {
            host: self.host.host_version()?,
            host_runtime: self.host.runtime_version()?,
            engine: installed.version,
        };

        // Newly installed engine has never been imported in this runtime
        self.state = SessionState::Ready {
            engine,
            warmed: false,
        };
        info!(
            "Engine ready: {} {} (host {}, runtime {})",
            self.spec.package, report.engine, report.host, report.host_runtime
        );
        Ok(report)
    }

    /// Import the engine entry point once.
    ///
    /// Returns `true` if this call performed the import, `false` if the
    /// engine was already warm.
    pub fn warm_up(&mut self) -> EngineResult<bool> {
        match &mut self.state {
            SessionState::Uninitialized => Err(EngineError::NotInitialized),
            SessionState::Ready { warmed: true, .. } => Ok(false),
            SessionState::Ready { engine, warmed } => {
                let started = Instant::now();
                engine.import_entry_point()?;
                *warmed = true;
                info!("Engine imported in {} ms", started.elapsed().as_millis());
                Ok(true)
            }
        }
    }

    /// Run one check. Warms the engine first if needed, then calls
    /// `on_started` right before staging and invoking the engine.
    pub fn run_check<F>(&mut self, request: &CheckRequest, on_started: F) -> EngineResult<CheckResult>
    where
        F: FnOnce(),
    {
        if self.warm_up()? {
            debug!("Implicit warm-up before first check");
        }
        on_started();

        let path = self.staging.stage(
            &request.filename,
            &request.code,
            request.cache_dir.as_deref(),
        )?;

        let mut args = Vec::with_capacity(1 + request.engine_flags.len());
        args.push(path.to_string_lossy().into_owned());
        args.extend(request.engine_flags.iter().cloned());

        let engine = match &mut self.state {
            SessionState::Ready { engine, .. } => engine,
            SessionState::Uninitialized => return Err(EngineError::NotInitialized),
        };

        let started = Instant::now();
        let output = engine.run(&args)?;
        let mut raw_text = output.stdout;
        raw_text.push_str(&output.stderr);
        let duration_ms = (started.elapsed().as_secs_f64() * 1000.0).round() as u64;

        let diagnostics = parse_diagnostics(&raw_text);
        info!(
            "Checked {} in {} ms: status {}, {} diagnostics",
            request.filename,
            duration_ms,
            output.status,
            diagnostics.len()
        );

        Ok(CheckResult {
            diagnostics,
            raw_text,
            exit_status: output.status,
            duration_ms,
        })
    }
}
