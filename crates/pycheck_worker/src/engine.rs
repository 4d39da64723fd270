//! Engine handle: the one long-lived process that owns the type checker.
//!
//! The production handle is a Python subprocess running the embedded
//! `engine_shim.py` inside the managed virtualenv. Requests and replies are
//! JSON lines over the child's stdin/stdout; the child's stderr is forwarded
//! as `log` events.
//!
//! ## Single Binary Distribution
//! The shim source is embedded at compile time and materialized to
//! `<home>/shim/{version}/engine_shim.py` on first launch.

use anyhow::{Context, Result};
use pycheck_protocol::defaults::{DEFAULT_ENGINE_MODULE, DEFAULT_ENGINE_PACKAGE};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::events::{forward_log_lines, EventSender};

const ENGINE_SHIM_SOURCE: &str = include_str!("../shim/engine_shim.py");

/// Crate version for shim cache path versioning.
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

const SHIM_PROTOCOL: &str = "1";
const SHIM_FILE_NAME: &str = "engine_shim.py";

/// Which engine to install and how to reach its entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSpec {
    /// Distribution name on the package index (`mypy`)
    pub package: String,
    /// Module exposing `run(args) -> (stdout, stderr, status)` (`mypy.api`)
    pub module: String,
}

impl Default for EngineSpec {
    fn default() -> Self {
        Self {
            package: DEFAULT_ENGINE_PACKAGE.to_string(),
            module: DEFAULT_ENGINE_MODULE.to_string(),
        }
    }
}

/// What the engine's batch entry point returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

/// Exclusive handle on the running engine.
pub trait EngineHandle: Send {
    /// Import the programmatic entry point. Called at most once per handle
    /// by the session.
    fn import_entry_point(&mut self) -> EngineResult<()>;

    /// Invoke the batch entry point with `args` verbatim.
    fn run(&mut self, args: &[String]) -> EngineResult<EngineOutput>;
}

/// Write the embedded shim under `home`, replacing a stale copy.
pub fn materialize_shim(home: &Path) -> Result<PathBuf> {
    let dir = home.join("shim").join(CRATE_VERSION);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create shim directory: {}", dir.display()))?;

    let path = dir.join(SHIM_FILE_NAME);
    let up_to_date = std::fs::read_to_string(&path)
        .map(|existing| existing == ENGINE_SHIM_SOURCE)
        .unwrap_or(false);
    if !up_to_date {
        std::fs::write(&path, ENGINE_SHIM_SOURCE)
            .with_context(|| format!("Failed to write shim: {}", path.display()))?;
        debug!("Materialized engine shim at {}", path.display());
    }
    Ok(path)
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum ShimRequest<'a> {
    Import,
    Run { args: &'a [String] },
}

#[derive(Debug, Deserialize)]
struct ShimReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    status: Option<i32>,
}

impl ShimReply {
    fn failure(self) -> String {
        self.error
            .unwrap_or_else(|| "engine shim reported failure without a message".to_string())
    }
}

/// Python subprocess running the engine shim.
pub struct ShimEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_forwarder: Option<thread::JoinHandle<()>>,
}

impl ShimEngine {
    /// Spawn the shim with `interpreter` and wait for its hello frame.
    pub fn launch(
        interpreter: &Path,
        shim_path: &Path,
        spec: &EngineSpec,
        logs: Option<EventSender>,
    ) -> Result<Self> {
        let mut child = Command::new(interpreter)
            .arg("-u")
            .arg(shim_path)
            .arg(&spec.module)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn engine shim with {}", interpreter.display()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture shim stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture shim stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture shim stderr"))?;

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr_forwarder: Some(spawn_stderr_forwarder(stderr, logs)),
        };

        let hello = engine.read_reply().context("Engine shim did not start")?;
        match hello.protocol.as_deref() {
            Some(SHIM_PROTOCOL) => {}
            other => anyhow::bail!(
                "Engine shim protocol mismatch: expected {}, got {:?}",
                SHIM_PROTOCOL,
                other
            ),
        }

        info!("Engine shim started (pid {}) for {}", engine.child.id(), spec.module);
        Ok(engine)
    }

    fn exchange(&mut self, request: &ShimRequest<'_>) -> Result<ShimReply> {
        let line = serde_json::to_string(request)?;
        writeln!(self.stdin, "{}", line).context("Failed to write to engine shim")?;
        self.stdin.flush().context("Failed to flush engine shim stdin")?;
        self.read_reply()
    }

    fn read_reply(&mut self) -> Result<ShimReply> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .context("Failed to read from engine shim")?;
        if read == 0 {
            let status = self.child.try_wait().ok().flatten();
            anyhow::bail!("Engine shim exited unexpectedly (status: {:?})", status);
        }
        decode_reply(&line)
    }
}

impl EngineHandle for ShimEngine {
    fn import_entry_point(&mut self) -> EngineResult<()> {
        let reply = self
            .exchange(&ShimRequest::Import)
            .map_err(|e| EngineError::Import(format!("{:#}", e)))?;
        if reply.ok {
            Ok(())
        } else {
            Err(EngineError::Import(reply.failure()))
        }
    }

    fn run(&mut self, args: &[String]) -> EngineResult<EngineOutput> {
        let reply = self
            .exchange(&ShimRequest::Run { args })
            .map_err(|e| EngineError::Invocation(format!("{:#}", e)))?;
        if !reply.ok {
            return Err(EngineError::Invocation(reply.failure()));
        }
        Ok(EngineOutput {
            stdout: reply.stdout.unwrap_or_default(),
            stderr: reply.stderr.unwrap_or_default(),
            status: reply.status.unwrap_or(0),
        })
    }
}

impl Drop for ShimEngine {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("Engine shim already gone: {}", e);
        }
        let _ = self.child.wait();
        if let Some(handle) = self.stderr_forwarder.take() {
            if handle.join().is_err() {
                warn!("Engine stderr forwarder panicked");
            }
        }
    }
}

fn decode_reply(line: &str) -> Result<ShimReply> {
    let line = line.trim_end();
    serde_json::from_str(line).with_context(|| format!("Invalid engine shim reply: {}", line))
}

fn spawn_stderr_forwarder(stderr: ChildStderr, logs: Option<EventSender>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reader = BufReader::new(stderr);
        for line in reader.lines() {
            match line {
                Ok(line) => forward_log_lines(&line, logs.as_ref()),
                Err(e) => {
                    warn!("Failed to read engine stderr: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shim_request_encoding() {
        let args = vec!["/app/a.py".to_string(), "--strict".to_string()];
        let run = serde_json::to_value(ShimRequest::Run { args: &args }).unwrap();
        assert_eq!(run["op"], "run");
        assert_eq!(run["args"][1], "--strict");

        let import = serde_json::to_value(ShimRequest::Import).unwrap();
        assert_eq!(import, serde_json::json!({"op": "import"}));
    }

    #[test]
    fn test_decode_run_reply() {
        let reply = decode_reply(
            "{\"ok\": true, \"stdout\": \"a.py:1: error: x\\n\", \"stderr\": \"\", \"status\": 1}\n",
        )
        .unwrap();
        assert!(reply.ok);
        assert_eq!(reply.status, Some(1));
        assert_eq!(reply.stdout.as_deref(), Some("a.py:1: error: x\n"));
    }

    #[test]
    fn test_decode_failure_reply() {
        let reply = decode_reply(r#"{"ok": false, "error": "ModuleNotFoundError: No module named 'mypy'"}"#).unwrap();
        assert!(!reply.ok);
        assert!(reply.failure().contains("ModuleNotFoundError"));
    }

    #[test]
    fn test_decode_garbage_reply() {
        let err = decode_reply("Traceback (most recent call last):").unwrap_err();
        assert!(err.to_string().contains("Invalid engine shim reply"));
    }

    #[test]
    fn test_materialize_shim_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let first = materialize_shim(tmp.path()).unwrap();
        let second = materialize_shim(tmp.path()).unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with(Path::new(CRATE_VERSION).join(SHIM_FILE_NAME)));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), ENGINE_SHIM_SOURCE);
    }

    #[test]
    fn test_materialize_shim_replaces_stale_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let path = materialize_shim(tmp.path()).unwrap();
        std::fs::write(&path, "# stale").unwrap();

        materialize_shim(tmp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ENGINE_SHIM_SOURCE);
    }

    #[test]
    fn test_default_spec_targets_mypy() {
        let spec = EngineSpec::default();
        assert_eq!(spec.package, "mypy");
        assert_eq!(spec.module, "mypy.api");
    }
}
