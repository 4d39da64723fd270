//! Package host: the shared Python runtime the engine is installed into.
//!
//! Data-oriented design:
//! - one virtualenv per worker home, created lazily and reused
//! - all I/O is synchronous; the session runs on its own thread
//! - installs go through `uv pip install` as a single batched call

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

use crate::engine::{materialize_shim, EngineHandle, EngineSpec, ShimEngine};
use crate::error::{EngineError, EngineResult};
use crate::events::{forward_log_lines, EventSender};

const VERSION_QUERY: &str =
    "import importlib.metadata as md, sys; print(md.version(sys.argv[1]))";
const RUNTIME_VERSION_QUERY: &str = "import sys; print(sys.version.split()[0])";

/// The package-installation subsystem the installer and session drive.
pub trait PackageHost: Send {
    /// Make the installer usable. Idempotent; cheap after the first call.
    fn ensure_ready(&mut self) -> EngineResult<()>;

    /// Install every entry of `packages` in one call.
    fn install(&mut self, packages: &[String]) -> EngineResult<()>;

    /// Version of an installed distribution, from package metadata.
    fn installed_version(&self, package: &str) -> EngineResult<String>;

    /// Version of the package host itself.
    fn host_version(&self) -> EngineResult<String>;

    /// Version of the language runtime packages are installed into.
    fn runtime_version(&self) -> EngineResult<String>;

    /// Start a fresh engine handle against the currently installed packages.
    fn launch_engine(&mut self, spec: &EngineSpec) -> EngineResult<Box<dyn EngineHandle>>;
}

/// Paths and tool locations for the uv-managed runtime (plain data)
#[derive(Debug, Clone)]
pub struct UvHostConfig {
    /// Root for shim files
    pub home: PathBuf,
    /// The shared virtualenv
    pub runtime_dir: PathBuf,
    /// Explicit uv binary; searched for when None
    pub uv_path: Option<PathBuf>,
    /// Passed to `uv venv --python`
    pub python_version: Option<String>,
}

/// uv + one virtualenv. Created once at startup, resolved lazily.
pub struct UvPackageHost {
    config: UvHostConfig,
    uv_path: Option<PathBuf>,
    logs: Option<EventSender>,
}

impl UvPackageHost {
    pub fn new(config: UvHostConfig, logs: Option<EventSender>) -> Self {
        let uv_path = config.uv_path.clone();
        Self {
            config,
            uv_path,
            logs,
        }
    }

    /// Interpreter inside the managed virtualenv
    pub fn interpreter_path(&self) -> PathBuf {
        interpreter_path(&self.config.runtime_dir)
    }

    fn uv(&self) -> EngineResult<&Path> {
        self.uv_path.as_deref().ok_or_else(|| {
            EngineError::HostUnavailable("package host not prepared; call ensure_ready".to_string())
        })
    }

    fn run_python(&self, script: &str, args: &[&str]) -> Result<String> {
        let interpreter = self.interpreter_path();
        let output = Command::new(&interpreter)
            .arg("-c")
            .arg(script)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", interpreter.display()))?;
        checked_stdout(output, "python")
    }
}

impl PackageHost for UvPackageHost {
    fn ensure_ready(&mut self) -> EngineResult<()> {
        if self.uv_path.is_none() {
            let found = find_uv().map_err(|e| EngineError::HostUnavailable(e.to_string()))?;
            info!("Using uv at {}", found.display());
            self.uv_path = Some(found);
        }

        if self.interpreter_path().exists() {
            debug!("Runtime already present at {}", self.config.runtime_dir.display());
            return Ok(());
        }

        info!("Creating runtime at {}", self.config.runtime_dir.display());
        create_venv(
            self.uv()?,
            &self.config.runtime_dir,
            self.config.python_version.as_deref(),
            self.logs.as_ref(),
        )
        .map_err(|e| EngineError::HostUnavailable(format!("{:#}", e)))
    }

    fn install(&mut self, packages: &[String]) -> EngineResult<()> {
        let uv = self.uv()?;
        let interpreter = self.interpreter_path();
        info!("Installing {}", packages.join(" "));

        let output = Command::new(uv)
            .args(["pip", "install", "--python"])
            .arg(&interpreter)
            .args(packages)
            .output()
            .map_err(|e| EngineError::Install(format!("Failed to run uv pip install: {}", e)))?;

        forward_log_lines(&String::from_utf8_lossy(&output.stdout), self.logs.as_ref());
        let stderr = String::from_utf8_lossy(&output.stderr);
        forward_log_lines(&stderr, self.logs.as_ref());

        if !output.status.success() {
            return Err(EngineError::Install(format!(
                "uv pip install exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn installed_version(&self, package: &str) -> EngineResult<String> {
        self.run_python(VERSION_QUERY, &[package])
            .map_err(|e| EngineError::Query(format!("{} version: {:#}", package, e)))
    }

    fn host_version(&self) -> EngineResult<String> {
        let output = Command::new(self.uv()?)
            .arg("--version")
            .output()
            .map_err(|e| EngineError::Query(format!("uv version: {}", e)))?;
        let text = checked_stdout(output, "uv").map_err(|e| EngineError::Query(format!("{:#}", e)))?;
        Ok(parse_uv_version(&text))
    }

    fn runtime_version(&self) -> EngineResult<String> {
        self.run_python(RUNTIME_VERSION_QUERY, &[])
            .map_err(|e| EngineError::Query(format!("python version: {:#}", e)))
    }

    fn launch_engine(&mut self, spec: &EngineSpec) -> EngineResult<Box<dyn EngineHandle>> {
        let shim = materialize_shim(&self.config.home)
            .map_err(|e| EngineError::HostUnavailable(format!("{:#}", e)))?;
        let engine = ShimEngine::launch(&self.interpreter_path(), &shim, spec, self.logs.clone())
            .map_err(|e| EngineError::Import(format!("{:#}", e)))?;
        Ok(Box::new(engine))
    }
}

// --- Free functions (no state needed) ---

/// Interpreter path inside a virtualenv
pub fn interpreter_path(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts/python.exe")
    } else {
        venv.join("bin/python")
    }
}

fn find_uv() -> Result<PathBuf> {
    // Check PATH first
    if let Ok(path) = which::which("uv") {
        return Ok(path);
    }

    // Check common locations
    let home = std::env::var("HOME").unwrap_or_default();
    let candidates = [
        format!("{}/.cargo/bin/uv", home),
        format!("{}/.local/bin/uv", home),
        "/usr/local/bin/uv".to_string(),
    ];

    for candidate in candidates {
        let path = PathBuf::from(&candidate);
        if path.exists() {
            return Ok(path);
        }
    }

    anyhow::bail!("uv not found. Install: curl -LsSf https://astral.sh/uv/install.sh | sh")
}

fn create_venv(
    uv_path: &Path,
    venv_path: &Path,
    python_version: Option<&str>,
    logs: Option<&EventSender>,
) -> Result<()> {
    if let Some(parent) = venv_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut cmd = Command::new(uv_path);
    cmd.arg("venv").arg(venv_path);
    if let Some(version) = python_version {
        cmd.arg("--python").arg(version);
    }

    let output = cmd.output().context("Failed to run uv venv")?;
    forward_log_lines(&String::from_utf8_lossy(&output.stderr), logs);
    if !output.status.success() {
        anyhow::bail!("uv venv failed: {}", String::from_utf8_lossy(&output.stderr).trim());
    }
    Ok(())
}

fn checked_stdout(output: Output, tool: &str) -> Result<String> {
    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {}: {}",
            tool,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `uv 0.4.18 (7b55e9790 2024-10-01)` -> `0.4.18`
fn parse_uv_version(text: &str) -> String {
    let mut parts = text.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("uv"), Some(version)) => version.to_string(),
        _ => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uv_version() {
        assert_eq!(parse_uv_version("uv 0.4.18 (7b55e9790 2024-10-01)"), "0.4.18");
        assert_eq!(parse_uv_version("uv 0.5.0"), "0.5.0");
        assert_eq!(parse_uv_version("  0.5.0 \n"), "0.5.0");
    }

    #[test]
    fn test_interpreter_path() {
        let path = interpreter_path(Path::new("/tmp/runtime"));
        assert!(path.starts_with("/tmp/runtime"));
        assert!(path.to_string_lossy().contains("python"));
    }

    #[test]
    fn test_install_before_ready_is_host_error() {
        let mut host = UvPackageHost::new(
            UvHostConfig {
                home: PathBuf::from("/tmp/pycheck-home"),
                runtime_dir: PathBuf::from("/tmp/pycheck-home/runtime"),
                uv_path: None,
                python_version: None,
            },
            None,
        );
        let err = host.install(&["mypy==1.10.0".to_string()]).unwrap_err();
        assert!(matches!(err, EngineError::HostUnavailable(_)));
    }

    #[test]
    fn test_ensure_ready_skips_existing_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        let runtime_dir = tmp.path().join("runtime");
        let interpreter = interpreter_path(&runtime_dir);
        std::fs::create_dir_all(interpreter.parent().unwrap()).unwrap();
        std::fs::write(&interpreter, "").unwrap();

        // uv is never executed when the runtime already exists
        let mut host = UvPackageHost::new(
            UvHostConfig {
                home: tmp.path().to_path_buf(),
                runtime_dir,
                uv_path: Some(tmp.path().join("no-such-uv")),
                python_version: None,
            },
            None,
        );
        host.ensure_ready().unwrap();
        host.ensure_ready().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_checked_stdout_reports_failure() {
        use std::os::unix::process::ExitStatusExt;

        let ok = Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout: b"3.12.1\n".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(checked_stdout(ok, "python").unwrap(), "3.12.1");

        let failed = Output {
            status: std::process::ExitStatus::from_raw(1 << 8),
            stdout: Vec::new(),
            stderr: b"PackageNotFoundError: mypy\n".to_vec(),
        };
        let err = checked_stdout(failed, "python").unwrap_err();
        assert!(err.to_string().contains("PackageNotFoundError"));
    }
}
