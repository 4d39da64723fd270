//! Worker configuration: CLI arguments resolved into plain data.

use anyhow::{Context, Result};
use pycheck_protocol::defaults::DEFAULT_ENGINE_VERSION;
use pycheck_protocol::paths;
use std::path::PathBuf;

use crate::engine::EngineSpec;
use crate::host::UvHostConfig;
use crate::version_table::VersionTable;

#[derive(clap::Parser, Debug)]
#[command(
    name = "pycheck-worker",
    version,
    about = "Type-check worker speaking newline-delimited JSON on stdio"
)]
pub struct WorkerArgs {
    /// Worker home (runtime, shim, staging and logs live here)
    #[arg(long, env = "PYCHECK_HOME")]
    pub home: Option<PathBuf>,

    /// Engine version installed by an `init` without an explicit version
    #[arg(long, default_value = DEFAULT_ENGINE_VERSION)]
    pub default_engine_version: String,

    /// Python version requested when creating the runtime (e.g. 3.12)
    #[arg(long)]
    pub python: Option<String>,

    /// Path to the uv binary (searched on PATH if omitted)
    #[arg(long, env = "PYCHECK_UV")]
    pub uv: Option<PathBuf>,

    /// JSON file with pinned engine artifacts
    #[arg(long)]
    pub version_table: Option<PathBuf>,

    /// Directory source files are staged into
    #[arg(long)]
    pub staging_root: Option<PathBuf>,

    /// Mirror the file log filter on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Resolved worker configuration (plain data)
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub home: PathBuf,
    pub runtime_dir: PathBuf,
    pub staging_root: PathBuf,
    pub log_dir: PathBuf,
    pub default_engine_version: String,
    pub python_version: Option<String>,
    pub uv_path: Option<PathBuf>,
    pub version_table: VersionTable,
    pub engine: EngineSpec,
}

impl WorkerConfig {
    pub fn from_args(args: &WorkerArgs) -> Result<Self> {
        let home = args.home.clone().unwrap_or_else(paths::pycheck_home);
        let version_table = match &args.version_table {
            Some(path) => VersionTable::load(path)?,
            None => VersionTable::default(),
        };
        if args.default_engine_version.trim().is_empty() {
            anyhow::bail!("--default-engine-version must not be empty");
        }

        std::fs::create_dir_all(&home)
            .with_context(|| format!("Failed to create worker home: {}", home.display()))?;

        Ok(Self {
            runtime_dir: home.join("runtime"),
            staging_root: args
                .staging_root
                .clone()
                .unwrap_or_else(|| home.join("app")),
            log_dir: home.join("logs"),
            default_engine_version: args.default_engine_version.clone(),
            python_version: args.python.clone(),
            uv_path: args.uv.clone(),
            version_table,
            engine: EngineSpec::default(),
            home,
        })
    }

    pub fn host_config(&self) -> UvHostConfig {
        UvHostConfig {
            home: self.home.clone(),
            runtime_dir: self.runtime_dir.clone(),
            uv_path: self.uv_path.clone(),
            python_version: self.python_version.clone(),
        }
    }
}
