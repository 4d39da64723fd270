//! Engine installer: resolve, install, verify.

use tracing::{info, warn};

use crate::engine::EngineSpec;
use crate::error::{EngineError, EngineResult};
use crate::host::PackageHost;
use crate::version_table::{InstallSource, VersionTable};

/// Outcome of a verified install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub package: String,
    /// Version reported by package metadata, e.g. `1.10.0`
    pub version: String,
}

/// Install `requested` into the shared runtime and check what landed.
///
/// The reported version only has to start with `requested`: registry
/// installs may carry patch or pre-release suffixes the caller did not spell
/// out. The shared runtime is mutated in place; a later call with another
/// version replaces this one.
pub fn install_engine(
    host: &mut dyn PackageHost,
    table: &VersionTable,
    spec: &EngineSpec,
    requested: &str,
) -> EngineResult<InstalledVersion> {
    host.ensure_ready()?;

    let plan = table.resolve(&spec.package, requested);
    match &plan.source {
        InstallSource::Pinned { artifact } => {
            info!("Installing {} {} from pinned artifact {}", spec.package, requested, artifact)
        }
        InstallSource::Registry { directive } => {
            info!("Installing {} from package index", directive)
        }
    }

    host.install(&plan.packages)?;

    let found = host.installed_version(&spec.package)?;
    if !found.starts_with(requested) {
        warn!("Version check failed: wanted {}, runtime has {}", requested, found);
        return Err(EngineError::VersionMismatch {
            package: spec.package.clone(),
            expected: requested.to_string(),
            found,
        });
    }

    info!("{} {} installed", spec.package, found);
    Ok(InstalledVersion {
        package: spec.package.clone(),
        version: found,
    })
}
