//! Engine version resolution table.
//!
//! Static configuration consulted by the installer:
//! - a pinned entry maps a version to a direct artifact (wheel path or URL)
//!   and is installed together with exact auxiliary pins
//! - any other version falls back to `<package>==<version>` from the package
//!   index, with unpinned auxiliary packages

use anyhow::{Context, Result};
use pycheck_protocol::defaults::{DEFAULT_FALLBACK_AUXILIARY, DEFAULT_PINNED_AUXILIARY};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pinned artifact for one engine version - plain data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub artifact: String,
}

/// Version table - a Vec, lookups are linear (a handful of entries)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTable {
    #[serde(default)]
    pub entries: Vec<VersionEntry>,
    #[serde(default = "default_pinned_auxiliary")]
    pub pinned_auxiliary: Vec<String>,
    #[serde(default = "default_fallback_auxiliary")]
    pub fallback_auxiliary: Vec<String>,
}

impl Default for VersionTable {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            pinned_auxiliary: default_pinned_auxiliary(),
            fallback_auxiliary: default_fallback_auxiliary(),
        }
    }
}

/// Where the engine package of an install plan comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    Pinned { artifact: String },
    Registry { directive: String },
}

/// The packages handed to one batched install call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub source: InstallSource,
    /// Engine first, auxiliary packages after it
    pub packages: Vec<String>,
}

impl VersionTable {
    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read version table: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse version table: {}", path.display()))
    }

    /// Find the pinned entry for an exact version string
    pub fn find(&self, version: &str) -> Option<&VersionEntry> {
        self.entries.iter().find(|e| e.version == version)
    }

    /// Add or replace a pinned entry
    pub fn upsert(&mut self, entry: VersionEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.version == entry.version) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    /// Build the install set for `requested`.
    pub fn resolve(&self, package: &str, requested: &str) -> InstallPlan {
        match self.find(requested) {
            Some(entry) => {
                let mut packages = Vec::with_capacity(1 + self.pinned_auxiliary.len());
                packages.push(entry.artifact.clone());
                packages.extend(self.pinned_auxiliary.iter().cloned());
                InstallPlan {
                    source: InstallSource::Pinned {
                        artifact: entry.artifact.clone(),
                    },
                    packages,
                }
            }
            None => {
                let directive = format!("{}=={}", package, requested);
                let mut packages = Vec::with_capacity(1 + self.fallback_auxiliary.len());
                packages.push(directive.clone());
                packages.extend(self.fallback_auxiliary.iter().cloned());
                InstallPlan {
                    source: InstallSource::Registry { directive },
                    packages,
                }
            }
        }
    }
}

fn default_pinned_auxiliary() -> Vec<String> {
    DEFAULT_PINNED_AUXILIARY.iter().map(|s| s.to_string()).collect()
}

fn default_fallback_auxiliary() -> Vec<String> {
    DEFAULT_FALLBACK_AUXILIARY.iter().map(|s| s.to_string()).collect()
}
