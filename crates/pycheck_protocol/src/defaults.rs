//! Canonical default values shared by the worker and its callers.

/// Engine version installed when `init` carries no explicit version.
pub const DEFAULT_ENGINE_VERSION: &str = "1.10.0";

/// Package name of the default engine, as known to the package index.
pub const DEFAULT_ENGINE_PACKAGE: &str = "mypy";

/// Python module exposing the engine's programmatic entry point.
pub const DEFAULT_ENGINE_MODULE: &str = "mypy.api";

/// File name reported for diagnostics whose file part is empty.
pub const DEFAULT_SNIPPET_FILE: &str = "snippet.py";

/// Auxiliary packages paired with pinned engine artifacts.
pub const DEFAULT_PINNED_AUXILIARY: &[&str] = &["typing-extensions==4.11.0", "mypy-extensions==1.0.0"];

/// Auxiliary packages installed next to a registry-resolved engine.
pub const DEFAULT_FALLBACK_AUXILIARY: &[&str] = &["typing-extensions", "mypy-extensions"];

/// Log line emitted when `warmup` actually imports the engine.
pub const ENGINE_IMPORTED_MESSAGE: &str = "engine imported";

/// Log line emitted when `warmup` finds the engine already imported.
pub const ENGINE_ALREADY_WARM_MESSAGE: &str = "engine already warm";
