//! Pycheck worker
//!
//! Manages an on-demand, versioned type-checking engine and answers one-shot
//! check requests against in-memory source text.
//!
//! Layers, leaf first:
//! - [`staging`]: materializes source text under a fixed root
//! - [`host`] / [`installer`]: uv-managed runtime, resolve + install + verify
//! - [`engine`]: the long-lived engine process
//! - [`session`]: lifecycle state machine (initialize, warm up, check)
//! - [`gateway`]: request FIFO, dispatch and error-to-event conversion
//! - [`transport`]: newline-delimited JSON on stdio

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod host;
pub mod installer;
pub mod session;
pub mod staging;
pub mod transport;
pub mod version_table;

pub use config::{WorkerArgs, WorkerConfig};
pub use engine::{EngineHandle, EngineOutput, EngineSpec};
pub use error::{EngineError, EngineResult};
pub use events::{event_channel, EventReceiver, EventSender};
pub use gateway::{spawn_gateway, Gateway, Inbound, WorkerHandle};
pub use host::{PackageHost, UvHostConfig, UvPackageHost};
pub use installer::{install_engine, InstalledVersion};
pub use session::EngineSession;
pub use staging::StagingArea;
pub use version_table::{InstallPlan, InstallSource, VersionEntry, VersionTable};
