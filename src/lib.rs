//! Maintenance toolkit for SwingBay golf-simulator bays.
//!
//! The binary in `main.rs` drives an interactive console menu; everything
//! with behavior worth testing lives here.

pub mod config;
pub mod elevation;
pub mod fsops;
pub mod loader;
pub mod menu;
pub mod module;
pub mod modules;
pub mod registry;
pub mod tasks;

pub use config::{load_config, Config, Paths};
pub use loader::{dispatch, DispatchOutcome};
pub use module::{MaintenanceModule, ModuleContext};
pub use registry::{ModuleDescriptor, MODULES};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Administrative privileges missing and not acquirable.
    #[error("administrative privileges are required")]
    NotElevated,

    /// The toolkit could not resolve its own executable path. Fatal: the
    /// scheduled task must point at a concrete, existing target.
    #[error("could not resolve the toolkit's own executable path: {0}")]
    SelfPath(#[source] std::io::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task scheduler: {0}")]
    TaskScheduler(String),

    /// Operation-local failure surfaced to the operator; never aborts the
    /// menu loop.
    #[error("{0}")]
    Operation(String),
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io { context: context.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
