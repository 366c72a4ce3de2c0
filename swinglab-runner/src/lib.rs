//! SwingLab Runner: run configuration, component registry, orchestration.
//!
//! This crate builds on `swinglab-core` to provide:
//! - TOML run files with content-addressed run ids
//! - A name → factory registry for scanners and exit strategies
//! - Single runs over pre-loaded data and parallel fan-out of independent runs
//! - Universe restriction over a shared price history
//! - Logging initialisation for host binaries

pub mod config;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod universe;

pub use config::{ComponentConfig, ConfigError, RunConfig, RunId};
pub use logging::{init_logging, LoggingError};
pub use registry::{Registry, RegistryError};
pub use runner::{
    run_config, run_file, run_many, run_sequential, write_outcome, RunError, RunOutcome,
    SCHEMA_VERSION,
};
pub use universe::UniverseHistory;
