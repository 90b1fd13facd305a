//! docsift core — shared types, configuration, errors and resource probes.

pub mod config;
pub mod error;
pub mod resources;
pub mod types;

pub use config::{DataPaths, DocsiftConfig, EnrichmentConfig, LengthThresholds, SummaryBand};
pub use error::{Error, Result};
pub use resources::ResourceSnapshot;
pub use types::*;
