pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod marc;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::AlmaClient;
pub use config::{cli::LocalStorage, RunConfig};
pub use core::{etl::EtlEngine, pipeline::HoldingsPipeline};
pub use domain::model::RunReport;
pub use utils::error::{EtlError, Result};
