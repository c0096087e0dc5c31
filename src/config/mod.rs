pub mod cli;
pub mod toml_config;

use crate::adapters::http::DEFAULT_BASE_URL;
use crate::core::normalizer::DEFAULT_SOURCE_CODE;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_exists, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_RATE_LIMIT: usize = 25;
pub const DEFAULT_RATE_PERIOD_MS: u64 = 1000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OUTPUT_DIR: &str = ".";
pub const DEFAULT_OUTPUT_PREFIX: &str = "asu.alma.archived";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "holdings-etl", version)]
#[command(about = "Export Alma holding records carrying a 583 action note as MARC21 binary")]
pub struct CliConfig {
    /// Binary MARC21 export of items
    pub input: String,

    /// API key for accessing Alma REST APIs
    pub api_key: String,

    #[arg(long, help = "TOML file with api/throttle/output/normalize settings")]
    pub config: Option<String>,

    #[arg(long, help = "Alma API base URL")]
    pub base_url: Option<String>,

    #[arg(long)]
    pub output_dir: Option<String>,

    #[arg(long)]
    pub output_prefix: Option<String>,

    #[arg(long, help = "Maximum calls issued per rate period")]
    pub rate_limit: Option<usize>,

    #[arg(long)]
    pub rate_period_ms: Option<u64>,

    #[arg(long, help = "Maximum requests awaiting a response at once")]
    pub max_in_flight: Option<usize>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory after each phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Merge command line, optional TOML file and defaults, in that order of
    /// precedence.
    pub fn resolve(&self) -> Result<RunConfig> {
        let file = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Ok(RunConfig::merge(
            self.input.clone(),
            self.api_key.clone(),
            Overrides {
                base_url: self.base_url.clone(),
                output_dir: self.output_dir.clone(),
                output_prefix: self.output_prefix.clone(),
                rate_limit: self.rate_limit,
                rate_period_ms: self.rate_period_ms,
                max_in_flight: self.max_in_flight,
                timeout_secs: self.timeout_secs,
            },
            file,
        ))
    }
}

/// Values set explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub output_dir: Option<String>,
    pub output_prefix: Option<String>,
    pub rate_limit: Option<usize>,
    pub rate_period_ms: Option<u64>,
    pub max_in_flight: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub input_path: String,
    pub api_key: String,
    pub base_url: String,
    pub output_dir: String,
    pub output_prefix: String,
    pub source_code: String,
    pub rate_limit: usize,
    pub rate_period_ms: u64,
    pub max_in_flight: usize,
    pub timeout_secs: u64,
}

impl RunConfig {
    pub fn merge(input_path: String, api_key: String, cli: Overrides, file: TomlConfig) -> Self {
        let api = file.api.unwrap_or_default();
        let throttle = file.throttle.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        let normalize = file.normalize.unwrap_or_default();

        Self {
            input_path,
            api_key,
            base_url: cli
                .base_url
                .or(api.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            output_dir: cli
                .output_dir
                .or(output.directory)
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            output_prefix: cli
                .output_prefix
                .or(output.prefix)
                .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string()),
            source_code: normalize
                .source_code
                .unwrap_or_else(|| DEFAULT_SOURCE_CODE.to_string()),
            rate_limit: cli.rate_limit.or(throttle.rate_limit).unwrap_or(DEFAULT_RATE_LIMIT),
            rate_period_ms: cli
                .rate_period_ms
                .or(throttle.period_ms)
                .unwrap_or(DEFAULT_RATE_PERIOD_MS),
            max_in_flight: cli
                .max_in_flight
                .or(throttle.max_in_flight)
                .unwrap_or(DEFAULT_MAX_IN_FLIGHT),
            timeout_secs: cli
                .timeout_secs
                .or(api.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ConfigProvider for RunConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn api_base_url(&self) -> &str {
        &self.base_url
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    fn source_code(&self) -> &str {
        &self.source_code
    }

    fn rate_limit(&self) -> usize {
        self.rate_limit
    }

    fn rate_period(&self) -> Duration {
        Duration::from_millis(self.rate_period_ms)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_file_exists(&self.input_path)?;
        validate_non_empty_string("api_key", &self.api_key)?;
        validate_url("api.base_url", &self.base_url)?;
        validate_path("output.directory", &self.output_dir)?;
        validate_non_empty_string("output.prefix", &self.output_prefix)?;
        validate_path("output.prefix", &self.output_prefix)?;
        validate_non_empty_string("normalize.source_code", &self.source_code)?;
        validate_range("throttle.rate_limit", self.rate_limit, 1, 10_000)?;
        validate_range("throttle.period_ms", self.rate_period_ms, 1, 3_600_000)?;
        validate_positive_number("throttle.max_in_flight", self.max_in_flight, 1)?;
        validate_range("api.timeout_secs", self.timeout_secs, 1, 3_600)?;
        Ok(())
    }
}
