//! Configuration for the PIMS analytics core
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PIMS_ prefix

use chrono::FixedOffset;
use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Reorder forecasting configuration
    pub reorder: ReorderConfig,

    /// Sales reporting configuration
    pub reporting: ReportingConfig,

    /// Stock alert configuration
    pub alerts: AlertConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL of the hosted store
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReorderConfig {
    /// Trailing window, in days, over which daily usage is averaged
    pub usage_window_days: u32,

    /// Lead time assumed for products without a usable purchase-order history
    pub default_lead_time_days: f64,

    /// Fraction of expected lead-time demand held as safety stock
    pub safety_stock_factor: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    /// Trailing window, in days, for the daily sales report
    pub daily_window_days: u32,

    /// Trailing window, in years, for the yearly sales report
    pub yearly_window_years: u32,

    /// Reporting timezone as a fixed offset from UTC, in hours
    pub utc_offset_hours: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    /// Total-stock threshold for the dashboard low-stock counter
    pub low_stock_threshold: f64,

    /// Days ahead of expiry at which a batch starts to warn
    pub expiry_warning_days: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let environment =
            std::env::var("PIMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("reorder.usage_window_days", 30)?
            .set_default("reorder.default_lead_time_days", 7.0)?
            .set_default("reorder.safety_stock_factor", 0.2)?
            .set_default("reporting.daily_window_days", 60)?
            .set_default("reporting.yearly_window_years", 5)?
            .set_default("reporting.utc_offset_hours", 0)?
            .set_default("alerts.low_stock_threshold", 10.0)?
            .set_default("alerts.expiry_warning_days", 90)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PIMS_ prefix)
            .add_source(
                Environment::with_prefix("PIMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl ReportingConfig {
    /// The configured reporting timezone
    pub fn reporting_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours.clamp(-23, 23) * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            usage_window_days: 30,
            default_lead_time_days: 7.0,
            safety_stock_factor: 0.2,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            daily_window_days: 60,
            yearly_window_years: 5,
            utc_offset_hours: 0,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 10.0,
            expiry_warning_days: 90,
        }
    }
}
