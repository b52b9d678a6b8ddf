//! Analytics and alerting core for the Pharmacy Inventory Management System
//!
//! The forecasting and aggregation engine behind the back-office
//! dashboard: reorder advice, calendar-bucketed sales summaries, top-N
//! rankings, dashboard counters, and the stock alert digest consumed by
//! the external notification job.
//!
//! The core reads immutable snapshots from the hosted Postgres store via
//! a handful of bulk queries and never writes. Each computation is
//! stateless: fetch, aggregate in memory, return an owned result. The
//! pure computation functions take `today`/`now` as a parameter and are
//! exercised directly by the test suite without a database.

pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
