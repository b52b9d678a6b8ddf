//! Business logic services for the PIMS analytics core

pub mod alerts;
pub mod dashboard;
pub mod reorder;
pub mod sales;

pub use alerts::AlertService;
pub use dashboard::DashboardService;
pub use reorder::ReorderService;
pub use sales::SalesService;
