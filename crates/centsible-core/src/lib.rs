//! centsible-core
//!
//! Shared functionality for the centsible personal-finance analytics
//! service:
//! - Database access and migrations (purchase store, rollups, report store)
//! - Prediction engine for recurring-purchase forecasting
//! - Tip engine for savings-opportunity detection
//! - Deal catalog for merchant-alternative and bundle suggestions
//! - Web-search capability abstraction for weekly alternative suggestions
//! - Weekly suggester pipeline shared by batch and streaming modes
//! - Service configuration

pub mod config;
pub mod db;
pub mod deals;
pub mod error;
pub mod models;
pub mod predict;
pub mod search;
pub mod tips;
pub mod weekly;

pub use config::Config;
pub use db::{Database, ItemFilter, ReportFilter};
pub use deals::DealCatalog;
pub use error::{Error, Result};
pub use predict::PredictionEngine;
pub use search::{HttpSearchBackend, MockSearchBackend, SearchBackend, SearchClient};
pub use tips::TipEngine;
pub use weekly::{most_recent_completed_week, run_pipeline, EventSink, WeeklyConfig, WeeklyEvent};
