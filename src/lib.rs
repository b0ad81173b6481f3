//! Sprint analytics aggregation engine.
//!
//! Fetches one sprint's issue-tracker and source-control data through a
//! [`provider::DataProvider`], caches intermediate artifacts in a
//! [`cache::CacheStore`], and assembles a tiered [`report::Report`].

pub mod cache;
pub mod config;
pub mod correlation;
pub mod error;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod report;
pub mod velocity;

pub use config::Config;
pub use error::{Error, Result};
pub use report::{Report, ReportRequest, ReportSections, SprintOrchestrator};
