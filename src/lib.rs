// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod collect;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod optimize;
pub mod report;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Analyzer, MetricsSummary};
pub use crate::api::{router, AppState};
pub use crate::collect::{CollectionResult, Collector, SourceProvider, SourceRecord};
pub use crate::config::AppConfig;
pub use crate::controller::{Controller, CycleOutcome, Stage};
pub use crate::error::{CycleAborted, PipelineError};
pub use crate::optimize::{ApplyReport, Optimizer, Strategy};
pub use crate::report::{ReportOutcome, Reporter};
