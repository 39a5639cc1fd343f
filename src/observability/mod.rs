//! Observability subsystem.
//!
//! # Responsibilities
//! - Initialize structured logging and keep a reload handle so the
//!   bootstrap logging stage can apply the configured filter
//! - Expose a Prometheus scrape endpoint when enabled
//! - Record bootstrap stage timings and outcomes

pub mod logging;
pub mod metrics;
