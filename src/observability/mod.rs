//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatches and middlewares produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers and exporters is the
//!   binary's job
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
