//! histview: historical time-series query, alignment and chart composition.
//!
//! A panel names telemetry variables with per-variable scaling. For any
//! time window the engine reads their samples from a pluggable
//! [`history::HistoryBackend`], aligns them onto one timeline, chooses
//! linear, logarithmic and calendar axis ticks, and produces either a
//! backend-agnostic [`render::RenderFrame`] or a merged export table.

pub mod align;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod render;
pub mod store;
pub mod telemetry;

pub use config::{ChartStyle, EngineConfig};
pub use error::{HistoryError, HistoryResult};
