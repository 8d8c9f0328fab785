use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{UnixTime, VariableRef};
use crate::error::{HistoryError, HistoryResult};

/// Per-variable outcome reported by a batched backend read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadStatus {
    Ok,
    /// The backend does not know this event/tag pair.
    NotFound,
}

/// Raw samples for one requested variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReadout {
    pub status: ReadStatus,
    pub timestamps: Vec<UnixTime>,
    pub values: Vec<f64>,
}

impl SeriesReadout {
    #[must_use]
    pub fn new(timestamps: Vec<UnixTime>, values: Vec<f64>) -> Self {
        Self {
            status: ReadStatus::Ok,
            timestamps,
            values,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: ReadStatus::NotFound,
            timestamps: Vec::new(),
            values: Vec::new(),
        }
    }
}

/// Read contract of a history store.
///
/// Both calls are batched: results are index-aligned with `vars`. A returned
/// `Err` fails the whole batch; unknown variables are reported per entry.
pub trait HistoryBackend {
    /// Samples in `[start, end]`, keeping at most one sample per `downsample`
    /// seconds when `downsample > 0`. Timestamps are non-decreasing.
    fn read_series(
        &self,
        start: UnixTime,
        end: UnixTime,
        downsample: i64,
        vars: &[VariableRef],
    ) -> HistoryResult<Vec<SeriesReadout>>;

    /// Time of the last sample at or before `at` per variable; `0` when the
    /// variable was never written.
    fn last_written(&self, at: UnixTime, vars: &[VariableRef]) -> HistoryResult<Vec<UnixTime>>;
}

impl<B: HistoryBackend + ?Sized> HistoryBackend for &B {
    fn read_series(
        &self,
        start: UnixTime,
        end: UnixTime,
        downsample: i64,
        vars: &[VariableRef],
    ) -> HistoryResult<Vec<SeriesReadout>> {
        (**self).read_series(start, end, downsample, vars)
    }

    fn last_written(&self, at: UnixTime, vars: &[VariableRef]) -> HistoryResult<Vec<UnixTime>> {
        (**self).last_written(at, vars)
    }
}

impl fmt::Debug for dyn HistoryBackend + Send + Sync + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryBackend").finish_non_exhaustive()
    }
}

pub type SharedBackend = Box<dyn HistoryBackend + Send + Sync>;
type Connector = Box<dyn Fn() -> HistoryResult<SharedBackend> + Send + Sync>;

/// Service-owned connection to the history store.
///
/// The service's own configuration watch calls [`Self::reconnect`] when the
/// history channel changes; nothing in this crate keeps process-wide state.
pub struct HistoryBackendHandle {
    connector: Connector,
    backend: Option<SharedBackend>,
}

impl fmt::Debug for HistoryBackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryBackendHandle")
            .field("connected", &self.backend.is_some())
            .finish()
    }
}

impl HistoryBackendHandle {
    /// Creates a disconnected handle; call [`Self::reconnect`] to open it.
    #[must_use]
    pub fn new(
        connector: impl Fn() -> HistoryResult<SharedBackend> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            backend: None,
        }
    }

    /// Creates a handle and connects it immediately.
    pub fn connect(
        connector: impl Fn() -> HistoryResult<SharedBackend> + Send + Sync + 'static,
    ) -> HistoryResult<Self> {
        let mut handle = Self::new(connector);
        handle.reconnect()?;
        Ok(handle)
    }

    /// Drops the current backend and opens a fresh one.
    ///
    /// On failure the handle stays disconnected.
    pub fn reconnect(&mut self) -> HistoryResult<()> {
        self.backend = None;
        match (self.connector)() {
            Ok(backend) => {
                debug!("history backend connected");
                self.backend = Some(backend);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "history backend connection failed");
                Err(match err {
                    HistoryError::BackendUnavailable(_) => err,
                    other => HistoryError::BackendUnavailable(other.to_string()),
                })
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.backend = None;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> HistoryResult<&(dyn HistoryBackend + Send + Sync)> {
        self.backend
            .as_deref()
            .ok_or_else(|| HistoryError::BackendUnavailable("no history channel".to_owned()))
    }
}
