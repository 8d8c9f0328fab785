use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{PanelConfig, SeriesKind, TimeWindow, UnixTime, VariableRef};
use crate::error::{HistoryError, HistoryResult};

use super::backend::{HistoryBackend, ReadStatus};
use super::data::{HistoryData, SeriesStatus};

/// Event carrying the synthetic run-marker channels.
pub const RUN_TRANSITIONS_EVENT: &str = "Run transitions";
pub const RUN_STATE_TAG: &str = "State";
pub const RUN_NUMBER_TAG: &str = "Run number";

/// Parameters of one panel query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub window: TimeWindow,
    /// Minimum spacing between returned samples in seconds; `0` keeps all.
    #[serde(default)]
    pub downsample: i64,
    #[serde(default)]
    pub run_markers: bool,
}

impl HistoryQuery {
    #[must_use]
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            downsample: 0,
            run_markers: false,
        }
    }

    #[must_use]
    pub fn with_downsample(mut self, downsample: i64) -> Self {
        self.downsample = downsample;
        self
    }

    #[must_use]
    pub fn with_run_markers(mut self, run_markers: bool) -> Self {
        self.run_markers = run_markers;
        self
    }

    /// Query over `window` honoring the panel's run-marker setting.
    #[must_use]
    pub fn for_panel(panel: &PanelConfig, window: TimeWindow) -> Self {
        Self::new(window).with_run_markers(panel.show_run_markers)
    }

    fn validate(self) -> HistoryResult<Self> {
        if self.window.end <= self.window.start {
            return Err(HistoryError::InvalidData(
                "query window end must be after start".to_owned(),
            ));
        }
        if self.downsample < 0 {
            return Err(HistoryError::InvalidData(
                "downsample interval must be >= 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// References of the run state and run number channels, in batch order.
#[must_use]
pub fn run_marker_refs() -> [(VariableRef, SeriesKind); 2] {
    [
        (
            VariableRef::new(RUN_TRANSITIONS_EVENT, RUN_STATE_TAG),
            SeriesKind::RunState,
        ),
        (
            VariableRef::new(RUN_TRANSITIONS_EVENT, RUN_NUMBER_TAG),
            SeriesKind::RunNumber,
        ),
    ]
}

/// Issues the batched backend reads for one panel.
#[derive(Debug, Clone, Copy)]
pub struct HistoryQueryEngine<B> {
    backend: B,
}

impl<B: HistoryBackend> HistoryQueryEngine<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Reads every panel variable (and optionally the run markers) over the
    /// query window.
    ///
    /// The result is index-aligned with `panel.variables`, run markers
    /// appended last. When any series comes back empty or unknown, a
    /// last-written lookup at the window end is attached so callers can tell
    /// "no data ever" from "no data in this window".
    pub fn query(&self, panel: &PanelConfig, query: HistoryQuery) -> HistoryResult<HistoryData> {
        let query = query.validate()?;

        let mut requests: Vec<(VariableRef, SeriesKind)> = panel
            .variables
            .iter()
            .enumerate()
            .map(|(position, variable)| {
                (variable.reference.clone(), SeriesKind::Variable(position))
            })
            .collect();
        if query.run_markers {
            requests.extend(run_marker_refs());
        }
        let refs: Vec<VariableRef> = requests
            .iter()
            .map(|(reference, _)| reference.clone())
            .collect();

        debug!(
            series = refs.len(),
            start = query.window.start,
            end = query.window.end,
            downsample = query.downsample,
            "history batch read"
        );
        let readouts = self.backend.read_series(
            query.window.start,
            query.window.end,
            query.downsample,
            &refs,
        )?;
        if readouts.len() != refs.len() {
            return Err(HistoryError::BackendRead(format!(
                "backend returned {} series for {} requested",
                readouts.len(),
                refs.len()
            )));
        }

        let mut data = HistoryData::with_capacity(refs.len());
        let mut incomplete = false;
        for ((reference, kind), readout) in requests.into_iter().zip(readouts) {
            let status = match readout.status {
                ReadStatus::NotFound => {
                    warn!(variable = %reference, "history variable not found");
                    SeriesStatus::NotFound
                }
                ReadStatus::Ok if readout.timestamps.is_empty() => SeriesStatus::NoDataInWindow,
                ReadStatus::Ok => SeriesStatus::Ok,
            };
            incomplete |= status != SeriesStatus::Ok;
            trace!(
                variable = %reference,
                entries = readout.timestamps.len(),
                ?status,
                "history series read"
            );
            data.push(reference, kind, status, readout.timestamps, readout.values)?;
        }

        if incomplete {
            let last_written = self.backend.last_written(query.window.end, &refs)?;
            debug!(
                series = last_written.len(),
                "attached last-written times for incomplete batch"
            );
            data.set_last_written(clamp_future(last_written, query.window.end))?;
        }

        Ok(data)
    }
}

fn clamp_future(mut times: Vec<UnixTime>, at: UnixTime) -> Vec<UnixTime> {
    for time in &mut times {
        *time = (*time).min(at);
    }
    times
}
