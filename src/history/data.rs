use serde::{Deserialize, Serialize};

use crate::core::{SeriesKind, UnixTime, VariableRef};
use crate::error::{HistoryError, HistoryResult};

/// Fetch outcome of one series in a query batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    Ok,
    /// Known to the backend but without samples in the window.
    NoDataInWindow,
    NotFound,
}

/// Result of one history query, index-aligned with the requested series.
///
/// All vectors have one entry per series and every series satisfies
/// `timestamps[i].len() == values[i].len()`. Samples keep the backend's
/// non-decreasing time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryData {
    refs: Vec<VariableRef>,
    kinds: Vec<SeriesKind>,
    status: Vec<SeriesStatus>,
    timestamps: Vec<Vec<UnixTime>>,
    values: Vec<Vec<f64>>,
    last_written: Option<Vec<UnixTime>>,
}

/// Borrowed view of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesView<'a> {
    pub reference: &'a VariableRef,
    pub kind: SeriesKind,
    pub status: SeriesStatus,
    pub timestamps: &'a [UnixTime],
    pub values: &'a [f64],
    pub last_written: Option<UnixTime>,
}

impl SeriesView<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Most recent sample in the window.
    #[must_use]
    pub fn last_sample(&self) -> Option<(UnixTime, f64)> {
        Some((*self.timestamps.last()?, *self.values.last()?))
    }

    /// `true` when a last-written lookup proved the variable never had data.
    #[must_use]
    pub fn never_written(&self) -> bool {
        self.last_written == Some(0) || self.status == SeriesStatus::NotFound
    }
}

impl HistoryData {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            refs: Vec::with_capacity(capacity),
            kinds: Vec::with_capacity(capacity),
            status: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            last_written: None,
        }
    }

    /// Appends one series, enforcing the parallel-array invariants.
    pub fn push(
        &mut self,
        reference: VariableRef,
        kind: SeriesKind,
        status: SeriesStatus,
        timestamps: Vec<UnixTime>,
        values: Vec<f64>,
    ) -> HistoryResult<()> {
        if timestamps.len() != values.len() {
            return Err(HistoryError::BackendRead(format!(
                "`{reference}` returned {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if timestamps.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(HistoryError::BackendRead(format!(
                "`{reference}` returned decreasing timestamps"
            )));
        }

        self.refs.push(reference);
        self.kinds.push(kind);
        self.status.push(status);
        self.timestamps.push(timestamps);
        self.values.push(values);
        Ok(())
    }

    /// Attaches last-written times, one per series.
    pub fn set_last_written(&mut self, last_written: Vec<UnixTime>) -> HistoryResult<()> {
        if last_written.len() != self.len() {
            return Err(HistoryError::BackendRead(format!(
                "last-written lookup returned {} entries for {} series",
                last_written.len(),
                self.len()
            )));
        }
        self.last_written = Some(last_written);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    #[must_use]
    pub fn num_entries(&self, index: usize) -> usize {
        self.timestamps.get(index).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn series(&self, index: usize) -> Option<SeriesView<'_>> {
        Some(SeriesView {
            reference: self.refs.get(index)?,
            kind: *self.kinds.get(index)?,
            status: *self.status.get(index)?,
            timestamps: self.timestamps.get(index)?,
            values: self.values.get(index)?,
            last_written: self
                .last_written
                .as_ref()
                .and_then(|last| last.get(index).copied()),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = SeriesView<'_>> + '_ {
        (0..self.len()).filter_map(|index| self.series(index))
    }

    /// Position of the series holding the given kind, if present.
    #[must_use]
    pub fn position_of(&self, kind: SeriesKind) -> Option<usize> {
        self.kinds.iter().position(|known| *known == kind)
    }

    #[must_use]
    pub fn has_run_markers(&self) -> bool {
        self.position_of(SeriesKind::RunState).is_some()
            && self.position_of(SeriesKind::RunNumber).is_some()
    }

    #[must_use]
    pub fn last_written(&self) -> Option<&[UnixTime]> {
        self.last_written.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> &[SeriesStatus] {
        &self.status
    }
}
