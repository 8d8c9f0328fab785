use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::core::{PanelConfig, RunState, SeriesKind, UnixTime, VariableRef};
use crate::history::HistoryData;

/// Header entry of one exported variable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
    pub reference: VariableRef,
}

/// Run number and state valid at a row's time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCell {
    pub number: Option<i64>,
    pub state: Option<RunState>,
}

/// Values of every variable valid at `time`; `None` means no sample yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub time: UnixTime,
    pub run: Option<RunCell>,
    pub values: SmallVec<[Option<f64>; 8]>,
}

/// Rows keyed on the union of sample instants, step-held per variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedTable {
    pub columns: Vec<ColumnHeader>,
    pub run_markers: bool,
    pub rows: Vec<AlignedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Table(AlignedTable),
    /// No panel variable has a single sample to anchor the table on.
    NoData,
}

impl ExportOutcome {
    #[must_use]
    pub fn table(&self) -> Option<&AlignedTable> {
        match self {
            Self::Table(table) => Some(table),
            Self::NoData => None,
        }
    }
}

/// Merges all series of `data` into one row per distinct change time.
///
/// Each row holds, for every variable, the last sample at or before the row
/// time. The first row sits at the latest first-sample time over the panel
/// variables so every variable with data already has a value; run-marker
/// channels add rows at their transitions but do not delay the first row.
#[must_use]
pub fn merge_series(data: &HistoryData, panel: &PanelConfig) -> ExportOutcome {
    let series: Vec<_> = data.iter().collect();
    let run_state = data.position_of(SeriesKind::RunState);
    let run_number = data.position_of(SeriesKind::RunNumber);
    let run_markers = run_state.is_some() && run_number.is_some();

    let value_columns: Vec<usize> = series
        .iter()
        .enumerate()
        .filter(|(_, view)| !view.kind.is_run_marker())
        .map(|(position, _)| position)
        .collect();

    let Some(mut time) = value_columns
        .iter()
        .filter_map(|position| series[*position].timestamps.first().copied())
        .max()
    else {
        debug!(series = series.len(), "export has no data");
        return ExportOutcome::NoData;
    };

    let columns = value_columns
        .iter()
        .map(|position| {
            let view = &series[*position];
            let name = view
                .kind
                .variable_position()
                .and_then(|index| panel.variables.get(index))
                .map_or_else(|| view.reference.to_string(), |variable| variable.display_name());
            ColumnHeader {
                name,
                reference: view.reference.clone(),
            }
        })
        .collect();

    // `None` until the first sample at or before the current time is consumed.
    let mut cursors: Vec<Option<usize>> = vec![None; series.len()];
    let mut rows = Vec::new();
    loop {
        for (cursor, view) in cursors.iter_mut().zip(&series) {
            let mut next = cursor.map_or(0, |consumed| consumed + 1);
            while next < view.len() && view.timestamps[next] <= time {
                *cursor = Some(next);
                next += 1;
            }
        }

        let value_at =
            |position: usize| cursors[position].map(|index| series[position].values[index]);
        let run = run_markers.then(|| RunCell {
            number: run_number
                .and_then(value_at)
                .map(|value| value.round() as i64),
            state: run_state.and_then(value_at).map(RunState::from_value),
        });
        rows.push(AlignedRow {
            time,
            run,
            values: value_columns.iter().map(|position| value_at(*position)).collect(),
        });

        let upcoming = cursors
            .iter()
            .zip(&series)
            .filter_map(|(cursor, view)| {
                let next = cursor.map_or(0, |consumed| consumed + 1);
                view.timestamps.get(next).copied()
            })
            .min();
        match upcoming {
            Some(next_time) => time = next_time,
            None => break,
        }
    }

    debug!(
        rows = rows.len(),
        columns = value_columns.len(),
        run_markers,
        "export merge complete"
    );
    ExportOutcome::Table(AlignedTable {
        columns,
        run_markers,
        rows,
    })
}
