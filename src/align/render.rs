use serde::{Deserialize, Serialize};

use crate::core::{PanelConfig, PanelVariable, ScaleMode, TimeWindow, UnixTime, ValueScale};
use crate::error::{HistoryError, HistoryResult};
use crate::history::{HistoryData, SeriesView};

/// Floor applied to logarithmic axes whose minimum is not positive.
pub const LOG_AXIS_FLOOR: f64 = 1e-12;

/// Average samples per occupied pixel column above which columns collapse.
const AGGREGATE_SAMPLES_PER_COLUMN: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn span(self) -> f64 {
        self.max - self.min
    }
}

/// Pixel rectangle of the plot area; `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> HistoryResult<Self> {
        if ![left, top, width, height].iter().all(|value| value.is_finite())
            || width <= 0.0
            || height <= 0.0
        {
            return Err(HistoryError::InvalidData(
                "plot area must be finite with positive size".to_owned(),
            ));
        }
        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn clamp(self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(self.left, self.right()),
            y.clamp(self.top, self.bottom()),
        )
    }
}

/// Which panel variables take part in range computation and drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    All,
    /// Only the panel variable at this position.
    Solo(usize),
}

impl Visibility {
    #[must_use]
    pub fn shows(self, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::Solo(solo) => solo == position,
        }
    }
}

/// One projected series; each run is a connected polyline, broken at
/// non-finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    /// Index of the series in the query result.
    pub series: usize,
    /// Position of the owning panel variable.
    pub variable: usize,
    pub runs: Vec<Vec<(f64, f64)>>,
}

impl Polyline {
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.runs.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.runs.iter().map(|run| run.len().saturating_sub(1)).sum()
    }
}

fn panel_variable<'a>(
    panel: &'a PanelConfig,
    view: &SeriesView<'_>,
) -> Option<(usize, &'a PanelVariable)> {
    let position = view.kind.variable_position()?;
    Some((position, panel.variables.get(position)?))
}

/// Samples of series `index` after applying its variable's factor and offset.
#[must_use]
pub fn scaled_samples(
    data: &HistoryData,
    panel: &PanelConfig,
    index: usize,
) -> Vec<(UnixTime, f64)> {
    let Some(view) = data.series(index) else {
        return Vec::new();
    };
    let Some((_, variable)) = panel_variable(panel, &view) else {
        return Vec::new();
    };
    view.timestamps
        .iter()
        .zip(view.values)
        .map(|(time, value)| (*time, variable.scale(*value)))
        .collect()
}

/// Min/max of all visible, finite, scaled values before any padding.
///
/// On logarithmic axes only positive values count.
#[must_use]
pub fn natural_value_range(
    data: &HistoryData,
    panel: &PanelConfig,
    visibility: Visibility,
) -> Option<ValueRange> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for view in data.iter() {
        let Some((position, variable)) = panel_variable(panel, &view) else {
            continue;
        };
        if !visibility.shows(position) {
            continue;
        }
        for value in view.values.iter().map(|raw| variable.scale(*raw)) {
            if !value.is_finite() || (panel.log_axis && value <= 0.0) {
                continue;
            }
            min = min.min(value);
            max = max.max(value);
        }
    }
    (min <= max).then_some(ValueRange { min, max })
}

/// Final axis range: zero-y-low, padding, then explicit panel overrides.
#[must_use]
pub fn resolve_value_range(
    natural: Option<ValueRange>,
    panel: &PanelConfig,
    padding_ratio: f64,
) -> ValueRange {
    let padding_ratio = if padding_ratio.is_finite() {
        padding_ratio.max(0.0)
    } else {
        0.0
    };

    let mut range = if panel.log_axis {
        resolve_log_range(natural, padding_ratio)
    } else {
        resolve_linear_range(natural, panel.zero_y_low, padding_ratio)
    };

    if let Some(minimum) = panel.minimum {
        range.min = minimum;
    }
    if let Some(maximum) = panel.maximum {
        range.max = maximum;
    }
    if panel.log_axis && range.min <= 0.0 {
        range.min = LOG_AXIS_FLOOR;
    }
    if range.max <= range.min {
        range.max = if panel.log_axis {
            range.min * 10.0
        } else {
            range.min + 1.0
        };
    }
    range
}

fn resolve_linear_range(
    natural: Option<ValueRange>,
    zero_y_low: bool,
    padding_ratio: f64,
) -> ValueRange {
    let Some(ValueRange { mut min, mut max }) = natural else {
        return ValueRange::new(0.0, 1.0);
    };
    if zero_y_low && min > 0.0 {
        min = 0.0;
    }
    if max == min {
        let half = if min == 0.0 { 1.0 } else { min.abs() * 0.05 };
        return ValueRange::new(min - half, max + half);
    }
    let pad = (max - min) * padding_ratio;
    if !(zero_y_low && min == 0.0) {
        min -= pad;
    }
    max += pad;
    ValueRange::new(min, max)
}

fn resolve_log_range(natural: Option<ValueRange>, padding_ratio: f64) -> ValueRange {
    let Some(ValueRange { min, max }) = natural else {
        return ValueRange::new(1.0, 10.0);
    };
    if max == min {
        return ValueRange::new(min / 10.0, max * 10.0);
    }
    let factor = (max / min).powf(padding_ratio);
    ValueRange::new(min / factor, max * factor)
}

/// Projects time/value samples into plot-area pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesProjector {
    window: TimeWindow,
    area: PlotArea,
    y_scale: ValueScale,
}

impl SeriesProjector {
    pub fn new(
        window: TimeWindow,
        area: PlotArea,
        range: ValueRange,
        mode: ScaleMode,
    ) -> HistoryResult<Self> {
        let y_scale = ValueScale::with_mode(range.min, range.max, area.height, mode)?;
        Ok(Self {
            window,
            area,
            y_scale,
        })
    }

    #[must_use]
    pub fn time_to_x(&self, time: UnixTime) -> f64 {
        let elapsed = (time - self.window.start) as f64;
        self.area.left + elapsed / self.window.span() as f64 * self.area.width
    }

    #[must_use]
    pub fn value_to_y(&self, value: f64) -> Option<f64> {
        self.y_scale
            .value_to_offset(value)
            .map(|offset| self.area.bottom() - offset)
    }

    #[must_use]
    pub fn area(&self) -> PlotArea {
        self.area
    }

    /// Projects one series; non-finite values end the current run and the
    /// line resumes at the next valid sample.
    #[must_use]
    pub fn project(
        &self,
        view: &SeriesView<'_>,
        variable: &PanelVariable,
    ) -> Vec<Vec<(f64, f64)>> {
        let mut runs = Vec::new();
        let mut current: Vec<(f64, f64)> = Vec::new();
        for (time, raw) in view.timestamps.iter().zip(view.values) {
            let point = self
                .value_to_y(variable.scale(*raw))
                .map(|y| self.area.clamp(self.time_to_x(*time), y));
            match point {
                Some(point) => current.push(point),
                None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

/// Projects every visible panel series.
///
/// When the average number of samples per occupied pixel column exceeds two,
/// each column collapses to its first, minimum, maximum and last value.
#[must_use]
pub fn project_panel(
    data: &HistoryData,
    panel: &PanelConfig,
    projector: &SeriesProjector,
    visibility: Visibility,
) -> Vec<Polyline> {
    let visible: Vec<(usize, usize)> = data
        .iter()
        .enumerate()
        .filter_map(|(index, view)| {
            let (position, _) = panel_variable(panel, &view)?;
            visibility.shows(position).then_some((index, position))
        })
        .collect();

    let project_one = |(index, position): (usize, usize)| -> Option<Polyline> {
        let view = data.series(index)?;
        let variable = panel.variables.get(position)?;
        Some(Polyline {
            series: index,
            variable: position,
            runs: projector.project(&view, variable),
        })
    };

    #[cfg(feature = "parallel-projection")]
    let mut polylines: Vec<Polyline> = {
        use rayon::prelude::*;
        visible.into_par_iter().filter_map(project_one).collect()
    };
    #[cfg(not(feature = "parallel-projection"))]
    let mut polylines: Vec<Polyline> = visible.into_iter().filter_map(project_one).collect();

    let points: usize = polylines.iter().map(Polyline::point_count).sum();
    let columns: usize = polylines
        .iter()
        .flat_map(|polyline| &polyline.runs)
        .map(|run| occupied_columns(run))
        .sum();
    if columns > 0 && points as f64 / columns as f64 > AGGREGATE_SAMPLES_PER_COLUMN {
        for polyline in &mut polylines {
            for run in &mut polyline.runs {
                *run = aggregate_columns(run);
            }
        }
    }
    polylines
}

fn occupied_columns(run: &[(f64, f64)]) -> usize {
    let mut count = 0;
    let mut last_column = None;
    for (x, _) in run {
        let column = x.floor();
        if last_column != Some(column) {
            count += 1;
            last_column = Some(column);
        }
    }
    count
}

/// Collapses consecutive points sharing a pixel column into first, min,
/// max and last, keeping the order in which min and max occurred.
fn aggregate_columns(run: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(run.len());
    let mut start = 0;
    while start < run.len() {
        let column = run[start].0.floor();
        let end = run[start..]
            .iter()
            .position(|(x, _)| x.floor() != column)
            .map_or(run.len(), |offset| start + offset);
        let group = &run[start..end];

        let mut min_at = 0;
        let mut max_at = 0;
        for (position, (_, y)) in group.iter().enumerate() {
            if *y < group[min_at].1 {
                min_at = position;
            }
            if *y > group[max_at].1 {
                max_at = position;
            }
        }
        let mut picks = vec![0, min_at, max_at, group.len() - 1];
        picks.sort_unstable();
        picks.dedup();
        out.extend(picks.into_iter().map(|position| (column, group[position].1)));
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{aggregate_columns, occupied_columns};

    #[test]
    fn aggregation_keeps_envelope_of_each_column() {
        let run = vec![(0.1, 5.0), (0.4, 1.0), (0.6, 9.0), (0.9, 4.0), (1.2, 3.0)];
        let out = aggregate_columns(&run);
        assert_eq!(
            out,
            vec![(0.0, 5.0), (0.0, 1.0), (0.0, 9.0), (0.0, 4.0), (1.0, 3.0)]
        );
        assert_eq!(occupied_columns(&run), 2);
    }
}
