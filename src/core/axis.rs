//! Adaptive tick selection for linear, logarithmic and calendar time axes.
//!
//! Every scaler is a pure function of its range, pixel length and tuning.
//! Malformed ranges produce an empty [`AxisSpec`] instead of an error so a
//! caller can always treat "no ticks" as "nothing to draw".

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::scale::{ScaleMode, ValueScale};
use crate::core::types::UnixTime;
use crate::error::{HistoryError, HistoryResult};

/// Spans at or below this magnitude cannot be resolved into ticks.
const MIN_RESOLVABLE_SPAN: f64 = 1e-10;
/// Spans must exceed this many ulps of the larger bound.
const MIN_RESOLVABLE_ULPS: f64 = 16.0;
/// Largest `|value| / tick_unit` for which consecutive ticks stay distinct.
const MAX_TICK_INDEX: f64 = 1_099_511_627_776.0; // 2^40
/// Labels never use fewer significant digits than this.
const MIN_SIGNIFICANT_DIGITS: usize = 4;
/// Upper bound on label-step growth iterations.
const MAX_LABEL_STEP_GROWTH: usize = 64;
/// Upper bound on emitted ticks for pathological pixel lengths.
const MAX_TICKS: usize = 20_000;
/// Tolerance in pixels when deciding whether a tick lies on the axis.
const EDGE_TOLERANCE_PX: f64 = 0.001;

const DAY_SECONDS: i64 = 86_400;
/// Caps day-step doubling well below `i64` overflow.
const MAX_DAY_DOUBLINGS: usize = 40;

/// Human-friendly time tick steps, in seconds.
pub const TIME_STEPS: [i64; 11] = [
    1, 5, 10, 60, 300, 600, 1_800, 3_600, 21_600, 43_200, DAY_SECONDS,
];

/// Pixel and font constants driving tick density and label overlap checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisTuning {
    /// Smallest distance between two minor ticks.
    pub min_tick_spacing_px: f64,
    /// A label step is accepted when the widest label is at most this
    /// fraction of the label spacing in pixels.
    pub label_overlap_factor: f64,
    /// Average glyph advance used to estimate label widths.
    pub char_width_px: f64,
    pub label_height_px: f64,
    /// Free space kept between adjacent labels on logarithmic axes.
    pub label_gap_px: f64,
}

impl Default for AxisTuning {
    fn default() -> Self {
        Self {
            min_tick_spacing_px: 5.0,
            label_overlap_factor: 0.7,
            char_width_px: 7.0,
            label_height_px: 12.0,
            label_gap_px: 2.0,
        }
    }
}

impl AxisTuning {
    pub fn validate(self) -> HistoryResult<Self> {
        for (name, value) in [
            ("min_tick_spacing_px", self.min_tick_spacing_px),
            ("label_overlap_factor", self.label_overlap_factor),
            ("char_width_px", self.char_width_px),
            ("label_height_px", self.label_height_px),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(HistoryError::InvalidData(format!(
                    "axis tuning `{name}` must be finite and > 0"
                )));
            }
        }
        if !self.label_gap_px.is_finite() || self.label_gap_px < 0.0 {
            return Err(HistoryError::InvalidData(
                "axis tuning `label_gap_px` must be finite and >= 0".to_owned(),
            ));
        }
        Ok(self)
    }

    #[must_use]
    pub fn label_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width_px
    }

    fn label_extent(&self, text: &str, orientation: AxisOrientation) -> f64 {
        match orientation {
            AxisOrientation::Horizontal => self.label_width(text),
            AxisOrientation::Vertical => self.label_height_px,
        }
    }
}

/// Direction along which an axis grows; decides which label dimension
/// competes for space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOrientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickKind {
    Minor,
    Major,
    Labelled,
}

/// Placed label text; `start_px..start_px + extent_px` is its span along the axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLabel {
    pub text: String,
    pub start_px: f64,
    pub extent_px: f64,
}

impl AxisLabel {
    #[must_use]
    pub fn end_px(&self) -> f64 {
        self.start_px + self.extent_px
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    /// Domain value (seconds for time axes).
    pub value: f64,
    /// Distance from the range start, in pixels.
    pub offset_px: f64,
    pub kind: TickKind,
    pub label: Option<AxisLabel>,
}

/// Scaler output: chosen units plus ticks in ascending order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisSpec {
    pub tick_unit: f64,
    pub major_unit: f64,
    pub label_unit: f64,
    pub significant_digits: usize,
    pub force_calendar_date: bool,
    pub ticks: Vec<AxisTick>,
}

impl AxisSpec {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &AxisLabel> {
        self.ticks.iter().filter_map(|tick| tick.label.as_ref())
    }

    /// Largest label extent, used to size the axis gutter.
    #[must_use]
    pub fn max_label_width(&self, tuning: &AxisTuning) -> f64 {
        self.labels()
            .map(|label| tuning.label_width(&label.text))
            .fold(0.0, f64::max)
    }
}

fn is_resolvable_range(vmin: f64, vmax: f64, length_px: f64) -> bool {
    vmin.is_finite()
        && vmax.is_finite()
        && length_px.is_finite()
        && length_px > 0.0
        && vmax > vmin
        && (vmax - vmin) > MIN_RESOLVABLE_SPAN
        && (vmax - vmin) > MIN_RESOLVABLE_ULPS * f64::EPSILON * vmin.abs().max(vmax.abs())
}

/// Nice-number step for `index` in the cycle 1, 2, 5, 10, 20, 50, ...
fn nice_step(decade: f64, index: usize) -> f64 {
    const BASES: [f64; 3] = [1.0, 2.0, 5.0];
    decade * BASES[index % 3] * 10f64.powi((index / 3) as i32)
}

/// Index of the smallest base in {1, 2, 5, 10} not below `10^fraction`.
fn nice_base_index(fraction: f64) -> usize {
    const EPSILON: f64 = 1e-9;
    if fraction <= EPSILON {
        0
    } else if fraction <= 2f64.log10() + EPSILON {
        1
    } else if fraction <= 5f64.log10() + EPSILON {
        2
    } else {
        3
    }
}

fn is_multiple_of(value: f64, unit: f64, tick_unit: f64) -> bool {
    let ratio = value / unit;
    (ratio.round() - ratio).abs() < tick_unit / unit / 10.0
}

fn significant_digits(vmin: f64, vmax: f64, label_unit: f64) -> usize {
    let label_decade = label_unit.abs().log10().floor();
    let digits_for = |value: f64| -> f64 {
        if value == 0.0 {
            1.0
        } else {
            value.abs().log10().floor() - label_decade + 1.0
        }
    };

    let mut digits = digits_for(vmin).max(digits_for(vmax));
    // Keep the integer part intact so 1050 does not collapse to 1.05e+3.
    for value in [vmin, vmax] {
        if value != 0.0 && value.abs() < 100_000.0 {
            digits = digits.max((value.abs().log10() + 0.001).floor() + 1.0);
        }
    }

    (digits.max(0.0) as usize).max(MIN_SIGNIFICANT_DIGITS)
}

/// Formats `value` with `digits` significant digits, dropping trailing zeros.
///
/// Switches to exponent notation (`1.5e+7`) when the exponent is below -6 or
/// not smaller than `digits`.
#[must_use]
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    let digits = digits.max(1);
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= digits as i32 {
        let formatted = format!("{:.*e}", digits - 1, value);
        let (mantissa, exponent) = formatted
            .split_once('e')
            .unwrap_or((formatted.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{sign}{}", strip_zeros(mantissa), exponent.abs());
    }

    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    strip_zeros(&format!("{value:.decimals$}")).to_owned()
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Label centred on its tick, clamped to `[0, length_px]`.
fn centered_label(
    text: String,
    offset_px: f64,
    length_px: f64,
    orientation: AxisOrientation,
    tuning: &AxisTuning,
) -> Option<AxisLabel> {
    let extent_px = tuning.label_extent(&text, orientation);
    if extent_px > length_px {
        return None;
    }
    // Edge labels slide inwards rather than overhang the axis.
    let start_px = (offset_px - extent_px / 2.0).clamp(0.0, length_px - extent_px);
    Some(AxisLabel {
        text,
        start_px,
        extent_px,
    })
}

/// Chooses nice tick spacing for a linear numeric axis.
#[must_use]
pub fn linear_axis(
    vmin: f64,
    vmax: f64,
    length_px: f64,
    orientation: AxisOrientation,
    tuning: &AxisTuning,
) -> AxisSpec {
    if !is_resolvable_range(vmin, vmax, length_px) {
        return AxisSpec::empty();
    }

    let span = vmax - vmin;
    let raw_step = span / (length_px / tuning.min_tick_spacing_px);
    if !raw_step.is_finite() || raw_step <= 0.0 {
        return AxisSpec::empty();
    }
    let log_step = raw_step.log10();
    let exponent = log_step.floor();
    let decade = 10f64.powi(exponent as i32);
    let tick_index = nice_base_index(log_step - exponent);
    let tick_unit = nice_step(decade, tick_index);
    if vmin.abs().max(vmax.abs()) / tick_unit > MAX_TICK_INDEX {
        return AxisSpec::empty();
    }

    let mut major_index = tick_index + 1;
    let mut label_index = tick_index + 2;
    let mut digits;
    loop {
        while !is_multiple_of(
            nice_step(decade, label_index),
            nice_step(decade, major_index),
            tick_unit,
        ) {
            major_index += 1;
        }

        let label_unit = nice_step(decade, label_index);
        digits = significant_digits(vmin, vmax, label_unit);
        let first = (vmin / label_unit).floor() * label_unit;
        let last = (vmax / label_unit).floor() * label_unit;
        let widest = [first, last, last + label_unit]
            .into_iter()
            .map(|value| tuning.label_extent(&format_significant(value, digits), orientation))
            .fold(0.0, f64::max);

        let label_spacing_px = label_unit / span * length_px;
        if widest <= tuning.label_overlap_factor * label_spacing_px
            || label_index >= tick_index + MAX_LABEL_STEP_GROWTH
        {
            break;
        }
        label_index += 1;
    }

    let major_unit = nice_step(decade, major_index);
    let label_unit = nice_step(decade, label_index);

    let mut ticks = Vec::new();
    let first_step = (vmin / tick_unit).floor() as i64;
    for step in first_step..first_step + MAX_TICKS as i64 {
        let mut value = step as f64 * tick_unit;
        if value.abs() < tick_unit / 100.0 {
            value = 0.0;
        }

        let offset_px = (value - vmin) / span * length_px;
        if offset_px > length_px + EDGE_TOLERANCE_PX {
            break;
        }
        if offset_px < -EDGE_TOLERANCE_PX {
            continue;
        }

        let kind = if is_multiple_of(value, label_unit, tick_unit) {
            TickKind::Labelled
        } else if is_multiple_of(value, major_unit, tick_unit) {
            TickKind::Major
        } else {
            TickKind::Minor
        };
        let label = (kind == TickKind::Labelled)
            .then(|| {
                centered_label(
                    format_significant(value, digits),
                    offset_px,
                    length_px,
                    orientation,
                    tuning,
                )
            })
            .flatten();

        ticks.push(AxisTick {
            value,
            offset_px: offset_px.clamp(0.0, length_px),
            kind,
            label,
        });
    }

    AxisSpec {
        tick_unit,
        major_unit,
        label_unit,
        significant_digits: digits,
        force_calendar_date: false,
        ticks,
    }
}

/// Chooses decade-based ticks for a logarithmic axis.
///
/// Decades are labelled first; minor ticks then receive labels wherever
/// they keep clear of every label already placed.
#[must_use]
pub fn log_axis(
    vmin: f64,
    vmax: f64,
    length_px: f64,
    orientation: AxisOrientation,
    tuning: &AxisTuning,
) -> AxisSpec {
    if !is_resolvable_range(vmin, vmax, length_px) || vmin <= 0.0 {
        return AxisSpec::empty();
    }
    let Ok(scale) = ValueScale::with_mode(vmin, vmax, length_px, ScaleMode::Log) else {
        return AxisSpec::empty();
    };

    let mut exponent = vmin.log10().floor() as i32;
    let tick_unit = 10f64.powi(exponent);
    let mut mantissa = ((vmin / tick_unit) - 1e-9).ceil().max(1.0) as u32;

    let mut ticks = Vec::new();
    while ticks.len() < MAX_TICKS {
        if mantissa >= 10 {
            mantissa = 1;
            exponent += 1;
        }
        let value = f64::from(mantissa) * 10f64.powi(exponent);
        mantissa += 1;

        let Some(offset_px) = scale.value_to_offset(value) else {
            break;
        };
        if offset_px > length_px + EDGE_TOLERANCE_PX {
            break;
        }
        if offset_px < -EDGE_TOLERANCE_PX {
            continue;
        }

        let kind = if mantissa == 2 {
            TickKind::Labelled
        } else {
            TickKind::Minor
        };
        ticks.push(AxisTick {
            value,
            offset_px: offset_px.clamp(0.0, length_px),
            kind,
            label: None,
        });
    }

    let mut placed: Vec<(f64, f64)> = Vec::new();
    for pass_kind in [TickKind::Labelled, TickKind::Minor] {
        for tick in ticks.iter_mut().filter(|tick| tick.kind == pass_kind) {
            let text = format_significant(tick.value, MIN_SIGNIFICANT_DIGITS);
            let Some(label) = centered_label(text, tick.offset_px, length_px, orientation, tuning)
            else {
                continue;
            };
            let clear = placed.iter().all(|(start, end)| {
                label.end_px() + tuning.label_gap_px <= *start
                    || label.start_px >= *end + tuning.label_gap_px
            });
            if clear {
                placed.push((label.start_px, label.end_px()));
                tick.label = Some(label);
            }
        }
    }

    AxisSpec {
        tick_unit,
        major_unit: tick_unit * 10.0,
        label_unit: tick_unit * 10.0,
        significant_digits: MIN_SIGNIFICANT_DIGITS,
        force_calendar_date: false,
        ticks,
    }
}

/// Step in seconds for a time-step index.
///
/// Past the table the step doubles in whole days (2d, 4d, 8d, ...), so every
/// step divides the next and labelled ticks stay on the tick grid.
#[must_use]
pub fn time_step(index: usize) -> i64 {
    match TIME_STEPS.get(index) {
        Some(step) => *step,
        None => {
            let doublings = (index + 1 - TIME_STEPS.len()).min(MAX_DAY_DOUBLINGS);
            DAY_SECONDS << doublings
        }
    }
}

fn first_time_step_index(raw_step: i64) -> usize {
    if let Some(index) = TIME_STEPS.iter().position(|step| *step >= raw_step) {
        return index;
    }
    let days = (raw_step + DAY_SECONDS - 1) / DAY_SECONDS;
    let doublings = (days.max(1) as u64).next_power_of_two().trailing_zeros() as usize;
    TIME_STEPS.len() - 1 + doublings.min(MAX_DAY_DOUBLINGS)
}

fn local_date(time: UnixTime, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(time, 0).map(|utc| utc.with_timezone(&offset).date_naive())
}

/// Whether time labels must carry the date because `end` is not "today".
#[must_use]
pub fn needs_calendar_date(end: UnixTime, now: UnixTime, offset: FixedOffset) -> bool {
    local_date(end, offset) != local_date(now, offset) || now - end > DAY_SECONDS
}

/// Formats a time label whose precision follows the label step.
#[must_use]
pub fn format_time_label(
    time: UnixTime,
    label_step: i64,
    force_date: bool,
    offset: FixedOffset,
) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp(time, 0) else {
        return time.to_string();
    };
    let local = utc.with_timezone(&offset);

    let pattern = if force_date {
        if label_step < 60 {
            "%d %b %y %H:%M:%S"
        } else if label_step < DAY_SECONDS {
            "%d %b %y %H:%M"
        } else {
            "%d %b %y"
        }
    } else if label_step < 60 {
        "%H:%M:%S"
    } else if label_step < 3 * 3_600 {
        "%H:%M"
    } else if label_step < DAY_SECONDS {
        "%d %b %y %H:%M"
    } else {
        "%d %b %y"
    };
    local.format(pattern).to_string()
}

/// Chooses calendar-aligned ticks for the time window `[start, end]`.
///
/// `now` decides whether labels include the date; `offset` is the local
/// timezone used for alignment and formatting.
#[must_use]
pub fn time_axis(
    start: UnixTime,
    end: UnixTime,
    length_px: f64,
    now: UnixTime,
    offset: FixedOffset,
    tuning: &AxisTuning,
) -> AxisSpec {
    if end <= start || !length_px.is_finite() || length_px <= 0.0 {
        return AxisSpec::empty();
    }

    let span = (end - start) as f64;
    let force_date = needs_calendar_date(end, now, offset);
    let raw_step = (span / (length_px / tuning.min_tick_spacing_px)).round() as i64;

    let mut tick_index = first_time_step_index(raw_step);
    let mut major_index = tick_index + 1;
    let mut label_index = tick_index + 2;
    for _ in 0..MAX_LABEL_STEP_GROWTH {
        let label_step = time_step(label_index);
        let text = format_time_label(start, label_step, force_date, offset);
        let label_spacing_px = label_step as f64 / span * length_px;
        if tuning.label_width(&text) <= tuning.label_overlap_factor * label_spacing_px {
            break;
        }
        label_index += 1;
        if label_index > major_index + 1 {
            major_index += 1;
        }
        if major_index > tick_index + 1 {
            tick_index += 1;
        }
    }

    let tick_step = time_step(tick_index);
    let major_step = time_step(major_index);
    let label_step = time_step(label_index);
    let local_offset = i64::from(offset.local_minus_utc());
    let aligned = |time: UnixTime, step: i64| (time + local_offset).rem_euclid(step) == 0;

    let mut time = (start + local_offset).div_euclid(tick_step) * tick_step - local_offset;
    if time < start {
        time += tick_step;
    }

    let mut ticks = Vec::new();
    while time <= end && ticks.len() < MAX_TICKS {
        let offset_px = (time - start) as f64 / span * length_px;
        let kind = if aligned(time, label_step) {
            TickKind::Labelled
        } else if aligned(time, major_step) {
            TickKind::Major
        } else {
            TickKind::Minor
        };

        let label = (kind == TickKind::Labelled).then(|| {
            let text = format_time_label(time, label_step, force_date, offset);
            let extent_px = tuning.label_width(&text);
            let mut start_px = offset_px - extent_px / 2.0;
            if start_px + extent_px >= length_px {
                start_px = length_px - extent_px - 1.0;
            }
            AxisLabel {
                text,
                start_px: start_px.max(0.0),
                extent_px,
            }
        });

        ticks.push(AxisTick {
            value: time as f64,
            offset_px,
            kind,
            label,
        });
        time += tick_step;
    }

    AxisSpec {
        tick_unit: tick_step as f64,
        major_unit: major_step as f64,
        label_unit: label_step as f64,
        significant_digits: 0,
        force_calendar_date: force_date,
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        TIME_STEPS, first_time_step_index, format_significant, nice_base_index,
        significant_digits, time_step,
    };

    #[test]
    fn nice_base_rounds_up() {
        assert_eq!(nice_base_index(0.0), 0);
        assert_eq!(nice_base_index(0.1), 1);
        assert_eq!(nice_base_index(0.5), 2);
        assert_eq!(nice_base_index(0.9), 3);
    }

    #[test]
    fn significant_formatting_strips_zeros() {
        assert_eq!(format_significant(0.2, 4), "0.2");
        assert_eq!(format_significant(1050.0, 4), "1050");
        assert_eq!(format_significant(-2.5, 4), "-2.5");
        assert_eq!(format_significant(0.0, 4), "0");
        assert_eq!(format_significant(1.5e7, 4), "1.5e+7");
        assert_eq!(format_significant(2e-9, 4), "2e-9");
    }

    #[test]
    fn significant_digits_floor_at_four() {
        assert_eq!(significant_digits(0.0, 10.0, 2.0), 4);
        assert_eq!(significant_digits(1000.0, 1001.0, 0.001), 7);
    }

    #[test]
    fn time_steps_double_past_one_day() {
        assert_eq!(time_step(TIME_STEPS.len() - 1), 86_400);
        assert_eq!(time_step(TIME_STEPS.len()), 2 * 86_400);
        assert_eq!(time_step(TIME_STEPS.len() + 1), 4 * 86_400);
        assert_eq!(first_time_step_index(7), 2);
        assert_eq!(first_time_step_index(86_400), TIME_STEPS.len() - 1);
        assert_eq!(time_step(first_time_step_index(3 * 86_400)), 4 * 86_400);
        for index in 0..TIME_STEPS.len() + 20 {
            assert_eq!(time_step(index + 1) % time_step(index), 0, "index {index}");
        }
    }
}
