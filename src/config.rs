//! Engine-wide settings loaded from JSON.
//!
//! Every field carries a serde default, so a partial document (or `{}`)
//! yields a usable configuration.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::core::{AxisTuning, DEFAULT_PALETTE, PanelConfig, TimeWindow};
use crate::error::{HistoryError, HistoryResult};
use crate::history::HistoryQuery;

/// Colors and stroke settings used when composing a chart frame.
///
/// Colors are `#RRGGBB` or `#RRGGBBAA` strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub background_color: String,
    pub axis_color: String,
    pub grid_color: String,
    pub label_color: String,
    pub palette: Vec<String>,
    pub line_width: f64,
    pub grid_line_width: f64,
    /// Opacity of the area under each series.
    pub fill_alpha: f64,
    pub font_size_px: f64,
    pub run_stop_color: String,
    pub run_start_color: String,
    pub run_other_color: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            background_color: "#FFFFFF".to_owned(),
            axis_color: "#000000".to_owned(),
            grid_color: "#DDDDDD".to_owned(),
            label_color: "#000000".to_owned(),
            palette: DEFAULT_PALETTE.iter().map(|color| (*color).to_owned()).collect(),
            line_width: 1.0,
            grid_line_width: 1.0,
            fill_alpha: 0.1,
            font_size_px: 12.0,
            run_stop_color: "#FF0000".to_owned(),
            run_start_color: "#00A000".to_owned(),
            run_other_color: "#FF9000".to_owned(),
        }
    }
}

impl ChartStyle {
    /// Palette color for the variable at `position`, cycling past the end.
    #[must_use]
    pub fn palette_color(&self, position: usize) -> &str {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[position % DEFAULT_PALETTE.len()];
        }
        &self.palette[position % self.palette.len()]
    }

    pub fn validate(&self) -> HistoryResult<()> {
        for (name, value) in [
            ("line_width", self.line_width),
            ("grid_line_width", self.grid_line_width),
            ("font_size_px", self.font_size_px),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(HistoryError::InvalidData(format!(
                    "style `{name}` must be finite and > 0"
                )));
            }
        }
        if !self.fill_alpha.is_finite() || !(0.0..=1.0).contains(&self.fill_alpha) {
            return Err(HistoryError::InvalidData(
                "style `fill_alpha` must be in [0, 1]".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_padding_ratio() -> f64 {
    0.05
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub axis: AxisTuning,
    #[serde(default)]
    pub style: ChartStyle,
    /// Timezone used for calendar alignment and labels, east of UTC.
    #[serde(default)]
    pub utc_offset_seconds: i32,
    /// Downsample interval applied when a query does not set one; `0` keeps
    /// every sample.
    #[serde(default)]
    pub default_downsample_seconds: i64,
    /// Fraction of the value span added above and below autoscaled ranges.
    #[serde(default = "default_padding_ratio")]
    pub value_padding_ratio: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            axis: AxisTuning::default(),
            style: ChartStyle::default(),
            utc_offset_seconds: 0,
            default_downsample_seconds: 0,
            value_padding_ratio: default_padding_ratio(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(input: &str) -> HistoryResult<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> HistoryResult<String> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> HistoryResult<()> {
        self.axis.validate()?;
        self.style.validate()?;
        self.utc_offset()?;
        if self.default_downsample_seconds < 0 {
            return Err(HistoryError::InvalidData(
                "default_downsample_seconds must be >= 0".to_owned(),
            ));
        }
        if !self.value_padding_ratio.is_finite() || self.value_padding_ratio < 0.0 {
            return Err(HistoryError::InvalidData(
                "value_padding_ratio must be finite and >= 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Query for `panel` over `window` with the configured downsampling.
    #[must_use]
    pub fn panel_query(&self, panel: &PanelConfig, window: TimeWindow) -> HistoryQuery {
        HistoryQuery::for_panel(panel, window).with_downsample(self.default_downsample_seconds)
    }

    pub fn utc_offset(&self) -> HistoryResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            HistoryError::InvalidData(format!(
                "utc offset {}s is out of range",
                self.utc_offset_seconds
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.style.palette.len(), 16);
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"utc_offset_seconds": 90000}"#).is_err());
    }
}
