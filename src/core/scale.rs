use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryResult};

/// Mapping mode of a value axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleMode {
    #[default]
    Linear,
    /// Uniform spacing in decades; the domain must be strictly positive.
    Log,
}

/// Maps a value domain onto `[0, length_px]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueScale {
    domain_start: f64,
    domain_end: f64,
    length_px: f64,
    mode: ScaleMode,
}

impl ValueScale {
    pub fn new(domain_start: f64, domain_end: f64, length_px: f64) -> HistoryResult<Self> {
        Self::with_mode(domain_start, domain_end, length_px, ScaleMode::Linear)
    }

    pub fn with_mode(
        domain_start: f64,
        domain_end: f64,
        length_px: f64,
        mode: ScaleMode,
    ) -> HistoryResult<Self> {
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(HistoryError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }
        if !length_px.is_finite() || length_px <= 0.0 {
            return Err(HistoryError::InvalidData(
                "scale length must be finite and > 0".to_owned(),
            ));
        }
        if mode == ScaleMode::Log && (domain_start <= 0.0 || domain_end <= 0.0) {
            return Err(HistoryError::InvalidData(
                "log scale domain must be > 0".to_owned(),
            ));
        }

        Ok(Self {
            domain_start,
            domain_end,
            length_px,
            mode,
        })
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn mode(self) -> ScaleMode {
        self.mode
    }

    #[must_use]
    pub fn length_px(self) -> f64 {
        self.length_px
    }

    /// Offset in pixels from the domain start, or `None` when the value
    /// cannot be placed (non-finite, or `<= 0` on a log scale).
    #[must_use]
    pub fn value_to_offset(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let normalized = match self.mode {
            ScaleMode::Linear => {
                (value - self.domain_start) / (self.domain_end - self.domain_start)
            }
            ScaleMode::Log => {
                if value <= 0.0 {
                    return None;
                }
                (value.ln() - self.domain_start.ln())
                    / (self.domain_end.ln() - self.domain_start.ln())
            }
        };
        Some(normalized * self.length_px)
    }

    #[must_use]
    pub fn offset_to_value(self, offset: f64) -> f64 {
        let normalized = offset / self.length_px;
        match self.mode {
            ScaleMode::Linear => {
                self.domain_start + normalized * (self.domain_end - self.domain_start)
            }
            ScaleMode::Log => {
                let (lo, hi) = (self.domain_start.ln(), self.domain_end.ln());
                (lo + normalized * (hi - lo)).exp()
            }
        }
    }
}
