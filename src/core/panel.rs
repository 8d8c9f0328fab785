use serde::{Deserialize, Serialize};

use crate::core::name_order::compare_names;
use crate::core::types::VariableRef;
use crate::error::{HistoryError, HistoryResult};

/// Default data colors, assigned to new variables in order.
pub const DEFAULT_PALETTE: [&str; 16] = [
    "#00AAFF", "#FF9000", "#FF00A0", "#00C030", "#A0C0D0", "#D0A060", "#C04010", "#807060",
    "#F0C000", "#2090A0", "#D040D0", "#90B000", "#B0B040", "#B0B0FF", "#FFA0A0", "#A0FFA0",
];

/// Spacing used when renumbering variable order on save.
pub const ORDER_STEP: i32 = 10;

/// One telemetry variable shown on a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelVariable {
    #[serde(rename = "ref")]
    pub reference: VariableRef,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub label: String,
    /// Display position; `<= 0` marks the variable for deletion on save.
    #[serde(default)]
    pub order: i32,
}

impl PanelVariable {
    #[must_use]
    pub fn new(reference: VariableRef) -> Self {
        Self {
            reference,
            factor: 1.0,
            offset: 0.0,
            color: String::new(),
            label: String::new(),
            order: ORDER_STEP,
        }
    }

    #[must_use]
    pub fn with_scaling(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Applies this variable's factor and offset to a raw history value.
    #[must_use]
    pub fn scale(&self, raw: f64) -> f64 {
        raw * self.factor + self.offset
    }

    /// Label shown in legends and export headers.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.label.is_empty() {
            self.reference.to_string()
        } else {
            self.label.clone()
        }
    }

    #[must_use]
    pub fn is_pending_delete(&self) -> bool {
        self.order <= 0
    }
}

fn default_factor() -> f64 {
    1.0
}

fn default_timescale_seconds() -> i64 {
    3600
}

/// Persisted definition of one history panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_timescale_seconds")]
    pub timescale_seconds: i64,
    /// Fixed axis minimum; `None` autoscales.
    #[serde(default)]
    pub minimum: Option<f64>,
    /// Fixed axis maximum; `None` autoscales.
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub zero_y_low: bool,
    #[serde(default)]
    pub log_axis: bool,
    #[serde(default)]
    pub show_run_markers: bool,
    #[serde(default)]
    pub show_values: bool,
    #[serde(default)]
    pub variables: Vec<PanelVariable>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            timescale_seconds: default_timescale_seconds(),
            minimum: None,
            maximum: None,
            zero_y_low: false,
            log_axis: false,
            show_run_markers: false,
            show_values: false,
            variables: Vec::new(),
        }
    }
}

impl PanelConfig {
    #[must_use]
    pub fn with_variables(mut self, variables: Vec<PanelVariable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn validate(&self) -> HistoryResult<()> {
        if self.timescale_seconds <= 0 {
            return Err(HistoryError::InvalidData(
                "panel timescale must be > 0".to_owned(),
            ));
        }
        for (name, bound) in [("minimum", self.minimum), ("maximum", self.maximum)] {
            if bound.is_some_and(|value| !value.is_finite()) {
                return Err(HistoryError::InvalidData(format!(
                    "panel {name} must be finite"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if max <= min {
                return Err(HistoryError::InvalidData(
                    "panel maximum must be greater than minimum".to_owned(),
                ));
            }
        }
        for variable in &self.variables {
            if !variable.factor.is_finite() || !variable.offset.is_finite() {
                return Err(HistoryError::InvalidData(format!(
                    "factor/offset of `{}` must be finite",
                    variable.reference
                )));
            }
        }
        Ok(())
    }

    /// References of all variables, in panel order.
    #[must_use]
    pub fn variable_refs(&self) -> Vec<VariableRef> {
        self.variables
            .iter()
            .map(|variable| variable.reference.clone())
            .collect()
    }

    /// Bulk "add selected": appends references that are not yet on the panel.
    ///
    /// New variables are sequenced by [`compare_names`], continue the order
    /// numbering past the current maximum and take the first palette colors
    /// not already in use. Returns the number of variables added.
    pub fn add_variables(&mut self, references: impl IntoIterator<Item = VariableRef>) -> usize {
        let mut fresh: Vec<VariableRef> = Vec::new();
        for reference in references {
            let known = self
                .variables
                .iter()
                .any(|variable| variable.reference == reference)
                || fresh.contains(&reference);
            if !known {
                fresh.push(reference);
            }
        }
        fresh.sort_by(|left, right| {
            compare_names(&left.event, &right.event)
                .then_with(|| compare_names(&left.tag, &right.tag))
                .then_with(|| left.index.cmp(&right.index))
        });

        let mut next_order = self
            .variables
            .iter()
            .map(|variable| variable.order)
            .max()
            .unwrap_or(0)
            .max(0);
        let added = fresh.len();
        for reference in fresh {
            next_order += ORDER_STEP;
            let color = self.next_free_color();
            self.variables.push(
                PanelVariable::new(reference)
                    .with_order(next_order)
                    .with_color(color),
            );
        }
        added
    }

    /// Prepares the panel for a whole-record save.
    ///
    /// Drops variables marked for deletion, stable-sorts by `order` and
    /// renumbers to multiples of [`ORDER_STEP`]. Variables without a color
    /// receive a default one.
    pub fn normalize_for_save(&mut self) {
        self.variables.retain(|variable| !variable.is_pending_delete());
        self.variables.sort_by_key(|variable| variable.order);
        for (position, variable) in self.variables.iter_mut().enumerate() {
            variable.order = (position as i32 + 1) * ORDER_STEP;
        }
        for position in 0..self.variables.len() {
            if self.variables[position].color.is_empty() {
                let color = self.next_free_color();
                self.variables[position].color = color;
            }
        }
    }

    fn next_free_color(&self) -> String {
        DEFAULT_PALETTE
            .iter()
            .find(|candidate| {
                !self
                    .variables
                    .iter()
                    .any(|variable| variable.color.eq_ignore_ascii_case(candidate))
            })
            .copied()
            .unwrap_or(DEFAULT_PALETTE[self.variables.len() % DEFAULT_PALETTE.len()])
            .to_owned()
    }
}
