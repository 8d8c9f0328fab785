use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryResult};

/// Unix time in whole seconds, the resolution of the history store.
pub type UnixTime = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Identifies one scalar series inside the history store.
///
/// `index` selects an element of an array-valued tag and is `0` for scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableRef {
    pub event: String,
    pub tag: String,
    #[serde(default)]
    pub index: usize,
}

impl VariableRef {
    #[must_use]
    pub fn new(event: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            tag: tag.into(),
            index: 0,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}:{}", self.event, self.tag)
        } else {
            write!(f, "{}:{}[{}]", self.event, self.tag, self.index)
        }
    }
}

/// Origin of one series in a query batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesKind {
    /// Requested by the panel variable at this position.
    Variable(usize),
    RunState,
    RunNumber,
}

impl SeriesKind {
    #[must_use]
    pub fn is_run_marker(self) -> bool {
        matches!(self, Self::RunState | Self::RunNumber)
    }

    #[must_use]
    pub fn variable_position(self) -> Option<usize> {
        match self {
            Self::Variable(position) => Some(position),
            Self::RunState | Self::RunNumber => None,
        }
    }
}

/// Run-control state recorded on the run-state channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Stopped,
    Paused,
    Running,
    Other(i64),
}

impl RunState {
    /// Decodes a recorded state value (`1` stopped, `2` paused, `3` running).
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        match value.round() as i64 {
            1 => Self::Stopped,
            2 => Self::Paused,
            3 => Self::Running,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Stopped => "Stopped".to_owned(),
            Self::Paused => "Paused".to_owned(),
            Self::Running => "Running".to_owned(),
            Self::Other(value) => value.to_string(),
        }
    }
}

/// Closed time window `[start, end]` in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: UnixTime,
    pub end: UnixTime,
}

impl TimeWindow {
    pub fn new(start: UnixTime, end: UnixTime) -> HistoryResult<Self> {
        if end <= start {
            return Err(HistoryError::InvalidData(format!(
                "time window end ({end}) must be after start ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `span` seconds ending at `end`.
    pub fn ending_at(end: UnixTime, span: i64) -> HistoryResult<Self> {
        Self::new(end - span, end)
    }

    #[must_use]
    pub fn span(self) -> i64 {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(self, time: UnixTime) -> bool {
        (self.start..=self.end).contains(&time)
    }
}
