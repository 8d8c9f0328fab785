use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{TimeWindow, UnixTime, VariableRef};
use crate::error::{HistoryError, HistoryResult};

use super::backend::HistoryBackend;

/// How per-variable last-written times are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastWrittenMode {
    /// Most recent time at which any variable has data (maximum).
    AnyVariable,
    /// Earliest time at which all variables have data (minimum).
    AllVariables,
}

/// Resolves "most recent time `<= at` at which data exists" for a variable set.
///
/// Backend times later than `at` are clamped to `at`; variables that were
/// never written are left out of the aggregate. Fails with
/// [`HistoryError::NoDataEver`] when no variable has any history.
pub fn last_written<B: HistoryBackend + ?Sized>(
    backend: &B,
    vars: &[VariableRef],
    at: UnixTime,
    mode: LastWrittenMode,
) -> HistoryResult<UnixTime> {
    if vars.is_empty() {
        return Err(HistoryError::NoDataEver);
    }

    let times = backend.last_written(at, vars)?;
    if times.len() != vars.len() {
        return Err(HistoryError::BackendRead(format!(
            "last-written lookup returned {} entries for {} variables",
            times.len(),
            vars.len()
        )));
    }

    let written = times
        .into_iter()
        .filter(|time| *time > 0)
        .map(|time| time.min(at));
    let resolved = match mode {
        LastWrittenMode::AnyVariable => written.max(),
        LastWrittenMode::AllVariables => written.min(),
    };

    debug!(at, ?mode, ?resolved, variables = vars.len(), "resolved last written");
    resolved.ok_or(HistoryError::NoDataEver)
}

/// Moves `window` so the last-written time found at its start sits one
/// fifth of the span from the right edge. The span is preserved.
pub fn jump_to_last_written<B: HistoryBackend + ?Sized>(
    backend: &B,
    vars: &[VariableRef],
    window: TimeWindow,
    mode: LastWrittenMode,
) -> HistoryResult<TimeWindow> {
    let last = last_written(backend, vars, window.start, mode)?;
    let span = window.span();
    TimeWindow::ending_at(last + span / 5, span)
}
