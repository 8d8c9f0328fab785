//! History store contract and query orchestration.

mod backend;
mod data;
mod last_written;
mod memory;
mod query;

pub use backend::{HistoryBackend, HistoryBackendHandle, ReadStatus, SeriesReadout, SharedBackend};
pub use data::{HistoryData, SeriesStatus, SeriesView};
pub use last_written::{LastWrittenMode, jump_to_last_written, last_written};
pub use memory::MemoryHistory;
pub use query::{
    HistoryQuery, HistoryQueryEngine, RUN_NUMBER_TAG, RUN_STATE_TAG, RUN_TRANSITIONS_EVENT,
    run_marker_refs,
};
