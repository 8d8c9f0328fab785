mod export;
mod render;
mod sink;

pub use export::{AlignedRow, AlignedTable, ColumnHeader, ExportOutcome, RunCell, merge_series};
pub use render::{
    LOG_AXIS_FLOOR, PlotArea, Polyline, SeriesProjector, ValueRange, Visibility,
    natural_value_range, project_panel, resolve_value_range, scaled_samples,
};
pub use sink::{CsvSink, JsonSink, ResultSink, format_g, format_local_time};
