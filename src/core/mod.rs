pub mod axis;
pub mod name_order;
pub mod panel;
pub mod scale;
pub mod types;

pub use axis::{
    AxisLabel, AxisOrientation, AxisSpec, AxisTick, AxisTuning, TIME_STEPS, TickKind,
    format_significant, format_time_label, linear_axis, log_axis, needs_calendar_date, time_axis,
    time_step,
};
pub use name_order::{compare_names, sort_names};
pub use panel::{DEFAULT_PALETTE, ORDER_STEP, PanelConfig, PanelVariable};
pub use scale::{ScaleMode, ValueScale};
pub use types::{RunState, SeriesKind, TimeWindow, UnixTime, VariableRef, Viewport};
