mod composer;
mod frame;
mod null_canvas;
mod primitives;

pub use composer::{ChartComposer, ChartLayout, RenderRequest};
pub use frame::RenderFrame;
pub use null_canvas::NullCanvas;
pub use primitives::{
    Color, LinePrimitive, LineStrokeStyle, PolygonPrimitive, RectPrimitive, TextHAlign,
    TextPrimitive,
};

use crate::error::HistoryResult;

/// Drawing surface consuming composed frames.
///
/// Implementations receive a fully materialized `RenderFrame` in pixel
/// coordinates and own color allocation and final image encoding.
pub trait Canvas {
    fn draw(&mut self, frame: &RenderFrame) -> HistoryResult<()>;
}
