use crate::error::HistoryResult;
use crate::render::{Canvas, RenderFrame};

/// Canvas that draws nothing, for tests and headless hosts.
///
/// It still validates frame content and keeps the last frame so callers can
/// inspect what would have been drawn.
#[derive(Debug, Default)]
pub struct NullCanvas {
    pub last_line_count: usize,
    pub last_text_count: usize,
    pub last_polygon_count: usize,
    pub last_frame: Option<RenderFrame>,
}

impl Canvas for NullCanvas {
    fn draw(&mut self, frame: &RenderFrame) -> HistoryResult<()> {
        frame.validate()?;
        self.last_line_count = frame.lines.len();
        self.last_text_count = frame.texts.len();
        self.last_polygon_count = frame.polygons.len();
        self.last_frame = Some(frame.clone());
        Ok(())
    }
}
