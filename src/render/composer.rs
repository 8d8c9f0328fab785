use tracing::{debug, trace, warn};

use crate::align::{
    PlotArea, Polyline, SeriesProjector, ValueRange, Visibility, format_g, natural_value_range,
    project_panel, resolve_value_range,
};
use crate::config::EngineConfig;
use crate::core::{
    AxisOrientation, AxisSpec, PanelConfig, RunState, ScaleMode, SeriesKind, TickKind, TimeWindow,
    UnixTime, Viewport, linear_axis, log_axis, time_axis,
};
use crate::error::{HistoryError, HistoryResult};
use crate::history::{HistoryData, SeriesStatus, SeriesView};
use crate::render::{
    Canvas, Color, LinePrimitive, PolygonPrimitive, RectPrimitive, RenderFrame, TextHAlign,
    TextPrimitive,
};

const OUTER_MARGIN_PX: f64 = 10.0;
const LABEL_PADDING_PX: f64 = 4.0;
const RUN_LABEL_OFFSET_PX: f64 = 5.0;
const LEGEND_SWATCH_PX: f64 = 10.0;

/// Inputs of one chart draw pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub panel: &'a PanelConfig,
    pub data: &'a HistoryData,
    pub window: TimeWindow,
    pub viewport: Viewport,
    /// Wall-clock time; decides whether time labels carry the date.
    pub now: UnixTime,
    pub visibility: Visibility,
}

/// Resolved layout of a composed chart, returned alongside the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub plot_area: PlotArea,
    pub value_range: ValueRange,
    pub value_axis: AxisSpec,
    pub time_axis: AxisSpec,
    pub polylines: Vec<Polyline>,
}

/// Composes axes, series, run markers and the legend into a [`RenderFrame`].
#[derive(Debug, Clone)]
pub struct ChartComposer {
    config: EngineConfig,
    colors: StyleColors,
}

#[derive(Debug, Clone, Copy)]
struct StyleColors {
    background: Color,
    axis: Color,
    grid: Color,
    label: Color,
    run_stop: Color,
    run_start: Color,
    run_other: Color,
}

impl ChartComposer {
    pub fn new(config: EngineConfig) -> HistoryResult<Self> {
        config.validate()?;
        let style = &config.style;
        let colors = StyleColors {
            background: Color::from_hex(&style.background_color)?,
            axis: Color::from_hex(&style.axis_color)?,
            grid: Color::from_hex(&style.grid_color)?,
            label: Color::from_hex(&style.label_color)?,
            run_stop: Color::from_hex(&style.run_stop_color)?,
            run_start: Color::from_hex(&style.run_start_color)?,
            run_other: Color::from_hex(&style.run_other_color)?,
        };
        Ok(Self { config, colors })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds the frame and hands it to `canvas`.
    pub fn render<C: Canvas + ?Sized>(
        &self,
        request: &RenderRequest<'_>,
        canvas: &mut C,
    ) -> HistoryResult<ChartLayout> {
        let (frame, layout) = self.compose(request)?;
        canvas.draw(&frame)?;
        Ok(layout)
    }

    pub fn compose(
        &self,
        request: &RenderRequest<'_>,
    ) -> HistoryResult<(RenderFrame, ChartLayout)> {
        let viewport = request.viewport;
        if !viewport.is_valid() {
            return Err(HistoryError::InvalidData(format!(
                "invalid viewport {}x{}",
                viewport.width, viewport.height
            )));
        }
        let tuning = &self.config.axis;
        let panel = request.panel;
        let width = f64::from(viewport.width);
        let height = f64::from(viewport.height);

        let natural = natural_value_range(request.data, panel, request.visibility);
        let value_range = resolve_value_range(natural, panel, self.config.value_padding_ratio);
        let mode = if panel.log_axis {
            ScaleMode::Log
        } else {
            ScaleMode::Linear
        };

        let top = OUTER_MARGIN_PX;
        let bottom_gutter =
            tuning.label_height_px + tick_length(TickKind::Labelled) + 2.0 * LABEL_PADDING_PX;
        let plot_height = height - top - bottom_gutter;
        let value_axis = match mode {
            ScaleMode::Linear => linear_axis(
                value_range.min,
                value_range.max,
                plot_height,
                AxisOrientation::Vertical,
                tuning,
            ),
            ScaleMode::Log => log_axis(
                value_range.min,
                value_range.max,
                plot_height,
                AxisOrientation::Vertical,
                tuning,
            ),
        };
        let left = value_axis.max_label_width(tuning)
            + tick_length(TickKind::Labelled)
            + 2.0 * LABEL_PADDING_PX;
        let plot_area = PlotArea::new(left, top, width - left - OUTER_MARGIN_PX, plot_height)?;

        let offset = self.config.utc_offset()?;
        let time_axis = time_axis(
            request.window.start,
            request.window.end,
            plot_area.width,
            request.now,
            offset,
            tuning,
        );

        let projector = SeriesProjector::new(request.window, plot_area, value_range, mode)?;
        let polylines = project_panel(request.data, panel, &projector, request.visibility);

        let mut frame = RenderFrame::new(viewport).with_rect(RectPrimitive::new(
            0.0,
            0.0,
            width,
            height,
            self.colors.background,
        ));
        self.push_value_axis(&mut frame, &value_axis, plot_area);
        self.push_time_axis(&mut frame, &time_axis, plot_area);
        self.push_series(&mut frame, panel, &polylines, plot_area);
        if panel.show_run_markers {
            self.push_run_markers(&mut frame, request.data, &projector);
        }
        self.push_legend(&mut frame, request, plot_area);
        self.push_frame_box(&mut frame, plot_area);

        debug!(
            series = polylines.len(),
            value_ticks = value_axis.ticks.len(),
            time_ticks = time_axis.ticks.len(),
            lines = frame.lines.len(),
            "chart frame composed"
        );
        Ok((
            frame,
            ChartLayout {
                plot_area,
                value_range,
                value_axis,
                time_axis,
                polylines,
            },
        ))
    }

    fn text(
        &self,
        text: impl Into<String>,
        x: f64,
        y: f64,
        color: Color,
        align: TextHAlign,
    ) -> TextPrimitive {
        TextPrimitive::new(text, x, y, self.config.style.font_size_px, color, align)
    }

    fn push_value_axis(&self, frame: &mut RenderFrame, axis: &AxisSpec, area: PlotArea) {
        let style = &self.config.style;
        for tick in &axis.ticks {
            let y = area.bottom() - tick.offset_px;
            if tick.kind != TickKind::Minor {
                frame.lines.push(LinePrimitive::new(
                    area.left,
                    y,
                    area.right(),
                    y,
                    style.grid_line_width,
                    self.colors.grid,
                ));
            }
            frame.lines.push(LinePrimitive::new(
                area.left - tick_length(tick.kind),
                y,
                area.left,
                y,
                style.line_width,
                self.colors.axis,
            ));
            if let Some(label) = &tick.label {
                frame.texts.push(self.text(
                    label.text.clone(),
                    area.left - tick_length(TickKind::Labelled) - LABEL_PADDING_PX,
                    area.bottom() - label.start_px,
                    self.colors.label,
                    TextHAlign::Right,
                ));
            }
        }
    }

    fn push_time_axis(&self, frame: &mut RenderFrame, axis: &AxisSpec, area: PlotArea) {
        let style = &self.config.style;
        let baseline = area.bottom()
            + tick_length(TickKind::Labelled)
            + LABEL_PADDING_PX
            + self.config.axis.label_height_px;
        for tick in &axis.ticks {
            let x = area.left + tick.offset_px;
            if tick.kind != TickKind::Minor {
                frame.lines.push(LinePrimitive::new(
                    x,
                    area.top,
                    x,
                    area.bottom(),
                    style.grid_line_width,
                    self.colors.grid,
                ));
            }
            frame.lines.push(LinePrimitive::new(
                x,
                area.bottom(),
                x,
                area.bottom() + tick_length(tick.kind),
                style.line_width,
                self.colors.axis,
            ));
            if let Some(label) = &tick.label {
                frame.texts.push(self.text(
                    label.text.clone(),
                    area.left + label.start_px,
                    baseline,
                    self.colors.label,
                    TextHAlign::Left,
                ));
            }
        }
    }

    fn series_color(&self, panel: &PanelConfig, position: usize) -> Color {
        let configured = panel
            .variables
            .get(position)
            .map(|variable| variable.color.as_str())
            .filter(|color| !color.is_empty());
        if let Some(text) = configured {
            match Color::from_hex(text) {
                Ok(color) => return color,
                Err(err) => {
                    warn!(position, color = text, error = %err, "falling back to palette color");
                }
            }
        }
        Color::from_hex(self.config.style.palette_color(position)).unwrap_or(self.colors.axis)
    }

    fn push_series(
        &self,
        frame: &mut RenderFrame,
        panel: &PanelConfig,
        polylines: &[Polyline],
        area: PlotArea,
    ) {
        let style = &self.config.style;
        for polyline in polylines {
            let color = self.series_color(panel, polyline.variable);
            for run in &polyline.runs {
                let (Some(first), Some(last)) = (run.first(), run.last()) else {
                    continue;
                };
                if run.len() >= 2 && style.fill_alpha > 0.0 {
                    let mut points = run.clone();
                    points.push((last.0, area.bottom()));
                    points.push((first.0, area.bottom()));
                    frame
                        .polygons
                        .push(PolygonPrimitive::new(points, color.with_alpha(style.fill_alpha)));
                }
                if run.len() == 1 {
                    // Isolated sample between gaps.
                    frame.lines.push(LinePrimitive::new(
                        first.0 - 0.5,
                        first.1,
                        first.0 + 0.5,
                        first.1,
                        style.line_width,
                        color,
                    ));
                }
                for pair in run.windows(2) {
                    frame.lines.push(LinePrimitive::new(
                        pair[0].0,
                        pair[0].1,
                        pair[1].0,
                        pair[1].1,
                        style.line_width,
                        color,
                    ));
                }
            }
            trace!(
                variable = polyline.variable,
                segments = polyline.segment_count(),
                "series drawn"
            );
        }
    }

    fn push_run_markers(
        &self,
        frame: &mut RenderFrame,
        data: &HistoryData,
        projector: &SeriesProjector,
    ) {
        let Some(states) = data
            .position_of(SeriesKind::RunState)
            .and_then(|index| data.series(index))
        else {
            return;
        };
        let numbers = data
            .position_of(SeriesKind::RunNumber)
            .and_then(|index| data.series(index));
        let area = projector.area();

        for (time, value) in states.timestamps.iter().zip(states.values) {
            let x = projector.time_to_x(*time);
            if !value.is_finite() || x < area.left || x > area.right() {
                continue;
            }
            let color = match RunState::from_value(*value) {
                RunState::Stopped => self.colors.run_stop,
                RunState::Running => self.colors.run_start,
                RunState::Paused | RunState::Other(_) => self.colors.run_other,
            };
            let width = self.config.style.line_width;
            frame
                .lines
                .push(LinePrimitive::new(x, area.top, x, area.bottom(), width, color).dashed());
            if let Some(number) = numbers.as_ref().and_then(|view| value_at(view, *time)) {
                frame.texts.push(self.text(
                    format!("{}", number.round() as i64),
                    x - RUN_LABEL_OFFSET_PX,
                    area.top + self.config.axis.label_height_px,
                    color,
                    TextHAlign::Right,
                ));
            }
        }
    }

    fn push_legend(&self, frame: &mut RenderFrame, request: &RenderRequest<'_>, area: PlotArea) {
        let panel = request.panel;
        let line_height = self.config.axis.label_height_px + LABEL_PADDING_PX;
        let x = area.left + LABEL_PADDING_PX;
        let mut y = area.top + LABEL_PADDING_PX;

        for (position, variable) in panel.variables.iter().enumerate() {
            if !request.visibility.shows(position) {
                continue;
            }
            let view = request
                .data
                .position_of(SeriesKind::Variable(position))
                .and_then(|index| request.data.series(index));
            let mut text = variable.display_name();
            match &view {
                Some(view) if view.status == SeriesStatus::Ok => {
                    let last = view.last_sample().filter(|_| panel.show_values);
                    if let Some((_, raw)) = last {
                        text.push_str(" = ");
                        text.push_str(&format_g(variable.scale(raw)));
                    }
                }
                Some(view) if !view.never_written() => text.push_str(" (no data in window)"),
                _ => text.push_str(" (no data available)"),
            }

            let color = self.series_color(panel, position);
            frame.rects.push(RectPrimitive::new(
                x,
                y,
                LEGEND_SWATCH_PX,
                LEGEND_SWATCH_PX,
                color,
            ));
            frame.texts.push(self.text(
                text,
                x + LEGEND_SWATCH_PX + LABEL_PADDING_PX,
                y + LEGEND_SWATCH_PX,
                self.colors.label,
                TextHAlign::Left,
            ));
            y += line_height;
        }
    }

    fn push_frame_box(&self, frame: &mut RenderFrame, area: PlotArea) {
        let width = self.config.style.line_width;
        let color = self.colors.axis;
        let corners = [
            (area.left, area.top),
            (area.right(), area.top),
            (area.right(), area.bottom()),
            (area.left, area.bottom()),
        ];
        for index in 0..corners.len() {
            let (x1, y1) = corners[index];
            let (x2, y2) = corners[(index + 1) % corners.len()];
            frame.lines.push(LinePrimitive::new(x1, y1, x2, y2, width, color));
        }
    }
}

/// Length of the tick mark drawn outside the plot area.
fn tick_length(kind: TickKind) -> f64 {
    match kind {
        TickKind::Minor => 3.0,
        TickKind::Major => 5.0,
        TickKind::Labelled => 8.0,
    }
}

/// Last value at or before `time`.
fn value_at(view: &SeriesView<'_>, time: UnixTime) -> Option<f64> {
    let end = view.timestamps.partition_point(|sample| *sample <= time);
    end.checked_sub(1).map(|index| view.values[index])
}
