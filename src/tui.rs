use std::collections::HashMap;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEvent,
};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use crate::chart::surface::{
    Layer, PlotPoint, RenderSurface, Rgb, Scene, Theme, Viewport, XRange,
};
use crate::error::Result;
use crate::fmt::money_masked;
use crate::models::{epoch_ms, from_epoch_ms};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const BOLD: Style = Style::new().add_modifier(Modifier::BOLD);

/// Refresh interval of the view loop. Every iteration is one chart frame.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Format an amount as a colored Span (green for income, red for expense).
/// Shows absolute value; color conveys the sign.
pub fn money_span(amount: f64, blur: bool) -> Span<'static> {
    let style = if amount < 0.0 {
        AMOUNT_NEG_STYLE
    } else {
        AMOUNT_POS_STYLE
    };
    Span::styled(money_masked(amount.abs(), blur), style)
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

pub fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

// ---------------------------------------------------------------------------
// Terminal chart surface
// ---------------------------------------------------------------------------

/// Braille cells are 2x4 dots; a dot is one "pixel" of the viewport.
const DOTS_PER_COL: f64 = 2.0;
const DOTS_PER_ROW: f64 = 4.0;

/// Areas of a chart panel: y labels on the left, x labels below the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChartLayout {
    pub y_labels: Rect,
    pub plot: Rect,
    pub x_labels: Rect,
}

pub fn chart_layout(area: Rect, label_width: u16) -> ChartLayout {
    let [upper, x_labels] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);
    let [y_labels, plot] =
        Layout::horizontal([Constraint::Length(label_width), Constraint::Fill(1)]).areas(upper);
    ChartLayout { y_labels, plot, x_labels }
}

/// Renders the balance chart with ratatui. Keeps the last state pushed by the
/// chart engine, layer by layer.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    plot: Rect,
    layers: HashMap<Layer, Vec<PlotPoint>>,
    x_range: Option<XRange>,
    y_range: (f64, f64),
    theme: Theme,
    interactive: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            interactive: true,
            ..Default::default()
        }
    }

    /// Track the plot rectangle. Returns true when it changed, in which case
    /// the chart should be redrawn for the new viewport.
    pub fn resize(&mut self, plot: Rect) -> bool {
        if self.plot == plot {
            return false;
        }
        self.plot = plot;
        true
    }

    #[cfg(test)]
    pub fn plot_area(&self) -> Rect {
        self.plot
    }

    pub fn x_range(&self) -> Option<XRange> {
        self.x_range
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn layer(&self, layer: Layer) -> &[PlotPoint] {
        self.layers.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Move the visible window as the user asked. The engine may still
    /// correct it through `relayout`.
    pub fn set_view(&mut self, range: XRange) {
        self.x_range = Some(range);
    }

    /// Epoch ms under a terminal cell, or `None` outside the plot.
    pub fn x_at(&self, column: u16, row: u16) -> Option<i64> {
        let plot = self.plot;
        let range = self.x_range?;
        if plot.width == 0
            || column < plot.x
            || column >= plot.x + plot.width
            || row < plot.y
            || row >= plot.y + plot.height
        {
            return None;
        }
        let t = (f64::from(column - plot.x) + 0.5) / f64::from(plot.width);
        let start = epoch_ms(range.start);
        let span = range.span().num_milliseconds() as f64;
        Some(start + (t * span) as i64)
    }

    pub fn render(&self, frame: &mut Frame, layout: ChartLayout, blur: bool) {
        let palette = self.theme.palette();
        let Some(range) = self.x_range else {
            frame.render_widget(
                Paragraph::new(" No balance history in this range.").style(FOOTER_STYLE),
                layout.plot,
            );
            return;
        };

        let dataset = |layer: Layer, color: Rgb, graph: GraphType| {
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(graph)
                .style(Style::default().fg(rgb(color)))
                .data(self.layer(layer))
        };
        let datasets = vec![
            dataset(Layer::DotsAfter, palette.dots_dim, GraphType::Scatter),
            dataset(Layer::DotsBefore, palette.dots, GraphType::Scatter),
            dataset(Layer::ForecastDots, palette.forecast, GraphType::Scatter),
            dataset(Layer::LineAfter, palette.line_dim, GraphType::Line),
            dataset(Layer::LineBefore, palette.line, GraphType::Line),
            dataset(Layer::ForecastLine, palette.forecast, GraphType::Line),
        ];

        let x0 = epoch_ms(range.start) as f64;
        let x1 = epoch_ms(range.end) as f64;
        let (y0, y1) = self.y_range;
        let chart = Chart::new(datasets)
            .x_axis(Axis::default().bounds([x0, x1]))
            .y_axis(Axis::default().bounds([y0, y1]));
        frame.render_widget(chart, layout.plot);

        let muted = Style::default().fg(rgb(palette.muted));
        let width = layout.y_labels.width.saturating_sub(1) as usize;
        let height = layout.y_labels.height;
        let mut y_lines: Vec<Line> = Vec::new();
        for row in 0..height {
            let label = if row == 0 {
                money_masked(y1, blur)
            } else if row == height.saturating_sub(1) {
                money_masked(y0, blur)
            } else if row == height / 2 {
                money_masked((y0 + y1) / 2.0, blur)
            } else {
                String::new()
            };
            y_lines.push(Line::from(Span::styled(format!("{label:>width$}"), muted)));
        }
        frame.render_widget(Paragraph::new(y_lines), layout.y_labels);

        let fmt_day = |ms: f64| {
            from_epoch_ms(ms as i64)
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        let left = fmt_day(x0);
        let right = fmt_day(x1);
        let gap = (layout.plot.width as usize).saturating_sub(left.len() + right.len());
        let x_line = format!(
            "{:pad$}{left}{:gap$}{right}",
            "",
            "",
            pad = layout.y_labels.width as usize
        );
        frame.render_widget(Paragraph::new(x_line).style(muted), layout.x_labels);
    }
}

impl RenderSurface for TerminalSurface {
    fn viewport(&self) -> Viewport {
        Viewport {
            width: f64::from(self.plot.width) * DOTS_PER_COL,
            height: f64::from(self.plot.height) * DOTS_PER_ROW,
        }
    }

    fn redraw(&mut self, scene: &Scene) {
        self.layers.clear();
        self.layers.insert(Layer::LineBefore, scene.line_before.clone());
        self.layers.insert(Layer::LineAfter, scene.line_after.clone());
        self.layers.insert(Layer::DotsBefore, scene.dots_before.clone());
        self.layers.insert(Layer::DotsAfter, scene.dots_after.clone());
        self.x_range = Some(scene.x_range);
        self.y_range = scene.y_range;
        self.theme = scene.theme;
        self.interactive = scene.interactive;
    }

    fn restyle(&mut self, layer: Layer, points: Vec<PlotPoint>) {
        self.layers.insert(layer, points);
    }

    fn relayout(&mut self, range: XRange) {
        self.x_range = Some(range);
    }

    fn set_interaction(&mut self, enabled: bool) {
        self.interactive = enabled;
    }

    fn purge(&mut self) {
        self.layers.clear();
        self.x_range = None;
    }
}

// ---------------------------------------------------------------------------
// View loop
// ---------------------------------------------------------------------------

pub enum ViewAction {
    Continue,
    Close,
}

pub trait InteractiveView {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, code: KeyCode) -> ViewAction;
    fn handle_mouse(&mut self, _event: MouseEvent) {}
    /// Called once per loop iteration, after any input was handled.
    fn tick(&mut self) {}
}

/// Run an interactive ratatui view. Sets up the terminal, mouse capture,
/// event loop, and panic hook, then restores the terminal on exit.
pub fn run_view(view: &mut dyn InteractiveView) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();
    crossterm::execute!(std::io::stdout(), EnableMouseCapture)?;

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| view.draw(frame)) {
            break Err(e.into());
        }

        match event::poll(FRAME_INTERVAL) {
            Ok(false) => {}
            Err(e) => break Err(e.into()),
            Ok(true) => match event::read() {
                Err(e) => break Err(e.into()),
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break Ok(());
                    }
                    if let ViewAction::Close = view.handle_key(key.code) {
                        break Ok(());
                    }
                }
                Ok(Event::Mouse(mouse)) => view.handle_mouse(mouse),
                _ => {}
            },
        }
        view.tick();
    };

    let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
    drop(terminal);
    ratatui::restore();
    result
}
