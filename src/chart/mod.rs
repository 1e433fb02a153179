pub mod dots;
pub mod hover;
pub mod lttb;
pub mod pan;
pub mod range;
pub mod series;
pub mod surface;

use std::collections::BTreeMap;

use chrono::Duration;

use crate::forecast::ForecastPayload;
use crate::models::{epoch_ms, BalancePoint, Transaction};
use dots::DotDensity;
use hover::HoverSync;
use pan::{PanClamp, PanOutcome};
use range::{RangeToken, RangeWindow};
use surface::{
    ChartEvent, EventKind, Layer, PlotPoint, RenderSurface, Scene, Subscription, Theme, XRange,
};

pub const MAX_LINE_POINTS: usize = 1200;
pub const MIN_LINE_POINTS: usize = 400;

/// Line budget for a viewport width: about 1.2 points per pixel, bounded.
pub fn target_points(width: f64) -> usize {
    ((width * 1.2).floor().max(0.0) as usize).clamp(MIN_LINE_POINTS, MAX_LINE_POINTS)
}

/// Padded y range. Flat series get a small fixed pad so the line is not
/// drawn on the frame edge. `None` when a balance overflowed to infinity.
pub fn y_range(series: &[BalancePoint]) -> Option<(f64, f64)> {
    let first = series.first()?;
    let (min, max) = series
        .iter()
        .fold((first.balance, first.balance), |(lo, hi), p| (lo.min(p.balance), hi.max(p.balance)));
    let (lo, hi) = if min == max {
        let pad = (max.abs() * 0.05).max(1.0);
        (min - pad, max + pad)
    } else {
        let pad = (max - min) * 0.10;
        (min - pad, max + pad)
    };
    (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
}

/// Initial x window: 2% padding either side, never left of `origin`.
fn padded_x_range(sliced: &[BalancePoint], origin: chrono::NaiveDateTime) -> Option<XRange> {
    let (first, last) = (sliced.first()?, sliced.last()?);
    let span = last.timestamp - first.timestamp;
    let pad = Duration::milliseconds(((span.num_milliseconds() as f64) * 0.02) as i64)
        .max(Duration::milliseconds(1));
    let start = (first.timestamp - pad).max(origin);
    Some(XRange::new(start, start + span + pad * 2))
}

fn to_plot(points: &[BalancePoint]) -> Vec<PlotPoint> {
    points.iter().map(|p| (p.x_ms() as f64, p.balance)).collect()
}

/// The balance chart for one surface. Holds the only cached state: the full
/// series, the rendered (downsampled) slice, its dot grid and the last x range.
pub struct BalanceChart {
    full: Vec<BalancePoint>,
    rendered: Vec<BalancePoint>,
    rendered_xs: Vec<i64>,
    rendered_line: Vec<PlotPoint>,
    dots: Vec<PlotPoint>,
    last_y_range: Option<(f64, f64)>,
    range: RangeToken,
    theme: Theme,
    revision: u64,
    interactive: bool,
    forecast_active: bool,
    density: DotDensity,
    hover: HoverSync,
    pan: PanClamp,
    listeners: BTreeMap<u64, EventKind>,
    next_listener: u64,
}

impl Default for BalanceChart {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceChart {
    pub fn new() -> Self {
        Self {
            full: Vec::new(),
            rendered: Vec::new(),
            rendered_xs: Vec::new(),
            rendered_line: Vec::new(),
            dots: Vec::new(),
            last_y_range: None,
            range: RangeToken::All,
            theme: Theme::Dark,
            revision: 0,
            interactive: true,
            forecast_active: false,
            density: DotDensity::default(),
            hover: HoverSync::default(),
            pan: PanClamp::default(),
            listeners: BTreeMap::new(),
            next_listener: 0,
        }
    }

    pub fn full_series(&self) -> &[BalancePoint] {
        &self.full
    }

    pub fn rendered(&self) -> &[BalancePoint] {
        &self.rendered
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn hover_state(&self) -> hover::HoverState {
        self.hover.state()
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Rebuild the full series from `transactions` and redraw.
    pub fn update(
        &mut self,
        transactions: &[Transaction],
        initial_balance: f64,
        range: RangeToken,
        theme: Theme,
        surface: &mut dyn RenderSurface,
    ) {
        self.full = series::build_series(transactions, initial_balance);
        self.revision += 1;
        self.draw(range, theme, surface);
    }

    /// Redraw from the cached full series with another range.
    pub fn set_range(&mut self, range: RangeToken, theme: Theme, surface: &mut dyn RenderSurface) {
        self.draw(range, theme, surface);
    }

    pub fn set_interaction_enabled(&mut self, enabled: bool, surface: &mut dyn RenderSurface) {
        if self.interactive == enabled {
            return;
        }
        self.interactive = enabled;
        if !enabled {
            self.hover.pointer_left();
        }
        surface.set_interaction(enabled);
    }

    /// Overlay a projected line with its own dotted fill, using the y range
    /// of the current drawing. Ignored before the first draw.
    pub fn set_forecast(
        &mut self,
        payload: &ForecastPayload,
        theme: Theme,
        surface: &mut dyn RenderSurface,
    ) {
        if self.last_y_range.is_some() && theme != self.theme {
            self.draw(self.range, theme, surface);
        }
        let Some(y_range) = self.last_y_range else {
            return;
        };
        self.clear_forecast(surface);
        let fill = if payload.fill.is_empty() { &payload.line } else { &payload.fill };
        let dots = dots::dotted_fill_points(fill, y_range, surface.viewport(), &self.density);
        surface.restyle(Layer::ForecastDots, dots);
        surface.restyle(Layer::ForecastLine, payload.line.clone());
        self.forecast_active = true;
    }

    pub fn clear_forecast(&mut self, surface: &mut dyn RenderSurface) {
        if !self.forecast_active {
            return;
        }
        surface.restyle(Layer::ForecastDots, Vec::new());
        surface.restyle(Layer::ForecastLine, Vec::new());
        self.forecast_active = false;
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Start receiving events of `kind`.
    pub fn listen(&mut self, kind: EventKind) -> Subscription {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.insert(id, kind);
        Subscription { id }
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.listeners.remove(&subscription.id);
    }

    /// Hover, unhover and range listeners in one go.
    pub fn listen_all(&mut self) -> Vec<Subscription> {
        [EventKind::Hover, EventKind::Unhover, EventKind::RangeChange]
            .into_iter()
            .map(|kind| self.listen(kind))
            .collect()
    }

    fn is_listening(&self, kind: EventKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }

    pub fn handle_event(&mut self, event: ChartEvent, surface: &mut dyn RenderSurface) {
        if let Some(kind) = event.kind() {
            if !self.is_listening(kind) {
                return;
            }
        }
        match event {
            ChartEvent::Hover(x) => {
                if self.interactive {
                    self.hover.pointer_moved(x);
                }
            }
            ChartEvent::Unhover => self.unhover(surface),
            ChartEvent::RangeChange { start, end } => {
                if self.interactive {
                    self.range_changed(start, end, surface);
                }
            }
            ChartEvent::Frame => self.frame(surface),
        }
    }

    fn frame(&mut self, surface: &mut dyn RenderSurface) {
        let Some((idx, x)) = self.hover.on_frame(&self.rendered_xs) else {
            return;
        };
        let (line_before, line_after) = hover::split_line(&self.rendered_line, idx);
        surface.restyle(Layer::LineBefore, line_before);
        surface.restyle(Layer::LineAfter, line_after);
        let (dots_before, dots_after) = hover::split_dots(&self.dots, x);
        surface.restyle(Layer::DotsBefore, dots_before);
        surface.restyle(Layer::DotsAfter, dots_after);
    }

    fn unhover(&mut self, surface: &mut dyn RenderSurface) {
        self.hover.pointer_left();
        surface.restyle(Layer::LineBefore, self.rendered_line.clone());
        surface.restyle(Layer::LineAfter, Vec::new());
        surface.restyle(Layer::DotsBefore, self.dots.clone());
        surface.restyle(Layer::DotsAfter, Vec::new());
    }

    fn range_changed(
        &mut self,
        start: Option<chrono::NaiveDateTime>,
        end: Option<chrono::NaiveDateTime>,
        surface: &mut dyn RenderSurface,
    ) {
        let (Some(first), Some(last)) = (self.full.first(), self.full.last()) else {
            return;
        };
        if let Some(PanOutcome::Corrected(range)) =
            self.pan.propose(start, end, (first.timestamp, last.timestamp))
        {
            surface.relayout(range);
        }
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn clear(&mut self, surface: &mut dyn RenderSurface) {
        surface.purge();
        self.rendered.clear();
        self.rendered_xs.clear();
        self.rendered_line.clear();
        self.dots.clear();
        self.last_y_range = None;
        self.pan.set_last_range(None);
    }

    fn draw(&mut self, range: RangeToken, theme: Theme, surface: &mut dyn RenderSurface) {
        self.range = range;
        self.theme = theme;
        self.hover.reset();
        self.forecast_active = false;

        let sliced = range::slice_by_range(&self.full, RangeWindow::Token(range));
        let viewport = surface.viewport();
        let rendered = lttb::lttb(sliced, target_points(viewport.width)).into_owned();
        let Some(y_range) = y_range(&rendered) else {
            if !rendered.is_empty() {
                log::warn!("balance out of range, nothing to plot");
            }
            self.clear(surface);
            return;
        };
        let dots = dots::dotted_fill(&rendered, y_range, viewport, &self.density);
        let x_range = padded_x_range(&rendered, self.full[0].timestamp);

        self.rendered_xs = rendered.iter().map(|p| epoch_ms(p.timestamp)).collect();
        self.rendered_line = to_plot(&rendered);
        self.rendered = rendered;
        self.dots = dots;
        self.last_y_range = Some(y_range);
        self.pan.set_last_range(x_range);

        log::debug!(
            "chart draw: range={} points={} dots={}",
            range,
            self.rendered.len(),
            self.dots.len()
        );

        if let Some(x_range) = x_range {
            surface.redraw(&Scene {
                line_before: self.rendered_line.clone(),
                line_after: Vec::new(),
                dots_before: self.dots.clone(),
                dots_after: Vec::new(),
                x_range,
                y_range,
                theme,
                interactive: self.interactive,
                revision: self.revision,
            });
        }
    }
}

#[cfg(test)]
impl BalanceChart {
    pub fn dots(&self) -> &[PlotPoint] {
        &self.dots
    }

    pub fn range(&self) -> RangeToken {
        self.range
    }

    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.last_y_range
    }

    pub fn x_range(&self) -> Option<XRange> {
        self.pan.last_range()
    }

    pub fn has_forecast(&self) -> bool {
        self.forecast_active
    }
}
