use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Plot-space point: x in epoch milliseconds, y in balance units.
pub type PlotPoint = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Visible time window on the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl XRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> chrono::Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    LineBefore,
    LineAfter,
    DotsBefore,
    DotsAfter,
    ForecastLine,
    ForecastDots,
}

pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub line: Rgb,
    pub line_dim: Rgb,
    pub dots: Rgb,
    pub dots_dim: Rgb,
    pub forecast: Rgb,
    pub background: Rgb,
    pub text: Rgb,
    pub muted: Rgb,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                line: (102, 224, 163),
                line_dim: (44, 92, 70),
                dots: (72, 160, 118),
                dots_dim: (34, 62, 50),
                forecast: (255, 107, 107),
                background: (15, 17, 21),
                text: (230, 234, 242),
                muted: (148, 163, 184),
            },
            Theme::Light => Palette {
                line: (38, 160, 100),
                line_dim: (170, 214, 192),
                dots: (88, 176, 132),
                dots_dim: (204, 230, 216),
                forecast: (217, 84, 79),
                background: (246, 247, 249),
                text: (21, 23, 26),
                muted: (107, 114, 128),
            },
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }
}

/// Everything a surface needs for a full redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub line_before: Vec<PlotPoint>,
    pub line_after: Vec<PlotPoint>,
    pub dots_before: Vec<PlotPoint>,
    pub dots_after: Vec<PlotPoint>,
    pub x_range: XRange,
    pub y_range: (f64, f64),
    pub theme: Theme,
    pub interactive: bool,
    /// Bumped on every `update`, so a surface can reset user zoom state.
    pub revision: u64,
}

/// The only thing the chart engine knows about whatever draws it.
pub trait RenderSurface {
    fn viewport(&self) -> Viewport;
    fn redraw(&mut self, scene: &Scene);
    /// Replace the points of a single layer without touching the others.
    fn restyle(&mut self, layer: Layer, points: Vec<PlotPoint>);
    fn relayout(&mut self, range: XRange);
    fn set_interaction(&mut self, enabled: bool);
    /// Clear everything, used when there is nothing to plot.
    fn purge(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Hover,
    Unhover,
    RangeChange,
}

/// Input from the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartEvent {
    /// Pointer over the plot at this x (epoch ms).
    Hover(i64),
    Unhover,
    /// Proposed x range after a pan or zoom. Either bound may be missing.
    RangeChange {
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
    /// Display refresh tick.
    Frame,
}

impl ChartEvent {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            ChartEvent::Hover(_) => Some(EventKind::Hover),
            ChartEvent::Unhover => Some(EventKind::Unhover),
            ChartEvent::RangeChange { .. } => Some(EventKind::RangeChange),
            ChartEvent::Frame => None,
        }
    }
}

/// Handle returned by `BalanceChart::listen`.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the handle keeps the listener registered; pass it to unsubscribe"]
pub struct Subscription {
    pub(crate) id: u64,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Redraw(Scene),
        Restyle(Layer, Vec<PlotPoint>),
        Relayout(XRange),
        Interaction(bool),
        Purge,
    }

    /// Records every call for assertions.
    pub struct RecordingSurface {
        pub viewport: Viewport,
        pub calls: Vec<Call>,
    }

    impl RecordingSurface {
        pub fn new(width: f64, height: f64) -> Self {
            Self {
                viewport: Viewport { width, height },
                calls: Vec::new(),
            }
        }

        pub fn restyles(&self) -> Vec<(Layer, usize)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Restyle(layer, pts) => Some((*layer, pts.len())),
                    _ => None,
                })
                .collect()
        }

        pub fn last_restyle(&self, layer: Layer) -> Option<&Vec<PlotPoint>> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Restyle(l, pts) if *l == layer => Some(pts),
                _ => None,
            })
        }

        pub fn last_scene(&self) -> Option<&Scene> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Redraw(s) => Some(s),
                _ => None,
            })
        }
    }

    impl RenderSurface for RecordingSurface {
        fn viewport(&self) -> Viewport {
            self.viewport
        }
        fn redraw(&mut self, scene: &Scene) {
            self.calls.push(Call::Redraw(scene.clone()));
        }
        fn restyle(&mut self, layer: Layer, points: Vec<PlotPoint>) {
            self.calls.push(Call::Restyle(layer, points));
        }
        fn relayout(&mut self, range: XRange) {
            self.calls.push(Call::Relayout(range));
        }
        fn set_interaction(&mut self, enabled: bool) {
            self.calls.push(Call::Interaction(enabled));
        }
        fn purge(&mut self) {
            self.calls.push(Call::Purge);
        }
    }
}
