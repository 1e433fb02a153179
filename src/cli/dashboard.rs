use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use crossterm::event::{KeyCode, MouseEvent, MouseEventKind};
use rand::seq::SliceRandom;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::assoc::{
    compute_rules, AssocResult, BasketMode, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_SUPPORT,
};
use crate::chart::hover::{index_at, HoverState};
use crate::chart::range::RangeToken;
use crate::chart::surface::{ChartEvent, Subscription, Theme, XRange};
use crate::chart::BalanceChart;
use crate::error::Result;
use crate::fmt::{money_masked, pct};
use crate::forecast;
use crate::importer;
use crate::models::Transaction;
use crate::reports::{self, Summary};
use crate::settings::{load_settings, save_settings, Settings};
use crate::tui::{
    chart_layout, money_span, run_view, wrap_text, InteractiveView, TerminalSurface, ViewAction,
    BOLD, FOOTER_STYLE, HEADER_STYLE,
};

const GREETINGS: &[&str] = &[
    "Let's see where the money went.",
    "Your balance, at a glance.",
    "Another day, another CSV.",
    "Numbers are in.",
    "Coffee first, then spreadsheets.",
    "Every dollar has a story.",
    "Shall we check the damage?",
    "Good to see you.",
];

const FORECAST_DAYS: i64 = 30;
/// How long chart interaction stays off after a scroll.
const SCROLL_PAUSE: Duration = Duration::from_millis(120);
const PAN_STEP: f64 = 0.10;
const ZOOM_STEP: f64 = 0.8;
const MIN_SPAN_MS: i64 = 86_400_000;
const Y_LABEL_WIDTH: u16 = 13;

const SUPPORT_STEP: f64 = 0.01;
const SUPPORT_BOUNDS: (f64, f64) = (0.01, 0.20);
const CONFIDENCE_STEP: f64 = 0.05;
const CONFIDENCE_BOUNDS: (f64, f64) = (0.10, 0.90);

#[derive(Debug, Default)]
pub struct DashboardArgs {
    pub file: Option<String>,
    pub range: RangeToken,
    pub search: Option<String>,
    pub categories: Vec<String>,
}

struct Dashboard {
    settings: Settings,
    rows: Vec<Transaction>,
    greeting: String,
    chart: BalanceChart,
    surface: TerminalSurface,
    subscriptions: Vec<Subscription>,
    range: RangeToken,
    theme: Theme,
    blur: bool,
    forecast_on: bool,
    hovered: Option<i64>,
    resume_at: Option<Instant>,
    months: Vec<String>,
    month_index: Option<usize>,
    mode: BasketMode,
    min_support: f64,
    min_confidence: f64,
    summary: Summary,
    assoc: AssocResult,
    rules_scroll: usize,
    status_message: Option<String>,
}

fn step(value: f64, delta: f64, (lo, hi): (f64, f64)) -> f64 {
    // Round to whole hundredths so repeated steps do not drift.
    ((value + delta).clamp(lo, hi) * 100.0).round() / 100.0
}

impl Dashboard {
    fn new(settings: Settings, rows: Vec<Transaction>, range: RangeToken) -> Self {
        let mut rng = rand::thread_rng();
        let random_greeting = GREETINGS.choose(&mut rng).unwrap_or(&"Hello.").to_string();
        let first_name = settings.user_name.split_whitespace().next().unwrap_or("");
        let greeting = if first_name.is_empty() {
            random_greeting
        } else {
            format!("Hello, {first_name}. {random_greeting}")
        };

        let mut chart = BalanceChart::new();
        let subscriptions = chart.listen_all();
        let mut dashboard = Self {
            theme: settings.theme,
            blur: settings.blur_sensitive,
            months: reports::months_desc(&rows),
            settings,
            rows,
            greeting,
            chart,
            surface: TerminalSurface::new(),
            subscriptions,
            range,
            forecast_on: false,
            hovered: None,
            resume_at: None,
            month_index: None,
            mode: BasketMode::Category,
            min_support: DEFAULT_MIN_SUPPORT,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            summary: Summary::default(),
            assoc: AssocResult::default(),
            rules_scroll: 0,
            status_message: None,
        };
        dashboard.chart.update(
            &dashboard.rows,
            dashboard.settings.initial_balance,
            dashboard.range,
            dashboard.theme,
            &mut dashboard.surface,
        );
        dashboard.refresh_reports();
        dashboard
    }

    // -----------------------------------------------------------------------
    // State changes
    // -----------------------------------------------------------------------

    fn redraw_chart(&mut self) {
        self.hovered = None;
        self.chart.set_range(self.range, self.theme, &mut self.surface);
        self.apply_forecast();
    }

    fn apply_forecast(&mut self) {
        if !self.forecast_on {
            self.chart.clear_forecast(&mut self.surface);
            return;
        }
        match forecast::project(self.chart.rendered(), FORECAST_DAYS) {
            Some(payload) => self.chart.set_forecast(&payload, self.theme, &mut self.surface),
            None => {
                self.forecast_on = false;
                self.status_message = Some("Not enough history for a forecast.".to_string());
            }
        }
    }

    fn period_label(&self) -> String {
        match self.month_index.and_then(|i| self.months.get(i)) {
            Some(month) => month.clone(),
            None => self.range.label().to_string(),
        }
    }

    fn refresh_reports(&mut self) {
        let month = self.month_index.and_then(|i| self.months.get(i)).map(String::as_str);
        let (rows, _) = super::period_rows(&self.rows, month, Some(self.range));
        self.summary = reports::summarize(&rows);
        self.assoc = compute_rules(&rows, self.mode, self.min_support, self.min_confidence);
        self.rules_scroll = 0;
    }

    fn set_range(&mut self, range: RangeToken) {
        self.range = range;
        self.month_index = None;
        self.redraw_chart();
        self.refresh_reports();
    }

    fn older_month(&mut self) {
        if self.months.is_empty() {
            return;
        }
        self.month_index = Some(match self.month_index {
            None => 0,
            Some(i) => (i + 1).min(self.months.len() - 1),
        });
        self.refresh_reports();
    }

    fn newer_month(&mut self) {
        self.month_index = match self.month_index {
            None | Some(0) => None,
            Some(i) => Some(i - 1),
        };
        self.refresh_reports();
    }

    fn persist(&mut self) {
        self.settings.theme = self.theme;
        self.settings.blur_sensitive = self.blur;
        if let Err(e) = save_settings(&self.settings) {
            self.status_message = Some(format!("Could not save settings: {e}"));
        }
    }

    /// Hand a user pan or zoom to the chart, which corrects it when it runs
    /// past the first point.
    fn propose_view(&mut self, range: XRange) {
        if !self.chart.is_interactive() {
            return;
        }
        self.surface.set_view(range);
        self.chart.handle_event(
            ChartEvent::RangeChange {
                start: Some(range.start),
                end: Some(range.end),
            },
            &mut self.surface,
        );
    }

    fn pan(&mut self, direction: f64) {
        let Some(view) = self.surface.x_range() else {
            return;
        };
        let shift = chrono::Duration::milliseconds(
            (view.span().num_milliseconds() as f64 * PAN_STEP * direction) as i64,
        );
        self.propose_view(XRange::new(view.start + shift, view.end + shift));
    }

    fn zoom(&mut self, factor: f64) {
        let Some(view) = self.surface.x_range() else {
            return;
        };
        let span = view.span().num_milliseconds();
        let new_span = ((span as f64 * factor) as i64).max(MIN_SPAN_MS);
        let center = view.start + chrono::Duration::milliseconds(span / 2);
        let start = center - chrono::Duration::milliseconds(new_span / 2);
        self.propose_view(XRange::new(start, start + chrono::Duration::milliseconds(new_span)));
    }

    fn pause_interaction(&mut self) {
        self.hovered = None;
        if self.chart.hover_state() == HoverState::Hovering {
            self.chart.handle_event(ChartEvent::Unhover, &mut self.surface);
        }
        self.chart.set_interaction_enabled(false, &mut self.surface);
        self.resume_at = Some(Instant::now() + SCROLL_PAUSE);
    }

    fn release_listeners(&mut self) {
        for sub in self.subscriptions.drain(..) {
            self.chart.unsubscribe(sub);
        }
    }

    /// Balance of the rendered point under the cursor.
    fn hover_readout(&self) -> Option<(NaiveDateTime, f64)> {
        let x = self.hovered?;
        let rendered = self.chart.rendered();
        if rendered.is_empty() {
            return None;
        }
        let xs: Vec<i64> = rendered.iter().map(|p| p.x_ms()).collect();
        let p = rendered[index_at(&xs, x)];
        Some((p.timestamp, p.balance))
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_kpis(&self, frame: &mut Frame, area: Rect) {
        let s = &self.summary;
        let balance = self.chart.full_series().last().map(|p| p.balance);
        let label = |text: &str| Span::raw(format!(" {text:<10}"));
        let lines = vec![
            Line::from(vec![
                label("Balance"),
                balance.map_or(Span::raw("-"), |b| money_span(b, self.blur)),
                label("   Net"),
                money_span(s.net(), self.blur),
            ]),
            Line::from(vec![
                label("Income"),
                money_span(s.total_income, self.blur),
                Span::styled(format!(" ({})", s.income_count), FOOTER_STYLE),
                label("   Expenses"),
                money_span(-s.total_expense, self.blur),
                Span::styled(format!(" ({})", s.expense_count), FOOTER_STYLE),
            ]),
            Line::from(vec![
                label("Avg in"),
                money_span(s.avg_income, self.blur),
                label("   Avg out"),
                money_span(-s.avg_expense, self.blur),
                Span::styled(format!("   Period: {}", self.period_label()), FOOTER_STYLE),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_chart(&mut self, frame: &mut Frame, area: Rect) {
        let [title_area, body] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);

        let mut title = vec![Span::styled(format!(" Balance · {}", self.range.label()), BOLD)];
        if self.forecast_on {
            title.push(Span::styled(
                format!("  + {FORECAST_DAYS}-day forecast"),
                Style::default().fg(Color::Red),
            ));
        }
        if let Some((ts, balance)) = self.hover_readout() {
            title.push(Span::raw(format!(
                "   {}  {}",
                ts.format("%Y-%m-%d"),
                money_masked(balance, self.blur)
            )));
        }
        if !self.surface.is_interactive() {
            title.push(Span::styled("   (scrolling)", FOOTER_STYLE));
        }
        frame.render_widget(Paragraph::new(Line::from(title)), title_area);

        let layout = chart_layout(body, Y_LABEL_WIDTH);
        if self.surface.resize(layout.plot) {
            self.redraw_chart();
        }
        self.surface.render(frame, layout, self.blur);
    }

    fn draw_spending(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(Span::styled(" Top Categories", BOLD))];
        for c in self.summary.by_category.iter().take(5) {
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<18}", truncate(&c.name, 18))),
                money_span(-c.total, self.blur),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Top Items", BOLD)));
        for i in &self.summary.top_items {
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<18}", truncate(&i.name, 18))),
                money_span(-i.total, self.blur),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_combinations(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(Span::styled(" Frequent Combinations", BOLD))];
        if self.assoc.cooccurrences.is_empty() {
            lines.push(Line::from(Span::styled(" none at this support", FOOTER_STYLE)));
        }
        let width = area.width.saturating_sub(9) as usize;
        for c in &self.assoc.cooccurrences {
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<width$}", truncate(&c.itemset.label(), width))),
                Span::styled(format!("{:>7}", pct(c.support)), FOOTER_STYLE),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_rules(&self, frame: &mut Frame, area: Rect) {
        let header = format!(
            " Rules · {} · support ≥ {} · confidence ≥ {} · {} days",
            self.mode.label(),
            pct(self.min_support),
            pct(self.min_confidence),
            self.assoc.basket_count
        );
        let mut body: Vec<Line> = Vec::new();
        if self.assoc.rules.is_empty() {
            body.push(Line::from(Span::styled(" no rules at these thresholds", FOOTER_STYLE)));
        }
        let width = area.width.saturating_sub(2) as usize;
        for r in &self.assoc.rules {
            let text = format!(
                "{}  conf {}  lift {:.2}",
                r.label(),
                pct(r.confidence),
                r.lift
            );
            let (wrapped, _) = wrap_text(&text, width);
            for (i, l) in wrapped.lines().enumerate() {
                let marker = if i == 0 { "•" } else { " " };
                body.push(Line::from(format!(" {marker}{l}")));
            }
        }
        let mut lines = vec![Line::from(Span::styled(header, BOLD))];
        lines.extend(body.into_iter().skip(self.rules_scroll));
        frame.render_widget(Paragraph::new(lines), area);
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}…")
}

impl InteractiveView for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, sep1, kpi_area, chart_area, sep2, panels_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Length(12),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.greeting)).style(HEADER_STYLE),
            header_area,
        );

        let sep_line = "━".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(border_style);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget, sep2);

        self.draw_kpis(frame, kpi_area);
        self.draw_chart(frame, chart_area);

        let [left, middle, right] = Layout::horizontal([
            Constraint::Percentage(28),
            Constraint::Percentage(30),
            Constraint::Percentage(42),
        ])
        .areas(panels_area);
        self.draw_spending(frame, left);
        self.draw_combinations(frame, middle);
        self.draw_rules(frame, right);

        if let Some(msg) = &self.status_message {
            frame.render_widget(
                Paragraph::new(format!(" {msg}")).style(Style::default().fg(Color::Yellow)),
                hints_area,
            );
        } else {
            frame.render_widget(
                Paragraph::new(concat!(
                    " a/6/1=range  [/]=month  ←/→=pan  +/-=zoom  c/i/d=mode",
                    "  s/S f/F=thresholds  p=forecast  b=blur  t=theme  q=quit",
                ))
                .style(FOOTER_STYLE),
                hints_area,
            );
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        self.status_message = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.release_listeners();
                return ViewAction::Close;
            }
            KeyCode::Char('a') => self.set_range(RangeToken::All),
            KeyCode::Char('6') => self.set_range(RangeToken::SixMonths),
            KeyCode::Char('1') => self.set_range(RangeToken::OneMonth),
            KeyCode::Char('[') => self.older_month(),
            KeyCode::Char(']') => self.newer_month(),
            KeyCode::Left => self.pan(-1.0),
            KeyCode::Right => self.pan(1.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(ZOOM_STEP),
            KeyCode::Char('-') => self.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char(c @ ('c' | 'i' | 'd')) => {
                self.mode = match c {
                    'c' => BasketMode::Category,
                    'i' => BasketMode::Item,
                    _ => BasketMode::DayOfWeekCategory,
                };
                self.refresh_reports();
            }
            KeyCode::Char('s') => {
                self.min_support = step(self.min_support, -SUPPORT_STEP, SUPPORT_BOUNDS);
                self.refresh_reports();
            }
            KeyCode::Char('S') => {
                self.min_support = step(self.min_support, SUPPORT_STEP, SUPPORT_BOUNDS);
                self.refresh_reports();
            }
            KeyCode::Char('f') => {
                self.min_confidence =
                    step(self.min_confidence, -CONFIDENCE_STEP, CONFIDENCE_BOUNDS);
                self.refresh_reports();
            }
            KeyCode::Char('F') => {
                self.min_confidence =
                    step(self.min_confidence, CONFIDENCE_STEP, CONFIDENCE_BOUNDS);
                self.refresh_reports();
            }
            KeyCode::Char('p') => {
                self.forecast_on = !self.forecast_on;
                self.apply_forecast();
            }
            KeyCode::Char('b') => {
                self.blur = !self.blur;
                self.persist();
            }
            KeyCode::Char('t') => {
                self.theme = self.theme.toggled();
                self.persist();
                self.redraw_chart();
            }
            _ => {}
        }
        ViewAction::Continue
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                match self.surface.x_at(event.column, event.row) {
                    Some(x) => {
                        self.chart.handle_event(ChartEvent::Hover(x), &mut self.surface);
                        if self.chart.is_interactive() {
                            self.hovered = Some(x);
                        }
                    }
                    None => {
                        if self.hovered.take().is_some() {
                            self.chart.handle_event(ChartEvent::Unhover, &mut self.surface);
                        }
                    }
                }
            }
            MouseEventKind::ScrollDown => {
                self.rules_scroll = (self.rules_scroll + 1).min(self.assoc.rules.len() * 2);
                self.pause_interaction();
            }
            MouseEventKind::ScrollUp => {
                self.rules_scroll = self.rules_scroll.saturating_sub(1);
                self.pause_interaction();
            }
            _ => {}
        }
    }

    fn tick(&mut self) {
        if self.resume_at.is_some_and(|t| Instant::now() >= t) {
            self.resume_at = None;
            self.chart.set_interaction_enabled(true, &mut self.surface);
        }
        self.chart.handle_event(ChartEvent::Frame, &mut self.surface);
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

pub fn run(args: DashboardArgs) -> Result<()> {
    let settings = load_settings();
    let rows = super::load_rows(args.file.as_deref(), &settings)?;
    let known = importer::categories(&rows);
    for c in args.categories.iter().filter(|c| !c.eq_ignore_ascii_case("all")) {
        if !known.contains(c) {
            log::warn!("no rows in category '{c}'");
        }
    }
    let rows = importer::filter_transactions(&rows, args.search.as_deref(), &args.categories);
    log::info!("dashboard: {} row(s) after filters", rows.len());

    let mut dashboard = Dashboard::new(settings, rows, args.range);
    run_view(&mut dashboard)
}
