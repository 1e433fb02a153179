use comfy_table::{Cell, Table};

use crate::chart::range::{slice_by_range, RangeToken, RangeWindow};
use crate::chart::{lttb::lttb, series::build_series, MAX_LINE_POINTS};
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;

pub fn run(
    file: Option<String>,
    range: RangeToken,
    month: Option<String>,
    points: Option<usize>,
) -> Result<()> {
    let (window, label) = match month.as_deref() {
        Some(m) => (RangeWindow::month(m)?, m.to_string()),
        None => (range.into(), range.label().to_string()),
    };
    let settings = load_settings();
    let rows = super::load_rows(file.as_deref(), &settings)?;
    let series = build_series(&rows, settings.initial_balance);
    let sliced = slice_by_range(&series, window);
    let shown = lttb(sliced, points.unwrap_or(MAX_LINE_POINTS));

    let mut table = Table::new();
    table.set_header(vec!["Date", "Balance"]);
    for p in shown.iter() {
        table.add_row(vec![
            Cell::new(p.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(money(p.balance)),
        ]);
    }
    println!("Balance ({label})\n{table}");
    println!(
        "{} point(s) shown, {} in range, {} total",
        shown.len(),
        sliced.len(),
        series.len()
    );
    Ok(())
}
