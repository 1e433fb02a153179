use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::assoc::{compute_rules, BasketMode};
use crate::chart::range::RangeToken;
use crate::error::{FindashError, Result};
use crate::fmt::pct;
use crate::settings::load_settings;

pub fn run(
    file: Option<String>,
    mode: BasketMode,
    min_support: f64,
    min_confidence: f64,
    month: Option<String>,
    range: Option<RangeToken>,
) -> Result<()> {
    let open_unit = |v: f64| v > 0.0 && v < 1.0;
    if !open_unit(min_support) || !open_unit(min_confidence) {
        return Err(FindashError::Other(
            "--min-support and --min-confidence must be greater than 0 and less than 1"
                .to_string(),
        ));
    }
    let settings = load_settings();
    let rows = super::load_rows(file.as_deref(), &settings)?;
    let (rows, period) = super::period_rows(&rows, month.as_deref(), range);
    let result = compute_rules(&rows, mode, min_support, min_confidence);

    println!(
        "{} ({period}): {} day basket(s), min support {}, min confidence {}",
        mode.label().bold(),
        result.basket_count,
        pct(min_support),
        pct(min_confidence)
    );

    if result.cooccurrences.is_empty() {
        println!("No frequent combinations at this support.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Together", "Support"]);
        for c in &result.cooccurrences {
            table.add_row(vec![Cell::new(c.itemset.label()), Cell::new(pct(c.support))]);
        }
        println!("\nFrequent Combinations\n{table}");
    }

    if result.rules.is_empty() {
        println!("No rules at these thresholds.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Rule", "Support", "Confidence", "Lift"]);
    for r in &result.rules {
        let lift = format!("{:.2}", r.lift);
        let lift = if r.lift >= 1.0 { lift.green() } else { lift.normal() };
        table.add_row(vec![
            Cell::new(r.label()),
            Cell::new(pct(r.support)),
            Cell::new(pct(r.confidence)),
            Cell::new(lift),
        ]);
    }
    println!("\nRules\n{table}");
    Ok(())
}
