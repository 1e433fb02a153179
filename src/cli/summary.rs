use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::chart::range::RangeToken;
use crate::error::Result;
use crate::fmt::{money, pct};
use crate::reports::summarize;
use crate::settings::load_settings;

pub fn run(file: Option<String>, month: Option<String>, range: Option<RangeToken>) -> Result<()> {
    let settings = load_settings();
    let rows = super::load_rows(file.as_deref(), &settings)?;
    let (rows, period) = super::period_rows(&rows, month.as_deref(), range);
    let s = summarize(&rows);

    let mut table = Table::new();
    table.set_header(vec!["", "Total", "Count", "Average"]);
    table.add_row(vec![
        Cell::new("Income".green().bold()),
        Cell::new(money(s.total_income)),
        Cell::new(s.income_count),
        Cell::new(money(s.avg_income)),
    ]);
    table.add_row(vec![
        Cell::new("Expenses".red().bold()),
        Cell::new(money(s.total_expense)),
        Cell::new(s.expense_count),
        Cell::new(money(s.avg_expense)),
    ]);
    let net_label = if s.net() >= 0.0 {
        "Net".green().bold()
    } else {
        "Net".red().bold()
    };
    table.add_row(vec![
        Cell::new(net_label),
        Cell::new(money(s.net())),
        Cell::new(""),
        Cell::new(""),
    ]);
    println!("Summary ({period})\n{table}");

    if !s.by_category.is_empty() {
        let mut ctable = Table::new();
        ctable.set_header(vec!["Category", "Amount", "%"]);
        for c in &s.by_category {
            let share = if s.total_expense > 0.0 { c.total / s.total_expense } else { 0.0 };
            ctable.add_row(vec![
                Cell::new(&c.name),
                Cell::new(money(c.total)),
                Cell::new(pct(share)),
            ]);
        }
        println!("\nExpenses by Category\n{ctable}");
    }

    if !s.top_items.is_empty() {
        let mut itable = Table::new();
        itable.set_header(vec!["Item", "Amount"]);
        for i in &s.top_items {
            itable.add_row(vec![Cell::new(&i.name), Cell::new(money(i.total))]);
        }
        println!("\nTop Items\n{itable}");
    }
    Ok(())
}
