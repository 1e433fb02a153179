use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;

use crate::chart::range::RangeToken;
use crate::models::Transaction;

const TOP_ITEMS: usize = 3;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub total_expense: f64,
    pub total_income: f64,
    pub expense_count: usize,
    pub income_count: usize,
    /// Expense per category, largest first.
    pub by_category: Vec<CategoryTotal>,
    /// Largest expense items followed by an `Other` remainder when present.
    pub top_items: Vec<CategoryTotal>,
    pub avg_expense: f64,
    pub avg_income: f64,
}

impl Summary {
    pub fn net(&self) -> f64 {
        self.total_income - self.total_expense
    }
}

fn is_income_row(tx: &Transaction) -> bool {
    tx.kind.to_lowercase() == "income"
}

fn sorted_totals(map: HashMap<String, f64>) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = map
        .into_iter()
        .map(|(name, total)| CategoryTotal { name, total })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    totals
}

/// KPI figures for a set of rows. Amounts are taken as absolute values; the
/// type column decides which side they count toward.
pub fn summarize(rows: &[Transaction]) -> Summary {
    let mut summary = Summary::default();
    let mut by_category: HashMap<String, f64> = HashMap::new();
    let mut by_item: HashMap<String, f64> = HashMap::new();

    for tx in rows {
        let amount = tx.amount_value().abs();
        if tx.is_expense() {
            summary.total_expense += amount;
            summary.expense_count += 1;
            *by_category.entry(tx.category_or_default().to_string()).or_default() += amount;
            *by_item.entry(tx.item().to_string()).or_default() += amount;
        } else if is_income_row(tx) {
            summary.total_income += amount;
            summary.income_count += 1;
        }
    }

    if summary.expense_count > 0 {
        summary.avg_expense = summary.total_expense / summary.expense_count as f64;
    }
    if summary.income_count > 0 {
        summary.avg_income = summary.total_income / summary.income_count as f64;
    }

    let items = sorted_totals(by_item);
    let other: f64 = items.iter().skip(TOP_ITEMS).map(|i| i.total).sum();
    summary.top_items = items.into_iter().take(TOP_ITEMS).collect();
    if other > 0.0 {
        summary.top_items.push(CategoryTotal {
            name: "Other".to_string(),
            total: other,
        });
    }
    summary.by_category = sorted_totals(by_category);
    summary
}

// ---------------------------------------------------------------------------
// Row subsetting
// ---------------------------------------------------------------------------

/// Distinct `YYYY-MM` months present in the rows, newest first.
pub fn months_desc(rows: &[Transaction]) -> Vec<String> {
    let months: BTreeSet<String> = rows
        .iter()
        .filter_map(|tx| tx.timestamp())
        .map(|ts| ts.format("%Y-%m").to_string())
        .collect();
    months.into_iter().rev().collect()
}

/// Rows whose date falls in `month` (`YYYY-MM`).
pub fn rows_in_month(rows: &[Transaction], month: &str) -> Vec<Transaction> {
    rows.iter()
        .filter(|tx| {
            tx.timestamp()
                .is_some_and(|ts| ts.format("%Y-%m").to_string() == month)
        })
        .cloned()
        .collect()
}

/// Rows in the trailing window ending at the latest row, oldest first.
pub fn rows_in_range(rows: &[Transaction], token: RangeToken) -> Vec<Transaction> {
    let mut dated: Vec<(NaiveDateTime, &Transaction)> = rows
        .iter()
        .filter_map(|tx| tx.timestamp().map(|ts| (ts, tx)))
        .collect();
    dated.sort_by_key(|(ts, _)| *ts);
    let (Some(&(first, _)), Some(&(last, _))) = (dated.first(), dated.last()) else {
        return Vec::new();
    };
    let start = token.window_start(first, last);
    dated
        .into_iter()
        .filter(|(ts, _)| *ts >= start && *ts <= last)
        .map(|(_, tx)| tx.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, kind: &str, amount: &str, category: &str, tag: &str) -> Transaction {
        Transaction {
            date: date.into(),
            kind: kind.into(),
            amount: amount.into(),
            category: category.into(),
            tag: tag.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_totals_and_averages() {
        let rows = vec![
            row("2024-01-02", "expense", "-$40.00", "Food", "Groceries"),
            row("2024-01-03", "expense", "10", "", "Bus"),
            row("2024-01-05", "income", "1,000", "Salary", "Job"),
            row("2024-01-06", "other income", "50", "", ""),
        ];
        let s = summarize(&rows);
        assert_eq!(s.total_expense, 50.0);
        assert_eq!(s.expense_count, 2);
        assert_eq!(s.total_income, 1000.0);
        assert_eq!(s.income_count, 1);
        assert_eq!(s.avg_expense, 25.0);
        assert_eq!(s.avg_income, 1000.0);
        assert_eq!(s.net(), 950.0);
        assert_eq!(s.by_category[0].name, "Food");
        assert_eq!(s.by_category[1].name, "Uncategorized");
    }

    #[test]
    fn test_top_items_with_other() {
        let rows = vec![
            row("2024-01-01", "expense", "100", "A", "Rent"),
            row("2024-01-01", "expense", "50", "A", "Food"),
            row("2024-01-02", "expense", "30", "A", "Fuel"),
            row("2024-01-02", "expense", "5", "A", "Gum"),
            row("2024-01-03", "expense", "7", "A", "Tea"),
        ];
        let s = summarize(&rows);
        let names: Vec<&str> = s.top_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Rent", "Food", "Fuel", "Other"]);
        assert_eq!(s.top_items[3].total, 12.0);
    }

    #[test]
    fn test_empty_summary() {
        let s = summarize(&[]);
        assert_eq!(s, Summary::default());
        assert!(s.top_items.is_empty());
    }

    #[test]
    fn test_months_desc_and_month_filter() {
        let rows = vec![
            row("2024-01-31", "expense", "1", "", ""),
            row("2024-03-01", "expense", "1", "", ""),
            row("2024-01-02", "expense", "1", "", ""),
            row("garbage", "expense", "1", "", ""),
        ];
        assert_eq!(months_desc(&rows), vec!["2024-03", "2024-01"]);
        assert_eq!(rows_in_month(&rows, "2024-01").len(), 2);
        assert!(rows_in_month(&rows, "2024-02").is_empty());
    }

    #[test]
    fn test_rows_in_range_trailing_window() {
        let rows = vec![
            row("2024-06-30", "expense", "1", "", ""),
            row("2024-01-01", "expense", "1", "", ""),
            row("2024-05-30", "expense", "1", "", ""),
            row("2024-05-29", "expense", "1", "", ""),
        ];
        let month = rows_in_range(&rows, RangeToken::OneMonth);
        let dates: Vec<&str> = month.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-30", "2024-06-30"]);
        assert_eq!(rows_in_range(&rows, RangeToken::All).len(), 4);
        assert_eq!(rows_in_range(&rows, RangeToken::All)[0].date, "2024-01-01");
        assert!(rows_in_range(&[], RangeToken::SixMonths).is_empty());
    }
}
