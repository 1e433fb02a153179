use crate::models::{BalancePoint, Transaction};

/// Running balance after each transaction, oldest first.
///
/// Rows without a parseable date are skipped. The sort is stable, so rows
/// sharing a timestamp keep their input order and the running balance is
/// deterministic.
pub fn build_series(transactions: &[Transaction], initial_balance: f64) -> Vec<BalancePoint> {
    let mut dated: Vec<_> = transactions
        .iter()
        .filter_map(|tx| tx.timestamp().map(|ts| (ts, tx)))
        .collect();
    dated.sort_by_key(|(ts, _)| *ts);

    let mut balance = initial_balance;
    let series: Vec<BalancePoint> = dated
        .into_iter()
        .map(|(timestamp, tx)| {
            let amount = tx.amount_value();
            if tx.is_income() {
                balance += amount;
            } else {
                balance -= amount;
            }
            BalancePoint { timestamp, balance }
        })
        .collect();

    log::debug!(
        "built balance series: {} point(s) from {} row(s)",
        series.len(),
        transactions.len()
    );
    series
}
