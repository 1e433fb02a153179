use chrono::Duration;

use crate::chart::surface::PlotPoint;
use crate::models::BalancePoint;

const STEPS: i64 = 7;

/// A projected line plus the outline its dotted fill follows. An empty
/// `fill` means "fill under `line`".
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPayload {
    pub line: Vec<PlotPoint>,
    pub fill: Vec<PlotPoint>,
}

/// Least-squares trend over the whole series, extended `horizon_days`
/// past the last point. The projection starts at the last actual balance
/// so the two lines join.
pub fn project(series: &[BalancePoint], horizon_days: i64) -> Option<ForecastPayload> {
    if series.len() < 2 || horizon_days <= 0 {
        return None;
    }
    let n = series.len() as f64;
    let xs: Vec<f64> = series.iter().map(|p| p.x_ms() as f64).collect();
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = series.iter().map(|p| p.balance).sum::<f64>() / n;

    let (mut num, mut den) = (0.0, 0.0);
    for (x, p) in xs.iter().zip(series) {
        num += (x - mean_x) * (p.balance - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }
    let slope = if den > 0.0 { num / den } else { 0.0 };

    let last = series[series.len() - 1];
    let x0 = last.x_ms() as f64;
    let step = Duration::days(horizon_days).num_milliseconds() as f64 / STEPS as f64;
    let line: Vec<PlotPoint> = (0..=STEPS)
        .map(|i| {
            let x = x0 + i as f64 * step;
            (x, last.balance + slope * (x - x0))
        })
        .collect();

    log::debug!("forecast: slope {:.6}/day over {horizon_days} day(s)", slope * 86_400_000.0);
    Some(ForecastPayload { fill: line.clone(), line })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(balances: &[f64]) -> Vec<BalancePoint> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        balances
            .iter()
            .enumerate()
            .map(|(i, &balance)| BalancePoint {
                timestamp: base + Duration::days(i as i64),
                balance,
            })
            .collect()
    }

    #[test]
    fn test_linear_trend_is_extended() {
        let s = series(&[100.0, 110.0, 120.0, 130.0]);
        let f = project(&s, 7).unwrap();
        assert_eq!(f.line.len(), 8);
        assert_eq!(f.line[0], (s[3].x_ms() as f64, 130.0));
        let (_, y_end) = f.line[7];
        assert!((y_end - 200.0).abs() < 1e-6, "got {y_end}");
        assert_eq!(f.fill, f.line);
    }

    #[test]
    fn test_too_short_or_no_horizon() {
        assert!(project(&series(&[1.0]), 30).is_none());
        assert!(project(&series(&[1.0, 2.0]), 0).is_none());
    }
}
