use std::borrow::Cow;

use crate::models::BalancePoint;

/// Largest-Triangle-Three-Buckets downsampling.
///
/// Returns exactly `threshold` points with the first and last points kept,
/// or borrows the input untouched when `threshold >= len` or
/// `threshold <= 3`. x is the timestamp in epoch ms, y the balance.
pub fn lttb(series: &[BalancePoint], threshold: usize) -> Cow<'_, [BalancePoint]> {
    let n = series.len();
    if threshold >= n || threshold <= 3 {
        return Cow::Borrowed(series);
    }

    let xs: Vec<f64> = series.iter().map(|p| p.x_ms() as f64).collect();
    let ys: Vec<f64> = series.iter().map(|p| p.balance).collect();

    let mut out = Vec::with_capacity(threshold);
    out.push(series[0]);

    let bucket_size = (n - 2) as f64 / (threshold - 2) as f64;
    let bucket_start = |i: usize| ((i as f64 * bucket_size).floor() as usize + 1).min(n - 1);
    let mut a = 0usize;

    for i in 0..threshold - 2 {
        let (cur_start, cur_end) = (bucket_start(i), bucket_start(i + 1));

        // Centroid of the next bucket; the last interior bucket looks at the final point.
        let (next_start, next_end) = (cur_end, bucket_start(i + 2).max(cur_end + 1).min(n));
        let count = (next_end - next_start) as f64;
        let avg_x = xs[next_start..next_end].iter().sum::<f64>() / count;
        let avg_y = ys[next_start..next_end].iter().sum::<f64>() / count;

        let mut max_area = -1.0;
        let mut max_idx = cur_start;
        for j in cur_start..cur_end {
            let area =
                ((xs[a] - avg_x) * (ys[j] - ys[a]) - (xs[a] - xs[j]) * (avg_y - ys[a])).abs();
            if area > max_area {
                max_area = area;
                max_idx = j;
            }
        }
        out.push(series[max_idx]);
        a = max_idx;
    }

    out.push(series[n - 1]);
    log::debug!("lttb: {n} -> {} point(s)", out.len());
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wave(n: usize) -> Vec<BalancePoint> {
        let base = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n)
            .map(|i| BalancePoint {
                timestamp: base + chrono::Duration::hours(i as i64),
                balance: (i as f64 / 7.0).sin() * 1000.0 + i as f64,
            })
            .collect()
    }

    #[test]
    fn test_exact_length_and_endpoints() {
        let s = wave(10_000);
        for threshold in [4, 5, 100, 1200, 9_999] {
            let out = lttb(&s, threshold);
            assert_eq!(out.len(), threshold);
            assert_eq!(out[0], s[0]);
            assert_eq!(out[threshold - 1], s[s.len() - 1]);
        }
    }

    #[test]
    fn test_passthrough_when_threshold_not_smaller() {
        let s = wave(50);
        assert!(matches!(lttb(&s, 50), Cow::Borrowed(_)));
        assert!(matches!(lttb(&s, 500), Cow::Borrowed(_)));
        assert_eq!(lttb(&s, 3).len(), 50);
        assert_eq!(lttb(&s, 0).len(), 50);
    }

    #[test]
    fn test_output_keeps_time_order() {
        let s = wave(2_000);
        let out = lttb(&s, 150);
        assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_keeps_spike() {
        let mut s = wave(1_000);
        for p in s.iter_mut() {
            p.balance = 0.0;
        }
        s[437].balance = 50_000.0;
        let out = lttb(&s, 20);
        assert!(out.iter().any(|p| p.balance == 50_000.0));
    }

    #[test]
    fn test_flat_series_picks_first_in_bucket() {
        let mut s = wave(12);
        for p in s.iter_mut() {
            p.balance = 1.0;
        }
        // Every area is zero, so the first candidate of each bucket wins.
        let out = lttb(&s, 6);
        let picked: Vec<_> = out.iter().map(|p| s.iter().position(|q| q == p).unwrap()).collect();
        assert_eq!(picked, vec![0, 1, 3, 6, 8, 11]);
    }
}
