use super::surface::{PlotPoint, Viewport};
use crate::models::BalancePoint;

/// How densely the area under the curve is stippled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotDensity {
    pub cols_per_1000px: f64,
    pub rows_per_240px: f64,
    pub min_cols: usize,
    pub min_rows: usize,
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for DotDensity {
    fn default() -> Self {
        Self {
            cols_per_1000px: 140.0,
            rows_per_240px: 40.0,
            min_cols: 20,
            min_rows: 8,
            min_width: 300.0,
            min_height: 160.0,
        }
    }
}

impl DotDensity {
    /// (columns, rows) for a viewport. A zero-sized viewport falls back to
    /// 1000x240 before the floors apply.
    pub fn grid(&self, viewport: Viewport) -> (usize, usize) {
        let width = if viewport.width > 0.0 { viewport.width } else { 1000.0 };
        let height = if viewport.height > 0.0 { viewport.height } else { 240.0 };
        let width = width.max(self.min_width);
        let height = height.max(self.min_height);
        let cols = (self.cols_per_1000px * width / 1000.0).round() as usize;
        let rows = (self.rows_per_240px * height / 240.0).round() as usize;
        (cols.max(self.min_cols), rows.max(self.min_rows))
    }
}

/// Linear interpolation of the curve at `x`, clamped to the end values.
/// `xs` must be ascending.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    // First segment whose right end is at or past x.
    let j = xs[1..].partition_point(|&v| v < x);
    if j >= n - 1 {
        return ys[n - 1];
    }
    let t = (x - xs[j]) / (xs[j + 1] - xs[j]).max(1.0);
    ys[j] + t * (ys[j + 1] - ys[j])
}

/// Point grid filling the area between `y_range.0` and the curve.
///
/// Columns are spread evenly over the series' own x extent; each column
/// holds one dot per row step from the bottom of the y range up to the
/// interpolated curve height.
pub fn dotted_fill(
    series: &[BalancePoint],
    y_range: (f64, f64),
    viewport: Viewport,
    density: &DotDensity,
) -> Vec<PlotPoint> {
    if series.is_empty() {
        return Vec::new();
    }
    let xs: Vec<f64> = series.iter().map(|p| p.x_ms() as f64).collect();
    let ys: Vec<f64> = series.iter().map(|p| p.balance).collect();
    fill_points(&xs, &ys, y_range, viewport, density)
}

/// Same as [`dotted_fill`] for raw plot points, used by the forecast overlay.
pub fn dotted_fill_points(
    points: &[PlotPoint],
    y_range: (f64, f64),
    viewport: Viewport,
    density: &DotDensity,
) -> Vec<PlotPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    fill_points(&xs, &ys, y_range, viewport, density)
}

fn fill_points(
    xs: &[f64],
    ys: &[f64],
    (y_min, y_max): (f64, f64),
    viewport: Viewport,
    density: &DotDensity,
) -> Vec<PlotPoint> {
    let (cols, rows) = density.grid(viewport);
    let step_y = (y_max - y_min) / rows as f64;
    if !(step_y > 0.0 && step_y.is_finite()) {
        return Vec::new();
    }

    let x_min = xs[0];
    let x_max = xs[xs.len() - 1];
    let step_x = if cols > 1 { (x_max - x_min) / (cols - 1) as f64 } else { 0.0 };

    let mut out = Vec::new();
    for i in 0..cols {
        let x = x_min + i as f64 * step_x;
        let top = interpolate(xs, ys, x);
        // At most one dot per row, even when the curve leaves the range.
        for k in 0..=rows {
            let y = y_min + k as f64 * step_y;
            if !(y <= top) {
                break;
            }
            out.push((x, y));
        }
    }
    out
}
