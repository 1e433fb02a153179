use super::surface::PlotPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovering,
}

/// Tracks the pointer and coalesces moves to one update per frame.
///
/// Moves only record the newest position; [`HoverSync::on_frame`] consumes
/// it. Intermediate positions between two frames are dropped on purpose.
#[derive(Debug, Default)]
pub struct HoverSync {
    state: HoverState,
    pending: Option<i64>,
    frame_requested: bool,
    last_index: Option<usize>,
}

impl HoverSync {
    pub fn state(&self) -> HoverState {
        self.state
    }

    #[cfg(test)]
    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    pub fn pointer_moved(&mut self, x_ms: i64) {
        self.state = HoverState::Hovering;
        self.pending = Some(x_ms);
        self.frame_requested = true;
    }

    /// Back to idle. Cancels any pending frame work.
    pub fn pointer_left(&mut self) {
        self.state = HoverState::Idle;
        self.pending = None;
        self.frame_requested = false;
        self.last_index = None;
    }

    /// Forget the cached index, e.g. after the backing series was replaced.
    pub fn reset(&mut self) {
        self.last_index = None;
    }

    /// Process the latest pending position against the series x values.
    /// Returns `(index, x)` only when the cursor moved to a new index.
    pub fn on_frame(&mut self, xs: &[i64]) -> Option<(usize, i64)> {
        if !self.frame_requested {
            return None;
        }
        self.frame_requested = false;
        let x = self.pending.take()?;
        if xs.is_empty() {
            return None;
        }
        let idx = index_at(xs, x);
        if self.last_index == Some(idx) {
            return None;
        }
        self.last_index = Some(idx);
        Some((idx, x))
    }
}

/// Rightmost index whose x is `<= x`, or 0 when the pointer is left of the
/// first point.
pub fn index_at(xs: &[i64], x: i64) -> usize {
    xs.partition_point(|&v| v <= x).saturating_sub(1)
}

/// Line partitions around `idx`. Both halves include the cursor point so
/// the two segments meet.
pub fn split_line(points: &[PlotPoint], idx: usize) -> (Vec<PlotPoint>, Vec<PlotPoint>) {
    if points.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let idx = idx.min(points.len() - 1);
    (points[..=idx].to_vec(), points[idx..].to_vec())
}

/// Dot partitions at the exact pointer x. Dots are ordered by column.
pub fn split_dots(dots: &[PlotPoint], x_ms: i64) -> (Vec<PlotPoint>, Vec<PlotPoint>) {
    let x = x_ms as f64;
    let cut = dots.partition_point(|d| d.0 <= x);
    (dots[..cut].to_vec(), dots[cut..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_at() {
        let xs = [10, 20, 30, 40];
        assert_eq!(index_at(&xs, 5), 0);
        assert_eq!(index_at(&xs, 10), 0);
        assert_eq!(index_at(&xs, 29), 1);
        assert_eq!(index_at(&xs, 30), 2);
        assert_eq!(index_at(&xs, 1_000), 3);
    }

    #[test]
    fn test_coalesces_to_latest_position() {
        let xs = [10, 20, 30, 40];
        let mut hover = HoverSync::default();
        hover.pointer_moved(12);
        hover.pointer_moved(25);
        hover.pointer_moved(35);
        assert_eq!(hover.state(), HoverState::Hovering);
        assert_eq!(hover.on_frame(&xs), Some((2, 35)));
        // Nothing pending.
        assert_eq!(hover.on_frame(&xs), None);
    }

    #[test]
    fn test_same_index_is_skipped() {
        let xs = [10, 20, 30];
        let mut hover = HoverSync::default();
        hover.pointer_moved(21);
        assert_eq!(hover.on_frame(&xs), Some((1, 21)));
        hover.pointer_moved(29);
        assert_eq!(hover.on_frame(&xs), None);
        hover.pointer_moved(30);
        assert_eq!(hover.on_frame(&xs), Some((2, 30)));
    }

    #[test]
    fn test_leave_cancels_pending() {
        let xs = [10, 20];
        let mut hover = HoverSync::default();
        hover.pointer_moved(15);
        hover.pointer_left();
        assert_eq!(hover.state(), HoverState::Idle);
        assert!(!hover.frame_requested());
        assert_eq!(hover.on_frame(&xs), None);
        // Index cache was cleared, so re-entering at the same spot updates.
        hover.pointer_moved(15);
        assert_eq!(hover.on_frame(&xs), Some((0, 15)));
    }

    #[test]
    fn test_split_line_shares_cursor_point() {
        let pts = vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)];
        let (before, after) = split_line(&pts, 1);
        assert_eq!(before, vec![(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(after, vec![(1.0, 2.0), (2.0, 3.0)]);
        let (before, after) = split_line(&pts, 9);
        assert_eq!(before.len(), 3);
        assert_eq!(after.len(), 1);
    }

    #[test]
    fn test_split_dots_at_pointer() {
        let dots = vec![(0.0, 0.0), (0.0, 1.0), (10.0, 0.0), (20.0, 0.0)];
        let (before, after) = split_dots(&dots, 10);
        assert_eq!(before.len(), 3);
        assert_eq!(after, vec![(20.0, 0.0)]);
        let (before, after) = split_dots(&dots, -1);
        assert!(before.is_empty());
        assert_eq!(after.len(), 4);
    }
}
