use chrono::NaiveDateTime;

use super::surface::XRange;

/// Keep the left edge at or after `first`, preserving the requested span.
/// There is no right-hand limit.
pub fn clamp_left(proposed: XRange, first: NaiveDateTime) -> XRange {
    if proposed.start < first {
        XRange::new(first, first + proposed.span())
    } else {
        proposed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanOutcome {
    /// The proposal was already valid.
    Accepted(XRange),
    /// The proposal scrolled past the first point; the viewport must be
    /// moved to this range.
    Corrected(XRange),
}

#[cfg(test)]
impl PanOutcome {
    pub fn range(&self) -> XRange {
        match self {
            PanOutcome::Accepted(r) | PanOutcome::Corrected(r) => *r,
        }
    }
}

/// Remembers the last applied x range so partial proposals (only one bound
/// changed) can be completed.
#[derive(Debug, Default)]
pub struct PanClamp {
    last: Option<XRange>,
}

impl PanClamp {
    #[cfg(test)]
    pub fn last_range(&self) -> Option<XRange> {
        self.last
    }

    pub fn set_last_range(&mut self, range: Option<XRange>) {
        self.last = range;
    }

    /// Apply a viewport change. `bounds` is the full series' (first, last)
    /// timestamp pair. Returns `None` when the event carries no range.
    pub fn propose(
        &mut self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        bounds: (NaiveDateTime, NaiveDateTime),
    ) -> Option<PanOutcome> {
        if start.is_none() && end.is_none() {
            return None;
        }
        let current = self.last.unwrap_or(XRange::new(bounds.0, bounds.1));
        let proposed = XRange::new(start.unwrap_or(current.start), end.unwrap_or(current.end));
        let clamped = clamp_left(proposed, bounds.0);
        self.last = Some(clamped);
        if clamped != proposed {
            log::debug!("pan clamped: {:?} -> {:?}", proposed.start, clamped.start);
            Some(PanOutcome::Corrected(clamped))
        } else {
            Some(PanOutcome::Accepted(clamped))
        }
    }
}
