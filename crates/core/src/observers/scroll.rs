use std::sync::Arc;

use crate::events::{EventSink, EventSinkExt, HideReason, ScrollDepth};

/// Keeps the deepest scroll position seen on the page. Reports only when
/// the page is hidden, never per scroll.
pub struct ScrollDepthTracker {
    sink: Arc<dyn EventSink>,
    max_depth: u8,
}

/// Percentage of the scrollable distance covered, clamped to 0..=100. A page
/// that cannot scroll has been seen in full.
pub fn scroll_percent(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> u8 {
    let scrollable = scroll_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 {
        return 100;
    }
    let pct = (scroll_top / scrollable * 100.0).round();
    if pct.is_nan() {
        return 0;
    }
    pct.clamp(0.0, 100.0) as u8
}

impl ScrollDepthTracker {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink, max_depth: 0 }
    }

    /// Feed one scroll/touchmove sample; returns the running maximum.
    pub fn sample(&mut self, scroll_top: f64, scroll_height: f64, viewport_height: f64) -> u8 {
        let depth = scroll_percent(scroll_top, scroll_height, viewport_height);
        self.max_depth = self.max_depth.max(depth);
        self.max_depth
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn report(&self, reason: HideReason) {
        self.sink.emit(&ScrollDepth {
            max_depth: self.max_depth,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::testing::RecordingSink;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(scroll_percent(0.0, 2000.0, 1000.0), 0);
        assert_eq!(scroll_percent(500.0, 2000.0, 1000.0), 50);
        assert_eq!(scroll_percent(1200.0, 2000.0, 1000.0), 100);
        assert_eq!(scroll_percent(-40.0, 2000.0, 1000.0), 0);
        assert_eq!(scroll_percent(0.0, 800.0, 1000.0), 100);
    }

    #[test]
    fn maximum_never_decreases() {
        let sink = RecordingSink::new();
        let mut tracker = ScrollDepthTracker::new(sink.clone());

        let positions = [600.0, 300.0, 100.0, 0.0, 200.0, 750.0, 400.0];
        let mut last = 0;
        for top in positions {
            let max = tracker.sample(top, 2000.0, 1000.0);
            assert!(max >= last);
            last = max;
        }
        assert_eq!(tracker.max_depth(), 75);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn reports_watermark_with_reason() {
        let sink = RecordingSink::new();
        let mut tracker = ScrollDepthTracker::new(sink.clone());
        tracker.sample(900.0, 2000.0, 1000.0);
        tracker.sample(100.0, 2000.0, 1000.0);
        tracker.report(HideReason::Visibility);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "scroll_depth");
        assert_eq!(events[0].1["max_depth"], 90);
        assert_eq!(events[0].1["reason"], "visibility");
    }
}
