use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    clock::Clock,
    events::{EventSink, EventSinkExt, HideReason, SectionEnter, SectionTime, SectionTransition},
};

/// One intersection-observer record for a section element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub section: String,
    pub ratio: f64,
    pub is_intersecting: bool,
}

impl SectionEntry {
    pub fn visible(section: impl Into<String>, ratio: f64) -> Self {
        Self {
            section: section.into(),
            ratio,
            is_intersecting: true,
        }
    }

    pub fn hidden(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            ratio: 0.0,
            is_intersecting: false,
        }
    }
}

struct Current {
    section: String,
    /// `None` while the page is hidden and dwell is not accruing.
    since: Option<i64>,
}

/// Tracks which named section is most visible and how long it stays so.
pub struct SectionTracker {
    sections: Vec<String>,
    /// Smallest ratio that counts as visible; the lowest configured threshold.
    min_ratio: f64,
    ratios: HashMap<String, f64>,
    current: Option<Current>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl SectionTracker {
    /// `thresholds` are the intersection ratios the host observer reports
    /// at. Entries below the lowest one are treated as not visible.
    pub fn new(
        sections: Vec<String>,
        thresholds: &[f64],
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let min_ratio = thresholds.iter().copied().fold(f64::INFINITY, f64::min);
        Self {
            sections,
            min_ratio: if min_ratio.is_finite() { min_ratio } else { f64::MIN_POSITIVE },
            ratios: HashMap::new(),
            current: None,
            sink,
            clock,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.section.as_str())
    }

    /// Highest ratio among intersecting sections; ties go to the one listed
    /// first. `None` when nothing is intersecting.
    fn most_visible(&self) -> Option<&String> {
        let mut best: Option<(&String, f64)> = None;
        for section in &self.sections {
            let Some(&ratio) = self.ratios.get(section) else {
                continue;
            };
            if best.is_none_or(|(_, r)| ratio > r) {
                best = Some((section, ratio));
            }
        }
        best.map(|(s, _)| s)
    }

    /// Applies a batch of intersection records. On a change of most-visible
    /// section emits `section_time` (previous), `section_transition`, then
    /// `section_enter` (new), in that order.
    pub fn observe(&mut self, entries: &[SectionEntry]) {
        for entry in entries {
            if !self.sections.contains(&entry.section) {
                continue;
            }
            if entry.is_intersecting && entry.ratio > 0.0 && entry.ratio >= self.min_ratio {
                self.ratios.insert(entry.section.clone(), entry.ratio);
            } else {
                self.ratios.remove(&entry.section);
            }
        }

        let Some(next) = self.most_visible().cloned() else {
            return;
        };
        if self.current() == Some(next.as_str()) {
            return;
        }

        let now = self.clock.now_ms();
        if let Some(prev) = self.current.take() {
            if let Some(since) = prev.since {
                self.sink.emit(&SectionTime {
                    section: prev.section.clone(),
                    ms: (now - since).max(0),
                    reason: None,
                });
            }
            self.sink.emit(&SectionTransition {
                from: prev.section,
                to: next.clone(),
            });
        }

        self.sink.emit(&SectionEnter {
            section: next.clone(),
        });
        self.current = Some(Current {
            section: next,
            since: Some(now),
        });
    }

    /// Page hidden: report dwell so far for the current section and stop
    /// the clock.
    pub fn pause(&mut self, reason: HideReason) {
        let now = self.clock.now_ms();
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if let Some(since) = current.since.take() {
            self.sink.emit(&SectionTime {
                section: current.section.clone(),
                ms: (now - since).max(0),
                reason: Some(reason),
            });
        }
    }

    /// Page visible again: dwell accrues from now.
    pub fn resume(&mut self) {
        let now = self.clock.now_ms();
        if let Some(current) = self.current.as_mut() {
            current.since.get_or_insert(now);
        }
    }
}
