use std::{collections::BTreeMap, time::Duration};

use glint_core::{Batch, StatsSnapshot};

pub fn format_duration(d: Duration) -> String {
    if d.as_secs() < 60 {
        let ms = d.as_millis();
        format!("{}.{}s", ms / 1000, ms % 1000 / 100)
    } else {
        let secs = d.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// `click×3, scroll_depth×1` in first-seen order.
pub fn format_batch_summary(batch: &Batch) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &batch.events {
        let kind = event.event_type.as_str();
        let count = counts.entry(kind).or_insert(0);
        if *count == 0 {
            order.push(kind);
        }
        *count += 1;
    }

    order
        .iter()
        .map(|kind| format!("{}×{}", kind, counts[kind]))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_stats(stats: &StatsSnapshot) -> String {
    format!(
        "{} events tracked, {} batches, {} shed, {} failed deliveries",
        stats.enqueued, stats.batches, stats.dropped, stats.transport_failures
    )
}
