use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use console::style;
use glint_core::{Batch, Delivery, Transport};

use crate::format::format_batch_summary;

/// Prints batches instead of sending them.
#[derive(Default)]
pub struct PrintTransport {
    pub show_json: bool,
    sent: AtomicUsize,
}

impl PrintTransport {
    pub fn new(show_json: bool) -> Self {
        Self {
            show_json,
            sent: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transport for PrintTransport {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn send(&self, batch: Arc<Batch>) -> Delivery {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        println!(
            "{} batch #{} ({} events): {}",
            style("→").cyan().bold(),
            n,
            batch.len(),
            style(format_batch_summary(&batch)).dim()
        );
        if self.show_json {
            match serde_json::to_string_pretty(batch.as_ref()) {
                Ok(json) => println!("{}", json),
                Err(e) => return Delivery::Failed(e.to_string()),
            }
        }
        Delivery::Queued
    }
}
