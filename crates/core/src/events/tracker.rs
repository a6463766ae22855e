use std::{
    sync::{
        Arc, Mutex, MutexGuard, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    clock::Clock,
    enrich::Enricher,
    events::{Click, EventSink, EventsDropped, TrackedEvent},
    queues::ShedHalfQueue,
    transport::{Delivery, Transport},
    types::{Batch, Metadata, QueuedEvent},
};

/// Counters kept alongside the tracker; read with [`Tracker::stats`].
#[derive(Debug, Default)]
pub struct TrackerStats {
    pub enqueued_total: AtomicU64,
    pub dropped_total: AtomicU64,
    pub batches_total: AtomicU64,
    pub timers_armed_total: AtomicU64,
    pub transport_failures_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub dropped: u64,
    pub batches: u64,
    pub timers_armed: u64,
    pub transport_failures: u64,
}

impl TrackerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued_total.load(Ordering::Relaxed),
            dropped: self.dropped_total.load(Ordering::Relaxed),
            batches: self.batches_total.load(Ordering::Relaxed),
            timers_armed: self.timers_armed_total.load(Ordering::Relaxed),
            transport_failures: self.transport_failures_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct TimerSlot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Buffers events and ships them in batches.
///
/// Cheap to clone; every clone feeds the same queue. Needs a tokio runtime
/// for the flush timer and for background delivery.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

pub(crate) struct TrackerInner {
    pub(crate) queue: ShedHalfQueue<QueuedEvent>,
    pub(crate) batch_size: usize,
    pub(crate) flush_interval: Duration,
    pub(crate) enricher: Enricher,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) stats: Arc<TrackerStats>,
    timer: Mutex<TimerSlot>,
}

impl TrackerInner {
    pub(crate) fn new(
        queue_capacity: usize,
        batch_size: usize,
        flush_interval: Duration,
        enricher: Enricher,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue: ShedHalfQueue::new(queue_capacity),
            batch_size,
            flush_interval,
            enricher,
            transport,
            clock,
            stats: Arc::new(TrackerStats::default()),
            timer: Mutex::new(TimerSlot::default()),
        }
    }
}

impl Tracker {
    pub(crate) fn from_inner(inner: TrackerInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Buffers one event. Never blocks and never fails: a full queue sheds
    /// its oldest half, a full batch is flushed on the spot, anything else
    /// waits for the (single) flush timer.
    pub fn track(&self, event_type: impl Into<String>, metadata: Metadata) {
        let event = QueuedEvent::new(event_type, metadata, self.inner.clock.now_ms());
        let (len, shed) = self.inner.queue.push_shedding(event);

        let stats = &self.inner.stats;
        stats.enqueued_total.fetch_add(1, Ordering::Relaxed);
        if shed > 0 {
            stats.dropped_total.fetch_add(shed as u64, Ordering::Relaxed);
            warn!(dropped = shed, "analytics queue full, shed oldest events");
        }

        if len >= self.inner.batch_size {
            self.flush();
        } else {
            self.arm_timer();
        }
    }

    pub fn track_event<E: TrackedEvent>(&self, event: &E) {
        self.track(E::EVENT_TYPE, event.to_metadata());
    }

    pub fn track_click(&self, target: impl Into<String>, label: Option<String>) {
        self.track_event(&Click::new(target, label));
    }

    /// Drains the queue and hands the batch to the transport in the
    /// background. The queue is empty when this returns; events tracked
    /// from here on go to a later batch.
    pub fn flush(&self) -> Option<JoinHandle<Delivery>> {
        let batch = self.take_batch()?;

        match Handle::try_current() {
            Ok(handle) => {
                let transport = Arc::clone(&self.inner.transport);
                let stats = Arc::clone(&self.inner.stats);
                Some(handle.spawn(deliver(transport, stats, batch)))
            }
            Err(_) => {
                warn!(batch = batch.len(), "no async runtime, batch discarded");
                None
            }
        }
    }

    /// Like [`flush`](Self::flush) but waits for the transport to return.
    /// Used when the page is going away.
    pub async fn flush_and_wait(&self) -> Option<Delivery> {
        let batch = self.take_batch()?;
        Some(deliver(Arc::clone(&self.inner.transport), Arc::clone(&self.inner.stats), batch).await)
    }

    /// Cancels the timer, delivers whatever is buffered, then closes the
    /// transport so detached requests finish before the caller tears down
    /// the runtime. Later batches take the transport's fallback, if any.
    pub async fn shutdown(&self) -> Option<Delivery> {
        self.disarm_timer();
        let outcome = self.flush_and_wait().await;
        self.inner.transport.close().await;
        outcome
    }

    pub fn queued_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// 0 or 1; there is never more than one pending flush timer.
    pub fn pending_timers(&self) -> usize {
        usize::from(self.timer_slot().pending.is_some())
    }

    /// Includes failures the transport only learned of after handing a
    /// batch off.
    pub fn stats(&self) -> StatsSnapshot {
        let mut snapshot = self.inner.stats.snapshot();
        snapshot.transport_failures += self.inner.transport.detached_failures();
        snapshot
    }

    pub fn enricher(&self) -> &Enricher {
        &self.inner.enricher
    }

    /// Synchronous half of a flush: drain, then enrich. Nothing here awaits,
    /// so a concurrent `track` lands either wholly before or after the drain.
    fn take_batch(&self) -> Option<Batch> {
        self.disarm_timer();

        let drained = self.inner.queue.drain();
        let mut events = drained.items;
        if drained.dropped > 0 {
            let marker = EventsDropped {
                count: drained.dropped,
            };
            events.push(QueuedEvent::new(
                EventsDropped::EVENT_TYPE,
                marker.to_metadata(),
                self.inner.clock.now_ms(),
            ));
        }
        if events.is_empty() {
            return None;
        }

        let batch = self.inner.enricher.enrich(events);
        self.inner.stats.batches_total.fetch_add(1, Ordering::Relaxed);
        debug!(batch = batch.len(), "flushing analytics batch");
        Some(batch)
    }

    fn timer_slot(&self) -> MutexGuard<'_, TimerSlot> {
        self.inner.timer.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn arm_timer(&self) {
        let mut slot = self.timer_slot();
        if slot.pending.is_some() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            debug!("no async runtime, flush timer not armed");
            return;
        };

        slot.generation += 1;
        let generation = slot.generation;
        let delay = self.inner.flush_interval;
        let weak = Arc::downgrade(&self.inner);

        slot.pending = Some(handle.spawn(fire_timer(weak, generation, delay)));
        self.inner
            .stats
            .timers_armed_total
            .fetch_add(1, Ordering::Relaxed);
    }

    fn disarm_timer(&self) {
        if let Some(pending) = self.timer_slot().pending.take() {
            pending.abort();
        }
    }
}

async fn fire_timer(weak: Weak<TrackerInner>, generation: u64, delay: Duration) {
    tokio::time::sleep(delay).await;

    let Some(inner) = weak.upgrade() else {
        return;
    };
    let tracker = Tracker { inner };
    {
        let mut slot = tracker.timer_slot();
        // A flush already consumed this timer, or a newer one replaced it.
        if slot.generation != generation || slot.pending.is_none() {
            return;
        }
        slot.pending = None;
    }
    tracker.flush();
}

async fn deliver(transport: Arc<dyn Transport>, stats: Arc<TrackerStats>, batch: Batch) -> Delivery {
    let size = batch.len();
    let outcome = transport.send(Arc::new(batch)).await;
    if outcome.is_failure() {
        stats
            .transport_failures_total
            .fetch_add(1, Ordering::Relaxed);
        debug!(transport = transport.name(), batch = size, ?outcome, "batch not delivered, discarding");
    } else {
        debug!(transport = transport.name(), batch = size, ?outcome, "batch handed off");
    }
    outcome
}

impl EventSink for Tracker {
    fn record(&self, event_type: &str, metadata: Metadata) {
        self.track(event_type, metadata);
    }
}
