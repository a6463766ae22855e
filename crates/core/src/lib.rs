//! Glint analytics core
//!
//! Buffers UI events from the detailing site, enriches them with session and
//! page context at send time, and delivers them in batches to the ingestion
//! endpoint on a best-effort, at-most-once basis.

pub mod clock;
pub mod config;
pub mod enrich;
pub mod error;
pub mod events;
pub mod observers;
pub mod page;
pub mod queues;
pub mod session;
pub mod transport;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use error::{AnalyticsError, Result};
pub use events::{EventSink, EventSinkExt, StatsSnapshot, TrackedEvent, Tracker, TrackerBuilder};
pub use page::{PageSession, PageSignal};
pub use session::{FileStorage, MemoryStorage, SessionStore, Storage};
pub use transport::{Delivery, Transport, probe_transport};
pub use types::{Batch, FirstVisit, Metadata, OutgoingEvent, QueuedEvent};
