use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::types::Metadata;

/// A typed analytics event with a fixed wire name.
pub trait TrackedEvent: Serialize {
    const EVENT_TYPE: &'static str;

    fn to_metadata(&self) -> Metadata {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                let mut map = Metadata::new();
                map.insert("value".into(), other);
                map
            }
            Err(e) => {
                warn!(event_type = Self::EVENT_TYPE, error = %e, "event did not serialize");
                Metadata::new()
            }
        }
    }
}

/// Anything that accepts tracked events. Observers only see this, so they
/// can be driven against a recorder in tests.
pub trait EventSink: Send + Sync {
    fn record(&self, event_type: &str, metadata: Metadata);
}

pub trait EventSinkExt {
    fn emit<E: TrackedEvent>(&self, event: &E);
}

impl<S: EventSink + ?Sized> EventSinkExt for S {
    fn emit<E: TrackedEvent>(&self, event: &E) {
        self.record(E::EVENT_TYPE, event.to_metadata());
    }
}
