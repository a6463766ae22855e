use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form key/value payload attached to an event.
pub type Metadata = Map<String, Value>;

/// One tracked interaction, as buffered before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub metadata: Metadata,
    pub timestamp: i64,
}

impl QueuedEvent {
    pub fn new(event_type: impl Into<String>, metadata: Metadata, timestamp: i64) -> Self {
        Self {
            event_type: event_type.into(),
            metadata,
            timestamp,
        }
    }
}

/// An enriched event as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub metadata: Metadata,
}

/// Request body of the ingestion endpoint: `{ "events": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub events: Vec<OutgoingEvent>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstVisit {
    pub first_seen_at: i64,
    pub landing_page: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
            DeviceType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Ios,
    Android,
    Unknown,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Ios => "ios",
            OsFamily::Android => "android",
            OsFamily::Unknown => "unknown",
        }
    }
}
