use serde::Serialize;

use crate::events::{HideReason, TrackedEvent};

#[derive(Debug, Clone, Serialize)]
pub struct SectionEnter {
    pub section: String,
}

impl TrackedEvent for SectionEnter {
    const EVENT_TYPE: &'static str = "section_enter";
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionTime {
    pub section: String,
    pub ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<HideReason>,
}

impl TrackedEvent for SectionTime {
    const EVENT_TYPE: &'static str = "section_time";
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionTransition {
    pub from: String,
    pub to: String,
}

impl TrackedEvent for SectionTransition {
    const EVENT_TYPE: &'static str = "section_transition";
}
