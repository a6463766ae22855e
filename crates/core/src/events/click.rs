use serde::Serialize;

use crate::events::TrackedEvent;

#[derive(Debug, Clone, Serialize)]
pub struct Click {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Click {
    pub fn new(target: impl Into<String>, label: Option<String>) -> Self {
        Self {
            target: target.into(),
            label,
        }
    }
}

impl TrackedEvent for Click {
    const EVENT_TYPE: &'static str = "click";
}
