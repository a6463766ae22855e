use serde::{Deserialize, Serialize};

use crate::events::TrackedEvent;

/// Why the page is being put away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HideReason {
    Pagehide,
    Visibility,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrollDepth {
    /// Highest percentage reached during the page lifetime.
    pub max_depth: u8,
    pub reason: HideReason,
}

impl TrackedEvent for ScrollDepth {
    const EVENT_TYPE: &'static str = "scroll_depth";
}
