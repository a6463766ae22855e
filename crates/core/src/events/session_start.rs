use serde::Serialize;

use crate::events::TrackedEvent;

#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub is_new_session: bool,
    pub landing_page: String,
}

impl TrackedEvent for SessionStart {
    const EVENT_TYPE: &'static str = "session_start";
}
