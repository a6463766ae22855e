use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::{
    clock::Clock,
    config::TrackerConfig,
    enrich::{Environment, PageEnvironment},
    events::{EventSink, HideReason, SessionStart, Tracker},
    observers::{ScrollDepthTracker, SectionEntry, SectionTracker},
    transport::Delivery,
    types::Metadata,
};

/// Everything the host page reports to the analytics layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSignal {
    Click {
        target: String,
        #[serde(default)]
        label: Option<String>,
    },
    Scroll {
        scroll_top: f64,
        scroll_height: f64,
        viewport_height: f64,
    },
    Intersections {
        entries: Vec<SectionEntry>,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Navigate {
        url: String,
    },
    VisibilityChange {
        hidden: bool,
    },
    PageHide,
    Custom {
        event_type: String,
        #[serde(default)]
        metadata: Metadata,
    },
}

/// One page lifetime: the tracker plus the passive observers feeding it.
pub struct PageSession {
    tracker: Tracker,
    env: Arc<PageEnvironment>,
    scroll: ScrollDepthTracker,
    sections: SectionTracker,
}

impl PageSession {
    /// Wires the observers to `tracker` and records `session_start`.
    pub fn start(
        tracker: Tracker,
        env: Arc<PageEnvironment>,
        clock: Arc<dyn Clock>,
        cfg: &TrackerConfig,
    ) -> Self {
        let sink: Arc<dyn EventSink> = Arc::new(tracker.clone());
        let session = tracker.enricher().sessions().get_or_create_session_id();
        let first_visit = tracker
            .enricher()
            .sessions()
            .first_visit(&env.location());

        tracker.track_event(&SessionStart {
            is_new_session: session.is_new,
            landing_page: first_visit.landing_page,
        });
        debug!(is_new = session.is_new, "page session started");

        Self {
            scroll: ScrollDepthTracker::new(Arc::clone(&sink)),
            sections: SectionTracker::new(
                cfg.sections.clone(),
                &cfg.section_thresholds,
                sink,
                clock,
            ),
            tracker,
            env,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn scroll(&self) -> &ScrollDepthTracker {
        &self.scroll
    }

    pub fn sections(&self) -> &SectionTracker {
        &self.sections
    }

    /// Routes one signal. Returns the transport outcome when the signal
    /// forced a flush (page or tab going away).
    pub async fn handle(&mut self, signal: PageSignal) -> Option<Delivery> {
        match signal {
            PageSignal::Click { target, label } => self.tracker.track_click(target, label),
            PageSignal::Scroll {
                scroll_top,
                scroll_height,
                viewport_height,
            } => {
                self.scroll
                    .sample(scroll_top, scroll_height, viewport_height);
            }
            PageSignal::Intersections { entries } => self.sections.observe(&entries),
            PageSignal::Resize { width, height } => self.env.resize(width, height),
            PageSignal::Navigate { url } => match Url::parse(&url) {
                Ok(url) => self.env.navigate(url),
                Err(e) => debug!(%url, error = %e, "ignoring navigation to unparsable url"),
            },
            PageSignal::VisibilityChange { hidden: true } => {
                return self.hide(HideReason::Visibility).await;
            }
            PageSignal::VisibilityChange { hidden: false } => self.sections.resume(),
            PageSignal::PageHide => return self.hide(HideReason::Pagehide).await,
            PageSignal::Custom {
                event_type,
                metadata,
            } => self.tracker.track(event_type, metadata),
        }
        None
    }

    /// Reports scroll depth and section dwell, then flushes without waiting
    /// for the timer.
    async fn hide(&mut self, reason: HideReason) -> Option<Delivery> {
        self.scroll.report(reason);
        self.sections.pause(reason);
        self.tracker.flush_and_wait().await
    }

    /// Path the environment currently points at.
    pub fn page_path(&self) -> String {
        self.env.page_path()
    }
}
