use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::Url;

use crate::types::Viewport;

/// Read access to the page the tracker is embedded in.
pub trait Environment: Send + Sync + 'static {
    /// Current path only, e.g. `/services`.
    fn page_path(&self) -> String;
    /// Path + query + fragment, e.g. `/?utm_source=ig#portfolio`.
    fn location(&self) -> String;
    /// Full current URL, used for UTM parsing.
    fn url(&self) -> Option<Url>;
    fn referrer(&self) -> Option<String>;
    fn user_agent(&self) -> Option<String>;
    fn viewport(&self) -> Option<Viewport>;
    fn max_touch_points(&self) -> u32;
}

#[derive(Debug, Clone, Default)]
struct PageState {
    url: Option<Url>,
    referrer: Option<String>,
    user_agent: Option<String>,
    viewport: Option<Viewport>,
    max_touch_points: u32,
}

/// Environment the host keeps up to date as the page navigates and resizes.
#[derive(Debug, Default)]
pub struct PageEnvironment {
    state: RwLock<PageState>,
}

impl PageEnvironment {
    pub fn new(url: Url) -> Self {
        Self {
            state: RwLock::new(PageState {
                url: Some(url),
                ..PageState::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PageState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PageState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_referrer(self, referrer: impl Into<String>) -> Self {
        self.set_referrer(Some(referrer.into()));
        self
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        self.write().user_agent = Some(user_agent.into());
        self
    }

    pub fn with_viewport(self, width: u32, height: u32) -> Self {
        self.resize(width, height);
        self
    }

    pub fn with_touch_points(self, points: u32) -> Self {
        self.write().max_touch_points = points;
        self
    }

    pub fn navigate(&self, url: Url) {
        self.write().url = Some(url);
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.write().viewport = Some(Viewport { width, height });
    }

    pub fn set_referrer(&self, referrer: Option<String>) {
        self.write().referrer = referrer.filter(|r| !r.is_empty());
    }
}

impl Environment for PageEnvironment {
    fn page_path(&self) -> String {
        self.read()
            .url
            .as_ref()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "/".to_string())
    }

    fn location(&self) -> String {
        let state = self.read();
        let Some(url) = state.url.as_ref() else {
            return "/".to_string();
        };

        let mut location = url.path().to_string();
        if let Some(query) = url.query() {
            location.push('?');
            location.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            location.push('#');
            location.push_str(fragment);
        }
        location
    }

    fn url(&self) -> Option<Url> {
        self.read().url.clone()
    }

    fn referrer(&self) -> Option<String> {
        self.read().referrer.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.read().user_agent.clone()
    }

    fn viewport(&self) -> Option<Viewport> {
        self.read().viewport
    }

    fn max_touch_points(&self) -> u32 {
        self.read().max_touch_points
    }
}
