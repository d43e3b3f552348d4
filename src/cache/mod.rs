pub mod controller;
pub mod fetch;
pub mod store;

pub use controller::{CacheController, LifecycleState};
pub use fetch::{Fetch, HttpFetcher};
pub use store::{CacheBackend, FsCache, MemoryCache};

/// Cache bucket name for the current release. Bumped manually; activating a
/// new version sweeps every bucket that does not carry this name.
pub const CACHE_VERSION: &str = "taskforge-v2";

/// Core assets pre-cached at install time, relative to the app origin.
/// Changing this list requires bumping `CACHE_VERSION`.
pub const CORE_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./style.css",
    "./app.js",
    "./manifest.json",
    "./icons/icon-192.svg",
    "./icons/icon-512.svg",
];

/// The page served when a navigation request fails with nothing cached for it.
pub const FALLBACK_DOCUMENT: &str = "./index.html";

/// Cross-origin font hosts that get stale-while-revalidate instead of
/// cache-first.
pub const FONT_ORIGINS: &[&str] = &["https://fonts.googleapis.com", "https://fonts.gstatic.com"];

/// A response held in (or on its way into) a cache bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn ok(&self) -> bool {
        self.status == 200
    }
}

/// How the request reached us; navigation requests get the offline fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Asset,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub mode: RequestMode,
}

impl FetchRequest {
    pub fn asset(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Asset,
        }
    }

    pub fn navigation(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Navigate,
        }
    }

    /// Scheme-host-port origin of the request URL, when it parses.
    pub fn origin(&self) -> Option<String> {
        reqwest::Url::parse(&self.url)
            .ok()
            .map(|u| u.origin().ascii_serialization())
    }
}
