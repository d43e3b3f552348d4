use std::sync::Arc;

use reqwest::Url;

use super::fetch::Fetch;
use super::store::CacheBackend;
use super::{CachedResponse, FetchRequest, RequestMode};
use super::{CACHE_VERSION, CORE_ASSETS, FALLBACK_DOCUMENT, FONT_ORIGINS};

/// Lifecycle of one controller generation. A generation moves forward only;
/// a superseded generation ends up `Redundant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Installed,
    Active,
    Redundant,
}

/// Manages the versioned static-asset cache: pre-caching at install,
/// version-sweep eviction at activate, and the request-interception policies.
///
/// A new version writes into its own bucket and never touches an old one;
/// old buckets become garbage only once the new bucket is fully installed.
pub struct CacheController {
    version: String,
    manifest: Vec<String>,
    base: Url,
    origin: String,
    state: LifecycleState,
    backend: Arc<dyn CacheBackend>,
    fetcher: Arc<dyn Fetch>,
}

impl CacheController {
    /// `base_url` is the app's own origin plus base path, e.g.
    /// `https://tasks.example.app/`. Manifest paths resolve against it.
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        fetcher: Arc<dyn Fetch>,
        base_url: &str,
    ) -> Result<Self, String> {
        Self::with_version(
            backend,
            fetcher,
            base_url,
            CACHE_VERSION,
            CORE_ASSETS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_version(
        backend: Arc<dyn CacheBackend>,
        fetcher: Arc<dyn Fetch>,
        base_url: &str,
        version: &str,
        manifest: Vec<String>,
    ) -> Result<Self, String> {
        let base = Url::parse(base_url).map_err(|e| format!("invalid base url {}: {}", base_url, e))?;
        let origin = base.origin().ascii_serialization();
        Ok(Self {
            version: version.to_string(),
            manifest,
            base,
            origin,
            state: LifecycleState::Installing,
            backend,
            fetcher,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn buckets(&self) -> Result<Vec<String>, String> {
        self.backend.list_buckets().await
    }

    fn resolve(&self, path: &str) -> Result<String, String> {
        self.base
            .join(path)
            .map(|u| u.to_string())
            .map_err(|e| format!("cannot resolve {} against {}: {}", path, self.base, e))
    }

    fn is_same_origin(&self, req: &FetchRequest) -> bool {
        req.origin().as_deref() == Some(self.origin.as_str())
    }

    /// Pre-cache the manifest into the bucket named by the current version.
    /// All-or-nothing: every asset is fetched before anything is written, so
    /// a failed install leaves no partially filled bucket behind. On success
    /// the controller skips straight to being ready for activation.
    pub async fn install(&mut self) -> Result<(), String> {
        match self.state {
            LifecycleState::Installing => {}
            _ => return Err(format!("install from state {:?}", self.state)),
        }
        log::info!("[cache] installing {}", self.version);

        let mut fetched = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let url = self.resolve(path)?;
            let response = self
                .fetcher
                .fetch(&url)
                .await
                .map_err(|e| format!("pre-cache of {} failed: {}", path, e))?;
            if !response.ok() {
                return Err(format!(
                    "pre-cache of {} returned status {}",
                    path, response.status
                ));
            }
            fetched.push((url, response));
        }

        self.backend.create_bucket(&self.version).await?;
        for (url, response) in &fetched {
            self.backend.put(&self.version, url, response).await?;
        }
        self.state = LifecycleState::Installed;
        log::info!("[cache] installed {} ({} assets)", self.version, fetched.len());
        Ok(())
    }

    /// Delete every bucket that is not the current version (the sole
    /// eviction mechanism) and take control immediately.
    pub async fn activate(&mut self) -> Result<(), String> {
        if self.state != LifecycleState::Installed {
            return Err(format!("activate from state {:?}", self.state));
        }
        log::info!("[cache] activating {}", self.version);
        for name in self.backend.list_buckets().await? {
            if name != self.version {
                log::info!("[cache] removing old cache: {}", name);
                self.backend.delete_bucket(&name).await?;
            }
        }
        self.state = LifecycleState::Active;
        Ok(())
    }

    /// Mark this generation superseded by a newer version.
    pub fn retire(&mut self) {
        self.state = LifecycleState::Redundant;
    }

    /// Request interception: font hosts get stale-while-revalidate, everything
    /// else cache-first with background refresh.
    pub async fn handle_fetch(&self, req: &FetchRequest) -> Result<CachedResponse, String> {
        match req.origin() {
            Some(origin) if FONT_ORIGINS.contains(&origin.as_str()) => {
                self.stale_while_revalidate(req).await
            }
            _ => self.cache_first(req).await,
        }
    }

    /// Serve the cached copy immediately when there is one and refresh it
    /// concurrently; a refresh failure over a cached copy is swallowed. With
    /// nothing cached the caller waits on the network, and failure propagates.
    async fn stale_while_revalidate(&self, req: &FetchRequest) -> Result<CachedResponse, String> {
        let cached = self.backend.get(&self.version, &req.url).await?;
        match cached {
            Some(stale) => {
                let backend = Arc::clone(&self.backend);
                let fetcher = Arc::clone(&self.fetcher);
                let version = self.version.clone();
                let url = req.url.clone();
                tokio::spawn(async move {
                    match fetcher.fetch(&url).await {
                        Ok(fresh) => {
                            if let Err(e) = backend.put(&version, &url, &fresh).await {
                                log::debug!("[cache] revalidation store of {} failed: {}", url, e);
                            }
                        }
                        Err(e) => log::debug!("[cache] revalidation of {} failed: {}", url, e),
                    }
                });
                Ok(stale)
            }
            None => {
                let fresh = self.fetcher.fetch(&req.url).await?;
                self.backend.put(&self.version, &req.url, &fresh).await?;
                Ok(fresh)
            }
        }
    }

    /// Serve from cache when possible, refreshing the entry in the background
    /// for next time. On a miss, fetch from network and keep a copy of
    /// successful same-origin responses. A failed navigation request falls
    /// back to the cached main page as a last resort.
    async fn cache_first(&self, req: &FetchRequest) -> Result<CachedResponse, String> {
        if let Some(cached) = self.backend.get(&self.version, &req.url).await? {
            let backend = Arc::clone(&self.backend);
            let fetcher = Arc::clone(&self.fetcher);
            let version = self.version.clone();
            let url = req.url.clone();
            tokio::spawn(async move {
                match fetcher.fetch(&url).await {
                    Ok(fresh) if fresh.ok() => {
                        if let Err(e) = backend.put(&version, &url, &fresh).await {
                            log::debug!("[cache] background refresh store of {} failed: {}", url, e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => log::debug!("[cache] background refresh of {} failed: {}", url, e),
                }
            });
            return Ok(cached);
        }

        match self.fetcher.fetch(&req.url).await {
            Ok(fresh) => {
                if fresh.ok() && self.is_same_origin(req) {
                    self.backend.put(&self.version, &req.url, &fresh).await?;
                }
                Ok(fresh)
            }
            Err(err) => {
                if req.mode == RequestMode::Navigate {
                    let fallback_url = self.resolve(FALLBACK_DOCUMENT)?;
                    if let Some(page) = self.backend.get(&self.version, &fallback_url).await? {
                        log::info!("[cache] offline fallback for {}", req.url);
                        return Ok(page);
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const BASE: &str = "https://tasks.app.test/";

    /// Routes URLs to canned results and records every network call.
    #[derive(Default)]
    struct ScriptedFetcher {
        routes: Mutex<HashMap<String, Result<CachedResponse, String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new() -> Self {
            Self::default()
        }

        fn route_ok(&self, url: &str, status: u16, body: &[u8]) {
            self.routes.lock().unwrap().insert(
                url.to_string(),
                Ok(CachedResponse {
                    url: url.to_string(),
                    status,
                    content_type: None,
                    body: body.to_vec(),
                }),
            );
        }

        fn route_fail(&self, url: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), Err("connection refused".to_string()));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<CachedResponse, String> {
            self.calls.lock().unwrap().push(url.to_string());
            self.routes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(format!("no route for {}", url)))
        }
    }

    fn manifest() -> Vec<String> {
        vec!["./".to_string(), "./index.html".to_string(), "./app.js".to_string()]
    }

    fn route_manifest(fetcher: &ScriptedFetcher) {
        fetcher.route_ok("https://tasks.app.test/", 200, b"root");
        fetcher.route_ok("https://tasks.app.test/index.html", 200, b"<html>");
        fetcher.route_ok("https://tasks.app.test/app.js", 200, b"js");
    }

    fn controller(
        backend: &Arc<MemoryCache>,
        fetcher: &Arc<ScriptedFetcher>,
        version: &str,
    ) -> CacheController {
        CacheController::with_version(
            Arc::clone(backend) as Arc<dyn CacheBackend>,
            Arc::clone(fetcher) as Arc<dyn Fetch>,
            BASE,
            version,
            manifest(),
        )
        .unwrap()
    }

    async fn installed_controller(
        backend: &Arc<MemoryCache>,
        fetcher: &Arc<ScriptedFetcher>,
    ) -> CacheController {
        route_manifest(fetcher);
        let mut ctl = controller(backend, fetcher, "v-test");
        ctl.install().await.unwrap();
        ctl.activate().await.unwrap();
        ctl
    }

    /// Poll until the bucket holds `body` under `url`; background refreshes
    /// land on their own schedule.
    async fn wait_for_entry(backend: &Arc<MemoryCache>, bucket: &str, url: &str, body: &[u8]) {
        for _ in 0..200 {
            if let Some(entry) = backend.get(bucket, url).await.unwrap() {
                if entry.body == body {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cache entry for {} never became {:?}", url, String::from_utf8_lossy(body));
    }

    #[tokio::test]
    async fn install_precaches_the_whole_manifest() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        route_manifest(&fetcher);

        let mut ctl = controller(&backend, &fetcher, "v1");
        ctl.install().await.unwrap();

        assert_eq!(ctl.state(), LifecycleState::Installed);
        for url in [
            "https://tasks.app.test/",
            "https://tasks.app.test/index.html",
            "https://tasks.app.test/app.js",
        ] {
            assert!(backend.get("v1", url).await.unwrap().is_some(), "{} missing", url);
        }
    }

    #[tokio::test]
    async fn failed_install_is_all_or_nothing() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.route_ok("https://tasks.app.test/", 200, b"root");
        fetcher.route_ok("https://tasks.app.test/index.html", 200, b"<html>");
        fetcher.route_fail("https://tasks.app.test/app.js");

        let mut ctl = controller(&backend, &fetcher, "v1");
        assert!(ctl.install().await.is_err());
        assert_eq!(ctl.state(), LifecycleState::Installing);
        // Nothing was written: no bucket, no partial assets
        assert!(backend.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_success_manifest_response_fails_install() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.route_ok("https://tasks.app.test/", 200, b"root");
        fetcher.route_ok("https://tasks.app.test/index.html", 404, b"nope");
        fetcher.route_ok("https://tasks.app.test/app.js", 200, b"js");

        let mut ctl = controller(&backend, &fetcher, "v1");
        assert!(ctl.install().await.is_err());
    }

    #[tokio::test]
    async fn activate_deletes_exactly_the_other_versions() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        backend.create_bucket("v1").await.unwrap();
        backend.create_bucket("v2").await.unwrap();
        route_manifest(&fetcher);

        let mut ctl = controller(&backend, &fetcher, "v3");
        ctl.install().await.unwrap();
        ctl.activate().await.unwrap();

        assert_eq!(backend.list_buckets().await.unwrap(), ["v3"]);
        assert_eq!(ctl.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn activate_requires_a_completed_install() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let mut ctl = controller(&backend, &fetcher, "v1");
        assert!(ctl.activate().await.is_err());
    }

    #[tokio::test]
    async fn cache_first_serves_cached_and_refreshes_in_background() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let url = "https://tasks.app.test/app.js";
        fetcher.route_ok(url, 200, b"js-v2");

        let served = ctl.handle_fetch(&FetchRequest::asset(url)).await.unwrap();
        // The stale copy comes back immediately...
        assert_eq!(served.body, b"js");
        // ...and the background refresh overwrites it for next time
        wait_for_entry(&backend, "v-test", url, b"js-v2").await;
        assert!(fetcher.calls().iter().any(|c| c == url));
    }

    #[tokio::test]
    async fn background_refresh_failure_never_surfaces() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let url = "https://tasks.app.test/app.js";
        fetcher.route_fail(url);

        let served = ctl.handle_fetch(&FetchRequest::asset(url)).await.unwrap();
        assert_eq!(served.body, b"js");
        tokio::time::sleep(Duration::from_millis(30)).await;
        let kept = backend.get("v-test", url).await.unwrap().unwrap();
        assert_eq!(kept.body, b"js");
    }

    #[tokio::test]
    async fn miss_caches_successful_same_origin_responses() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let url = "https://tasks.app.test/extra.css";
        fetcher.route_ok(url, 200, b"extra");

        let served = ctl.handle_fetch(&FetchRequest::asset(url)).await.unwrap();
        assert_eq!(served.body, b"extra");
        assert!(backend.get("v-test", url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn miss_does_not_cache_cross_origin_or_error_responses() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let other = "https://cdn.elsewhere.test/lib.js";
        fetcher.route_ok(other, 200, b"lib");
        let served = ctl.handle_fetch(&FetchRequest::asset(other)).await.unwrap();
        assert_eq!(served.body, b"lib");
        assert!(backend.get("v-test", other).await.unwrap().is_none());

        let missing = "https://tasks.app.test/missing.png";
        fetcher.route_ok(missing, 404, b"not found");
        let served = ctl.handle_fetch(&FetchRequest::asset(missing)).await.unwrap();
        assert_eq!(served.status, 404);
        assert!(backend.get("v-test", missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_navigation_falls_back_to_cached_main_page() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let url = "https://tasks.app.test/deep/link";
        fetcher.route_fail(url);

        let served = ctl.handle_fetch(&FetchRequest::navigation(url)).await.unwrap();
        assert_eq!(served.body, b"<html>");

        // The same failure on a plain asset propagates
        let err = ctl.handle_fetch(&FetchRequest::asset(url)).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn fonts_get_stale_while_revalidate() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let font = "https://fonts.gstatic.com/s/inter/v12/a.woff2";
        fetcher.route_ok(font, 200, b"woff-v1");

        // First request: nothing cached, caller waits on the network
        let served = ctl.handle_fetch(&FetchRequest::asset(font)).await.unwrap();
        assert_eq!(served.body, b"woff-v1");
        assert!(backend.get("v-test", font).await.unwrap().is_some());

        // Second request: stale copy immediately, fresh one written behind it
        fetcher.route_ok(font, 200, b"woff-v2");
        let served = ctl.handle_fetch(&FetchRequest::asset(font)).await.unwrap();
        assert_eq!(served.body, b"woff-v1");
        wait_for_entry(&backend, "v-test", font, b"woff-v2").await;
    }

    #[tokio::test]
    async fn font_network_failure_serves_stale_but_propagates_on_cold_cache() {
        let backend = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctl = installed_controller(&backend, &fetcher).await;

        let font = "https://fonts.gstatic.com/s/inter/v12/b.woff2";
        fetcher.route_fail(font);

        // Cold cache: the failure reaches the caller
        assert!(ctl.handle_fetch(&FetchRequest::asset(font)).await.is_err());

        // Warm cache: the failure is swallowed and the stale copy served
        fetcher.route_ok(font, 200, b"woff");
        ctl.handle_fetch(&FetchRequest::asset(font)).await.unwrap();
        fetcher.route_fail(font);
        let served = ctl.handle_fetch(&FetchRequest::asset(font)).await.unwrap();
        assert_eq!(served.body, b"woff");
    }
}
