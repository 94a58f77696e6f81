use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

use favlens_core::types::IconRequest;

use crate::icon_cache::IconCache;
use crate::image::IconImage;
use crate::tabs::{TabError, TabHost, TabId, TabUpdate};

const UPDATE_BUFFER: usize = 128;

/// In-process browser host implementing the favicon cache and tab
/// lifecycle contracts.
///
/// Favicons live in an in-memory store keyed by domain; a cache miss hands
/// out the host's built-in placeholder bitmap with no "not found" signal,
/// exactly like a real favicon cache. Opening a background tab simulates a
/// navigation that may discover a favicon, publish it on the update channel
/// and install it into the store.
#[derive(Clone)]
pub struct SimBrowser {
    inner: Arc<SimInner>,
}

struct SimInner {
    icons: Mutex<HashMap<String, RgbaImage>>,
    pages: Mutex<HashMap<String, DiscoverablePage>>,
    tabs: Mutex<HashSet<TabId>>,
    next_tab: AtomicU64,
    tabs_removed: AtomicU64,
    updates: broadcast::Sender<TabUpdate>,
    navigation_delay: Duration,
    load_delay: Option<Duration>,
}

#[derive(Clone)]
struct DiscoverablePage {
    icon_url: String,
    pixels: RgbaImage,
}

impl SimBrowser {
    pub fn new() -> Self {
        Self::with_delays(Duration::from_millis(50), None)
    }

    /// Creates a host with explicit timing: `navigation_delay` before a
    /// background tab reports anything, and an optional `load_delay` that
    /// makes every fetched image start in the still-loading state.
    pub fn with_delays(navigation_delay: Duration, load_delay: Option<Duration>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            inner: Arc::new(SimInner {
                icons: Mutex::new(HashMap::new()),
                pages: Mutex::new(HashMap::new()),
                tabs: Mutex::new(HashSet::new()),
                next_tab: AtomicU64::new(0),
                tabs_removed: AtomicU64::new(0),
                updates,
                navigation_delay,
                load_delay,
            }),
        }
    }

    /// Puts a favicon for `domain` into the cache.
    pub fn install_icon(&self, domain: impl Into<String>, pixels: RgbaImage) {
        self.inner
            .icons
            .lock()
            .expect("icon store poisoned")
            .insert(domain.into(), pixels);
    }

    /// Registers a page whose navigation discovers a favicon: opening a
    /// background tab for `domain` will announce `icon_url` and install the
    /// icon into the cache.
    pub fn add_discoverable_page(
        &self,
        domain: impl Into<String>,
        icon_url: impl Into<String>,
        pixels: RgbaImage,
    ) {
        self.inner.pages.lock().expect("page store poisoned").insert(
            domain.into(),
            DiscoverablePage {
                icon_url: icon_url.into(),
                pixels,
            },
        );
    }

    pub fn has_cached_icon(&self, domain: &str) -> bool {
        self.inner
            .icons
            .lock()
            .expect("icon store poisoned")
            .contains_key(domain)
    }

    pub fn open_tab_count(&self) -> usize {
        self.inner.tabs.lock().expect("tab registry poisoned").len()
    }

    pub fn removed_tab_count(&self) -> u64 {
        self.inner.tabs_removed.load(Ordering::Relaxed)
    }

    /// Host seeded with the icons and discoverable pages matching
    /// [`crate::bookmarks::SampleBookmarks`]: two domains already cached,
    /// two missing but recoverable, one missing with nothing to discover.
    pub fn sample() -> Self {
        let sim = Self::new();
        sim.install_icon("docs.rs", solid_icon([247, 76, 0]));
        sim.install_icon("crates.io", solid_icon([62, 154, 62]));
        sim.add_discoverable_page(
            "github.com",
            "https://github.com/favicon.ico",
            solid_icon([36, 41, 46]),
        );
        sim.add_discoverable_page(
            "blog.rust-lang.org",
            "https://blog.rust-lang.org/favicon-32.png",
            solid_icon([183, 65, 14]),
        );
        sim
    }
}

impl Default for SimBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl IconCache for SimBrowser {
    fn fetch_icon(&self, request: &IconRequest) -> IconImage {
        let pixels = self
            .inner
            .icons
            .lock()
            .expect("icon store poisoned")
            .get(request.domain())
            .cloned()
            .unwrap_or_else(|| placeholder_bitmap(request.size_px()));

        match self.inner.load_delay {
            Some(delay) => {
                let (image, load) = IconImage::pending(request.url());
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    load.complete(pixels);
                });
                image
            }
            None => IconImage::completed(request.url(), pixels),
        }
    }
}

impl TabHost for SimBrowser {
    async fn create_background_tab(&self, url: &str) -> Result<TabId, TabError> {
        let parsed =
            Url::parse(url).map_err(|err| TabError::CreateRejected(format!("{url}: {err}")))?;
        let domain = parsed.host_str().map(str::to_string);

        let id = TabId::new(self.inner.next_tab.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner
            .tabs
            .lock()
            .expect("tab registry poisoned")
            .insert(id);
        debug!(tab = %id, url, "background tab created");

        let page = domain.as_ref().and_then(|d| {
            self.inner
                .pages
                .lock()
                .expect("page store poisoned")
                .get(d)
                .cloned()
        });

        let sim = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(sim.inner.navigation_delay).await;
            let favicon_url = match (&domain, page) {
                (Some(domain), Some(page)) => {
                    sim.install_icon(domain.clone(), page.pixels);
                    Some(page.icon_url)
                }
                _ => None,
            };
            let _ = sim.inner.updates.send(TabUpdate {
                tab: id,
                favicon_url,
            });
        });

        Ok(id)
    }

    fn updates(&self) -> broadcast::Receiver<TabUpdate> {
        self.inner.updates.subscribe()
    }

    async fn remove_tab(&self, tab: TabId) -> Result<(), TabError> {
        let removed = self
            .inner
            .tabs
            .lock()
            .expect("tab registry poisoned")
            .remove(&tab);
        if removed {
            self.inner.tabs_removed.fetch_add(1, Ordering::Relaxed);
            debug!(tab = %tab, "background tab removed");
            Ok(())
        } else {
            Err(TabError::UnknownTab(tab))
        }
    }
}

/// The host's built-in "no favicon found" bitmap: a fixed gray checker
/// pattern, deterministic for a given pixel size.
pub fn placeholder_bitmap(size_px: u32) -> RgbaImage {
    RgbaImage::from_fn(size_px, size_px, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([200, 200, 200, 255])
        } else {
            Rgba([160, 160, 160, 255])
        }
    })
}

/// Solid 16x16 icon used for seeded sample data.
pub fn solid_icon(rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(16, 16, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_miss_yields_the_placeholder_bitmap() {
        let sim = SimBrowser::new();
        let image = sim.fetch_icon(&IconRequest::new("nowhere.example", 16));
        assert!(image.is_complete());
        assert_eq!(image.pixels().await, placeholder_bitmap(16));
    }

    #[tokio::test]
    async fn cached_icon_is_returned_as_is() {
        let sim = SimBrowser::new();
        sim.install_icon("docs.rs", solid_icon([1, 2, 3]));
        let image = sim.fetch_icon(&IconRequest::new("docs.rs", 16));
        assert_eq!(image.pixels().await, solid_icon([1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_loads_start_pending_and_complete() {
        let sim = SimBrowser::with_delays(
            Duration::from_millis(10),
            Some(Duration::from_millis(20)),
        );
        let image = sim.fetch_icon(&IconRequest::new("nowhere.example", 16));
        assert!(!image.is_complete());
        assert_eq!(image.pixels().await, placeholder_bitmap(16));
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_discovers_and_installs_favicons() {
        let sim = SimBrowser::new();
        sim.add_discoverable_page(
            "github.com",
            "https://github.com/favicon.ico",
            solid_icon([4, 5, 6]),
        );

        let mut updates = sim.updates();
        let tab = sim
            .create_background_tab("https://github.com/")
            .await
            .expect("tab opens");

        let update = updates.recv().await.expect("update arrives");
        assert_eq!(update.tab, tab);
        assert_eq!(
            update.favicon_url.as_deref(),
            Some("https://github.com/favicon.ico")
        );
        assert!(sim.has_cached_icon("github.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_pages_report_no_favicon() {
        let sim = SimBrowser::new();
        let mut updates = sim.updates();
        let tab = sim
            .create_background_tab("https://nowhere.example/")
            .await
            .expect("tab opens");

        let update = updates.recv().await.expect("update arrives");
        assert_eq!(update.tab, tab);
        assert_eq!(update.favicon_url, None);
    }

    #[tokio::test]
    async fn removing_an_unknown_tab_errors() {
        let sim = SimBrowser::new();
        let tab = sim
            .create_background_tab("https://a.example/")
            .await
            .expect("tab opens");
        sim.remove_tab(tab).await.expect("first removal succeeds");
        assert!(matches!(
            sim.remove_tab(tab).await,
            Err(TabError::UnknownTab(_))
        ));
        assert_eq!(sim.removed_tab_count(), 1);
    }

    #[tokio::test]
    async fn rejects_unparseable_tab_urls() {
        let sim = SimBrowser::new();
        assert!(matches!(
            sim.create_background_tab("not a url").await,
            Err(TabError::CreateRejected(_))
        ));
        assert_eq!(sim.open_tab_count(), 0);
    }
}
