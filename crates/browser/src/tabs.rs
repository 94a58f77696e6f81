use std::fmt;
use std::future::Future;

use thiserror::Error;
use tokio::sync::broadcast;

/// Opaque identifier for a tab created through [`TabHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u64);

impl TabId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-tab change notification delivered on the host's update channel.
///
/// `favicon_url` is present only on updates that carry a discovered favicon
/// for the tab; navigation progress updates leave it empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabUpdate {
    pub tab: TabId,
    pub favicon_url: Option<String>,
}

/// Errors surfaced by the tab lifecycle service.
#[derive(Debug, Error)]
pub enum TabError {
    #[error("unknown tab id: {0}")]
    UnknownTab(TabId),
    #[error("tab creation rejected: {0}")]
    CreateRejected(String),
}

/// Tab lifecycle service exposed by the host browser.
///
/// Creation opens an inactive background tab; updates fan out to every
/// subscriber over a broadcast channel; removal destroys the tab by
/// identifier.
pub trait TabHost: Send + Sync {
    fn create_background_tab(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<TabId, TabError>> + Send;

    fn updates(&self) -> broadcast::Receiver<TabUpdate>;

    fn remove_tab(&self, tab: TabId) -> impl Future<Output = Result<(), TabError>> + Send;
}
