use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use thiserror::Error;

use favlens_browser::bookmarks::BookmarkSource;
use favlens_browser::sim::SimBrowser;
use favlens_core::types::{AuditPatch, AuditPatchKind};
use favlens_util::AuditSettings;

use crate::hub::AuditHub;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    hub: AuditHub,
    browser: SimBrowser,
    bookmarks: Arc<dyn BookmarkSource>,
    audit: AuditSettings,
    run_active: Arc<AtomicBool>,
    seq: Arc<AtomicU64>,
    recovered: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        hub: AuditHub,
        browser: SimBrowser,
        bookmarks: Arc<dyn BookmarkSource>,
        audit: AuditSettings,
    ) -> Self {
        Self {
            metrics,
            hub,
            browser,
            bookmarks,
            audit,
            run_active: Arc::new(AtomicBool::new(false)),
            seq: Arc::new(AtomicU64::new(0)),
            recovered: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn hub(&self) -> &AuditHub {
        &self.hub
    }

    pub fn browser(&self) -> &SimBrowser {
        &self.browser
    }

    pub fn bookmarks(&self) -> &dyn BookmarkSource {
        self.bookmarks.as_ref()
    }

    pub fn audit(&self) -> &AuditSettings {
        &self.audit
    }

    /// Claims the single audit slot. At most one audit pass runs at a time;
    /// the slot frees itself when the returned guard drops.
    pub fn begin_run(&self) -> Result<RunGuard, RunBusy> {
        if self
            .run_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Ok(RunGuard {
                flag: self.run_active.clone(),
            })
        } else {
            Err(RunBusy)
        }
    }

    /// Publishes a patch with the next sequence number.
    pub fn publish(&self, kind: AuditPatchKind, data: Value) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.hub.publish(AuditPatch {
            seq,
            kind,
            at: Utc::now(),
            data,
        });
    }

    pub fn record_recovery(&self) -> u64 {
        self.recovered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn recovered_total(&self) -> u64 {
        self.recovered.load(Ordering::Relaxed)
    }
}

/// An audit pass is already running.
#[derive(Debug, Error)]
#[error("an audit pass is already running")]
pub struct RunBusy;

/// Releases the audit slot on drop, including on panic or early return.
pub struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
