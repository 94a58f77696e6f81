use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use ulid::Ulid;

use favlens_browser::bookmarks::BookmarkError;
use favlens_browser::icon_cache::IconCache;
use favlens_browser::probe::IconProbe;
use favlens_browser::recovery;
use favlens_browser::tabs::TabError;
use favlens_core::bookmarks::{collect_https_hosts, count_bookmarks};
use favlens_core::types::{AuditPatchKind, AuditSummary, IconRequest, RecoveryOutcome};

use crate::state::{AppState, RunGuard};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to load bookmarks: {0}")]
    Bookmarks(#[from] BookmarkError),
}

/// Runs one audit pass: walks the bookmark tree, calibrates the probe, and
/// classifies the cached icon of every collected domain, streaming patches
/// as it goes. The guard holds the single audit slot for the duration.
pub async fn run_audit(state: AppState, guard: RunGuard) -> Result<AuditSummary, AuditError> {
    let _guard = guard;
    let started = Instant::now();
    let run_id = Ulid::new().to_string();

    let tree = state.bookmarks().tree()?;
    let bookmarks_total = count_bookmarks(&tree);
    let domains = collect_https_hosts(&tree, state.audit().domain_limit);

    info!(
        run = %run_id,
        bookmarks_total,
        domains = domains.len(),
        "audit started"
    );
    counter!("audit_runs_total").increment(1);
    state.publish(
        AuditPatchKind::AuditStarted,
        json!({
            "run": run_id,
            "bookmarks_total": bookmarks_total,
            "domains_total": domains.len(),
        }),
    );

    let size_px = state.audit().icon_size_px;
    let mut probe = IconProbe::calibrate(state.browser(), size_px).await;

    let mut missing = 0u64;
    for domain in &domains {
        let request = IconRequest::new(domain.clone(), size_px);
        let image = state.browser().fetch_icon(&request);

        let classify_started = Instant::now();
        let inspection = probe.inspect(&image).await;
        histogram!("classify_seconds").record(classify_started.elapsed().as_secs_f64());

        counter!("audit_domains_total").increment(1);
        if inspection.verdict.is_missing() {
            missing += 1;
            counter!("icons_missing_total").increment(1);
        }

        state.publish(
            AuditPatchKind::IconClassified,
            json!({
                "run": run_id,
                "domain": domain,
                "icon_url": request.url(),
                "verdict": inspection.verdict.as_str(),
                "fingerprint": inspection.fingerprint,
            }),
        );
    }

    let summary = AuditSummary {
        bookmarks_total,
        domains_total: domains.len() as u64,
        missing,
        recovered: state.recovered_total(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        run = %run_id,
        bookmarks_total = summary.bookmarks_total,
        domains_total = summary.domains_total,
        missing = summary.missing,
        recovered = summary.recovered,
        elapsed_ms = summary.elapsed_ms,
        "audit completed"
    );
    state.publish(
        AuditPatchKind::AuditCompleted,
        json!({ "run": run_id, "summary": summary }),
    );

    Ok(summary)
}

/// Triggers the recovery race for one domain and, when a favicon surfaces,
/// publishes the recovered icon so the grid can swap it in.
pub async fn recover_domain(state: &AppState, domain: &str) -> Result<RecoveryOutcome, TabError> {
    let timeout = Duration::from_millis(state.audit().recovery_timeout_ms);
    let started = Instant::now();

    let outcome = recovery::recover(state.browser(), domain, timeout).await?;
    histogram!("recovery_seconds").record(started.elapsed().as_secs_f64());

    match &outcome {
        RecoveryOutcome::Recovered { icon_url } => {
            counter!("recoveries_total", "result" => "recovered").increment(1);
            let recovered_total = state.record_recovery();
            let request = IconRequest::new(domain, state.audit().icon_size_px);
            state.publish(
                AuditPatchKind::IconRecovered,
                json!({
                    "domain": domain,
                    "discovered_url": icon_url,
                    "icon_url": request.url(),
                    "recovered_total": recovered_total,
                }),
            );
        }
        RecoveryOutcome::Empty => {
            counter!("recoveries_total", "result" => "empty").increment(1);
        }
    }

    Ok(outcome)
}
