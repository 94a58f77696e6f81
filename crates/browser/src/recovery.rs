use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use favlens_core::types::RecoveryOutcome;

use crate::tabs::{TabError, TabHost};

/// Attempts to populate the favicon cache for `domain` by opening its page
/// in an inactive background tab and racing the host's favicon-discovery
/// signal against `timeout`.
///
/// The first update carrying a non-empty favicon URL for that exact tab
/// wins the race; otherwise the deadline does. Whichever branch completes,
/// teardown runs exactly once: the update subscription and the timer are
/// dropped and the background tab is removed.
///
/// A tab that closes or errors before discovering anything is not detected
/// separately; such a call resolves through the timeout branch.
///
/// Errors only when the background tab cannot be created.
pub async fn recover<H: TabHost>(
    host: &H,
    domain: &str,
    timeout: Duration,
) -> Result<RecoveryOutcome, TabError> {
    // Subscribe before the tab exists so the discovery signal cannot slip
    // through between creation and subscription.
    let mut updates = host.updates();
    let page_url = format!("https://{domain}/");
    let tab = host.create_background_tab(&page_url).await?;
    debug!(domain, tab = %tab, timeout_ms = timeout.as_millis() as u64, "recovery started");

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            _ = &mut deadline => break RecoveryOutcome::Empty,
            update = updates.recv() => match update {
                Ok(update) if update.tab == tab => {
                    match update.favicon_url.filter(|url| !url.is_empty()) {
                        Some(icon_url) => break RecoveryOutcome::Recovered { icon_url },
                        None => continue,
                    }
                }
                // Updates for other tabs and lagged gaps are skipped.
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                // A closed update channel leaves only the deadline path.
                Err(RecvError::Closed) => {
                    deadline.as_mut().await;
                    break RecoveryOutcome::Empty;
                }
            }
        }
    };

    // Single teardown point: exactly one select branch completed, the
    // receiver and timer drop with this scope, and the tab is removed once.
    drop(updates);
    if let Err(err) = host.remove_tab(tab).await {
        // The tab may already be gone, e.g. closed by the user mid-race.
        warn!(domain, tab = %tab, error = %err, "background tab removal failed");
    }

    match &outcome {
        RecoveryOutcome::Recovered { icon_url } => {
            debug!(domain, icon_url, "favicon discovered");
        }
        RecoveryOutcome::Empty => {
            debug!(domain, "no favicon surfaced before the deadline");
        }
    }
    Ok(outcome)
}
