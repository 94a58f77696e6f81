use std::time::Duration;

use axum::response::sse::{Event, KeepAlive};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::warn;

use favlens_core::types::AuditPatch;

const BROADCAST_BUFFER: usize = 128;

/// Fan-out hub for audit patches.
///
/// Every audit pass and recovery publishes patches here; SSE clients each
/// hold their own broadcast receiver.
#[derive(Clone)]
pub struct AuditHub {
    sender: broadcast::Sender<AuditPatch>,
}

impl AuditHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_BUFFER);
        Self { sender }
    }

    pub fn publish(&self, patch: AuditPatch) {
        if let Err(err) = self.sender.send(patch) {
            warn!(stage = "sse", error = %err, "failed to broadcast audit patch");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditPatch> {
        self.sender.subscribe()
    }
}

impl Default for AuditHub {
    fn default() -> Self {
        Self::new()
    }
}

/// SSE stream of audit patches, one event per patch named by its kind with
/// the patch sequence number as the event id.
pub fn audit_stream(
    hub: AuditHub,
) -> impl Stream<Item = Result<Event, serde_json::Error>> + Send + 'static {
    BroadcastStream::new(hub.subscribe()).filter_map(|result| match result {
        Ok(patch) => Some(into_sse_event(patch)),
        Err(_) => None,
    })
}

fn into_sse_event(patch: AuditPatch) -> Result<Event, serde_json::Error> {
    let event = Event::default()
        .event(patch.kind_str())
        .id(patch.seq.to_string());
    let data = serde_json::to_string(&patch)?;
    Ok(event.data(data))
}

pub fn audit_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(20))
        .text("heartbeat")
}
