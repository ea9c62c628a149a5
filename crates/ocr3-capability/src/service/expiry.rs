//! Request expiry.
//!
//! One dispatcher per capability parks on the request channel and spawns a
//! watcher per accepted request. A watcher fires at `expires_at` or when the
//! caller's context is canceled, whichever comes first.

use crate::domain::{CapabilityResponse, Request, RequestStore};
use crate::metrics;
use crate::ports::Clock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub(super) async fn run_dispatcher(
    mut requests: mpsc::UnboundedReceiver<Request>,
    store: Arc<RequestStore>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = requests.recv() => match next {
                Some(req) => {
                    tokio::spawn(watch_request(
                        req,
                        store.clone(),
                        clock.clone(),
                        shutdown.clone(),
                    ));
                }
                None => break,
            },
        }
    }
    info!("Expiry dispatcher stopped");
}

async fn watch_request(
    req: Request,
    store: Arc<RequestStore>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) {
    tokio::select! {
        _ = shutdown.cancelled() => return,
        _ = clock.sleep_until(req.expires_at) => {}
        _ = req.request_ctx.cancelled() => {}
    }
    expire(&store, &req);
}

/// Evict `req` and answer its caller with a timeout.
///
/// Returns `false` when the request was already gone, in which case the
/// response path owns the callback and nothing is sent.
pub(super) fn expire(store: &RequestStore, req: &Request) -> bool {
    let Some(stored) = store.evict_request(req) else {
        return false;
    };

    if stored.request_ctx.is_cancelled() {
        stored.callback.close();
        debug!(
            workflow_execution_id = %stored.workflow_execution_id,
            "Request context done, dropping timeout response"
        );
    } else {
        stored.callback.complete(CapabilityResponse::timeout());
        info!(
            workflow_id = %stored.workflow_id,
            workflow_execution_id = %stored.workflow_execution_id,
            "Request expired before consensus was reached"
        );
    }
    metrics::record_request_expired();
    true
}
