//! One-shot response delivery.
//!
//! Two completers race for every request: the expiry watcher and the
//! transmit path. Both call [`ResponsePromise::complete`]; only the first
//! call delivers, every later call is a no-op.

use super::CapabilityResponse;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Completing half of a single-use response channel.
#[derive(Clone)]
pub struct ResponsePromise {
    sender: Arc<Mutex<Option<oneshot::Sender<CapabilityResponse>>>>,
}

/// Caller half. Resolves to `None` if the promise was closed without a value.
pub struct ResponseFuture {
    receiver: oneshot::Receiver<CapabilityResponse>,
}

impl ResponsePromise {
    pub fn new() -> (Self, ResponseFuture) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            ResponseFuture { receiver: rx },
        )
    }

    /// Deliver `response`. Returns `true` only for the call that won.
    ///
    /// A receiver that has gone away still counts as completed.
    pub fn complete(&self, response: CapabilityResponse) -> bool {
        match self.sender.lock().take() {
            Some(tx) => {
                let _ = tx.send(response);
                true
            }
            None => false,
        }
    }

    /// Close the channel without delivering anything.
    pub fn close(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Whether both handles point at the same underlying channel.
    pub fn same_channel(&self, other: &ResponsePromise) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }
}

impl fmt::Debug for ResponsePromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponsePromise")
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl ResponseFuture {
    /// Non-blocking poll, `None` while still pending or after a close.
    pub fn try_take(&mut self) -> Option<CapabilityResponse> {
        self.receiver.try_recv().ok()
    }
}

impl Future for ResponseFuture {
    type Output = Option<CapabilityResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(Result::ok)
    }
}
