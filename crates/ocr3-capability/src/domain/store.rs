//! # Request Store
//!
//! In-memory staging area for in-flight consensus requests.
//!
//! ## Data Structures
//!
//! - `requests`: O(1) lookup by workflow execution id, each entry stamped
//!   with the sequence number of its order slot
//! - `order`: insertion order of `(seq, id)` slots, used for FIFO batching
//!
//! ## Invariants Enforced
//!
//! - At most one request per execution id (checked in `add()`)
//! - `first_n()` returns requests in insertion order and permanently drops
//!   the stale slots it walks past; it stops once the batch is full
//! - `evict()` is idempotent; only one caller ever observes "present"
//!
//! Both structures sit behind a single mutex. `first_n()` takes it for
//! writing because pruning mutates the order list.

use super::{CapabilityError, CapabilityResult, Request};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
struct Slot {
    seq: u64,
    request: Request,
}

#[derive(Debug, Default)]
struct StoreInner {
    next_seq: u64,
    order: VecDeque<(u64, String)>,
    requests: HashMap<String, Slot>,
}

impl StoreInner {
    /// Live if the id is still stored under this very slot; an id evicted
    /// and re-added owns only its latest slot.
    fn is_live(&self, seq: u64, id: &str) -> bool {
        self.requests.get(id).is_some_and(|slot| slot.seq == seq)
    }

    fn remove(&mut self, id: &str) -> Option<Request> {
        let slot = self.requests.remove(id)?;
        if self.requests.is_empty() {
            self.order.clear();
        }
        Some(slot.request)
    }
}

/// Thread-safe, at-most-one-per-key request store.
#[derive(Debug, Default)]
pub struct RequestStore {
    inner: Mutex<StoreInner>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live requests.
    pub fn len(&self) -> usize {
        self.inner.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().requests.is_empty()
    }

    /// Adds a request keyed by its execution id.
    ///
    /// # Errors
    /// - `AlreadyExists` if a request with the same execution id is stored
    pub fn add(&self, req: Request) -> CapabilityResult<()> {
        let mut inner = self.inner.lock();
        let id = req.workflow_execution_id.clone();
        if inner.requests.contains_key(&id) {
            return Err(CapabilityError::AlreadyExists(id));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((seq, id.clone()));
        inner.requests.insert(id, Slot { seq, request: req });
        Ok(())
    }

    pub fn get(&self, id: &str) -> CapabilityResult<Request> {
        self.inner
            .lock()
            .requests
            .get(id)
            .map(|slot| slot.request.clone())
            .ok_or_else(|| CapabilityError::NotFound(id.to_string()))
    }

    /// All-or-nothing batched lookup.
    ///
    /// # Errors
    /// - `NotFound` for the first id that is absent
    pub fn get_n<S: AsRef<str>>(&self, ids: &[S]) -> CapabilityResult<Vec<Request>> {
        let inner = self.inner.lock();
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                inner
                    .requests
                    .get(id)
                    .map(|slot| slot.request.clone())
                    .ok_or_else(|| CapabilityError::NotFound(id.to_string()))
            })
            .collect()
    }

    /// Up to `batch_size` live requests in insertion order.
    ///
    /// Walks the order list from the front only as far as the batch needs.
    ///
    /// # Errors
    /// - `InvalidArgument` if `batch_size == 0`; the store is left untouched
    pub fn first_n(&self, batch_size: usize) -> CapabilityResult<Vec<Request>> {
        if batch_size == 0 {
            return Err(CapabilityError::InvalidArgument(
                "batch size cannot be 0".to_string(),
            ));
        }

        let mut inner = self.inner.lock();
        let capacity = batch_size.min(inner.requests.len());
        let mut batch = Vec::with_capacity(capacity);
        let mut walked = Vec::with_capacity(capacity);

        while batch.len() < batch_size {
            let Some((seq, id)) = inner.order.pop_front() else {
                break;
            };
            if !inner.is_live(seq, &id) {
                continue;
            }
            if let Some(slot) = inner.requests.get(&id) {
                batch.push(slot.request.clone());
            }
            walked.push((seq, id));
        }

        // Live slots go back to the front in their original order.
        for entry in walked.into_iter().rev() {
            inner.order.push_front(entry);
        }
        Ok(batch)
    }

    /// Removes the request for `id`, returning it if it was present.
    pub fn evict(&self, id: &str) -> Option<Request> {
        self.inner.lock().remove(id)
    }

    /// Removes every request, oldest first. Used at shutdown.
    pub fn drain(&self) -> Vec<Request> {
        let mut inner = self.inner.lock();
        let StoreInner {
            order, requests, ..
        } = &mut *inner;
        let drained: Vec<Request> = order
            .drain(..)
            .filter_map(|(seq, id)| {
                let live = requests.get(&id).is_some_and(|slot| slot.seq == seq);
                if !live {
                    return None;
                }
                requests.remove(&id).map(|slot| slot.request)
            })
            .collect();
        requests.clear();
        drained
    }

    /// Evicts `req` only if the stored entry is that same request and not a
    /// later one re-submitted under the same execution id.
    pub fn evict_request(&self, req: &Request) -> Option<Request> {
        let mut inner = self.inner.lock();
        let same = inner
            .requests
            .get(&req.workflow_execution_id)
            .is_some_and(|stored| stored.request.callback.same_channel(&req.callback));
        if !same {
            return None;
        }
        inner.remove(&req.workflow_execution_id)
    }

    #[cfg(test)]
    fn order_len(&self) -> usize {
        self.inner.lock().order.len()
    }
}
