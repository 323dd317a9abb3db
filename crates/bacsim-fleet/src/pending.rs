//! Confirmed requests the fleet itself has issued and not yet seen
//! answered.

use crate::error::FleetError;
use crate::value::PropertyValue;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Outcome of a confirmed request, as reported by the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    ReadPropertyAck(PropertyValue),
    SimpleAck { service_choice: u8 },
    Error { class: u32, code: u32 },
    Reject { reason: u8 },
    Abort { reason: u8 },
}

#[derive(Debug)]
struct Entry {
    sender: oneshot::Sender<Response>,
    issued: Instant,
    serial: u64,
}

#[derive(Debug, Default)]
struct Inner {
    next_invoke_id: u8,
    next_serial: u64,
    entries: HashMap<(SocketAddr, u8), Entry>,
}

type Shared = Arc<Mutex<Inner>>;

fn lock(inner: &Shared) -> MutexGuard<'_, Inner> {
    // Nothing panics while holding the lock, so a poisoned table is intact.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keyed by (peer address, invoke-id).
#[derive(Debug, Default)]
pub struct PendingTable {
    inner: Shared,
}

/// Handle to a registered request. Dropping it before a response arrives
/// evicts the entry, so abandoned requests never hold their invoke-id.
#[derive(Debug)]
pub struct PendingRequest {
    pub peer: SocketAddr,
    pub invoke_id: u8,
    serial: u64,
    receiver: oneshot::Receiver<Response>,
    table: Shared,
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        let mut inner = lock(&self.table);
        let key = (self.peer, self.invoke_id);
        // The id may already have been completed and handed to a newer request.
        if inner.entries.get(&key).map(|e| e.serial) == Some(self.serial) {
            inner.entries.remove(&key);
        }
    }
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an invoke-id not in flight toward `peer`.
    pub fn register(&self, peer: SocketAddr) -> Result<PendingRequest, FleetError> {
        let mut inner = lock(&self.inner);
        for _ in 0..=u8::MAX {
            let invoke_id = inner.next_invoke_id;
            inner.next_invoke_id = invoke_id.wrapping_add(1);
            if inner.entries.contains_key(&(peer, invoke_id)) {
                continue;
            }
            let serial = inner.next_serial;
            inner.next_serial = serial.wrapping_add(1);
            let (sender, receiver) = oneshot::channel();
            inner.entries.insert(
                (peer, invoke_id),
                Entry {
                    sender,
                    issued: Instant::now(),
                    serial,
                },
            );
            return Ok(PendingRequest {
                peer,
                invoke_id,
                serial,
                receiver,
                table: self.inner.clone(),
            });
        }
        Err(FleetError::InvokeIdsExhausted(peer))
    }

    /// Hands `response` to the waiter. Returns false when nothing matched.
    pub fn complete(&self, peer: SocketAddr, invoke_id: u8, response: Response) -> bool {
        let entry = lock(&self.inner).entries.remove(&(peer, invoke_id));
        match entry {
            Some(entry) => {
                log::trace!(
                    "response from {peer} invoke-id {invoke_id} after {:?}",
                    entry.issued.elapsed()
                );
                // The waiter may already have timed out.
                let _ = entry.sender.send(response);
                true
            }
            None => false,
        }
    }

    /// Waits for the response. The entry is evicted when `request` is
    /// dropped, whether by timeout here or by the caller giving up.
    pub async fn wait(
        &self,
        mut request: PendingRequest,
        timeout: Duration,
    ) -> Result<Response, FleetError> {
        match tokio::time::timeout(timeout, &mut request.receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(FleetError::Cancelled),
            Err(_) => Err(FleetError::Timeout),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry; waiters observe [`FleetError::Cancelled`].
    pub fn clear(&self) {
        lock(&self.inner).entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{PendingTable, Response};
    use crate::error::FleetError;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn peer() -> SocketAddr {
        "127.0.0.1:47808".parse().unwrap()
    }

    #[tokio::test]
    async fn completes_matching_request() {
        let table = PendingTable::new();
        let req = table.register(peer()).unwrap();
        let invoke_id = req.invoke_id;
        assert!(table.complete(peer(), invoke_id, Response::SimpleAck { service_choice: 15 }));
        let resp = table.wait(req, Duration::from_secs(1)).await.unwrap();
        assert_eq!(resp, Response::SimpleAck { service_choice: 15 });
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn unmatched_response_is_reported() {
        let table = PendingTable::new();
        assert!(!table.complete(peer(), 9, Response::Abort { reason: 4 }));
    }

    #[tokio::test]
    async fn timeout_evicts_entry() {
        let table = PendingTable::new();
        let req = table.register(peer()).unwrap();
        let err = table.wait(req, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, FleetError::Timeout));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn abandoned_wait_evicts_entry() {
        let table = PendingTable::new();
        for _ in 0..10 {
            let req = table.register(peer()).unwrap();
            let outer = tokio::time::timeout(
                Duration::from_millis(10),
                table.wait(req, Duration::from_secs(5)),
            )
            .await;
            assert!(outer.is_err());
        }
        assert!(table.is_empty());
    }

    #[test]
    fn dropping_request_frees_invoke_id() {
        let table = PendingTable::new();
        let mut held = Vec::new();
        for _ in 0..256 {
            held.push(table.register(peer()).unwrap());
        }
        let freed = held.pop().unwrap().invoke_id;
        assert_eq!(table.len(), 255);
        assert_eq!(table.register(peer()).unwrap().invoke_id, freed);
    }

    #[test]
    fn stale_handle_leaves_reused_id_alone() {
        let table = PendingTable::new();
        let first = table.register(peer()).unwrap();
        assert!(table.complete(peer(), first.invoke_id, Response::Abort { reason: 0 }));
        // Walk the allocator round so the same id is handed out again.
        let mut reused = None;
        for _ in 0..256 {
            let req = table.register(peer()).unwrap();
            if req.invoke_id == first.invoke_id {
                reused = Some(req);
                break;
            }
        }
        let reused = reused.unwrap();
        drop(first);
        assert_eq!(table.len(), 1);
        drop(reused);
        assert!(table.is_empty());
    }

    #[test]
    fn invoke_ids_are_distinct_per_peer() {
        let table = PendingTable::new();
        let a = table.register(peer()).unwrap();
        let b = table.register(peer()).unwrap();
        assert_ne!(a.invoke_id, b.invoke_id);
    }

    #[test]
    fn exhausts_after_256_in_flight() {
        let table = PendingTable::new();
        let mut held = Vec::new();
        for _ in 0..256 {
            held.push(table.register(peer()).unwrap());
        }
        assert!(matches!(
            table.register(peer()),
            Err(FleetError::InvokeIdsExhausted(_))
        ));
    }
}
