//! Token allocation and the pending-request registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::{DriverError, DriverResult};
use crate::proto::Response;

/// One-shot completion slot for an in-flight request. The submitter holds
/// the receiving end; whoever removes the sender from the registry first
/// (reader on delivery, submitter on timeout, reader shutdown on close)
/// decides the outcome.
pub(crate) type ResponseSlot = oneshot::Sender<DriverResult<Response>>;

/// Source of request tokens, strictly increasing for the life of a
/// connection. The first token handed out is 2.
pub(crate) struct TokenAllocator {
    next: AtomicU64,
}

impl TokenAllocator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a token strictly greater than every previously returned one.
    pub(crate) fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// In-flight requests keyed by token. Entries are removed exactly once;
/// the lock is never held across an await.
pub(crate) struct PendingRegistry {
    slots: Mutex<HashMap<u64, ResponseSlot>>,
}

impl PendingRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Arm a slot under `token`. Installing a token twice is a caller bug.
    pub(crate) fn install(&self, token: u64, slot: ResponseSlot) -> DriverResult<()> {
        let mut slots = self.lock();
        if slots.contains_key(&token) {
            return Err(DriverError::ProtocolViolation(format!(
                "token {} already has a pending request",
                token
            )));
        }
        slots.insert(token, slot);
        Ok(())
    }

    /// Atomically remove and return the slot for `token`, if still armed.
    pub(crate) fn take(&self, token: u64) -> Option<ResponseSlot> {
        self.lock().remove(&token)
    }

    /// Remove every armed slot.
    pub(crate) fn drain(&self) -> Vec<ResponseSlot> {
        self.lock().drain().map(|(_, slot)| slot).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, ResponseSlot>> {
        // The map stays usable even if a holder panicked mid-mutation.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_start_at_two() {
        let tokens = TokenAllocator::new();
        assert_eq!(tokens.next(), 2);
        assert_eq!(tokens.next(), 3);
        assert_eq!(tokens.next(), 4);
    }

    #[test]
    fn test_tokens_are_unique_under_concurrency() {
        let tokens = TokenAllocator::new();
        let mut seen: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..1000).map(|_| tokens.next()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        seen.sort_unstable();
        let len = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), len);
        assert_eq!(seen.first(), Some(&2));
    }

    #[test]
    fn test_install_then_take() {
        let registry = PendingRegistry::new();
        let (tx, mut rx) = oneshot::channel();

        registry.install(2, tx).unwrap();
        assert_eq!(registry.len(), 1);

        let slot = registry.take(2).unwrap();
        assert_eq!(registry.len(), 0);
        assert!(registry.take(2).is_none());

        slot.send(Err(DriverError::ConnectionClosed)).unwrap();
        assert!(rx.try_recv().unwrap().is_err());
    }

    #[test]
    fn test_duplicate_install_is_rejected() {
        let registry = PendingRegistry::new();
        let (first, _rx_a) = oneshot::channel();
        let (second, _rx_b) = oneshot::channel();

        registry.install(2, first).unwrap();
        let err = registry.install(2, second).unwrap_err();
        assert!(matches!(err, DriverError::ProtocolViolation(_)));
    }

    #[test]
    fn test_drain_empties_the_registry() {
        let registry = PendingRegistry::new();
        let (tx_a, _rx_a) = oneshot::channel();
        let (tx_b, _rx_b) = oneshot::channel();
        registry.install(2, tx_a).unwrap();
        registry.install(3, tx_b).unwrap();

        assert_eq!(registry.drain().len(), 2);
        assert_eq!(registry.len(), 0);
    }
}
