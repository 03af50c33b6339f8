//! In-flight randomness request bookkeeping.
//!
//! The ledger is the only link between the two halves of a mint: the paid
//! request and the asynchronous fulfillment. An entry is created when a mint
//! is paid for and destroyed exactly once, when the matching fulfillment is
//! processed. Consuming twice, or consuming an id that was never recorded,
//! is a protocol-integrity violation and is always rejected.
//!
//! The ledger itself is a plain map; serialisation of access is the owning
//! orchestrator's responsibility (it holds the single state lock).

use std::collections::HashMap;

use kc_common::{Address, RequestId};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The provider handed out a request id that is already pending.
    #[error("request {0} is already pending")]
    DuplicateRequest(RequestId),

    /// Fulfillment for an id that is unknown or was already consumed.
    #[error("unknown or already fulfilled request {0}")]
    UnknownRequest(RequestId),
}

/// Map of pending request ids to their original requester.
#[derive(Debug, Default)]
pub struct RequestLedger {
    pending: HashMap<RequestId, Address>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly issued request id for `requester`.
    pub fn record(&mut self, request_id: RequestId, requester: Address) -> Result<(), LedgerError> {
        if self.pending.contains_key(&request_id) {
            return Err(LedgerError::DuplicateRequest(request_id));
        }
        let _ = self.pending.insert(request_id, requester);
        Ok(())
    }

    /// Removes the entry for `request_id` and returns its requester.
    ///
    /// One-shot: a second consume with the same id always fails.
    pub fn consume(&mut self, request_id: RequestId) -> Result<Address, LedgerError> {
        self.pending
            .remove(&request_id)
            .ok_or(LedgerError::UnknownRequest(request_id))
    }

    pub fn contains(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn record_then_consume_returns_requester() {
        let mut ledger = RequestLedger::new();
        ledger.record(RequestId(1), addr(0xaa)).unwrap();

        assert_eq!(ledger.consume(RequestId(1)).unwrap(), addr(0xaa));
        assert!(ledger.is_empty());
    }

    #[test]
    fn second_consume_fails_with_unknown_request() {
        let mut ledger = RequestLedger::new();
        ledger.record(RequestId(7), addr(0x01)).unwrap();
        let _ = ledger.consume(RequestId(7)).unwrap();

        assert_eq!(
            ledger.consume(RequestId(7)).unwrap_err(),
            LedgerError::UnknownRequest(RequestId(7))
        );
    }

    #[test]
    fn consuming_an_unrecorded_id_fails() {
        let mut ledger = RequestLedger::new();
        assert_eq!(
            ledger.consume(RequestId(99)).unwrap_err(),
            LedgerError::UnknownRequest(RequestId(99))
        );
    }

    #[test]
    fn duplicate_record_is_rejected_and_keeps_original_requester() {
        let mut ledger = RequestLedger::new();
        ledger.record(RequestId(3), addr(0x01)).unwrap();

        assert_eq!(
            ledger.record(RequestId(3), addr(0x02)).unwrap_err(),
            LedgerError::DuplicateRequest(RequestId(3))
        );
        assert_eq!(ledger.consume(RequestId(3)).unwrap(), addr(0x01));
    }

    #[test]
    fn distinct_ids_are_tracked_independently() {
        let mut ledger = RequestLedger::new();
        ledger.record(RequestId(1), addr(0x01)).unwrap();
        ledger.record(RequestId(2), addr(0x02)).unwrap();
        assert_eq!(ledger.len(), 2);

        assert_eq!(ledger.consume(RequestId(2)).unwrap(), addr(0x02));
        assert!(ledger.contains(RequestId(1)));
        assert!(!ledger.contains(RequestId(2)));
    }
}
