//! In-process stand-in for the external randomness provider.
//!
//! Mirrors the coordinator contract used on development networks: consumers
//! create and fund a subscription, requests are numbered sequentially, and a
//! test (or a local driver loop) triggers fulfillment explicitly. Random
//! words are derived deterministically from the request id, which keeps
//! end-to-end runs reproducible.
//!
//! Production deployments replace this with a client for the real provider;
//! everything upstream only sees the [`RandomnessSource`] and
//! [`RandomnessConsumer`] ports.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use kc_common::{RequestId, TokenAmount};

use crate::logic::{
    MintError, MintedAsset, RandomnessConsumer, RandomnessRequest, RandomnessSource, VrfError,
};

/// Flat fee deducted from a subscription per request (0.25 in 18-decimals).
pub const DEFAULT_BASE_FEE: TokenAmount = 250_000_000_000_000_000;

/// Subscription identifier handed out by [`MockVrfCoordinator::create_subscription`].
pub type SubscriptionId = u64;

#[derive(Debug)]
struct PendingRandomness {
    subscription_id: SubscriptionId,
    num_words: u32,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    subscriptions: HashMap<SubscriptionId, TokenAmount>,
    pending: HashMap<RequestId, PendingRandomness>,
}

/// Deterministic, in-memory randomness coordinator.
pub struct MockVrfCoordinator {
    next_request_id: AtomicU64,
    next_subscription_id: AtomicU64,
    base_fee: TokenAmount,
    state: Mutex<CoordinatorState>,
}

impl Default for MockVrfCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_FEE)
    }
}

impl MockVrfCoordinator {
    pub fn new(base_fee: TokenAmount) -> Self {
        Self {
            // Request ids are numbered from 1, matching the provider's
            // on-chain counterpart.
            next_request_id: AtomicU64::new(1),
            next_subscription_id: AtomicU64::new(1),
            base_fee,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Opens a new, unfunded subscription.
    pub fn create_subscription(&self) -> SubscriptionId {
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        let _ = self.state.lock().subscriptions.insert(id, 0);
        info!(subscription_id = id, "subscription created");
        id
    }

    /// Tops up an existing subscription. Unknown ids are created on the fly,
    /// matching the permissive behaviour of the development coordinator.
    pub fn fund_subscription(&self, subscription_id: SubscriptionId, amount: TokenAmount) {
        let mut state = self.state.lock();
        let balance = state.subscriptions.entry(subscription_id).or_insert(0);
        *balance = balance.saturating_add(amount);
        debug!(subscription_id, balance = *balance, "subscription funded");
    }

    pub fn subscription_balance(&self, subscription_id: SubscriptionId) -> Option<TokenAmount> {
        self.state.lock().subscriptions.get(&subscription_id).copied()
    }

    /// Number of requests issued but not yet fulfilled.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Derives the words for `request_id` by hashing the id with each word
    /// index. Stable across runs; wide enough to exercise the consumer's
    /// modulo reduction.
    pub fn derive_words(request_id: RequestId, num_words: u32) -> Vec<u128> {
        (0..num_words)
            .map(|word_index| {
                let mut hasher = Sha256::new();
                hasher.update(request_id.0.to_le_bytes());
                hasher.update(word_index.to_le_bytes());
                let digest = hasher.finalize();

                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(&digest[0..16]);
                u128::from_le_bytes(bytes)
            })
            .collect()
    }

    /// Delivers the randomness for a previously issued request by invoking
    /// the consumer's callback, then settles the pending entry.
    pub async fn fulfill(
        &self,
        request_id: RequestId,
        consumer: &dyn RandomnessConsumer,
    ) -> Result<MintedAsset, MintError> {
        let (subscription_id, num_words) = {
            let state = self.state.lock();
            let pending = state.pending.get(&request_id).ok_or_else(|| {
                VrfError::new(format!("no pending randomness request {request_id}"))
            })?;
            (pending.subscription_id, pending.num_words)
        };

        let words = Self::derive_words(request_id, num_words);
        let asset = consumer.on_randomness_fulfilled(request_id, &words).await?;

        let _ = self.state.lock().pending.remove(&request_id);
        debug!(%request_id, subscription_id, "randomness request settled");
        Ok(asset)
    }
}

#[async_trait]
impl RandomnessSource for MockVrfCoordinator {
    async fn request_randomness(
        &self,
        params: &RandomnessRequest,
    ) -> Result<RequestId, VrfError> {
        let mut state = self.state.lock();

        let balance = state
            .subscriptions
            .get_mut(&params.subscription_id)
            .ok_or_else(|| {
                VrfError::new(format!("unknown subscription {}", params.subscription_id))
            })?;

        if *balance < self.base_fee {
            return Err(VrfError::new(format!(
                "subscription {} underfunded: balance {balance}, fee {}",
                params.subscription_id, self.base_fee
            )));
        }
        *balance -= self.base_fee;

        let request_id = RequestId(self.next_request_id.fetch_add(1, Ordering::SeqCst));
        let _ = state.pending.insert(
            request_id,
            PendingRandomness {
                subscription_id: params.subscription_id,
                num_words: params.num_words,
            },
        );

        debug!(
            %request_id,
            subscription_id = params.subscription_id,
            gas_lane = %params.gas_lane,
            "randomness requested"
        );
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    use kc_common::{Address, TokenId};

    fn params(subscription_id: SubscriptionId) -> RandomnessRequest {
        RandomnessRequest {
            gas_lane: "test-lane".into(),
            subscription_id,
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }

    /// Consumer double that records every delivery.
    #[derive(Default)]
    struct RecordingConsumer {
        seen: SyncMutex<Vec<(RequestId, Vec<u128>)>>,
    }

    #[async_trait]
    impl RandomnessConsumer for RecordingConsumer {
        async fn on_randomness_fulfilled(
            &self,
            request_id: RequestId,
            random_words: &[u128],
        ) -> Result<MintedAsset, MintError> {
            self.seen.lock().push((request_id, random_words.to_vec()));
            Ok(MintedAsset {
                token_id: TokenId(0),
                owner: Address::zero(),
                breed_index: 0,
                breed: "Pug".into(),
                token_uri: "ipfs://a".into(),
            })
        }
    }

    #[tokio::test]
    async fn request_ids_are_sequential_from_one() {
        let coordinator = MockVrfCoordinator::default();
        let sub = coordinator.create_subscription();
        coordinator.fund_subscription(sub, DEFAULT_BASE_FEE * 3);

        let a = coordinator.request_randomness(&params(sub)).await.unwrap();
        let b = coordinator.request_randomness(&params(sub)).await.unwrap();
        assert_eq!(a, RequestId(1));
        assert_eq!(b, RequestId(2));
    }

    #[tokio::test]
    async fn unknown_subscription_is_rejected() {
        let coordinator = MockVrfCoordinator::default();
        let err = coordinator.request_randomness(&params(77)).await.unwrap_err();
        assert!(err.to_string().contains("unknown subscription"));
    }

    #[tokio::test]
    async fn underfunded_subscription_is_rejected() {
        let coordinator = MockVrfCoordinator::default();
        let sub = coordinator.create_subscription();
        coordinator.fund_subscription(sub, DEFAULT_BASE_FEE - 1);

        let err = coordinator.request_randomness(&params(sub)).await.unwrap_err();
        assert!(err.to_string().contains("underfunded"));
    }

    #[tokio::test]
    async fn each_request_charges_the_subscription() {
        let coordinator = MockVrfCoordinator::default();
        let sub = coordinator.create_subscription();
        coordinator.fund_subscription(sub, DEFAULT_BASE_FEE * 2);

        let _ = coordinator.request_randomness(&params(sub)).await.unwrap();
        assert_eq!(
            coordinator.subscription_balance(sub).unwrap(),
            DEFAULT_BASE_FEE
        );
    }

    #[test]
    fn derived_words_are_deterministic_and_distinct() {
        let first = MockVrfCoordinator::derive_words(RequestId(1), 2);
        let again = MockVrfCoordinator::derive_words(RequestId(1), 2);
        let other = MockVrfCoordinator::derive_words(RequestId(2), 2);

        assert_eq!(first, again);
        assert_ne!(first[0], first[1]);
        assert_ne!(first[0], other[0]);
    }

    #[tokio::test]
    async fn fulfill_delivers_words_and_settles_the_request() {
        let coordinator = MockVrfCoordinator::default();
        let sub = coordinator.create_subscription();
        coordinator.fund_subscription(sub, DEFAULT_BASE_FEE);

        let id = coordinator.request_randomness(&params(sub)).await.unwrap();
        assert_eq!(coordinator.pending_count(), 1);

        let consumer = RecordingConsumer::default();
        let _ = coordinator.fulfill(id, &consumer).await.unwrap();

        let seen = consumer.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, id);
        assert_eq!(seen[0].1, MockVrfCoordinator::derive_words(id, 1));
        drop(seen);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn fulfilling_an_unissued_request_fails() {
        let coordinator = MockVrfCoordinator::default();
        let consumer = RecordingConsumer::default();

        let err = coordinator
            .fulfill(RequestId(9), &consumer)
            .await
            .unwrap_err();
        assert!(matches!(err, MintError::Vrf(_)));
        assert!(consumer.seen.lock().is_empty());
    }
}
