//! Minting service business logic.
//!
//! This module orchestrates the full mint life-cycle for the Kennel Chain
//! collection:
//!   * Validate the paid fee against the configured mint fee.
//!   * Issue a randomness request through the pluggable [`RandomnessSource`]
//!     port and remember who paid for it in the [`RequestLedger`].
//!   * Handle the provider's asynchronous fulfillment callback: consume the
//!     ledger entry exactly once, reduce the first random word into the breed
//!     table's domain, and mint the resolved breed to the original requester
//!     through the [`AssetRegistry`] port.
//!   * Account for collected fees and sweep them to the collection owner on
//!     demand through the [`FundsGateway`] port.
//!
//! The two entry points (`request_mint`, `on_randomness_fulfilled`) are
//! connected only by the ledger; each is a short, complete transaction.
//! All mutable state (ledger + treasury) sits behind a single async lock, so
//! operations are serialised against each other while fulfillments for
//! different request ids may still arrive in any order.
//!
//! Known limitation: there is no refund or timeout path. If the randomness
//! provider never calls back, the paid fee stays in the treasury and the
//! request stays pending forever.

#![forbid(unsafe_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use kc_common::{Address, EventEnvelope, MintEvent, RequestId, TokenAmount, TokenId};

pub mod breed_table;
pub mod metadata_handler;
pub mod request_ledger;

pub use breed_table::{Breed, BreedTable, BreedTableError, MAX_CHANCE};
pub use request_ledger::{LedgerError, RequestLedger};

/* ------------------------------------------------------------------------- */
/*                               Public Models                               */
/* ------------------------------------------------------------------------- */

/// Static description of a collection, resolved from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// The only address allowed to sweep the treasury.
    pub owner: Address,
    /// Flat fee (wei) required per mint request.
    pub mint_fee: TokenAmount,
    /// Ordered weight table; weights must sum to exactly [`MAX_CHANCE`].
    pub breeds: Vec<Breed>,
    /// One metadata URI per breed, in table order.
    pub token_uris: Vec<String>,
}

/// Parameters forwarded to the randomness provider with every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessRequest {
    /// Key hash selecting the provider's gas lane.
    pub gas_lane: String,
    /// Funded subscription paying for fulfillments.
    pub subscription_id: u64,
    /// Confirmations the provider waits for before fulfilling.
    pub request_confirmations: u16,
    /// Gas ceiling for the fulfillment callback.
    pub callback_gas_limit: u32,
    /// Number of random words to deliver; only element 0 is consumed.
    pub num_words: u32,
}

/// Outcome of a successful fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintedAsset {
    pub token_id: TokenId,
    pub owner: Address,
    pub breed_index: usize,
    pub breed: String,
    pub token_uri: String,
}

/* ------------------------------------------------------------------------- */
/*                              Error Handling                               */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Error)]
pub enum MintError {
    /// The collection is wired up inconsistently. Fatal, at construction.
    #[error("invalid collection configuration: {0}")]
    Configuration(String),

    /// The caller underpaid; no funds are accepted.
    #[error("mint fee not met: paid {paid} wei, need {required} wei")]
    InsufficientFee {
        paid: TokenAmount,
        required: TokenAmount,
    },

    /// `withdraw` by anyone but the collection owner.
    #[error("caller is not the collection owner")]
    Unauthorized,

    /// The provider delivered a fulfillment without any random words.
    #[error("fulfillment carried no random words")]
    EmptyRandomness,

    #[error(transparent)]
    Table(#[from] BreedTableError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("randomness provider error: {0}")]
    Vrf(#[from] VrfError),

    #[error("asset registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("payout failed: {0}")]
    Payout(#[from] PayoutError),
}

/// Errors propagated from the randomness provider.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct VrfError {
    message: String,
}

impl VrfError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Errors propagated from the asset registry.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RegistryError {
    message: String,
}

impl RegistryError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Errors propagated from the native value transfer primitive.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PayoutError {
    message: String,
}

impl PayoutError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/* ------------------------------------------------------------------------- */
/*                          External Infrastructure                          */
/* ------------------------------------------------------------------------- */

/// Port to the external randomness provider (request side).
///
/// The returned id is an opaque token; the orchestrator only stores and
/// compares it. Fulfillment arrives later through [`RandomnessConsumer`].
#[async_trait]
pub trait RandomnessSource: Send + Sync {
    async fn request_randomness(
        &self,
        params: &RandomnessRequest,
    ) -> Result<RequestId, VrfError>;
}

/// Callback side of the randomness protocol, implemented by consumers and
/// invoked by the provider (or its in-process stand-in).
#[async_trait]
pub trait RandomnessConsumer: Send + Sync {
    async fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        random_words: &[u128],
    ) -> Result<MintedAsset, MintError>;
}

/// Port to the asset registry / minting primitive.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Mints the next sequential token to `owner` and returns its id.
    async fn mint(&self, owner: &Address) -> Result<TokenId, RegistryError>;

    /// Attaches a metadata URI to an already-minted token.
    async fn set_token_uri(&self, token_id: TokenId, uri: &str) -> Result<(), RegistryError>;
}

/// Port to the native value transfer primitive used for payouts.
#[async_trait]
pub trait FundsGateway: Send + Sync {
    async fn transfer(&self, to: &Address, amount: TokenAmount) -> Result<(), PayoutError>;
}

/* ------------------------------------------------------------------------- */
/*                              Mint Orchestrator                            */
/* ------------------------------------------------------------------------- */

/// Maximum amount of events kept in the broadcast channel; large enough for a
/// bursty workload but small enough to avoid unbounded memory growth.
const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// Mutable state guarded by the orchestrator's single lock.
#[derive(Debug, Default)]
struct MintState {
    ledger: RequestLedger,
    treasury: TokenAmount,
}

/// The core orchestration facade.
pub struct MintOrchestrator {
    vrf: Arc<dyn RandomnessSource>,
    registry: Arc<dyn AssetRegistry>,
    funds: Arc<dyn FundsGateway>,
    table: BreedTable,
    token_uris: Vec<String>,
    request_params: RandomnessRequest,
    owner: Address,
    mint_fee: TokenAmount,
    state: Mutex<MintState>,
    events: broadcast::Sender<EventEnvelope>,
}

impl std::fmt::Debug for MintOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintOrchestrator")
            .field("owner", &self.owner)
            .field("mint_fee", &self.mint_fee)
            .field("token_uris", &self.token_uris.len())
            .finish_non_exhaustive()
    }
}

impl MintOrchestrator {
    /// Wires up an orchestrator, validating the breed table and the URI list
    /// once at construction.
    pub fn new(
        spec: CollectionSpec,
        request_params: RandomnessRequest,
        vrf: Arc<dyn RandomnessSource>,
        registry: Arc<dyn AssetRegistry>,
        funds: Arc<dyn FundsGateway>,
    ) -> Result<Self, MintError> {
        let table = BreedTable::new(spec.breeds)?;

        if spec.token_uris.len() != table.len() {
            return Err(MintError::Configuration(format!(
                "{} token URIs configured for {} breeds",
                spec.token_uris.len(),
                table.len()
            )));
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            vrf,
            registry,
            funds,
            table,
            token_uris: spec.token_uris,
            request_params,
            owner: spec.owner,
            mint_fee: spec.mint_fee,
            state: Mutex::new(MintState::default()),
            events,
        })
    }

    /// Every subscriber gets its own receiver side of the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    pub fn mint_fee(&self) -> TokenAmount {
        self.mint_fee
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn breed(&self, index: usize) -> Option<&Breed> {
        self.table.get(index)
    }

    pub fn token_uri_for_breed(&self, index: usize) -> Option<&str> {
        self.token_uris.get(index).map(String::as_str)
    }

    /// Accumulated fees not yet swept to the owner.
    pub async fn treasury(&self) -> TokenAmount {
        self.state.lock().await.treasury
    }

    /// Number of requests awaiting fulfillment.
    pub async fn pending_requests(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    /// Accepts a paid mint request and issues a randomness request for it.
    ///
    /// The fee is checked before anything else; an underpaying caller leaves
    /// no trace. Once the provider hands out a request id, the ledger entry
    /// and the treasury increment are applied together under the state lock.
    /// The fee is a non-refundable deposit: minting happens if and when the
    /// provider fulfills.
    #[instrument(skip_all, fields(caller = %caller, paid))]
    pub async fn request_mint(
        &self,
        caller: Address,
        paid: TokenAmount,
    ) -> Result<RequestId, MintError> {
        if paid < self.mint_fee {
            return Err(MintError::InsufficientFee {
                paid,
                required: self.mint_fee,
            });
        }

        let request_id = self.vrf.request_randomness(&self.request_params).await?;

        {
            let mut state = self.state.lock().await;
            state.ledger.record(request_id, caller)?;
            state.treasury = state.treasury.saturating_add(paid);
        }

        info!(%request_id, "randomness requested for mint");
        let _ = self.events.send(EventEnvelope::now(MintEvent::NftRequested {
            request_id,
            requester: caller,
        }));

        Ok(request_id)
    }

    /// Fulfillment callback: resolves the breed from `random_words[0]` and
    /// mints to whoever paid for `request_id`.
    ///
    /// Exactly-once is enforced solely by the ledger's one-shot consume; a
    /// replayed id fails with [`LedgerError::UnknownRequest`] and cannot mint
    /// twice. The state lock is held across the whole transition, so
    /// fulfillments and requests never interleave mid-flight.
    #[instrument(skip_all, fields(request_id = %request_id))]
    pub async fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        random_words: &[u128],
    ) -> Result<MintedAsset, MintError> {
        let mut state = self.state.lock().await;
        let requester = state.ledger.consume(request_id)?;

        match self.mint_for(requester, random_words).await {
            Ok(asset) => {
                drop(state);
                info!(
                    token_id = %asset.token_id,
                    breed = %asset.breed,
                    owner = %asset.owner,
                    "nft minted"
                );
                let _ = self.events.send(EventEnvelope::now(MintEvent::NftMinted {
                    token_id: asset.token_id,
                    breed: asset.breed.clone(),
                    owner: asset.owner,
                }));
                Ok(asset)
            }
            Err(e) => {
                // Roll the consume back so the request stays pending; the
                // lock is still held, so re-inserting cannot collide.
                let _ = state.ledger.record(request_id, requester);
                warn!(error = %e, "fulfillment failed; request restored to pending");
                Err(e)
            }
        }
    }

    async fn mint_for(
        &self,
        requester: Address,
        random_words: &[u128],
    ) -> Result<MintedAsset, MintError> {
        let word = random_words
            .first()
            .copied()
            .ok_or(MintError::EmptyRandomness)?;

        // Domain reduction happens here, never inside the resolver.
        let modded_rng = (word % u128::from(MAX_CHANCE)) as u32;
        let breed_index = self.table.resolve(modded_rng)?;
        debug!(modded_rng, breed_index, "breed resolved");

        // Both indexes are in range: resolve() returned a valid table index
        // and the URI list length was validated at construction.
        let breed = &self.table.breeds()[breed_index];
        let token_uri = &self.token_uris[breed_index];

        let token_id = self.registry.mint(&requester).await?;
        self.registry.set_token_uri(token_id, token_uri).await?;

        Ok(MintedAsset {
            token_id,
            owner: requester,
            breed_index,
            breed: breed.name.clone(),
            token_uri: token_uri.clone(),
        })
    }

    /// Sweeps the entire treasury to the owner and resets it to zero.
    ///
    /// All-or-nothing: if the transfer fails the treasury is left untouched.
    #[instrument(skip_all, fields(caller = %caller))]
    pub async fn withdraw(&self, caller: Address) -> Result<TokenAmount, MintError> {
        if caller != self.owner {
            return Err(MintError::Unauthorized);
        }

        let mut state = self.state.lock().await;
        let amount = state.treasury;
        self.funds.transfer(&self.owner, amount).await?;
        state.treasury = 0;

        info!(amount, "treasury swept to owner");
        Ok(amount)
    }
}

#[async_trait]
impl RandomnessConsumer for MintOrchestrator {
    async fn on_randomness_fulfilled(
        &self,
        request_id: RequestId,
        random_words: &[u128],
    ) -> Result<MintedAsset, MintError> {
        MintOrchestrator::on_randomness_fulfilled(self, request_id, random_words).await
    }
}

/* ------------------------------------------------------------------------- */
/*                                 Testing                                   */
/* ------------------------------------------------------------------------- */
