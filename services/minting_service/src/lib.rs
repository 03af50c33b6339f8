//! Kennel Chain – minting service
//!
//! Mints weighted-random breed NFTs against an external randomness provider.
//! A caller pays the flat mint fee, the service issues a randomness request
//! and remembers the requester; when the provider's fulfillment callback
//! arrives, the first random word is reduced into `[0, 100)` and mapped onto
//! the collection's cumulative-weight breed table, and the resolved breed is
//! minted to the original requester with its pre-published metadata URI.
//!
//! The crate is transport-agnostic: all infrastructure (randomness provider,
//! asset registry, payout rail, metadata store) is reached through async port
//! traits, with in-memory implementations for development and tests.

#![forbid(unsafe_code)]

pub mod config;
pub mod logic;
pub mod registry;
pub mod vrf_coordinator;

pub use crate::{
    config::MintingConfig,
    logic::{
        AssetRegistry, Breed, BreedTable, BreedTableError, CollectionSpec, FundsGateway,
        LedgerError, MintError, MintOrchestrator, MintedAsset, RandomnessConsumer,
        RandomnessRequest, RandomnessSource, RequestLedger, MAX_CHANCE,
    },
    registry::InMemoryAssetRegistry,
    vrf_coordinator::MockVrfCoordinator,
};
