//! Domain events emitted by the minting pipeline.
//!
//! Events live in the common crate so that observers (UIs, indexers, tests)
//! can subscribe without depending on the minting service internals. They are
//! broadcast fire-and-forget; a slow or absent subscriber never blocks a
//! state transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Address, RequestId, TokenId};

/// Everything the outside world may learn about a mint lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MintEvent {
    /// A mint was paid for and a randomness request is in flight.
    NftRequested {
        request_id: RequestId,
        requester: Address,
    },

    /// Randomness arrived and the asset was minted.
    NftMinted {
        token_id: TokenId,
        breed: String,
        owner: Address,
    },
}

/// A [`MintEvent`] stamped with its emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Emission timestamp (UTC).
    pub at: DateTime<Utc>,
    /// The event payload.
    pub event: MintEvent,
}

impl EventEnvelope {
    /// Wraps an event with the current wall-clock time.
    pub fn now(event: MintEvent) -> Self {
        Self {
            at: Utc::now(),
            event,
        }
    }
}
