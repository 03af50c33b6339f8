//! In-memory asset registry.
//!
//! Development/test implementation of the [`AssetRegistry`] port: token ids
//! are handed out sequentially from `#0` and never reused, and each token
//! carries an owner and an optional metadata URI. Production deployments
//! replace this with a client for the on-chain registry.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use kc_common::{Address, TokenId};

use crate::logic::{AssetRegistry, RegistryError};

#[derive(Debug, Default)]
struct RegistryState {
    next_token_id: u64,
    owners: HashMap<TokenId, Address>,
    token_uris: HashMap<TokenId, String>,
}

/// Thread-safe in-memory registry.
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.state.read().owners.get(&token_id).copied()
    }

    pub fn token_uri(&self, token_id: TokenId) -> Option<String> {
        self.state.read().token_uris.get(&token_id).cloned()
    }

    /// Total number of tokens minted so far.
    pub fn total_supply(&self) -> u64 {
        self.state.read().next_token_id
    }
}

#[async_trait]
impl AssetRegistry for InMemoryAssetRegistry {
    async fn mint(&self, owner: &Address) -> Result<TokenId, RegistryError> {
        let mut state = self.state.write();
        let token_id = TokenId(state.next_token_id);
        state.next_token_id += 1;
        let _ = state.owners.insert(token_id, *owner);

        debug!(%token_id, %owner, "token minted");
        Ok(token_id)
    }

    async fn set_token_uri(&self, token_id: TokenId, uri: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if !state.owners.contains_key(&token_id) {
            return Err(RegistryError::new(format!(
                "token {token_id} does not exist"
            )));
        }
        let _ = state.token_uris.insert(token_id, uri.to_string());
        Ok(())
    }
}
