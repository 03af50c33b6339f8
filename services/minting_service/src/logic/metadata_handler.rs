//! Building, validating and publishing breed metadata.
//!
//! Each breed in a collection is described by one ERC721-style JSON document
//! pinned to a content-addressable store; the orchestrator later hands out
//! the resulting URI for every asset minted into that breed. The handler is
//! decoupled from any concrete backend (IPFS/Pinata, Arweave, S3) through the
//! pluggable [`MetadataStore`] trait, so integrators can swap the persistence
//! layer without touching the minting logic.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    num::NonZeroUsize,
    sync::Arc,
};

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::breed_table::Breed;

/// URI returned by a [`MetadataStore`] implementation.
///
/// SHOULD be content-addressable (e.g. `ipfs://<cid>`), but this is not
/// enforced by the interface.
pub type MetadataUri = String;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata validation failed: {0}")]
    Validation(String),

    #[error("failed to serialize metadata to JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("persistence layer error: {0}")]
    Store(String),
}

/// Generic, async persistence layer for breed metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persists raw JSON and returns its URI once available on the network.
    async fn put(&self, json: &[u8]) -> Result<MetadataUri, MetadataError>;
}

/// ERC721-compatible attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: u32,
}

/// Canonical per-breed metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreedMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
}

impl BreedMetadata {
    /// Builds the stock document for a breed: name, the standard description
    /// line and a single "Cuteness" trait.
    pub fn for_breed(breed: &Breed, image_uri: &str) -> Self {
        Self {
            name: breed.name.clone(),
            description: format!("An adorable {} pup!", breed.name),
            image: image_uri.to_string(),
            attributes: vec![Attribute {
                trait_type: "Cuteness".into(),
                value: 100,
            }],
        }
    }
}

fn validate_metadata(meta: &BreedMetadata) -> Result<(), MetadataError> {
    if meta.name.trim().is_empty() {
        return Err(MetadataError::Validation("name is mandatory".into()));
    }
    if meta.image.trim().is_empty() {
        return Err(MetadataError::Validation("image URI is mandatory".into()));
    }
    Ok(())
}

/// Computes a hex-encoded SHA-256 digest for diagnostic purposes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Container for building, caching and persisting breed metadata.
pub struct MetadataPublisher {
    store: Arc<dyn MetadataStore>,
    cache: Mutex<LruCache<u64, MetadataUri>>,
}

impl MetadataPublisher {
    /// `cache_size` bounds how many published documents are memoised
    /// in-memory; re-publishing an identical document returns the cached URI
    /// instead of re-uploading.
    pub fn new(store: Arc<dyn MetadataStore>, cache_size: NonZeroUsize) -> Self {
        Self {
            store,
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    fn cache_key(meta: &BreedMetadata) -> u64 {
        let mut hasher = DefaultHasher::new();
        meta.hash(&mut hasher);
        hasher.finish()
    }

    /// Validates, serialises and persists one document, returning its URI.
    pub async fn publish(&self, meta: BreedMetadata) -> Result<MetadataUri, MetadataError> {
        validate_metadata(&meta)?;

        let key = Self::cache_key(&meta);
        {
            let mut cache = self.cache.lock().await;
            if let Some(uri) = cache.get(&key) {
                return Ok(uri.clone());
            }
        }

        let json_blob = serde_json::to_vec(&meta)?;
        debug!(name = %meta.name, digest = %sha256_hex(&json_blob), "uploading breed metadata");

        let uri = self.store.put(&json_blob).await?;

        {
            let mut cache = self.cache.lock().await;
            let _ = cache.put(key, uri.clone());
        }

        Ok(uri)
    }

    /// Publishes one document per `(breed, image)` pair and returns the URIs
    /// in table order, ready to be handed to the orchestrator.
    pub async fn prepare_token_uris(
        &self,
        breeds: &[(Breed, String)],
    ) -> Result<Vec<MetadataUri>, MetadataError> {
        let mut uris = Vec::with_capacity(breeds.len());
        for (breed, image_uri) in breeds {
            let uri = self
                .publish(BreedMetadata::for_breed(breed, image_uri))
                .await?;
            uris.push(uri);
        }
        info!(count = uris.len(), "token URIs uploaded");
        Ok(uris)
    }
}
