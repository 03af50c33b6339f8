//! Configuration management for the Kennel Chain minting service.
//!
//! All runtime behaviour can be tuned through a hierarchical, multi-source
//! configuration system backed by the `config` crate.
//!
//! Priority (lowest → highest):
//! 1. Compile-time defaults (`impl Default`).
//! 2. An optional TOML/YAML/JSON file passed at start-up.
//! 3. Environment variables with `KENNEL` prefix.
//!
//!     KENNEL__COLLECTION__MINT_FEE_WEI=20000000000000000   # double underscore = path separator
//!
//! Unlike a long-running node, the minting service is embedded as a library,
//! so [`load`] returns an owned handle instead of freezing a global
//! singleton.

use std::path::Path;

use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use kc_common::{Address, TokenAmount};

use crate::logic::{Breed, CollectionSpec, RandomnessRequest, MAX_CHANCE};

/// Loads the layered configuration and validates it.
///
/// `config_path` – an optional explicit path to a configuration file. If
/// `None`, the loader will attempt to read `minting.{toml,yaml,json}` from
/// the current working directory.
pub fn load(config_path: Option<impl AsRef<Path>>) -> Result<MintingConfig, ConfigError> {
    let mut builder = Config::builder()
        // at least one call to `set_default` so the root table is non-empty
        .set_default("dummy", "purge_later")?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path.as_ref()).required(true));
    } else {
        for ext in ["toml", "yaml", "json"] {
            let file_name = format!("minting.{ext}");
            if Path::new(&file_name).exists() {
                builder = builder.add_source(File::with_name(&file_name).required(false));
                break;
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("KENNEL")
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
    );

    let configuration = builder.build()?;
    let mut cfg: MintingConfig = configuration.try_deserialize()?;

    cfg.apply_fallbacks();
    cfg.validate().map_err(ConfigError::Message)?;

    Ok(cfg)
}

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MintingConfig {
    pub service: ServiceConfig,
    pub collection: CollectionConfig,
    pub vrf: VrfConfig,
}

impl MintingConfig {
    /// Validate internal consistency and invariants.
    ///
    /// Prefer returning an error over silently fixing things at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.collection.owner.is_zero() {
            return Err("collection.owner must be configured".into());
        }

        if self.collection.mint_fee_wei == 0 {
            return Err("collection.mint_fee_wei must be > 0".into());
        }

        if self.collection.breeds.is_empty() {
            return Err("collection.breeds must not be empty".into());
        }

        let total: u32 = self.collection.breeds.iter().map(|b| b.weight).sum();
        if total != MAX_CHANCE {
            return Err(format!(
                "collection.breeds weights sum to {total}, expected {MAX_CHANCE}"
            ));
        }

        if self.collection.token_uris.len() != self.collection.breeds.len() {
            return Err(format!(
                "collection.token_uris has {} entries for {} breeds",
                self.collection.token_uris.len(),
                self.collection.breeds.len()
            ));
        }

        if self.vrf.num_words == 0 {
            return Err("vrf.num_words must be >= 1".into());
        }

        Ok(())
    }

    /// Fill in fallback values that require runtime computation.
    fn apply_fallbacks(&mut self) {
        // Generate a random 6-byte instance id if not specified by the user.
        if self.service.instance_id.is_empty() {
            let id: [u8; 6] = rand::random();
            self.service.instance_id = hex::encode(id);
        }
    }

    /// The static collection description consumed by the orchestrator.
    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec {
            owner: self.collection.owner,
            mint_fee: TokenAmount::from(self.collection.mint_fee_wei),
            breeds: self
                .collection
                .breeds
                .iter()
                .map(|b| Breed::new(b.name.clone(), b.weight))
                .collect(),
            token_uris: self.collection.token_uris.clone(),
        }
    }

    /// The per-request parameters forwarded to the randomness provider.
    pub fn randomness_request(&self) -> RandomnessRequest {
        RandomnessRequest {
            gas_lane: self.vrf.gas_lane.clone(),
            subscription_id: self.vrf.subscription_id,
            request_confirmations: self.vrf.request_confirmations,
            callback_gas_limit: self.vrf.callback_gas_limit,
            num_words: self.vrf.num_words,
        }
    }

    /// `(breed, image)` pairs for regenerating token URIs through the
    /// metadata publisher; `None` unless every breed has an image configured.
    pub fn breeds_with_images(&self) -> Option<Vec<(Breed, String)>> {
        self.collection
            .breeds
            .iter()
            .map(|b| {
                b.image_uri
                    .clone()
                    .map(|image| (Breed::new(b.name.clone(), b.weight), image))
            })
            .collect()
    }
}

/// Metadata & housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name – appears in logs & metrics.
    pub name: String,
    /// Unique instance identifier – auto-generated unless provided.
    pub instance_id: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "kennel-minting".into(),
            instance_id: String::new(),
        }
    }
}

/// The collection being minted: owner, fee and the weighted breed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Address allowed to sweep the treasury.
    pub owner: Address,
    /// Flat mint fee in wei.
    pub mint_fee_wei: u64,
    /// Ordered breed table; weights must sum to 100.
    pub breeds: Vec<BreedConfig>,
    /// One metadata URI per breed, in table order.
    pub token_uris: Vec<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            owner: Address::zero(),
            // 0.01 ETH
            mint_fee_wei: 10_000_000_000_000_000,
            breeds: vec![
                BreedConfig::new("Pug", 10),
                BreedConfig::new("Shiba Inu", 20),
                BreedConfig::new("St. Bernard", 70),
            ],
            token_uris: vec![
                "ipfs://QmaVkBn2tKmjbhphU7eyztbvSQU5EXDdqRyXZtRhSGgJGo".into(),
                "ipfs://QmYQC5aGZu2PTH8XzbJrbDnvhj3gVs7ya33H9mqUNvST3d".into(),
                "ipfs://QmZYmH5iDbD6v3U2ixoVAjioSzvWJszDzYdbeCLquGSpVm".into(),
            ],
        }
    }
}

/// A configured breed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreedConfig {
    pub name: String,
    pub weight: u32,
    /// Image to embed when regenerating metadata documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl BreedConfig {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
            image_uri: None,
        }
    }
}

/// Randomness provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VrfConfig {
    /// Key hash selecting the gas lane.
    pub gas_lane: String,
    /// Funded subscription id.
    pub subscription_id: u64,
    /// Confirmations before fulfillment.
    pub request_confirmations: u16,
    /// Gas ceiling for the fulfillment callback.
    pub callback_gas_limit: u32,
    /// Words per fulfillment; the orchestrator consumes element 0.
    pub num_words: u32,
}

impl Default for VrfConfig {
    fn default() -> Self {
        Self {
            gas_lane: "0x474e34a077df58807dbe9c96d3c009b23b3c6d0cce433e59bbf5b34f823bc56c"
                .into(),
            subscription_id: 1,
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::BreedTable;

    fn configured() -> MintingConfig {
        let mut cfg = MintingConfig::default();
        cfg.collection.owner = "0x00112233445566778899aabbccddeeff00112233"
            .parse()
            .unwrap();
        cfg
    }

    #[test]
    fn default_config_requires_an_owner() {
        let err = MintingConfig::default().validate().unwrap_err();
        assert!(err.contains("owner"));
    }

    #[test]
    fn configured_defaults_validate() {
        configured().validate().unwrap();
    }

    #[test]
    fn rejects_weights_not_summing_to_hundred() {
        let mut cfg = configured();
        cfg.collection.breeds[0].weight = 11;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("sum to 101"));
    }

    #[test]
    fn rejects_uri_count_mismatch() {
        let mut cfg = configured();
        let _ = cfg.collection.token_uris.pop();
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("entries for"));
    }

    #[test]
    fn collection_spec_builds_a_valid_breed_table() {
        let spec = configured().collection_spec();
        assert_eq!(spec.mint_fee, 10_000_000_000_000_000);
        let table = BreedTable::new(spec.breeds).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn breeds_with_images_requires_every_image() {
        let mut cfg = configured();
        assert!(cfg.breeds_with_images().is_none());

        for breed in &mut cfg.collection.breeds {
            breed.image_uri = Some(format!("ipfs://img-{}", breed.name));
        }
        let pairs = cfg.breeds_with_images().unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].1, "ipfs://img-Pug");
    }
}
