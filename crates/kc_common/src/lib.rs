//! Kennel Chain – common primitives & helpers
//!
//! This crate is the canonical place for *shared* types that are re-exported
//! by every service in the Kennel Chain stack. Keeping them in an isolated
//! crate avoids cyclic dependencies and makes sure we never end up with two
//! incompatible versions of the same `Address` or event type floating around
//! in the dependency graph.
//!
//! The crate purposefully stays *lightweight*: only foundational, non-domain
//! specific abstractions live here. Anything specific to a single service
//! (e.g. the breed table) must go to the respective crate.

#![forbid(unsafe_code)]

pub mod events;
pub mod types;

pub use crate::{
    events::{EventEnvelope, MintEvent},
    types::{Address, KcCommonError, RequestId, TokenAmount, TokenId},
};

/// Wildcard import for convenience.
///
/// Example:
/// ```ignore
/// use kc_common::prelude::*;
/// ```
pub mod prelude {
    pub use super::{Address, EventEnvelope, KcCommonError, MintEvent, RequestId, TokenAmount, TokenId};
}
