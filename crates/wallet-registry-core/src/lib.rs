//! Wallet Registry Core
//!
//! Maintains the set of blockchain addresses each user has registered and the
//! rule that exactly one of them (when any exist) is the user's primary wallet.
//!
//! # Layout
//!
//! - [`selector`]: pure, deterministic choice of the row that carries the
//!   primary flag
//! - [`verifier`]: invariant checks over a snapshot of a user's rows
//! - [`service`]: [`WalletMutationService`], which runs every mutation in a
//!   single per-user transaction with bounded retries
//! - [`normalize`]: format checks and normalization of caller input
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wallet_registry_core::{RegistryConfig, WalletMutationService};
//! use wallet_registry_db::MemoryWalletStore;
//!
//! let service = WalletMutationService::new(
//!     Arc::new(MemoryWalletStore::new()),
//!     RegistryConfig::default(),
//! );
//! let wallet = service.add_wallet(user_id, "0xABC", "eip155:1", None).await?;
//! assert!(wallet.is_primary);
//! ```

pub mod config;
pub mod error;
pub mod normalize;
pub mod selector;
pub mod service;
pub mod verifier;

pub use config::{RegistryConfig, RetryConfig};
pub use error::{RegistryError, RegistryResult};
pub use selector::{select_reassignment_candidate, select_representative, DEFAULT_NAMESPACE};
pub use service::{RemovalOutcome, WalletMutationService};
pub use verifier::{verify_rows, InvariantVerifier, InvariantViolation};

pub use wallet_registry_db::WalletRecord;
