//! Wallet Registry Storage Layer
//!
//! Durable storage for registered wallet addresses.
//!
//! # Architecture
//!
//! - **PostgreSQL** (`PgWalletStore`): production store. The
//!   `(user_id, address_normalized, chain_namespace)` uniqueness rule and the
//!   one-primary-per-user rule are enforced by indexes.
//! - **In-memory** (`MemoryWalletStore`): tests and local development. Mirrors
//!   the Postgres constraints so both backends fail the same way.
//!
//! # Transactions
//!
//! Every mutation runs inside a [`WalletTransaction`] scoped to a single user.
//! Opening one takes a per-user lock that is held until commit or rollback, so
//! mutations for the same user are serialized while different users proceed
//! independently.

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use memory::MemoryWalletStore;
pub use models::{NewWalletRecord, WalletRecord};
pub use postgres::PgWalletStore;
pub use store::{WalletStore, WalletTransaction};
