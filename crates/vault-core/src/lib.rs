//! Core library for Vault AI collectible vaults.
//!
//! Holds the persisted data model ([`CollectibleItem`]), the local store
//! abstraction ([`VaultStore`]) with its SQLite backend, one-time migration
//! from the legacy flat-blob format, and aggregate reporting over store
//! snapshots. Remote identification/appraisal lives in `vault-appraise`;
//! the UI layer orchestrates the two.

pub mod category;
pub mod item;
pub mod migration;
pub mod reports;
pub mod sqlite_store;
pub mod store;

pub use category::*;
pub use item::*;
pub use migration::*;
pub use reports::*;
pub use sqlite_store::SqliteVaultStore;
pub use store::*;
