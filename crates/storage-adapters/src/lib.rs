//! # storage-adapters
//!
//! Implementations of the repository and media ports from `domains`.
//!
//! - `memory`: DashMap-backed store, always compiled; used by tests and the
//!   default binary profile.
//! - `postgres`: sqlx/PostgreSQL, behind `db-postgres`.
//! - `media`: signed local filesystem storage, plus S3 behind `media-s3`.

pub mod media;
pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use media::LocalMediaStorage;
#[cfg(feature = "media-s3")]
pub use media::S3MediaStorage;
pub use memory::{MemoryMediaStorage, MemoryStore};
#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
