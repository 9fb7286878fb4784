//! Object storage backends.

pub mod local;
#[cfg(feature = "media-s3")]
pub mod s3;

pub use local::LocalMediaStorage;
#[cfg(feature = "media-s3")]
pub use s3::S3MediaStorage;
