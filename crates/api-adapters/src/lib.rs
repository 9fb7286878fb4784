//! # api-adapters
//!
//! Inbound HTTP surface. Handlers stay thin: extract, call one service
//! method, serialize. All rules live in `services`.

#[cfg(feature = "web-axum")]
pub mod axum;
