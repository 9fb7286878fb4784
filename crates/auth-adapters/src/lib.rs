//! # auth-adapters
//!
//! Credential handling behind the `PasswordHasher` and `TokenService` ports.
//!
//! - `password`: Argon2id hashing, always compiled.
//! - `jwt`: HS256 bearer tokens, behind `auth-jwt`.

pub mod password;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokenService;
