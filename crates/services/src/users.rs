//! Accounts: registration, login and staff provisioning.

use std::sync::Arc;

use domains::{
    Actor, DomainError, DomainResult, IssuedToken, PasswordHasher, TokenService, User,
    UserRepository,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::views::UserView;

const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Trims the address and lower-cases its domain part.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim();
    let (local, domain) = email
        .rsplit_once('@')
        .filter(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .ok_or_else(|| DomainError::validation("email", "Enter a valid email address."))?;
    Ok(format!("{local}@{}", domain.to_lowercase()))
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    #[instrument(skip_all)]
    pub async fn register(&self, input: Registration) -> DomainResult<UserView> {
        let user = self.create(input, false).await?;
        Ok(UserView::from(&user))
    }

    /// Superuser equivalent, used by the seed binary.
    #[instrument(skip_all)]
    pub async fn create_staff(&self, email: &str, password: &str) -> DomainResult<UserView> {
        let input = Registration {
            email: email.to_string(),
            password: password.to_string(),
            username: None,
        };
        let user = self.create(input, true).await?;
        Ok(UserView::from(&user))
    }

    /// Creates the staff account unless the email is already registered.
    /// Returns `None` when nothing was created. An existing account is
    /// left as it is, staff or not.
    #[instrument(skip_all)]
    pub async fn ensure_staff(&self, email: &str, password: &str) -> DomainResult<Option<UserView>> {
        let normalized = normalize_email(email)?;
        if let Some(existing) = self.users.find_by_email(&normalized).await? {
            if !existing.is_staff {
                warn!(user_id = %existing.id, "bootstrap email belongs to a regular account");
            }
            return Ok(None);
        }
        self.create_staff(email, password).await.map(Some)
    }

    async fn create(&self, input: Registration, is_staff: bool) -> DomainResult<User> {
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(DomainError::validation(
                "password",
                format!("This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."),
            ));
        }
        let username = input
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| email.clone());

        let user = User {
            id: Uuid::new_v4(),
            email,
            username,
            password_hash: self.hasher.hash(&input.password)?,
            is_staff,
            created_at: chrono::Utc::now(),
        };
        if !self.users.insert(&user).await? {
            return Err(DomainError::validation("email", "A user with this email address or username already exists."));
        }
        info!(user_id = %user.id, is_staff, "user registered");
        Ok(user)
    }

    /// Exchanges credentials for a bearer token. Unknown email and wrong
    /// password are indistinguishable to the caller.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: Credentials) -> DomainResult<IssuedToken> {
        let email = normalize_email(&credentials.email).map_err(|_| DomainError::Unauthenticated)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|u| self.hasher.verify(&credentials.password, &u.password_hash))
            .ok_or(DomainError::Unauthenticated)?;
        self.tokens.issue(&Actor::from(&user))
    }

    /// Resolves a bearer token to the identity behind it.
    pub fn authenticate(&self, token: &str) -> DomainResult<Actor> {
        self.tokens.verify(token)
    }
}
