//! Provisions a staff account in the configured PostgreSQL database.
//!
//! Usage: `seed <email> <password>`

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::Settings;
use secrecy::ExposeSecret;
use services::UserService;
use storage_adapters::PgStore;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        bail!("usage: seed <email> <password>");
    };

    let settings = Settings::load().context("loading settings")?;
    let Some(url) = &settings.database.url else {
        bail!("database.url is not set; nothing to seed");
    };
    let store = PgStore::connect(url.expose_secret(), 1)
        .await
        .context("connecting to PostgreSQL")?;
    store.migrate().await.context("running migrations")?;

    let users = UserService::new(
        Arc::new(store),
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtTokenService::new(
            settings.auth.jwt_secret.expose_secret().as_bytes(),
            chrono::Duration::minutes(settings.auth.token_ttl_minutes),
        )),
    );
    let staff = users
        .create_staff(&email, &password)
        .await
        .context("creating the staff account")?;
    info!(user_id = %staff.id, email = %staff.email, "staff account created");
    Ok(())
}
