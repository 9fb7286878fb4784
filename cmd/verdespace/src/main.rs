//! # Verdespace server
//!
//! Assembles the application from the adapters selected at compile time
//! and the settings loaded at startup.

#[cfg(not(feature = "web-axum"))]
compile_error!("the server needs an HTTP adapter; enable `web-axum`");
#[cfg(not(feature = "auth-jwt"))]
compile_error!("the server needs a token service; enable `auth-jwt`");

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::axum::{router, AppState};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::{LogSettings, MediaBackend, Settings};
use domains::{
    CommentRepository, MediaStorage, Notifier, PlantImageRepository, PlantRepository,
    RatingRepository, UserRepository, WishListRepository,
};
use secrecy::ExposeSecret;
use services::{Ports, ReplyLimits, Services, UploadPolicy};
use storage_adapters::{LocalMediaStorage, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    let repos = repositories(&settings).await?;
    let (media, local_media) = media_storage(&settings).await?;

    let ports = Ports {
        plants: repos.plants,
        images: repos.images,
        comments: repos.comments,
        wishlists: repos.wishlists,
        ratings: repos.ratings,
        users: repos.users,
        media,
        notifier: notifier(&settings)?,
        hasher: Arc::new(Argon2Hasher::new()),
        tokens: Arc::new(JwtTokenService::new(
            settings.auth.jwt_secret.expose_secret().as_bytes(),
            chrono::Duration::minutes(settings.auth.token_ttl_minutes),
        )),
    };
    let policy = UploadPolicy {
        max_bytes: settings.media.max_upload_bytes,
        url_ttl: Duration::from_secs(settings.media.url_ttl_secs),
    };
    let limits = ReplyLimits {
        max_depth: settings.comments.max_depth,
        per_node: settings.comments.replies_per_node,
    };

    let services = Services::new(ports, policy, limits);
    bootstrap_staff(&settings, &services).await?;

    let mut state = AppState::new(services);
    if let Some(local) = local_media {
        state = state.with_local_media(local);
    }

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "verdespace listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("verdespace stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

struct Repositories {
    plants: Arc<dyn PlantRepository>,
    images: Arc<dyn PlantImageRepository>,
    comments: Arc<dyn CommentRepository>,
    wishlists: Arc<dyn WishListRepository>,
    ratings: Arc<dyn RatingRepository>,
    users: Arc<dyn UserRepository>,
}

impl Repositories {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PlantRepository
            + PlantImageRepository
            + CommentRepository
            + WishListRepository
            + RatingRepository
            + UserRepository
            + 'static,
    {
        Self {
            plants: store.clone(),
            images: store.clone(),
            comments: store.clone(),
            wishlists: store.clone(),
            ratings: store.clone(),
            users: store,
        }
    }
}

async fn repositories(settings: &Settings) -> anyhow::Result<Repositories> {
    #[cfg(feature = "db-postgres")]
    if let Some(url) = &settings.database.url {
        let store = storage_adapters::PgStore::connect(
            url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("connecting to PostgreSQL")?;
        store.migrate().await.context("running migrations")?;
        info!("using PostgreSQL store");
        return Ok(Repositories::from_store(Arc::new(store)));
    }

    if settings.database.url.is_some() {
        warn!("database.url is set but this build has no PostgreSQL support");
    }
    warn!("using the in-memory store; data is lost on restart");
    Ok(Repositories::from_store(Arc::new(MemoryStore::new())))
}

async fn media_storage(
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn MediaStorage>, Option<Arc<LocalMediaStorage>>)> {
    let media = &settings.media;
    match media.backend {
        MediaBackend::Local => {
            let local = Arc::new(LocalMediaStorage::new(
                PathBuf::from(&media.root),
                media.url_prefix.clone(),
                media.signing_key.expose_secret().as_bytes(),
            ));
            info!(root = %media.root, "using local media storage");
            Ok((local.clone(), Some(local)))
        }
        #[cfg(feature = "media-s3")]
        MediaBackend::S3 => {
            let bucket = media.s3_bucket.clone().unwrap_or_default();
            info!(%bucket, "using S3 media storage");
            let s3 = storage_adapters::S3MediaStorage::from_env(bucket, media.s3_region.clone()).await;
            Ok((Arc::new(s3), None))
        }
        #[cfg(not(feature = "media-s3"))]
        MediaBackend::S3 => anyhow::bail!("media.backend = \"s3\" needs the `media-s3` feature"),
    }
}

/// Without `seed` (PostgreSQL only) this is how staff accounts exist in
/// the in-memory mode.
async fn bootstrap_staff(settings: &Settings, services: &Services) -> anyhow::Result<()> {
    let Some((email, password)) = settings.bootstrap.staff() else {
        return Ok(());
    };
    match services
        .users
        .ensure_staff(email, password.expose_secret())
        .await
        .context("provisioning the bootstrap staff account")?
    {
        Some(staff) => info!(user_id = %staff.id, "bootstrap staff account created"),
        None => info!("bootstrap staff account already exists"),
    }
    Ok(())
}

fn notifier(settings: &Settings) -> anyhow::Result<Arc<dyn Notifier>> {
    #[cfg(feature = "notify-telegram")]
    if let Some((token, chat_id)) = settings.notify.telegram() {
        let telegram = notify_adapters::TelegramNotifier::new(token.expose_secret(), chat_id)
            .context("building the Telegram client")?;
        info!("plant notifications go to Telegram");
        return Ok(Arc::new(telegram));
    }

    if settings.notify.telegram().is_some() {
        warn!("Telegram is configured but this build lacks `notify-telegram`");
    }
    Ok(Arc::new(notify_adapters::LogNotifier))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
