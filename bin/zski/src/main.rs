//! # ZSki Binary
//!
//! The entry point that assembles the application from configuration and
//! compile-time features. It owns every backend handle: pools are opened
//! here, handed to the router, and closed here after shutdown.

use std::sync::Arc;

use anyhow::{bail, Context};
use axum::Router;
use configs::{DatabaseBackend, Settings, StorageBackend};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zs_api::{configure_routes, AppState};
use zs_core::traits::{BlobStore, PostRepo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;

    // 1. Initialize Database Implementation
    let repo = connect_repo(&settings).await?;
    repo.ensure_schema().await.context("failed to ensure schema")?;

    // 2. Initialize Storage Implementation
    let store = build_store(&settings).await?;

    // 3. Wrap in AppState (dynamic dispatch over the selected plugins)
    let state = AppState::new(repo.clone(), store);
    let app = serve_local_uploads(configure_routes(state, settings.server.upload_limit_bytes), &settings);

    let listener = TcpListener::bind(settings.server.address()).await?;
    info!("ZSki starting on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.close().await;
    info!("ZSki stopped");
    Ok(())
}

async fn connect_repo(settings: &Settings) -> anyhow::Result<Arc<dyn PostRepo>> {
    let url = settings.database.url.expose_secret();
    let max_connections = settings.database.max_connections;

    let repo: Arc<dyn PostRepo> = match settings.database.backend()? {
        #[cfg(feature = "db-postgres")]
        DatabaseBackend::Postgres => {
            Arc::new(zs_db_postgres::PostgresPostRepo::connect(url, max_connections).await?)
        }
        #[cfg(feature = "db-sqlite")]
        DatabaseBackend::Sqlite => Arc::new(zs_db_sqlite::SqlitePostRepo::connect(url, max_connections).await?),
        #[allow(unreachable_patterns)]
        other => bail!("{other:?} support was not compiled in; rebuild with its cargo feature"),
    };
    Ok(repo)
}

async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn BlobStore>> {
    let storage = &settings.storage;
    info!(backend = ?storage.backend, "selecting blob store");

    let store: Arc<dyn BlobStore> = match storage.backend {
        #[cfg(feature = "storage-inline")]
        StorageBackend::Inline => Arc::new(zs_storage_inline::InlineBlobStore::new()),
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => Arc::new(zs_storage_local::LocalBlobStore::new(
            storage.local.root.clone(),
            storage.local.url_prefix.clone(),
        )),
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let s3 = storage.s3.clone().context("storage.s3 settings missing")?;
            let store = zs_storage_s3::S3BlobStore::connect(zs_storage_s3::S3StoreConfig {
                bucket: s3.bucket,
                region: s3.region,
                endpoint: s3.endpoint,
                public_url: s3.public_url,
            })
            .await;
            if let Err(e) = store.health_check().await {
                tracing::warn!(error = %e, "bucket is not reachable yet");
            }
            Arc::new(store)
        }
        #[allow(unreachable_patterns)]
        other => bail!("{other:?} storage was not compiled in; rebuild with its cargo feature"),
    };
    Ok(store)
}

/// Local uploads are served by the app itself; other backends hand out
/// URLs the browser fetches elsewhere.
fn serve_local_uploads(app: Router, settings: &Settings) -> Router {
    if settings.storage.backend != StorageBackend::Local {
        return app;
    }
    let local = &settings.storage.local;
    app.nest_service(local.mount_path(), ServeDir::new(&local.root))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
