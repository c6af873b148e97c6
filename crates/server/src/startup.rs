use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::{AppConfig, IdPolicyConfig, StorageBackend, StorageConfig};
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::person::{IdPolicy, PersonStorage, PersonStore, StorageOptions};
use service::storage::{json_document_store::JsonDocumentStore, seaorm::SeaOrmPersonCollection};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

pub fn storage_options(cfg: &StorageConfig) -> StorageOptions {
    let id_policy = match cfg.id_policy {
        IdPolicyConfig::DocumentCount => IdPolicy::DocumentCount,
        IdPolicyConfig::MaxPlusOne => IdPolicy::MaxPlusOne,
    };
    StorageOptions { op_timeout: Duration::from_secs(cfg.op_timeout_secs), id_policy }
}

/// Open the configured backing collection and wrap it in the storage engine.
///
/// The handle is created once here and handed to the router explicitly.
pub async fn open_store(cfg: &AppConfig) -> Result<Arc<dyn PersonStore>, StartupError> {
    let options = storage_options(&cfg.storage);
    match cfg.storage.backend {
        StorageBackend::Postgres => {
            let db_cfg = models::db::DatabaseConfig::from(&cfg.database);
            let db = models::db::connect_with_config(&db_cfg)
                .await
                .map_err(|e| StartupError::Storage(e.to_string()))?;
            if cfg.database.run_migrations {
                migration::Migrator::up(&db, None)
                    .await
                    .map_err(|e| StartupError::Storage(format!("migration failed: {e}")))?;
                info!("persons migration applied");
            }
            Ok(Arc::new(PersonStorage::new(SeaOrmPersonCollection::new(db), options)))
        }
        StorageBackend::JsonFile => {
            common::env::ensure_data_dir(&cfg.storage.json_path).await?;
            let store = JsonDocumentStore::open(&cfg.storage.json_path)
                .await
                .map_err(|e| StartupError::Storage(e.to_string()))?;
            info!(path = %cfg.storage.json_path, "json document store ready");
            Ok(Arc::new(PersonStorage::new(store, options)))
        }
    }
}

pub fn build_app(persons: Arc<dyn PersonStore>) -> Router {
    routes::build_router(AppState::new(persons), build_cors())
}

/// Public entry: load config, open storage, build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    info!(
        backend = ?cfg.storage.backend,
        id_policy = ?cfg.storage.id_policy,
        op_timeout_secs = cfg.storage.op_timeout_secs,
        "configuration loaded"
    );

    let persons = open_store(&cfg).await?;
    let app = build_app(persons);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting person registry");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
