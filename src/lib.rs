pub mod action;
pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod presenter;
pub mod seed;
pub mod store;

pub use action::{ActionHandler, ActionKind};
pub use api::routes;
pub use error::{ActionError, DatastoreError, MissingPermission};
pub use model::*;
pub use presenter::PresenterHandler;
pub use store::{Datastore, InMemoryStore, PostgresStore, Transaction};

use std::sync::Arc;

use crate::config::{AppConfig, DatastoreBackend};

/// Open the configured datastore, running migrations for Postgres
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Datastore>> {
    match config.datastore.backend {
        DatastoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        DatastoreBackend::Postgres => {
            let store =
                PostgresStore::new(&config.database_url(), config.max_connections()).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

/// Start the HTTP server with configuration from the environment
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = AppConfig::load()?;
    let store = open_store(&config).await?;

    let state = Arc::new(api::AppState::new(store));
    let app = routes::create_router().with_state(state);

    let listener = TcpListener::bind(&config.server_address()).await?;
    serve(listener, app).await?;

    Ok(())
}
