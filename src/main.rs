use axum::serve;
use meeting_actions::api::{routes::create_router, AppState};
use meeting_actions::config::AppConfig;
use meeting_actions::{open_store, seed};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .parse_default_env()
        .init();

    println!("Meeting action service");

    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}, datastore={:?}",
        config.server.host, config.server.port, config.datastore.backend
    );

    let store = open_store(&config).await?;

    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading seed data...");
        seed::load_seed_data(store.as_ref()).await?;
        println!("Seed data loaded successfully");
    }

    let state = Arc::new(AppState::new(store));
    let app = create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Action service running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
