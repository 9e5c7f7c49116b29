use anyhow::Context;
use filehost::config::AppConfig;
use filehost::templates::Templates;
use filehost::web::{self, AppState, WebSettings};
use filehost::MySqlStore;
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("failed to load configuration")?;

    info!("Connecting to database...");
    let store = MySqlStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to the database")?;
    store
        .create_schema()
        .await
        .context("failed to create the database schema")?;

    let templates = Templates::load(config.templates.dir.as_deref())?;
    let settings = WebSettings::from(&config);
    tokio::fs::create_dir_all(&settings.files_dir)
        .await
        .with_context(|| format!("failed to create {}", settings.files_dir.display()))?;

    let state = AppState::new(Arc::new(store), templates, settings);
    let app = web::router(state);

    let address = config.address();
    info!("Listening on {address}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
