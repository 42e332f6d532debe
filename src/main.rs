use dynaform::adapters::health_handler::HealthHandler;
use dynaform::config::Settings;
use dynaform::engine::FormEngine;
use dynaform::persistence::DataStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let settings = Settings::new()?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Dynaform on {}:{}", host, port);

    // Connect to the metadata database
    let store = DataStore::new(&settings.database).await?;
    info!("Connected to {} database", store.backend().name());

    if settings.database.auto_migrate {
        let result = store.migrate().await?;
        info!(
            "Migrations complete: {} applied, {} skipped",
            result.applied, result.skipped
        );
    }

    let engine = FormEngine::from_store(&store, settings.forms.table_prefix.clone());
    let health_handler = Arc::new(HealthHandler::new(store.clone()));

    // Create application using the library function
    let app = dynaform::create_app(engine, health_handler, settings.auth.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    store.close().await;
    Ok(())
}
