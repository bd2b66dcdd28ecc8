use land_options::ledger::open_ledger;
use land_options::orchestration::ConversionService;
use land_options::{api, config::Config};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    let ledger = match open_ledger(&config).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    let service = Arc::new(ConversionService::new(ledger, config.rounding_policy));
    tracing::info!(policy = ?config.rounding_policy, "conversion service ready");

    let app = api::create_router(api::AppState::new(service, config));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
