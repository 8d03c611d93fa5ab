use pack_planner::api;
use pack_planner::config::AppConfig;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    // .env may set RUST_LOG, so load it before the subscriber reads the filter.
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    info!("Pack planner service starting...");
    api::start_api_server(app_config).await;
}
