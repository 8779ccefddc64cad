use inkwire_server::{ServerConfig, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwire_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    inkwire_server::run(config).await
}
