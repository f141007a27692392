use mock_server::{AppState, Store};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            mock_server::log_filter(std::env::var("RUST_LOG").ok()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let mut state = AppState::new(Store::default());
    if let Ok(token) = std::env::var("MOCK_API_TOKEN") {
        tracing::info!("bearer token required outside public/");
        state = state.with_token(&token);
    }

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    mock_server::run_with(listener, state).await
}
