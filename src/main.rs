use keel_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = keel_api::config::config();
    tracing::info!("Starting keel-api in {:?} mode", config.environment);

    let state = AppState::from_config().expect("failed to build application state");
    let app = keel_api::app(state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("keel-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
