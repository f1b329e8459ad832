use std::sync::Arc;

use cinevault::{AppState, auth::TokenKeys, catalog::Catalog, config::Config, db, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinevault=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_with_retry(&config).await?;
    let catalog = Catalog::new(db);
    catalog.ensure_reference_rows().await?;

    let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl_secs);
    let state = Arc::new(AppState { config: config.clone(), catalog, tokens });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
