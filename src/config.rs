use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub db_connect_attempts: u32,
    pub db_connect_retry_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "5000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let db_host = std::env::var("DB_HOST").unwrap_or_else(|_| "db".to_string());
            let db_user = std::env::var("DB_USER").unwrap_or_else(|_| "appuser".to_string());
            let db_pass = std::env::var("DB_PASS").unwrap_or_else(|_| "apppass".to_string());
            let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| "CineVault".to_string());
            format!("mysql://{db_user}:{db_pass}@{db_host}/{db_name}")
        });

        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "change-me-to-a-secure-random-value".to_string());

        let token_ttl_secs: i64 =
            std::env::var("TOKEN_TTL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(900);

        let db_connect_attempts: u32 =
            std::env::var("DB_CONNECT_ATTEMPTS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let db_connect_retry_ms: u64 =
            std::env::var("DB_CONNECT_RETRY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(2000);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            jwt_secret,
            token_ttl_secs,
            db_connect_attempts,
            db_connect_retry_ms,
        })
    }
}
