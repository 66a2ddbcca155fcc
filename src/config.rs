use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Settings for the shared "most recent session" token slot.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenCacheConfig {
    pub url: String,
    pub key: String,
    pub ttl_seconds: u64,
    /// When set, a cached token takes priority over the request's own bearer header.
    pub override_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub token_cache: TokenCacheConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "usergate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "usergate-users".into()),
        };
        let token_cache = TokenCacheConfig {
            url: std::env::var("TOKEN_CACHE_URL").unwrap_or_else(|_| database_url.clone()),
            key: std::env::var("TOKEN_CACHE_KEY").unwrap_or_else(|_| "session:active".into()),
            ttl_seconds: parse_or("TOKEN_CACHE_TTL_SECONDS", 120),
            override_enabled: std::env::var("TOKEN_CACHE_OVERRIDE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };
        let endpoint = std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?;
        let storage = StorageConfig {
            public_url: std::env::var("MINIO_PUBLIC_URL").unwrap_or_else(|_| endpoint.clone()),
            endpoint,
            bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
            access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };
        let rate_limit = RateLimitConfig {
            max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 100),
            window_seconds: parse_or("RATE_LIMIT_WINDOW_SECONDS", 5 * 60),
        };
        Ok(Self {
            database_url,
            jwt,
            token_cache,
            storage,
            rate_limit,
        })
    }
}

fn parse_or(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
