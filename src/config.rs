/// Configuration management for Blog Service
///
/// This module handles loading and managing configuration from environment variables.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Page cache configuration
    pub cache: CacheConfig,
    /// Token authentication configuration
    pub auth: AuthConfig,
    /// Uploaded media configuration
    pub media: MediaConfig,
    /// Feed listing configuration
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Number of HTTP workers
    pub workers: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL; the in-process cache is used when unset
    pub url: Option<String>,
    /// Lifetime of a cached index page
    pub index_ttl_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub login_url: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("login_url", &self.login_url)
            .finish()
    }
}

/// Uploaded media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding uploaded files
    pub root: String,
    /// URL prefix the files are served under
    pub url: String,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub posts_per_page: i64,
}

const DEV_JWT_SECRET: &str = "development-only-secret-change-me-please";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("BLOG_SERVICE_PORT", 8000)?,
                workers: parse_env_or_default("HTTP_WORKERS", 4)?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/blog".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_env_or_default("DATABASE_RUN_MIGRATIONS", true)?,
            },
            cache: CacheConfig {
                url: std::env::var("REDIS_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty()),
                index_ttl_secs: parse_env_or_default("INDEX_CACHE_TTL_SECS", 20)?,
            },
            auth: {
                let jwt_secret = match std::env::var("JWT_SECRET") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("JWT_SECRET must be set in production".to_string())
                    }
                    Err(_) => DEV_JWT_SECRET.to_string(),
                };

                if production && jwt_secret.len() < 32 {
                    return Err("JWT_SECRET must be at least 32 bytes in production".to_string());
                }

                AuthConfig {
                    jwt_secret,
                    token_ttl_secs: parse_env_or_default("JWT_TTL_SECS", 86_400)?,
                    login_url: std::env::var("LOGIN_URL")
                        .unwrap_or_else(|_| "/auth/login/".to_string()),
                }
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()),
                url: std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()),
                max_upload_bytes: parse_env_or_default("MEDIA_MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            },
            feed: FeedConfig {
                posts_per_page: {
                    let per_page: i64 = parse_env_or_default("POSTS_PER_PAGE", 10)?;
                    if per_page < 1 {
                        return Err("POSTS_PER_PAGE must be a positive integer".to_string());
                    }
                    per_page
                },
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
