use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// When unset the response cache falls back to the in-process memory store.
    pub url: Option<String>,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub jwt_expiry_min: i64,
    /// Paths that bypass the auth gate entirely.
    pub anonymous_paths: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("APP_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("APP_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT") {
            self.database.connect_timeout_secs = v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        if let Ok(v) = env::var("REDIS_URL") {
            self.redis.url = Some(v);
        }
        if let Ok(v) = env::var("REDIS_TTL") {
            self.redis.cache_ttl_secs = v.parse().unwrap_or(self.redis.cache_ttl_secs);
        }

        if let Ok(v) = env::var("JWT_SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ALGORITHM") {
            self.security.jwt_algorithm = v;
        }
        if let Ok(v) = env::var("JWT_EXP_MIN") {
            self.security.jwt_expiry_min = v.parse().unwrap_or(self.security.jwt_expiry_min);
        }
        if let Ok(v) = env::var("ANONYMOUS_PATHS") {
            self.security.anonymous_paths = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn anonymous_defaults() -> Vec<String> {
        [
            "/api/v1/health-check",
            "/api/v1/auth/sign-in",
            "/api/v1/auth/sign-up",
            "/api/docs",
            "/api/openapi.json",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/keel".to_string(),
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            redis: RedisConfig {
                url: None,
                cache_ttl_secs: 300,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_algorithm: "HS256".to_string(),
                jwt_expiry_min: 180,
                anonymous_paths: Self::anonymous_defaults(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/keel".to_string(),
                max_connections: 20,
                connect_timeout_secs: 10,
            },
            redis: RedisConfig {
                url: None,
                cache_ttl_secs: 300,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_algorithm: "HS256".to_string(),
                jwt_expiry_min: 60,
                anonymous_paths: Self::anonymous_defaults(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/keel".to_string(),
                max_connections: 50,
                connect_timeout_secs: 5,
            },
            redis: RedisConfig {
                url: None,
                cache_ttl_secs: 120,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_algorithm: "HS256".to_string(),
                jwt_expiry_min: 30,
                anonymous_paths: Self::anonymous_defaults(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
