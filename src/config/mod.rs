use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub query: QueryConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// `APP_ENV` value; anything unrecognised means development
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("production" | "prod") => Environment::Production,
            Some("staging" | "stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
    /// Serve from the in-process store instead of Postgres
    pub use_memory: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

/// Limits applied to `$top` on list routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub max_top: usize,
    pub default_top: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HS256 signing secret. Empty disables token issue and acceptance.
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub blob_root: String,
    pub blob_base_url: String,
    pub blob_container: String,
    pub operation_config_queue: String,
    pub plant_config_queue: String,
    pub export_queue: String,
    pub transaction_collection: String,
    pub notification_hub: String,
    pub max_upload_bytes: usize,
}

const MB: usize = 1024 * 1024;

/// Replace `target` with the parsed value of `var` when it is set and parses
fn override_from<T: FromStr>(target: &mut T, var: &str) {
    if let Ok(raw) = env::var(var) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring unparseable {}={}", var, raw),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = Environment::from_name(env::var("APP_ENV").ok().as_deref());
        let mut config = Self::preset(environment);
        config.apply_env();
        config
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Staging => Self::staging(),
            Environment::Production => Self::production(),
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        override_from(&mut self.database.max_connections, "DATABASE_MAX_CONNECTIONS");
        override_from(&mut self.database.connection_timeout, "DATABASE_CONNECTION_TIMEOUT");
        override_from(&mut self.database.use_memory, "DATABASE_USE_MEMORY");

        override_from(&mut self.api.port, "PORT");
        override_from(&mut self.api.port, "FFCO_API_PORT");
        override_from(&mut self.api.max_request_size_bytes, "API_MAX_REQUEST_SIZE_BYTES");

        override_from(&mut self.query.max_top, "QUERY_MAX_TOP");
        if let Ok(raw) = env::var("QUERY_DEFAULT_TOP") {
            self.query.default_top = raw.trim().parse().ok();
        }

        override_from(&mut self.security.jwt_secret, "SECURITY_JWT_SECRET");
        override_from(&mut self.security.jwt_expiry_hours, "SECURITY_JWT_EXPIRY_HOURS");
        if let Ok(raw) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        let storage = &mut self.storage;
        override_from(&mut storage.blob_root, "STORAGE_BLOB_ROOT");
        override_from(&mut storage.blob_base_url, "STORAGE_BLOB_BASE_URL");
        override_from(&mut storage.blob_container, "STORAGE_BLOB_CONTAINER");
        override_from(&mut storage.operation_config_queue, "STORAGE_OPERATION_CONFIG_QUEUE");
        override_from(&mut storage.plant_config_queue, "STORAGE_PLANT_CONFIG_QUEUE");
        override_from(&mut storage.export_queue, "STORAGE_EXPORT_QUEUE");
        override_from(&mut storage.transaction_collection, "STORAGE_TRANSACTION_COLLECTION");
        override_from(&mut storage.notification_hub, "STORAGE_NOTIFICATION_HUB");
        override_from(&mut storage.max_upload_bytes, "STORAGE_MAX_UPLOAD_BYTES");
    }

    /// Local work: generous limits, a throwaway signing secret
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::with_pool(10, 30),
            api: ApiConfig { port: 3000, max_request_size_bytes: 20 * MB },
            query: QueryConfig { max_top: 1000, default_top: None },
            security: SecurityConfig {
                jwt_secret: "ffco-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            storage: StorageConfig::with_upload_limit(10 * MB),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig::with_pool(20, 10),
            api: ApiConfig { port: 8080, max_request_size_bytes: 10 * MB },
            query: QueryConfig { max_top: 500, default_top: Some(100) },
            security: SecurityConfig::locked_down(24, "https://staging.ffco.example.com"),
            storage: StorageConfig::with_upload_limit(5 * MB),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::with_pool(50, 5),
            api: ApiConfig { port: 8080, max_request_size_bytes: 10 * MB },
            query: QueryConfig { max_top: 100, default_top: Some(50) },
            security: SecurityConfig::locked_down(4, "https://ffco.example.com"),
            storage: StorageConfig::with_upload_limit(5 * MB),
        }
    }
}

impl DatabaseConfig {
    fn with_pool(max_connections: u32, connection_timeout: u64) -> Self {
        Self {
            url: None,
            max_connections,
            connection_timeout,
            use_memory: false,
        }
    }
}

impl SecurityConfig {
    /// No secret until `SECURITY_JWT_SECRET` provides one
    fn locked_down(jwt_expiry_hours: u64, origin: &str) -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiry_hours,
            cors_origins: vec![origin.to_string()],
        }
    }
}

impl StorageConfig {
    fn with_upload_limit(max_upload_bytes: usize) -> Self {
        Self {
            blob_root: "./data/blobs".to_string(),
            blob_base_url: "file://blobs".to_string(),
            blob_container: "configuration-uploads".to_string(),
            operation_config_queue: "operation-configuration-upload".to_string(),
            plant_config_queue: "plant-configuration-upload".to_string(),
            export_queue: "configuration-export".to_string(),
            transaction_collection: "transactions".to_string(),
            notification_hub: "ffco-notifications".to_string(),
            max_upload_bytes,
        }
    }
}

/// Process-wide configuration, read from the environment on first use
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_names() {
        assert_eq!(Environment::from_name(Some("PROD")), Environment::Production);
        assert_eq!(Environment::from_name(Some("stage")), Environment::Staging);
        assert_eq!(Environment::from_name(Some("qa")), Environment::Development);
        assert_eq!(Environment::from_name(None), Environment::Development);
    }

    #[test]
    fn development_can_sign_tokens() {
        let config = AppConfig::preset(Environment::Development);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.query.max_top, 1000);
        assert!(config.query.default_top.is_none());
    }

    #[test]
    fn production_needs_explicit_secret() {
        let config = AppConfig::preset(Environment::Production);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.query.max_top, 100);
        assert_eq!(config.query.default_top, Some(50));
    }

    #[test]
    fn upload_queues_are_distinct() {
        let storage = AppConfig::staging().storage;
        assert_ne!(storage.operation_config_queue, storage.plant_config_queue);
        assert_ne!(storage.plant_config_queue, storage.export_queue);
    }
}
