//! Service configuration
//!
//! Read once at startup from the environment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; the in-memory store is used when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let server = ServerConfig::default();
        let database = DatabaseConfig::default();

        Self {
            server: ServerConfig {
                host: lookup("IPAM_HOST").unwrap_or(server.host),
                port: lookup("IPAM_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(server.port),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
                max_connections: lookup("DB_MAX_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(database.max_connections),
                min_connections: lookup("DB_MIN_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(database.min_connections),
                connect_timeout_secs: lookup("DB_CONNECT_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(database.connect_timeout_secs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert!(config.database.url.is_none());
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("IPAM_HOST", "127.0.0.1"),
            ("IPAM_PORT", "9090"),
            ("DATABASE_URL", "postgres://ipam@localhost/ipam"),
            ("DB_MAX_CONNECTIONS", "4"),
        ]);
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr(), "127.0.0.1:9090");
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://ipam@localhost/ipam")
        );
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.min_connections, 1);
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = Config::from_lookup(|k| (k == "IPAM_PORT").then(|| "http".to_string()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_blank_database_url_is_unset() {
        let config = Config::from_lookup(|k| (k == "DATABASE_URL").then(|| "  ".to_string()));
        assert!(config.database.url.is_none());
    }
}
