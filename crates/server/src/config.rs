//! Server configuration.
//!
//! Configuration comes from command line arguments or environment
//! variables, in that order of precedence.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STRATA_SERVER_PORT` | 8080 | Server port |
//! | `STRATA_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `STRATA_LOG_LEVEL` | info | Log level |
//! | `STRATA_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `STRATA_ENABLE_CORS` | true | Enable CORS |
//! | `STRATA_CORS_ORIGINS` | * | Allowed origins |
//! | `STRATA_CORS_METHODS` | GET,POST,PUT,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `STRATA_CORS_HEADERS` | Content-Type,Authorization,Accept,X-Tenant-ID | Allowed headers |
//! | `STRATA_DATABASE_URL` | (none) | PostgreSQL connection string |
//!
//! Database settings fall back to the `STRATA_PG_*` variables read by
//! the tenancy layer when `STRATA_DATABASE_URL` is unset.

use clap::Parser;

/// Server configuration for the Strata API.
///
/// Construct from command line arguments with [`ServerConfig::parse`],
/// from environment variables with [`ServerConfig::from_env`], or
/// programmatically via struct update syntax.
#[derive(Debug, Clone, Parser)]
#[command(name = "strata-server")]
#[command(about = "Multi-tenant Strata API Server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "STRATA_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "STRATA_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "STRATA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "STRATA_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "STRATA_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "STRATA_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "STRATA_CORS_METHODS",
        default_value = "GET,POST,PUT,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "STRATA_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept,X-Tenant-ID"
    )]
    pub cors_headers: String,

    /// Database connection string.
    #[arg(long, env = "STRATA_DATABASE_URL")]
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept,X-Tenant-ID".to_string(),
            database_url: None,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration from environment variables alone.
    pub fn from_env() -> Self {
        // Try to parse from environment, falling back to defaults
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address string to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enable_cors);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:3000");
    }
}
