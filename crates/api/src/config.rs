//! Server configuration

use clap::Parser;
use std::path::PathBuf;

/// Union payments API server
#[derive(Parser, Debug, Clone)]
#[command(name = "unionpay-api", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:unionpay.db?mode=rwc")]
    pub database_url: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// JSON seed for the user directory (`{"users": [...]}`)
    #[arg(long, env = "DIRECTORY_FILE")]
    pub directory_file: Option<PathBuf>,

    /// Page size when a list request gives none
    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value_t = 20)]
    pub default_page_size: u32,

    /// Upper bound on requested page sizes
    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = 100)]
    pub max_page_size: u32,
}

impl ServerConfig {
    /// Full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_size: self.default_page_size.max(1),
            max_size: self.max_page_size.max(1),
        }
    }
}

/// Bounds applied to `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = ServerConfig::parse_from(["unionpay-api", "--host", "0.0.0.0", "--port", "3000"]);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_flags_override() {
        let config = ServerConfig::parse_from([
            "unionpay-api",
            "--port",
            "8080",
            "--database-url",
            "sqlite::memory:",
            "--max-page-size",
            "0",
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.page_limits().max_size, 1);
    }
}
