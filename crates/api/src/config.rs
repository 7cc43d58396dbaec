//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ordering::{NotificationConfig, PlacementConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `CATALOG_SEED`: JSON product file for the in-memory catalog
/// - `COMPANY_NAME`, `CONTACT_EMAIL`, `MAIL_SENDER`: confirmation identity
/// - `VALIDATION_TIMEOUT_MS`: stock validation budget (default: `5000`)
/// - `COMPENSATION_ATTEMPTS`: tries per compensating restock (default: `3`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub catalog_seed: Option<PathBuf>,
    pub company_name: String,
    pub contact_email: String,
    pub mail_sender: String,
    pub validation_timeout: Duration,
    pub compensation_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Unparsable values fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let contact_email = non_empty("CONTACT_EMAIL").unwrap_or(defaults.contact_email);

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed(&lookup, "LOG_FORMAT").unwrap_or(defaults.log_format),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            catalog_seed: non_empty("CATALOG_SEED").map(PathBuf::from),
            company_name: non_empty("COMPANY_NAME").unwrap_or(defaults.company_name),
            mail_sender: non_empty("MAIL_SENDER").unwrap_or_else(|| contact_email.clone()),
            contact_email,
            validation_timeout: parsed(&lookup, "VALIDATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.validation_timeout),
            compensation_attempts: parsed(&lookup, "COMPENSATION_ATTEMPTS")
                .unwrap_or(defaults.compensation_attempts),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn placement_config(&self) -> PlacementConfig {
        PlacementConfig {
            validation_timeout: self.validation_timeout,
            compensation_attempts: self.compensation_attempts,
            ..PlacementConfig::default()
        }
    }

    pub fn notification_config(&self) -> NotificationConfig {
        NotificationConfig {
            company_name: self.company_name.clone(),
            contact_email: self.contact_email.clone(),
            sender: self.mail_sender.clone(),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            catalog_seed: None,
            company_name: "Test".to_string(),
            contact_email: "noreply@mail.com".to_string(),
            mail_sender: "noreply@mail.com".to_string(),
            validation_timeout: Duration::from_millis(5000),
            compensation_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = config_from(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.mail_sender, "noreply@mail.com");
        assert_eq!(config.validation_timeout, Duration::from_secs(5));
        assert_eq!(config.compensation_attempts, 3);
    }

    #[test]
    fn test_addr_formatting() {
        let config = config_from(&[("HOST", "127.0.0.1"), ("PORT", "8080")]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("VALIDATION_TIMEOUT_MS", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.validation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_sender_defaults_to_contact_email() {
        let config = config_from(&[("CONTACT_EMAIL", "help@shop.test")]);
        assert_eq!(config.mail_sender, "help@shop.test");

        let config = config_from(&[
            ("CONTACT_EMAIL", "help@shop.test"),
            ("MAIL_SENDER", "orders@shop.test"),
        ]);
        assert_eq!(config.mail_sender, "orders@shop.test");
        assert_eq!(config.notification_config().contact_email, "help@shop.test");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(config_from(&[("LOG_FORMAT", "JSON")]).log_format, LogFormat::Json);
        assert_eq!(config_from(&[("LOG_FORMAT", "xml")]).log_format, LogFormat::Text);
    }

    #[test]
    fn test_placement_config_conversion() {
        let config = config_from(&[
            ("VALIDATION_TIMEOUT_MS", "250"),
            ("COMPENSATION_ATTEMPTS", "7"),
        ]);
        let placement = config.placement_config();
        assert_eq!(placement.validation_timeout, Duration::from_millis(250));
        assert_eq!(placement.compensation_attempts, 7);
    }
}
