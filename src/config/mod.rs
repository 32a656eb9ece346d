use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RaffleError, Result};
use crate::rooms::ROOM_ID_LENGTH;

/// Default number of id draws before room creation gives up
pub const DEFAULT_ROOM_ID_MAX_ATTEMPTS: usize = 1000;

/// Rooms untouched for this long are evicted (2 hours)
pub const DEFAULT_ROOM_IDLE_TIMEOUT_SECS: u64 = 2 * 60 * 60;

/// How often the janitor wakes up
pub const DEFAULT_ROOM_SWEEP_INTERVAL_SECS: u64 = 60;

/// Requests per second allowed for a single client address
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 5;

pub struct Config {
    pub server: ServerConfig,
    pub rooms: RoomConfig,
    pub rate_limit: RateLimitConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub template_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub id_length: usize,
    pub max_id_attempts: usize,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_second: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            id_length: ROOM_ID_LENGTH,
            max_id_attempts: DEFAULT_ROOM_ID_MAX_ATTEMPTS,
            idle_timeout: Duration::from_secs(DEFAULT_ROOM_IDLE_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_ROOM_SWEEP_INTERVAL_SECS),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and reads configuration from the environment
    ///
    /// Optional environment variables:
    /// - `SERVER_HOST` (default: 0.0.0.0), `SERVER_PORT` (default: 8080)
    /// - `TEMPLATE_DIR` (default: ./templates)
    /// - `ROOM_ID_LENGTH` (default: 32)
    /// - `ROOM_ID_MAX_ATTEMPTS` (default: 1000)
    /// - `ROOM_IDLE_TIMEOUT_SECS` (default: 7200)
    /// - `ROOM_SWEEP_INTERVAL_SECS` (default: 60)
    /// - `RATE_LIMIT_ENABLED` (default: true), `RATE_LIMIT_PER_SECOND` (default: 5)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rooms = RoomConfig {
            id_length: parse_or(&lookup, "ROOM_ID_LENGTH", ROOM_ID_LENGTH)?,
            max_id_attempts: parse_or(&lookup, "ROOM_ID_MAX_ATTEMPTS", DEFAULT_ROOM_ID_MAX_ATTEMPTS)?,
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "ROOM_IDLE_TIMEOUT_SECS",
                DEFAULT_ROOM_IDLE_TIMEOUT_SECS,
            )?),
            sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "ROOM_SWEEP_INTERVAL_SECS",
                DEFAULT_ROOM_SWEEP_INTERVAL_SECS,
            )?),
        };

        let rate_limit = RateLimitConfig {
            enabled: parse_or(&lookup, "RATE_LIMIT_ENABLED", true)?,
            per_second: parse_or(&lookup, "RATE_LIMIT_PER_SECOND", DEFAULT_RATE_LIMIT_PER_SECOND)?,
        };

        let config = Self {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "SERVER_PORT", 8080)?,
                template_dir: lookup("TEMPLATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./templates")),
            },
            rooms,
            rate_limit,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rooms.id_length == 0 {
            return Err(RaffleError::InvalidConfiguration(
                "ROOM_ID_LENGTH must be greater than zero".to_string(),
            ));
        }
        if self.rooms.max_id_attempts == 0 {
            return Err(RaffleError::InvalidConfiguration(
                "ROOM_ID_MAX_ATTEMPTS must be greater than zero".to_string(),
            ));
        }
        if self.rooms.sweep_interval.is_zero() {
            return Err(RaffleError::InvalidConfiguration(
                "ROOM_SWEEP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.enabled && self.rate_limit.per_second == 0 {
            return Err(RaffleError::InvalidConfiguration(
                "RATE_LIMIT_PER_SECOND must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::UNSPECIFIED;
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::LOCALHOST,
            "" | "0.0.0.0" => Ipv4Addr::UNSPECIFIED,
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::UNSPECIFIED
            }
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            RaffleError::ConfigurationParseFailed(format!("{}={:?}: {}", key, raw, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with_host(host: &str, port: u16) -> Config {
        Config {
            server: ServerConfig {
                host: host.to_string(),
                port,
                template_dir: PathBuf::from("./templates"),
            },
            rooms: RoomConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rooms.id_length, 32);
        assert_eq!(config.rooms.max_id_attempts, 1000);
        assert_eq!(config.rooms.idle_timeout, Duration::from_secs(7200));
        assert_eq!(config.rooms.sweep_interval, Duration::from_secs(60));
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.per_second, 5);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "3000"),
            ("ROOM_ID_LENGTH", "12"),
            ("ROOM_IDLE_TIMEOUT_SECS", "30"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("TEMPLATE_DIR", "/srv/templates"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.rooms.id_length, 12);
        assert_eq!(config.rooms.idle_timeout, Duration::from_secs(30));
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.server.template_dir, PathBuf::from("/srv/templates"));
    }

    #[test]
    fn test_malformed_port_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("SERVER_PORT", "eighty")]));
        assert!(matches!(result, Err(RaffleError::ConfigurationParseFailed(_))));
    }

    #[test]
    fn test_zero_id_length_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("ROOM_ID_LENGTH", "0")]));
        assert!(matches!(result, Err(RaffleError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_zero_rate_allowed_when_disabled() {
        let config = Config::from_lookup(lookup_from(&[
            ("RATE_LIMIT_ENABLED", "false"),
            ("RATE_LIMIT_PER_SECOND", "0"),
        ]));
        assert!(config.is_ok());
    }

    #[test]
    fn test_parse_localhost() {
        let addr = config_with_host("localhost", 8080).bind_address();
        assert_eq!(addr, ([127, 0, 0, 1], 8080));
    }

    #[test]
    fn test_parse_ipv4_address() {
        let addr = config_with_host("192.168.1.1", 3000).bind_address();
        assert_eq!(addr, ([192, 168, 1, 1], 3000));
    }

    #[test]
    fn test_parse_empty_host() {
        let addr = config_with_host("", 8080).bind_address();
        assert_eq!(addr, ([0, 0, 0, 0], 8080));
    }

    #[test]
    fn test_parse_invalid_hostname_defaults_to_all() {
        let addr = config_with_host("invalid-hostname", 9000).bind_address();
        assert_eq!(addr, ([0, 0, 0, 0], 9000));
    }
}
