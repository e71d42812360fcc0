use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dd_core::constants::TOP_PLAYERS_COUNT;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DIGEST_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_JSON_LIMIT: usize = 1024 * 1024; // 1 MiB

/// Server settings, read from `DONTDROP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    /// JSON snapshot file; the store stays in memory when unset
    pub store_path: Option<PathBuf>,
    pub leaderboard_size: usize,
    pub digest_interval: Duration,
    pub json_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND.to_string(),
            store_path: None,
            leaderboard_size: TOP_PLAYERS_COUNT,
            digest_interval: Duration::from_secs(DEFAULT_DIGEST_INTERVAL_SECS),
            json_limit: DEFAULT_JSON_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: non_empty("DONTDROP_BIND").unwrap_or(defaults.bind_address),
            store_path: non_empty("DONTDROP_STORE_PATH").map(PathBuf::from),
            leaderboard_size: parse_or(
                "DONTDROP_LEADERBOARD_SIZE",
                non_empty("DONTDROP_LEADERBOARD_SIZE"),
                defaults.leaderboard_size,
            )
            .max(1),
            digest_interval: Duration::from_secs(
                parse_or(
                    "DONTDROP_DIGEST_INTERVAL_SECS",
                    non_empty("DONTDROP_DIGEST_INTERVAL_SECS"),
                    DEFAULT_DIGEST_INTERVAL_SECS,
                )
                .max(1),
            ),
            json_limit: parse_or(
                "DONTDROP_JSON_LIMIT",
                non_empty("DONTDROP_JSON_LIMIT"),
                defaults.json_limit,
            ),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value '{}' for {}; using {}", raw, key, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), ServerConfig::default());
        assert_eq!(ServerConfig::default().leaderboard_size, 10);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("DONTDROP_BIND", "127.0.0.1:9000"),
            ("DONTDROP_STORE_PATH", "/tmp/dd.json"),
            ("DONTDROP_LEADERBOARD_SIZE", "25"),
            ("DONTDROP_DIGEST_INTERVAL_SECS", "60"),
            ("DONTDROP_JSON_LIMIT", "2048"),
        ]);
        assert_eq!(cfg.bind_address, "127.0.0.1:9000");
        assert_eq!(cfg.store_path, Some(PathBuf::from("/tmp/dd.json")));
        assert_eq!(cfg.leaderboard_size, 25);
        assert_eq!(cfg.digest_interval, Duration::from_secs(60));
        assert_eq!(cfg.json_limit, 2048);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let cfg = config(&[
            ("DONTDROP_LEADERBOARD_SIZE", "lots"),
            ("DONTDROP_DIGEST_INTERVAL_SECS", "-5"),
            ("DONTDROP_STORE_PATH", "  "),
        ]);
        assert_eq!(cfg.leaderboard_size, 10);
        assert_eq!(cfg.digest_interval, Duration::from_secs(DEFAULT_DIGEST_INTERVAL_SECS));
        assert_eq!(cfg.store_path, None);
    }
}
