//! Service configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use dashboard::Role;
use serde::{Deserialize, Deserializer};
use tracing_subscriber::filter::Directive;

/// Logging output format
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Logging {
    /// Additional filtering directives
    #[serde(default, deserialize_with = "Logging::deserialize_filters")]
    pub filters: Vec<Directive>,

    /// Logging format
    #[serde(default)]
    pub format: LogFormat,
}

impl Logging {
    fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dirs: Vec<String> = Deserialize::deserialize(deserializer)?;
        dirs.into_iter()
            .map(|dir| dir.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Session tokens configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Session lifetime
    #[serde(default = "Session::default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Session {
    fn default_ttl_hours() -> u64 {
        24
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            ttl_hours: Self::default_ttl_hours(),
        }
    }
}

/// Dashboard account
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
    /// Display name
    pub name: String,
    pub role: Role,
    /// Password digest, as printed by the `digest` command
    pub digest: String,
}

/// Top level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address where to host the service
    #[serde(default = "Config::default_host")]
    pub host: SocketAddr,

    /// Directory with the built dashboard app
    #[serde(default = "Config::default_assets")]
    pub assets: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub logging: Logging,

    #[serde(default)]
    pub session: Session,

    /// Accounts allowed to sign in, demo accounts if empty
    #[serde(default)]
    pub users: Vec<Account>,
}

impl Config {
    fn default_host() -> SocketAddr {
        ([127, 0, 0, 1], 3030).into()
    }

    fn default_assets() -> PathBuf {
        "dist/browser".into()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            assets: Self::default_assets(),
            logging: Logging::default(),
            session: Session::default(),
            users: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.host, Config::default_host());
        assert_eq!(config.assets, PathBuf::from("dist/browser"));
        assert_eq!(config.session.ttl_hours, 24);
        assert!(config.users.is_empty());
    }

    #[test]
    fn full_config() {
        let config: Config = toml::from_str(
            r#"
            host = "0.0.0.0:8080"
            assets = "/srv/dashboard"

            [logging]
            filters = ["dashboard=debug"]
            format = "Pretty"

            [session]
            ttl_hours = 8

            [[users]]
            username = "spoc"
            name = "SPOC User"
            role = "spoc"
            digest = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.host.port(), 8080);
        assert_eq!(config.logging.filters.len(), 1);
        assert!(matches!(config.logging.format, LogFormat::Pretty));
        assert_eq!(config.session.ttl_hours, 8);
        assert_eq!(config.users[0].role, Role::Spoc);
    }
}
