//! System configuration, health, backups and logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of a configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Bool(value) => write!(f, "{value}"),
            ConfigValue::Number(value) => write!(f, "{value}"),
            ConfigValue::Text(value) => f.write_str(value),
        }
    }
}

/// Kind of value a configuration entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Boolean,
    String,
    Number,
    /// Text restricted to the entry options
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigCategory {
    Notification,
    Performance,
    Security,
    General,
    Backup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub id: String,
    pub name: String,
    pub value: ConfigValue,
    #[serde(rename = "type")]
    pub kind: ConfigKind,
    pub description: String,
    pub category: ConfigCategory,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl SystemConfig {
    fn entry(
        id: &str,
        name: &str,
        value: ConfigValue,
        kind: ConfigKind,
        category: ConfigCategory,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            value,
            kind,
            description: description.to_owned(),
            category,
            options: vec![],
        }
    }

    fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|option| (*option).to_owned()).collect();
        self
    }

    /// Checks if the value fits this entry, returning the reason if it does not
    pub fn check(&self, value: &ConfigValue) -> Result<(), String> {
        match (self.kind, value) {
            (ConfigKind::Boolean, ConfigValue::Bool(_)) => Ok(()),
            (ConfigKind::Number, ConfigValue::Number(number)) if *number >= 0 => Ok(()),
            (ConfigKind::Number, ConfigValue::Number(_)) => Err("expected a non-negative number".into()),
            (ConfigKind::String, ConfigValue::Text(_)) => Ok(()),
            (ConfigKind::Select, ConfigValue::Text(text)) if self.options.contains(text) => Ok(()),
            (ConfigKind::Select, ConfigValue::Text(text)) => Err(format!(
                "{text:?} is not one of {}",
                self.options.join(", ")
            )),
            (kind, _) => Err(format!("expected a {kind:?} value").to_lowercase()),
        }
    }

    /// Default system configuration
    pub fn defaults() -> Vec<Self> {
        use ConfigCategory::*;
        use ConfigValue::*;

        vec![
            Self::entry(
                "emailNotifications",
                "Email Notifications",
                Bool(true),
                ConfigKind::Boolean,
                Notification,
                "Send email notifications when new feedback is added",
            ),
            Self::entry(
                "performanceFrequency",
                "Performance Update Frequency",
                Text("Weekly".into()),
                ConfigKind::Select,
                Performance,
                "Frequency of performance evaluations",
            )
            .with_options(&["Daily", "Weekly", "Bi-weekly", "Monthly"]),
            Self::entry(
                "minScore",
                "Minimum Acceptable Score",
                Number(60),
                ConfigKind::Number,
                Performance,
                "Minimum acceptable performance score",
            ),
            Self::entry(
                "autoReports",
                "Automated Reports",
                Bool(true),
                ConfigKind::Boolean,
                Notification,
                "Automatically generate and send reports",
            ),
            Self::entry(
                "reportRecipients",
                "Report Recipients",
                Text("managers@ilink-systems.com".into()),
                ConfigKind::String,
                Notification,
                "Email recipients for automated reports",
            ),
            Self::entry(
                "backupFrequency",
                "Backup Frequency",
                Text("Daily".into()),
                ConfigKind::Select,
                Backup,
                "How often to run system backups",
            )
            .with_options(&["Daily", "Weekly", "Monthly"]),
            Self::entry(
                "retentionPeriod",
                "Backup Retention Period",
                Number(30),
                ConfigKind::Number,
                Backup,
                "Days to keep backups",
            ),
            Self::entry(
                "requireTwoFactor",
                "Require Two-Factor Authentication",
                Bool(true),
                ConfigKind::Boolean,
                Security,
                "Require 2FA for manager accounts",
            ),
            Self::entry(
                "maxLoginAttempts",
                "Maximum Login Attempts",
                Number(5),
                ConfigKind::Number,
                Security,
                "Maximum failed login attempts before account lock",
            ),
            Self::entry(
                "logRetention",
                "Log Retention (Days)",
                Number(30),
                ConfigKind::Number,
                General,
                "Days to keep system logs",
            ),
            Self::entry(
                "logLevel",
                "Log Level",
                Text("Info".into()),
                ConfigKind::Select,
                General,
                "Set the verbosity of system logs",
            )
            .with_options(&["Error", "Warning", "Info", "Debug"]),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbStatus {
    Healthy,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Online,
    Offline,
    Degraded,
}

/// Health snapshot, load figures are percents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub db_status: DbStatus,
    pub api_status: ApiStatus,
    pub last_backup: Option<DateTime<Utc>>,
    pub server_load: u8,
    pub storage_used: u8,
    pub memory_usage: u8,
    pub errors_24h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupStatus {
    Completed,
    Failed,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Full,
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub id: u32,
    pub date: DateTime<Utc>,
    pub size: String,
    pub status: BackupStatus,
    #[serde(rename = "type")]
    pub kind: BackupKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLog {
    pub id: u32,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> SystemConfig {
        SystemConfig::defaults()
            .into_iter()
            .find(|config| config.id == id)
            .unwrap()
    }

    #[test]
    fn value_kinds_are_checked() {
        let notifications = entry("emailNotifications");
        assert!(notifications.check(&ConfigValue::Bool(false)).is_ok());
        assert!(notifications.check(&ConfigValue::Number(1)).is_err());

        let min_score = entry("minScore");
        assert!(min_score.check(&ConfigValue::Number(70)).is_ok());
        assert!(min_score.check(&ConfigValue::Number(-1)).is_err());
        assert!(min_score.check(&ConfigValue::Text("70".into())).is_err());
    }

    #[test]
    fn select_values_must_be_options() {
        let level = entry("logLevel");
        assert!(level.check(&ConfigValue::Text("Debug".into())).is_ok());
        assert!(level.check(&ConfigValue::Text("Trace".into())).is_err());
    }
}
