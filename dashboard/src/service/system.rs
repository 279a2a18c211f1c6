//! System administration: configuration, health, backups and logs

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, instrument, warn};

use crate::auth::AuthService;
use crate::model::system::{
    ApiStatus, BackupInfo, BackupKind, BackupStatus, ConfigCategory, ConfigValue, DbStatus,
    LogLevel, SystemConfig, SystemHealth, SystemLog,
};
use crate::notify::Notifications;
use crate::service::{ServiceError, ServiceResult, settle};
use crate::state::{Subject, Subscription};

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .unwrap_or_default()
}

fn sample_health() -> SystemHealth {
    SystemHealth {
        db_status: DbStatus::Healthy,
        api_status: ApiStatus::Online,
        last_backup: Some(at(2025, 5, 26, 0, 0)),
        server_load: 23,
        storage_used: 35,
        memory_usage: 42,
        errors_24h: 0,
    }
}

fn sample_backups() -> Vec<BackupInfo> {
    [(26, "1.2 GB"), (25, "1.2 GB"), (24, "1.1 GB"), (23, "1.1 GB"), (22, "1.0 GB")]
        .into_iter()
        .enumerate()
        .map(|(idx, (day, size))| BackupInfo {
            id: idx as u32 + 1,
            date: at(2025, 5, day, 0, 0),
            size: size.to_owned(),
            status: BackupStatus::Completed,
            kind: BackupKind::Full,
        })
        .collect()
}

fn sample_logs() -> Vec<SystemLog> {
    let admin = Some("admin@ilink-systems.com");
    [
        (at(2025, 5, 27, 10, 30), LogLevel::Info, "New SPOC added: Jessica Williams", "UserManagement", admin),
        (at(2025, 5, 26, 17, 45), LogLevel::Info, "Performance report generated", "ReportSystem", admin),
        (
            at(2025, 5, 26, 14, 15),
            LogLevel::Warning,
            "8 interns require attention due to low performance scores",
            "PerformanceMonitor",
            None,
        ),
        (
            at(2025, 5, 25, 11, 20),
            LogLevel::Info,
            "Performance evaluation frequency updated to weekly",
            "SystemConfig",
            admin,
        ),
        (at(2025, 5, 25, 0, 0), LogLevel::Info, "System backup completed successfully", "BackupSystem", None),
    ]
    .into_iter()
    .enumerate()
    .map(|(idx, (timestamp, level, message, source, user))| SystemLog {
        id: idx as u32 + 1,
        timestamp,
        level,
        message: message.to_owned(),
        source: source.to_owned(),
        user: user.map(str::to_owned),
    })
    .collect()
}

/// Source of the system health figures
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> SystemHealth;
}

/// Probe always reporting the same health
#[derive(Debug, Clone)]
pub struct StaticProbe(pub SystemHealth);

impl Default for StaticProbe {
    fn default() -> Self {
        Self(sample_health())
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn probe(&self) -> SystemHealth {
        self.0.clone()
    }
}

/// Size reported for the created backups
const BACKUP_SIZE: &str = "1.2 GB";

#[derive(Clone)]
pub struct SystemService {
    configs: Subject<Vec<SystemConfig>>,
    health: Subject<SystemHealth>,
    backups: Subject<Vec<BackupInfo>>,
    logs: Subject<Vec<SystemLog>>,
    probe: std::sync::Arc<dyn HealthProbe>,
    auth: AuthService,
    notifications: Notifications,
}

impl SystemService {
    pub fn new(
        probe: impl HealthProbe + 'static,
        auth: AuthService,
        notifications: Notifications,
    ) -> Self {
        Self {
            configs: Subject::new(SystemConfig::defaults()),
            health: Subject::new(sample_health()),
            backups: Subject::new(sample_backups()),
            logs: Subject::new(sample_logs()),
            probe: std::sync::Arc::new(probe),
            auth,
            notifications,
        }
    }

    pub async fn configs(&self) -> Subscription<Vec<SystemConfig>> {
        self.configs.subscribe().await
    }

    pub async fn config(&self, id: &str) -> Option<SystemConfig> {
        self.configs
            .with(|configs| configs.iter().find(|config| config.id == id).cloned())
            .await
    }

    pub async fn by_category(&self, category: ConfigCategory) -> Vec<SystemConfig> {
        self.configs
            .with(|configs| {
                configs
                    .iter()
                    .filter(|config| config.category == category)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Appends the entry to the system log
    async fn log(&self, level: LogLevel, message: String, source: &str) {
        let user = self.auth.current_user().await.map(|user| user.username);
        self.logs
            .update(|logs| {
                let id = logs.iter().map(|log| log.id).max().unwrap_or_default() + 1;
                logs.insert(
                    0,
                    SystemLog {
                        id,
                        timestamp: Utc::now(),
                        level,
                        message,
                        source: source.to_owned(),
                        user,
                    },
                );
            })
            .await;
    }

    /// Sets the configuration value
    ///
    /// The value has to match the entry kind, select entries only take one of their options.
    #[instrument(skip(self))]
    pub async fn update_config(&self, id: &str, value: ConfigValue) -> ServiceResult<SystemConfig> {
        self.notifications.set_loading(true).await;

        let result = self
            .configs
            .try_update(|configs| -> ServiceResult<SystemConfig> {
                let config = configs
                    .iter_mut()
                    .find(|config| config.id == id)
                    .ok_or(ServiceError::NotFound("Configuration"))?;

                config
                    .check(&value)
                    .map_err(|reason| ServiceError::InvalidConfig {
                        id: id.to_owned(),
                        reason,
                    })?;
                config.value = value;
                Ok(config.clone())
            })
            .await;

        if let Ok(config) = &result {
            info!(value = %config.value, "Configuration updated");
            self.log(
                LogLevel::Info,
                format!("{} updated to {}", config.name, config.value),
                "SystemConfig",
            )
            .await;
        }

        settle(&self.notifications, result, |config| {
            Some(format!("Configuration '{}' updated successfully", config.name))
        })
        .await
    }

    pub async fn health(&self) -> Subscription<SystemHealth> {
        self.health.subscribe().await
    }

    pub async fn current_health(&self) -> SystemHealth {
        self.health.get().await
    }

    /// Probes and publishes the system health
    pub async fn refresh_health(&self) -> SystemHealth {
        self.notifications.set_loading(true).await;
        let health = self.probe.probe().await;
        if health.errors_24h > 0 {
            warn!(errors = health.errors_24h, "Errors reported in the last 24h");
        }
        self.health.set(health.clone()).await;
        self.notifications.set_loading(false).await;
        health
    }

    pub async fn backups(&self) -> Subscription<Vec<BackupInfo>> {
        self.backups.subscribe().await
    }

    /// Records a new full backup, latest first
    #[instrument(skip(self))]
    pub async fn create_backup(&self) -> ServiceResult<BackupInfo> {
        self.notifications.set_loading(true).await;

        let backup = self
            .backups
            .update(|backups| {
                let backup = BackupInfo {
                    id: backups.len() as u32 + 1,
                    date: Utc::now(),
                    size: BACKUP_SIZE.to_owned(),
                    status: BackupStatus::Completed,
                    kind: BackupKind::Full,
                };
                backups.insert(0, backup.clone());
                backup
            })
            .await;
        self.health
            .update(|health| health.last_backup = Some(backup.date))
            .await;
        self.log(LogLevel::Info, "System backup completed successfully".into(), "BackupSystem")
            .await;

        settle(&self.notifications, Ok(backup), |_| {
            Some("Backup created successfully".to_owned())
        })
        .await
    }

    pub async fn logs(&self) -> Subscription<Vec<SystemLog>> {
        self.logs.subscribe().await
    }

    pub async fn clear_logs(&self) {
        self.logs.set(vec![]).await;
        self.notifications
            .success("System logs cleared successfully")
            .await;
    }

    /// Nothing is cached in process, only the notification is raised
    pub async fn clear_cache(&self) {
        self.notifications
            .success("System cache cleared successfully")
            .await;
    }

    /// Restores the default configuration
    #[instrument(skip(self))]
    pub async fn reset(&self) {
        self.configs.set(SystemConfig::defaults()).await;
        self.log(LogLevel::Warning, "System configuration reset".into(), "SystemConfig")
            .await;
        self.notifications
            .success("System reset completed successfully")
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (SystemService, Notifications) {
        let notifications = Notifications::new();
        let service = SystemService::new(
            StaticProbe::default(),
            AuthService::mock(),
            notifications.clone(),
        );
        (service, notifications)
    }

    #[tokio::test]
    async fn categories() {
        let (service, _) = service();
        let security: Vec<_> = service
            .by_category(ConfigCategory::Security)
            .await
            .into_iter()
            .map(|config| config.id)
            .collect();
        assert_eq!(security, vec!["requireTwoFactor", "maxLoginAttempts"]);
    }

    #[tokio::test]
    async fn config_updates_are_checked() {
        let (service, notifications) = service();
        let mut logs = service.logs().await;
        logs.latest();

        let config = service
            .update_config("performanceFrequency", ConfigValue::Text("Monthly".into()))
            .await
            .unwrap();
        assert_eq!(config.value, ConfigValue::Text("Monthly".into()));
        assert_eq!(
            notifications.current_success().await,
            "Configuration 'Performance Update Frequency' updated successfully"
        );
        let logs = logs.latest().unwrap();
        assert_eq!(logs[0].message, "Performance Update Frequency updated to Monthly");
        assert_eq!(logs[0].id, 6);

        assert!(matches!(
            service
                .update_config("performanceFrequency", ConfigValue::Text("Yearly".into()))
                .await,
            Err(ServiceError::InvalidConfig { .. })
        ));
        assert!(matches!(
            service
                .update_config("minScore", ConfigValue::Bool(true))
                .await,
            Err(ServiceError::InvalidConfig { .. })
        ));
        assert!(matches!(
            service.update_config("nope", ConfigValue::Number(1)).await,
            Err(ServiceError::NotFound("Configuration"))
        ));
        assert_eq!(
            notifications.current_error().await,
            "Configuration not found"
        );
        assert_eq!(
            service.config("performanceFrequency").await.unwrap().value,
            ConfigValue::Text("Monthly".into())
        );
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let (service, _) = service();
        service
            .update_config("minScore", ConfigValue::Number(75))
            .await
            .unwrap();
        service.reset().await;
        assert_eq!(
            service.config("minScore").await.unwrap().value,
            ConfigValue::Number(60)
        );
    }

    #[tokio::test]
    async fn backups_prepend() {
        let (service, _) = service();
        let backup = service.create_backup().await.unwrap();
        assert_eq!(backup.id, 6);
        assert_eq!(backup.size, "1.2 GB");

        let mut backups = service.backups().await;
        let backups = backups.next().await.unwrap();
        assert_eq!(backups.len(), 6);
        assert_eq!(backups[0], backup);
        assert_eq!(
            service.current_health().await.last_backup,
            Some(backup.date)
        );
    }

    struct Failing;

    #[async_trait]
    impl HealthProbe for Failing {
        async fn probe(&self) -> SystemHealth {
            SystemHealth {
                db_status: DbStatus::Error,
                api_status: ApiStatus::Degraded,
                errors_24h: 3,
                ..sample_health()
            }
        }
    }

    #[tokio::test]
    async fn health_refresh() {
        let service = SystemService::new(Failing, AuthService::mock(), Notifications::new());
        let mut health = service.health().await;
        assert_eq!(health.next().await.unwrap().db_status, DbStatus::Healthy);

        let refreshed = service.refresh_health().await;
        assert_eq!(refreshed.errors_24h, 3);
        assert_eq!(health.next().await.unwrap().db_status, DbStatus::Error);
    }

    #[tokio::test]
    async fn clear_logs() {
        let (service, notifications) = service();
        service.clear_logs().await;
        assert!(service.logs().await.next().await.unwrap().is_empty());
        assert_eq!(
            notifications.current_success().await,
            "System logs cleared successfully"
        );
    }
}
