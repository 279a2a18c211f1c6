//! Service global state

use std::sync::Arc;
use std::time::Duration;

use dashboard::auth::directory::UserDirectory;
use dashboard::auth::{TokenBackend, TokenIssuer};
use dashboard::model::users::User;
use dashboard::service::PerformanceStore;

use crate::config;

/// State shared by the request handlers
#[derive(Clone)]
pub struct Model {
    /// Accounts and issued session tokens
    auth: TokenBackend,
    /// Performance review table
    performance: PerformanceStore,
}

impl Model {
    /// Model for testing purposes - demo accounts over the sample table
    pub fn test() -> Self {
        Self {
            auth: TokenBackend::demo(),
            performance: PerformanceStore::sample(),
        }
    }

    /// Model from configuration
    pub fn with_config(config: &config::Config) -> Self {
        let directory = if config.users.is_empty() {
            UserDirectory::demo()
        } else {
            config
                .users
                .iter()
                .enumerate()
                .fold(UserDirectory::new(), |directory, (idx, account)| {
                    let user = User::new(
                        idx as u32 + 1,
                        &account.username,
                        &account.name,
                        account.role,
                    );
                    directory.with_digest(user, &account.digest)
                })
        };

        let ttl = Duration::from_secs(config.session.ttl_hours * 60 * 60);
        Self {
            auth: TokenBackend::new(directory, Arc::new(TokenIssuer::new(ttl))),
            performance: PerformanceStore::sample(),
        }
    }

    pub fn auth(&self) -> &TokenBackend {
        &self.auth
    }

    pub fn performance(&self) -> &PerformanceStore {
        &self.performance
    }
}
