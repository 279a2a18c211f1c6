//! Accounts allowed to sign in

use std::collections::HashMap;

use base64::prelude::*;
use sha3::{Digest, Sha3_256};

use crate::model::role::Role;
use crate::model::users::User;

/// Secret mixed into every password digest
///
/// It is a constant for the demo accounts, deployments override the accounts through
/// configuration with digests built by the `digest` command of the server.
const PASSWORD_APP_SECRET: &str = "InternDashboardPasswordSecret";

/// Builds the stored digest of the password
///
/// The hashed data is formatted as `{APP_SECRET}.{username}.{password}`, so equal passwords of two
/// users never share the digest.
pub fn password_digest(username: &str, password: &str) -> String {
    let data = format!("{PASSWORD_APP_SECRET}.{username}.{password}");

    let mut hasher = Sha3_256::new();
    hasher.update(data.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    digest: String,
}

/// Registered accounts indexed by username
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    accounts: HashMap<String, Account>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with the three demo accounts
    pub fn demo() -> Self {
        Self::new()
            .with_account(User::new(1, "intern", "Intern User", Role::Intern), "intern123")
            .with_account(User::new(2, "spoc", "SPOC User", Role::Spoc), "spoc123")
            .with_account(
                User::new(3, "manager", "Manager User", Role::Manager),
                "manager123",
            )
    }

    /// Adds the account with a plain password
    pub fn with_account(self, user: User, password: &str) -> Self {
        let digest = password_digest(&user.username, password);
        self.with_digest(user, digest)
    }

    /// Adds the account with an already computed password digest
    pub fn with_digest(mut self, user: User, digest: impl Into<String>) -> Self {
        self.accounts.insert(
            user.username.clone(),
            Account {
                user,
                digest: digest.into(),
            },
        );
        self
    }

    /// Returns the user if the credentials match
    pub fn verify(&self, username: &str, password: &str) -> Option<&User> {
        let account = self.accounts.get(username)?;
        (account.digest == password_digest(username, password)).then_some(&account.user)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.accounts.values().map(|account| &account.user)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
