//! PASETO session tokens

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::footer::Footer;
use pasetors::keys::{AsymmetricKeyPair, AsymmetricPublicKey, Generate};
use pasetors::paserk::{self, FormatAsPaserk};
use pasetors::token::UntrustedToken;
use pasetors::version4::V4;
use pasetors::{Public, public};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::role::Role;
use crate::model::users::User;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid token format")]
    InvalidTokenFormat,
    #[error("Token doesn't exist")]
    NonExistingToken,
    #[error("Missing token id on a token")]
    MissingTokenId,
    #[error("Missing session data")]
    MissingClaims,
    #[error("Invalid session claim {0}")]
    InvalidSessionClaim(&'static str),
    #[error("Token processing failed: {0}")]
    Paseto(#[from] pasetors::errors::Error),
    #[error("Token key formatting failed")]
    KeyFormat(#[from] std::fmt::Error),
}

/// PASETO implicit assertion for session tokens
const SESSION_APP_SECRET: &[u8] = b"InternDashboardSessionTokenSecret";

/// Size of the Ed25519 signature closing the v4 public token message
const SIGNATURE_LEN: usize = 64;

/// Newtype for the session token string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session data carried by the token claims
///
/// `sub` is the username, `uid`, `name` and `role` are custom claims, `exp` is the standard RFC3339
/// expiration claim.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Appends the user data to the token claims
    fn append(user: &User, mut claims: Claims) -> Result<Claims, Error> {
        claims.subject(&user.username)?;
        claims.add_additional("uid", user.id.to_string())?;
        claims.add_additional("name", user.name.as_str())?;
        claims.add_additional("role", user.role.as_str())?;
        Ok(claims)
    }

    /// Builds session data from the token claims
    fn from_claims<'a>(claims: impl Fn(&str) -> Option<&'a Value>) -> Result<Self, Error> {
        let claim = |name: &'static str| {
            claims(name)
                .and_then(Value::as_str)
                .ok_or(Error::InvalidSessionClaim(name))
        };

        let id = claim("uid")?
            .parse()
            .map_err(|_| Error::InvalidSessionClaim("uid"))?;
        let role: Role = claim("role")?
            .parse()
            .map_err(|_| Error::InvalidSessionClaim("role"))?;
        let expires_at = DateTime::parse_from_rfc3339(claim("exp")?)
            .map_err(|_| Error::InvalidSessionClaim("exp"))?
            .with_timezone(&Utc);

        Ok(Self {
            user: User::new(id, claim("sub")?, claim("name")?, role),
            expires_at,
        })
    }
}

/// Reads the session claims without verifying the token signature
///
/// Meant for clients, which cannot verify the server keys but need to know the session role and
/// expiration. Never use it to authorize anything.
pub fn decode_unverified(token: &SessionToken) -> Result<SessionClaims, Error> {
    let token = UntrustedToken::<Public, V4>::try_from(token.as_str())
        .map_err(|_| Error::InvalidTokenFormat)?;

    let message = token.untrusted_message();
    let payload = message
        .len()
        .checked_sub(SIGNATURE_LEN)
        .map(|len| &message[..len])
        .ok_or(Error::InvalidTokenFormat)?;

    let claims: Map<String, Value> =
        serde_json::from_slice(payload).map_err(|_| Error::MissingClaims)?;
    SessionClaims::from_claims(|name| claims.get(name))
}

/// Issuer and verifier of session tokens
///
/// Every token is signed with its own key pair. Only public keys are kept, indexed by the PASERK
/// key id placed in the token footer, so dropping the key revokes the token.
pub struct TokenIssuer {
    /// Pasetors public keys used for session verification
    keys: RwLock<HashMap<String, String>>,
    /// Session lifetime
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Creates new session token for an user
    pub async fn issue(&self, user: &User) -> Result<SessionToken, Error> {
        let key_pair = AsymmetricKeyPair::<V4>::generate()?;
        let key_id = paserk::Id::from(&key_pair.public);
        {
            // Key id collisions are ignored, the worst outcome is someone else session expiring
            let mut kid = String::new();
            key_id.fmt(&mut kid)?;

            let mut pk = String::new();
            key_pair.public.fmt(&mut pk)?;
            self.keys.write().await.insert(kid, pk);
        }

        let claims = Claims::new_expires_in(&self.ttl)?;
        let claims = SessionClaims::append(user, claims)?;

        let mut footer = Footer::new();
        footer.key_id(&key_id);

        let token = public::sign(
            &key_pair.secret,
            &claims,
            Some(&footer),
            Some(SESSION_APP_SECRET),
        )?;

        Ok(SessionToken(token))
    }

    /// Extracts the key id from the token footer
    fn key_id(token: &UntrustedToken<Public, V4>) -> Result<String, Error> {
        let mut footer = Footer::new();
        footer.parse_bytes(token.untrusted_footer())?;

        footer
            .get_claim("kid")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(Error::MissingTokenId)
    }

    /// Verifies the token signature and expiration returning the session data
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        let token = UntrustedToken::<Public, V4>::try_from(token)
            .map_err(|_| Error::InvalidTokenFormat)?;
        let key_id = Self::key_id(&token)?;

        let key = {
            let keys = self.keys.read().await;
            let key = keys.get(&key_id).ok_or(Error::NonExistingToken)?;
            AsymmetricPublicKey::<V4>::try_from(key.as_str())?
        };

        let rules = ClaimsValidationRules::new();
        let token = public::verify(&key, &token, &rules, None, Some(SESSION_APP_SECRET))?;

        let claims = token.payload_claims().ok_or(Error::MissingClaims)?;
        SessionClaims::from_claims(|name| claims.get_claim(name))
    }

    /// Revokes the token so it never verifies again
    ///
    /// Revoking an unknown token is not an error.
    pub async fn revoke(&self, token: &str) -> Result<(), Error> {
        let token = UntrustedToken::<Public, V4>::try_from(token)
            .map_err(|_| Error::InvalidTokenFormat)?;
        let key_id = Self::key_id(&token)?;
        self.keys.write().await.remove(&key_id);
        Ok(())
    }

    /// Number of tokens which can still be verified
    pub async fn active(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(Duration::from_secs(24 * 60 * 60))
    }

    #[tokio::test]
    async fn verify_with_generated_token() {
        let issuer = issuer();
        let spoc = User::new(2, "spoc", "SPOC User", Role::Spoc);
        let manager = User::new(3, "manager", "Manager User", Role::Manager);

        let token1 = issuer.issue(&spoc).await.unwrap();
        let token2 = issuer.issue(&manager).await.unwrap();
        // Also multiple tokens for single user
        let token3 = issuer.issue(&spoc).await.unwrap();

        assert_eq!(issuer.verify(token1.as_str()).await.unwrap().user, spoc);
        assert_eq!(issuer.verify(token2.as_str()).await.unwrap().user, manager);
        assert_eq!(issuer.verify(token3.as_str()).await.unwrap().user, spoc);

        let claims = issuer.verify(token1.as_str()).await.unwrap();
        assert!(claims.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn verify_with_random_data_fails() {
        let issuer = issuer();
        let _ = issuer.verify("fake_token").await.unwrap_err();
    }

    #[tokio::test]
    async fn revoked_token_fails() {
        let issuer = issuer();
        let user = User::new(1, "intern", "Intern User", Role::Intern);
        let token = issuer.issue(&user).await.unwrap();
        let other = issuer.issue(&user).await.unwrap();

        issuer.revoke(token.as_str()).await.unwrap();
        let _ = issuer.verify(token.as_str()).await.unwrap_err();
        issuer.verify(other.as_str()).await.unwrap();
        assert_eq!(issuer.active().await, 1);
    }

    #[tokio::test]
    async fn token_from_other_issuer_fails() {
        let user = User::new(1, "intern", "Intern User", Role::Intern);
        let token = issuer().issue(&user).await.unwrap();
        let _ = issuer().verify(token.as_str()).await.unwrap_err();
    }

    #[tokio::test]
    async fn unverified_decoding_reads_claims() {
        let issuer = issuer();
        let user = User::new(3, "manager", "Manager User", Role::Manager);
        let token = issuer.issue(&user).await.unwrap();

        let decoded = decode_unverified(&token).unwrap();
        let verified = issuer.verify(token.as_str()).await.unwrap();
        assert_eq!(decoded, verified);

        let _ = decode_unverified(&SessionToken::new("v4.public.garbage")).unwrap_err();
    }
}
