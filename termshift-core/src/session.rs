use std::env;
use std::fmt;

use crate::error::{Result, SweepError};

pub const API_KEY_ENV: &str = "TERMSHIFT_API_KEY";
pub const AUTHTOKEN_ENV: &str = "TERMSHIFT_AUTHTOKEN";
pub const MANAGEMENT_TOKEN_ENV: &str = "TERMSHIFT_MANAGEMENT_TOKEN";
pub const USER_ID_ENV: &str = "TERMSHIFT_USER_ID";

/// How a session proves itself to the storage backend.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A user's auth token, sent as the `authtoken` header.
    AuthToken(String),
    /// A stack management token, sent as the `authorization` header.
    ManagementToken(String),
}

impl Credential {
    pub fn token(&self) -> &str {
        match self {
            Credential::AuthToken(token) | Credential::ManagementToken(token) => token,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::AuthToken(_) => f.write_str("AuthToken(***)"),
            Credential::ManagementToken(_) => f.write_str("ManagementToken(***)"),
        }
    }
}

/// Credentials for one scan or apply.
///
/// A session is created at the start of a request and handed to each
/// collaborator it builds; nothing holds on to it between requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub api_key: String,
    pub credential: Credential,
    pub user_id: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_key", &self.api_key)
            .field("credential", &self.credential)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Session {
    pub fn new(api_key: impl Into<String>, credential: Credential) -> Self {
        Self {
            api_key: api_key.into(),
            credential,
            user_id: None,
        }
    }

    pub fn with_auth_token(api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(api_key, Credential::AuthToken(token.into()))
    }

    pub fn with_management_token(api_key: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(api_key, Credential::ManagementToken(token.into()))
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Build a session from explicit values, falling back to the environment.
    ///
    /// A management token wins over an auth token when both are present.
    pub fn resolve(
        api_key: Option<String>,
        authtoken: Option<String>,
        management_token: Option<String>,
    ) -> Result<Self> {
        let api_key = api_key
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SweepError::Config(format!("missing stack API key (set {} or --api-key)", API_KEY_ENV))
            })?;

        let credential = match management_token.or_else(|| env::var(MANAGEMENT_TOKEN_ENV).ok()) {
            Some(token) if !token.trim().is_empty() => Credential::ManagementToken(token),
            _ => match authtoken.or_else(|| env::var(AUTHTOKEN_ENV).ok()) {
                Some(token) if !token.trim().is_empty() => Credential::AuthToken(token),
                _ => {
                    return Err(SweepError::Config(format!(
                        "missing credentials (set {} or {})",
                        AUTHTOKEN_ENV, MANAGEMENT_TOKEN_ENV
                    )))
                }
            },
        };

        let mut session = Self::new(api_key, credential);
        session.user_id = env::var(USER_ID_ENV).ok().filter(|u| !u.is_empty());
        Ok(session)
    }

    /// Who audit entries are attributed to.
    pub fn actor(&self) -> &str {
        self.user_id.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [API_KEY_ENV, AUTHTOKEN_ENV, MANAGEMENT_TOKEN_ENV, USER_ID_ENV] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let session = Session::with_auth_token("key", "secret-token");
        let debug = format!("{:?}", session);
        assert!(debug.contains("AuthToken(***)"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_actor_defaults_to_unknown() {
        let session = Session::with_management_token("key", "tok");
        assert_eq!(session.actor(), "unknown");
        assert_eq!(session.with_user("editor-7").actor(), "editor-7");
    }

    #[test]
    #[serial]
    fn test_resolve_prefers_explicit_values() {
        clear_env();
        let session = Session::resolve(Some("k".into()), Some("auth".into()), None).unwrap();
        assert_eq!(session.api_key, "k");
        assert_eq!(session.credential, Credential::AuthToken("auth".into()));
    }

    #[test]
    #[serial]
    fn test_resolve_from_env_prefers_management_token() {
        clear_env();
        env::set_var(API_KEY_ENV, "env-key");
        env::set_var(AUTHTOKEN_ENV, "auth");
        env::set_var(MANAGEMENT_TOKEN_ENV, "mgmt");
        env::set_var(USER_ID_ENV, "ops");

        let session = Session::resolve(None, None, None).unwrap();
        assert_eq!(session.api_key, "env-key");
        assert_eq!(session.credential, Credential::ManagementToken("mgmt".into()));
        assert_eq!(session.actor(), "ops");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_resolve_without_credentials_fails() {
        clear_env();
        let result = Session::resolve(Some("k".into()), None, None);
        assert!(matches!(result, Err(SweepError::Config(_))));
    }
}
