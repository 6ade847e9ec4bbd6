//! Suite configuration and credentials.
//!
//! The console accepts two account shapes: a named user, and the system
//! administrator who logs in with a password alone. [`Credential`] makes
//! that a tagged variant instead of a magic username marker, so the login
//! page can branch on the shape without identity comparisons.
//!
//! Environment names match the deployment the suite targets: `CPURL`,
//! `CPPSWD` (administrator password), `CPUSER`/`CPUSERPSWD` (named user).

use crate::result::{VigilarError, VigilarResult};
use serde::{Deserialize, Serialize};

/// Environment variable holding the console base URL
pub const ENV_BASE_URL: &str = "CPURL";
/// Environment variable holding the administrator password
pub const ENV_ADMIN_PASSWORD: &str = "CPPSWD";
/// Environment variable holding the named user's login
pub const ENV_USER_NAME: &str = "CPUSER";
/// Environment variable holding the named user's password
pub const ENV_USER_PASSWORD: &str = "CPUSERPSWD";

/// A console account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    /// A regular account with a login name
    Named {
        /// Login name
        username: String,
        /// Account password
        password: String,
    },
    /// The system administrator, identified by password alone
    AdminOnly {
        /// Administrator password
        password: String,
    },
}

impl Credential {
    /// Create a named-user credential
    #[must_use]
    pub fn named(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Named {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create an administrator credential
    #[must_use]
    pub fn admin_only(password: impl Into<String>) -> Self {
        Self::AdminOnly {
            password: password.into(),
        }
    }

    /// The login name, if this account has one
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Named { username, .. } => Some(username),
            Self::AdminOnly { .. } => None,
        }
    }

    /// The account password
    #[must_use]
    pub fn password(&self) -> &str {
        match self {
            Self::Named { password, .. } | Self::AdminOnly { password } => password,
        }
    }
}

// Passwords must not leak into logs or failure reports.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named { username, .. } => f
                .debug_struct("Named")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::AdminOnly { .. } => f
                .debug_struct("AdminOnly")
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Environment-supplied configuration for one suite run
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Console base URL
    pub base_url: String,
    /// Administrator account
    pub admin: Credential,
    /// Regular named account
    pub user: Credential,
}

impl SuiteConfig {
    /// Create a config explicitly (tests, embedding)
    #[must_use]
    pub fn new(base_url: impl Into<String>, admin: Credential, user: Credential) -> Self {
        Self {
            base_url: base_url.into(),
            admin,
            user,
        }
    }

    /// Read the config from the environment
    pub fn from_env() -> VigilarResult<Self> {
        let base_url = require_env(ENV_BASE_URL)?;
        let admin = Credential::admin_only(require_env(ENV_ADMIN_PASSWORD)?);
        let user = Credential::named(require_env(ENV_USER_NAME)?, require_env(ENV_USER_PASSWORD)?);
        Ok(Self {
            base_url,
            admin,
            user,
        })
    }
}

fn require_env(name: &str) -> VigilarResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(VigilarError::EnvVar {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_credential() {
        let cred = Credential::named("operator", "s3cret");
        assert_eq!(cred.username(), Some("operator"));
        assert_eq!(cred.password(), "s3cret");
    }

    #[test]
    fn test_admin_only_credential_has_no_username() {
        let cred = Credential::admin_only("s3cret");
        assert_eq!(cred.username(), None);
        assert_eq!(cred.password(), "s3cret");
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let named = format!("{:?}", Credential::named("operator", "s3cret"));
        assert!(named.contains("operator"));
        assert!(!named.contains("s3cret"));
        assert!(named.contains("***"));

        let admin = format!("{:?}", Credential::admin_only("s3cret"));
        assert!(!admin.contains("s3cret"));
        assert!(admin.contains("***"));
    }

    #[test]
    fn test_explicit_config() {
        let config = SuiteConfig::new(
            "http://192.168.7.15/",
            Credential::admin_only("adm"),
            Credential::named("user", "pw"),
        );
        assert_eq!(config.base_url, "http://192.168.7.15/");
        assert_eq!(config.admin.username(), None);
        assert_eq!(config.user.username(), Some("user"));
    }

    #[test]
    fn test_from_env_missing_value() {
        // Runs in-process without the deployment environment set up, so at
        // least the base URL should be absent.
        if std::env::var(ENV_BASE_URL).is_err() {
            let err = SuiteConfig::from_env().unwrap_err();
            assert!(matches!(err, VigilarError::EnvVar { .. }));
        }
    }

    #[test]
    fn test_require_env_rejects_empty() {
        std::env::set_var("VIGILAR_TEST_EMPTY", "");
        let err = require_env("VIGILAR_TEST_EMPTY").unwrap_err();
        assert!(matches!(err, VigilarError::EnvVar { name } if name == "VIGILAR_TEST_EMPTY"));
        std::env::remove_var("VIGILAR_TEST_EMPTY");
    }
}
