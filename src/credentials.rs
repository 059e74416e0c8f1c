use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Login for the destination site.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Looks up destination-site logins by account name.
pub trait CredentialSource: Send + Sync {
    fn credentials(&self, account: &str) -> Result<Credentials>;

    /// Known account names, sorted.
    fn accounts(&self) -> Vec<String>;
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    accounts: BTreeMap<String, Credentials>,
}

/// Credentials kept in a TOML file:
///
/// ```toml
/// [accounts.default]
/// username = "agent@example.com"
/// password = "..."
/// ```
#[derive(Debug, Default)]
pub struct TomlCredentials {
    accounts: BTreeMap<String, Credentials>,
}

impl TomlCredentials {
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: CredentialsFile =
            toml::from_str(text).map_err(|e| Error::ConfigError(format!("credentials: {e}")))?;
        Ok(Self {
            accounts: file.accounts,
        })
    }

    /// A missing file yields an empty source; lookups then fail by account.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no credentials file");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialSource for TomlCredentials {
    fn credentials(&self, account: &str) -> Result<Credentials> {
        self.accounts
            .get(account)
            .cloned()
            .ok_or_else(|| Error::ConfigError(format!("no credentials for account {account:?}")))
    }

    fn accounts(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }
}
