//! Extension configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! endpoint = "https://billing.api.example.com"
//! timeout_secs = 30
//!
//! [user]
//! endpoint = "https://identity.api.rackspacecloud.com"
//! username = "fuzzer"
//! api_key = "$RAX_API_KEY"
//!
//! [users.admin]
//! username = "fuzz-admin"
//! api_key = "${RAX_ADMIN_KEY}"
//!
//! [billing]
//! ran = "020-1234567"
//!
//! [payment]
//! ran = "020-1234567"
//! ```
//!
//! # Environment Variables
//!
//! - `RAX_CONFIG`: path to the configuration file (default: `rax.toml`)
//! - Credentials referenced by `$VAR` in the config file

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the default credential section.
pub const DEFAULT_USER_SECTION: &str = "user";

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "RAX_CONFIG";

/// Errors raised while loading or reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A named user section does not exist.
    #[error("no `[users.{0}]` section in config")]
    MissingSection(String),
    /// A credential field is set neither in its section nor in `[user]`.
    #[error("`{field}` is not set for user section `{section}` or `[user]`")]
    MissingField {
        /// Section that was resolved.
        section: String,
        /// Missing field.
        field: &'static str,
    },
    /// An extension has no account number configured.
    #[error("`[{0}] ran` is not set")]
    MissingAccount(&'static str),
    /// The API endpoint is not configured.
    #[error("`endpoint` is not set")]
    MissingEndpoint,
}

/// Top-level extension configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Base URL of the billing / payment API.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds (default: `30`).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default credential section.
    #[serde(default)]
    pub user: UserSection,

    /// Additional credential sections keyed by name.
    #[serde(default)]
    pub users: HashMap<String, UserSection>,

    /// Billing system settings.
    #[serde(default)]
    pub billing: AccountSection,

    /// Payment system settings.
    #[serde(default)]
    pub payment: AccountSection,
}

/// A credential block. Unset fields fall back to `[user]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSection {
    /// Identity service endpoint.
    pub endpoint: Option<String>,
    /// Account user name.
    pub username: Option<String>,
    /// API key.
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
}

/// Per-extension account settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSection {
    /// Account number used in resource paths.
    pub ran: Option<String>,
}

/// Fully resolved identity credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Identity service endpoint.
    pub endpoint: String,
    /// Account user name.
    pub username: String,
    /// API key.
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

impl ExtensionConfig {
    /// Loads configuration from the path given by the `RAX_CONFIG`
    /// environment variable, falling back to `rax.toml` in the current
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "rax.toml".to_owned());
        Self::load_from(path)
    }

    /// Loads configuration from a specific file path. A missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml(&content)
    }

    /// Parses configuration text after expanding environment references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content))?)
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The billing / payment API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEndpoint`] if unset.
    pub fn api_endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint.as_deref().ok_or(ConfigError::MissingEndpoint)
    }

    /// The billing system account number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAccount`] if unset.
    pub fn billing_ran(&self) -> Result<&str, ConfigError> {
        self.billing
            .ran
            .as_deref()
            .ok_or(ConfigError::MissingAccount("billing"))
    }

    /// The payment system account number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAccount`] if unset.
    pub fn payment_ran(&self) -> Result<&str, ConfigError> {
        self.payment
            .ran
            .as_deref()
            .ok_or(ConfigError::MissingAccount("payment"))
    }

    /// Resolves the credentials of a user section, each field falling back
    /// to `[user]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSection`] for an unknown section and
    /// [`ConfigError::MissingField`] when a field is set nowhere.
    pub fn credentials(&self, section: &str) -> Result<Credentials, ConfigError> {
        let named = if section == DEFAULT_USER_SECTION {
            &self.user
        } else {
            self.users
                .get(section)
                .ok_or_else(|| ConfigError::MissingSection(section.to_owned()))?
        };
        let field = |own: &Option<String>, fallback: &Option<String>, name: &'static str| {
            own.as_ref()
                .or(fallback.as_ref())
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| ConfigError::MissingField {
                    section: section.to_owned(),
                    field: name,
                })
        };
        Ok(Credentials {
            endpoint: field(&named.endpoint, &self.user.endpoint, "endpoint")?,
            username: field(&named.username, &self.user.username, "username")?,
            api_key: field(&named.api_key, &self.user.api_key, "api_key")?,
        })
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed, braced) = if let Some(inner) = after.strip_prefix('{') {
            match inner.find('}') {
                Some(end) => (&inner[..end], end + 2, true),
                None => ("", 0, true),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end, false)
        };

        match (!name.is_empty()).then(|| std::env::var(name).ok()).flatten() {
            Some(value) => result.push_str(&value),
            None if name.is_empty() => {
                result.push('$');
                rest = after;
                continue;
            }
            None if braced => {
                result.push_str("${");
                result.push_str(name);
                result.push('}');
            }
            None => {
                result.push('$');
                result.push_str(name);
            }
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
endpoint = "https://billing.example.com"

[user]
endpoint = "https://identity.example.com/v2.0"
username = "fuzzer"
api_key = "key-1"

[users.admin]
username = "admin"

[billing]
ran = "020-111"
"#;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = ExtensionConfig::from_toml("").unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(matches!(config.api_endpoint(), Err(ConfigError::MissingEndpoint)));
        assert!(matches!(
            config.payment_ran(),
            Err(ConfigError::MissingAccount("payment"))
        ));
    }

    #[test]
    fn test_named_section_falls_back_to_user() {
        let config = ExtensionConfig::from_toml(SAMPLE).unwrap();
        let admin = config.credentials("admin").unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.api_key, "key-1");
        assert_eq!(admin.endpoint, "https://identity.example.com/v2.0");
        assert_eq!(config.credentials("user").unwrap().username, "fuzzer");
        assert_eq!(config.billing_ran().unwrap(), "020-111");
    }

    #[test]
    fn test_unknown_section_and_missing_field() {
        let config = ExtensionConfig::from_toml(SAMPLE).unwrap();
        assert!(matches!(
            config.credentials("nobody"),
            Err(ConfigError::MissingSection(name)) if name == "nobody"
        ));

        let config = ExtensionConfig::from_toml("[user]\nusername = \"u\"\n").unwrap();
        assert!(matches!(
            config.credentials("user"),
            Err(ConfigError::MissingField { field: "endpoint", .. })
        ));
    }

    #[test]
    fn test_api_key_alias() {
        let config =
            ExtensionConfig::from_toml("[user]\nendpoint = \"e\"\nusername = \"u\"\napiKey = \"k\"\n")
                .unwrap();
        assert_eq!(config.credentials("user").unwrap().api_key, "k");
    }

    #[test]
    fn test_expand_env_vars() {
        // PATH is set in every test environment.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("a=$PATH;"), format!("a={path};"));
        assert_eq!(expand_env_vars("${PATH}x"), format!("{path}x"));
        assert_eq!(
            expand_env_vars("$RAX_SURELY_UNSET_VAR ${RAX_SURELY_UNSET_VAR}"),
            "$RAX_SURELY_UNSET_VAR ${RAX_SURELY_UNSET_VAR}"
        );
        assert_eq!(expand_env_vars("cost: $ 5 and ${"), "cost: $ 5 and ${");
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = ExtensionConfig::load_from("/nonexistent/rax.toml").unwrap();
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let config = ExtensionConfig::from_toml(SAMPLE).unwrap();
        let rendered = format!("{:?}", config.credentials("user").unwrap());
        assert!(!rendered.contains("key-1"));
    }
}
