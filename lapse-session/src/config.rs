//! Engine configuration.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default name for session cookies.
pub const DEFAULT_NAME: &str = "LAPSESESSID";

/// Default prefix used for session keys.
pub const DEFAULT_PREFIX: &str = "lapse:session";

/// Default length of generated session IDs.
pub const DEFAULT_ID_LENGTH: usize = 64;

/// Shortest session ID length accepted by [`EngineProperties::validate`].
pub const MIN_ID_LENGTH: usize = 16;

/// Prefix of the environment variables read by [`EngineProperties::from_env`].
pub const ENV_PREFIX: &str = "LAPSE_SESSION";

/// Store engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProperties {
    /// Maximum idle duration before a session expires
    pub age_limit: Duration,
    /// Initial value of the engine's enabled switch
    pub enabled: bool,
    /// Session name (the cookie name used by HTTP integrations)
    pub name: String,
    /// Key namespace for backends that share a keyspace
    pub prefix: String,
    /// How often the background purge runs
    pub purge_interval: Duration,
    /// Length of generated session IDs
    pub id_length: usize,
}

impl Default for EngineProperties {
    fn default() -> Self {
        Self {
            age_limit: Duration::from_secs(30 * 60),
            enabled: true,
            name: DEFAULT_NAME.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            purge_interval: Duration::from_secs(2 * 60),
            id_length: DEFAULT_ID_LENGTH,
        }
    }
}

/// On-disk representation; durations are whole seconds.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawProperties {
    age_limit_secs: Option<u64>,
    enabled: Option<bool>,
    name: Option<String>,
    prefix: Option<String>,
    purge_interval_secs: Option<u64>,
    id_length: Option<usize>,
}

impl RawProperties {
    fn into_properties(self) -> EngineProperties {
        let defaults = EngineProperties::default();
        EngineProperties {
            age_limit: self
                .age_limit_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.age_limit),
            enabled: self.enabled.unwrap_or(defaults.enabled),
            name: self.name.unwrap_or(defaults.name),
            prefix: self.prefix.unwrap_or(defaults.prefix),
            purge_interval: self
                .purge_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.purge_interval),
            id_length: self.id_length.unwrap_or(defaults.id_length),
        }
    }
}

impl EngineProperties {
    /// Create properties with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties from a TOML document.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use lapse_session::EngineProperties;
    /// use std::time::Duration;
    ///
    /// let props = EngineProperties::from_toml_str(r#"
    ///     age_limit_secs = 7
    ///     purge_interval_secs = 15
    ///     name = "FIRENADOSESSID"
    /// "#).unwrap();
    ///
    /// assert_eq!(props.age_limit, Duration::from_secs(7));
    /// assert_eq!(props.name, "FIRENADOSESSID");
    /// ```
    pub fn from_toml_str(content: &str) -> SessionResult<Self> {
        let raw: RawProperties = toml::from_str(content)
            .map_err(|e| SessionError::Config(format!("TOML parse error: {}", e)))?;
        let props = raw.into_properties();
        props.validate()?;
        Ok(props)
    }

    /// Load properties from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load properties from `LAPSE_SESSION_*` environment variables.
    ///
    /// Recognized variables: `LAPSE_SESSION_AGE_LIMIT_SECS`,
    /// `LAPSE_SESSION_ENABLED`, `LAPSE_SESSION_NAME`, `LAPSE_SESSION_PREFIX`,
    /// `LAPSE_SESSION_PURGE_INTERVAL_SECS` and `LAPSE_SESSION_ID_LENGTH`.
    pub fn from_env() -> SessionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load properties through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> SessionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));

        let raw = RawProperties {
            age_limit_secs: parse_var("AGE_LIMIT_SECS", var("AGE_LIMIT_SECS"))?,
            enabled: var("ENABLED")
                .map(|v| parse_bool("ENABLED", &v))
                .transpose()?,
            name: var("NAME"),
            prefix: var("PREFIX"),
            purge_interval_secs: parse_var("PURGE_INTERVAL_SECS", var("PURGE_INTERVAL_SECS"))?,
            id_length: parse_var("ID_LENGTH", var("ID_LENGTH"))?,
        };

        let props = raw.into_properties();
        props.validate()?;
        Ok(props)
    }

    /// Check that the properties describe a usable engine.
    pub fn validate(&self) -> SessionResult<()> {
        if self.age_limit.is_zero() {
            return Err(SessionError::Config(
                "age_limit must be greater than zero".to_string(),
            ));
        }
        if self.purge_interval.is_zero() {
            return Err(SessionError::Config(
                "purge_interval must be greater than zero".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(SessionError::Config("name must not be empty".to_string()));
        }
        if self.id_length < MIN_ID_LENGTH {
            return Err(SessionError::Config(format!(
                "id_length must be at least {}",
                MIN_ID_LENGTH
            )));
        }
        Ok(())
    }

    /// Set the maximum idle duration.
    pub fn with_age_limit(mut self, age_limit: Duration) -> Self {
        self.age_limit = age_limit;
        self
    }

    /// Set the initial enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the session name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the key namespace.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the purge interval.
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Set the generated ID length.
    pub fn with_id_length(mut self, length: usize) -> Self {
        self.id_length = length;
        self
    }

    /// Build the namespaced key for a session ID.
    pub fn session_key(&self, session_id: &str) -> String {
        if self.prefix.is_empty() {
            session_id.to_string()
        } else {
            format!("{}:{}", self.prefix, session_id)
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>) -> SessionResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| {
                SessionError::Config(format!("{}_{}: {}", ENV_PREFIX, name, e))
            })
        })
        .transpose()
}

fn parse_bool(name: &str, value: &str) -> SessionResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SessionError::Config(format!(
            "{}_{}: invalid boolean {:?}",
            ENV_PREFIX, name, other
        ))),
    }
}
