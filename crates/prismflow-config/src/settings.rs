//! PrismFlow settings file
//!
//! ```yaml
//! selfservice:
//!   endpoint: prism.example.com
//!   port: 9440
//!   username: admin
//!   insecure: true
//! ndb:
//!   endpoint: ndb.example.com
//! polling:
//!   app-runlog:
//!     delay_ms: 2000
//!     timeout_secs: 3600
//!   ndb-operation:
//!     not_found: failure
//! ```

use crate::error::{ConfigError, Result};
use crate::find_config_file;
use prismflow_converge::{NotFoundPolicy, OperationKind, PollProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub selfservice: Option<EndpointSettings>,
    pub ndb: Option<EndpointSettings>,

    /// Poll overrides keyed by operation kind name (e.g. `app-runlog`)
    pub polling: BTreeMap<String, PollOverride>,

    /// File the settings were loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Connection settings of one control-plane service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub endpoint: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure: bool,
    pub request_timeout_secs: Option<u64>,
}

impl EndpointSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Partial override of one kind's poll settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollOverride {
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub not_found: Option<NotFoundPolicy>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut settings: Settings =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Load the discovered config file, or defaults when there is none
    pub fn discover() -> Result<Self> {
        match find_config_file() {
            Ok(path) => Self::load(&path),
            Err(ConfigError::ConfigFileNotFound) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Per-kind poll settings with the `polling` overrides applied
    pub fn poll_profile(&self) -> Result<PollProfile> {
        let mut profile = PollProfile::new();

        for (name, entry) in &self.polling {
            let kind: OperationKind = name
                .parse()
                .map_err(|_| ConfigError::UnknownOperationKind(name.clone()))?;

            let mut settings = kind.default_settings();
            if let Some(delay_ms) = entry.delay_ms {
                settings = settings.with_delay(Duration::from_millis(delay_ms));
            }
            if let Some(timeout_secs) = entry.timeout_secs {
                if timeout_secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: format!("polling.{}.timeout_secs", name),
                        reason: "must be greater than zero".to_string(),
                    });
                }
                settings = settings.with_timeout(Duration::from_secs(timeout_secs));
            }
            if let Some(policy) = entry.not_found {
                settings = settings.with_not_found(policy);
            }

            profile.set(kind, settings);
        }

        Ok(profile)
    }

    /// Apply `PRISM_*` and `NDB_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Apply environment-style variables from an arbitrary source
    ///
    /// A set variable wins over the file. An endpoint variable creates the
    /// section when the file has none. A port that is not a number is an
    /// error.
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        apply_section(&mut self.selfservice, "PRISM", &lookup)?;
        apply_section(&mut self.ndb, "NDB", &lookup)
    }
}

fn apply_section(
    section: &mut Option<EndpointSettings>,
    prefix: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let var = |name: &str| lookup(&format!("{}_{}", prefix, name)).filter(|v| !v.is_empty());

    if let Some(endpoint) = var("ENDPOINT") {
        section.get_or_insert_with(EndpointSettings::default).endpoint = endpoint;
    }

    let Some(section) = section.as_mut() else {
        return Ok(());
    };
    if let Some(port) = var("PORT") {
        let port = port.trim().parse().map_err(|e| ConfigError::InvalidValue {
            field: format!("{}_PORT", prefix),
            reason: format!("{:?} is not a port number: {}", port, e),
        })?;
        section.port = Some(port);
    }
    if let Some(username) = var("USERNAME") {
        section.username = Some(username);
    }
    if let Some(password) = var("PASSWORD") {
        section.password = Some(password);
    }
    if let Some(insecure) = var("INSECURE") {
        section.insecure = matches!(insecure.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
    Ok(())
}
