//! Cloud selection and authentication settings.
//!
//! Settings come from a named entry in `clouds.yaml` with explicit values
//! (command line or `OS_*` environment) layered on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// `auth` block of a clouds.yaml entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthSettings {
    pub auth_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub project_name: Option<String>,
    pub project_id: Option<String>,
    pub user_domain_name: Option<String>,
    pub project_domain_name: Option<String>,
    pub token: Option<String>,
}

impl AuthSettings {
    fn overlay(self, top: AuthSettings) -> AuthSettings {
        AuthSettings {
            auth_url: top.auth_url.or(self.auth_url),
            username: top.username.or(self.username),
            password: top.password.or(self.password),
            project_name: top.project_name.or(self.project_name),
            project_id: top.project_id.or(self.project_id),
            user_domain_name: top.user_domain_name.or(self.user_domain_name),
            project_domain_name: top.project_domain_name.or(self.project_domain_name),
            token: top.token.or(self.token),
        }
    }
}

/// One entry under `clouds:` in clouds.yaml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudEntry {
    #[serde(default)]
    pub auth: AuthSettings,
    pub region_name: Option<String>,
    pub interface: Option<String>,
    pub verify: Option<bool>,
    pub cacert: Option<PathBuf>,
    pub network_endpoint_override: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudsFile {
    #[serde(default)]
    clouds: HashMap<String, CloudEntry>,
}

/// Endpoint interface to pick from the service catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interface {
    #[default]
    Public,
    Internal,
    Admin,
}

impl Interface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Public => "public",
            Interface::Internal => "internal",
            Interface::Admin => "admin",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value.trim_end_matches("URL") {
            "public" => Ok(Interface::Public),
            "internal" => Ok(Interface::Internal),
            "admin" => Ok(Interface::Admin),
            other => Err(Error::Config(format!(
                "interface must be one of public, internal, admin; got '{other}'"
            ))),
        }
    }
}

/// How to prove identity to Keystone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password {
        username: String,
        password: String,
        user_domain_name: String,
    },
    Token(String),
}

/// Explicit settings that take precedence over clouds.yaml.
#[derive(Debug, Clone, Default)]
pub struct CloudOverrides {
    pub cloud: Option<String>,
    pub clouds_file: Option<PathBuf>,
    pub auth: AuthSettings,
    pub region_name: Option<String>,
    pub interface: Option<String>,
    pub network_endpoint: Option<String>,
    pub insecure: bool,
    pub cacert: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// Resolved settings for talking to one cloud.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub auth_url: Option<String>,
    pub credentials: Credentials,
    pub project_name: Option<String>,
    pub project_id: Option<String>,
    pub project_domain_name: String,
    pub region_name: Option<String>,
    pub interface: Interface,
    pub network_endpoint: Option<String>,
    pub verify: bool,
    pub cacert: Option<PathBuf>,
    pub timeout: Duration,
}

/// Places clouds.yaml is looked for when no file is named.
fn default_clouds_files() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("clouds.yaml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("openstack").join("clouds.yaml"));
    }
    paths.push(PathBuf::from("/etc/openstack/clouds.yaml"));
    paths
}

/// Find the clouds.yaml to read.
pub fn find_clouds_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(Error::Setup(format!("clouds file {} not found", path.display())))
        };
    }
    default_clouds_files()
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| Error::Setup("no clouds.yaml found".to_string()))
}

/// Look up `name` in the clouds.yaml content.
pub fn parse_cloud_entry(content: &str, name: &str) -> Result<CloudEntry> {
    let file: CloudsFile = serde_yaml::from_str(content)
        .map_err(|e| Error::Setup(format!("invalid clouds.yaml: {e}")))?;
    file.clouds
        .get(name)
        .cloned()
        .ok_or_else(|| Error::Setup(format!("cloud '{name}' not found in clouds.yaml")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl CloudConfig {
    /// Resolve settings, reading clouds.yaml when a cloud is named.
    pub fn resolve(overrides: CloudOverrides) -> Result<Self> {
        let entry = match overrides.cloud.as_deref() {
            Some(name) => {
                let path = find_clouds_file(overrides.clouds_file.as_deref())?;
                debug!("Reading cloud '{}' from {}", name, path.display());
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Setup(format!("cannot read {}: {e}", path.display()))
                })?;
                parse_cloud_entry(&content, name)?
            }
            None => CloudEntry::default(),
        };
        Self::from_entry(entry, overrides)
    }

    /// Layer `overrides` on top of a clouds.yaml entry and validate.
    pub fn from_entry(entry: CloudEntry, overrides: CloudOverrides) -> Result<Self> {
        let auth = entry.auth.overlay(overrides.auth);
        let interface = match overrides.interface.or(entry.interface) {
            Some(value) => Interface::parse(&value)?,
            None => Interface::default(),
        };
        let network_endpoint =
            non_empty(overrides.network_endpoint.or(entry.network_endpoint_override));

        let credentials = match (
            non_empty(auth.token),
            non_empty(auth.username),
            auth.password,
        ) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(username), Some(password)) => Credentials::Password {
                username,
                password,
                user_domain_name: auth.user_domain_name.unwrap_or_else(|| "Default".to_string()),
            },
            (None, Some(_), None) => {
                return Err(Error::Setup("password is required with username".to_string()));
            }
            (None, None, _) => {
                return Err(Error::Setup(
                    "no credentials: set a token or username and password".to_string(),
                ));
            }
        };

        let auth_url = non_empty(auth.auth_url);
        let skips_keystone = matches!(credentials, Credentials::Token(_)) && network_endpoint.is_some();
        if auth_url.is_none() && !skips_keystone {
            return Err(Error::Setup("auth_url is required".to_string()));
        }

        Ok(CloudConfig {
            auth_url,
            credentials,
            project_name: non_empty(auth.project_name),
            project_id: non_empty(auth.project_id),
            project_domain_name: auth
                .project_domain_name
                .unwrap_or_else(|| "Default".to_string()),
            region_name: non_empty(overrides.region_name.or(entry.region_name)),
            interface,
            network_endpoint,
            verify: !overrides.insecure && entry.verify.unwrap_or(true),
            cacert: overrides.cacert.or(entry.cacert),
            timeout: overrides.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    /// Whether a token must be requested from Keystone.
    pub fn needs_keystone(&self) -> bool {
        !(matches!(self.credentials, Credentials::Token(_)) && self.network_endpoint.is_some())
    }
}
