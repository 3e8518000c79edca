//! Desired port configuration.
//!
//! Options come from an optional YAML/JSON spec file overlaid with
//! command-line values, and are validated into a [`PortSpec`] before the
//! cloud is contacted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::port::{AddressPair, DhcpOption, FixedIp, PortAttributes};

/// Lifecycle intent for the port.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

/// Validated desired state of one port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub port_id: Option<String>,
    pub network_id: Option<String>,
    pub state: DesiredState,
    pub attributes: PortAttributes,
}

impl PortSpec {
    /// Spec for a port identified by name.
    pub fn named(name: impl Into<String>, state: DesiredState) -> Self {
        Self {
            port_id: None,
            network_id: None,
            state,
            attributes: PortAttributes {
                name: Some(name.into()),
                ..Default::default()
            },
        }
    }

    /// Spec for a port identified by id.
    pub fn with_id(port_id: impl Into<String>, state: DesiredState) -> Self {
        Self {
            port_id: Some(port_id.into()),
            network_id: None,
            state,
            attributes: PortAttributes::default(),
        }
    }

    /// Id-or-name used to find the port: `port_id` wins over `name`.
    pub fn lookup_key(&self) -> Result<&str> {
        self.port_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.attributes
                    .name
                    .as_deref()
                    .filter(|name| !name.is_empty())
            })
            .ok_or(Error::MissingIdentity)
    }
}

/// Port options as written in a spec file or given on the command line.
///
/// Every field is optional here; [`PortOptions::into_spec`] enforces what
/// is required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortOptions {
    pub port_id: Option<String>,
    pub network_id: Option<String>,
    pub state: Option<DesiredState>,
    pub name: Option<String>,
    pub admin_state_up: Option<bool>,
    pub mac_address: Option<String>,
    pub fixed_ips: Option<Vec<FixedIp>>,
    pub subnet_id: Option<String>,
    pub ip_address: Option<String>,
    pub security_groups: Option<Vec<String>>,
    pub allowed_address_pairs: Option<Vec<AddressPair>>,
    pub extra_dhcp_opts: Option<Vec<DhcpOption>>,
    pub device_owner: Option<String>,
    pub device_id: Option<String>,
}

impl PortOptions {
    /// Parse a YAML (or JSON) spec document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(format!("invalid port spec: {e}")))
    }

    /// Read a spec file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{msg} (in {})", path.display())),
            other => other,
        })
    }

    /// Values set in `top` replace the ones in `self`.
    pub fn overlay(self, top: PortOptions) -> PortOptions {
        PortOptions {
            port_id: top.port_id.or(self.port_id),
            network_id: top.network_id.or(self.network_id),
            state: top.state.or(self.state),
            name: top.name.or(self.name),
            admin_state_up: top.admin_state_up.or(self.admin_state_up),
            mac_address: top.mac_address.or(self.mac_address),
            fixed_ips: top.fixed_ips.or(self.fixed_ips),
            subnet_id: top.subnet_id.or(self.subnet_id),
            ip_address: top.ip_address.or(self.ip_address),
            security_groups: top.security_groups.or(self.security_groups),
            allowed_address_pairs: top.allowed_address_pairs.or(self.allowed_address_pairs),
            extra_dhcp_opts: top.extra_dhcp_opts.or(self.extra_dhcp_opts),
            device_owner: top.device_owner.or(self.device_owner),
            device_id: top.device_id.or(self.device_id),
        }
    }

    /// Validate into a [`PortSpec`].
    pub fn into_spec(self) -> Result<PortSpec> {
        let spec = PortSpec {
            port_id: self.port_id,
            network_id: self.network_id,
            state: self.state.unwrap_or_default(),
            attributes: PortAttributes {
                name: self.name,
                admin_state_up: self.admin_state_up,
                mac_address: self.mac_address,
                fixed_ips: self.fixed_ips,
                subnet_id: self.subnet_id,
                ip_address: self.ip_address,
                security_groups: self.security_groups,
                allowed_address_pairs: self.allowed_address_pairs,
                extra_dhcp_opts: self.extra_dhcp_opts,
                device_owner: self.device_owner,
                device_id: self.device_id,
            },
        };
        spec.lookup_key()?;
        Ok(spec)
    }
}
