//! Port data model.
//!
//! [`PortAttributes`] is the desired side: every field optional, `None`
//! meaning "leave it to the cloud". [`Port`] is the observed side as the
//! networking service reports it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attributes a port can be created with.
pub const CREATE_ATTRIBUTES: &[PortAttribute] = &[
    PortAttribute::Name,
    PortAttribute::AdminStateUp,
    PortAttribute::MacAddress,
    PortAttribute::FixedIps,
    PortAttribute::SubnetId,
    PortAttribute::IpAddress,
    PortAttribute::SecurityGroups,
    PortAttribute::AllowedAddressPairs,
    PortAttribute::ExtraDhcpOpts,
    PortAttribute::DeviceOwner,
    PortAttribute::DeviceId,
];

/// Attributes that can be changed on an existing port.
///
/// mac_address, subnet_id, ip_address and device_id are create-only.
pub const UPDATE_ATTRIBUTES: &[PortAttribute] = &[
    PortAttribute::Name,
    PortAttribute::AdminStateUp,
    PortAttribute::FixedIps,
    PortAttribute::SecurityGroups,
    PortAttribute::AllowedAddressPairs,
    PortAttribute::ExtraDhcpOpts,
    PortAttribute::DeviceOwner,
];

/// Name of a managed port attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortAttribute {
    Name,
    AdminStateUp,
    MacAddress,
    FixedIps,
    SubnetId,
    IpAddress,
    SecurityGroups,
    AllowedAddressPairs,
    ExtraDhcpOpts,
    DeviceOwner,
    DeviceId,
}

impl PortAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortAttribute::Name => "name",
            PortAttribute::AdminStateUp => "admin_state_up",
            PortAttribute::MacAddress => "mac_address",
            PortAttribute::FixedIps => "fixed_ips",
            PortAttribute::SubnetId => "subnet_id",
            PortAttribute::IpAddress => "ip_address",
            PortAttribute::SecurityGroups => "security_groups",
            PortAttribute::AllowedAddressPairs => "allowed_address_pairs",
            PortAttribute::ExtraDhcpOpts => "extra_dhcp_opts",
            PortAttribute::DeviceOwner => "device_owner",
            PortAttribute::DeviceId => "device_id",
        }
    }
}

impl fmt::Display for PortAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed IP assignment on a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// An extra address the port may send traffic from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPair {
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// A DHCP option served to the port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpOption {
    pub opt_name: String,
    pub opt_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<u8>,
}

/// Split `key=value,key=value` into pairs.
fn parse_pairs(s: &str) -> Result<Vec<(&str, &str)>, String> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| format!("expected key=value, got '{}'", part.trim()))
        })
        .collect()
}

impl FromStr for FixedIp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ip = FixedIp::default();
        for (key, value) in parse_pairs(s)? {
            match key {
                "subnet_id" => ip.subnet_id = Some(value.to_string()),
                "ip_address" => ip.ip_address = Some(value.to_string()),
                other => return Err(format!("unknown fixed_ips key '{other}'")),
            }
        }
        if ip.subnet_id.is_none() && ip.ip_address.is_none() {
            return Err("fixed_ips entry needs subnet_id or ip_address".to_string());
        }
        Ok(ip)
    }
}

impl FromStr for AddressPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ip_address = None;
        let mut mac_address = None;
        for (key, value) in parse_pairs(s)? {
            match key {
                "ip_address" => ip_address = Some(value.to_string()),
                "mac_address" => mac_address = Some(value.to_string()),
                other => return Err(format!("unknown allowed_address_pairs key '{other}'")),
            }
        }
        let ip_address =
            ip_address.ok_or_else(|| "allowed_address_pairs entry needs ip_address".to_string())?;
        Ok(AddressPair {
            ip_address,
            mac_address,
        })
    }
}

impl FromStr for DhcpOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut opt_name = None;
        let mut opt_value = None;
        let mut ip_version = None;
        for (key, value) in parse_pairs(s)? {
            match key {
                "opt_name" => opt_name = Some(value.to_string()),
                "opt_value" => opt_value = Some(value.to_string()),
                "ip_version" => match value {
                    "4" => ip_version = Some(4),
                    "6" => ip_version = Some(6),
                    _ => return Err(format!("ip_version must be 4 or 6, got '{value}'")),
                },
                other => return Err(format!("unknown extra_dhcp_opts key '{other}'")),
            }
        }
        match (opt_name, opt_value) {
            (Some(opt_name), Some(opt_value)) => Ok(DhcpOption {
                opt_name,
                opt_value,
                ip_version,
            }),
            _ => Err("extra_dhcp_opts entry needs opt_name and opt_value".to_string()),
        }
    }
}

/// Desired port attributes. `None` fields are never sent to the cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_ips: Option<Vec<FixedIp>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_address_pairs: Option<Vec<AddressPair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_dhcp_opts: Option<Vec<DhcpOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl PortAttributes {
    /// Whether a value is specified for `attr`.
    pub fn is_set(&self, attr: PortAttribute) -> bool {
        match attr {
            PortAttribute::Name => self.name.is_some(),
            PortAttribute::AdminStateUp => self.admin_state_up.is_some(),
            PortAttribute::MacAddress => self.mac_address.is_some(),
            PortAttribute::FixedIps => self.fixed_ips.is_some(),
            PortAttribute::SubnetId => self.subnet_id.is_some(),
            PortAttribute::IpAddress => self.ip_address.is_some(),
            PortAttribute::SecurityGroups => self.security_groups.is_some(),
            PortAttribute::AllowedAddressPairs => self.allowed_address_pairs.is_some(),
            PortAttribute::ExtraDhcpOpts => self.extra_dhcp_opts.is_some(),
            PortAttribute::DeviceOwner => self.device_owner.is_some(),
            PortAttribute::DeviceId => self.device_id.is_some(),
        }
    }

    /// Copy of `self` restricted to the attributes in `attrs`.
    pub fn select(&self, attrs: &[PortAttribute]) -> PortAttributes {
        let mut out = PortAttributes::default();
        for attr in attrs {
            match attr {
                PortAttribute::Name => out.name = self.name.clone(),
                PortAttribute::AdminStateUp => out.admin_state_up = self.admin_state_up,
                PortAttribute::MacAddress => out.mac_address = self.mac_address.clone(),
                PortAttribute::FixedIps => out.fixed_ips = self.fixed_ips.clone(),
                PortAttribute::SubnetId => out.subnet_id = self.subnet_id.clone(),
                PortAttribute::IpAddress => out.ip_address = self.ip_address.clone(),
                PortAttribute::SecurityGroups => {
                    out.security_groups = self.security_groups.clone()
                }
                PortAttribute::AllowedAddressPairs => {
                    out.allowed_address_pairs = self.allowed_address_pairs.clone()
                }
                PortAttribute::ExtraDhcpOpts => out.extra_dhcp_opts = self.extra_dhcp_opts.clone(),
                PortAttribute::DeviceOwner => out.device_owner = self.device_owner.clone(),
                PortAttribute::DeviceId => out.device_id = self.device_id.clone(),
            }
        }
        out
    }

    /// The specified attributes, in `CREATE_ATTRIBUTES` order.
    pub fn specified(&self) -> Vec<PortAttribute> {
        CREATE_ATTRIBUTES
            .iter()
            .copied()
            .filter(|attr| self.is_set(*attr))
            .collect()
    }
}

fn default_admin_state_up() -> bool {
    true
}

/// A port as reported by the networking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub network_id: String,
    #[serde(default = "default_admin_state_up")]
    pub admin_state_up: bool,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub allowed_address_pairs: Vec<AddressPair>,
    #[serde(default)]
    pub extra_dhcp_opts: Vec<DhcpOption>,
    #[serde(default)]
    pub device_owner: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Everything else the service returned, kept for the result snapshot.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Port {
    /// Whether the desired value of `attr` differs from this port.
    ///
    /// Unspecified desired values never differ. Specified values compare by
    /// plain equality, lists in order and entries field by field, so values
    /// the service fills in (an address pair's `mac_address`, a DHCP
    /// option's `ip_version`) must be given to match.
    pub fn differs(&self, attr: PortAttribute, desired: &PortAttributes) -> bool {
        match attr {
            PortAttribute::Name => desired.name.as_ref().is_some_and(|v| *v != self.name),
            PortAttribute::AdminStateUp => desired
                .admin_state_up
                .is_some_and(|v| v != self.admin_state_up),
            PortAttribute::MacAddress => desired
                .mac_address
                .as_ref()
                .is_some_and(|v| *v != self.mac_address),
            PortAttribute::FixedIps => desired
                .fixed_ips
                .as_ref()
                .is_some_and(|v| *v != self.fixed_ips),
            PortAttribute::SecurityGroups => desired
                .security_groups
                .as_ref()
                .is_some_and(|v| *v != self.security_groups),
            PortAttribute::AllowedAddressPairs => desired
                .allowed_address_pairs
                .as_ref()
                .is_some_and(|v| *v != self.allowed_address_pairs),
            PortAttribute::ExtraDhcpOpts => desired
                .extra_dhcp_opts
                .as_ref()
                .is_some_and(|v| *v != self.extra_dhcp_opts),
            PortAttribute::DeviceOwner => desired
                .device_owner
                .as_ref()
                .is_some_and(|v| *v != self.device_owner),
            PortAttribute::DeviceId => desired
                .device_id
                .as_ref()
                .is_some_and(|v| *v != self.device_id),
            // Creation shorthands, not part of the port representation.
            PortAttribute::SubnetId | PortAttribute::IpAddress => false,
        }
    }

    /// Attributes in `attrs` whose desired value differs, in `attrs` order.
    pub fn drift(&self, desired: &PortAttributes, attrs: &[PortAttribute]) -> Vec<PortAttribute> {
        attrs
            .iter()
            .copied()
            .filter(|attr| self.differs(*attr, desired))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed() -> Port {
        serde_json::from_value(json!({
            "id": "abc",
            "name": "t1port",
            "network_id": "net-1",
            "admin_state_up": true,
            "mac_address": "fa:16:3e:00:00:01",
            "fixed_ips": [{"subnet_id": "sub-1", "ip_address": "10.0.0.5"}],
            "security_groups": ["sg-1"],
            "allowed_address_pairs": [],
            "extra_dhcp_opts": [],
            "device_owner": "",
            "device_id": "",
            "status": "DOWN",
            "binding:vnic_type": "normal"
        }))
        .unwrap()
    }

    #[test]
    fn test_update_set_excludes_create_only() {
        for attr in [
            PortAttribute::MacAddress,
            PortAttribute::SubnetId,
            PortAttribute::IpAddress,
            PortAttribute::DeviceId,
        ] {
            assert!(CREATE_ATTRIBUTES.contains(&attr));
            assert!(!UPDATE_ATTRIBUTES.contains(&attr));
        }
        for attr in UPDATE_ATTRIBUTES {
            assert!(CREATE_ATTRIBUTES.contains(attr));
        }
    }

    #[test]
    fn test_select_drops_unlisted_and_unset() {
        let desired = PortAttributes {
            name: Some("t1port".into()),
            mac_address: Some("fa:16:3e:00:00:02".into()),
            device_owner: None,
            ..Default::default()
        };

        let update = desired.select(UPDATE_ATTRIBUTES);
        assert_eq!(update.name.as_deref(), Some("t1port"));
        assert!(update.mac_address.is_none());
        assert_eq!(update.specified(), vec![PortAttribute::Name]);

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, json!({"name": "t1port"}));
    }

    #[test]
    fn test_list_entries_compare_exactly() {
        let mut port = observed();
        port.allowed_address_pairs = vec![AddressPair {
            ip_address: "10.0.0.100".into(),
            mac_address: Some("fa:16:3e:00:00:01".into()),
        }];
        port.extra_dhcp_opts = vec![DhcpOption {
            opt_name: "mtu".into(),
            opt_value: "1450".into(),
            ip_version: Some(4),
        }];

        let partial = PortAttributes {
            allowed_address_pairs: Some(vec![AddressPair {
                ip_address: "10.0.0.100".into(),
                mac_address: None,
            }]),
            extra_dhcp_opts: Some(vec![DhcpOption {
                opt_name: "mtu".into(),
                opt_value: "1450".into(),
                ip_version: None,
            }]),
            ..Default::default()
        };
        assert_eq!(
            port.drift(&partial, UPDATE_ATTRIBUTES),
            vec![
                PortAttribute::AllowedAddressPairs,
                PortAttribute::ExtraDhcpOpts
            ]
        );

        let full = PortAttributes {
            allowed_address_pairs: Some(port.allowed_address_pairs.clone()),
            extra_dhcp_opts: Some(port.extra_dhcp_opts.clone()),
            ..Default::default()
        };
        assert!(port.drift(&full, UPDATE_ATTRIBUTES).is_empty());
    }

    #[test]
    fn test_drift_ignores_unspecified() {
        let port = observed();
        assert!(port.drift(&PortAttributes::default(), UPDATE_ATTRIBUTES).is_empty());

        let same = PortAttributes {
            name: Some("t1port".into()),
            admin_state_up: Some(true),
            security_groups: Some(vec!["sg-1".into()]),
            ..Default::default()
        };
        assert!(port.drift(&same, UPDATE_ATTRIBUTES).is_empty());
    }

    #[test]
    fn test_drift_reports_differences_in_order() {
        let port = observed();
        let desired = PortAttributes {
            admin_state_up: Some(false),
            security_groups: Some(vec!["sg-1".into(), "sg-2".into()]),
            mac_address: Some("fa:16:3e:00:00:99".into()),
            ..Default::default()
        };
        assert_eq!(
            port.drift(&desired, UPDATE_ATTRIBUTES),
            vec![PortAttribute::AdminStateUp, PortAttribute::SecurityGroups]
        );
        // mac_address only counts when asked for
        assert_eq!(
            port.drift(&desired, &[PortAttribute::MacAddress]),
            vec![PortAttribute::MacAddress]
        );
    }

    #[test]
    fn test_port_keeps_unknown_fields() {
        let port = observed();
        assert_eq!(port.extra.get("binding:vnic_type"), Some(&json!("normal")));
        let back = serde_json::to_value(&port).unwrap();
        assert_eq!(back["binding:vnic_type"], "normal");
        assert_eq!(back["id"], "abc");
    }

    #[test]
    fn test_parse_fixed_ip() {
        let ip: FixedIp = "subnet_id=sub-1, ip_address=10.0.0.5".parse().unwrap();
        assert_eq!(ip.subnet_id.as_deref(), Some("sub-1"));
        assert_eq!(ip.ip_address.as_deref(), Some("10.0.0.5"));

        assert!("".parse::<FixedIp>().is_err());
        assert!("subnet=sub-1".parse::<FixedIp>().is_err());
        assert!("subnet_id".parse::<FixedIp>().is_err());
    }

    #[test]
    fn test_parse_address_pair_and_dhcp_option() {
        let pair: AddressPair = "ip_address=10.0.0.0/24".parse().unwrap();
        assert_eq!(pair.ip_address, "10.0.0.0/24");
        assert!(pair.mac_address.is_none());
        assert!("mac_address=fa:16:3e:00:00:01".parse::<AddressPair>().is_err());

        let opt: DhcpOption = "opt_name=bootfile-name,opt_value=pxelinux.0,ip_version=4"
            .parse()
            .unwrap();
        assert_eq!(opt.opt_name, "bootfile-name");
        assert_eq!(opt.ip_version, Some(4));
        assert!("opt_name=mtu,opt_value=1400,ip_version=5".parse::<DhcpOption>().is_err());
        assert!("opt_name=mtu".parse::<DhcpOption>().is_err());
    }
}
