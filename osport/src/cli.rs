//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cloud::{AuthSettings, CloudOverrides};
use crate::config::{DesiredState, PortOptions};
use crate::error::Result;
use crate::port::{AddressPair, DhcpOption, FixedIp};

/// Reconcile an OpenStack network port with its desired state
#[derive(Parser, Debug)]
#[command(name = "osport", version, about)]
pub struct Args {
    #[command(flatten)]
    pub port: PortArgs,

    #[command(flatten)]
    pub cloud: CloudArgs,

    /// Only report what would change
    #[arg(long)]
    pub check: bool,

    /// Exit with status 2 when the port changed or would change
    #[arg(long)]
    pub detailed_exitcode: bool,
}

/// Desired port options.
#[derive(clap::Args, Debug, Default)]
pub struct PortArgs {
    /// YAML or JSON file with port options (flags override it)
    #[arg(long, value_name = "FILE")]
    pub spec: Option<PathBuf>,

    /// Port id to look up
    #[arg(long)]
    pub port_id: Option<String>,

    /// Network to create the port on
    #[arg(long)]
    pub network_id: Option<String>,

    /// Port name (also used for lookup when no port id is given)
    #[arg(long)]
    pub name: Option<String>,

    /// Whether the port is administratively up
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub admin_state_up: Option<bool>,

    /// MAC address (create only)
    #[arg(long)]
    pub mac_address: Option<String>,

    /// Fixed IP as subnet_id=..,ip_address=.. (repeatable)
    #[arg(long = "fixed-ip", value_name = "SPEC")]
    pub fixed_ips: Vec<FixedIp>,

    /// Subnet to allocate the address from (create only)
    #[arg(long)]
    pub subnet_id: Option<String>,

    /// Address to request (create only)
    #[arg(long)]
    pub ip_address: Option<String>,

    /// Security group id (repeatable)
    #[arg(long = "security-group", value_name = "ID")]
    pub security_groups: Vec<String>,

    /// Allowed address pair as ip_address=..,mac_address=.. (repeatable)
    #[arg(long = "allowed-address-pair", value_name = "SPEC")]
    pub allowed_address_pairs: Vec<AddressPair>,

    /// DHCP option as opt_name=..,opt_value=..,ip_version=.. (repeatable)
    #[arg(long = "extra-dhcp-opt", value_name = "SPEC")]
    pub extra_dhcp_opts: Vec<DhcpOption>,

    /// Owner of the port, e.g. compute:nova
    #[arg(long)]
    pub device_owner: Option<String>,

    /// Device the port is attached to (create only)
    #[arg(long)]
    pub device_id: Option<String>,

    /// Whether the port should exist
    #[arg(long, value_enum)]
    pub state: Option<DesiredState>,
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() { None } else { Some(values) }
}

impl PortArgs {
    /// Spec-file options overlaid with the flags given.
    pub fn into_options(self) -> Result<PortOptions> {
        let base = match &self.spec {
            Some(path) => PortOptions::from_file(path)?,
            None => PortOptions::default(),
        };
        Ok(base.overlay(PortOptions::from(self)))
    }
}

impl From<PortArgs> for PortOptions {
    fn from(args: PortArgs) -> Self {
        PortOptions {
            port_id: args.port_id,
            network_id: args.network_id,
            state: args.state,
            name: args.name,
            admin_state_up: args.admin_state_up,
            mac_address: args.mac_address,
            fixed_ips: non_empty(args.fixed_ips),
            subnet_id: args.subnet_id,
            ip_address: args.ip_address,
            security_groups: non_empty(args.security_groups),
            allowed_address_pairs: non_empty(args.allowed_address_pairs),
            extra_dhcp_opts: non_empty(args.extra_dhcp_opts),
            device_owner: args.device_owner,
            device_id: args.device_id,
        }
    }
}

/// Cloud selection and authentication.
#[derive(clap::Args, Debug, Default)]
pub struct CloudArgs {
    /// Named cloud from clouds.yaml
    #[arg(long, env = "OS_CLOUD")]
    pub cloud: Option<String>,

    /// Path to clouds.yaml
    #[arg(long, env = "OS_CLIENT_CONFIG_FILE")]
    pub clouds_file: Option<PathBuf>,

    /// Region to pick the network endpoint from
    #[arg(long, env = "OS_REGION_NAME")]
    pub region_name: Option<String>,

    /// Endpoint interface: public, internal or admin
    #[arg(long, env = "OS_INTERFACE")]
    pub interface: Option<String>,

    /// Keystone URL
    #[arg(long, env = "OS_AUTH_URL")]
    pub auth_url: Option<String>,

    #[arg(long, env = "OS_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "OS_PROJECT_NAME")]
    pub project_name: Option<String>,

    #[arg(long, env = "OS_PROJECT_ID")]
    pub project_id: Option<String>,

    #[arg(long, env = "OS_USER_DOMAIN_NAME")]
    pub user_domain_name: Option<String>,

    #[arg(long, env = "OS_PROJECT_DOMAIN_NAME")]
    pub project_domain_name: Option<String>,

    /// Pre-issued token instead of username/password
    #[arg(long, env = "OS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Neutron endpoint, bypassing the service catalog
    #[arg(long, env = "OS_NETWORK_ENDPOINT")]
    pub network_endpoint: Option<String>,

    /// Extra CA certificate (PEM)
    #[arg(long, env = "OS_CACERT")]
    pub cacert: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl From<CloudArgs> for CloudOverrides {
    fn from(args: CloudArgs) -> Self {
        CloudOverrides {
            cloud: args.cloud,
            clouds_file: args.clouds_file,
            auth: AuthSettings {
                auth_url: args.auth_url,
                username: args.username,
                password: args.password,
                project_name: args.project_name,
                project_id: args.project_id,
                user_domain_name: args.user_domain_name,
                project_domain_name: args.project_domain_name,
                token: args.token,
            },
            region_name: args.region_name,
            interface: args.interface,
            network_endpoint: args.network_endpoint,
            insecure: args.insecure,
            cacert: args.cacert,
            timeout: args.timeout.map(Duration::from_secs),
        }
    }
}
