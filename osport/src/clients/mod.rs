//! Clients for the cloud services a port reconciliation needs.
//!
//! - keystone: token issuance and network endpoint discovery
//! - neutron: port lookup, create, update and delete

pub mod keystone;
pub mod neutron;

pub use neutron::NeutronClient;

use async_trait::async_trait;
use tracing::warn;

use crate::cloud::CloudConfig;
use crate::error::{CloudError, Error, Result};
use crate::port::{Port, PortAttributes};

/// Port operations the reconciler relies on.
#[async_trait]
pub trait PortApi: Send + Sync {
    /// Find a port by id or name. More than one match is an error.
    async fn get_port(&self, name_or_id: &str) -> std::result::Result<Option<Port>, CloudError>;

    /// Create a port, on `network_id` when one is given.
    ///
    /// A missing network is left for the service to reject.
    async fn create_port(
        &self,
        network_id: Option<&str>,
        attrs: &PortAttributes,
    ) -> std::result::Result<Port, CloudError>;

    /// Update the port found by `name_or_id`.
    async fn update_port(
        &self,
        name_or_id: &str,
        attrs: &PortAttributes,
    ) -> std::result::Result<Port, CloudError>;

    /// Delete a port by id.
    async fn delete_port(&self, id: &str) -> std::result::Result<(), CloudError>;
}

/// Build the HTTP client shared by the Keystone and Neutron calls.
pub fn http_client(config: &CloudConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("osport/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(!config.verify);
    if !config.verify {
        warn!("TLS certificate verification is disabled");
    }

    if let Some(path) = &config.cacert {
        let pem = std::fs::read(path)
            .map_err(|e| Error::Setup(format!("cannot read cacert {}: {e}", path.display())))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| Error::Setup(format!("invalid cacert {}: {e}", path.display())))?;
        builder = builder.add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|e| Error::Setup(format!("cannot build HTTP client: {e}")))
}

/// Message carried by an OpenStack error response body.
///
/// Neutron wraps it in `NeutronError`, Keystone in `error`. Falls back to
/// the raw body, then to the status line.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/NeutronError/message")
            .or_else(|| value.pointer("/error/message"))
            .or_else(|| value.pointer("/message"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        body.to_string()
    }
}
