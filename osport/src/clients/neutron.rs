//! Client for the Neutron port API.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::keystone::{self, Session};
use super::{PortApi, error_message, http_client};
use crate::cloud::CloudConfig;
use crate::error::{CloudError, Result};
use crate::port::{Port, PortAttributes};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Deserialize)]
struct PortEnvelope {
    port: Port,
}

#[derive(Debug, Deserialize)]
struct PortList {
    ports: Vec<Port>,
}

/// Client for interacting with Neutron ports.
pub struct NeutronClient {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl NeutronClient {
    /// Client for an already authenticated session.
    pub fn new(http: reqwest::Client, session: Session) -> Self {
        Self {
            http,
            base: api_base(&session.network_endpoint),
            token: session.token,
        }
    }

    /// Authenticate with the configured cloud and return a ready client.
    pub async fn connect(config: &CloudConfig) -> Result<Self> {
        let http = http_client(config)?;
        if config.needs_keystone() {
            debug!("Authenticating against Keystone");
        }
        let session = keystone::authenticate(&http, config).await?;
        Ok(Self::new(http, session))
    }

    /// Base URL of the v2.0 API.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base, path))
            .header(AUTH_TOKEN_HEADER, &self.token)
    }

    /// Send a request, turning non-2xx responses into a [`CloudError`].
    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, CloudError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CloudError::with_status(
            error_message(status, &body),
            status.as_u16(),
        ))
    }

    async fn list_ports(
        &self,
        field: &str,
        value: &str,
    ) -> std::result::Result<Vec<Port>, CloudError> {
        let response = self
            .send(self.request(Method::GET, "/ports").query(&[(field, value)]))
            .await?;
        let list: PortList = response.json().await?;
        Ok(list.ports)
    }

    async fn find_port(&self, name_or_id: &str) -> std::result::Result<Option<Port>, CloudError> {
        let mut ports = self.list_ports("id", name_or_id).await?;
        if ports.is_empty() {
            ports = self.list_ports("name", name_or_id).await?;
        }
        match ports.len() {
            0 => Ok(None),
            1 => Ok(ports.pop()),
            _ => Err(CloudError::new(format!(
                "Multiple matches found for {name_or_id}"
            ))),
        }
    }
}

/// Neutron endpoint with the `/v2.0` version suffix.
fn api_base(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/v2.0") {
        base.to_string()
    } else {
        format!("{base}/v2.0")
    }
}

/// `{"port": {...}}` request body.
///
/// Neutron has no top-level `subnet_id`/`ip_address`; they are sent as one
/// more `fixed_ips` entry.
fn port_body(network_id: Option<&str>, attrs: &PortAttributes) -> Value {
    let mut port = match serde_json::to_value(attrs) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let subnet_id = port.remove("subnet_id");
    let ip_address = port.remove("ip_address");
    if subnet_id.is_some() || ip_address.is_some() {
        let mut entry = Map::new();
        if let Some(subnet_id) = subnet_id {
            entry.insert("subnet_id".to_string(), subnet_id);
        }
        if let Some(ip_address) = ip_address {
            entry.insert("ip_address".to_string(), ip_address);
        }
        match port.get_mut("fixed_ips") {
            Some(Value::Array(ips)) => ips.push(Value::Object(entry)),
            _ => {
                port.insert("fixed_ips".to_string(), json!([entry]));
            }
        }
    }

    if let Some(network_id) = network_id {
        port.insert("network_id".to_string(), json!(network_id));
    }
    json!({ "port": port })
}

#[async_trait]
impl PortApi for NeutronClient {
    async fn get_port(&self, name_or_id: &str) -> std::result::Result<Option<Port>, CloudError> {
        debug!("Looking up port {}", name_or_id);
        self.find_port(name_or_id).await
    }

    async fn create_port(
        &self,
        network_id: Option<&str>,
        attrs: &PortAttributes,
    ) -> std::result::Result<Port, CloudError> {
        debug!("Creating port on network {:?}", network_id);
        let response = self
            .send(
                self.request(Method::POST, "/ports")
                    .json(&port_body(network_id, attrs)),
            )
            .await?;
        let envelope: PortEnvelope = response.json().await?;
        Ok(envelope.port)
    }

    async fn update_port(
        &self,
        name_or_id: &str,
        attrs: &PortAttributes,
    ) -> std::result::Result<Port, CloudError> {
        let port = self
            .find_port(name_or_id)
            .await?
            .ok_or_else(|| CloudError::new(format!("Port {name_or_id} not found")))?;
        debug!("Updating port {}", port.id);
        let response = self
            .send(
                self.request(Method::PUT, &format!("/ports/{}", port.id))
                    .json(&port_body(None, attrs)),
            )
            .await?;
        let envelope: PortEnvelope = response.json().await?;
        Ok(envelope.port)
    }

    async fn delete_port(&self, id: &str) -> std::result::Result<(), CloudError> {
        debug!("Deleting port {}", id);
        self.send(self.request(Method::DELETE, &format!("/ports/{id}")))
            .await?;
        Ok(())
    }
}
