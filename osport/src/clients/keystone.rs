//! Keystone v3 token issuance.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::error_message;
use crate::cloud::{CloudConfig, Credentials};
use crate::error::{CloudError, Error, Result};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// An authenticated session against the networking service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub network_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    interface: String,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    url: String,
}

/// `{auth_url}/v3/auth/tokens`, whether or not auth_url already ends in /v3.
fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    if base.ends_with("/v3") {
        format!("{base}/auth/tokens")
    } else {
        format!("{base}/v3/auth/tokens")
    }
}

/// Request body for `POST /v3/auth/tokens`.
fn auth_request(config: &CloudConfig) -> Value {
    let identity = match &config.credentials {
        Credentials::Password {
            username,
            password,
            user_domain_name,
        } => json!({
            "methods": ["password"],
            "password": {
                "user": {
                    "name": username,
                    "domain": {"name": user_domain_name},
                    "password": password,
                }
            }
        }),
        Credentials::Token(token) => json!({
            "methods": ["token"],
            "token": {"id": token}
        }),
    };

    let mut auth = json!({ "identity": identity });
    if let Some(project_id) = &config.project_id {
        auth["scope"] = json!({"project": {"id": project_id}});
    } else if let Some(project_name) = &config.project_name {
        auth["scope"] = json!({
            "project": {
                "name": project_name,
                "domain": {"name": config.project_domain_name},
            }
        });
    }
    json!({ "auth": auth })
}

/// Pick the network endpoint for the configured interface and region.
fn network_endpoint(catalog: &[CatalogEntry], config: &CloudConfig) -> Option<String> {
    let interface = config.interface.as_str();
    catalog
        .iter()
        .filter(|entry| entry.service_type == "network")
        .flat_map(|entry| entry.endpoints.iter())
        .find(|ep| {
            ep.interface == interface
                && config.region_name.as_ref().is_none_or(|region| {
                    ep.region_id.as_ref() == Some(region) || ep.region.as_ref() == Some(region)
                })
        })
        .map(|ep| ep.url.clone())
}

/// Obtain a token and the network endpoint.
///
/// A token together with an explicit network endpoint needs no round trip.
pub async fn authenticate(http: &reqwest::Client, config: &CloudConfig) -> Result<Session> {
    if let (Credentials::Token(token), Some(endpoint)) =
        (&config.credentials, &config.network_endpoint)
    {
        return Ok(Session {
            token: token.clone(),
            network_endpoint: endpoint.clone(),
        });
    }

    let auth_url = config
        .auth_url
        .as_deref()
        .ok_or_else(|| Error::Setup("auth_url is required".to_string()))?;
    let url = tokens_url(auth_url);
    debug!("Requesting token from {}", url);

    let response = http
        .post(&url)
        .json(&auth_request(config))
        .send()
        .await
        .map_err(CloudError::from)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CloudError::with_status(error_message(status, &body), status.as_u16()).into());
    }

    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| CloudError::new("Keystone response carried no X-Subject-Token header"))?;

    let body: TokenResponse = response.json().await.map_err(CloudError::from)?;

    let network_endpoint = match &config.network_endpoint {
        Some(endpoint) => endpoint.clone(),
        None => network_endpoint(&body.token.catalog, config).ok_or_else(|| {
            Error::Setup(format!(
                "no {} network endpoint{} in the service catalog",
                config.interface.as_str(),
                config
                    .region_name
                    .as_ref()
                    .map(|r| format!(" for region {r}"))
                    .unwrap_or_default()
            ))
        })?,
    };
    debug!("Using network endpoint {}", network_endpoint);

    Ok(Session {
        token,
        network_endpoint,
    })
}
