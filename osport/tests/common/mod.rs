//! Test helpers: an in-process fake of Keystone and the Neutron port API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use osport::cloud::{AuthSettings, CloudConfig, CloudEntry, CloudOverrides};

pub const TOKEN: &str = "test-token";
pub const USERNAME: &str = "demo";
pub const PASSWORD: &str = "secret";
pub const REGION: &str = "RegionOne";

#[derive(Default)]
pub struct CloudState {
    pub ports: Vec<Value>,
    /// `METHOD path[?query]` of every Neutron request, in order.
    pub requests: Vec<String>,
    next_id: u32,
}

#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<CloudState>>,
    base: String,
}

/// Fake cloud serving `/identity` and `/network` on an ephemeral port.
pub struct FakeCloud {
    pub base: String,
    state: Arc<Mutex<CloudState>>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl FakeCloud {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(CloudState::default()));

        let app = Router::new()
            .route("/identity/v3/auth/tokens", post(issue_token))
            .route("/network/v2.0/ports", get(list_ports).post(create_port))
            .route(
                "/network/v2.0/ports/{id}",
                put(update_port).delete(delete_port),
            )
            .with_state(AppState {
                inner: Arc::clone(&state),
                base: base.clone(),
            });

        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base,
            state,
            shutdown,
            handle,
        }
    }

    pub fn auth_url(&self) -> String {
        format!("{}/identity", self.base)
    }

    pub fn network_endpoint(&self) -> String {
        format!("{}/network", self.base)
    }

    /// Settings for password authentication against this cloud.
    pub fn password_config(&self) -> CloudConfig {
        CloudConfig::from_entry(
            CloudEntry::default(),
            CloudOverrides {
                auth: AuthSettings {
                    auth_url: Some(self.auth_url()),
                    username: Some(USERNAME.into()),
                    password: Some(PASSWORD.into()),
                    project_name: Some("demo".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap()
    }

    /// Put a port straight into the fake's store.
    pub fn seed_port(&self, port: Value) {
        self.state.lock().unwrap().ports.push(port);
    }

    pub fn ports(&self) -> Vec<Value> {
        self.state.lock().unwrap().ports.clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Neutron requests other than lookups.
    pub fn mutations(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| !r.starts_with("GET "))
            .collect()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

fn neutron_error(status: StatusCode, kind: &str, message: String) -> Response {
    (
        status,
        Json(json!({"NeutronError": {"type": kind, "message": message, "detail": ""}})),
    )
        .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {
            "code": 401,
            "message": "The request you have made requires authentication.",
            "title": "Unauthorized"
        }})),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TOKEN)
}

async fn issue_token(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let identity = &body["auth"]["identity"];
    let valid = match identity["methods"][0].as_str() {
        Some("password") => {
            identity["password"]["user"]["name"] == USERNAME
                && identity["password"]["user"]["password"] == PASSWORD
        }
        Some("token") => identity["token"]["id"] == TOKEN,
        _ => false,
    };
    if !valid {
        return unauthorized();
    }

    let catalog = json!([
        {"type": "identity", "endpoints": [
            {"interface": "public", "region_id": REGION, "region": REGION,
             "url": format!("{}/identity", state.base)}
        ]},
        {"type": "network", "endpoints": [
            {"interface": "public", "region_id": REGION, "region": REGION,
             "url": format!("{}/network", state.base)}
        ]}
    ]);
    (
        StatusCode::CREATED,
        [("X-Subject-Token", TOKEN)],
        Json(json!({"token": {"methods": identity["methods"], "catalog": catalog}})),
    )
        .into_response()
}

async fn list_ports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut inner = state.inner.lock().unwrap();
    let mut filters: Vec<_> = query.iter().collect();
    filters.sort();
    let qs = filters
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    inner.requests.push(format!("GET /ports?{qs}"));

    if !authorized(&headers) {
        return unauthorized();
    }

    let ports: Vec<Value> = inner
        .ports
        .iter()
        .filter(|p| {
            query
                .iter()
                .all(|(k, v)| p.get(k).and_then(Value::as_str) == Some(v.as_str()))
        })
        .cloned()
        .collect();
    Json(json!({ "ports": ports })).into_response()
}

async fn create_port(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.inner.lock().unwrap();
    inner.requests.push("POST /ports".to_string());

    if !authorized(&headers) {
        return unauthorized();
    }

    let Some(request) = body["port"].as_object() else {
        return neutron_error(
            StatusCode::BAD_REQUEST,
            "HTTPBadRequest",
            "Resource body required".to_string(),
        );
    };
    let Some(network_id) = request.get("network_id").and_then(Value::as_str) else {
        return neutron_error(
            StatusCode::BAD_REQUEST,
            "HTTPBadRequest",
            "Failed to parse request. Required attribute 'network_id' not specified".to_string(),
        );
    };
    if let Some(mac) = request.get("mac_address")
        && inner.ports.iter().any(|p| p.get("mac_address") == Some(mac))
    {
        return neutron_error(
            StatusCode::CONFLICT,
            "MacAddressInUse",
            format!(
                "Unable to complete operation for network {network_id}. The mac address {} is in use.",
                mac.as_str().unwrap_or_default()
            ),
        );
    }

    inner.next_id += 1;
    let n = inner.next_id;
    let mut port = json!({
        "id": format!("port-{n}"),
        "name": "",
        "network_id": network_id,
        "admin_state_up": true,
        "mac_address": format!("fa:16:3e:00:00:{n:02x}"),
        "fixed_ips": [],
        "security_groups": [],
        "allowed_address_pairs": [],
        "extra_dhcp_opts": [],
        "device_owner": "",
        "device_id": "",
        "status": "DOWN",
        "project_id": "demo-project",
        "binding:vnic_type": "normal"
    });
    for (key, value) in request {
        port[key] = value.clone();
    }
    inner.ports.push(port.clone());

    (StatusCode::CREATED, Json(json!({ "port": port }))).into_response()
}

async fn update_port(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.inner.lock().unwrap();
    inner.requests.push(format!("PUT /ports/{id}"));

    if !authorized(&headers) {
        return unauthorized();
    }

    let Some(port) = inner.ports.iter_mut().find(|p| p["id"] == id.as_str()) else {
        return neutron_error(
            StatusCode::NOT_FOUND,
            "PortNotFound",
            format!("Port {id} could not be found."),
        );
    };
    if let Some(changes) = body["port"].as_object() {
        for (key, value) in changes {
            port[key] = value.clone();
        }
    }
    Json(json!({ "port": port.clone() })).into_response()
}

async fn delete_port(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut inner = state.inner.lock().unwrap();
    inner.requests.push(format!("DELETE /ports/{id}"));

    if !authorized(&headers) {
        return unauthorized();
    }

    let before = inner.ports.len();
    inner.ports.retain(|p| p["id"] != id.as_str());
    if inner.ports.len() == before {
        return neutron_error(
            StatusCode::NOT_FOUND,
            "PortNotFound",
            format!("Port {id} could not be found."),
        );
    }
    StatusCode::NO_CONTENT.into_response()
}
