//! Port reconciler - reconciles a port spec with the networking service.

use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use super::{Action, Reconciler};
use crate::clients::PortApi;
use crate::config::{DesiredState, PortSpec};
use crate::error::Result;
use crate::port::{CREATE_ATTRIBUTES, Port, PortAttribute, UPDATE_ATTRIBUTES};

/// The change needed to bring a port to its desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    NoOp,
    Create,
    Update { drift: Vec<PortAttribute> },
    Delete { id: String },
}

impl Plan {
    pub fn action(&self) -> Action {
        match self {
            Plan::NoOp => Action::NoOp,
            Plan::Create => Action::Create,
            Plan::Update { .. } => Action::Update,
            Plan::Delete { .. } => Action::Delete,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Plan::NoOp)
    }
}

/// Decide what to do with a port.
pub fn plan(spec: &PortSpec, observed: Option<&Port>) -> Plan {
    match (spec.state, observed) {
        (DesiredState::Present, None) => Plan::Create,
        (DesiredState::Present, Some(port)) => {
            let drift = port.drift(&spec.attributes, UPDATE_ATTRIBUTES);
            if drift.is_empty() {
                Plan::NoOp
            } else {
                Plan::Update { drift }
            }
        }
        (DesiredState::Absent, None) => Plan::NoOp,
        (DesiredState::Absent, Some(port)) => Plan::Delete {
            id: port.id.clone(),
        },
    }
}

/// Short result reported for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Created,
    Updated,
    Deleted,
    WouldCreate,
    WouldUpdate,
    WouldDelete,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Created => "Created",
            Verdict::Updated => "Updated",
            Verdict::Deleted => "Deleted",
            Verdict::WouldCreate => "would create",
            Verdict::WouldUpdate => "would update",
            Verdict::WouldDelete => "would delete",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of reconciling one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Verdict>,
    /// Update attributes that differed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<PortAttribute>,
    pub check_mode: bool,
    /// The port after the change, or as observed when nothing was changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
}

impl Outcome {
    fn unchanged(port: Option<Port>, check_mode: bool) -> Self {
        Self {
            changed: false,
            action: Action::NoOp,
            result: None,
            diff: Vec::new(),
            check_mode,
            port,
        }
    }

    fn changed(action: Action, verdict: Verdict, check_mode: bool) -> Self {
        Self {
            changed: true,
            action,
            result: Some(verdict),
            diff: Vec::new(),
            check_mode,
            port: None,
        }
    }

    fn with_diff(mut self, diff: Vec<PortAttribute>) -> Self {
        self.diff = diff;
        self
    }

    fn with_port(mut self, port: Option<Port>) -> Self {
        self.port = port;
        self
    }

    /// What applying `plan` would do, without doing it.
    fn preview(plan: Plan, observed: Option<Port>) -> Self {
        match plan {
            Plan::NoOp => Outcome::unchanged(observed, true),
            Plan::Create => Outcome::changed(Action::Create, Verdict::WouldCreate, true),
            Plan::Update { drift } => {
                Outcome::changed(Action::Update, Verdict::WouldUpdate, true)
                    .with_diff(drift)
                    .with_port(observed)
            }
            Plan::Delete { .. } => {
                Outcome::changed(Action::Delete, Verdict::WouldDelete, true).with_port(observed)
            }
        }
    }
}

/// Port reconciler that acts through a [`PortApi`].
pub struct PortReconciler<A> {
    api: A,
}

impl<A: PortApi> PortReconciler<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: PortApi> Reconciler for PortReconciler<A> {
    type Spec = PortSpec;
    type Observed = Port;
    type Status = Outcome;

    async fn observe(&self, spec: &PortSpec) -> Result<Option<Port>> {
        let key = spec.lookup_key()?;
        let port = self.api.get_port(key).await?;
        match &port {
            Some(port) => debug!("Found port {} ({})", key, port.id),
            None => debug!("Port {} does not exist", key),
        }
        Ok(port)
    }

    async fn converge(
        &self,
        spec: &PortSpec,
        observed: Option<Port>,
        check_mode: bool,
    ) -> Result<Outcome> {
        let key = spec.lookup_key()?;
        let plan = plan(spec, observed.as_ref());

        if check_mode {
            if plan.is_change() {
                info!("Check mode: port {} would {:?}", key, plan.action());
            } else {
                info!("Check mode: port {} is up to date", key);
            }
            return Ok(Outcome::preview(plan, observed));
        }

        match plan {
            Plan::NoOp => {
                info!("Port {} is up to date", key);
                Ok(Outcome::unchanged(observed, false))
            }
            Plan::Create => {
                let network_id = spec.network_id.as_deref();
                let attrs = spec.attributes.select(CREATE_ATTRIBUTES);
                debug!("Create attributes: {:?}", attrs.specified());
                info!(
                    "Creating port {} on network {}",
                    key,
                    network_id.unwrap_or("<unset>")
                );
                let port = self.api.create_port(network_id, &attrs).await?;
                info!("Created port {} ({})", key, port.id);
                Ok(Outcome::changed(Action::Create, Verdict::Created, false).with_port(Some(port)))
            }
            Plan::Update { drift } => {
                let attrs = spec.attributes.select(UPDATE_ATTRIBUTES);
                info!(
                    "Updating port {}: {}",
                    key,
                    drift
                        .iter()
                        .map(PortAttribute::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                let port = self.api.update_port(key, &attrs).await?;
                Ok(Outcome::changed(Action::Update, Verdict::Updated, false)
                    .with_diff(drift)
                    .with_port(Some(port)))
            }
            Plan::Delete { id } => {
                info!("Deleting port {} ({})", key, id);
                self.api.delete_port(&id).await?;
                Ok(Outcome::changed(Action::Delete, Verdict::Deleted, false))
            }
        }
    }
}
