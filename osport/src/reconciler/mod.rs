//! Reconcilers.
//!
//! A reconciler looks up the current state of a resource, compares it with
//! the desired spec and takes the action that converges the two. In check
//! mode it only reports what that action would be.

pub mod port;

pub use port::{Outcome, Plan, PortReconciler, Verdict, plan};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// What a reconciliation does to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    NoOp,
    Create,
    Update,
    Delete,
}

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The desired state.
    type Spec: Sync;
    /// The resource as currently provisioned.
    type Observed: Send;
    /// What gets reported back.
    type Status: Send;

    /// Look up the resource. `None` if it does not exist.
    async fn observe(&self, spec: &Self::Spec) -> Result<Option<Self::Observed>>;

    /// Compare `observed` with `spec` and act on the difference, or only
    /// report it when `check_mode` is set.
    async fn converge(
        &self,
        spec: &Self::Spec,
        observed: Option<Self::Observed>,
        check_mode: bool,
    ) -> Result<Self::Status>;

    /// Observe, then converge.
    async fn reconcile(&self, spec: &Self::Spec, check_mode: bool) -> Result<Self::Status> {
        let observed = self.observe(spec).await?;
        self.converge(spec, observed, check_mode).await
    }
}
