//! osport: reconcile one OpenStack network port with its desired state.
//!
//! The port is looked up by id or name and compared with the desired
//! attributes. It is then created, updated or deleted through a
//! [`clients::PortApi`] implementation, or left alone. Check mode reports
//! the action without taking it.

pub mod cli;
pub mod clients;
pub mod cloud;
pub mod config;
pub mod error;
pub mod output;
pub mod port;
pub mod reconciler;

pub use clients::{NeutronClient, PortApi};
pub use config::{DesiredState, PortSpec};
pub use error::{CloudError, Error, Result};
pub use port::{Port, PortAttribute, PortAttributes};
pub use reconciler::{Action, Outcome, PortReconciler, Reconciler, Verdict};
