// ABOUTME: Redeploy orchestration using the type state pattern.
// ABOUTME: Exports the Redeployer, per-service locks, reconciliation states and callbacks.

mod error;
mod lock;
mod notify;
mod orchestrator;
mod reconcile;
mod state;

pub use error::{RedeployError, RedeployErrorKind};
pub use lock::{ServiceGuard, ServiceLocks};
pub use notify::{HttpNotifier, NotifyError, Notifier};
pub use orchestrator::{DEFAULT_STOP_GRACE, RedeployOutcome, Redeployer};
pub use reconcile::{Reconciliation, RedeployedService};
pub use state::{Created, Located, Pending, Started, Vacated};
