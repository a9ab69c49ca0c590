// ABOUTME: Shared state handed to webhook handlers.
// ABOUTME: The redeployer and the callback notifier, both behind Arc.

use std::sync::Arc;

use crate::redeploy::{Notifier, Redeployer};

/// Server state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub redeployer: Arc<Redeployer>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(redeployer: Arc<Redeployer>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            redeployer,
            notifier,
        }
    }
}
