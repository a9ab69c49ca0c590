// ABOUTME: Test support utilities.
// ABOUTME: A recording in-memory engine, a recording notifier, and tracing setup.

use async_trait::async_trait;
use parking_lot::Mutex;
use redeploy::redeploy::{Notifier, NotifyError};
use redeploy::runtime::{
    ContainerError, ContainerOps, ContainerSpec, ContainerSummary, ImageError, ImageOps,
    RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use redeploy::types::{ContainerId, ImageRef};
use std::collections::HashSet;
use std::sync::Once;
use std::time::Duration;
use tokio::sync::mpsc;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("redeploy=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// One engine call, as observed by [`FakeEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Pull(String),
    List,
    Stop(String),
    Remove(String),
    Create(String),
    Start(String),
}

#[allow(dead_code)]
impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::List)
    }
}

/// Engine operations that can be told to fail.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Pull,
    List,
    Stop,
    Remove,
    Create,
    Start,
}

/// In-memory engine recording every call in order.
///
/// Created containers get the id `new-<name>`.
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    existing: Mutex<Vec<ContainerSummary>>,
    failing: Mutex<HashSet<Op>>,
    failing_for: Mutex<HashSet<(Op, String)>>,
    specs: Mutex<Vec<ContainerSpec>>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container the engine lists under `/name`.
    pub fn with_container(self, id: &str, name: &str) -> Self {
        self.existing.lock().push(ContainerSummary {
            id: ContainerId::new(id),
            names: vec![format!("/{}", name)],
        });
        self
    }

    pub fn failing(self, op: Op) -> Self {
        self.failing.lock().insert(op);
        self
    }

    /// Fail `op` only when it targets `target`: the container name for create,
    /// the container id for start, stop and remove.
    pub fn failing_for(self, op: Op, target: &str) -> Self {
        self.failing_for.lock().insert((op, target.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Specs passed to create, in call order.
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn fails(&self, op: Op) -> bool {
        self.failing.lock().contains(&op)
    }

    fn fails_on(&self, op: Op, target: &str) -> bool {
        self.fails(op) || self.failing_for.lock().contains(&(op, target.to_string()))
    }
}

#[async_trait]
impl ImageOps for FakeEngine {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        self.record(Call::Pull(reference.to_string()));
        if self.fails(Op::Pull) {
            return Err(ImageError::PullFailed("registry unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeEngine {
    async fn create_container(
        &self,
        name: &str,
        spec: &ContainerSpec,
    ) -> Result<ContainerId, ContainerError> {
        self.record(Call::Create(name.to_string()));
        if self.fails_on(Op::Create, name) {
            return Err(ContainerError::AlreadyExists(name.to_string()));
        }
        self.specs.lock().push(spec.clone());
        Ok(ContainerId::new(format!("new-{}", name)))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.record(Call::Start(id.to_string()));
        if self.fails_on(Op::Start, id.as_str()) {
            return Err(ContainerError::Runtime("start refused".to_string()));
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        self.record(Call::Stop(id.to_string()));
        if self.fails_on(Op::Stop, id.as_str()) {
            return Err(ContainerError::NotRunning(id.to_string()));
        }
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        self.record(Call::Remove(id.to_string()));
        if self.fails_on(Op::Remove, id.as_str()) {
            return Err(ContainerError::Runtime("removal in progress".to_string()));
        }
        self.existing.lock().retain(|c| &c.id != id);
        Ok(())
    }

    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record(Call::List);
        if self.fails(Op::List) {
            return Err(ContainerError::Runtime("list failed".to_string()));
        }
        Ok(self.existing.lock().clone())
    }
}

#[async_trait]
impl RuntimeInfo for FakeEngine {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            version: "fake".to_string(),
            api_version: "1.45".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

/// Notifier that hands every callback URL to a channel.
#[allow(dead_code)]
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<String>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, callback_url: &str) -> Result<(), NotifyError> {
        let _ = self.tx.send(callback_url.to_string());
        Ok(())
    }
}
