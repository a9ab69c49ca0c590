// ABOUTME: Completion callbacks to the webhook sender.
// ABOUTME: A plain GET to the callback URL; failures are the caller's to log.

use async_trait::async_trait;

/// Errors from sending a completion callback.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("callback answered with status {0}")]
    Status(u16),
}

/// Sends the "done" signal for a handled event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, callback_url: &str) -> Result<(), NotifyError>;
}

/// Notifier issuing a bodiless GET with reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, callback_url: &str) -> Result<(), NotifyError> {
        let response = self.client.get(callback_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}
