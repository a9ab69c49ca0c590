// ABOUTME: Webhook handler: parse, redeploy, answer, then call back.
// ABOUTME: 400 for malformed bodies and bad tags, 500 for engine failures.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::Poll;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::redeploy::{Notifier, RedeployOutcome};
use crate::server::state::AppState;
use crate::webhook::HookRequest;

const INVALID_REQUEST: &str = "invalid request";
const INTERNAL_ERROR: &str = "internal error";

/// Handle one push notification.
///
/// The callback fires only after a successful redeploy (or a no-op for an
/// untracked image), once the response body has been sent and dropped.
pub async fn hook_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let hook: HookRequest = match serde_json::from_slice(&body) {
        Ok(hook) => hook,
        Err(e) => {
            warn!(error = %e, "failed to decode webhook body");
            return (StatusCode::BAD_REQUEST, INVALID_REQUEST).into_response();
        }
    };

    debug!(
        image = %hook.image(),
        pusher = %hook.push_data.pusher,
        pushed_at = ?hook.push_data.pushed_at().map(|t| t.to_rfc3339()),
        "received push"
    );

    let result = state
        .redeployer
        .redeploy(&hook.repository.repo_name, &hook.push_data.tag)
        .await;

    match result {
        Ok(outcome) => {
            if let RedeployOutcome::Redeployed { services, .. } = &outcome {
                debug!(image = %hook.image(), count = services.len(), "redeploy finished");
            }
            let (sent_tx, sent_rx) = oneshot::channel();
            spawn_callback(state.notifier.clone(), hook.callback_url, sent_rx);
            (StatusCode::OK, completion_body(sent_tx)).into_response()
        }
        Err(e) if e.is_client_error() => {
            error!(image = %hook.image(), error = %e, "rejecting redeploy request");
            (StatusCode::BAD_REQUEST, INVALID_REQUEST).into_response()
        }
        Err(e) => {
            error!(image = %hook.image(), error = %e, "redeploy failed");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
        }
    }
}

/// Empty body that releases `sent` when the server drops it after writing.
fn completion_body(sent: oneshot::Sender<()>) -> Body {
    Body::from_stream(futures::stream::poll_fn(move |_| {
        let _held = &sent;
        Poll::Ready(None::<Result<Bytes, Infallible>>)
    }))
}

fn spawn_callback(
    notifier: Arc<dyn Notifier>,
    callback_url: String,
    sent: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        // Resolves with an error once the response body is dropped
        let _ = sent.await;
        match notifier.notify(&callback_url).await {
            Ok(()) => debug!(callback = %callback_url, "sent callback"),
            Err(e) => error!(callback = %callback_url, error = %e, "callback failed"),
        }
    });
}
