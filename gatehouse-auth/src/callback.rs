//! Resume channel: loopback callback capture and pasted-input parsing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

use crate::error::AuthError;

const SUCCESS_PAGE: &str = "<!doctype html><html><body>\
<h2>Authorization complete</h2><p>You can close this tab and return to the terminal.</p>\
</body></html>";

/// Code (and state, when the provider returned one) from the resume channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationInput {
    pub code: String,
    pub state: Option<String>,
}

/// Parse what the user pasted: a full redirect URL, `code#state`, a bare
/// query string, or a raw code.
pub fn parse_authorization_input(input: &str) -> Result<AuthorizationInput, AuthError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingCode);
    }

    if let Ok(url) = Url::parse(trimmed) {
        if url.query().is_some() {
            return from_query_pairs(url.query_pairs());
        }
    }

    if trimmed.contains("code=") {
        let query = trimmed.trim_start_matches('?');
        return from_query_pairs(url::form_urlencoded::parse(query.as_bytes()));
    }

    if let Some((code, state)) = trimmed.split_once('#') {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::MissingCode);
        }
        let state = state.trim();
        return Ok(AuthorizationInput {
            code: code.to_string(),
            state: (!state.is_empty()).then(|| state.to_string()),
        });
    }

    Ok(AuthorizationInput {
        code: trimmed.to_string(),
        state: None,
    })
}

fn from_query_pairs<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> Result<AuthorizationInput, AuthError> {
    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in pairs {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }
    if let Some(error) = error {
        let detail = match description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        return Err(AuthError::ProviderDenied(detail));
    }
    match code.filter(|c| !c.is_empty()) {
        Some(code) => Ok(AuthorizationInput { code, state }),
        None => Err(AuthError::MissingCode),
    }
}

// ---------------------------------------------------------------------------
// Loopback listener
// ---------------------------------------------------------------------------

type ResultSlot = Arc<Mutex<Option<oneshot::Sender<Result<AuthorizationInput, AuthError>>>>>;

/// One-shot HTTP listener on `127.0.0.1:<port>` for the provider redirect.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    path: &'static str,
}

impl CallbackListener {
    pub async fn bind(port: u16, path: &'static str) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| AuthError::Callback(format!("cannot listen on 127.0.0.1:{port}: {e}")))?;
        tracing::debug!(port, path, "oauth callback listener bound");
        Ok(Self { listener, path })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.listener.local_addr().ok().map(|addr| addr.port())
    }

    /// Serve `path` until the first redirect arrives. Other paths get a 404.
    pub async fn wait(self, timeout: Duration) -> Result<AuthorizationInput, AuthError> {
        let (result_tx, result_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let slot: ResultSlot = Arc::new(Mutex::new(Some(result_tx)));
        let app = Router::new()
            .route(self.path, get(capture_redirect))
            .with_state(slot);

        let server = axum::serve(self.listener, app).with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });
        tokio::spawn(async move {
            if let Err(err) = server.await {
                tracing::debug!(error = %err, "oauth callback server stopped");
            }
        });

        let outcome = tokio::time::timeout(timeout, result_rx).await;
        let _ = stop_tx.send(());
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AuthError::Callback("callback server exited".to_string())),
            Err(_) => Err(AuthError::CallbackTimeout),
        }
    }
}

async fn capture_redirect(State(slot): State<ResultSlot>, RawQuery(query): RawQuery) -> Response {
    let query = query.unwrap_or_default();
    let result = from_query_pairs(url::form_urlencoded::parse(query.as_bytes()));
    let response = match &result {
        Ok(_) => Html(SUCCESS_PAGE).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    let sender = slot.lock().ok().and_then(|mut pending| pending.take());
    match sender {
        Some(sender) => {
            let _ = sender.send(result);
        }
        None => tracing::debug!("ignoring repeated oauth callback"),
    }
    response
}
