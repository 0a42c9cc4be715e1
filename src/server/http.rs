//! HTTP surface: `POST /broadcasting/auth`
//!
//! Form fields: `channel_name`, `socket_id`, optional `callback` (JSONP).
//! The caller is identified by an `Authorization: Bearer sess-...` header.

use crate::auth::{AuthError, CallerContext, ChannelAuthorizer, ChannelGrant, SessionToken};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub authorizer: ChannelAuthorizer,
    pub session_secret: Arc<[u8]>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    pub channel_name: Option<String>,
    pub socket_id: Option<String>,
    pub callback: Option<String>,
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/broadcasting/auth", post(auth_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Resolve the caller from the bearer token; bad tokens count as anonymous
fn resolve_caller(headers: &HeaderMap, secret: &[u8], socket_id: String) -> CallerContext {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return CallerContext::anonymous(socket_id);
    };

    match SessionToken::parse(token, secret) {
        Ok(session) => CallerContext::authenticated(socket_id, session.into_user()),
        Err(e) => {
            debug!(error = %e, "Rejected session token");
            CallerContext::anonymous(socket_id)
        }
    }
}

fn is_valid_callback(callback: &str) -> bool {
    !callback.is_empty()
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
}

async fn auth_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(request): Form<AuthRequest>,
) -> Response {
    let (Some(channel_name), Some(socket_id)) = (request.channel_name, request.socket_id) else {
        return (StatusCode::BAD_REQUEST, "channel_name and socket_id are required").into_response();
    };

    if let Some(callback) = &request.callback {
        if !is_valid_callback(callback) {
            return (StatusCode::BAD_REQUEST, "invalid callback name").into_response();
        }
    }

    let caller = resolve_caller(&headers, &state.session_secret, socket_id);

    match state.authorizer.authorize(&channel_name, &caller) {
        Ok(grant) => grant_response(grant, request.callback.as_deref()),
        Err(err) => error_response(&err),
    }
}

/// Denials carry no body
fn error_response(err: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_access_denied() {
        status.into_response()
    } else {
        (status, "failed to sign channel auth").into_response()
    }
}

fn grant_response(grant: ChannelGrant, callback: Option<&str>) -> Response {
    let body = match grant.into_payload() {
        Some(payload) => serde_json::to_value(payload),
        None => Ok(serde_json::json!({})),
    };

    let body = match body {
        Ok(body) => body,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    match callback {
        Some(callback) => (
            [(header::CONTENT_TYPE, "text/javascript")],
            format!("/**/{}({});", callback, body),
        )
            .into_response(),
        None => Json(body).into_response(),
    }
}

/// Run the HTTP server
pub async fn run_http_server(bind_addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "HTTP server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
