//!
//! cryptsession HTTP server
//! ------------------------
//! Axum router implementing the CAS login handshake on top of an encrypted,
//! client-side session cookie. No session state is kept on the server.
//!
//! Responsibilities:
//! - Decode the `cryptsession` cookie on every request (unreadable = no session).
//! - `/login` and `/logout` redirects to the CAS server.
//! - `/ticket` redemption against CAS `serviceValidate` and cookie minting.
//! - Login-gated resources (`/one`, `/two`) and the static index page.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cas::{CasClient, ValidationOutcome};
use crate::codec::SessionCodec;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::session::Session;

pub const SESSION_COOKIE: &str = "cryptsession";

const LOGGED_IN_BODY: &str = r#"Logged in! <a href="/">Back to Home</a>"#;

/// Shared, read-only state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<SessionCodec>,
    pub cas: CasClient,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let cas = CasClient::new(&config)?;
        Ok(AppState {
            codec: Arc::new(SessionCodec::from_config(&config)),
            cas,
            config: Arc::new(config),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/login", any(login))
        .route("/ticket", any(ticket))
        .route("/logout", any(logout))
        .route("/one", any(one))
        .route("/two", any(two))
        .fallback(not_found)
        .with_state(state)
}

/// Start the HTTP server with the given configuration.
pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "cryptsession starting: http_port={}, cas={}, service={}, public_dir={:?}, validate_timeout_ms={}, validate_retries={}",
        config.http_port,
        config.cas_base_url,
        config.service_base_url,
        config.public_dir,
        config.validate_timeout.as_millis(),
        config.validate_retries
    );
    if !config.public_dir.join("index.html").exists() {
        warn!(target: "startup", "no index.html under {:?}; '/' will answer 404", config.public_dir);
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = router(AppState::new(config)?);
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(header::COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k.trim() == name { return Some(v.trim().to_string()); }
            }
        }
    }
    None
}

/// Decode the session carried by the request. Absent, empty and unreadable
/// cookies all yield an empty session.
fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Session {
    let Some(raw) = parse_cookie(headers, SESSION_COOKIE) else { return Session::default() };
    if raw.is_empty() { return Session::default(); }
    match state.codec.open(&raw) {
        Ok(session) => session,
        Err(e) => {
            debug!(target: "session", "discarding unreadable session cookie: {}", e);
            Session::default()
        }
    }
}

fn set_session_cookie(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, value))
        .map_err(|e| AppError::internal("set_cookie", e.to_string().as_str()))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("cryptsession=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Run `next` with the session's username, or send the browser to `/login`.
fn login_required<F>(session: &Session, next: F) -> Response
where
    F: FnOnce(&str) -> Response,
{
    match session.username() {
        Some(user) => next(user),
        None => found("/login".to_string()),
    }
}

async fn index(State(state): State<AppState>) -> AppResult<Response> {
    let path = state.config.public_dir.join("index.html");
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "text/html")], bytes).into_response()),
        Err(e) => {
            warn!(target: "static", "cannot read {:?}: {}", path, e);
            Err(AppError::not_found("static_missing", "index.html"))
        }
    }
}

async fn login(State(state): State<AppState>) -> Response {
    found(state.cas.login_url())
}

#[derive(Debug, Deserialize)]
struct TicketParams {
    ticket: Option<String>,
}

async fn ticket(State(state): State<AppState>, method: Method, uri: Uri) -> AppResult<Response> {
    // CAS single logout POSTs here; nothing to do.
    if method != Method::GET {
        return Ok(StatusCode::OK.into_response());
    }
    let params = match Query::<TicketParams>::try_from_uri(&uri) {
        Ok(Query(params)) => params,
        Err(e) => {
            debug!(target: "auth", "unusable ticket query: {}", e);
            return Err(AppError::ticket_rejected("malformed_query", "ticket query string could not be parsed"));
        }
    };
    let Some(ticket) = params.ticket.filter(|t| !t.is_empty()) else {
        return Err(AppError::ticket_rejected("missing_ticket", "no ticket in query string"));
    };

    match state.cas.validate(&ticket).await {
        ValidationOutcome::Success { username } => {
            let value = state.codec.seal(&Session::authenticated(username.as_str()))?;
            let mut headers = HeaderMap::new();
            headers.insert(header::SET_COOKIE, set_session_cookie(&value)?);
            info!(target: "auth", user = %username, "CAS login succeeded");
            Ok((StatusCode::OK, headers, Html(LOGGED_IN_BODY)).into_response())
        }
        ValidationOutcome::Rejected => {
            info!(target: "auth", "CAS rejected ticket");
            Err(AppError::ticket_rejected("invalid_ticket", "CAS did not vouch for the ticket"))
        }
        ValidationOutcome::TransportError(e) => Err(AppError::provider_unreachable("cas_unreachable", e.as_str())),
    }
}

async fn logout(State(state): State<AppState>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie());
    (StatusCode::FOUND, headers, [(header::LOCATION, state.cas.logout_url())]).into_response()
}

async fn one(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = session_from_headers(&state, &headers);
    login_required(&session, |_| "You can access this resource (ONE)!".into_response())
}

async fn two(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = session_from_headers(&state, &headers);
    login_required(&session, |_| "You can access this resource (TWO)!".into_response())
}

async fn not_found(uri: Uri) -> AppError {
    debug!(target: "http", "no route for {}", uri.path());
    AppError::not_found("not_found", uri.path())
}
