//! Unified HTTP error model for the flow controller.
//! Each variant carries a stable code and a message, maps to one status, and
//! renders itself as a plain-text response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::{Display, Formatter};
use tracing::error;

#[derive(Debug, Clone)]
pub enum AppError {
    TicketRejected { code: String, message: String },
    ProviderUnreachable { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::TicketRejected { code, .. }
            | AppError::ProviderUnreachable { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::TicketRejected { message, .. }
            | AppError::ProviderUnreachable { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn ticket_rejected<S: Into<String>>(code: S, msg: S) -> Self { AppError::TicketRejected { code: code.into(), message: msg.into() } }
    pub fn provider_unreachable<S: Into<String>>(code: S, msg: S) -> Self { AppError::ProviderUnreachable { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::TicketRejected { .. } => StatusCode::FORBIDDEN,
            AppError::ProviderUnreachable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the client. Server-side failures expose nothing.
    fn client_body(&self) -> &'static str {
        match self {
            AppError::TicketRejected { .. } => "Unauthorized",
            AppError::ProviderUnreachable { .. } | AppError::NotFound { .. } | AppError::Internal { .. } => "",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<crate::codec::CodecError> for AppError {
    fn from(err: crate::codec::CodecError) -> Self {
        AppError::Internal { code: "session_codec".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::ProviderUnreachable { .. } | AppError::Internal { .. }) {
            error!("{}", self);
        }
        (self.http_status(), self.client_body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::ticket_rejected("invalid_ticket", "no").http_status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::provider_unreachable("cas_unreachable", "down").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::internal("internal", "panic").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn display_and_accessors() {
        let e = AppError::ticket_rejected("invalid_ticket", "ticket ST-1 rejected");
        assert_eq!(e.code_str(), "invalid_ticket");
        assert_eq!(e.message(), "ticket ST-1 rejected");
        assert_eq!(e.to_string(), "invalid_ticket: ticket ST-1 rejected");
    }

    #[tokio::test]
    async fn rejected_ticket_body_hides_details() {
        let r = AppError::ticket_rejected("invalid_ticket", "ticket ST-1 rejected").into_response();
        let body = axum::body::to_bytes(r.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Unauthorized");
        let r = AppError::provider_unreachable("cas_unreachable", "connection refused").into_response();
        let body = axum::body::to_bytes(r.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn into_response_uses_status() {
        let r = AppError::ticket_rejected("invalid_ticket", "x").into_response();
        assert_eq!(r.status(), StatusCode::FORBIDDEN);
        let r = AppError::provider_unreachable("cas_unreachable", "x").into_response();
        assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
