use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type AdminResult<T> = Result<T, AdminError>;

/// Admission failures. The set of categories is closed; every rejection the
/// pipeline produces maps onto one of these.
#[derive(thiserror::Error, Debug)]
pub enum AdminError {
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AdminError {
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a collaborator failure as an internal error. The message is what
    /// callers see; the cause stays attached for logs.
    pub fn wrap_internal(source: impl Into<anyhow::Error>, message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AdminError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AdminError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable wire category.
    pub fn category(&self) -> &'static str {
        match self {
            AdminError::NotImplemented(_) => "not_implemented",
            AdminError::Unauthorized(_) => "unauthorized",
            AdminError::Internal { .. } => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        if let AdminError::Internal {
            message,
            source: Some(source),
        } = &self
        {
            tracing::error!(error = ?source, "{message}");
        }

        let status = self.status();
        let payload = ErrorResponse {
            error: self.category().to_string(),
            message: self.to_string(),
        };

        (status, Json(payload)).into_response()
    }
}
