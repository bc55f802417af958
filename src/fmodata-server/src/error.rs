use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use fmodata_core::models::ErrorResponse;
use fmodata_rs::ClientError;

use crate::VERSION;

/// Errors returned by handlers and middleware
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("OData client is not configured")]
    OdataDisabled,

    /// The request outlived the configured service timeout
    #[error("Timeout")]
    Timeout,

    #[error(transparent)]
    Odata(#[from] ClientError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn label(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not found",
            ApiError::OdataDisabled => "odata disabled",
            ApiError::Timeout => "timeout",
            ApiError::Odata(_) => "odata request failed",
            ApiError::Internal(_) => "internal error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::OdataDisabled | ApiError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Odata(err) => match err {
                // Remote client errors keep their status; anything else the
                // service said is a bad upstream answer
                ClientError::Remote { status, .. } if *status >= 400 => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ClientError::Request(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
                ClientError::Serialization(_) | ClientError::Io(_) | ClientError::InvalidUrl(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Escapes the middleware stack as an `Err`, so it carries its own
        // version header
        if let ApiError::Timeout = self {
            return HttpResponse::build(self.status_code())
                .insert_header(("X-Version", VERSION))
                .content_type("text/plain; charset=utf-8")
                .body("Timeout");
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.label().to_string(),
            message: Some(self.to_string()),
        })
    }
}
