//! Request middleware: token auth, request logging and request timeout.
//!
//! All three are plain async functions mounted with
//! [`actix_web::middleware::from_fn`]. Auth and the timeout sit inside the
//! request logger so rejected and timed-out calls are logged too.

use actix_web::{
    body::{self, BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderValue, AUTHORIZATION},
    middleware::Next,
    web, Error, HttpRequest,
};
use chrono::Utc;
use fmodata_core::models::{NewUsageLog, RawJson};

use crate::api::AppState;
use crate::error::ApiError;

/// Validate an `Authorization` header against the configured token.
///
/// Accepts `Bearer <token>` or the bare token. An empty configured token
/// disables the check.
pub fn check_token(expected: &str, header: Option<&HeaderValue>) -> Result<(), ApiError> {
    if expected.is_empty() {
        return Ok(());
    }

    let value = header
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

    let token = match value.strip_prefix("Bearer ") {
        Some(rest) if !rest.is_empty() => rest,
        _ => value,
    };

    if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid authorization token".to_string()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Reject requests without the configured token
pub async fn require_token(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let expected = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.config.auth_token.clone())
        .unwrap_or_default();

    if let Err(err) = check_token(&expected, req.headers().get(AUTHORIZATION)) {
        tracing::warn!(path = %req.path(), "Rejected request: {}", err);
        return Ok(req.error_response(err));
    }

    next.call(req).await.map(ServiceResponse::map_into_boxed_body)
}

/// `path?query` of a request, as stored in the request log
pub fn endpoint(req: &HttpRequest) -> String {
    match req.query_string() {
        "" => req.path().to_string(),
        query => format!("{}?{}", req.path(), query),
    }
}

/// Record every request/response pair in the request log.
///
/// The request body is buffered and handed back to the handler; the response
/// body is buffered so it can be stored. Errors escaping inner middleware
/// (timeouts) are logged with their status before being passed on. A failing
/// store never fails the request.
pub async fn log_requests(
    mut req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return next.call(req).await.map(ServiceResponse::map_into_boxed_body);
    };

    let request_body = req.extract::<web::Bytes>().await?;
    let (_, mut payload) = actix_http::h1::Payload::create(true);
    payload.unread_data(request_body.clone());
    req.set_payload(payload.into());

    let method = req.method().to_string();
    let endpoint = endpoint(req.request());
    let request = if request_body.is_empty() {
        RawJson::from("{}")
    } else {
        RawJson(String::from_utf8_lossy(&request_body).into_owned())
    };

    let res = match next.call(req).await {
        Ok(res) => res,
        Err(err) => {
            let entry = NewUsageLog {
                status: i32::from(err.as_response_error().status_code().as_u16()),
                method,
                error: err.to_string(),
                endpoint,
                created_at: Utc::now(),
                response: RawJson::default(),
                request,
            };
            store_entry(&state, &entry).await;
            return Err(err);
        }
    };

    let status = res.status();
    let error = res
        .response()
        .error()
        .map(|e| e.to_string())
        .unwrap_or_default();

    let (http_req, http_res) = res.into_parts();
    let (http_res, response_body) = http_res.into_parts();
    let response_body = match body::to_bytes(response_body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let e: Box<dyn std::error::Error> = e.into();
            return Err(actix_web::error::ErrorInternalServerError(e.to_string()));
        }
    };

    let entry = NewUsageLog {
        status: i32::from(status.as_u16()),
        method,
        error,
        endpoint,
        created_at: Utc::now(),
        response: RawJson(String::from_utf8_lossy(&response_body).into_owned()),
        request,
    };
    store_entry(&state, &entry).await;

    let http_res = http_res.set_body(response_body).map_into_boxed_body();
    Ok(ServiceResponse::new(http_req, http_res))
}

async fn store_entry(state: &AppState, entry: &NewUsageLog) {
    if entry.error.is_empty() {
        tracing::debug!(status = entry.status, endpoint = %entry.endpoint, "Logging success");
    } else {
        tracing::info!(status = entry.status, endpoint = %entry.endpoint, error = %entry.error, "Logging error");
    }
    if let Err(e) = state.request_log.record(entry).await {
        tracing::error!("Failed to store request log: {:#}", e);
    }
}

/// Fail with [`ApiError::Timeout`] when a request outlives the configured
/// timeout.
///
/// Mounted inside the request logger so timed-out calls are still logged.
pub async fn request_timeout(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let timeout = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.config.request_timeout())
        .filter(|t| !t.is_zero());

    let Some(timeout) = timeout else {
        return next.call(req).await.map(ServiceResponse::map_into_boxed_body);
    };

    let path = req.path().to_string();
    match tokio::time::timeout(timeout, next.call(req)).await {
        Ok(res) => res.map(ServiceResponse::map_into_boxed_body),
        Err(_) => {
            tracing::warn!(path = %path, "Request timed out");
            Err(ApiError::Timeout.into())
        }
    }
}
