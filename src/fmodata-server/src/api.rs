use actix_web::{middleware::from_fn, web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use fmodata_core::config::Config;
use fmodata_core::models::{Record, TableDefinition};
use fmodata_core::store::RequestLog;
use fmodata_rs::Client;

use crate::error::ApiError;
use crate::middleware::{log_requests, request_timeout, require_token};
use crate::{SERVICE_NAME, VERSION};

/// Shared application state
pub struct AppState {
    pub request_log: Arc<dyn RequestLog>,
    pub odata: Option<Arc<Client>>,
    pub config: Arc<Config>,
}

impl AppState {
    fn odata(&self) -> Result<&Client, ApiError> {
        self.odata.as_deref().ok_or(ApiError::OdataDisabled)
    }

    /// JSON response, pretty-printed in debug mode
    fn json<T: Serialize>(
        &self,
        builder: &mut actix_web::HttpResponseBuilder,
        body: &T,
    ) -> HttpResponse {
        if self.config.debug {
            match serde_json::to_string_pretty(body) {
                Ok(text) => builder.content_type("application/json").body(text),
                Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
            }
        } else {
            builder.json(body)
        }
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    #[serde(rename = "dbStatus")]
    db_status: String,
    name: &'static str,
    title: &'static str,
    version: &'static str,
}

/// Health check
/// GET /
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let db_status = match state.request_log.ping().await {
        Ok(()) => "OK".to_string(),
        Err(e) => {
            tracing::error!("Request log store unavailable: {:#}", e);
            e.to_string()
        }
    };

    state.json(
        &mut HttpResponse::Ok(),
        &HealthResponse {
            db_status,
            name: SERVICE_NAME,
            title: "Health Check",
            version: VERSION,
        },
    )
}

#[derive(Serialize, Deserialize)]
pub struct PingResponse {
    pub result: String,
}

/// GET /ping/{argument}
pub async fn ping(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult {
    let argument = path.into_inner();
    if argument == "notfound" {
        return Err(ApiError::NotFound("Nope".to_string()));
    }
    Ok(state.json(&mut HttpResponse::Ok(), &PingResponse { result: argument }))
}

/// Echo a JSON object back
/// POST /pong
pub async fn pong(body: web::Bytes, state: web::Data<AppState>) -> ApiResult {
    let input: Record = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    Ok(state.json(
        &mut HttpResponse::Ok(),
        &serde_json::json!({ "message": input }),
    ))
}

fn parse_day(value: &str, which: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("wrong date format in {}", which)))
}

/// `[from 00:00:00, to 23:59:59.999999999]` in UTC
pub fn day_range(from: &str, to: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let from = parse_day(from, "from")?;
    let to = parse_day(to, "to")?;

    let start = from
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::BadRequest("wrong date format in from".to_string()))?
        .and_utc();
    let end = to
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .ok_or_else(|| ApiError::BadRequest("wrong date format in to".to_string()))?
        .and_utc();
    Ok((start, end))
}

/// Request log entries between two days, inclusive
/// GET /logs/{from}/{to}
#[tracing::instrument(skip(path, state))]
pub async fn get_logs(path: web::Path<(String, String)>, state: web::Data<AppState>) -> ApiResult {
    let (from, to) = path.into_inner();
    let (start, end) = day_range(&from, &to)?;

    let logs = state.request_log.range(start, end).await?;
    tracing::debug!(count = logs.len(), "Fetched request logs");
    Ok(state.json(&mut HttpResponse::Ok(), &logs))
}

// ============================================================================
// OData passthrough
// ============================================================================

/// GET /odata
pub async fn odata_ping(state: web::Data<AppState>) -> ApiResult {
    state.odata()?.ping().await?;
    Ok(state.json(
        &mut HttpResponse::Ok(),
        &serde_json::json!({ "status": "ok" }),
    ))
}

/// GET /odata/{table}
#[tracing::instrument(skip(path, query, state))]
pub async fn list_records(
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
    state: web::Data<AppState>,
) -> ApiResult {
    let table = path.into_inner();
    let query = query.into_inner();
    let records = state.odata()?.list(&table, query.as_slice()).await?;
    Ok(state.json(&mut HttpResponse::Ok(), &records))
}

/// POST /odata/{table}
#[tracing::instrument(skip(path, body, state))]
pub async fn create_record(
    path: web::Path<String>,
    body: web::Json<Record>,
    state: web::Data<AppState>,
) -> ApiResult {
    let table = path.into_inner();
    match state.odata()?.create(&table, &body).await? {
        Some(record) => Ok(state.json(&mut HttpResponse::Created(), &record)),
        None => Ok(HttpResponse::Created().finish()),
    }
}

/// GET /odata/{table}/{id}
#[tracing::instrument(skip(path, state))]
pub async fn get_record(path: web::Path<(String, String)>, state: web::Data<AppState>) -> ApiResult {
    let (table, id) = path.into_inner();
    let record = state.odata()?.get(&table, &id).await?;
    Ok(state.json(&mut HttpResponse::Ok(), &record))
}

/// PATCH /odata/{table}/{id}
#[tracing::instrument(skip(path, body, state))]
pub async fn update_record(
    path: web::Path<(String, String)>,
    body: web::Json<Record>,
    state: web::Data<AppState>,
) -> ApiResult {
    let (table, id) = path.into_inner();
    state.odata()?.update(&table, &id, &body).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /odata/{table}/{id}
#[tracing::instrument(skip(path, state))]
pub async fn delete_record(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ApiResult {
    let (table, id) = path.into_inner();
    state.odata()?.delete(&table, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /odata/{table}/{id}/{field}
#[tracing::instrument(skip(path, state))]
pub async fn download_container(
    path: web::Path<(String, String, String)>,
    state: web::Data<AppState>,
) -> ApiResult {
    let (table, id, field) = path.into_inner();
    let content = state
        .odata()?
        .download_container(&table, &id, &field)
        .await?;
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .body(content))
}

/// Store the raw request body in a container field
/// PUT /odata/{table}/{id}/{field}
#[tracing::instrument(skip(path, body, state))]
pub async fn upload_container(
    path: web::Path<(String, String, String)>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ApiResult {
    let (table, id, field) = path.into_inner();
    state
        .odata()?
        .upload_container(&table, &id, &field, &body)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Run a script; a non-empty JSON body is passed as its parameter
/// POST /script/{name}
#[tracing::instrument(skip(path, body, state))]
pub async fn run_script(
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ApiResult {
    let name = path.into_inner();
    let parameter = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(
            serde_json::from_slice::<serde_json::Value>(&body)
                .map_err(|e| ApiError::BadRequest(format!("invalid script parameter: {}", e)))?,
        )
    };

    let result = state
        .odata()?
        .run_script(&name, parameter.as_ref())
        .await?;
    Ok(state.json(&mut HttpResponse::Ok(), &result))
}

// ============================================================================
// Schema
// ============================================================================

/// POST /schema/tables
#[tracing::instrument(skip(body, state))]
pub async fn create_table(
    body: web::Json<TableDefinition>,
    state: web::Data<AppState>,
) -> ApiResult {
    state.odata()?.create_table(&body).await?;
    Ok(HttpResponse::Created().finish())
}

/// DELETE /schema/tables/{name}
#[tracing::instrument(skip(path, state))]
pub async fn delete_table(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult {
    let name = path.into_inner();
    state.odata()?.delete_table(&name).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize)]
pub struct CreateIndexRequest {
    pub field: String,
}

/// POST /schema/tables/{table}/indexes
#[tracing::instrument(skip(path, body, state))]
pub async fn create_index(
    path: web::Path<String>,
    body: web::Json<CreateIndexRequest>,
    state: web::Data<AppState>,
) -> ApiResult {
    let table = path.into_inner();
    state.odata()?.create_index(&table, &body.field).await?;
    Ok(HttpResponse::Created().finish())
}

/// DELETE /schema/tables/{table}/indexes/{index}
#[tracing::instrument(skip(path, state))]
pub async fn delete_index(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ApiResult {
    let (table, index) = path.into_inner();
    state.odata()?.delete_index(&table, &index).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure routes.
///
/// Wrap order per service, innermost first: timeout, auth, request log.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .wrap(from_fn(request_timeout))
            .route(web::get().to(health)),
    )
    .service(
        web::resource("/ping/{argument}")
            .wrap(from_fn(request_timeout))
            .wrap(from_fn(log_requests))
            .route(web::get().to(ping)),
    )
    .service(
        web::resource("/pong")
            .wrap(from_fn(request_timeout))
            .wrap(from_fn(require_token))
            .wrap(from_fn(log_requests))
            .route(web::post().to(pong)),
    )
    .service(
        web::resource("/logs/{from}/{to}")
            .wrap(from_fn(request_timeout))
            .wrap(from_fn(require_token))
            .route(web::get().to(get_logs)),
    )
    .service(
        web::scope("/odata")
            .wrap(from_fn(request_timeout))
            .wrap(from_fn(require_token))
            .wrap(from_fn(log_requests))
            .route("", web::get().to(odata_ping))
            .service(
                web::resource("/{table}")
                    .route(web::get().to(list_records))
                    .route(web::post().to(create_record)),
            )
            .service(
                web::resource("/{table}/{id}")
                    .route(web::get().to(get_record))
                    .route(web::patch().to(update_record))
                    .route(web::delete().to(delete_record)),
            )
            .service(
                web::resource("/{table}/{id}/{field}")
                    .route(web::get().to(download_container))
                    .route(web::put().to(upload_container)),
            ),
    )
    .service(
        web::scope("/script")
            .wrap(from_fn(request_timeout))
            .wrap(from_fn(require_token))
            .wrap(from_fn(log_requests))
            .route("/{name}", web::post().to(run_script)),
    )
    .service(
        web::scope("/schema")
            .wrap(from_fn(request_timeout))
            .wrap(from_fn(require_token))
            .wrap(from_fn(log_requests))
            .route("/tables", web::post().to(create_table))
            .route("/tables/{name}", web::delete().to(delete_table))
            .route("/tables/{table}/indexes", web::post().to(create_index))
            .route(
                "/tables/{table}/indexes/{index}",
                web::delete().to(delete_index),
            ),
    );
}
