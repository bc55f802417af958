use actix_cors::Cors;
use actix_files as fs;
use actix_web::{middleware::DefaultHeaders, web, App, HttpServer};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use fmodata_core::config::Config;
use fmodata_core::store::SqliteLogStore;
use fmodata_rs::Client;
use fmodata_server::api::{self, AppState};
use fmodata_server::{telemetry, VERSION};

const CONFIG_PATH: &str = "config.json";

/// Uploads are buffered once by the request logger, so the limit applies there
const MAX_PAYLOAD: usize = 32 * 1024 * 1024;

fn load_config() -> Config {
    match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load {}: {:#}, using defaults", CONFIG_PATH, e);
            let config = Config::default();
            if !Path::new(CONFIG_PATH).exists() {
                match config.save(CONFIG_PATH) {
                    Ok(()) => tracing::info!("Wrote default configuration to {}", CONFIG_PATH),
                    Err(e) => tracing::warn!("Could not write {}: {:#}", CONFIG_PATH, e),
                }
            }
            config
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let guard = telemetry::init_telemetry()?;

    let config = load_config();

    tracing::info!("fmodata {} starting", VERSION);
    tracing::info!("  Port: {}", config.port);
    tracing::info!("  Request timeout: {}s", config.timeout);
    tracing::info!("  Request log: {}", config.request_log.path);
    tracing::info!(
        "  CORS: enabled={}, origins={:?}",
        config.cors.enabled,
        config.cors.allowed_origins
    );

    if !config.auth_enabled() && !config.debug {
        tracing::warn!("auth_token is empty, protected routes are open");
    }

    let request_log = SqliteLogStore::open(&config.request_log.path).await?;
    tracing::info!("✓ Request log store initialized");

    let odata = match &config.odata {
        Some(settings) => {
            tracing::info!(?settings, "Configuring OData client");
            let client = Client::new(settings.client_config())?;
            match client.ping().await {
                Ok(()) => tracing::info!("✓ OData service reachable at {}", client.base_url()),
                Err(e) => tracing::warn!("OData service not reachable yet: {}", e),
            }
            Some(Arc::new(client))
        }
        None => {
            tracing::info!("No OData settings, OData routes will answer 503");
            None
        }
    };

    let app_state = web::Data::new(AppState {
        request_log: Arc::new(request_log),
        odata,
        config: Arc::new(config.clone()),
    });

    let bind_addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 Starting HTTP server on {}", bind_addr);

    let cors_config = config.cors.clone();
    let assets_dir = config.assets_dir.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();

        if cors_config.enabled {
            for origin in &cors_config.allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors = cors
                .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    actix_web::http::header::AUTHORIZATION,
                    actix_web::http::header::ACCEPT,
                    actix_web::http::header::CONTENT_TYPE,
                ])
                .max_age(3600);
        }

        let mut app = App::new()
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(MAX_PAYLOAD))
            .wrap(DefaultHeaders::new().add(("X-Version", VERSION)))
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(api::configure);

        if Path::new(&assets_dir).is_dir() {
            app = app.service(fs::Files::new("/assets", &assets_dir));
        }
        app
    })
    .bind(&bind_addr)?
    .run();

    tracing::info!("Server running, press Ctrl+C to stop");
    server.await?;

    telemetry::shutdown_telemetry(guard);
    Ok(())
}
