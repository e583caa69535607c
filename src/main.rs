mod bigcommerce;
mod export;
mod firebase;
mod http;
mod metrics;
mod models;
mod session;

use axum::{
    Json, Router,
    extract::{Form, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bigcommerce::{ConfigError, Credentials, StoreConfig, resolve_override};
use chrono::Utc;
use export::{ExportError, ExportOptions, Exporter, FIELD_OPTIONS, parse_rows};
use firebase::{FirebaseClient, FirebaseError};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{
    ApiError, DownloadQuery, ExportForm, ExportPreviewResponse, FieldOption, LoadCredsRequest,
    LoadCredsResponse, SaveCredsRequest, checkbox, trimmed,
};
use serde_json::json;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "bcexport.api", "server crashed: {err}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let openapi: serde_json::Value =
        serde_yaml::from_str(include_str!("../docs/openapi.yaml"))
            .unwrap_or(serde_json::json!({"openapi":"3.0.3"}));
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("prom recorder");
    let redis = std::env::var("REDIS_URL")
        .ok()
        .and_then(|u| redis::Client::open(u).ok());
    let firebase = FirebaseClient::from_env();
    if firebase.is_none() {
        warn!(
            target = "bcexport.firebase",
            "FIREBASE_PROJECT_ID / FIREBASE_API_KEY not set; credential store disabled"
        );
    }

    let state = AppState {
        exporter: Exporter::new(),
        firebase,
        sessions: Arc::new(Mutex::new(HashMap::new())),
        redis,
        openapi: Arc::new(openapi),
        prometheus_handle,
    };

    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
        .route("/fields", get(list_fields))
        .route("/export", post(export_preview))
        .route("/download", get(download))
        .route("/api/save_creds", post(save_creds))
        .route("/api/load_creds", post(load_creds))
        .route("/logout", post(logout))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit_from_env()));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "bcexport.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    exporter: Exporter,
    firebase: Option<FirebaseClient>,
    sessions: Arc<Mutex<HashMap<String, Credentials>>>,
    redis: Option<redis::Client>,
    openapi: Arc<serde_json::Value>,
    prometheus_handle: PrometheusHandle,
}

/// Health and readiness check.
///
/// - Method: `GET`
/// - Path: `/health`
/// - Auth: none
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "bcexport-api-rs",
    }))
}

/// Ordered list of exportable fields and their friendly labels, for the
/// field picker UI.
async fn list_fields() -> Json<Vec<FieldOption>> {
    Json(
        FIELD_OPTIONS
            .iter()
            .map(|&(key, label)| FieldOption { key, label })
            .collect(),
    )
}

/// Run the export pipeline and return a JSON preview.
///
/// - Method: `POST`
/// - Path: `/export`
/// - Body: url-encoded `ExportForm`
///
/// Explicit credential overrides are cached under the caller's
/// `X-Session-Id`; otherwise the cached credentials from an earlier
/// request on the same session apply.
async fn export_preview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ExportForm>,
) -> Result<Json<ExportPreviewResponse>, AppError> {
    crate::metrics::inc_requests("/export");
    let fields = form.field_list();
    if fields.is_empty() {
        return Err(AppError::invalid_input("export", "no fields selected"));
    }

    let sid = session_id(&headers);
    let explicit = form.credentials();
    let session = if explicit.is_empty() {
        session_credentials(&state, &sid).await
    } else {
        store_session_credentials(&state, &sid, &explicit).await;
        None
    };
    let overrides = resolve_override(explicit, session);
    let config = StoreConfig::resolve(&overrides)?;

    let options = ExportOptions {
        fields: fields.clone(),
        include_variants: checkbox(&form.include_variants),
        include_unavailable: checkbox(&form.include_unavailable),
        include_hidden: checkbox(&form.include_hidden),
        custom_domain: trimmed(&form.custom_domain),
        ..ExportOptions::default()
    };
    let output = state.exporter.run(&config, &options).await?;

    let preview_rows = parse_rows(&output.csv);
    Ok(Json(ExportPreviewResponse {
        fields: fields.join(","),
        product_count: output.product_count,
        row_count: output.row_count,
        generated_at: Utc::now(),
        preview_rows,
        csv: output.csv,
    }))
}

/// Same pipeline as `/export`, delivered as a file attachment.
///
/// - Method: `GET`
/// - Path: `/download`
/// - Query: comma-joined `fields`, `include_*` as `"1"` flags
///
/// Reads session-cached credentials but never writes them.
async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/download");
    let fields = query.field_list();
    if fields.is_empty() {
        return Err(AppError::invalid_input("download", "no fields selected"));
    }

    let sid = session_id(&headers);
    let explicit = query.credentials();
    let session = if explicit.is_empty() {
        session_credentials(&state, &sid).await
    } else {
        None
    };
    let overrides = resolve_override(explicit, session);
    let config = StoreConfig::resolve(&overrides)?;

    let options = ExportOptions {
        fields,
        include_variants: checkbox(&query.include_variants),
        include_unavailable: checkbox(&query.include_unavailable),
        include_hidden: checkbox(&query.include_hidden),
        custom_domain: trimmed(&query.custom_domain),
        ..ExportOptions::default()
    };
    let output = state.exporter.run(&config, &options).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=products.csv",
            ),
        ],
        output.csv,
    )
        .into_response())
}

/// Persist credentials for the verified user.
///
/// - Method: `POST`
/// - Path: `/api/save_creds`
/// - Body: `{id_token, store_hash, client_id, access_token}`
async fn save_creds(
    State(state): State<AppState>,
    Json(payload): Json<SaveCredsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    crate::metrics::inc_requests("/api/save_creds");
    if payload.id_token.is_empty()
        || payload.store_hash.is_empty()
        || payload.client_id.is_empty()
        || payload.access_token.is_empty()
    {
        return Err(AppError::invalid_input(
            "save_creds",
            "missing token or credentials",
        ));
    }
    let firebase = state.firebase.as_ref().ok_or(AppError::StoreUnavailable)?;
    let uid = firebase.verify_id_token(&payload.id_token).await?;
    let credentials = Credentials {
        store_hash: payload.store_hash,
        client_id: payload.client_id,
        access_token: payload.access_token,
    };
    firebase.save_credentials(&uid, &credentials).await?;
    info!(target = "bcexport.firebase", uid = %uid, "credentials saved");
    Ok(Json(json!({"status": "saved"})))
}

/// Load the verified user's saved credentials, if any.
async fn load_creds(
    State(state): State<AppState>,
    Json(payload): Json<LoadCredsRequest>,
) -> Result<Json<LoadCredsResponse>, AppError> {
    crate::metrics::inc_requests("/api/load_creds");
    if payload.id_token.is_empty() {
        return Err(AppError::invalid_input("load_creds", "missing token"));
    }
    let firebase = state.firebase.as_ref().ok_or(AppError::StoreUnavailable)?;
    let uid = firebase.verify_id_token(&payload.id_token).await?;
    match firebase.load_credentials(&uid).await? {
        Some(credentials) => Ok(Json(LoadCredsResponse::Found {
            store_hash: credentials.store_hash,
            client_id: credentials.client_id,
            access_token: credentials.access_token,
        })),
        None => Ok(Json(LoadCredsResponse::NotFound)),
    }
}

/// Clear the session-cached credentials.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    crate::metrics::inc_requests("/logout");
    let sid = session_id(&headers);
    if !sid.is_empty() {
        if let Some(client) = &state.redis {
            session::redis_delete(client, &sid).await;
        }
        state.sessions.lock().await.remove(&sid);
    }
    Json(json!({"status": "logged_out"}))
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get("X-Session-Id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

async fn session_credentials(state: &AppState, sid: &str) -> Option<Credentials> {
    if sid.is_empty() {
        return None;
    }
    if let Some(client) = &state.redis {
        return session::redis_get(client, sid).await;
    }
    state.sessions.lock().await.get(sid).cloned()
}

async fn store_session_credentials(state: &AppState, sid: &str, credentials: &Credentials) {
    if sid.is_empty() {
        return;
    }
    if let Some(client) = &state.redis {
        session::redis_set(client, sid, credentials).await;
        return;
    }
    state
        .sessions
        .lock()
        .await
        .insert(sid.to_string(), credentials.clone());
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Ok(key) = std::env::var("OPENAPI_KEY") {
        let presented = headers
            .get("X-Docs-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != key {
            return Err(AppError::invalid_input("docs", "unauthorized"));
        }
    }
    Ok(Json((*state.openapi).clone()))
}

async fn swagger_ui() -> axum::http::Response<String> {
    let html = r#"<!doctype html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>Catalog Export API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    };
  </script>
</body>
</html>"#;
    axum::http::Response::builder()
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.to_string())
        .unwrap()
}

async fn metrics_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> axum::http::Response<String> {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return axum::http::Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body("unauthorized".into())
                .unwrap();
        }
    }
    let body = state.prometheus_handle.render();
    axum::http::Response::builder()
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .unwrap()
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(256 * 1024)
}

#[derive(Debug)]
enum AppError {
    InvalidInput {
        scope: &'static str,
        message: &'static str,
    },
    Config(ConfigError),
    Export(ExportError),
    Firebase(FirebaseError),
    StoreUnavailable,
}

impl AppError {
    fn invalid_input(scope: &'static str, message: &'static str) -> Self {
        Self::InvalidInput { scope, message }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<FirebaseError> for AppError {
    fn from(value: FirebaseError) -> Self {
        Self::Firebase(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            AppError::InvalidInput { scope, message } => (
                StatusCode::BAD_REQUEST,
                scope.to_string(),
                Some(message.to_string()),
            ),
            AppError::Config(err) => (
                StatusCode::BAD_REQUEST,
                "missing_configuration".to_string(),
                Some(err.to_string()),
            ),
            // Transport failures and non-success upstream statuses both
            // surface as a bad gateway with the raw detail attached.
            AppError::Export(ExportError::Catalog(err)) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error".to_string(),
                Some(err.to_string()),
            ),
            AppError::Export(ExportError::Rows(err)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "csv_error".to_string(),
                Some(err.to_string()),
            ),
            AppError::Firebase(FirebaseError::Unauthorized(detail)) => (
                StatusCode::UNAUTHORIZED,
                "invalid_id_token".to_string(),
                Some(detail),
            ),
            AppError::Firebase(err) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "credential_store_unavailable".to_string(),
                Some(err.to_string()),
            ),
            AppError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "credential_store_unavailable".to_string(),
                Some("Firebase is not configured".to_string()),
            ),
        };
        let payload = ApiError {
            error,
            detail,
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
