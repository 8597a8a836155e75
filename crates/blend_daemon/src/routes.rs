use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use blend_core::{
    BasisMode, BlendResult, ExportFormat, RatioEdit, SessionCommand, SessionEvent,
    SessionSnapshot, CSV_FILE_NAME, CSV_MIME_TYPE,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173").expect("static origin parses")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {cors_origin}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let base_path = state.base_path.clone();
    let api = Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/session", get(session_handler))
        .route("/api/v1/commands", post(command_handler))
        .route("/api/v1/components", post(add_component_handler))
        .route("/api/v1/components/:index", delete(remove_component_handler))
        .route("/api/v1/components/:index/name", put(rename_handler))
        .route("/api/v1/components/:index/ratio", put(ratio_handler))
        .route("/api/v1/basis", put(basis_handler))
        .route("/api/v1/target", put(target_handler))
        .route("/api/v1/calculate", post(calculate_handler))
        .route("/api/v1/results", get(results_handler))
        .route("/api/v1/export.csv", get(export_handler))
        .with_state(state);

    let app = if base_path.is_empty() {
        api
    } else {
        Router::new().nest(&base_path, api)
    };
    Ok(app.layer(cors).layer(TraceLayer::new_for_http()))
}

// ---------------------------------------------------------------------------
// Command plumbing
// ---------------------------------------------------------------------------

fn apply(app_state: &AppState, command: SessionCommand) -> SessionEvent {
    let event = app_state.session.lock().apply(command);
    log_event(&event);
    event
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Calculated { results } => {
            tracing::info!(components = results.len(), "blend calculated");
        }
        SessionEvent::CalculationSkipped { reason } => {
            tracing::info!(%reason, "calculation skipped");
        }
        SessionEvent::RatioChanged {
            index,
            edit: RatioEdit::CoercedToZero { reason },
        } => {
            tracing::warn!(index = *index, %reason, "ratio input coerced to zero");
        }
        SessionEvent::CommandIgnored { error } => {
            tracing::warn!(%error, "command ignored");
        }
        other => tracing::debug!(?other, "session updated"),
    }
}

fn respond(event: SessionEvent) -> (StatusCode, Json<SessionEvent>) {
    let status = match &event {
        SessionEvent::ComponentAdded { .. } => StatusCode::CREATED,
        SessionEvent::CommandIgnored { .. } => StatusCode::NOT_FOUND,
        SessionEvent::CalculationSkipped { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::OK,
    };
    (status, Json(event))
}

/// Form fields arrive as strings or JSON numbers; both become raw text.
fn raw_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
pub struct NameBody {
    name: String,
}

#[derive(Deserialize)]
pub struct ValueBody {
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
pub struct BasisBody {
    mode: BasisMode,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    format: ExportFormat,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let session = app_state.session.lock();
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "base_path": app_state.base_path,
        "components": session.components().len(),
        "has_results": !session.results().is_empty(),
    }))
}

pub async fn session_handler(State(app_state): State<AppState>) -> Json<SessionSnapshot> {
    Json(app_state.session.lock().snapshot())
}

pub async fn command_handler(
    State(app_state): State<AppState>,
    Json(command): Json<SessionCommand>,
) -> (StatusCode, Json<SessionEvent>) {
    respond(apply(&app_state, command))
}

pub async fn add_component_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<SessionEvent>) {
    respond(apply(&app_state, SessionCommand::AddComponent))
}

pub async fn remove_component_handler(
    State(app_state): State<AppState>,
    Path(index): Path<usize>,
) -> (StatusCode, Json<SessionEvent>) {
    respond(apply(&app_state, SessionCommand::RemoveComponent { index }))
}

pub async fn rename_handler(
    State(app_state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<NameBody>,
) -> (StatusCode, Json<SessionEvent>) {
    respond(apply(
        &app_state,
        SessionCommand::RenameComponent {
            index,
            name: body.name,
        },
    ))
}

pub async fn ratio_handler(
    State(app_state): State<AppState>,
    Path(index): Path<usize>,
    Json(body): Json<ValueBody>,
) -> (StatusCode, Json<SessionEvent>) {
    let value = raw_text(&body.value);
    respond(apply(&app_state, SessionCommand::SetRatio { index, value }))
}

/// Selects the mode and, when given, the basis component. An out-of-range
/// index changes nothing.
pub async fn basis_handler(
    State(app_state): State<AppState>,
    Json(body): Json<BasisBody>,
) -> (StatusCode, Json<SessionEvent>) {
    let mut session = app_state.session.lock();
    if let Some(index) = body.index {
        let event = session.apply(SessionCommand::SelectBasisComponent { index });
        if matches!(event, SessionEvent::CommandIgnored { .. }) {
            drop(session);
            log_event(&event);
            return respond(event);
        }
    }
    let event = session.apply(SessionCommand::SelectBasisMode { mode: body.mode });
    drop(session);
    log_event(&event);
    respond(event)
}

pub async fn target_handler(
    State(app_state): State<AppState>,
    Json(body): Json<ValueBody>,
) -> (StatusCode, Json<SessionEvent>) {
    let value = raw_text(&body.value);
    respond(apply(&app_state, SessionCommand::SetTargetMass { value }))
}

pub async fn calculate_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<SessionEvent>) {
    respond(apply(&app_state, SessionCommand::Calculate))
}

pub async fn results_handler(State(app_state): State<AppState>) -> Json<BlendResult> {
    Json(app_state.session.lock().results().clone())
}

pub async fn export_handler(
    State(app_state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let rendered = app_state.session.lock().export(query.format);
    match rendered {
        Ok(Some(export)) => {
            if export.is_corrupted() {
                tracing::warn!(
                    rows = ?export.ambiguous_rows,
                    "plain export has names containing delimiters"
                );
            }
            let disposition = format!("attachment; filename=\"{CSV_FILE_NAME}\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, CSV_MIME_TYPE.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                export.body,
            )
                .into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::error!("export rendering failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "export failed"})),
            )
                .into_response()
        }
    }
}
