mod routes;
mod state;

use std::path::PathBuf;

use anyhow::{Context, Result};
use blend_core::BlendSession;
use clap::Parser;
use routes::make_router_with_cors;
use state::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blend_daemon", about = "HTTP service for one blend session")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
    #[arg(long, default_value_t = 3002)]
    port: u16,
    /// Mount point for every route, e.g. /craze-blend-ratio/.
    #[arg(long, default_value = "/")]
    base_path: String,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Start from this recipe instead of the two-component default.
    #[arg(long)]
    recipe: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let session = match &args.recipe {
        Some(path) => {
            let recipe = blend_recipe::load_recipe(path)?;
            tracing::info!(recipe = %recipe.name, path = %path.display(), "loaded recipe");
            recipe.into_session()
        }
        None => BlendSession::new(),
    };

    let state = AppState::new(session, &args.base_path);
    let base_path = state.base_path.clone();
    let app = make_router_with_cors(state, &args.cors_origin)?;

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, base_path = %base_path, "blend_daemon listening");
    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use routes::make_router;
    use tower::ServiceExt;

    fn make_test_state() -> AppState {
        AppState::new(BlendSession::new(), "/")
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, _, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn calculate_pair_by_total(app: &Router) {
        send(
            app,
            "PUT",
            "/api/v1/components/0/ratio",
            Some(serde_json::json!({"value": "2"})),
        )
        .await;
        send(
            app,
            "PUT",
            "/api/v1/components/1/ratio",
            Some(serde_json::json!({"value": 3})),
        )
        .await;
        send(app, "PUT", "/api/v1/basis", Some(serde_json::json!({"mode": "total"}))).await;
        send(app, "PUT", "/api/v1/target", Some(serde_json::json!({"value": "100"}))).await;
        let (status, _, _) = send(app, "POST", "/api/v1/calculate", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_meta_returns_200() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(&app, "GET", "/api/v1/meta", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "blend_daemon");
        assert_eq!(json["components"], 2);
        assert_eq!(json["has_results"], false);
    }

    #[tokio::test]
    async fn test_session_snapshot_is_default() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(&app, "GET", "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["components"][0]["name"], "Component A");
        assert_eq!(json["basis_mode"], "component");
        assert_eq!(json["target_mass"], "");
    }

    #[tokio::test]
    async fn test_add_component_returns_created() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(&app, "POST", "/api/v1/components", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["type"], "component_added");
        assert_eq!(json["name"], "Component 3");
    }

    #[tokio::test]
    async fn test_remove_out_of_range_returns_404() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(&app, "DELETE", "/api/v1/components/9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["type"], "command_ignored");
    }

    #[tokio::test]
    async fn test_rename_component() {
        let app = make_router(make_test_state());
        let (status, _) = send_json(
            &app,
            "PUT",
            "/api/v1/components/1/name",
            Some(serde_json::json!({"name": "Kenya"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, json) = send_json(&app, "GET", "/api/v1/session", None).await;
        assert_eq!(json["components"][1]["name"], "Kenya");
    }

    #[tokio::test]
    async fn test_bad_ratio_is_coerced_and_reported() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(
            &app,
            "PUT",
            "/api/v1/components/0/ratio",
            Some(serde_json::json!({"value": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["edit"]["outcome"], "coerced_to_zero");
        assert_eq!(json["edit"]["reason"], "unparsable");
    }

    #[tokio::test]
    async fn test_calculate_without_target_returns_422() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(&app, "POST", "/api/v1/calculate", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["reason"]["reason"], "invalid_target_mass");
    }

    #[tokio::test]
    async fn test_calculate_and_export() {
        let app = make_router(make_test_state());
        calculate_pair_by_total(&app).await;

        let (_, results) = send_json(&app, "GET", "/api/v1/results", None).await;
        assert_eq!(results[0]["mass"], 40.0);
        assert_eq!(results[1]["mass"], 60.0);

        let (status, headers, body) = send(&app, "GET", "/api/v1/export.csv", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"blend.csv\""
        );
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Component,Mass (g)\nComponent A,40\nComponent B,60"
        );
    }

    #[tokio::test]
    async fn test_escaped_export_quotes_names() {
        let app = make_router(make_test_state());
        send(
            &app,
            "PUT",
            "/api/v1/components/0/name",
            Some(serde_json::json!({"name": "Brazil, Santos"})),
        )
        .await;
        calculate_pair_by_total(&app).await;

        let (_, _, body) = send(&app, "GET", "/api/v1/export.csv?format=escaped", None).await;
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Component,Mass (g)\n\"Brazil, Santos\",40\nComponent B,60"
        );
    }

    #[tokio::test]
    async fn test_export_without_results_returns_204() {
        let app = make_router(make_test_state());
        let (status, _, body) = send(&app, "GET", "/api/v1/export.csv", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_failed_calculation_keeps_results() {
        let app = make_router(make_test_state());
        calculate_pair_by_total(&app).await;
        send(&app, "PUT", "/api/v1/target", Some(serde_json::json!({"value": "-1"}))).await;

        let (status, _) = send_json(&app, "POST", "/api/v1/calculate", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (_, results) = send_json(&app, "GET", "/api/v1/results", None).await;
        assert_eq!(results.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_basis_index_out_of_range_changes_nothing() {
        let app = make_router(make_test_state());
        let (status, _) = send_json(
            &app,
            "PUT",
            "/api/v1/basis",
            Some(serde_json::json!({"mode": "total", "index": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, json) = send_json(&app, "GET", "/api/v1/session", None).await;
        assert_eq!(json["basis_mode"], "component");
    }

    #[tokio::test]
    async fn test_generic_command_endpoint() {
        let app = make_router(make_test_state());
        let (status, json) = send_json(
            &app,
            "POST",
            "/api/v1/commands",
            Some(serde_json::json!({"type": "select_basis_component", "index": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["type"], "basis_component_selected");
    }

    #[tokio::test]
    async fn test_routes_nest_under_base_path() {
        let state = AppState::new(BlendSession::new(), "/craze-blend-ratio/");
        let app = make_router(state);

        let (status, _, _) = send(&app, "GET", "/craze-blend-ratio/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(&app, "GET", "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_cors_origin_is_rejected() {
        assert!(make_router_with_cors(make_test_state(), "bad\norigin").is_err());
    }

    #[tokio::test]
    async fn test_recipe_seeds_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.json");
        let mut recipe = blend_recipe::starter_recipe();
        recipe.name = "house".to_string();
        recipe.target_mass_g = Some(50.0);
        blend_recipe::save_recipe(&path, &recipe).unwrap();

        let session = blend_recipe::load_recipe(&path).unwrap().into_session();
        let app = make_router(AppState::new(session, "/"));

        let (status, json) = send_json(&app, "POST", "/api/v1/calculate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"][1]["mass"], 50.0);
    }
}
