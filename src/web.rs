use crate::api_errors::AppError;
use crate::app_state::AppState;
use crate::config::FormDefaults;
use crate::feature_adapter::RawInput;
use crate::feature_schema::{Feature, SpecInfo};
use crate::pipeline::Assessment;
use crate::render::{render_page, Outcome};
use axum::{
    extract::{rejection::JsonRejection, Form, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: SpecInfo,
    pub defaults: FormDefaults,
    pub decision_threshold: f64,
}

/// Build the router: the HTML form, the versioned JSON API, and health checks.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // form page
        .route("/", get(form_page).post(submit_form))
        // JSON API
        .route("/api/v1/predict", post(predict_json))
        .route("/api/v1/schema", get(schema))
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn form_page(State(st): State<Arc<AppState>>) -> Html<String> {
    let values = st.default_form_values();
    Html(render_page(st.pipeline.spec(), &values, Outcome::None))
}

async fn submit_form(
    State(st): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let echoed: BTreeMap<Feature, String> = form
        .iter()
        .filter_map(|(k, v)| Feature::from_name(k).map(|f| (f, v.clone())))
        .collect();
    let spec = st.pipeline.spec();

    match st.pipeline.assess(&RawInput::from_form(form)) {
        Ok(assessment) => (
            StatusCode::OK,
            Html(render_page(spec, &echoed, Outcome::Scored(&assessment))),
        ),
        Err(e) if e.is_input_error() => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(render_page(spec, &echoed, Outcome::InputError(e.to_string()))),
        ),
        Err(e) => {
            tracing::error!(error = %e, "form submission failed");
            (
                e.status_code(),
                Html(render_page(spec, &echoed, Outcome::Failure)),
            )
        }
    }
}

async fn predict_json(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<RawInput>, JsonRejection>,
) -> Result<Json<Assessment>, AppError> {
    let Json(raw) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let assessment = st.pipeline.assess(&raw)?;
    Ok(Json(assessment))
}

async fn schema(State(st): State<Arc<AppState>>) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        schema: st.pipeline.spec().info(),
        defaults: st.defaults.clone(),
        decision_threshold: st.pipeline.predictor().threshold(),
    })
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readyz(State(st): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut status = st.pipeline.status();
    status["ready"] = serde_json::Value::Bool(true);
    Json(status)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("no route for {uri}"))
}
