use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::ServeArgs;
use crate::join::{DroppedRow, JoinedRow, JoinedView, join_tables};
use crate::optimize::{self, OptimizedRow};
use crate::tables::{PanelError, ProviderInput, Subspecialty, Tables};

#[derive(Clone)]
struct AppState {
    tables: Arc<Mutex<Tables>>,
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let state = AppState {
        tables: Arc::new(Mutex::new(Tables::seed())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/panel", get(api_panel))
        .route("/api/filters", get(api_filters))
        .route("/api/session-limits", post(api_update_session_limit))
        .route("/api/providers", post(api_add_provider))
        .route("/api/optimize", post(api_optimize))
        .route("/api/tables/:name", get(api_table))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct PanelResponse {
    rows: Vec<JoinedRow>,
    dropped: Vec<DroppedRow>,
}

impl From<JoinedView> for PanelResponse {
    fn from(view: JoinedView) -> Self {
        Self {
            rows: view.rows,
            dropped: view.dropped,
        }
    }
}

async fn api_panel(State(st): State<AppState>) -> impl IntoResponse {
    let tables = st.tables.lock().await;
    Json(PanelResponse::from(join_tables(&tables)))
}

#[derive(Debug, Serialize)]
struct FiltersResponse {
    patient_groups: Vec<String>,
    providers: Vec<String>,
    subspecialties: Vec<Subspecialty>,
    all_subspecialties: Vec<Subspecialty>,
}

/// Distinct selector options from the current joined view, deduplicated and
/// ordered. `all_subspecialties` is the closed enum for the add-provider form.
fn filter_options(view: &JoinedView) -> FiltersResponse {
    let patient_groups: BTreeSet<String> =
        view.rows.iter().map(|r| r.patient_group.clone()).collect();
    let providers: BTreeSet<String> = view.rows.iter().map(|r| r.provider.clone()).collect();
    let subspecialties: BTreeSet<Subspecialty> =
        view.rows.iter().map(|r| r.subspecialty).collect();

    FiltersResponse {
        patient_groups: patient_groups.into_iter().collect(),
        providers: providers.into_iter().collect(),
        subspecialties: subspecialties.into_iter().collect(),
        all_subspecialties: Subspecialty::ALL.to_vec(),
    }
}

async fn api_filters(State(st): State<AppState>) -> impl IntoResponse {
    let tables = st.tables.lock().await;
    Json(filter_options(&join_tables(&tables)))
}

#[derive(Debug, Deserialize)]
struct UpdateLimitRequest {
    patient_group: String,
    provider: String,
    subspecialty: Subspecialty,
    max_sessions: u32,
}

#[derive(Debug, Serialize)]
struct UpdateLimitResponse {
    rows_updated: usize,
    panel: PanelResponse,
}

async fn api_update_session_limit(
    State(st): State<AppState>,
    Json(req): Json<UpdateLimitRequest>,
) -> impl IntoResponse {
    let mut tables = st.tables.lock().await;
    match tables.update_session_limit(
        &req.patient_group,
        &req.provider,
        req.subspecialty,
        req.max_sessions,
    ) {
        Ok(rows_updated) => {
            tracing::info!(
                patient_group = %req.patient_group,
                provider = %req.provider,
                subspecialty = %req.subspecialty,
                max_sessions = req.max_sessions,
                "session limit updated"
            );
            Json(UpdateLimitResponse {
                rows_updated,
                panel: PanelResponse::from(join_tables(&tables)),
            })
            .into_response()
        }
        Err(e) => panel_error_response(e),
    }
}

#[derive(Debug, Serialize)]
struct AddProviderResponse {
    provider: String,
    subspecialty: Subspecialty,
    referenced_by_session_limits: bool,
    panel: PanelResponse,
}

async fn api_add_provider(
    State(st): State<AppState>,
    Json(req): Json<ProviderInput>,
) -> impl IntoResponse {
    let mut tables = st.tables.lock().await;
    match tables.add_provider(req) {
        Ok(outcome) => {
            if !outcome.referenced_by_session_limits {
                tracing::warn!(
                    provider = %outcome.provider,
                    subspecialty = %outcome.subspecialty,
                    "new provider has no session-limit rows and will not appear in the joined view"
                );
            }
            Json(AddProviderResponse {
                provider: outcome.provider,
                subspecialty: outcome.subspecialty,
                referenced_by_session_limits: outcome.referenced_by_session_limits,
                panel: PanelResponse::from(join_tables(&tables)),
            })
            .into_response()
        }
        Err(e) => panel_error_response(e),
    }
}

#[derive(Debug, Serialize)]
struct OptimizedPanelRow {
    #[serde(flatten)]
    row: JoinedRow,
    optimized_sessions: f64,
}

#[derive(Debug, Serialize)]
struct OptimizeResponse {
    rows: Vec<OptimizedPanelRow>,
    dropped: Vec<DroppedRow>,
}

async fn api_optimize(State(st): State<AppState>) -> impl IntoResponse {
    let tables = st.tables.lock().await;
    let view = join_tables(&tables);
    match optimize::solve(&view) {
        Ok(optimized) => {
            let rows = zip_optimized(view.rows, optimized);
            Json(OptimizeResponse {
                rows,
                dropped: view.dropped,
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "kind": e.kind(), "error": e.to_string() })),
        )
            .into_response(),
    }
}

fn zip_optimized(rows: Vec<JoinedRow>, optimized: Vec<OptimizedRow>) -> Vec<OptimizedPanelRow> {
    rows.into_iter()
        .zip(optimized)
        .map(|(row, opt)| OptimizedPanelRow {
            row,
            optimized_sessions: opt.optimized_sessions,
        })
        .collect()
}

async fn api_table(
    State(st): State<AppState>,
    AxumPath(name): AxumPath<String>,
) -> impl IntoResponse {
    let tables = st.tables.lock().await;
    match name.as_str() {
        "patients" => Json(serde_json::json!(tables.patients)).into_response(),
        "providers" => Json(serde_json::json!(tables.providers)).into_response(),
        "session-limits" => Json(serde_json::json!(tables.session_limits)).into_response(),
        "operational" => Json(serde_json::json!(tables.operational)).into_response(),
        "historical" => Json(serde_json::json!(tables.historical)).into_response(),
        other => (
            StatusCode::NOT_FOUND,
            format!(
                "unknown table {other}; expected one of patients, providers, session-limits, operational, historical"
            ),
        )
            .into_response(),
    }
}

fn panel_error_response(e: PanelError) -> axum::response::Response {
    let status = match e {
        PanelError::UnknownCombination { .. } => StatusCode::NOT_FOUND,
        PanelError::EmptyProviderName => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string()).into_response()
}
