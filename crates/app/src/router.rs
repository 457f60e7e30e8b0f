use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{sse::Sse, Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use org_admin_api::{Departments, Positions, Resource};
use org_admin_core::{DepartmentFields, PositionFields, RecordId};
use serde::Deserialize;
use tracing::debug;

use crate::events::{page_keep_alive, page_stream, PageHub};
use crate::problem::ProblemResponse;
use crate::views::{DepartmentView, PositionView, ViewError};
use crate::{render, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    page: PageHub,
    departments: DepartmentView,
    positions: PositionView,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        page: PageHub,
        departments: DepartmentView,
        positions: PositionView,
    ) -> Self {
        Self {
            metrics,
            page,
            departments,
            positions,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn page(&self) -> &PageHub {
        &self.page
    }

    pub fn departments(&self) -> &DepartmentView {
        &self.departments
    }

    pub fn positions(&self) -> &PositionView {
        &self.positions
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/departamentos", post(submit_department))
        .route("/departamentos/cancel", post(cancel_department))
        .route("/departamentos/:id/edit", post(edit_department))
        .route("/departamentos/:id/delete", post(delete_department))
        .route("/puestos", post(submit_position))
        .route("/puestos/cancel", post(cancel_position))
        .route("/puestos/:id/edit", post(edit_position))
        .route("/puestos/:id/delete", post(delete_position))
        .route("/events", get(events))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

async fn index(State(state): State<AppState>) -> Html<String> {
    // Read the version first so any change after the snapshots triggers a reload.
    let version = state.page().version();
    tokio::join!(
        state.departments().ensure_loaded(),
        state.positions().ensure_loaded()
    );
    let departments = state.departments().snapshot().await;
    let positions = state.positions().snapshot().await;
    Html(render::page(&departments, &positions, version))
}

#[derive(Debug, Deserialize)]
struct DepartmentForm {
    #[serde(default)]
    nombre: String,
    #[serde(default)]
    descripcion: String,
    #[serde(default)]
    subcuenta: String,
}

impl From<DepartmentForm> for DepartmentFields {
    fn from(form: DepartmentForm) -> Self {
        Self {
            name: form.nombre,
            description: form.descripcion,
            subaccount: form.subcuenta,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PositionForm {
    #[serde(default)]
    nombre: String,
    /// Empty while the placeholder option is selected.
    #[serde(default)]
    departamento_id: String,
}

impl From<PositionForm> for PositionFields {
    fn from(form: PositionForm) -> Self {
        Self {
            name: form.nombre,
            department_id: form.departamento_id.trim().parse().ok(),
        }
    }
}

async fn submit_department(
    State(state): State<AppState>,
    Form(form): Form<DepartmentForm>,
) -> Result<Redirect, ProblemResponse> {
    let result = state.departments().submit(form.into()).await;
    back_to_page(Departments::PATH, result)
}

async fn edit_department(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Redirect, ProblemResponse> {
    let result = state.departments().begin_edit(id).await;
    back_to_page(Departments::PATH, result)
}

async fn cancel_department(State(state): State<AppState>) -> Redirect {
    state.departments().cancel().await;
    Redirect::to("/")
}

async fn delete_department(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Redirect, ProblemResponse> {
    let result = state.departments().press_delete(id).await;
    back_to_page(Departments::PATH, result)
}

async fn submit_position(
    State(state): State<AppState>,
    Form(form): Form<PositionForm>,
) -> Result<Redirect, ProblemResponse> {
    let result = state.positions().submit(form.into()).await;
    back_to_page(Positions::PATH, result)
}

async fn edit_position(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Redirect, ProblemResponse> {
    let result = state.positions().begin_edit(id).await;
    back_to_page(Positions::PATH, result)
}

async fn cancel_position(State(state): State<AppState>) -> Redirect {
    state.positions().cancel().await;
    Redirect::to("/")
}

async fn delete_position(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Redirect, ProblemResponse> {
    let result = state.positions().press_delete(id).await;
    back_to_page(Positions::PATH, result)
}

/// API failures were already logged by the view and leave the page as it was.
fn back_to_page<T: std::fmt::Debug>(
    view: &'static str,
    result: Result<T, ViewError>,
) -> Result<Redirect, ProblemResponse> {
    match result {
        Ok(outcome) => {
            debug!(stage = "app", view, ?outcome, "form handled");
            Ok(Redirect::to("/"))
        }
        Err(ViewError::UnknownRecord(id)) => Err(ProblemResponse::not_found(
            "unknown_record",
            format!("{view} {id} is not in the current list"),
        )),
        Err(ViewError::Api(_)) => Ok(Redirect::to("/")),
    }
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    #[serde(default)]
    since: Option<u64>,
}

async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Sse<impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, serde_json::Error>>> {
    let since = headers
        .get("Last-Event-ID")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse::<u64>().ok())
        .or(query.since);

    Sse::new(page_stream(state.page().clone(), since)).keep_alive(page_keep_alive())
}
