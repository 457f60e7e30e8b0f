//! In-process stand-in for the departments/positions API used by the tests.
//!
//! Lists departments inside a `{"data": [...]}` envelope and positions as a
//! bare array, applies partial updates, and embeds the current department
//! name in every position it returns.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use org_admin_core::RecordId;
use serde_json::{json, Value};
use url::Url;

#[derive(Default)]
struct Store {
    next_id: RecordId,
    departments: Vec<StoredDepartment>,
    positions: Vec<StoredPosition>,
    calls: HashMap<String, usize>,
    failing: bool,
}

struct StoredDepartment {
    id: RecordId,
    name: String,
    description: Option<String>,
    subaccount: String,
    updated_at: String,
}

struct StoredPosition {
    id: RecordId,
    name: String,
    department_id: RecordId,
    updated_at: String,
}

impl Store {
    fn allocate(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    /// Counts the call and answers 500 while failing.
    fn enter(&mut self, method: Method, resource: &str) -> Result<(), StatusCode> {
        *self
            .calls
            .entry(format!("{method} /{resource}"))
            .or_default() += 1;
        if self.failing {
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            Ok(())
        }
    }

    fn department_json(department: &StoredDepartment) -> Value {
        json!({
            "id": department.id,
            "nombre": department.name,
            "descripcion": department.description,
            "subcuenta": department.subaccount,
            "updated_at": department.updated_at,
        })
    }

    fn position_json(&self, position: &StoredPosition) -> Value {
        let department = self
            .departments
            .iter()
            .find(|department| department.id == position.department_id)
            .map(|department| json!({"id": department.id, "nombre": department.name}));
        json!({
            "id": position.id,
            "nombre": position.name,
            "departamento_id": position.department_id,
            "departamento": department,
            "updated_at": position.updated_at,
        })
    }
}

type Shared = Arc<Mutex<Store>>;

pub struct FakeBackend {
    addr: SocketAddr,
    store: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let store = Shared::default();
        let app = Router::new()
            .route("/api/departamentos", get(list_departments).post(create_department))
            .route(
                "/api/departamentos/:id",
                axum::routing::put(update_department).delete(delete_department),
            )
            .route("/api/puestos", get(list_positions).post(create_position))
            .route(
                "/api/puestos/:id",
                axum::routing::put(update_position).delete(delete_position),
            )
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend");
        });
        Self { addr, store }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("base url")
    }

    /// Number of requests seen for `"{METHOD} /{resource}"`, e.g. `"POST /puestos"`.
    pub fn calls(&self, key: &str) -> usize {
        self.lock().calls.get(key).copied().unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn seed_department(&self, name: &str, subaccount: &str) -> RecordId {
        let mut store = self.lock();
        let id = store.allocate();
        store.departments.push(StoredDepartment {
            id,
            name: name.into(),
            description: None,
            subaccount: subaccount.into(),
            updated_at: Utc::now().to_rfc3339(),
        });
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().expect("store lock")
    }
}

fn lock(store: &Shared) -> std::sync::MutexGuard<'_, Store> {
    store.lock().expect("store lock")
}

fn text(body: &Value, field: &str) -> Option<String> {
    body.get(field).and_then(Value::as_str).map(str::to_string)
}

async fn list_departments(State(store): State<Shared>) -> Result<Json<Value>, StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::GET, "departamentos")?;
    let items: Vec<Value> = store.departments.iter().map(Store::department_json).collect();
    Ok(Json(json!({ "data": items })))
}

async fn create_department(
    State(store): State<Shared>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::POST, "departamentos")?;
    let (Some(name), Some(subaccount)) = (text(&body, "nombre"), text(&body, "subcuenta")) else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };
    let id = store.allocate();
    let department = StoredDepartment {
        id,
        name,
        description: text(&body, "descripcion"),
        subaccount,
        updated_at: Utc::now().to_rfc3339(),
    };
    let response = Store::department_json(&department);
    store.departments.push(department);
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_department(
    State(store): State<Shared>,
    Path(id): Path<RecordId>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::PUT, "departamentos")?;
    let department = store
        .departments
        .iter_mut()
        .find(|department| department.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = text(&body, "nombre") {
        department.name = name;
    }
    if let Some(description) = text(&body, "descripcion") {
        department.description = (!description.is_empty()).then_some(description);
    }
    if let Some(subaccount) = text(&body, "subcuenta") {
        department.subaccount = subaccount;
    }
    department.updated_at = Utc::now().to_rfc3339();
    Ok(Json(json!({ "data": Store::department_json(department) })))
}

async fn delete_department(
    State(store): State<Shared>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::DELETE, "departamentos")?;
    let before = store.departments.len();
    store.departments.retain(|department| department.id != id);
    if store.departments.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_positions(State(store): State<Shared>) -> Result<Json<Value>, StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::GET, "puestos")?;
    let items: Vec<Value> = store
        .positions
        .iter()
        .map(|position| store.position_json(position))
        .collect();
    Ok(Json(Value::Array(items)))
}

async fn create_position(
    State(store): State<Shared>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::POST, "puestos")?;
    let name = text(&body, "nombre").ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let department_id = body
        .get("departamento_id")
        .and_then(Value::as_i64)
        .filter(|id| store.departments.iter().any(|department| department.id == *id))
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let id = store.allocate();
    let position = StoredPosition {
        id,
        name,
        department_id,
        updated_at: Utc::now().to_rfc3339(),
    };
    let response = store.position_json(&position);
    store.positions.push(position);
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_position(
    State(store): State<Shared>,
    Path(id): Path<RecordId>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::PUT, "puestos")?;
    let index = store
        .positions
        .iter()
        .position(|position| position.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let department_id = body.get("departamento_id").and_then(Value::as_i64);
    let position = &mut store.positions[index];
    if let Some(name) = text(&body, "nombre") {
        position.name = name;
    }
    if let Some(department_id) = department_id {
        position.department_id = department_id;
    }
    position.updated_at = Utc::now().to_rfc3339();
    let response = store.position_json(&store.positions[index]);
    Ok(Json(response))
}

async fn delete_position(
    State(store): State<Shared>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, StatusCode> {
    let mut store = lock(&store);
    store.enter(Method::DELETE, "puestos")?;
    let before = store.positions.len();
    store.positions.retain(|position| position.id != id);
    if store.positions.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}
