use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{
    CatalogForm, ElementStatusForm, JsonMap, PriorityForm, ProjectStatusForm,
};
use crate::server::response::{ApiError, StoreOptionExt};
use crate::types::{CatalogItem, CatalogKind, ElementKind};

/// The four name-plus-description tables share one handler set; priorities,
/// project statuses and element statuses carry extra columns and get their
/// own. The requirement-type table answers at the mount root for
/// compatibility with the original route layout.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(simple_catalog_routes(CatalogKind::RequirementType, "tipo_id"))
        .nest(
            "/tipos_relacion_cu",
            simple_catalog_routes(CatalogKind::UseCaseRelationType, "id"),
        )
        .nest(
            "/tipos_relacion_requisito",
            simple_catalog_routes(CatalogKind::RequirementRelationType, "id"),
        )
        .nest(
            "/tipos_estimacion",
            simple_catalog_routes(CatalogKind::EstimationType, "id"),
        )
        .nest("/prioridades", priority_routes())
        .nest("/estados", project_status_routes())
        .nest("/estados_elemento", element_status_routes())
}

fn simple_catalog_routes(kind: CatalogKind, id_key: &'static str) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/listar/",
            get(move |auth: RequireUser, state: State<Arc<AppState>>| list_items(kind, auth, state)),
        )
        .route(
            "/crear/",
            post(
                move |auth: RequireUser, state: State<Arc<AppState>>, form: Form<CatalogForm>| {
                    create_item(kind, id_key, auth, state, form)
                },
            ),
        )
        .route(
            "/obtener/{id}/",
            get(
                move |auth: RequireUser, state: State<Arc<AppState>>, path: Path<i64>| {
                    get_item(kind, id_key, auth, state, path)
                },
            ),
        )
        .route(
            "/editar/{id}/",
            post(
                move |auth: RequireUser,
                      state: State<Arc<AppState>>,
                      path: Path<i64>,
                      form: Form<CatalogForm>| {
                    edit_item(kind, auth, state, path, form)
                },
            ),
        )
        .route(
            "/deshabilitar/{id}/",
            post(
                move |auth: RequireUser, state: State<Arc<AppState>>, path: Path<i64>| {
                    disable_item(kind, auth, state, path)
                },
            ),
        )
}

fn item_json(item: &CatalogItem, id_key: &str) -> Value {
    let mut obj = JsonMap::new();
    obj.insert(id_key.to_string(), json!(item.id));
    obj.insert("nombre".to_string(), json!(item.name));
    obj.insert("descripcion".to_string(), json!(item.description));
    Value::Object(obj)
}

async fn list_items(
    kind: CatalogKind,
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let id_key = if kind == CatalogKind::RequirementType {
        "tipo_id"
    } else {
        "id"
    };
    let items: Vec<Value> = state
        .store
        .list_catalog_items(kind)?
        .iter()
        .map(|i| item_json(i, id_key))
        .collect();

    let mut body = JsonMap::new();
    body.insert(kind.table().to_string(), Value::Array(items));
    Ok(Json(Value::Object(body)))
}

async fn create_item(
    kind: CatalogKind,
    id_key: &'static str,
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<CatalogForm>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let nombre = form.nombre.unwrap_or_default();
    if nombre.trim().is_empty() {
        return Err(ApiError::bad_request("El campo nombre es requerido"));
    }
    let descripcion = form.descripcion.unwrap_or_default();

    let id = state
        .store
        .create_catalog_item(kind, nombre.trim(), &descripcion)?;

    let mut body = JsonMap::new();
    body.insert(
        "mensaje".to_string(),
        json!(format!("{} creado exitosamente", kind.label())),
    );
    body.insert(id_key.to_string(), json!(id));
    Ok((StatusCode::CREATED, Json(Value::Object(body))))
}

async fn get_item(
    kind: CatalogKind,
    id_key: &'static str,
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let item = state
        .store
        .get_catalog_item(kind, id)?
        .ok_or_else(|| ApiError::not_found(format!("{} no encontrado", kind.label())))?;

    Ok(Json(item_json(&item, id_key)))
}

async fn edit_item(
    kind: CatalogKind,
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<CatalogForm>,
) -> Result<Json<Value>, ApiError> {
    let nombre = form.nombre.filter(|s| !s.trim().is_empty());
    let updated = state
        .store
        .update_catalog_item(kind, id, nombre.as_deref(), form.descripcion.as_deref())?;
    if !updated {
        return Err(ApiError::not_found(format!(
            "{} no encontrado",
            kind.label()
        )));
    }

    Ok(Json(json!({
        "mensaje": format!("{} actualizado exitosamente", kind.label()),
    })))
}

async fn disable_item(
    kind: CatalogKind,
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let disabled = state.store.disable_catalog_item(kind, id)?;
    if !disabled {
        return Err(ApiError::not_found(format!(
            "{} no encontrado",
            kind.label()
        )));
    }

    Ok(Json(json!({
        "mensaje": format!("{} deshabilitado exitosamente", kind.label()),
    })))
}

// Priorities

fn priority_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listar/", get(list_priorities))
        .route("/crear/", post(create_priority))
        .route("/obtener/{id}/", get(get_priority))
        .route("/editar/{id}/", post(edit_priority))
        .route("/deshabilitar/{id}/", post(disable_priority))
}

async fn list_priorities(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let prioridades: Vec<Value> = state
        .store
        .list_priorities()?
        .iter()
        .map(|p| {
            json!({
                "prioridad_id": p.id,
                "nombre": p.name,
                "nivel": p.level,
                "descripcion": p.description,
            })
        })
        .collect();

    Ok(Json(json!({ "prioridades": prioridades })))
}

async fn create_priority(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<PriorityForm>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let nombre = form.nombre.unwrap_or_default();
    let (nombre, Some(nivel)) = (nombre.trim(), form.nivel) else {
        return Err(ApiError::bad_request(
            "Los campos nombre y nivel son requeridos",
        ));
    };
    if nombre.is_empty() {
        return Err(ApiError::bad_request(
            "Los campos nombre y nivel son requeridos",
        ));
    }

    let id = state
        .store
        .create_priority(nombre, nivel, &form.descripcion.unwrap_or_default())?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Prioridad creada exitosamente",
            "prioridad_id": id,
        })),
    ))
}

async fn get_priority(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let p = state
        .store
        .get_priority(id)?
        .or_not_found("Prioridad no encontrada")?;

    Ok(Json(json!({
        "prioridad_id": p.id,
        "nombre": p.name,
        "nivel": p.level,
        "descripcion": p.description,
    })))
}

async fn edit_priority(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<PriorityForm>,
) -> Result<Json<Value>, ApiError> {
    let nombre = form.nombre.filter(|s| !s.trim().is_empty());
    let updated = state.store.update_priority(
        id,
        nombre.as_deref(),
        form.nivel,
        form.descripcion.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::not_found("Prioridad no encontrada"));
    }

    Ok(Json(json!({ "mensaje": "Prioridad actualizada exitosamente" })))
}

async fn disable_priority(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.disable_priority(id)? {
        return Err(ApiError::not_found("Prioridad no encontrada"));
    }

    Ok(Json(json!({ "mensaje": "Prioridad deshabilitada exitosamente" })))
}

// Project statuses

fn project_status_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listar/", get(list_project_statuses))
        .route("/crear/", post(create_project_status))
        .route("/obtener/{id}/", get(get_project_status))
        .route("/editar/{id}/", post(edit_project_status))
        .route("/deshabilitar/{id}/", post(disable_project_status))
}

async fn list_project_statuses(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let estados: Vec<Value> = state
        .store
        .list_project_statuses()?
        .iter()
        .map(|s| {
            json!({
                "estado_id": s.id,
                "nombre": s.name,
                "orden": s.order,
                "descripcion": s.description,
            })
        })
        .collect();

    Ok(Json(json!({ "estados": estados })))
}

async fn create_project_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProjectStatusForm>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let nombre = form.nombre.unwrap_or_default();
    let (nombre, Some(orden)) = (nombre.trim(), form.orden) else {
        return Err(ApiError::bad_request(
            "Los campos nombre y orden son requeridos",
        ));
    };
    if nombre.is_empty() {
        return Err(ApiError::bad_request(
            "Los campos nombre y orden son requeridos",
        ));
    }

    let id = state
        .store
        .create_project_status(nombre, orden, &form.descripcion.unwrap_or_default())?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Estado de proyecto creado exitosamente",
            "estado_id": id,
        })),
    ))
}

async fn get_project_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let s = state
        .store
        .get_project_status(id)?
        .or_not_found("Estado de proyecto no encontrado")?;

    Ok(Json(json!({
        "estado_id": s.id,
        "nombre": s.name,
        "orden": s.order,
        "descripcion": s.description,
    })))
}

async fn edit_project_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<ProjectStatusForm>,
) -> Result<Json<Value>, ApiError> {
    let nombre = form.nombre.filter(|s| !s.trim().is_empty());
    let updated = state.store.update_project_status(
        id,
        nombre.as_deref(),
        form.orden,
        form.descripcion.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::not_found("Estado de proyecto no encontrado"));
    }

    Ok(Json(json!({
        "mensaje": "Estado de proyecto actualizado exitosamente",
    })))
}

async fn disable_project_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.disable_project_status(id)? {
        return Err(ApiError::not_found("Estado de proyecto no encontrado"));
    }

    Ok(Json(json!({
        "mensaje": "Estado de proyecto deshabilitado exitosamente",
    })))
}

// Element statuses

fn element_status_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/listar/", get(list_element_statuses))
        .route("/crear/", post(create_element_status))
        .route("/obtener/{id}/", get(get_element_status))
        .route("/editar/{id}/", post(edit_element_status))
        .route("/deshabilitar/{id}/", post(disable_element_status))
}

async fn list_element_statuses(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let estados: Vec<Value> = state
        .store
        .list_element_statuses()?
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "nombre": s.name,
                "tipo": s.kind.as_str(),
                "descripcion": s.description,
            })
        })
        .collect();

    Ok(Json(json!({ "estados_elemento": estados })))
}

async fn create_element_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<ElementStatusForm>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let nombre = form.nombre.unwrap_or_default();
    if nombre.trim().is_empty() {
        return Err(ApiError::bad_request("El campo nombre es requerido"));
    }
    let kind = form
        .tipo
        .as_deref()
        .and_then(ElementKind::parse)
        .ok_or_else(|| ApiError::bad_request("Tipo inválido"))?;

    let id = state.store.create_element_status(
        nombre.trim(),
        kind,
        &form.descripcion.unwrap_or_default(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Estado de elemento creado exitosamente",
            "id": id,
        })),
    ))
}

async fn get_element_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let s = state
        .store
        .get_element_status(id)?
        .or_not_found("Estado de elemento no encontrado")?;

    Ok(Json(json!({
        "id": s.id,
        "nombre": s.name,
        "tipo": s.kind.as_str(),
        "descripcion": s.description,
    })))
}

async fn edit_element_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<ElementStatusForm>,
) -> Result<Json<Value>, ApiError> {
    let kind = match form.tipo.as_deref() {
        None => None,
        Some(tag) => Some(
            ElementKind::parse(tag).ok_or_else(|| ApiError::bad_request("Tipo inválido"))?,
        ),
    };
    let nombre = form.nombre.filter(|s| !s.trim().is_empty());

    let updated = state.store.update_element_status(
        id,
        nombre.as_deref(),
        kind,
        form.descripcion.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::not_found("Estado de elemento no encontrado"));
    }

    Ok(Json(json!({
        "mensaje": "Estado de elemento actualizado exitosamente",
    })))
}

async fn disable_element_status(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.disable_element_status(id)? {
        return Err(ApiError::not_found("Estado de elemento no encontrado"));
    }

    Ok(Json(json!({
        "mensaje": "Estado de elemento deshabilitado exitosamente",
    })))
}
