use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{Field, JsonMap, field, parse_id};
use crate::server::response::{ApiError, StoreOptionExt};
use crate::server::slug::slug_key;
use crate::types::{CatalogKind, ElementKind, NewRequirement, RelationEdge, RelationInput, Requirement};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crear/", post(create_requirement))
        .route("/actualizar/{id}/", put(update_requirement).patch(update_requirement))
        .route("/eliminar/{id}/", delete(delete_requirement))
        .route("/listar/{proyecto_id}/", get(list_requirements))
        .route("/obtener/{id}/", get(get_requirement))
        .route("/relaciones/{id}/", get(get_relations))
        .route("/catalogos/", get(get_catalogs))
}

fn requirement_json(req: &Requirement) -> Value {
    json!({
        "id": req.id,
        "nombre": req.name,
        "descripcion": req.description,
        "tipo": req.type_name.as_deref().map(slug_key),
        "criterios": req.criteria,
        "prioridad": req.priority_name.as_deref().map(slug_key),
        "estado": req.status_name.as_deref().map(slug_key),
        "origen": req.origin,
        "condiciones_previas": req.preconditions,
        "proyecto_id": req.project_id,
        "fecha_creacion": req.created_at.to_rfc3339(),
    })
}

fn relation_json(edge: &RelationEdge) -> Value {
    json!({
        "id": edge.id,
        "requisito_id": edge.target_id,
        "tipo_relacion": edge.type_id.to_string(),
        "descripcion": edge.description.clone().unwrap_or_default(),
    })
}

/// Pulls the candidate edges out of a `relaciones_requisitos` payload entry
/// list. Entries that are not objects or have unparseable ids are dropped
/// here; existence checks happen in the store.
fn parse_relations(value: &Value) -> Vec<RelationInput> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let target_id = parse_id(obj.get("requisito_id")?)?;
            let type_id = parse_id(obj.get("tipo_relacion_id")?)?;
            let description = obj
                .get("descripcion")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            Some(RelationInput {
                target_id,
                type_id,
                description,
            })
        })
        .collect()
}

fn body_object(body: &Value) -> Result<&JsonMap, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("JSON inválido"))
}

fn required_text(map: &JsonMap, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

pub async fn create_requirement(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let map = body_object(&body)?;

    let nombre = required_text(map, "nombre");
    let descripcion = required_text(map, "descripcion");
    let criterios = required_text(map, "criterios");
    let tipo_id = map.get("tipo_id").and_then(parse_id);
    let proyecto_id = map.get("proyecto_id").and_then(parse_id);

    let (Some(tipo_id), Some(proyecto_id)) = (tipo_id, proyecto_id) else {
        return Err(ApiError::bad_request("Campos obligatorios faltantes"));
    };
    if nombre.is_empty() || descripcion.is_empty() || criterios.is_empty() {
        return Err(ApiError::bad_request("Campos obligatorios faltantes"));
    }

    store
        .get_active_project(proyecto_id)?
        .ok_or_else(|| ApiError::bad_request("El proyecto especificado no existe"))?;
    store
        .get_catalog_item(CatalogKind::RequirementType, tipo_id)?
        .ok_or_else(|| ApiError::bad_request("El tipo de requisito especificado no existe"))?;

    let prioridad_id = match field(map, "prioridad_id") {
        Field::Absent | Field::Null => None,
        Field::Value(v) => {
            let pid = parse_id(v)
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            store
                .get_priority(pid)?
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            Some(pid)
        }
    };

    // Missing key falls back to the kind's seeded default; a key that is
    // present but unresolvable is a hard failure
    let estado_id = match field(map, "estado_id") {
        Field::Absent => store.default_element_status(ElementKind::Requirement)?,
        Field::Null => return Err(ApiError::bad_request("El estado especificado no existe")),
        Field::Value(v) => {
            let sid = parse_id(v)
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            store
                .get_element_status_for_kind(sid, ElementKind::Requirement)?
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            Some(sid)
        }
    };

    let new_req = NewRequirement {
        name: nombre,
        description: descripcion,
        type_id: tipo_id,
        criteria: criterios,
        priority_id: prioridad_id,
        status_id: estado_id,
        origin: required_text(map, "origen"),
        preconditions: required_text(map, "condiciones_previas"),
        project_id: proyecto_id,
    };
    let relations = map
        .get("relaciones_requisitos")
        .map(parse_relations)
        .unwrap_or_default();

    let (id, _created) = store.create_requirement(&new_req, &relations)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Requisito creado exitosamente",
            "requisito_id": id,
        })),
    ))
}

pub async fn update_requirement(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let map = body_object(&body)?;

    let mut req = store
        .get_requirement(id)?
        .or_not_found("Requisito no encontrado")?;

    // A present key must carry a valid value: null, empty and too-short all
    // reject, only an absent key leaves the column alone
    match field(map, "nombre") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request(
                "El nombre debe tener al menos 5 caracteres",
            ));
        }
        Field::Value(v) => {
            let s = v.as_str().unwrap_or("").trim();
            if s.chars().count() < 5 {
                return Err(ApiError::bad_request(
                    "El nombre debe tener al menos 5 caracteres",
                ));
            }
            req.name = s.to_string();
        }
    }
    match field(map, "descripcion") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request(
                "La descripción debe tener al menos 10 caracteres",
            ));
        }
        Field::Value(v) => {
            let s = v.as_str().unwrap_or("").trim();
            if s.chars().count() < 10 {
                return Err(ApiError::bad_request(
                    "La descripción debe tener al menos 10 caracteres",
                ));
            }
            req.description = s.to_string();
        }
    }
    match field(map, "criterios") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request(
                "Los criterios deben tener al menos 10 caracteres",
            ));
        }
        Field::Value(v) => {
            let s = v.as_str().unwrap_or("").trim();
            if s.chars().count() < 10 {
                return Err(ApiError::bad_request(
                    "Los criterios deben tener al menos 10 caracteres",
                ));
            }
            req.criteria = s.to_string();
        }
    }

    if let Field::Value(v) = field(map, "tipo_id") {
        if let Some(tid) = parse_id(v) {
            store
                .get_catalog_item(CatalogKind::RequirementType, tid)?
                .ok_or_else(|| {
                    ApiError::bad_request("El tipo de requisito especificado no existe")
                })?;
            req.type_id = tid;
        }
    }

    match field(map, "prioridad_id") {
        Field::Absent => {}
        Field::Null => req.priority_id = None,
        Field::Value(v) => {
            let pid = parse_id(v)
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            store
                .get_priority(pid)?
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            req.priority_id = Some(pid);
        }
    }

    if let Field::Value(v) = field(map, "estado_id") {
        if let Some(sid) = parse_id(v) {
            store
                .get_element_status_for_kind(sid, ElementKind::Requirement)?
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            req.status_id = Some(sid);
        }
    }

    match field(map, "origen") {
        Field::Absent => {}
        Field::Null => req.origin = Some(String::new()),
        Field::Value(v) => req.origin = Some(v.as_str().unwrap_or("").to_string()),
    }
    match field(map, "condiciones_previas") {
        Field::Absent => {}
        Field::Null => req.preconditions = Some(String::new()),
        Field::Value(v) => req.preconditions = Some(v.as_str().unwrap_or("").to_string()),
    }

    let relations = map.get("relaciones_requisitos").map(parse_relations);
    store.update_requirement(&req, relations.as_deref())?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Requisito actualizado exitosamente",
        "requisito_id": req.id,
    })))
}

pub async fn delete_requirement(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_requirement(id)?
        .or_not_found("Requisito no encontrado")?;
    store.soft_delete_requirement(id)?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Requisito eliminado exitosamente",
    })))
}

pub async fn list_requirements(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(proyecto_id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_active_project(proyecto_id)?
        .or_not_found("Proyecto no encontrado")?;

    let requisitos: Vec<Value> = store
        .list_requirements(proyecto_id)?
        .iter()
        .map(requirement_json)
        .collect();

    Ok::<_, ApiError>(Json(json!({ "requisitos": requisitos })))
}

pub async fn get_requirement(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let req = store
        .get_requirement(id)?
        .or_not_found("Requisito no encontrado")?;
    let relaciones: Vec<Value> = store
        .list_requirement_relations(id)?
        .iter()
        .map(relation_json)
        .collect();

    let mut data = requirement_json(&req);
    data["relaciones_requisitos"] = Value::Array(relaciones);

    Ok::<_, ApiError>(Json(json!({ "requisito": data })))
}

pub async fn get_relations(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_requirement(id)?
        .or_not_found("Requisito no encontrado")?;
    let relaciones: Vec<Value> = store
        .list_requirement_relations(id)?
        .iter()
        .map(relation_json)
        .collect();

    Ok::<_, ApiError>(Json(json!({ "relaciones": relaciones })))
}

pub async fn get_catalogs(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let tipos: Vec<Value> = store
        .list_catalog_items(CatalogKind::RequirementType)?
        .iter()
        .map(|t| json!({ "id": t.id, "nombre": t.name, "key": slug_key(&t.name) }))
        .collect();

    let mut prioridades = store.list_priorities()?;
    prioridades.sort_by_key(|p| p.id);
    let prioridades: Vec<Value> = prioridades
        .iter()
        .map(|p| json!({ "id": p.id, "nombre": p.name, "key": slug_key(&p.name) }))
        .collect();

    let mut estados: Vec<_> = store
        .list_element_statuses()?
        .into_iter()
        .filter(|e| e.kind == ElementKind::Requirement)
        .collect();
    estados.sort_by_key(|e| e.id);
    let estados: Vec<Value> = estados
        .iter()
        .map(|e| json!({ "id": e.id, "nombre": e.name, "key": slug_key(&e.name) }))
        .collect();

    let tipos_relacion: Vec<Value> = store
        .list_catalog_items(CatalogKind::RequirementRelationType)?
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "nombre": t.name,
                "key": slug_key(&t.name),
                "descripcion": t.description,
            })
        })
        .collect();

    Ok::<_, ApiError>(Json(json!({
        "tipos_requisito": tipos,
        "prioridades": prioridades,
        "estados": estados,
        "tipos_relacion": tipos_relacion,
    })))
}
