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
use crate::server::dto::{Field, JsonMap, actors_text, field, parse_id};
use crate::server::response::{ApiError, StoreOptionExt};
use crate::server::slug::status_key;
use crate::store::Store;
use crate::types::{ElementKind, NewUseCase, RelationEdge, RelationInput, UseCase};

const MAX_NAME_LEN: usize = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crear/", post(create_use_case))
        .route("/actualizar/{id}/", put(update_use_case).patch(update_use_case))
        .route("/eliminar/{id}/", delete(delete_use_case))
        .route("/listar/{proyecto_id}/", get(list_use_cases))
        .route("/obtener/{id}/", get(get_use_case))
        .route("/relaciones/{id}/", get(get_relations))
}

fn body_object(body: &Value) -> Result<&JsonMap, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("JSON inválido"))
}

/// Detail-form relation entry: the destination id under the camelCase key
/// the frontend uses, the relation type as a stringified id.
fn relation_json(edge: &RelationEdge) -> Value {
    json!({
        "id": edge.id,
        "casoUsoRelacionado": edge.target_id,
        "tipo": edge.type_id.to_string(),
        "descripcion": edge.description.clone().unwrap_or_default(),
    })
}

/// List-form relation entry: names instead of ids.
fn relation_listing_json(edge: &RelationEdge) -> Value {
    json!({
        "id": edge.id,
        "tipo": edge.type_name,
        "descripcion": edge.description.clone().unwrap_or_default(),
        "caso_destino": edge.target_name,
    })
}

fn parse_relations(value: &Value) -> Vec<RelationInput> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let target_id = parse_id(obj.get("casoUsoRelacionado")?)?;
            let type_id = parse_id(obj.get("tipo")?)?;
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

fn use_case_json(uc: &UseCase) -> Value {
    json!({
        "id": uc.id,
        "nombre": uc.name,
        "descripcion": uc.description,
        "actores": uc.actors,
        "precondiciones": uc.preconditions,
        "flujo_principal": uc.main_flow,
        "flujos_alternativos": uc.alternate_flows,
        "postcondiciones": uc.postconditions,
        "requisitos_especiales": uc.special_requirements,
        "riesgos_consideraciones": uc.risks,
        "proyecto_id": uc.project_id,
        "prioridad": uc.priority_name,
        "estado": uc.status_name.as_deref().map(status_key),
        "fecha_creacion": uc.created_at.to_rfc3339(),
        "fecha_actualizacion": uc.updated_at.to_rfc3339(),
    })
}

/// Resolves the submitted status against the use-case statuses, falling back
/// to the kind's seeded default when the value is missing, unparseable, or
/// unknown.
fn resolve_status_lenient(store: &dyn Store, map: &JsonMap) -> Result<Option<i64>, ApiError> {
    let Some(value) = map.get("estado_id").or_else(|| map.get("estado")) else {
        return Ok(store.default_element_status(ElementKind::UseCase)?);
    };
    let Some(sid) = parse_id(value) else {
        return Ok(store.default_element_status(ElementKind::UseCase)?);
    };
    match store.get_element_status_for_kind(sid, ElementKind::UseCase)? {
        Some(_) => Ok(Some(sid)),
        None => Ok(store.default_element_status(ElementKind::UseCase)?),
    }
}

fn array_or_empty(value: Option<&Value>) -> Value {
    value
        .filter(|v| v.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

pub async fn create_use_case(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let map = body_object(&body)?;

    let mut errores = Vec::new();

    let nombre = map
        .get("nombre")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    if nombre.is_empty() {
        errores.push("El nombre es obligatorio".to_string());
    } else if nombre.chars().count() > MAX_NAME_LEN {
        errores.push("El nombre no puede exceder 100 caracteres".to_string());
    }

    let proyecto_id = map.get("proyecto_id").and_then(parse_id);
    if proyecto_id.is_none() {
        errores.push("El proyecto_id es obligatorio".to_string());
    }

    let actores = map
        .get("actores")
        .and_then(actors_text)
        .unwrap_or_default();
    if actores.trim().is_empty() {
        errores.push("Los actores son obligatorios".to_string());
    }

    let precondiciones = map
        .get("precondiciones")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    if precondiciones.is_empty() {
        errores.push("Las precondiciones son obligatorias".to_string());
    }

    if !errores.is_empty() {
        return Err(ApiError::validation(errores));
    }
    let proyecto_id = proyecto_id.unwrap_or_default();

    store
        .get_active_project(proyecto_id)?
        .ok_or_else(|| ApiError::bad_request("El proyecto especificado no existe"))?;

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

    let estado_id = resolve_status_lenient(store, map)?;

    let new_uc = NewUseCase {
        name: nombre,
        description: map
            .get("descripcion")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        actors: actores,
        preconditions: precondiciones,
        main_flow: array_or_empty(map.get("flujo_principal")),
        alternate_flows: array_or_empty(map.get("flujos_alternativos")),
        postconditions: map
            .get("postcondiciones")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        special_requirements: map
            .get("requisitos_especiales")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        risks: map
            .get("riesgos_consideraciones")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        project_id: proyecto_id,
        priority_id: prioridad_id,
        status_id: estado_id,
    };
    let relations = map
        .get("relaciones")
        .map(parse_relations)
        .unwrap_or_default();

    let (id, created) = store.create_use_case(&new_uc, &relations)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Caso de uso creado exitosamente",
            "caso_uso_id": id,
            "relaciones_creadas": created,
        })),
    ))
}

pub async fn update_use_case(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let map = body_object(&body)?;

    let mut uc = store
        .get_use_case(id)?
        .or_not_found("Caso de uso no encontrado")?;

    match field(map, "nombre") {
        Field::Absent => {}
        Field::Null => return Err(ApiError::bad_request("El nombre no puede estar vacío")),
        Field::Value(v) => {
            let nombre = v.as_str().unwrap_or("").trim();
            if nombre.is_empty() {
                return Err(ApiError::bad_request("El nombre no puede estar vacío"));
            }
            if nombre.chars().count() > MAX_NAME_LEN {
                return Err(ApiError::bad_request(
                    "El nombre no puede exceder 100 caracteres",
                ));
            }
            uc.name = nombre.to_string();
        }
    }

    match field(map, "actores") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request("Los actores no pueden estar vacíos"));
        }
        Field::Value(v) => {
            let actores = actors_text(v).unwrap_or_default();
            if actores.trim().is_empty() {
                return Err(ApiError::bad_request("Los actores no pueden estar vacíos"));
            }
            uc.actors = actores;
        }
    }

    match field(map, "precondiciones") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request(
                "Las precondiciones no pueden estar vacías",
            ));
        }
        Field::Value(v) => {
            let precondiciones = v.as_str().unwrap_or("").trim();
            if precondiciones.is_empty() {
                return Err(ApiError::bad_request(
                    "Las precondiciones no pueden estar vacías",
                ));
            }
            uc.preconditions = precondiciones.to_string();
        }
    }

    match field(map, "descripcion") {
        Field::Absent => {}
        Field::Null => uc.description = Some(String::new()),
        Field::Value(v) => uc.description = Some(v.as_str().unwrap_or("").to_string()),
    }
    if map.contains_key("flujo_principal") {
        uc.main_flow = array_or_empty(map.get("flujo_principal"));
    }
    if map.contains_key("flujos_alternativos") {
        uc.alternate_flows = array_or_empty(map.get("flujos_alternativos"));
    }
    match field(map, "postcondiciones") {
        Field::Absent => {}
        Field::Null => uc.postconditions = Some(String::new()),
        Field::Value(v) => uc.postconditions = Some(v.as_str().unwrap_or("").to_string()),
    }
    match field(map, "requisitos_especiales") {
        Field::Absent => {}
        Field::Null => uc.special_requirements = Some(String::new()),
        Field::Value(v) => uc.special_requirements = Some(v.as_str().unwrap_or("").to_string()),
    }
    match field(map, "riesgos_consideraciones") {
        Field::Absent => {}
        Field::Null => uc.risks = Some(String::new()),
        Field::Value(v) => uc.risks = Some(v.as_str().unwrap_or("").to_string()),
    }

    match field(map, "prioridad_id") {
        Field::Absent => {}
        Field::Null => uc.priority_id = None,
        Field::Value(v) => {
            let pid = parse_id(v)
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            store
                .get_priority(pid)?
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            uc.priority_id = Some(pid);
        }
    }

    // An unparseable status is silently ignored; a parseable but unknown one
    // is rejected
    if let Some(v) = map.get("estado_id").or_else(|| map.get("estado")) {
        if let Some(sid) = parse_id(v) {
            store
                .get_element_status_for_kind(sid, ElementKind::UseCase)?
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            uc.status_id = Some(sid);
        }
    }

    let relations = map.get("relaciones").map(parse_relations);
    store.update_use_case(&uc, relations.as_deref())?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Caso de uso actualizado exitosamente",
        "caso_uso_id": uc.id,
    })))
}

pub async fn delete_use_case(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_use_case(id)?
        .or_not_found("Caso de uso no encontrado")?;
    store.soft_delete_use_case(id)?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Caso de uso eliminado exitosamente",
    })))
}

pub async fn list_use_cases(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(proyecto_id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_active_project(proyecto_id)?
        .or_not_found("Proyecto no encontrado")?;

    let mut data = Vec::new();
    for uc in store.list_use_cases(proyecto_id)? {
        let relaciones: Vec<Value> = store
            .list_use_case_relations(uc.id)?
            .iter()
            .map(relation_listing_json)
            .collect();
        let mut row = use_case_json(&uc);
        row["relaciones"] = Value::Array(relaciones);
        data.push(row);
    }

    Ok::<_, ApiError>(Json(json!({ "data": data })))
}

pub async fn get_use_case(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let uc = store
        .get_use_case(id)?
        .or_not_found("Caso de uso no encontrado")?;
    let relaciones: Vec<Value> = store
        .list_use_case_relations(id)?
        .iter()
        .map(relation_json)
        .collect();

    let mut data = use_case_json(&uc);
    data["relaciones"] = Value::Array(relaciones);

    Ok::<_, ApiError>(Json(data))
}

pub async fn get_relations(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_use_case(id)?
        .or_not_found("Caso de uso no encontrado")?;
    let relaciones: Vec<Value> = store
        .list_use_case_relations(id)?
        .iter()
        .map(relation_json)
        .collect();

    Ok::<_, ApiError>(Json(json!({ "relaciones": relaciones })))
}
