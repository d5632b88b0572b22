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
use crate::server::dto::{Field, JsonMap, field, parse_id, parse_number};
use crate::server::response::{ApiError, StoreOptionExt};
use crate::server::slug::slug_key;
use crate::types::{ElementKind, EstimationInput, NewUserStory, StoryEstimation, UserStory};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crear/", post(create_story))
        .route("/actualizar/{id}/", put(update_story).patch(update_story))
        .route("/eliminar/{id}/", delete(delete_story))
        .route("/listar/{proyecto_id}/", get(list_stories))
        .route("/obtener/{id}/", get(get_story))
}

fn body_object(body: &Value) -> Result<&JsonMap, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::bad_request("JSON inválido"))
}

fn estimation_json(est: &StoryEstimation) -> Value {
    json!({
        "id": est.id,
        "tipo_estimacion_id": est.type_id,
        "tipo_estimacion_nombre": est.type_name,
        "valor": est.value,
    })
}

fn story_json(story: &UserStory, estimaciones: &[StoryEstimation]) -> Value {
    // The flattened pair only carries a value when the story has exactly one
    // active estimation; with zero or several there is no single answer
    let (estimacion_valor, unidad_estimacion) = match estimaciones {
        [only] => (json!(only.value), json!(only.type_name)),
        _ => (Value::Null, Value::Null),
    };

    json!({
        "id": story.id,
        "titulo": story.title,
        "descripcion": story.description,
        "actor_rol": story.actor_role,
        "funcionalidad_accion": story.action,
        "beneficio_razon": story.benefit,
        "criterios_aceptacion": story.acceptance_criteria,
        "prioridad": story.priority_name.as_deref().map(slug_key),
        "estado": story.status_name.as_deref().map(slug_key),
        "valor_negocio": story.business_value,
        "dependencias_relaciones": story.dependencies,
        "componentes_relacionados": story.components,
        "notas_adicionales": story.notes,
        "proyecto_id": story.project_id,
        "fecha_creacion": story.created_at.to_rfc3339(),
        "estimaciones": estimaciones.iter().map(estimation_json).collect::<Vec<_>>(),
        "estimacion_valor": estimacion_valor,
        "unidad_estimacion": unidad_estimacion,
    })
}

/// Entries with unparseable ids or a non-positive value never reach the
/// store; unknown estimation types are skipped there.
fn parse_estimations(value: &Value) -> Vec<EstimationInput> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let type_id = parse_id(obj.get("tipo_estimacion_id")?)?;
            let value = parse_number(obj.get("valor")?)?;
            (value > 0.0).then_some(EstimationInput { type_id, value })
        })
        .collect()
}

fn parse_business_value(v: &Value) -> Result<i64, ApiError> {
    let parsed = match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    let n = parsed
        .ok_or_else(|| ApiError::bad_request("El valor de negocio debe ser un número entero"))?;
    if !(1..=100).contains(&n) {
        return Err(ApiError::bad_request(
            "El valor de negocio debe estar entre 1 y 100",
        ));
    }
    Ok(n)
}

fn optional_text(map: &JsonMap, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

pub async fn create_story(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let map = body_object(&body)?;

    let titulo = map
        .get("titulo")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let criterios = map
        .get("criterios_aceptacion")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let proyecto_id = map.get("proyecto_id").and_then(parse_id);

    let Some(proyecto_id) = proyecto_id else {
        return Err(ApiError::bad_request("Campos obligatorios faltantes"));
    };
    if titulo.is_empty() || criterios.is_empty() {
        return Err(ApiError::bad_request("Campos obligatorios faltantes"));
    }

    store
        .get_active_project(proyecto_id)?
        .ok_or_else(|| ApiError::bad_request("El proyecto especificado no existe"))?;

    let valor_negocio = match field(map, "valor_negocio") {
        Field::Absent | Field::Null => None,
        Field::Value(v) => Some(parse_business_value(v)?),
    };

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

    let estado_id = match field(map, "estado_id") {
        Field::Absent | Field::Null => store.default_element_status(ElementKind::UserStory)?,
        Field::Value(v) => {
            let sid = parse_id(v)
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            store
                .get_element_status_for_kind(sid, ElementKind::UserStory)?
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            Some(sid)
        }
    };

    let new_story = NewUserStory {
        title: titulo,
        description: optional_text(map, "descripcion"),
        actor_role: optional_text(map, "actor_rol"),
        action: optional_text(map, "funcionalidad_accion"),
        benefit: optional_text(map, "beneficio_razon"),
        acceptance_criteria: criterios,
        priority_id: prioridad_id,
        status_id: estado_id,
        business_value: valor_negocio,
        dependencies: optional_text(map, "dependencias_relaciones"),
        components: optional_text(map, "componentes_relacionados"),
        notes: optional_text(map, "notas_adicionales"),
        project_id: proyecto_id,
    };
    let estimations = map
        .get("estimaciones")
        .map(parse_estimations)
        .unwrap_or_default();

    let (id, created) = store.create_story(&new_story, &estimations)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Historia de usuario creada exitosamente",
            "historia_id": id,
            "estimaciones_creadas": created.iter().map(estimation_json).collect::<Vec<_>>(),
        })),
    ))
}

pub async fn update_story(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let map = body_object(&body)?;

    let mut story = store
        .get_story(id)?
        .or_not_found("Historia de usuario no encontrada")?;

    // A present key must carry a valid value: null, empty and too-short all
    // reject, only an absent key leaves the column alone
    match field(map, "titulo") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request(
                "El título debe tener al menos 5 caracteres",
            ));
        }
        Field::Value(v) => {
            let s = v.as_str().unwrap_or("").trim();
            if s.chars().count() < 5 {
                return Err(ApiError::bad_request(
                    "El título debe tener al menos 5 caracteres",
                ));
            }
            story.title = s.to_string();
        }
    }
    match field(map, "criterios_aceptacion") {
        Field::Absent => {}
        Field::Null => {
            return Err(ApiError::bad_request(
                "Los criterios de aceptación deben tener al menos 10 caracteres",
            ));
        }
        Field::Value(v) => {
            let s = v.as_str().unwrap_or("").trim();
            if s.chars().count() < 10 {
                return Err(ApiError::bad_request(
                    "Los criterios de aceptación deben tener al menos 10 caracteres",
                ));
            }
            story.acceptance_criteria = s.to_string();
        }
    }

    for (key, target) in [
        ("descripcion", &mut story.description as &mut Option<String>),
        ("actor_rol", &mut story.actor_role),
        ("funcionalidad_accion", &mut story.action),
        ("beneficio_razon", &mut story.benefit),
        ("dependencias_relaciones", &mut story.dependencies),
        ("componentes_relacionados", &mut story.components),
        ("notas_adicionales", &mut story.notes),
    ] {
        match field(map, key) {
            Field::Absent => {}
            Field::Null => *target = Some(String::new()),
            Field::Value(v) => *target = Some(v.as_str().unwrap_or("").to_string()),
        }
    }

    match field(map, "valor_negocio") {
        Field::Absent => {}
        Field::Null => story.business_value = None,
        Field::Value(v) => story.business_value = Some(parse_business_value(v)?),
    }

    match field(map, "prioridad_id") {
        Field::Absent => {}
        Field::Null => story.priority_id = None,
        Field::Value(v) => {
            let pid = parse_id(v)
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            store
                .get_priority(pid)?
                .ok_or_else(|| ApiError::bad_request("La prioridad especificada no existe"))?;
            story.priority_id = Some(pid);
        }
    }

    if let Field::Value(v) = field(map, "estado_id") {
        if let Some(sid) = parse_id(v) {
            store
                .get_element_status_for_kind(sid, ElementKind::UserStory)?
                .ok_or_else(|| ApiError::bad_request("El estado especificado no existe"))?;
            story.status_id = Some(sid);
        }
    }

    let estimations = map.get("estimaciones").map(parse_estimations);
    let applied = store.update_story(&story, estimations.as_deref())?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Historia de usuario actualizada exitosamente",
        "historia_id": story.id,
        "estimaciones_actualizadas": applied,
    })))
}

pub async fn delete_story(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_story(id)?
        .or_not_found("Historia de usuario no encontrada")?;
    store.soft_delete_story(id)?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Historia de usuario eliminada exitosamente",
    })))
}

pub async fn list_stories(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(proyecto_id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_active_project(proyecto_id)?
        .or_not_found("Proyecto no encontrado")?;

    let mut historias = Vec::new();
    for story in store.list_stories(proyecto_id)? {
        let estimaciones = store.list_story_estimations(story.id)?;
        historias.push(story_json(&story, &estimaciones));
    }

    Ok::<_, ApiError>(Json(json!({ "historias": historias })))
}

pub async fn get_story(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let story = store
        .get_story(id)?
        .or_not_found("Historia de usuario no encontrada")?;
    let estimaciones = store.list_story_estimations(id)?;

    Ok::<_, ApiError>(Json(json!({ "historia": story_json(&story, &estimaciones) })))
}
