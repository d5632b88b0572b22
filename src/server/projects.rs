use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::ProjectForm;
use crate::server::response::{ApiError, StoreOptionExt};
use crate::types::Project;

const DEFAULT_STATUS: &str = "Requisitos";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crear/", post(create_project))
        .route("/listar/", get(list_projects))
        .route("/obtener_proyecto/{id}/", get(get_project))
        .route("/editar/{id}/", post(edit_project))
        .route("/eliminar/{id}/", post(delete_project))
}

fn project_json(project: &Project) -> Value {
    json!({
        "proyecto_id": project.id,
        "nombre": project.name,
        "descripcion": project.description,
        "estado": project.status,
        "fecha_creacion": project.created_at.to_rfc3339(),
        "fecha_actualizacion": project.updated_at.to_rfc3339(),
    })
}

pub async fn create_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProjectForm>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let nombre = form.nombre.unwrap_or_default();
    if nombre.trim().is_empty() {
        return Err(ApiError::bad_request("El campo nombre es requerido"));
    }

    let descripcion = form.descripcion.unwrap_or_default();
    let estado = form
        .estado
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());

    let id = store.create_project(&nombre, &descripcion, &estado, &auth.user.id)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Proyecto creado exitosamente",
            "proyecto_id": id,
            "nombre": nombre,
            "estado": estado,
        })),
    ))
}

pub async fn list_projects(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let projects = state.store.list_projects(&auth.user.id)?;
    let proyectos: Vec<Value> = projects.iter().map(project_json).collect();

    Ok::<_, ApiError>(Json(json!({ "proyectos": proyectos })))
}

pub async fn get_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let project = state
        .store
        .get_project(id, &auth.user.id)?
        .or_not_found("Proyecto no encontrado")?;

    Ok::<_, ApiError>(Json(project_json(&project)))
}

pub async fn edit_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<ProjectForm>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut project = store
        .get_project(id, &auth.user.id)?
        .or_not_found("Proyecto no encontrado")?;

    // Empty strings leave nombre and estado alone; descripcion updates
    // whenever the field is present, clearing included
    if let Some(nombre) = form.nombre.filter(|s| !s.trim().is_empty()) {
        project.name = nombre;
    }
    if let Some(descripcion) = form.descripcion {
        project.description = Some(descripcion);
    }
    if let Some(estado) = form.estado.filter(|s| !s.trim().is_empty()) {
        project.status = estado;
    }

    store.update_project(&project)?;

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Proyecto actualizado exitosamente",
        "proyecto_id": project.id,
    })))
}

pub async fn delete_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state.store.soft_delete_project(id, &auth.user.id)?;
    if !deleted {
        return Err(ApiError::not_found("Proyecto no encontrado"));
    }

    Ok::<_, ApiError>(Json(json!({
        "mensaje": "Proyecto eliminado exitosamente",
    })))
}
