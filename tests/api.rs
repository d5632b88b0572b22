mod common;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use common::TestServer;

async fn create_user_token(client: &Client, base_url: &str, admin_token: &str, username: &str) -> String {
    let user: Value = client
        .post(format!("{}/api/v1/admin/users", base_url))
        .bearer_auth(admin_token)
        .json(&json!({ "username": username }))
        .send()
        .await
        .expect("create user")
        .json()
        .await
        .expect("parse user response");
    let user_id = user["id"].as_str().expect("user id");

    let resp: Value = client
        .post(format!("{}/api/v1/admin/users/{}/tokens", base_url, user_id))
        .bearer_auth(admin_token)
        .json(&json!({}))
        .send()
        .await
        .expect("create token")
        .json()
        .await
        .expect("parse token response");
    resp["token"].as_str().expect("token").to_string()
}

async fn create_project(client: &Client, base_url: &str, token: &str, name: &str) -> i64 {
    let resp: Value = client
        .post(format!("{}/proyectos/crear/", base_url))
        .bearer_auth(token)
        .form(&[("nombre", name), ("descripcion", "Proyecto de prueba")])
        .send()
        .await
        .expect("create project")
        .json()
        .await
        .expect("parse project response");
    resp["proyecto_id"].as_i64().expect("project id")
}

async fn create_requirement(
    client: &Client,
    base_url: &str,
    token: &str,
    project_id: i64,
    name: &str,
    relations: Value,
) -> i64 {
    let resp = client
        .post(format!("{}/requisitos/crear/", base_url))
        .bearer_auth(token)
        .json(&json!({
            "nombre": name,
            "descripcion": "Descripción suficientemente larga",
            "criterios": "Criterios suficientemente largos",
            "tipo_id": 1,
            "proyecto_id": project_id,
            "relaciones_requisitos": relations,
        }))
        .send()
        .await
        .expect("create requirement");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse requirement response");
    body["requisito_id"].as_i64().expect("requirement id")
}

async fn create_use_case(
    client: &Client,
    base_url: &str,
    token: &str,
    project_id: i64,
    name: &str,
    relations: Value,
) -> i64 {
    let resp = client
        .post(format!("{}/casos_uso/crear/", base_url))
        .bearer_auth(token)
        .json(&json!({
            "nombre": name,
            "proyecto_id": project_id,
            "actores": ["Cliente"],
            "precondiciones": "Sesión iniciada",
            "relaciones": relations,
        }))
        .send()
        .await
        .expect("create use case");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse use case response");
    body["caso_uso_id"].as_i64().expect("use case id")
}

async fn create_story(
    client: &Client,
    base_url: &str,
    token: &str,
    project_id: i64,
    title: &str,
    estimations: Value,
) -> Value {
    let resp = client
        .post(format!("{}/historias_usuario/crear/", base_url))
        .bearer_auth(token)
        .json(&json!({
            "titulo": title,
            "criterios_aceptacion": "Criterios de aceptación suficientemente largos",
            "proyecto_id": project_id,
            "estimaciones": estimations,
        }))
        .send()
        .await
        .expect("create story");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("parse story response")
}

#[tokio::test]
async fn health_endpoint_responds() {
    let server = TestServer::start().await;
    let client = Client::new();

    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("health request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "OK");
}

#[tokio::test]
async fn rejects_missing_invalid_and_admin_tokens_on_user_routes() {
    let server = TestServer::start().await;
    let client = Client::new();

    let resp = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .send()
        .await
        .expect("unauthenticated request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("parse error body");
    assert_eq!(body["error"], "Token inválido o requerido");

    let resp = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth("reqbase_deadbeef_000000000000000000000000")
        .send()
        .await
        .expect("bad token request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Admin tokens carry no user and cannot touch project data
    let resp = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("admin token request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("parse error body");
    assert_eq!(body["error"], "Se requiere un token de usuario");
}

#[tokio::test]
async fn project_lifecycle() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;

    let resp = client
        .post(format!("{}/proyectos/crear/", server.base_url))
        .bearer_auth(&token)
        .form(&[("nombre", "Inventario")])
        .send()
        .await
        .expect("create project");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse create response");
    assert_eq!(body["mensaje"], "Proyecto creado exitosamente");
    assert_eq!(body["estado"], "Requisitos");
    let id = body["proyecto_id"].as_i64().expect("project id");

    let body: Value = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list projects")
        .json()
        .await
        .expect("parse list");
    let proyectos = body["proyectos"].as_array().expect("proyectos array");
    assert_eq!(proyectos.len(), 1);
    assert_eq!(proyectos[0]["nombre"], "Inventario");

    let resp = client
        .post(format!("{}/proyectos/editar/{}/", server.base_url, id))
        .bearer_auth(&token)
        .form(&[("nombre", "Inventario v2"), ("descripcion", "ampliado")])
        .send()
        .await
        .expect("edit project");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/proyectos/obtener_proyecto/{}/", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get project")
        .json()
        .await
        .expect("parse get");
    assert_eq!(body["nombre"], "Inventario v2");
    assert_eq!(body["descripcion"], "ampliado");

    let resp = client
        .post(format!("{}/proyectos/eliminar/{}/", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete project");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list after delete")
        .json()
        .await
        .expect("parse list");
    assert!(body["proyectos"].as_array().expect("array").is_empty());

    let resp = client
        .get(format!("{}/proyectos/obtener_proyecto/{}/", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get deleted project");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn projects_are_scoped_to_their_owner() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token_a = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let token_b = create_user_token(&client, &server.base_url, &server.admin_token, "beto").await;

    let project_id = create_project(&client, &server.base_url, &token_a, "Privado").await;

    let resp = client
        .get(format!(
            "{}/proyectos/obtener_proyecto/{}/",
            server.base_url, project_id
        ))
        .bearer_auth(&token_b)
        .send()
        .await
        .expect("get foreign project");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!("{}/proyectos/eliminar/{}/", server.base_url, project_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .expect("delete foreign project");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth(&token_b)
        .send()
        .await
        .expect("list as other user")
        .json()
        .await
        .expect("parse list");
    assert!(body["proyectos"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn requirement_relations_skip_invalid_targets() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let r1 = create_requirement(&client, &server.base_url, &token, project_id, "Requisito base", json!([])).await;

    // One valid edge, one pointing at a requirement that does not exist
    let r2 = create_requirement(
        &client,
        &server.base_url,
        &token,
        project_id,
        "Requisito dependiente",
        json!([
            { "requisito_id": r1, "tipo_relacion_id": 1, "descripcion": "depende" },
            { "requisito_id": 9999, "tipo_relacion_id": 1 },
        ]),
    )
    .await;

    let body: Value = client
        .get(format!("{}/requisitos/relaciones/{}/", server.base_url, r2))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list relations")
        .json()
        .await
        .expect("parse relations");
    let relaciones = body["relaciones"].as_array().expect("relaciones array");
    assert_eq!(relaciones.len(), 1);
    assert_eq!(relaciones[0]["requisito_id"].as_i64(), Some(r1));
    assert_eq!(relaciones[0]["tipo_relacion"], "1");

    // A self-relation in an update payload is silently dropped
    let resp = client
        .put(format!("{}/requisitos/actualizar/{}/", server.base_url, r2))
        .bearer_auth(&token)
        .json(&json!({
            "relaciones_requisitos": [
                { "requisito_id": r2, "tipo_relacion_id": 1 },
            ],
        }))
        .send()
        .await
        .expect("update relations");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/requisitos/relaciones/{}/", server.base_url, r2))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list relations after update")
        .json()
        .await
        .expect("parse relations");
    assert!(body["relaciones"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn deleting_a_requirement_removes_edges_in_both_directions() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let r1 = create_requirement(&client, &server.base_url, &token, project_id, "Requisito base", json!([])).await;
    let r2 = create_requirement(
        &client,
        &server.base_url,
        &token,
        project_id,
        "Requisito dependiente",
        json!([{ "requisito_id": r1, "tipo_relacion_id": 1 }]),
    )
    .await;

    let resp = client
        .delete(format!("{}/requisitos/eliminar/{}/", server.base_url, r1))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete requirement");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("parse delete response");
    assert_eq!(body["mensaje"], "Requisito eliminado exitosamente");

    let resp = client
        .get(format!("{}/requisitos/obtener/{}/", server.base_url, r1))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get deleted requirement");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .get(format!("{}/requisitos/listar/{}/", server.base_url, project_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list requirements")
        .json()
        .await
        .expect("parse list");
    let requisitos = body["requisitos"].as_array().expect("requisitos array");
    assert_eq!(requisitos.len(), 1);
    assert_eq!(requisitos[0]["id"].as_i64(), Some(r2));

    // The surviving requirement's edge to the deleted one is gone too
    let body: Value = client
        .get(format!("{}/requisitos/relaciones/{}/", server.base_url, r2))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list survivor relations")
        .json()
        .await
        .expect("parse relations");
    assert!(body["relaciones"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn requirement_validation_messages() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let resp = client
        .post(format!("{}/requisitos/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&json!({ "nombre": "Solo nombre" }))
        .send()
        .await
        .expect("create without fields");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "Campos obligatorios faltantes");

    let resp = client
        .post(format!("{}/requisitos/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "nombre": "Requisito",
            "descripcion": "Descripción suficientemente larga",
            "criterios": "Criterios suficientemente largos",
            "tipo_id": 999,
            "proyecto_id": project_id,
        }))
        .send()
        .await
        .expect("create with bad type");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El tipo de requisito especificado no existe");

    let id = create_requirement(&client, &server.base_url, &token, project_id, "Requisito válido", json!([])).await;

    let resp = client
        .patch(format!("{}/requisitos/actualizar/{}/", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "nombre": "abc" }))
        .send()
        .await
        .expect("update with short name");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El nombre debe tener al menos 5 caracteres");

    // Present-but-empty and explicit null reject instead of being skipped
    let resp = client
        .put(format!("{}/requisitos/actualizar/{}/", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "nombre": "" }))
        .send()
        .await
        .expect("update with empty name");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El nombre debe tener al menos 5 caracteres");

    let resp = client
        .put(format!("{}/requisitos/actualizar/{}/", server.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "criterios": null }))
        .send()
        .await
        .expect("update with null criteria");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(
        body["error"],
        "Los criterios deben tener al menos 10 caracteres"
    );

    let body: Value = client
        .get(format!("{}/requisitos/obtener/{}/", server.base_url, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get requirement")
        .json()
        .await
        .expect("parse requirement");
    assert_eq!(body["requisito"]["nombre"], "Requisito válido");
}

#[tokio::test]
async fn use_case_create_collects_validation_details() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;

    let resp = client
        .post(format!("{}/casos_uso/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .expect("create empty use case");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "Errores de validación");
    let detalles: Vec<&str> = body["detalles"]
        .as_array()
        .expect("detalles array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(detalles.contains(&"El nombre es obligatorio"));
    assert!(detalles.contains(&"El proyecto_id es obligatorio"));
    assert!(detalles.contains(&"Los actores son obligatorios"));
    assert!(detalles.contains(&"Las precondiciones son obligatorias"));
}

#[tokio::test]
async fn use_case_listing_hides_relations_to_deleted_destinations() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let destino = create_use_case(&client, &server.base_url, &token, project_id, "Validar sesión", json!([])).await;
    let origen = create_use_case(
        &client,
        &server.base_url,
        &token,
        project_id,
        "Realizar compra",
        json!([{ "casoUsoRelacionado": destino, "tipo": 1, "descripcion": "incluye" }]),
    )
    .await;

    let body: Value = client
        .get(format!("{}/casos_uso/listar/{}/", server.base_url, project_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list use cases")
        .json()
        .await
        .expect("parse list");
    let data = body["data"].as_array().expect("data array");
    let row = data
        .iter()
        .find(|c| c["id"].as_i64() == Some(origen))
        .expect("origin row");
    let relaciones = row["relaciones"].as_array().expect("relaciones array");
    assert_eq!(relaciones.len(), 1);
    assert_eq!(relaciones[0]["tipo"], "Incluye");
    assert_eq!(relaciones[0]["caso_destino"], "Validar sesión");

    let resp = client
        .delete(format!("{}/casos_uso/eliminar/{}/", server.base_url, destino))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete destination");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/casos_uso/listar/{}/", server.base_url, project_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list after delete")
        .json()
        .await
        .expect("parse list");
    let data = body["data"].as_array().expect("data array");
    assert_eq!(data.len(), 1);
    assert!(data[0]["relaciones"].as_array().expect("array").is_empty());
}

#[tokio::test]
async fn story_estimations_flatten_only_with_a_single_active_row() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    // The create path accepts duplicate estimation types as-is
    let created = create_story(
        &client,
        &server.base_url,
        &token,
        project_id,
        "Como cliente quiero pagar",
        json!([
            { "tipo_estimacion_id": 1, "valor": 5 },
            { "tipo_estimacion_id": 1, "valor": 8 },
        ]),
    )
    .await;
    let historia_id = created["historia_id"].as_i64().expect("story id");
    assert_eq!(
        created["estimaciones_creadas"].as_array().expect("array").len(),
        2
    );

    let body: Value = client
        .get(format!(
            "{}/historias_usuario/obtener/{}/",
            server.base_url, historia_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get story")
        .json()
        .await
        .expect("parse story");
    assert_eq!(body["historia"]["estimaciones"].as_array().expect("array").len(), 2);
    assert!(body["historia"]["estimacion_valor"].is_null());
    assert!(body["historia"]["unidad_estimacion"].is_null());

    // The update path collapses duplicates to one active row per type
    let resp = client
        .put(format!(
            "{}/historias_usuario/actualizar/{}/",
            server.base_url, historia_id
        ))
        .bearer_auth(&token)
        .json(&json!({
            "estimaciones": [{ "tipo_estimacion_id": 2, "valor": 16 }],
        }))
        .send()
        .await
        .expect("update story");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("parse update response");
    assert_eq!(body["estimaciones_actualizadas"].as_i64(), Some(1));

    let body: Value = client
        .get(format!(
            "{}/historias_usuario/obtener/{}/",
            server.base_url, historia_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get updated story")
        .json()
        .await
        .expect("parse story");
    assert_eq!(body["historia"]["estimacion_valor"].as_f64(), Some(16.0));
    assert_eq!(body["historia"]["unidad_estimacion"], "Horas");

    // An explicit empty list deactivates everything
    let resp = client
        .put(format!(
            "{}/historias_usuario/actualizar/{}/",
            server.base_url, historia_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "estimaciones": [] }))
        .send()
        .await
        .expect("clear estimations");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!(
            "{}/historias_usuario/obtener/{}/",
            server.base_url, historia_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get cleared story")
        .json()
        .await
        .expect("parse story");
    assert!(body["historia"]["estimaciones"].as_array().expect("array").is_empty());
    assert!(body["historia"]["estimacion_valor"].is_null());
}

#[tokio::test]
async fn story_business_value_bounds() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let resp = client
        .post(format!("{}/historias_usuario/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "titulo": "Como cliente quiero pagar",
            "criterios_aceptacion": "Criterios de aceptación suficientemente largos",
            "proyecto_id": project_id,
            "valor_negocio": 250,
        }))
        .send()
        .await
        .expect("create with out-of-range value");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El valor de negocio debe estar entre 1 y 100");

    let resp = client
        .post(format!("{}/historias_usuario/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "titulo": "Como cliente quiero pagar",
            "criterios_aceptacion": "Criterios de aceptación suficientemente largos",
            "proyecto_id": project_id,
            "valor_negocio": "alto",
        }))
        .send()
        .await
        .expect("create with non-numeric value");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El valor de negocio debe ser un número entero");
}

#[tokio::test]
async fn story_update_rejects_blank_required_fields() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let created = create_story(
        &client,
        &server.base_url,
        &token,
        project_id,
        "Como cliente quiero pagar",
        json!([]),
    )
    .await;
    let id = created["historia_id"].as_i64().expect("story id");

    let resp = client
        .put(format!(
            "{}/historias_usuario/actualizar/{}/",
            server.base_url, id
        ))
        .bearer_auth(&token)
        .json(&json!({ "titulo": "" }))
        .send()
        .await
        .expect("update with empty title");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El título debe tener al menos 5 caracteres");

    let resp = client
        .put(format!(
            "{}/historias_usuario/actualizar/{}/",
            server.base_url, id
        ))
        .bearer_auth(&token)
        .json(&json!({ "criterios_aceptacion": null }))
        .send()
        .await
        .expect("update with null criteria");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(
        body["error"],
        "Los criterios de aceptación deben tener al menos 10 caracteres"
    );

    let body: Value = client
        .get(format!(
            "{}/historias_usuario/obtener/{}/",
            server.base_url, id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get story")
        .json()
        .await
        .expect("parse story");
    assert_eq!(body["historia"]["titulo"], "Como cliente quiero pagar");
}

#[tokio::test]
async fn story_default_status_matches_its_kind() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;
    let project_id = create_project(&client, &server.base_url, &token, "Ventas").await;

    let body: Value = client
        .get(format!(
            "{}/catalogos/estados_elemento/listar/",
            server.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list element statuses")
        .json()
        .await
        .expect("parse statuses");
    let statuses = body["estados_elemento"].as_array().expect("status rows");
    let pendiente_id = |kind: &str| -> i64 {
        statuses
            .iter()
            .find(|s| s["tipo"] == kind && s["nombre"] == "Pendiente")
            .and_then(|s| s["id"].as_i64())
            .expect("seeded Pendiente row")
    };
    let story_pendiente = pendiente_id("historia_usuario");
    let requirement_pendiente = pendiente_id("requisito");
    assert_ne!(story_pendiente, requirement_pendiente);

    let payload = json!({
        "titulo": "Como cliente quiero pagar",
        "criterios_aceptacion": "Criterios de aceptación suficientemente largos",
        "proyecto_id": project_id,
    });

    // Omitting estado_id falls back to the story kind's own Pendiente row
    let resp = client
        .post(format!("{}/historias_usuario/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .expect("create without status");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Naming that same row explicitly is equally valid
    let mut explicit = payload.clone();
    explicit["estado_id"] = json!(story_pendiente);
    let resp = client
        .post(format!("{}/historias_usuario/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&explicit)
        .send()
        .await
        .expect("create with own-kind status");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // A status belonging to another kind is rejected
    let mut cross_kind = payload.clone();
    cross_kind["estado_id"] = json!(requirement_pendiente);
    let resp = client
        .post(format!("{}/historias_usuario/crear/", server.base_url))
        .bearer_auth(&token)
        .json(&cross_kind)
        .send()
        .await
        .expect("create with cross-kind status");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("parse error");
    assert_eq!(body["error"], "El estado especificado no existe");
}

#[tokio::test]
async fn catalog_disable_is_terminal() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;

    let resp = client
        .post(format!("{}/catalogos/tipos_estimacion/crear/", server.base_url))
        .bearer_auth(&token)
        .form(&[("nombre", "Días"), ("descripcion", "Días ideales")])
        .send()
        .await
        .expect("create estimation type");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse create response");
    let id = body["id"].as_i64().expect("catalog id");

    // Names are unique per table
    let resp = client
        .post(format!("{}/catalogos/tipos_estimacion/crear/", server.base_url))
        .bearer_auth(&token)
        .form(&[("nombre", "Días")])
        .send()
        .await
        .expect("create duplicate");
    assert!(resp.status().is_server_error() || resp.status().is_client_error());

    let resp = client
        .post(format!(
            "{}/catalogos/tipos_estimacion/deshabilitar/{}/",
            server.base_url, id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("disable");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!(
            "{}/catalogos/tipos_estimacion/deshabilitar/{}/",
            server.base_url, id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("disable again");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post(format!(
            "{}/catalogos/tipos_estimacion/editar/{}/",
            server.base_url, id
        ))
        .bearer_auth(&token)
        .form(&[("nombre", "Días hábiles")])
        .send()
        .await
        .expect("edit disabled");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .get(format!("{}/catalogos/tipos_estimacion/listar/", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list after disable")
        .json()
        .await
        .expect("parse list");
    let items = body["tipos_estimacion"].as_array().expect("items array");
    assert!(items.iter().all(|i| i["id"].as_i64() != Some(id)));
}

#[tokio::test]
async fn requirement_type_catalog_answers_at_the_mount_root() {
    let server = TestServer::start().await;
    let client = Client::new();
    let token = create_user_token(&client, &server.base_url, &server.admin_token, "ana").await;

    let body: Value = client
        .get(format!("{}/catalogos/listar/", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("list requirement types")
        .json()
        .await
        .expect("parse list");
    let items = body["tipos_requisito"].as_array().expect("items array");
    assert!(items.iter().any(|i| i["nombre"] == "Funcional"));
    // This table keys its id as tipo_id
    assert!(items.iter().all(|i| i.get("tipo_id").is_some()));
}

#[tokio::test]
async fn admin_token_management() {
    let server = TestServer::start().await;
    let client = Client::new();

    let user: Value = client
        .post(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({ "username": "ana" }))
        .send()
        .await
        .expect("create user")
        .json()
        .await
        .expect("parse user");
    let user_id = user["id"].as_str().expect("user id").to_string();

    let resp = client
        .post(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({ "username": "ana" }))
        .send()
        .await
        .expect("create duplicate user");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .post(format!("{}/api/v1/admin/users/{}/tokens", server.base_url, user_id))
        .bearer_auth(&server.admin_token)
        .json(&json!({ "expires_in_seconds": -5 }))
        .send()
        .await
        .expect("create token with negative expiry");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/api/v1/admin/users/{}/tokens", server.base_url, user_id))
        .bearer_auth(&server.admin_token)
        .json(&json!({}))
        .send()
        .await
        .expect("create token");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("parse token response");
    let raw_token = body["token"].as_str().expect("token").to_string();
    let token_id = body["metadata"]["id"].as_str().expect("token id").to_string();
    assert!(raw_token.starts_with("reqbase_"));

    let resp = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth(&raw_token)
        .send()
        .await
        .expect("use token");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .delete(format!("{}/api/v1/admin/tokens/{}", server.base_url, token_id))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("revoke token");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{}/proyectos/listar/", server.base_url))
        .bearer_auth(&raw_token)
        .send()
        .await
        .expect("use revoked token");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .delete(format!("{}/api/v1/admin/tokens/{}", server.base_url, token_id))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("revoke again");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The admin surface itself rejects user tokens
    let another = create_user_token(&client, &server.base_url, &server.admin_token, "beto").await;
    let resp = client
        .get(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&another)
        .send()
        .await
        .expect("admin list with user token");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
