use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, TokenResponse};
use crate::server::response::{ApiError, StoreOptionExt};
use crate::types::{Token, User};

use super::tokens::token_to_response;

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("El campo username es requerido"));
    }

    if state.store.get_user_by_username(username)?.is_some() {
        return Err(ApiError::conflict("Ya existe un usuario con ese nombre"));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        created_at: now,
        updated_at: now,
        active: true,
    };
    state.store.create_user(&user)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state.store.list_users()?;

    Ok::<_, ApiError>(Json(users))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)?
        .or_not_found("Usuario no encontrado")?;

    Ok::<_, ApiError>(Json(user))
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)?
        .or_not_found("Usuario no encontrado")?;

    let tokens: Vec<TokenResponse> = state
        .store
        .list_user_tokens(&user.id)?
        .into_iter()
        .map(token_to_response)
        .collect();

    Ok::<_, ApiError>(Json(tokens))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)?
        .or_not_found("Usuario no encontrado")?;

    if let Some(seconds) = req.expires_in_seconds {
        if seconds < 0 {
            return Err(ApiError::bad_request(
                "expires_in_seconds no puede ser negativo",
            ));
        }
    }

    let expires_at = req
        .expires_in_seconds
        .map(|s| Utc::now() + Duration::seconds(s));

    let generator = TokenGenerator::new();

    // The lookup prefix is short enough that collisions are possible; retry
    // with a fresh token instead of failing the request
    const MAX_RETRIES: u32 = 3;
    for _ in 0..MAX_RETRIES {
        let (raw_token, lookup, hash) = generator.generate()?;

        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            is_admin: false,
            user_id: Some(user.id.clone()),
            created_at: now,
            expires_at,
            last_used_at: None,
        };

        match state.store.create_token(&token) {
            Ok(()) => {
                return Ok((
                    StatusCode::CREATED,
                    Json(CreateTokenResponse {
                        token: raw_token,
                        metadata: token_to_response(token),
                    }),
                ));
            }
            Err(crate::error::Error::TokenLookupCollision) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::internal("No se pudo generar el token"))
}
