use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::TokenResponse;
use crate::server::response::ApiError;
use crate::types::Token;

pub fn token_to_response(token: Token) -> TokenResponse {
    TokenResponse {
        id: token.id,
        is_admin: token.is_admin,
        user_id: token.user_id,
        created_at: token.created_at,
        expires_at: token.expires_at,
        last_used_at: token.last_used_at,
    }
}

pub async fn delete_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state.store.delete_token(&id)?;
    if !deleted {
        return Err(ApiError::not_found("Token no encontrado"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
