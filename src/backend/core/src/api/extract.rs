//! Request extractors.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AppState;
use crate::auth::AuthError;
use crate::error::BoardError;
use crate::policy::Principal;

/// Resolves the caller from the `Authorization: Bearer <token>` header.
///
/// A missing header yields `Principal::Anonymous` so public endpoints
/// work without credentials; a present-but-invalid token is rejected
/// with 401 rather than silently downgraded.
pub struct CurrentUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = BoardError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => value,
            None => return Ok(CurrentUser(Principal::anonymous())),
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| BoardError::from(AuthError::InvalidToken))?;

        let claims = state.tokens.verify(token).map_err(BoardError::from)?;
        Ok(CurrentUser(claims.principal()))
    }
}
