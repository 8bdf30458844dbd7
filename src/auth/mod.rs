// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

mod jwt;

pub use jwt::{Claims, JwtService, TokenPair, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::user::User;

/// The authenticated caller, loaded from the store on every request so that
/// status checks always see the current state. Handlers receive the caller
/// explicitly; there is no ambient per-request user.
#[derive(Debug)]
pub struct AuthUser(pub User);

/// Caller identity for endpoints that also serve anonymous requests. A
/// missing Authorization header resolves to `None`; a present but invalid
/// token is still rejected.
#[derive(Debug)]
pub struct OptionalAuthUser(pub Option<User>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtService: FromRef<S>,
    DbPool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        let jwt = JwtService::from_ref(state);
        let claims = jwt
            .verify_access(token)
            .map_err(|_| ApiError::Unauthorized)?;

        let pool = DbPool::from_ref(state);
        let mut conn = pool.get().await?;
        let user = User::find_by_id(&mut conn, claims.user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser(user))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    JwtService: FromRef<S>,
    DbPool: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(OptionalAuthUser(None));
        }
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        Ok(OptionalAuthUser(Some(user)))
    }
}
