// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use diesel_async::AsyncPgConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::{AppState, Paginated, PaginationParams};
use crate::auth::{AuthUser, OptionalAuthUser};
use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::comment::Comment;
use crate::models::like::{self, LikeToggle};
use crate::models::post::{NewPost, Post, PostDetail, UpdatePost, UserBrief};
use crate::models::user::User;
use crate::validation;

/// Attach like/comment aggregates to a batch of posts. `me_liked` is
/// always false for anonymous callers.
async fn post_details(
    conn: &mut AsyncPgConnection,
    rows: Vec<(Post, User)>,
    caller: Option<&User>,
) -> ApiResult<Vec<PostDetail>> {
    let ids: Vec<i32> = rows.iter().map(|(post, _)| post.id).collect();

    let like_counts = like::post_like_counts(conn, &ids).await?;
    let comment_counts = Comment::top_level_counts(conn, &ids).await?;
    let liked = match caller {
        Some(user) => like::posts_liked_by(conn, user.id, &ids).await?,
        None => HashSet::new(),
    };

    Ok(rows
        .into_iter()
        .map(|(post, author)| PostDetail {
            id: post.id,
            author: UserBrief::from(&author),
            image: post.image,
            caption: post.caption,
            created_at: post.created_at,
            post_likes_count: like_counts.get(&post.id).copied().unwrap_or(0),
            post_comments_count: comment_counts.get(&post.id).copied().unwrap_or(0),
            me_liked: liked.contains(&post.id),
        })
        .collect())
}

/// Paginated feed, newest first. Anonymous access allowed.
pub async fn list_posts(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Paginated<PostDetail>>> {
    let mut conn = state.db.get().await?;

    let rows = Post::list_page(&mut conn, params.limit(), params.offset()).await?;
    let count = Post::count_all(&mut conn).await?;
    let results = post_details(&mut conn, rows, caller.as_ref()).await?;

    Ok(Json(Paginated::new(count, params.limit(), results)))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub image: String,
    pub caption: String,
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostDetail>)> {
    let mut errors = Vec::new();
    if body.image.trim().is_empty() {
        errors.push(FieldError::new(
            "image",
            "This field is required.",
        ));
    }
    if let Some(error) = validation::validate_caption(&body.caption) {
        errors.push(error);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = state.db.get().await?;
    let post = Post::create(
        &mut conn,
        &NewPost {
            author_id: caller.id,
            image: body.image,
            caption: body.caption,
        },
    )
    .await?;

    let mut details = post_details(&mut conn, vec![(post, caller)], None).await?;
    let detail = details.pop().ok_or(ApiError::NotFound("Post"))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn retrieve_post(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<PostDetail>> {
    let mut conn = state.db.get().await?;

    let row = Post::find_with_author(&mut conn, id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    let mut details = post_details(&mut conn, vec![row], caller.as_ref()).await?;
    let detail = details.pop().ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub image: String,
    pub caption: String,
}

/// Only the author may edit a post.
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdatePostRequest>,
) -> ApiResult<Json<PostDetail>> {
    let mut conn = state.db.get().await?;

    let post = Post::find_by_id(&mut conn, id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    if post.author_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    let mut errors = Vec::new();
    if body.image.trim().is_empty() {
        errors.push(FieldError::new(
            "image",
            "This field is required.",
        ));
    }
    if let Some(error) = validation::validate_caption(&body.caption) {
        errors.push(error);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let post = Post::update(
        &mut conn,
        id,
        &UpdatePost {
            image: body.image,
            caption: body.caption,
        },
    )
    .await?;

    let mut details = post_details(&mut conn, vec![(post, caller)], None).await?;
    let detail = details.pop().ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(detail))
}

/// Only the author may delete a post; comments and likes cascade.
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let mut conn = state.db.get().await?;

    let post = Post::find_by_id(&mut conn, id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    if post.author_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    Post::delete(&mut conn, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Flip the caller's like on a post: 201 when added, 200 when removed.
pub async fn post_like_toggle(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(post_id): Path<i32>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let mut conn = state.db.get().await?;

    Post::find_by_id(&mut conn, post_id)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    match like::toggle_post_like(&mut conn, post_id, caller.id).await? {
        LikeToggle::Added => Ok((
            StatusCode::CREATED,
            Json(json!({ "detail": "Post liked." })),
        )),
        LikeToggle::Removed => Ok((StatusCode::OK, Json(json!({ "detail": "Post unliked." })))),
    }
}
