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
use crate::error::{ApiError, ApiResult};
use crate::models::comment::{self, Comment, CommentDetail, CommentNode, NewComment};
use crate::models::like::{self, LikeToggle};
use crate::models::post::{Post, UserBrief};
use crate::models::user::User;
use crate::validation;

/// Load every comment of the given posts with aggregates attached, ready
/// for the tree builder.
async fn comment_nodes(
    conn: &mut AsyncPgConnection,
    post_ids: &[i32],
    caller: Option<&User>,
) -> ApiResult<Vec<CommentNode>> {
    let all = Comment::load_for_posts(conn, post_ids).await?;
    let ids: Vec<i32> = all.iter().map(|(comment, _)| comment.id).collect();

    let like_counts = like::comment_like_counts(conn, &ids).await?;
    let liked = match caller {
        Some(user) => like::comments_liked_by(conn, user.id, &ids).await?,
        None => HashSet::new(),
    };

    Ok(all
        .into_iter()
        .map(|(comment, author)| CommentNode {
            likes_count: like_counts.get(&comment.id).copied().unwrap_or(0),
            me_liked: liked.contains(&comment.id),
            author: UserBrief::from(&author),
            comment,
        })
        .collect())
}

/// Serialize one comment with its full reply subtree.
async fn comment_detail(
    conn: &mut AsyncPgConnection,
    comment: &Comment,
    caller: Option<&User>,
) -> ApiResult<CommentDetail> {
    let nodes = comment_nodes(conn, &[comment.post_id], caller).await?;
    comment::assemble_tree(&nodes, comment.id).ok_or(ApiError::NotFound("Comment"))
}

/// Paginated list of comments, newest first, each carrying its reply
/// subtree. Anonymous access allowed.
pub async fn list_comments(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Paginated<CommentDetail>>> {
    let mut conn = state.db.get().await?;

    let page = Comment::list_page(&mut conn, params.limit(), params.offset()).await?;
    let count = Comment::count_all(&mut conn).await?;

    let mut post_ids: Vec<i32> = page.iter().map(|(comment, _)| comment.post_id).collect();
    post_ids.sort_unstable();
    post_ids.dedup();

    let nodes = comment_nodes(&mut conn, &post_ids, caller.as_ref()).await?;
    let results: Vec<CommentDetail> = page
        .iter()
        .filter_map(|(comment, _)| comment::assemble_tree(&nodes, comment.id))
        .collect();

    Ok(Json(Paginated::new(count, params.limit(), results)))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post: i32,
    pub content: String,
    pub parent: Option<i32>,
}

pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentDetail>)> {
    let mut conn = state.db.get().await?;

    Post::find_by_id(&mut conn, body.post)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    if let Some(error) = validation::validate_comment_content(&body.content) {
        return Err(ApiError::Validation(vec![error]));
    }

    // Replies must stay inside the same post's tree
    if let Some(parent_id) = body.parent {
        let parent = Comment::find_by_id(&mut conn, parent_id)
            .await?
            .ok_or(ApiError::NotFound("Comment"))?;
        if parent.post_id != body.post {
            return Err(ApiError::field(
                "parent",
                "Parent comment must belong to the same post.",
            ));
        }
    }

    let created = Comment::create(
        &mut conn,
        &NewComment {
            post_id: body.post,
            author_id: caller.id,
            content: body.content,
            parent_id: body.parent,
        },
    )
    .await?;

    let detail = comment_detail(&mut conn, &created, Some(&caller)).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn retrieve_comment(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<CommentDetail>> {
    let mut conn = state.db.get().await?;

    let comment = Comment::find_by_id(&mut conn, id)
        .await?
        .ok_or(ApiError::NotFound("Comment"))?;

    let detail = comment_detail(&mut conn, &comment, caller.as_ref()).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// Only the author may edit a comment.
pub async fn update_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<UpdateCommentRequest>,
) -> ApiResult<Json<CommentDetail>> {
    let mut conn = state.db.get().await?;

    let comment = Comment::find_by_id(&mut conn, id)
        .await?
        .ok_or(ApiError::NotFound("Comment"))?;
    if comment.author_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    if let Some(error) = validation::validate_comment_content(&body.content) {
        return Err(ApiError::Validation(vec![error]));
    }

    let comment = Comment::update_content(&mut conn, id, &body.content).await?;
    let detail = comment_detail(&mut conn, &comment, Some(&caller)).await?;
    Ok(Json(detail))
}

/// Only the author may delete a comment; replies and likes cascade.
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let mut conn = state.db.get().await?;

    let comment = Comment::find_by_id(&mut conn, id)
        .await?
        .ok_or(ApiError::NotFound("Comment"))?;
    if comment.author_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    Comment::delete(&mut conn, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Flip the caller's like on a comment: 201 when added, 200 when removed.
pub async fn comment_like_toggle(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(comment_id): Path<i32>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let mut conn = state.db.get().await?;

    Comment::find_by_id(&mut conn, comment_id)
        .await?
        .ok_or(ApiError::NotFound("Comment"))?;

    match like::toggle_comment_like(&mut conn, comment_id, caller.id).await? {
        LikeToggle::Added => Ok((
            StatusCode::CREATED,
            Json(json!({ "detail": "Comment liked." })),
        )),
        LikeToggle::Removed => Ok((
            StatusCode::OK,
            Json(json!({ "detail": "Comment unliked." })),
        )),
    }
}
