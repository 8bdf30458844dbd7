// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::schema::{comment_likes, post_likes};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::post_likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostLike {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::post_likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPostLike {
    pub post_id: i32,
    pub author_id: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::comment_likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentLike {
    pub id: i32,
    pub comment_id: i32,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::comment_likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCommentLike {
    pub comment_id: i32,
    pub author_id: i32,
}

/// Outcome of a toggle: the like row was created, or an existing one was
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Added,
    Removed,
}

/// Toggle a like on a post. Insert-first with `ON CONFLICT DO NOTHING`:
/// when the insert reports zero rows the pair already existed and is
/// deleted instead. The unique index on (post_id, author_id) is the
/// authoritative guard under concurrent requests.
pub async fn toggle_post_like(
    conn: &mut AsyncPgConnection,
    post_id: i32,
    author_id: i32,
) -> Result<LikeToggle, diesel::result::Error> {
    let inserted = diesel::insert_into(post_likes::table)
        .values(&NewPostLike { post_id, author_id })
        .on_conflict((post_likes::post_id, post_likes::author_id))
        .do_nothing()
        .execute(conn)
        .await?;

    if inserted == 0 {
        diesel::delete(
            post_likes::table
                .filter(post_likes::post_id.eq(post_id))
                .filter(post_likes::author_id.eq(author_id)),
        )
        .execute(conn)
        .await?;
        return Ok(LikeToggle::Removed);
    }

    Ok(LikeToggle::Added)
}

/// Toggle a like on a comment; same contract as [`toggle_post_like`].
pub async fn toggle_comment_like(
    conn: &mut AsyncPgConnection,
    comment_id: i32,
    author_id: i32,
) -> Result<LikeToggle, diesel::result::Error> {
    let inserted = diesel::insert_into(comment_likes::table)
        .values(&NewCommentLike {
            comment_id,
            author_id,
        })
        .on_conflict((comment_likes::comment_id, comment_likes::author_id))
        .do_nothing()
        .execute(conn)
        .await?;

    if inserted == 0 {
        diesel::delete(
            comment_likes::table
                .filter(comment_likes::comment_id.eq(comment_id))
                .filter(comment_likes::author_id.eq(author_id)),
        )
        .execute(conn)
        .await?;
        return Ok(LikeToggle::Removed);
    }

    Ok(LikeToggle::Added)
}

/// Like counts for a batch of posts, keyed by post id. Posts with no likes
/// are absent from the map.
pub async fn post_like_counts(
    conn: &mut AsyncPgConnection,
    post_ids: &[i32],
) -> Result<HashMap<i32, i64>, diesel::result::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = post_likes::table
        .filter(post_likes::post_id.eq_any(post_ids))
        .group_by(post_likes::post_id)
        .select((post_likes::post_id, diesel::dsl::count_star()))
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// The subset of `post_ids` the caller has liked.
pub async fn posts_liked_by(
    conn: &mut AsyncPgConnection,
    author_id: i32,
    post_ids: &[i32],
) -> Result<HashSet<i32>, diesel::result::Error> {
    if post_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows: Vec<i32> = post_likes::table
        .filter(post_likes::author_id.eq(author_id))
        .filter(post_likes::post_id.eq_any(post_ids))
        .select(post_likes::post_id)
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Like counts for a batch of comments, keyed by comment id.
pub async fn comment_like_counts(
    conn: &mut AsyncPgConnection,
    comment_ids: &[i32],
) -> Result<HashMap<i32, i64>, diesel::result::Error> {
    if comment_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = comment_likes::table
        .filter(comment_likes::comment_id.eq_any(comment_ids))
        .group_by(comment_likes::comment_id)
        .select((comment_likes::comment_id, diesel::dsl::count_star()))
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// The subset of `comment_ids` the caller has liked.
pub async fn comments_liked_by(
    conn: &mut AsyncPgConnection,
    author_id: i32,
    comment_ids: &[i32],
) -> Result<HashSet<i32>, diesel::result::Error> {
    if comment_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows: Vec<i32> = comment_likes::table
        .filter(comment_likes::author_id.eq(author_id))
        .filter(comment_likes::comment_id.eq_any(comment_ids))
        .select(comment_likes::comment_id)
        .load(conn)
        .await?;
    Ok(rows.into_iter().collect())
}
