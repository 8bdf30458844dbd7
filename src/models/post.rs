// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::user::User;
use crate::schema::{posts, users};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: i32,
    pub author_id: i32,
    pub image: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPost {
    pub author_id: i32,
    pub image: String,
    pub caption: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdatePost {
    pub image: String,
    pub caption: String,
}

/// Author info embedded in feed payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBrief {
    pub id: i32,
    pub username: String,
    pub photo: Option<String>,
}

impl From<&User> for UserBrief {
    fn from(user: &User) -> Self {
        UserBrief {
            id: user.id,
            username: user.username.clone(),
            photo: user.photo.clone(),
        }
    }
}

/// A post as the feed serializes it: counts plus whether the requesting
/// caller liked it. Anonymous callers always see `me_liked = false`.
#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub id: i32,
    pub author: UserBrief,
    pub image: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub post_likes_count: i64,
    pub post_comments_count: i64,
    pub me_liked: bool,
}

impl Post {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_post: &NewPost,
    ) -> Result<Post, diesel::result::Error> {
        diesel::insert_into(posts::table)
            .values(new_post)
            .get_result::<Post>(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<Option<Post>, diesel::result::Error> {
        posts::table.find(id).first::<Post>(conn).await.optional()
    }

    pub async fn find_with_author(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<Option<(Post, User)>, diesel::result::Error> {
        posts::table
            .inner_join(users::table)
            .filter(posts::id.eq(id))
            .select((Post::as_select(), User::as_select()))
            .first::<(Post, User)>(conn)
            .await
            .optional()
    }

    /// Newest-first page of posts with their authors.
    pub async fn list_page(
        conn: &mut AsyncPgConnection,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<(Post, User)>, diesel::result::Error> {
        posts::table
            .inner_join(users::table)
            .order_by(posts::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select((Post::as_select(), User::as_select()))
            .load::<(Post, User)>(conn)
            .await
    }

    pub async fn count_all(
        conn: &mut AsyncPgConnection,
    ) -> Result<i64, diesel::result::Error> {
        posts::table.count().get_result(conn).await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        id: i32,
        changes: &UpdatePost,
    ) -> Result<Post, diesel::result::Error> {
        diesel::update(posts::table.find(id))
            .set(changes)
            .get_result::<Post>(conn)
            .await
    }

    /// Delete a post; comments and likes go with it via the cascading FKs.
    pub async fn delete(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(posts::table.find(id)).execute(conn).await?;
        Ok(())
    }
}
