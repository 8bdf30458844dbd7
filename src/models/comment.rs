// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::post::UserBrief;
use crate::models::user::User;
use crate::schema::{comments, users};

/// Hard ceiling on reply expansion. Parent links form a tree by
/// construction, but a corrupted cycle must terminate here instead of
/// hanging the serializer.
pub const MAX_REPLY_DEPTH: usize = 32;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub content: String,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewComment {
    pub post_id: i32,
    pub author_id: i32,
    pub content: String,
    pub parent_id: Option<i32>,
}

/// A comment as the feed serializes it: like aggregates plus the fully
/// inlined reply subtree.
#[derive(Debug, Serialize)]
pub struct CommentDetail {
    pub id: i32,
    pub post: i32,
    pub author: UserBrief,
    pub content: String,
    pub parent: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<CommentDetail>,
    pub likes_count: i64,
    pub me_liked: bool,
}

/// One comment with everything the tree builder needs, already aggregated.
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub comment: Comment,
    pub author: UserBrief,
    pub likes_count: i64,
    pub me_liked: bool,
}

/// Build the serialized subtree rooted at `root_id` from the post's
/// comments. Children are ordered oldest-first. Returns `None` when the
/// root is not among the nodes.
pub fn assemble_tree(nodes: &[CommentNode], root_id: i32) -> Option<CommentDetail> {
    let by_id: HashMap<i32, &CommentNode> =
        nodes.iter().map(|n| (n.comment.id, n)).collect();

    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for node in nodes {
        if let Some(parent_id) = node.comment.parent_id {
            children.entry(parent_id).or_default().push(node.comment.id);
        }
    }
    for ids in children.values_mut() {
        ids.sort_by_key(|id| by_id.get(id).map(|n| (n.comment.created_at, n.comment.id)));
    }

    build(&by_id, &children, root_id, 0)
}

fn build(
    by_id: &HashMap<i32, &CommentNode>,
    children: &HashMap<i32, Vec<i32>>,
    id: i32,
    depth: usize,
) -> Option<CommentDetail> {
    let node = by_id.get(&id)?;

    let replies = if depth >= MAX_REPLY_DEPTH {
        warn!(
            comment_id = id,
            "reply nesting exceeds {} levels, truncating", MAX_REPLY_DEPTH
        );
        Vec::new()
    } else {
        children
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|child| build(by_id, children, *child, depth + 1))
                    .collect()
            })
            .unwrap_or_default()
    };

    Some(CommentDetail {
        id: node.comment.id,
        post: node.comment.post_id,
        author: node.author.clone(),
        content: node.comment.content.clone(),
        parent: node.comment.parent_id,
        created_at: node.comment.created_at,
        replies,
        likes_count: node.likes_count,
        me_liked: node.me_liked,
    })
}

impl Comment {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_comment: &NewComment,
    ) -> Result<Comment, diesel::result::Error> {
        diesel::insert_into(comments::table)
            .values(new_comment)
            .get_result::<Comment>(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<Option<Comment>, diesel::result::Error> {
        comments::table
            .find(id)
            .first::<Comment>(conn)
            .await
            .optional()
    }

    /// Newest-first page of comments with their authors.
    pub async fn list_page(
        conn: &mut AsyncPgConnection,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<(Comment, User)>, diesel::result::Error> {
        comments::table
            .inner_join(users::table)
            .order_by(comments::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select((Comment::as_select(), User::as_select()))
            .load::<(Comment, User)>(conn)
            .await
    }

    pub async fn count_all(
        conn: &mut AsyncPgConnection,
    ) -> Result<i64, diesel::result::Error> {
        comments::table.count().get_result(conn).await
    }

    /// Every comment belonging to the given posts, authors included, in
    /// creation order. One query feeds the in-memory tree builder.
    pub async fn load_for_posts(
        conn: &mut AsyncPgConnection,
        post_ids: &[i32],
    ) -> Result<Vec<(Comment, User)>, diesel::result::Error> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq_any(post_ids))
            .order_by(comments::created_at.asc())
            .select((Comment::as_select(), User::as_select()))
            .load::<(Comment, User)>(conn)
            .await
    }

    /// Top-level comment counts for a batch of posts (replies excluded),
    /// keyed by post id.
    pub async fn top_level_counts(
        conn: &mut AsyncPgConnection,
        post_ids: &[i32],
    ) -> Result<HashMap<i32, i64>, diesel::result::Error> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i32, i64)> = comments::table
            .filter(comments::post_id.eq_any(post_ids))
            .filter(comments::parent_id.is_null())
            .group_by(comments::post_id)
            .select((comments::post_id, diesel::dsl::count_star()))
            .load(conn)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn update_content(
        conn: &mut AsyncPgConnection,
        id: i32,
        content: &str,
    ) -> Result<Comment, diesel::result::Error> {
        diesel::update(comments::table.find(id))
            .set(comments::content.eq(content))
            .get_result::<Comment>(conn)
            .await
    }

    /// Delete a comment; replies and likes go with it via the cascading FKs.
    pub async fn delete(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(comments::table.find(id))
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn node(id: i32, parent_id: Option<i32>, minutes: i64) -> CommentNode {
        let created_at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
            + Duration::minutes(minutes);
        CommentNode {
            comment: Comment {
                id,
                post_id: 1,
                author_id: 10,
                content: format!("comment {}", id),
                parent_id,
                created_at,
            },
            author: UserBrief {
                id: 10,
                username: "testuser".into(),
                photo: None,
            },
            likes_count: 0,
            me_liked: false,
        }
    }

    #[test]
    fn leaf_comment_has_empty_replies() {
        let nodes = vec![node(1, None, 0)];
        let detail = assemble_tree(&nodes, 1).unwrap();
        assert_eq!(detail.id, 1);
        assert!(detail.replies.is_empty());
    }

    #[test]
    fn unknown_root_yields_none() {
        let nodes = vec![node(1, None, 0)];
        assert!(assemble_tree(&nodes, 99).is_none());
    }

    #[test]
    fn nested_replies_mirror_the_tree() {
        // 1 ── 2 ── 4
        //  └── 3
        let nodes = vec![
            node(1, None, 0),
            node(2, Some(1), 1),
            node(3, Some(1), 2),
            node(4, Some(2), 3),
        ];
        let detail = assemble_tree(&nodes, 1).unwrap();
        assert_eq!(detail.replies.len(), 2);
        assert_eq!(detail.replies[0].id, 2);
        assert_eq!(detail.replies[1].id, 3);
        assert_eq!(detail.replies[0].replies.len(), 1);
        assert_eq!(detail.replies[0].replies[0].id, 4);
        assert!(detail.replies[1].replies.is_empty());
    }

    #[test]
    fn replies_are_ordered_oldest_first() {
        let nodes = vec![node(1, None, 0), node(3, Some(1), 5), node(2, Some(1), 9)];
        let detail = assemble_tree(&nodes, 1).unwrap();
        let ids: Vec<i32> = detail.replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn subtree_can_start_at_a_reply() {
        let nodes = vec![node(1, None, 0), node(2, Some(1), 1), node(3, Some(2), 2)];
        let detail = assemble_tree(&nodes, 2).unwrap();
        assert_eq!(detail.parent, Some(1));
        assert_eq!(detail.replies.len(), 1);
        assert_eq!(detail.replies[0].id, 3);
    }

    #[test]
    fn deep_chains_are_truncated_at_the_guard() {
        let mut nodes = vec![node(1, None, 0)];
        for i in 2..=(MAX_REPLY_DEPTH as i32 + 10) {
            nodes.push(node(i, Some(i - 1), i as i64));
        }

        let detail = assemble_tree(&nodes, 1).unwrap();
        let mut depth = 0;
        let mut cursor = &detail;
        // Disambiguate slice `first` from diesel_async::RunQueryDsl::first,
        // which is in scope via the glob import and shadows the inherent method.
        while let Some(next) = <[CommentDetail]>::first(&cursor.replies) {
            cursor = next;
            depth += 1;
        }
        assert_eq!(depth, MAX_REPLY_DEPTH);
    }

    #[test]
    fn corrupted_parent_cycle_terminates() {
        // 1 and 2 claim each other as parent; expansion must not hang.
        let nodes = vec![node(1, Some(2), 0), node(2, Some(1), 1)];
        let detail = assemble_tree(&nodes, 1).unwrap();

        let mut count = 0usize;
        let mut stack = vec![&detail];
        while let Some(current) = stack.pop() {
            count += 1;
            stack.extend(current.replies.iter());
        }
        assert!(count <= MAX_REPLY_DEPTH + 1);
    }
}
