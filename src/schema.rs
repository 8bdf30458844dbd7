// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

diesel::table! {
    users (id) {
        id -> Int4,
        email -> Nullable<Varchar>,
        phone_number -> Nullable<Varchar>,
        username -> Varchar,
        first_name -> Nullable<Varchar>,
        last_name -> Nullable<Varchar>,
        password_hash -> Varchar,
        auth_type -> Varchar,
        user_status -> Varchar,
        photo -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    confirmations (id) {
        id -> Int4,
        user_id -> Int4,
        code -> Varchar,
        auth_type -> Varchar,
        is_verified -> Bool,
        expires_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    posts (id) {
        id -> Int4,
        author_id -> Int4,
        image -> Varchar,
        caption -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Int4,
        post_id -> Int4,
        author_id -> Int4,
        content -> Text,
        parent_id -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    post_likes (id) {
        id -> Int4,
        post_id -> Int4,
        author_id -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    comment_likes (id) {
        id -> Int4,
        comment_id -> Int4,
        author_id -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(confirmations -> users (user_id));
diesel::joinable!(posts -> users (author_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(comments -> users (author_id));
diesel::joinable!(post_likes -> posts (post_id));
diesel::joinable!(post_likes -> users (author_id));
diesel::joinable!(comment_likes -> comments (comment_id));
diesel::joinable!(comment_likes -> users (author_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    confirmations,
    posts,
    comments,
    post_likes,
    comment_likes,
);
