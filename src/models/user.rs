// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::users;

/// The channel a user signed up through. Fixed at creation; it decides
/// which identity column is populated and the confirmation expiry window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    Email,
    Phone,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Email => "email",
            AuthType::Phone => "phone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(AuthType::Email),
            "phone" => Some(AuthType::Phone),
            _ => None,
        }
    }
}

/// Registration progress. Ordered: a user only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UserStatus {
    New,
    CodeVerified,
    Done,
    PhotoDone,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::New => "new",
            UserStatus::CodeVerified => "code_verified",
            UserStatus::Done => "done",
            UserStatus::PhotoDone => "photo_done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(UserStatus::New),
            "code_verified" => Some(UserStatus::CodeVerified),
            "done" => Some(UserStatus::Done),
            "photo_done" => Some(UserStatus::PhotoDone),
            _ => None,
        }
    }

    /// Only fully registered users may log in.
    pub fn login_eligible(&self) -> bool {
        matches!(self, UserStatus::Done | UserStatus::PhotoDone)
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub auth_type: String,
    pub user_status: String,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub username: String,
    pub password_hash: String,
    pub auth_type: String,
    pub user_status: String,
}

/// 4 random decimal digits from the OS CSPRNG. Codes are not globally
/// unique; the single-active-code policy on resend is the only guard.
pub fn generate_code() -> String {
    let n: u16 = OsRng.gen_range(0..10_000);
    format!("{:04}", n)
}

fn uuid_tail() -> String {
    let id = Uuid::new_v4().to_string();
    id.rsplit('-').next().unwrap_or_default().to_string()
}

/// Placeholder username assigned at signup, before the user picks one.
pub fn placeholder_username() -> String {
    format!("user-{}", uuid_tail())
}

/// Placeholder password for users that have not completed their profile.
/// Never disclosed; it only exists so the row always carries a hash.
pub fn placeholder_password() -> String {
    format!("password-{}", uuid_tail())
}

/// Lowercase and trim an email before it touches the store.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn status(&self) -> UserStatus {
        UserStatus::parse(&self.user_status).unwrap_or(UserStatus::New)
    }

    pub fn channel(&self) -> AuthType {
        AuthType::parse(&self.auth_type).unwrap_or(AuthType::Email)
    }

    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .find(id)
            .first::<User>(conn)
            .await
            .optional()
    }

    pub async fn find_by_username(
        conn: &mut AsyncPgConnection,
        username: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .filter(users::username.eq(username))
            .first::<User>(conn)
            .await
            .optional()
    }

    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .filter(users::email.eq(normalize_email(email)))
            .first::<User>(conn)
            .await
            .optional()
    }

    pub async fn find_by_phone(
        conn: &mut AsyncPgConnection,
        phone_number: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        users::table
            .filter(users::phone_number.eq(phone_number))
            .first::<User>(conn)
            .await
            .optional()
    }

    pub async fn find_by_channel(
        conn: &mut AsyncPgConnection,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        match auth_type {
            AuthType::Email => Self::find_by_email(conn, identifier).await,
            AuthType::Phone => Self::find_by_phone(conn, identifier).await,
        }
    }

    pub async fn username_taken(
        conn: &mut AsyncPgConnection,
        username: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, diesel::result::Error> {
        let count: i64 = match exclude_id {
            Some(id) => {
                users::table
                    .filter(users::username.eq(username))
                    .filter(users::id.ne(id))
                    .count()
                    .get_result(conn)
                    .await?
            }
            None => {
                users::table
                    .filter(users::username.eq(username))
                    .count()
                    .get_result(conn)
                    .await?
            }
        };
        Ok(count > 0)
    }

    /// Find the user owning the identifier, or create one in status `new`
    /// with a placeholder identity. Idempotent: the unique identity columns
    /// make the racing insert a no-op, after which the existing row is
    /// re-read.
    pub async fn get_or_create(
        conn: &mut AsyncPgConnection,
        auth_type: AuthType,
        identifier: &str,
    ) -> crate::error::ApiResult<User> {
        let identifier = match auth_type {
            AuthType::Email => normalize_email(identifier),
            AuthType::Phone => identifier.trim().to_string(),
        };

        if let Some(user) = Self::find_by_channel(conn, auth_type, &identifier).await? {
            return Ok(user);
        }

        let mut username = placeholder_username();
        while Self::username_taken(conn, &username, None).await? {
            username.push_str(&OsRng.gen_range(0..1000u32).to_string());
        }

        let password_hash = bcrypt::hash(placeholder_password(), bcrypt::DEFAULT_COST)
            .map_err(|e| anyhow::anyhow!("failed to hash placeholder password: {}", e))?;

        let new_user = NewUser {
            email: matches!(auth_type, AuthType::Email).then(|| identifier.clone()),
            phone_number: matches!(auth_type, AuthType::Phone).then(|| identifier.clone()),
            username,
            password_hash,
            auth_type: auth_type.as_str().to_string(),
            user_status: UserStatus::New.as_str().to_string(),
        };

        diesel::insert_into(users::table)
            .values(&new_user)
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;

        // Re-read either our row or the one a concurrent signup won with
        Ok(Self::find_by_channel(conn, auth_type, &identifier)
            .await?
            .ok_or(diesel::result::Error::NotFound)?)
    }

    pub async fn set_status(
        conn: &mut AsyncPgConnection,
        id: i32,
        status: UserStatus,
    ) -> Result<User, diesel::result::Error> {
        diesel::update(users::table.find(id))
            .set(users::user_status.eq(status.as_str()))
            .get_result::<User>(conn)
            .await
    }

    pub async fn apply_profile_info(
        conn: &mut AsyncPgConnection,
        id: i32,
        username: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
        status: UserStatus,
    ) -> Result<User, diesel::result::Error> {
        diesel::update(users::table.find(id))
            .set((
                users::username.eq(username),
                users::first_name.eq(first_name),
                users::last_name.eq(last_name),
                users::password_hash.eq(password_hash),
                users::user_status.eq(status.as_str()),
            ))
            .get_result::<User>(conn)
            .await
    }

    pub async fn set_photo(
        conn: &mut AsyncPgConnection,
        id: i32,
        photo: &str,
    ) -> Result<User, diesel::result::Error> {
        diesel::update(users::table.find(id))
            .set((
                users::photo.eq(photo),
                users::user_status.eq(UserStatus::PhotoDone.as_str()),
            ))
            .get_result::<User>(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            UserStatus::New,
            UserStatus::CodeVerified,
            UserStatus::Done,
            UserStatus::PhotoDone,
        ] {
            assert_eq!(UserStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UserStatus::parse("bogus"), None);
    }

    #[test]
    fn status_progression_is_ordered() {
        assert!(UserStatus::New < UserStatus::CodeVerified);
        assert!(UserStatus::CodeVerified < UserStatus::Done);
        assert!(UserStatus::Done < UserStatus::PhotoDone);
    }

    #[test]
    fn login_eligibility() {
        assert!(!UserStatus::New.login_eligible());
        assert!(!UserStatus::CodeVerified.login_eligible());
        assert!(UserStatus::Done.login_eligible());
        assert!(UserStatus::PhotoDone.login_eligible());
    }

    #[test]
    fn auth_type_round_trips() {
        assert_eq!(AuthType::parse("email"), Some(AuthType::Email));
        assert_eq!(AuthType::parse("phone"), Some(AuthType::Phone));
        assert_eq!(AuthType::parse("carrier-pigeon"), None);
    }

    #[test]
    fn generated_codes_are_four_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn placeholder_username_shape() {
        let username = placeholder_username();
        assert!(username.starts_with("user-"));
        assert!(username.len() > "user-".len());
    }

    #[test]
    fn placeholders_vary() {
        assert_ne!(placeholder_username(), placeholder_username());
        assert_ne!(placeholder_password(), placeholder_password());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Anora@Gmail.COM "), "anora@gmail.com");
    }

    fn sample_user() -> User {
        User {
            id: 1,
            email: Some("user@example.com".into()),
            phone_number: None,
            username: "testuser".into(),
            first_name: None,
            last_name: None,
            password_hash: "x".into(),
            auth_type: "email".into(),
            user_status: "new".into(),
            photo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn full_name_needs_at_least_one_part() {
        let mut user = sample_user();
        assert_eq!(user.full_name(), None);
        user.first_name = Some("John".into());
        assert_eq!(user.full_name(), Some("John".into()));
        user.last_name = Some("Doe".into());
        assert_eq!(user.full_name(), Some("John Doe".into()));
    }

    #[test]
    fn unknown_status_string_degrades_to_new() {
        let mut user = sample_user();
        user.user_status = "corrupted".into();
        assert_eq!(user.status(), UserStatus::New);
    }
}
