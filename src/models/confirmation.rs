// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::user::AuthType;
use crate::schema::confirmations;

/// Minutes a phone-channel code stays valid.
pub const PHONE_EXPIRE_MINUTES: i64 = 3;
/// Minutes an email-channel code stays valid.
pub const EMAIL_EXPIRE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::confirmations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Confirmation {
    pub id: i32,
    pub user_id: i32,
    pub code: String,
    pub auth_type: String,
    pub is_verified: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::confirmations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewConfirmation {
    pub user_id: i32,
    pub code: String,
    pub auth_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Expiry computed at creation: 3 minutes for phone, 5 for email.
pub fn expiry_for(auth_type: AuthType, from: DateTime<Utc>) -> DateTime<Utc> {
    let minutes = match auth_type {
        AuthType::Phone => PHONE_EXPIRE_MINUTES,
        AuthType::Email => EMAIL_EXPIRE_MINUTES,
    };
    from + Duration::minutes(minutes)
}

impl Confirmation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        user_id: i32,
        code: &str,
        auth_type: AuthType,
    ) -> Result<Confirmation, diesel::result::Error> {
        let new_confirmation = NewConfirmation {
            user_id,
            code: code.to_string(),
            auth_type: auth_type.as_str().to_string(),
            expires_at: expiry_for(auth_type, Utc::now()),
        };

        diesel::insert_into(confirmations::table)
            .values(&new_confirmation)
            .get_result::<Confirmation>(conn)
            .await
    }

    pub async fn find_for_user_by_code(
        conn: &mut AsyncPgConnection,
        user_id: i32,
        code: &str,
    ) -> Result<Option<Confirmation>, diesel::result::Error> {
        confirmations::table
            .filter(confirmations::user_id.eq(user_id))
            .filter(confirmations::code.eq(code))
            .order_by(confirmations::created_at.desc())
            .first::<Confirmation>(conn)
            .await
            .optional()
    }

    /// Whether the user still has an unexpired code outstanding. Resend is
    /// refused while this holds.
    pub async fn live_exists(
        conn: &mut AsyncPgConnection,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, diesel::result::Error> {
        let count: i64 = confirmations::table
            .filter(confirmations::user_id.eq(user_id))
            .filter(confirmations::expires_at.gt(now))
            .count()
            .get_result(conn)
            .await?;
        Ok(count > 0)
    }

    /// Consume the code after a successful verification.
    pub async fn delete(
        conn: &mut AsyncPgConnection,
        id: i32,
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(confirmations::table.find(id))
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_codes_expire_in_three_minutes() {
        let now = Utc::now();
        assert_eq!(
            expiry_for(AuthType::Phone, now),
            now + Duration::minutes(3)
        );
    }

    #[test]
    fn email_codes_expire_in_five_minutes() {
        let now = Utc::now();
        assert_eq!(
            expiry_for(AuthType::Email, now),
            now + Duration::minutes(5)
        );
    }

    #[test]
    fn expiry_check_is_strict() {
        let now = Utc::now();
        let confirmation = Confirmation {
            id: 1,
            user_id: 1,
            code: "1234".into(),
            auth_type: "email".into(),
            is_verified: false,
            expires_at: now,
            created_at: now - Duration::minutes(5),
        };
        // Exactly at the boundary the code is still accepted
        assert!(!confirmation.is_expired(now));
        assert!(confirmation.is_expired(now + Duration::seconds(1)));
        assert!(!confirmation.is_expired(now - Duration::seconds(1)));
    }
}
