// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::api::AppState;
use crate::auth::{AuthUser, JwtService};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::confirmation::Confirmation;
use crate::models::user::{self, AuthType, User, UserStatus};
use crate::storage;
use crate::validation;

/// Token envelope returned by every registration-flow endpoint.
#[derive(Debug, Serialize)]
pub struct AuthEnvelope {
    pub success: bool,
    pub access: String,
    pub refresh: String,
    pub user_status: String,
}

fn envelope(jwt: &JwtService, user: &User) -> ApiResult<AuthEnvelope> {
    let pair = jwt.token_pair(user.id)?;
    Ok(AuthEnvelope {
        success: true,
        access: pair.access,
        refresh: pair.refresh,
        user_status: user.user_status.clone(),
    })
}

/// The identity string codes are dispatched to, per the user's channel.
fn channel_identifier(user: &User) -> &str {
    match user.channel() {
        AuthType::Email => user.email.as_deref().unwrap_or_default(),
        AuthType::Phone => user.phone_number.as_deref().unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email_or_phone: String,
}

/// Idempotent signup: resolves the channel, reuses or creates the user in
/// status `new`, issues a fresh confirmation code, and dispatches it.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> ApiResult<Json<AuthEnvelope>> {
    let identifier = body.email_or_phone.trim().to_lowercase();
    let auth_type = validation::detect_auth_type(&identifier).ok_or_else(|| {
        ApiError::field(
            "email_or_phone",
            "Enter a valid email address or phone number.",
        )
    })?;

    let mut conn = state.db.get().await?;

    // Identifiers already owned by a registered account cannot sign up again
    if let Some(existing) = User::find_by_channel(&mut conn, auth_type, &identifier).await? {
        if existing.status() != UserStatus::New {
            let message = match auth_type {
                AuthType::Email => "User with this email already exists.",
                AuthType::Phone => "User with this phone number already exists.",
            };
            return Err(ApiError::field("email_or_phone", message));
        }
    }

    let user = User::get_or_create(&mut conn, auth_type, &identifier).await?;

    let code = user::generate_code();
    Confirmation::create(&mut conn, user.id, &code, auth_type).await?;
    state
        .notifier
        .send_verification_code(auth_type, channel_identifier(&user), &code);
    info!(user_id = user.id, "Issued signup verification code");

    Ok(Json(envelope(&state.jwt, &user)?))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

/// Consume a confirmation code; only valid while the user is still `new`.
pub async fn verify_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<VerifyCodeRequest>,
) -> ApiResult<Json<AuthEnvelope>> {
    if !validation::is_valid_code(&body.code) {
        return Err(ApiError::field("code", "Code must be a 4-digit number."));
    }

    let mut conn = state.db.get().await?;

    let confirmation = Confirmation::find_for_user_by_code(&mut conn, user.id, &body.code)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid verification code.".into()))?;

    if user.status() != UserStatus::New {
        return Err(ApiError::BadRequest("User is already verified.".into()));
    }
    if confirmation.is_expired(Utc::now()) {
        return Err(ApiError::BadRequest("Code expired.".into()));
    }

    let user = User::set_status(&mut conn, user.id, UserStatus::CodeVerified).await?;
    Confirmation::delete(&mut conn, confirmation.id).await?;
    info!(user_id = user.id, "Verification code accepted");

    Ok(Json(envelope(&state.jwt, &user)?))
}

/// Issue a replacement code, refused while a live one is outstanding.
pub async fn new_verify_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    if user.status() != UserStatus::New {
        return Err(ApiError::BadRequest("User is already verified.".into()));
    }

    let mut conn = state.db.get().await?;

    if Confirmation::live_exists(&mut conn, user.id, Utc::now()).await? {
        return Err(ApiError::BadRequest(
            "A valid verification code has already been sent.".into(),
        ));
    }

    let auth_type = user.channel();
    let code = user::generate_code();
    Confirmation::create(&mut conn, user.id, &code, auth_type).await?;
    state
        .notifier
        .send_verification_code(auth_type, channel_identifier(&user), &code);
    info!(user_id = user.id, "Issued replacement verification code");

    Ok(Json(json!({
        "success": true,
        "detail": "A new verification code has been sent.",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ChangeInfoRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub confirm_password: String,
}

/// Complete the profile: validated as one ordered pipeline, then the user
/// moves to `done` (never regressing a `photo_done` account).
pub async fn change_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChangeInfoRequest>,
) -> ApiResult<Json<AuthEnvelope>> {
    let mut conn = state.db.get().await?;

    let username_taken =
        User::username_taken(&mut conn, &body.username, Some(user.id)).await?;

    let info = validation::ProfileInfo {
        username: &body.username,
        first_name: &body.first_name,
        last_name: &body.last_name,
        password: &body.password,
        confirm_password: &body.confirm_password,
    };
    let errors = validation::validate_profile_info(&info, username_taken);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;

    let status = user.status().max(UserStatus::Done);
    let user = User::apply_profile_info(
        &mut conn,
        user.id,
        &body.username,
        &body.first_name,
        &body.last_name,
        &password_hash,
        status,
    )
    .await?;
    info!(user_id = user.id, "Profile information completed");

    Ok(Json(envelope(&state.jwt, &user)?))
}

/// Store the profile photo and move the user to `photo_done`.
pub async fn change_photo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<AuthEnvelope>> {
    // The photo step comes after profile completion
    if !user.status().login_eligible() {
        return Err(ApiError::IncompleteRegistration);
    }

    let mut uploaded = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::field("photo", format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("photo") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::field("photo", "Could not read the uploaded file."))?;
            uploaded = Some((filename, bytes));
        }
    }

    let (filename, bytes) =
        uploaded.ok_or_else(|| ApiError::field("photo", "This field is required."))?;

    let ext = storage::extension_of(&filename)
        .filter(|ext| storage::is_allowed_photo_extension(ext))
        .ok_or_else(|| {
            ApiError::field("photo", "Only jpg, jpeg, and png files are allowed.")
        })?;

    if bytes.len() > storage::MAX_PHOTO_BYTES {
        return Err(ApiError::field(
            "photo",
            "Photo size should not exceed 2 MB.",
        ));
    }

    let path = storage::store(
        &Config::get().media.root,
        storage::USER_PHOTO_DIR,
        &ext,
        &bytes,
    )
    .await?;

    let mut conn = state.db.get().await?;
    let user = User::set_photo(&mut conn, user.id, &path).await?;
    info!(user_id = user.id, "Profile photo stored");

    Ok(Json(envelope(&state.jwt, &user)?))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub userinput: String,
    pub password: String,
}

/// Login envelope; also carries the display name, like the original client
/// expects.
#[derive(Debug, Serialize)]
pub struct LoginEnvelope {
    pub success: bool,
    pub access: String,
    pub refresh: String,
    pub user_status: String,
    pub full_name: Option<String>,
}

/// Authenticate with a username, email address, or phone number. Unknown
/// accounts and wrong passwords are indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginEnvelope>> {
    let userinput = body.userinput.trim().to_string();
    let kind = validation::classify(&userinput).ok_or_else(|| {
        ApiError::field(
            "userinput",
            "Enter a valid username, email address, or phone number.",
        )
    })?;

    let mut conn = state.db.get().await?;

    let user = match kind {
        validation::IdentifierKind::Username => {
            User::find_by_username(&mut conn, &userinput).await?
        }
        validation::IdentifierKind::Email => User::find_by_email(&mut conn, &userinput).await?,
        validation::IdentifierKind::Phone => User::find_by_phone(&mut conn, &userinput).await?,
    }
    .ok_or(ApiError::InvalidCredentials)?;

    if !user.status().login_eligible() {
        return Err(ApiError::IncompleteRegistration);
    }

    let password_ok = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| anyhow::anyhow!("failed to verify password: {}", e))?;
    if !password_ok {
        return Err(ApiError::InvalidCredentials);
    }

    let pair = state.jwt.token_pair(user.id)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginEnvelope {
        success: true,
        access: pair.access,
        refresh: pair.refresh,
        user_status: user.user_status.clone(),
        full_name: user.full_name(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Exchange a refresh token for a fresh pair.
pub async fn login_refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<AuthEnvelope>> {
    let claims = state
        .jwt
        .verify_refresh(&body.refresh)
        .map_err(|_| ApiError::Unauthorized)?;

    let mut conn = state.db.get().await?;
    let user = User::find_by_id(&mut conn, claims.user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(envelope(&state.jwt, &user)?))
}
