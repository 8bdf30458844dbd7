use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// A single field-scoped validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied")]
    Forbidden,

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("registration not complete")]
    IncompleteRegistration,

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("pool error: {0}")]
    Pool(#[from] crate::db::DbPoolError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Shortcut for a single field-scoped validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "errors": errors,
                }),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "detail": detail,
                }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({
                    "detail": format!("{} not found.", what),
                }),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({
                    "detail": "You do not have permission to perform this action.",
                }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "detail": "Authentication credentials were not provided or are invalid.",
                }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "detail": "Sorry, the login or password you entered is incorrect. Please check and try again.",
                }),
            ),
            ApiError::IncompleteRegistration => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "detail": "You have not completed registration yet.",
                }),
            ),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error." }),
                )
            }
            ApiError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error." }),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "Internal server error." }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: ApiError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn validation_returns_400() {
        let err = ApiError::field("username", "Username is already taken.");
        assert_eq!(response_status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(ApiError::BadRequest("Code expired.".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(ApiError::NotFound("Post")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn forbidden_returns_403() {
        assert_eq!(response_status(ApiError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            response_status(ApiError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn invalid_credentials_returns_401() {
        assert_eq!(
            response_status(ApiError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn incomplete_registration_returns_401() {
        assert_eq!(
            response_status(ApiError::IncompleteRegistration),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_returns_500() {
        let err = ApiError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(response_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn field_errors_keep_order() {
        let err = ApiError::Validation(vec![
            FieldError::new("first_name", "First name must contain only alphabetic characters."),
            FieldError::new("password", "Passwords do not match."),
        ]);
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors[0].field, "first_name");
                assert_eq!(errors[1].field, "password");
            }
            _ => unreachable!(),
        }
    }
}
