use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::repository::RepositoryError;

/// Every failure a handler can report, rendered as `{code, message, details}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn not_found() -> Self {
        ApiError::NotFound("Todo not found".to_string())
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            ApiError::Validation(errors) => (
                "One or more fields are invalid".to_string(),
                Some(field_errors(errors)),
            ),
            ApiError::Internal(_) => ("An internal error occurred".to_string(), None),
            other => (other.to_string(), None),
        };
        ErrorBody {
            code: self.code().to_string(),
            message,
            details,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(reason) = self {
            tracing::error!(error = %reason, "request failed");
        }
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(error: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::EmailTaken(_) => {
                ApiError::BadRequest("Registration failed: email is already in use".to_string())
            }
            AuthError::WrongPassword => {
                ApiError::BadRequest("Current password is incorrect".to_string())
            }
            AuthError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            AuthError::Token(_) => ApiError::Unauthorized("Invalid or expired token".to_string()),
            AuthError::Hashing(_) | AuthError::Repository(_) => ApiError::Internal(error.to_string()),
        }
    }
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            let field = camel_case(&field);
            errors.iter().map(move |error| FieldError {
                field: field.clone(),
                message: error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid ({})", error.code)),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::RegisterRequest;
    use validator::Validate;

    #[test]
    fn validation_details_use_camel_case_fields() {
        let request = RegisterRequest {
            email: "user@example.com".into(),
            password: "Secret1".into(),
            first_name: " ".into(),
            last_name: "Doe".into(),
        };
        let error = ApiError::from(request.validate().unwrap_err());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);

        let body = error.body();
        assert_eq!(body.code, "VALIDATION_ERROR");
        let details = body.details.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "firstName");
        assert_eq!(details[0].message, "Name is required");
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let error = ApiError::Internal("disk on fire".into());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = error.body();
        assert_eq!(body.code, "INTERNAL_ERROR");
        assert!(!body.message.contains("disk"));
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let unauthorized = ApiError::from(AuthError::InvalidCredentials);
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        let taken = ApiError::from(AuthError::EmailTaken("a@b.c".into()));
        assert_eq!(taken.status_code(), StatusCode::BAD_REQUEST);
        let missing = ApiError::from(AuthError::UserNotFound("id".into()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn snake_case_becomes_camel_case() {
        assert_eq!(camel_case("current_password"), "currentPassword");
        assert_eq!(camel_case("title"), "title");
    }
}
