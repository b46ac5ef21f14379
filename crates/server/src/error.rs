use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    admin::AdminError, category_directory::CategoryDirectoryError,
    form_validation::ValidationErrors, news::NewsError, revalidation::RevalidationError,
    saga::SagaError, storage::StorageError,
};
use thiserror::Error;
use tracing::{error, warn};
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    News(#[from] NewsError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Categories(#[from] CategoryDirectoryError),
    #[error(transparent)]
    Revalidation(#[from] RevalidationError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid revalidation token")]
    Unauthorized,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Admin(err) => match err {
                AdminError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
                AdminError::Conflict(_) => StatusCode::CONFLICT,
                AdminError::Database(db) if is_unique_violation(db) => StatusCode::CONFLICT,
                AdminError::Storage(StorageError::InvalidPayload(_) | StorageError::InvalidKey(_)) => {
                    StatusCode::BAD_REQUEST
                }
                AdminError::Saga(_) | AdminError::Database(_) | AdminError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Database(db) if is_unique_violation(db) => StatusCode::CONFLICT,
            ApiError::Categories(_) | ApiError::News(NewsError::Categories(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Revalidation(RevalidationError::NotConfigured) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Revalidation(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::News(_) | ApiError::Database(_) | ApiError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Admin(AdminError::Validation(errors))
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Admin(AdminError::Saga(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        match self {
            ApiError::Admin(AdminError::Validation(errors)) => (
                status,
                ResponseJson(ApiResponse::<(), ValidationErrors>::error_with_data(errors)),
            )
                .into_response(),
            ApiError::Admin(AdminError::Saga(saga)) => {
                let message = if saga.compensation_failures().is_empty() {
                    "The change could not be saved and was rolled back.".to_string()
                } else {
                    format!(
                        "The change could not be saved and was only partly rolled back: {}",
                        saga.compensation_failures().join("; ")
                    )
                };
                (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
            }
            other => {
                let message = if status.is_server_error() && !matches!(other, ApiError::Revalidation(_)) {
                    "Internal server error".to_string()
                } else {
                    other.to_string()
                };
                (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn admin_errors_map_to_client_statuses() {
        let mut errors = ValidationErrors::new();
        errors.add("slug", "is required");
        assert_eq!(
            ApiError::from(errors).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(AdminError::not_found("post", Uuid::nil())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AdminError::Conflict("last admin".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
