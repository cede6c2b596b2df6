use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Product with title '{0}' not found")]
    TitleNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Product with title '{0}' already exists")]
    DuplicateTitle(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Field-level failures (length limits), reported with per-field details
    #[error("Invalid fields: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::TitleNotFound(title) => {
                AppError::NotFound(format!("Product with title '{}' not found", title))
            }
            ProductError::CategoryNotFound(category) => {
                AppError::NotFound(format!("Category {} not found", category))
            }
            ProductError::DuplicateTitle(title) => {
                AppError::Duplicate(format!("Product with title '{}' already exists", title))
            }
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::InvalidFields(errors) => AppError::ValidationError(errors),
            ProductError::InvalidUpload(msg) => AppError::InvalidUpload(msg),
            ProductError::Database(msg) => AppError::Database(msg),
            ProductError::Storage(msg) => AppError::InternalServerError(msg),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        ProductError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ProductError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (ProductError::CategoryNotFound("c".into()), StatusCode::NOT_FOUND),
            (ProductError::DuplicateTitle("A".into()), StatusCode::BAD_REQUEST),
            (ProductError::InvalidUpload("big".into()), StatusCode::BAD_REQUEST),
            (ProductError::Database("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ProductError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_field_errors_keep_details() {
        use validator::Validate;

        let input = crate::models::CreateProduct {
            title: Some("x".repeat(201)),
            ..Default::default()
        };
        let err = ProductError::from(input.validate().unwrap_err());
        assert!(matches!(
            AppError::from(err),
            AppError::ValidationError(ref e) if e.field_errors().contains_key("title")
        ));
    }
}
