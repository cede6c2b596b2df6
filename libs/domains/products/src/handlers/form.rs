//! Body extractor accepting either JSON or a multipart form with an optional file.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use axum_helpers::AppError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::FileUpload;

/// Multipart part holding the thumbnail
pub const FILE_FIELD: &str = "file";

/// Product payload plus the uploaded file, if any.
///
/// Multipart text fields are collected into a JSON object and deserialized
/// into `T`; blank text fields and an empty `file` part count as absent.
/// Any other content type is read as JSON.
pub struct ProductForm<T> {
    pub data: T,
    pub file: Option<FileUpload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

impl<S, T> FromRequest<S> for ProductForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(data) = Json::<T>::from_request(req, state).await?;
            return Ok(Self { data, file: None });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut fields = Map::new();
        let mut file = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == FILE_FIELD {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;

                if !bytes.is_empty() {
                    file = Some(FileUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                continue;
            }

            let text = field.text().await?;
            if !text.trim().is_empty() {
                fields.insert(name, Value::String(text));
            }
        }

        let data = serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;

        Ok(Self { data, file })
    }
}
