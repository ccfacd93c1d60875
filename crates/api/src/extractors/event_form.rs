//! Event create/update bodies, sent as JSON or as `multipart/form-data`.
//!
//! A multipart form carries the same fields as the JSON body, plus an
//! optional `image` file part. A text `image` field is kept as a reference,
//! same as in JSON.

use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::ImageUpload;

const IMAGE_FIELD: &str = "image";

/// Parsed event payload and the uploaded image, if one was sent.
#[derive(Debug)]
pub struct EventForm<T> {
    pub request: T,
    pub image: Option<ImageUpload>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Form values are all text; `limit` is the one numeric field.
fn form_value(name: &str, text: String) -> Value {
    if name == "limit" {
        if let Ok(n) = text.trim().parse::<i64>() {
            return Value::from(n);
        }
    }
    Value::String(text)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::invalid_field(IMAGE_FIELD, "The uploaded form is too large.")
    } else {
        ApiError::validation(err.body_text())
    }
}

async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<EventForm<T>, ApiError> {
    let mut fields = Map::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(multipart_error)?;

            // An empty file part means no file was chosen.
            if name == IMAGE_FIELD && !data.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let text = field.text().await.map_err(multipart_error)?;
        if !text.is_empty() {
            let value = form_value(&name, text);
            fields.insert(name, value);
        }
    }

    let request = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::validation(format!("Invalid form data: {}", e)))?;

    Ok(EventForm { request, image })
}

#[async_trait]
impl<T> FromRequest<AppState> for EventForm<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
            return read_multipart(multipart).await;
        }

        let Json(request) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;

        Ok(EventForm {
            request,
            image: None,
        })
    }
}
