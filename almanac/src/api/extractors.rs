use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::error::AlmanacError;

use super::v1::response::ApiResponse;

/// JSON body extractor whose rejections use the v1 error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiResponse<()>))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiResponse<()> {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection).into()
    }
}

fn map_json_rejection(rejection: JsonRejection) -> AlmanacError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            match extract_missing_field(&message) {
                Some(field) => AlmanacError::Validation(format!("Missing required field: {field}")),
                None => AlmanacError::Validation(format!("Invalid request body: {message}")),
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            AlmanacError::Validation(format!("Malformed JSON: {}", err.body_text()))
        }
        JsonRejection::MissingJsonContentType(_) => {
            AlmanacError::Validation("Expected `Content-Type: application/json`".to_string())
        }
        JsonRejection::BytesRejection(_) => {
            AlmanacError::Internal("Failed to read request body".to_string())
        }
        other => AlmanacError::Validation(other.body_text()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let rest = message.get(start..)?;
    rest.get(..rest.find('`')?)
}
