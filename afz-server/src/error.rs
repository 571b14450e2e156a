use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::mail::MailError;

/// Errors returned by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body is not the expected JSON document.
    #[error(transparent)]
    Payload(#[from] JsonRejection),
    /// A field failed validation.
    #[error("{0}")]
    Invalid(&'static str),
    /// The mail could not be sent.
    #[error(transparent)]
    Mail(#[from] MailError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Payload(rejection) => {
                warn!(error = %rejection, "malformed request body");
                (StatusCode::BAD_REQUEST, "Invalid request body".to_owned())
            }
            ApiError::Invalid(reason) => (StatusCode::BAD_REQUEST, (*reason).to_owned()),
            ApiError::Mail(mail) => {
                error!(error = %mail, "mail not delivered");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send message".to_owned(),
                )
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
