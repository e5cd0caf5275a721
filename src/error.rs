use crate::fasta::FastaError;
use crate::models::FormErrors;
use crate::ribo::RiboError;
use rocket::http::ContentType;
use rocket::response::{Responder, Response};
use rocket::{Request, http::Status};
use std::io::Cursor;

#[derive(Debug)]
pub enum ApiError {
    Validation(FormErrors),
    DatabaseError(String),
    StorageError(String),
    RiboError(String),
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(String),
}

impl ApiError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::default();
        errors.add(field, message);
        ApiError::Validation(errors)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> rocket::response::Result<'static> {
        let (status, content_type, message) = match self {
            ApiError::Validation(errors) => {
                let body = serde_json::json!({ "errors": errors }).to_string();
                (Status::BadRequest, ContentType::JSON, body)
            }
            ApiError::DatabaseError(msg) => (Status::InternalServerError, ContentType::Plain, msg),
            ApiError::StorageError(msg) => (Status::InternalServerError, ContentType::Plain, msg),
            ApiError::RiboError(msg) => (Status::InternalServerError, ContentType::Plain, msg),
            ApiError::BadRequest(msg) => (Status::BadRequest, ContentType::Plain, msg),
            ApiError::Unauthorized(msg) => (Status::Unauthorized, ContentType::Plain, msg),
            ApiError::NotFound(msg) => (Status::NotFound, ContentType::Plain, msg),
            ApiError::Conflict(msg) => (Status::Conflict, ContentType::Plain, msg),
            ApiError::InternalServerError(msg) => {
                (Status::InternalServerError, ContentType::Plain, msg)
            }
        };

        Response::build()
            .status(status)
            .header(content_type)
            .sized_body(message.len(), Cursor::new(message))
            .ok()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::DatabaseError(format!("Database error: {err}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::StorageError(format!("Storage error: {err}"))
    }
}

impl From<RiboError> for ApiError {
    fn from(err: RiboError) -> Self {
        match err {
            RiboError::UnknownTranscript(name) => {
                ApiError::NotFound(format!("Transcript '{name}' not found"))
            }
            RiboError::UnknownExperiment(name) => {
                ApiError::NotFound(format!("Experiment '{name}' not found in ribo file"))
            }
            other => ApiError::RiboError(format!("Ribo error: {other}")),
        }
    }
}

impl From<FastaError> for ApiError {
    fn from(err: FastaError) -> Self {
        match err {
            FastaError::InvalidCharacter { .. } => ApiError::BadRequest(err.to_string()),
            FastaError::Io(e) => ApiError::StorageError(format!("Storage error: {e}")),
        }
    }
}
