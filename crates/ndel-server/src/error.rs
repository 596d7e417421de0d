use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ndel_meta::MetaError;
use ndel_store::StoreError;
use ndel_types::TypeError;
use thiserror::Error;
use tracing::{debug, error};

use crate::envelope::ResponseData;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid object id: {0}")]
    InvalidOid(#[from] TypeError),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("no file parts found in request")]
    NoFileParts,

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body exceeds the upload size limit")]
    PayloadTooLarge,

    #[error("requested representation not acceptable")]
    NotAcceptable,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("metadata error: {0}")]
    Meta(#[from] MetaError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOid(_) | Self::NoFileParts | Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Meta(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Store(_)
            | Self::Meta(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the response envelope. Never carries paths or engine
    /// messages.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidOid(_) => "Invalid object id",
            Self::NotFound(_) | Self::Store(StoreError::NotFound(_)) => "Object not found",
            Self::Meta(e) if e.is_not_found() => "Object not found",
            Self::NoFileParts => "No file parts found in request",
            Self::Malformed(_) => "Malformed upload request",
            Self::PayloadTooLarge => "Upload exceeds size limit",
            Self::NotAcceptable => "Not Acceptable",
            Self::Store(StoreError::HashMismatch { .. }) => "Content hash does not match OID",
            Self::Store(StoreError::Io(_)) => "Storage failure",
            Self::Meta(_) => "Metadata index failure",
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code.is_server_error() {
            error!(error = %self, status = code.as_u16(), "request failed");
        } else {
            debug!(error = %self, status = code.as_u16(), "request rejected");
        }
        ResponseData::status(code, self.public_message()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
