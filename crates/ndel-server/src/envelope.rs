//! JSON response bodies.
//!
//! Every envelope, success or failure, is written by [`write_json`], so all
//! responses share one content type and encoding.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use ndel_types::{ObjectMeta, Oid};
use serde::Serialize;
use tracing::error;

use crate::negotiate::META_MEDIA_TYPE;

/// Status envelope. `code` sets the status line and is not serialized.
#[derive(Clone, Debug, Serialize)]
pub struct ResponseData {
    #[serde(skip)]
    pub code: StatusCode,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oid: Option<Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ObjectMeta>,
}

impl ResponseData {
    /// Envelope with only a status line.
    pub fn status(code: StatusCode, status: impl Into<String>) -> Self {
        Self {
            code,
            status: status.into(),
            oid: None,
            meta: None,
        }
    }

    /// Envelope describing one object.
    pub fn object(code: StatusCode, status: impl Into<String>, oid: Oid, meta: ObjectMeta) -> Self {
        Self {
            code,
            status: status.into(),
            oid: Some(oid),
            meta: Some(meta),
        }
    }
}

impl IntoResponse for ResponseData {
    fn into_response(self) -> Response {
        write_json(self.code, &self)
    }
}

/// Body of the listing endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ObjectListing {
    pub objects: Vec<Oid>,
}

impl IntoResponse for ObjectListing {
    fn into_response(self) -> Response {
        write_json(StatusCode::OK, &self)
    }
}

/// Encode `body` as newline-terminated JSON with the metadata media type.
pub fn write_json<T: Serialize>(code: StatusCode, body: &T) -> Response {
    let (code, mut bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (code, bytes),
        Err(e) => {
            error!(error = %e, "failed to encode response envelope");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"status":"Internal server error"}"#.to_vec(),
            )
        }
    };
    bytes.push(b'\n');

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = code;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(META_MEDIA_TYPE));
    response
}
