use std::io;

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use ndel_store::{ByteStream, StoreError, OCTET_STREAM};
use ndel_types::{ObjectMeta, Oid};
use tracing::{debug, info, warn};

use crate::envelope::{ObjectListing, ResponseData};
use crate::error::{ServerError, ServerResult};
use crate::negotiate::{accepts_upload, Representation};
use crate::state::AppState;

/// `GET /`: liveness envelope.
pub async fn root(rep: Representation) -> ServerResult<ResponseData> {
    if !rep.is_meta() {
        return Err(ServerError::NotAcceptable);
    }
    Ok(ResponseData::status(StatusCode::OK, "OK"))
}

/// `GET /objects`: every indexed id. Index failures yield an empty list.
pub async fn list_objects(
    State(state): State<AppState>,
    rep: Representation,
) -> ServerResult<ObjectListing> {
    if !rep.is_meta() {
        return Err(ServerError::NotAcceptable);
    }
    let objects = match state.indexed_oids().await {
        Ok(oids) => oids,
        Err(e) => {
            warn!(error = %e, "object listing failed; returning empty list");
            Vec::new()
        }
    };
    Ok(ObjectListing { objects })
}

/// `GET /objects/:oid`: metadata envelope or raw bytes, by `Accept`.
pub async fn get_object(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    rep: Representation,
) -> ServerResult<Response> {
    let oid = lookup_oid(raw)?;
    let meta = state.lookup_meta(oid.clone()).await?;

    if rep.is_meta() {
        return Ok(ResponseData::object(StatusCode::OK, "OK", oid, meta).into_response());
    }

    let stream = state.blobs.get(&oid, 0).await?;
    debug!(oid = %oid, size = meta.length, "streaming object");
    Ok(content_response(&meta, Body::from_stream(stream)))
}

/// `HEAD /objects/:oid`: the headers GET would send, without a body. The
/// blob itself is never opened.
pub async fn head_object(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    rep: Representation,
) -> ServerResult<Response> {
    let oid = lookup_oid(raw)?;
    let meta = state.lookup_meta(oid.clone()).await?;

    if rep.is_meta() {
        let (parts, _) = ResponseData::object(StatusCode::OK, "OK", oid, meta)
            .into_response()
            .into_parts();
        return Ok(Response::from_parts(parts, Body::empty()));
    }

    if !state.blobs.exists(&oid).await? {
        return Err(ServerError::NotFound(oid.to_string()));
    }
    Ok(content_response(&meta, Body::empty()))
}

/// `PUT /objects/:oid`: ingest the first file part of a multipart body.
pub async fn put_object(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    req: Request,
) -> ServerResult<ResponseData> {
    if !accepts_upload(req.headers()) {
        return Err(ServerError::NotAcceptable);
    }
    let oid = Oid::parse(&raw)?;

    if state.blobs.exists(&oid).await? {
        match state.lookup_meta(oid.clone()).await {
            Ok(meta) => {
                drain(req.into_body()).await;
                debug!(oid = %oid, "upload of existing object ignored");
                return Ok(ResponseData::object(StatusCode::OK, "Already Exists", oid, meta));
            }
            Err(ServerError::Meta(e)) if e.is_not_found() => {
                debug!(oid = %oid, "blob present without metadata; re-ingesting");
            }
            Err(e) => return Err(e),
        }
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| ServerError::Malformed(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        // An empty file name marks a form field, same as a missing one.
        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
        else {
            let name = field.name().unwrap_or_default().to_owned();
            let value = field.bytes().await.map_err(|e| multipart_error(&e))?;
            debug!(field = %name, len = value.len(), "discarding form field");
            continue;
        };
        debug!(
            oid = %oid,
            file_name = %file_name,
            declared_type = field.content_type().unwrap_or("-"),
            "receiving file part"
        );

        let body: ByteStream<'_> = Box::pin(field.map(|chunk| chunk.map_err(io::Error::other)));
        let written = state.blobs.put(&oid, body).await.map_err(upload_error)?;

        let content_type = state.blobs.detect_content_type(&oid).await;
        let length = i64::try_from(written).unwrap_or(i64::MAX);
        let created = chrono::Utc::now().timestamp();
        state
            .record_meta(oid.clone(), ObjectMeta::new(file_name, content_type, length, created))
            .await?;

        // A concurrent upload may have recorded first; report what is stored.
        let meta = state.lookup_meta(oid.clone()).await?;
        info!(oid = %oid, size = meta.length, content_type = %meta.content_type, "object created");
        return Ok(ResponseData::object(StatusCode::CREATED, "Created", oid, meta));
    }

    Err(ServerError::NoFileParts)
}

/// Multipart failures are the client's: an oversized body or a bad encoding.
fn multipart_error(e: &MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge
    } else {
        ServerError::Malformed(e.body_text())
    }
}

/// Separate upload stream failures from storage failures.
fn upload_error(e: StoreError) -> ServerError {
    if let StoreError::Io(io_err) = &e {
        let source = io_err.get_ref().and_then(|inner| inner.downcast_ref::<MultipartError>());
        if let Some(source) = source {
            return multipart_error(source);
        }
    }
    ServerError::Store(e)
}

/// Ids that cannot exist are reported as missing on reads.
fn lookup_oid(raw: String) -> ServerResult<Oid> {
    Oid::parse(&raw).map_err(|_| ServerError::NotFound(raw))
}

fn content_response(meta: &ObjectMeta, body: Body) -> Response {
    let content_type = HeaderValue::from_str(&meta.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    let disposition = HeaderValue::from_str(&format!("inline; filename={}", meta.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.length.max(0)));
    response
}

/// Read and discard the rest of a request body.
async fn drain(body: Body) {
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        if let Err(e) = chunk {
            debug!(error = %e, "request body ended early while draining");
            break;
        }
    }
}
