//! `Accept`-header content negotiation.
//!
//! A request whose primary `Accept` media type is [`META_MEDIA_TYPE`] asks
//! for the JSON envelope; anything else asks for raw object bytes, so a
//! browser opening an object URL gets the content inline.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Reserved media type selecting the metadata representation.
pub const META_MEDIA_TYPE: &str = "application/vnd.ndel+json";

/// Representation a request asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Representation {
    /// JSON envelope.
    Meta,
    /// Raw object bytes.
    Content,
}

impl Representation {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match primary_accept(headers) {
            Some(mt) if mt.eq_ignore_ascii_case(META_MEDIA_TYPE) => Self::Meta,
            _ => Self::Content,
        }
    }

    pub fn is_meta(self) -> bool {
        self == Self::Meta
    }
}

/// Uploads accept the metadata type or no `Accept` header at all.
pub fn accepts_upload(headers: &HeaderMap) -> bool {
    match primary_accept(headers) {
        None | Some("") => true,
        Some(mt) => mt.eq_ignore_ascii_case(META_MEDIA_TYPE),
    }
}

/// Text before the first `;` of the `Accept` header, trimmed.
fn primary_accept(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(ACCEPT)?.to_str().ok()?;
    value.split(';').next().map(str::trim)
}

#[async_trait]
impl<S> FromRequestParts<S> for Representation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
