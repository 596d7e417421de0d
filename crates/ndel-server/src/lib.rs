//! HTTP server for ndel.
//!
//! Accepts multipart uploads under `/objects/{oid}`, streams them into the
//! blob store, records metadata once the content is verified, and serves
//! either the raw bytes or a JSON envelope depending on the `Accept` header.

pub mod config;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod negotiate;
pub mod request_id;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use envelope::{ObjectListing, ResponseData};
pub use error::{ServerError, ServerResult};
pub use negotiate::{Representation, META_MEDIA_TYPE};
pub use request_id::RequestId;
pub use server::NdelServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use ndel_meta::{InMemoryMetaIndex, MetaError, MetaIndex, MetaResult};
    use ndel_store::{byte_stream, BlobStore, InMemoryBlobStore};
    use ndel_types::{ObjectMeta, Oid};
    use serde_json::Value;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "ndel-test-boundary";

    struct Harness {
        app: Router,
        blobs: Arc<InMemoryBlobStore>,
        index: Arc<InMemoryMetaIndex>,
    }

    fn harness() -> Harness {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let index = Arc::new(InMemoryMetaIndex::new());
        let server = NdelServer::with_stores(
            ServerConfig::default(),
            blobs.clone(),
            index.clone(),
        );
        Harness {
            app: server.router(),
            blobs,
            index,
        }
    }

    fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(oid: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(format!("/objects/{oid}"))
            .header(ACCEPT, META_MEDIA_TYPE)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart(&[("file", Some(file_name), data)])))
            .unwrap()
    }

    fn get(uri: &str, accept: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn root_requires_meta_accept() {
        let h = harness();
        let response = send(&h.app, get("/", Some(META_MEDIA_TYPE))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], META_MEDIA_TYPE);
        assert!(response.headers().contains_key(request_id::REQUEST_ID_HEADER));
        assert_eq!(body_json(response).await["status"], "OK");

        let response = send(&h.app, get("/", Some("text/html"))).await;
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(body_json(response).await["status"], "Not Acceptable");
    }

    #[tokio::test]
    async fn empty_listing_and_alias() {
        let h = harness();
        for uri in ["/objects", "/objects/"] {
            let response = send(&h.app, get(uri, Some(META_MEDIA_TYPE))).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_bytes(response).await, b"{\"objects\":[]}\n");
        }
    }

    #[tokio::test]
    async fn upload_then_fetch_content_and_meta() {
        let h = harness();
        let data = b"The quick brown fox jumps over a lazy dog.";
        assert_eq!(data.len(), 42);
        let oid = Oid::from_content(data);

        let response = send(&h.app, upload(oid.as_str(), "fox.txt", data)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "Created");
        assert_eq!(json["oid"], oid.as_str());
        assert_eq!(json["meta"]["size"], 42);
        assert_eq!(json["meta"]["filename"], "fox.txt");
        assert_eq!(json["meta"]["content-type"], "text/plain; charset=utf-8");

        let uri = format!("/objects/{oid}");
        let response = send(&h.app, get(&uri, Some("*/*"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "inline; filename=fox.txt"
        );
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_bytes(response).await, data);

        let response = send(&h.app, get(&uri, Some(META_MEDIA_TYPE))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "OK");
        assert_eq!(json["meta"]["size"], 42);
    }

    #[tokio::test]
    async fn duplicate_upload_keeps_first_record() {
        let h = harness();
        let data = b"duplicate me";
        let oid = Oid::from_content(data);

        let response = send(&h.app, upload(oid.as_str(), "first.bin", data)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let first = h.index.get(&oid).unwrap();

        let response = send(&h.app, upload(oid.as_str(), "second.bin", data)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "Already Exists");
        assert_eq!(json["meta"]["filename"], "first.bin");
        assert_eq!(h.index.get(&oid).unwrap(), first);
        assert_eq!(h.blobs.len(), 1);
    }

    #[tokio::test]
    async fn mismatched_content_is_rejected() {
        let h = harness();
        let oid = Oid::from_content(b"declared content");

        let response = send(&h.app, upload(oid.as_str(), "x.bin", b"other content")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["status"],
            "Content hash does not match OID"
        );
        assert!(!h.blobs.exists(&oid).await.unwrap());
        assert!(h.index.is_empty());

        let response = send(&h.app, get(&format!("/objects/{oid}"), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_object_is_not_found() {
        let h = harness();
        let oid = Oid::from_content(b"never uploaded");
        for accept in [None, Some(META_MEDIA_TYPE)] {
            let response = send(&h.app, get(&format!("/objects/{oid}"), accept)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                body_bytes(response).await,
                b"{\"status\":\"Object not found\"}\n"
            );
        }

        let response = send(&h.app, get("/objects/not-a-hash", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_rejects_invalid_oid() {
        let h = harness();
        let response = send(&h.app, upload("abc123", "a.txt", b"abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["status"], "Invalid object id");
    }

    #[tokio::test]
    async fn upload_without_file_part() {
        let h = harness();
        let oid = Oid::from_content(b"payload");
        let req = Request::builder()
            .method(Method::PUT)
            .uri(format!("/objects/{oid}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart(&[("comment", None, b"just a field")])))
            .unwrap();
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["status"],
            "No file parts found in request"
        );
        assert!(h.blobs.is_empty());
    }

    #[tokio::test]
    async fn form_fields_before_file_are_skipped() {
        let h = harness();
        let data = b"%PDF-1.4 tiny";
        let oid = Oid::from_content(data);
        let req = Request::builder()
            .method(Method::PUT)
            .uri(format!("/objects/{oid}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart(&[
                ("comment", None, b"ignored"),
                ("file", Some("doc.pdf"), data),
            ])))
            .unwrap();
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["meta"]["content-type"], "application/pdf");
        assert_eq!(json["meta"]["filename"], "doc.pdf");
    }

    #[tokio::test]
    async fn non_multipart_upload_is_malformed() {
        let h = harness();
        let oid = Oid::from_content(b"raw");
        let req = Request::builder()
            .method(Method::PUT)
            .uri(format!("/objects/{oid}"))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(&b"raw"[..]))
            .unwrap();
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["status"], "Malformed upload request");
    }

    #[tokio::test]
    async fn upload_with_html_accept_is_not_acceptable() {
        let h = harness();
        let data = b"html accept";
        let oid = Oid::from_content(data);
        let mut req = upload(oid.as_str(), "a.txt", data);
        req.headers_mut()
            .insert(ACCEPT, "text/html".parse().unwrap());
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert!(h.blobs.is_empty());
    }

    #[tokio::test]
    async fn head_sends_headers_without_body() {
        let h = harness();
        let data = b"head request body";
        let oid = Oid::from_content(data);
        send(&h.app, upload(oid.as_str(), "head.txt", data)).await;

        let req = Request::builder()
            .method(Method::HEAD)
            .uri(format!("/objects/{oid}"))
            .body(Body::empty())
            .unwrap();
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_LENGTH],
            data.len().to_string().as_str()
        );
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "inline; filename=head.txt"
        );
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn head_with_meta_accept_sends_envelope_headers() {
        let h = harness();
        let data = b"hello";
        let oid = Oid::from_content(data);
        send(&h.app, upload(oid.as_str(), "h.txt", data)).await;

        let req = Request::builder()
            .method(Method::HEAD)
            .uri(format!("/objects/{oid}"))
            .header(ACCEPT, META_MEDIA_TYPE)
            .body(Body::empty())
            .unwrap();
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], META_MEDIA_TYPE);
        assert!(!response.headers().contains_key(CONTENT_DISPOSITION));
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn empty_file_name_is_a_form_field() {
        let h = harness();
        let data = b"hello world";
        let oid = Oid::from_content(data);
        let req = Request::builder()
            .method(Method::PUT)
            .uri(format!("/objects/{oid}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart(&[("file", Some(""), data)])))
            .unwrap();
        let response = send(&h.app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["status"],
            "No file parts found in request"
        );
        assert!(h.blobs.is_empty());
        assert!(h.index.is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let state = AppState::new(blobs.clone(), Arc::new(InMemoryMetaIndex::new()));
        let app = router::build_router(state, 64);

        let data = vec![b'x'; 4096];
        let oid = Oid::from_content(&data);
        let response = send(&app, upload(oid.as_str(), "big.txt", &data)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["status"], "Upload exceeds size limit");
        assert!(blobs.is_empty());
    }

    /// Index whose every read fails as if its table were gone.
    struct BrokenIndex;

    impl MetaIndex for BrokenIndex {
        fn get(&self, _oid: &Oid) -> MetaResult<ObjectMeta> {
            Err(MetaError::BucketMissing)
        }

        fn put(&self, _oid: &Oid, _meta: &ObjectMeta) -> MetaResult<()> {
            Err(MetaError::BucketMissing)
        }

        fn keys(&self) -> MetaResult<Vec<Oid>> {
            Err(MetaError::BucketMissing)
        }

        fn objects(&self) -> MetaResult<Vec<ObjectMeta>> {
            Err(MetaError::BucketMissing)
        }
    }

    #[tokio::test]
    async fn listing_failure_yields_empty_list() {
        let server = NdelServer::with_stores(
            ServerConfig::default(),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(BrokenIndex),
        );
        let response = send(&server.router(), get("/objects", Some(META_MEDIA_TYPE))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"{\"objects\":[]}\n");

        let oid = Oid::from_content(b"anything");
        let response = send(&server.router(), get(&format!("/objects/{oid}"), None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["status"], "Metadata index failure");
    }

    #[tokio::test]
    async fn listing_includes_each_object_once() {
        let h = harness();
        let mut expected = Vec::new();
        for data in [&b"one"[..], b"two", b"three"] {
            let oid = Oid::from_content(data);
            send(&h.app, upload(oid.as_str(), "f", data)).await;
            send(&h.app, upload(oid.as_str(), "f", data)).await;
            expected.push(oid.to_string());
        }
        expected.sort();

        let response = send(&h.app, get("/objects", Some(META_MEDIA_TYPE))).await;
        let json = body_json(response).await;
        let mut listed: Vec<String> = json["objects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        listed.sort();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn blob_without_metadata_is_reingested() {
        let h = harness();
        let data = b"orphaned blob";
        let oid = Oid::from_content(data);
        h.blobs.put(&oid, byte_stream(&data[..])).await.unwrap();

        let response = send(&h.app, upload(oid.as_str(), "orphan.txt", data)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(h.index.get(&oid).unwrap().file_name, "orphan.txt");
    }

    #[tokio::test]
    async fn filesystem_stores_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_path: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let app = NdelServer::open(&config).await.unwrap().router();

        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let oid = Oid::from_content(&data);
        let response = send(&app, upload(oid.as_str(), "big.bin", &data)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(config.objects_dir().join(oid.as_str()).is_file());

        let response = send(&app, get(&format!("/objects/{oid}"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(body_bytes(response).await, data);

        let response = send(&app, get("/objects", Some(META_MEDIA_TYPE))).await;
        assert_eq!(body_json(response).await["objects"][0], oid.as_str());
    }
}
