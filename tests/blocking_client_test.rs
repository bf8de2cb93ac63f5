use std::io::Cursor;

use bytes::Bytes;
use hybrid_http::prelude::*;
use mockito::{Matcher, Mock, Server};
use serde_json::json;

const CONTENT: &[u8] = b"aaaaaaaaaabbbbbbbbbbccccc";

fn config(server: &Server) -> ClientConfig {
    ClientConfig::builder()
        .base_url(format!("{}/api/v1/", server.url()))
        .token("abc123")
        .require_https(false)
        .backoff(0.001, 2)
        .upload_options(
            UploadOptions::new()
                .with_chunk_size(10)
                .with_presigned_url_batch_size(2),
        )
        .build()
}

/// Mocks for a complete three-part upload of `CONTENT`.
fn mount_upload(server: &mut Server) -> Vec<Mock> {
    let storage = format!("{}/storage", server.url());
    let mut mocks = vec![
        server
            .mock("POST", "/api/v1/uploads/")
            .match_header("authorization", "BEARER abc123")
            .match_body(Matcher::Json(json!({"filename": "scan.mha"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({"id": 7, "upload_id": "mp-1"}).to_string())
            .create(),
    ];
    for batch in [vec![1, 2], vec![3]] {
        let urls: serde_json::Map<_, _> = batch
            .iter()
            .map(|n| (n.to_string(), json!(format!("{storage}/part-{n}"))))
            .collect();
        mocks.push(
            server
                .mock("PATCH", "/api/v1/uploads/7/mp-1/generate-presigned-urls/")
                .match_body(Matcher::Json(json!({"part_numbers": batch})))
                .with_header("content-type", "application/json")
                .with_body(json!({"presigned_urls": urls}).to_string())
                .create(),
        );
    }
    for n in 1..=3 {
        mocks.push(
            server
                .mock("PUT", format!("/storage/part-{n}").as_str())
                .match_header("authorization", Matcher::Missing)
                .with_header("etag", &format!("\"e{n}\""))
                .create(),
        );
    }
    mocks.push(
        server
            .mock("PATCH", "/api/v1/uploads/7/mp-1/complete-multipart-upload/")
            .match_body(Matcher::Json(json!({"parts": [
                {"ETag": "\"e1\"", "PartNumber": 1},
                {"ETag": "\"e2\"", "PartNumber": 2},
                {"ETag": "\"e3\"", "PartNumber": 3},
            ]})))
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 7, "status": "Completed"}"#)
            .create(),
    );
    mocks
}

#[test]
fn blocking_client_uploads_in_parts() {
    let mut server = Server::new();
    let mocks = mount_upload(&mut server);

    let client = BlockingClient::new(config(&server)).unwrap();
    let result = client
        .upload_fileobj(Cursor::new(CONTENT.to_vec()), "scan.mha")
        .unwrap();
    assert_eq!(result, Value::Json(json!({"id": 7, "status": "Completed"})));
    for mock in mocks {
        mock.assert();
    }
}

#[test]
fn blocking_client_uploads_files() {
    let mut server = Server::new();
    let mocks = mount_upload(&mut server);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("scan.mha");
    std::fs::write(&file, CONTENT).unwrap();

    let client = BlockingClient::new(config(&server)).unwrap();
    client.upload_file(&file).unwrap();
    for mock in mocks {
        mock.assert();
    }
}

#[test]
fn retriable_part_failures_are_retried() {
    let mut server = Server::new();
    let storage = format!("{}/storage/part-1", server.url());
    let create = server
        .mock("POST", "/api/v1/uploads/")
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "u", "upload_id": "m"}"#)
        .create();
    let urls = server
        .mock("PATCH", "/api/v1/uploads/u/m/generate-presigned-urls/")
        .with_header("content-type", "application/json")
        .with_body(json!({"presigned_urls": {"1": storage}}).to_string())
        .create();
    let busy = server
        .mock("PUT", "/storage/part-1")
        .with_status(409)
        .expect(1)
        .create();
    let stored = server
        .mock("PUT", "/storage/part-1")
        .with_header("etag", "\"ok\"")
        .create();
    let complete = server
        .mock("PATCH", "/api/v1/uploads/u/m/complete-multipart-upload/")
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create();

    let client = BlockingClient::new(config(&server)).unwrap();
    let started = std::time::Instant::now();
    client
        .upload_fileobj(Cursor::new(b"tiny".to_vec()), "tiny.txt")
        .unwrap();
    assert!(started.elapsed() >= std::time::Duration::from_secs(1));

    for mock in [create, urls, busy, stored, complete] {
        mock.assert();
    }
}

#[test]
fn sync_adapter_runs_async_calls() {
    let mut server = Server::new();
    let mocks = mount_upload(&mut server);
    let listing = server
        .mock("GET", "/api/v1/algorithms/")
        .match_query(Matcher::UrlEncoded("limit".into(), "1".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": [{"slug": "a"}]}"#)
        .create();

    let adapter = Client::new(config(&server)).unwrap().into_sync().unwrap();

    let algorithms = adapter
        .call(|client| async move {
            client
                .request(ApiRequest::get("algorithms/").param("limit", "1"))
                .await
        })
        .unwrap();
    assert_eq!(algorithms, Value::Json(json!({"results": [{"slug": "a"}]})));
    listing.assert();

    let result = adapter
        .call(|client| async move {
            client
                .upload_fileobj(Cursor::new(CONTENT.to_vec()), "scan.mha")
                .await
        })
        .unwrap();
    assert_eq!(result.get_attr("status").unwrap().as_str(), Some("Completed"));
    for mock in mocks {
        mock.assert();
    }
}

#[test]
fn sync_adapter_iterates_download_streams() {
    let mut server = Server::new();
    let body = vec![b'x'; 64 * 1024];
    let download = server
        .mock("GET", "/api/v1/files/blob/")
        .with_body(body.clone())
        .create();
    let missing = server.mock("GET", "/api/v1/files/missing/").with_status(404).create();

    let adapter = Client::new(config(&server)).unwrap().into_sync().unwrap();
    let url = format!("{}/api/v1/files/blob/", server.url());
    let chunks: Vec<Bytes> = adapter
        .iter(|client| client.download_stream(&url))
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(chunks.concat(), body);
    download.assert();

    let url = format!("{}/api/v1/files/missing/", server.url());
    let mut stream = adapter.iter(|client| client.download_stream(&url)).unwrap();
    let err = stream.next().unwrap().unwrap_err();
    assert_eq!(err.status_code(), Some(404));
    assert!(stream.next().is_none());
    missing.assert();
}

#[tokio::test]
async fn sync_facades_refuse_to_run_inside_a_runtime() {
    let config = ClientConfig::builder().token("abc").build();
    assert!(matches!(
        BlockingClient::new(config.clone()),
        Err(ClientError::NestedRuntime)
    ));
    let client = Client::new(config).unwrap();
    assert!(matches!(client.into_sync(), Err(ClientError::NestedRuntime)));
}
