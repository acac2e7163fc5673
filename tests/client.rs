use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use synup::api::{Credentials, FolderHandle, RemoteStore, SynapseClient};

fn credentials() -> Credentials {
    Credentials {
        user: "me".to_string(),
        password: "secret".to_string(),
    }
}

#[tokio::test]
async fn login_token_is_sent_on_later_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/login"))
        .and(body_json(json!({"username": "me", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionToken": "tok-1"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repo/v1/entity/syn123"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "syn123", "name": "proj"})),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let handle = tokio::task::spawn_blocking(move || {
        let mut client = SynapseClient::new(uri).unwrap();
        client.login(&credentials()).unwrap();
        client.get_project("syn123").unwrap()
    })
    .await
    .unwrap();

    assert_eq!(handle.id, "syn123");
}

#[tokio::test]
async fn login_failure_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let mut client = SynapseClient::new(uri).unwrap();
        client.login(&credentials()).unwrap_err()
    })
    .await
    .unwrap();

    let msg = err.to_string();
    assert!(msg.contains("401"), "unexpected error: {}", msg);
    assert!(msg.contains("bad credentials"), "unexpected error: {}", msg);
}

#[tokio::test]
async fn non_header_safe_session_token_is_an_error_not_a_panic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"sessionToken": "tok\nbroken"})),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let mut client = SynapseClient::new(uri).unwrap();
        client.login(&credentials()).unwrap();
        client.get_project("syn123").unwrap_err()
    })
    .await
    .unwrap();

    assert!(
        err.to_string().contains("not a valid header value"),
        "unexpected error: {}",
        err
    );
}

#[tokio::test]
async fn create_folder_posts_a_folder_entity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/repo/v1/entity"))
        .and(query_param("forceVersion", "false"))
        .and(body_json(json!({
            "name": "sub",
            "parentId": "syn123",
            "concreteType": "org.sagebionetworks.repo.model.Folder"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "syn456"})))
        .mount(&server)
        .await;

    let uri = server.uri();
    let handle = tokio::task::spawn_blocking(move || {
        let mut client = SynapseClient::new(uri).unwrap();
        client
            .create_folder("sub", &FolderHandle::new("syn123"))
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(handle.id, "syn456");
}

#[tokio::test]
async fn store_file_uploads_bytes_then_creates_the_entity() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/file/v1/file"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "fh-9"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repo/v1/entity"))
        .and(body_json(json!({
            "name": "a.txt",
            "parentId": "syn123",
            "concreteType": "org.sagebionetworks.repo.model.FileEntity",
            "dataFileHandleId": "fh-9"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "syn789"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("a.txt");
    std::fs::write(&file_path, b"hello").unwrap();

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let mut client = SynapseClient::new(uri).unwrap();
        client
            .store_file(&file_path, &FolderHandle::new("syn123"))
            .unwrap()
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn store_file_fails_when_the_upload_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/file/v1/file"))
        .respond_with(ResponseTemplate::new(507).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("a.txt");
    std::fs::write(&file_path, b"hello").unwrap();

    let uri = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let mut client = SynapseClient::new(uri).unwrap();
        client
            .store_file(&file_path, &FolderHandle::new("syn123"))
            .unwrap_err()
    })
    .await
    .unwrap();

    assert!(err.to_string().contains("quota exceeded"));
}
