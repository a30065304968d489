//! Integration tests for the REST client
//!
//! Each test starts a throwaway HTTP/1.1 responder on a loopback port that
//! replays canned responses in order and records the requests it saw.

use bvision_api::*;
use bvision_core::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct SeenRequest {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

impl SeenRequest {
    fn header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.headers
            .iter()
            .find(|h| h.to_ascii_lowercase().starts_with(&prefix))
            .map(|h| h[prefix.len()..].trim().to_string())
    }
}

struct CannedServer {
    base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

async fn start_canned_server(responses: Vec<(u16, &str)>) -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let queue: Arc<Mutex<VecDeque<(u16, String)>>> = Arc::new(Mutex::new(
        responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect(),
    ));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_by_server = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break None;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&buf) {
                    break Some(end);
                }
            };
            let Some(header_end) = header_end else { continue };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
            let request_line = lines.next().unwrap_or_default().to_string();
            let headers: Vec<String> = lines.map(str::to_string).collect();
            let content_length = headers
                .iter()
                .find_map(|h| {
                    let lower = h.to_ascii_lowercase();
                    lower
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                })
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
            seen_by_server.lock().await.push(SeenRequest {
                request_line,
                headers,
                body,
            });

            let (status, body) = queue
                .lock()
                .await
                .pop_front()
                .unwrap_or((500, "no canned response".to_string()));
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        }
    });

    CannedServer {
        base_url: format!("http://{}/api", addr),
        seen,
    }
}

#[tokio::test]
async fn test_list_devices() {
    let server = start_canned_server(vec![(
        200,
        r#"[{"id":"d-1","key":"cam-1","name":"Gate","lastHeartbeat":"2024-01-01T12:00:00Z"}]"#,
    )])
    .await;
    let client = ApiClient::new(&server.base_url).unwrap();

    let devices = client.devices().list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].signaling_key(), "cam-1");

    let seen = server.seen.lock().await;
    assert_eq!(seen[0].request_line, "GET /api/devices HTTP/1.1");
    assert!(seen[0].header("authorization").is_none());
}

#[tokio::test]
async fn test_counts_and_lookup() {
    let server = start_canned_server(vec![
        (200, r#"{"count":42}"#),
        (200, r#"{"id":"d-9","name":"Yard"}"#),
        (200, r#"{"count":7}"#),
    ])
    .await;
    let client = ApiClient::new(&server.base_url).unwrap();

    assert_eq!(client.devices().count_devices().await.unwrap(), 42);
    assert_eq!(client.devices().device("d-9").await.unwrap().name, "Yard");
    assert_eq!(client.recordings().count_recordings().await.unwrap(), 7);

    let seen = server.seen.lock().await;
    assert_eq!(seen[0].request_line, "GET /api/devices/count HTTP/1.1");
    assert_eq!(seen[1].request_line, "GET /api/devices/d-9 HTTP/1.1");
    assert_eq!(seen[2].request_line, "GET /api/recordings/count HTTP/1.1");
}

#[tokio::test]
async fn test_sign_in_attaches_bearer_token() {
    let server = start_canned_server(vec![
        (
            200,
            r#"{"accessToken":"at-1","refreshToken":"rt-1","user":{"id":"u-1","email":"ops@example.com","username":"ops"}}"#,
        ),
        (200, "[]"),
        (200, ""),
        (200, "[]"),
    ])
    .await;
    let client = ApiClient::new(&server.base_url).unwrap();
    let users = client.users();

    let res = users
        .sign_in(&SignInReq {
            username: "ops".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(res.user.username, "ops");
    assert_eq!(client.access_token().as_deref(), Some("at-1"));

    users.list().await.unwrap();
    users.logout().await.unwrap();
    assert!(client.access_token().is_none());
    client.sites().list().await.unwrap();

    let seen = server.seen.lock().await;
    assert_eq!(seen[0].request_line, "POST /api/auth/signin HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["username"], "ops");
    assert_eq!(seen[1].header("authorization").as_deref(), Some("Bearer at-1"));
    assert_eq!(seen[2].request_line, "GET /api/auth/logout HTTP/1.1");
    assert!(seen[3].header("authorization").is_none());
}

#[tokio::test]
async fn test_recordings_query_string() {
    let server = start_canned_server(vec![(200, "[]")]).await;
    let client = ApiClient::new(&server.base_url).unwrap();

    let query = RecordingQuery {
        page: 2,
        limit: 10,
        devices: vec!["Lobby".to_string(), "Gate".to_string()],
        date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
    };
    let page = client.recordings().list_recordings(&query).await.unwrap();
    assert!(page.is_empty());

    let seen = server.seen.lock().await;
    assert_eq!(
        seen[0].request_line,
        "GET /api/recordings?page=2&limit=10&devices=Lobby&devices=Gate&date=2024-01-01 HTTP/1.1"
    );
}

#[tokio::test]
async fn test_entity_gateway_dispatch() {
    let server = start_canned_server(vec![
        (201, r#"{"id":"s-1","name":"Depot","address":"1 Main St"}"#),
        (200, r#"{"id":"u-1","username":"ops","email":"ops@example.com"}"#),
        (204, ""),
    ])
    .await;
    let client = ApiClient::new(&server.base_url).unwrap();

    let site = EntityGateway::create(
        &client,
        &EntityPayload::Site(SitePayload {
            name: "Depot".to_string(),
            address: Some("1 Main St".to_string()),
            description: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(site.id(), "s-1");

    let user = EntityGateway::update(
        &client,
        "u-1",
        &EntityPayload::User(UserPayload {
            username: "ops".to_string(),
            email: "ops@example.com".to_string(),
            password: None,
            role: None,
        }),
    )
    .await
    .unwrap();
    assert!(matches!(user, EntityRecord::User(_)));

    EntityGateway::delete(&client, EntityKind::Group, "g-3")
        .await
        .unwrap();

    let seen = server.seen.lock().await;
    assert_eq!(seen[0].request_line, "POST /api/sites HTTP/1.1");
    assert_eq!(seen[1].request_line, "PATCH /api/users/u-1 HTTP/1.1");
    assert!(!seen[1].body.contains("password"));
    assert_eq!(seen[2].request_line, "DELETE /api/groups/g-3 HTTP/1.1");
}

#[tokio::test]
async fn test_ids_stay_inside_their_segment() {
    let server = start_canned_server(vec![
        (200, r#"{"id":"a/b?c#d","name":"Odd"}"#),
        (204, ""),
    ])
    .await;
    let client = ApiClient::new(&server.base_url).unwrap();

    assert_eq!(client.devices().device("a/b?c#d").await.unwrap().name, "Odd");
    client.roles().delete("../users").await.unwrap();

    let seen = server.seen.lock().await;
    assert_eq!(seen[0].request_line, "GET /api/devices/a%2Fb%3Fc%23d HTTP/1.1");
    assert_eq!(seen[1].request_line, "DELETE /api/roles/..%2Fusers HTTP/1.1");
}

#[tokio::test]
async fn test_error_status_maps_to_api_error() {
    let server = start_canned_server(vec![(404, r#"{"message":"no such role"}"#)]).await;
    let client = ApiClient::new(&server.base_url).unwrap();

    let err = tokio_test::assert_err!(client.roles().get("missing").await);
    match &err {
        BVisionError::Api { status, message, .. } => {
            assert_eq!(*status, 404);
            assert!(message.contains("no such role"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_malformed_body_is_invalid_message() {
    let server = start_canned_server(vec![(200, "{not json")]).await;
    let client = ApiClient::new(&server.base_url).unwrap();

    let err = client.permissions().list().await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_unreachable_backend_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{}/api", addr)).unwrap();
    let err = client.groups().list().await.unwrap_err();
    assert_eq!(err.error_code(), "HTTP_ERROR");
}

#[tokio::test]
async fn test_webrtc_relay_reply() {
    let server =
        start_canned_server(vec![(200, r#"{"success":false,"error":"hub offline"}"#)]).await;
    let client = ApiClient::new(&server.base_url).unwrap();

    let res = client
        .webrtc()
        .send_message(&serde_json::json!({ "topic": "hub/cam-1" }))
        .await
        .unwrap();
    assert!(!res.success);
    assert_eq!(res.error.as_deref(), Some("hub offline"));
}
