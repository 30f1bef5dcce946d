//! End-to-end transcoding through the shared port.

mod common;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use rpc_gateway::echo::EchoRequest;

const SHARED: &str = r#"
[server]
name = "gateway-test"
addr = "127.0.0.1:{port}"

[[gateway.header.removes]]
prefix = "x-request-"

[[gateway.header.outs]]
prefix = "x-request-"
rewrite = "grpc-metadata-x-request-"

[[gateway.header.outs]]
prefix = "x-forwarded-"

[[gateway.header.ins]]
prefix = "x-forwarded-"
rewrite = "echo-x-forwarded-"
"#;

fn shared(port: u16) -> rpc_gateway::AppConfig {
    common::config(&SHARED.replace("{port}", &port.to_string()))
}

#[tokio::test]
async fn transcoded_get_with_status_and_removal() {
    let running = common::start(shared(28301)).await;
    let addr = running.rpc_addr();

    let response = common::http_client()
        .get(format!("http://{addr}/v1/echo/42"))
        .header("content-type", "application/json")
        .header("grpc-metadata-echo-x-http-code", "201")
        .header("grpc-metadata-echo-x-request-id", "abc")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "abc");
    assert!(headers.get("grpc-metadata-x-request-id").is_none());
    assert!(headers.get("grpc-status").is_none());
    assert!(headers.get("x-http-code").is_none());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "42"}));

    running.shutdown().await;
}

#[tokio::test]
async fn unparseable_status_surfaces_error() {
    let running = common::start(shared(28302)).await;
    let addr = running.rpc_addr();

    let response = common::http_client()
        .get(format!("http://{addr}/v1/echo/hi"))
        .header("grpc-metadata-echo-x-http-code", "oops")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["grpc-status"], "0");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 13);

    running.shutdown().await;
}

#[tokio::test]
async fn post_body_and_rpc_error_mapping() {
    let running = common::start(shared(28303)).await;
    let addr = running.rpc_addr();
    let client = common::http_client();

    let ok = client
        .post(format!("http://{addr}/v1/echo"))
        .json(&json!({"message": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(ok.headers()["grpc-status"], "0");
    assert_eq!(ok.json::<Value>().await.unwrap(), json!({"message": "hello"}));

    let invalid = client
        .post(format!("http://{addr}/v1/echo"))
        .json(&json!({"message": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json::<Value>().await.unwrap()["code"], 3);

    running.shutdown().await;
}

#[tokio::test]
async fn incoming_and_outgoing_rules_round_trip() {
    let running = common::start(shared(28304)).await;
    let addr = running.rpc_addr();

    let response = common::http_client()
        .get(format!("http://{addr}/v1/echo/hi"))
        .header("X-Forwarded-For", "1.2.3.4")
        .header("X-Custom", "dropped")
        .header("grpc-metadata-echo-x-unlisted", "dropped")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-forwarded-for"], "1.2.3.4");
    assert!(headers.get("x-custom").is_none());
    // Rejected by the outgoing fallback matcher.
    assert!(headers.get("x-unlisted").is_none());
    assert!(headers.get("grpc-metadata-x-unlisted").is_none());

    running.shutdown().await;
}

#[tokio::test]
async fn rpc_passthrough_on_shared_port() {
    let running = common::start(shared(28305)).await;
    let mut client = common::rpc_client(running.rpc_addr()).await;

    let mut request = tonic::Request::new(EchoRequest {
        message: "direct".to_string(),
    });
    request
        .metadata_mut()
        .insert("echo-x-trace", "t1".parse().unwrap());

    let response = client.say(request).await.unwrap();
    assert_eq!(response.get_ref().message, "direct");
    assert_eq!(response.metadata().get("x-trace").unwrap(), "t1");

    let status = client
        .say(EchoRequest::default())
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);

    running.shutdown().await;
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let running = common::start(shared(28306)).await;
    let addr = running.rpc_addr();

    let response = common::http_client()
        .get(format!("http://{addr}/v1/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    running.shutdown().await;
}

#[tokio::test]
async fn h2c_upgrade_request_is_served_as_http1() {
    let running = common::start(shared(28307)).await;
    let mut stream = TcpStream::connect(running.rpc_addr()).await.unwrap();

    stream
        .write_all(
            b"GET /v1/echo/upgraded HTTP/1.1\r\n\
              Host: localhost\r\n\
              Connection: Upgrade, HTTP2-Settings\r\n\
              Upgrade: h2c\r\n\
              HTTP2-Settings: AAMAAABkAARAAAAAAAIAAAAA\r\n\
              \r\n",
        )
        .await
        .unwrap();

    // Read until the body arrives; the connection stays open.
    let mut response = Vec::new();
    let read = async {
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            response.extend_from_slice(&buf[..n]);
            if n == 0 || String::from_utf8_lossy(&response).contains(r#""upgraded""#) {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read).await.unwrap();

    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"message":"upgraded"}"#), "{response}");

    running.shutdown().await;
}

#[tokio::test]
async fn escaped_slash_handling_follows_unescape_mode() {
    let running = common::start(shared(28308)).await;
    let http = common::http_client();
    let addr = running.rpc_addr();

    // Legacy: decoded before routing, so the escaped slash splits the path.
    let split = http.get(format!("http://{addr}/v1/echo/a%2Fb")).send().await.unwrap();
    assert_eq!(split.status(), StatusCode::NOT_FOUND);
    let spaced = http.get(format!("http://{addr}/v1/echo/a%20b")).send().await.unwrap();
    assert_eq!(spaced.json::<Value>().await.unwrap()["message"], "a b");
    running.shutdown().await;

    let config = SHARED.replace("{port}", "28309") + "\n[gateway.unescape]\nmode = \"all-except-slash\"\n";
    let running = common::start(common::config(&config)).await;
    let addr = running.rpc_addr();

    let kept = http.get(format!("http://{addr}/v1/echo/a%2Fb%3Ac")).send().await.unwrap();
    assert_eq!(kept.status(), StatusCode::OK);
    assert_eq!(kept.json::<Value>().await.unwrap()["message"], "a%2Fb:c");

    running.shutdown().await;
}
