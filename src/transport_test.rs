use super::*;

#[test]
fn json_body_sets_content_type() {
    let resp = ApiResponse::json_body(StatusCode::OK, &serde_json::json!({ "ok": true }));
    assert!(resp.is_success());
    assert!(resp.is_json());
    assert_eq!(resp.content_type(), Some("application/json"));
    let value: serde_json::Value = resp.json().unwrap();
    assert_eq!(value["ok"], true);
}

#[test]
fn plain_response_is_not_json() {
    let resp = ApiResponse::new(StatusCode::BAD_GATEWAY, "<html>oops</html>");
    assert!(!resp.is_success());
    assert!(!resp.is_json());
    assert_eq!(resp.text(), "<html>oops</html>");
}

#[test]
fn json_decode_failure_maps_to_decode_error() {
    let resp = ApiResponse::new(StatusCode::OK, "not json");
    let err = resp.json::<serde_json::Value>().unwrap_err();
    assert!(matches!(err, SessionError::Decode(_)));
}

#[test]
fn reqwest_transport_builds_with_timeouts() {
    let mut config = ClientConfig::new("http://api.test");
    config.timeouts.request_secs = Some(3);
    config.timeouts.connect_secs = Some(1);
    assert!(ReqwestTransport::new(&config).is_ok());
}

#[tokio::test]
async fn reqwest_transport_reports_unreachable_host() {
    let transport = ReqwestTransport::new(&ClientConfig::new("http://127.0.0.1:1")).unwrap();
    let request = ApiRequest {
        method: Method::GET,
        url: "http://127.0.0.1:1/auth/verify".into(),
        headers: HeaderMap::new(),
        body: None,
    };
    let err = transport.send(request).await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
}
