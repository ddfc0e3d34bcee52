use super::*;

#[tokio::test]
async fn fake_returns_configured_token() {
    let client = FakeIdentityRuntimeClient::returning("tok_123");
    assert_eq!(client.get_access_token().await.unwrap(), "tok_123");
}

#[tokio::test]
async fn fake_failure_surfaces_as_decode_error() {
    let client = FakeIdentityRuntimeClient::failing("sidecar unavailable");
    let err = client.get_access_token().await.unwrap_err();
    assert!(matches!(err, IdentityRuntimeError::Decode(_)));
}

#[tokio::test]
async fn connect_failure_on_missing_socket_is_reported() {
    let client = SocketIdentityRuntimeClient::new(
        std::path::PathBuf::from("/nonexistent/idp-sync-test.sock"),
        std::time::Duration::from_millis(200),
    );
    let err = client.get_access_token().await.unwrap_err();
    assert!(matches!(err, IdentityRuntimeError::Connect(_, _)));
}
