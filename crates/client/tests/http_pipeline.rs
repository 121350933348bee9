#![allow(clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use {
    mockito::{Matcher, Server, ServerGuard},
    serde_json::json,
    storefront_client::{ApiClient, AuthError, HttpTransport, SessionContext, endpoints},
    storefront_credentials::{CredentialPair, CredentialStore},
};

fn client_for(server: &ServerGuard, store: CredentialStore) -> ApiClient {
    let transport = HttpTransport::new(server.url(), Duration::from_secs(5)).unwrap();
    ApiClient::new(Arc::new(transport), Arc::new(SessionContext::new(store)))
}

fn signed_in(access: &str, refresh: &str) -> CredentialStore {
    let store = CredentialStore::in_memory();
    store.write(&CredentialPair::new(access, refresh)).unwrap();
    store
}

#[tokio::test]
async fn expired_access_is_renewed_over_http() {
    let mut server = Server::new_async().await;
    let expired = server
        .mock("GET", "/products/")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .with_body(r#"{"detail":"token expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let renewed = server
        .mock("GET", "/products/")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":1,"title":"Mug"}]"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/token/refresh/")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({ "refresh": "R1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A2"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server, signed_in("A1", "R1"));
    let products: serde_json::Value = client.get_json(endpoints::PRODUCTS).await.unwrap();

    assert_eq!(products[0]["title"], "Mug");
    let pair = client.store().read().unwrap();
    assert_eq!((pair.access(), pair.refresh()), ("A2", "R1"));
    expired.assert_async().await;
    renewed.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn server_error_is_returned_without_renewal() {
    let mut server = Server::new_async().await;
    let sales = server
        .mock("GET", "/sales/")
        .with_status(500)
        .with_body("down")
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/token/refresh/")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server, signed_in("A1", "R1"));
    let err = client.get(endpoints::SALES).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
    assert_eq!(err.body_text().as_deref(), Some("down"));
    assert!(client.is_authenticated());
    sales.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn anonymous_request_is_sent_bare_and_not_renewed() {
    let mut server = Server::new_async().await;
    let users = server
        .mock("GET", "/users/")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/token/refresh/")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    let err = client.get(endpoints::USERS).await.unwrap_err();

    assert!(err.is_unauthorized());
    users.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn rejected_renewal_signs_the_session_out() {
    let mut server = Server::new_async().await;
    let blogs = server
        .mock("GET", "/blogs-data/")
        .with_status(401)
        .with_body("expired")
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/token/refresh/")
        .with_status(401)
        .with_body(r#"{"detail":"refresh expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    let store = CredentialStore::open_file(path.clone());
    store.write(&CredentialPair::new("A1", "R1")).unwrap();

    let client = client_for(&server, store);
    let err = client.get(endpoints::BLOGS).await.unwrap_err();

    assert_eq!(err.body_text().as_deref(), Some("expired"));
    assert!(!client.is_authenticated());
    assert!(CredentialStore::open_file(path).read().is_none());
    blogs.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn sign_in_stores_the_issued_pair() {
    let mut server = Server::new_async().await;
    let sign_in = server
        .mock("POST", "/auth/sign-in/")
        .match_body(Matcher::Json(json!({ "email": "ada@shop.test", "password": "pw" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access":"A1","refresh":"R1","user":{"id":3,"email":"ada@shop.test","first_name":"Ada","last_name":"L","role":"customer","is_staff":false}}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    let user = client.sign_in("ada@shop.test", "pw").await.unwrap().unwrap();

    assert_eq!(user.first_name, "Ada");
    let pair = client.store().read().unwrap();
    assert_eq!((pair.access(), pair.refresh()), ("A1", "R1"));
    sign_in.assert_async().await;

    client.sign_out().unwrap();
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn sign_in_without_refresh_credential_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/sign-in/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A1"}"#)
        .create_async()
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    let err = client.sign_in("ada@shop.test", "pw").await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidTokenResponse));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn sign_in_with_unreadable_user_still_stores_the_pair() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/sign-in/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A1","refresh":"R1","user":["unexpected"]}"#)
        .create_async()
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    let user = client.sign_in("ada@shop.test", "pw").await.unwrap();

    assert!(user.is_none());
    let pair = client.store().read().unwrap();
    assert_eq!((pair.access(), pair.refresh()), ("A1", "R1"));
}
