use super::*;
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const TOKEN: &str = "id-token-abc";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(TOKEN)
}

async fn list_users(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "users": [
            {
                "accountId": "u1",
                "email": "one@example.com",
                "avatarUrl": "https://example.com/one.png",
                "lastAccessTimestampSeconds": 1500000000
            },
            {
                "accountId": "u2",
                "email": "two@example.com",
                "avatarUrl": null,
                "lastAccessTimestampSeconds": -1
            }
        ]
    })))
}

async fn user_status(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({ "totalUsers": 5, "totalConnectedUsers": 2 })))
}

async fn user_detail(
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if account_id != "user one" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "user": {
            "accountId": account_id,
            "email": "one@example.com",
            "lastAccessTimestampSeconds": 1500000100
        },
        "connectedDevices": 3
    })))
}

async fn spawn_backend(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    Url::parse(&format!("http://{addr}/api/v1/dashboard")).expect("base url")
}

async fn dashboard_backend() -> Url {
    spawn_backend(
        Router::new()
            .route("/api/v1/dashboard/users", get(list_users))
            .route("/api/v1/dashboard/userStatus", get(user_status))
            .route("/api/v1/dashboard/users/:account_id", get(user_detail)),
    )
    .await
}

#[tokio::test]
async fn lists_users_in_backend_order_with_raw_token_header() {
    let api = HttpDashboardApi::new(dashboard_backend().await);

    let users = api.list_users(TOKEN).await.expect("list users");

    let ids: Vec<_> = users.iter().map(|user| user.account_id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u2"]);
    assert!(users[0].has_avatar());
    assert!(users[1].last_access().is_none());
}

#[tokio::test]
async fn fetches_aggregate_status() {
    let api = HttpDashboardApi::new(dashboard_backend().await);

    let status = api.user_status(TOKEN).await.expect("status");

    assert_eq!(status.total_users, 5);
    assert_eq!(status.total_connected_users, 2);
    assert_eq!(status.total_connected_devices, 0);
}

#[tokio::test]
async fn fetches_detail_with_escaped_account_id() {
    let api = HttpDashboardApi::new(dashboard_backend().await);

    let detail = api
        .user_detail(TOKEN, &AccountId::from("user one"))
        .await
        .expect("detail");

    assert_eq!(detail.user.account_id.as_str(), "user one");
    assert_eq!(detail.connected_device_count, 3);
    assert!(detail.is_connected());
}

#[tokio::test]
async fn non_success_status_carries_status_and_reason() {
    let api = HttpDashboardApi::new(dashboard_backend().await);

    let err = api.list_users("wrong-token").await.expect_err("rejected");
    assert_eq!(err, ApiError::status(401, "Unauthorized"));
    assert_eq!(err.to_string(), "401 : Unauthorized");

    let err = api
        .user_detail(TOKEN, &AccountId::from("missing"))
        .await
        .expect_err("not found");
    assert_eq!(err, ApiError::status(404, "Not Found"));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let base = spawn_backend(Router::new().route(
        "/api/v1/dashboard/userStatus",
        get(|| async { "not json" }),
    ))
    .await;
    let api = HttpDashboardApi::new(base);

    let err = api.user_status(TOKEN).await.expect_err("decode failure");
    assert!(matches!(err, ApiError::Decode(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = HttpDashboardApi::new(
        Url::parse(&format!("http://{addr}/api/v1/dashboard")).expect("base url"),
    );

    let err = api.list_users(TOKEN).await.expect_err("connection refused");
    assert!(matches!(err, ApiError::Transport(_)), "unexpected error: {err:?}");
}

#[test]
fn endpoint_tolerates_trailing_slash_on_base() {
    let api = HttpDashboardApi::new(
        Url::parse("http://localhost:4567/api/v1/dashboard/").expect("base url"),
    );
    let url = api.endpoint(&["users", "a/b"]).expect("endpoint");
    assert_eq!(
        url.as_str(),
        "http://localhost:4567/api/v1/dashboard/users/a%2Fb"
    );
}

#[tokio::test]
async fn missing_api_fails_every_call() {
    let api = MissingDashboardApi;
    assert!(api.list_users(TOKEN).await.is_err());
    assert!(api.user_status(TOKEN).await.is_err());
    assert!(api
        .user_detail(TOKEN, &AccountId::from("u1"))
        .await
        .is_err());
}
