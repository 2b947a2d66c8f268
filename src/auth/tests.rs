//! Tests for auth module
//!
//! These tests drive the auth flows end to end over an in-memory database and
//! the in-process revocation cache:
//! - Password login, OAuth login, refresh and logout
//! - OAuth account reconciliation and link upkeep
//! - The HTTP surface behind the access gate and throttler

#[cfg(test)]
mod tests {
    use super::super::models::OAuthLoginRequest;
    use super::super::revocation::UnavailableRevocationCache;
    use super::super::service::UNAUTHENTICATED_MESSAGE;
    use super::super::*;
    use crate::app::{build_router, build_state};
    use crate::common::migrations::create_schema;
    use crate::common::{ApiError, AppState, AuthConfig, INVALID_CREDENTIALS};
    use crate::services::{AuthEvent, RateLimitConfig};
    use crate::users::models::CreateUserRequest;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    const ALICE_PASSWORD: &str = "S3cure!pass";

    async fn test_state_with(rate_limit: RateLimitConfig) -> AppState {
        test_state_over(Arc::new(InMemoryRevocationCache::new()), rate_limit).await
    }

    async fn test_state_over(
        cache: Arc<dyn RevocationCache>,
        rate_limit: RateLimitConfig,
    ) -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();

        let config = AuthConfig {
            jwt_secret: "auth_test_secret".to_string(),
            bcrypt_cost: 4,
            ..AuthConfig::default()
        };
        build_state(pool, config, cache, rate_limit)
    }

    async fn test_state() -> AppState {
        test_state_with(RateLimitConfig::disabled()).await
    }

    async fn register_alice(state: &AppState) -> i64 {
        state
            .users_service
            .create_user(CreateUserRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: ALICE_PASSWORD.to_string(),
                firstname: None,
                lastname: None,
                photo: None,
            })
            .await
            .unwrap()
            .id
    }

    fn google_login(access_token: &str, profile: Value) -> OAuthLoginRequest {
        OAuthLoginRequest {
            provider: "google".to_string(),
            access_token: access_token.to_string(),
            refresh_token: None,
            profile: Some(profile),
        }
    }

    fn bob_profile() -> Value {
        json!({
            "id": "g-123",
            "displayName": "Bob",
            "emails": [{ "value": "bob@example.com" }]
        })
    }

    // ------------------------------------------------------------------
    // Orchestrator flows
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_issues_tokens_for_local_user() {
        let state = test_state().await;
        let alice_id = register_alice(&state).await;

        let response = state
            .auth_service
            .login("alice", ALICE_PASSWORD)
            .await
            .unwrap();

        assert_eq!(response.user.id, alice_id);
        assert_eq!(response.user.username, "alice");

        let access = state.token_service.verify_token(&response.access_token).unwrap();
        let refresh = state.token_service.verify_token(&response.refresh_token).unwrap();
        assert_eq!(access.sub, alice_id.to_string());
        assert_eq!(refresh.sub, access.sub);
        assert_ne!(access.jti, refresh.jti);
    }

    #[tokio::test]
    async fn test_login_tolerates_surrounding_whitespace() {
        let state = test_state().await;
        register_alice(&state).await;

        let padded = format!("  {} ", ALICE_PASSWORD);
        assert!(state.auth_service.login("alice", &padded).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let state = test_state().await;
        register_alice(&state).await;

        let wrong_password = state
            .auth_service
            .login("alice", "Wr0ng!pass")
            .await
            .unwrap_err();
        let unknown_user = state
            .auth_service
            .login("mallory", ALICE_PASSWORD)
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ApiError::InvalidCredentials));
        assert!(matches!(unknown_user, ApiError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert_eq!(state.metrics.get(AuthEvent::LoginFailure), 2);
        assert_eq!(state.metrics.get(AuthEvent::AuthRequest), 2);
    }

    #[tokio::test]
    async fn test_login_is_case_sensitive_on_username() {
        let state = test_state().await;
        register_alice(&state).await;

        let result = state.auth_service.login("Alice", ALICE_PASSWORD).await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_oauth_login_twice_reuses_account_and_link() {
        let state = test_state().await;

        let first = state
            .auth_service
            .oauth_login(google_login("T1", bob_profile()))
            .await
            .unwrap();
        let second = state
            .auth_service
            .oauth_login(google_login("T2", bob_profile()))
            .await
            .unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.email, "bob@example.com");

        let store = state.users_service.store();
        let links = store.oauth_links(first.user.id).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].provider, "google");
        assert_eq!(links[0].provider_id, "g-123");
        assert_eq!(links[0].access_token, "T2");

        let claims = state.token_service.verify_token(&second.access_token).unwrap();
        assert_eq!(claims.user_id(), Some(first.user.id));
    }

    #[tokio::test]
    async fn test_oauth_email_only_profile_is_stable_across_logins() {
        let state = test_state().await;
        let profile = json!({ "email": "bob@x.com" });

        let first = state
            .auth_service
            .oauth_login(google_login("T1", profile.clone()))
            .await
            .unwrap();
        let second = state
            .auth_service
            .oauth_login(google_login("T2", profile))
            .await
            .unwrap();

        assert_eq!(first.user.id, second.user.id);
        let links = state.users_service.store().oauth_links(first.user.id).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].access_token, "T2");
    }

    #[tokio::test]
    async fn test_oauth_login_matches_existing_password_account_by_email() {
        let state = test_state().await;
        let alice_id = register_alice(&state).await;

        let response = state
            .auth_service
            .oauth_login(google_login(
                "T1",
                json!({
                    "id": "g-alice",
                    "displayName": "Alice A.",
                    "emails": [{ "value": "alice@example.com" }]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.user.id, alice_id);
        assert_eq!(response.user.username, "alice");
    }

    #[tokio::test]
    async fn test_oauth_username_collision_is_disambiguated() {
        let state = test_state().await;
        state
            .users_service
            .create_user(CreateUserRequest {
                username: "Bob".to_string(),
                email: "another-bob@example.com".to_string(),
                password: ALICE_PASSWORD.to_string(),
                firstname: None,
                lastname: None,
                photo: None,
            })
            .await
            .unwrap();

        let response = state
            .auth_service
            .oauth_login(google_login("T1", bob_profile()))
            .await
            .unwrap();

        assert_eq!(response.user.username, "Bob_google_g-123");
        assert_eq!(response.user.email, "bob@example.com");
    }

    #[tokio::test]
    async fn test_oauth_profile_without_email_gets_placeholder() {
        let state = test_state().await;

        let response = state
            .auth_service
            .oauth_login(OAuthLoginRequest {
                provider: "facebook".to_string(),
                access_token: "F1".to_string(),
                refresh_token: Some("FR1".to_string()),
                profile: Some(json!({ "id": 4242, "name": "Dana" })),
            })
            .await
            .unwrap();

        assert_eq!(response.user.email, "facebook-4242@oauth.invalid");
        let link = state
            .users_service
            .store()
            .find_oauth_link(response.user.id, "facebook")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.refresh_token.as_deref(), Some("FR1"));
    }

    #[tokio::test]
    async fn test_oauth_missing_profile_is_unauthorized() {
        let state = test_state().await;

        let result = state
            .auth_service
            .oauth_login(OAuthLoginRequest {
                provider: "google".to_string(),
                access_token: "T1".to_string(),
                refresh_token: None,
                profile: None,
            })
            .await;

        match result {
            Err(ApiError::Unauthorized(msg)) => {
                assert_eq!(msg, "Profile data is missing or incomplete")
            }
            other => panic!("expected Unauthorized, got {:?}", other.map(|r| r.user)),
        }
        assert_eq!(state.metrics.get(AuthEvent::LoginFailure), 1);
    }

    #[tokio::test]
    async fn test_oauth_unsupported_provider_is_unauthorized() {
        let state = test_state().await;

        let result = state
            .auth_service
            .oauth_login(OAuthLoginRequest {
                provider: "github".to_string(),
                access_token: "T1".to_string(),
                refresh_token: None,
                profile: Some(bob_profile()),
            })
            .await;

        match result {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "Unsupported provider: github"),
            other => panic!("expected Unauthorized, got {:?}", other.map(|r| r.user)),
        }
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token_for_same_subject() {
        let state = test_state().await;
        let alice_id = register_alice(&state).await;
        let session = state
            .auth_service
            .login("alice", ALICE_PASSWORD)
            .await
            .unwrap();

        let refreshed = state
            .auth_service
            .refresh_token(&session.refresh_token)
            .await
            .unwrap();

        let claims = state.token_service.verify_token(&refreshed.access_token).unwrap();
        assert_eq!(claims.user_id(), Some(alice_id));
        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn test_refresh_with_garbage_is_unauthorized() {
        let state = test_state().await;

        let result = state.auth_service.refresh_token("not.a.token").await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
        assert_eq!(state.metrics.get(AuthEvent::RefreshFailure), 1);
    }

    #[tokio::test]
    async fn test_logout_then_refresh_is_unauthorized() {
        let state = test_state().await;
        register_alice(&state).await;
        let session = state
            .auth_service
            .login("alice", ALICE_PASSWORD)
            .await
            .unwrap();

        let out = state.auth_service.logout(&session.refresh_token).await.unwrap();
        assert_eq!(out.message, "Logged out successfully");

        let result = state.auth_service.refresh_token(&session.refresh_token).await;
        match result {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, "Invalid token"),
            other => panic!("expected Unauthorized, got {:?}", other.map(|r| r.access_token)),
        }
    }

    #[tokio::test]
    async fn test_revoked_access_token_fails_guard() {
        let state = test_state().await;
        register_alice(&state).await;
        let session = state
            .auth_service
            .login("alice", ALICE_PASSWORD)
            .await
            .unwrap();

        assert!(state
            .auth_service
            .authorize_bearer(&session.access_token)
            .await
            .is_ok());

        state.auth_service.logout(&session.access_token).await.unwrap();

        match state.auth_service.authorize_bearer(&session.access_token).await {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, UNAUTHENTICATED_MESSAGE),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
        assert_eq!(state.metrics.get(AuthEvent::Logout), 1);
    }

    #[tokio::test]
    async fn test_logout_with_invalid_token_is_unauthorized() {
        let state = test_state().await;
        let result = state.auth_service.logout("garbage").await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_logout_with_cache_down_is_internal_error() {
        let state =
            test_state_over(Arc::new(UnavailableRevocationCache), RateLimitConfig::disabled())
                .await;
        register_alice(&state).await;
        let session = state
            .auth_service
            .login("alice", ALICE_PASSWORD)
            .await
            .unwrap();

        match state.auth_service.logout(&session.access_token).await {
            Err(ApiError::InternalServer(msg)) => {
                assert!(msg.starts_with("An error occurred during logout"))
            }
            other => panic!("expected InternalServer, got {:?}", other.map(|r| r.message)),
        }
    }

    #[tokio::test]
    async fn test_guard_rejects_forged_token_without_touching_cache() {
        let state =
            test_state_over(Arc::new(UnavailableRevocationCache), RateLimitConfig::disabled())
                .await;

        match state.auth_service.authorize_bearer("forged.token.value").await {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, UNAUTHENTICATED_MESSAGE),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    // ------------------------------------------------------------------
    // HTTP surface
    // ------------------------------------------------------------------

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn test_app() -> Router {
        build_router(test_state().await, Vec::new())
    }

    async fn login_over_http(app: &Router) -> Value {
        let (status, _) = send(
            app,
            post_json(
                "/users/register",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": ALICE_PASSWORD
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            post_json(
                "/auth/login",
                json!({ "username": "alice", "password": ALICE_PASSWORD }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn test_register_endpoint_hides_password_hash() {
        let app = test_app().await;

        let (status, body) = send(
            &app,
            post_json(
                "/users/register",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": ALICE_PASSWORD
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert!(body.get("password").is_none());

        let (status, body) = send(
            &app,
            post_json(
                "/users/register",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": ALICE_PASSWORD
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_login_endpoint_rejects_bad_credentials() {
        let app = test_app().await;
        login_over_http(&app).await;

        let (status, body) = send(
            &app,
            post_json(
                "/auth/login",
                json!({ "username": "alice", "password": "Wr0ng!pass" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_protected_route_requires_bearer_token() {
        let app = test_app().await;

        let request = Request::builder()
            .uri("/home")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], UNAUTHENTICATED_MESSAGE);
    }

    #[tokio::test]
    async fn test_home_greets_authenticated_user() {
        let app = test_app().await;
        let session = login_over_http(&app).await;
        let token = session["access_token"].as_str().unwrap();

        let (status, body) = send(&app, get_with_token("/home", token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Hello World!");
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["userId"], session["user"]["id"]);
    }

    #[tokio::test]
    async fn test_logout_endpoint_revokes_bearer_token() {
        let app = test_app().await;
        let session = login_over_http(&app).await;
        let token = session["access_token"].as_str().unwrap();

        let logout = Request::builder()
            .method(Method::POST)
            .uri("/auth/logout")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, logout).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");

        let (status, _) = send(&app, get_with_token("/home", token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_endpoint_is_public() {
        let app = test_app().await;
        let session = login_over_http(&app).await;

        let (status, body) = send(
            &app,
            post_json(
                "/auth/refresh-token",
                json!({ "token": session["refresh_token"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_find_user_by_id_endpoint() {
        let app = test_app().await;
        let session = login_over_http(&app).await;
        let token = session["access_token"].as_str().unwrap();
        let id = session["user"]["id"].as_i64().unwrap();

        let (status, body) = send(&app, get_with_token(&format!("/users/{}", id), token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "alice@example.com");

        let (status, body) = send(&app, get_with_token("/users/9999", token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User with ID 9999 not found");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_public_text() {
        let app = test_app().await;
        login_over_http(&app).await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("auth_requests_total 1\n"));
        assert!(text.contains("user_creation_total 1\n"));
    }

    #[tokio::test]
    async fn test_options_request_passes_gate() {
        let app = test_app().await;

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/home")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_with_cache_down_is_server_error() {
        let state =
            test_state_over(Arc::new(UnavailableRevocationCache), RateLimitConfig::disabled())
                .await;
        let app = build_router(state, Vec::new());
        let session = login_over_http(&app).await;
        let token = session["access_token"].as_str().unwrap();

        let (status, body) = send(&app, get_with_token("/home", token)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");

        let (status, _) = send(&app, get_with_token("/home", "forged.token.value")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_throttler_returns_429_with_retry_after() {
        let state = test_state_with(RateLimitConfig {
            enabled: true,
            limit: 2,
            window_seconds: 60,
            whitelist_ips: Vec::new(),
        })
        .await;
        let app = build_router(state, Vec::new());

        let metrics = || Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(metrics()).await.unwrap().status(), StatusCode::OK);
        assert_eq!(app.clone().oneshot(metrics()).await.unwrap().status(), StatusCode::OK);

        let response = app.clone().oneshot(metrics()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
    }
}
