//! HTTP-level integration tests for admin auth and token management:
//! login rate limiting, limiter reset on success, role enforcement, and
//! the generate/list/revoke token lifecycle.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, build_test_app, get_auth, post_json, post_json_auth};
use sqlx::PgPool;
use srs_api::auth::password::hash_password;
use srs_db::models::admin_user::{AdminUser, CreateAdminUser, ROLE_ADMIN, ROLE_VIEWER};
use srs_db::repositories::AdminUserRepo;

const LOGIN_URI: &str = "/api/v1/admin/login";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create an admin user directly in the database and return the row plus
/// the plaintext password used.
async fn create_admin(pool: &PgPool, email: &str, role: &str) -> (AdminUser, String) {
    let password = "correct-horse-battery-staple";
    let hashed = hash_password(password).expect("hashing should succeed");
    let input = CreateAdminUser {
        email: email.to_string(),
        password_hash: hashed,
        role: role.to_string(),
    };
    let admin = AdminUserRepo::create(pool, &input)
        .await
        .expect("admin creation should succeed");
    (admin, password.to_string())
}

/// Log in via the API and return the bearer token.
async fn login(app: Router, email: &str, password: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = post_json(app, LOGIN_URI, body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("login response must contain access_token")
        .to_string()
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Successful login returns a token and public admin info.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let (admin, password) = create_admin(&pool, "ops@example.com", ROLE_ADMIN).await;
    let app = build_test_app(Some(pool));

    let body = serde_json::json!({ "email": "ops@example.com", "password": password });
    let response = post_json(app, LOGIN_URI, body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["expires_in"].is_number());
    assert_eq!(json["admin"]["id"], admin.id);
    assert_eq!(json["admin"]["email"], "ops@example.com");
    assert_eq!(json["admin"]["role"], "admin");
    assert!(
        json.get("password_hash").is_none() && json["admin"].get("password_hash").is_none(),
        "password hash must never appear in a response"
    );
}

/// Wrong password and unknown email answer with the same 401 body.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_failures_are_indistinguishable(pool: PgPool) {
    let (_admin, _password) = create_admin(&pool, "ops@example.com", ROLE_ADMIN).await;
    let app = build_test_app(Some(pool));

    let wrong_password = post_json(
        app.clone(),
        LOGIN_URI,
        serde_json::json!({ "email": "ops@example.com", "password": "nope" }),
    )
    .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

    let unknown_email = post_json(
        app,
        LOGIN_URI,
        serde_json::json!({ "email": "ghost@example.com", "password": "nope" }),
    )
    .await;
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_email).await
    );
}

/// A deactivated account cannot log in even with correct credentials.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_deactivated_account(pool: PgPool) {
    let (_admin, password) = create_admin(&pool, "gone@example.com", ROLE_ADMIN).await;
    sqlx::query("UPDATE admin_users SET active = false WHERE email = 'gone@example.com'")
        .execute(&pool)
        .await
        .expect("deactivation should succeed");

    let app = build_test_app(Some(pool));
    let body = serde_json::json!({ "email": "gone@example.com", "password": password });
    let response = post_json(app, LOGIN_URI, body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Login rate limiting
// ---------------------------------------------------------------------------

/// Five failed attempts exhaust the window; the sixth answers 429.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_rate_limited_after_failures(pool: PgPool) {
    let (_admin, _password) = create_admin(&pool, "ops@example.com", ROLE_ADMIN).await;
    let app = build_test_app(Some(pool));

    for _ in 0..5 {
        let body = serde_json::json!({ "email": "ops@example.com", "password": "wrong" });
        let response = post_json(app.clone(), LOGIN_URI, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let body = serde_json::json!({ "email": "ops@example.com", "password": "wrong" });
    let response = post_json(app, LOGIN_URI, body).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
}

/// A successful login clears the limiter, so earlier typos do not count
/// against later attempts.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_successful_login_clears_limiter(pool: PgPool) {
    let (_admin, password) = create_admin(&pool, "ops@example.com", ROLE_ADMIN).await;
    let app = build_test_app(Some(pool));

    // Two typos, then a successful login.
    for _ in 0..2 {
        let body = serde_json::json!({ "email": "ops@example.com", "password": "typo" });
        let response = post_json(app.clone(), LOGIN_URI, body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    login(app.clone(), "ops@example.com", &password).await;

    // The budget is fresh again: four more failures all reach auth.
    for _ in 0..4 {
        let body = serde_json::json!({ "email": "ops@example.com", "password": "typo" });
        let response = post_json(app.clone(), LOGIN_URI, body).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "limiter should have been cleared by the successful login"
        );
    }
}

// ---------------------------------------------------------------------------
// Token management
// ---------------------------------------------------------------------------

/// Full lifecycle: generate a token, list it, revoke it, revoke again
/// (idempotent).
#[sqlx::test(migrations = "../db/migrations")]
async fn test_token_lifecycle(pool: PgPool) {
    let (_admin, password) = create_admin(&pool, "ops@example.com", ROLE_ADMIN).await;
    let app = build_test_app(Some(pool));
    let bearer = login(app.clone(), "ops@example.com", &password).await;

    // Generate.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/clients/jdeleon/tokens",
        serde_json::json!({ "questionnaireId": "discovery" }),
        &bearer,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let token = json["token"].as_str().expect("token must be returned").to_string();
    let share_link = json["shareLink"].as_str().expect("share link must be returned");
    assert!(share_link.ends_with(&format!("/q/{token}")));

    // List: safe info only, never the token value.
    let response = get_auth(app.clone(), "/api/v1/admin/clients/jdeleon/tokens", &bearer).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let tokens = json.as_array().expect("list should be an array");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0]["revoked"], false);
    assert!(tokens[0].get("token").is_none(), "token value must not be listed");

    // Revoke.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/tokens/revoke",
        serde_json::json!({ "token": token }),
        &bearer,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revokedCount"], 1);

    // Revoking again is idempotent.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/tokens/revoke",
        serde_json::json!({ "token": token }),
        &bearer,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revokedCount"], 0);

    // The revoked token no longer verifies.
    let response = post_json(
        app,
        "/api/v1/questionnaire/verify-token",
        serde_json::json!({ "token": token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Revoke-all flips every live token for the client.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_revoke_all_for_client(pool: PgPool) {
    let (_admin, password) = create_admin(&pool, "ops@example.com", ROLE_ADMIN).await;
    let app = build_test_app(Some(pool));
    let bearer = login(app.clone(), "ops@example.com", &password).await;

    for questionnaire in ["discovery", "intake"] {
        let response = post_json_auth(
            app.clone(),
            "/api/v1/admin/clients/jdeleon/tokens",
            serde_json::json!({ "questionnaireId": questionnaire }),
            &bearer,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = post_json_auth(
        app,
        "/api/v1/admin/clients/jdeleon/tokens/revoke-all",
        serde_json::json!({}),
        &bearer,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["revokedCount"], 2);
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// Token management requires authentication.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_token_endpoints_require_auth(pool: PgPool) {
    let app = build_test_app(Some(pool));

    let response = post_json(
        app,
        "/api/v1/admin/clients/jdeleon/tokens",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// The viewer role can list but not mint or revoke.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_viewer_cannot_mutate(pool: PgPool) {
    let (_viewer, password) = create_admin(&pool, "viewer@example.com", ROLE_VIEWER).await;
    let app = build_test_app(Some(pool));
    let bearer = login(app.clone(), "viewer@example.com", &password).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/clients/jdeleon/tokens",
        serde_json::json!({}),
        &bearer,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app, "/api/v1/admin/clients/jdeleon/tokens", &bearer).await;
    assert_eq!(response.status(), StatusCode::OK, "viewer may still list");
}
