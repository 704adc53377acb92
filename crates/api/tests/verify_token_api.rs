//! HTTP-level integration tests for the token-verification endpoint:
//! format gating, uniform failure responses, access telemetry, and
//! per-IP rate limiting.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, post_json};
use sqlx::PgPool;
use srs_db::repositories::AccessTokenRepo;

const VERIFY_URI: &str = "/api/v1/questionnaire/verify-token";

// ---------------------------------------------------------------------------
// Format gate
// ---------------------------------------------------------------------------

/// Malformed tokens are rejected with 400 before the limiter or store are
/// consulted. With no pool configured, a store lookup would answer 503 --
/// so a 400 proves the gate fired first.
#[tokio::test]
async fn test_malformed_token_rejected_first() {
    let app = build_test_app(None);

    for bad in ["", "short", "way-too-short", "g".repeat(32).as_str()] {
        let response = post_json(app.clone(), VERIFY_URI, serde_json::json!({ "token": bad })).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "token {bad:?} should fail the format gate"
        );
    }
}

/// Malformed attempts must not consume rate-limit budget: after far more
/// malformed requests than the limit allows, a well-formed token still
/// reaches the store layer (503 here, since no store is configured).
#[tokio::test]
async fn test_malformed_attempts_do_not_count_against_limit() {
    let app = build_test_app(None);

    for _ in 0..20 {
        let response =
            post_json(app.clone(), VERIFY_URI, serde_json::json!({ "token": "nope" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let well_formed = srs_core::token::generate_token();
    let response =
        post_json(app.clone(), VERIFY_URI, serde_json::json!({ "token": well_formed })).await;
    assert_eq!(
        response.status(),
        StatusCode::SERVICE_UNAVAILABLE,
        "a well-formed token should get past the limiter to the store layer"
    );
}

// ---------------------------------------------------------------------------
// Verification outcomes
// ---------------------------------------------------------------------------

/// A valid token verifies successfully and the response carries the client
/// association plus rate-limit headers.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_valid_token_verifies(pool: PgPool) {
    let record = AccessTokenRepo::create(&pool, "jdeleon", "discovery")
        .await
        .expect("token creation should succeed");

    let app = build_test_app(Some(pool));
    let response = post_json(app, VERIFY_URI, serde_json::json!({ "token": record.token })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-ratelimit-limit").unwrap(),
        "10"
    );
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "9"
    );

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["clientId"], "jdeleon");
    assert_eq!(json["questionnaireId"], "discovery");
}

/// Verifying twice in immediate succession succeeds both times and each
/// success increments `access_count` by exactly one.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_verification_records_access_telemetry(pool: PgPool) {
    let record = AccessTokenRepo::create(&pool, "jdeleon", "discovery")
        .await
        .expect("token creation should succeed");
    assert_eq!(record.access_count, 0);
    assert!(record.accessed_at.is_none());

    let app = build_test_app(Some(pool.clone()));
    for _ in 0..2 {
        let response = post_json(
            app.clone(),
            VERIFY_URI,
            serde_json::json!({ "token": record.token }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Telemetry is fire-and-forget; give the spawned updates a moment.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let row = AccessTokenRepo::find_by_token(&pool, &record.token)
        .await
        .expect("lookup should succeed")
        .expect("token should still exist");
    assert_eq!(row.access_count, 2);
    assert!(row.accessed_at.is_some());
}

/// Unknown, revoked, and expired tokens all answer 401 with an identical
/// body, leaking nothing about which failure occurred.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_failure_modes_are_indistinguishable(pool: PgPool) {
    // Revoked token.
    let revoked = AccessTokenRepo::create(&pool, "client-a", "discovery")
        .await
        .expect("token creation should succeed");
    AccessTokenRepo::revoke(&pool, &revoked.token)
        .await
        .expect("revocation should succeed");

    // Expired token.
    let expired = AccessTokenRepo::create(&pool, "client-b", "discovery")
        .await
        .expect("token creation should succeed");
    sqlx::query(
        "UPDATE questionnaire_access_tokens SET expires_at = NOW() - INTERVAL '1 day' \
         WHERE token = $1",
    )
    .bind(&expired.token)
    .execute(&pool)
    .await
    .expect("expiry rewrite should succeed");

    // Unknown (well-formed) token.
    let unknown = srs_core::token::generate_token();

    let app = build_test_app(Some(pool));
    let mut bodies = Vec::new();
    for token in [revoked.token.as_str(), expired.token.as_str(), &unknown] {
        let response =
            post_json(app.clone(), VERIFY_URI, serde_json::json!({ "token": token })).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        bodies.push(body_json(response).await);
    }

    assert_eq!(bodies[0], bodies[1], "revoked and expired bodies must match");
    assert_eq!(bodies[1], bodies[2], "expired and unknown bodies must match");
}

/// Revocation is one-way: a token that verified successfully fails forever
/// after `revoked = true`.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_revocation_is_permanent(pool: PgPool) {
    let record = AccessTokenRepo::create(&pool, "jdeleon", "discovery")
        .await
        .expect("token creation should succeed");

    let app = build_test_app(Some(pool.clone()));
    let response = post_json(
        app.clone(),
        VERIFY_URI,
        serde_json::json!({ "token": record.token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    AccessTokenRepo::revoke(&pool, &record.token)
        .await
        .expect("revocation should succeed");

    for _ in 0..3 {
        let response = post_json(
            app.clone(),
            VERIFY_URI,
            serde_json::json!({ "token": record.token }),
        )
        .await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "revoked token must fail regardless of prior successes"
        );
    }
}

/// Revoking all tokens for a client invalidates each of them.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_revoke_all_for_client(pool: PgPool) {
    let first = AccessTokenRepo::create(&pool, "jdeleon", "discovery")
        .await
        .expect("token creation should succeed");
    let second = AccessTokenRepo::create(&pool, "jdeleon", "intake")
        .await
        .expect("token creation should succeed");

    let revoked = AccessTokenRepo::revoke_all_for_client(&pool, "jdeleon")
        .await
        .expect("bulk revocation should succeed");
    assert_eq!(revoked, 2);

    let app = build_test_app(Some(pool));
    for token in [&first.token, &second.token] {
        let response =
            post_json(app.clone(), VERIFY_URI, serde_json::json!({ "token": token })).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// The 10th well-formed attempt in a window is allowed; the 11th answers 429
/// with machine-readable retry timing.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_verification_rate_limit_boundary(pool: PgPool) {
    let app = build_test_app(Some(pool));

    for i in 1..=10 {
        let token = srs_core::token::generate_token();
        let response =
            post_json(app.clone(), VERIFY_URI, serde_json::json!({ "token": token })).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "attempt {i} should reach the store and fail auth, not rate limiting"
        );
    }

    let token = srs_core::token::generate_token();
    let response = post_json(app, VERIFY_URI, serde_json::json!({ "token": token })).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("429 must carry a numeric Retry-After header");
    assert!(retry_after > 0);
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );

    let json = body_json(response).await;
    assert_eq!(json["code"], "RATE_LIMITED");
}
