//! Integration tests for registration and login.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The server running (cargo run -p trendmart-server)
//!
//! Run with: cargo test -p trendmart-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use trendmart_integration_tests::{
    admin_token, base_url, client, signup_customer, test_pool, unique_email,
};

const PASSWORD: &str = "integration-test-pass-1";

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn registration_verify_login_round_trip() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let email = unique_email("auth");

    let token = signup_customer(&client, &pool, &email, PASSWORD).await;

    // The issued token resolves to the account
    let me: Value = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get me")
        .json()
        .await
        .expect("me json");
    assert_eq!(me["email"], email);
    assert_eq!(me["role"], "CUSTOMER");

    // And a fresh login works too
    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn wrong_verification_code_is_rejected() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let email = unique_email("auth");

    let resp = client
        .post(format!("{base}/auth/register/otp"))
        .json(&json!({
            "email": email,
            "full_name": "Test Customer",
            "password": PASSWORD,
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = client
        .post(format!("{base}/auth/register/verify"))
        .json(&json!({ "email": email, "code": "000000" }))
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Login is still blocked until verification succeeds
    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (_,): (i32,) = sqlx::query_as(
        "SELECT id FROM users WHERE email = $1 AND email_verified_at IS NULL",
    )
    .bind(&email)
    .fetch_one(&pool)
    .await
    .expect("account stays unverified");
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn expired_verification_code_is_rejected() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let email = unique_email("auth");

    let resp = client
        .post(format!("{base}/auth/register/otp"))
        .json(&json!({
            "email": email,
            "full_name": "Test Customer",
            "password": PASSWORD,
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let (code,): (String,) = sqlx::query_as("SELECT otp_secret FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .expect("otp state");

    // Push the deadline into the past
    sqlx::query("UPDATE users SET otp_expires_at = NOW() - INTERVAL '1 minute' WHERE email = $1")
        .bind(&email)
        .execute(&pool)
        .await
        .expect("expire otp");

    let resp = client
        .post(format!("{base}/auth/register/verify"))
        .json(&json!({ "email": email, "code": code }))
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn re_registering_unverified_email_reissues_a_code() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let email = unique_email("auth");

    for _ in 0..2 {
        let resp = client
            .post(format!("{base}/auth/register/otp"))
            .json(&json!({
                "email": email,
                "full_name": "Test Customer",
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("register");
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    // One account, not two
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn verified_email_cannot_register_again() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let email = unique_email("auth");

    let _token = signup_customer(&client, &pool, &email, PASSWORD).await;

    let resp = client
        .post(format!("{base}/auth/register/otp"))
        .json(&json!({
            "email": email,
            "full_name": "Someone Else",
            "password": "a-different-password-1",
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn customer_cannot_use_the_admin_login() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let email = unique_email("auth");

    let _token = signup_customer(&client, &pool, &email, PASSWORD).await;

    let resp = client
        .post(format!("{base}/auth/admin/login"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("admin login");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn admin_endpoints_reject_customer_tokens() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();

    let customer = signup_customer(&client, &pool, &unique_email("auth"), PASSWORD).await;
    let admin = admin_token(&client, &pool, &unique_email("auth-admin"), PASSWORD).await;

    let resp = client
        .get(format!("{base}/customers"))
        .bearer_auth(&customer)
        .send()
        .await
        .expect("list customers");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(format!("{base}/customers"))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("list customers");
    assert_eq!(resp.status(), StatusCode::OK);
}
