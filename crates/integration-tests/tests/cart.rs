//! Integration tests for the cart.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The server running (cargo run -p trendmart-server)
//!
//! Run with: cargo test -p trendmart-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use trendmart_integration_tests::{
    base_url, client, seed_variant, signup_customer, test_pool, unique_email,
};

const PASSWORD: &str = "integration-test-pass-1";

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn adding_the_same_variant_folds_into_one_line() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();

    let seeded = seed_variant(&pool, 4999, 10).await;
    let token = signup_customer(&client, &pool, &unique_email("cart"), PASSWORD).await;

    for _ in 0..2 {
        let resp = client
            .post(format!("{base}/cart"))
            .bearer_auth(&token)
            .json(&json!({ "product_variant_id": seeded.variant_id, "quantity": 2 }))
            .send()
            .await
            .expect("add to cart");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let cart: Vec<Value> = client
        .get(format!("{base}/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get cart")
        .json()
        .await
        .expect("cart json");

    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0]["quantity"], 4);
    assert_eq!(cart[0]["product_variant"]["id"], seeded.variant_id);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn updating_a_line_sets_its_quantity() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();

    let seeded = seed_variant(&pool, 4999, 10).await;
    let token = signup_customer(&client, &pool, &unique_email("cart"), PASSWORD).await;

    let added: Value = client
        .post(format!("{base}/cart"))
        .bearer_auth(&token)
        .json(&json!({ "product_variant_id": seeded.variant_id, "quantity": 2 }))
        .send()
        .await
        .expect("add to cart")
        .json()
        .await
        .expect("cart item json");
    let item_id = added["id"].as_i64().expect("item id");

    let resp = client
        .put(format!("{base}/cart/{item_id}"))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 7 }))
        .send()
        .await
        .expect("update cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("cart item json");
    assert_eq!(updated["quantity"], 7);

    // Zero is a removal, not an update
    let resp = client
        .put(format!("{base}/cart/{item_id}"))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("update cart");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn cart_lines_are_scoped_to_their_owner() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();

    let seeded = seed_variant(&pool, 4999, 10).await;
    let owner = signup_customer(&client, &pool, &unique_email("cart"), PASSWORD).await;
    let intruder = signup_customer(&client, &pool, &unique_email("cart"), PASSWORD).await;

    let added: Value = client
        .post(format!("{base}/cart"))
        .bearer_auth(&owner)
        .json(&json!({ "product_variant_id": seeded.variant_id, "quantity": 1 }))
        .send()
        .await
        .expect("add to cart")
        .json()
        .await
        .expect("cart item json");
    let item_id = added["id"].as_i64().expect("item id");

    let resp = client
        .delete(format!("{base}/cart/{item_id}"))
        .bearer_auth(&intruder)
        .send()
        .await
        .expect("remove cart line");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .delete(format!("{base}/cart/{item_id}"))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("remove cart line");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
