//! Integration tests for variant reconciliation.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The server running (cargo run -p trendmart-server)
//!
//! Run with: cargo test -p trendmart-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};
use sqlx::PgPool;

use trendmart_integration_tests::{
    admin_token, base_url, client, order_body, seed_variant, signup_customer, test_pool,
    unique_email,
};

const PASSWORD: &str = "integration-test-pass-1";

/// Insert an extra size or color for reconciliation targets.
async fn seed_size(pool: &PgPool) -> i32 {
    let (id,): (i32,) = sqlx::query_as("INSERT INTO sizes (value) VALUES ($1) RETURNING id")
        .bind(format!("size-{}", uuid::Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .expect("insert size");
    id
}

async fn seed_color(pool: &PgPool) -> i32 {
    let (id,): (i32,) = sqlx::query_as("INSERT INTO colors (name) VALUES ($1) RETURNING id")
        .bind(format!("color-{}", uuid::Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .expect("insert color");
    id
}

fn variant_body(size_id: i32, color_id: i32, price: i64, stock: i32) -> Value {
    json!({
        "size_id": size_id,
        "color_id": color_id,
        "price": price,
        "stock": stock,
    })
}

async fn put_variants(token: &str, product_id: i32, variants: Value) -> (StatusCode, Value) {
    let resp = client()
        .put(format!("{}/products/{product_id}/variants", base_url()))
        .bearer_auth(token)
        .json(&json!({ "variants": variants }))
        .send()
        .await
        .expect("update variants");
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn omitted_variants_archive_and_new_keys_create() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let token = admin_token(&client, &pool, &unique_email("admin"), PASSWORD).await;

    // Start from [(M, Black), (L, Black)]
    let seeded = seed_variant(&pool, 4999, 5).await; // (M, Black)
    let size_l = seed_size(&pool).await;
    let color_white = seed_color(&pool).await;

    let (status, _) = put_variants(
        &token,
        seeded.product_id,
        json!([
            variant_body(seeded.size_id, seeded.color_id, 4999, 5),
            variant_body(size_l, seeded.color_id, 4999, 5),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Converge to [(L, Black), (L, White)]
    let (status, product) = put_variants(
        &token,
        seeded.product_id,
        json!([
            variant_body(size_l, seeded.color_id, 5499, 4),
            variant_body(size_l, color_white, 5499, 7),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The response carries the live variants only
    let keys: Vec<(i64, i64)> = product["variants"]
        .as_array()
        .expect("variants")
        .iter()
        .map(|v| {
            (
                v["size_id"].as_i64().expect("size"),
                v["color_id"].as_i64().expect("color"),
            )
        })
        .collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&(i64::from(size_l), i64::from(seeded.color_id))));
    assert!(keys.contains(&(i64::from(size_l), i64::from(color_white))));

    // (M, Black) is archived, not deleted
    let (archived,): (bool,) = sqlx::query_as(
        "SELECT is_archived FROM product_variants WHERE id = $1",
    )
    .bind(seeded.variant_id)
    .fetch_one(&pool)
    .await
    .expect("original variant still present");
    assert!(archived);

    // Archived variants disappear from the public listing
    let public: Value = client
        .get(format!("{base}/products/{}", seeded.product_id))
        .send()
        .await
        .expect("get product")
        .json()
        .await
        .expect("product json");
    assert_eq!(public["variants"].as_array().expect("variants").len(), 2);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn reconciliation_is_idempotent() {
    let pool = test_pool().await;
    let client = client();
    let token = admin_token(&client, &pool, &unique_email("admin"), PASSWORD).await;

    let seeded = seed_variant(&pool, 4999, 5).await;
    let desired = json!([variant_body(seeded.size_id, seeded.color_id, 5499, 9)]);

    let (status, first) = put_variants(&token, seeded.product_id, desired.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = put_variants(&token, seeded.product_id, desired).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first["variants"], second["variants"]);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_variants WHERE product_id = $1")
            .bind(seeded.product_id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn re_adding_an_archived_key_unarchives_the_same_row() {
    let pool = test_pool().await;
    let client = client();
    let token = admin_token(&client, &pool, &unique_email("admin"), PASSWORD).await;

    let seeded = seed_variant(&pool, 4999, 5).await;

    let (status, _) = put_variants(&token, seeded.product_id, json!([])).await;
    assert_eq!(status, StatusCode::OK);

    let (status, product) = put_variants(
        &token,
        seeded.product_id,
        json!([variant_body(seeded.size_id, seeded.color_id, 5999, 2)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let variant = &product["variants"][0];
    assert_eq!(variant["id"], seeded.variant_id);
    assert_eq!(variant["is_archived"], false);
    assert_eq!(variant["price"], 5999);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn archiving_preserves_order_history() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let admin = admin_token(&client, &pool, &unique_email("admin"), PASSWORD).await;

    let seeded = seed_variant(&pool, 4999, 5).await;
    let customer = signup_customer(&client, &pool, &unique_email("history"), PASSWORD).await;

    let resp = client
        .post(format!("{base}/orders"))
        .bearer_auth(&customer)
        .json(&order_body(seeded.variant_id, 1))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("order json");
    let order_id = order["id"].as_i64().expect("order id");

    // Archive the purchased variant by omitting it
    let (status, _) = put_variants(&admin, seeded.product_id, json!([])).await;
    assert_eq!(status, StatusCode::OK);

    // The historical order still resolves the archived variant's data
    let detail: Value = client
        .get(format!("{base}/orders/{order_id}"))
        .bearer_auth(&customer)
        .send()
        .await
        .expect("get order")
        .json()
        .await
        .expect("order json");

    let item = &detail["items"][0];
    assert_eq!(item["product_variant_id"], seeded.variant_id);
    assert_eq!(item["product_variant"]["is_archived"], true);
    assert_eq!(item["price_at_purchase"], 4999);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn image_lists_reconcile_per_variant() {
    let pool = test_pool().await;
    let client = client();
    let token = admin_token(&client, &pool, &unique_email("admin"), PASSWORD).await;

    let seeded = seed_variant(&pool, 4999, 5).await;

    let mut body = variant_body(seeded.size_id, seeded.color_id, 4999, 5);
    body["images"] = json!([
        { "image_url": "https://cdn.test/a.jpg", "is_primary": true },
        { "image_url": "https://cdn.test/b.jpg" },
    ]);
    let (status, product) = put_variants(&token, seeded.product_id, json!([body])).await;
    assert_eq!(status, StatusCode::OK);

    let images = product["variants"][0]["images"].as_array().expect("images");
    assert_eq!(images.len(), 2);
    let kept_id = images[0]["id"].as_i64().expect("image id");

    // Keep the first image (updated), drop the second, add a third
    let mut body = variant_body(seeded.size_id, seeded.color_id, 4999, 5);
    body["images"] = json!([
        { "id": kept_id, "image_url": "https://cdn.test/a-v2.jpg", "is_primary": true },
        { "image_url": "https://cdn.test/c.jpg" },
    ]);
    let (status, product) = put_variants(&token, seeded.product_id, json!([body])).await;
    assert_eq!(status, StatusCode::OK);

    let images = product["variants"][0]["images"].as_array().expect("images");
    assert_eq!(images.len(), 2);
    let urls: Vec<&str> = images
        .iter()
        .map(|i| i["image_url"].as_str().expect("url"))
        .collect();
    assert!(urls.contains(&"https://cdn.test/a-v2.jpg"));
    assert!(urls.contains(&"https://cdn.test/c.jpg"));
    assert!(images.iter().any(|i| i["id"] == kept_id));
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn creating_a_product_requires_a_variant() {
    let pool = test_pool().await;
    let client = client();
    let base = base_url();
    let token = admin_token(&client, &pool, &unique_email("admin"), PASSWORD).await;

    // No variants key at all
    let resp = client
        .post(format!("{base}/products"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Bare Tee" }))
        .send()
        .await
        .expect("create product");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // An explicitly empty list is no better
    let resp = client
        .post(format!("{base}/products"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Bare Tee", "variants": [] }))
        .send()
        .await
        .expect("create product");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // One variant is enough
    let size_id = seed_size(&pool).await;
    let color_id = seed_color(&pool).await;
    let resp = client
        .post(format!("{base}/products"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Bare Tee",
            "variants": [variant_body(size_id, color_id, 2999, 3)],
        }))
        .send()
        .await
        .expect("create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = resp.json().await.expect("product json");
    assert_eq!(product["variants"].as_array().expect("variants").len(), 1);
}

#[tokio::test]
#[ignore = "Requires running server and PostgreSQL"]
async fn variant_updates_require_an_admin_token() {
    let pool = test_pool().await;
    let client = client();
    let token = signup_customer(&client, &pool, &unique_email("nonadmin"), PASSWORD).await;

    let seeded = seed_variant(&pool, 4999, 5).await;
    let (status, _) = put_variants(
        &token,
        seeded.product_id,
        json!([variant_body(seeded.size_id, seeded.color_id, 1, 1)]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
