//! Admin JSON API against a live server.
//!
//! Requires the admin server and a migrated database. Run with
//! `cargo test -p whimsical-frog-integration-tests -- --ignored`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;

use whimsical_frog_admin::db::InventoryRepository;
use whimsical_frog_admin::models::ItemInput;
use whimsical_frog_integration_tests::{admin_client, admin_url, pool, unique};

async fn create_item(pool: &PgPool) -> String {
    let sku = unique("WF-IT-").to_uppercase();
    InventoryRepository::new(pool)
        .create(
            &ItemInput {
                sku: sku.clone(),
                name: "Lily Pad Coaster".to_owned(),
                stock_level: 4,
                reorder_point: 2,
                retail_price: Decimal::new(1250, 2),
                is_active: Some("on".to_owned()),
                ..ItemInput::default()
            },
            "IT",
        )
        .await
        .expect("Failed to create test item");
    sku
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_set_stock() {
    let pool = pool().await;
    let sku = create_item(&pool).await;
    let client = admin_client(&pool).await;

    let resp = client
        .post(format!("{}/api/inventory/{sku}/stock", admin_url()))
        .json(&json!({ "stock_level": 17 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let item = InventoryRepository::new(&pool).get(&sku).await.unwrap().unwrap();
    assert_eq!(item.stock_level, 17);
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_set_stock_unknown_item() {
    let pool = pool().await;
    let client = admin_client(&pool).await;

    let resp = client
        .post(format!("{}/api/inventory/WF-NOPE-999/stock", admin_url()))
        .json(&json!({ "stock_level": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_marketing_fields_and_lists() {
    let pool = pool().await;
    let sku = create_item(&pool).await;
    let client = admin_client(&pool).await;
    let url = format!("{}/api/marketing/{sku}", admin_url());

    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["exists"], false);

    let resp = client
        .post(&url)
        .json(&json!({
            "action": "bulk_update",
            "fields": { "suggested_title": " Froggy Coaster ", "keywords": ["frog", "coaster"] },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    for item in ["pond", "frog"] {
        client
            .post(&url)
            .json(&json!({ "action": "add_list_item", "field": "keywords", "item": item }))
            .send()
            .await
            .unwrap();
    }
    client
        .post(&url)
        .json(&json!({ "action": "remove_list_item", "field": "keywords", "item": "coaster" }))
        .send()
        .await
        .unwrap();

    let body: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["exists"], true);
    assert_eq!(body["data"]["suggested_title"], "Froggy Coaster");
    assert_eq!(body["data"]["keywords"], json!(["frog", "pond"]));

    let resp = client
        .post(&url)
        .json(&json!({ "action": "update_field", "field": "sku", "value": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires running admin server and database"]
async fn test_secrets_store_and_delete() {
    let pool = pool().await;
    let client = admin_client(&pool).await;
    let key = unique("test_key_");

    let resp = client
        .post(format!("{}/api/secrets", admin_url()))
        .json(&json!({ "payload": format!("{key}=ribbit") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = client
        .get(format!("{}/api/secrets/export", admin_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["secrets"][&key], "ribbit");

    let resp = client
        .delete(format!("{}/api/secrets/{key}", admin_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
