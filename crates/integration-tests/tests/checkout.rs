//! Order placement against a migrated database.
//!
//! Run with `cargo test -p whimsical-frog-integration-tests -- --ignored`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use whimsical_frog_admin::db::{
    CategoryRepository, InventoryRepository, OrderRepository as AdminOrderRepository,
};
use whimsical_frog_admin::models::ItemInput;
use whimsical_frog_core::order_number::order_prefix;
use whimsical_frog_core::pricing::{PricingSettings, quote, subtotal};
use whimsical_frog_core::{PaymentMethod, ShippingMethod, UserId, UserRole};
use whimsical_frog_integration_tests::{TEST_PASSWORD, create_user, pool, unique};
use whimsical_frog_storefront::db::OrderRepository;
use whimsical_frog_storefront::db::orders::PlaceOrderError;
use whimsical_frog_storefront::models::{NewOrder, NewOrderLine};
use whimsical_frog_storefront::services::{AuthService, CheckoutService};

/// A sellable item in a fresh category. Returns its SKU.
async fn stocked_item(pool: &PgPool, price: Decimal, stock_level: i32) -> String {
    let categories = CategoryRepository::new(pool);
    let id = categories.add(&unique("Pond Goods ")).await.unwrap();
    let code = categories.sku_code_for(Some(id)).await.unwrap();
    InventoryRepository::new(pool)
        .create(
            &ItemInput {
                name: unique("Frog Thing "),
                category_id: Some(id.as_i32()),
                stock_level,
                reorder_point: 2,
                retail_price: price,
                is_active: Some("on".to_owned()),
                ..ItemInput::default()
            },
            &code,
        )
        .await
        .unwrap()
}

async fn customer(pool: &PgPool) -> UserId {
    let username = create_user(pool, UserRole::Customer).await;
    AuthService::new(pool)
        .login(&username, TEST_PASSWORD)
        .await
        .unwrap()
        .id
}

fn order(user_id: UserId, lines: &[(&str, i32)]) -> NewOrder {
    NewOrder {
        user_id,
        payment_method: PaymentMethod::Cash,
        shipping_method: ShippingMethod::CustomerPickup,
        check_number: None,
        shipping_address: None,
        lines: lines
            .iter()
            .map(|(sku, quantity)| NewOrderLine {
                sku: (*sku).to_owned(),
                quantity: *quantity,
                color: None,
                size: None,
            })
            .collect(),
    }
}

async fn stock_of(pool: &PgPool, sku: &str) -> i32 {
    InventoryRepository::new(pool)
        .get(sku)
        .await
        .unwrap()
        .unwrap()
        .stock_level
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_order_ids_count_up_per_customer_day_and_shipping() {
    let pool = pool().await;
    let sku = stocked_item(&pool, Decimal::new(1000, 2), 10).await;
    let user_id = customer(&pool).await;
    let settings = PricingSettings::default();
    let orders = OrderRepository::new(&pool);

    let first = orders
        .place(&order(user_id, &[(&sku, 1)]), &settings, day())
        .await
        .unwrap();
    let second = orders
        .place(&order(user_id, &[(&sku, 1)]), &settings, day())
        .await
        .unwrap();

    let prefix = order_prefix(user_id, day(), ShippingMethod::CustomerPickup);
    assert_eq!(first.id, format!("{prefix}01"));
    assert_eq!(second.id, format!("{prefix}02"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_stored_total_is_the_server_quote() {
    let pool = pool().await;
    let sku = stocked_item(&pool, Decimal::new(1250, 2), 10).await;
    let user_id = customer(&pool).await;
    let settings = PricingSettings::default();

    let placed = OrderRepository::new(&pool)
        .place(&order(user_id, &[(&sku, 3)]), &settings, day())
        .await
        .unwrap();

    let expected = quote(
        subtotal([(Decimal::new(1250, 2), 3)]),
        ShippingMethod::CustomerPickup,
        &settings,
    );
    assert_eq!(placed.quote, expected);

    let stored = OrderRepository::new(&pool)
        .get_for_user(&placed.id, user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.subtotal, expected.subtotal);
    assert_eq!(stored.tax_amount, expected.tax);
    assert_eq!(stored.total, expected.total);
    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines[0].price, Decimal::new(1250, 2));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_stock_never_goes_below_zero_and_low_stock_is_reported() {
    let pool = pool().await;
    let sku = stocked_item(&pool, Decimal::new(500, 2), 2).await;
    let user_id = customer(&pool).await;

    let placed = OrderRepository::new(&pool)
        .place(&order(user_id, &[(&sku, 5)]), &PricingSettings::default(), day())
        .await
        .unwrap();

    assert_eq!(stock_of(&pool, &sku).await, 0);
    let low = placed.low_stock.iter().find(|l| l.sku == sku).unwrap();
    assert_eq!(low.stock_level, 0);
    assert_eq!(low.reorder_point, 2);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_unknown_sku_rolls_back_the_whole_order() {
    let pool = pool().await;
    let sku = stocked_item(&pool, Decimal::new(500, 2), 10).await;
    let user_id = customer(&pool).await;
    let orders = OrderRepository::new(&pool);

    let err = orders
        .place(
            &order(user_id, &[(&sku, 2), ("WF-ZZ-999999", 1)]),
            &PricingSettings::default(),
            day(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PlaceOrderError::UnknownSku(s) if s == "WF-ZZ-999999"));
    assert_eq!(stock_of(&pool, &sku).await, 10);
    assert!(orders.list_for_user(user_id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_variant_sku_is_quoted_and_placed_at_base_price() {
    let pool = pool().await;
    let sku = stocked_item(&pool, Decimal::new(2000, 2), 10).await;
    let variant = format!("{sku}A");
    let user_id = customer(&pool).await;

    let quoted = CheckoutService::new(&pool)
        .price(&[(variant.clone(), 1)], ShippingMethod::CustomerPickup)
        .await
        .unwrap();
    assert_eq!(quoted.subtotal, Decimal::new(2000, 2));

    let placed = OrderRepository::new(&pool)
        .place(&order(user_id, &[(&variant, 1)]), &PricingSettings::default(), day())
        .await
        .unwrap();
    assert_eq!(placed.quote.subtotal, quoted.subtotal);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_admin_line_edits_recalculate_the_total() {
    let pool = pool().await;
    let first = stocked_item(&pool, Decimal::new(1000, 2), 20).await;
    let second = stocked_item(&pool, Decimal::new(400, 2), 20).await;
    let user_id = customer(&pool).await;
    let settings = PricingSettings::default();

    let placed = OrderRepository::new(&pool)
        .place(&order(user_id, &[(&first, 1)]), &settings, day())
        .await
        .unwrap();

    let admin = AdminOrderRepository::new(&pool);
    let line_id = admin.get(&placed.id).await.unwrap().unwrap().lines[0].id.clone();

    let total = admin
        .update_quantity(&placed.id, &line_id, 3, &settings)
        .await
        .unwrap();
    let expected = quote(
        subtotal([(Decimal::new(1000, 2), 3)]),
        ShippingMethod::CustomerPickup,
        &settings,
    );
    assert_eq!(total, expected.total);

    let (_, total) = admin
        .add_item(&placed.id, &second, 2, None, &settings)
        .await
        .unwrap();
    let expected = quote(
        subtotal([(Decimal::new(1000, 2), 3), (Decimal::new(400, 2), 2)]),
        ShippingMethod::CustomerPickup,
        &settings,
    );
    assert_eq!(total, expected.total);

    let detail = admin.get(&placed.id).await.unwrap().unwrap();
    assert_eq!(detail.subtotal, expected.subtotal);
    assert_eq!(detail.summary.total, expected.total);
}
