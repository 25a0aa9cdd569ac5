//! Repositories and account updates against a migrated database.
//!
//! Run with `cargo test -p whimsical-frog-integration-tests -- --ignored`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use rust_decimal::Decimal;

use whimsical_frog_admin::db::secrets::EncryptedSecret;
use whimsical_frog_admin::db::{
    CategoryRepository, InventoryRepository, RepositoryError, SecretRepository, SkuRuleRepository,
};
use whimsical_frog_admin::models::ItemInput;
use whimsical_frog_core::UserRole;
use whimsical_frog_integration_tests::{TEST_PASSWORD, create_user, pool, unique};
use whimsical_frog_storefront::services::auth::{PasswordChange, ProfileInput};
use whimsical_frog_storefront::services::{AuthError, AuthService};

fn item(name: &str, category_id: i32) -> ItemInput {
    ItemInput {
        name: name.to_owned(),
        category_id: Some(category_id),
        stock_level: 1,
        reorder_point: 3,
        retail_price: Decimal::new(999, 2),
        is_active: Some("on".to_owned()),
        ..ItemInput::default()
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_generated_skus_follow_category_rule() {
    let pool = pool().await;
    let categories = CategoryRepository::new(&pool);
    let name = unique("Pond Decor ");
    let id = categories.add(&name).await.unwrap();
    SkuRuleRepository::new(&pool).upsert(&name, "zq").await.unwrap();

    let code = categories.sku_code_for(Some(id)).await.unwrap();
    assert_eq!(code, "ZQ");

    let inventory = InventoryRepository::new(&pool);
    let first = inventory
        .create(&item("Reed Vase", id.as_i32()), &code)
        .await
        .unwrap();
    let second = inventory
        .create(&item("Reed Bowl", id.as_i32()), &code)
        .await
        .unwrap();

    assert!(first.starts_with("WF-ZQ-"));
    assert!(second.starts_with("WF-ZQ-"));
    assert!(second > first);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_delete_category_requires_reassignment() {
    let pool = pool().await;
    let categories = CategoryRepository::new(&pool);
    let doomed = unique("Lily Stuff ");
    let target = unique("Pad Stuff ");
    let doomed_id = categories.add(&doomed).await.unwrap();
    categories.add(&target).await.unwrap();

    let code = categories.sku_code_for(Some(doomed_id)).await.unwrap();
    let sku = InventoryRepository::new(&pool)
        .create(&item("Lily Lamp", doomed_id.as_i32()), &code)
        .await
        .unwrap();

    let err = categories.delete(&doomed, None).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let deleted = categories.delete(&doomed, Some(&target)).await.unwrap();
    assert_eq!(deleted.reassigned, 1);

    let moved = InventoryRepository::new(&pool).get(&sku).await.unwrap().unwrap();
    assert_eq!(moved.category.as_deref(), Some(target.as_str()));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_duplicate_category_conflicts() {
    let pool = pool().await;
    let categories = CategoryRepository::new(&pool);
    let name = unique("Frog Mugs ");
    categories.add(&name).await.unwrap();

    let err = categories.add(&name.to_uppercase()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_low_stock_lists_items_at_reorder_point() {
    let pool = pool().await;
    let categories = CategoryRepository::new(&pool);
    let id = categories.add(&unique("Toad Hats ")).await.unwrap();
    let code = categories.sku_code_for(Some(id)).await.unwrap();
    let inventory = InventoryRepository::new(&pool);
    let sku = inventory
        .create(&item("Toad Beanie", id.as_i32()), &code)
        .await
        .unwrap();

    let low = inventory.low_stock(1000).await.unwrap();
    assert!(low.iter().any(|i| i.sku == sku));

    inventory.set_stock(&sku, 50).await.unwrap();
    let low = inventory.low_stock(1000).await.unwrap();
    assert!(!low.iter().any(|i| i.sku == sku));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_invalid_sku_code_is_rejected_as_input() {
    let pool = pool().await;
    let name = unique("Frog Socks ");
    CategoryRepository::new(&pool).add(&name).await.unwrap();

    let rules = SkuRuleRepository::new(&pool);
    for bad in ["T1", "", "TOADS"] {
        let err = rules.upsert(&name, bad).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)), "{bad:?}");
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_rejected_email_leaves_password_unchanged() {
    let pool = pool().await;
    let username = create_user(&pool, UserRole::Customer).await;
    let auth = AuthService::new(&pool);
    let user = auth.login(&username, TEST_PASSWORD).await.unwrap();

    let err = auth
        .update_account(
            user.id,
            ProfileInput {
                email: "not an email".to_owned(),
                ..ProfileInput::default()
            },
            Some(PasswordChange {
                current: TEST_PASSWORD,
                new_password: "tadpole-99",
                confirmation: "tadpole-99",
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmail(_)));

    assert!(auth.login(&username, TEST_PASSWORD).await.is_ok());
    assert!(auth.login(&username, "tadpole-99").await.is_err());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_profile_and_password_change_together() {
    let pool = pool().await;
    let username = create_user(&pool, UserRole::Customer).await;
    let auth = AuthService::new(&pool);
    let user = auth.login(&username, TEST_PASSWORD).await.unwrap();

    let updated = auth
        .update_account(
            user.id,
            ProfileInput {
                email: format!("{username}@pond.example"),
                ..ProfileInput::default()
            },
            Some(PasswordChange {
                current: TEST_PASSWORD,
                new_password: "tadpole-99",
                confirmation: "tadpole-99",
            }),
        )
        .await
        .unwrap();
    assert_eq!(updated.email.as_str(), format!("{username}@pond.example"));

    assert!(auth.login(&username, "tadpole-99").await.is_ok());
    assert!(auth.login(&username, TEST_PASSWORD).await.is_err());
}

fn reversed_if(key: &str, secret: &EncryptedSecret) -> EncryptedSecret {
    let mut out = secret.clone();
    if secret.key == key {
        out.ciphertext.reverse();
    }
    out
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_reseal_rewrites_every_value() {
    let pool = pool().await;
    let repo = SecretRepository::new(&pool);
    let key = unique("pond_key_");
    repo.upsert_many(&[EncryptedSecret {
        key: key.clone(),
        nonce: vec![0; 12],
        ciphertext: vec![1, 2, 3],
    }])
    .await
    .unwrap();

    let count = repo
        .reseal_all(|s| Ok::<_, RepositoryError>(reversed_if(&key, s)))
        .await
        .unwrap();
    assert!(count >= 1);
    assert_eq!(repo.get(&key).await.unwrap().unwrap().ciphertext, vec![3, 2, 1]);

    repo.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_reseal_waits_for_concurrent_delete() {
    let pool = pool().await;
    let key = unique("pond_key_");
    SecretRepository::new(&pool)
        .upsert_many(&[EncryptedSecret {
            key: key.clone(),
            nonce: vec![0; 12],
            ciphertext: vec![1, 2, 3],
        }])
        .await
        .unwrap();

    let mut tx = pool.begin().await.unwrap();
    sqlx::query("SELECT key FROM admin.secrets WHERE key = $1 FOR UPDATE")
        .bind(&key)
        .execute(&mut *tx)
        .await
        .unwrap();

    let rotation = {
        let pool = pool.clone();
        let key = key.clone();
        tokio::spawn(async move {
            SecretRepository::new(&pool)
                .reseal_all(|s| Ok::<_, RepositoryError>(reversed_if(&key, s)))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!rotation.is_finished());

    sqlx::query("DELETE FROM admin.secrets WHERE key = $1")
        .bind(&key)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    rotation.await.unwrap().unwrap();
    assert!(SecretRepository::new(&pool).get(&key).await.unwrap().is_none());
}
