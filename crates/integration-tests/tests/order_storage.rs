//! Order writes against MySQL.
//!
//! Ignored by default. They need the database described in
//! `woo_backoffice_integration_tests::scratch`:
//!
//! ```bash
//! TEST_DATABASE_URL=mysql://... cargo test -p woo-backoffice-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rust_decimal::Decimal;
use serde_json::json;

use woo_backoffice_admin::config::OrderConfig;
use woo_backoffice_admin::db::options::ORDER_COUNTER_OPTION;
use woo_backoffice_admin::db::{OptionRepository, OrderRepository};
use woo_backoffice_admin::models::CurrentUser;
use woo_backoffice_admin::services::OrderService;
use woo_backoffice_admin::services::orders::{
    CreatedOrder, OrderRequest, RequestOrigin, ensure_headroom, numbering,
};
use woo_backoffice_admin::woocommerce::{
    EmailTrigger, OrderTransport, RetryPolicy, StatusUpdate, WooCommerceError,
};
use woo_backoffice_core::{OrderId, ProductId, UserId, UserRole};
use woo_backoffice_integration_tests::ScratchStore;

/// Accepts every status update without contacting a store.
struct AcceptingStore;

impl OrderTransport for AcceptingStore {
    async fn update_order(
        &self,
        _id: OrderId,
        _update: &StatusUpdate,
    ) -> Result<(), WooCommerceError> {
        Ok(())
    }
}

/// Product IDs far above anything a real store has issued, so the outbox
/// rows of scratch orders cannot clash with real ones.
fn unused_post_id() -> u64 {
    rand::rng().random_range(1_000_000_000_000..2_000_000_000_000)
}

/// Two shirts at 59.00, 10.00 shipping, 10% off.
async fn place_order(store: &ScratchStore, product: ProductId) -> CreatedOrder {
    let config = OrderConfig {
        number_prefix: "W".to_string(),
        currency: "PEN".to_string(),
        email_trigger_delay: Duration::ZERO,
    };
    let request: OrderRequest = serde_json::from_value(json!({
        "customer": {
            "first_name": "Juan",
            "last_name": "Pérez",
            "company": "",
            "address_1": "Av. Principal 123",
            "address_2": "",
            "city": "Lima",
            "state": "LIM",
            "postcode": "",
            "country": "PE",
            "email": "",
            "phone": "987654321",
        },
        "items": [{ "product_id": product.as_u64(), "quantity": 2, "price": "59.00" }],
        "shipping_cost": "10.00",
        "discount_percentage": "10",
    }))
    .unwrap();
    let actor = CurrentUser {
        id: UserId::new(1),
        username: "ana".to_string(),
        full_name: None,
        role: UserRole::Advisor,
    };
    let trigger = Arc::new(EmailTrigger::new(
        AcceptingStore,
        RetryPolicy::default(),
        Duration::ZERO,
    ));

    OrderService::new(&store.pool, &store.tables, &config, "")
        .create(&request, &actor, &RequestOrigin::default(), &trigger)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires MySQL"]
async fn test_order_numbers_follow_each_other() {
    let store = ScratchStore::create().await;

    let mut tx = store.pool.begin().await.unwrap();
    let mut issued = Vec::new();
    for _ in 0..3 {
        let number = numbering::allocate(&mut *tx, &store.tables, "W").await.unwrap();
        issued.push(number.into_inner());
    }
    tx.commit().await.unwrap();

    assert_eq!(issued, ["W-00001", "W-00002", "W-00003"]);
    let counter = OptionRepository::new(&store.pool, &store.tables)
        .get(ORDER_COUNTER_OPTION)
        .await
        .unwrap();
    assert_eq!(counter.as_deref(), Some("3"));

    store.teardown(&[]).await;
}

#[tokio::test]
#[ignore = "Requires MySQL"]
async fn test_orders_counter_is_raised_past_post_ids() {
    let store = ScratchStore::create().await;
    store.insert_post(50_000, "page", "Contacto").await;
    let orders = OrderRepository::new(&store.pool, &store.tables);

    orders.set_orders_auto_increment(49_999).await.unwrap();
    assert_eq!(ensure_headroom(&orders).await.unwrap(), Some(50_001));
    assert_eq!(orders.orders_auto_increment().await.unwrap(), 50_001);

    orders.set_orders_auto_increment(50_005).await.unwrap();
    assert_eq!(ensure_headroom(&orders).await.unwrap(), None);
    assert_eq!(orders.orders_auto_increment().await.unwrap(), 50_005);

    store.teardown(&[]).await;
}

#[tokio::test]
#[ignore = "Requires MySQL"]
async fn test_order_meta_agrees_across_storages() {
    let store = ScratchStore::create().await;
    let product = store.insert_product(unused_post_id(), "59.00", 10).await;

    let created = place_order(&store, product).await;
    assert_eq!(created.total, Decimal::new(11_620, 2));
    assert!(created.order_id.as_u64() > product.as_u64());

    let (hpos, legacy) = store.order_meta(created.order_id).await;
    let legacy: BTreeMap<String, String> = legacy.into_iter().collect();
    assert!(!hpos.is_empty());
    for (key, value) in &hpos {
        assert_eq!(legacy.get(key), Some(value), "{key}");
    }
    assert_eq!(legacy["_order_number"], "W-00001");
    assert_eq!(legacy["_order_total"], "116.20");
    assert_eq!(legacy["_cart_discount"], "10.00");

    let total: Option<Decimal> = sqlx::query_scalar(&format!(
        "SELECT total_amount FROM {} WHERE id = ?",
        store.tables.wc_orders()
    ))
    .bind(created.order_id)
    .fetch_one(&store.pool)
    .await
    .unwrap();
    assert_eq!(total.map(|t| t.normalize()), Some(created.total.normalize()));

    store.teardown(&[created.order_id]).await;
}

#[tokio::test]
#[ignore = "Requires MySQL"]
async fn test_resubmitted_payload_creates_another_order() {
    let store = ScratchStore::create().await;
    let product = store.insert_product(unused_post_id(), "59.00", 10).await;

    let first = place_order(&store, product).await;
    let second = place_order(&store, product).await;

    assert_ne!(first.order_id, second.order_id);
    assert_eq!(first.order_number.as_str(), "W-00001");
    assert_eq!(second.order_number.as_str(), "W-00002");
    assert_eq!(first.total, second.total);
    assert_eq!(store.stock_of(product).await.as_deref(), Some("6"));

    store.teardown(&[first.order_id, second.order_id]).await;
}
