mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use montluxe_core::{
    entities::{order, order_detail},
    services::orders::{CreateOrderInput, OrderLineInput},
    ServiceError,
};

#[tokio::test]
async fn creates_order_with_all_line_items() {
    let store = common::setup().await;
    let buyer = common::register_user(&store, "collector").await;
    let first = common::create_product(&store, "Heritage-38", dec!(1450.00), &["Genesis"]).await;
    let second = common::create_product(&store, "Heritage-41", dec!(1650.00), &["Genesis"]).await;

    let created = store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: buyer.id,
            order_details: vec![
                OrderLineInput {
                    product_id: first.id,
                    quantity: 1,
                },
                OrderLineInput {
                    product_id: second.id,
                    quantity: 2,
                },
            ],
        })
        .await
        .expect("order should commit");

    assert_eq!(created.order.user_id, buyer.id);
    assert_eq!(created.details.len(), 2);
    assert!(created.details.iter().all(|d| d.order_id == created.order.id));

    let fetched = store
        .services
        .orders
        .get_order(created.order.id)
        .await
        .expect("order is visible after commit");
    assert_eq!(fetched.id, created.order.id);
    assert_eq!(fetched.user_id, buyer.id);

    let details = store
        .services
        .orders
        .get_order_details(created.order.id)
        .await
        .unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details.iter().map(|d| d.quantity).sum::<i32>(), 3);
}

#[tokio::test]
async fn rolls_back_whole_order_when_a_line_item_references_a_missing_product() {
    let store = common::setup().await;
    let buyer = common::register_user(&store, "collector").await;
    let real = common::create_product(&store, "Heritage-38", dec!(1450.00), &[]).await;

    // The last line item points at a product that does not exist; the
    // foreign key rejects it at commit.
    let result = store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: buyer.id,
            order_details: vec![
                OrderLineInput {
                    product_id: real.id,
                    quantity: 1,
                },
                OrderLineInput {
                    product_id: 9999,
                    quantity: 1,
                },
            ],
        })
        .await;

    assert_matches!(result, Err(ServiceError::Conflict(_)));

    // All or nothing: neither the order nor the valid first line item exists
    let orders = order::Entity::find().all(&*store.db).await.unwrap();
    assert!(orders.is_empty());
    let details = order_detail::Entity::find().all(&*store.db).await.unwrap();
    assert!(details.is_empty());
}

#[tokio::test]
async fn rejects_zero_quantity_before_staging_anything() {
    let store = common::setup().await;
    let buyer = common::register_user(&store, "collector").await;
    let product = common::create_product(&store, "Heritage-38", dec!(1450.00), &[]).await;

    let result = store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: buyer.id,
            order_details: vec![OrderLineInput {
                product_id: product.id,
                quantity: 0,
            }],
        })
        .await;

    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, ref reason })
            if field == "quantity" && reason == "non-positive"
    );

    let orders = order::Entity::find().all(&*store.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn rejects_non_positive_product_ids() {
    let store = common::setup().await;
    let buyer = common::register_user(&store, "collector").await;

    let result = store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: buyer.id,
            order_details: vec![OrderLineInput {
                product_id: 0,
                quantity: 1,
            }],
        })
        .await;

    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, .. }) if field == "product_id"
    );
}

#[tokio::test]
async fn rejects_orders_for_unknown_users() {
    let store = common::setup().await;
    let product = common::create_product(&store, "Heritage-38", dec!(1450.00), &[]).await;

    let result = store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: 42,
            order_details: vec![OrderLineInput {
                product_id: product.id,
                quantity: 1,
            }],
        })
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn rejects_empty_line_item_lists() {
    let store = common::setup().await;
    let buyer = common::register_user(&store, "collector").await;

    let result = store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: buyer.id,
            order_details: vec![],
        })
        .await;

    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, .. }) if field == "order_details"
    );
}

#[tokio::test]
async fn lists_orders_per_user() {
    let store = common::setup().await;
    let alice = common::register_user(&store, "alice").await;
    let bob = common::register_user(&store, "bob").await;
    let product = common::create_product(&store, "Heritage-38", dec!(1450.00), &[]).await;

    for user in [&alice, &alice, &bob] {
        store
            .services
            .orders
            .create_order(CreateOrderInput {
                user_id: user.id,
                order_details: vec![OrderLineInput {
                    product_id: product.id,
                    quantity: 1,
                }],
            })
            .await
            .unwrap();
    }

    let alices = store
        .services
        .orders
        .list_orders_for_user(alice.id)
        .await
        .unwrap();
    assert_eq!(alices.len(), 2);

    let all = store.services.orders.list_orders().await.unwrap();
    assert_eq!(all.len(), 3);
}
