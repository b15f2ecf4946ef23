mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use montluxe_core::{
    entities::{category, product, product_category},
    services::{
        orders::{CreateOrderInput, OrderLineInput},
        products::{CreateProductInput, UpdateProductInput},
    },
    ServiceError,
};

#[tokio::test]
async fn stores_price_as_integer_minor_units() {
    let store = common::setup().await;

    let created = common::create_product(&store, "Heritage-38", dec!(499.99), &[]).await;
    assert_eq!(created.price, 49999);

    let fetched = store.services.products.get_product(created.id).await.unwrap();
    assert_eq!(fetched.price, 49999);
}

#[tokio::test]
async fn creates_category_links_in_the_same_unit_of_work() {
    let store = common::setup().await;

    let created =
        common::create_product(&store, "Heritage-38", dec!(1450.00), &["Genesis", "Elite"]).await;

    let cats = store
        .services
        .products
        .categories_of(created.id)
        .await
        .unwrap();
    let mut names: Vec<_> = cats.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Elite", "Genesis"]);

    // A second product reusing a name must not duplicate the category
    common::create_product(&store, "Heritage-41", dec!(1650.00), &["Genesis"]).await;
    let all_categories = category::Entity::find().all(&*store.db).await.unwrap();
    assert_eq!(all_categories.len(), 2);
}

#[tokio::test]
async fn constructor_fails_atomically_on_any_bad_field() {
    let store = common::setup().await;

    let result = store
        .services
        .products
        .create_product(CreateProductInput {
            name: "Heritage-38".to_string(),
            description: "   ".to_string(),
            price: dec!(1450.00),
            item_quantity: 5,
            image_url: "https://cdn.montluxe.example/h38.jpg".to_string(),
            image_alt: "Heritage 38 on a strap".to_string(),
            categories: vec!["Genesis".to_string()],
        })
        .await;

    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, ref reason })
            if field == "description" && reason == "blank"
    );

    // Nothing staged: no product, and no category side effects either
    assert!(product::Entity::find().all(&*store.db).await.unwrap().is_empty());
    assert!(category::Entity::find().all(&*store.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejects_non_positive_prices_and_negative_stock() {
    let store = common::setup().await;

    let mut input = CreateProductInput {
        name: "Heritage-38".to_string(),
        description: "Automatic".to_string(),
        price: dec!(0.00),
        item_quantity: 5,
        image_url: "https://cdn.montluxe.example/h38.jpg".to_string(),
        image_alt: "Heritage 38".to_string(),
        categories: vec![],
    };

    let result = store.services.products.create_product(input.clone()).await;
    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, ref reason })
            if field == "price" && reason == "non-positive"
    );

    input.price = dec!(1450.00);
    input.item_quantity = -1;
    let result = store.services.products.create_product(input).await;
    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, ref reason })
            if field == "item_quantity" && reason == "negative"
    );
}

#[tokio::test]
async fn updates_revalidate_each_supplied_field() {
    let store = common::setup().await;
    let created = common::create_product(&store, "Heritage-38", dec!(1450.00), &[]).await;

    let updated = store
        .services
        .products
        .update_product(
            created.id,
            UpdateProductInput {
                price: Some(dec!(12.34)),
                item_quantity: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, 1234);
    assert_eq!(updated.item_quantity, 0);

    let result = store
        .services
        .products
        .update_product(
            created.id,
            UpdateProductInput {
                name: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(
        result,
        Err(ServiceError::Validation { ref field, ref reason })
            if field == "name" && reason == "blank"
    );

    // The failed update changed nothing
    let fetched = store.services.products.get_product(created.id).await.unwrap();
    assert_eq!(fetched.name, "Heritage-38");
}

#[tokio::test]
async fn delete_cascades_links_but_not_categories() {
    let store = common::setup().await;
    let created =
        common::create_product(&store, "Heritage-38", dec!(1450.00), &["Genesis", "Elite"]).await;

    store.services.products.delete_product(created.id).await.unwrap();

    let links = product_category::Entity::find().all(&*store.db).await.unwrap();
    assert!(links.is_empty());

    // Categories are shared reference data and survive the delete
    let cats = category::Entity::find().all(&*store.db).await.unwrap();
    assert_eq!(cats.len(), 2);

    let result = store.services.products.get_product(created.id).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));

    // Deleting again targets no persisted row
    let result = store.services.products.delete_product(created.id).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn cannot_delete_a_product_referenced_by_an_order() {
    let store = common::setup().await;
    let buyer = common::register_user(&store, "collector").await;
    let created = common::create_product(&store, "Heritage-38", dec!(1450.00), &[]).await;

    store
        .services
        .orders
        .create_order(CreateOrderInput {
            user_id: buyer.id,
            order_details: vec![OrderLineInput {
                product_id: created.id,
                quantity: 1,
            }],
        })
        .await
        .unwrap();

    let result = store.services.products.delete_product(created.id).await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));

    // The failed delete rolled back completely; the product is still there
    assert!(store.services.products.get_product(created.id).await.is_ok());
}
