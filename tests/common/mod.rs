//! Shared harness for integration tests: a sqlite-backed store in a
//! throwaway temp directory, migrated to the current schema.
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use montluxe_core::{
    db::{self, DbConfig, DbPool},
    entities::{product, user},
    events,
    services::{products::CreateProductInput, users::CreateUserInput, AppServices},
};

pub struct TestStore {
    pub services: AppServices,
    pub db: Arc<DbPool>,
    // Dropping the TempDir deletes the database file with it
    _tmp: TempDir,
}

/// Construct a fresh store with its own database file.
pub async fn setup() -> TestStore {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let db_path = tmp.path().join("montluxe_test.db");

    let cfg = DbConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 2,
        min_connections: 1,
        ..Default::default()
    };

    let pool = db::establish_connection_with_config(&cfg)
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    // Drain events so sends never block on a full buffer
    let (event_sender, mut rx) = events::channel(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let db = Arc::new(pool);
    let services = AppServices::new(db.clone(), event_sender);

    TestStore {
        services,
        db,
        _tmp: tmp,
    }
}

/// Registers a user with sane defaults for the fields a test does not care
/// about.
pub async fn register_user(store: &TestStore, username: &str) -> user::Model {
    store
        .services
        .users
        .create_user(CreateUserInput {
            username: username.to_string(),
            email: format!("{username}@montluxe.com"),
            first_name: Some("Test".to_string()),
            last_name: "Buyer".to_string(),
            password: "secret-password".to_string(),
            shipping_address: "1 Horology Way".to_string(),
            shipping_city: "Geneva".to_string(),
            shipping_state: "GE".to_string(),
            shipping_zip: "1201".to_string(),
        })
        .await
        .expect("register test user")
}

/// Creates a product with the given name, dollar price, and category names.
pub async fn create_product(
    store: &TestStore,
    name: &str,
    price: Decimal,
    categories: &[&str],
) -> product::Model {
    store
        .services
        .products
        .create_product(CreateProductInput {
            name: name.to_string(),
            description: format!("{name}, automatic movement, sapphire crystal"),
            price,
            item_quantity: 5,
            image_url: format!("https://cdn.montluxe.example/{name}.jpg"),
            image_alt: format!("{name} on a leather strap"),
            categories: categories.iter().map(|c| (*c).to_string()).collect(),
        })
        .await
        .expect("create test product")
}
