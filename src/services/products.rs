use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{category, product, product_category},
    errors::ServiceError,
    events::{Event, EventSender},
    services::categories,
    validation,
};

/// Input for creating a product. `price` is a decimal dollar amount and is
/// converted to integer minor units before anything is staged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub item_quantity: i32,
    pub image_url: String,
    pub image_alt: String,
    /// Category names to link; resolved or created inside the same unit of
    /// work as the product row.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Partial update; each supplied field re-runs the same validator the
/// constructor used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub item_quantity: Option<i32>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
}

/// Service for managing products
pub struct ProductService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    /// Creates a new product service instance
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a product together with its category links as one atomic unit
    /// of work.
    ///
    /// All field validation happens before the transaction opens; on any
    /// commit-time violation the whole unit rolls back and the classified
    /// error is returned. A product is never visible without its links.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let name = validation::validate_not_blank(&input.name, "name")?;
        let description = validation::validate_not_blank(&input.description, "description")?;
        let image_url = validation::validate_not_blank(&input.image_url, "image_url")?;
        let image_alt = validation::validate_not_blank(&input.image_alt, "image_alt")?;
        let price_cents = validation::dollars_to_cents(input.price)?;
        validation::validate_non_negative(i64::from(input.item_quantity), "item_quantity")?;
        let item_quantity = input.item_quantity;
        let category_names = input.categories;

        let transaction_id = Uuid::new_v4();
        debug!(transaction_id = %transaction_id, "Starting product creation transaction");

        let created = self
            .db
            .transaction::<_, product::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let staged = product::ActiveModel {
                        name: Set(name),
                        description: Set(description),
                        price: Set(price_cents),
                        item_quantity: Set(item_quantity),
                        image_url: Set(image_url),
                        image_alt: Set(image_alt),
                        ..Default::default()
                    };
                    let created = staged
                        .insert(txn)
                        .await
                        .map_err(|e| ServiceError::classify_commit(e, "product"))?;

                    categories::link_product_to_categories(txn, created.id, &category_names)
                        .await?;

                    Ok(created)
                })
            })
            .await
            .map_err(ServiceError::from_transaction)?;

        info!(product_id = created.id, name = %created.name, "Product created");
        if let Err(e) = self
            .event_sender
            .send(Event::ProductCreated(created.id))
            .await
        {
            warn!(error = %e, product_id = created.id, "Failed to send product created event");
        }

        Ok(created)
    }

    /// Fetches a product by id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id} not found")))
    }

    /// Lists all products, ordered by id.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = product::Entity::find()
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(products)
    }

    /// Applies a partial update, re-validating every supplied field.
    ///
    /// Fails atomically: the first invalid field rejects the call before any
    /// change is staged.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: i32,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();

        if let Some(ref name) = input.name {
            active.name = Set(validation::validate_not_blank(name, "name")?);
        }
        if let Some(ref description) = input.description {
            active.description = Set(validation::validate_not_blank(description, "description")?);
        }
        if let Some(price) = input.price {
            active.price = Set(validation::dollars_to_cents(price)?);
        }
        if let Some(item_quantity) = input.item_quantity {
            validation::validate_non_negative(i64::from(item_quantity), "item_quantity")?;
            active.item_quantity = Set(item_quantity);
        }
        if let Some(ref image_url) = input.image_url {
            active.image_url = Set(validation::validate_not_blank(image_url, "image_url")?);
        }
        if let Some(ref image_alt) = input.image_alt {
            active.image_alt = Set(validation::validate_not_blank(image_alt, "image_alt")?);
        }

        let updated = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::classify_commit(e, "product"))?;

        info!(product_id = updated.id, "Product updated");
        if let Err(e) = self
            .event_sender
            .send(Event::ProductUpdated(updated.id))
            .await
        {
            warn!(error = %e, product_id = updated.id, "Failed to send product updated event");
        }

        Ok(updated)
    }

    /// Deletes a product and, in the same unit of work, its category link
    /// rows. Categories themselves are left intact. A product still
    /// referenced by an order line item cannot be deleted; the foreign key
    /// rejects it and the call fails with [`ServiceError::Conflict`].
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i32) -> Result<(), ServiceError> {
        self.get_product(id).await?;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    product_category::Entity::delete_many()
                        .filter(product_category::Column::ProductId.eq(id))
                        .exec(txn)
                        .await?;

                    product::Entity::delete_by_id(id)
                        .exec(txn)
                        .await
                        .map_err(|e| ServiceError::classify_commit(e, "product"))?;

                    Ok(())
                })
            })
            .await
            .map_err(ServiceError::from_transaction)?;

        info!(product_id = id, "Product deleted");
        if let Err(e) = self.event_sender.send(Event::ProductDeleted(id)).await {
            warn!(error = %e, product_id = id, "Failed to send product deleted event");
        }

        Ok(())
    }

    /// Read-only view of a product's categories, derived from the join rows.
    #[instrument(skip(self))]
    pub async fn categories_of(&self, product_id: i32) -> Result<Vec<category::Model>, ServiceError> {
        let prod = self.get_product(product_id).await?;
        let cats = prod.find_related(category::Entity).all(&*self.db).await?;
        Ok(cats)
    }
}
