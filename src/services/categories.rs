use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{info, instrument, warn};

use crate::{
    db::DbPool,
    entities::{category, product, product_category},
    errors::ServiceError,
    events::{Event, EventSender},
    validation,
};

/// Resolves a category by exact name, creating it when absent.
///
/// Generic over the connection so it composes into a caller's unit of work
/// (product creation stages its category links through this). Guarantees
/// at-most-one row per name: when the insert loses a race against a
/// concurrent writer, the local attempt is discarded and the winner's row is
/// re-queried and returned instead of surfacing the conflict.
///
/// Returns the row plus whether this call created it.
pub async fn get_or_create<C>(
    conn: &C,
    name: &str,
) -> Result<(category::Model, bool), ServiceError>
where
    C: ConnectionTrait,
{
    let name = validation::validate_not_blank(name, "name")?;

    if let Some(existing) = category::Entity::find()
        .filter(category::Column::Name.eq(name.as_str()))
        .one(conn)
        .await?
    {
        return Ok((existing, false));
    }

    let staged = category::ActiveModel {
        name: Set(name.clone()),
        ..Default::default()
    };

    match staged.insert(conn).await {
        Ok(created) => Ok((created, true)),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            warn!(name = %name, "lost category creation race, returning existing row");
            let existing = category::Entity::find()
                .filter(category::Column::Name.eq(name.as_str()))
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::Conflict(format!(
                        "category '{name}' disappeared after insert conflict"
                    ))
                })?;
            Ok((existing, false))
        }
        Err(err) => Err(ServiceError::Database(err)),
    }
}

/// Stages one `product_categories` edge per name inside the supplied
/// connection/transaction, resolving or creating each category first.
///
/// Endpoint ids are validated before any edge is staged; a dangling product
/// id only surfaces at commit, as a foreign-key violation classified to
/// [`ServiceError::Conflict`].
pub async fn link_product_to_categories<C>(
    conn: &C,
    product_id: i32,
    names: &[String],
) -> Result<Vec<product_category::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    validation::validate_id(product_id, "product_id")?;

    let mut links = Vec::with_capacity(names.len());
    for name in names {
        let (cat, _created) = get_or_create(conn, name).await?;
        validation::validate_id(cat.id, "category_id")?;

        let staged = product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(cat.id),
            ..Default::default()
        };
        let link = staged
            .insert(conn)
            .await
            .map_err(|e| ServiceError::classify_commit(e, "product category link"))?;
        links.push(link);
    }

    Ok(links)
}

/// Service for managing categories and the product↔category association.
pub struct CategoryService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CategoryService {
    /// Creates a new category service instance
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Idempotent lookup-or-insert by name; the public entry point for
    /// shared reference data.
    #[instrument(skip(self))]
    pub async fn get_or_create_category(&self, name: &str) -> Result<category::Model, ServiceError> {
        let (cat, created) = get_or_create(&*self.db, name).await?;

        if created {
            info!(category_id = cat.id, name = %cat.name, "Category created");
            if let Err(e) = self.event_sender.send(Event::CategoryCreated(cat.id)).await {
                warn!(error = %e, category_id = cat.id, "Failed to send category created event");
            }
        }

        Ok(cat)
    }

    /// Creates a category, failing when the name is already taken.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<category::Model, ServiceError> {
        let name = validation::validate_not_blank(name, "name")?;

        let staged = category::ActiveModel {
            name: Set(name.clone()),
            ..Default::default()
        };
        let created = staged
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::classify_commit(e, &format!("category '{name}'")))?;

        info!(category_id = created.id, name = %created.name, "Category created");
        if let Err(e) = self
            .event_sender
            .send(Event::CategoryCreated(created.id))
            .await
        {
            warn!(error = %e, category_id = created.id, "Failed to send category created event");
        }

        Ok(created)
    }

    /// Fetches a category by id.
    #[instrument(skip(self))]
    pub async fn get_category(&self, id: i32) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {id} not found")))
    }

    /// Lists all categories, ordered by name.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(categories)
    }

    /// Renames a category, re-running the name validator and preserving
    /// global uniqueness.
    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: i32,
        name: &str,
    ) -> Result<category::Model, ServiceError> {
        let name = validation::validate_not_blank(name, "name")?;

        let existing = self.get_category(id).await?;

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(name.clone());

        let updated = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::classify_commit(e, &format!("category '{name}'")))?;

        Ok(updated)
    }

    /// Deletes a category and its link rows in one unit of work. Products on
    /// the other end of the links are untouched.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: i32) -> Result<(), ServiceError> {
        // NotFound is cheap to detect before opening the transaction
        self.get_category(id).await?;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    product_category::Entity::delete_many()
                        .filter(product_category::Column::CategoryId.eq(id))
                        .exec(txn)
                        .await?;

                    category::Entity::delete_by_id(id).exec(txn).await?;

                    Ok(())
                })
            })
            .await
            .map_err(ServiceError::from_transaction)?;

        info!(category_id = id, "Category deleted");
        if let Err(e) = self.event_sender.send(Event::CategoryDeleted(id)).await {
            warn!(error = %e, category_id = id, "Failed to send category deleted event");
        }

        Ok(())
    }

    /// Creates a single association edge from already-resolved ids.
    #[instrument(skip(self))]
    pub async fn create_link(
        &self,
        product_id: i32,
        category_id: i32,
    ) -> Result<product_category::Model, ServiceError> {
        validation::validate_id(product_id, "product_id")?;
        validation::validate_id(category_id, "category_id")?;

        let staged = product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
            ..Default::default()
        };
        let link = staged
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::classify_commit(e, "product category link"))?;

        if let Err(e) = self
            .event_sender
            .send(Event::ProductLinkedToCategory {
                product_id,
                category_id,
            })
            .await
        {
            warn!(error = %e, product_id, category_id, "Failed to send link created event");
        }

        Ok(link)
    }

    /// Fetches a single association edge by id.
    #[instrument(skip(self))]
    pub async fn get_link(&self, id: i32) -> Result<product_category::Model, ServiceError> {
        product_category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product category link {id} not found")))
    }

    /// Lists all association edges.
    #[instrument(skip(self))]
    pub async fn list_links(&self) -> Result<Vec<product_category::Model>, ServiceError> {
        let links = product_category::Entity::find().all(&*self.db).await?;
        Ok(links)
    }

    /// Repoints an association edge, re-validating both endpoints.
    #[instrument(skip(self))]
    pub async fn update_link(
        &self,
        id: i32,
        product_id: i32,
        category_id: i32,
    ) -> Result<product_category::Model, ServiceError> {
        validation::validate_id(product_id, "product_id")?;
        validation::validate_id(category_id, "category_id")?;

        let existing = self.get_link(id).await?;

        let mut active: product_category::ActiveModel = existing.into();
        active.product_id = Set(product_id);
        active.category_id = Set(category_id);

        let updated = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::classify_commit(e, "product category link"))?;

        Ok(updated)
    }

    /// Deletes a single association edge. Neither endpoint is touched.
    #[instrument(skip(self))]
    pub async fn delete_link(&self, id: i32) -> Result<(), ServiceError> {
        let existing = self.get_link(id).await?;

        product_category::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    /// Read-only view of the products carrying a category, derived from the
    /// join rows.
    #[instrument(skip(self))]
    pub async fn products_in_category(
        &self,
        category_id: i32,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let cat = self.get_category(category_id).await?;
        let products = cat.find_related(product::Entity).all(&*self.db).await?;
        Ok(products)
    }
}
