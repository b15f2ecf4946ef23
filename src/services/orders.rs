use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{order, order_detail, user},
    errors::ServiceError,
    events::{Event, EventSender},
    validation,
};

/// Input for placing an order: the buying user and at least one line item.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub user_id: i32,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub order_details: Vec<OrderLineInput>,
}

/// One requested line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: i32,
    pub quantity: i32,
}

/// A committed order together with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order: order::Model,
    pub details: Vec<order_detail::Model>,
}

/// Service coordinating the atomic order + line-items write protocol.
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Places an order.
    ///
    /// Protocol, in order:
    /// 1. the user must exist (`NotFound` otherwise);
    /// 2. every line item must carry `product_id >= 1` and `quantity >= 1`;
    ///    one bad item rejects the whole call before anything is staged;
    /// 3. the order row is staged, then one detail row per line item;
    /// 4. all rows commit as a single unit;
    /// 5. an integrity violation at commit (e.g. a product deleted since
    ///    validation) rolls the whole unit back and surfaces as `Conflict`.
    ///
    /// The caller observes either the order with all its line items, or
    /// nothing.
    #[instrument(skip(self, input), fields(user_id = %input.user_id, items = input.order_details.len()))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<CreatedOrder, ServiceError> {
        input.validate()?;

        let user_id = input.user_id;
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {user_id} not found")))?;

        // One bad line item rejects the whole call, before anything is staged
        for item in &input.order_details {
            validation::validate_id(item.product_id, "product_id")?;
            validation::validate_positive(i64::from(item.quantity), "quantity")?;
        }

        let items = input.order_details;
        let transaction_id = Uuid::new_v4();
        debug!(transaction_id = %transaction_id, user_id, "Starting order transaction");

        let created = self
            .db
            .transaction::<_, CreatedOrder, ServiceError>(move |txn| {
                Box::pin(async move {
                    let staged = order::ActiveModel {
                        user_id: Set(user_id),
                        ..Default::default()
                    };
                    let saved_order = staged
                        .insert(txn)
                        .await
                        .map_err(|e| ServiceError::classify_commit(e, "order"))?;

                    let mut details = Vec::with_capacity(items.len());
                    for item in &items {
                        let staged = order_detail::ActiveModel {
                            order_id: Set(saved_order.id),
                            product_id: Set(item.product_id),
                            quantity: Set(item.quantity),
                            ..Default::default()
                        };
                        let saved_detail = staged
                            .insert(txn)
                            .await
                            .map_err(|e| ServiceError::classify_commit(e, "order line item"))?;
                        details.push(saved_detail);
                    }

                    Ok(CreatedOrder {
                        order: saved_order,
                        details,
                    })
                })
            })
            .await
            .map_err(ServiceError::from_transaction)?;

        info!(
            order_id = created.order.id,
            user_id,
            items_count = created.details.len(),
            "Order created"
        );
        if let Err(e) = self
            .event_sender
            .send(Event::OrderCreated(created.order.id))
            .await
        {
            warn!(error = %e, order_id = created.order.id, "Failed to send order created event");
        }

        Ok(created)
    }

    /// Fetches an order by id.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: i32) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id} not found")))
    }

    /// Fetches an order's line items.
    #[instrument(skip(self))]
    pub async fn get_order_details(
        &self,
        order_id: i32,
    ) -> Result<Vec<order_detail::Model>, ServiceError> {
        let found = self.get_order(order_id).await?;
        let details = found
            .find_related(order_detail::Entity)
            .all(&*self.db)
            .await?;
        Ok(details)
    }

    /// Lists all orders, oldest first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<order::Model>, ServiceError> {
        let orders = order::Entity::find()
            .order_by_asc(order::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    /// Lists the orders belonging to one user.
    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_asc(order::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    /// Lists all line items across orders.
    #[instrument(skip(self))]
    pub async fn list_order_details(&self) -> Result<Vec<order_detail::Model>, ServiceError> {
        let details = order_detail::Entity::find().all(&*self.db).await?;
        Ok(details)
    }
}
