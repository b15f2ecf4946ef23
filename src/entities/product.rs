use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::validation;

/// Product entity: one row per catalog item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub description: String,

    /// Price in integer minor currency units (cents). Callers hand in a
    /// decimal dollar amount; it is converted exactly once on the way in and
    /// never stored with fractional cents.
    pub price: i64,

    /// On-hand stock. Zero is valid (sold out), negative is not.
    pub item_quantity: i32,

    pub image_url: String,

    pub image_alt: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_category::Entity")]
    ProductCategories,
    #[sea_orm(has_many = "super::order_detail::Entity")]
    OrderDetails,
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategories.def()
    }
}

impl Related<super::order_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

/// Categories are reachable through the join table only.
impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_category::Relation::Product.def().rev())
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Re-runs the field validators on every save. The service layer has
    /// already validated and trimmed by the time a row is staged; this hook
    /// keeps a write that bypasses the services from persisting bad data.
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        if let ActiveValue::Set(ref name) = active_model.name {
            validation::validate_not_blank(name, "name")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(ref description) = active_model.description {
            validation::validate_not_blank(description, "description")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(ref image_url) = active_model.image_url {
            validation::validate_not_blank(image_url, "image_url")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(ref image_alt) = active_model.image_alt {
            validation::validate_not_blank(image_alt, "image_alt")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(price) = active_model.price {
            validation::validate_positive(price, "price")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(item_quantity) = active_model.item_quantity {
            validation::validate_non_negative(i64::from(item_quantity), "item_quantity")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        Ok(active_model)
    }
}
