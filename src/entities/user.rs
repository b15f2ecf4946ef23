use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::errors::ServiceError;
use crate::validation;

/// User entity. The password is write-only: services hash the plaintext on
/// the way in, the stored hash never serializes, and [`Model::password`]
/// always fails. `username` and `email` are each globally unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,

    pub email: String,

    pub first_name: Option<String>,

    pub last_name: String,

    /// Argon2id PHC string. Never exposed to callers in any serialized form.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub shipping_address: String,

    pub shipping_city: String,

    pub shipping_state: String,

    pub shipping_zip: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// The plaintext password cannot be read back. Assigning a password is a
    /// one-way operation; asking for it is a caller bug, reported through
    /// the validation taxonomy rather than a panic.
    pub fn password(&self) -> Result<String, ServiceError> {
        Err(ServiceError::validation("password", "write-only-field"))
    }

    /// Checks a plaintext candidate against the stored hash.
    pub fn verify_password(&self, plaintext: &str) -> bool {
        auth::verify_password(plaintext, &self.password_hash)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        if let ActiveValue::Set(ref username) = active_model.username {
            validation::validate_not_blank(username, "username")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(ref email) = active_model.email {
            validation::validate_email(email).map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(ref last_name) = active_model.last_name {
            validation::validate_not_blank(last_name, "last_name")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }
        if let ActiveValue::Set(ref password_hash) = active_model.password_hash {
            validation::validate_not_blank(password_hash, "password_hash")
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        Ok(active_model)
    }
}
