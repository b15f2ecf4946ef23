use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    auth,
    db::DbPool,
    entities::user,
    errors::ServiceError,
    events::{Event, EventSender},
    validation,
};

/// Input for registering a user. The plaintext password is hashed before
/// anything is staged and does not outlive this call.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    pub last_name: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
}

/// Partial update of profile fields; credentials change through
/// [`UserService::change_password`] only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip: Option<String>,
}

/// Service for managing user accounts and credentials.
pub struct UserService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    /// Creates a new user service instance
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Registers a user.
    ///
    /// Every field is validated before the row is staged; the username and
    /// email unique indexes are the enforcement boundary for duplicates, and
    /// their violation is classified to [`ServiceError::Duplicate`] at
    /// commit; there is no pre-insert existence query.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        input.validate()?;

        let username = validation::validate_not_blank(&input.username, "username")?;
        let email = validation::validate_email(&input.email)?;
        let last_name = validation::validate_not_blank(&input.last_name, "last_name")?;
        let shipping_address =
            validation::validate_not_blank(&input.shipping_address, "shipping_address")?;
        let shipping_city = validation::validate_not_blank(&input.shipping_city, "shipping_city")?;
        let shipping_state =
            validation::validate_not_blank(&input.shipping_state, "shipping_state")?;
        let shipping_zip = validation::validate_not_blank(&input.shipping_zip, "shipping_zip")?;

        let password_hash = auth::hash_password(&input.password)?;

        let staged = user::ActiveModel {
            username: Set(username),
            email: Set(email),
            first_name: Set(input.first_name),
            last_name: Set(last_name),
            password_hash: Set(password_hash),
            shipping_address: Set(shipping_address),
            shipping_city: Set(shipping_city),
            shipping_state: Set(shipping_state),
            shipping_zip: Set(shipping_zip),
            ..Default::default()
        };

        let created = staged.insert(&*self.db).await.map_err(|e| {
            ServiceError::classify_commit(e, "user with that username or email")
        })?;

        info!(user_id = created.id, username = %created.username, "User registered");
        if let Err(e) = self
            .event_sender
            .send(Event::UserRegistered(created.id))
            .await
        {
            warn!(error = %e, user_id = created.id, "Failed to send user registered event");
        }

        Ok(created)
    }

    /// Fetches a user by id.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {id} not found")))
    }

    /// Fetches a user by username.
    #[instrument(skip(self))]
    pub async fn get_user_by_username(&self, username: &str) -> Result<user::Model, ServiceError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user '{username}' not found")))
    }

    /// Lists all users, ordered by username.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<user::Model>, ServiceError> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(&*self.db)
            .await?;
        Ok(users)
    }

    /// Applies a partial profile update, re-validating every supplied field.
    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        id: i32,
        input: UpdateUserInput,
    ) -> Result<user::Model, ServiceError> {
        let existing = self.get_user(id).await?;
        let mut active: user::ActiveModel = existing.into();

        if let Some(ref username) = input.username {
            active.username = Set(validation::validate_not_blank(username, "username")?);
        }
        if let Some(ref email) = input.email {
            active.email = Set(validation::validate_email(email)?);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(ref last_name) = input.last_name {
            active.last_name = Set(validation::validate_not_blank(last_name, "last_name")?);
        }
        if let Some(ref addr) = input.shipping_address {
            active.shipping_address =
                Set(validation::validate_not_blank(addr, "shipping_address")?);
        }
        if let Some(ref city) = input.shipping_city {
            active.shipping_city = Set(validation::validate_not_blank(city, "shipping_city")?);
        }
        if let Some(ref state) = input.shipping_state {
            active.shipping_state = Set(validation::validate_not_blank(state, "shipping_state")?);
        }
        if let Some(ref zip) = input.shipping_zip {
            active.shipping_zip = Set(validation::validate_not_blank(zip, "shipping_zip")?);
        }

        let updated = active.update(&*self.db).await.map_err(|e| {
            ServiceError::classify_commit(e, "user with that username or email")
        })?;

        info!(user_id = updated.id, "User updated");
        if let Err(e) = self.event_sender.send(Event::UserUpdated(updated.id)).await {
            warn!(error = %e, user_id = updated.id, "Failed to send user updated event");
        }

        Ok(updated)
    }

    /// Verifies a username/password pair and returns the account.
    ///
    /// An unknown username and a wrong password are indistinguishable to the
    /// caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let invalid = || ServiceError::Auth("invalid credentials".to_string());

        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or_else(invalid)?;

        if !found.verify_password(password) {
            return Err(invalid());
        }

        Ok(found)
    }

    /// Replaces the stored hash after verifying the current password.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let account = self.authenticate(username, current_password).await?;

        if new_password.len() < 6 {
            return Err(ServiceError::validation("password", "too-short"));
        }
        let password_hash = auth::hash_password(new_password)?;

        let user_id = account.id;
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(password_hash);
        active.update(&*self.db).await?;

        info!(user_id, "Password changed");
        if let Err(e) = self.event_sender.send(Event::UserUpdated(user_id)).await {
            warn!(error = %e, user_id, "Failed to send user updated event");
        }

        Ok(())
    }

    /// Deletes an account after verifying its credentials. An account with
    /// orders on record cannot be deleted; the foreign key rejects it and
    /// the call fails with [`ServiceError::Conflict`].
    #[instrument(skip(self, password))]
    pub async fn delete_user(&self, username: &str, password: &str) -> Result<(), ServiceError> {
        let account = self.authenticate(username, password).await?;
        let user_id = account.id;

        user::Entity::delete_by_id(user_id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::classify_commit(e, "user"))?;

        info!(user_id, "User deleted");
        if let Err(e) = self.event_sender.send(Event::UserDeleted(user_id)).await {
            warn!(error = %e, user_id, "Failed to send user deleted event");
        }

        Ok(())
    }
}
