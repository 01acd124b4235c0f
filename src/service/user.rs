use std::sync::Arc;

use log::{debug, info, warn, Logger};
use time::{Date, OffsetDateTime};

use crate::db::Db;
use crate::errors::BackendError;
use crate::user::{User, UserFields, UserPatch, UserPayload};
use crate::validation;
use crate::Id;

/// Users and the friendship graph.
///
/// Friendship is symmetric and confirmed as soon as it is requested.
pub struct UserService {
    logger: Arc<Logger>,
    db: Arc<dyn Db>,
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

impl UserService {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db>) -> Self {
        UserService { logger, db }
    }

    pub async fn all(&self) -> Result<Vec<User>, BackendError> {
        debug!(self.logger, "Retrieving all users...");

        self.db.users().await
    }

    pub async fn find(&self, id: Id) -> Result<User, BackendError> {
        debug!(self.logger, "Retrieving user..."; "id" => id);

        self.db
            .user(id)
            .await?
            .ok_or(BackendError::UserNotFound(id))
    }

    /// Validates and registers a new user. A blank or missing name is
    /// replaced by the login.
    pub async fn create(&self, payload: UserPayload) -> Result<User, BackendError> {
        let email = payload.email.ok_or(BackendError::MissingField("email"))?;
        validation::email(&email)?;

        let login = payload.login.ok_or(BackendError::MissingField("login"))?;
        validation::login(&login)?;

        let birthday = payload
            .birthday
            .ok_or(BackendError::MissingField("birthday"))?;
        validation::birthday(birthday, today())?;

        self.ensure_email_available(&email, None).await?;

        let fields = UserFields {
            name: validation::display_name(payload.name.as_deref(), &login),
            email,
            login,
            birthday,
        };

        let id = self.db.insert_user(fields.clone()).await?;
        info!(self.logger, "Created user"; "id" => id);

        Ok(fields.into_user(id))
    }

    /// Overwrites the fields present in the payload, leaving the rest
    /// alone.
    pub async fn update(&self, payload: UserPayload) -> Result<User, BackendError> {
        let id = payload.id.ok_or(BackendError::MissingField("id"))?;
        let existing = self.find(id).await?;

        if let Some(email) = &payload.email {
            validation::email(email)?;

            if *email != existing.email {
                self.ensure_email_available(email, Some(id)).await?;
            }
        }

        if let Some(login) = &payload.login {
            validation::login(login)?;
        }

        if let Some(birthday) = payload.birthday {
            validation::birthday(birthday, today())?;
        }

        let patch = UserPatch {
            email: payload.email,
            login: payload.login,
            name: payload.name,
            birthday: payload.birthday,
        };

        if !self.db.update_user(id, patch).await? {
            return Err(BackendError::UserNotFound(id));
        }

        info!(self.logger, "Updated user"; "id" => id);

        self.find(id).await
    }

    pub async fn delete(&self, id: Id) -> Result<(), BackendError> {
        if !self.db.delete_user(id).await? {
            return Err(BackendError::UserNotFound(id));
        }

        info!(self.logger, "Deleted user"; "id" => id);
        Ok(())
    }

    /// Makes the two users friends of each other. Adding an existing
    /// friend again changes nothing.
    pub async fn add_friend(&self, user_id: Id, friend_id: Id) -> Result<(), BackendError> {
        self.require_pair(user_id, friend_id).await?;
        self.db.insert_friendship(user_id, friend_id).await?;

        info!(self.logger, "Added friend"; "user_id" => user_id, "friend_id" => friend_id);
        Ok(())
    }

    /// Ends the friendship on both sides. Removing someone who is not a
    /// friend changes nothing.
    pub async fn delete_friend(&self, user_id: Id, friend_id: Id) -> Result<(), BackendError> {
        self.require_pair(user_id, friend_id).await?;
        self.db.delete_friendship(user_id, friend_id).await?;

        info!(self.logger, "Removed friend"; "user_id" => user_id, "friend_id" => friend_id);
        Ok(())
    }

    pub async fn friends(&self, id: Id) -> Result<Vec<User>, BackendError> {
        self.find(id).await?;

        self.db.friends(id).await
    }

    pub async fn common_friends(&self, id: Id, other_id: Id) -> Result<Vec<User>, BackendError> {
        self.require_pair(id, other_id).await?;

        self.db.common_friends(id, other_id).await
    }

    /// Checks that both users exist and are distinct.
    async fn require_pair(&self, id: Id, other_id: Id) -> Result<(), BackendError> {
        self.find(id).await?;
        self.find(other_id).await?;

        if id == other_id {
            warn!(self.logger, "Rejected self-friendship"; "id" => id);
            return Err(BackendError::SelfFriendship(id));
        }

        Ok(())
    }

    async fn ensure_email_available(&self, email: &str, owner: Option<Id>) -> Result<(), BackendError> {
        match self.db.user_id_by_email(email).await? {
            Some(existing) if Some(existing) != owner => {
                warn!(self.logger, "Email already in use"; "existing_id" => existing);
                Err(BackendError::EmailAlreadyExists(email.to_owned()))
            }
            _ => Ok(()),
        }
    }
}
