// User service: account administration

use marketplace_core::{DomainError, PageRequest, Pagination, Result, Role, User};
use uuid::Uuid;

use crate::api::users::{CreateUserRequest, UpdateUserRequest};
use crate::api::validation::{normalize_email, Validator};
use crate::storage::{CreateUserRow, StorageBackend, UpdateUserRow};

/// Display name derived from an email when none is given.
fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

pub struct UserService {
    db: StorageBackend,
}

impl UserService {
    pub fn new(db: StorageBackend) -> Self {
        Self { db }
    }

    /// Users, newest first.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<User>, Pagination)> {
        let (rows, total) = self.db.list_users(page).await?;
        let users = rows.iter().map(|r| r.to_user()).collect();
        Ok((users, Pagination::new(page, total)))
    }

    pub async fn create(&self, req: CreateUserRequest) -> Result<User> {
        let mut v = Validator::new();
        let email = v.required("email", req.email.as_deref());
        if let Some(email) = email {
            v.email("email", email);
        }
        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        v.finish()?;
        let Some(email) = email.map(normalize_email) else {
            return Err(DomainError::invalid("email", "email is required"));
        };

        let row = self
            .db
            .create_user(CreateUserRow {
                name: name.map_or_else(|| default_name(&email), str::to_string),
                email,
                role: Role::User,
            })
            .await?;
        tracing::info!(user_id = %row.id, "User created");
        Ok(row.to_user())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.db.get_user(id).await?.map(|r| r.to_user()))
    }

    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<Option<User>> {
        let mut v = Validator::new();
        if let Some(name) = &req.name {
            v.non_blank("name", name);
        }
        if let Some(email) = &req.email {
            v.email("email", email);
        }
        v.finish()?;

        let input = UpdateUserRow {
            name: req.name.map(|n| n.trim().to_string()),
            email: req.email.as_deref().map(normalize_email),
            role: req.role,
        };
        let row = self.db.update_user(id, input).await?;
        if let Some(row) = &row {
            tracing::info!(user_id = %row.id, role = %row.role, "User updated");
        }
        Ok(row.map(|r| r.to_user()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let deleted = self.db.delete_user(id).await?;
        if deleted {
            tracing::info!(user_id = %id, "User deleted");
        }
        Ok(deleted)
    }
}
