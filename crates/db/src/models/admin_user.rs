//! Admin user entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use srs_core::types::{DbId, Timestamp};

/// Role names stored in `admin_users.role`.
pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_VIEWER: &str = "viewer";

/// A row from the `admin_users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdminUser {
    pub id: DbId,
    pub email: String,
    /// Argon2id PHC string. Skipped during serialization to prevent exposure.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
}

/// DTO for creating a new admin user.
pub struct CreateAdminUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
}
