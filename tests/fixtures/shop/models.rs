use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier {required}
    pub user_id: u64,
    pub display_name: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    /// Who this user reports to
    pub manager: Option<Box<User>>,
    #[serde(skip)]
    pub password_hash: String,
}

/// Account state.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    OnHold,
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    /// Name shown to others {required}
    pub display_name: String,
    /// Contact address {email}
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    /// Search text
    pub q: Option<String>,
    /// Page number {default: 1, range: 1-}
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}
