use crate::models::{CreateUser, Page, User, UserFilter};

/// GET /users users
/// List users.
///
/// Query:
///   $ref: UserFilter
///
/// Response 200:
///   $ref: Page<User>
pub async fn list_users() {}

/// GET /users/:id users
/// Fetch one user.
///
/// Path:
///   id: The user ID {integer}
///
/// Response 200:
///   $ref: User
/// Response 404:
///   $ref: models.ApiError
///   No such user.
pub async fn get_user() {}

/// POST /users users
/// Create a user.
///
/// Request body:
///   $ref: CreateUser
///
/// Response 201: $ref: User
/// Response 422: $default
pub async fn create_user() {}

/// POST /login auth
/// Sign in.
///
/// Form:
///   user: Login name {required}
///   password: Secret {required}
///
/// Response 204: $empty
pub async fn login() {}

/// Helper without a directive.
pub fn page_size() -> usize {
    20
}
