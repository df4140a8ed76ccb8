use axum::{Router, routing::get};

pub mod system;
pub mod users;

/// Router for all origin-gated endpoints.
pub fn router() -> Router {
    Router::new().route(
        "/users",
        get(users::list_users)
            .post(users::register_user)
            .put(users::modify_user),
    )
}
