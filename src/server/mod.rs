pub mod auth;
pub mod handlers;
pub mod metadata;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
