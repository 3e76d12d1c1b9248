pub mod config;
pub mod db;
pub mod error;
pub mod odata;
pub mod redirect;
pub mod resource;
pub mod server;
pub mod token;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{create_router, AppState};
