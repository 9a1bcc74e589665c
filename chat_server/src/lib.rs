// secure_chat/chat_server/src/lib.rs

// Server modules.
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod store;

pub use api::{router, AppState};
pub use config::Args;
pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiPath};
pub use store::ChatStore;
