pub mod backend;
pub mod cdn;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::cdn::CdnRefresher;
pub use crate::models::{IMMUTABLE_MAX_AGE_SECS, PutObject};
pub use crate::path::validate_key;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
pub type RefresherHandle = Arc<dyn CdnRefresher + Send + Sync>;
