pub mod manager;
pub mod model;
pub mod store;

pub use manager::{require_edit, ShareManager};
pub use model::{AccessLevel, NewShare, ShareLink, SharePermissions, ShareUpdate, ShareWithNode};
pub use store::postgres::PostgresShareStore;
pub use store::ShareStore;
