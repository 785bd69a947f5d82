pub mod manager;
pub mod model;
pub mod path;
pub mod store;

pub use manager::FsManager;
pub use model::{DriveError, FsNode, ListQuery, NodeId, NodeType, Page};
pub use store::postgres::PostgresNodeStore;
pub use store::NodeStore;
