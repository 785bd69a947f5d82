pub mod key;
pub mod object_store;

pub use object_store::{ObjectStorage, S3Config, S3ObjectStorage};
