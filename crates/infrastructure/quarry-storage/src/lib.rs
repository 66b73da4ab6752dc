pub mod digest;
pub mod error;
pub mod transaction;

pub use digest::{digest_bytes, digest_file, read_digest_file, Algorithm};
pub use error::StorageError;
pub use transaction::{FsEvent, FsTransaction};
