pub mod error;
pub mod index;
pub mod record;

pub use error::IndexError;
pub use index::VectorIndex;
pub use record::{record_id, IndexHit, IndexStamp, SourceCount, SCHEMA_VERSION};
