pub mod error;
pub mod flat_file;
pub mod layout;
pub mod record;
pub mod schema;
pub mod traits;

pub use error::StorageError;
pub use flat_file::FlatFileStorage;
pub use layout::{DataLayout, WorldFolder};
pub use record::{ClaimRecord, PlayerRecord, SubdivisionRecord};
pub use traits::*;
