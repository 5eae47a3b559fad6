pub mod boundary;
pub mod claim;
pub mod error;
pub mod ids;
pub mod position;

pub use boundary::Boundary;
pub use claim::{Claim, ClaimOwner, TrustEntry, TrustLevel};
pub use error::CoreError;
pub use ids::*;
pub use position::{Position, format_position, parse_position};
