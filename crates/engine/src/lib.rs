pub mod bootstrap;
pub mod config;
pub mod error;
mod index;
pub mod player;
pub mod store;
pub mod world;

pub use bootstrap::{LoadReport, QuarantineAction, Quarantined};
pub use config::{ClaimConfig, ConfigError, WorldConfig, WorldConfigLayer};
pub use error::ClaimError;
pub use player::{PlayerData, PlayerWorldData};
pub use store::ClaimStore;
pub use world::{StaticWorlds, WorldDirectory, WorldInfo};
