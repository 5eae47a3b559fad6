use std::path::{Path, PathBuf};

use landclaim_core::{ClaimId, PlayerId};

use crate::schema::SCHEMA_VERSION_FILE;

pub const CLAIM_DATA_DIR: &str = "ClaimData";
pub const PLAYER_DATA_DIR: &str = "PlayerData";

/// Where a world's data lives relative to the data root. The default world
/// keeps its folders at the root itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldFolder<'a> {
    Default,
    Named(&'a str),
}

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn world_root(&self, folder: WorldFolder<'_>) -> PathBuf {
        match folder {
            WorldFolder::Default => self.root.clone(),
            WorldFolder::Named(name) => self.root.join(name),
        }
    }

    pub fn claim_dir(&self, folder: WorldFolder<'_>) -> PathBuf {
        self.world_root(folder).join(CLAIM_DATA_DIR)
    }

    pub fn player_dir(&self, folder: WorldFolder<'_>) -> PathBuf {
        self.world_root(folder).join(PLAYER_DATA_DIR)
    }

    pub fn claim_path(&self, folder: WorldFolder<'_>, id: ClaimId) -> PathBuf {
        self.claim_dir(folder).join(id.to_string())
    }

    pub fn player_path(&self, folder: WorldFolder<'_>, player: PlayerId) -> PathBuf {
        self.player_dir(folder).join(player.to_string())
    }

    pub fn schema_version_path(&self) -> PathBuf {
        self.root.join(SCHEMA_VERSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_lives_at_root() {
        let layout = DataLayout::new("/data");
        let id = ClaimId::new();
        assert_eq!(
            layout.claim_path(WorldFolder::Default, id),
            PathBuf::from(format!("/data/ClaimData/{id}"))
        );
        assert_eq!(
            layout.player_dir(WorldFolder::Named("world_nether")),
            PathBuf::from("/data/world_nether/PlayerData")
        );
        assert_eq!(layout.schema_version_path(), PathBuf::from("/data/_schemaVersion"));
    }
}
