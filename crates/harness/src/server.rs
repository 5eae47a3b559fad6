use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use landclaim_core::{Boundary, Claim, ClaimId, ClaimOwner, PlayerId, Position, WorldId};
use landclaim_engine::{
    ClaimConfig, ClaimError, ClaimStore, LoadReport, StaticWorlds, WorldDirectory, WorldInfo,
};
use landclaim_storage::{DataLayout, WorldFolder};
use tempfile::TempDir;

/// Routes engine logs through the test writer. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A claim store over a throwaway data directory with two worlds: the
/// default `world` and `world_nether`.
pub struct TestServer {
    pub dir: TempDir,
    pub overworld: WorldInfo,
    pub nether: WorldInfo,
    pub config: ClaimConfig,
    pub store: ClaimStore,
}

impl TestServer {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(ClaimConfig::default())
    }

    /// Opens and loads the store, as a server does at startup.
    pub fn with_config(config: ClaimConfig) -> Result<Self, Box<dyn std::error::Error>> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let overworld = WorldInfo::new(WorldId::new(), "world");
        let nether = WorldInfo::new(WorldId::new(), "world_nether");
        let store = ClaimStore::open(
            dir.path(),
            Self::directory(&overworld, Some(&nether)),
            config.clone(),
        )?;
        store.load()?;
        Ok(Self {
            dir,
            overworld,
            nether,
            config,
            store,
        })
    }

    fn directory(overworld: &WorldInfo, nether: Option<&WorldInfo>) -> Arc<dyn WorldDirectory> {
        let mut worlds = StaticWorlds::new(overworld.clone());
        if let Some(nether) = nether {
            worlds = worlds.with_world(nether.clone());
        }
        Arc::new(worlds)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(self.dir.path())
    }

    pub fn world(&self) -> WorldId {
        self.overworld.id
    }

    /// Replaces the store with a fresh one over the same directory and loads
    /// it, as a server restart would.
    pub fn restart(&mut self) -> Result<LoadReport, ClaimError> {
        self.store = ClaimStore::open(
            self.dir.path(),
            Self::directory(&self.overworld, Some(&self.nether)),
            self.config.clone(),
        )?;
        self.store.load()
    }

    /// Restarts with the nether world gone from the server.
    pub fn restart_without_nether(&mut self) -> Result<LoadReport, ClaimError> {
        self.store = ClaimStore::open(
            self.dir.path(),
            Self::directory(&self.overworld, None),
            self.config.clone(),
        )?;
        self.store.load()
    }

    /// Adds a player-owned cuboid in the default world spanning the two corners.
    pub fn claim(
        &self,
        owner: PlayerId,
        a: (i32, i32, i32),
        b: (i32, i32, i32),
    ) -> Result<Claim, ClaimError> {
        self.claim_in(self.world(), ClaimOwner::Player(owner), a, b)
    }

    pub fn claim_in(
        &self,
        world: WorldId,
        owner: ClaimOwner,
        a: (i32, i32, i32),
        b: (i32, i32, i32),
    ) -> Result<Claim, ClaimError> {
        let claim = Claim::new(world, cuboid(a, b), owner);
        self.store.add_claim(claim.clone(), false)?;
        Ok(claim)
    }

    pub fn subdivide(
        &self,
        parent: &Claim,
        a: (i32, i32, i32),
        b: (i32, i32, i32),
    ) -> Result<Claim, ClaimError> {
        let sub = Claim::subdivision(parent, cuboid(a, b));
        self.store.add_claim(sub.clone(), false)?;
        Ok(sub)
    }

    pub fn claim_file(&self, folder: WorldFolder<'_>, id: ClaimId) -> PathBuf {
        self.layout().claim_path(folder, id)
    }

    pub fn player_file(&self, folder: WorldFolder<'_>, player: PlayerId) -> PathBuf {
        self.layout().player_path(folder, player)
    }

    /// Writes raw bytes into a world's claim folder, bypassing the store.
    pub fn write_raw_claim(
        &self,
        folder: WorldFolder<'_>,
        name: &str,
        contents: &str,
    ) -> std::io::Result<PathBuf> {
        let dir = self.layout().claim_dir(folder);
        fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_raw_player(
        &self,
        folder: WorldFolder<'_>,
        name: &str,
        contents: &str,
    ) -> std::io::Result<PathBuf> {
        let dir = self.layout().player_dir(folder);
        fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

pub fn cuboid(a: (i32, i32, i32), b: (i32, i32, i32)) -> Boundary {
    Boundary::new(Position::new(a.0, a.1, a.2), Position::new(b.0, b.1, b.2))
}
