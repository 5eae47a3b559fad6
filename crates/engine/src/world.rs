use landclaim_core::WorldId;
use landclaim_storage::WorldFolder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldInfo {
    pub id: WorldId,
    pub name: String,
}

impl WorldInfo {
    pub fn new(id: WorldId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The host's view of which worlds exist.
pub trait WorldDirectory: Send + Sync {
    fn worlds(&self) -> Vec<WorldInfo>;

    fn default_world(&self) -> WorldInfo;

    fn world(&self, id: WorldId) -> Option<WorldInfo> {
        self.worlds().into_iter().find(|world| world.id == id)
    }
}

pub(crate) fn folder_for<'a>(world: &'a WorldInfo, default_world: WorldId) -> WorldFolder<'a> {
    if world.id == default_world {
        WorldFolder::Default
    } else {
        WorldFolder::Named(&world.name)
    }
}

/// A fixed world list, for hosts whose worlds never change at runtime.
#[derive(Debug, Clone)]
pub struct StaticWorlds {
    default: WorldInfo,
    others: Vec<WorldInfo>,
}

impl StaticWorlds {
    pub fn new(default: WorldInfo) -> Self {
        Self {
            default,
            others: Vec::new(),
        }
    }

    pub fn with_world(mut self, world: WorldInfo) -> Self {
        self.others.push(world);
        self
    }
}

impl WorldDirectory for StaticWorlds {
    fn worlds(&self) -> Vec<WorldInfo> {
        std::iter::once(self.default.clone())
            .chain(self.others.iter().cloned())
            .collect()
    }

    fn default_world(&self) -> WorldInfo {
        self.default.clone()
    }
}
