use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::boundary::Boundary;
use crate::ids::{ClaimId, PlayerId, WorldId};

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimOwner {
    Player(PlayerId),
    /// Not bound to any player; created and managed by server staff.
    Administrative,
}

impl ClaimOwner {
    pub fn from_option(owner: Option<PlayerId>) -> Self {
        match owner {
            Some(player) => Self::Player(player),
            None => Self::Administrative,
        }
    }

    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Player(player) => Some(*player),
            Self::Administrative => None,
        }
    }

    pub fn is_administrative(&self) -> bool {
        matches!(self, Self::Administrative)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Access,
    Container,
    Build,
    Manage,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Container => "container",
            Self::Build => "build",
            Self::Manage => "manage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEntry {
    pub player: PlayerId,
    pub level: TrustLevel,
}

/// A claim or, when `parent` is set, a subdivision of one.
///
/// Subdivisions share their parent's persisted record and carry the parent's
/// owner. Parent and children refer to each other by id only; the claim store
/// owns every `Claim` in a single map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub id: ClaimId,
    pub world: WorldId,
    pub boundary: Boundary,
    pub owner: ClaimOwner,
    pub parent: Option<ClaimId>,
    pub children: Vec<ClaimId>,
    pub trust: Vec<TrustEntry>,
    pub modified_ms: u64,
}

impl Claim {
    pub fn new(world: WorldId, boundary: Boundary, owner: ClaimOwner) -> Self {
        Self::with_id(ClaimId::new(), world, boundary, owner)
    }

    pub fn with_id(id: ClaimId, world: WorldId, boundary: Boundary, owner: ClaimOwner) -> Self {
        Self {
            id,
            world,
            boundary,
            owner,
            parent: None,
            children: Vec::new(),
            trust: Vec::new(),
            modified_ms: now_ms(),
        }
    }

    /// A new subdivision of `parent`. The caller is responsible for checking
    /// that `boundary` lies inside the parent.
    pub fn subdivision(parent: &Claim, boundary: Boundary) -> Self {
        Self::subdivision_with_id(ClaimId::new(), parent, boundary)
    }

    pub fn subdivision_with_id(id: ClaimId, parent: &Claim, boundary: Boundary) -> Self {
        Self {
            parent: Some(parent.id),
            ..Self::with_id(id, parent.world, boundary, parent.owner)
        }
    }

    pub fn is_subdivision(&self) -> bool {
        self.parent.is_some()
    }

    /// Key of the persisted record holding this claim.
    pub fn record_id(&self) -> ClaimId {
        self.parent.unwrap_or(self.id)
    }

    pub fn trust_level(&self, player: PlayerId) -> Option<TrustLevel> {
        self.trust
            .iter()
            .find(|entry| entry.player == player)
            .map(|entry| entry.level)
    }

    pub fn touch(&mut self) {
        self.modified_ms = now_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn boundary() -> Boundary {
        Boundary::new(Position::new(0, 0, 0), Position::new(20, 255, 20))
    }

    #[test]
    fn subdivision_shares_record_and_owner() {
        let owner = PlayerId::new();
        let parent = Claim::new(WorldId::new(), boundary(), ClaimOwner::Player(owner));
        let inner = Boundary::new(Position::new(2, 0, 2), Position::new(5, 10, 5));
        let sub = Claim::subdivision(&parent, inner);

        assert!(sub.is_subdivision());
        assert_eq!(sub.record_id(), parent.id);
        assert_eq!(sub.world, parent.world);
        assert_eq!(sub.owner, ClaimOwner::Player(owner));
        assert_eq!(parent.record_id(), parent.id);
    }

    #[test]
    fn administrative_owner_has_no_player() {
        assert_eq!(ClaimOwner::from_option(None), ClaimOwner::Administrative);
        assert!(ClaimOwner::Administrative.player().is_none());
        let player = PlayerId::new();
        assert_eq!(ClaimOwner::from_option(Some(player)).player(), Some(player));
    }

    #[test]
    fn trust_lookup() {
        let mut claim = Claim::new(WorldId::new(), boundary(), ClaimOwner::Administrative);
        let builder = PlayerId::new();
        claim.trust.push(TrustEntry {
            player: builder,
            level: TrustLevel::Build,
        });
        assert_eq!(claim.trust_level(builder), Some(TrustLevel::Build));
        assert_eq!(claim.trust_level(PlayerId::new()), None);
    }
}
