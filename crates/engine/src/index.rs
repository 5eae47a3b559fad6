use std::collections::{HashMap, HashSet};

use landclaim_core::{Boundary, Claim, ClaimId, ClaimOwner, PlayerId, Position, WorldId};

use crate::error::ClaimError;

type ChunkKey = (WorldId, i32, i32);

/// Top-level claims covering more chunk columns than this skip the buckets
/// and sit in a per-world list that every query scans.
pub(crate) const WIDE_CLAIM_CHUNKS: u64 = 1024;

fn is_wide(boundary: &Boundary) -> bool {
    boundary.chunk_span() > WIDE_CLAIM_CHUNKS
}

/// Which geometry checks an insert performs. Records read back from storage
/// were validated when first created and are indexed as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InsertChecks {
    pub overlap: bool,
    pub enclosure: bool,
}

impl InsertChecks {
    pub const LOADED: Self = Self {
        overlap: false,
        enclosure: false,
    };

    pub fn runtime(allow_overlap: bool) -> Self {
        Self {
            overlap: !allow_overlap,
            enclosure: true,
        }
    }
}

/// Every indexed claim keyed by id, plus chunk-column buckets of top-level
/// claim ids for point and overlap queries. Each top-level claim carries a
/// sequence number; lookups prefer the lowest.
#[derive(Default)]
pub(crate) struct ClaimIndex {
    claims: HashMap<ClaimId, Claim>,
    chunks: HashMap<ChunkKey, Vec<ClaimId>>,
    wide: HashMap<WorldId, Vec<ClaimId>>,
    order: HashMap<ClaimId, u64>,
    next_seq: u64,
}

impl ClaimIndex {
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn clear(&mut self) {
        self.claims.clear();
        self.chunks.clear();
        self.wide.clear();
        self.order.clear();
        self.next_seq = 0;
    }

    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(&id)
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values().filter(|claim| !claim.is_subdivision())
    }

    /// The claim and its subdivisions, in subdivision insertion order.
    pub fn family(&self, top: ClaimId) -> Option<(&Claim, Vec<&Claim>)> {
        let claim = self.claims.get(&top)?;
        let children = claim
            .children
            .iter()
            .filter_map(|id| self.claims.get(id))
            .collect();
        Some((claim, children))
    }

    pub fn owned_by(&self, world: WorldId, player: PlayerId) -> Vec<ClaimId> {
        let mut ids: Vec<ClaimId> = self
            .top_level()
            .filter(|claim| claim.world == world && claim.owner == ClaimOwner::Player(player))
            .map(|claim| claim.id)
            .collect();
        ids.sort();
        ids
    }

    fn seq(&self, id: ClaimId) -> u64 {
        self.order.get(&id).copied().unwrap_or(u64::MAX)
    }

    /// Top-level claims in `world` that may intersect `boundary`, oldest first.
    fn top_level_near(&self, world: WorldId, boundary: &Boundary) -> Vec<&Claim> {
        let mut seen: HashSet<ClaimId> = HashSet::new();
        if is_wide(boundary) {
            seen.extend(
                self.order
                    .keys()
                    .filter(|id| self.claims.get(*id).is_some_and(|c| c.world == world)),
            );
        } else {
            for (cx, cz) in boundary.chunks() {
                if let Some(bucket) = self.chunks.get(&(world, cx, cz)) {
                    seen.extend(bucket.iter().copied());
                }
            }
            if let Some(wide) = self.wide.get(&world) {
                seen.extend(wide.iter().copied());
            }
        }
        let mut near: Vec<&Claim> = seen.iter().filter_map(|id| self.claims.get(id)).collect();
        near.sort_by_key(|claim| self.seq(claim.id));
        near
    }

    /// First top-level claim in `world` overlapping `boundary`, other than `ignore`.
    fn top_level_overlap(
        &self,
        world: WorldId,
        boundary: &Boundary,
        ignore: Option<ClaimId>,
    ) -> Option<ClaimId> {
        self.top_level_near(world, boundary)
            .into_iter()
            .find(|other| Some(other.id) != ignore && other.boundary.intersects(boundary))
            .map(|other| other.id)
    }

    fn sibling_overlap(
        &self,
        parent: &Claim,
        boundary: &Boundary,
        ignore: Option<ClaimId>,
    ) -> Option<ClaimId> {
        parent
            .children
            .iter()
            .filter(|id| Some(**id) != ignore)
            .filter_map(|id| self.claims.get(id))
            .find(|sibling| sibling.boundary.intersects(boundary))
            .map(|sibling| sibling.id)
    }

    fn link_chunks(&mut self, claim: &Claim) {
        self.order.insert(claim.id, self.next_seq);
        self.next_seq += 1;
        if is_wide(&claim.boundary) {
            self.wide.entry(claim.world).or_default().push(claim.id);
            return;
        }
        for (cx, cz) in claim.boundary.chunks() {
            self.chunks
                .entry((claim.world, cx, cz))
                .or_default()
                .push(claim.id);
        }
    }

    fn unlink_chunks(&mut self, claim_id: ClaimId, world: WorldId, boundary: &Boundary) {
        self.order.remove(&claim_id);
        if is_wide(boundary) {
            if let Some(wide) = self.wide.get_mut(&world) {
                wide.retain(|id| *id != claim_id);
                if wide.is_empty() {
                    self.wide.remove(&world);
                }
            }
            return;
        }
        for (cx, cz) in boundary.chunks() {
            let key = (world, cx, cz);
            if let Some(bucket) = self.chunks.get_mut(&key) {
                bucket.retain(|id| *id != claim_id);
                if bucket.is_empty() {
                    self.chunks.remove(&key);
                }
            }
        }
    }

    pub fn insert(&mut self, mut claim: Claim, checks: InsertChecks) -> Result<(), ClaimError> {
        if self.claims.contains_key(&claim.id) {
            return Err(ClaimError::DuplicateClaim(claim.id));
        }

        match claim.parent {
            Some(parent_id) => {
                let parent = self
                    .claims
                    .get(&parent_id)
                    .ok_or(ClaimError::ParentNotFound(parent_id))?;
                if parent.is_subdivision() {
                    return Err(ClaimError::NotTopLevel(parent_id));
                }
                if parent.world != claim.world
                    || (checks.enclosure && !parent.boundary.encloses(&claim.boundary))
                {
                    return Err(ClaimError::OutsideParent {
                        claim: claim.id,
                        parent: parent_id,
                    });
                }
                if checks.overlap {
                    if let Some(existing) = self.sibling_overlap(parent, &claim.boundary, None) {
                        return Err(ClaimError::Overlap { existing });
                    }
                }
                claim.owner = parent.owner;
                claim.children.clear();
                if let Some(parent) = self.claims.get_mut(&parent_id) {
                    parent.children.push(claim.id);
                }
            }
            None => {
                if checks.overlap {
                    if let Some(existing) =
                        self.top_level_overlap(claim.world, &claim.boundary, None)
                    {
                        return Err(ClaimError::Overlap { existing });
                    }
                }
                claim.children.clear();
                self.link_chunks(&claim);
            }
        }

        self.claims.insert(claim.id, claim);
        Ok(())
    }

    /// Removes a claim. A top-level claim takes its subdivisions with it; the
    /// returned list starts with the requested claim.
    pub fn remove(&mut self, id: ClaimId) -> Option<Vec<Claim>> {
        let claim = self.claims.remove(&id)?;
        let mut removed = Vec::with_capacity(claim.children.len() + 1);

        match claim.parent {
            Some(parent_id) => {
                if let Some(parent) = self.claims.get_mut(&parent_id) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => {
                self.unlink_chunks(claim.id, claim.world, &claim.boundary);
            }
        }

        let children: Vec<Claim> = claim
            .children
            .iter()
            .filter_map(|child| self.claims.remove(child))
            .collect();
        removed.push(claim);
        removed.extend(children);
        Some(removed)
    }

    /// Moves a claim to a new boundary, re-running the checks an insert would.
    pub fn resize(
        &mut self,
        id: ClaimId,
        boundary: Boundary,
        allow_overlap: bool,
    ) -> Result<Boundary, ClaimError> {
        let claim = self.claims.get(&id).ok_or(ClaimError::ClaimNotFound(id))?;
        let previous = claim.boundary;
        let world = claim.world;

        match claim.parent {
            Some(parent_id) => {
                let parent = self
                    .claims
                    .get(&parent_id)
                    .ok_or(ClaimError::ParentNotFound(parent_id))?;
                if !parent.boundary.encloses(&boundary) {
                    return Err(ClaimError::OutsideParent {
                        claim: id,
                        parent: parent_id,
                    });
                }
                if !allow_overlap {
                    if let Some(existing) = self.sibling_overlap(parent, &boundary, Some(id)) {
                        return Err(ClaimError::Overlap { existing });
                    }
                }
            }
            None => {
                for child in claim.children.iter().filter_map(|c| self.claims.get(c)) {
                    if !boundary.encloses(&child.boundary) {
                        return Err(ClaimError::OutsideParent {
                            claim: child.id,
                            parent: id,
                        });
                    }
                }
                if !allow_overlap {
                    if let Some(existing) = self.top_level_overlap(world, &boundary, Some(id)) {
                        return Err(ClaimError::Overlap { existing });
                    }
                }
            }
        }

        let is_top_level = claim.parent.is_none();
        if is_top_level {
            self.unlink_chunks(id, world, &previous);
        }
        let claim = self
            .claims
            .get_mut(&id)
            .ok_or(ClaimError::ClaimNotFound(id))?;
        claim.boundary = boundary;
        claim.touch();
        let snapshot = claim.clone();
        if is_top_level {
            self.link_chunks(&snapshot);
        }
        Ok(previous)
    }

    /// Hands a top-level claim and its subdivisions to a new owner and returns
    /// the previous one.
    pub fn set_owner(&mut self, id: ClaimId, owner: ClaimOwner) -> Result<ClaimOwner, ClaimError> {
        let claim = self.claims.get_mut(&id).ok_or(ClaimError::ClaimNotFound(id))?;
        if claim.is_subdivision() {
            return Err(ClaimError::NotTopLevel(id));
        }
        let previous = std::mem::replace(&mut claim.owner, owner);
        claim.touch();
        let children = claim.children.clone();
        for child in children {
            if let Some(child) = self.claims.get_mut(&child) {
                child.owner = owner;
            }
        }
        Ok(previous)
    }

    pub fn get_mut(&mut self, id: ClaimId) -> Option<&mut Claim> {
        self.claims.get_mut(&id)
    }

    /// Resolves the claim at `pos`: the earliest-indexed top-level claim
    /// containing the point, or its first subdivision that also contains it.
    ///
    /// `hint` only bounds the candidates; the answer is the same without it.
    pub fn claim_at(
        &self,
        world: WorldId,
        pos: Position,
        include_border: bool,
        hint: Option<ClaimId>,
    ) -> Option<&Claim> {
        let (cx, cz) = pos.chunk();
        let limit = hint
            .and_then(|id| self.claims.get(&id))
            .and_then(|hinted| self.claims.get(&hinted.record_id()))
            .filter(|top| top.world == world && top.boundary.contains(pos, include_border))
            .map(|top| self.seq(top.id));

        let bucket = self.chunks.get(&(world, cx, cz)).into_iter().flatten();
        let wide = self.wide.get(&world).into_iter().flatten();
        let top = bucket
            .chain(wide)
            .map(|id| (self.seq(*id), id))
            .filter(|(seq, _)| limit.is_none_or(|limit| *seq <= limit))
            .filter_map(|(seq, id)| self.claims.get(id).map(|claim| (seq, claim)))
            .filter(|(_, claim)| claim.boundary.contains(pos, include_border))
            .min_by_key(|(seq, _)| *seq)
            .map(|(_, claim)| claim)?;

        top.children
            .iter()
            .filter_map(|id| self.claims.get(id))
            .find(|sub| sub.boundary.contains(pos, include_border))
            .or(Some(top))
    }
}
