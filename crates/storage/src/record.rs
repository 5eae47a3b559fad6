use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use landclaim_core::{
    Boundary, Claim, ClaimId, CoreError, PlayerId, TrustEntry, WorldId, format_position,
    parse_position,
};

use crate::error::StorageError;

/// On-disk form of one top-level claim together with all of its subdivisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub world_unique_id: WorldId,
    #[serde(default)]
    pub owner_unique_id: Option<PlayerId>,
    pub lesser_boundary_corner_pos: String,
    pub greater_boundary_corner_pos: String,
    #[serde(default)]
    pub sub_divisions: BTreeMap<ClaimId, SubdivisionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust: Vec<TrustEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdivisionRecord {
    pub lesser_boundary_corner_pos: String,
    pub greater_boundary_corner_pos: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust: Vec<TrustEntry>,
}

fn boundary_from(lesser: &str, greater: &str) -> Result<Boundary, CoreError> {
    Ok(Boundary::new(parse_position(lesser)?, parse_position(greater)?))
}

impl ClaimRecord {
    /// Builds the record for `top` from the claim and its subdivisions.
    pub fn from_claims<'a>(top: &Claim, subdivisions: impl IntoIterator<Item = &'a Claim>) -> Self {
        let sub_divisions = subdivisions
            .into_iter()
            .map(|sub| (sub.id, SubdivisionRecord::from_claim(sub)))
            .collect();
        Self {
            world_unique_id: top.world,
            owner_unique_id: top.owner.player(),
            lesser_boundary_corner_pos: format_position(top.boundary.lesser()),
            greater_boundary_corner_pos: format_position(top.boundary.greater()),
            sub_divisions,
            trust: top.trust.clone(),
        }
    }

    pub fn boundary(&self) -> Result<Boundary, CoreError> {
        boundary_from(&self.lesser_boundary_corner_pos, &self.greater_boundary_corner_pos)
    }
}

impl SubdivisionRecord {
    pub fn from_claim(claim: &Claim) -> Self {
        Self {
            lesser_boundary_corner_pos: format_position(claim.boundary.lesser()),
            greater_boundary_corner_pos: format_position(claim.boundary.greater()),
            trust: claim.trust.clone(),
        }
    }

    pub fn boundary(&self) -> Result<Boundary, CoreError> {
        boundary_from(&self.lesser_boundary_corner_pos, &self.greater_boundary_corner_pos)
    }
}

/// Decodes a claim record and checks every corner string, so a successfully
/// decoded record always yields valid boundaries.
pub fn decode_claim_record(bytes: &[u8], path: &Path) -> Result<ClaimRecord, StorageError> {
    let record: ClaimRecord =
        serde_json::from_slice(bytes).map_err(|e| StorageError::malformed(path, e))?;
    record
        .boundary()
        .map_err(|e| StorageError::malformed(path, e))?;
    for (id, sub) in &record.sub_divisions {
        sub.boundary()
            .map_err(|e| StorageError::malformed(path, format!("subdivision {id}: {e}")))?;
    }
    Ok(record)
}

pub fn encode_claim_record(record: &ClaimRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(record).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Per-world claim-block accounting for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub initial_claim_blocks: i32,
    pub accrued_claim_blocks: i32,
    pub bonus_claim_blocks: i32,
}

impl PlayerRecord {
    pub fn new(initial_claim_blocks: i32) -> Self {
        Self {
            initial_claim_blocks,
            accrued_claim_blocks: 0,
            bonus_claim_blocks: 0,
        }
    }

    pub fn total_claim_blocks(&self) -> i64 {
        i64::from(self.initial_claim_blocks)
            + i64::from(self.accrued_claim_blocks)
            + i64::from(self.bonus_claim_blocks)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayerRecord {
    initial_claim_blocks: Option<i32>,
    #[serde(default)]
    accrued_claim_blocks: i32,
    #[serde(default)]
    bonus_claim_blocks: i32,
}

/// `initial_claim_blocks` fills in for records written before the allowance
/// was stored per player.
pub fn decode_player_record(
    bytes: &[u8],
    path: &Path,
    initial_claim_blocks: i32,
) -> Result<PlayerRecord, StorageError> {
    let raw: RawPlayerRecord =
        serde_json::from_slice(bytes).map_err(|e| StorageError::malformed(path, e))?;
    Ok(PlayerRecord {
        initial_claim_blocks: raw.initial_claim_blocks.unwrap_or(initial_claim_blocks),
        accrued_claim_blocks: raw.accrued_claim_blocks,
        bonus_claim_blocks: raw.bonus_claim_blocks,
    })
}

pub fn encode_player_record(record: &PlayerRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(record).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use landclaim_core::{ClaimOwner, Position, TrustLevel};

    fn path() -> &'static Path {
        Path::new("ClaimData/test")
    }

    fn sample_claims() -> (Claim, Claim) {
        let owner = PlayerId::new();
        let mut top = Claim::new(
            WorldId::new(),
            Boundary::new(Position::new(0, 0, 0), Position::new(31, 255, 31)),
            ClaimOwner::Player(owner),
        );
        top.trust.push(TrustEntry {
            player: PlayerId::new(),
            level: TrustLevel::Container,
        });
        let sub = Claim::subdivision(
            &top,
            Boundary::new(Position::new(4, 0, 4), Position::new(8, 20, 8)),
        );
        (top, sub)
    }

    #[test]
    fn encoded_record_decodes_to_same_record() {
        let (top, sub) = sample_claims();
        let record = ClaimRecord::from_claims(&top, [&sub]);
        let bytes = encode_claim_record(&record).unwrap();
        let decoded = decode_claim_record(&bytes, path()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.boundary().unwrap(), top.boundary);
        assert_eq!(decoded.sub_divisions[&sub.id].boundary().unwrap(), sub.boundary);
    }

    #[test]
    fn encoding_uses_logical_field_names() {
        let (top, sub) = sample_claims();
        let record = ClaimRecord::from_claims(&top, [&sub]);
        let text = String::from_utf8(encode_claim_record(&record).unwrap()).unwrap();
        for key in [
            "worldUniqueId",
            "ownerUniqueId",
            "lesserBoundaryCornerPos",
            "greaterBoundaryCornerPos",
            "subDivisions",
        ] {
            assert!(text.contains(key), "missing {key} in {text}");
        }
        assert!(text.contains("\"0,0,0\""));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let world = WorldId::new();
        let json = format!(
            r#"{{"worldUniqueId":"{world}","lesserBoundaryCornerPos":"0,0,0","greaterBoundaryCornerPos":"5,5,5"}}"#
        );
        let record = decode_claim_record(json.as_bytes(), path()).unwrap();
        assert_eq!(record.owner_unique_id, None);
        assert!(record.sub_divisions.is_empty());
        assert!(record.trust.is_empty());
    }

    #[test]
    fn missing_world_is_malformed() {
        let json = r#"{"lesserBoundaryCornerPos":"0,0,0","greaterBoundaryCornerPos":"5,5,5"}"#;
        let err = decode_claim_record(json.as_bytes(), path()).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn bad_corner_is_malformed() {
        let world = WorldId::new();
        let json = format!(
            r#"{{"worldUniqueId":"{world}","lesserBoundaryCornerPos":"0;0;0","greaterBoundaryCornerPos":"5,5,5"}}"#
        );
        let err = decode_claim_record(json.as_bytes(), path()).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn bad_subdivision_corner_is_malformed() {
        let world = WorldId::new();
        let sub = ClaimId::new();
        let json = format!(
            r#"{{"worldUniqueId":"{world}","lesserBoundaryCornerPos":"0,0,0","greaterBoundaryCornerPos":"5,5,5",
                "subDivisions":{{"{sub}":{{"lesserBoundaryCornerPos":"1,1","greaterBoundaryCornerPos":"2,2,2"}}}}}}"#
        );
        let err = decode_claim_record(json.as_bytes(), path()).unwrap_err();
        match err {
            StorageError::Malformed { reason, .. } => assert!(reason.contains(&sub.to_string())),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn reversed_corners_are_normalized() {
        let world = WorldId::new();
        let json = format!(
            r#"{{"worldUniqueId":"{world}","lesserBoundaryCornerPos":"9,9,9","greaterBoundaryCornerPos":"1,2,3"}}"#
        );
        let record = decode_claim_record(json.as_bytes(), path()).unwrap();
        let boundary = record.boundary().unwrap();
        assert_eq!(boundary.lesser(), Position::new(1, 2, 3));
        assert_eq!(boundary.greater(), Position::new(9, 9, 9));
    }

    #[test]
    fn player_record_defaults_initial_blocks() {
        let record = decode_player_record(br#"{"bonusClaimBlocks":40}"#, path(), 100).unwrap();
        assert_eq!(record.initial_claim_blocks, 100);
        assert_eq!(record.accrued_claim_blocks, 0);
        assert_eq!(record.bonus_claim_blocks, 40);
        assert_eq!(record.total_claim_blocks(), 140);

        let bytes = encode_player_record(&record).unwrap();
        assert_eq!(decode_player_record(&bytes, path(), 7).unwrap(), record);
    }

    #[test]
    fn player_record_garbage_is_malformed() {
        assert!(decode_player_record(b"120", path(), 100).is_err());
        assert!(decode_player_record(b"{", path(), 100).is_err());
    }
}
