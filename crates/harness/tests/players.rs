use std::fs;

use landclaim_core::PlayerId;
use landclaim_engine::{ClaimConfig, WorldConfigLayer};
use landclaim_harness::TestServer;
use landclaim_storage::{PlayerRecord, WorldFolder};

#[test]
fn first_access_creates_default_record() -> Result<(), Box<dyn std::error::Error>> {
    let server = TestServer::new()?;
    let player = PlayerId::new();

    let data = server.store.get_player_data(server.world(), player)?;
    let world_data = data.world(server.world()).ok_or("world data missing")?;
    assert_eq!(world_data.record, PlayerRecord::new(100));
    assert!(world_data.claims.is_empty());
    assert!(server.player_file(WorldFolder::Default, player).exists());

    Ok(())
}

#[test]
fn updates_persist_across_restart() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = TestServer::new()?;
    let world = server.world();
    let player = PlayerId::new();

    server.store.update_player_data(world, player, |record| {
        record.accrued_claim_blocks += 40;
        record.bonus_claim_blocks = 5;
    })?;

    let report = server.restart()?;
    assert_eq!(report.players, 1);
    let data = server.store.get_player_data(world, player)?;
    let record = data.world(world).ok_or("world data missing")?.record;
    assert_eq!(record.accrued_claim_blocks, 40);
    assert_eq!(record.bonus_claim_blocks, 5);
    assert_eq!(record.total_claim_blocks(), 145);

    Ok(())
}

#[test]
fn worlds_are_tracked_separately() -> Result<(), Box<dyn std::error::Error>> {
    let server = TestServer::new()?;
    let player = PlayerId::new();

    server
        .store
        .update_player_data(server.world(), player, |record| record.bonus_claim_blocks = 9)?;
    let data = server.store.get_player_data(server.nether.id, player)?;

    assert_eq!(data.worlds.len(), 2);
    assert_eq!(data.world(server.nether.id).map(|w| w.record.bonus_claim_blocks), Some(0));
    assert_eq!(data.world(server.world()).map(|w| w.record.bonus_claim_blocks), Some(9));
    assert!(server.player_file(WorldFolder::Named("world_nether"), player).exists());

    Ok(())
}

#[test]
fn claim_list_follows_adds_and_deletes() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = TestServer::new()?;
    let world = server.world();
    let player = PlayerId::new();
    server.store.get_player_data(world, player)?;

    let a = server.claim(player, (0, 0, 0), (9, 10, 9))?;
    let b = server.claim(player, (20, 0, 20), (29, 10, 29))?;
    server.subdivide(&a, (0, 0, 0), (3, 10, 3))?;

    assert_eq!(server.store.get_player_data(world, player)?.claim_count(world), 2);
    assert_eq!(server.store.remaining_claim_blocks(world, player)?, 100 - 200);

    server.store.delete_claim(b.id)?;
    let data = server.store.get_player_data(world, player)?;
    assert_eq!(data.world(world).map(|w| w.claims.clone()), Some(vec![a.id]));
    assert_eq!(server.store.remaining_claim_blocks(world, player)?, 0);

    server.restart()?;
    assert_eq!(server.store.get_player_data(world, player)?.claim_count(world), 1);

    Ok(())
}

#[test]
fn remaining_blocks_saturate_for_extreme_claims() -> Result<(), Box<dyn std::error::Error>> {
    let server = TestServer::new()?;
    let world = server.world();
    let player = PlayerId::new();
    server.claim(player, (i32::MIN, 0, i32::MIN), (i32::MAX, 10, i32::MAX))?;

    assert_eq!(server.store.remaining_claim_blocks(world, player)?, 100 - i64::MAX);

    Ok(())
}

#[test]
fn configured_allowance_applies_per_world() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClaimConfig::default();
    config.default.initial_claim_blocks = 250;
    config.worlds.insert(
        "world_nether".to_string(),
        WorldConfigLayer {
            allow_claims: None,
            initial_claim_blocks: Some(10),
        },
    );
    let server = TestServer::with_config(config)?;
    let player = PlayerId::new();

    assert_eq!(server.store.remaining_claim_blocks(server.world(), player)?, 250);
    assert_eq!(server.store.remaining_claim_blocks(server.nether.id, player)?, 10);

    Ok(())
}

#[test]
fn legacy_record_without_allowance_uses_default() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = TestServer::new()?;
    let player = PlayerId::new();
    server.write_raw_player(
        WorldFolder::Default,
        &player.to_string(),
        r#"{ "accruedClaimBlocks": 12 }"#,
    )?;

    server.restart()?;
    let data = server.store.get_player_data(server.world(), player)?;
    let record = data.world(server.world()).ok_or("world data missing")?.record;
    assert_eq!(record.initial_claim_blocks, 100);
    assert_eq!(record.accrued_claim_blocks, 12);

    Ok(())
}

#[test]
fn unreadable_player_record_is_kept() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = TestServer::new()?;
    let player = PlayerId::new();
    let path = server.write_raw_player(WorldFolder::Default, &player.to_string(), "[1, 2")?;

    let report = server.restart()?;
    assert_eq!(report.players, 0);
    assert_eq!(report.kept().count(), 1);
    assert_eq!(fs::read_to_string(&path)?, "[1, 2");

    // The running server falls back to defaults for this player.
    assert_eq!(server.store.remaining_claim_blocks(server.world(), player)?, 100);

    Ok(())
}
