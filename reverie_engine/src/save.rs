//! Save-game documents, slot discovery, and load validation.
//!
//! A save is a single JSON document: schema version, world-package
//! digest, ISO timestamp, and the full overlay snapshot. Loading
//! validates the schema version, the digest, and every entity id the
//! snapshot references; on any failure the engine stays in its
//! pre-load state.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};
use std::time::SystemTime;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::SAVE_SCHEMA_VERSION;
use crate::state::{GameState, ItemLocation};
use crate::world::World;

pub const SAVE_DIR: &str = "saved_games";

static ACTIVE_SAVE_DIR: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| RwLock::new(default_save_dir()));

fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("reverie").join(SAVE_DIR))
        .unwrap_or_else(|| PathBuf::from(SAVE_DIR))
}

/// The save directory used for slot discovery and writes.
pub fn active_save_dir() -> PathBuf {
    ACTIVE_SAVE_DIR
        .read()
        .map(|guard| guard.clone())
        .unwrap_or_else(|_| PathBuf::from(SAVE_DIR))
}

/// Point save operations at a different directory (tests, host config).
pub fn set_active_save_dir(path: PathBuf) {
    if let Ok(mut guard) = ACTIVE_SAVE_DIR.write() {
        *guard = path;
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save was made against a different world (expected digest {expected}, found {found})")]
    DigestMismatch { expected: String, found: String },
    #[error("save references ids missing from this world: {}", .0.join(", "))]
    MissingIds(Vec<String>),
    #[error("unsupported save schema version {0}")]
    SchemaUnsupported(u32),
    #[error("could not access save file: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The on-disk save document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDocument {
    pub schema_version: u32,
    pub engine_version: String,
    pub world_digest: String,
    /// ISO-8601 timestamp of the save.
    pub timestamp: String,
    pub snapshot: GameState,
}

/// Serialize the overlay into a save document string.
pub fn save_to_string(world: &World, state: &GameState) -> Result<String, SaveError> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
    let document = SaveDocument {
        schema_version: SAVE_SCHEMA_VERSION,
        engine_version: crate::REVERIE_VERSION.to_string(),
        world_digest: world.digest.clone(),
        timestamp,
        snapshot: state.clone(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parse and validate a save document against the loaded world.
pub fn load_from_str(world: &World, raw: &str) -> Result<GameState, SaveError> {
    let document: SaveDocument = serde_json::from_str(raw)?;
    if document.schema_version != SAVE_SCHEMA_VERSION {
        return Err(SaveError::SchemaUnsupported(document.schema_version));
    }
    if document.world_digest != world.digest {
        return Err(SaveError::DigestMismatch {
            expected: world.digest.clone(),
            found: document.world_digest,
        });
    }
    let missing = missing_ids(world, &document.snapshot);
    if !missing.is_empty() {
        return Err(SaveError::MissingIds(missing));
    }
    Ok(document.snapshot)
}

/// Every id the snapshot references that the world does not define.
fn missing_ids(world: &World, snapshot: &GameState) -> Vec<String> {
    let mut missing = BTreeSet::new();

    let mut check_room = |id: &str| {
        if !world.rooms.contains_key(id) {
            missing.insert(format!("room:{id}"));
        }
    };
    check_room(&snapshot.current_room);
    for room in &snapshot.visited_rooms {
        check_room(room);
    }
    for room in snapshot.npc_rooms.values() {
        check_room(room);
    }

    for (item, location) in &snapshot.item_locations {
        if !world.items.contains_key(item) {
            missing.insert(format!("item:{item}"));
        }
        match location {
            ItemLocation::Room(room) => {
                if !world.rooms.contains_key(room) {
                    missing.insert(format!("room:{room}"));
                }
            },
            ItemLocation::Npc(npc) => {
                if !world.npcs.contains_key(npc) {
                    missing.insert(format!("npc:{npc}"));
                }
            },
            ItemLocation::Container(container) => {
                if !world.items.contains_key(container) && !world.objects.contains_key(container) {
                    missing.insert(format!("container:{container}"));
                }
            },
            _ => {},
        }
    }

    for npc in snapshot.npc_rooms.keys() {
        if !world.npcs.contains_key(npc) {
            missing.insert(format!("npc:{npc}"));
        }
    }
    for object in snapshot.object_states.keys() {
        if !world.objects.contains_key(object) && !world.items.contains_key(object) {
            missing.insert(format!("object:{object}"));
        }
    }
    for puzzle in snapshot.puzzles.keys() {
        if !world.puzzles.contains_key(puzzle) {
            missing.insert(format!("puzzle:{puzzle}"));
        }
    }

    missing.into_iter().collect()
}

// ----- slot files -----

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFileStatus {
    Ready,
    SchemaMismatch { save_version: u32 },
    Corrupted { message: String },
}

/// One discovered save slot with its display summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFileEntry {
    pub slot: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub timestamp: Option<String>,
    pub score: Option<u32>,
    pub moves: Option<u64>,
    pub status: SaveFileStatus,
}

fn slot_path(dir: &Path, slot: &str) -> PathBuf {
    dir.join(format!("{slot}-reverie.json"))
}

/// Write a save document into a slot under the active save directory.
pub fn write_slot(world: &World, state: &GameState, slot: &str) -> Result<PathBuf, SaveError> {
    let dir = active_save_dir();
    fs::create_dir_all(&dir)?;
    let path = slot_path(&dir, slot);
    fs::write(&path, save_to_string(world, state)?)?;
    Ok(path)
}

/// Read and validate a save slot.
pub fn read_slot(world: &World, slot: &str) -> Result<GameState, SaveError> {
    let path = slot_path(&active_save_dir(), slot);
    let raw = fs::read_to_string(path)?;
    load_from_str(world, &raw)
}

/// Discover save slots in a directory, newest first.
pub fn list_slots(dir: &Path) -> Vec<SaveFileEntry> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut slots: Vec<SaveFileEntry> = entries
        .flatten()
        .filter_map(|entry| entry_for_file(&entry))
        .collect();
    slots.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.slot.cmp(&b.slot)));
    slots
}

fn entry_for_file(entry: &fs::DirEntry) -> Option<SaveFileEntry> {
    let path = entry.path();
    if !path.is_file() {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let slot = stem.strip_suffix("-reverie")?.to_string();
    if slot.is_empty() {
        return None;
    }
    let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());

    let (timestamp, score, moves, status) = match fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<SaveDocument>(&raw) {
            Ok(document) => {
                let status = if document.schema_version == SAVE_SCHEMA_VERSION {
                    SaveFileStatus::Ready
                } else {
                    SaveFileStatus::SchemaMismatch {
                        save_version: document.schema_version,
                    }
                };
                (
                    Some(document.timestamp),
                    Some(document.snapshot.score),
                    Some(document.snapshot.moves),
                    status,
                )
            },
            Err(err) => {
                warn!("failed to parse save '{slot}': {err}");
                (
                    None,
                    None,
                    None,
                    SaveFileStatus::Corrupted {
                        message: err.to_string(),
                    },
                )
            },
        },
        Err(err) => (
            None,
            None,
            None,
            SaveFileStatus::Corrupted {
                message: err.to_string(),
            },
        ),
    };

    Some(SaveFileEntry {
        slot,
        path,
        modified,
        timestamp,
        score,
        moves,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_data::{GameDef, ItemDef, PlayerDef, RoomDef, WorldDef};

    fn world(extra_item: bool) -> World {
        let mut items = vec![ItemDef {
            id: "coin".into(),
            name: "coin".into(),
            description: "Round.".into(),
            ..ItemDef::default()
        }];
        if extra_item {
            items.push(ItemDef {
                id: "gem".into(),
                name: "gem".into(),
                description: "Cut.".into(),
                ..ItemDef::default()
            });
        }
        World::from_def(WorldDef {
            game: GameDef {
                title: "T".into(),
                player: PlayerDef {
                    name: "Hero".into(),
                    start_room: "r".into(),
                    ..PlayerDef::default()
                },
                ..GameDef::default()
            },
            rooms: vec![RoomDef {
                id: "r".into(),
                name: "Room".into(),
                description: "Plain.".into(),
                items: vec!["coin".into()],
                ..RoomDef::default()
            }],
            items,
            ..WorldDef::default()
        })
        .unwrap()
    }

    #[test]
    fn round_trip_preserves_the_overlay() {
        let world = world(false);
        let mut state = GameState::new(&world);
        state.place_item("coin", ItemLocation::Held);
        state.score = 12;
        state.moves = 7;
        state.set_flag("brave", crate::state::FlagValue::Bool(true));

        let raw = save_to_string(&world, &state).unwrap();
        let loaded = load_from_str(&world, &raw).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn digest_mismatch_rejects_cleanly() {
        let world_a = world(false);
        let world_b = world(true);
        let state = GameState::new(&world_a);
        let raw = save_to_string(&world_a, &state).unwrap();
        let err = load_from_str(&world_b, &raw).unwrap_err();
        assert!(matches!(err, SaveError::DigestMismatch { .. }));
    }

    #[test]
    fn unsupported_schema_rejected() {
        let world = world(false);
        let state = GameState::new(&world);
        let raw = save_to_string(&world, &state).unwrap();
        let mut document: SaveDocument = serde_json::from_str(&raw).unwrap();
        document.schema_version = 0;
        let raw = serde_json::to_string(&document).unwrap();
        let err = load_from_str(&world, &raw).unwrap_err();
        assert!(matches!(err, SaveError::SchemaUnsupported(0)));
    }

    #[test]
    fn missing_ids_are_listed() {
        let world_big = world(true);
        let world_small = world(false);
        let mut state = GameState::new(&world_big);
        state.place_item("gem", ItemLocation::Held);

        // fake a digest match so only the id check can fail
        let raw = save_to_string(&world_big, &state).unwrap();
        let mut document: SaveDocument = serde_json::from_str(&raw).unwrap();
        document.world_digest = world_small.digest.clone();
        let raw = serde_json::to_string(&document).unwrap();

        let err = load_from_str(&world_small, &raw).unwrap_err();
        match err {
            SaveError::MissingIds(ids) => assert_eq!(ids, vec!["item:gem".to_string()]),
            other => panic!("expected MissingIds, got {other:?}"),
        }
    }

    #[test]
    fn slot_files_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        set_active_save_dir(dir.path().to_path_buf());
        let world = world(false);
        let mut state = GameState::new(&world);
        state.score = 5;

        let path = write_slot(&world, &state, "alpha").unwrap();
        assert!(path.ends_with("alpha-reverie.json"));

        let loaded = read_slot(&world, "alpha").unwrap();
        assert_eq!(loaded.score, 5);

        let slots = list_slots(dir.path());
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot, "alpha");
        assert_eq!(slots[0].status, SaveFileStatus::Ready);
        assert_eq!(slots[0].score, Some(5));
    }

    #[test]
    fn corrupted_slots_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad-reverie.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        let slots = list_slots(dir.path());
        assert_eq!(slots.len(), 1);
        assert!(matches!(slots[0].status, SaveFileStatus::Corrupted { .. }));
    }
}
