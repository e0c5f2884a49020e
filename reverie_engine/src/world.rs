//! The immutable world loaded from a package document.
//!
//! [`World`] indexes the validated package by id for fast lookup during
//! play. It is built once at startup and never mutated; every run-time
//! change lives in the [`crate::state::GameState`] overlay.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use reverie_data::{
    AchievementDef, ConfigDef, EndingDef, EventDef, InteractionsDef, ItemDef, NpcDef, ObjectDef,
    PlayerDef, PuzzleDef, RoomDef, ValidationError, WorldDef, validate_world,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Failure to load or validate a world package. The engine fails closed:
/// no partially-loaded world is ever handed to the runtime.
#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("could not read world package: {0}")]
    Io(#[from] std::io::Error),
    #[error("world package is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid room definition: {0}")]
    InvalidRoom(String),
    #[error("dangling reference from {from} to {to}")]
    DanglingReference { from: String, to: String },
    #[error("world package failed validation with {0} errors")]
    Validation(usize),
}

/// One adventure, fully indexed and ready to play.
#[derive(Debug, Clone)]
pub struct World {
    pub title: String,
    pub intro: String,
    pub player: PlayerDef,
    pub config: ConfigDef,
    pub max_score: u32,
    pub theme: Option<String>,
    pub rooms: HashMap<String, RoomDef>,
    pub objects: HashMap<String, ObjectDef>,
    pub items: HashMap<String, ItemDef>,
    pub npcs: HashMap<String, NpcDef>,
    pub puzzles: HashMap<String, PuzzleDef>,
    /// Room definition order, for stable iteration where it matters.
    pub room_order: Vec<String>,
    pub puzzle_order: Vec<String>,
    pub global_events: Vec<EventDef>,
    pub interactions: InteractionsDef,
    pub vocabulary: reverie_data::VocabularyDef,
    pub achievements: Vec<AchievementDef>,
    pub endings: Vec<EndingDef>,
    /// SHA-256 of the canonical package JSON; save files must match it.
    pub digest: String,
}

impl World {
    /// Build a [`World`] from a parsed package definition.
    ///
    /// # Errors
    /// Fails closed with the first representative validation problem when
    /// the package contains duplicate ids or dangling references.
    pub fn from_def(def: WorldDef) -> Result<World, WorldLoadError> {
        let errors = validate_world(&def);
        if !errors.is_empty() {
            for error in &errors {
                log::error!("world validation: {error}");
            }
            return Err(classify_errors(errors));
        }

        let digest = package_digest(&def);
        let room_order: Vec<String> = def.rooms.iter().map(|r| r.id.clone()).collect();
        let puzzle_order: Vec<String> = def.puzzles.iter().map(|p| p.id.clone()).collect();

        let world = World {
            title: def.game.title,
            intro: def.game.intro,
            player: def.game.player,
            config: def.game.config,
            max_score: def.game.max_score,
            theme: def.game.theme,
            rooms: def.rooms.into_iter().map(|r| (r.id.clone(), r)).collect(),
            objects: def.objects.into_iter().map(|o| (o.id.clone(), o)).collect(),
            items: def.items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            npcs: def.npcs.into_iter().map(|n| (n.id.clone(), n)).collect(),
            puzzles: def.puzzles.into_iter().map(|p| (p.id.clone(), p)).collect(),
            room_order,
            puzzle_order,
            global_events: def.events,
            interactions: def.interactions,
            vocabulary: def.vocabulary,
            achievements: def.achievements,
            endings: def.endings,
            digest,
        };
        info!(
            "world '{}' loaded: {} rooms, {} objects, {} items, {} npcs, {} puzzles",
            world.title,
            world.rooms.len(),
            world.objects.len(),
            world.items.len(),
            world.npcs.len(),
            world.puzzles.len()
        );
        Ok(world)
    }

    /// Parse and build a world from a JSON document.
    pub fn from_json(json: &str) -> Result<World, WorldLoadError> {
        let def: WorldDef = serde_json::from_str(json)?;
        World::from_def(def)
    }

    /// Read, parse, and build a world from a package file on disk.
    pub fn from_file(path: &Path) -> Result<World, WorldLoadError> {
        let raw = std::fs::read_to_string(path)?;
        World::from_json(&raw)
    }

    /// Look up a room, treating absence as a hard engine bug.
    pub fn room(&self, id: &str) -> Option<&RoomDef> {
        self.rooms.get(id)
    }

    pub fn object(&self, id: &str) -> Option<&ObjectDef> {
        self.objects.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn npc(&self, id: &str) -> Option<&NpcDef> {
        self.npcs.get(id)
    }

    /// Display name for any entity id, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        if let Some(item) = self.items.get(id) {
            &item.name
        } else if let Some(object) = self.objects.get(id) {
            &object.name
        } else if let Some(npc) = self.npcs.get(id) {
            &npc.name
        } else {
            id
        }
    }
}

/// SHA-256 over the canonical JSON rendering of the package.
///
/// Serialization order is struct-field order, so the same definition
/// always hashes identically regardless of the source document layout.
pub fn package_digest(def: &WorldDef) -> String {
    let canonical = serde_json::to_vec(def).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

/// Reduce a validation report to the spec's load-error surface.
fn classify_errors(errors: Vec<ValidationError>) -> WorldLoadError {
    let count = errors.len();
    for error in errors {
        match error {
            ValidationError::MissingReference { id, context, .. } => {
                return WorldLoadError::DanglingReference { from: context, to: id };
            },
            ValidationError::InvalidValue { context } => {
                return WorldLoadError::InvalidRoom(context);
            },
            ValidationError::DuplicateId { .. } => {},
        }
    }
    WorldLoadError::Validation(count)
}
