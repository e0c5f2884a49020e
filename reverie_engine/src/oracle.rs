//! Oracle contract: the dynamic-fallback collaborator consulted only
//! when no scripted response matches a command.
//!
//! Scripted events always preempt the oracle. The engine builds a
//! read-only snapshot of the current situation, awaits the reply, and
//! ignores any returned state change that would violate invariants.
//! Offline mode swaps in a deterministic canned-response generator so
//! the engine runs with zero external dependencies.

use std::collections::BTreeMap;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reverie_data::ActionDef;
use thiserror::Error;

use crate::command::Command;
use crate::state::{FlagValue, GameState};
use crate::world::World;

/// How many recent messages ride along in the snapshot.
pub const SNAPSHOT_MESSAGE_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle timed out")]
    Timeout,
    #[error("oracle network failure: {0}")]
    Network(String),
    #[error("oracle returned a malformed response: {0}")]
    Malformed(String),
}

/// Read-only context handed to the oracle with each command.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSnapshot {
    pub room_id: String,
    pub room_name: String,
    pub room_description: String,
    pub visible_objects: Vec<String>,
    pub exits: Vec<String>,
    pub recent_messages: Vec<String>,
    pub inventory: Vec<String>,
    pub flags: BTreeMap<String, FlagValue>,
    pub score: u32,
    pub moves: u64,
    /// The overlay's persisted rng seed; deterministic responders draw
    /// from it so replays of a save stay bit-identical.
    pub rng_seed: u64,
}

impl OracleSnapshot {
    /// Capture the current situation.
    pub fn capture(world: &World, state: &GameState, recent_messages: &[String]) -> OracleSnapshot {
        let room = world.rooms.get(&state.current_room);
        let start = recent_messages.len().saturating_sub(SNAPSHOT_MESSAGE_LIMIT);
        OracleSnapshot {
            room_id: state.current_room.clone(),
            room_name: room.map(|r| r.name.clone()).unwrap_or_default(),
            room_description: room.map(|r| r.description.clone()).unwrap_or_default(),
            visible_objects: state
                .objects_in_room(world, &state.current_room)
                .into_iter()
                .map(|id| world.display_name(id).to_string())
                .collect(),
            exits: room
                .map(|r| r.exits.iter().map(|e| e.direction.clone()).collect())
                .unwrap_or_default(),
            recent_messages: recent_messages[start..].to_vec(),
            inventory: state
                .held
                .iter()
                .map(|id| world.display_name(id).to_string())
                .collect(),
            flags: state.flags.clone(),
            score: state.score,
            moves: state.moves,
            rng_seed: state.rng_seed,
        }
    }
}

/// The oracle's reply. Returned state changes pass through
/// [`sanitize_state_changes`] before they touch the overlay.
#[derive(Debug, Clone, Default)]
pub struct OracleReply {
    pub text: String,
    pub audio: Option<String>,
    pub state_changes: Vec<ActionDef>,
}

/// The dynamic-response collaborator. The call is the engine's single
/// suspension point: simulation stays paused until it returns.
pub trait Oracle {
    fn process_command(&mut self, command: &Command, snapshot: &OracleSnapshot) -> Result<OracleReply, OracleError>;
}

/// Drop oracle-proposed actions that would violate engine invariants:
/// unknown ids, capacity overflow, or an outright game ending.
pub fn sanitize_state_changes(world: &World, state: &GameState, changes: Vec<ActionDef>) -> Vec<ActionDef> {
    changes
        .into_iter()
        .filter(|action| {
            let keep = match action {
                ActionDef::GiveItem { item, .. } => {
                    world.items.contains_key(item) && state.can_add_item(world, item).can_add
                },
                ActionDef::RemoveItem { item } => world.items.contains_key(item),
                ActionDef::ChangeRoom { room } | ActionDef::EnableExit { room, .. } => {
                    world.rooms.contains_key(room)
                },
                ActionDef::RevealItem { item, room } => {
                    world.items.contains_key(item) && world.rooms.contains_key(room)
                },
                // the oracle may not end the game or rewrite scripts
                ActionDef::EndGame { .. } | ActionDef::TriggerEvent { .. } | ActionDef::Custom { .. } => false,
                _ => true,
            };
            if !keep {
                warn!("oracle state change rejected: {action:?}");
            }
            keep
        })
        .collect()
}

/// Deterministic canned-response generator for offline mode. The pick
/// depends only on the overlay's rng seed and move counter, so replays
/// are bit-identical.
#[derive(Debug, Default)]
pub struct OfflineOracle;

const CANNED: &[&str] = &[
    "Nothing happens.",
    "That gets you nowhere.",
    "An interesting idea, but nothing comes of it.",
    "You try, but it makes no difference.",
    "The dusty silence is your only answer.",
];

impl Oracle for OfflineOracle {
    fn process_command(&mut self, command: &Command, snapshot: &OracleSnapshot) -> Result<OracleReply, OracleError> {
        // the saved seed anchors the stream; the move counter varies it
        let mut rng = StdRng::seed_from_u64(snapshot.rng_seed ^ snapshot.moves.rotate_left(17));
        let pick = rng.random_range(0..CANNED.len());
        info!(
            "offline oracle answering '{}' (pick {pick})",
            command.verb.name()
        );
        Ok(OracleReply {
            text: CANNED[pick].to_string(),
            audio: None,
            state_changes: Vec::new(),
        })
    }
}

/// Test double that panics when consulted; used to prove scripted
/// precedence (a matched script must never reach the oracle).
#[derive(Debug, Default)]
pub struct SpyOracle {
    pub calls: usize,
}

impl Oracle for SpyOracle {
    fn process_command(&mut self, _command: &Command, _snapshot: &OracleSnapshot) -> Result<OracleReply, OracleError> {
        self.calls += 1;
        panic!("oracle consulted despite a scripted match");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Verb;
    use reverie_data::{GameDef, ItemDef, PlayerDef, RoomDef, WorldDef};

    fn world() -> World {
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
                items: vec!["pebble".into()],
                ..RoomDef::default()
            }],
            items: vec![ItemDef {
                id: "pebble".into(),
                name: "pebble".into(),
                description: "Small.".into(),
                ..ItemDef::default()
            }],
            ..WorldDef::default()
        })
        .unwrap()
    }

    #[test]
    fn snapshot_captures_room_and_inventory() {
        let world = world();
        let mut state = GameState::new(&world);
        state.place_item("pebble", crate::state::ItemLocation::Held);
        state.score = 3;
        state.rng_seed = 42;
        let snapshot = OracleSnapshot::capture(&world, &state, &["hello".to_string()]);
        assert_eq!(snapshot.room_name, "Room");
        assert_eq!(snapshot.inventory, vec!["pebble".to_string()]);
        assert_eq!(snapshot.recent_messages, vec!["hello".to_string()]);
        assert_eq!(snapshot.score, 3);
        assert_eq!(snapshot.rng_seed, 42);
    }

    #[test]
    fn snapshot_limits_recent_messages() {
        let world = world();
        let state = GameState::new(&world);
        let messages: Vec<String> = (0..20).map(|i| format!("m{i}")).collect();
        let snapshot = OracleSnapshot::capture(&world, &state, &messages);
        assert_eq!(snapshot.recent_messages.len(), SNAPSHOT_MESSAGE_LIMIT);
        assert_eq!(snapshot.recent_messages[0], "m10");
    }

    #[test]
    fn offline_oracle_draws_from_the_saved_seed() {
        let world = world();
        let state = GameState::new(&world);
        let snapshot = OracleSnapshot::capture(&world, &state, &[]);
        let command = Command::bare(Verb::Wait);
        let mut oracle_a = OfflineOracle;
        let mut oracle_b = OfflineOracle;

        // the same seed and move counter always produce the same line
        let a = oracle_a.process_command(&command, &snapshot).unwrap();
        let b = oracle_b.process_command(&command, &snapshot).unwrap();
        assert_eq!(a.text, b.text);
        assert!(a.state_changes.is_empty());

        // and the overlay's seed is what anchors the stream: a reseeded
        // snapshot replays identically too
        let mut reseeded = snapshot.clone();
        reseeded.rng_seed = 7;
        let first = oracle_a.process_command(&command, &reseeded).unwrap();
        let second = oracle_b.process_command(&command, &reseeded).unwrap();
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn sanitize_drops_invalid_and_forbidden_changes() {
        let world = world();
        let state = GameState::new(&world);
        let changes = vec![
            ActionDef::GiveItem {
                item: "pebble".into(),
                message: None,
            },
            ActionDef::GiveItem {
                item: "ghost".into(),
                message: None,
            },
            ActionDef::ChangeRoom { room: "void".into() },
            ActionDef::EndGame {
                ending: "any".into(),
                message: "no".into(),
            },
            ActionDef::SetFlag {
                flag: "odd".into(),
                value: reverie_data::FlagValueDef::Bool(true),
            },
        ];
        let kept = sanitize_state_changes(&world, &state, changes);
        assert_eq!(kept.len(), 2);
        assert!(matches!(&kept[0], ActionDef::GiveItem { item, .. } if item == "pebble"));
        assert!(matches!(&kept[1], ActionDef::SetFlag { .. }));
    }
}
