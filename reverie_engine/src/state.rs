//! The mutable overlay layered atop the immutable [`crate::World`].
//!
//! Everything that can change during play lives here: flags, item
//! locations, object states, inventory, relationships, progression,
//! the logical clock, and the scheduler. The overlay is owned by the
//! engine, mutated only through command handlers and event actions,
//! and serializes whole into a save snapshot.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use reverie_data::FlagValueDef;
use serde::{Deserialize, Serialize};
use variantly::Variantly;

use crate::scheduler::Scheduler;
use crate::world::World;

/// A typed flag value. Once a flag is set its type never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl FlagValue {
    /// Truthiness used by the condition language.
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(n) => *n != 0,
            FlagValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn same_type(&self, other: &FlagValue) -> bool {
        matches!(
            (self, other),
            (FlagValue::Bool(_), FlagValue::Bool(_))
                | (FlagValue::Int(_), FlagValue::Int(_))
                | (FlagValue::Str(_), FlagValue::Str(_))
        )
    }
}

impl From<&FlagValueDef> for FlagValue {
    fn from(def: &FlagValueDef) -> Self {
        match def {
            FlagValueDef::Bool(b) => FlagValue::Bool(*b),
            FlagValueDef::Int(n) => FlagValue::Int(*n),
            FlagValueDef::Str(s) => FlagValue::Str(s.clone()),
        }
    }
}

/// Where an item currently is. Every item has exactly one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Variantly, Default)]
#[serde(rename_all = "camelCase")]
pub enum ItemLocation {
    Room(String),
    Held,
    /// Worn in the named slot.
    Worn(String),
    /// Inside the container item with this id.
    Container(String),
    Npc(String),
    /// Unspawned, despawned, or hidden pending reveal.
    #[default]
    Nowhere,
}

/// Run-time state of one stateful entity: a world object, or a
/// container item (which only uses the `open`/`locked` fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectState {
    /// Current room; objects can be pushed elsewhere.
    pub room: Option<String>,
    pub open: bool,
    pub locked: bool,
    pub searched: bool,
    pub pushed: bool,
    pub pull_stage: usize,
    pub turn_index: usize,
    pub touched: bool,
    pub hidden: bool,
}

/// Most-recently referenced entities backing `it`/`him`/`her`/`them`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PronounMemory {
    pub it: Option<PronounRef>,
    pub him: Option<PronounRef>,
    pub her: Option<PronounRef>,
    pub them: Option<PronounRef>,
}

/// A remembered referent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronounRef {
    pub kind: String,
    pub id: String,
    pub name: String,
}

/// Per-puzzle progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleState {
    pub started: bool,
    pub solved: bool,
    pub attempts: u32,
    pub current_step: usize,
    pub last_hint_ms: Option<u64>,
    pub next_hint: usize,
}

/// Score, achievements, path alignment, and ending factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progression {
    pub unlocked: BTreeSet<String>,
    pub progress: BTreeMap<String, i64>,
    pub path: String,
    pub ending_factors: BTreeMap<String, i64>,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            unlocked: BTreeSet::new(),
            progress: BTreeMap::new(),
            path: "neutral".to_string(),
            ending_factors: BTreeMap::new(),
        }
    }
}

/// In-room walk in progress toward a pixel target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkState {
    pub target_x: f64,
    pub target_y: f64,
    /// Pixels advanced per fixed tick.
    pub speed: f64,
}

/// One step of a scripted NPC movement pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatternStep {
    Move { x: f64, y: f64 },
    Wait { duration_ms: u64 },
    Loop,
}

/// Execution state of an NPC movement pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcPattern {
    pub steps: Vec<PatternStep>,
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub wait_until_ms: Option<u64>,
    pub active: bool,
}

/// A completed exchange with an NPC, kept for the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub npc: String,
    pub gave: Vec<String>,
    pub received: Vec<String>,
    pub at_ms: u64,
}

/// An open conversation cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub npc: String,
    pub node: String,
}

/// Runtime override of one room exit's declared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExitOverride {
    pub enabled: Option<bool>,
    /// Set once the locked exit has been opened with its key.
    pub unlocked: bool,
}

/// Outcome of a capacity check before adding an item to inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityCheck {
    pub can_add: bool,
    pub reason: Option<String>,
}

impl CapacityCheck {
    fn ok() -> Self {
        Self { can_add: true, reason: None }
    }
    fn no(reason: impl Into<String>) -> Self {
        Self {
            can_add: false,
            reason: Some(reason.into()),
        }
    }
}

/// The complete mutable overlay for one play-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub current_room: String,
    pub previous_room: Option<String>,
    /// Held item ids, in acquisition order.
    pub held: Vec<String>,
    /// slot -> worn item id.
    pub worn: BTreeMap<String, String>,
    /// container item id -> contained item ids, in insertion order.
    pub containers: BTreeMap<String, Vec<String>>,
    pub item_locations: BTreeMap<String, ItemLocation>,
    /// room id -> loose item ids, in order.
    pub room_items: BTreeMap<String, Vec<String>>,
    pub npc_inventories: BTreeMap<String, Vec<String>>,
    pub object_states: BTreeMap<String, ObjectState>,
    /// "room/direction" -> runtime exit override.
    pub exit_overrides: BTreeMap<String, ExitOverride>,
    pub flags: BTreeMap<String, FlagValue>,
    pub score: u32,
    pub moves: u64,
    pub health: i32,
    pub relationships: BTreeMap<String, i32>,
    pub npc_rooms: BTreeMap<String, String>,
    pub dialogue_history: BTreeMap<String, Vec<String>>,
    pub conversation: Option<Conversation>,
    pub trade_history: Vec<TradeRecord>,
    pub visited_rooms: BTreeSet<String>,
    /// Names of once-only events that have already fired.
    pub fired_events: BTreeSet<String>,
    pub pronouns: PronounMemory,
    pub puzzles: BTreeMap<String, PuzzleState>,
    pub progression: Progression,
    /// Fixed steps simulated so far.
    pub tick_count: u64,
    /// Logical clock advanced only by fixed simulation steps.
    pub clock_ms: u64,
    /// Seed for deterministic responders (the offline oracle); saved so
    /// replays of a snapshot stay bit-identical.
    pub rng_seed: u64,
    pub player_x: f64,
    pub player_y: f64,
    pub walk: Option<WalkState>,
    pub npc_patterns: BTreeMap<String, NpcPattern>,
    pub scheduler: Scheduler,
    /// Ending id once the game has concluded.
    pub ended: Option<String>,
    pub last_autosave_ms: u64,
}

impl GameState {
    /// Create the starting overlay for a world.
    pub fn new(world: &World) -> GameState {
        let mut state = GameState {
            current_room: world.player.start_room.clone(),
            previous_room: None,
            held: Vec::new(),
            worn: BTreeMap::new(),
            containers: BTreeMap::new(),
            item_locations: BTreeMap::new(),
            room_items: BTreeMap::new(),
            npc_inventories: BTreeMap::new(),
            object_states: BTreeMap::new(),
            exit_overrides: BTreeMap::new(),
            flags: BTreeMap::new(),
            score: 0,
            moves: 0,
            health: world.player.max_health,
            relationships: BTreeMap::new(),
            npc_rooms: BTreeMap::new(),
            dialogue_history: BTreeMap::new(),
            conversation: None,
            trade_history: Vec::new(),
            visited_rooms: BTreeSet::new(),
            fired_events: BTreeSet::new(),
            pronouns: PronounMemory::default(),
            puzzles: BTreeMap::new(),
            progression: Progression::default(),
            tick_count: 0,
            clock_ms: 0,
            rng_seed: 0x5eed_cafe,
            player_x: 160.0,
            player_y: 150.0,
            walk: None,
            npc_patterns: BTreeMap::new(),
            scheduler: Scheduler::default(),
            ended: None,
            last_autosave_ms: 0,
        };

        // Hidden items listed under a searchable object start nowhere and
        // spawn into the room when revealed.
        let mut hidden: BTreeSet<&str> = BTreeSet::new();
        for object in world.objects.values() {
            for id in &object.hidden_items {
                hidden.insert(id.as_str());
            }
        }

        for room_id in &world.room_order {
            let Some(room) = world.rooms.get(room_id) else { continue };
            for item_id in &room.items {
                if hidden.contains(item_id.as_str()) {
                    state.item_locations.insert(item_id.clone(), ItemLocation::Nowhere);
                } else {
                    state
                        .room_items
                        .entry(room_id.clone())
                        .or_default()
                        .push(item_id.clone());
                    state
                        .item_locations
                        .insert(item_id.clone(), ItemLocation::Room(room_id.clone()));
                }
            }
            for object_id in &room.objects {
                let Some(object) = world.objects.get(object_id) else { continue };
                state.object_states.insert(
                    object_id.clone(),
                    ObjectState {
                        room: Some(room_id.clone()),
                        open: object.starts_open,
                        locked: object.starts_locked,
                        hidden: object.caps.hidden || hidden.contains(object_id.as_str()),
                        ..ObjectState::default()
                    },
                );
            }
            for npc_id in &room.npcs {
                state.npc_rooms.insert(npc_id.clone(), room_id.clone());
            }
        }

        for npc in world.npcs.values() {
            state.npc_rooms.entry(npc.id.clone()).or_insert_with(|| npc.room.clone());
            for item_id in &npc.inventory {
                state
                    .npc_inventories
                    .entry(npc.id.clone())
                    .or_default()
                    .push(item_id.clone());
                state
                    .item_locations
                    .insert(item_id.clone(), ItemLocation::Npc(npc.id.clone()));
            }
            state.relationships.insert(npc.id.clone(), npc.relationship.clamp(-100, 100));
        }

        // Items never placed anywhere start nowhere; events may spawn them.
        for item_id in world.items.keys() {
            state
                .item_locations
                .entry(item_id.clone())
                .or_insert(ItemLocation::Nowhere);
        }

        // Container items share the object-state table for open/closed.
        for item in world.items.values() {
            if let Some(container) = &item.container {
                state.object_states.insert(
                    item.id.clone(),
                    ObjectState {
                        open: container.starts_open,
                        ..ObjectState::default()
                    },
                );
            }
        }

        // Seed declared container contents (objects and container items).
        let mut seed_contents: Vec<(String, Vec<String>)> = Vec::new();
        for object in world.objects.values() {
            if !object.contents.is_empty() {
                seed_contents.push((object.id.clone(), object.contents.clone()));
            }
        }
        for item in world.items.values() {
            if let Some(container) = &item.container
                && !container.contents.is_empty()
            {
                seed_contents.push((item.id.clone(), container.contents.clone()));
            }
        }
        seed_contents.sort();
        for (container_id, contents) in seed_contents {
            for item_id in contents {
                state.place_item(&item_id, ItemLocation::Container(container_id.clone()));
            }
        }

        state.visited_rooms.insert(state.current_room.clone());
        state
    }

    // ----- flags -----

    /// Set a flag, enforcing that its type never changes once set.
    pub fn set_flag(&mut self, name: &str, value: FlagValue) {
        if let Some(existing) = self.flags.get(name)
            && !existing.same_type(&value)
        {
            warn!("flag '{name}' type change rejected ({existing:?} -> {value:?})");
            return;
        }
        self.flags.insert(name.to_string(), value);
    }

    pub fn flag_truthy(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(FlagValue::is_truthy)
    }

    // ----- item bookkeeping -----

    pub fn location_of(&self, item_id: &str) -> ItemLocation {
        self.item_locations.get(item_id).cloned().unwrap_or_default()
    }

    pub fn is_held(&self, item_id: &str) -> bool {
        self.location_of(item_id).is_held()
    }

    pub fn is_worn(&self, item_id: &str) -> bool {
        matches!(self.location_of(item_id), ItemLocation::Worn(_))
    }

    /// Detach an item from whatever currently holds it.
    fn detach(&mut self, item_id: &str) {
        match self.location_of(item_id) {
            ItemLocation::Room(room) => {
                if let Some(items) = self.room_items.get_mut(&room) {
                    items.retain(|id| id != item_id);
                }
            },
            ItemLocation::Held => self.held.retain(|id| id != item_id),
            ItemLocation::Worn(slot) => {
                self.worn.remove(&slot);
            },
            ItemLocation::Container(container) => {
                if let Some(contents) = self.containers.get_mut(&container) {
                    contents.retain(|id| id != item_id);
                }
            },
            ItemLocation::Npc(npc) => {
                if let Some(inv) = self.npc_inventories.get_mut(&npc) {
                    inv.retain(|id| id != item_id);
                }
            },
            ItemLocation::Nowhere => {},
        }
    }

    /// Move an item to a new location, keeping all holder lists in sync.
    /// This is the single choke point for item movement (invariant: an
    /// item id appears in exactly one holder).
    pub fn place_item(&mut self, item_id: &str, location: ItemLocation) {
        self.detach(item_id);
        match &location {
            ItemLocation::Room(room) => {
                self.room_items.entry(room.clone()).or_default().push(item_id.to_string());
            },
            ItemLocation::Held => self.held.push(item_id.to_string()),
            ItemLocation::Worn(slot) => {
                self.worn.insert(slot.clone(), item_id.to_string());
            },
            ItemLocation::Container(container) => {
                self.containers
                    .entry(container.clone())
                    .or_default()
                    .push(item_id.to_string());
            },
            ItemLocation::Npc(npc) => {
                self.npc_inventories
                    .entry(npc.clone())
                    .or_default()
                    .push(item_id.to_string());
            },
            ItemLocation::Nowhere => {},
        }
        self.item_locations.insert(item_id.to_string(), location);
    }

    /// Contents of a container item.
    pub fn container_contents(&self, container_id: &str) -> &[String] {
        self.containers.get(container_id).map_or(&[], Vec::as_slice)
    }

    /// Loose items lying in a room.
    pub fn items_in_room(&self, room_id: &str) -> &[String] {
        self.room_items.get(room_id).map_or(&[], Vec::as_slice)
    }

    /// Object ids currently present and visible in a room.
    pub fn objects_in_room<'w>(&self, world: &'w World, room_id: &str) -> Vec<&'w str> {
        let Some(room) = world.rooms.get(room_id) else {
            return Vec::new();
        };
        room.objects
            .iter()
            .filter(|id| {
                self.object_states
                    .get(*id)
                    .is_none_or(|s| !s.hidden && s.room.as_deref() == Some(room_id))
            })
            .map(String::as_str)
            .collect()
    }

    /// NPC ids currently in a room.
    pub fn npcs_in_room(&self, room_id: &str) -> Vec<&str> {
        self.npc_rooms
            .iter()
            .filter(|(_, room)| room.as_str() == room_id)
            .map(|(npc, _)| npc.as_str())
            .collect()
    }

    pub fn object_state(&self, object_id: &str) -> ObjectState {
        self.object_states.get(object_id).cloned().unwrap_or_default()
    }

    pub fn object_state_mut(&mut self, object_id: &str) -> &mut ObjectState {
        self.object_states.entry(object_id.to_string()).or_default()
    }

    // ----- capacity model -----

    /// Weight of a thing (item, or takeable object) ignoring contents.
    fn own_weight(world: &World, id: &str) -> u32 {
        world
            .items
            .get(id)
            .map(|i| i.weight)
            .or_else(|| world.objects.get(id).map(|o| o.weight))
            .unwrap_or(0)
    }

    fn own_size(world: &World, id: &str) -> u32 {
        world
            .items
            .get(id)
            .map(|i| i.size)
            .or_else(|| world.objects.get(id).map(|o| o.size))
            .unwrap_or(0)
    }

    /// Weight of an item plus, transitively, everything inside it.
    pub fn weight_with_contents(&self, world: &World, item_id: &str) -> u32 {
        let own = Self::own_weight(world, item_id);
        let contents: u32 = self
            .container_contents(item_id)
            .iter()
            .map(|id| self.weight_with_contents(world, id))
            .sum();
        own + contents
    }

    /// Total carried weight: held items (with contents) plus half-weight
    /// worn items (contents of worn containers still count in full).
    pub fn carried_weight(&self, world: &World) -> u32 {
        let held: u32 = self
            .held
            .iter()
            .map(|id| self.weight_with_contents(world, id))
            .sum();
        let worn: u32 = self
            .worn
            .values()
            .map(|id| {
                let own = Self::own_weight(world, id);
                let contents = self.weight_with_contents(world, id) - own;
                own / 2 + contents
            })
            .sum();
        held + worn
    }

    pub fn carried_size(&self, world: &World) -> u32 {
        self.held.iter().map(|id| Self::own_size(world, id)).sum()
    }

    /// Check whether a thing fits before adding it to held inventory.
    pub fn can_add_item(&self, world: &World, item_id: &str) -> CapacityCheck {
        if !world.items.contains_key(item_id) && !world.objects.contains_key(item_id) {
            return CapacityCheck::no("There is no such thing.");
        }
        let name = world.display_name(item_id).to_string();
        if self.is_held(item_id) {
            return CapacityCheck::no(format!("You already have the {name}."));
        }
        if self.held.len() >= world.config.max_items {
            return CapacityCheck::no("Your hands are full.");
        }
        let added_weight = self.weight_with_contents(world, item_id);
        if self.carried_weight(world) + added_weight > world.config.max_weight {
            return CapacityCheck::no(format!("The {name} is too heavy to carry with everything else."));
        }
        if self.carried_size(world) + Self::own_size(world, item_id) > world.config.max_size {
            return CapacityCheck::no(format!("You can't fit the {name} anywhere."));
        }
        CapacityCheck::ok()
    }

    // ----- time -----

    /// Current in-game hour [0, 24) derived from the logical clock.
    pub fn game_hour(&self, world: &World) -> u8 {
        let per_hour = world.config.ms_per_game_hour.max(1);
        u8::try_from((self.clock_ms / per_hour) % 24).unwrap_or(0)
    }

    // ----- exits -----

    pub fn exit_key(room: &str, direction: &str) -> String {
        format!("{room}/{direction}")
    }

    pub fn exit_override(&self, room: &str, direction: &str) -> ExitOverride {
        self.exit_overrides
            .get(&Self::exit_key(room, direction))
            .copied()
            .unwrap_or_default()
    }

    pub fn exit_override_mut(&mut self, room: &str, direction: &str) -> &mut ExitOverride {
        self.exit_overrides
            .entry(Self::exit_key(room, direction))
            .or_default()
    }
}
