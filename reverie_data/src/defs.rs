//! World-package definitions.
//!
//! A world package is a single self-contained document describing one
//! adventure: rooms, objects, items, NPCs, puzzles, events, vocabulary,
//! and the graphics/audio descriptors the host collaborators consume.
//! The package is deserialized once at startup, validated, and never
//! mutated afterward; all runtime state lives in the engine's overlay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level world package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDef {
    pub game: GameDef,
    #[serde(default)]
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    #[serde(default)]
    pub npcs: Vec<NpcDef>,
    #[serde(default)]
    pub puzzles: Vec<PuzzleDef>,
    /// Global scripted events, checked after room-level events.
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub interactions: InteractionsDef,
    #[serde(default)]
    pub vocabulary: VocabularyDef,
    #[serde(default)]
    pub achievements: Vec<AchievementDef>,
    #[serde(default)]
    pub endings: Vec<EndingDef>,
}

/// Game metadata and engine tuning knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDef {
    pub title: String,
    #[serde(default)]
    pub intro: String,
    pub player: PlayerDef,
    #[serde(default)]
    pub max_score: u32,
    #[serde(default)]
    pub config: ConfigDef,
    /// Background music theme requested when the game starts.
    #[serde(default)]
    pub theme: Option<String>,
}

/// The player character as declared by the package.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_room: String,
    #[serde(default = "default_max_health")]
    pub max_health: i32,
    /// VIEW descriptor for the player sprite, opaque to the core.
    #[serde(default)]
    pub sprite: Option<SpriteDef>,
}

impl Default for PlayerDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            start_room: String::new(),
            max_health: default_max_health(),
            sprite: None,
        }
    }
}

fn default_max_health() -> i32 {
    100
}

/// Capacity caps and clock mapping for one world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDef {
    #[serde(default = "default_max_weight")]
    pub max_weight: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Milliseconds of logical time per in-game hour (NPC schedules).
    #[serde(default = "default_ms_per_hour")]
    pub ms_per_game_hour: u64,
}

impl Default for ConfigDef {
    fn default() -> Self {
        Self {
            max_weight: default_max_weight(),
            max_size: default_max_size(),
            max_items: default_max_items(),
            ms_per_game_hour: default_ms_per_hour(),
        }
    }
}

fn default_max_weight() -> u32 {
    100
}
fn default_max_size() -> u32 {
    50
}
fn default_max_items() -> usize {
    10
}
fn default_ms_per_hour() -> u64 {
    60_000
}

/// Any visitable location in the game world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDef {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Vector-graphics descriptor handed to the renderer, opaque to the core.
    #[serde(default)]
    pub graphics: Option<RoomGraphicsDef>,
    #[serde(default)]
    pub exits: Vec<ExitDef>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub npcs: Vec<String>,
    /// Condition that must hold before the player may enter.
    #[serde(default)]
    pub entry_condition: Option<String>,
    #[serde(default)]
    pub entry_blocked_message: Option<String>,
    /// Room-local scripted events, checked before global events.
    #[serde(default)]
    pub events: Vec<EventDef>,
    /// Walkability grid for the in-room 320x200 walk, row-major strings
    /// of `.` (walkable) and `#` (blocked), one cell per 8x8 pixels.
    #[serde(default)]
    pub collision: Option<CollisionGridDef>,
    /// Music theme requested on entry.
    #[serde(default)]
    pub music: Option<String>,
}

/// One exit from a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitDef {
    pub direction: String,
    pub to: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Item id of the key this exit is locked by, if any.
    #[serde(default)]
    pub locked_by: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub blocked_message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Capability bits declaring which verb classes an object supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectCaps {
    pub takeable: bool,
    pub openable: bool,
    pub lockable: bool,
    pub pushable: bool,
    pub pullable: bool,
    pub turnable: bool,
    pub searchable: bool,
    pub readable: bool,
    pub container: bool,
    pub hidden: bool,
    pub blocking: bool,
}

/// World furniture: scenery and mechanisms the player manipulates in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDef {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub caps: ObjectCaps,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub size: u32,
    /// Containers and openables start open when true.
    #[serde(default)]
    pub starts_open: bool,
    /// Lockables start locked when true.
    #[serde(default)]
    pub starts_locked: bool,
    /// Extra detail revealed only by `examine`.
    #[serde(default)]
    pub hidden_details: Option<String>,
    #[serde(default)]
    pub open_message: Option<String>,
    #[serde(default)]
    pub push_message: Option<String>,
    #[serde(default)]
    pub pull_message: Option<String>,
    #[serde(default)]
    pub read_text: Option<String>,
    #[serde(default)]
    pub search_message: Option<String>,
    /// Shown when searching again after a successful search.
    #[serde(default)]
    pub searched_message: Option<String>,
    /// Shown when searching without the required item.
    #[serde(default)]
    pub search_fail_message: Option<String>,
    #[serde(default)]
    pub touch_message: Option<String>,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub texture: Option<String>,
    /// Item the player must hold to interact (push/search).
    #[serde(default)]
    pub requires_item: Option<String>,
    /// Ordered pull stages; the persisted stage index selects the next one.
    #[serde(default)]
    pub pull_stages: Vec<PullStageDef>,
    #[serde(default)]
    pub pull_event: Option<String>,
    #[serde(default)]
    pub turn_positions: Vec<String>,
    #[serde(default)]
    pub turn_messages: BTreeMap<String, String>,
    #[serde(default)]
    pub turn_event: Option<String>,
    #[serde(default)]
    pub push_event: Option<String>,
    #[serde(default)]
    pub search_event: Option<String>,
    #[serde(default)]
    pub touch_effects: Vec<TouchEffectDef>,
    /// Pushing the object transfers it to this room.
    #[serde(default)]
    pub move_to_room: Option<String>,
    /// Item ids this container starts out holding.
    #[serde(default)]
    pub contents: Vec<String>,
    /// Item/object ids revealed by a successful search.
    #[serde(default)]
    pub hidden_items: Vec<String>,
    /// Bounding box used for in-room walk collision when blocking.
    #[serde(default)]
    pub bounds: Option<BoundsDef>,
}

/// One stage of a staged pull mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullStageDef {
    pub message: String,
    /// Event triggered when this stage is reached.
    #[serde(default)]
    pub event: Option<String>,
}

/// Effects applied when an object is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TouchEffectDef {
    Damage { amount: i32 },
    Temperature { level: String },
    Electric,
    Sticky,
    SetFlag { flag: String, value: FlagValueDef },
}

/// Axis-aligned pixel box in 320x200 screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsDef {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// A takeable item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Adjectives that disambiguate items sharing a canonical noun.
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub size: u32,
    /// Barter value used by the NPC trade validator.
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub wearable: Option<WearableDef>,
    #[serde(default)]
    pub edible: Option<ConsumableDef>,
    #[serde(default)]
    pub drinkable: Option<ConsumableDef>,
    /// Legible text for the `read` verb.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub container: Option<ItemContainerDef>,
}

/// Wearable parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WearableDef {
    pub slot: String,
}

/// Edible/drinkable parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumableDef {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub health_restore: i32,
}

/// Portable container parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContainerDef {
    pub capacity: usize,
    #[serde(default = "default_true")]
    pub starts_open: bool,
    /// Item ids this container starts out holding.
    #[serde(default)]
    pub contents: Vec<String>,
}

/// A non-playable character.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub room: String,
    /// "he", "she", or "they"; drives him/her pronoun memory.
    #[serde(default)]
    pub pronoun: Option<String>,
    #[serde(default)]
    pub inventory: Vec<String>,
    /// Starting relationship, clamped to [-100, 100] at runtime.
    #[serde(default)]
    pub relationship: i32,
    /// Dialogue graph nodes; navigation starts at `rootNode`.
    #[serde(default)]
    pub dialogue: Vec<DialogueNodeDef>,
    #[serde(default = "default_root_node")]
    pub root_node: String,
    #[serde(default)]
    pub reactions: Vec<ReactionDef>,
    #[serde(default)]
    pub trade: Option<TradeRuleDef>,
    #[serde(default)]
    pub schedule: Vec<ScheduleDef>,
    /// Per-item responses when the player gives this NPC an item.
    #[serde(default)]
    pub give_responses: BTreeMap<String, GiveResponseDef>,
    /// Shortcut topic table consulted by `ask NPC about TOPIC`.
    #[serde(default)]
    pub topics: BTreeMap<String, TopicDef>,
}

fn default_root_node() -> String {
    "root".to_string()
}

/// One node of an NPC dialogue graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNodeDef {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub options: Vec<DialogueOptionDef>,
}

/// A selectable dialogue option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueOptionDef {
    pub text: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub ends_conversation: bool,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub effects: Vec<ActionDef>,
}

/// Reaction matched by `getNpcReaction` trigger type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDef {
    pub trigger: String,
    #[serde(default)]
    pub condition: Option<String>,
    pub message: String,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub effects: Vec<ActionDef>,
}

/// Trade validation rules for one NPC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRuleDef {
    /// Item ids that must appear in the player's give-list.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub requires_equal_value: bool,
    /// Refusal shown when a required item is missing.
    #[serde(default)]
    pub refusal_message: Option<String>,
}

/// One interval of an NPC daily schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDef {
    pub start_hour: u8,
    pub end_hour: u8,
    pub room: String,
}

/// Response to receiving a specific item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiveResponseDef {
    pub message: String,
    #[serde(default)]
    pub relationship_change: i32,
    #[serde(default)]
    pub effects: Vec<ActionDef>,
}

/// Topic entry for ask-about; either inline text or a dialogue node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDef {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub relationship_change: i32,
    #[serde(default)]
    pub item_given: Option<String>,
}

/// A puzzle with either a single solution or ordered steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleDef {
    pub id: String,
    pub name: String,
    /// Commands that count as attempts at this puzzle.
    #[serde(default)]
    pub trigger: Option<TriggerPatternDef>,
    #[serde(default)]
    pub solution: Option<TriggerPatternDef>,
    #[serde(default)]
    pub reward: Vec<ActionDef>,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub steps: Vec<PuzzleStepDef>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default = "default_hint_cooldown")]
    pub hint_cooldown_ms: u64,
    #[serde(default)]
    pub no_reset: bool,
    #[serde(default)]
    pub reset_actions: Vec<ActionDef>,
}

fn default_hint_cooldown() -> u64 {
    30_000
}

/// One step of a multi-step puzzle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleStepDef {
    pub solution: TriggerPatternDef,
    #[serde(default)]
    pub reward: Vec<ActionDef>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub points: u32,
}

/// When an event's trigger is checked relative to the verb handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventTiming {
    #[default]
    Pre,
    Post,
}

/// A declarative scripted behavior: trigger + condition + ordered actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDef {
    pub name: String,
    /// Command pattern this event responds to; absent = imperative only.
    #[serde(default)]
    pub trigger: Option<TriggerPatternDef>,
    #[serde(default)]
    pub timing: EventTiming,
    /// Flag expression; empty/absent evaluates true.
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub once: bool,
}

/// Command pattern; unspecified fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPatternDef {
    #[serde(default)]
    pub verb: Option<String>,
    #[serde(default)]
    pub direct_object: Option<String>,
    #[serde(default)]
    pub indirect_object: Option<String>,
    #[serde(default)]
    pub preposition: Option<String>,
}

/// A flag value; the stored type never changes once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValueDef {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Everything a scripted event (or reward, or effect list) can do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionDef {
    ShowMessage {
        text: String,
        #[serde(default)]
        prevent_default: bool,
        #[serde(default)]
        audio: Option<String>,
    },
    GiveItem {
        item: String,
        #[serde(default)]
        message: Option<String>,
    },
    RemoveItem {
        item: String,
    },
    SetFlag {
        flag: String,
        value: FlagValueDef,
    },
    UpdateScore {
        points: i32,
        #[serde(default)]
        message: Option<String>,
    },
    PlaySound {
        sound: String,
    },
    PlayMusic {
        theme: String,
    },
    TriggerEvent {
        event: String,
    },
    ChangeRoom {
        room: String,
    },
    EnableExit {
        room: String,
        direction: String,
        enabled: bool,
    },
    RevealItem {
        item: String,
        room: String,
    },
    EndGame {
        ending: String,
        message: String,
    },
    ScheduleIn {
        delay_ms: u64,
        actions: Vec<ActionDef>,
    },
    Custom {
        name: String,
        #[serde(default)]
        params: BTreeMap<String, String>,
    },
}

/// Scripted `use X on Y`, item combinations, and key/lock rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionsDef {
    #[serde(default)]
    pub use_on: Vec<UseOnDef>,
    #[serde(default)]
    pub combinations: Vec<CombinationDef>,
    #[serde(default)]
    pub unlockables: Vec<UnlockableDef>,
}

/// One `use X on Y` rule. Keys are order-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseOnDef {
    pub item: String,
    pub target: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default)]
    pub effects: Vec<ActionDef>,
    #[serde(default)]
    pub consume_item: bool,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Combine two held items into a result item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationDef {
    pub inputs: Vec<String>,
    pub result: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_true")]
    pub consume_inputs: bool,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Key-to-lock rule for the `unlock` verb.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockableDef {
    pub key: String,
    /// Object id the key opens.
    pub target: String,
    #[serde(default)]
    pub consume_key: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub set_flag: Option<FlagAssignDef>,
    #[serde(default)]
    pub unlock_exit: Option<ExitRefDef>,
}

/// Flag assignment embedded in other defs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagAssignDef {
    pub flag: String,
    pub value: FlagValueDef,
}

/// Reference to one exit of one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitRefDef {
    pub room: String,
    pub direction: String,
}

/// Extra verb synonyms and input aliases layered over the built-in tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyDef {
    /// word -> canonical verb.
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    /// single-token alias -> full expansion (e.g. "n" -> "go north").
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// A player achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: u32,
    pub kind: AchievementKindDef,
}

/// The three achievement shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AchievementKindDef {
    /// Unlocks as soon as the condition holds.
    Instant { condition: String },
    /// Accumulates an integer flag toward a target.
    Progressive { counter: String, target: i64 },
    /// Unlocks when N other achievements are unlocked.
    Meta { count: usize },
}

/// One possible game ending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingDef {
    pub id: String,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub priority: i32,
    /// Flag expressions that must all hold.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Forced when its conditions hold, regardless of priority.
    #[serde(default)]
    pub failure: bool,
    /// Fallback when no other ending qualifies.
    #[serde(default)]
    pub is_default: bool,
}

/// Row-major walkability grid; `#` blocks, anything else walks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionGridDef {
    pub rows: Vec<String>,
    #[serde(default = "default_cell")]
    pub cell_w: u32,
    #[serde(default = "default_cell")]
    pub cell_h: u32,
}

fn default_cell() -> u32 {
    8
}

// --- renderer-facing descriptors (§ external interfaces) ---

/// Vector scene for one room, consumed by the renderer collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomGraphicsDef {
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub primitives: Vec<PrimitiveDef>,
}

/// Drawing primitives; colors are hex, named, or palette indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PrimitiveDef {
    Rect {
        dims: [i32; 4],
        color: String,
        #[serde(default)]
        filled: bool,
    },
    Polygon {
        points: Vec<[i32; 2]>,
        color: String,
    },
    Line {
        points: [[i32; 2]; 2],
        color: String,
        #[serde(default = "default_width")]
        width: u32,
    },
    Ellipse {
        center: [i32; 2],
        radius_x: i32,
        radius_y: i32,
        #[serde(default)]
        rotation: f32,
        color: String,
    },
    Path {
        commands: Vec<PathCommandDef>,
        color: String,
        #[serde(default)]
        filled: bool,
    },
    Star {
        points: Vec<[i32; 2]>,
        color: String,
    },
    DitheredFill {
        rect: [i32; 4],
        color_a: String,
        color_b: String,
        pattern: u8,
    },
}

fn default_width() -> u32 {
    1
}

/// Path segment commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PathCommandDef {
    MoveTo { x: i32, y: i32 },
    LineTo { x: i32, y: i32 },
    QuadraticCurveTo { cx: i32, cy: i32, x: i32, y: i32 },
    ClosePath,
}

/// An animated VIEW: loops of cells with per-cell timing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteDef {
    #[serde(default)]
    pub loops: Vec<SpriteLoopDef>,
}

/// One animation loop of a sprite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteLoopDef {
    pub name: String,
    #[serde(default)]
    pub cells: Vec<SpriteCellDef>,
    #[serde(default = "default_true")]
    pub repeat: bool,
}

/// One cell of pixel data within a loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteCellDef {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub anchor_x: i32,
    #[serde(default)]
    pub anchor_y: i32,
    #[serde(default = "default_cell_duration")]
    pub duration_ms: u64,
    /// `[x, y, paletteIndex]` triples.
    #[serde(default)]
    pub pixels: Vec<[i32; 3]>,
    #[serde(default)]
    pub transparent_color: Option<u8>,
}

fn default_cell_duration() -> u64 {
    150
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_world_deserializes_with_defaults() {
        let json = r#"{
            "game": {
                "title": "Demo",
                "player": { "name": "Hero", "startRoom": "start" }
            },
            "rooms": [{ "id": "start", "name": "Start", "description": "A room." }]
        }"#;
        let world: WorldDef = serde_json::from_str(json).unwrap();
        assert_eq!(world.game.title, "Demo");
        assert_eq!(world.game.player.max_health, 100);
        assert_eq!(world.game.config.max_weight, 100);
        assert_eq!(world.rooms.len(), 1);
        assert!(world.rooms[0].exits.is_empty());
    }

    #[test]
    fn action_defs_round_trip_tagged_form() {
        let json = r#"[
            { "type": "showMessage", "text": "hi", "preventDefault": true },
            { "type": "setFlag", "flag": "doorLocked", "value": false },
            { "type": "updateScore", "points": 5 },
            { "type": "scheduleIn", "delayMs": 1000,
              "actions": [ { "type": "playSound", "sound": "chime" } ] }
        ]"#;
        let actions: Vec<ActionDef> = serde_json::from_str(json).unwrap();
        assert_eq!(actions.len(), 4);
        assert!(matches!(
            &actions[0],
            ActionDef::ShowMessage { prevent_default: true, .. }
        ));
        assert!(matches!(
            &actions[1],
            ActionDef::SetFlag { value: FlagValueDef::Bool(false), .. }
        ));
        let round = serde_json::to_string(&actions).unwrap();
        let again: Vec<ActionDef> = serde_json::from_str(&round).unwrap();
        assert_eq!(actions, again);
    }

    #[test]
    fn flag_values_stay_untagged() {
        let v: FlagValueDef = serde_json::from_str("3").unwrap();
        assert_eq!(v, FlagValueDef::Int(3));
        let v: FlagValueDef = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(v, FlagValueDef::Str("open".into()));
        let v: FlagValueDef = serde_json::from_str("true").unwrap();
        assert_eq!(v, FlagValueDef::Bool(true));
    }

    #[test]
    fn primitives_parse_classic_shapes() {
        let json = r##"[
            { "type": "rect", "dims": [0, 0, 320, 40], "color": "#0000AA", "filled": true },
            { "type": "ditheredFill", "rect": [0, 40, 320, 160],
              "colorA": "green", "colorB": "2", "pattern": 4 },
            { "type": "line", "points": [[0, 100], [319, 100]], "color": "15" }
        ]"##;
        let prims: Vec<PrimitiveDef> = serde_json::from_str(json).unwrap();
        assert_eq!(prims.len(), 3);
        assert!(matches!(prims[2], PrimitiveDef::Line { width: 1, .. }));
    }
}
