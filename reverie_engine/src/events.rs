//! Event arbitration: scripted responses to commands and named triggers.
//!
//! Upon each turn the arbiter looks for scripted events in priority
//! order (current room, then world-global, then dynamically registered
//! handlers). An event matches when its trigger pattern matches the
//! current command, or when it is triggered imperatively by name. A
//! matched event's condition must evaluate true; its actions then run
//! in declaration order. A scripted match always wins over the oracle.

use std::collections::HashMap;

use anyhow::Result;
use log::{info, warn};
use reverie_data::{ActionDef, EventDef, EventTiming, TriggerPatternDef};

use crate::bus::EngineEvent;
use crate::command::Command;
use crate::condition::eval_condition;
use crate::movement;
use crate::progression;
use crate::state::{FlagValue, GameState, ItemLocation};
use crate::world::World;

/// Guard against event chains that trigger each other forever.
const MAX_EVENT_DEPTH: usize = 8;

/// Everything a turn produces: response lines, queued host events, and
/// collaborator requests. Drained by the engine once the turn completes.
#[derive(Debug, Default)]
pub struct TurnOutput {
    pub lines: Vec<String>,
    pub sounds: Vec<String>,
    pub music: Vec<String>,
    pub events: Vec<EngineEvent>,
    pub prevent_default: bool,
}

impl TurnOutput {
    pub fn push(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// The assembled response text for this turn.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Handler for a `Custom` action, registered by the host.
pub type CustomAction = Box<dyn Fn(&World, &mut GameState, &mut TurnOutput, &std::collections::BTreeMap<String, String>)>;

/// Pluggable behavior owned by the engine and threaded through dispatch.
#[derive(Default)]
pub struct Hooks {
    pub custom: HashMap<String, CustomAction>,
    /// Events registered at run time, lowest priority tier.
    pub dynamic_events: Vec<EventDef>,
}

impl Hooks {
    pub fn register_custom(&mut self, name: &str, action: CustomAction) {
        self.custom.insert(name.to_string(), action);
    }

    pub fn register_event(&mut self, event: EventDef) {
        self.dynamic_events.push(event);
    }
}

/// Does a trigger pattern match this command? Unspecified fields are
/// wildcards; specified object fields match the resolved id or the raw
/// phrase.
pub fn pattern_matches(pattern: &TriggerPatternDef, command: &Command) -> bool {
    if let Some(verb) = &pattern.verb
        && verb != command.verb.name()
    {
        return false;
    }
    if let Some(want) = &pattern.direct_object
        && !object_field_matches(want, command.direct_id(), command.direct_object.as_deref())
    {
        return false;
    }
    if let Some(want) = &pattern.indirect_object
        && !object_field_matches(want, command.indirect_id(), command.indirect_object.as_deref())
    {
        return false;
    }
    if let Some(preposition) = &pattern.preposition
        && Some(preposition.as_str()) != command.preposition.as_deref()
    {
        return false;
    }
    true
}

fn object_field_matches(want: &str, resolved: Option<&str>, raw: Option<&str>) -> bool {
    resolved == Some(want) || raw == Some(want)
}

/// Collect the events whose trigger matches `command`, in priority
/// order: current-room events, then globals, then dynamic handlers.
/// Conditions and once-guards are applied here.
pub fn events_matching_command(
    world: &World,
    hooks: &Hooks,
    state: &GameState,
    command: &Command,
    timing: EventTiming,
) -> Vec<EventDef> {
    let mut matched = Vec::new();
    let room_events = world
        .rooms
        .get(&state.current_room)
        .map(|r| r.events.as_slice())
        .unwrap_or_default();

    for event in room_events
        .iter()
        .chain(world.global_events.iter())
        .chain(hooks.dynamic_events.iter())
    {
        if event.timing != timing {
            continue;
        }
        if event.once && state.fired_events.contains(&event.name) {
            continue;
        }
        let Some(trigger) = &event.trigger else { continue };
        if pattern_matches(trigger, command) && eval_condition(event.condition.as_deref(), state) {
            matched.push(event.clone());
        }
    }
    matched
}

/// Run a batch of matched events. Returns true if any action requested
/// `preventDefault`.
pub fn run_events(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    events: &[EventDef],
) -> Result<bool> {
    for event in events {
        fire_event(world, hooks, state, out, event, 0)?;
    }
    Ok(out.prevent_default)
}

/// Trigger an event imperatively by name (room table first, then
/// globals, then dynamic handlers). Unknown names are logged, not fatal.
pub fn trigger_event_by_name(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    name: &str,
) -> Result<()> {
    trigger_named(world, hooks, state, out, name, 0)
}

fn trigger_named(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    name: &str,
    depth: usize,
) -> Result<()> {
    if depth >= MAX_EVENT_DEPTH {
        warn!("event chain exceeded depth {MAX_EVENT_DEPTH} at '{name}', stopping");
        return Ok(());
    }
    let room_events = world
        .rooms
        .get(&state.current_room)
        .map(|r| r.events.as_slice())
        .unwrap_or_default();
    let found: Vec<EventDef> = room_events
        .iter()
        .chain(world.global_events.iter())
        .chain(hooks.dynamic_events.iter())
        .filter(|e| e.name == name)
        .cloned()
        .collect();
    if found.is_empty() {
        info!("triggerEvent('{name}') matched no scripted event");
        return Ok(());
    }
    for event in &found {
        if event.once && state.fired_events.contains(&event.name) {
            continue;
        }
        if !eval_condition(event.condition.as_deref(), state) {
            continue;
        }
        fire_event(world, hooks, state, out, event, depth)?;
    }
    Ok(())
}

fn fire_event(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    event: &EventDef,
    depth: usize,
) -> Result<()> {
    info!("event fired: {}", event.name);
    if event.once {
        state.fired_events.insert(event.name.clone());
    }
    for action in &event.actions {
        dispatch_action(world, hooks, state, out, action, depth)?;
    }
    Ok(())
}

/// Execute one action. A failing action is logged and skipped; the rest
/// of the event still runs.
pub fn dispatch_action(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    action: &ActionDef,
    depth: usize,
) -> Result<()> {
    match action {
        ActionDef::ShowMessage {
            text,
            prevent_default,
            audio,
        } => {
            out.push(text.clone());
            if *prevent_default {
                out.prevent_default = true;
            }
            if let Some(cue) = audio {
                out.sounds.push(cue.clone());
            }
            info!("└─ action: ShowMessage(\"{}\")", truncate(text));
        },
        ActionDef::GiveItem { item, message } => give_item(world, state, out, item, message.as_deref()),
        ActionDef::RemoveItem { item } => {
            state.place_item(item, ItemLocation::Nowhere);
            out.emit(EngineEvent::InventoryChanged);
            info!("└─ action: RemoveItem({item})");
        },
        ActionDef::SetFlag { flag, value } => {
            state.set_flag(flag, FlagValue::from(value));
            info!("└─ action: SetFlag({flag})");
        },
        ActionDef::UpdateScore { points, message } => {
            progression::update_score(world, state, out, *points, message.as_deref());
        },
        ActionDef::PlaySound { sound } => {
            out.sounds.push(sound.clone());
            info!("└─ action: PlaySound({sound})");
        },
        ActionDef::PlayMusic { theme } => {
            out.music.push(theme.clone());
            info!("└─ action: PlayMusic({theme})");
        },
        ActionDef::TriggerEvent { event } => {
            trigger_named(world, hooks, state, out, event, depth + 1)?;
        },
        ActionDef::ChangeRoom { room } => {
            movement::relocate_player(world, state, out, room);
            info!("└─ action: ChangeRoom({room})");
        },
        ActionDef::EnableExit {
            room,
            direction,
            enabled,
        } => {
            state.exit_override_mut(room, direction).enabled = Some(*enabled);
            info!("└─ action: EnableExit({room}, {direction}, {enabled})");
        },
        ActionDef::RevealItem { item, room } => {
            state.place_item(item, ItemLocation::Room(room.clone()));
            info!("└─ action: RevealItem({item}, {room})");
        },
        ActionDef::EndGame { ending, message } => {
            out.push(message.clone());
            progression::end_game(world, state, out, ending);
        },
        ActionDef::ScheduleIn { delay_ms, actions } => {
            state
                .scheduler
                .schedule_in(state.clock_ms, *delay_ms, actions.clone(), None);
        },
        ActionDef::Custom { name, params } => {
            if let Some(handler) = hooks.custom.get(name) {
                handler(world, state, out, params);
                info!("└─ action: Custom({name})");
            } else {
                warn!("custom action '{name}' has no registered handler, skipped");
            }
        },
    }
    Ok(())
}

fn give_item(world: &World, state: &mut GameState, out: &mut TurnOutput, item: &str, message: Option<&str>) {
    let name = world.display_name(item).to_string();
    let check = state.can_add_item(world, item);
    if check.can_add {
        state.place_item(item, ItemLocation::Held);
        match message {
            Some(text) => out.push(text.to_string()),
            None => out.push(format!("You receive: {name}.")),
        }
    } else {
        state.place_item(item, ItemLocation::Room(state.current_room.clone()));
        out.push(format!("The {name} falls at your feet; you can't carry it."));
    }
    out.emit(EngineEvent::InventoryChanged);
    info!("└─ action: GiveItem({item})");
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= 50 {
        text.to_string()
    } else {
        let cut: String = text.chars().take(47).collect();
        format!("{cut}...")
    }
}
