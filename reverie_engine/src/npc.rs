//! NPC engine: conversations, ask-about topics, relationships and
//! moods, trading, reactions, and schedule-driven movement.

use anyhow::Result;
use log::{info, warn};
use reverie_data::{DialogueNodeDef, DialogueOptionDef, NpcDef};

use crate::bus::EngineEvent;
use crate::condition::eval_condition;
use crate::events::{Hooks, TurnOutput, dispatch_action};
use crate::state::{GameState, ItemLocation};
use crate::world::World;

/// Mood bands derived from the relationship value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Friendly,
    Neutral,
    Wary,
    Hostile,
}

impl Mood {
    pub fn from_relationship(value: i32) -> Mood {
        if value >= 50 {
            Mood::Friendly
        } else if value >= -20 {
            Mood::Neutral
        } else if value >= -60 {
            Mood::Wary
        } else {
            Mood::Hostile
        }
    }
}

/// Relationship below which an NPC refuses to talk at all.
const CONVERSATION_FLOOR: i32 = -50;
/// Relationship below which an NPC refuses to trade.
const TRADE_FLOOR: i32 = -25;

pub fn relationship(state: &GameState, npc_id: &str) -> i32 {
    state.relationships.get(npc_id).copied().unwrap_or(0)
}

/// Adjust a relationship, clamped to [-100, 100].
pub fn change_relationship(state: &mut GameState, out: &mut TurnOutput, npc_id: &str, delta: i32) {
    if delta == 0 {
        return;
    }
    let value = (relationship(state, npc_id) + delta).clamp(-100, 100);
    state.relationships.insert(npc_id.to_string(), value);
    out.emit(EngineEvent::RelationshipChanged {
        npc: npc_id.to_string(),
        value,
    });
    info!("relationship with '{npc_id}' now {value}");
}

fn node<'w>(npc: &'w NpcDef, node_id: &str) -> Option<&'w DialogueNodeDef> {
    npc.dialogue.iter().find(|n| n.id == node_id)
}

/// Options currently selectable on a node (condition-filtered).
fn open_options<'w>(npc: &'w NpcDef, node_id: &str, state: &GameState) -> Vec<&'w DialogueOptionDef> {
    node(npc, node_id)
        .map(|n| {
            n.options
                .iter()
                .filter(|o| eval_condition(o.condition.as_deref(), state))
                .collect()
        })
        .unwrap_or_default()
}

fn push_node(npc: &NpcDef, node_id: &str, state: &mut GameState, out: &mut TurnOutput) {
    let Some(node) = node(npc, node_id) else { return };
    out.push(format!("{}: \"{}\"", npc.name, node.text));
    for (i, option) in open_options(npc, node_id, state).iter().enumerate() {
        out.push(format!("  {}. {}", i + 1, option.text));
    }
    state
        .dialogue_history
        .entry(npc.id.clone())
        .or_default()
        .push(node_id.to_string());
}

/// Open a conversation at the NPC's root node.
pub fn start_conversation(world: &World, state: &mut GameState, out: &mut TurnOutput, npc_id: &str) {
    let Some(npc) = world.npcs.get(npc_id) else {
        out.push("They're not here.".to_string());
        return;
    };
    if state.npc_rooms.get(npc_id) != Some(&state.current_room) {
        out.push("They're not here.".to_string());
        return;
    }
    if relationship(state, npc_id) < CONVERSATION_FLOOR {
        out.push(format!("{} refuses to speak with you.", npc.name));
        return;
    }
    if npc.dialogue.is_empty() {
        out.push(format!("{} has nothing to say.", npc.name));
        return;
    }
    state.conversation = Some(crate::state::Conversation {
        npc: npc_id.to_string(),
        node: npc.root_node.clone(),
    });
    out.emit(EngineEvent::DialogueStarted { npc: npc_id.to_string() });
    push_node(npc, &npc.root_node.clone(), state, out);
}

/// Select a 1-based dialogue option in the open conversation.
pub fn select_option(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    choice: usize,
) -> Result<bool> {
    let Some(conversation) = state.conversation.clone() else {
        return Ok(false);
    };
    let Some(npc) = world.npcs.get(&conversation.npc) else {
        state.conversation = None;
        return Ok(false);
    };
    let options = open_options(npc, &conversation.node, state);
    let Some(option) = choice.checked_sub(1).and_then(|i| options.get(i).copied()) else {
        out.push("That isn't one of the choices.".to_string());
        return Ok(true);
    };
    let option = option.clone();

    if let Some(response) = &option.response {
        out.push(format!("{}: \"{response}\"", npc.name));
    }
    for action in &option.effects {
        dispatch_action(world, hooks, state, out, action, 0)?;
    }
    if option.ends_conversation {
        state.conversation = None;
        out.emit(EngineEvent::DialogueEnded {
            npc: conversation.npc.clone(),
        });
    } else if let Some(next) = &option.next {
        state.conversation = Some(crate::state::Conversation {
            npc: conversation.npc.clone(),
            node: next.clone(),
        });
        push_node(npc, next, state, out);
        // a terminal node (no open options) closes the conversation
        if open_options(npc, next, state).is_empty() {
            state.conversation = None;
            out.emit(EngineEvent::DialogueEnded {
                npc: conversation.npc.clone(),
            });
        }
    }
    Ok(true)
}

/// `ask NPC about TOPIC`. The topics map is a shortcut layer: when the
/// NPC exposes one it wins; otherwise the dialogue graph is consulted
/// for a node with the topic's id. Returns false when the NPC has no
/// answer at all.
pub fn ask_about(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    npc_id: &str,
    topic: &str,
) -> Result<bool> {
    let Some(npc) = world.npcs.get(npc_id) else {
        out.push("They're not here.".to_string());
        return Ok(true);
    };
    if state.npc_rooms.get(npc_id) != Some(&state.current_room) {
        out.push("They're not here.".to_string());
        return Ok(true);
    }
    if relationship(state, npc_id) < CONVERSATION_FLOOR {
        out.push(format!("{} refuses to speak with you.", npc.name));
        return Ok(true);
    }

    let key = topic.to_lowercase();
    if let Some(entry) = npc.topics.get(&key) {
        if let Some(response) = &entry.response {
            out.push(format!("{}: \"{response}\"", npc.name));
        }
        if let Some(node_id) = &entry.node {
            state.conversation = Some(crate::state::Conversation {
                npc: npc_id.to_string(),
                node: node_id.clone(),
            });
            out.emit(EngineEvent::DialogueStarted { npc: npc_id.to_string() });
            push_node(npc, node_id, state, out);
        }
        if entry.relationship_change != 0 {
            change_relationship(state, out, npc_id, entry.relationship_change);
        }
        if let Some(item) = &entry.item_given
            && state.npc_inventories.get(npc_id).is_some_and(|inv| inv.contains(item))
        {
            dispatch_action(
                world,
                hooks,
                state,
                out,
                &reverie_data::ActionDef::GiveItem {
                    item: item.clone(),
                    message: Some(format!("{} hands you the {}.", npc.name, world.display_name(item))),
                },
                0,
            )?;
        }
        return Ok(true);
    }

    // dialogue-graph fallback: a node whose id names the topic
    if node(npc, &key).is_some() {
        push_node(npc, &key, state, out);
        return Ok(true);
    }
    Ok(false)
}

/// Hand an item to an NPC. The item must already be held.
pub fn give_item(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    item_id: &str,
    npc_id: &str,
) -> Result<()> {
    let Some(npc) = world.npcs.get(npc_id) else {
        out.push("They're not here.".to_string());
        return Ok(());
    };
    state.place_item(item_id, ItemLocation::Npc(npc_id.to_string()));
    out.emit(EngineEvent::InventoryChanged);
    info!("player gave '{item_id}' to '{npc_id}'");

    if let Some(response) = npc.give_responses.get(item_id) {
        out.push(format!("{}: \"{}\"", npc.name, response.message));
        if response.relationship_change != 0 {
            change_relationship(state, out, npc_id, response.relationship_change);
        }
        for action in &response.effects {
            dispatch_action(world, hooks, state, out, action, 0)?;
        }
    } else {
        out.push(format!(
            "{} takes the {}.",
            npc.name,
            world.display_name(item_id)
        ));
    }
    Ok(())
}

/// Why a proposed trade is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeRefusal {
    TooHostile,
    PlayerMissing(String),
    NpcMissing(String),
    RequiredItem { npc_name: String, item_name: String },
    UnequalValue,
}

impl TradeRefusal {
    pub fn message(&self) -> String {
        match self {
            TradeRefusal::TooHostile => "They want nothing to do with you.".to_string(),
            TradeRefusal::PlayerMissing(name) => format!("You don't have the {name}."),
            TradeRefusal::NpcMissing(name) => format!("They don't have the {name}."),
            TradeRefusal::RequiredItem { npc_name, item_name } => {
                format!("{npc_name} wants {item_name} for that.")
            },
            TradeRefusal::UnequalValue => "They scoff at the lopsided offer.".to_string(),
        }
    }
}

/// Validate a proposed trade without changing anything.
pub fn validate_trade(
    world: &World,
    state: &GameState,
    npc_id: &str,
    give: &[String],
    receive: &[String],
) -> Result<(), TradeRefusal> {
    let Some(npc) = world.npcs.get(npc_id) else {
        return Err(TradeRefusal::TooHostile);
    };
    if relationship(state, npc_id) < TRADE_FLOOR {
        return Err(TradeRefusal::TooHostile);
    }
    for item in give {
        if !state.is_held(item) {
            return Err(TradeRefusal::PlayerMissing(world.display_name(item).to_string()));
        }
    }
    for item in receive {
        if !state.npc_inventories.get(npc_id).is_some_and(|inv| inv.contains(item)) {
            return Err(TradeRefusal::NpcMissing(world.display_name(item).to_string()));
        }
    }
    if let Some(rule) = &npc.trade {
        for required in &rule.requires {
            if !give.contains(required) {
                return Err(TradeRefusal::RequiredItem {
                    npc_name: npc.name.clone(),
                    item_name: world.display_name(required).to_string(),
                });
            }
        }
        if rule.requires_equal_value {
            let value = |ids: &[String]| -> u32 {
                ids.iter().map(|id| world.items.get(id).map_or(0, |i| i.value)).sum()
            };
            if value(give) < value(receive) {
                return Err(TradeRefusal::UnequalValue);
            }
        }
    }
    Ok(())
}

/// Execute a validated trade: atomic swap plus a trade-history record.
pub fn execute_trade(
    world: &World,
    state: &mut GameState,
    out: &mut TurnOutput,
    npc_id: &str,
    give: &[String],
    receive: &[String],
) -> Result<(), TradeRefusal> {
    validate_trade(world, state, npc_id, give, receive)?;
    for item in give {
        state.place_item(item, ItemLocation::Npc(npc_id.to_string()));
    }
    for item in receive {
        state.place_item(item, ItemLocation::Held);
    }
    state.trade_history.push(crate::state::TradeRecord {
        npc: npc_id.to_string(),
        gave: give.to_vec(),
        received: receive.to_vec(),
        at_ms: state.clock_ms,
    });
    out.emit(EngineEvent::InventoryChanged);
    let npc_name = world.npcs.get(npc_id).map_or(npc_id, |n| n.name.as_str());
    let received: Vec<&str> = receive.iter().map(|id| world.display_name(id)).collect();
    out.push(format!("You trade with {npc_name} and receive: {}.", received.join(", ")));
    info!("trade with '{npc_id}': gave {give:?}, received {receive:?}");
    Ok(())
}

/// Find the first matching reaction for a trigger kind, apply its
/// effects, and return its message and emotion.
pub fn get_npc_reaction(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    npc_id: &str,
    trigger: &str,
) -> Result<Option<(String, Option<String>)>> {
    let Some(npc) = world.npcs.get(npc_id) else {
        return Ok(None);
    };
    let Some(reaction) = npc
        .reactions
        .iter()
        .find(|r| r.trigger == trigger && eval_condition(r.condition.as_deref(), state))
        .cloned()
    else {
        return Ok(None);
    };
    for action in &reaction.effects {
        dispatch_action(world, hooks, state, out, action, 0)?;
    }
    Ok(Some((reaction.message, reaction.emotion)))
}

/// Move scheduled NPCs to the room for the current game hour.
pub fn tick_schedules(world: &World, state: &mut GameState, out: &mut TurnOutput) {
    let hour = state.game_hour(world);
    // ids snapshotted so room updates below don't fight the borrow
    let npc_ids: Vec<String> = state.npc_rooms.keys().cloned().collect();
    for npc_id in npc_ids {
        let Some(npc) = world.npcs.get(&npc_id) else { continue };
        let Some(interval) = npc
            .schedule
            .iter()
            .find(|s| hour >= s.start_hour && hour < s.end_hour)
        else {
            continue;
        };
        let current = state.npc_rooms.get(&npc_id).cloned();
        if current.as_deref() == Some(interval.room.as_str()) {
            continue;
        }
        let from = current.unwrap_or_default();
        if from == state.current_room {
            out.push(format!("{} leaves.", npc.name));
        }
        if interval.room == state.current_room {
            out.push(format!("{} arrives.", npc.name));
        }
        state.npc_rooms.insert(npc_id.clone(), interval.room.clone());
        if state.conversation.as_ref().is_some_and(|c| c.npc == npc_id) && interval.room != state.current_room {
            state.conversation = None;
            out.emit(EngineEvent::DialogueEnded { npc: npc_id.clone() });
        }
        out.emit(EngineEvent::NpcMoved {
            npc: npc_id.clone(),
            from,
            to: interval.room.clone(),
        });
        info!("npc '{npc_id}' moved by schedule (hour {hour})");
    }
}

/// Dialogue nodes this NPC has shown the player.
pub fn dialogue_history<'s>(state: &'s GameState, npc_id: &str) -> &'s [String] {
    state
        .dialogue_history
        .get(npc_id)
        .map_or(&[], Vec::as_slice)
}

/// Warn-level sanity check used by dev tooling: every conversation
/// cursor should point at an existing node.
pub fn check_conversation_cursor(world: &World, state: &GameState) {
    if let Some(conversation) = &state.conversation
        && world
            .npcs
            .get(&conversation.npc)
            .is_none_or(|npc| node(npc, &conversation.node).is_none())
    {
        warn!(
            "conversation cursor points at missing node '{}' of '{}'",
            conversation.node, conversation.npc
        );
    }
}
