//! The interaction matrix: scripted `use X on Y` rules, item
//! combinations, and key/lock unlockables.
//!
//! Lookup keys are order-independent for use-on rules and combinations;
//! a matched rule's result node carries messages, conditions, effects,
//! and consume bits.

use anyhow::Result;
use log::info;
use reverie_data::{CombinationDef, UnlockableDef, UseOnDef};

use crate::bus::EngineEvent;
use crate::condition::eval_condition;
use crate::events::{Hooks, TurnOutput, dispatch_action};
use crate::state::{GameState, ItemLocation};
use crate::world::World;

/// Find a use-on rule for an (item, target) pair, in either order.
pub fn find_use_on<'w>(world: &'w World, item: &str, target: &str) -> Option<&'w UseOnDef> {
    world.interactions.use_on.iter().find(|rule| {
        (rule.item == item && rule.target == target) || (rule.item == target && rule.target == item)
    })
}

/// Apply a matched use-on rule. Returns true when the rule succeeded.
pub fn apply_use_on(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    rule: &UseOnDef,
) -> Result<bool> {
    if !eval_condition(rule.condition.as_deref(), state) {
        match &rule.failure_message {
            Some(text) => out.push(text.clone()),
            None => out.push("That doesn't work.".to_string()),
        }
        return Ok(false);
    }
    if let Some(text) = &rule.success_message {
        out.push(text.clone());
    }
    for action in &rule.effects {
        dispatch_action(world, hooks, state, out, action, 0)?;
    }
    if rule.consume_item {
        state.place_item(&rule.item, ItemLocation::Nowhere);
        out.emit(EngineEvent::InventoryChanged);
    }
    info!("use-on rule applied: {} on {}", rule.item, rule.target);
    Ok(true)
}

/// Find a combination for a pair of items, in either order.
pub fn find_combination<'w>(world: &'w World, a: &str, b: &str) -> Option<&'w CombinationDef> {
    world.interactions.combinations.iter().find(|combo| {
        combo.inputs.len() == 2
            && ((combo.inputs[0] == a && combo.inputs[1] == b) || (combo.inputs[0] == b && combo.inputs[1] == a))
    })
}

/// Combine two held items into the result item.
pub fn apply_combination(world: &World, state: &mut GameState, out: &mut TurnOutput, combo: &CombinationDef) {
    if combo.consume_inputs {
        for input in &combo.inputs {
            state.place_item(input, ItemLocation::Nowhere);
        }
    }
    let result_name = world.display_name(&combo.result).to_string();
    let check = state.can_add_item(world, &combo.result);
    if check.can_add {
        state.place_item(&combo.result, ItemLocation::Held);
    } else {
        state.place_item(&combo.result, ItemLocation::Room(state.current_room.clone()));
    }
    match &combo.message {
        Some(text) => out.push(text.clone()),
        None => out.push(format!("You now have: {result_name}.")),
    }
    out.emit(EngineEvent::InventoryChanged);
    info!("combination produced '{}'", combo.result);
}

/// Find the unlock rule for a key item and a lock object.
pub fn find_unlockable<'w>(world: &'w World, key: &str, target: &str) -> Option<&'w UnlockableDef> {
    world
        .interactions
        .unlockables
        .iter()
        .find(|rule| rule.key == key && rule.target == target)
}

/// Find any unlock rule for a lock object, used when the player does
/// not name a key: the first rule whose key is held wins.
pub fn find_unlockable_held<'w>(world: &'w World, state: &GameState, target: &str) -> Option<&'w UnlockableDef> {
    world
        .interactions
        .unlockables
        .iter()
        .find(|rule| rule.target == target && state.is_held(&rule.key))
}

/// Apply an unlock rule: clear the lock, apply flag and exit-state
/// changes, and consume the key when the rule says so.
pub fn apply_unlockable(world: &World, state: &mut GameState, out: &mut TurnOutput, rule: &UnlockableDef) {
    state.object_state_mut(&rule.target).locked = false;
    if let Some(assign) = &rule.set_flag {
        state.set_flag(&assign.flag, crate::state::FlagValue::from(&assign.value));
    }
    if let Some(exit) = &rule.unlock_exit {
        state.exit_override_mut(&exit.room, &exit.direction).unlocked = true;
    }
    if rule.consume_key {
        state.place_item(&rule.key, ItemLocation::Nowhere);
        out.emit(EngineEvent::InventoryChanged);
    }
    let target_name = world.display_name(&rule.target).to_string();
    match &rule.message {
        Some(text) => out.push(text.clone()),
        None => out.push(format!("You unlock the {target_name}.")),
    }
    info!("unlockable applied: {} -> {}", rule.key, rule.target);
}

/// Hints for interactions whose preconditions currently hold, surfaced
/// by the hint system.
pub fn available_hints<'w>(world: &'w World, state: &GameState) -> Vec<&'w str> {
    let mut hints = Vec::new();
    for rule in &world.interactions.use_on {
        if let Some(hint) = &rule.hint
            && state.is_held(&rule.item)
            && eval_condition(rule.condition.as_deref(), state)
        {
            hints.push(hint.as_str());
        }
    }
    for combo in &world.interactions.combinations {
        if let Some(hint) = &combo.hint
            && combo.inputs.iter().all(|input| state.is_held(input))
        {
            hints.push(hint.as_str());
        }
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_data::{
        ActionDef, ExitRefDef, FlagAssignDef, FlagValueDef, GameDef, InteractionsDef, ItemDef,
        ObjectCaps, ObjectDef, PlayerDef, RoomDef, WorldDef,
    };

    fn world() -> World {
        let def = WorldDef {
            game: GameDef {
                title: "T".into(),
                player: PlayerDef {
                    name: "Hero".into(),
                    start_room: "cellar".into(),
                    ..PlayerDef::default()
                },
                ..GameDef::default()
            },
            rooms: vec![RoomDef {
                id: "cellar".into(),
                name: "Cellar".into(),
                description: "Dark.".into(),
                objects: vec!["door".into()],
                items: vec!["oil".into(), "rag".into(), "silver_key".into(), "torch".into()],
                ..RoomDef::default()
            }],
            objects: vec![ObjectDef {
                id: "door".into(),
                name: "wooden door".into(),
                description: "Sturdy.".into(),
                caps: ObjectCaps {
                    openable: true,
                    lockable: true,
                    ..ObjectCaps::default()
                },
                starts_locked: true,
                ..ObjectDef::default()
            }],
            items: vec![
                ItemDef {
                    id: "oil".into(),
                    name: "oil flask".into(),
                    description: "Slick.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "rag".into(),
                    name: "rag".into(),
                    description: "Greasy.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "soaked_rag".into(),
                    name: "oil-soaked rag".into(),
                    description: "Ready to burn.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "silver_key".into(),
                    name: "silver key".into(),
                    description: "Tarnished.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "torch".into(),
                    name: "torch".into(),
                    description: "Unlit.".into(),
                    ..ItemDef::default()
                },
            ],
            interactions: InteractionsDef {
                use_on: vec![UseOnDef {
                    item: "oil".into(),
                    target: "door".into(),
                    condition: None,
                    success_message: Some("The hinges drink the oil.".into()),
                    failure_message: None,
                    effects: vec![ActionDef::SetFlag {
                        flag: "hinges_oiled".into(),
                        value: FlagValueDef::Bool(true),
                    }],
                    consume_item: true,
                    hint: Some("Those hinges look dry.".into()),
                }],
                combinations: vec![CombinationDef {
                    inputs: vec!["oil".into(), "rag".into()],
                    result: "soaked_rag".into(),
                    message: Some("You soak the rag in oil.".into()),
                    consume_inputs: true,
                    hint: None,
                }],
                unlockables: vec![UnlockableDef {
                    key: "silver_key".into(),
                    target: "door".into(),
                    consume_key: false,
                    message: Some("You unlock the door.".into()),
                    set_flag: Some(FlagAssignDef {
                        flag: "door_unlocked".into(),
                        value: FlagValueDef::Bool(true),
                    }),
                    unlock_exit: Some(ExitRefDef {
                        room: "cellar".into(),
                        direction: "north".into(),
                    }),
                }],
            },
            ..WorldDef::default()
        };
        World::from_def(def).unwrap()
    }

    #[test]
    fn use_on_lookup_is_order_independent() {
        let world = world();
        assert!(find_use_on(&world, "oil", "door").is_some());
        assert!(find_use_on(&world, "door", "oil").is_some());
        assert!(find_use_on(&world, "rag", "door").is_none());
    }

    #[test]
    fn use_on_applies_effects_and_consumes() {
        let world = world();
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        state.place_item("oil", ItemLocation::Held);
        let rule = find_use_on(&world, "oil", "door").unwrap().clone();
        let ok = apply_use_on(&world, &Hooks::default(), &mut state, &mut out, &rule).unwrap();
        assert!(ok);
        assert!(state.flag_truthy("hinges_oiled"));
        assert_eq!(state.location_of("oil"), ItemLocation::Nowhere);
        assert_eq!(out.lines[0], "The hinges drink the oil.");
    }

    #[test]
    fn combination_is_order_independent_and_swaps_items() {
        let world = world();
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        state.place_item("oil", ItemLocation::Held);
        state.place_item("rag", ItemLocation::Held);
        let combo = find_combination(&world, "rag", "oil").unwrap().clone();
        apply_combination(&world, &mut state, &mut out, &combo);
        assert!(state.is_held("soaked_rag"));
        assert_eq!(state.location_of("oil"), ItemLocation::Nowhere);
        assert_eq!(state.location_of("rag"), ItemLocation::Nowhere);
        assert_eq!(out.lines[0], "You soak the rag in oil.");
    }

    #[test]
    fn unlockable_clears_lock_and_exit_without_consuming_key() {
        let world = world();
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        state.place_item("silver_key", ItemLocation::Held);
        assert!(state.object_state("door").locked);

        let rule = find_unlockable(&world, "silver_key", "door").unwrap().clone();
        apply_unlockable(&world, &mut state, &mut out, &rule);

        assert!(!state.object_state("door").locked);
        assert!(state.flag_truthy("door_unlocked"));
        assert!(state.exit_override("cellar", "north").unlocked);
        assert!(state.is_held("silver_key"));
        assert_eq!(out.lines[0], "You unlock the door.");
    }

    #[test]
    fn unlockable_by_held_key_lookup() {
        let world = world();
        let mut state = GameState::new(&world);
        assert!(find_unlockable_held(&world, &state, "door").is_none());
        state.place_item("silver_key", ItemLocation::Held);
        assert!(find_unlockable_held(&world, &state, "door").is_some());
    }

    #[test]
    fn hints_surface_when_preconditions_hold() {
        let world = world();
        let mut state = GameState::new(&world);
        assert!(available_hints(&world, &state).is_empty());
        state.place_item("oil", ItemLocation::Held);
        assert_eq!(available_hints(&world, &state), vec!["Those hinges look dry."]);
    }
}
