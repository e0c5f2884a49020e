//! Object and mechanism handlers: movement, use, containers, locks,
//! and the multi-stage push/pull/turn/touch/search machinery.

use anyhow::Result;
use log::info;
use reverie_data::{ObjectDef, TouchEffectDef};

use crate::bus::EngineEvent;
use crate::command::{Command, RefKind, ResolvedRef};
use crate::dispatch::{CommandOutcome, Ctx, DispatchError, look};
use crate::events::trigger_event_by_name;
use crate::interaction;
use crate::movement::{self, MoveCheck};
use crate::state::{FlagValue, ItemLocation};

/// `go <direction>`.
pub fn go_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(direction) = command.direct_id().map(str::to_string) else {
        ctx.out.push("Go where?");
        return Ok(CommandOutcome::handled());
    };
    match movement::can_move(ctx.world, ctx.state, &ctx.state.current_room, &direction) {
        MoveCheck::Allowed { to } => {
            trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, "exit")?;
            movement::enter_room(ctx.world, ctx.state, ctx.out, &to, Some(&direction));
            look::describe_room(ctx);
            trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, "enter")?;
        },
        check => ctx.out.push(check.message()),
    }
    Ok(CommandOutcome::handled())
}

/// `use X [on Y]`: the interaction matrix. A single-target use with no
/// matching rule is left for the oracle.
pub fn use_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(tool) = &command.resolved_direct else {
        ctx.out.push("Use what?");
        return Ok(CommandOutcome::handled());
    };
    let Some(target) = &command.resolved_indirect else {
        return Ok(CommandOutcome::unhandled());
    };

    // item + item: a combination outranks a use-on rule
    if tool.kind == RefKind::Item
        && target.kind == RefKind::Item
        && let Some(combo) = interaction::find_combination(ctx.world, &tool.id, &target.id).cloned()
    {
        if !ctx.state.is_held(&tool.id) || !ctx.state.is_held(&target.id) {
            ctx.out.push("You need both of those in hand.");
            return Ok(CommandOutcome::handled());
        }
        interaction::apply_combination(ctx.world, ctx.state, ctx.out, &combo);
        return Ok(CommandOutcome::handled());
    }

    if let Some(rule) = interaction::find_use_on(ctx.world, &tool.id, &target.id).cloned() {
        if !ctx.state.is_held(&rule.item) {
            ctx.out
                .push(format!("You aren't carrying the {}.", ctx.world.display_name(&rule.item)));
            return Ok(CommandOutcome::handled());
        }
        interaction::apply_use_on(ctx.world, ctx.hooks, ctx.state, ctx.out, &rule)?;
        return Ok(CommandOutcome::handled());
    }

    Ok(CommandOutcome::unhandled())
}

/// `open X`.
pub fn open_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = require_openable(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let object_state = ctx.state.object_state(&target.id);
    if object_state.locked {
        ctx.out.push(DispatchError::Locked(target.name.clone()).to_string());
        return Ok(CommandOutcome::handled());
    }
    if object_state.open {
        ctx.out.push(format!("The {} is already open.", target.name));
        return Ok(CommandOutcome::handled());
    }
    ctx.state.object_state_mut(&target.id).open = true;

    let open_message = ctx
        .world
        .objects
        .get(&target.id)
        .and_then(|o| o.open_message.clone());
    match open_message {
        Some(text) => ctx.out.push(text),
        None => ctx.out.push(format!("You open the {}.", target.name)),
    }

    let contents: Vec<String> = ctx
        .state
        .container_contents(&target.id)
        .iter()
        .map(|id| ctx.world.display_name(id).to_string())
        .collect();
    if !contents.is_empty() {
        ctx.out.push(format!("Inside you see: {}.", contents.join(", ")));
    }
    info!("opened '{}'", target.id);
    Ok(CommandOutcome::handled())
}

/// `close X`.
pub fn close_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = require_openable(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    if !ctx.state.object_state(&target.id).open {
        ctx.out.push(format!("The {} is already closed.", target.name));
        return Ok(CommandOutcome::handled());
    }
    ctx.state.object_state_mut(&target.id).open = false;
    ctx.out.push(format!("You close the {}.", target.name));
    Ok(CommandOutcome::handled())
}

/// `lock X`: requires the matching key in hand.
pub fn lock_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = resolved_object(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let Some(object) = ctx.world.objects.get(&target.id) else {
        ctx.out.push("You can't lock that.");
        return Ok(CommandOutcome::handled());
    };
    if !object.caps.lockable {
        ctx.out.push(format!("The {} doesn't lock.", object.name));
        return Ok(CommandOutcome::handled());
    }
    if ctx.state.object_state(&target.id).locked {
        ctx.out.push(format!("The {} is already locked.", object.name));
        return Ok(CommandOutcome::handled());
    }
    if interaction::find_unlockable_held(ctx.world, ctx.state, &target.id).is_none() {
        ctx.out.push("You don't have the right key.");
        return Ok(CommandOutcome::handled());
    }
    let state = ctx.state.object_state_mut(&target.id);
    state.locked = true;
    state.open = false;
    ctx.out.push(format!("You lock the {}.", object.name));
    Ok(CommandOutcome::handled())
}

/// `unlock X [with Y]`: the interaction matrix's key/lock rules.
pub fn unlock_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = resolved_object(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };

    let rule = if let Some(key) = &command.resolved_indirect {
        let found = interaction::find_unlockable(ctx.world, &key.id, &target.id).cloned();
        if found.is_none() {
            ctx.out
                .push(format!("The {} doesn't unlock with the {}.", target.name, key.name));
            return Ok(CommandOutcome::handled());
        }
        found
    } else {
        interaction::find_unlockable_held(ctx.world, ctx.state, &target.id).cloned()
    };
    let Some(rule) = rule else {
        ctx.out.push("You don't have the right key.");
        return Ok(CommandOutcome::handled());
    };
    if !ctx.state.is_held(&rule.key) {
        ctx.out
            .push(format!("You aren't carrying the {}.", ctx.world.display_name(&rule.key)));
        return Ok(CommandOutcome::handled());
    }
    if !ctx.state.object_state(&target.id).locked && rule.unlock_exit.is_none() {
        ctx.out.push(format!("The {} isn't locked.", target.name));
        return Ok(CommandOutcome::handled());
    }
    interaction::apply_unlockable(ctx.world, ctx.state, ctx.out, &rule);
    Ok(CommandOutcome::handled())
}

/// `push X`.
pub fn push_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some((target, object)) = capable_object(ctx, command, |o| o.caps.pushable, "push") else {
        return Ok(CommandOutcome::handled());
    };
    if let Some(required) = &object.requires_item
        && !ctx.state.is_held(required)
    {
        ctx.out.push(format!("You can't move the {} bare-handed.", object.name));
        return Ok(CommandOutcome::handled());
    }

    match &object.push_message {
        Some(text) => ctx.out.push(text.clone()),
        None => ctx.out.push(format!("You push the {}.", object.name)),
    }
    if let Some(room) = &object.move_to_room {
        ctx.state.object_state_mut(&target.id).room = Some(room.clone());
        ctx.out.push(format!("The {} slides out of sight.", object.name));
    }
    ctx.state.object_state_mut(&target.id).pushed = true;
    if let Some(event) = object.push_event.clone() {
        trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, &event)?;
    }
    Ok(CommandOutcome::handled())
}

/// `pull X`: staged pulls cycle through their persisted stage index.
pub fn pull_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some((target, object)) = capable_object(ctx, command, |o| o.caps.pullable, "pull") else {
        return Ok(CommandOutcome::handled());
    };

    if object.pull_stages.is_empty() {
        if ctx.state.object_state(&target.id).pull_stage == 0 {
            ctx.state.object_state_mut(&target.id).pull_stage = 1;
            match &object.pull_message {
                Some(text) => ctx.out.push(text.clone()),
                None => ctx.out.push(format!("You pull the {}, but nothing happens.", object.name)),
            }
            if let Some(event) = object.pull_event.clone() {
                trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, &event)?;
            }
        } else {
            ctx.out.push("Nothing more happens.");
        }
        return Ok(CommandOutcome::handled());
    }

    let stage_index = ctx.state.object_state(&target.id).pull_stage;
    let Some(stage) = object.pull_stages.get(stage_index) else {
        ctx.out.push("Nothing more happens.");
        return Ok(CommandOutcome::handled());
    };
    ctx.out.push(stage.message.clone());
    ctx.state.object_state_mut(&target.id).pull_stage = stage_index + 1;

    if let Some(event) = stage.event.clone() {
        trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, &event)?;
    }
    // the final stage also fires the object-level pull event
    if stage_index + 1 == object.pull_stages.len()
        && let Some(event) = object.pull_event.clone()
    {
        trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, &event)?;
    }
    Ok(CommandOutcome::handled())
}

/// `turn X`: advances through the declared positions.
pub fn turn_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some((target, object)) = capable_object(ctx, command, |o| o.caps.turnable, "turn") else {
        return Ok(CommandOutcome::handled());
    };

    if object.turn_positions.is_empty() {
        let state = ctx.state.object_state_mut(&target.id);
        state.turn_index += 1;
        ctx.out.push(format!("You turn the {}.", object.name));
    } else {
        let next = (ctx.state.object_state(&target.id).turn_index + 1) % object.turn_positions.len();
        ctx.state.object_state_mut(&target.id).turn_index = next;
        let position = &object.turn_positions[next];
        match object.turn_messages.get(position) {
            Some(text) => ctx.out.push(text.clone()),
            None => ctx
                .out
                .push(format!("You turn the {} to position: {position}.", object.name)),
        }
    }
    if let Some(event) = object.turn_event.clone() {
        trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, &event)?;
    }
    Ok(CommandOutcome::handled())
}

/// `touch X`: textures, temperatures, and touch effects.
pub fn touch_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = resolved_object(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let Some(object) = ctx.world.objects.get(&target.id).cloned() else {
        ctx.out.push("You feel nothing special.");
        return Ok(CommandOutcome::handled());
    };

    if let Some(text) = &object.touch_message {
        ctx.out.push(text.clone());
    } else if let Some(texture) = &object.texture {
        ctx.out.push(format!("It feels {texture}."));
    } else if let Some(temperature) = &object.temperature {
        ctx.out.push(format!("It feels {temperature}."));
    } else {
        ctx.out.push("You feel nothing special.");
    }

    for effect in &object.touch_effects {
        match effect {
            TouchEffectDef::Damage { amount } => {
                ctx.state.health -= amount;
                ctx.out.push("That hurts!".to_string());
                if ctx.state.health <= 0 {
                    ctx.state.health = 0;
                    ctx.out.push("Everything goes dark.".to_string());
                    ctx.out.emit(EngineEvent::PlayerDied);
                    trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, "player_death")?;
                }
            },
            TouchEffectDef::Temperature { level } => {
                ctx.state
                    .set_flag(&format!("touched_{}", target.id), FlagValue::Str(level.clone()));
                ctx.out.sounds.push("sizzle".to_string());
            },
            TouchEffectDef::Electric => {
                ctx.out.push("A sharp jolt shoots up your arm!".to_string());
                ctx.out.sounds.push("zap".to_string());
            },
            TouchEffectDef::Sticky => {
                ctx.out.push("Your hand comes away sticky.".to_string());
                ctx.state.set_flag("hands_sticky", FlagValue::Bool(true));
            },
            TouchEffectDef::SetFlag { flag, value } => {
                ctx.state.set_flag(flag, FlagValue::from(value));
            },
        }
    }
    ctx.state.object_state_mut(&target.id).touched = true;
    Ok(CommandOutcome::handled())
}

/// `search X`: reveals hidden items and objects, once.
pub fn search_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some((target, object)) = capable_object(ctx, command, |o| o.caps.searchable, "search") else {
        return Ok(CommandOutcome::handled());
    };

    if let Some(required) = &object.requires_item
        && !ctx.state.is_held(required)
    {
        match &object.search_fail_message {
            Some(text) => ctx.out.push(text.clone()),
            None => ctx
                .out
                .push(format!("You need something to examine the {} more closely.", object.name)),
        }
        return Ok(CommandOutcome::handled());
    }

    if ctx.state.object_state(&target.id).searched {
        match &object.searched_message {
            Some(text) => ctx.out.push(text.clone()),
            None => ctx.out.push("You find nothing new."),
        }
        return Ok(CommandOutcome::handled());
    }

    let current_room = ctx.state.current_room.clone();
    let mut found = Vec::new();
    for hidden_id in &object.hidden_items {
        if ctx.world.items.contains_key(hidden_id) {
            // eligible items go straight to inventory; overflow stays put
            if ctx.state.can_add_item(ctx.world, hidden_id).can_add {
                ctx.state.place_item(hidden_id, ItemLocation::Held);
            } else {
                ctx.state.place_item(hidden_id, ItemLocation::Room(current_room.clone()));
            }
            found.push(ctx.world.display_name(hidden_id).to_string());
        } else if ctx.world.objects.contains_key(hidden_id) {
            let revealed = ctx.state.object_state_mut(hidden_id);
            revealed.hidden = false;
            if revealed.room.is_none() {
                revealed.room = Some(current_room.clone());
            }
            found.push(ctx.world.display_name(hidden_id).to_string());
        }
    }

    if found.is_empty() {
        match &object.search_message {
            Some(text) => ctx.out.push(text.clone()),
            None => ctx.out.push("You find nothing of interest."),
        }
    } else {
        if let Some(text) = &object.search_message {
            ctx.out.push(text.clone());
        }
        ctx.out.push(format!("You find: {}.", found.join(", ")));
        ctx.out.emit(EngineEvent::InventoryChanged);
    }

    ctx.state.object_state_mut(&target.id).searched = true;
    if let Some(event) = object.search_event.clone() {
        trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, &event)?;
    }
    info!("searched '{}', found {found:?}", target.id);
    Ok(CommandOutcome::handled())
}

/// `read X`.
pub fn read_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = resolved_object(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    match target.kind {
        RefKind::Object => {
            let object = ctx.world.objects.get(&target.id);
            match object.and_then(|o| o.read_text.clone()) {
                Some(text) if object.is_some_and(|o| o.caps.readable) => ctx.out.push(text),
                _ => ctx
                    .out
                    .push(format!("There's nothing to read on the {}.", target.name)),
            }
        },
        RefKind::Item => match ctx.world.items.get(&target.id).and_then(|i| i.text.clone()) {
            Some(text) => ctx.out.push(text),
            None => ctx
                .out
                .push(format!("There's nothing written on the {}.", target.name)),
        },
        _ => ctx.out.push(format!("You can't read {}.", target.name)),
    }
    Ok(CommandOutcome::handled())
}

// ----- shared resolution helpers -----

fn resolved_object(ctx: &mut Ctx, command: &Command) -> Option<ResolvedRef> {
    match &command.resolved_direct {
        Some(resolved) if matches!(resolved.kind, RefKind::Object | RefKind::Item) => Some(resolved.clone()),
        Some(resolved) => {
            ctx.out.push(format!("You can't do that to {}.", resolved.name));
            None
        },
        None => {
            ctx.out.push("I'm not sure what you mean.");
            None
        },
    }
}

/// Resolve the direct object to a world object carrying a capability
/// bit, or refuse with the verb's error text.
fn capable_object(
    ctx: &mut Ctx,
    command: &Command,
    capability: impl Fn(&ObjectDef) -> bool,
    verb_word: &str,
) -> Option<(ResolvedRef, ObjectDef)> {
    let target = resolved_object(ctx, command)?;
    let Some(object) = ctx.world.objects.get(&target.id).cloned() else {
        ctx.out.push(format!("You can't {verb_word} the {}.", target.name));
        return None;
    };
    if !capability(&object) {
        ctx.out.push(format!("You can't {verb_word} the {}.", object.name));
        return None;
    }
    Some((target, object))
}

/// The open/close verbs accept container items as well as objects.
fn require_openable(ctx: &mut Ctx, command: &Command) -> Option<ResolvedRef> {
    let target = resolved_object(ctx, command)?;
    let openable = match target.kind {
        RefKind::Object => ctx
            .world
            .objects
            .get(&target.id)
            .is_some_and(|o| o.caps.openable || o.caps.container),
        RefKind::Item => ctx.world.items.get(&target.id).is_some_and(|i| i.container.is_some()),
        _ => false,
    };
    if openable {
        Some(target)
    } else {
        ctx.out.push(format!("The {} doesn't open.", target.name));
        None
    }
}
