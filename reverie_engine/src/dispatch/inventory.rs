//! Inventory handlers: take, drop, inventory, wear, remove, put, and
//! the edible/drinkable verbs.

use anyhow::Result;
use log::info;

use crate::bus::EngineEvent;
use crate::command::{Command, RefKind, ResolvedRef};
use crate::dispatch::{CommandOutcome, Ctx, DispatchError};
use crate::state::ItemLocation;

/// `take X [from Y]`, plus `take all`.
pub fn take_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = &command.resolved_direct else {
        ctx.out.push("Take what?");
        return Ok(CommandOutcome::handled());
    };

    if target.kind == RefKind::Special {
        take_all(ctx);
        return Ok(CommandOutcome::handled());
    }

    match target.kind {
        RefKind::Item => take_item(ctx, &target.id),
        RefKind::Object => {
            let takeable = ctx
                .world
                .objects
                .get(&target.id)
                .is_some_and(|o| o.caps.takeable);
            if takeable {
                take_object(ctx, &target.id);
            } else {
                ctx.out.push("You can't take that.");
            }
        },
        RefKind::Npc => {
            ctx.out.push(format!("{} would object to that.", target.name));
        },
        _ => ctx.out.push("You can't take that."),
    }
    Ok(CommandOutcome::handled())
}

fn take_item(ctx: &mut Ctx, item_id: &str) {
    let name = ctx.world.display_name(item_id).to_string();
    match ctx.state.location_of(item_id) {
        ItemLocation::Held => {
            ctx.out.push(format!("You already have the {name}."));
            return;
        },
        ItemLocation::Worn(_) => {
            ctx.out.push(format!("You're wearing the {name}."));
            return;
        },
        ItemLocation::Room(room) if room == ctx.state.current_room => {},
        ItemLocation::Container(container) => {
            if !ctx.state.object_state(&container).open {
                let container_name = ctx.world.display_name(&container).to_string();
                ctx.out.push(format!("The {container_name} is closed."));
                return;
            }
        },
        _ => {
            ctx.out.push(format!("You don't see the {name} here."));
            return;
        },
    }

    let check = ctx.state.can_add_item(ctx.world, item_id);
    if !check.can_add {
        ctx.out
            .push(check.reason.unwrap_or_else(|| "You can't carry that.".to_string()));
        return;
    }
    ctx.state.place_item(item_id, ItemLocation::Held);
    ctx.out.push("Taken.");
    ctx.out.emit(EngineEvent::InventoryChanged);
    info!("took item '{item_id}'");
}

fn take_object(ctx: &mut Ctx, object_id: &str) {
    let in_room = ctx
        .state
        .object_state(object_id)
        .room
        .as_deref()
        == Some(ctx.state.current_room.as_str());
    if !in_room {
        ctx.out.push("You don't see that here.");
        return;
    }
    let check = ctx.state.can_add_item(ctx.world, object_id);
    if !check.can_add {
        ctx.out
            .push(check.reason.unwrap_or_else(|| "You can't carry that.".to_string()));
        return;
    }
    ctx.state.object_state_mut(object_id).room = None;
    ctx.state.held.push(object_id.to_string());
    ctx.state
        .item_locations
        .insert(object_id.to_string(), ItemLocation::Held);
    ctx.out.push("Taken.");
    ctx.out.emit(EngineEvent::InventoryChanged);
    info!("took object '{object_id}'");
}

fn take_all(ctx: &mut Ctx) {
    let items: Vec<String> = ctx.state.items_in_room(&ctx.state.current_room).to_vec();
    if items.is_empty() {
        ctx.out.push("There's nothing here to take.");
        return;
    }
    let mut taken = Vec::new();
    for item_id in items {
        let check = ctx.state.can_add_item(ctx.world, &item_id);
        if check.can_add {
            ctx.state.place_item(&item_id, ItemLocation::Held);
            taken.push(ctx.world.display_name(&item_id).to_string());
        } else if let Some(reason) = check.reason {
            ctx.out.push(reason);
        }
    }
    if taken.is_empty() {
        ctx.out.push("You couldn't pick anything up.");
    } else {
        ctx.out.push(format!("Taken: {}.", taken.join(", ")));
        ctx.out.emit(EngineEvent::InventoryChanged);
    }
}

/// `drop X`, plus `drop all`.
pub fn drop_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = &command.resolved_direct else {
        ctx.out.push("Drop what?");
        return Ok(CommandOutcome::handled());
    };

    if target.kind == RefKind::Special {
        let held: Vec<String> = ctx.state.held.clone();
        if held.is_empty() {
            ctx.out.push("You aren't carrying anything.");
            return Ok(CommandOutcome::handled());
        }
        let room = ctx.state.current_room.clone();
        let names: Vec<String> = held
            .iter()
            .map(|id| ctx.world.display_name(id).to_string())
            .collect();
        for item_id in held {
            drop_thing(ctx, &item_id, &room);
        }
        ctx.out.push(format!("Dropped: {}.", names.join(", ")));
        ctx.out.emit(EngineEvent::InventoryChanged);
        return Ok(CommandOutcome::handled());
    }

    let name = target.name.clone();
    match ctx.state.location_of(&target.id) {
        ItemLocation::Held => {
            let room = ctx.state.current_room.clone();
            drop_thing(ctx, &target.id, &room);
            ctx.out.push("Dropped.");
            ctx.out.emit(EngineEvent::InventoryChanged);
        },
        ItemLocation::Worn(_) => {
            ctx.out.push(format!("You'll have to remove the {name} first."));
        },
        _ => ctx.out.push(DispatchError::NotInInventory(name).to_string()),
    }
    Ok(CommandOutcome::handled())
}

fn drop_thing(ctx: &mut Ctx, id: &str, room: &str) {
    if ctx.world.objects.contains_key(id) {
        // a carried world object goes back to being room furniture
        ctx.state.held.retain(|held| held != id);
        ctx.state.item_locations.remove(id);
        ctx.state.object_state_mut(id).room = Some(room.to_string());
    } else {
        ctx.state.place_item(id, ItemLocation::Room(room.to_string()));
    }
}

/// `inventory`: held items and total weight.
pub fn inventory_handler(ctx: &mut Ctx) -> Result<CommandOutcome> {
    if ctx.state.held.is_empty() && ctx.state.worn.is_empty() {
        ctx.out.push("You aren't carrying anything.");
        return Ok(CommandOutcome::handled());
    }
    if !ctx.state.held.is_empty() {
        let names: Vec<String> = ctx
            .state
            .held
            .iter()
            .map(|id| ctx.world.display_name(id).to_string())
            .collect();
        ctx.out.push(format!("You are carrying: {}.", names.join(", ")));
    }
    if !ctx.state.worn.is_empty() {
        let worn: Vec<String> = ctx
            .state
            .worn
            .iter()
            .map(|(slot, id)| format!("{} ({slot})", ctx.world.display_name(id)))
            .collect();
        ctx.out.push(format!("Worn: {}.", worn.join(", ")));
    }
    let weight = ctx.state.carried_weight(ctx.world);
    ctx.out
        .push(format!("Total weight: {weight}/{}.", ctx.world.config.max_weight));
    Ok(CommandOutcome::handled())
}

/// `wear X`: slot-swap semantics.
pub fn wear_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = require_item(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let Some(item) = ctx.world.items.get(&target.id) else {
        ctx.out.push("You can't wear that.");
        return Ok(CommandOutcome::handled());
    };
    let Some(wearable) = &item.wearable else {
        ctx.out.push(format!("You can't wear the {}.", item.name));
        return Ok(CommandOutcome::handled());
    };
    if !ctx.state.is_held(&target.id) {
        ctx.out.push(format!("You aren't carrying the {}.", item.name));
        return Ok(CommandOutcome::handled());
    }

    // whatever occupies the slot returns to held inventory
    if let Some(previous) = ctx.state.worn.get(&wearable.slot).cloned() {
        ctx.state.place_item(&previous, ItemLocation::Held);
        ctx.out.push(format!(
            "You take off the {} first.",
            ctx.world.display_name(&previous)
        ));
    }
    ctx.state
        .place_item(&target.id, ItemLocation::Worn(wearable.slot.clone()));
    ctx.out.push(format!("You put on the {}.", item.name));
    ctx.out.emit(EngineEvent::InventoryChanged);
    Ok(CommandOutcome::handled())
}

/// `remove X` (worn), or `remove X from Y` as take-from-container.
pub fn remove_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    if command.preposition.as_deref() == Some("from") {
        return take_handler(ctx, command);
    }
    let Some(target) = require_item(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let name = target.name.clone();
    if ctx.state.is_worn(&target.id) {
        ctx.state.place_item(&target.id, ItemLocation::Held);
        ctx.out.push(format!("You take off the {name}."));
        ctx.out.emit(EngineEvent::InventoryChanged);
    } else {
        ctx.out.push(format!("You aren't wearing the {name}."));
    }
    Ok(CommandOutcome::handled())
}

/// `put X in Y`.
pub fn put_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = require_item(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let Some(container) = &command.resolved_indirect else {
        ctx.out.push("Put it where?");
        return Ok(CommandOutcome::handled());
    };

    if !ctx.state.is_held(&target.id) {
        ctx.out.push(format!("You aren't carrying the {}.", target.name));
        return Ok(CommandOutcome::handled());
    }
    if target.id == container.id {
        ctx.out.push("You can't put something inside itself.");
        return Ok(CommandOutcome::handled());
    }

    let is_container = match container.kind {
        RefKind::Object => ctx
            .world
            .objects
            .get(&container.id)
            .is_some_and(|o| o.caps.container),
        RefKind::Item => ctx.world.items.get(&container.id).is_some_and(|i| i.container.is_some()),
        _ => false,
    };
    if !is_container {
        ctx.out.push(format!("You can't put things in the {}.", container.name));
        return Ok(CommandOutcome::handled());
    }
    if !ctx.state.object_state(&container.id).open {
        ctx.out.push(format!("The {} is closed.", container.name));
        return Ok(CommandOutcome::handled());
    }
    if let Some(item_container) = ctx.world.items.get(&container.id).and_then(|i| i.container.as_ref())
        && ctx.state.container_contents(&container.id).len() >= item_container.capacity
    {
        ctx.out.push(format!("There's no room left in the {}.", container.name));
        return Ok(CommandOutcome::handled());
    }

    ctx.state
        .place_item(&target.id, ItemLocation::Container(container.id.clone()));
    ctx.out
        .push(format!("You put the {} in the {}.", target.name, container.name));
    ctx.out.emit(EngineEvent::InventoryChanged);
    Ok(CommandOutcome::handled())
}

/// Which way an item is being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    Eat,
    Drink,
}

/// `eat X` / `drink X`: held consumables restore health and vanish.
pub fn ingest_handler(ctx: &mut Ctx, command: &Command, kind: IngestKind) -> Result<CommandOutcome> {
    let Some(target) = require_item(ctx, command) else {
        return Ok(CommandOutcome::handled());
    };
    let Some(item) = ctx.world.items.get(&target.id) else {
        ctx.out.push("That isn't something you can consume.");
        return Ok(CommandOutcome::handled());
    };
    let consumable = match kind {
        IngestKind::Eat => &item.edible,
        IngestKind::Drink => &item.drinkable,
    };
    let Some(consumable) = consumable else {
        let refusal = match kind {
            IngestKind::Eat => format!("You can't eat the {}.", item.name),
            IngestKind::Drink => format!("You can't drink the {}.", item.name),
        };
        ctx.out.push(refusal);
        return Ok(CommandOutcome::handled());
    };
    if !ctx.state.is_held(&target.id) {
        ctx.out.push(format!("You aren't carrying the {}.", item.name));
        return Ok(CommandOutcome::handled());
    }

    ctx.state.place_item(&target.id, ItemLocation::Nowhere);
    let max = ctx.world.player.max_health;
    ctx.state.health = (ctx.state.health + consumable.health_restore).min(max);
    match &consumable.message {
        Some(text) => ctx.out.push(text.clone()),
        None => {
            let did = match kind {
                IngestKind::Eat => "eat",
                IngestKind::Drink => "drink",
            };
            ctx.out.push(format!("You {did} the {}.", item.name));
        },
    }
    ctx.out.emit(EngineEvent::InventoryChanged);
    info!("consumed '{}' (+{} health)", target.id, consumable.health_restore);
    Ok(CommandOutcome::handled())
}

/// Common guard: the direct object must be an item-ish resolved ref.
fn require_item(ctx: &mut Ctx, command: &Command) -> Option<ResolvedRef> {
    match &command.resolved_direct {
        Some(resolved) if matches!(resolved.kind, RefKind::Item | RefKind::Object) => Some(resolved.clone()),
        Some(resolved) => {
            ctx.out.push(format!("You can't do that with {}.", resolved.name));
            None
        },
        None => {
            ctx.out.push("I'm not sure what you mean.");
            None
        },
    }
}
