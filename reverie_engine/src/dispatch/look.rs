//! Look and examine handlers.

use anyhow::Result;

use crate::command::{Command, RefKind};
use crate::dispatch::{CommandOutcome, Ctx};

/// `look`: the room; `look at X`: the thing's description.
pub fn look_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    match &command.resolved_direct {
        None => {
            describe_room(ctx);
            Ok(CommandOutcome::handled())
        },
        Some(_) => describe_target(ctx, command, false),
    }
}

/// `examine X`: as look-at, plus any hidden details.
pub fn examine_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    describe_target(ctx, command, true)
}

/// Full room view: name, description, visible contents, exits.
pub fn describe_room(ctx: &mut Ctx) {
    let Some(room) = ctx.world.rooms.get(&ctx.state.current_room) else {
        ctx.out.push("You are nowhere at all. That can't be right.");
        return;
    };
    ctx.out.push(format!("--- {} ---", room.name));
    ctx.out.push(room.description.clone());

    let object_names: Vec<String> = ctx
        .state
        .objects_in_room(ctx.world, &room.id)
        .into_iter()
        .filter_map(|id| ctx.world.objects.get(id))
        .map(|o| o.name.clone())
        .collect();
    if !object_names.is_empty() {
        ctx.out.push(format!("You see: {}.", object_names.join(", ")));
    }

    let item_names: Vec<String> = ctx
        .state
        .items_in_room(&room.id)
        .iter()
        .filter_map(|id| ctx.world.items.get(id))
        .map(|i| i.name.clone())
        .collect();
    if !item_names.is_empty() {
        ctx.out.push(format!("Lying here: {}.", item_names.join(", ")));
    }

    let npc_names: Vec<String> = ctx
        .state
        .npcs_in_room(&room.id)
        .into_iter()
        .filter_map(|id| ctx.world.npcs.get(id))
        .map(|n| n.name.clone())
        .collect();
    if !npc_names.is_empty() {
        ctx.out.push(format!("Also here: {}.", npc_names.join(", ")));
    }

    let mut exits: Vec<&str> = Vec::new();
    for exit in &room.exits {
        let overrides = ctx.state.exit_override(&room.id, &exit.direction);
        if overrides.enabled.unwrap_or(exit.enabled) {
            exits.push(&exit.direction);
        }
    }
    if exits.is_empty() {
        ctx.out.push("There are no obvious exits.");
    } else {
        ctx.out.push(format!("Exits: {}.", exits.join(", ")));
    }
}

fn describe_target(ctx: &mut Ctx, command: &Command, examine: bool) -> Result<CommandOutcome> {
    let Some(target) = &command.resolved_direct else {
        describe_room(ctx);
        return Ok(CommandOutcome::handled());
    };
    match target.kind {
        RefKind::Item => {
            if let Some(item) = ctx.world.items.get(&target.id) {
                ctx.out.push(item.description.clone());
                if examine
                    && item.container.is_some()
                    && ctx.state.object_state(&target.id).open
                {
                    let contents: Vec<String> = ctx
                        .state
                        .container_contents(&target.id)
                        .iter()
                        .map(|id| ctx.world.display_name(id).to_string())
                        .collect();
                    if contents.is_empty() {
                        ctx.out.push(format!("The {} is empty.", item.name));
                    } else {
                        ctx.out
                            .push(format!("The {} contains: {}.", item.name, contents.join(", ")));
                    }
                }
            } else {
                ctx.out.push("You don't see that here.");
            }
        },
        RefKind::Object => {
            if let Some(object) = ctx.world.objects.get(&target.id) {
                ctx.out.push(object.description.clone());
                if examine && let Some(details) = &object.hidden_details {
                    ctx.out.push(details.clone());
                }
                if object.caps.container {
                    let object_state = ctx.state.object_state(&target.id);
                    if object_state.open {
                        let contents: Vec<String> = ctx
                            .state
                            .container_contents(&target.id)
                            .iter()
                            .map(|id| ctx.world.display_name(id).to_string())
                            .collect();
                        if contents.is_empty() {
                            ctx.out.push(format!("The {} is empty.", object.name));
                        } else {
                            ctx.out
                                .push(format!("The {} contains: {}.", object.name, contents.join(", ")));
                        }
                    } else {
                        ctx.out.push(format!("The {} is closed.", object.name));
                    }
                }
            } else {
                ctx.out.push("You don't see that here.");
            }
        },
        RefKind::Npc => {
            if let Some(npc) = ctx.world.npcs.get(&target.id) {
                ctx.out.push(npc.description.clone());
            } else {
                ctx.out.push("You don't see that here.");
            }
        },
        RefKind::Direction => {
            ctx.out.push(format!("You peer {}.", target.name));
        },
        RefKind::Special | RefKind::Str | RefKind::Unknown => {
            ctx.out.push("You don't see that here.");
        },
    }
    Ok(CommandOutcome::handled())
}
