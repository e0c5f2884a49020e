//! NPC-facing handlers: talk, ask, give.

use anyhow::Result;

use crate::command::{Command, RefKind};
use crate::dispatch::{CommandOutcome, Ctx};
use crate::npc;
use crate::state::ItemLocation;

/// `talk to X`: opens the dialogue at its root node.
pub fn talk_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = &command.resolved_direct else {
        ctx.out.push("Talk to whom?");
        return Ok(CommandOutcome::handled());
    };
    if target.kind != RefKind::Npc {
        ctx.out.push(format!("The {} has nothing to say.", target.name));
        return Ok(CommandOutcome::handled());
    }
    npc::start_conversation(ctx.world, ctx.state, ctx.out, &target.id);
    Ok(CommandOutcome::handled())
}

/// `ask X about TOPIC`.
pub fn ask_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(target) = &command.resolved_direct else {
        ctx.out.push("Ask whom?");
        return Ok(CommandOutcome::handled());
    };
    if target.kind != RefKind::Npc {
        ctx.out.push(format!("The {} isn't likely to answer.", target.name));
        return Ok(CommandOutcome::handled());
    }
    let Some(topic) = command.indirect_object.clone() else {
        ctx.out.push("Ask about what?");
        return Ok(CommandOutcome::handled());
    };
    let answered = npc::ask_about(ctx.world, ctx.hooks, ctx.state, ctx.out, &target.id, &topic)?;
    if !answered {
        let name = ctx.world.npcs.get(&target.id).map_or(target.name.as_str(), |n| n.name.as_str());
        ctx.out.push(format!("{name} has nothing to say about that."));
    }
    Ok(CommandOutcome::handled())
}

/// `trade X for Y`: barter with whichever trader here holds Y.
pub fn trade_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(offer) = &command.resolved_direct else {
        ctx.out.push("Trade what?");
        return Ok(CommandOutcome::handled());
    };
    let Some(want) = command.indirect_object.clone() else {
        ctx.out.push("Trade it for what?");
        return Ok(CommandOutcome::handled());
    };
    if offer.kind != RefKind::Item {
        ctx.out.push(format!("You can't trade the {}.", offer.name));
        return Ok(CommandOutcome::handled());
    }

    // find a trader in the room holding something by that name
    let want_lower = want.to_lowercase();
    let mut matched: Option<(String, String)> = None;
    for npc_id in ctx.state.npcs_in_room(&ctx.state.current_room) {
        let Some(inventory) = ctx.state.npc_inventories.get(npc_id) else {
            continue;
        };
        for item_id in inventory {
            let name = ctx.world.display_name(item_id).to_lowercase();
            if name == want_lower || name.contains(&want_lower) {
                matched = Some((npc_id.to_string(), item_id.clone()));
                break;
            }
        }
        if matched.is_some() {
            break;
        }
    }
    let Some((npc_id, want_id)) = matched else {
        ctx.out.push(format!("No one here has any {want}."));
        return Ok(CommandOutcome::handled());
    };

    let give = vec![offer.id.clone()];
    let receive = vec![want_id];
    match npc::execute_trade(ctx.world, ctx.state, ctx.out, &npc_id, &give, &receive) {
        Ok(()) => {},
        Err(refusal) => ctx.out.push(refusal.message()),
    }
    Ok(CommandOutcome::handled())
}

/// `give X to Y`.
pub fn give_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let Some(item) = &command.resolved_direct else {
        ctx.out.push("Give what?");
        return Ok(CommandOutcome::handled());
    };
    let Some(receiver) = &command.resolved_indirect else {
        ctx.out.push("Give it to whom?");
        return Ok(CommandOutcome::handled());
    };
    if receiver.kind != RefKind::Npc {
        ctx.out.push(format!("The {} doesn't want it.", receiver.name));
        return Ok(CommandOutcome::handled());
    }
    if item.kind != RefKind::Item || !matches!(ctx.state.location_of(&item.id), ItemLocation::Held) {
        ctx.out.push(format!("You aren't carrying the {}.", item.name));
        return Ok(CommandOutcome::handled());
    }
    if ctx.state.npc_rooms.get(&receiver.id) != Some(&ctx.state.current_room) {
        ctx.out.push("They're not here.");
        return Ok(CommandOutcome::handled());
    }
    npc::give_item(ctx.world, ctx.hooks, ctx.state, ctx.out, &item.id, &receiver.id)?;
    Ok(CommandOutcome::handled())
}
