//! System handlers: save, load, help, score, wait, yell, restart, quit.

use anyhow::Result;
use log::{info, warn};

use crate::command::{ALL_VERBS, Command, Verb};
use crate::dispatch::{CommandOutcome, Ctx};
use crate::events::trigger_event_by_name;
use crate::npc;
use crate::save;

/// Slot used when `save`/`load` is given no argument.
pub const DEFAULT_SLOT: &str = "default";

fn slot_from(command: &Command) -> String {
    command
        .direct_object
        .clone()
        .unwrap_or_else(|| DEFAULT_SLOT.to_string())
        .replace(' ', "_")
}

/// `save [slot]`.
pub fn save_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let slot = slot_from(command);
    match save::write_slot(ctx.world, ctx.state, &slot) {
        Ok(path) => {
            info!("saved game to {}", path.display());
            ctx.out.push(format!("Game saved ({slot})."));
        },
        Err(err) => {
            warn!("save failed: {err}");
            ctx.out.push(format!("Save failed: {err}"));
        },
    }
    Ok(CommandOutcome::handled())
}

/// `load [slot]`. On any error the running state is left untouched.
pub fn load_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    let slot = slot_from(command);
    match save::read_slot(ctx.world, &slot) {
        Ok(loaded) => {
            *ctx.state = loaded;
            ctx.out.push(format!("Game restored ({slot})."));
            crate::dispatch::look::describe_room(ctx);
        },
        Err(err) => {
            warn!("load failed: {err}");
            ctx.out.push(format!("Load failed: {err}"));
        },
    }
    Ok(CommandOutcome::handled())
}

/// `help [verb]`.
pub fn help_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    if let Some(word) = &command.direct_object {
        match Verb::from_name(word) {
            Some(verb) => ctx.out.push(verb.help_line()),
            None => ctx.out.push(format!("No help for \"{word}\".")),
        }
        return Ok(CommandOutcome::handled());
    }
    ctx.out.push("Commands:");
    for verb in ALL_VERBS {
        ctx.out.push(format!("  {}", verb.help_line()));
    }
    ctx.out
        .push("Single letters work too: n/s/e/w/u/d to move, x to examine, i, l, z.");
    Ok(CommandOutcome::handled())
}

/// `score`.
pub fn score_handler(ctx: &mut Ctx) -> Result<CommandOutcome> {
    let max = ctx.world.max_score;
    if max > 0 {
        ctx.out.push(format!("Score: {} of {max}.", ctx.state.score));
    } else {
        ctx.out.push(format!("Score: {}.", ctx.state.score));
    }
    let unlocked = ctx.state.progression.unlocked.len();
    let total = ctx.world.achievements.len();
    if total > 0 {
        ctx.out.push(format!("Achievements: {unlocked} of {total}."));
    }
    ctx.out.push(format!("Moves: {}.", ctx.state.moves));
    Ok(CommandOutcome::handled())
}

/// `wait`: one beat passes.
pub fn wait_handler(ctx: &mut Ctx) -> Result<CommandOutcome> {
    ctx.out.push("Time passes.");
    trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, "wait")?;
    let mut outcome = CommandOutcome::handled();
    outcome.advance_tick = true;
    Ok(outcome)
}

/// `yell [word]`.
pub fn yell_handler(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    match &command.direct_object {
        Some(word) => ctx
            .out
            .push(format!("You yell \"{}!\" Your voice echoes.", word.to_uppercase())),
        None => ctx.out.push("You yell. Your voice echoes."),
    }
    trigger_event_by_name(ctx.world, ctx.hooks, ctx.state, ctx.out, "yell")?;

    // anyone in earshot may react
    let npcs: Vec<String> = ctx
        .state
        .npcs_in_room(&ctx.state.current_room)
        .into_iter()
        .map(str::to_string)
        .collect();
    for npc_id in npcs {
        if let Some((message, _)) =
            npc::get_npc_reaction(ctx.world, ctx.hooks, ctx.state, ctx.out, &npc_id, "yell")?
        {
            let name = ctx.world.npcs.get(&npc_id).map_or(npc_id.as_str(), |n| n.name.as_str());
            ctx.out.push(format!("{name}: \"{message}\""));
        }
    }
    Ok(CommandOutcome::handled())
}

/// `restart`: flagged for the host to confirm.
pub fn restart_handler(ctx: &mut Ctx) -> Result<CommandOutcome> {
    ctx.out.push("Restart requested.");
    let mut outcome = CommandOutcome::handled();
    outcome.should_restart = true;
    Ok(outcome)
}

/// `quit`: flagged for the host to confirm.
pub fn quit_handler(ctx: &mut Ctx) -> Result<CommandOutcome> {
    ctx.out.push(format!(
        "You leave with {} point{}.",
        ctx.state.score,
        if ctx.state.score == 1 { "" } else { "s" }
    ));
    let mut outcome = CommandOutcome::handled();
    outcome.should_quit = true;
    Ok(outcome)
}
