//! Command dispatch.
//!
//! One handler per canonical verb, grouped into submodules the way the
//! verbs group naturally: looking, inventory and items, objects and
//! mechanisms, NPCs, and system commands. Every handler follows the
//! same contract: resolve the target, check preconditions, apply state
//! changes only after every check passes, and always emit a response.

pub mod inventory;
pub mod look;
pub mod npc;
pub mod object;
pub mod system;

use anyhow::Result;
use thiserror::Error;

use crate::command::{Command, Verb};
use crate::events::{Hooks, TurnOutput};
use crate::state::GameState;
use crate::world::World;

/// Handler-level refusals. These always become player-visible text,
/// never hard failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("You aren't carrying the {0}.")]
    NotInInventory(String),
    #[error("You can't wear the {0} there.")]
    WrongSlot(String),
    #[error("The {0} is locked.")]
    Locked(String),
    #[error("{0}")]
    Blocked(String),
    #[error("{0}")]
    CapacityExceeded(String),
}

/// What one dispatched command decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// The handler produced a definitive response. When false (and no
    /// scripted event matched) the command falls through to the oracle.
    pub handled: bool,
    pub should_quit: bool,
    pub should_restart: bool,
    /// The command consumed a beat of time (wait).
    pub advance_tick: bool,
}

impl CommandOutcome {
    pub fn handled() -> CommandOutcome {
        CommandOutcome {
            handled: true,
            ..CommandOutcome::default()
        }
    }

    pub fn unhandled() -> CommandOutcome {
        CommandOutcome::default()
    }
}

/// Shared handler context: the immutable world, pluggable hooks, the
/// mutable overlay, and the turn's output buffer.
pub struct Ctx<'a> {
    pub world: &'a World,
    pub hooks: &'a Hooks,
    pub state: &'a mut GameState,
    pub out: &'a mut TurnOutput,
}

/// Route a structured command to its verb handler.
pub fn dispatch_command(ctx: &mut Ctx, command: &Command) -> Result<CommandOutcome> {
    match command.verb {
        Verb::Look => look::look_handler(ctx, command),
        Verb::Examine => look::examine_handler(ctx, command),
        Verb::Take => inventory::take_handler(ctx, command),
        Verb::Drop => inventory::drop_handler(ctx, command),
        Verb::Inventory => inventory::inventory_handler(ctx),
        Verb::Wear => inventory::wear_handler(ctx, command),
        Verb::Remove => inventory::remove_handler(ctx, command),
        Verb::Put => inventory::put_handler(ctx, command),
        Verb::Eat => inventory::ingest_handler(ctx, command, inventory::IngestKind::Eat),
        Verb::Drink => inventory::ingest_handler(ctx, command, inventory::IngestKind::Drink),
        Verb::Go => object::go_handler(ctx, command),
        Verb::Use => object::use_handler(ctx, command),
        Verb::Open => object::open_handler(ctx, command),
        Verb::Close => object::close_handler(ctx, command),
        Verb::Lock => object::lock_handler(ctx, command),
        Verb::Unlock => object::unlock_handler(ctx, command),
        Verb::Push => object::push_handler(ctx, command),
        Verb::Pull => object::pull_handler(ctx, command),
        Verb::Turn => object::turn_handler(ctx, command),
        Verb::Touch => object::touch_handler(ctx, command),
        Verb::Search => object::search_handler(ctx, command),
        Verb::Read => object::read_handler(ctx, command),
        Verb::Talk => npc::talk_handler(ctx, command),
        Verb::Ask => npc::ask_handler(ctx, command),
        Verb::Give => npc::give_handler(ctx, command),
        Verb::Trade => npc::trade_handler(ctx, command),
        Verb::Save => system::save_handler(ctx, command),
        Verb::Load => system::load_handler(ctx, command),
        Verb::Help => system::help_handler(ctx, command),
        Verb::Score => system::score_handler(ctx),
        Verb::Wait => system::wait_handler(ctx),
        Verb::Yell => system::yell_handler(ctx, command),
        Verb::Restart => system::restart_handler(ctx),
        Verb::Quit => system::quit_handler(ctx),
    }
}
