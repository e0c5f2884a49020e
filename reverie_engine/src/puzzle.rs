//! Puzzle engine: single- and multi-step solutions, failure counting,
//! hint cooldowns, and reset semantics.

use anyhow::Result;
use log::info;
use reverie_data::PuzzleDef;

use crate::command::Command;
use crate::events::{Hooks, TurnOutput, dispatch_action, pattern_matches};
use crate::progression;
use crate::state::GameState;
use crate::world::World;

/// Attempts required before a hint is offered.
const HINT_ATTEMPT_THRESHOLD: u32 = 3;

/// Aggregate puzzle statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PuzzleStats {
    pub attempted: usize,
    pub completed: usize,
    pub completion_rate: f64,
    /// Started but not yet completed.
    pub active: usize,
}

/// Match the submitted command against every puzzle, in definition
/// order. Returns true when some puzzle consumed the command.
pub fn handle_command(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    command: &Command,
) -> Result<bool> {
    for puzzle_id in &world.puzzle_order {
        let Some(puzzle) = world.puzzles.get(puzzle_id) else { continue };
        if state.puzzles.get(puzzle_id).is_some_and(|p| p.solved) {
            continue;
        }
        if handle_one(world, hooks, state, out, puzzle, command)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn handle_one(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    puzzle: &PuzzleDef,
    command: &Command,
) -> Result<bool> {
    // single-solution puzzle
    if let Some(solution) = &puzzle.solution {
        if pattern_matches(solution, command) {
            solve(world, hooks, state, out, puzzle)?;
            return Ok(true);
        }
        if puzzle.trigger.as_ref().is_some_and(|t| pattern_matches(t, command)) {
            fail_attempt(state, out, puzzle);
            return Ok(true);
        }
        return Ok(false);
    }

    // multi-step puzzle: a matching action advances exactly one step
    if puzzle.steps.is_empty() {
        return Ok(false);
    }
    let current = state.puzzles.get(&puzzle.id).map_or(0, |p| p.current_step);
    if let Some(step) = puzzle.steps.get(current)
        && pattern_matches(&step.solution, command)
    {
        let progress = state.puzzles.entry(puzzle.id.clone()).or_default();
        progress.started = true;
        progress.current_step += 1;
        let finished = progress.current_step >= puzzle.steps.len();

        if let Some(text) = &step.message {
            out.push(text.clone());
        }
        for action in &step.reward {
            dispatch_action(world, hooks, state, out, action, 0)?;
        }
        if step.points > 0 {
            let points = i32::try_from(step.points).unwrap_or(0);
            progression::update_score(world, state, out, points, None);
        }
        if finished {
            solve(world, hooks, state, out, puzzle)?;
        }
        return Ok(true);
    }

    // skipping a step (or re-trying an earlier one) is rejected
    let matches_other_step = puzzle
        .steps
        .iter()
        .enumerate()
        .any(|(i, step)| i != current && pattern_matches(&step.solution, command));
    if matches_other_step || puzzle.trigger.as_ref().is_some_and(|t| pattern_matches(t, command)) {
        fail_attempt(state, out, puzzle);
        return Ok(true);
    }
    Ok(false)
}

fn solve(world: &World, hooks: &Hooks, state: &mut GameState, out: &mut TurnOutput, puzzle: &PuzzleDef) -> Result<()> {
    info!("puzzle solved: {}", puzzle.id);
    {
        let progress = state.puzzles.entry(puzzle.id.clone()).or_default();
        progress.started = true;
        progress.solved = true;
    }
    if let Some(text) = &puzzle.success_message {
        out.push(text.clone());
    }
    for action in &puzzle.reward {
        dispatch_action(world, hooks, state, out, action, 0)?;
    }
    if puzzle.points > 0 {
        let points = i32::try_from(puzzle.points).unwrap_or(0);
        progression::update_score(world, state, out, points, None);
    }
    Ok(())
}

fn fail_attempt(state: &mut GameState, out: &mut TurnOutput, puzzle: &PuzzleDef) {
    let now = state.clock_ms;
    let progress = state.puzzles.entry(puzzle.id.clone()).or_default();
    progress.started = true;
    progress.attempts += 1;
    info!("puzzle '{}' failed attempt #{}", puzzle.id, progress.attempts);

    if let Some(text) = &puzzle.failure_message {
        out.push(text.clone());
    }

    // surface the next hint after enough failures, rate-limited
    if progress.attempts >= HINT_ATTEMPT_THRESHOLD
        && progress.next_hint < puzzle.hints.len()
        && progress
            .last_hint_ms
            .is_none_or(|last| now.saturating_sub(last) >= puzzle.hint_cooldown_ms)
    {
        out.push(format!("Hint: {}", puzzle.hints[progress.next_hint]));
        progress.next_hint += 1;
        progress.last_hint_ms = Some(now);
    }
}

/// Reset a puzzle unless it is marked `noReset`.
pub fn reset_puzzle(
    world: &World,
    hooks: &Hooks,
    state: &mut GameState,
    out: &mut TurnOutput,
    puzzle_id: &str,
) -> Result<bool> {
    let Some(puzzle) = world.puzzles.get(puzzle_id) else {
        return Ok(false);
    };
    if puzzle.no_reset {
        info!("puzzle '{puzzle_id}' is noReset, refusing reset");
        return Ok(false);
    }
    for action in &puzzle.reset_actions {
        dispatch_action(world, hooks, state, out, action, 0)?;
    }
    state.puzzles.remove(puzzle_id);
    info!("puzzle '{puzzle_id}' reset");
    Ok(true)
}

/// Statistics over all puzzles in the world.
#[allow(clippy::cast_precision_loss)]
pub fn stats(world: &World, state: &GameState) -> PuzzleStats {
    let attempted = state.puzzles.values().filter(|p| p.started).count();
    let completed = state.puzzles.values().filter(|p| p.solved).count();
    let total = world.puzzles.len();
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    };
    PuzzleStats {
        attempted,
        completed,
        completion_rate,
        active: attempted - completed,
    }
}
