//! Movement: exit validation, room-to-room travel, pathfinding, and the
//! in-room 320x200 walk.
//!
//! Room travel goes through [`can_move`], which reports exactly why an
//! exit is refused. Locked exits stay locked until an explicit `unlock`
//! consumes or uses the key. The pathfinder is a BFS over enabled exits;
//! `auto_navigate` replays the path and stops at the first blocked step.

use std::collections::{HashMap, VecDeque};

use log::info;
use reverie_data::ExitDef;

use crate::bus::EngineEvent;
use crate::condition::eval_condition;
use crate::events::TurnOutput;
use crate::state::{GameState, PatternStep, WalkState};
use crate::world::World;

/// Screen-space walk bounds, with the classic margins: the horizon line
/// sits at y = 36 and the control strip below y = 194 is out of play.
pub const WALK_MIN_X: f64 = 10.0;
pub const WALK_MAX_X: f64 = 310.0;
pub const WALK_MIN_Y: f64 = 36.0;
pub const WALK_MAX_Y: f64 = 194.0;

/// Default walk speed in pixels per fixed tick.
pub const WALK_SPEED: f64 = 3.0;

/// Why a move is allowed or refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveCheck {
    Allowed { to: String },
    NoExit,
    Disabled,
    Locked { message: String },
    Blocked { message: String },
    EntryBlocked { message: String },
}

impl MoveCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, MoveCheck::Allowed { .. })
    }

    /// The refusal text shown to the player.
    pub fn message(&self) -> String {
        match self {
            MoveCheck::Allowed { .. } => String::new(),
            MoveCheck::NoExit | MoveCheck::Disabled => "You can't go that way.".to_string(),
            MoveCheck::Locked { message } | MoveCheck::Blocked { message } | MoveCheck::EntryBlocked { message } => {
                message.clone()
            },
        }
    }
}

fn find_exit<'w>(world: &'w World, room_id: &str, direction: &str) -> Option<&'w ExitDef> {
    world
        .rooms
        .get(room_id)?
        .exits
        .iter()
        .find(|e| e.direction == direction)
}

/// Validate a move from `room_id` toward `direction`.
pub fn can_move(world: &World, state: &GameState, room_id: &str, direction: &str) -> MoveCheck {
    let Some(exit) = find_exit(world, room_id, direction) else {
        return MoveCheck::NoExit;
    };
    let overrides = state.exit_override(room_id, direction);
    let enabled = overrides.enabled.unwrap_or(exit.enabled);
    if !enabled {
        return MoveCheck::Disabled;
    }
    if exit.locked_by.is_some() && !overrides.unlocked {
        let message = exit
            .blocked_message
            .clone()
            .unwrap_or_else(|| format!("The way {direction} is locked."));
        return MoveCheck::Locked { message };
    }
    if let Some(condition) = &exit.condition
        && !eval_condition(Some(condition), state)
    {
        let message = exit
            .blocked_message
            .clone()
            .unwrap_or_else(|| "Something prevents you from going that way.".to_string());
        return MoveCheck::Blocked { message };
    }
    if let Some(target) = world.rooms.get(&exit.to)
        && let Some(entry) = &target.entry_condition
        && !eval_condition(Some(entry), state)
    {
        let message = target
            .entry_blocked_message
            .clone()
            .unwrap_or_else(|| "You can't enter.".to_string());
        return MoveCheck::EntryBlocked { message };
    }
    MoveCheck::Allowed { to: exit.to.clone() }
}

/// Move the player through an exit that has already been validated.
/// Emits exit/enter events, marks the room visited, and positions the
/// player view at the entrance edge for the travel direction.
pub fn enter_room(world: &World, state: &mut GameState, out: &mut TurnOutput, to: &str, direction: Option<&str>) {
    let from = state.current_room.clone();
    out.emit(EngineEvent::ExitRoom { room: from.clone() });

    state.previous_room = Some(from.clone());
    state.current_room = to.to_string();
    state.visited_rooms.insert(to.to_string());
    state.walk = None;

    let (x, y) = entrance_position(direction);
    state.player_x = x;
    state.player_y = y;

    if let Some(room) = world.rooms.get(to)
        && let Some(theme) = &room.music
    {
        out.music.push(theme.clone());
    }

    out.emit(EngineEvent::RoomChanged {
        from: Some(from),
        to: to.to_string(),
    });
    out.emit(EngineEvent::EnterRoom { room: to.to_string() });
    info!("player moved to room '{to}'");
}

/// Instant relocation (scripted `ChangeRoom`); no direction semantics.
pub fn relocate_player(world: &World, state: &mut GameState, out: &mut TurnOutput, to: &str) {
    if !world.rooms.contains_key(to) {
        log::warn!("ChangeRoom to unknown room '{to}' ignored");
        return;
    }
    enter_room(world, state, out, to, None);
}

/// Where the player appears after entering via `direction`.
fn entrance_position(direction: Option<&str>) -> (f64, f64) {
    match direction {
        Some("north") => (160.0, WALK_MAX_Y - 4.0),
        Some("south") => (160.0, WALK_MIN_Y + 4.0),
        Some("east") => (WALK_MIN_X + 4.0, 120.0),
        Some("west") => (WALK_MAX_X - 4.0, 120.0),
        Some("up") => (160.0, WALK_MAX_Y - 4.0),
        Some("down") => (160.0, WALK_MIN_Y + 4.0),
        _ => (160.0, 150.0),
    }
}

/// Breadth-first search over enabled exits. Returns the room path from
/// `from` to `to` inclusive, or None when unreachable.
pub fn find_path(world: &World, state: &GameState, from: &str, to: &str) -> Option<Vec<String>> {
    if from == to {
        return Some(vec![from.to_string()]);
    }
    let mut queue = VecDeque::from([from.to_string()]);
    let mut came_from: HashMap<String, String> = HashMap::new();
    came_from.insert(from.to_string(), String::new());

    while let Some(current) = queue.pop_front() {
        let Some(room) = world.rooms.get(&current) else { continue };
        for exit in &room.exits {
            let overrides = state.exit_override(&current, &exit.direction);
            if !overrides.enabled.unwrap_or(exit.enabled) {
                continue;
            }
            if came_from.contains_key(&exit.to) {
                continue;
            }
            came_from.insert(exit.to.clone(), current.clone());
            if exit.to == to {
                let mut path = vec![exit.to.clone()];
                let mut cursor = current;
                while !cursor.is_empty() {
                    path.push(cursor.clone());
                    cursor = came_from.get(&cursor).cloned().unwrap_or_default();
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(exit.to.clone());
        }
    }
    None
}

/// Step through the BFS path one room at a time, stopping at the first
/// blocked step. Returns the rooms actually entered.
pub fn auto_navigate(world: &World, state: &mut GameState, out: &mut TurnOutput, target: &str) -> Vec<String> {
    let Some(path) = find_path(world, state, &state.current_room, target) else {
        return Vec::new();
    };
    let mut entered = Vec::new();
    for window in path.windows(2) {
        let (here, next) = (&window[0], &window[1]);
        let Some(exit) = world
            .rooms
            .get(here)
            .and_then(|r| r.exits.iter().find(|e| &e.to == next))
        else {
            break;
        };
        let direction = exit.direction.clone();
        match can_move(world, state, here, &direction) {
            MoveCheck::Allowed { to } => {
                enter_room(world, state, out, &to, Some(&direction));
                entered.push(to);
            },
            check => {
                out.push(check.message());
                break;
            },
        }
    }
    entered
}

// ----- in-room walk -----

/// Can the player stand at (x, y)? Checks screen bounds, the room's
/// collision grid, and blocking objects' bounding boxes.
pub fn can_walk_to(world: &World, state: &GameState, x: f64, y: f64) -> bool {
    if !(WALK_MIN_X..=WALK_MAX_X).contains(&x) || !(WALK_MIN_Y..=WALK_MAX_Y).contains(&y) {
        return false;
    }
    let Some(room) = world.rooms.get(&state.current_room) else {
        return false;
    };
    if let Some(grid) = &room.collision {
        let col = (x / f64::from(grid.cell_w)) as usize;
        let row = (y / f64::from(grid.cell_h)) as usize;
        if let Some(line) = grid.rows.get(row)
            && line.as_bytes().get(col) == Some(&b'#')
        {
            return false;
        }
    }
    for object_id in state.objects_in_room(world, &state.current_room) {
        if let Some(object) = world.objects.get(object_id)
            && object.caps.blocking
            && let Some(bounds) = &object.bounds
        {
            let bx = f64::from(bounds.x);
            let by = f64::from(bounds.y);
            let bw = f64::from(bounds.w);
            let bh = f64::from(bounds.h);
            if x >= bx && x < bx + bw && y >= by && y < by + bh {
                return false;
            }
        }
    }
    true
}

/// Begin a linear walk toward (x, y). Replaces any walk in progress.
pub fn move_player_to(state: &mut GameState, x: f64, y: f64) {
    state.walk = Some(WalkState {
        target_x: x.clamp(WALK_MIN_X, WALK_MAX_X),
        target_y: y.clamp(WALK_MIN_Y, WALK_MAX_Y),
        speed: WALK_SPEED,
    });
}

/// Advance the walk one fixed tick. Returns true while still walking.
pub fn step_walk(world: &World, state: &mut GameState) -> bool {
    let Some(walk) = state.walk.clone() else { return false };
    let dx = walk.target_x - state.player_x;
    let dy = walk.target_y - state.player_y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance <= walk.speed {
        if can_walk_to(world, state, walk.target_x, walk.target_y) {
            state.player_x = walk.target_x;
            state.player_y = walk.target_y;
        }
        state.walk = None;
        return false;
    }

    let next_x = state.player_x + dx / distance * walk.speed;
    let next_y = state.player_y + dy / distance * walk.speed;
    if can_walk_to(world, state, next_x, next_y) {
        state.player_x = next_x;
        state.player_y = next_y;
        true
    } else {
        // obstacle: stop and go idle
        state.walk = None;
        false
    }
}

/// Animation loop name for the current walk vector.
pub fn walk_loop(state: &GameState) -> &'static str {
    let Some(walk) = &state.walk else { return "idle" };
    let dx = walk.target_x - state.player_x;
    let dy = walk.target_y - state.player_y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 { "walk_east" } else { "walk_west" }
    } else if dy >= 0.0 {
        "walk_south"
    } else {
        "walk_north"
    }
}

// ----- scripted NPC movement patterns -----

/// Install a movement pattern for an NPC.
pub fn set_npc_movement(state: &mut GameState, npc_id: &str, steps: Vec<PatternStep>) {
    state.npc_patterns.insert(
        npc_id.to_string(),
        crate::state::NpcPattern {
            steps,
            index: 0,
            x: 160.0,
            y: 150.0,
            wait_until_ms: None,
            active: true,
        },
    );
}

/// Advance all NPC movement patterns by one fixed tick.
pub fn step_npc_patterns(state: &mut GameState) {
    let now = state.clock_ms;
    for pattern in state.npc_patterns.values_mut() {
        if !pattern.active || pattern.steps.is_empty() {
            continue;
        }
        if let Some(until) = pattern.wait_until_ms {
            if now < until {
                continue;
            }
            pattern.wait_until_ms = None;
            pattern.index = (pattern.index + 1) % pattern.steps.len();
            continue;
        }
        match pattern.steps[pattern.index].clone() {
            PatternStep::Move { x, y } => {
                let dx = x - pattern.x;
                let dy = y - pattern.y;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance <= WALK_SPEED {
                    pattern.x = x;
                    pattern.y = y;
                    pattern.index = (pattern.index + 1) % pattern.steps.len();
                } else {
                    pattern.x += dx / distance * WALK_SPEED;
                    pattern.y += dy / distance * WALK_SPEED;
                }
            },
            PatternStep::Wait { duration_ms } => {
                if pattern.wait_until_ms.is_none() {
                    pattern.wait_until_ms = Some(now + duration_ms);
                }
            },
            PatternStep::Loop => {
                pattern.index = 0;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FlagValue;
    use reverie_data::{
        BoundsDef, CollisionGridDef, ExitDef, GameDef, ItemDef, ObjectCaps, ObjectDef, PlayerDef,
        RoomDef, WorldDef,
    };

    fn exit(direction: &str, to: &str) -> ExitDef {
        ExitDef {
            direction: direction.into(),
            to: to.into(),
            enabled: true,
            locked_by: None,
            condition: None,
            blocked_message: None,
        }
    }

    fn world() -> World {
        let def = WorldDef {
            game: GameDef {
                title: "T".into(),
                player: PlayerDef {
                    name: "Hero".into(),
                    start_room: "a".into(),
                    ..PlayerDef::default()
                },
                ..GameDef::default()
            },
            rooms: vec![
                RoomDef {
                    id: "a".into(),
                    name: "A".into(),
                    description: "Room A.".into(),
                    exits: vec![exit("north", "b"), {
                        let mut locked = exit("east", "d");
                        locked.locked_by = Some("iron_key".into());
                        locked
                    }],
                    objects: vec!["boulder".into()],
                    collision: Some(CollisionGridDef {
                        rows: vec!["........................................".into(); 25],
                        cell_w: 8,
                        cell_h: 8,
                    }),
                    ..RoomDef::default()
                },
                RoomDef {
                    id: "b".into(),
                    name: "B".into(),
                    description: "Room B.".into(),
                    exits: vec![exit("south", "a"), exit("north", "c")],
                    ..RoomDef::default()
                },
                RoomDef {
                    id: "c".into(),
                    name: "C".into(),
                    description: "Room C.".into(),
                    entry_condition: Some("rope_bridge_fixed".into()),
                    entry_blocked_message: Some("The bridge is out.".into()),
                    ..RoomDef::default()
                },
                RoomDef {
                    id: "d".into(),
                    name: "D".into(),
                    description: "Room D.".into(),
                    ..RoomDef::default()
                },
            ],
            objects: vec![ObjectDef {
                id: "boulder".into(),
                name: "boulder".into(),
                description: "Huge.".into(),
                caps: ObjectCaps {
                    blocking: true,
                    ..ObjectCaps::default()
                },
                bounds: Some(BoundsDef {
                    x: 100,
                    y: 100,
                    w: 40,
                    h: 30,
                }),
                ..ObjectDef::default()
            }],
            items: vec![ItemDef {
                id: "iron_key".into(),
                name: "iron key".into(),
                description: "Heavy.".into(),
                ..ItemDef::default()
            }],
            ..WorldDef::default()
        };
        World::from_def(def).unwrap()
    }

    #[test]
    fn can_move_reports_each_refusal() {
        let world = world();
        let state = GameState::new(&world);
        assert_eq!(
            can_move(&world, &state, "a", "north"),
            MoveCheck::Allowed { to: "b".into() }
        );
        assert_eq!(can_move(&world, &state, "a", "west"), MoveCheck::NoExit);
        assert!(matches!(can_move(&world, &state, "a", "east"), MoveCheck::Locked { .. }));
        assert_eq!(
            can_move(&world, &state, "b", "north"),
            MoveCheck::EntryBlocked {
                message: "The bridge is out.".into()
            }
        );
    }

    #[test]
    fn entry_condition_toggles_mid_traversal() {
        let world = world();
        let mut state = GameState::new(&world);
        assert!(!can_move(&world, &state, "b", "north").is_allowed());
        state.set_flag("rope_bridge_fixed", FlagValue::Bool(true));
        assert!(can_move(&world, &state, "b", "north").is_allowed());
    }

    #[test]
    fn unlocked_override_opens_locked_exit() {
        let world = world();
        let mut state = GameState::new(&world);
        state.exit_override_mut("a", "east").unlocked = true;
        assert!(can_move(&world, &state, "a", "east").is_allowed());
    }

    #[test]
    fn disabled_override_closes_open_exit() {
        let world = world();
        let mut state = GameState::new(&world);
        state.exit_override_mut("a", "north").enabled = Some(false);
        assert_eq!(can_move(&world, &state, "a", "north"), MoveCheck::Disabled);
    }

    #[test]
    fn enter_room_marks_visited_and_emits_events() {
        let world = world();
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        enter_room(&world, &mut state, &mut out, "b", Some("north"));
        assert_eq!(state.current_room, "b");
        assert!(state.visited_rooms.contains("b"));
        assert!(out.events.iter().any(|e| matches!(e, EngineEvent::ExitRoom { .. })));
        assert!(out.events.iter().any(|e| matches!(e, EngineEvent::EnterRoom { .. })));
        // entered heading north: appears near the bottom edge
        assert!(state.player_y > 150.0);
    }

    #[test]
    fn bfs_finds_shortest_path() {
        let world = world();
        let state = GameState::new(&world);
        let path = find_path(&world, &state, "a", "c").unwrap();
        assert_eq!(path, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(find_path(&world, &state, "a", "a").unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn bfs_ignores_disabled_exits() {
        let world = world();
        let mut state = GameState::new(&world);
        state.exit_override_mut("a", "north").enabled = Some(false);
        assert!(find_path(&world, &state, "a", "c").is_none());
    }

    #[test]
    fn auto_navigate_stops_one_room_short_of_a_block() {
        let world = world();
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        let entered = auto_navigate(&world, &mut state, &mut out, "c");
        // reaches b, then c's entry condition stops it
        assert_eq!(entered, vec!["b".to_string()]);
        assert_eq!(state.current_room, "b");
        assert!(out.lines.contains(&"The bridge is out.".to_string()));
    }

    #[test]
    fn walk_bounds_and_blocking_objects() {
        let world = world();
        let state = GameState::new(&world);
        assert!(can_walk_to(&world, &state, 160.0, 120.0));
        assert!(!can_walk_to(&world, &state, 5.0, 120.0)); // outside left margin
        assert!(!can_walk_to(&world, &state, 160.0, 20.0)); // above horizon
        assert!(!can_walk_to(&world, &state, 110.0, 110.0)); // inside boulder
    }

    #[test]
    fn collision_grid_blocks_cells() {
        let world = world();
        let mut state = GameState::new(&world);
        // carve a wall across row 15 (y 120..128)
        let mut rows = vec!["........................................".to_string(); 25];
        rows[15] = "########################################".into();
        let mut patched = world.clone();
        patched.rooms.get_mut("a").unwrap().collision = Some(CollisionGridDef {
            rows,
            cell_w: 8,
            cell_h: 8,
        });
        state.current_room = "a".into();
        assert!(!can_walk_to(&patched, &state, 160.0, 124.0));
        assert!(can_walk_to(&patched, &state, 160.0, 140.0));
    }

    #[test]
    fn walk_steps_toward_target_and_arrives() {
        let world = world();
        let mut state = GameState::new(&world);
        state.player_x = 160.0;
        state.player_y = 150.0;
        move_player_to(&mut state, 190.0, 150.0);
        assert_eq!(walk_loop(&state), "walk_east");
        let mut guard = 0;
        while step_walk(&world, &mut state) {
            guard += 1;
            assert!(guard < 100, "walk never finished");
        }
        assert!((state.player_x - 190.0).abs() < f64::EPSILON);
        assert!(state.walk.is_none());
        assert_eq!(walk_loop(&state), "idle");
    }

    #[test]
    fn walk_stops_at_obstacle() {
        let world = world();
        let mut state = GameState::new(&world);
        state.player_x = 90.0;
        state.player_y = 110.0;
        move_player_to(&mut state, 130.0, 110.0); // path crosses the boulder
        while step_walk(&world, &mut state) {}
        assert!(state.player_x < 100.0);
        assert!(state.walk.is_none());
    }

    #[test]
    fn npc_pattern_moves_waits_and_loops() {
        let world = world();
        let mut state = GameState::new(&world);
        set_npc_movement(
            &mut state,
            "guard",
            vec![
                PatternStep::Move { x: 166.0, y: 150.0 },
                PatternStep::Wait { duration_ms: 32 },
                PatternStep::Loop,
            ],
        );
        // two ticks cover the 6px move
        step_npc_patterns(&mut state);
        step_npc_patterns(&mut state);
        let pattern = state.npc_patterns.get("guard").unwrap();
        assert!((pattern.x - 166.0).abs() < f64::EPSILON);
        assert_eq!(pattern.index, 1);

        // waiting: two ticks of 16ms pass before the wait expires
        state.clock_ms = 16;
        step_npc_patterns(&mut state);
        assert!(state.npc_patterns.get("guard").unwrap().wait_until_ms.is_some());
        state.clock_ms = 64;
        step_npc_patterns(&mut state);
        let pattern = state.npc_patterns.get("guard").unwrap();
        assert!(pattern.wait_until_ms.is_none());
        assert_eq!(pattern.index, 2);

        // loop step resets to the beginning
        step_npc_patterns(&mut state);
        assert_eq!(state.npc_patterns.get("guard").unwrap().index, 0);
    }
}
