//! Progression: score, achievements, ending selection, path alignment.

use log::info;
use reverie_data::{AchievementKindDef, EndingDef};

use crate::bus::EngineEvent;
use crate::condition::eval_condition;
use crate::events::TurnOutput;
use crate::state::{FlagValue, GameState};
use crate::world::World;

/// Apply a score delta, clamped to `[0, maxScore]`, then re-test
/// score-gated achievements.
pub fn update_score(world: &World, state: &mut GameState, out: &mut TurnOutput, delta: i32, message: Option<&str>) {
    let before = state.score;
    let raw = i64::from(state.score) + i64::from(delta);
    let mut next = raw.max(0);
    if world.max_score > 0 {
        next = next.min(i64::from(world.max_score));
    }
    state.score = u32::try_from(next).unwrap_or(0);
    if state.score != before {
        out.emit(EngineEvent::ScoreChanged {
            score: state.score,
            delta,
        });
        info!("└─ action: UpdateScore({delta}) -> {}", state.score);
    }
    if let Some(text) = message {
        out.push(text.to_string());
    }
    check_achievements(world, state, out);
}

/// Unlock every achievement whose predicate now holds. Loops until a
/// fixpoint so meta-achievements can cascade.
pub fn check_achievements(world: &World, state: &mut GameState, out: &mut TurnOutput) {
    loop {
        let mut newly: Vec<(String, String, u32)> = Vec::new();
        for achievement in &world.achievements {
            if state.progression.unlocked.contains(&achievement.id) {
                continue;
            }
            let earned = match &achievement.kind {
                AchievementKindDef::Instant { condition } => eval_condition(Some(condition), state),
                AchievementKindDef::Progressive { counter, target } => {
                    let current = match state.flags.get(counter) {
                        Some(FlagValue::Int(n)) => *n,
                        _ => 0,
                    };
                    state.progression.progress.insert(achievement.id.clone(), current);
                    current >= *target
                },
                AchievementKindDef::Meta { count } => state.progression.unlocked.len() >= *count,
            };
            if earned {
                newly.push((achievement.id.clone(), achievement.name.clone(), achievement.points));
            }
        }

        // perfect-score convention: an achievement with this id unlocks
        // the moment the score meter fills
        if world.max_score > 0
            && state.score >= world.max_score
            && !state.progression.unlocked.contains("perfect_score")
            && world.achievements.iter().any(|a| a.id == "perfect_score")
            && !newly.iter().any(|(id, _, _)| id == "perfect_score")
        {
            if let Some(a) = world.achievements.iter().find(|a| a.id == "perfect_score") {
                newly.push((a.id.clone(), a.name.clone(), a.points));
            }
        }

        if newly.is_empty() {
            return;
        }
        for (id, name, points) in newly {
            state.progression.unlocked.insert(id.clone());
            let raw = i64::from(state.score) + i64::from(points);
            let mut next = raw.max(0);
            if world.max_score > 0 {
                next = next.min(i64::from(world.max_score));
            }
            state.score = u32::try_from(next).unwrap_or(state.score);
            info!("achievement unlocked: {id} (+{points})");
            out.push(format!("Achievement unlocked: {name}!"));
            out.emit(EngineEvent::AchievementUnlocked { id, name, points });
        }
    }
}

/// Select the ending that applies right now: failure endings are forced,
/// otherwise the highest-priority ending whose conditions all hold,
/// otherwise the default.
pub fn evaluate_ending<'w>(world: &'w World, state: &GameState) -> Option<&'w EndingDef> {
    let holds = |ending: &EndingDef| {
        ending
            .conditions
            .iter()
            .all(|c| eval_condition(Some(c), state))
    };

    if let Some(failure) = world
        .endings
        .iter()
        .filter(|e| e.failure && !e.conditions.is_empty())
        .find(|e| holds(e))
    {
        return Some(failure);
    }

    world
        .endings
        .iter()
        .filter(|e| !e.failure && !e.is_default && holds(e))
        .max_by_key(|e| e.priority)
        .or_else(|| world.endings.iter().find(|e| e.is_default))
}

/// Conclude the game with a specific ending.
pub fn end_game(world: &World, state: &mut GameState, out: &mut TurnOutput, ending_id: &str) {
    if state.ended.is_some() {
        return;
    }
    state.ended = Some(ending_id.to_string());
    if let Some(ending) = world.endings.iter().find(|e| e.id == ending_id) {
        out.push(ending.message.clone());
    }
    out.emit(EngineEvent::GameEnded {
        ending: ending_id.to_string(),
        score: state.score,
        moves: state.moves,
    });
    info!("game ended: {ending_id}");
}

/// Explicit completion check, run after each turn: a set win flag or a
/// satisfied failure ending concludes the game.
pub fn check_completion(world: &World, state: &mut GameState, out: &mut TurnOutput) {
    if state.ended.is_some() || world.endings.is_empty() {
        return;
    }
    let failure_holds = world
        .endings
        .iter()
        .filter(|e| e.failure && !e.conditions.is_empty())
        .any(|e| e.conditions.iter().all(|c| eval_condition(Some(c), state)));
    if !failure_holds && !state.flag_truthy("game_won") {
        return;
    }
    if let Some(ending) = evaluate_ending(world, state) {
        let id = ending.id.clone();
        end_game(world, state, out, &id);
    }
}

/// Adjust a named ending factor and re-derive the current path.
pub fn update_factor(state: &mut GameState, name: &str, delta: i64) {
    let entry = state.progression.ending_factors.entry(name.to_string()).or_insert(0);
    *entry += delta;
    let factor = |key: &str| state.progression.ending_factors.get(key).copied().unwrap_or(0);
    let karma = factor("karma");
    let heroism = factor("heroism");
    let path = if karma >= 50 && heroism >= 50 {
        "hero"
    } else if karma <= -50 {
        "villain"
    } else {
        "neutral"
    };
    if state.progression.path != path {
        info!("path changed: {} -> {path}", state.progression.path);
        state.progression.path = path.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_data::{AchievementDef, GameDef, PlayerDef, RoomDef, WorldDef};

    fn world_with(max_score: u32, achievements: Vec<AchievementDef>, endings: Vec<EndingDef>) -> World {
        let def = WorldDef {
            game: GameDef {
                title: "T".into(),
                max_score,
                player: PlayerDef {
                    name: "Hero".into(),
                    start_room: "r".into(),
                    ..PlayerDef::default()
                },
                ..GameDef::default()
            },
            rooms: vec![RoomDef {
                id: "r".into(),
                name: "R".into(),
                description: "d".into(),
                ..RoomDef::default()
            }],
            achievements,
            endings,
            ..WorldDef::default()
        };
        World::from_def(def).unwrap()
    }

    fn achievement(id: &str, points: u32, kind: AchievementKindDef) -> AchievementDef {
        AchievementDef {
            id: id.into(),
            name: id.replace('_', " "),
            description: String::new(),
            points,
            kind,
        }
    }

    #[test]
    fn score_clamps_at_zero_and_max() {
        let world = world_with(50, vec![], vec![]);
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        update_score(&world, &mut state, &mut out, -10, None);
        assert_eq!(state.score, 0);
        update_score(&world, &mut state, &mut out, 999, None);
        assert_eq!(state.score, 50);
        assert!(out.events.iter().any(|e| matches!(e, EngineEvent::ScoreChanged { .. })));
    }

    #[test]
    fn instant_achievement_unlocks_once() {
        let world = world_with(
            0,
            vec![achievement(
                "first_flag",
                5,
                AchievementKindDef::Instant {
                    condition: "brave".into(),
                },
            )],
            vec![],
        );
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        check_achievements(&world, &mut state, &mut out);
        assert!(state.progression.unlocked.is_empty());

        state.set_flag("brave", FlagValue::Bool(true));
        check_achievements(&world, &mut state, &mut out);
        assert!(state.progression.unlocked.contains("first_flag"));
        assert_eq!(state.score, 5);

        // no double-award
        check_achievements(&world, &mut state, &mut out);
        assert_eq!(state.score, 5);
    }

    #[test]
    fn progressive_achievement_tracks_and_unlocks_at_target() {
        let world = world_with(
            0,
            vec![achievement(
                "collector",
                10,
                AchievementKindDef::Progressive {
                    counter: "coins_found".into(),
                    target: 3,
                },
            )],
            vec![],
        );
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        state.set_flag("coins_found", FlagValue::Int(2));
        check_achievements(&world, &mut state, &mut out);
        assert_eq!(state.progression.progress.get("collector"), Some(&2));
        assert!(!state.progression.unlocked.contains("collector"));

        state.set_flag("coins_found", FlagValue::Int(3));
        check_achievements(&world, &mut state, &mut out);
        assert!(state.progression.unlocked.contains("collector"));
    }

    #[test]
    fn meta_achievement_cascades_in_one_pass() {
        let world = world_with(
            0,
            vec![
                achievement(
                    "a",
                    1,
                    AchievementKindDef::Instant { condition: "x".into() },
                ),
                achievement(
                    "b",
                    1,
                    AchievementKindDef::Instant { condition: "x".into() },
                ),
                achievement("meta", 5, AchievementKindDef::Meta { count: 2 }),
            ],
            vec![],
        );
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();
        state.set_flag("x", FlagValue::Bool(true));
        check_achievements(&world, &mut state, &mut out);
        assert!(state.progression.unlocked.contains("meta"));
        assert_eq!(state.score, 7);
    }

    #[test]
    fn ending_selection_priority_and_failure() {
        let endings = vec![
            EndingDef {
                id: "default".into(),
                name: "Default".into(),
                message: "It ends.".into(),
                is_default: true,
                ..EndingDef::default()
            },
            EndingDef {
                id: "good".into(),
                name: "Good".into(),
                message: "Well done.".into(),
                priority: 10,
                conditions: vec!["saved_town".into()],
                ..EndingDef::default()
            },
            EndingDef {
                id: "great".into(),
                name: "Great".into(),
                message: "Magnificent.".into(),
                priority: 20,
                conditions: vec!["saved_town".into(), "score >= 40".into()],
                ..EndingDef::default()
            },
            EndingDef {
                id: "failure".into(),
                name: "Failure".into(),
                message: "You are lost.".into(),
                failure: true,
                conditions: vec!["doomed".into()],
                ..EndingDef::default()
            },
        ];
        let world = world_with(100, vec![], endings);
        let mut state = GameState::new(&world);

        assert_eq!(evaluate_ending(&world, &state).unwrap().id, "default");

        state.set_flag("saved_town", FlagValue::Bool(true));
        assert_eq!(evaluate_ending(&world, &state).unwrap().id, "good");

        state.score = 40;
        assert_eq!(evaluate_ending(&world, &state).unwrap().id, "great");

        // failure forces its ending regardless of priority
        state.set_flag("doomed", FlagValue::Bool(true));
        assert_eq!(evaluate_ending(&world, &state).unwrap().id, "failure");
    }

    #[test]
    fn completion_check_ends_the_game_once() {
        let endings = vec![EndingDef {
            id: "default".into(),
            name: "Default".into(),
            message: "Fin.".into(),
            is_default: true,
            ..EndingDef::default()
        }];
        let world = world_with(0, vec![], endings);
        let mut state = GameState::new(&world);
        let mut out = TurnOutput::default();

        check_completion(&world, &mut state, &mut out);
        assert!(state.ended.is_none());

        state.set_flag("game_won", FlagValue::Bool(true));
        check_completion(&world, &mut state, &mut out);
        assert_eq!(state.ended.as_deref(), Some("default"));
        assert!(out.lines.contains(&"Fin.".to_string()));

        // already ended: no second GameEnded
        let events_before = out.events.len();
        check_completion(&world, &mut state, &mut out);
        assert_eq!(out.events.len(), events_before);
    }

    #[test]
    fn path_transitions_follow_factor_thresholds() {
        let world = world_with(0, vec![], vec![]);
        let mut state = GameState::new(&world);
        assert_eq!(state.progression.path, "neutral");

        update_factor(&mut state, "karma", 50);
        assert_eq!(state.progression.path, "neutral");
        update_factor(&mut state, "heroism", 50);
        assert_eq!(state.progression.path, "hero");

        update_factor(&mut state, "karma", -100);
        assert_eq!(state.progression.path, "villain");

        update_factor(&mut state, "karma", 60);
        assert_eq!(state.progression.path, "neutral");
    }
}
