use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Validation error for malformed or missing references in a WorldDef.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    MissingReference { kind: &'static str, id: String, context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::MissingReference { kind, id, context } => {
                write!(f, "missing {kind} '{id}' ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

struct IdSets<'a> {
    rooms: &'a HashSet<&'a str>,
    objects: &'a HashSet<&'a str>,
    items: &'a HashSet<&'a str>,
    npcs: &'a HashSet<&'a str>,
    endings: &'a HashSet<&'a str>,
}

/// Validate cross-references and basic invariants in a WorldDef.
///
/// Returns every problem found rather than stopping at the first, so a
/// package author gets one complete report per load attempt.
pub fn validate_world(world: &WorldDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut rooms = HashSet::new();
    let mut objects = HashSet::new();
    let mut items = HashSet::new();
    let mut npcs = HashSet::new();
    let mut puzzles = HashSet::new();
    let mut endings = HashSet::new();
    let mut achievements = HashSet::new();

    track_ids("room", world.rooms.iter().map(|r| r.id.as_str()), &mut rooms, &mut errors);
    track_ids(
        "object",
        world.objects.iter().map(|o| o.id.as_str()),
        &mut objects,
        &mut errors,
    );
    track_ids("item", world.items.iter().map(|i| i.id.as_str()), &mut items, &mut errors);
    track_ids("npc", world.npcs.iter().map(|n| n.id.as_str()), &mut npcs, &mut errors);
    track_ids(
        "puzzle",
        world.puzzles.iter().map(|p| p.id.as_str()),
        &mut puzzles,
        &mut errors,
    );
    track_ids(
        "ending",
        world.endings.iter().map(|e| e.id.as_str()),
        &mut endings,
        &mut errors,
    );
    track_ids(
        "achievement",
        world.achievements.iter().map(|a| a.id.as_str()),
        &mut achievements,
        &mut errors,
    );

    let ids = IdSets {
        rooms: &rooms,
        objects: &objects,
        items: &items,
        npcs: &npcs,
        endings: &endings,
    };

    if world.game.player.start_room.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            context: "game player start room missing".to_string(),
        });
    } else {
        check_ref(
            "room",
            &world.game.player.start_room,
            ids.rooms,
            "game player start room".to_string(),
            &mut errors,
        );
    }

    if world.game.player.max_health <= 0 {
        errors.push(ValidationError::InvalidValue {
            context: format!("player max health not positive ({})", world.game.player.max_health),
        });
    }

    for room in &world.rooms {
        let ctx = |what: &str| format!("room '{}' {what}", room.id);
        for exit in &room.exits {
            check_ref(
                "room",
                &exit.to,
                ids.rooms,
                format!("room '{}' exit '{}'", room.id, exit.direction),
                &mut errors,
            );
            if let Some(key) = &exit.locked_by {
                check_ref(
                    "item",
                    key,
                    ids.items,
                    format!("room '{}' exit '{}' lock", room.id, exit.direction),
                    &mut errors,
                );
            }
        }
        for object in &room.objects {
            check_ref("object", object, ids.objects, ctx("object list"), &mut errors);
        }
        for item in &room.items {
            check_ref("item", item, ids.items, ctx("item list"), &mut errors);
        }
        for npc in &room.npcs {
            check_ref("npc", npc, ids.npcs, ctx("npc list"), &mut errors);
        }
        for event in &room.events {
            validate_actions(&event.actions, &ids, &mut errors, &format!("room '{}' event '{}'", room.id, event.name));
        }
    }

    for object in &world.objects {
        let ctx = format!("object '{}'", object.id);
        if let Some(item) = &object.requires_item {
            check_ref("item", item, ids.items, ctx.clone(), &mut errors);
        }
        if let Some(room) = &object.move_to_room {
            check_ref("room", room, ids.rooms, ctx.clone(), &mut errors);
        }
        for contained in &object.contents {
            check_ref("item", contained, ids.items, format!("{ctx} contents"), &mut errors);
        }
        for hidden in &object.hidden_items {
            if !ids.items.contains(hidden.as_str()) && !ids.objects.contains(hidden.as_str()) {
                errors.push(ValidationError::MissingReference {
                    kind: "item/object",
                    id: hidden.clone(),
                    context: format!("{ctx} hidden items"),
                });
            }
        }
        if !object.turn_positions.is_empty() {
            for key in object.turn_messages.keys() {
                if !object.turn_positions.contains(key) {
                    errors.push(ValidationError::InvalidValue {
                        context: format!("{ctx} turn message for unknown position '{key}'"),
                    });
                }
            }
        }
        if object.caps.container && !object.caps.openable && !object.starts_open {
            errors.push(ValidationError::InvalidValue {
                context: format!("{ctx} is a closed container that can never be opened"),
            });
        }
    }

    for item in &world.items {
        if let Some(container) = &item.container {
            for contained in &container.contents {
                check_ref(
                    "item",
                    contained,
                    ids.items,
                    format!("item '{}' contents", item.id),
                    &mut errors,
                );
            }
        }
    }

    for npc in &world.npcs {
        let ctx = format!("npc '{}'", npc.id);
        check_ref("room", &npc.room, ids.rooms, ctx.clone(), &mut errors);
        for item in &npc.inventory {
            check_ref("item", item, ids.items, format!("{ctx} inventory"), &mut errors);
        }
        let node_ids: HashSet<&str> = npc.dialogue.iter().map(|n| n.id.as_str()).collect();
        if !npc.dialogue.is_empty() && !node_ids.contains(npc.root_node.as_str()) {
            errors.push(ValidationError::MissingReference {
                kind: "dialogue node",
                id: npc.root_node.clone(),
                context: format!("{ctx} root node"),
            });
        }
        for node in &npc.dialogue {
            for option in &node.options {
                if let Some(next) = &option.next {
                    if !node_ids.contains(next.as_str()) {
                        errors.push(ValidationError::MissingReference {
                            kind: "dialogue node",
                            id: next.clone(),
                            context: format!("{ctx} node '{}'", node.id),
                        });
                    }
                }
                validate_actions(&option.effects, &ids, &mut errors, &format!("{ctx} node '{}'", node.id));
            }
        }
        for interval in &npc.schedule {
            if interval.start_hour > 23 || interval.end_hour > 24 {
                errors.push(ValidationError::InvalidValue {
                    context: format!(
                        "{ctx} schedule hours out of range ({}-{})",
                        interval.start_hour, interval.end_hour
                    ),
                });
            }
            check_ref("room", &interval.room, ids.rooms, format!("{ctx} schedule"), &mut errors);
        }
        for item in npc.give_responses.keys() {
            check_ref("item", item, ids.items, format!("{ctx} give responses"), &mut errors);
        }
        for (topic, entry) in &npc.topics {
            if let Some(node) = &entry.node {
                if !node_ids.contains(node.as_str()) {
                    errors.push(ValidationError::MissingReference {
                        kind: "dialogue node",
                        id: node.clone(),
                        context: format!("{ctx} topic '{topic}'"),
                    });
                }
            }
            if let Some(item) = &entry.item_given {
                check_ref("item", item, ids.items, format!("{ctx} topic '{topic}'"), &mut errors);
            }
        }
        if let Some(trade) = &npc.trade {
            for item in &trade.requires {
                check_ref("item", item, ids.items, format!("{ctx} trade rule"), &mut errors);
            }
        }
    }

    for puzzle in &world.puzzles {
        let ctx = format!("puzzle '{}'", puzzle.id);
        if puzzle.solution.is_none() && puzzle.steps.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("{ctx} has neither a solution nor steps"),
            });
        }
        if puzzle.solution.is_some() && !puzzle.steps.is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("{ctx} declares both a single solution and steps"),
            });
        }
        validate_actions(&puzzle.reward, &ids, &mut errors, &ctx);
        validate_actions(&puzzle.reset_actions, &ids, &mut errors, &ctx);
        for step in &puzzle.steps {
            validate_actions(&step.reward, &ids, &mut errors, &ctx);
        }
    }

    for event in &world.events {
        validate_actions(
            &event.actions,
            &ids,
            &mut errors,
            &format!("event '{}'", event.name),
        );
    }

    for rule in &world.interactions.use_on {
        let ctx = format!("useOn rule '{}' + '{}'", rule.item, rule.target);
        check_ref("item", &rule.item, ids.items, ctx.clone(), &mut errors);
        if !ids.items.contains(rule.target.as_str()) && !ids.objects.contains(rule.target.as_str()) {
            errors.push(ValidationError::MissingReference {
                kind: "item/object",
                id: rule.target.clone(),
                context: ctx.clone(),
            });
        }
        validate_actions(&rule.effects, &ids, &mut errors, &ctx);
    }
    for combo in &world.interactions.combinations {
        let ctx = format!("combination -> '{}'", combo.result);
        if combo.inputs.len() != 2 {
            errors.push(ValidationError::InvalidValue {
                context: format!("{ctx} needs exactly two inputs"),
            });
        }
        for input in &combo.inputs {
            check_ref("item", input, ids.items, ctx.clone(), &mut errors);
        }
        check_ref("item", &combo.result, ids.items, ctx, &mut errors);
    }
    for rule in &world.interactions.unlockables {
        let ctx = format!("unlockable '{}' -> '{}'", rule.key, rule.target);
        check_ref("item", &rule.key, ids.items, ctx.clone(), &mut errors);
        check_ref("object", &rule.target, ids.objects, ctx.clone(), &mut errors);
        if let Some(exit) = &rule.unlock_exit {
            check_ref("room", &exit.room, ids.rooms, ctx, &mut errors);
        }
    }

    let default_endings = world.endings.iter().filter(|e| e.is_default).count();
    if !world.endings.is_empty() && default_endings != 1 {
        errors.push(ValidationError::InvalidValue {
            context: format!("expected exactly one default ending, found {default_endings}"),
        });
    }

    errors
}

fn track_ids<'a>(
    kind: &'static str,
    iter: impl Iterator<Item = &'a str>,
    seen: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    for id in iter {
        if !seen.insert(id) {
            errors.push(ValidationError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

fn check_ref(
    kind: &'static str,
    id: &str,
    known: &HashSet<&str>,
    context: String,
    errors: &mut Vec<ValidationError>,
) {
    if !known.contains(id) {
        errors.push(ValidationError::MissingReference {
            kind,
            id: id.to_string(),
            context,
        });
    }
}

fn validate_actions(actions: &[ActionDef], ids: &IdSets, errors: &mut Vec<ValidationError>, context: &str) {
    for action in actions {
        match action {
            ActionDef::GiveItem { item, .. } | ActionDef::RemoveItem { item } => {
                check_ref("item", item, ids.items, context.to_string(), errors);
            },
            ActionDef::ChangeRoom { room } => {
                check_ref("room", room, ids.rooms, context.to_string(), errors);
            },
            ActionDef::EnableExit { room, .. } => {
                check_ref("room", room, ids.rooms, context.to_string(), errors);
            },
            ActionDef::RevealItem { item, room } => {
                check_ref("item", item, ids.items, context.to_string(), errors);
                check_ref("room", room, ids.rooms, context.to_string(), errors);
            },
            ActionDef::EndGame { ending, .. } => {
                check_ref("ending", ending, ids.endings, context.to_string(), errors);
            },
            ActionDef::ScheduleIn { actions, .. } => {
                validate_actions(actions, ids, errors, context);
            },
            _ => {},
        }
    }
}
