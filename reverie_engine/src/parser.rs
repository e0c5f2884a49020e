//! The natural-language command pipeline.
//!
//! Tokenization, alias expansion, longest-prefix verb matching,
//! preposition splitting, noun resolution against the world and
//! inventory, slot validation, and pronoun memory. The output is a
//! validated [`Command`] or a diagnostic [`ParseError`]; parser
//! failures are never fatal to the loop.

use log::debug;
use thiserror::Error;

use crate::command::{Command, RefKind, ResolvePolicy, ResolvedRef, Verb};
use crate::state::{GameState, PronounRef};
use crate::vocab::Vocabulary;
use crate::world::World;

/// A diagnostic the parser hands back instead of a command. The display
/// form is exactly the text shown to the player.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("I don't understand \"{0}\".")]
    UnknownVerb(String),
    #[error("{0}")]
    MissingTarget(String),
    #[error("Which do you mean: {}?", .options.join(", "))]
    Ambiguous { options: Vec<String> },
    #[error("You don't see any {0} here.")]
    NotHere(String),
    #[error("Say again?")]
    Empty,
}

/// Parse a raw input line into a structured command.
///
/// The pronoun memory on `state` is updated when resolution succeeds,
/// so `examine book` followed by `take it` picks up the book.
pub fn parse(input: &str, world: &World, state: &mut GameState, vocab: &Vocabulary) -> Result<Command, ParseError> {
    let mut tokens = tokenize(input);
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    // single-token alias expansion ("n" -> "go north", "x" -> "examine")
    if tokens.len() == 1
        && let Some(expansion) = vocab.expand_alias(&tokens[0])
    {
        debug!("alias '{}' expanded to '{expansion}'", tokens[0]);
        tokens = tokenize(expansion);
    }

    let tokens: Vec<String> = tokens.into_iter().filter(|t| !Vocabulary::is_article(t)).collect();
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let Some((verb, consumed)) = vocab.match_verb(&tokens) else {
        return Err(ParseError::UnknownVerb(tokens[0].clone()));
    };
    let rest = &tokens[consumed..];

    // split the remainder at the first recognized preposition
    let (mut direct_tokens, mut preposition, mut indirect_tokens) = split_preposition(rest, vocab);

    // "go to kitchen", "look at painting": an empty left side folds the
    // right side back into the direct slot
    if direct_tokens.is_empty() && !indirect_tokens.is_empty() {
        direct_tokens = std::mem::take(&mut indirect_tokens);
        preposition = None;
    }

    let slots = verb.slots();
    let direct_phrase = join(&direct_tokens);
    let indirect_phrase = join(&indirect_tokens);

    if direct_phrase.is_none() && slots.direct_required {
        return Err(ParseError::MissingTarget(slots.direct_prompt.to_string()));
    }
    if indirect_phrase.is_none() && slots.indirect_required {
        return Err(ParseError::MissingTarget(slots.indirect_prompt.to_string()));
    }

    let resolved_direct = match (&direct_phrase, slots.direct) {
        (Some(phrase), policy) => Some(resolve_phrase(phrase, policy, verb, world, state, vocab)?),
        (None, _) => None,
    };
    let resolved_indirect = match (&indirect_phrase, slots.indirect) {
        (Some(phrase), policy) if policy != ResolvePolicy::None => {
            Some(resolve_phrase(phrase, policy, verb, world, state, vocab)?)
        },
        _ => None,
    };

    update_pronouns(state, world, resolved_direct.as_ref());

    Ok(Command {
        verb,
        direct_object: direct_phrase,
        resolved_direct,
        indirect_object: indirect_phrase,
        resolved_indirect,
        preposition,
        modifiers: Vec::new(),
    })
}

/// Lowercase, collapse whitespace, strip trailing punctuation.
fn tokenize(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .trim_end_matches(['.', '!', '?'])
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn join(tokens: &[String]) -> Option<String> {
    if tokens.is_empty() { None } else { Some(tokens.join(" ")) }
}

/// Split tokens at the first recognized preposition.
fn split_preposition(tokens: &[String], vocab: &Vocabulary) -> (Vec<String>, Option<String>, Vec<String>) {
    for (i, token) in tokens.iter().enumerate() {
        if vocab.is_preposition(token) {
            return (tokens[..i].to_vec(), Some(token.clone()), tokens[i + 1..].to_vec());
        }
    }
    (tokens.to_vec(), None, Vec::new())
}

/// How well a candidate name matched the phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchQuality {
    Exact,
    Substring,
    Miss,
}

fn match_name(phrase: &str, name: &str, adjectives: &[String]) -> MatchQuality {
    let name = name.to_lowercase();
    if phrase == name {
        return MatchQuality::Exact;
    }
    for adjective in adjectives {
        let qualified = format!("{} {name}", adjective.to_lowercase());
        if phrase == qualified {
            return MatchQuality::Exact;
        }
    }
    if name.contains(phrase) {
        return MatchQuality::Substring;
    }
    if adjectives
        .iter()
        .any(|adj| format!("{} {name}", adj.to_lowercase()).contains(phrase))
    {
        return MatchQuality::Substring;
    }
    MatchQuality::Miss
}

/// One tier of the resolution priority order.
struct Candidate {
    reference: ResolvedRef,
    quality: MatchQuality,
}

/// Name with a distinguishing adjective, for ambiguity listings.
fn qualified_name(world: &World, reference: &ResolvedRef) -> String {
    if reference.kind == RefKind::Item
        && let Some(item) = world.items.get(&reference.id)
        && let Some(adjective) = item.adjectives.first()
    {
        return format!("the {adjective} {}", item.name);
    }
    format!("the {}", reference.name)
}

fn resolve_phrase(
    phrase: &str,
    policy: ResolvePolicy,
    verb: Verb,
    world: &World,
    state: &GameState,
    vocab: &Vocabulary,
) -> Result<ResolvedRef, ParseError> {
    match policy {
        ResolvePolicy::None | ResolvePolicy::FreeText => Ok(ResolvedRef::text(phrase)),
        ResolvePolicy::Direction => Ok(resolve_direction(phrase, world, state, vocab)),
        ResolvePolicy::Entity => resolve_entity(phrase, verb, world, state, vocab),
    }
}

/// Directions resolve leniently: an unknown word is carried through so
/// the movement module can answer "You can't go that way."
fn resolve_direction(phrase: &str, world: &World, state: &GameState, vocab: &Vocabulary) -> ResolvedRef {
    if vocab.is_direction(phrase) {
        return ResolvedRef::direction(phrase);
    }
    if let Some(room) = world.rooms.get(&state.current_room) {
        for exit in &room.exits {
            if exit.direction == phrase || exit.direction.contains(phrase) {
                return ResolvedRef::direction(&exit.direction);
            }
        }
    }
    ResolvedRef::direction(phrase)
}

fn resolve_entity(
    phrase: &str,
    verb: Verb,
    world: &World,
    state: &GameState,
    vocab: &Vocabulary,
) -> Result<ResolvedRef, ParseError> {
    // (a) literal specials
    if phrase == "all" || phrase == "everything" {
        return Ok(ResolvedRef::special(phrase));
    }

    // (b) pronouns via last-referenced memory
    if let Some(resolved) = resolve_pronoun(phrase, state)? {
        return Ok(resolved);
    }

    // (c) directions
    if vocab.is_direction(phrase) {
        return Ok(ResolvedRef::direction(phrase));
    }

    // (d)..(i): priority tiers; the first tier with any match wins
    let tiers = build_tiers(phrase, verb, world, state);
    for tier in tiers {
        let pick = |quality: MatchQuality| -> Vec<&Candidate> {
            tier.iter().filter(|c| c.quality == quality).collect()
        };
        for quality in [MatchQuality::Exact, MatchQuality::Substring] {
            let matches = pick(quality);
            match matches.len() {
                0 => {},
                1 => return Ok(matches[0].reference.clone()),
                _ => {
                    return Err(ParseError::Ambiguous {
                        options: matches
                            .iter()
                            .map(|c| qualified_name(world, &c.reference))
                            .collect(),
                    });
                },
            }
        }
    }

    Err(ParseError::NotHere(phrase.to_string()))
}

fn resolve_pronoun(phrase: &str, state: &GameState) -> Result<Option<ResolvedRef>, ParseError> {
    let memory = &state.pronouns;
    let slot = match phrase {
        "it" => Some(memory.it.as_ref()),
        "them" => Some(memory.them.as_ref().or(memory.it.as_ref())),
        "him" => Some(memory.him.as_ref().or(memory.it.as_ref())),
        "her" => Some(memory.her.as_ref().or(memory.it.as_ref())),
        _ => None,
    };
    match slot {
        None => Ok(None),
        Some(Some(referent)) => Ok(Some(ResolvedRef {
            kind: kind_from_str(&referent.kind),
            id: referent.id.clone(),
            name: referent.name.clone(),
        })),
        Some(None) => Err(ParseError::MissingTarget(format!(
            "I don't know what \"{phrase}\" refers to."
        ))),
    }
}

fn kind_from_str(kind: &str) -> RefKind {
    match kind {
        "item" => RefKind::Item,
        "object" => RefKind::Object,
        "npc" => RefKind::Npc,
        _ => RefKind::Unknown,
    }
}

fn build_tiers(phrase: &str, verb: Verb, world: &World, state: &GameState) -> Vec<Vec<Candidate>> {
    let mut tiers: Vec<Vec<Candidate>> = Vec::new();

    let item_candidate = |id: &str| -> Option<Candidate> {
        let item = world.items.get(id)?;
        let quality = match_name(phrase, &item.name, &item.adjectives);
        (quality != MatchQuality::Miss).then(|| Candidate {
            reference: ResolvedRef::item(id, &item.name),
            quality,
        })
    };

    // inventory items
    tiers.push(state.held.iter().filter_map(|id| item_candidate(id)).collect());

    // worn items
    tiers.push(state.worn.values().filter_map(|id| item_candidate(id)).collect());

    // container contents, only for container-handling verbs
    if matches!(verb, Verb::Take | Verb::Put) {
        let mut tier = Vec::new();
        let mut add_contents = |container_id: &str| {
            if state.object_state(container_id).open {
                for id in state.container_contents(container_id) {
                    if let Some(candidate) = item_candidate(id) {
                        tier.push(candidate);
                    }
                }
            }
        };
        for id in state.held.clone() {
            add_contents(&id);
        }
        for id in state.items_in_room(&state.current_room).to_vec() {
            add_contents(&id);
        }
        for id in state.objects_in_room(world, &state.current_room) {
            add_contents(id);
        }
        tiers.push(tier);
    }

    // current-room objects
    tiers.push(
        state
            .objects_in_room(world, &state.current_room)
            .into_iter()
            .filter_map(|id| {
                let object = world.objects.get(id)?;
                let quality = match_name(phrase, &object.name, &[]);
                (quality != MatchQuality::Miss).then(|| Candidate {
                    reference: ResolvedRef::object(id, &object.name),
                    quality,
                })
            })
            .collect(),
    );

    // current-room loose items
    tiers.push(
        state
            .items_in_room(&state.current_room)
            .iter()
            .filter_map(|id| item_candidate(id))
            .collect(),
    );

    // current-room NPCs
    tiers.push(
        state
            .npcs_in_room(&state.current_room)
            .into_iter()
            .filter_map(|id| {
                let npc = world.npcs.get(id)?;
                let quality = match_name(phrase, &npc.name, &[]);
                (quality != MatchQuality::Miss).then(|| Candidate {
                    reference: ResolvedRef::npc(id, &npc.name),
                    quality,
                })
            })
            .collect(),
    );

    tiers
}

/// Record the most recently resolved non-special direct object.
fn update_pronouns(state: &mut GameState, world: &World, resolved: Option<&ResolvedRef>) {
    let Some(resolved) = resolved else { return };
    let referent = PronounRef {
        kind: match resolved.kind {
            RefKind::Item => "item",
            RefKind::Object => "object",
            RefKind::Npc => "npc",
            _ => return,
        }
        .to_string(),
        id: resolved.id.clone(),
        name: resolved.name.clone(),
    };
    if resolved.kind == RefKind::Npc {
        match world.npcs.get(&resolved.id).and_then(|n| n.pronoun.as_deref()) {
            Some("he") => state.pronouns.him = Some(referent.clone()),
            Some("she") => state.pronouns.her = Some(referent.clone()),
            _ => state.pronouns.them = Some(referent.clone()),
        }
    }
    state.pronouns.it = Some(referent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ItemLocation;
    use reverie_data::{
        ConfigDef, GameDef, ItemContainerDef, ItemDef, NpcDef, ObjectCaps, ObjectDef, PlayerDef,
        RoomDef, WorldDef,
    };

    fn world() -> World {
        let def = WorldDef {
            game: GameDef {
                title: "T".into(),
                player: PlayerDef {
                    name: "Hero".into(),
                    start_room: "hall".into(),
                    ..PlayerDef::default()
                },
                config: ConfigDef::default(),
                ..GameDef::default()
            },
            rooms: vec![
                RoomDef {
                    id: "hall".into(),
                    name: "Hall".into(),
                    description: "A hall.".into(),
                    items: vec!["red_book".into(), "blue_book".into(), "lamp".into()],
                    objects: vec!["desk".into(), "chest".into()],
                    npcs: vec!["marla".into()],
                    exits: vec![reverie_data::ExitDef {
                        direction: "north".into(),
                        to: "study".into(),
                        enabled: true,
                        locked_by: None,
                        condition: None,
                        blocked_message: None,
                    }],
                    ..RoomDef::default()
                },
                RoomDef {
                    id: "study".into(),
                    name: "Study".into(),
                    description: "A study.".into(),
                    ..RoomDef::default()
                },
            ],
            objects: vec![
                ObjectDef {
                    id: "desk".into(),
                    name: "desk".into(),
                    description: "Oak.".into(),
                    ..ObjectDef::default()
                },
                ObjectDef {
                    id: "chest".into(),
                    name: "chest".into(),
                    description: "Iron-bound.".into(),
                    caps: ObjectCaps {
                        container: true,
                        openable: true,
                        ..ObjectCaps::default()
                    },
                    starts_open: true,
                    ..ObjectDef::default()
                },
            ],
            items: vec![
                ItemDef {
                    id: "red_book".into(),
                    name: "book".into(),
                    adjectives: vec!["red".into()],
                    description: "Red cover.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "blue_book".into(),
                    name: "book".into(),
                    adjectives: vec!["blue".into()],
                    description: "Blue cover.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "lamp".into(),
                    name: "brass lamp".into(),
                    description: "Shiny.".into(),
                    ..ItemDef::default()
                },
                ItemDef {
                    id: "pouch".into(),
                    name: "pouch".into(),
                    description: "Leather.".into(),
                    container: Some(ItemContainerDef {
                        capacity: 2,
                        starts_open: true,
                        contents: Vec::new(),
                    }),
                    ..ItemDef::default()
                },
            ],
            npcs: vec![NpcDef {
                id: "marla".into(),
                name: "Marla".into(),
                description: "A trader.".into(),
                room: "hall".into(),
                pronoun: Some("she".into()),
                ..NpcDef::default()
            }],
            ..WorldDef::default()
        };
        World::from_def(def).unwrap()
    }

    fn setup() -> (World, GameState, Vocabulary) {
        let world = world();
        let state = GameState::new(&world);
        (world, state, Vocabulary::built_in())
    }

    #[test]
    fn empty_and_whitespace_inputs_are_rejected() {
        let (world, mut state, vocab) = setup();
        assert_eq!(parse("", &world, &mut state, &vocab), Err(ParseError::Empty));
        assert_eq!(parse("   ", &world, &mut state, &vocab), Err(ParseError::Empty));
    }

    #[test]
    fn unknown_verb_is_reported_with_the_word() {
        let (world, mut state, vocab) = setup();
        let err = parse("frobnicate lamp", &world, &mut state, &vocab).unwrap_err();
        assert_eq!(err, ParseError::UnknownVerb("frobnicate".into()));
        assert_eq!(err.to_string(), "I don't understand \"frobnicate\".");
    }

    #[test]
    fn articles_are_dropped_before_matching() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("take the brass lamp", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.verb, Verb::Take);
        assert_eq!(cmd.direct_id(), Some("lamp"));
    }

    #[test]
    fn trailing_punctuation_is_stripped() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("look at desk!", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.verb, Verb::Look);
        assert_eq!(cmd.direct_id(), Some("desk"));
    }

    #[test]
    fn directional_alias_becomes_go_command() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("n", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.verb, Verb::Go);
        assert_eq!(
            cmd.resolved_direct,
            Some(ResolvedRef::direction("north"))
        );
    }

    #[test]
    fn missing_required_target_prompts() {
        let (world, mut state, vocab) = setup();
        let err = parse("take", &world, &mut state, &vocab).unwrap_err();
        assert_eq!(err, ParseError::MissingTarget("Take what?".into()));
        let err = parse("ask marla", &world, &mut state, &vocab).unwrap_err();
        assert_eq!(err, ParseError::MissingTarget("Ask about what?".into()));
    }

    #[test]
    fn preposition_splits_direct_and_indirect() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("put lamp in chest", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.verb, Verb::Put);
        assert_eq!(cmd.direct_id(), Some("lamp"));
        assert_eq!(cmd.preposition.as_deref(), Some("in"));
        assert_eq!(cmd.indirect_id(), Some("chest"));
    }

    #[test]
    fn empty_left_side_folds_back_into_direct() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("go to north", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.verb, Verb::Go);
        assert_eq!(cmd.direct_id(), Some("north"));
        assert_eq!(cmd.preposition, None);
    }

    #[test]
    fn ambiguous_nouns_list_the_options() {
        let (world, mut state, vocab) = setup();
        let err = parse("take book", &world, &mut state, &vocab).unwrap_err();
        assert!(matches!(&err, ParseError::Ambiguous { options } if options.len() == 2));
    }

    #[test]
    fn adjectives_disambiguate() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("take red book", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.direct_id(), Some("red_book"));
    }

    #[test]
    fn inventory_outranks_room() {
        let (world, mut state, vocab) = setup();
        // a second "lamp" would be ambiguous; hold one book so it wins the tier
        state.place_item("red_book", ItemLocation::Held);
        let cmd = parse("drop book", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.direct_id(), Some("red_book"));
    }

    #[test]
    fn npcs_resolve_in_room() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("talk to marla", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.verb, Verb::Talk);
        assert_eq!(
            cmd.resolved_direct.as_ref().map(|r| r.kind),
            Some(RefKind::Npc)
        );
    }

    #[test]
    fn pronoun_carries_through() {
        let (world, mut state, vocab) = setup();
        parse("examine red book", &world, &mut state, &vocab).unwrap();
        let cmd = parse("take it", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.direct_id(), Some("red_book"));
    }

    #[test]
    fn gendered_pronoun_tracks_npc() {
        let (world, mut state, vocab) = setup();
        parse("examine marla", &world, &mut state, &vocab).unwrap();
        let cmd = parse("talk to her", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.direct_id(), Some("marla"));
    }

    #[test]
    fn pronoun_without_referent_errors() {
        let (world, mut state, vocab) = setup();
        let err = parse("take it", &world, &mut state, &vocab).unwrap_err();
        assert!(matches!(err, ParseError::MissingTarget(_)));
    }

    #[test]
    fn unknown_noun_is_not_here() {
        let (world, mut state, vocab) = setup();
        let err = parse("take sword", &world, &mut state, &vocab).unwrap_err();
        assert_eq!(err, ParseError::NotHere("sword".into()));
        assert_eq!(err.to_string(), "You don't see any sword here.");
    }

    #[test]
    fn all_resolves_as_special() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("take all", &world, &mut state, &vocab).unwrap();
        assert_eq!(
            cmd.resolved_direct,
            Some(ResolvedRef::special("all"))
        );
    }

    #[test]
    fn container_contents_resolve_for_take() {
        let (world, mut state, vocab) = setup();
        state.place_item("pouch", ItemLocation::Room("hall".into()));
        state.place_item("lamp", ItemLocation::Container("pouch".into()));
        let cmd = parse("take lamp from pouch", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.direct_id(), Some("lamp"));
        assert_eq!(cmd.indirect_id(), Some("pouch"));
    }

    #[test]
    fn free_text_slots_keep_raw_words() {
        let (world, mut state, vocab) = setup();
        let cmd = parse("ask marla about treasure map", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.indirect_object.as_deref(), Some("treasure map"));
        assert_eq!(
            cmd.resolved_indirect.as_ref().map(|r| r.kind),
            Some(RefKind::Str)
        );
        let cmd = parse("yell hello", &world, &mut state, &vocab).unwrap();
        assert_eq!(cmd.direct_object.as_deref(), Some("hello"));
    }
}
