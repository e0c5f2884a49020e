//! Command module
//!
//! Describes the closed set of canonical verbs and the structured
//! command the parser produces for the dispatcher. Synonyms and aliases
//! live in [`crate::vocab`]; by the time a [`Command`] exists, only
//! canonical verbs remain.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use variantly::Variantly;

/// The canonical verbs the dispatcher understands. One handler each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verb {
    Look,
    Examine,
    Take,
    Drop,
    Inventory,
    Go,
    Use,
    Open,
    Close,
    Lock,
    Unlock,
    Push,
    Pull,
    Turn,
    Touch,
    Search,
    Read,
    Eat,
    Drink,
    Talk,
    Ask,
    Give,
    Trade,
    Wear,
    Remove,
    Put,
    Save,
    Load,
    Help,
    Score,
    Wait,
    Yell,
    Restart,
    Quit,
}

/// How a verb's object phrase should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Resolve against the world; failure is a "not here" error.
    Entity,
    /// A compass direction or named exit.
    Direction,
    /// Kept as raw text (topics, yelled words, save slots).
    FreeText,
    /// The verb takes no such object.
    None,
}

/// Slot schema: what a verb requires of its direct/indirect objects.
#[derive(Debug, Clone, Copy)]
pub struct SlotSchema {
    pub direct: ResolvePolicy,
    pub direct_required: bool,
    /// Prompt shown when a required direct object is missing.
    pub direct_prompt: &'static str,
    pub indirect: ResolvePolicy,
    pub indirect_required: bool,
    pub indirect_prompt: &'static str,
    /// Prepositions that introduce the indirect object.
    pub prepositions: &'static [&'static str],
}

const fn schema(
    direct: ResolvePolicy,
    direct_required: bool,
    direct_prompt: &'static str,
    indirect: ResolvePolicy,
    indirect_required: bool,
    indirect_prompt: &'static str,
    prepositions: &'static [&'static str],
) -> SlotSchema {
    SlotSchema {
        direct,
        direct_required,
        direct_prompt,
        indirect,
        indirect_required,
        indirect_prompt,
        prepositions,
    }
}

impl Verb {
    /// Canonical lowercase name, used for trigger-pattern matching.
    pub fn name(self) -> &'static str {
        match self {
            Verb::Look => "look",
            Verb::Examine => "examine",
            Verb::Take => "take",
            Verb::Drop => "drop",
            Verb::Inventory => "inventory",
            Verb::Go => "go",
            Verb::Use => "use",
            Verb::Open => "open",
            Verb::Close => "close",
            Verb::Lock => "lock",
            Verb::Unlock => "unlock",
            Verb::Push => "push",
            Verb::Pull => "pull",
            Verb::Turn => "turn",
            Verb::Touch => "touch",
            Verb::Search => "search",
            Verb::Read => "read",
            Verb::Eat => "eat",
            Verb::Drink => "drink",
            Verb::Talk => "talk",
            Verb::Ask => "ask",
            Verb::Give => "give",
            Verb::Trade => "trade",
            Verb::Wear => "wear",
            Verb::Remove => "remove",
            Verb::Put => "put",
            Verb::Save => "save",
            Verb::Load => "load",
            Verb::Help => "help",
            Verb::Score => "score",
            Verb::Wait => "wait",
            Verb::Yell => "yell",
            Verb::Restart => "restart",
            Verb::Quit => "quit",
        }
    }

    /// Look a canonical verb up by name.
    pub fn from_name(name: &str) -> Option<Verb> {
        ALL_VERBS.iter().copied().find(|v| v.name() == name)
    }

    /// The verb's slot schema, used by parser validation.
    pub fn slots(self) -> SlotSchema {
        use ResolvePolicy::{Direction, Entity, FreeText, None};
        match self {
            Verb::Look => schema(Entity, false, "", None, false, "", &[]),
            Verb::Examine => schema(Entity, true, "Examine what?", None, false, "", &[]),
            Verb::Take => schema(Entity, true, "Take what?", Entity, false, "", &["from", "out"]),
            Verb::Drop => schema(Entity, true, "Drop what?", None, false, "", &[]),
            Verb::Go => schema(Direction, true, "Go where?", None, false, "", &[]),
            Verb::Use => schema(
                Entity,
                true,
                "Use what?",
                Entity,
                false,
                "Use it on what?",
                &["on", "with"],
            ),
            Verb::Open => schema(Entity, true, "Open what?", None, false, "", &[]),
            Verb::Close => schema(Entity, true, "Close what?", None, false, "", &[]),
            Verb::Lock => schema(Entity, true, "Lock what?", Entity, false, "", &["with"]),
            Verb::Unlock => schema(Entity, true, "Unlock what?", Entity, false, "", &["with"]),
            Verb::Push => schema(Entity, true, "Push what?", None, false, "", &[]),
            Verb::Pull => schema(Entity, true, "Pull what?", None, false, "", &[]),
            Verb::Turn => schema(Entity, true, "Turn what?", None, false, "", &[]),
            Verb::Touch => schema(Entity, true, "Touch what?", None, false, "", &[]),
            Verb::Search => schema(Entity, true, "Search what?", None, false, "", &[]),
            Verb::Read => schema(Entity, true, "Read what?", None, false, "", &[]),
            Verb::Eat => schema(Entity, true, "Eat what?", None, false, "", &[]),
            Verb::Drink => schema(Entity, true, "Drink what?", None, false, "", &[]),
            Verb::Talk => schema(Entity, true, "Talk to whom?", None, false, "", &["to", "with"]),
            Verb::Ask => schema(
                Entity,
                true,
                "Ask whom?",
                FreeText,
                true,
                "Ask about what?",
                &["about"],
            ),
            Verb::Give => schema(
                Entity,
                true,
                "Give what?",
                Entity,
                true,
                "Give it to whom?",
                &["to"],
            ),
            Verb::Trade => schema(
                Entity,
                true,
                "Trade what?",
                FreeText,
                true,
                "Trade it for what?",
                &["for"],
            ),
            Verb::Wear => schema(Entity, true, "Wear what?", None, false, "", &[]),
            Verb::Remove => schema(Entity, true, "Remove what?", Entity, false, "", &["from"]),
            Verb::Put => schema(
                Entity,
                true,
                "Put what?",
                Entity,
                true,
                "Put it where?",
                &["in", "into", "on", "onto", "inside"],
            ),
            Verb::Save => schema(FreeText, false, "", None, false, "", &[]),
            Verb::Load => schema(FreeText, false, "", None, false, "", &[]),
            Verb::Help => schema(FreeText, false, "", None, false, "", &[]),
            Verb::Yell => schema(FreeText, false, "", None, false, "", &["at"]),
            Verb::Inventory | Verb::Score | Verb::Wait | Verb::Restart | Verb::Quit => {
                schema(None, false, "", None, false, "", &[])
            },
        }
    }

    /// One-line usage text for the help verb.
    pub fn help_line(self) -> &'static str {
        match self {
            Verb::Look => "look [at <thing>] - describe the room or a thing in it",
            Verb::Examine => "examine <thing> - inspect something closely",
            Verb::Take => "take <item> [from <container>] - pick something up",
            Verb::Drop => "drop <item> - put a held item down",
            Verb::Inventory => "inventory - list what you are carrying",
            Verb::Go => "go <direction> - move through an exit",
            Verb::Use => "use <item> [on <target>] - use an item, maybe on something",
            Verb::Open => "open <thing> - open a door or container",
            Verb::Close => "close <thing> - close a door or container",
            Verb::Lock => "lock <thing> - lock something lockable",
            Verb::Unlock => "unlock <thing> [with <key>] - unlock with the right key",
            Verb::Push => "push <thing> - shove something pushable",
            Verb::Pull => "pull <thing> - pull a lever or similar",
            Verb::Turn => "turn <thing> - rotate a dial or crank",
            Verb::Touch => "touch <thing> - feel a surface",
            Verb::Search => "search <thing> - look for hidden things",
            Verb::Read => "read <thing> - read any writing",
            Verb::Eat => "eat <item> - eat something edible you hold",
            Verb::Drink => "drink <item> - drink something drinkable you hold",
            Verb::Talk => "talk to <person> - start a conversation",
            Verb::Ask => "ask <person> about <topic> - ask about a topic",
            Verb::Give => "give <item> to <person> - hand an item over",
            Verb::Trade => "trade <item> for <item> - barter with a trader",
            Verb::Wear => "wear <item> - put on something wearable",
            Verb::Remove => "remove <item> - take off something worn",
            Verb::Put => "put <item> in <container> - stow an item",
            Verb::Save => "save [slot] - save the game",
            Verb::Load => "load [slot] - load a saved game",
            Verb::Help => "help [verb] - this list, or help for one verb",
            Verb::Score => "score - show score and achievements",
            Verb::Wait => "wait - let a moment pass",
            Verb::Yell => "yell [word] - make some noise",
            Verb::Restart => "restart - start the adventure over",
            Verb::Quit => "quit - leave the game",
        }
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every canonical verb, in help-listing order.
pub const ALL_VERBS: &[Verb] = &[
    Verb::Look,
    Verb::Examine,
    Verb::Take,
    Verb::Drop,
    Verb::Inventory,
    Verb::Go,
    Verb::Use,
    Verb::Open,
    Verb::Close,
    Verb::Lock,
    Verb::Unlock,
    Verb::Push,
    Verb::Pull,
    Verb::Turn,
    Verb::Touch,
    Verb::Search,
    Verb::Read,
    Verb::Eat,
    Verb::Drink,
    Verb::Talk,
    Verb::Ask,
    Verb::Give,
    Verb::Trade,
    Verb::Wear,
    Verb::Remove,
    Verb::Put,
    Verb::Save,
    Verb::Load,
    Verb::Help,
    Verb::Score,
    Verb::Wait,
    Verb::Yell,
    Verb::Restart,
    Verb::Quit,
];

/// What a resolved object phrase turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Variantly)]
#[serde(rename_all = "camelCase")]
pub enum RefKind {
    Item,
    Object,
    Npc,
    Direction,
    Str,
    Special,
    Unknown,
}

/// A resolved reference carried on the structured command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRef {
    pub kind: RefKind,
    pub id: String,
    pub name: String,
}

impl ResolvedRef {
    pub fn item(id: &str, name: &str) -> Self {
        Self {
            kind: RefKind::Item,
            id: id.to_string(),
            name: name.to_string(),
        }
    }
    pub fn object(id: &str, name: &str) -> Self {
        Self {
            kind: RefKind::Object,
            id: id.to_string(),
            name: name.to_string(),
        }
    }
    pub fn npc(id: &str, name: &str) -> Self {
        Self {
            kind: RefKind::Npc,
            id: id.to_string(),
            name: name.to_string(),
        }
    }
    pub fn direction(dir: &str) -> Self {
        Self {
            kind: RefKind::Direction,
            id: dir.to_string(),
            name: dir.to_string(),
        }
    }
    pub fn text(raw: &str) -> Self {
        Self {
            kind: RefKind::Str,
            id: raw.to_string(),
            name: raw.to_string(),
        }
    }
    pub fn special(word: &str) -> Self {
        Self {
            kind: RefKind::Special,
            id: word.to_string(),
            name: word.to_string(),
        }
    }
}

/// A fully parsed and resolved player command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub verb: Verb,
    pub direct_object: Option<String>,
    pub resolved_direct: Option<ResolvedRef>,
    pub indirect_object: Option<String>,
    pub resolved_indirect: Option<ResolvedRef>,
    pub preposition: Option<String>,
    pub modifiers: Vec<String>,
}

impl Command {
    /// A bare command with no objects.
    pub fn bare(verb: Verb) -> Self {
        Self {
            verb,
            direct_object: None,
            resolved_direct: None,
            indirect_object: None,
            resolved_indirect: None,
            preposition: None,
            modifiers: Vec::new(),
        }
    }

    /// The resolved direct object id, if any.
    pub fn direct_id(&self) -> Option<&str> {
        self.resolved_direct.as_ref().map(|r| r.id.as_str())
    }

    pub fn indirect_id(&self) -> Option<&str> {
        self.resolved_indirect.as_ref().map(|r| r.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_has_a_unique_name() {
        let mut names: Vec<&str> = ALL_VERBS.iter().map(|v| v.name()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
        assert_eq!(before, 34);
    }

    #[test]
    fn from_name_round_trips() {
        for verb in ALL_VERBS {
            assert_eq!(Verb::from_name(verb.name()), Some(*verb));
        }
        assert_eq!(Verb::from_name("dance"), None);
    }

    #[test]
    fn required_slots_carry_prompts() {
        for verb in ALL_VERBS {
            let slots = verb.slots();
            if slots.direct_required {
                assert!(!slots.direct_prompt.is_empty(), "{verb} missing direct prompt");
            }
            if slots.indirect_required {
                assert!(!slots.indirect_prompt.is_empty(), "{verb} missing indirect prompt");
                assert!(!slots.prepositions.is_empty(), "{verb} missing prepositions");
            }
        }
    }

    #[test]
    fn ref_kind_variantly_accessors() {
        assert!(RefKind::Item.is_item());
        assert!(RefKind::Direction.is_direction());
        assert!(!RefKind::Npc.is_item());
    }
}
