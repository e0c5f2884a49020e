//! Vocabulary tables: verb phrases, aliases, prepositions, directions.
//!
//! All synonym and alias knowledge lives here, at the parser ingress.
//! The dispatcher only ever sees canonical [`Verb`]s, so its surface is
//! finite and exhaustively checkable. A world package can extend the
//! built-in tables but not remove entries from them.

use std::collections::{HashMap, HashSet};

use log::warn;
use reverie_data::VocabularyDef;

use crate::command::Verb;

/// Words dropped before verb/noun matching.
pub const ARTICLES: &[&str] = &["a", "an", "the"];

/// Prepositions recognized as object-phrase separators.
pub const PREPOSITIONS: &[&str] = &[
    "on", "in", "at", "to", "with", "about", "under", "into", "onto", "from", "for",
];

/// Compass and vertical directions.
pub const DIRECTIONS: &[&str] = &[
    "north",
    "south",
    "east",
    "west",
    "northeast",
    "northwest",
    "southeast",
    "southwest",
    "up",
    "down",
];

/// Built-in verb phrases. Multi-word phrases must come before their
/// one-word prefixes so longest-prefix matching stays simple.
const VERB_PHRASES: &[(&str, Verb)] = &[
    ("look at", Verb::Look),
    ("look in", Verb::Look),
    ("look inside", Verb::Look),
    ("look", Verb::Look),
    ("examine", Verb::Examine),
    ("inspect", Verb::Examine),
    ("pick up", Verb::Take),
    ("take off", Verb::Remove),
    ("take", Verb::Take),
    ("get", Verb::Take),
    ("grab", Verb::Take),
    ("put down", Verb::Drop),
    ("put on", Verb::Wear),
    ("put", Verb::Put),
    ("place", Verb::Put),
    ("insert", Verb::Put),
    ("drop", Verb::Drop),
    ("discard", Verb::Drop),
    ("inventory", Verb::Inventory),
    ("inv", Verb::Inventory),
    ("go", Verb::Go),
    ("walk", Verb::Go),
    ("head", Verb::Go),
    ("travel", Verb::Go),
    ("run", Verb::Go),
    ("use", Verb::Use),
    ("apply", Verb::Use),
    ("open", Verb::Open),
    ("close", Verb::Close),
    ("shut", Verb::Close),
    ("lock", Verb::Lock),
    ("unlock", Verb::Unlock),
    ("push", Verb::Push),
    ("shove", Verb::Push),
    ("press", Verb::Push),
    ("pull", Verb::Pull),
    ("yank", Verb::Pull),
    ("tug", Verb::Pull),
    ("turn", Verb::Turn),
    ("rotate", Verb::Turn),
    ("twist", Verb::Turn),
    ("touch", Verb::Touch),
    ("feel", Verb::Touch),
    ("search", Verb::Search),
    ("rummage through", Verb::Search),
    ("rummage", Verb::Search),
    ("read", Verb::Read),
    ("eat", Verb::Eat),
    ("devour", Verb::Eat),
    ("drink", Verb::Drink),
    ("sip", Verb::Drink),
    ("quaff", Verb::Drink),
    ("talk to", Verb::Talk),
    ("talk with", Verb::Talk),
    ("talk", Verb::Talk),
    ("speak to", Verb::Talk),
    ("speak with", Verb::Talk),
    ("speak", Verb::Talk),
    ("chat with", Verb::Talk),
    ("ask", Verb::Ask),
    ("give", Verb::Give),
    ("hand", Verb::Give),
    ("offer", Verb::Give),
    ("trade", Verb::Trade),
    ("barter", Verb::Trade),
    ("swap", Verb::Trade),
    ("wear", Verb::Wear),
    ("don", Verb::Wear),
    ("remove", Verb::Remove),
    ("doff", Verb::Remove),
    ("save", Verb::Save),
    ("load", Verb::Load),
    ("restore", Verb::Load),
    ("help", Verb::Help),
    ("score", Verb::Score),
    ("wait", Verb::Wait),
    ("yell", Verb::Yell),
    ("shout", Verb::Yell),
    ("scream", Verb::Yell),
    ("holler", Verb::Yell),
    ("restart", Verb::Restart),
    ("quit", Verb::Quit),
    ("exit", Verb::Quit),
];

/// Built-in single-token aliases expanded before anything else.
const ALIASES: &[(&str, &str)] = &[
    ("n", "go north"),
    ("s", "go south"),
    ("e", "go east"),
    ("w", "go west"),
    ("ne", "go northeast"),
    ("nw", "go northwest"),
    ("se", "go southeast"),
    ("sw", "go southwest"),
    ("u", "go up"),
    ("d", "go down"),
    ("x", "examine"),
    ("i", "inventory"),
    ("l", "look"),
    ("z", "wait"),
    ("q", "quit"),
];

/// The assembled lookup tables used by the parser.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Tokenized verb phrases, longest first.
    phrases: Vec<(Vec<String>, Verb)>,
    aliases: HashMap<String, String>,
    prepositions: HashSet<String>,
    directions: HashSet<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::built_in()
    }
}

impl Vocabulary {
    /// The engine's built-in tables alone.
    pub fn built_in() -> Vocabulary {
        let mut phrases: Vec<(Vec<String>, Verb)> = VERB_PHRASES
            .iter()
            .map(|(phrase, verb)| (phrase.split_whitespace().map(str::to_string).collect(), *verb))
            .collect();
        phrases.sort_by_key(|(tokens, _)| std::cmp::Reverse(tokens.len()));

        Vocabulary {
            phrases,
            aliases: ALIASES.iter().map(|(a, e)| ((*a).to_string(), (*e).to_string())).collect(),
            prepositions: PREPOSITIONS.iter().map(|p| (*p).to_string()).collect(),
            directions: DIRECTIONS.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    /// Built-in tables extended with a world package's vocabulary.
    pub fn with_world(def: &VocabularyDef) -> Vocabulary {
        let mut vocab = Vocabulary::built_in();
        for (word, canonical) in &def.synonyms {
            if let Some(verb) = Verb::from_name(canonical) {
                vocab
                    .phrases
                    .push((word.split_whitespace().map(str::to_string).collect(), verb));
            } else {
                warn!("vocabulary synonym '{word}' maps to unknown verb '{canonical}', skipped");
            }
        }
        vocab.phrases.sort_by_key(|(tokens, _)| std::cmp::Reverse(tokens.len()));
        for (alias, expansion) in &def.aliases {
            vocab.aliases.insert(alias.clone(), expansion.clone());
        }
        vocab
    }

    /// Expand a single-token alias, if one applies.
    pub fn expand_alias(&self, token: &str) -> Option<&str> {
        self.aliases.get(token).map(String::as_str)
    }

    /// Longest-prefix verb match over the token stream. Returns the verb
    /// and how many tokens it consumed.
    pub fn match_verb(&self, tokens: &[String]) -> Option<(Verb, usize)> {
        for (phrase, verb) in &self.phrases {
            if phrase.len() <= tokens.len() && tokens[..phrase.len()] == phrase[..] {
                return Some((*verb, phrase.len()));
            }
        }
        None
    }

    pub fn is_preposition(&self, token: &str) -> bool {
        self.prepositions.contains(token)
    }

    pub fn is_direction(&self, token: &str) -> bool {
        self.directions.contains(token)
    }

    pub fn is_article(token: &str) -> bool {
        ARTICLES.contains(&token)
    }
}
