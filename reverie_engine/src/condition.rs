//! The scripted-event condition language.
//!
//! A deliberately small expression grammar over flag names: `!`, `&&`,
//! `||` with standard precedence (word forms `not`/`and`/`or` also
//! accepted), parentheses, and comparisons between flags and literals.
//! An empty or absent condition is true; an unknown flag is false.
//! `score`, `moves`, and `health` resolve as built-in numeric flags.

use log::warn;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::state::{FlagValue, GameState};

#[derive(Parser)]
#[grammar = "condition.pest"]
struct ConditionParser;

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Flag(String),
    Literal(FlagValue),
    Compare { left: Operand, op: CmpOp, right: Operand },
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Flag(String),
    Literal(FlagValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

/// Parse a condition expression.
///
/// # Errors
/// Returns the pest error message when the source does not match the
/// grammar.
pub fn parse_condition(source: &str) -> Result<Expr, String> {
    let mut pairs = ConditionParser::parse(Rule::expression, source).map_err(|e| e.to_string())?;
    let expression = pairs.next().ok_or_else(|| "empty parse".to_string())?;
    let or_expr = expression
        .into_inner()
        .find(|p| p.as_rule() == Rule::or_expr)
        .ok_or_else(|| "missing expression body".to_string())?;
    Ok(build_or(or_expr))
}

fn build_or(pair: Pair<Rule>) -> Expr {
    let terms: Vec<Expr> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::and_expr)
        .map(build_and)
        .collect();
    if terms.len() == 1 {
        terms.into_iter().next().expect("one term")
    } else {
        Expr::Or(terms)
    }
}

fn build_and(pair: Pair<Rule>) -> Expr {
    let terms: Vec<Expr> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::not_expr)
        .map(build_not)
        .collect();
    if terms.len() == 1 {
        terms.into_iter().next().expect("one term")
    } else {
        Expr::And(terms)
    }
}

fn build_not(pair: Pair<Rule>) -> Expr {
    let mut negations = 0;
    let mut inner = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::not_op => negations += 1,
            Rule::primary => inner = Some(build_primary(p)),
            _ => {},
        }
    }
    let mut expr = inner.unwrap_or(Expr::Literal(FlagValue::Bool(true)));
    for _ in 0..negations {
        expr = Expr::Not(Box::new(expr));
    }
    expr
}

fn build_primary(pair: Pair<Rule>) -> Expr {
    let inner = pair.into_inner().next().expect("primary has inner");
    match inner.as_rule() {
        Rule::comparison => {
            let mut parts = inner.into_inner();
            let left = build_operand(parts.next().expect("left operand"));
            let op = match parts.next().expect("cmp op").as_str() {
                "==" | "=" => CmpOp::Eq,
                "!=" => CmpOp::Ne,
                ">=" => CmpOp::Ge,
                "<=" => CmpOp::Le,
                ">" => CmpOp::Gt,
                _ => CmpOp::Lt,
            };
            let right = build_operand(parts.next().expect("right operand"));
            Expr::Compare { left, op, right }
        },
        Rule::or_expr => build_or(inner),
        Rule::literal => Expr::Literal(build_literal(inner)),
        Rule::ident => Expr::Flag(inner.as_str().to_string()),
        rule => unreachable!("unexpected rule in primary: {rule:?}"),
    }
}

fn build_operand(pair: Pair<Rule>) -> Operand {
    let inner = pair.into_inner().next().expect("operand has inner");
    match inner.as_rule() {
        Rule::literal => Operand::Literal(build_literal(inner)),
        Rule::ident => Operand::Flag(inner.as_str().to_string()),
        rule => unreachable!("unexpected rule in operand: {rule:?}"),
    }
}

fn build_literal(pair: Pair<Rule>) -> FlagValue {
    let inner = pair.into_inner().next().expect("literal has inner");
    match inner.as_rule() {
        Rule::boolean => FlagValue::Bool(inner.as_str() == "true"),
        Rule::number => FlagValue::Int(inner.as_str().parse().unwrap_or(0)),
        Rule::string => {
            let raw = inner.as_str();
            FlagValue::Str(raw[1..raw.len() - 1].to_string())
        },
        rule => unreachable!("unexpected rule in literal: {rule:?}"),
    }
}

/// Evaluate a parsed expression against a flag lookup.
pub fn eval_expr(expr: &Expr, lookup: &impl Fn(&str) -> Option<FlagValue>) -> bool {
    match expr {
        Expr::Or(terms) => terms.iter().any(|t| eval_expr(t, lookup)),
        Expr::And(terms) => terms.iter().all(|t| eval_expr(t, lookup)),
        Expr::Not(inner) => !eval_expr(inner, lookup),
        Expr::Flag(name) => lookup(name).is_some_and(|v| v.is_truthy()),
        Expr::Literal(value) => value.is_truthy(),
        Expr::Compare { left, op, right } => {
            let (Some(l), Some(r)) = (resolve(left, lookup), resolve(right, lookup)) else {
                return false;
            };
            compare(&l, *op, &r)
        },
    }
}

fn resolve(operand: &Operand, lookup: &impl Fn(&str) -> Option<FlagValue>) -> Option<FlagValue> {
    match operand {
        Operand::Flag(name) => lookup(name),
        Operand::Literal(value) => Some(value.clone()),
    }
}

fn compare(left: &FlagValue, op: CmpOp, right: &FlagValue) -> bool {
    use FlagValue::{Bool, Int, Str};
    match (left, right) {
        (Int(l), Int(r)) => match op {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            CmpOp::Ge => l >= r,
            CmpOp::Le => l <= r,
            CmpOp::Gt => l > r,
            CmpOp::Lt => l < r,
        },
        (Str(l), Str(r)) => match op {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            CmpOp::Ge => l >= r,
            CmpOp::Le => l <= r,
            CmpOp::Gt => l > r,
            CmpOp::Lt => l < r,
        },
        (Bool(l), Bool(r)) => match op {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            // ordering booleans is nonsense in this language
            _ => false,
        },
        _ => false,
    }
}

/// Evaluate an optional condition string against the overlay.
///
/// Empty or absent conditions are true; a condition that fails to parse
/// is logged and evaluates false.
pub fn eval_condition(source: Option<&str>, state: &GameState) -> bool {
    let Some(source) = source else { return true };
    if source.trim().is_empty() {
        return true;
    }
    match parse_condition(source) {
        Ok(expr) => eval_expr(&expr, &|name| state_lookup(state, name)),
        Err(err) => {
            warn!("condition '{source}' failed to parse: {err}");
            false
        },
    }
}

/// Flag lookup with the engine's built-in numeric pseudo-flags.
fn state_lookup(state: &GameState, name: &str) -> Option<FlagValue> {
    match name {
        "score" => Some(FlagValue::Int(i64::from(state.score))),
        "moves" => Some(FlagValue::Int(i64::try_from(state.moves).unwrap_or(i64::MAX))),
        "health" => Some(FlagValue::Int(i64::from(state.health))),
        _ => state.flags.get(name).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn flags(pairs: &[(&str, FlagValue)]) -> BTreeMap<String, FlagValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn eval(src: &str, table: &BTreeMap<String, FlagValue>) -> bool {
        let expr = parse_condition(src).unwrap();
        eval_expr(&expr, &|name| table.get(name).cloned())
    }

    #[test]
    fn bare_flag_is_truthiness() {
        let table = flags(&[("doorOpen", FlagValue::Bool(true)), ("count", FlagValue::Int(0))]);
        assert!(eval("doorOpen", &table));
        assert!(!eval("count", &table));
        assert!(!eval("unknownFlag", &table));
    }

    #[test]
    fn negation_and_word_forms() {
        let table = flags(&[("lit", FlagValue::Bool(true))]);
        assert!(!eval("!lit", &table));
        assert!(!eval("not lit", &table));
        assert!(eval("!!lit", &table));
        assert!(eval("not not lit", &table));
        assert!(eval("!missing", &table));
    }

    #[test]
    fn and_or_precedence() {
        let table = flags(&[("a", FlagValue::Bool(true)), ("b", FlagValue::Bool(false))]);
        // a || b && b  parses as  a || (b && b)
        assert!(eval("a || b && b", &table));
        assert!(!eval("(a || b) && b", &table));
        assert!(eval("a and a or b", &table));
        assert!(eval("b or a", &table));
    }

    #[test]
    fn numeric_comparisons() {
        let table = flags(&[("karma", FlagValue::Int(50))]);
        assert!(eval("karma >= 50", &table));
        assert!(eval("karma > 49", &table));
        assert!(!eval("karma < 50", &table));
        assert!(eval("karma == 50", &table));
        assert!(eval("karma != 49", &table));
        assert!(eval("10 < 20", &table));
    }

    #[test]
    fn string_comparison_and_single_equals() {
        let table = flags(&[("path", FlagValue::Str("hero".into()))]);
        assert!(eval("path == \"hero\"", &table));
        assert!(eval("path = 'hero'", &table));
        assert!(!eval("path == \"villain\"", &table));
    }

    #[test]
    fn unknown_flag_in_comparison_is_false() {
        let table = flags(&[]);
        assert!(!eval("mystery >= 1", &table));
        assert!(!eval("mystery == 0", &table));
    }

    #[test]
    fn mixed_type_comparison_is_false() {
        let table = flags(&[("n", FlagValue::Int(1)), ("s", FlagValue::Str("1".into()))]);
        assert!(!eval("n == s", &table));
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        let table = flags(&[
            ("notable", FlagValue::Bool(true)),
            ("order", FlagValue::Bool(true)),
            ("android", FlagValue::Bool(true)),
        ]);
        assert!(eval("notable", &table));
        assert!(eval("order && android", &table));
    }

    #[test]
    fn parse_failure_reported() {
        assert!(parse_condition("&& broken").is_err());
        assert!(parse_condition("(unbalanced").is_err());
    }

    #[test]
    fn empty_condition_is_true_via_state() {
        let world = crate::world::World::from_def(reverie_data::WorldDef {
            game: reverie_data::GameDef {
                title: "t".into(),
                player: reverie_data::PlayerDef {
                    name: "p".into(),
                    start_room: "r".into(),
                    ..reverie_data::PlayerDef::default()
                },
                ..reverie_data::GameDef::default()
            },
            rooms: vec![reverie_data::RoomDef {
                id: "r".into(),
                name: "R".into(),
                description: "d".into(),
                ..reverie_data::RoomDef::default()
            }],
            ..reverie_data::WorldDef::default()
        })
        .unwrap();
        let state = GameState::new(&world);
        assert!(eval_condition(None, &state));
        assert!(eval_condition(Some("   "), &state));
        assert!(!eval_condition(Some("ghost_flag"), &state));
        assert!(eval_condition(Some("score == 0"), &state));
        assert!(eval_condition(Some("health >= 100"), &state));
    }
}
