//! Validation routines for Tree-sitter grammars.
//!
//! This module performs structural checks over parsed [`Grammar`](crate::grammar::Grammar)
//! definitions: every rule node must be complete, every symbol reference must
//! resolve, and the start rule must exist. Softer issues (unreachable rules,
//! mixed precedence levels) are reported as [`Finding`]s and only fail
//! validation in strict mode.

use crate::grammar::{Grammar, Rule, RuleType, RuleValue};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Represents a validation failure encountered when checking a grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The descriptive human-readable error message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new [`ValidationError`] from a message string.
    fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// A non-fatal issue found in an otherwise well-formed grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A rule that cannot be reached from the start rule.
    UnreachableRule(String),
    /// A rule whose body declares more than one precedence level.
    MixedPrecedence {
        /// The rule carrying the precedence wrappers.
        rule: String,
        /// The distinct levels, ascending.
        levels: Vec<i32>,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UnreachableRule(name) => write!(f, "unreachable rule '{name}'"),
            Finding::MixedPrecedence { rule, levels } => {
                write!(f, "rule '{rule}' has multiple precedence levels: {levels:?}")
            }
        }
    }
}

/// Knobs for [`validate`].
#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions<'a> {
    /// The rule parsing starts from.
    pub start_rule: &'a str,
    /// Treat every [`Finding`] as an error.
    pub strict: bool,
}

/// Performs semantic validation of a parsed [`Grammar`](crate::grammar::Grammar).
///
/// This function runs several consistency passes over the grammar:
///
/// - Checks that the grammar has rules and that the start rule is defined.
/// - Checks that every rule node carries the fields its type requires.
/// - Checks that all referenced symbols are defined as rules or externals.
/// - Reports unreachable rules and mixed precedence levels.
///
/// The passes recurse once per level of rule nesting, so stack use grows with
/// the deepest rule in the definition.
///
/// # Errors
///
/// Returns a [`ValidationError`] if any structural rule violation is detected,
/// or, in strict mode, for the first finding.
pub fn validate(
    grammar: &Grammar,
    options: &ValidateOptions<'_>,
) -> Result<Vec<Finding>, ValidationError> {
    check_entry_point(grammar, options.start_rule)?;

    // Check every rule node is complete
    check_shapes(grammar)?;

    // Check for undefined symbol references
    check_undefined_symbols(grammar)?;

    let mut findings = unreachable_rules(grammar, options.start_rule);
    findings.extend(mixed_precedence(grammar));

    // Detect immediate left recursion, which the LR generator handles fine
    check_left_recursion(grammar);

    if options.strict {
        if let Some(first) = findings.first() {
            return Err(ValidationError::new(first.to_string()));
        }
    } else {
        for finding in &findings {
            warn!(grammar = %grammar.name, "{finding}");
        }
    }

    Ok(findings)
}

fn check_entry_point(grammar: &Grammar, start_rule: &str) -> Result<(), ValidationError> {
    if grammar.rules.is_empty() {
        return Err(ValidationError::new("grammar has no rules"));
    }
    if !grammar.rules.contains_key(start_rule) {
        return Err(ValidationError::new(format!(
            "start rule '{start_rule}' is not defined"
        )));
    }
    Ok(())
}

fn check_shapes(grammar: &Grammar) -> Result<(), ValidationError> {
    for name in grammar.rule_names() {
        if let Some(rule) = grammar.rule(name) {
            check_rule_shape(rule, name)?;
        }
    }
    for rule in grammar.extras.iter().flatten() {
        check_rule_shape(rule, "extras")?;
    }
    for rule in grammar.externals.iter().flatten() {
        check_rule_shape(rule, "externals")?;
    }
    Ok(())
}

fn check_rule_shape(rule: &Rule, context: &str) -> Result<(), ValidationError> {
    let incomplete = |what: &str| {
        ValidationError::new(format!(
            "{} node in rule '{context}' has no {what}",
            rule.type_name()
        ))
    };

    match rule.rule_type {
        RuleType::Blank => {}

        RuleType::String | RuleType::Pattern => {
            if rule.text_value().is_none() {
                return Err(incomplete("string value"));
            }
        }

        RuleType::Symbol => {
            if rule.name.as_deref().is_none_or(str::is_empty) {
                return Err(incomplete("name"));
            }
        }

        RuleType::Choice | RuleType::Seq => {
            if rule.members.as_ref().is_none_or(Vec::is_empty) {
                return Err(incomplete("members"));
            }
        }

        RuleType::Repeat | RuleType::Repeat1 | RuleType::Token | RuleType::ImmediateToken => {
            if rule.content.is_none() {
                return Err(incomplete("content"));
            }
        }

        RuleType::Prec | RuleType::PrecLeft | RuleType::PrecRight => {
            if rule.content.is_none() {
                return Err(incomplete("content"));
            }
            if rule.value.is_none() {
                return Err(incomplete("precedence value"));
            }
        }

        RuleType::PrecDynamic => {
            if rule.content.is_none() {
                return Err(incomplete("content"));
            }
            if !matches!(rule.value, Some(RuleValue::Integer(_))) {
                return Err(incomplete("integer precedence value"));
            }
        }

        RuleType::Field => {
            if rule.name.as_deref().is_none_or(str::is_empty) {
                return Err(incomplete("name"));
            }
            if rule.content.is_none() {
                return Err(incomplete("content"));
            }
        }

        RuleType::Alias => {
            if rule.text_value().is_none() {
                return Err(incomplete("alias value"));
            }
            if rule.content.is_none() {
                return Err(incomplete("content"));
            }
        }

        RuleType::Reserved => {
            if rule.context_name.is_none() {
                return Err(incomplete("context name"));
            }
            if rule.content.is_none() {
                return Err(incomplete("content"));
            }
        }
    }

    for child in rule.children() {
        check_rule_shape(child, context)?;
    }
    Ok(())
}

fn check_undefined_symbols(grammar: &Grammar) -> Result<(), ValidationError> {
    let mut defined: HashSet<&str> = grammar.rules.keys().map(String::as_str).collect();
    defined.extend(grammar.external_names());

    for name in grammar.rule_names() {
        if let Some(rule) = grammar.rule(name) {
            check_rule_symbols(rule, &defined, name)?;
        }
    }
    for rule in grammar.extras.iter().flatten() {
        check_rule_symbols(rule, &defined, "extras")?;
    }

    let listed = grammar
        .inline
        .iter()
        .flatten()
        .map(|n| ("inline", n))
        .chain(grammar.supertypes.iter().flatten().map(|n| ("supertypes", n)))
        .chain(grammar.word.iter().map(|n| ("word", n)))
        .chain(grammar.conflicts.iter().flatten().flatten().map(|n| ("conflicts", n)));
    for (section, name) in listed {
        if !defined.contains(name.as_str()) {
            return Err(ValidationError::new(format!(
                "undefined symbol '{name}' listed in {section}"
            )));
        }
    }

    Ok(())
}

fn check_rule_symbols(
    rule: &Rule,
    defined: &HashSet<&str>,
    context: &str,
) -> Result<(), ValidationError> {
    if let Some(name) = rule.symbol_name() {
        if !defined.contains(name) {
            return Err(ValidationError::new(format!(
                "undefined symbol '{name}' referenced in rule '{context}'"
            )));
        }
    }
    for child in rule.children() {
        check_rule_symbols(child, defined, context)?;
    }
    Ok(())
}

fn unreachable_rules(grammar: &Grammar, start_rule: &str) -> Vec<Finding> {
    let mut reachable = HashSet::new();
    let mut to_visit = vec![start_rule.to_string()];
    for rule in grammar.extras.iter().flatten() {
        collect_referenced_symbols(rule, &mut to_visit);
    }

    while let Some(rule_name) = to_visit.pop() {
        if !reachable.insert(rule_name.clone()) {
            continue; // Already visited
        }

        if let Some(rule) = grammar.rule(&rule_name) {
            collect_referenced_symbols(rule, &mut to_visit);
        }
    }

    grammar
        .rule_names()
        .into_iter()
        .filter(|name| !reachable.contains(*name) && !grammar.is_inlined(name))
        .map(|name| Finding::UnreachableRule(name.to_string()))
        .collect()
}

fn collect_referenced_symbols(rule: &Rule, symbols: &mut Vec<String>) {
    if let Some(name) = rule.symbol_name() {
        symbols.push(name.to_string());
    }
    for child in rule.children() {
        collect_referenced_symbols(child, symbols);
    }
}

fn check_left_recursion(grammar: &Grammar) {
    for name in grammar.rule_names() {
        if grammar
            .rule(name)
            .is_some_and(|rule| has_immediate_left_recursion(rule, name))
        {
            debug!(grammar = %grammar.name, rule = name, "rule is left-recursive");
        }
    }
}

fn has_immediate_left_recursion(rule: &Rule, target: &str) -> bool {
    match rule.rule_type {
        RuleType::Symbol => rule.name.as_deref() == Some(target),

        RuleType::Seq => rule
            .members
            .as_ref()
            .and_then(|members| members.first())
            .is_some_and(|first| has_immediate_left_recursion(first, target)),

        RuleType::Choice => rule
            .members
            .iter()
            .flatten()
            .any(|member| has_immediate_left_recursion(member, target)),

        RuleType::Prec
        | RuleType::PrecLeft
        | RuleType::PrecRight
        | RuleType::PrecDynamic
        | RuleType::Field
        | RuleType::Alias => rule
            .content
            .as_deref()
            .is_some_and(|content| has_immediate_left_recursion(content, target)),

        _ => false,
    }
}

fn mixed_precedence(grammar: &Grammar) -> Vec<Finding> {
    let mut prec_levels: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();

    for name in grammar.rule_names() {
        if let Some(rule) = grammar.rule(name) {
            collect_precedence_levels(rule, prec_levels.entry(name).or_default());
        }
    }

    prec_levels
        .into_iter()
        .filter(|(_, levels)| levels.len() > 1)
        .map(|(rule, levels)| Finding::MixedPrecedence {
            rule: rule.to_string(),
            levels: levels.into_iter().collect(),
        })
        .collect()
}

fn collect_precedence_levels(rule: &Rule, levels: &mut BTreeSet<i32>) {
    if let Some(p) = rule.precedence() {
        levels.insert(p);
    }
    for child in rule.children() {
        collect_precedence_levels(child, levels);
    }
}
