//! Core types for representing Tree-sitter grammar rules.
//!
//! This module contains the types used to model grammar rules and their
//! structure according to the Tree-sitter JSON schema.

use serde::Deserialize;

/// Represents a grammar rule in the Tree-sitter format.
///
/// Each rule corresponds to a node in the grammar's rule graph, identified by a
/// [`RuleType`] and containing type-specific fields such as `members` or
/// `content`.
///
/// A `Rule` can be atomic (like a literal or regex) or composite
/// (like a sequence, choice, or precedence group).
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// The discriminant identifying what kind of rule this is.
    #[serde(rename = "type")]
    pub rule_type: RuleType,

    /// Optional literal or numeric value, depending on rule kind.
    ///
    /// `STRING` and `PATTERN` carry their text here, `ALIAS` its node name,
    /// and the `PREC*` family their precedence.
    #[serde(default)]
    pub value: Option<RuleValue>,

    /// Optional name used by `SYMBOL` and `FIELD` rules.
    #[serde(default)]
    pub name: Option<String>,

    /// Optional nested rule for unary constructs such as `REPEAT` or `PREC`.
    #[serde(default)]
    pub content: Option<Box<Rule>>,

    /// Optional list of child rules for compound constructs (`SEQ`, `CHOICE`).
    #[serde(default)]
    pub members: Option<Vec<Rule>>,

    /// Whether the node produced by an `ALIAS` rule is named.
    #[serde(default)]
    pub named: Option<bool>,

    /// Regex flags attached to a `PATTERN` rule.
    #[serde(default)]
    pub flags: Option<String>,

    /// Context label used by `RESERVED` rules.
    #[serde(default)]
    pub context_name: Option<String>,
}

/// A literal or numeric value attached to a rule node.
///
/// The grammar JSON stores these as bare scalars, so the variant is picked by
/// the JSON type rather than by a tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// A string literal value (e.g. `"->"`, `"true"`).
    String(String),

    /// An integer numeric value (used by precedence modifiers).
    Integer(i32),
}

/// The enumeration of all recognized Tree-sitter rule types.
///
/// Each variant corresponds to one of the `type` strings found in the JSON
/// grammar format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RuleType {
    /// An empty production.
    #[serde(rename = "BLANK")]
    Blank,
    /// A literal string token.
    #[serde(rename = "STRING")]
    String,
    /// A regular-expression pattern token.
    #[serde(rename = "PATTERN")]
    Pattern,
    /// A reference to another named rule.
    #[serde(rename = "SYMBOL")]
    Symbol,
    /// A rule that matches one of several alternatives.
    #[serde(rename = "CHOICE")]
    Choice,
    /// A sequential composition of member rules.
    #[serde(rename = "SEQ")]
    Seq,
    /// A zero-or-more repetition of a rule.
    #[serde(rename = "REPEAT")]
    Repeat,
    /// A one-or-more repetition of a rule.
    #[serde(rename = "REPEAT1")]
    Repeat1,
    /// A generic precedence wrapper.
    #[serde(rename = "PREC")]
    Prec,
    /// A left-associative precedence wrapper.
    #[serde(rename = "PREC_LEFT")]
    PrecLeft,
    /// A right-associative precedence wrapper.
    #[serde(rename = "PREC_RIGHT")]
    PrecRight,
    /// A dynamic (runtime) precedence wrapper.
    #[serde(rename = "PREC_DYNAMIC")]
    PrecDynamic,
    /// A named field applied to a subrule.
    #[serde(rename = "FIELD")]
    Field,
    /// An alias providing an alternate node name.
    #[serde(rename = "ALIAS")]
    Alias,
    /// A tokenization wrapper.
    #[serde(rename = "TOKEN")]
    Token,
    /// A token that must appear immediately without leading trivia.
    #[serde(rename = "IMMEDIATE_TOKEN")]
    ImmediateToken,
    /// A reserved-word context wrapper.
    #[serde(rename = "RESERVED")]
    Reserved,
}

impl RuleType {
    /// Returns the canonical string name of this rule type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::Blank => "BLANK",
            RuleType::String => "STRING",
            RuleType::Pattern => "PATTERN",
            RuleType::Symbol => "SYMBOL",
            RuleType::Choice => "CHOICE",
            RuleType::Seq => "SEQ",
            RuleType::Repeat => "REPEAT",
            RuleType::Repeat1 => "REPEAT1",
            RuleType::Prec => "PREC",
            RuleType::PrecLeft => "PREC_LEFT",
            RuleType::PrecRight => "PREC_RIGHT",
            RuleType::PrecDynamic => "PREC_DYNAMIC",
            RuleType::Field => "FIELD",
            RuleType::Alias => "ALIAS",
            RuleType::Token => "TOKEN",
            RuleType::ImmediateToken => "IMMEDIATE_TOKEN",
            RuleType::Reserved => "RESERVED",
        }
    }

    /// Returns `true` for the `PREC`, `PREC_LEFT`, `PREC_RIGHT` and
    /// `PREC_DYNAMIC` wrappers.
    #[must_use]
    pub fn is_precedence(self) -> bool {
        matches!(
            self,
            RuleType::Prec | RuleType::PrecLeft | RuleType::PrecRight | RuleType::PrecDynamic
        )
    }
}

impl Rule {
    /// Returns the canonical string name of this rule type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.rule_type.as_str()
    }

    /// Returns `true` if this rule represents a terminal (lexical) token.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.rule_type, RuleType::String | RuleType::Pattern)
    }

    /// Returns `true` if this rule is a symbol reference.
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(self.rule_type, RuleType::Symbol)
    }

    /// Returns the referenced symbol name, if applicable.
    #[must_use]
    pub fn symbol_name(&self) -> Option<&str> {
        if self.is_symbol() {
            self.name.as_deref()
        } else {
            None
        }
    }

    /// Returns the numeric precedence value if this rule is a precedence wrapper.
    ///
    /// Named precedences (string values) yield `None`.
    #[must_use]
    pub fn precedence(&self) -> Option<i32> {
        if self.rule_type.is_precedence() {
            self.value.as_ref().and_then(|v| match v {
                RuleValue::Integer(i) => Some(*i),
                RuleValue::String(_) => None,
            })
        } else {
            None
        }
    }

    /// Returns the literal string value if this is a `STRING` rule.
    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        if matches!(self.rule_type, RuleType::String) {
            self.text_value()
        } else {
            None
        }
    }

    /// Returns the pattern source if this is a `PATTERN` rule.
    #[must_use]
    pub fn pattern_value(&self) -> Option<&str> {
        if matches!(self.rule_type, RuleType::Pattern) {
            self.text_value()
        } else {
            None
        }
    }

    /// Returns the string payload of `value`, whatever the rule type.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| match v {
            RuleValue::String(s) => Some(s.as_str()),
            RuleValue::Integer(_) => None,
        })
    }

    /// Iterates over the direct children of this rule: `members` for
    /// compound rules, `content` for wrappers.
    pub fn children(&self) -> impl Iterator<Item = &Rule> {
        self.members
            .iter()
            .flatten()
            .chain(self.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixin_rule() {
        let json = r#"{
            "type": "SEQ",
            "members": [
                {"type": "STRING", "value": "&"},
                {"type": "SYMBOL", "name": "identifier"}
            ]
        }"#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.type_name(), "SEQ");
        let children: Vec<_> = rule.children().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].string_value(), Some("&"));
        assert_eq!(children[1].symbol_name(), Some("identifier"));
    }

    #[test]
    fn test_parse_precedence() {
        let json = r#"{
            "type": "PREC_LEFT",
            "value": 2,
            "content": {
                "type": "SEQ",
                "members": [
                    {"type": "SYMBOL", "name": "variant_identifier"},
                    {"type": "STRING", "value": ","},
                    {"type": "SYMBOL", "name": "variant_identifier"}
                ]
            }
        }"#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.precedence(), Some(2));
        assert_eq!(rule.rule_type, RuleType::PrecLeft);
        assert_eq!(rule.children().count(), 1);
    }

    #[test]
    fn test_pattern_value_only_for_patterns() {
        let json = r#"{"type": "PATTERN", "value": "[a-zA-Z_][a-zA-Z0-9_-]*"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(rule.is_terminal());
        assert_eq!(rule.pattern_value(), Some("[a-zA-Z_][a-zA-Z0-9_-]*"));
        assert_eq!(rule.string_value(), None);
        assert_eq!(rule.precedence(), None);
    }

    #[test]
    fn test_values_are_bare_scalars() {
        let json = r#"{
            "type": "PREC",
            "value": "member",
            "content": {"type": "STRING", "value": "/"}
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.value, Some(RuleValue::String("member".to_string())));
        assert_eq!(rule.precedence(), None);
        assert_eq!(rule.children().next().unwrap().string_value(), Some("/"));

        let json = r#"{"type": "PREC_DYNAMIC", "value": -1, "content": {"type": "BLANK"}}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.value, Some(RuleValue::Integer(-1)));
        assert_eq!(rule.precedence(), Some(-1));
    }

    #[test]
    fn test_alias_and_reserved_fields() {
        let json = r#"{
            "type": "ALIAS",
            "value": "key",
            "named": true,
            "content": {
                "type": "RESERVED",
                "context_name": "properties",
                "content": {"type": "SYMBOL", "name": "identifier"}
            }
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.rule_type, RuleType::Alias);
        assert_eq!(rule.text_value(), Some("key"));
        assert_eq!(rule.named, Some(true));

        let reserved = rule.children().next().unwrap();
        assert_eq!(reserved.rule_type, RuleType::Reserved);
        assert_eq!(reserved.context_name.as_deref(), Some("properties"));
    }

    #[test]
    fn test_unknown_rule_type_is_rejected() {
        let result = serde_json::from_str::<Rule>(r#"{"type": "LOOKAHEAD"}"#);
        assert!(result.is_err());
    }
}
