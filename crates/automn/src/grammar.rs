//! Core structures and parsing logic for Tree-sitter grammars.
//!
//! This module defines the internal representation of a grammar as parsed from
//! Tree-sitter's JSON format. It uses [`serde_json`] for deserialization and
//! provides accessors for inspecting rule properties and structure.

use serde::Deserialize;
use std::collections::HashMap;

use crate::validate::ValidationError;

/// Rule nodes of the grammar JSON schema.
pub mod rules;

pub use rules::{Rule, RuleType, RuleValue};

/// Represents a full Tree-sitter grammar definition.
///
/// This structure mirrors the serialized JSON format written by
/// `tree-sitter generate` to `src/grammar.json`. It captures the complete rule
/// set along with auxiliary metadata such as externals, precedences,
/// conflicts, and supertypes.
///
/// See <https://tree-sitter.github.io/tree-sitter/assets/schemas/grammar.schema.json>
#[derive(Debug, Clone, Deserialize)]
pub struct Grammar {
    /// Optional `$schema` field from the JSON, typically used for schema
    /// validation or editor integration.
    #[serde(rename = "$schema", default)]
    pub schema: Option<String>,

    /// The short name of the grammar (e.g. `"automn"`).
    pub name: String,

    /// Optional name of a base grammar that this one inherits from.
    #[serde(default)]
    pub inherits: Option<String>,

    /// Map of all rule identifiers to their corresponding definitions.
    pub rules: HashMap<String, Rule>,

    /// Tokens that may appear between other tokens, such as whitespace.
    #[serde(default)]
    pub extras: Option<Vec<Rule>>,

    /// Tokens produced by the external scanner, in scanner order.
    #[serde(default)]
    pub externals: Option<Vec<Rule>>,

    /// Names of rules that should be inlined into other rules.
    #[serde(default)]
    pub inline: Option<Vec<String>>,

    /// Precedence declarations that control operator binding order.
    #[serde(default)]
    pub precedences: Option<Vec<Vec<Precedence>>>,

    /// Explicit conflict groups expected during parsing.
    #[serde(default)]
    pub conflicts: Option<Vec<Vec<String>>>,

    /// Context-specific reserved word definitions.
    #[serde(default)]
    pub reserved: Option<HashMap<String, Vec<Rule>>>,

    /// The special rule name used to identify word tokens.
    #[serde(default)]
    pub word: Option<String>,

    /// A list of node supertypes, grouping related syntactic forms.
    #[serde(default)]
    pub supertypes: Option<Vec<String>>,
}

/// A single precedence entry, either a named symbol or a literal string value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Precedence {
    /// A literal precedence string.
    #[serde(rename = "STRING")]
    String {
        /// The precedence name.
        value: String,
    },

    /// A symbolic precedence name.
    #[serde(rename = "SYMBOL")]
    Symbol {
        /// The identifier of the referenced symbol.
        name: String,
    },
}

/// Parse a JSON grammar definition into a strongly typed [`Grammar`] structure.
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the provided string is not valid JSON
/// or fails schema deserialization.
pub fn parse_grammar(json: &str) -> Result<Grammar, GrammarError> {
    serde_json::from_str(json).map_err(|e| GrammarError::JsonParse(e.to_string()))
}

/// Possible errors raised during grammar parsing or validation.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    /// The input JSON was syntactically invalid or structurally mismatched.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Higher-level structural or semantic validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl Grammar {
    /// Looks up a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Returns the rule names in sorted order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of the external tokens declared as symbols, in declaration order.
    #[must_use]
    pub fn external_names(&self) -> Vec<&str> {
        self.externals
            .iter()
            .flatten()
            .filter_map(Rule::symbol_name)
            .collect()
    }

    /// Returns `true` if `name` is listed in the grammar's `inline` set.
    #[must_use]
    pub fn is_inlined(&self, name: &str) -> bool {
        self.inline
            .as_ref()
            .is_some_and(|v| v.iter().any(|n| n == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_grammar() {
        let json = r#"{
            "name": "test",
            "rules": {
                "source_file": {
                    "type": "SYMBOL",
                    "name": "expression"
                },
                "expression": {
                    "type": "CHOICE",
                    "members": [
                        {
                            "type": "STRING",
                            "value": "hello"
                        },
                        {
                            "type": "PATTERN",
                            "value": "[0-9]+"
                        }
                    ]
                }
            }
        }"#;

        let grammar = parse_grammar(json).unwrap();
        assert_eq!(grammar.name, "test");
        assert_eq!(grammar.rules.len(), 2);
        assert_eq!(grammar.rule_names(), vec!["expression", "source_file"]);
        assert!(grammar.external_names().is_empty());
    }

    #[test]
    fn test_parse_embedded_grammar() {
        let grammar = parse_grammar(crate::GRAMMAR_JSON).unwrap();
        assert_eq!(grammar.name, "automn");
        assert_eq!(
            grammar.external_names(),
            vec!["indent", "dedent", "newline", "end"]
        );

        let inline_enum = grammar.rule("inline_enum").unwrap();
        assert_eq!(inline_enum.rule_type, RuleType::PrecLeft);
        assert_eq!(inline_enum.precedence(), Some(2));

        let documentation = grammar.rule("documentation").unwrap();
        assert_eq!(documentation.pattern_value(), Some("[^\\n\\r]*"));
        assert!(!grammar.is_inlined("documentation"));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_grammar("{\"name\": \"automn\", \"rules\": ").unwrap_err();
        assert!(matches!(err, GrammarError::JsonParse(_)));
        assert!(err.to_string().starts_with("JSON parse error"));
    }

    #[test]
    fn test_parse_errors_are_single_plain_lines() {
        let json = r#"{"name": "automn", "rules": {"x": {"type": "SEQ", "members": 3}}}"#;
        let err = parse_grammar(json).unwrap_err();
        let message = err.to_string();
        assert!(!message.contains('\n'), "{message:?}");
        assert!(!message.contains('\u{1b}'), "{message:?}");
        assert!(message.contains("line 1"), "{message:?}");
    }

    #[test]
    fn test_parse_precedence_lists() {
        let json = r#"{
            "name": "test",
            "precedences": [[
                {"type": "STRING", "value": "member"},
                {"type": "SYMBOL", "name": "call"}
            ]],
            "rules": {"source_file": {"type": "BLANK"}}
        }"#;

        let grammar = parse_grammar(json).unwrap();
        assert_eq!(
            grammar.precedences,
            Some(vec![vec![
                Precedence::String {
                    value: "member".to_string()
                },
                Precedence::Symbol {
                    name: "call".to_string()
                },
            ]])
        );
    }
}
