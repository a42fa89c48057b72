//! The runtime side of the loader contract.
//!
//! [`Language::new`] takes a borrowed [`GrammarHandle`], checks that its table
//! version is one this runtime understands, parses and validates the grammar
//! definition, and builds the symbol and field tables used to name nodes.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::LoaderError;
use crate::grammar::{parse_grammar, Grammar, Rule, RuleType};
use crate::handle::{GrammarHandle, LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION};
use crate::scanner::Scanner;
use crate::validate::{validate, Finding, ValidateOptions, ValidationError};

/// Name of the builtin end-of-input symbol, always symbol `0`.
const BUILTIN_END: &str = "end";

/// Settings for [`Language::with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Promote validation findings (unreachable rules, mixed precedence) to errors.
    pub strict: bool,
    /// Oldest accepted table version.
    pub min_version: u32,
    /// Newest accepted table version.
    pub max_version: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            min_version: MIN_COMPATIBLE_LANGUAGE_VERSION,
            max_version: LANGUAGE_VERSION,
        }
    }
}

/// How a symbol came to be in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// The builtin end-of-input symbol.
    Builtin,
    /// A string literal used inside a rule, e.g. `"::"`.
    Anonymous,
    /// A token produced by the external scanner.
    External,
    /// A rule or named alias whose nodes appear in the tree.
    Regular,
    /// A rule whose name starts with `_`; its nodes are folded into the parent.
    Hidden,
}

/// One entry of the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The node kind as it appears in trees and queries.
    pub name: String,
    /// Where the symbol comes from.
    pub kind: SymbolKind,
}

impl Symbol {
    /// Named symbols come from rules or externals rather than literals.
    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::External | SymbolKind::Regular | SymbolKind::Hidden
        )
    }

    /// Visible symbols produce nodes of their own.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        match self.kind {
            SymbolKind::Builtin | SymbolKind::Hidden => false,
            SymbolKind::Anonymous | SymbolKind::Regular => true,
            SymbolKind::External => !self.name.starts_with('_'),
        }
    }
}

/// A validated grammar, ready to drive parsing.
#[derive(Debug, Clone)]
pub struct Language {
    name: String,
    abi_version: u32,
    start_symbol: u16,
    symbols: Vec<Symbol>,
    fields: Vec<String>,
    external_count: usize,
    findings: Vec<Finding>,
    grammar: Grammar,
}

impl Language {
    /// Constructs a language from `handle` with the default [`LoadOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IncompatibleGrammarVersion`] when the handle's
    /// table version is unsupported, and [`LoaderError::MalformedGrammarTable`]
    /// when its grammar definition fails to parse or validate.
    pub fn new(handle: &GrammarHandle) -> Result<Self, LoaderError> {
        Self::with_options(handle, &LoadOptions::default())
    }

    /// Constructs a language from `handle`.
    ///
    /// # Errors
    ///
    /// See [`Language::new`]. In strict mode any validation finding is
    /// reported as [`LoaderError::MalformedGrammarTable`].
    ///
    /// Validation and table building walk each rule recursively. A handle
    /// should only carry grammar definitions of ordinary nesting depth.
    pub fn with_options(handle: &GrammarHandle, options: &LoadOptions) -> Result<Self, LoaderError> {
        let name = handle.name();
        let version = handle.abi_version();
        if version < options.min_version || version > options.max_version {
            return Err(LoaderError::IncompatibleGrammarVersion {
                name: name.to_string(),
                version,
                min: options.min_version,
                max: options.max_version,
            });
        }

        let grammar =
            parse_grammar(handle.definition()).map_err(|e| LoaderError::malformed(name, e))?;
        if grammar.name != name {
            return Err(LoaderError::malformed(
                name,
                ValidationError {
                    message: format!("definition is for grammar '{}'", grammar.name),
                },
            ));
        }

        let findings = validate(
            &grammar,
            &ValidateOptions {
                start_rule: handle.start_rule(),
                strict: options.strict,
            },
        )
        .map_err(|e| LoaderError::malformed(name, e))?;

        check_external_tokens(&grammar, handle.external_tokens())
            .map_err(|e| LoaderError::malformed(name, e))?;

        let tables = SymbolTables::build(&grammar, handle.start_rule())
            .map_err(|e| LoaderError::malformed(name, e))?;

        debug!(
            grammar = name,
            abi_version = version,
            symbols = tables.symbols.len(),
            fields = tables.fields.len(),
            "loaded grammar"
        );

        Ok(Self {
            name: name.to_string(),
            abi_version: version,
            start_symbol: tables.start_symbol,
            symbols: tables.symbols,
            fields: tables.fields,
            external_count: tables.external_count,
            findings,
            grammar,
        })
    }

    /// The grammar's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table version of the handle this language was built from.
    #[must_use]
    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }

    /// The parsed grammar definition.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Non-fatal validation findings recorded while loading.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Number of distinct node kinds, including the builtin end symbol.
    #[must_use]
    pub fn node_kind_count(&self) -> usize {
        self.symbols.len()
    }

    /// The symbol table, indexed by symbol id.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The node kind for a symbol id.
    #[must_use]
    pub fn node_kind_for_id(&self, id: u16) -> Option<&str> {
        self.symbols.get(usize::from(id)).map(|s| s.name.as_str())
    }

    /// The symbol id for a node kind. Named and anonymous kinds live in
    /// separate namespaces, so `"true"` the rule and `"true"` the literal
    /// differ.
    #[must_use]
    pub fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<u16> {
        self.symbols
            .iter()
            .position(|s| s.name == kind && s.is_named() == named)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Whether the symbol is named.
    #[must_use]
    pub fn node_kind_is_named(&self, id: u16) -> bool {
        self.symbols
            .get(usize::from(id))
            .is_some_and(Symbol::is_named)
    }

    /// Whether the symbol produces visible nodes.
    #[must_use]
    pub fn node_kind_is_visible(&self, id: u16) -> bool {
        self.symbols
            .get(usize::from(id))
            .is_some_and(Symbol::is_visible)
    }

    /// The symbol id of the start rule.
    #[must_use]
    pub fn start_symbol(&self) -> u16 {
        self.start_symbol
    }

    /// Number of field names. Field ids run from `1` to this count.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The field name for a field id.
    #[must_use]
    pub fn field_name_for_id(&self, id: u16) -> Option<&str> {
        let index = usize::from(id).checked_sub(1)?;
        self.fields.get(index).map(String::as_str)
    }

    /// The field id for a field name.
    #[must_use]
    pub fn field_id_for_name(&self, name: &str) -> Option<u16> {
        self.fields
            .iter()
            .position(|f| f == name)
            .and_then(|i| u16::try_from(i + 1).ok())
    }

    /// Number of tokens produced by the external scanner.
    #[must_use]
    pub fn external_token_count(&self) -> usize {
        self.external_count
    }

    /// A fresh external scanner, if the grammar declares external tokens.
    #[must_use]
    pub fn external_scanner(&self) -> Option<Scanner> {
        (self.external_count > 0).then(Scanner::new)
    }
}

fn check_external_tokens(grammar: &Grammar, scanner_tokens: &[&str]) -> Result<(), ValidationError> {
    let declared = grammar.external_names();
    if declared.len() != grammar.externals.as_ref().map_or(0, Vec::len) {
        return Err(ValidationError {
            message: "externals must be symbols".to_string(),
        });
    }
    if declared != scanner_tokens {
        return Err(ValidationError {
            message: format!(
                "external tokens {declared:?} do not match the scanner's {scanner_tokens:?}"
            ),
        });
    }
    Ok(())
}

struct SymbolTables {
    symbols: Vec<Symbol>,
    fields: Vec<String>,
    external_count: usize,
    start_symbol: u16,
}

impl SymbolTables {
    /// Lays out symbols as: builtin end, anonymous literals, externals, rules,
    /// then alias names that no rule or literal already provides.
    fn build(grammar: &Grammar, start_rule: &str) -> Result<Self, ValidationError> {
        let mut literals = BTreeSet::new();
        let mut fields = BTreeSet::new();
        let mut aliases = BTreeSet::new();
        for name in grammar.rule_names() {
            if let Some(rule) = grammar.rule(name) {
                // A rule that is just a literal is a named token, not an anonymous one.
                if rule.rule_type != RuleType::String {
                    collect_literals(rule, &mut literals);
                }
                collect_fields(rule, &mut fields);
                collect_aliases(rule, &mut aliases);
            }
        }

        let externals = grammar.external_names();
        let mut symbols = Vec::with_capacity(1 + literals.len() + externals.len() + grammar.rules.len());
        symbols.push(Symbol {
            name: BUILTIN_END.to_string(),
            kind: SymbolKind::Builtin,
        });
        symbols.extend(literals.into_iter().map(|name| Symbol {
            name,
            kind: SymbolKind::Anonymous,
        }));
        symbols.extend(externals.iter().map(|name| Symbol {
            name: (*name).to_string(),
            kind: SymbolKind::External,
        }));

        let rules_start = symbols.len();
        symbols.extend(grammar.rule_names().into_iter().map(|name| Symbol {
            name: name.to_string(),
            kind: if name.starts_with('_') {
                SymbolKind::Hidden
            } else {
                SymbolKind::Regular
            },
        }));

        for (named, name) in aliases {
            let known = if named {
                grammar.rules.contains_key(&name)
            } else {
                literals_contain(&symbols, &name)
            };
            if !known {
                let kind = if named {
                    SymbolKind::Regular
                } else {
                    SymbolKind::Anonymous
                };
                symbols.push(Symbol { name, kind });
            }
        }

        let too_many = |count: usize| ValidationError {
            message: format!("{count} entries exceed the 65535 table limit"),
        };
        if u16::try_from(symbols.len()).is_err() {
            return Err(too_many(symbols.len()));
        }
        if u16::try_from(fields.len()).is_err() {
            return Err(too_many(fields.len()));
        }

        let start_symbol = symbols[rules_start..]
            .iter()
            .position(|s| s.name == start_rule)
            .and_then(|i| u16::try_from(rules_start + i).ok())
            .ok_or_else(|| ValidationError {
                message: format!("start rule '{start_rule}' is not defined"),
            })?;

        Ok(Self {
            symbols,
            fields: fields.into_iter().collect(),
            external_count: externals.len(),
            start_symbol,
        })
    }
}

/// Collects string literals outside token wrappers; those become anonymous nodes.
fn collect_literals(rule: &Rule, out: &mut BTreeSet<String>) {
    match rule.rule_type {
        RuleType::Token | RuleType::ImmediateToken => {}
        RuleType::String => {
            if let Some(value) = rule.string_value() {
                out.insert(value.to_string());
            }
        }
        _ => {
            for child in rule.children() {
                collect_literals(child, out);
            }
        }
    }
}

fn literals_contain(symbols: &[Symbol], name: &str) -> bool {
    symbols
        .iter()
        .any(|s| s.kind == SymbolKind::Anonymous && s.name == name)
}

/// Collects `(named, value)` for every alias node.
fn collect_aliases(rule: &Rule, out: &mut BTreeSet<(bool, String)>) {
    if rule.rule_type == RuleType::Alias {
        if let Some(value) = rule.text_value() {
            out.insert((rule.named.unwrap_or(false), value.to_string()));
        }
    }
    for child in rule.children() {
        collect_aliases(child, out);
    }
}

fn collect_fields(rule: &Rule, out: &mut BTreeSet<String>) {
    if rule.rule_type == RuleType::Field {
        if let Some(name) = &rule.name {
            out.insert(name.clone());
        }
    }
    for child in rule.children() {
        collect_fields(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarError;
    use crate::handle::language;

    fn load(definition: &'static str) -> Result<Language, LoaderError> {
        Language::new(&GrammarHandle::from_static("test", 14, "source_file", definition))
    }

    #[test]
    fn test_automn_symbol_table() {
        let language = Language::new(language()).unwrap();
        assert_eq!(language.name(), "automn");
        // end + 18 literals + 4 externals + 70 rules
        assert_eq!(language.node_kind_count(), 93);
        assert_eq!(language.external_token_count(), 4);
        assert_eq!(language.field_count(), 0);
        assert_eq!(language.node_kind_for_id(0), Some("end"));
        assert!(!language.node_kind_is_visible(0));

        let start = language.start_symbol();
        assert_eq!(language.node_kind_for_id(start), Some("source_file"));
        assert_eq!(language.id_for_node_kind("source_file", true), Some(start));
    }

    #[test]
    fn test_named_and_anonymous_kinds() {
        let language = Language::new(language()).unwrap();

        let model = language.id_for_node_kind("model", true).unwrap();
        assert!(language.node_kind_is_named(model));
        assert!(language.node_kind_is_visible(model));

        let describer = language.id_for_node_kind("_describer", true).unwrap();
        assert!(language.node_kind_is_named(describer));
        assert!(!language.node_kind_is_visible(describer));

        let double_colon = language.id_for_node_kind("::", false).unwrap();
        assert!(!language.node_kind_is_named(double_colon));
        assert!(language.node_kind_is_visible(double_colon));

        // Whole-rule literals and token contents are not anonymous symbols.
        assert_eq!(language.id_for_node_kind("true", false), None);
        assert_eq!(language.id_for_node_kind("->", false), None);
        assert_eq!(language.id_for_node_kind("\\", false), None);

        let end = language.id_for_node_kind("end", true).unwrap();
        assert_ne!(end, 0);
        assert_eq!(language.symbols()[usize::from(end)].kind, SymbolKind::External);
        assert_eq!(language.id_for_node_kind("end", false), Some(0));
    }

    #[test]
    fn test_external_scanner_available() {
        let language = Language::new(language()).unwrap();
        let scanner = language.external_scanner().unwrap();
        assert_eq!(scanner.depth(), 0);
    }

    #[test]
    fn test_findings_recorded() {
        let language = Language::new(language()).unwrap();
        assert!(language
            .findings()
            .contains(&Finding::UnreachableRule("_variant_child_definition".to_string())));
    }

    #[test]
    fn test_incompatible_versions() {
        for version in [0, MIN_COMPATIBLE_LANGUAGE_VERSION - 1, LANGUAGE_VERSION + 1] {
            let handle = language().with_abi_version(version);
            match Language::new(&handle) {
                Err(LoaderError::IncompatibleGrammarVersion {
                    name,
                    version: found,
                    min,
                    max,
                }) => {
                    assert_eq!(name, "automn");
                    assert_eq!(found, version);
                    assert_eq!(min, MIN_COMPATIBLE_LANGUAGE_VERSION);
                    assert_eq!(max, LANGUAGE_VERSION);
                }
                other => panic!("expected version error for {version}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_custom_version_range() {
        let options = LoadOptions {
            min_version: 15,
            ..LoadOptions::default()
        };
        let err = Language::with_options(language(), &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "incompatible grammar version for 'automn': version 14, supported 15 through 15"
        );
    }

    #[test]
    fn test_strict_mode_rejects_unreachable_rule() {
        let options = LoadOptions {
            strict: true,
            ..LoadOptions::default()
        };
        let err = Language::with_options(language(), &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed grammar table for 'automn': validation error: unreachable rule '_variant_child_definition'"
        );
    }

    #[test]
    fn test_malformed_json() {
        let err = load("{\"name\": ").unwrap_err();
        assert!(matches!(
            err,
            LoaderError::MalformedGrammarTable {
                source: GrammarError::JsonParse(_),
                ..
            }
        ));
        assert_eq!(err.grammar_name(), "test");
    }

    #[test]
    fn test_name_mismatch() {
        let handle = GrammarHandle::from_static("other", 14, "source_file", crate::GRAMMAR_JSON)
            .with_external_tokens(crate::scanner::ExternalToken::NAMES);
        let err = Language::new(&handle).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed grammar table for 'other': validation error: definition is for grammar 'automn'"
        );
    }

    #[test]
    fn test_missing_scanner() {
        let handle = GrammarHandle::from_static("automn", 14, "source_file", crate::GRAMMAR_JSON);
        let err = Language::new(&handle).unwrap_err();
        assert!(matches!(err, LoaderError::MalformedGrammarTable { .. }));
        assert!(err.to_string().contains("do not match the scanner's []"));
    }

    #[test]
    fn test_fields_and_aliases() {
        let language = load(
            r#"{
                "name": "test",
                "rules": {
                    "source_file": {
                        "type": "SEQ",
                        "members": [
                            {"type": "FIELD", "name": "key", "content": {"type": "SYMBOL", "name": "word"}},
                            {
                                "type": "ALIAS",
                                "value": "=",
                                "named": false,
                                "content": {"type": "STRING", "value": ":="}
                            },
                            {
                                "type": "FIELD",
                                "name": "value",
                                "content": {
                                    "type": "ALIAS",
                                    "value": "text",
                                    "named": true,
                                    "content": {"type": "SYMBOL", "name": "word"}
                                }
                            },
                            {"type": "STRING", "value": "="}
                        ]
                    },
                    "word": {"type": "PATTERN", "value": "[a-z]+"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(language.field_count(), 2);
        assert_eq!(language.field_name_for_id(0), None);
        assert_eq!(language.field_name_for_id(1), Some("key"));
        assert_eq!(language.field_id_for_name("value"), Some(2));
        assert_eq!(language.field_id_for_name("missing"), None);
        assert!(language.external_scanner().is_none());

        // end, ":=", "=", source_file, word, then the alias-only name "text"
        assert_eq!(language.node_kind_count(), 6);
        assert_eq!(language.node_kind_for_id(1), Some(":="));
        assert_eq!(language.node_kind_for_id(2), Some("="));
        assert_eq!(language.id_for_node_kind("text", true), Some(5));
        assert!(language.node_kind_is_named(5));
        assert!(language.node_kind_is_visible(5));
        assert_eq!(language.id_for_node_kind("=", false), Some(2));
    }

    #[test]
    fn test_alias_to_existing_rule_adds_no_symbol() {
        let language = load(
            r#"{
                "name": "test",
                "rules": {
                    "source_file": {
                        "type": "ALIAS",
                        "value": "word",
                        "named": true,
                        "content": {"type": "PATTERN", "value": "[0-9]+"}
                    },
                    "word": {"type": "PATTERN", "value": "[a-z]+"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(language.node_kind_count(), 3);
        assert_eq!(language.id_for_node_kind("word", true), Some(2));
    }
}
