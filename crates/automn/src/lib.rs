//! Automn grammar for tree-sitter, with a Rust-native loader.
//!
//! ```
//! let language = tree_sitter_automn::Language::new(tree_sitter_automn::language())
//!     .expect("Error loading automn grammar");
//! assert_eq!(language.name(), "automn");
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

mod error;

/// Core structures and parsing logic for Tree-sitter grammars.
///
/// This module defines how a grammar definition is represented once read
/// from tree-sitter's JSON format: the rule tree and its metadata.
pub mod grammar;

/// The grammar handle the automn grammar module exposes.
pub mod handle;

/// Language construction: version checks, validation and symbol tables.
pub mod language;

/// The indentation-aware external scanner.
pub mod scanner;

/// Grammar validation and consistency checking utilities.
///
/// Validation protects the runtime from malformed grammar tables: it
/// enforces tree-sitter's structural invariants and ensures every reference
/// in the rule graph resolves.
pub mod validate;

pub use error::LoaderError;
pub use grammar::{parse_grammar, Grammar, GrammarError, Rule};
pub use handle::{
    language, GrammarHandle, GRAMMAR_JSON, LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION,
};
pub use language::{Language, LoadOptions};
pub use validate::{validate, Finding, ValidationError};
