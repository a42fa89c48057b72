//! The grammar module's side of the loader contract.
//!
//! A [`GrammarHandle`] is what a grammar crate hands to the runtime: the
//! grammar's name, the table format version it was generated for, its start
//! rule, the names of the tokens its external scanner produces, and the
//! grammar definition itself. Handles are immutable; the runtime only ever
//! borrows them.

use std::borrow::Cow;

use crate::scanner::ExternalToken;

/// Newest grammar table format this runtime understands.
pub const LANGUAGE_VERSION: u32 = 15;

/// Oldest grammar table format this runtime still accepts.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 13;

/// The automn grammar definition in tree-sitter's JSON grammar format.
pub const GRAMMAR_JSON: &str = include_str!("../grammar.json");

/// Table format version the automn grammar was generated for.
pub const AUTOMN_ABI_VERSION: u32 = 14;

static AUTOMN: GrammarHandle = GrammarHandle::from_static(
    "automn",
    AUTOMN_ABI_VERSION,
    "source_file",
    GRAMMAR_JSON,
)
.with_external_tokens(ExternalToken::NAMES);

/// Returns the automn grammar handle.
///
/// Always the same static value; pass it to
/// [`Language::new`](crate::Language::new) to obtain a usable language.
#[must_use]
pub fn language() -> &'static GrammarHandle {
    &AUTOMN
}

/// Opaque, immutable description of a compiled grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarHandle {
    name: Cow<'static, str>,
    abi_version: u32,
    start_rule: Cow<'static, str>,
    external_tokens: &'static [&'static str],
    definition: Cow<'static, str>,
}

impl GrammarHandle {
    /// Builds a handle over static data, usable in `static` items.
    #[must_use]
    pub const fn from_static(
        name: &'static str,
        abi_version: u32,
        start_rule: &'static str,
        definition: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            abi_version,
            start_rule: Cow::Borrowed(start_rule),
            external_tokens: &[],
            definition: Cow::Borrowed(definition),
        }
    }

    /// Builds a handle over a grammar definition loaded at runtime.
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        abi_version: u32,
        start_rule: impl Into<Cow<'static, str>>,
        definition: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            abi_version,
            start_rule: start_rule.into(),
            external_tokens: &[],
            definition: definition.into(),
        }
    }

    /// Declares the tokens this grammar's external scanner produces, in the
    /// order the grammar lists its `externals`.
    #[must_use]
    pub const fn with_external_tokens(mut self, tokens: &'static [&'static str]) -> Self {
        self.external_tokens = tokens;
        self
    }

    /// Returns a copy of this handle declaring a different table version.
    #[must_use]
    pub fn with_abi_version(&self, abi_version: u32) -> Self {
        Self {
            abi_version,
            ..self.clone()
        }
    }

    /// The grammar's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table format version this handle was generated for.
    #[must_use]
    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }

    /// The rule parsing starts from.
    #[must_use]
    pub fn start_rule(&self) -> &str {
        &self.start_rule
    }

    /// Names of the external scanner's tokens; empty without a scanner.
    #[must_use]
    pub fn external_tokens(&self) -> &'static [&'static str] {
        self.external_tokens
    }

    /// The raw grammar definition.
    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }
}
