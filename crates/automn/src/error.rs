use crate::grammar::GrammarError;

/// Errors returned when constructing a [`Language`](crate::Language) from a
/// [`GrammarHandle`](crate::GrammarHandle).
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// The handle's table format version is outside the supported range.
    #[error(
        "incompatible grammar version for '{name}': version {version}, supported {min} through {max}"
    )]
    IncompatibleGrammarVersion {
        /// Name of the grammar carried by the handle.
        name: String,
        /// The version the handle declares.
        version: u32,
        /// Oldest supported version.
        min: u32,
        /// Newest supported version.
        max: u32,
    },

    /// The handle's grammar tables failed structural validation.
    #[error("malformed grammar table for '{name}': {source}")]
    MalformedGrammarTable {
        /// Name of the grammar carried by the handle.
        name: String,
        /// What was wrong with the tables.
        #[source]
        source: GrammarError,
    },
}

impl LoaderError {
    /// Name of the grammar whose handle failed to load.
    #[must_use]
    pub fn grammar_name(&self) -> &str {
        match self {
            LoaderError::IncompatibleGrammarVersion { name, .. }
            | LoaderError::MalformedGrammarTable { name, .. } => name,
        }
    }

    pub(crate) fn malformed(name: &str, source: impl Into<GrammarError>) -> Self {
        LoaderError::MalformedGrammarTable {
            name: name.to_string(),
            source: source.into(),
        }
    }
}
