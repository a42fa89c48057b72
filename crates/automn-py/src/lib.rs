//! Python bindings for the automn grammar.
//!
//! Exposes the same handshake the Rust crate offers: `language()` returns the
//! grammar handle and `Language(handle)` validates it, raising
//! `IncompatibleGrammarVersion` or `MalformedGrammarTable` on failure.

use pyo3::create_exception;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use tree_sitter_automn::{GrammarHandle, Language, LoaderError};

create_exception!(
    _binding,
    IncompatibleGrammarVersion,
    PyValueError,
    "The grammar's table version is not supported by this runtime."
);
create_exception!(
    _binding,
    MalformedGrammarTable,
    PyValueError,
    "The grammar's tables failed validation."
);

fn to_py_err(err: &LoaderError) -> PyErr {
    match err {
        LoaderError::IncompatibleGrammarVersion { .. } => {
            IncompatibleGrammarVersion::new_err(err.to_string())
        }
        LoaderError::MalformedGrammarTable { .. } => MalformedGrammarTable::new_err(err.to_string()),
    }
}

/// An immutable compiled grammar description.
#[pyclass(frozen, name = "GrammarHandle", module = "tree_sitter_automn._binding")]
struct PyGrammarHandle {
    inner: GrammarHandle,
}

#[pymethods]
impl PyGrammarHandle {
    #[getter]
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[getter]
    fn abi_version(&self) -> u32 {
        self.inner.abi_version()
    }

    /// Returns a copy of this handle declaring a different table version.
    fn with_abi_version(&self, version: u32) -> Self {
        Self {
            inner: self.inner.with_abi_version(version),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "GrammarHandle(name={:?}, abi_version={})",
            self.inner.name(),
            self.inner.abi_version()
        )
    }
}

/// A validated grammar.
#[pyclass(frozen, name = "Language", module = "tree_sitter_automn._binding")]
struct PyLanguage {
    inner: Language,
}

#[pymethods]
impl PyLanguage {
    #[new]
    fn new(handle: PyRef<'_, PyGrammarHandle>) -> PyResult<Self> {
        Language::new(&handle.inner)
            .map(|inner| Self { inner })
            .map_err(|e| to_py_err(&e))
    }

    #[getter]
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[getter]
    fn abi_version(&self) -> u32 {
        self.inner.abi_version()
    }

    #[getter]
    fn node_kind_count(&self) -> usize {
        self.inner.node_kind_count()
    }

    #[getter]
    fn field_count(&self) -> usize {
        self.inner.field_count()
    }

    fn node_kind_for_id(&self, id: u16) -> Option<&str> {
        self.inner.node_kind_for_id(id)
    }

    #[pyo3(signature = (kind, named = true))]
    fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<u16> {
        self.inner.id_for_node_kind(kind, named)
    }

    fn __repr__(&self) -> String {
        format!("Language(name={:?})", self.inner.name())
    }
}

/// Returns the automn grammar handle.
#[pyfunction]
fn language() -> PyGrammarHandle {
    PyGrammarHandle {
        inner: tree_sitter_automn::language().clone(),
    }
}

#[pymodule]
fn _binding(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(language, m)?)?;
    m.add_class::<PyGrammarHandle>()?;
    m.add_class::<PyLanguage>()?;
    m.add(
        "IncompatibleGrammarVersion",
        m.py().get_type::<IncompatibleGrammarVersion>(),
    )?;
    m.add(
        "MalformedGrammarTable",
        m.py().get_type::<MalformedGrammarTable>(),
    )?;
    m.add("LANGUAGE_VERSION", tree_sitter_automn::LANGUAGE_VERSION)?;
    m.add(
        "MIN_COMPATIBLE_LANGUAGE_VERSION",
        tree_sitter_automn::MIN_COMPATIBLE_LANGUAGE_VERSION,
    )?;
    Ok(())
}
