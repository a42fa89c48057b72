//! Command-line checker for automn grammar handles.
//!
//! Loads the embedded automn grammar (or a grammar JSON file) the way a
//! runtime would, reports what it found, and exits non-zero if loading fails.

use std::fs;
use std::process::ExitCode;

use facet::Facet;
use tracing_subscriber::EnvFilter;
use tree_sitter_automn::language::SymbolKind;
use tree_sitter_automn::scanner::{scan_all, ExternalToken};
use tree_sitter_automn::{language, GrammarHandle, Language, LoadOptions};

/// Check that an automn grammar loads.
#[derive(Debug, Facet)]
struct Args {
    /// Grammar JSON file to load instead of the embedded automn grammar.
    #[facet(named, default)]
    grammar: Option<String>,

    /// Grammar name the handle declares (with --grammar).
    #[facet(named, default)]
    name: Option<String>,

    /// Start rule the handle declares (with --grammar).
    #[facet(named, default)]
    start: Option<String>,

    /// Override the table version the handle declares.
    #[facet(named, default)]
    abi: Option<u32>,

    /// Treat unreachable rules and mixed precedence as errors.
    #[facet(named, default)]
    strict: bool,

    /// Print the symbol table.
    #[facet(named, default)]
    symbols: bool,

    /// Print the external tokens the scanner finds in this file.
    #[facet(named, default)]
    tokens: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AUTOMN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args = match facet_args::from_std_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let mut handle = match &args.grammar {
        Some(path) => {
            let definition =
                fs::read_to_string(path).map_err(|e| format!("reading {path}: {e}"))?;
            GrammarHandle::new(
                args.name.clone().unwrap_or_else(|| "automn".to_string()),
                language().abi_version(),
                args.start.clone().unwrap_or_else(|| "source_file".to_string()),
                definition,
            )
            .with_external_tokens(ExternalToken::NAMES)
        }
        None => language().clone(),
    };
    if let Some(abi) = args.abi {
        handle = handle.with_abi_version(abi);
    }

    let options = LoadOptions {
        strict: args.strict,
        ..LoadOptions::default()
    };
    let language = Language::with_options(&handle, &options).map_err(|e| e.to_string())?;

    println!("name: {}", language.name());
    println!("abi version: {}", language.abi_version());
    println!("symbols: {}", language.node_kind_count());
    println!("fields: {}", language.field_count());
    println!("external tokens: {}", language.external_token_count());
    for finding in language.findings() {
        println!("warning: {finding}");
    }

    if args.symbols {
        for (id, symbol) in language.symbols().iter().enumerate() {
            let kind = match symbol.kind {
                SymbolKind::Builtin => "builtin",
                SymbolKind::Anonymous => "anonymous",
                SymbolKind::External => "external",
                SymbolKind::Regular => "regular",
                SymbolKind::Hidden => "hidden",
            };
            println!("{id}\t{kind}\t{}", symbol.name);
        }
    }

    if let Some(path) = &args.tokens {
        let input = fs::read_to_string(path).map_err(|e| format!("reading {path}: {e}"))?;
        for token in scan_all(&input) {
            println!("{}\t{}", token.offset, token.token);
        }
    }

    Ok(())
}
