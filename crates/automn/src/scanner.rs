//! External scanner for the automn grammar.
//!
//! Automn is indentation sensitive: blocks open with an [`ExternalToken::Indent`],
//! close with one [`ExternalToken::Dedent`] per level, and siblings are
//! separated by [`ExternalToken::Newline`]. The scanner tracks a stack of
//! indent widths between calls, and that state can be serialized so a parser
//! can snapshot and restore it.

use std::fmt;

/// Upper bound on the bytes [`Scanner::serialize`] writes.
pub const SERIALIZATION_BUFFER_SIZE: usize = 1024;

/// Columns a tab counts for.
const TAB_WIDTH: u16 = 4;

/// Tokens produced by the external scanner, in the grammar's `externals` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExternalToken {
    /// The next line is indented deeper than the current block.
    Indent,
    /// The next line closes one block.
    Dedent,
    /// The next line continues the current block.
    Newline,
    /// End of input. Declared by the grammar, never emitted.
    End,
}

impl ExternalToken {
    /// All tokens, indexed by their discriminant.
    pub const ALL: [ExternalToken; 4] = [
        ExternalToken::Indent,
        ExternalToken::Dedent,
        ExternalToken::Newline,
        ExternalToken::End,
    ];

    /// Grammar symbol names, indexed by discriminant.
    pub const NAMES: &'static [&'static str] = &["indent", "dedent", "newline", "end"];

    /// The grammar symbol name of this token.
    #[must_use]
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }
}

impl fmt::Display for ExternalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of external tokens the parser would accept at this position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidSymbols([bool; 4]);

impl ValidSymbols {
    /// Every token is acceptable.
    #[must_use]
    pub const fn all() -> Self {
        Self([true; 4])
    }

    /// No token is acceptable.
    #[must_use]
    pub const fn none() -> Self {
        Self([false; 4])
    }

    /// Adds `token` to the set.
    #[must_use]
    pub const fn with(mut self, token: ExternalToken) -> Self {
        self.0[token as usize] = true;
        self
    }

    /// Removes `token` from the set.
    #[must_use]
    pub const fn without(mut self, token: ExternalToken) -> Self {
        self.0[token as usize] = false;
        self
    }

    /// Whether `token` is in the set.
    #[must_use]
    pub const fn contains(self, token: ExternalToken) -> bool {
        self.0[token as usize]
    }
}

/// Character source the scanner reads from.
///
/// Mirrors the lexer a tree-sitter runtime passes to external scanners.
pub trait Lexer {
    /// The current character, or `None` at end of input.
    fn lookahead(&self) -> Option<char>;

    /// Moves past the current character. Skipped characters are treated as
    /// whitespace and excluded from the token.
    fn advance(&mut self, skip: bool);

    /// Marks the current position as the end of the token being scanned.
    fn mark_end(&mut self);

    /// Whether the lexer is at end of input.
    fn eof(&self) -> bool {
        self.lookahead().is_none()
    }
}

/// A [`Lexer`] over an in-memory string.
#[derive(Debug, Clone)]
pub struct StrLexer<'a> {
    input: &'a str,
    position: usize,
    token_start: usize,
    token_end: Option<usize>,
}

impl<'a> StrLexer<'a> {
    /// Creates a lexer positioned at the start of `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self::at(input, 0)
    }

    /// Creates a lexer positioned at byte `offset` of `input`.
    ///
    /// Offsets past the end or inside a character are clamped back to the
    /// previous character boundary.
    #[must_use]
    pub fn at(input: &'a str, offset: usize) -> Self {
        let mut offset = offset.min(input.len());
        while !input.is_char_boundary(offset) {
            offset -= 1;
        }
        Self {
            input,
            position: offset,
            token_start: offset,
            token_end: None,
        }
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Byte range of the scanned token: from the first non-skipped character
    /// to the marked end (or the current position if no end was marked).
    #[must_use]
    pub fn token_range(&self) -> std::ops::Range<usize> {
        let end = self.token_end.unwrap_or(self.position);
        self.token_start.min(end)..end
    }
}

impl Lexer for StrLexer<'_> {
    fn lookahead(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self, skip: bool) {
        if let Some(c) = self.lookahead() {
            self.position += c.len_utf8();
        }
        if skip {
            self.token_start = self.position;
        }
    }

    fn mark_end(&mut self) {
        self.token_end = Some(self.position);
    }
}

/// Indentation state carried between scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanner {
    indents: Vec<u16>,
    dedents: u16,
    final_newlined: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            indents: vec![0],
            dedents: 0,
            final_newlined: false,
        }
    }
}

impl Scanner {
    /// Creates a scanner at column zero with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Width of the innermost open block.
    #[must_use]
    pub fn current_indent(&self) -> u16 {
        self.indents.last().copied().unwrap_or(0)
    }

    /// Number of open blocks.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.indents.len() - 1
    }

    /// Dedents still to be emitted from the last multi-level dedent.
    #[must_use]
    pub fn pending_dedents(&self) -> u16 {
        self.dedents
    }

    /// Scans for one external token.
    ///
    /// Returns `None` when no acceptable token starts here; the caller should
    /// then rewind the lexer and fall back to its internal lexer.
    pub fn scan<L: Lexer>(&mut self, lexer: &mut L, valid: ValidSymbols) -> Option<ExternalToken> {
        // Drain a multi-level dedent: one dedent per level, then a newline.
        if self.dedents == 1 && valid.contains(ExternalToken::Newline) {
            self.dedents = 0;
            return Some(ExternalToken::Newline);
        } else if self.dedents > 1 && valid.contains(ExternalToken::Dedent) {
            self.dedents -= 1;
            return Some(ExternalToken::Dedent);
        }
        self.dedents = 0;

        let mut found_end_of_line = false;
        let mut indent_length: u16 = 0;

        while let Some(c) = lexer.lookahead() {
            match c {
                '\n' => {
                    found_end_of_line = true;
                    indent_length = 0;
                    lexer.advance(true);
                }
                ' ' => {
                    indent_length = indent_length.saturating_add(1);
                    lexer.advance(true);
                }
                '\r' | '\x0c' => {
                    indent_length = 0;
                    lexer.advance(true);
                }
                '\t' => {
                    indent_length = indent_length.saturating_add(TAB_WIDTH);
                    lexer.advance(true);
                }
                '\\' => {
                    // Line continuation: backslash, optional CR, then LF or EOF.
                    lexer.advance(true);
                    if lexer.lookahead() == Some('\r') {
                        lexer.advance(true);
                    }
                    match lexer.lookahead() {
                        Some('\n') | None => lexer.advance(true),
                        Some(_) => return None,
                    }
                }
                _ => break,
            }
        }

        lexer.mark_end();

        if found_end_of_line {
            let current = self.current_indent();

            if valid.contains(ExternalToken::Indent) && indent_length > current {
                self.indents.push(indent_length);
                return Some(ExternalToken::Indent);
            }

            if valid.contains(ExternalToken::Dedent) && indent_length < current {
                while self.current_indent() > indent_length && self.indents.len() > 1 {
                    self.indents.pop();
                    self.dedents = self.dedents.saturating_add(1);
                }
                return Some(ExternalToken::Dedent);
            }

            if valid.contains(ExternalToken::Newline) {
                return Some(ExternalToken::Newline);
            }
        } else if lexer.eof() && valid.contains(ExternalToken::Dedent) && self.indents.len() > 1 {
            self.indents.pop();
            return Some(ExternalToken::Dedent);
        }

        None
    }

    /// Writes the scanner state into `buffer`, returning the bytes written.
    ///
    /// Layout: pending dedents (saturated to one byte), the `final_newlined`
    /// flag, then every indent width above the base level as a little-endian
    /// `u16`. Writes at most [`SERIALIZATION_BUFFER_SIZE`] bytes; levels that
    /// do not fit are dropped.
    pub fn serialize(&self, buffer: &mut [u8]) -> usize {
        let limit = buffer.len().min(SERIALIZATION_BUFFER_SIZE);
        if limit < 2 {
            return 0;
        }

        buffer[0] = u8::try_from(self.dedents).unwrap_or(u8::MAX);
        buffer[1] = u8::from(self.final_newlined);
        let mut size = 2;

        for indent in self.indents.iter().skip(1) {
            if size + 2 > limit {
                break;
            }
            buffer[size..size + 2].copy_from_slice(&indent.to_le_bytes());
            size += 2;
        }

        size
    }

    /// Restores state written by [`Scanner::serialize`].
    ///
    /// An empty buffer resets the scanner to its initial state. A trailing odd
    /// byte is ignored, as is anything past [`SERIALIZATION_BUFFER_SIZE`].
    pub fn deserialize(&mut self, buffer: &[u8]) {
        *self = Self::default();

        let buffer = &buffer[..buffer.len().min(SERIALIZATION_BUFFER_SIZE)];
        if let [dedents, final_newlined, rest @ ..] = buffer {
            self.dedents = u16::from(*dedents);
            self.final_newlined = *final_newlined != 0;
            self.indents.extend(
                rest.chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
            );
        }
    }
}

/// An external token found by [`scan_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedToken {
    /// Which token was produced.
    pub token: ExternalToken,
    /// Byte offset where the token sits.
    pub offset: usize,
}

/// Runs the scanner across `input` with every token acceptable, collecting
/// the external tokens it produces.
///
/// Characters the scanner declines are stepped over one at a time, standing
/// in for the grammar's internal lexer.
#[must_use]
pub fn scan_all(input: &str) -> Vec<ScannedToken> {
    let mut scanner = Scanner::new();
    let mut tokens = Vec::new();
    let mut position = 0;

    loop {
        let mut lexer = StrLexer::at(input, position);
        if let Some(token) = scanner.scan(&mut lexer, ValidSymbols::all()) {
            let range = lexer.token_range();
            tokens.push(ScannedToken {
                token,
                offset: range.start,
            });
            position = range.end;
            continue;
        }

        match input[position..].chars().next() {
            Some(c) => position += c.len_utf8(),
            None => break,
        }
    }

    tokens
}
