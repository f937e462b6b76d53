//! The indentation-aware lexer.
//!
//! The lexer is a single forward pass over the source. Besides the usual
//! token classes it synthesizes three layout kinds from whitespace:
//!
//! - NEWLINE at the end of each logical line,
//! - INDENT when a line starts one level (exactly four spaces) deeper than
//!   the previous logical line,
//! - DEDENT for every level a line closes.
//!
//! The indent stack starts as `[0]` and is balanced at end of file, so
//! every INDENT is eventually matched by a DEDENT. Blank lines and
//! comment-only lines never touch the stack.
//!
//! A NEWLINE is suppressed (and the next line's layout withheld) while a
//! bracket is open, when the previous non-comment token was `|>`, or when
//! the next line begins with `|>`; the indent stack is left untouched for
//! the whole continuation.
//!
//! Lexing never stops at an error: every problem is reported to the
//! [`Handler`] and the pass keeps going so one run surfaces as many
//! problems as possible.

use std::collections::VecDeque;

use kuki_util::{Diagnostic, FileId, Handler, Span, Stage};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Tokenize a whole source file
///
/// Returns the token sequence, always terminated by a single
/// [`TokenKind::Eof`]. Problems are reported to `handler`; the returned
/// sequence is complete even when errors were found.
///
/// # Examples
///
/// ```
/// use kuki_lex::{tokenize, TokenKind};
/// use kuki_util::{FileId, Handler};
///
/// let handler = Handler::new();
/// let tokens = tokenize("x := 1\n", FileId::DUMMY, &handler);
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![TokenKind::Ident, TokenKind::ColonEq, TokenKind::Integer,
///          TokenKind::Newline, TokenKind::Eof]
/// );
/// assert!(!handler.has_errors());
/// ```
pub fn tokenize(source: &str, file_id: FileId, handler: &Handler) -> Vec<Token> {
    let mut lexer = Lexer::new(source, file_id, handler);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

/// Start-of-token bookkeeping: byte position plus line/column
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: u32,
    column: u32,
}

/// The lexer state machine
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    handler: &'a Handler,
    file_id: FileId,
    /// Active indentation levels, always non-empty, always starts with 0
    indents: Vec<u32>,
    /// Synthesized layout tokens waiting to be handed out
    pending: VecDeque<Token>,
    /// Open bracket depth: `(`, `[`, `{` minus their closers
    depth: u32,
    /// True before the first token of a physical line has been produced
    at_line_start: bool,
    /// True when the previous NEWLINE was suppressed; the next line's
    /// leading whitespace is consumed without layout bookkeeping
    continuation: bool,
    /// Kind of the last emitted non-comment token
    last_significant: Option<TokenKind>,
    /// True once the end-of-file layout tokens have been queued
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`
    pub fn new(source: &'a str, file_id: FileId, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            file_id,
            indents: vec![0],
            pending: VecDeque::new(),
            depth: 0,
            at_line_start: true,
            continuation: false,
            last_significant: None,
            finished: false,
        }
    }

    /// Produce the next token
    ///
    /// Returns [`TokenKind::Eof`] forever once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return self.emit(token);
            }

            if self.at_line_start {
                self.handle_line_start();
                continue;
            }

            self.cursor
                .bump_while(|c| c == ' ' || c == '\t' || c == '\r');

            if self.cursor.is_at_end() {
                if !self.finished {
                    self.queue_eof();
                    continue;
                }
                let mark = self.mark();
                let token = self.token_at(TokenKind::Eof, "", mark, mark.pos);
                return self.emit(token);
            }

            let c = self.cursor.first();
            match c {
                '\n' => {
                    let mark = self.mark();
                    self.cursor.bump();
                    self.at_line_start = true;

                    let continues_ahead = self.cursor.line_starts_with_pipe()
                        || self.cursor.line_starts_with_onerr();
                    if self.depth > 0
                        || self.last_significant == Some(TokenKind::PipeGt)
                        || continues_ahead
                    {
                        self.continuation = true;
                        continue;
                    }
                    let token = self.token_at(TokenKind::Newline, "\n", mark, mark.pos + 1);
                    return self.emit(token);
                }
                '#' => {
                    let token = self.lex_comment();
                    return self.emit(token);
                }
                '"' => {
                    let token = self.lex_string();
                    return self.emit(token);
                }
                '\'' => {
                    let token = self.lex_rune();
                    return self.emit(token);
                }
                c if c.is_ascii_digit() => {
                    let token = self.lex_number();
                    return self.emit(token);
                }
                c if is_ident_start(c) => {
                    let token = self.lex_ident();
                    return self.emit(token);
                }
                _ => {
                    if let Some(token) = self.lex_operator() {
                        return self.emit(token);
                    }
                    // lex_operator reported the problem; skip and keep going
                    continue;
                }
            }
        }
    }

    /// Record the token's kind for continuation decisions and hand it out
    fn emit(&mut self, token: Token) -> Token {
        if token.kind != TokenKind::Comment {
            self.last_significant = Some(token.kind);
        }
        token
    }

    // =========================================================================
    // LINE STARTS AND INDENTATION
    // =========================================================================

    /// Consume the leading whitespace of a new physical line and update the
    /// indent stack
    ///
    /// Blank lines and comment-only lines are consumed here so they can
    /// never touch the stack. During a continuation the whitespace is
    /// consumed with no layout bookkeeping at all and the stack stays
    /// frozen.
    fn handle_line_start(&mut self) {
        self.at_line_start = false;

        if self.depth > 0 || self.continuation {
            self.continuation = false;
            self.cursor
                .bump_while(|c| c == ' ' || c == '\t' || c == '\r');
            return;
        }

        loop {
            let line_mark = self.mark();
            let mut width: u32 = 0;
            let mut saw_tab = false;
            loop {
                match self.cursor.first() {
                    ' ' => {
                        width += 1;
                        self.cursor.bump();
                    }
                    '\t' => {
                        saw_tab = true;
                        width += 4;
                        self.cursor.bump();
                    }
                    '\r' => {
                        self.cursor.bump();
                    }
                    _ => break,
                }
            }

            if self.cursor.is_at_end() {
                return;
            }

            match self.cursor.first() {
                '\n' => {
                    // Blank line: no NEWLINE, no stack change.
                    self.cursor.bump();
                    continue;
                }
                '#' => {
                    // Comment-only line: the comment is kept for attachment
                    // but the stack and NEWLINE stream are untouched.
                    let token = self.lex_comment();
                    self.pending.push_back(token);
                    if self.cursor.first() == '\n' {
                        self.cursor.bump();
                    }
                    continue;
                }
                _ => {}
            }

            if saw_tab {
                self.error_at(line_mark, "Use 4 spaces for indentation, not tabs");
            }
            self.apply_indent(width);
            return;
        }
    }

    /// Compare a line's indent width against the stack and queue layout
    /// tokens
    fn apply_indent(&mut self, width: u32) {
        let top = *self.indents.last().expect("indent stack is never empty");

        if width % 4 != 0 {
            self.error_here("Indentation must be a multiple of 4 spaces");
        }

        if width > top {
            if width != top + 4 {
                self.error_here("Indent by one level (4 spaces) at a time");
            }
            self.indents.push(width);
            self.push_layout(TokenKind::Indent);
        } else if width < top {
            while *self.indents.last().expect("indent stack is never empty") > width {
                self.indents.pop();
                self.push_layout(TokenKind::Dedent);
            }
            let top = *self.indents.last().expect("indent stack is never empty");
            if top != width {
                self.error_here("Unindent does not match any earlier indentation level");
                // Adopt the stray level so the rest of the file still lexes.
                self.indents.push(width);
            }
        }
    }

    /// Queue a zero-width layout token at the current position
    fn push_layout(&mut self, kind: TokenKind) {
        let mark = self.mark();
        let token = self.token_at(kind, "", mark, mark.pos);
        self.pending.push_back(token);
    }

    /// Queue the final NEWLINE, closing DEDENTs, and EOF
    fn queue_eof(&mut self) {
        self.finished = true;
        if matches!(self.last_significant, Some(kind) if kind != TokenKind::Newline) {
            self.push_layout(TokenKind::Newline);
        }
        while *self.indents.last().expect("indent stack is never empty") > 0 {
            self.indents.pop();
            self.push_layout(TokenKind::Dedent);
        }
        self.push_layout(TokenKind::Eof);
    }

    // =========================================================================
    // TOKEN CLASSES
    // =========================================================================

    /// Lex a `#` comment up to (not including) the end of line
    fn lex_comment(&mut self) -> Token {
        let mark = self.mark();
        self.cursor.bump_while(|c| c != '\n');
        let end = self.cursor.pos();
        let text = self.cursor.slice_from(mark.pos).to_owned();
        self.token_at(TokenKind::Comment, text, mark, end)
    }

    /// Lex a double-quoted string literal
    ///
    /// Escape sequences are resolved; `{` and `}` pass through untouched so
    /// the parser can split interpolation segments later. A raw newline
    /// terminates the literal with an error.
    fn lex_string(&mut self) -> Token {
        let mark = self.mark();
        self.cursor.bump(); // opening quote
        let mut value = String::new();
        loop {
            if self.cursor.is_at_end() || self.cursor.first() == '\n' {
                self.error_at(mark, "Unterminated string literal");
                break;
            }
            match self.cursor.first() {
                '"' => {
                    self.cursor.bump();
                    break;
                }
                '\\' => {
                    self.cursor.bump();
                    let escape = self.cursor.first();
                    if escape == '\n' || self.cursor.is_at_end() {
                        // Loop top reports the unterminated literal.
                        continue;
                    }
                    match escape {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        '\'' => value.push('\''),
                        _ => {
                            self.error_here(format!("Unknown escape sequence '\\{escape}'"));
                        }
                    }
                    self.cursor.bump();
                }
                c => {
                    value.push(c);
                    self.cursor.bump();
                }
            }
        }
        self.token_at(TokenKind::Str, value, mark, self.cursor.pos())
    }

    /// Lex a single-quoted rune literal
    fn lex_rune(&mut self) -> Token {
        let mark = self.mark();
        self.cursor.bump(); // opening quote

        if self.cursor.first() == '\'' {
            self.error_at(mark, "Empty rune literal");
            self.cursor.bump();
            return self.token_at(TokenKind::Rune, "", mark, self.cursor.pos());
        }
        if self.cursor.is_at_end() || self.cursor.first() == '\n' {
            self.error_at(mark, "Unterminated rune literal");
            return self.token_at(TokenKind::Rune, "", mark, self.cursor.pos());
        }

        let mut value = String::new();
        match self.cursor.first() {
            '\\' => {
                self.cursor.bump();
                let escape = self.cursor.first();
                match escape {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    _ => self.error_here(format!("Unknown escape sequence '\\{escape}'")),
                }
                self.cursor.bump();
            }
            c => {
                value.push(c);
                self.cursor.bump();
            }
        }

        if !self.cursor.eat('\'') {
            self.error_at(mark, "Rune literal must contain exactly one character");
            // Skip to the closing quote or end of line so lexing resumes
            // on something sensible.
            self.cursor.bump_while(|c| c != '\'' && c != '\n');
            self.cursor.eat('\'');
        }
        self.token_at(TokenKind::Rune, value, mark, self.cursor.pos())
    }

    /// Lex an integer or float literal
    ///
    /// A dot promotes to FLOAT only when followed by another digit, so
    /// `list[0].Name` still lexes the dot as a selector.
    fn lex_number(&mut self) -> Token {
        let mark = self.mark();
        self.cursor.bump_while(|c| c.is_ascii_digit());

        let mut kind = TokenKind::Integer;
        if self.cursor.first() == '.' && self.cursor.second().is_ascii_digit() {
            kind = TokenKind::Float;
            self.cursor.bump();
            self.cursor.bump_while(|c| c.is_ascii_digit());
        }

        let text = self.cursor.slice_from(mark.pos).to_owned();
        self.token_at(kind, text, mark, self.cursor.pos())
    }

    /// Lex an identifier or keyword
    fn lex_ident(&mut self) -> Token {
        let mark = self.mark();
        self.cursor.bump_while(is_ident_continue);
        let text = self.cursor.slice_from(mark.pos).to_owned();
        let kind = keyword_from_ident(&text).unwrap_or(TokenKind::Ident);
        self.token_at(kind, text, mark, self.cursor.pos())
    }

    /// Lex an operator or punctuation token
    ///
    /// Returns `None` after reporting an unknown or stray character; the
    /// caller skips it and keeps lexing.
    fn lex_operator(&mut self) -> Option<Token> {
        let mark = self.mark();
        let c = self.cursor.first();
        self.cursor.bump();

        let kind = match c {
            ':' => {
                if self.cursor.eat('=') {
                    TokenKind::ColonEq
                } else {
                    TokenKind::Colon
                }
            }
            '=' => {
                if self.cursor.eat('=') {
                    TokenKind::EqEq
                } else if self.cursor.eat('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.cursor.eat('-') {
                    TokenKind::LArrow
                } else if self.cursor.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.cursor.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '+' => {
                if self.cursor.eat('+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.cursor.eat('-') {
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '|' => {
                if self.cursor.eat('>') {
                    TokenKind::PipeGt
                } else if self.cursor.eat('|') {
                    TokenKind::PipePipe
                } else if self.cursor.rest_of_line_is_blank() {
                    // A lone `|` at the end of a line is almost certainly a
                    // mistyped pipe.
                    self.handler.emit(
                        Diagnostic::error(
                            Stage::Lex,
                            "Stray '|' at end of line",
                            self.span_at(mark, self.cursor.pos()),
                        )
                        .with_help("did you mean '|>'?"),
                    );
                    return None;
                } else {
                    TokenKind::BitOr
                }
            }
            '&' => {
                if self.cursor.eat('&') {
                    TokenKind::AmpAmp
                } else {
                    self.handler.emit(
                        Diagnostic::error(
                            Stage::Lex,
                            "Stray '&'",
                            self.span_at(mark, self.cursor.pos()),
                        )
                        .with_help("use 'and' or '&&' for logical and"),
                    );
                    return None;
                }
            }
            '(' => {
                self.depth += 1;
                TokenKind::LParen
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RParen
            }
            '[' => {
                self.depth += 1;
                TokenKind::LBracket
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RBracket
            }
            '{' => {
                self.depth += 1;
                TokenKind::LBrace
            }
            '}' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RBrace
            }
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            _ => {
                self.error_at(mark, format!("Unknown character '{c}'"));
                return None;
            }
        };

        let text = self.cursor.slice_from(mark.pos).to_owned();
        Some(self.token_at(kind, text, mark, self.cursor.pos()))
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn mark(&self) -> Mark {
        Mark {
            pos: self.cursor.pos(),
            line: self.cursor.line(),
            column: self.cursor.column(),
        }
    }

    fn span_at(&self, mark: Mark, end: usize) -> Span {
        Span::with_file(mark.pos, end, self.file_id, mark.line, mark.column)
    }

    fn token_at(&self, kind: TokenKind, lexeme: impl Into<String>, mark: Mark, end: usize) -> Token {
        Token::new(kind, lexeme, self.span_at(mark, end))
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let mark = self.mark();
        self.error_at(mark, message);
    }

    fn error_at(&self, mark: Mark, message: impl Into<String>) {
        self.handler.emit(Diagnostic::error(
            Stage::Lex,
            message,
            self.span_at(mark, mark.pos),
        ));
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
