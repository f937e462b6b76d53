//! kuki-par - Recursive-descent parser for the Kukicha language.
//!
//! The parser consumes the token stream exactly once with one token of
//! lookahead; the only place it scans further ahead is the bounded
//! bracket-matching scan that decides whether `(` opens an arrow-lambda
//! parameter list.
//!
//! Block structure comes from the lexer's layout tokens: a header line ends
//! with NEWLINE, its body is the statements between one INDENT and the
//! matching DEDENT. On a syntax error the parser records a diagnostic,
//! skips to the end of the current logical line (or the enclosing DEDENT),
//! and resumes, so a parse always produces a program, possibly partial.
//!
//! # Examples
//!
//! ```
//! use kuki_lex::tokenize;
//! use kuki_par::parse;
//! use kuki_util::{FileId, Handler};
//!
//! let source = "petiole demo\n\nfunc Add(a int, b int) int\n    return a + b\n";
//! let handler = Handler::new();
//! let tokens = tokenize(source, FileId::DUMMY, &handler);
//! let program = parse(tokens, &handler);
//!
//! assert!(program.module.is_some());
//! assert_eq!(program.decls.len(), 1);
//! assert!(!handler.has_errors());
//! ```

pub mod ast;
mod edge_cases;
mod expr;
mod interp;
mod items;
mod stmt;
mod types;

pub use ast::*;

use kuki_lex::{Token, TokenKind};
use kuki_util::{Diagnostic, Handler, Name, Span, Stage};

/// Parse a token stream into a program
///
/// Problems are reported to `handler`; the returned [`Program`] is as
/// complete as the input allowed.
pub fn parse(tokens: Vec<Token>, handler: &Handler) -> Program {
    Parser::new(tokens, handler).parse_program()
}

/// Recursive-descent parser over an owned token vector
pub struct Parser<'a> {
    /// Token stream with comments filtered out
    tokens: Vec<Token>,
    /// Cursor into `tokens`
    pos: usize,
    /// Comments, kept aside for attachment
    comments: Vec<Token>,
    /// Shared diagnostic sink
    pub(crate) handler: &'a Handler,
    /// Next expression node id
    pub(crate) next_node_id: u32,
}

impl<'a> Parser<'a> {
    /// Create a parser over `tokens`
    ///
    /// Comment tokens are split off here; the grammar never sees them.
    pub fn new(tokens: Vec<Token>, handler: &'a Handler) -> Self {
        let (comments, tokens): (Vec<_>, Vec<_>) =
            tokens.into_iter().partition(|t| t.kind == TokenKind::Comment);
        Self {
            tokens,
            pos: 0,
            comments,
            handler,
            next_node_id: 0,
        }
    }

    /// Comments seen in the source, in order
    pub fn comments(&self) -> &[Token] {
        &self.comments
    }

    // =========================================================================
    // TOKEN CURSOR
    // =========================================================================

    pub(crate) fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// The current token; the stream always ends with EOF so this is total
    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Kind of the current token
    pub(crate) fn kind(&self) -> TokenKind {
        self.current().kind
    }

    /// Kind of the token `n` past the current one (EOF past the end)
    pub(crate) fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Span of the current token
    pub(crate) fn span(&self) -> Span {
        self.current().span
    }

    /// Consume and return the current token
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// True if the current token has the given kind
    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// Consume the current token when it matches
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require a token kind, reporting an error when it is missing
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.kind().describe()
            ));
            None
        }
    }

    /// True at the EOF token
    pub(crate) fn at_end(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    /// Intern the current token's lexeme as a [`Name`]
    pub(crate) fn name_of(token: &Token) -> Name {
        Name::intern(&token.lexeme)
    }

    // =========================================================================
    // DIAGNOSTICS AND RECOVERY
    // =========================================================================

    /// Report a parse error at the current token
    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let span = self.span();
        self.error_at(span, message);
    }

    /// Report a parse error at a specific span
    pub(crate) fn error_at(&self, span: Span, message: impl Into<String>) {
        self.handler
            .emit(Diagnostic::error(Stage::Parse, message, span));
    }

    /// Skip forward to a synchronization point: past the NEWLINE ending the
    /// current logical line, or up to (not past) the DEDENT closing the
    /// enclosing block
    ///
    /// Nested blocks opened on the bad line are skipped whole so the
    /// recovery point is at the same depth the error occurred at.
    pub(crate) fn sync(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => return,
                TokenKind::Newline if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Indent => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Dedent => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Consume any run of NEWLINE tokens
    pub(crate) fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Require the end of a simple statement: NEWLINE, or the block's
    /// DEDENT / EOF
    pub(crate) fn expect_stmt_end(&mut self) {
        if self.check(TokenKind::Dedent) || self.at_end() {
            return;
        }
        if !self.eat(TokenKind::Newline) {
            self.error(format!(
                "expected end of line, found {}",
                self.kind().describe()
            ));
            self.sync();
        }
    }

    // =========================================================================
    // PROGRAM STRUCTURE
    // =========================================================================

    /// Parse a whole source file
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program {
            module: None,
            imports: Vec::new(),
            decls: Vec::new(),
        };

        self.skip_newlines();
        if self.check(TokenKind::Petiole) {
            program.module = self.parse_module_header();
        }

        self.skip_newlines();
        while self.check(TokenKind::Import) {
            match self.parse_import() {
                Some(import) => program.imports.push(import),
                None => self.sync(),
            }
            self.skip_newlines();
        }

        let mut pending_doc: Option<String> = None;
        while !self.at_end() {
            self.skip_newlines();
            if self.at_end() {
                break;
            }
            let before = self.pos;

            if self.check(TokenKind::Explain) {
                pending_doc = self.parse_explain();
            } else {
                match self.parse_decl(pending_doc.take()) {
                    Some(decl) => program.decls.push(decl),
                    None => self.sync(),
                }
            }

            // A declaration must always make progress; anything that did
            // not (a stray DEDENT, for instance) is consumed here so the
            // loop cannot stall.
            if self.pos == before {
                self.advance();
            }
        }

        program
    }

    /// Parse `petiole NAME`
    fn parse_module_header(&mut self) -> Option<ModuleDecl> {
        let span = self.span();
        self.advance(); // petiole
        let name = self.expect(TokenKind::Ident)?;
        self.expect_stmt_end();
        Some(ModuleDecl {
            name: Self::name_of(&name),
            span,
        })
    }

    /// Parse `import path/to/module [as alias]`
    fn parse_import(&mut self) -> Option<ImportDecl> {
        let span = self.span();
        self.advance(); // import

        let first = self.expect(TokenKind::Ident)?;
        let mut path = vec![Self::name_of(&first)];
        while self.eat(TokenKind::Slash) {
            let segment = self.expect(TokenKind::Ident)?;
            path.push(Self::name_of(&segment));
        }

        let alias = if self.eat(TokenKind::As) {
            let alias = self.expect(TokenKind::Ident)?;
            Some(Self::name_of(&alias))
        } else {
            None
        };

        self.expect_stmt_end();
        Some(ImportDecl { path, alias, span })
    }

    /// Parse `explain "documentation"` and hand the text to the next
    /// declaration
    fn parse_explain(&mut self) -> Option<String> {
        self.advance(); // explain
        let text = self.expect(TokenKind::Str).map(|t| t.lexeme);
        if text.is_none() {
            self.sync();
            return None;
        }
        self.expect_stmt_end();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuki_lex::tokenize;
    use kuki_util::FileId;

    fn parse_source(source: &str) -> (Program, Handler) {
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = parse(tokens, &handler);
        (program, handler)
    }

    #[test]
    fn test_empty_program() {
        let (program, handler) = parse_source("");
        assert!(program.module.is_none());
        assert!(program.decls.is_empty());
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_module_header() {
        let (program, handler) = parse_source("petiole demo\n");
        assert_eq!(program.module.unwrap().name.as_str(), "demo");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_imports() {
        let source = "petiole demo\n\nimport strings\nimport net/http as web\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors());
        assert_eq!(program.imports.len(), 2);
        assert_eq!(program.imports[0].path[0].as_str(), "strings");
        assert_eq!(program.imports[1].path.len(), 2);
        assert_eq!(program.imports[1].alias.unwrap().as_str(), "web");
    }

    #[test]
    fn test_explain_attaches_to_next_decl() {
        let source = "explain \"adds two ints\"\nfunc Add(a int, b int) int\n    return a + b\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors());
        let Decl::Func(func) = &program.decls[0] else {
            panic!("expected function");
        };
        assert_eq!(func.doc.as_deref(), Some("adds two ints"));
    }

    #[test]
    fn test_comments_are_kept_aside() {
        let handler = Handler::new();
        let tokens = tokenize("# top\nx := 1 # trailing\n", FileId::DUMMY, &handler);
        let parser = Parser::new(tokens, &handler);
        assert_eq!(parser.comments().len(), 2);
    }

    #[test]
    fn test_error_recovery_keeps_later_decls() {
        let source = "func )bad\n\nfunc Good()\n    return\n";
        let (program, handler) = parse_source(source);
        assert!(handler.has_errors());
        assert!(program
            .decls
            .iter()
            .any(|d| matches!(d, Decl::Func(f) if f.name.as_str() == "Good")));
    }

    #[test]
    fn test_parse_always_returns_program() {
        let (_, handler) = parse_source("??? !!!\n");
        assert!(handler.has_errors());
    }
}
