//! kuki-lex - Lexical analysis for the Kukicha language.
//!
//! Kukicha is indentation-structured, so the lexer does more than classify
//! characters: it synthesizes NEWLINE, INDENT, and DEDENT tokens from
//! whitespace, suppresses them inside implicit line continuations (open
//! brackets and `|>` chains), and collapses keyword aliases onto canonical
//! token kinds while preserving the user's spelling in each token's lexeme.
//!
//! The entry point is [`tokenize`]; the stream it returns is consumed
//! exactly once by the parser.
//!
//! # Examples
//!
//! ```
//! use kuki_lex::{tokenize, TokenKind};
//! use kuki_util::{FileId, Handler};
//!
//! let source = "if ready\n    start()\n";
//! let handler = Handler::new();
//! let tokens = tokenize(source, FileId::DUMMY, &handler);
//!
//! assert!(tokens.iter().any(|t| t.kind == TokenKind::Indent));
//! assert!(tokens.iter().any(|t| t.kind == TokenKind::Dedent));
//! assert!(!handler.has_errors());
//! ```

pub mod cursor;
mod edge_cases;
pub mod lexer;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_ident, Token, TokenKind};
