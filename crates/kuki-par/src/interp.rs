//! String interpolation parsing.
//!
//! The lexer hands string literals over with their `{...}` segments
//! intact. This module splits a literal into alternating text and
//! expression parts, re-lexing and re-parsing each segment with the full
//! expression grammar. Positions inside a segment are remapped onto the
//! string token's line so diagnostics point into the literal.

use crate::ast::*;
use crate::Parser;
use kuki_lex::{tokenize, Token};
use kuki_util::{Handler, Span};

impl<'a> Parser<'a> {
    /// Turn a STRING token into a [`StrExpr`], parsing `{...}` segments
    ///
    /// Parts alternate text and expressions, with empty text parts kept as
    /// spacers so the alternation always holds.
    pub(crate) fn parse_string_literal(&mut self, token: Token) -> Option<Expr> {
        let id = self.fresh_id();
        let span = token.span;

        if !token.lexeme.contains('{') && !token.lexeme.contains('}') {
            return Some(Expr::Str(StrExpr {
                id,
                parts: vec![StringPart::Text(token.lexeme)],
                span,
            }));
        }

        let chars: Vec<char> = token.lexeme.chars().collect();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '{' => {
                    // Find the matching close brace; interpolated
                    // expressions may themselves contain braces.
                    let mut depth = 1usize;
                    let mut j = i + 1;
                    while j < chars.len() {
                        match chars[j] {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        j += 1;
                    }
                    if depth != 0 {
                        self.error_at(span, "unclosed '{' in interpolated string");
                        text.extend(&chars[i..]);
                        break;
                    }

                    let inner: String = chars[i + 1..j].iter().collect();
                    parts.push(StringPart::Text(std::mem::take(&mut text)));
                    if let Some(expr) = self.parse_segment(&inner, span, i + 1) {
                        parts.push(StringPart::Expr(Box::new(expr)));
                    }
                    i = j + 1;
                }
                '}' => {
                    self.error_at(span, "stray '}' in interpolated string");
                    i += 1;
                }
                c => {
                    text.push(c);
                    i += 1;
                }
            }
        }
        parts.push(StringPart::Text(text));

        Some(Expr::Str(StrExpr { id, parts, span }))
    }

    /// Re-lex and re-parse one `{...}` segment
    ///
    /// `offset` is the character offset of the segment inside the string's
    /// processed text; it anchors remapped positions.
    fn parse_segment(&mut self, text: &str, str_span: Span, offset: usize) -> Option<Expr> {
        let remap = |inner: Span| {
            Span::with_file(
                str_span.start,
                str_span.end,
                str_span.file_id,
                str_span.line,
                // +1 for the opening quote; inner columns are 1-based.
                str_span.column + 1 + offset as u32 + inner.column.saturating_sub(1),
            )
        };

        let segment_handler = Handler::new();
        let tokens = tokenize(text, str_span.file_id, &segment_handler);
        for mut diag in segment_handler.take() {
            diag.span = remap(diag.span);
            self.handler.emit(diag);
        }

        let tokens: Vec<Token> = tokens
            .into_iter()
            .map(|mut t| {
                t.span = remap(t.span);
                t
            })
            .collect();

        let mut segment = Parser::new(tokens, self.handler);
        segment.next_node_id = self.next_node_id;
        let expr = segment.parse_expression();
        self.next_node_id = segment.next_node_id;

        if expr.is_none() {
            self.error_at(str_span, "expected an expression inside '{...}'");
        }
        expr
    }
}
