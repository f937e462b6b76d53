//! Type annotation parsing.
//!
//! Kukicha spells compound types with words: `list of int`,
//! `map of string to int`, `channel of byte`, `reference to Point`. A
//! plain identifier is either a primitive name or a (possibly
//! module-qualified) named type.

use crate::ast::*;
use crate::Parser;
use kuki_lex::TokenKind;

impl<'a> Parser<'a> {
    /// Parse a type annotation
    pub(crate) fn parse_type(&mut self) -> Option<TypeExpr> {
        let span = self.span();
        match self.kind() {
            TokenKind::List => {
                self.advance();
                self.expect(TokenKind::Of)?;
                let elem = self.parse_type()?;
                Some(TypeExpr::List(Box::new(elem), span))
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::Of)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::To)?;
                let value = self.parse_type()?;
                Some(TypeExpr::Map(Box::new(key), Box::new(value), span))
            }
            TokenKind::Channel => {
                self.advance();
                self.expect(TokenKind::Of)?;
                let elem = self.parse_type()?;
                Some(TypeExpr::Channel(Box::new(elem), span))
            }
            TokenKind::Reference => {
                self.advance();
                self.expect(TokenKind::To)?;
                let inner = self.parse_type()?;
                Some(TypeExpr::Reference(Box::new(inner), span))
            }
            TokenKind::Many => {
                self.advance();
                let inner = self.parse_type()?;
                Some(TypeExpr::Variadic(Box::new(inner), span))
            }
            TokenKind::ErrorKw => {
                self.advance();
                Some(TypeExpr::Primitive(PrimitiveType::Error, span))
            }
            TokenKind::Func => self.parse_func_type(),
            TokenKind::Ident => {
                let name = self.advance();
                if let Some(prim) = PrimitiveType::from_str(&name.lexeme) {
                    return Some(TypeExpr::Primitive(prim, span));
                }
                // Module-qualified name: `json.Value`
                if self.check(TokenKind::Dot) && self.peek_kind(1) == TokenKind::Ident {
                    self.advance(); // dot
                    let member = self.advance();
                    return Some(TypeExpr::Named(NamedType {
                        module: Some(Self::name_of(&name)),
                        name: Self::name_of(&member),
                        span,
                    }));
                }
                Some(TypeExpr::Named(NamedType {
                    module: None,
                    name: Self::name_of(&name),
                    span,
                }))
            }
            _ => {
                self.error(format!("expected a type, found {}", self.kind().describe()));
                None
            }
        }
    }

    /// Parse `func(params) [returns]`
    fn parse_func_type(&mut self) -> Option<TypeExpr> {
        let span = self.span();
        self.advance(); // func
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let returns = if self.type_starts_here() {
            self.parse_return_types()
        } else {
            Vec::new()
        };

        Some(TypeExpr::Func(FuncType {
            params,
            returns,
            span,
        }))
    }

    /// True when the current token can begin a type annotation
    pub(crate) fn type_starts_here(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Ident
                | TokenKind::List
                | TokenKind::Map
                | TokenKind::Channel
                | TokenKind::Reference
                | TokenKind::Many
                | TokenKind::ErrorKw
                | TokenKind::Func
                | TokenKind::LParen
        )
    }
}
