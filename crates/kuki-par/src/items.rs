//! Declaration parsing - functions, methods, types, interfaces.

use crate::ast::*;
use crate::Parser;
use kuki_lex::TokenKind;

impl<'a> Parser<'a> {
    /// Parse one top-level declaration
    pub(crate) fn parse_decl(&mut self, doc: Option<String>) -> Option<Decl> {
        match self.kind() {
            TokenKind::Func => self.parse_func_decl(doc).map(Decl::Func),
            TokenKind::Type => self.parse_type_decl(doc).map(Decl::Type),
            TokenKind::Interface => self.parse_interface_decl(doc).map(Decl::Interface),
            _ if self.looks_like_var_decl() => {
                let decl = self.parse_var_decl()?;
                self.expect_stmt_end();
                Some(Decl::Var(decl))
            }
            _ => {
                self.error(format!(
                    "expected a declaration, found {}",
                    self.kind().describe()
                ));
                None
            }
        }
    }

    /// Parse a function or method declaration
    ///
    /// `func Add(a int, b int) int` is a function; a leading parenthesized
    /// receiver, `func (s on Stack) Push(v int)`, makes it a method.
    pub(crate) fn parse_func_decl(&mut self, doc: Option<String>) -> Option<FuncDecl> {
        let span = self.span();
        self.advance(); // func

        let receiver = if self.check(TokenKind::LParen) {
            Some(self.parse_receiver()?)
        } else {
            None
        };

        let name = self.expect(TokenKind::Ident)?;
        let params = self.parse_params()?;
        let returns = self.parse_return_types();
        self.expect(TokenKind::Newline)?;
        let body = self.parse_block();

        Some(FuncDecl {
            name: Self::name_of(&name),
            doc,
            receiver,
            params,
            returns,
            body,
            span,
        })
    }

    /// Parse `(name on TYPE)`
    fn parse_receiver(&mut self) -> Option<Receiver> {
        let span = self.span();
        self.expect(TokenKind::LParen)?;
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::On)?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::RParen)?;
        Some(Receiver {
            name: Self::name_of(&name),
            ty,
            span,
        })
    }

    /// Parse a parenthesized parameter list
    ///
    /// Each parameter is `name [many] TYPE`; a `many` parameter must be
    /// last.
    pub(crate) fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let span = self.span();
                let name = self.expect(TokenKind::Ident)?;
                let variadic = self.eat(TokenKind::Many);
                let ty = self.parse_type()?;
                params.push(Param {
                    name: Self::name_of(&name),
                    ty,
                    variadic,
                    span,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        for i in 0..params.len() {
            if params[i].variadic && i + 1 != params.len() {
                self.error_at(params[i].span, "a 'many' parameter must come last");
            }
        }
        Some(params)
    }

    /// Parse the return list of a function header
    ///
    /// Nothing before the NEWLINE means no returns; `(a, b)` is a
    /// multi-return list; anything else is a single return type.
    pub(crate) fn parse_return_types(&mut self) -> Vec<TypeExpr> {
        if self.check(TokenKind::Newline) || self.at_end() {
            return Vec::new();
        }
        if self.check(TokenKind::LParen) {
            self.advance();
            let mut types = Vec::new();
            if !self.check(TokenKind::RParen) {
                loop {
                    match self.parse_type() {
                        Some(ty) => types.push(ty),
                        None => break,
                    }
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen);
            types
        } else {
            match self.parse_type() {
                Some(ty) => vec![ty],
                None => Vec::new(),
            }
        }
    }

    /// Parse `type Name ...`: an indented field block makes a record, an
    /// inline type makes an alias
    fn parse_type_decl(&mut self, doc: Option<String>) -> Option<TypeDecl> {
        let span = self.span();
        self.advance(); // type
        let name = self.expect(TokenKind::Ident)?;

        let kind = if self.check(TokenKind::Newline) {
            self.advance();
            TypeDeclKind::Record(self.parse_field_block())
        } else {
            let ty = self.parse_type()?;
            self.expect_stmt_end();
            TypeDeclKind::Alias(ty)
        };

        Some(TypeDecl {
            name: Self::name_of(&name),
            doc,
            kind,
            span,
        })
    }

    /// Parse the indented `field TYPE` lines of a record body
    fn parse_field_block(&mut self) -> Vec<FieldDef> {
        let mut fields = Vec::new();
        if !self.eat(TokenKind::Indent) {
            self.error("expected an indented field block");
            return fields;
        }
        while !self.check(TokenKind::Dedent) && !self.at_end() {
            let before = self.pos;
            if self.eat(TokenKind::Newline) {
                continue;
            }
            let span = self.span();
            if let Some(name) = self.expect(TokenKind::Ident) {
                if let Some(ty) = self.parse_type() {
                    fields.push(FieldDef {
                        name: Self::name_of(&name),
                        ty,
                        span,
                    });
                }
            }
            self.expect_stmt_end();
            if self.pos == before {
                self.advance();
            }
        }
        self.eat(TokenKind::Dedent);
        fields
    }

    /// Parse `interface Name` with an indented block of method signatures
    fn parse_interface_decl(&mut self, doc: Option<String>) -> Option<InterfaceDecl> {
        let span = self.span();
        self.advance(); // interface
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::Newline)?;

        let mut methods = Vec::new();
        if !self.eat(TokenKind::Indent) {
            self.error("expected an indented block of method signatures");
        } else {
            while !self.check(TokenKind::Dedent) && !self.at_end() {
                let before = self.pos;
                if self.eat(TokenKind::Newline) {
                    continue;
                }
                if let Some(sig) = self.parse_method_sig() {
                    methods.push(sig);
                } else {
                    self.sync();
                }
                if self.pos == before {
                    self.advance();
                }
            }
            self.eat(TokenKind::Dedent);
        }

        Some(InterfaceDecl {
            name: Self::name_of(&name),
            doc,
            methods,
            span,
        })
    }

    /// Parse one `Name(params) [returns]` line inside an interface
    fn parse_method_sig(&mut self) -> Option<MethodSig> {
        let span = self.span();
        let name = self.expect(TokenKind::Ident)?;
        let params = self.parse_params()?;
        let returns = self.parse_return_types();
        self.expect_stmt_end();
        Some(MethodSig {
            name: Self::name_of(&name),
            params,
            returns,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuki_lex::tokenize;
    use kuki_util::{FileId, Handler};

    fn parse_source(source: &str) -> (Program, Handler) {
        let handler = Handler::new();
        let tokens = tokenize(source, FileId::DUMMY, &handler);
        let program = crate::parse(tokens, &handler);
        (program, handler)
    }

    fn only_func(program: &Program) -> &FuncDecl {
        match &program.decls[0] {
            Decl::Func(f) => f,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_function() {
        let source = "func Add(a int, b int) int\n    return a + b\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let func = only_func(&program);
        assert_eq!(func.name.as_str(), "Add");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].name.as_str(), "a");
        assert!(matches!(
            func.params[0].ty,
            TypeExpr::Primitive(PrimitiveType::Int, _)
        ));
        assert_eq!(func.returns.len(), 1);
        assert_eq!(func.body.stmts.len(), 1);
        assert!(func.receiver.is_none());
    }

    #[test]
    fn test_function_multi_return() {
        let source = "func Fetch(url string) (string, error)\n    return \"\", empty\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let func = only_func(&program);
        assert_eq!(func.returns.len(), 2);
        assert!(matches!(
            func.returns[1],
            TypeExpr::Primitive(PrimitiveType::Error, _)
        ));
    }

    #[test]
    fn test_method_receiver() {
        let source = "func (s on Stack) Push(v int)\n    s.items = append(s.items, v)\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let func = only_func(&program);
        let receiver = func.receiver.as_ref().unwrap();
        assert_eq!(receiver.name.as_str(), "s");
        assert!(matches!(&receiver.ty, TypeExpr::Named(n) if n.name.as_str() == "Stack"));
    }

    #[test]
    fn test_reference_receiver() {
        let source = "func (s on reference to Stack) Pop() int\n    return 0\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let func = only_func(&program);
        assert!(matches!(
            func.receiver.as_ref().unwrap().ty,
            TypeExpr::Reference(_, _)
        ));
    }

    #[test]
    fn test_variadic_param() {
        let source = "func Sum(values many int) int\n    return 0\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let func = only_func(&program);
        assert!(func.params[0].variadic);
    }

    #[test]
    fn test_variadic_must_be_last() {
        let source = "func Bad(values many int, x int) int\n    return 0\n";
        let (_, handler) = parse_source(source);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_record_type() {
        let source = "type Point\n    x float\n    y float\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Decl::Type(decl) = &program.decls[0] else {
            panic!("expected type decl");
        };
        let TypeDeclKind::Record(fields) = &decl.kind else {
            panic!("expected record");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name.as_str(), "x");
    }

    #[test]
    fn test_alias_type() {
        let source = "type Celsius float\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors());
        let Decl::Type(decl) = &program.decls[0] else {
            panic!("expected type decl");
        };
        assert!(matches!(decl.kind, TypeDeclKind::Alias(_)));
    }

    #[test]
    fn test_interface() {
        let source = "interface Shape\n    Area() float\n    Scale(f float)\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
        let Decl::Interface(decl) = &program.decls[0] else {
            panic!("expected interface");
        };
        assert_eq!(decl.methods.len(), 2);
        assert_eq!(decl.methods[0].name.as_str(), "Area");
        assert_eq!(decl.methods[0].returns.len(), 1);
        assert_eq!(decl.methods[1].params.len(), 1);
    }

    #[test]
    fn test_top_level_var() {
        let source = "version := 3\n";
        let (program, handler) = parse_source(source);
        assert!(!handler.has_errors());
        assert!(matches!(&program.decls[0], Decl::Var(v) if v.names[0].name.as_str() == "version"));
    }
}
