//! Top-level declarations: functions, global variables, units, includes.
//! Also the type-expression grammar, shared with statements.

use f12c_lex::TokenKind;
use f12c_util::FatalResult;

use crate::ast::{Decl, FunDecl, FunParam, RootElem, UnitDecl, UnitField, VarDecl};
use crate::types::Ty;
use crate::Parser;

impl Parser<'_> {
    pub(crate) fn parse_root_elem(&mut self) -> FatalResult<RootElem> {
        match self.next_kind() {
            TokenKind::HelperInclude => self.parse_helper_include(),
            TokenKind::KwFun => {
                let fun = self.parse_decl_fun()?;
                Ok(RootElem::Decl(self.ast.add_decl(Decl::Fun(fun))))
            }
            TokenKind::KwUnit => {
                let unit = self.parse_decl_unit()?;
                Ok(RootElem::Decl(self.ast.add_decl(Decl::Unit(unit))))
            }
            _ if self.is_next_var_decl() => {
                let var = self.parse_decl_var()?;
                Ok(RootElem::Decl(self.ast.add_decl(Decl::Var(var))))
            }
            _ => {
                let token = self.peek(0).clone();
                Err(self.error("not root element", token.span))
            }
        }
    }

    /// `fun NAME [( PARAMS )] [=> TYPE] { ... }`
    pub(crate) fn parse_decl_fun(&mut self) -> FatalResult<FunDecl> {
        self.expect(TokenKind::KwFun, "fun keyword")?;
        let name = self.expect(TokenKind::Identifier, "identifier")?;

        let params = if self.accept(TokenKind::RoundL).is_some() {
            let params = self.parse_fun_params()?;
            self.expect(TokenKind::RoundR, "\")\"")?;
            params
        } else {
            Vec::new()
        };

        let return_ty = if self.accept(TokenKind::KwFatArrow).is_some() {
            self.expect_type()?
        } else {
            Ty::void()
        };

        let body = self.parse_block()?;

        Ok(FunDecl {
            name,
            params,
            return_ty,
            body,
            builtin: None,
        })
    }

    fn parse_fun_params(&mut self) -> FatalResult<Vec<FunParam>> {
        let mut params = Vec::new();

        if self.next_kind() == TokenKind::RoundR {
            return Ok(params);
        }

        params.push(self.parse_fun_param()?);
        while self.accept(TokenKind::Comma).is_some() {
            params.push(self.parse_fun_param()?);
        }

        Ok(params)
    }

    fn parse_fun_param(&mut self) -> FatalResult<FunParam> {
        let ty = self.expect_type()?;
        let name = self.expect(TokenKind::Identifier, "identifier")?;
        Ok(FunParam { ty, name })
    }

    /// `[const] TYPE NAME [= EXPR];` — shared by globals and locals.
    pub(crate) fn parse_decl_var(&mut self) -> FatalResult<VarDecl> {
        let is_const = self.accept(TokenKind::KwConst).is_some();
        let ty = self.expect_type()?;
        let name = self.expect(TokenKind::Identifier, "identifier")?;

        let value = if self.accept(TokenKind::OpAssign).is_some() {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect(TokenKind::Semi, "\";\"")?;

        Ok(VarDecl {
            ty,
            name,
            value,
            is_const,
        })
    }

    /// `unit NAME { TYPE FIELD; ... }`
    fn parse_decl_unit(&mut self) -> FatalResult<UnitDecl> {
        self.expect(TokenKind::KwUnit, "unit keyword")?;
        let name = self.expect(TokenKind::Identifier, "identifier")?;
        self.expect(TokenKind::CurlyL, "\"{\"")?;

        let mut fields = Vec::new();
        while self.accept(TokenKind::CurlyR).is_none() {
            fields.push(self.parse_decl_unit_field()?);
        }

        Ok(UnitDecl { name, fields })
    }

    fn parse_decl_unit_field(&mut self) -> FatalResult<UnitField> {
        let ty = self.expect_type()?;
        let name = self.expect(TokenKind::Identifier, "identifier")?;
        self.expect(TokenKind::Semi, "\";\"")?;
        Ok(UnitField { ty, name })
    }

    /// `>include "path";`
    fn parse_helper_include(&mut self) -> FatalResult<RootElem> {
        let token = self.expect(TokenKind::HelperInclude, "include helper")?;
        let path = self.expect(TokenKind::LitStr, "string literal")?;
        self.expect(TokenKind::Semi, "\";\"")?;
        Ok(RootElem::Include { token, path })
    }

    /// Decides whether the upcoming tokens are a variable declaration
    /// (`[const] type[][]* name`) rather than an expression statement.
    /// Scans ahead over balanced `[` `]` pairs after the type token.
    pub(crate) fn is_next_var_decl(&self) -> bool {
        if self.next_kind() == TokenKind::KwConst {
            return true;
        }

        if !self.next_kind().is_type_start() {
            return false;
        }

        let mut lookahead = 1;
        loop {
            match self.next_kind_at(lookahead) {
                TokenKind::Identifier => return true,
                TokenKind::SquareL => {
                    if self.next_kind_at(lookahead + 1) == TokenKind::SquareR {
                        lookahead += 2;
                    } else {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// `TYPE := (primitive | unit-name) ("[" "]")*`
    ///
    /// A unit-typed name denotes a pointer to the unit; each `[]` suffix
    /// wraps the type in a pointer-to-array.
    pub(crate) fn expect_type(&mut self) -> FatalResult<Ty> {
        if !self.next_kind().is_type_start() {
            let token = self.bump();
            return Err(self.error("type expected", token.span));
        }

        let type_token = self.bump();

        let mut array_nesting = 0;
        while self.next_kind() == TokenKind::SquareL
            && self.next_kind_at(1) == TokenKind::SquareR
        {
            self.bump();
            self.bump();
            array_nesting += 1;
        }

        let mut ty = match type_token.kind {
            TokenKind::PrimitiveInt => Ty::int(),
            TokenKind::PrimitiveFloat => Ty::float(),
            TokenKind::PrimitiveString => Ty::string(),
            TokenKind::PrimitiveBool => Ty::bool(),
            TokenKind::PrimitiveChar => Ty::char(),
            TokenKind::PrimitiveVoid => Ty::void(),
            TokenKind::Identifier => Ty::pointer_to(Ty::Unit(type_token)),
            _ => unreachable!("is_type_start admitted a non-type token"),
        };

        for _ in 0..array_nesting {
            ty = Ty::pointer_to(Ty::array_of(ty));
        }

        Ok(ty)
    }
}
