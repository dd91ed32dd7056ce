//! Statement grammar.

use f12c_lex::TokenKind;
use f12c_util::FatalResult;

use crate::ast::{Block, ElseClause, Stmt, StmtId};
use crate::Parser;

impl Parser<'_> {
    /// `{ STMT* }`
    pub(crate) fn parse_block(&mut self) -> FatalResult<Block> {
        self.expect(TokenKind::CurlyL, "\"{\"")?;

        let mut stmts = Vec::new();
        while self.accept(TokenKind::CurlyR).is_none() {
            let stmt = self.parse_statement()?;
            stmts.push(stmt);
        }

        Ok(Block { stmts })
    }

    pub(crate) fn parse_statement(&mut self) -> FatalResult<StmtId> {
        if self.is_next_var_decl() {
            let var = self.parse_decl_var()?;
            return Ok(self.ast.add_stmt(Stmt::DeclVar(var)));
        }

        if self.accept(TokenKind::Semi).is_some() {
            return Ok(self.ast.add_stmt(Stmt::Empty));
        }

        match self.next_kind() {
            TokenKind::KwBreak => {
                let token = self.expect(TokenKind::KwBreak, "keyword break")?;
                self.expect(TokenKind::Semi, "\";\"")?;
                Ok(self.ast.add_stmt(Stmt::Break { token }))
            }
            TokenKind::KwContinue => {
                let token = self.expect(TokenKind::KwContinue, "keyword continue")?;
                self.expect(TokenKind::Semi, "\";\"")?;
                Ok(self.ast.add_stmt(Stmt::Continue { token }))
            }
            TokenKind::KwRet => {
                let token = self.expect(TokenKind::KwRet, "keyword ret")?;
                if self.accept(TokenKind::Semi).is_some() {
                    return Ok(self.ast.add_stmt(Stmt::Return { token, value: None }));
                }
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semi, "\";\"")?;
                Ok(self.ast.add_stmt(Stmt::Return {
                    token,
                    value: Some(value),
                }))
            }
            TokenKind::KwToStdout => {
                let token = self.bump();
                let mut values = Vec::new();
                while self.accept(TokenKind::Semi).is_none() {
                    values.push(self.parse_expr()?);
                    self.accept(TokenKind::Comma);
                }
                if values.is_empty() {
                    return Err(self.error("at least one value expected", token.span));
                }
                Ok(self.ast.add_stmt(Stmt::ToStdout { token, values }))
            }
            TokenKind::KwWhile => {
                self.bump();
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(self.ast.add_stmt(Stmt::While { cond, body }))
            }
            TokenKind::KwIf => self.parse_stmt_if(),
            TokenKind::KwFree => {
                let token = self.bump();
                let address = self.parse_expr()?;
                self.expect(TokenKind::Semi, "\";\"")?;
                Ok(self.ast.add_stmt(Stmt::Free { token, address }))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semi, "\";\"")?;
                Ok(self.ast.add_stmt(Stmt::Expr { expr }))
            }
        }
    }

    /// `if EXPR { ... } [else (if ... | { ... })]`
    fn parse_stmt_if(&mut self) -> FatalResult<StmtId> {
        self.expect(TokenKind::KwIf, "keyword if")?;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;

        let else_clause = if self.accept(TokenKind::KwElse).is_some() {
            if self.next_kind() == TokenKind::KwIf {
                let chained = self.parse_stmt_if()?;
                Some(ElseClause::If(chained))
            } else {
                Some(ElseClause::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(self.ast.add_stmt(Stmt::If {
            cond,
            then_block,
            else_clause,
        }))
    }
}
