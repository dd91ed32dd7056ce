//! Expression grammar: the ten-level precedence ladder.

use f12c_lex::{Token, TokenKind};
use f12c_util::FatalResult;

use crate::ast::{BinOp, Expr, ExprId, UnOp, UnitArg};
use crate::Parser;

impl Parser<'_> {
    pub(crate) fn parse_expr(&mut self) -> FatalResult<ExprId> {
        self.parse_expr_10()
    }

    /// Level 10: assignment. Right-associative; the left side must be a
    /// variable, field access or array access.
    fn parse_expr_10(&mut self) -> FatalResult<ExprId> {
        let result = self.parse_expr_9()?;

        if let Some(assign) = self.accept(TokenKind::OpAssign) {
            if !self.is_assignable(result) {
                return Err(self.error("cannot assign to this expression", assign.span));
            }
            let value = self.parse_expr_10()?;
            return Ok(self.ast.add_expr(Expr::Assign {
                target: result,
                value,
            }));
        }

        Ok(result)
    }

    /// Level 9: `||`.
    fn parse_expr_9(&mut self) -> FatalResult<ExprId> {
        let mut result = self.parse_expr_8()?;

        while self.accept(TokenKind::OpOr).is_some() {
            let right = self.parse_expr_8()?;
            result = self.binary(BinOp::Or, result, right);
        }

        Ok(result)
    }

    /// Level 8: `&&`.
    fn parse_expr_8(&mut self) -> FatalResult<ExprId> {
        let mut result = self.parse_expr_7()?;

        while self.accept(TokenKind::OpAnd).is_some() {
            let right = self.parse_expr_7()?;
            result = self.binary(BinOp::And, result, right);
        }

        Ok(result)
    }

    /// Level 7: `==` and `!=`.
    fn parse_expr_7(&mut self) -> FatalResult<ExprId> {
        let mut result = self.parse_expr_6()?;

        loop {
            if self.accept(TokenKind::OpEq).is_some() {
                let right = self.parse_expr_6()?;
                result = self.binary(BinOp::Eq, result, right);
            } else if self.accept(TokenKind::OpNe).is_some() {
                let right = self.parse_expr_6()?;
                result = self.binary(BinOp::Ne, result, right);
            } else {
                break;
            }
        }

        Ok(result)
    }

    /// Level 6: relational operators. Non-associative: `a < b < c` parses
    /// as `(a < b) < c` never — only a single comparison is consumed.
    fn parse_expr_6(&mut self) -> FatalResult<ExprId> {
        let left = self.parse_expr_5()?;

        let op = if self.accept(TokenKind::OpGt).is_some() {
            BinOp::Gt
        } else if self.accept(TokenKind::OpGe).is_some() {
            BinOp::Ge
        } else if self.accept(TokenKind::OpLt).is_some() {
            BinOp::Lt
        } else if self.accept(TokenKind::OpLe).is_some() {
            BinOp::Le
        } else {
            return Ok(left);
        };

        let right = self.parse_expr_5()?;
        Ok(self.binary(op, left, right))
    }

    /// Level 5: `+` and `-`.
    fn parse_expr_5(&mut self) -> FatalResult<ExprId> {
        let mut result = self.parse_expr_4()?;

        loop {
            if self.accept(TokenKind::OpPlus).is_some() {
                let right = self.parse_expr_4()?;
                result = self.binary(BinOp::Add, result, right);
            } else if self.accept(TokenKind::OpMinus).is_some() {
                let right = self.parse_expr_4()?;
                result = self.binary(BinOp::Sub, result, right);
            } else {
                break;
            }
        }

        Ok(result)
    }

    /// Level 4: `*`, `/` and `%`.
    fn parse_expr_4(&mut self) -> FatalResult<ExprId> {
        let mut result = self.parse_expr_3()?;

        loop {
            if self.accept(TokenKind::OpMul).is_some() {
                let right = self.parse_expr_3()?;
                result = self.binary(BinOp::Mul, result, right);
            } else if self.accept(TokenKind::OpDiv).is_some() {
                let right = self.parse_expr_3()?;
                result = self.binary(BinOp::Div, result, right);
            } else if self.accept(TokenKind::OpMod).is_some() {
                let right = self.parse_expr_3()?;
                result = self.binary(BinOp::Mod, result, right);
            } else {
                break;
            }
        }

        Ok(result)
    }

    /// Level 3: unary `+`, `-` and `!`.
    fn parse_expr_3(&mut self) -> FatalResult<ExprId> {
        let op = if self.accept(TokenKind::OpPlus).is_some() {
            UnOp::Plus
        } else if self.accept(TokenKind::OpMinus).is_some() {
            UnOp::Minus
        } else if self.accept(TokenKind::OpNot).is_some() {
            UnOp::Not
        } else {
            return self.parse_expr_2();
        };

        let operand = self.parse_expr_3()?;
        Ok(self.ast.add_expr(Expr::Unary { op, operand }))
    }

    /// Level 2: `^`, right-associative.
    fn parse_expr_2(&mut self) -> FatalResult<ExprId> {
        let left = self.parse_expr_1()?;

        if self.accept(TokenKind::OpPow).is_some() {
            let right = self.parse_expr_2()?;
            return Ok(self.binary(BinOp::Pow, left, right));
        }

        Ok(left)
    }

    /// Level 1: postfix indexing and field access, valid only after
    /// assignable expressions.
    fn parse_expr_1(&mut self) -> FatalResult<ExprId> {
        let mut result = self.parse_expr_0()?;

        if self.is_assignable(result) {
            loop {
                if self.accept(TokenKind::SquareL).is_some() {
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::SquareR, "\"]\"")?;
                    result = self.ast.add_expr(Expr::Index {
                        array: result,
                        index,
                    });
                } else if self.accept(TokenKind::OpAccess).is_some() {
                    let field = self.expect(TokenKind::Identifier, "identifier")?;
                    result = self.ast.add_expr(Expr::Access {
                        object: result,
                        field,
                    });
                } else {
                    break;
                }
            }
        }

        Ok(result)
    }

    /// Level 0: primary expressions.
    fn parse_expr_0(&mut self) -> FatalResult<ExprId> {
        let token = self.bump();

        match token.kind {
            TokenKind::LitStr => Ok(self.ast.add_expr(Expr::LitStr { token })),
            TokenKind::LitFloat => {
                let value = match token.lexeme.parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        return Err(self.error("invalid float literal", token.span));
                    }
                };
                Ok(self.ast.add_expr(Expr::LitFloat { token, value }))
            }
            TokenKind::LitInt => {
                let value = match token.lexeme.parse::<i32>() {
                    Ok(value) => value,
                    Err(_) => {
                        return Err(self.error("integer literal out of range", token.span));
                    }
                };
                Ok(self.ast.add_expr(Expr::LitInt { token, value }))
            }
            TokenKind::LitChar => {
                let value = match token.lexeme.chars().next() {
                    Some(value) => value,
                    None => return Err(self.error("invalid char literal", token.span)),
                };
                Ok(self.ast.add_expr(Expr::LitChar { token, value }))
            }
            TokenKind::ConstantTrue | TokenKind::ConstantFalse => {
                let value = token.kind == TokenKind::ConstantTrue;
                Ok(self.ast.add_expr(Expr::LitBool { token, value }))
            }
            TokenKind::SquareL => {
                let items = self.parse_array_values()?;
                Ok(self.ast.add_expr(Expr::LitArray {
                    start: token,
                    items,
                }))
            }
            TokenKind::RoundL => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RoundR, "\")\"")?;
                Ok(inner)
            }
            TokenKind::KwFromStdin => Ok(self.ast.add_expr(Expr::FromStdin { token })),
            TokenKind::Identifier => {
                if self.next_kind() == TokenKind::RoundL {
                    return self.parse_fun_call(token);
                }
                if self.next_kind() == TokenKind::Pipe {
                    return self.parse_unit_call(token);
                }
                Ok(self.ast.add_expr(Expr::Var { name: token }))
            }
            TokenKind::KwNew => self.parse_new(token),
            _ => Err(self.error("Unrecognized symbol", token.span)),
        }
    }

    /// The forms of `new`: `new [a, b]`, `new U|...|` and `new T[size]`.
    fn parse_new(&mut self, new_token: Token) -> FatalResult<ExprId> {
        if self.next_kind() == TokenKind::SquareL {
            let start = self.bump();
            let items = self.parse_array_values()?;
            let array = self.ast.add_expr(Expr::LitArray { start, items });
            return Ok(self.ast.add_expr(Expr::NewArrayLit { array }));
        }

        let elem_ty = self.expect_type()?;

        if self.next_kind() == TokenKind::Pipe {
            if let Some(unit_name) = elem_ty.unit_name().cloned() {
                let unit = self.parse_unit_call(unit_name)?;
                return Ok(self.ast.add_expr(Expr::NewUnit { unit }));
            }
        }

        self.expect(TokenKind::SquareL, "\"[\"")?;
        let size = self.parse_expr()?;
        self.expect(TokenKind::SquareR, "\"]\"")?;

        Ok(self.ast.add_expr(Expr::NewArray {
            token: new_token,
            elem_ty,
            size,
        }))
    }

    /// `NAME ( ARG, ... )` with the name already consumed.
    fn parse_fun_call(&mut self, name: Token) -> FatalResult<ExprId> {
        self.expect(TokenKind::RoundL, "\"(\"")?;
        let mut args = Vec::new();
        while self.accept(TokenKind::RoundR).is_none() {
            args.push(self.parse_expr()?);
            self.accept(TokenKind::Comma);
        }
        Ok(self.ast.add_expr(Expr::Call { name, args }))
    }

    /// `NAME | FIELD: EXPR, ... |` with the name already consumed.
    fn parse_unit_call(&mut self, name: Token) -> FatalResult<ExprId> {
        self.expect(TokenKind::Pipe, "\"|\"")?;
        let mut args = Vec::new();
        while self.accept(TokenKind::Pipe).is_none() {
            args.push(self.parse_unit_arg()?);
            self.accept(TokenKind::Comma);
        }
        Ok(self.ast.add_expr(Expr::CreateUnit { name, args }))
    }

    fn parse_unit_arg(&mut self) -> FatalResult<UnitArg> {
        let field = self.expect(TokenKind::Identifier, "identifier")?;
        self.expect(TokenKind::Colon, "\":\"")?;
        let value = self.parse_expr()?;
        Ok(UnitArg { field, value })
    }

    /// `[ EXPR, ... ]` with the opening bracket already consumed.
    fn parse_array_values(&mut self) -> FatalResult<Vec<ExprId>> {
        let mut items = Vec::new();
        while self.accept(TokenKind::SquareR).is_none() {
            items.push(self.parse_expr()?);
            self.accept(TokenKind::Comma);
        }
        Ok(items)
    }

    fn binary(&mut self, op: BinOp, left: ExprId, right: ExprId) -> ExprId {
        self.ast.add_expr(Expr::Binary { op, left, right })
    }

    fn is_assignable(&self, expr: ExprId) -> bool {
        matches!(
            self.ast.expr(expr),
            Expr::Var { .. } | Expr::Access { .. } | Expr::Index { .. }
        )
    }
}
