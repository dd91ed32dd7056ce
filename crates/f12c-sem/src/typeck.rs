//! Type resolution.
//!
//! Bottom-up: every expression computes a type, every use unifies with the
//! expected type. Unification is structural (see
//! [`f12c_par::types::types_match`]); a mismatch reports
//! `Expected: X, got: Y` against the use's reference token. The computed
//! types are recorded in [`Analysis::ty_of`] for the emitter, which needs
//! them for operand sizes and for the int/float instruction selection.

use f12c_par::{
    types_match, Ast, BinOp, Block, Decl, DeclId, ElseClause, Expr, ExprId, Program, RootElem,
    Stmt, StmtId, Ty, UnOp,
};
use f12c_util::{Handler, Phase, Span};

use crate::{Analysis, Def};

pub(crate) fn run(program: &Program, analysis: &mut Analysis, handler: &mut Handler) {
    let mut checker = Checker {
        ast: &program.ast,
        analysis,
        handler,
        current_fun: None,
    };

    for element in &program.elements {
        if let RootElem::Decl(id) = element {
            checker.check_decl(*id);
        }
    }
}

struct Checker<'a> {
    ast: &'a Ast,
    analysis: &'a mut Analysis,
    handler: &'a mut Handler,
    current_fun: Option<DeclId>,
}

impl<'a> Checker<'a> {
    fn check_decl(&mut self, id: DeclId) {
        let ast = self.ast;
        match ast.decl(id) {
            Decl::Fun(fun) => {
                for param in &fun.params {
                    if !param.ty.is_valid_var_type() {
                        self.typing_error(
                            "Cannot create a parameter of the given type",
                            param.name.span,
                        );
                    }
                }
                self.current_fun = Some(id);
                self.check_block(&fun.body);
                self.current_fun = None;
            }
            Decl::Var(var) => self.check_var_decl(var),
            Decl::Unit(unit) => {
                for field in &unit.fields {
                    if !field.ty.is_valid_var_type() {
                        self.typing_error("Cannot create a field of the given type", field.name.span);
                    }
                }
            }
        }
    }

    fn check_var_decl(&mut self, var: &f12c_par::VarDecl) {
        if !var.ty.is_valid_var_type() {
            self.typing_error("Cannot create a variable of the given type", var.name.span);
            return;
        }
        if let Some(value) = var.value {
            let value_ty = self.check_expr(value);
            self.unify(var.name.span, &var.ty, value_ty.as_ref(), None);
        }
    }

    fn check_block(&mut self, block: &Block) {
        for &stmt in &block.stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, id: StmtId) {
        let ast = self.ast;
        match ast.stmt(id) {
            Stmt::Empty | Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::DeclVar(var) => self.check_var_decl(var),
            Stmt::If {
                cond,
                then_block,
                else_clause,
            } => {
                let cond = *cond;
                let cond_ty = self.check_expr(cond);
                self.unify(ast.expr_span(cond), &Ty::bool(), cond_ty.as_ref(), None);
                self.check_block(then_block);
                match else_clause {
                    Some(ElseClause::Block(block)) => self.check_block(block),
                    Some(ElseClause::If(chained)) => self.check_stmt(*chained),
                    None => {}
                }
            }
            Stmt::While { cond, body } => {
                let cond = *cond;
                let cond_ty = self.check_expr(cond);
                self.unify(ast.expr_span(cond), &Ty::bool(), cond_ty.as_ref(), None);
                self.check_block(body);
            }
            Stmt::Return { token, value } => {
                let ret_ty = self
                    .current_fun
                    .and_then(|fun| match ast.decl(fun) {
                        Decl::Fun(fun) => Some(fun.return_ty.clone()),
                        _ => None,
                    })
                    .unwrap_or_else(Ty::void);
                let value_ty = match value {
                    Some(value) => self.check_expr(*value),
                    None => Some(Ty::void()),
                };
                self.unify(token.span, &ret_ty, value_ty.as_ref(), None);
            }
            Stmt::Expr { expr } => {
                self.check_expr(*expr);
            }
            Stmt::ToStdout { values, .. } => {
                for &value in values {
                    if let Some(ty) = self.check_expr(value) {
                        if !matches!(ty, Ty::Primitive(_)) {
                            self.typing_error(
                                format!("You cannot print {}", ty),
                                ast.expr_span(value),
                            );
                        }
                    }
                }
            }
            Stmt::Free { address, .. } => {
                let address = *address;
                let ty = self.check_expr(address);
                self.unify(
                    ast.expr_span(address),
                    &Ty::any_pointer(),
                    ty.as_ref(),
                    None,
                );
            }
        }
    }

    /// Compute (and record) the type of an expression.
    fn check_expr(&mut self, id: ExprId) -> Option<Ty> {
        let ty = self.expr_ty_uncached(id);
        if let Some(ty) = &ty {
            self.analysis.ty_of.insert(id, ty.clone());
        }
        ty
    }

    fn expr_ty_uncached(&mut self, id: ExprId) -> Option<Ty> {
        let ast = self.ast;
        match ast.expr(id) {
            Expr::LitInt { .. } => Some(Ty::int()),
            Expr::LitFloat { .. } => Some(Ty::float()),
            Expr::LitStr { .. } => Some(Ty::string()),
            Expr::LitChar { .. } => Some(Ty::char()),
            Expr::LitBool { .. } => Some(Ty::bool()),
            Expr::FromStdin { .. } => Some(Ty::char()),
            Expr::LitArray { items, .. } => {
                if items.is_empty() {
                    self.typing_error("Array cannot be empty", ast.expr_span(id));
                    return None;
                }
                let first_ty = self.check_expr(items[0]);
                for &item in &items[1..] {
                    let item_ty = self.check_expr(item);
                    if let Some(first_ty) = &first_ty {
                        self.unify(ast.expr_span(item), first_ty, item_ty.as_ref(), None);
                    }
                }
                first_ty.map(Ty::array_of)
            }
            Expr::Binary { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                self.check_binary(op, left, right)
            }
            Expr::Unary { op, operand } => {
                let (op, operand) = (*op, *operand);
                let operand_ty = self.check_expr(operand);
                match op {
                    UnOp::Plus | UnOp::Minus => {
                        let ty = operand_ty?;
                        if ty.is_arithmetic() {
                            Some(ty)
                        } else {
                            self.typing_error(
                                "Unary operators applicable only to int and float",
                                ast.expr_span(operand),
                            );
                            None
                        }
                    }
                    UnOp::Not => {
                        self.unify(
                            ast.expr_span(operand),
                            &Ty::bool(),
                            operand_ty.as_ref(),
                            None,
                        );
                        Some(Ty::bool())
                    }
                }
            }
            Expr::Var { name } => {
                let def = *self.analysis.decl_of.get(&id)?;
                match self.analysis.def_ty(ast, def) {
                    Some(ty) => Some(ty.clone()),
                    None => {
                        self.typing_error("Not a valid type for variable", name.span);
                        None
                    }
                }
            }
            Expr::Access { object, .. } => {
                let object = *object;
                let object_ty = self.check_expr(object);
                if let Some(object_ty) = &object_ty {
                    if object_ty.unit_name().is_none() {
                        self.typing_error("You cannot access this type", ast.expr_span(object));
                        return None;
                    }
                }
                let fref = *self.analysis.field_of.get(&id)?;
                match ast.decl(fref.unit) {
                    Decl::Unit(unit) => Some(unit.fields[fref.index].ty.clone()),
                    _ => None,
                }
            }
            Expr::Index { array, index } => {
                let (array, index) = (*array, *index);
                let array_ty = self.check_expr(array)?;
                if !array_ty.is_iterable() {
                    self.typing_error(
                        format!("You cannot access variable of {}", array_ty),
                        ast.expr_span(array),
                    );
                    return None;
                }
                let index_ty = self.check_expr(index);
                self.unify(ast.expr_span(index), &Ty::int(), index_ty.as_ref(), None);
                array_ty.iterable_element_type()
            }
            Expr::Assign { target, value } => {
                let (target, value) = (*target, *value);
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                if let Some(target_ty) = &target_ty {
                    self.unify(ast.expr_span(target), target_ty, value_ty.as_ref(), None);
                }
                value_ty
            }
            Expr::Call { name, args } => {
                let def = *self.analysis.decl_of.get(&id)?;
                let Def::Decl(fun_id) = def else {
                    self.typing_error(
                        format!("Item \"{}\" is not a function", name.lexeme),
                        name.span,
                    );
                    return None;
                };
                let Decl::Fun(fun) = ast.decl(fun_id) else {
                    self.typing_error(
                        format!("Item \"{}\" is not a function", name.lexeme),
                        name.span,
                    );
                    return None;
                };

                if fun.params.len() != args.len() {
                    self.typing_error(
                        format!(
                            "Wrong number of arguments. Expected: {}, got: {}",
                            fun.params.len(),
                            args.len()
                        ),
                        name.span,
                    );
                } else {
                    let args = args.clone();
                    let param_tys: Vec<Ty> = fun.params.iter().map(|p| p.ty.clone()).collect();
                    for (arg, param_ty) in args.iter().zip(param_tys.iter()) {
                        let arg_ty = self.check_expr(*arg);
                        self.unify(ast.expr_span(*arg), param_ty, arg_ty.as_ref(), None);
                    }
                }
                Some(fun.return_ty.clone())
            }
            Expr::CreateUnit { name, args } => {
                let def = *self.analysis.decl_of.get(&id)?;
                let Def::Decl(unit_id) = def else {
                    self.typing_error(format!("Item \"{}\" is not a unit", name.lexeme), name.span);
                    return None;
                };
                let Decl::Unit(unit) = ast.decl(unit_id) else {
                    self.typing_error(format!("Item \"{}\" is not a unit", name.lexeme), name.span);
                    return None;
                };

                if unit.fields.len() != args.len() {
                    self.typing_error("Wrong number of arguments", name.span);
                    return None;
                }

                for field in &unit.fields {
                    if !field.ty.is_valid_var_type() {
                        continue;
                    }
                    let arg = args.iter().find(|a| a.field.lexeme == field.name.lexeme);
                    match arg {
                        Some(arg) => {
                            let (value, field_ty) = (arg.value, field.ty.clone());
                            let value_ty = self.check_expr(value);
                            self.unify(ast.expr_span(value), &field_ty, value_ty.as_ref(), None);
                        }
                        None => {
                            self.typing_error(
                                format!("There is no argument for '{}'", field.name.lexeme),
                                name.span,
                            );
                        }
                    }
                }

                Some(Ty::Unit(unit.name.clone()))
            }
            Expr::NewArray { elem_ty, size, .. } => {
                let (elem_ty, size) = (elem_ty.clone(), *size);
                let size_ty = self.check_expr(size);
                self.unify(ast.expr_span(size), &Ty::int(), size_ty.as_ref(), None);
                Some(Ty::pointer_to(Ty::array_of(elem_ty)))
            }
            Expr::NewArrayLit { array } => {
                let array = *array;
                let array_ty = self.check_expr(array)?;
                Some(Ty::pointer_to(array_ty))
            }
            Expr::NewUnit { unit } => {
                let unit = *unit;
                let unit_ty = self.check_expr(unit)?;
                Some(Ty::pointer_to(unit_ty))
            }
        }
    }

    fn check_binary(&mut self, op: BinOp, left: ExprId, right: ExprId) -> Option<Ty> {
        let ast = self.ast;
        let left_ty = self.check_expr(left);
        let right_ty = self.check_expr(right);
        let reference = ast.expr_span(left);

        if op.is_logic() {
            self.unify(reference, &Ty::bool(), left_ty.as_ref(), None);
            self.unify(ast.expr_span(right), &Ty::bool(), right_ty.as_ref(), None);
            return Some(Ty::bool());
        }

        let left_ty = left_ty?;

        if op.is_arithmetic() {
            if left_ty.is_arithmetic() {
                self.unify(
                    reference,
                    &left_ty,
                    right_ty.as_ref(),
                    Some("Right operand type does not match left's one"),
                );
            } else {
                self.typing_error(
                    format!(
                        "Cannot perform arithmetic operations with type \"{}\"",
                        left_ty
                    ),
                    reference,
                );
            }
            return Some(left_ty);
        }

        if op.is_comparison() {
            if left_ty.is_comparable() {
                self.unify(
                    reference,
                    &left_ty,
                    right_ty.as_ref(),
                    Some("Right operand type does not match left's one"),
                );
            } else {
                self.typing_error(
                    format!("Cannot perform compare operations with {}", left_ty),
                    reference,
                );
            }
            return Some(Ty::bool());
        }

        // Equality.
        if left_ty.has_value() {
            self.unify(
                reference,
                &left_ty,
                right_ty.as_ref(),
                Some("Valueless expressions cannot be comparable"),
            );
        } else {
            self.typing_error(
                format!("Cannot perform equality operations with {}", left_ty),
                reference,
            );
        }
        Some(Ty::bool())
    }

    /// Unify a use's type with the expected type, reporting
    /// `Expected: X, got: Y` (or the given message) on mismatch. An
    /// already-failed operand (`None`) unifies silently.
    fn unify(&mut self, span: Span, expected: &Ty, got: Option<&Ty>, message: Option<&str>) {
        let Some(got) = got else {
            return;
        };
        if !types_match(expected, got) {
            let message = match message {
                Some(message) => message.to_string(),
                None => format!("Expected: {}, got: {}", expected, got),
            };
            self.handler.error(Phase::TypeMismatch, message, span);
        }
    }

    fn typing_error(&mut self, message: impl Into<String>, span: Span) {
        self.handler.error(Phase::Typing, message, span);
    }
}
