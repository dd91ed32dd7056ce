//! Name resolution and slot assignment.
//!
//! One recursive walk over the AST. Function declarations are registered
//! in the root scope up front so calls may precede their definitions;
//! everything else registers at its declaration site, so units and global
//! variables must be declared before use.
//!
//! Slot dispensers are plain counters carried by the resolver: the global
//! dispenser advances by `sizeof(type)` per global variable in declaration
//! order; the stack dispenser resets at each function and advances over
//! parameters then locals in lexical order; each unit gets a fresh
//! dispenser for its fields.

use f12c_lex::Token;
use f12c_par::{Ast, Decl, DeclId, Expr, ExprId, Program, RootElem, Stmt, StmtId, Ty};
use f12c_util::{Handler, Phase};

use crate::scope::ScopeTree;
use crate::{Analysis, Def, FieldRef};

/// A byte-offset dispenser.
#[derive(Debug, Default)]
struct SlotDispenser {
    current: usize,
}

impl SlotDispenser {
    fn take(&mut self, size: usize) -> usize {
        let slot = self.current;
        self.current += size;
        slot
    }

    fn reset(&mut self) {
        self.current = 0;
    }
}

/// What a resolved expression names: a definition, or a unit field.
#[derive(Clone, Copy, Debug)]
enum Resolved {
    Def(Def),
    Field(FieldRef),
}

pub(crate) fn run(program: &Program, analysis: &mut Analysis, handler: &mut Handler) {
    let mut resolver = Resolver {
        ast: &program.ast,
        analysis,
        handler,
        scopes: ScopeTree::new(),
        globals: SlotDispenser::default(),
        stack: SlotDispenser::default(),
        loop_depth: 0,
    };

    // Register functions first so calls can appear before definitions.
    for element in &program.elements {
        if let RootElem::Decl(id) = element {
            if let Decl::Fun(fun) = program.ast.decl(*id) {
                resolver
                    .scopes
                    .declare(&fun.name, Def::Decl(*id), resolver.handler);
            }
        }
    }

    for element in &program.elements {
        match element {
            RootElem::Decl(id) => resolver.resolve_decl(*id),
            RootElem::Include { token, .. } => {
                resolver
                    .handler
                    .error(Phase::Include, "Include was not resolved", token.span);
            }
        }
    }

    resolver.analysis.globals_size = resolver.globals.current;
}

struct Resolver<'a> {
    ast: &'a Ast,
    analysis: &'a mut Analysis,
    handler: &'a mut Handler,
    scopes: ScopeTree,
    globals: SlotDispenser,
    stack: SlotDispenser,
    loop_depth: usize,
}

impl<'a> Resolver<'a> {
    fn resolve_decl(&mut self, id: DeclId) {
        let ast = self.ast;
        match ast.decl(id) {
            Decl::Fun(fun) => {
                self.scopes.enter();
                self.stack.reset();

                for (index, param) in fun.params.iter().enumerate() {
                    self.resolve_ty(&param.ty);
                    let def = Def::Param(id, index);
                    self.scopes.declare(&param.name, def, self.handler);
                    let slot = self.stack.take(param.ty.size_in_stack());
                    self.analysis.slot_of.insert(def, slot);
                }
                self.resolve_ty(&fun.return_ty);

                self.resolve_block(&fun.body);
                self.analysis.frame_size_of.insert(id, self.stack.current);

                self.scopes.exit();
            }
            Decl::Var(var) => {
                self.resolve_ty(&var.ty);
                if let Some(value) = var.value {
                    self.resolve_expr(value);
                }
                self.scopes.declare(&var.name, Def::Decl(id), self.handler);
                let slot = self.globals.take(var.ty.size_in_stack());
                self.analysis.slot_of.insert(Def::Decl(id), slot);
            }
            Decl::Unit(unit) => {
                self.scopes.declare(&unit.name, Def::Decl(id), self.handler);

                let mut fields = SlotDispenser::default();
                let mut slots = Vec::with_capacity(unit.fields.len());
                for (index, field) in unit.fields.iter().enumerate() {
                    self.resolve_ty(&field.ty);
                    if unit.fields[..index]
                        .iter()
                        .any(|other| other.name.lexeme == field.name.lexeme)
                    {
                        self.handler.error(
                            Phase::NamesResolution,
                            format!(
                                "Item with name \"{}\" is already declared",
                                field.name.lexeme
                            ),
                            field.name.span,
                        );
                    }
                    slots.push(fields.take(field.ty.size_in_stack()));
                }
                self.analysis.unit_size_of.insert(id, fields.current);
                self.analysis.field_slots.insert(id, slots);
            }
        }
    }

    fn resolve_block(&mut self, block: &f12c_par::Block) {
        self.scopes.enter();
        for &stmt in &block.stmts {
            self.resolve_stmt(stmt);
        }
        self.scopes.exit();
    }

    fn resolve_stmt(&mut self, id: StmtId) {
        let ast = self.ast;
        match ast.stmt(id) {
            Stmt::Empty => {}
            Stmt::DeclVar(var) => {
                self.resolve_ty(&var.ty);
                if let Some(value) = var.value {
                    self.resolve_expr(value);
                }
                let def = Def::Local(id);
                self.scopes.declare(&var.name, def, self.handler);
                let slot = self.stack.take(var.ty.size_in_stack());
                self.analysis.slot_of.insert(def, slot);
            }
            Stmt::If {
                cond,
                then_block,
                else_clause,
            } => {
                self.resolve_expr(*cond);
                self.resolve_block(then_block);
                match else_clause {
                    Some(f12c_par::ElseClause::Block(block)) => self.resolve_block(block),
                    Some(f12c_par::ElseClause::If(chained)) => self.resolve_stmt(*chained),
                    None => {}
                }
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(*cond);
                self.loop_depth += 1;
                self.resolve_block(body);
                self.loop_depth -= 1;
            }
            Stmt::Break { token } => self.check_in_loop("break", token),
            Stmt::Continue { token } => self.check_in_loop("continue", token),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.resolve_expr(*value);
                }
            }
            Stmt::Expr { expr } => {
                self.resolve_expr(*expr);
            }
            Stmt::ToStdout { values, .. } => {
                for &value in values {
                    self.resolve_expr(value);
                }
            }
            Stmt::Free { address, .. } => {
                self.resolve_expr(*address);
            }
        }
    }

    fn check_in_loop(&mut self, keyword: &str, token: &Token) {
        if self.loop_depth == 0 {
            self.handler.error(
                Phase::InvalidKeyword,
                format!("'{}' keyword has to be in a loop", keyword),
                token.span,
            );
        }
    }

    /// Resolve an expression's names, recording links in the side tables.
    /// Returns the named thing the expression denotes, when it denotes one,
    /// so that field accesses can climb declared types.
    fn resolve_expr(&mut self, id: ExprId) -> Option<Resolved> {
        let ast = self.ast;
        match ast.expr(id) {
            Expr::LitInt { .. }
            | Expr::LitFloat { .. }
            | Expr::LitStr { .. }
            | Expr::LitChar { .. }
            | Expr::LitBool { .. }
            | Expr::FromStdin { .. } => None,
            Expr::LitArray { items, .. } => {
                for &item in items {
                    self.resolve_expr(item);
                }
                None
            }
            Expr::Binary { left, right, .. } => {
                let (left, right) = (*left, *right);
                self.resolve_expr(left);
                self.resolve_expr(right);
                None
            }
            Expr::Unary { operand, .. } => {
                let operand = *operand;
                self.resolve_expr(operand);
                None
            }
            Expr::Var { name } => {
                let def = self.scopes.resolve(name, self.handler)?;
                self.analysis.decl_of.insert(id, def);
                Some(Resolved::Def(def))
            }
            Expr::Access { object, field } => {
                let object = *object;
                let resolved = self.resolve_expr(object)?;
                self.resolve_field_access(id, resolved, field)
            }
            Expr::Index { array, index } => {
                let (array, index) = (*array, *index);
                self.resolve_expr(index);
                self.resolve_expr(array)
            }
            Expr::Assign { target, value } => {
                let (target, value) = (*target, *value);
                self.resolve_expr(value);
                let resolved = self.resolve_expr(target)?;
                if let Resolved::Def(def) = resolved {
                    if self.analysis.is_const(ast, def) {
                        self.handler.error(
                            Phase::Constant,
                            "Assign to constant variable",
                            ast.expr_span(target),
                        );
                    }
                }
                None
            }
            Expr::Call { name, args } => {
                if let Some(def) = self.scopes.resolve(name, self.handler) {
                    self.analysis.decl_of.insert(id, def);
                }
                let args = args.clone();
                for arg in args {
                    self.resolve_expr(arg);
                }
                None
            }
            Expr::CreateUnit { name, args } => {
                let args = args.clone();
                if let Some(def) = self.scopes.resolve(name, self.handler) {
                    self.analysis.decl_of.insert(id, def);
                    if let Def::Decl(unit_id) = def {
                        if let Decl::Unit(unit) = ast.decl(unit_id) {
                            for arg in &args {
                                let known = unit
                                    .fields
                                    .iter()
                                    .any(|f| f.name.lexeme == arg.field.lexeme);
                                if !known {
                                    self.handler.error(
                                        Phase::NamesResolution,
                                        format!(
                                            "Item with name \"{}\" is not declared",
                                            arg.field.lexeme
                                        ),
                                        arg.field.span,
                                    );
                                }
                            }
                        }
                    }
                }
                for arg in &args {
                    self.resolve_expr(arg.value);
                }
                None
            }
            Expr::NewArray { elem_ty, size, .. } => {
                let size = *size;
                let elem_ty = elem_ty.clone();
                self.resolve_ty(&elem_ty);
                self.resolve_expr(size);
                None
            }
            Expr::NewArrayLit { array } => {
                let array = *array;
                self.resolve_expr(array);
                None
            }
            Expr::NewUnit { unit } => {
                let unit = *unit;
                self.resolve_expr(unit);
                None
            }
        }
    }

    /// Resolve `object.field` once the object's name is known: climb to the
    /// object's declared unit type and find the field inside it.
    fn resolve_field_access(
        &mut self,
        access: ExprId,
        object: Resolved,
        field: &Token,
    ) -> Option<Resolved> {
        let ast = self.ast;

        let object_ty: Ty = match object {
            Resolved::Def(def) => self.analysis.def_ty(ast, def)?.clone(),
            Resolved::Field(fref) => match ast.decl(fref.unit) {
                Decl::Unit(unit) => unit.fields[fref.index].ty.clone(),
                _ => return None,
            },
        };

        let unit_name = object_ty.unit_name()?.clone();
        let unit_def = self.scopes.lookup(&unit_name.lexeme)?;
        let Def::Decl(unit_id) = unit_def else {
            return None;
        };
        let Decl::Unit(unit) = ast.decl(unit_id) else {
            return None;
        };

        let index = unit
            .fields
            .iter()
            .position(|f| f.name.lexeme == field.lexeme);
        match index {
            Some(index) => {
                let fref = FieldRef {
                    unit: unit_id,
                    index,
                };
                self.analysis.field_of.insert(access, fref);
                Some(Resolved::Field(fref))
            }
            None => {
                self.handler.error(
                    Phase::NamesResolution,
                    format!("Item with name \"{}\" is not declared", field.lexeme),
                    field.span,
                );
                None
            }
        }
    }

    /// Resolve the unit name inside a type expression, if it has one.
    fn resolve_ty(&mut self, ty: &Ty) {
        let Some(name) = ty.unit_name() else {
            return;
        };
        let Some(def) = self.scopes.resolve(name, self.handler) else {
            return;
        };
        let is_unit = matches!(def, Def::Decl(id) if matches!(self.ast.decl(id), Decl::Unit(_)));
        if !is_unit {
            self.handler.error(
                Phase::Typing,
                format!("Item \"{}\" is not a unit", name.lexeme),
                name.span,
            );
        }
    }
}
