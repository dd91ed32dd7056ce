//! AST-to-bytecode lowering.
//!
//! Program layout: the globals allocation and initializers come first, then
//! `FN_CALL_BEGIN; FN_CALL main 0; EXIT`, then every function body, and
//! finally the string pool. Function labels are created up front so call
//! sites can reference functions defined later; `place_label` patches the
//! placeholders once the body is emitted.
//!
//! Emission runs only on error-free programs; a missing analysis entry here
//! is a compiler bug and panics.

use f12c_ops::Op;
use f12c_par::{
    Ast, Block, Builtin, Decl, DeclId, ElseClause, Expr, ExprId, FunDecl, Prim, Program, RootElem,
    Stmt, StmtId, Ty, UnOp, UnitArg,
};
use f12c_sem::{Analysis, Def};
use rustc_hash::FxHashMap;

use crate::writer::{CodeWriter, LabelId, Operand};

/// Lower an analyzed program to its bytecode buffer.
pub fn emit_program(program: &Program, analysis: &Analysis) -> Vec<u8> {
    let mut emitter = Emitter {
        ast: &program.ast,
        analysis,
        writer: CodeWriter::new(),
        fn_labels: FxHashMap::default(),
    };
    emitter.emit(program);
    emitter.writer.finish()
}

struct Emitter<'a> {
    ast: &'a Ast,
    analysis: &'a Analysis,
    writer: CodeWriter,
    fn_labels: FxHashMap<DeclId, LabelId>,
}

impl<'a> Emitter<'a> {
    fn emit(&mut self, program: &Program) {
        let ast = self.ast;

        let mut global_vars = Vec::new();
        let mut functions = Vec::new();
        for element in &program.elements {
            let RootElem::Decl(id) = element else {
                panic!("unresolved include reached emission");
            };
            match ast.decl(*id) {
                Decl::Var(var) => global_vars.push((*id, var)),
                Decl::Fun(fun) => {
                    let label = self.writer.new_label();
                    self.fn_labels.insert(*id, label);
                    functions.push((*id, fun));
                }
                Decl::Unit(_) => {}
            }
        }

        // Globals live at the base of the stack.
        self.writer.write(
            Op::AllocateInStack,
            &[Operand::Int(self.analysis.globals_size as i32)],
        );
        for (id, var) in &global_vars {
            if let Some(value) = var.value {
                self.write_expr(value);
                let slot = self.analysis.slot_of[&Def::Decl(*id)];
                self.writer.write(
                    Op::SetGlobal,
                    &[
                        Operand::Int(slot as i32),
                        Operand::Int(var.ty.size_in_stack() as i32),
                    ],
                );
            }
        }

        // Call the entry point, then halt.
        let main_id = self.analysis.main_fun.expect("entry point was checked");
        let main_label = self.fn_labels[&main_id];
        self.writer.write(Op::FnCallBegin, &[]);
        self.writer
            .write(Op::FnCall, &[Operand::Label(main_label), Operand::Int(0)]);
        self.writer.write(Op::Exit, &[]);

        for (id, fun) in functions {
            self.write_function(id, fun);
        }

        self.writer.place_string_pool();
    }

    fn write_function(&mut self, id: DeclId, fun: &FunDecl) {
        let label = self.fn_labels[&id];
        self.writer.place_label(label);

        if let Some(builtin) = fun.builtin {
            self.write_builtin_body(id, fun, builtin);
            return;
        }

        let frame_size = self.analysis.frame_size_of[&id];
        if frame_size > 0 {
            self.writer
                .write(Op::AllocateInStack, &[Operand::Int(frame_size as i32)]);
        }
        self.write_block(&fun.body);
        self.writer.write(Op::Ret, &[]);
    }

    /// A builtin's body pushes its parameters back onto the stack and runs
    /// the dedicated opcode.
    fn write_builtin_body(&mut self, id: DeclId, fun: &FunDecl, builtin: Builtin) {
        let frame_size = self.analysis.frame_size_of[&id];
        if frame_size > 0 {
            self.writer
                .write(Op::AllocateInStack, &[Operand::Int(frame_size as i32)]);
        }
        for (index, param) in fun.params.iter().enumerate() {
            let slot = self.analysis.slot_of[&Def::Param(id, index)];
            self.writer.write(
                Op::GetLocal,
                &[
                    Operand::Int(slot as i32),
                    Operand::Int(param.ty.size_in_stack() as i32),
                ],
            );
        }
        let op = match builtin {
            Builtin::ClearScreen => Op::ClearScreen,
            Builtin::PutCharXY => Op::PutCharXY,
            Builtin::Sleep => Op::Sleep,
        };
        self.writer.write(op, &[]);
        self.writer.write(Op::Ret, &[]);
    }

    fn write_block(&mut self, block: &Block) {
        for &stmt in &block.stmts {
            self.write_stmt(stmt);
        }
    }

    fn write_stmt(&mut self, id: StmtId) {
        let ast = self.ast;
        match ast.stmt(id) {
            Stmt::Empty => {}
            Stmt::DeclVar(var) => {
                if let Some(value) = var.value {
                    self.write_expr(value);
                    let slot = self.analysis.slot_of[&Def::Local(id)];
                    self.writer.write(
                        Op::SetLocal,
                        &[
                            Operand::Int(slot as i32),
                            Operand::Int(var.ty.size_in_stack() as i32),
                        ],
                    );
                }
            }
            Stmt::If {
                cond,
                then_block,
                else_clause,
            } => {
                let else_label = self.writer.new_label();
                let end_label = self.writer.new_label();

                self.write_expr(*cond);
                self.writer.write(Op::Jz, &[Operand::Label(else_label)]);
                self.write_block(then_block);
                self.writer.write(Op::Jmp, &[Operand::Label(end_label)]);
                self.writer.place_label(else_label);
                match else_clause {
                    Some(ElseClause::Block(block)) => self.write_block(block),
                    Some(ElseClause::If(chained)) => self.write_stmt(*chained),
                    None => {}
                }
                self.writer.place_label(end_label);
            }
            Stmt::While { cond, body } => {
                let start_label = self.writer.new_label();
                let end_label = self.writer.new_label();

                self.writer.start_loop(start_label, end_label);
                self.writer.place_label(start_label);
                self.write_expr(*cond);
                self.writer.write(Op::Jz, &[Operand::Label(end_label)]);
                self.write_block(body);
                self.writer.write(Op::Jmp, &[Operand::Label(start_label)]);
                self.writer.place_label(end_label);
                self.writer.end_loop();
            }
            Stmt::Break { .. } => {
                let (_, end_label) = self.writer.current_loop();
                self.writer.write(Op::Jmp, &[Operand::Label(end_label)]);
            }
            Stmt::Continue { .. } => {
                let (start_label, _) = self.writer.current_loop();
                self.writer.write(Op::Jmp, &[Operand::Label(start_label)]);
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => {
                    self.write_expr(*value);
                    let size = self.expr_size(*value);
                    self.writer.write(Op::RetValue, &[Operand::Int(size as i32)]);
                }
                None => self.writer.write(Op::Ret, &[]),
            },
            Stmt::Expr { expr } => {
                self.write_expr(*expr);
                let size = self.expr_size(*expr);
                self.writer.write(Op::Pop, &[Operand::Int(size as i32)]);
            }
            Stmt::ToStdout { values, .. } => {
                for &value in values {
                    self.write_expr(value);
                    let op = match self.expr_ty(value) {
                        Ty::Primitive(Prim::Int) => Op::ToStdoutInt,
                        Ty::Primitive(Prim::Float) => Op::ToStdoutFloat,
                        Ty::Primitive(Prim::String) => Op::ToStdoutString,
                        Ty::Primitive(Prim::Char) => Op::ToStdoutChar,
                        Ty::Primitive(Prim::Bool) => Op::ToStdoutBool,
                        ty => panic!("unprintable type {} reached emission", ty),
                    };
                    self.writer.write(op, &[]);
                }
            }
            Stmt::Free { address, .. } => {
                self.write_expr(*address);
                self.writer.write(Op::MemoryFree, &[]);
            }
        }
    }

    fn write_expr(&mut self, id: ExprId) {
        let ast = self.ast;
        match ast.expr(id) {
            Expr::LitInt { value, .. } => {
                self.writer.write(Op::PushInt, &[Operand::Int(*value)]);
            }
            Expr::LitFloat { value, .. } => {
                self.writer.write(Op::PushFloat, &[Operand::Float(*value)]);
            }
            Expr::LitChar { value, .. } => {
                self.writer.write(Op::PushChar, &[Operand::Char(*value)]);
            }
            Expr::LitBool { value, .. } => {
                self.writer.write(Op::PushBool, &[Operand::Bool(*value)]);
            }
            Expr::LitStr { token } => {
                // The literal's value is the pool address of its bytes.
                let label = self.writer.add_string(token.lexeme.clone());
                self.writer.write(Op::PushInt, &[Operand::Label(label)]);
            }
            Expr::LitArray { items, .. } => {
                for &item in items.iter().rev() {
                    self.write_expr(item);
                }
            }
            Expr::Binary { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                self.write_expr(left);
                self.write_expr(right);

                if op.is_logic() {
                    let instr = match op {
                        f12c_par::BinOp::Or => Op::Or,
                        _ => Op::And,
                    };
                    self.writer.write(instr, &[]);
                } else if op.is_equality() {
                    let size = self.expr_size(left);
                    let instr = if op == f12c_par::BinOp::Eq { Op::Eq } else { Op::Ne };
                    self.writer.write(instr, &[Operand::Int(size as i32)]);
                } else {
                    let is_float = matches!(self.expr_ty(left), Ty::Primitive(Prim::Float));
                    self.writer.write(numeric_op(op, is_float), &[]);
                }
            }
            Expr::Unary { op, operand } => {
                let (op, operand) = (*op, *operand);
                self.write_expr(operand);
                match op {
                    UnOp::Not => self.writer.write(Op::Not, &[]),
                    UnOp::Plus | UnOp::Minus => {
                        let is_float =
                            matches!(self.expr_ty(operand), Ty::Primitive(Prim::Float));
                        let instr = match (op, is_float) {
                            (UnOp::Plus, false) => Op::UnaryPlusInt,
                            (UnOp::Minus, false) => Op::UnaryMinusInt,
                            (UnOp::Plus, true) => Op::UnaryPlusFloat,
                            (UnOp::Minus, true) => Op::UnaryMinusFloat,
                            (UnOp::Not, _) => unreachable!(),
                        };
                        self.writer.write(instr, &[]);
                    }
                }
            }
            Expr::Var { .. } => {
                let def = self.analysis.decl_of[&id];
                let size = self.expr_size(id);
                self.write_var_read(def, size);
            }
            Expr::Access { object, .. } => {
                let object = *object;
                let (slot, size) = self.field_slot_and_size(id);
                self.write_expr(object);
                self.writer.write(Op::PushInt, &[Operand::Int(slot as i32)]);
                self.writer.write(Op::AddInt, &[]);
                self.writer.write(Op::MemoryGet, &[Operand::Int(size as i32)]);
            }
            Expr::Index { array, index } => {
                let (array, index) = (*array, *index);
                let elem_size = self.expr_ty(array).elem_size();
                self.write_indexed_base(array);
                self.write_expr(index);
                self.writer
                    .write(Op::PushInt, &[Operand::Int(elem_size as i32)]);
                self.writer.write(Op::MulInt, &[]);
                self.writer.write(Op::AddInt, &[]);
                self.writer
                    .write(Op::MemoryGet, &[Operand::Int(elem_size as i32)]);
            }
            Expr::Assign { target, value } => {
                let (target, value) = (*target, *value);
                self.write_assignment(target, value);
            }
            Expr::Call { .. } => {
                let def = self.analysis.decl_of[&id];
                let Def::Decl(fun_id) = def else {
                    panic!("call target is not a function declaration");
                };
                let Decl::Fun(fun) = ast.decl(fun_id) else {
                    panic!("call target is not a function declaration");
                };
                let Expr::Call { args, .. } = ast.expr(id) else {
                    unreachable!();
                };

                self.writer.write(Op::FnCallBegin, &[]);
                for &arg in args {
                    self.write_expr(arg);
                }
                let label = self.fn_labels[&fun_id];
                self.writer.write(
                    Op::FnCall,
                    &[
                        Operand::Label(label),
                        Operand::Int(fun.params_size() as i32),
                    ],
                );
            }
            Expr::CreateUnit { args, .. } => {
                let args = args.clone();
                self.write_unit_construction(id, &args);
            }
            Expr::NewArray { elem_ty, size, .. } => {
                let (elem_ty, size) = (elem_ty.clone(), *size);
                self.write_expr(size);
                self.writer.write(
                    Op::PushInt,
                    &[Operand::Int(elem_ty.size_in_stack() as i32)],
                );
                self.writer.write(Op::MulInt, &[]);
                self.writer.write(Op::MemoryAllocate, &[]);
            }
            Expr::NewArrayLit { array } => {
                let array = *array;
                self.write_array_construction(array);
            }
            Expr::NewUnit { unit } => {
                let unit = *unit;
                self.write_expr(unit);
            }
            Expr::FromStdin { .. } => {
                self.writer.write(Op::FromStdin, &[]);
            }
        }
    }

    /// The base address for an indexing operation. String values address
    /// their length prefix, so their character data starts one int later.
    fn write_indexed_base(&mut self, array: ExprId) {
        let is_string = matches!(
            self.expr_ty(array),
            Ty::Primitive(Prim::String)
        );
        self.write_expr(array);
        if is_string {
            self.writer.write(
                Op::PushInt,
                &[Operand::Int(f12c_util::sizes::INT as i32)],
            );
            self.writer.write(Op::AddInt, &[]);
        }
    }

    fn write_var_read(&mut self, def: Def, size: usize) {
        let slot = self.analysis.slot_of[&def];
        let op = if self.analysis.is_local(def) {
            Op::GetLocal
        } else {
            Op::GetGlobal
        };
        self.writer
            .write(op, &[Operand::Int(slot as i32), Operand::Int(size as i32)]);
    }

    /// Assignments keep the assigned value on the stack as the
    /// expression's result: the value is duplicated before the store.
    fn write_assignment(&mut self, target: ExprId, value: ExprId) {
        let ast = self.ast;
        match ast.expr(target) {
            Expr::Var { .. } => {
                let def = self.analysis.decl_of[&target];
                let size = self.expr_size(target);
                self.write_expr(value);
                self.writer.write(
                    Op::PopPushN,
                    &[Operand::Int(size as i32), Operand::Int(2)],
                );
                let slot = self.analysis.slot_of[&def];
                let op = if self.analysis.is_local(def) {
                    Op::SetLocal
                } else {
                    Op::SetGlobal
                };
                self.writer
                    .write(op, &[Operand::Int(slot as i32), Operand::Int(size as i32)]);
            }
            Expr::Index { array, index } => {
                let (array, index) = (*array, *index);
                let elem_size = self.expr_ty(array).elem_size();

                self.write_expr(value);
                self.writer.write(
                    Op::PopPushN,
                    &[Operand::Int(elem_size as i32), Operand::Int(2)],
                );

                // base + index * element size
                self.write_indexed_base(array);
                self.write_expr(index);
                self.writer
                    .write(Op::PushInt, &[Operand::Int(elem_size as i32)]);
                self.writer.write(Op::MulInt, &[]);
                self.writer.write(Op::AddInt, &[]);
                self.writer
                    .write(Op::MemorySet, &[Operand::Int(elem_size as i32)]);
            }
            Expr::Access { object, .. } => {
                let object = *object;
                let (slot, size) = self.field_slot_and_size(target);

                self.write_expr(value);
                self.writer.write(
                    Op::PopPushN,
                    &[Operand::Int(size as i32), Operand::Int(2)],
                );

                self.write_expr(object);
                self.writer.write(Op::PushInt, &[Operand::Int(slot as i32)]);
                self.writer.write(Op::AddInt, &[]);
                self.writer.write(Op::MemorySet, &[Operand::Int(size as i32)]);
            }
            other => panic!("unassignable expression {:?} reached emission", other),
        }
    }

    /// `new U|f: v, ...|`: allocate the unit's block, then write each field
    /// at its slot, walking the address forward and recovering the base at
    /// the end.
    fn write_unit_construction(&mut self, unit_expr: ExprId, args: &[UnitArg]) {
        let ast = self.ast;
        let Def::Decl(unit_id) = self.analysis.decl_of[&unit_expr] else {
            panic!("unit literal without a unit declaration");
        };
        let Decl::Unit(unit) = ast.decl(unit_id) else {
            panic!("unit literal without a unit declaration");
        };
        let slots = self.analysis.field_slots[&unit_id].clone();
        let unit_size = self.analysis.unit_size_of[&unit_id];

        // Field values first, last field deepest, so the first field is on
        // top when the writes start.
        for field in unit.fields.iter().rev() {
            let arg = args
                .iter()
                .find(|arg| arg.field.lexeme == field.name.lexeme)
                .unwrap_or_else(|| panic!("missing argument for field {}", field.name.lexeme));
            self.write_expr(arg.value);
        }

        self.writer
            .write(Op::PushInt, &[Operand::Int(unit_size as i32)]);
        self.writer.write(Op::MemoryAllocate, &[]);

        let field_count = unit.fields.len();
        for (index, field) in unit.fields.iter().enumerate() {
            let size = field.ty.size_in_stack();
            self.writer.write(
                Op::MemorySetPush,
                &[Operand::Int(size as i32), Operand::Int(1)],
            );
            if index + 1 != field_count {
                self.writer.write(Op::PushInt, &[Operand::Int(size as i32)]);
                self.writer.write(Op::AddInt, &[]);
            }
        }

        // The walking address ended at the last field's slot; step back to
        // the block base.
        if let Some(&last_slot) = slots.last() {
            if last_slot > 0 {
                self.writer
                    .write(Op::PushInt, &[Operand::Int(last_slot as i32)]);
                self.writer.write(Op::SubInt, &[]);
            }
        }
    }

    /// `new [a, b, c]`: allocate, then fill elements front to back with
    /// `MEMORY_SET_PUSH`, advancing by one element per write.
    fn write_array_construction(&mut self, array: ExprId) {
        let ast = self.ast;
        let Expr::LitArray { items, .. } = ast.expr(array) else {
            panic!("new-array construction without an array literal");
        };
        let items = items.clone();
        let elem_size = match self.analysis.expr_ty(array) {
            Some(ty) => ty.elem_size(),
            None => panic!("untyped array literal reached emission"),
        };

        for &item in items.iter().rev() {
            self.write_expr(item);
        }

        let total = items.len() * elem_size;
        self.writer.write(Op::PushInt, &[Operand::Int(total as i32)]);
        self.writer.write(Op::MemoryAllocate, &[]);

        for index in 0..items.len() {
            self.writer.write(
                Op::MemorySetPush,
                &[Operand::Int(elem_size as i32), Operand::Int(1)],
            );
            if index + 1 != items.len() {
                self.writer
                    .write(Op::PushInt, &[Operand::Int(elem_size as i32)]);
                self.writer.write(Op::AddInt, &[]);
            }
        }

        // Recover the base address.
        if items.len() > 1 {
            let walked = (items.len() - 1) * elem_size;
            self.writer
                .write(Op::PushInt, &[Operand::Int(walked as i32)]);
            self.writer.write(Op::SubInt, &[]);
        }
    }

    fn field_slot_and_size(&self, access: ExprId) -> (usize, usize) {
        let fref = self.analysis.field_of[&access];
        let slot = self.analysis.field_slots[&fref.unit][fref.index];
        let Decl::Unit(unit) = self.ast.decl(fref.unit) else {
            panic!("field access into a non-unit declaration");
        };
        let size = unit.fields[fref.index].ty.size_in_stack();
        (slot, size)
    }

    fn expr_ty(&self, id: ExprId) -> &Ty {
        &self.analysis.ty_of[&id]
    }

    fn expr_size(&self, id: ExprId) -> usize {
        self.expr_ty(id).size_in_stack()
    }
}

fn numeric_op(op: f12c_par::BinOp, is_float: bool) -> Op {
    use f12c_par::BinOp;
    match (op, is_float) {
        (BinOp::Add, false) => Op::AddInt,
        (BinOp::Sub, false) => Op::SubInt,
        (BinOp::Mul, false) => Op::MulInt,
        (BinOp::Div, false) => Op::DivInt,
        (BinOp::Mod, false) => Op::ModInt,
        (BinOp::Pow, false) => Op::PowInt,
        (BinOp::Add, true) => Op::AddFloat,
        (BinOp::Sub, true) => Op::SubFloat,
        (BinOp::Mul, true) => Op::MulFloat,
        (BinOp::Div, true) => Op::DivFloat,
        (BinOp::Mod, true) => Op::ModFloat,
        (BinOp::Pow, true) => Op::PowFloat,
        (BinOp::Gt, false) => Op::GtInt,
        (BinOp::Ge, false) => Op::GeInt,
        (BinOp::Lt, false) => Op::LtInt,
        (BinOp::Le, false) => Op::LeInt,
        (BinOp::Gt, true) => Op::GtFloat,
        (BinOp::Ge, true) => Op::GeFloat,
        (BinOp::Lt, true) => Op::LtFloat,
        (BinOp::Le, true) => Op::LeFloat,
        (op, _) => panic!("{:?} is not a numeric operator", op),
    }
}
