//! AST node definitions.
//!
//! Nodes live in a single arena ([`Ast`]) addressed by typed ids, so that
//! included files can be parsed into the same arena and spliced into the
//! including program. Ownership is strictly top-down: nodes reference their
//! children by id and nothing points back up. Queries the original answered
//! with parent pointers (enclosing loop, enclosing function) are answered
//! by the analyzer's traversal context instead.

use f12c_lex::Token;
use f12c_util::{newtype_index, IndexVec, Span};

use crate::types::Ty;

newtype_index!(ExprId);
newtype_index!(StmtId);
newtype_index!(DeclId);

/// The node arena. All parsed files of one compilation share it.
#[derive(Debug, Default)]
pub struct Ast {
    pub exprs: IndexVec<ExprId, Expr>,
    pub stmts: IndexVec<StmtId, Stmt>,
    pub decls: IndexVec<DeclId, Decl>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr)
    }

    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.push(stmt)
    }

    pub fn add_decl(&mut self, decl: Decl) -> DeclId {
        self.decls.push(decl)
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id]
    }

    /// The reference span of an expression: the primary location used in
    /// diagnostics about it.
    pub fn expr_span(&self, id: ExprId) -> Span {
        match self.expr(id) {
            Expr::LitInt { token, .. }
            | Expr::LitFloat { token, .. }
            | Expr::LitStr { token }
            | Expr::LitChar { token, .. }
            | Expr::LitBool { token, .. }
            | Expr::Var { name: token }
            | Expr::Call { name: token, .. }
            | Expr::CreateUnit { name: token, .. }
            | Expr::NewArray { token, .. }
            | Expr::FromStdin { token } => token.span,
            Expr::LitArray { start, items } => items
                .first()
                .map(|&item| self.expr_span(item))
                .unwrap_or(start.span),
            Expr::Binary { left, .. } => self.expr_span(*left),
            Expr::Unary { operand, .. } => self.expr_span(*operand),
            Expr::Access { field, .. } => field.span,
            Expr::Index { array, .. } => self.expr_span(*array),
            Expr::Assign { target, .. } => self.expr_span(*target),
            Expr::NewArrayLit { array } => self.expr_span(*array),
            Expr::NewUnit { unit } => self.expr_span(*unit),
        }
    }
}

/// Binary operators, grouped the way typing rules group them: arithmetic,
/// comparison, equality, logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Gt | BinOp::Ge | BinOp::Lt | BinOp::Le)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_logic(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Minus,
    Not,
}

/// Expressions.
#[derive(Clone, Debug)]
pub enum Expr {
    LitInt { token: Token, value: i32 },
    LitFloat { token: Token, value: f64 },
    LitStr { token: Token },
    LitChar { token: Token, value: char },
    LitBool { token: Token, value: bool },
    /// `[a, b, c]` — only valid behind `new`.
    LitArray { start: Token, items: Vec<ExprId> },
    Binary { op: BinOp, left: ExprId, right: ExprId },
    Unary { op: UnOp, operand: ExprId },
    Var { name: Token },
    /// `object.field`
    Access { object: ExprId, field: Token },
    /// `array[index]`
    Index { array: ExprId, index: ExprId },
    /// `target = value`; target is a var, field access or index.
    Assign { target: ExprId, value: ExprId },
    Call { name: Token, args: Vec<ExprId> },
    /// `name|field: value, ...|`
    CreateUnit { name: Token, args: Vec<UnitArg> },
    /// `new T[size]`
    NewArray { token: Token, elem_ty: Ty, size: ExprId },
    /// `new [a, b, c]`; `array` is a `LitArray`.
    NewArrayLit { array: ExprId },
    /// `new U|...|`; `unit` is a `CreateUnit`.
    NewUnit { unit: ExprId },
    /// `<--`
    FromStdin { token: Token },
}

/// One `field: value` argument of a unit literal.
#[derive(Clone, Debug)]
pub struct UnitArg {
    pub field: Token,
    pub value: ExprId,
}

/// A `{ ... }` statement block.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub stmts: Vec<StmtId>,
}

/// The else part of an if statement: either a block or a chained if.
#[derive(Clone, Debug)]
pub enum ElseClause {
    Block(Block),
    /// Points at a `Stmt::If`.
    If(StmtId),
}

/// A variable declaration, used both for globals and for locals.
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub ty: Ty,
    pub name: Token,
    pub value: Option<ExprId>,
    pub is_const: bool,
}

/// Statements.
#[derive(Clone, Debug)]
pub enum Stmt {
    Empty,
    DeclVar(VarDecl),
    If {
        cond: ExprId,
        then_block: Block,
        else_clause: Option<ElseClause>,
    },
    While {
        cond: ExprId,
        body: Block,
    },
    Break {
        token: Token,
    },
    Continue {
        token: Token,
    },
    Return {
        token: Token,
        value: Option<ExprId>,
    },
    Expr {
        expr: ExprId,
    },
    /// `--> a, b, c;`
    ToStdout {
        token: Token,
        values: Vec<ExprId>,
    },
    /// `free expr;`
    Free {
        token: Token,
        address: ExprId,
    },
}

/// A function parameter.
#[derive(Clone, Debug)]
pub struct FunParam {
    pub ty: Ty,
    pub name: Token,
}

/// Built-in standard functions. They parse and resolve like ordinary
/// functions but their body is a single dedicated instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    ClearScreen,
    PutCharXY,
    Sleep,
}

/// A function declaration.
#[derive(Clone, Debug)]
pub struct FunDecl {
    pub name: Token,
    pub params: Vec<FunParam>,
    pub return_ty: Ty,
    pub body: Block,
    pub builtin: Option<Builtin>,
}

impl FunDecl {
    /// Total byte size of the parameters, which is also the offset of the
    /// first non-parameter local in the frame.
    pub fn params_size(&self) -> usize {
        self.params.iter().map(|p| p.ty.size_in_stack()).sum()
    }
}

/// One field of a unit declaration.
#[derive(Clone, Debug)]
pub struct UnitField {
    pub ty: Ty,
    pub name: Token,
}

/// A unit (record) declaration.
#[derive(Clone, Debug)]
pub struct UnitDecl {
    pub name: Token,
    pub fields: Vec<UnitField>,
}

/// Top-level declarations.
#[derive(Clone, Debug)]
pub enum Decl {
    Fun(FunDecl),
    Var(VarDecl),
    Unit(UnitDecl),
}

impl Decl {
    /// The declaration's name token.
    pub fn name(&self) -> &Token {
        match self {
            Decl::Fun(fun) => &fun.name,
            Decl::Var(var) => &var.name,
            Decl::Unit(unit) => &unit.name,
        }
    }
}

/// One element of a program's top level: a declaration, or an include that
/// is replaced by the included file's elements before name resolution.
#[derive(Clone, Debug)]
pub enum RootElem {
    Decl(DeclId),
    Include { token: Token, path: Token },
}

/// A parsed program: the arena plus the ordered top-level elements.
#[derive(Debug, Default)]
pub struct Program {
    pub ast: Ast,
    pub elements: Vec<RootElem>,
}
