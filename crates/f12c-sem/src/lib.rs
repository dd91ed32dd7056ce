//! f12c-sem - Semantic Analysis
//!
//! Three passes over the parsed program, in order:
//!
//! 1. **Include resolution** ([`resolve_includes`]): every
//!    `>include "path";` element is replaced in place by the included
//!    file's top-level declarations. Included files are lexed and parsed
//!    into the same AST arena.
//! 2. **Name resolution** ([`resolve_names`]): builds the scope tree,
//!    links every name use to its definition, checks `break`/`continue`
//!    placement and `const` assignment, and assigns byte-offset slots to
//!    globals, parameters, locals and unit fields.
//! 3. **Type resolution** ([`resolve_types`]): computes a type for every
//!    expression bottom-up and unifies each use with its expected type.
//!
//! A final entry-point check asserts exactly one parameterless `main`
//! returning `void` or `int`.
//!
//! Unlike lexing and parsing, semantic analysis does not stop at the first
//! problem: errors accumulate in the [`Handler`] so that one run reports as
//! many as possible. The passes record their results in side tables
//! ([`Analysis`]) instead of mutating the AST; emission reads both.

mod builtins;
mod edge_cases;
mod include;
mod resolve;
pub mod scope;
mod typeck;

pub use builtins::register_builtins;
pub use include::resolve_includes;

use f12c_par::{Ast, Decl, DeclId, ExprId, FunDecl, Prim, Program, RootElem, StmtId, Ty};
use f12c_util::{Handler, Phase, Span};
use rustc_hash::FxHashMap;

/// A resolved definition: what a name refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Def {
    /// A top-level declaration (function, global variable or unit).
    Decl(DeclId),
    /// A local variable declaration statement.
    Local(StmtId),
    /// A function parameter, identified by its function and index.
    Param(DeclId, usize),
}

/// A resolved field access: the unit declaration and the field's index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub unit: DeclId,
    pub index: usize,
}

/// The semantic side tables produced by the passes and consumed by the
/// emitter.
#[derive(Debug, Default)]
pub struct Analysis {
    /// Var / Call / CreateUnit expression → its definition.
    pub decl_of: FxHashMap<ExprId, Def>,
    /// Field-access expression → unit declaration + field index.
    pub field_of: FxHashMap<ExprId, FieldRef>,
    /// Expression → its resolved type.
    pub ty_of: FxHashMap<ExprId, Ty>,
    /// Variable definition → byte offset within its frame (stack frame for
    /// locals and parameters, the globals area for globals).
    pub slot_of: FxHashMap<Def, usize>,
    /// Function → total byte size of its frame (parameters + locals).
    pub frame_size_of: FxHashMap<DeclId, usize>,
    /// Unit → byte offset of each field, in declaration order.
    pub field_slots: FxHashMap<DeclId, Vec<usize>>,
    /// Unit → total byte size of its fields.
    pub unit_size_of: FxHashMap<DeclId, usize>,
    /// Total byte size of the global variables area.
    pub globals_size: usize,
    /// The program entry point, once checked.
    pub main_fun: Option<DeclId>,
}

impl Analysis {
    /// The declared type of a definition, if it is variable-like.
    pub fn def_ty<'a>(&self, ast: &'a Ast, def: Def) -> Option<&'a Ty> {
        match def {
            Def::Decl(id) => match ast.decl(id) {
                Decl::Var(var) => Some(&var.ty),
                _ => None,
            },
            Def::Local(id) => match ast.stmt(id) {
                f12c_par::Stmt::DeclVar(var) => Some(&var.ty),
                _ => None,
            },
            Def::Param(fun, index) => match ast.decl(fun) {
                Decl::Fun(fun) => Some(&fun.params[index].ty),
                _ => None,
            },
        }
    }

    /// True for definitions addressed relative to the frame pointer.
    pub fn is_local(&self, def: Def) -> bool {
        matches!(def, Def::Local(_) | Def::Param(..))
    }

    /// True for definitions declared `const`.
    pub fn is_const(&self, ast: &Ast, def: Def) -> bool {
        match def {
            Def::Decl(id) => matches!(ast.decl(id), Decl::Var(var) if var.is_const),
            Def::Local(id) => matches!(ast.stmt(id), f12c_par::Stmt::DeclVar(var) if var.is_const),
            Def::Param(..) => false,
        }
    }

    /// The resolved type of an expression, if typing succeeded.
    pub fn expr_ty(&self, expr: ExprId) -> Option<&Ty> {
        self.ty_of.get(&expr)
    }
}

/// Run name resolution, type resolution and the entry-point check.
///
/// Includes must already be resolved (see [`resolve_includes`]). Errors
/// accumulate in the handler; the returned [`Analysis`] is complete enough
/// for emission only when `handler.has_errors()` is false afterwards.
pub fn analyze(program: &mut Program, handler: &mut Handler) -> Analysis {
    register_builtins(program);

    let mut analysis = Analysis::default();
    resolve_names(program, &mut analysis, handler);
    resolve_types(program, &mut analysis, handler);
    check_entry_point(program, &mut analysis, handler);
    analysis
}

/// Pass 2: name resolution and slot assignment.
pub fn resolve_names(program: &Program, analysis: &mut Analysis, handler: &mut Handler) {
    resolve::run(program, analysis, handler);
}

/// Pass 3: type resolution.
pub fn resolve_types(program: &Program, analysis: &mut Analysis, handler: &mut Handler) {
    typeck::run(program, analysis, handler);
}

/// The entry-point check: exactly one `main`, no parameters, returning
/// `void` or `int`.
pub fn check_entry_point(program: &Program, analysis: &mut Analysis, handler: &mut Handler) {
    let mains: Vec<(DeclId, &FunDecl)> = program
        .elements
        .iter()
        .filter_map(|elem| match elem {
            RootElem::Decl(id) => match program.ast.decl(*id) {
                Decl::Fun(fun) if fun.name.lexeme == "main" => Some((*id, fun)),
                _ => None,
            },
            RootElem::Include { .. } => None,
        })
        .collect();

    if mains.len() != 1 {
        handler.error(
            Phase::EntryPoint,
            "You have to provide single function with a name 'main' for a program entry point",
            Span::DUMMY,
        );
        return;
    }

    let (main_id, main_fn) = mains[0];

    let ret_ok = matches!(
        main_fn.return_ty,
        Ty::Primitive(Prim::Void) | Ty::Primitive(Prim::Int)
    );
    if !ret_ok {
        handler.error(
            Phase::EntryPoint,
            "'main' must return void or int",
            main_fn.name.span,
        );
    }

    if !main_fn.params.is_empty() {
        handler.error(
            Phase::EntryPoint,
            "'main' function must not take any params",
            main_fn.name.span,
        );
    }

    analysis.main_fun = Some(main_id);
}
