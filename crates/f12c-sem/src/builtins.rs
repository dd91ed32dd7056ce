//! Built-in standard functions.
//!
//! These are ordinary function declarations prepended to the program before
//! name resolution, so they occupy the root scope exactly like user
//! functions and calls to them resolve through the normal path. Their body
//! is empty; the emitter lowers each to its dedicated opcode instead.

use f12c_lex::{Token, TokenKind};
use f12c_par::{Block, Builtin, Decl, FunDecl, FunParam, Program, RootElem, Ty};
use f12c_util::Span;

fn ident(name: &str) -> Token {
    Token::new(TokenKind::Identifier, Span::DUMMY, name)
}

fn builtin_fun(name: &str, params: Vec<(Ty, &str)>, builtin: Builtin) -> FunDecl {
    FunDecl {
        name: ident(name),
        params: params
            .into_iter()
            .map(|(ty, name)| FunParam {
                ty,
                name: ident(name),
            })
            .collect(),
        return_ty: Ty::void(),
        body: Block::default(),
        builtin: Some(builtin),
    }
}

/// Prepend the standard functions to the program's top level.
pub fn register_builtins(program: &mut Program) {
    let funs = [
        builtin_fun("clear_screen", vec![], Builtin::ClearScreen),
        builtin_fun(
            "put_char_x_y",
            vec![(Ty::char(), "c"), (Ty::int(), "x"), (Ty::int(), "y")],
            Builtin::PutCharXY,
        ),
        builtin_fun("sleep", vec![(Ty::int(), "ms")], Builtin::Sleep),
    ];

    let mut elements = Vec::with_capacity(program.elements.len() + funs.len());
    for fun in funs {
        let id = program.ast.add_decl(Decl::Fun(fun));
        elements.push(RootElem::Decl(id));
    }
    elements.append(&mut program.elements);
    program.elements = elements;
}

#[cfg(test)]
mod tests {
    use super::*;
    use f12c_par::Program;

    #[test]
    fn test_builtins_are_prepended() {
        let mut program = Program::default();
        register_builtins(&mut program);

        assert_eq!(program.elements.len(), 3);
        let names: Vec<&str> = program
            .elements
            .iter()
            .map(|elem| match elem {
                RootElem::Decl(id) => program.ast.decl(*id).name().lexeme.as_str(),
                _ => panic!("builtin should be a declaration"),
            })
            .collect();
        assert_eq!(names, vec!["clear_screen", "put_char_x_y", "sleep"]);
    }

    #[test]
    fn test_builtin_signatures() {
        let mut program = Program::default();
        register_builtins(&mut program);

        let RootElem::Decl(id) = program.elements[1] else {
            panic!();
        };
        let Decl::Fun(fun) = program.ast.decl(id) else {
            panic!();
        };
        assert_eq!(fun.builtin, Some(Builtin::PutCharXY));
        assert_eq!(fun.params.len(), 3);
        assert_eq!(fun.params_size(), 1 + 4 + 4);
    }
}
