//! Include resolution.
//!
//! Each `>include "path";` element is replaced in place by the included
//! file's top-level declarations. Paths are resolved relative to the
//! including file's directory. Included files are lexed and parsed into the
//! same arena as the including program, then their own includes are
//! resolved recursively. A missing file is a fatal include error; include
//! cycles hit the nesting limit.

use std::fs;

use f12c_lex::{lex, Token};
use f12c_par::{parse_into, Ast, Program, RootElem};
use f12c_util::{FatalError, FatalResult, Phase, SourceMap};

/// Upper bound on include nesting, so that an include cycle terminates
/// with an error instead of reading files forever.
const MAX_INCLUDE_DEPTH: usize = 64;

/// Resolve every include of the program, splicing included declarations in
/// place of the include elements.
pub fn resolve_includes(program: &mut Program, sources: &mut SourceMap) -> FatalResult<()> {
    let elements = std::mem::take(&mut program.elements);
    program.elements = resolve_elements(elements, &mut program.ast, sources, 0)?;
    Ok(())
}

fn resolve_elements(
    elements: Vec<RootElem>,
    ast: &mut Ast,
    sources: &mut SourceMap,
    depth: usize,
) -> FatalResult<Vec<RootElem>> {
    let mut resolved = Vec::with_capacity(elements.len());

    for element in elements {
        match element {
            RootElem::Decl(id) => resolved.push(RootElem::Decl(id)),
            RootElem::Include { token, path } => {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(FatalError::new(
                        Phase::Include,
                        "Includes nested too deeply (include cycle?)",
                        token.span,
                    ));
                }
                let included = load_file(&path, ast, sources)?;
                let mut included = resolve_elements(included, ast, sources, depth + 1)?;
                resolved.append(&mut included);
            }
        }
    }

    Ok(resolved)
}

/// Lex and parse one included file into the shared arena.
fn load_file(path: &Token, ast: &mut Ast, sources: &mut SourceMap) -> FatalResult<Vec<RootElem>> {
    let dir = sources.file_dir(path.span.file).to_path_buf();
    let full_path = dir.join(&path.lexeme);

    let content = fs::read_to_string(&full_path).map_err(|_| {
        FatalError::new(Phase::Include, "File not found", path.span)
    })?;

    let file_id = sources.add_file(full_path.to_string_lossy(), content);
    let tokens = lex(&sources.file(file_id).content, file_id)?;
    parse_into(tokens, ast)
}
