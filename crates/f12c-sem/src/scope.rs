//! Scope tree for name resolution.

use f12c_lex::Token;
use f12c_util::{newtype_index, Handler, IndexVec, Phase};
use indexmap::IndexMap;

use crate::Def;

newtype_index!(ScopeId);

/// A single scope: an ordered name → definition mapping plus a parent link.
#[derive(Debug)]
pub struct Scope {
    pub members: IndexMap<String, Def>,
    pub parent: Option<ScopeId>,
}

/// Tree of scopes. Lookup walks parents; declaring a name twice in the same
/// scope is an error.
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, Scope>,
    current: ScopeId,
}

impl ScopeTree {
    /// Create a tree holding only the root scope.
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(Scope {
            members: IndexMap::new(),
            parent: None,
        });
        Self {
            scopes,
            current: root,
        }
    }

    /// Open a child of the current scope and make it current.
    pub fn enter(&mut self) -> ScopeId {
        let child = self.scopes.push(Scope {
            members: IndexMap::new(),
            parent: Some(self.current),
        });
        self.current = child;
        child
    }

    /// Return to the parent of the current scope.
    pub fn exit(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Declare a name in the current scope. Redeclaration reports a
    /// names-resolution error against the new token.
    pub fn declare(&mut self, name: &Token, def: Def, handler: &mut Handler) {
        let scope = &mut self.scopes[self.current];
        if scope.members.contains_key(&name.lexeme) {
            handler.error(
                Phase::NamesResolution,
                format!("Item with name \"{}\" is already declared", name.lexeme),
                name.span,
            );
            return;
        }
        scope.members.insert(name.lexeme.clone(), def);
    }

    /// Look a name up, walking parent scopes. Unknown names report a
    /// names-resolution error and return `None`.
    pub fn resolve(&self, name: &Token, handler: &mut Handler) -> Option<Def> {
        let mut scope_id = self.current;
        loop {
            let scope = &self.scopes[scope_id];
            if let Some(&def) = scope.members.get(&name.lexeme) {
                return Some(def);
            }
            match scope.parent {
                Some(parent) => scope_id = parent,
                None => break,
            }
        }

        handler.error(
            Phase::NamesResolution,
            format!("Item with name \"{}\" is not declared", name.lexeme),
            name.span,
        );
        None
    }

    /// Look a name up without reporting anything.
    pub fn lookup(&self, name: &str) -> Option<Def> {
        let mut scope_id = self.current;
        loop {
            let scope = &self.scopes[scope_id];
            if let Some(&def) = scope.members.get(name) {
                return Some(def);
            }
            scope_id = scope.parent?;
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
