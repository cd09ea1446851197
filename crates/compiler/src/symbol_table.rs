//! Lexically scoped symbol table.
//!
//! Scopes live in an arena addressed by index; index 0 is the global
//! scope. Entering a function pushes a scope whose `outer` is the current
//! one, leaving pops it. Resolving a name that lives in an enclosing
//! function scope records it as a free variable in every scope between the
//! use and the definition, so each closure captures from its immediate
//! parent.

use std::collections::HashMap;
use std::fmt;

use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    Global,
    Local,
    Free,
    Builtin,
    /// The enclosing function's own name, inside its body.
    Function,
}

impl fmt::Display for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolScope::Global => "GLOBAL",
            SymbolScope::Local => "LOCAL",
            SymbolScope::Free => "FREE",
            SymbolScope::Builtin => "BUILTIN",
            SymbolScope::Function => "FUNCTION",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// One lexical scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    outer: Option<usize>,
    store: HashMap<String, Symbol>,
    free_symbols: Vec<Symbol>,
    num_definitions: usize,
}

impl Scope {
    /// The enclosing-scope symbols this scope captures, in capture order.
    pub fn free_symbols(&self) -> &[Symbol] {
        &self.free_symbols
    }

    /// Number of variables declared here (parameters included).
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding only an empty global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            current: 0,
        }
    }

    pub fn is_global(&self) -> bool {
        self.current == 0
    }

    /// Nesting depth of the current scope; 0 at top level.
    pub fn depth(&self) -> usize {
        self.current
    }

    pub fn free_symbols(&self) -> &[Symbol] {
        self.scopes[self.current].free_symbols()
    }

    pub fn num_definitions(&self) -> usize {
        self.scopes[self.current].num_definitions()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope {
            outer: Some(self.current),
            ..Scope::default()
        });
        self.current = self.scopes.len() - 1;
    }

    /// Pop the current scope and return it. `None` at global scope.
    pub fn leave_scope(&mut self) -> Option<Scope> {
        let outer = self.scopes[self.current].outer?;
        let scope = self.scopes.pop();
        self.current = outer;
        scope
    }

    /// Declare a variable in the current scope.
    pub fn define(&mut self, name: &str) -> Result<Symbol, CompileError> {
        let kind = if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let scope = &mut self.scopes[self.current];

        if let Some(existing) = scope.store.get(name) {
            if matches!(existing.scope, SymbolScope::Global | SymbolScope::Local) {
                return Err(CompileError::Redeclared {
                    name: name.to_string(),
                });
            }
        }

        let symbol = Symbol {
            name: name.to_string(),
            scope: kind,
            index: scope.num_definitions,
        };
        scope.num_definitions += 1;
        scope.store.insert(name.to_string(), symbol.clone());
        Ok(symbol)
    }

    /// Bind a builtin registry entry in the global scope.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.scopes[0].store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Bind the enclosing function's own name in the current scope.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
        };
        self.scopes[self.current]
            .store
            .insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Look a name up from the current scope outward.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.resolve_in(self.current, name)
    }

    fn resolve_in(&mut self, scope: usize, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.scopes[scope].store.get(name) {
            return Some(symbol.clone());
        }
        let outer = self.scopes[scope].outer?;
        let found = self.resolve_in(outer, name)?;
        match found.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(found),
            SymbolScope::Local | SymbolScope::Free | SymbolScope::Function => {
                Some(self.define_free(scope, found))
            }
        }
    }

    fn define_free(&mut self, scope: usize, original: Symbol) -> Symbol {
        let scope = &mut self.scopes[scope];
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: scope.free_symbols.len(),
        };
        scope.free_symbols.push(original);
        scope.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn define_global_and_local() {
        let mut table = SymbolTable::new();
        assert_eq!(table.define("a").unwrap(), sym("a", SymbolScope::Global, 0));
        assert_eq!(table.define("b").unwrap(), sym("b", SymbolScope::Global, 1));

        table.enter_scope();
        assert_eq!(table.define("c").unwrap(), sym("c", SymbolScope::Local, 0));
        assert_eq!(table.define("d").unwrap(), sym("d", SymbolScope::Local, 1));

        table.enter_scope();
        assert_eq!(table.define("e").unwrap(), sym("e", SymbolScope::Local, 0));
    }

    #[test]
    fn resolve_global_from_nested() {
        let mut table = SymbolTable::new();
        table.define("a").unwrap();
        table.enter_scope();
        table.enter_scope();
        assert_eq!(table.resolve("a"), Some(sym("a", SymbolScope::Global, 0)));
        assert!(table.free_symbols().is_empty());
    }

    #[test]
    fn redeclaration_in_same_scope() {
        let mut table = SymbolTable::new();
        table.define("a").unwrap();
        assert_eq!(
            table.define("a"),
            Err(CompileError::Redeclared {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let mut table = SymbolTable::new();
        table.define("a").unwrap();
        table.enter_scope();
        assert_eq!(table.define("a").unwrap(), sym("a", SymbolScope::Local, 0));
        assert_eq!(table.resolve("a"), Some(sym("a", SymbolScope::Local, 0)));
    }

    #[test]
    fn builtins_resolve_everywhere_and_can_be_shadowed() {
        let mut table = SymbolTable::new();
        table.define_builtin(0, "sizeOf");
        table.define_builtin(1, "show");
        table.enter_scope();
        assert_eq!(table.resolve("show"), Some(sym("show", SymbolScope::Builtin, 1)));
        assert!(table.free_symbols().is_empty());
        table.leave_scope();

        assert_eq!(table.define("show").unwrap(), sym("show", SymbolScope::Global, 0));
    }

    #[test]
    fn free_variables_chain_through_scopes() {
        let mut table = SymbolTable::new();
        table.define("a").unwrap();
        table.enter_scope();
        table.define("c").unwrap();
        table.enter_scope();
        table.define("e").unwrap();

        assert_eq!(table.resolve("a"), Some(sym("a", SymbolScope::Global, 0)));
        assert_eq!(table.resolve("c"), Some(sym("c", SymbolScope::Free, 0)));
        assert_eq!(table.resolve("e"), Some(sym("e", SymbolScope::Local, 0)));
        assert_eq!(table.free_symbols(), &[sym("c", SymbolScope::Local, 0)]);
    }

    #[test]
    fn free_variables_are_recorded_in_intermediate_scopes() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.define("x").unwrap();
        table.enter_scope();
        table.enter_scope();

        assert_eq!(table.resolve("x"), Some(sym("x", SymbolScope::Free, 0)));
        assert_eq!(table.free_symbols(), &[sym("x", SymbolScope::Free, 0)]);

        let innermost = table.leave_scope().unwrap();
        assert_eq!(innermost.free_symbols(), &[sym("x", SymbolScope::Free, 0)]);
        // The middle scope captured x from the defining scope.
        assert_eq!(table.free_symbols(), &[sym("x", SymbolScope::Local, 0)]);
    }

    #[test]
    fn unresolvable() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        assert_eq!(table.resolve("missing"), None);
    }

    #[test]
    fn function_name_and_shadowing() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.define_function_name("a");
        assert_eq!(table.resolve("a"), Some(sym("a", SymbolScope::Function, 0)));

        assert_eq!(table.define("a").unwrap(), sym("a", SymbolScope::Local, 0));
        assert_eq!(table.resolve("a"), Some(sym("a", SymbolScope::Local, 0)));
    }

    #[test]
    fn leave_scope_reports_definitions() {
        let mut table = SymbolTable::new();
        assert!(table.leave_scope().is_none());
        table.enter_scope();
        table.define("p").unwrap();
        table.define("q").unwrap();
        let scope = table.leave_scope().unwrap();
        assert_eq!(scope.num_definitions(), 2);
        assert!(table.is_global());
    }
}
