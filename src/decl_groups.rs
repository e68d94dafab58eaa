//! Batching of `let` declarations.
//!
//! Consecutive function declarations in a `let` form a mutually recursive
//! group: every header is in scope for every body in the run. A run ends
//! at the first non-function declaration. The binder and the type checker
//! must agree on this grouping exactly, so it is computed in one place.

use crate::ast::{Ast, ExprId, ExprKind};

/// One batch of declarations from a `let`, in declaration order.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DeclGroup {
    /// A maximal run of consecutive function declarations.
    Functions(Vec<ExprId>),
    /// A single variable declaration.
    Variable(ExprId),
}

/// Split a declaration list into groups, preserving order.
pub(crate) fn split(ast: &Ast, decls: &[ExprId]) -> Vec<DeclGroup> {
    let mut groups = Vec::new();
    let mut run = Vec::new();
    for &decl in decls {
        match ast.kind(decl) {
            ExprKind::Fun(_) => run.push(decl),
            _ => {
                if !run.is_empty() {
                    groups.push(DeclGroup::Functions(std::mem::take(&mut run)));
                }
                groups.push(DeclGroup::Variable(decl));
            }
        }
    }
    if !run.is_empty() {
        groups.push(DeclGroup::Functions(run));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunDecl, Loc, VarDecl};
    use crate::symbol::Symbol;

    fn var(ast: &mut Ast, name: &str) -> ExprId {
        ast.add(
            Loc::none(),
            ExprKind::Var(VarDecl {
                name: Symbol::new(name),
                type_name: None,
                init: None,
                depth: 0,
                escapes: false,
                read_only: false,
            }),
        )
    }

    fn fun(ast: &mut Ast, name: &str) -> ExprId {
        ast.add(
            Loc::none(),
            ExprKind::Fun(FunDecl {
                name: Symbol::new(name),
                params: vec![],
                result_name: None,
                body: None,
                external: false,
                parent: None,
                external_name: None,
                depth: 0,
                escaping: vec![],
            }),
        )
    }

    #[test]
    fn test_single_run_at_end() {
        let mut ast = Ast::new();
        let f = fun(&mut ast, "f");
        let g = fun(&mut ast, "g");
        let groups = split(&ast, &[f, g]);
        assert_eq!(groups, vec![DeclGroup::Functions(vec![f, g])]);
    }

    #[test]
    fn test_variable_ends_a_run() {
        let mut ast = Ast::new();
        let f = fun(&mut ast, "f");
        let g = fun(&mut ast, "g");
        let x = var(&mut ast, "x");
        let h = fun(&mut ast, "h");
        let groups = split(&ast, &[f, g, x, h]);
        assert_eq!(
            groups,
            vec![
                DeclGroup::Functions(vec![f, g]),
                DeclGroup::Variable(x),
                DeclGroup::Functions(vec![h]),
            ]
        );
    }

    #[test]
    fn test_variables_only() {
        let mut ast = Ast::new();
        let x = var(&mut ast, "x");
        let y = var(&mut ast, "y");
        let groups = split(&ast, &[x, y]);
        assert_eq!(
            groups,
            vec![DeclGroup::Variable(x), DeclGroup::Variable(y)]
        );
    }

    #[test]
    fn test_empty() {
        let ast = Ast::new();
        assert!(split(&ast, &[]).is_empty());
    }
}
