//! Escape collection.
//!
//! Runs after the binder. Walks the tree depth-first carrying the current
//! function, and appends every declaration the binder flagged as escaping
//! to that function's `escaping` list. The list keeps lexical declaration
//! order — parameters first, then locals as they appear — because the IR
//! generator turns positions in this list into frame-slot indices.

use crate::ast::{Ast, ExprId, ExprKind};

/// Populate the `escaping` list of every function reachable from `main`.
pub fn collect_escapes(ast: &mut Ast, main: ExprId) {
    let mut escaper = Escaper { ast, current: None };
    escaper.visit_expr(main);
}

struct Escaper<'a> {
    ast: &'a mut Ast,
    current: Option<ExprId>,
}

impl Escaper<'_> {
    fn visit_expr(&mut self, id: ExprId) {
        match self.ast.expr(id).kind.clone() {
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Break { .. } | ExprKind::Ident(_) => {}
            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Seq(exprs) => {
                for expr in exprs {
                    self.visit_expr(expr);
                }
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond);
                self.visit_expr(then_branch);
                self.visit_expr(else_branch);
            }
            ExprKind::While { cond, body } => {
                self.visit_expr(cond);
                self.visit_expr(body);
            }
            ExprKind::For { var, high, body } => {
                self.visit_expr(var);
                self.visit_expr(high);
                self.visit_expr(body);
            }
            ExprKind::Call(call) => {
                for arg in call.args {
                    self.visit_expr(arg);
                }
            }
            ExprKind::Assign { lhs, rhs } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            ExprKind::Let { decls, body } => {
                for decl in decls {
                    self.visit_expr(decl);
                }
                self.visit_expr(body);
            }
            ExprKind::Var(var) => {
                if var.escapes {
                    if let Some(fun) = self.current {
                        self.ast.fun_decl_mut(fun).escaping.push(id);
                    }
                }
                if let Some(init) = var.init {
                    self.visit_expr(init);
                }
            }
            ExprKind::Fun(fun) => {
                let saved = self.current;
                self.current = Some(id);
                for param in fun.params {
                    self.visit_expr(param);
                }
                if let Some(body) = fun.body {
                    self.visit_expr(body);
                }
                self.current = saved;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Call, FunDecl, Ident, Loc, VarDecl};
    use crate::binder;
    use crate::symbol::Symbol;

    fn int(ast: &mut Ast, value: i32) -> ExprId {
        ast.add(Loc::new(1, 1), ExprKind::Int(value))
    }

    fn ident(ast: &mut Ast, name: &str) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Ident(Ident {
                name: Symbol::new(name),
                decl: None,
                depth: 0,
            }),
        )
    }

    fn var_decl(ast: &mut Ast, name: &str, init: ExprId) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Var(VarDecl {
                name: Symbol::new(name),
                type_name: None,
                init: Some(init),
                depth: 0,
                escapes: false,
                read_only: false,
            }),
        )
    }

    fn fun_decl(ast: &mut Ast, name: &str, body: ExprId) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Fun(FunDecl {
                name: Symbol::new(name),
                params: vec![],
                result_name: None,
                body: Some(body),
                external: false,
                parent: None,
                external_name: None,
                depth: 0,
                escaping: vec![],
            }),
        )
    }

    fn let_in(ast: &mut Ast, decls: Vec<ExprId>, exprs: Vec<ExprId>) -> ExprId {
        let body = ast.add(Loc::new(1, 1), ExprKind::Seq(exprs));
        ast.add(Loc::new(1, 1), ExprKind::Let { decls, body })
    }

    fn call0(ast: &mut Ast, name: &str) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Call(Call {
                func: Symbol::new(name),
                args: vec![],
                decl: None,
                depth: 0,
            }),
        )
    }

    #[test]
    fn test_escaping_locals_collected_in_lexical_order() {
        // let var a := 0 var b := 0 function f() = (a; b) in f() end
        // Both a and b escape onto main, in declaration order.
        let mut ast = Ast::new();
        let zero_a = int(&mut ast, 0);
        let a = var_decl(&mut ast, "a", zero_a);
        let zero_b = int(&mut ast, 0);
        let b = var_decl(&mut ast, "b", zero_b);
        let use_a = ident(&mut ast, "a");
        let use_b = ident(&mut ast, "b");
        let f_body = ast.add(Loc::new(1, 1), ExprKind::Seq(vec![use_a, use_b]));
        let f = fun_decl(&mut ast, "f", f_body);
        let call_f = call0(&mut ast, "f");
        let root = let_in(&mut ast, vec![a, b, f], vec![call_f]);

        let main = binder::bind_program(&mut ast, root).unwrap();
        collect_escapes(&mut ast, main);

        assert_eq!(ast.fun_decl(main).escaping, vec![a, b]);
        assert!(ast.fun_decl(f).escaping.is_empty());
    }

    #[test]
    fn test_non_escaping_locals_are_not_collected() {
        let mut ast = Ast::new();
        let zero = int(&mut ast, 0);
        let x = var_decl(&mut ast, "x", zero);
        let use_x = ident(&mut ast, "x");
        let root = let_in(&mut ast, vec![x], vec![use_x]);

        let main = binder::bind_program(&mut ast, root).unwrap();
        collect_escapes(&mut ast, main);
        assert!(ast.fun_decl(main).escaping.is_empty());
    }

    #[test]
    fn test_escaping_var_lands_on_declaring_function() {
        // let function outer() = let var v := 0 function inner() = v in inner() end
        // in outer() end — v escapes onto outer, not main.
        let mut ast = Ast::new();
        let use_v = ident(&mut ast, "v");
        let inner = fun_decl(&mut ast, "inner", use_v);
        let zero = int(&mut ast, 0);
        let v = var_decl(&mut ast, "v", zero);
        let call_inner = call0(&mut ast, "inner");
        let outer_body = let_in(&mut ast, vec![v, inner], vec![call_inner]);
        let outer = fun_decl(&mut ast, "outer", outer_body);
        let call_outer = call0(&mut ast, "outer");
        let root = let_in(&mut ast, vec![outer], vec![call_outer]);

        let main = binder::bind_program(&mut ast, root).unwrap();
        collect_escapes(&mut ast, main);

        assert_eq!(ast.fun_decl(outer).escaping, vec![v]);
        assert!(ast.fun_decl(main).escaping.is_empty());
        assert!(ast.fun_decl(inner).escaping.is_empty());
    }
}
