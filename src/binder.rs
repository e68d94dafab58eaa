//! Name binding.
//!
//! First pass over the AST. Resolves every identifier and call to its
//! declaration, computes function-stack depths, marks variables that
//! escape into deeper functions, assigns globally unique external names
//! to functions, and links every `break` to its loop.
//!
//! The binder owns a stack of scopes (symbol → declaration). A scope is
//! pushed for a `let`, for a function body (on top of the parameter
//! introductions) and for a `for` body; scoped state is released on every
//! exit path, including fatal errors, by running the visit inside a
//! closure. Depth is the index of the innermost enclosing function on the
//! function stack — the synthetic `main` wrapper sits at index 0 — and is
//! recorded on declarations and references at the moment of binding.

use crate::ast::{Ast, ExprId, ExprKind, FunDecl, Loc, VarDecl};
use crate::decl_groups::{self, DeclGroup};
use crate::error::{Diagnostic, Diagnostics, ErrorKind};
use crate::irgen::runtime::{self, Primitive};
use crate::symbol::Symbol;
use std::collections::{HashMap, HashSet};

/// Bind a whole program.
///
/// Wraps the program root in a synthetic `int`-returning `main` whose body
/// is the root followed by a trailing `0`, seeds the top-level scope with
/// the runtime primitives, then binds everything. Returns the `main`
/// declaration, the entry point for the later passes.
pub fn bind_program(ast: &mut Ast, root: ExprId) -> Result<ExprId, Diagnostics> {
    let mut binder = Binder::new(ast);
    match binder.analyze_program(root) {
        Ok(main) => binder.diags.finish_with(main),
        Err(fatal) => {
            binder.diags.report(fatal);
            Err(binder.diags)
        }
    }
}

type Scope = HashMap<Symbol, ExprId>;

struct Binder<'a> {
    ast: &'a mut Ast,
    scopes: Vec<Scope>,
    /// Enclosing function declarations, innermost last.
    functions: Vec<ExprId>,
    /// Enclosing loops in the current function, innermost last. Cleared
    /// on entry to a `let` or a function body: a `break` never crosses
    /// either boundary.
    loops: Vec<ExprId>,
    external_names: HashSet<Symbol>,
    diags: Diagnostics,
}

impl<'a> Binder<'a> {
    fn new(ast: &'a mut Ast) -> Binder<'a> {
        let mut binder = Binder {
            ast,
            scopes: vec![Scope::new()],
            functions: Vec::new(),
            loops: Vec::new(),
            external_names: HashSet::new(),
            diags: Diagnostics::new(),
        };
        for primitive in runtime::PRIMITIVES {
            binder.enter_primitive(primitive);
        }
        binder
    }

    fn analyze_program(&mut self, root: ExprId) -> Result<ExprId, Diagnostic> {
        let zero = self.ast.add(Loc::none(), ExprKind::Int(0));
        let body = self.ast.add(Loc::none(), ExprKind::Seq(vec![root, zero]));
        let main = self.ast.add(
            Loc::none(),
            ExprKind::Fun(FunDecl {
                name: Symbol::new("main"),
                params: Vec::new(),
                result_name: Some(Symbol::new("int")),
                body: Some(body),
                external: true,
                parent: None,
                external_name: None,
                depth: 0,
                escaping: Vec::new(),
            }),
        );
        self.visit_fun_decl(main)?;
        Ok(main)
    }

    /// Declare one runtime primitive in the top-level scope. Its external
    /// name is fixed by the runtime ABI and its types are already known,
    /// so the declaration arrives fully annotated.
    fn enter_primitive(&mut self, primitive: &Primitive) {
        let mut params = Vec::with_capacity(primitive.params.len());
        for (i, &ty) in primitive.params.iter().enumerate() {
            let param = self.ast.add(
                Loc::none(),
                ExprKind::Var(VarDecl {
                    name: Symbol::new(&format!("a_{}", i)),
                    type_name: Some(Symbol::new(ty.name())),
                    init: None,
                    depth: 0,
                    escapes: false,
                    read_only: false,
                }),
            );
            self.ast.expr_mut(param).ty = ty;
            params.push(param);
        }
        let decl = self.ast.add(
            Loc::none(),
            ExprKind::Fun(FunDecl {
                name: Symbol::new(primitive.name),
                params,
                result_name: Some(Symbol::new(primitive.result.name())),
                body: None,
                external: true,
                parent: None,
                external_name: Some(Symbol::new(&format!("__{}", primitive.name))),
                depth: 0,
                escaping: Vec::new(),
            }),
        );
        self.ast.expr_mut(decl).ty = primitive.result;
        self.enter(decl);
    }

    fn current_depth(&self) -> i32 {
        self.functions.len() as i32 - 1
    }

    /// Run `f` inside a fresh scope; the scope is popped on both the Ok
    /// and the Err path.
    fn with_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        self.scopes.push(Scope::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` with an empty loop context, restoring the outer one after.
    fn with_reset_loops<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        let saved = std::mem::take(&mut self.loops);
        let result = f(self);
        self.loops = saved;
        result
    }

    /// Enter a declaration in the current scope. A name already present
    /// is reported and then shadowed by the new declaration.
    fn enter(&mut self, decl: ExprId) {
        let name = self.ast.decl_name(decl);
        let loc = self.ast.loc(decl);
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if let Some(&previous) = scope.get(&name) {
            let previous_loc = self.ast.loc(previous);
            self.diags.report(Diagnostic::new(
                ErrorKind::Redeclaration,
                loc,
                format!(
                    "{} is already defined in this scope (previous declaration at {})",
                    name, previous_loc
                ),
            ));
        }
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        scope.insert(name, decl);
    }

    /// Walk the scope stack innermost-outermost; the first hit wins.
    fn find(&self, loc: Loc, name: Symbol) -> Result<ExprId, Diagnostic> {
        for scope in self.scopes.iter().rev() {
            if let Some(&decl) = scope.get(&name) {
                return Ok(decl);
            }
        }
        Err(Diagnostic::new(
            ErrorKind::UnboundReference,
            loc,
            format!("{} cannot be found in this scope", name),
        ))
    }

    fn visit_expr(&mut self, id: ExprId) -> Result<(), Diagnostic> {
        match self.ast.expr(id).kind.clone() {
            ExprKind::Int(_) | ExprKind::Str(_) => Ok(()),
            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left)?;
                self.visit_expr(right)
            }
            ExprKind::Seq(exprs) => {
                for expr in exprs {
                    self.visit_expr(expr)?;
                }
                Ok(())
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond)?;
                self.visit_expr(then_branch)?;
                self.visit_expr(else_branch)
            }
            ExprKind::While { cond, body } => {
                self.visit_expr(cond)?;
                self.loops.push(id);
                let result = self.visit_expr(body);
                self.loops.pop();
                result
            }
            ExprKind::For { var, high, body } => self.with_scope(|binder| {
                binder.ast.var_decl_mut(var).read_only = true;
                binder.visit_var_decl(var)?;
                binder.visit_expr(high)?;
                binder.loops.push(id);
                let result = binder.visit_expr(body);
                binder.loops.pop();
                result
            }),
            ExprKind::Break { .. } => match self.loops.last().copied() {
                Some(target) => {
                    if let ExprKind::Break { target: slot } = &mut self.ast.expr_mut(id).kind {
                        *slot = Some(target);
                    }
                    Ok(())
                }
                None => Err(Diagnostic::new(
                    ErrorKind::BreakOutsideLoop,
                    self.ast.loc(id),
                    "break outside of a loop",
                )),
            },
            ExprKind::Ident(ident) => self.visit_ident(id, ident.name),
            ExprKind::Call(call) => self.visit_call(id, call.func, &call.args),
            ExprKind::Assign { lhs, rhs } => {
                self.visit_expr(lhs)?;
                let decl = match self.ast.kind(lhs) {
                    ExprKind::Ident(ident) => ident.decl,
                    _ => {
                        return Err(Diagnostic::new(
                            ErrorKind::WrongKindOfName,
                            self.ast.loc(lhs),
                            "assignment target must be a variable",
                        ));
                    }
                };
                if let Some(decl) = decl {
                    let var = self.ast.var_decl(decl);
                    if var.read_only {
                        let message = format!(
                            "{} is the index of a for loop and cannot be assigned",
                            var.name
                        );
                        self.diags.report(Diagnostic::new(
                            ErrorKind::ReadOnlyViolation,
                            self.ast.loc(lhs),
                            message,
                        ));
                    }
                }
                self.visit_expr(rhs)
            }
            ExprKind::Let { decls, body } => self.with_scope(|binder| {
                binder.with_reset_loops(|binder| {
                    for group in decl_groups::split(binder.ast, &decls) {
                        match group {
                            DeclGroup::Functions(run) => {
                                // All headers first, so any body can call
                                // any other function of the run.
                                for &fun in &run {
                                    binder.enter(fun);
                                }
                                for &fun in &run {
                                    binder.visit_fun_decl(fun)?;
                                }
                            }
                            DeclGroup::Variable(decl) => binder.visit_var_decl(decl)?,
                        }
                    }
                    binder.visit_expr(body)
                })
            }),
            ExprKind::Var(_) => self.visit_var_decl(id),
            ExprKind::Fun(_) => self.visit_fun_decl(id),
        }
    }

    fn visit_ident(&mut self, id: ExprId, name: Symbol) -> Result<(), Diagnostic> {
        let loc = self.ast.loc(id);
        let decl = self.find(loc, name)?;
        if !matches!(self.ast.kind(decl), ExprKind::Var(_)) {
            return Err(Diagnostic::new(
                ErrorKind::WrongKindOfName,
                loc,
                format!("{} is a function, not a variable", name),
            ));
        }
        let depth = self.current_depth();
        if depth > self.ast.var_decl(decl).depth {
            self.ast.var_decl_mut(decl).escapes = true;
        }
        if let ExprKind::Ident(ident) = &mut self.ast.expr_mut(id).kind {
            ident.decl = Some(decl);
            ident.depth = depth;
        }
        Ok(())
    }

    fn visit_call(&mut self, id: ExprId, name: Symbol, args: &[ExprId]) -> Result<(), Diagnostic> {
        let loc = self.ast.loc(id);
        let decl = self.find(loc, name)?;
        let arity = match self.ast.kind(decl) {
            ExprKind::Fun(fun) => fun.params.len(),
            _ => {
                return Err(Diagnostic::new(
                    ErrorKind::WrongKindOfName,
                    loc,
                    format!("{} is a variable, not a function", name),
                ));
            }
        };
        if arity != args.len() {
            self.diags.report(Diagnostic::new(
                ErrorKind::ArityMismatch,
                loc,
                format!("{} expects {} arguments, got {}", name, arity, args.len()),
            ));
        }
        for &arg in args {
            self.visit_expr(arg)?;
        }
        let depth = self.current_depth();
        if let ExprKind::Call(call) = &mut self.ast.expr_mut(id).kind {
            call.decl = Some(decl);
            call.depth = depth;
        }
        Ok(())
    }

    fn visit_var_decl(&mut self, id: ExprId) -> Result<(), Diagnostic> {
        // The initializer is bound before the variable enters the scope,
        // so `var x := x` refers to an outer x.
        if let Some(init) = self.ast.var_decl(id).init {
            self.visit_expr(init)?;
        }
        self.ast.var_decl_mut(id).depth = self.current_depth();
        self.enter(id);
        Ok(())
    }

    fn visit_fun_decl(&mut self, id: ExprId) -> Result<(), Diagnostic> {
        self.set_parent_and_external_name(id);
        let fun = self.ast.fun_decl(id);
        let name = fun.name;
        let params = fun.params.clone();
        let body = fun.body;

        self.functions.push(id);
        let result = self.with_scope(|binder| {
            binder.with_reset_loops(|binder| {
                for &param in &params {
                    if binder.ast.var_decl(param).name == name {
                        return Err(Diagnostic::new(
                            ErrorKind::ParameterShadowsFunction,
                            binder.ast.loc(param),
                            format!("{} has a parameter with the same name", name),
                        ));
                    }
                    binder.visit_var_decl(param)?;
                }
                match body {
                    Some(expr) => binder.visit_expr(expr),
                    None => Ok(()),
                }
            })
        });
        self.functions.pop();
        result
    }

    /// Record the parent function, this function's own stack index, and a
    /// unique external name: the parent chain dot-joined, de-collided
    /// with trailing underscores.
    fn set_parent_and_external_name(&mut self, id: ExprId) {
        let parent = self.functions.last().copied();
        let name = self.ast.fun_decl(id).name;
        let mut external_name = match parent {
            Some(p) => {
                let parent_external = self
                    .ast
                    .fun_decl(p)
                    .external_name
                    .expect("parent is named before its children are visited");
                Symbol::new(&format!("{}.{}", parent_external, name))
            }
            None => name,
        };
        while self.external_names.contains(&external_name) {
            external_name = Symbol::new(&format!("{}_", external_name));
        }
        self.external_names.insert(external_name);

        let depth = self.functions.len() as i32;
        let fun = self.ast.fun_decl_mut(id);
        fun.parent = parent;
        fun.external_name = Some(external_name);
        fun.depth = depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Call, Ident};

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

    fn call(ast: &mut Ast, name: &str, args: Vec<ExprId>) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Call(Call {
                func: Symbol::new(name),
                args,
                decl: None,
                depth: 0,
            }),
        )
    }

    fn var_decl(ast: &mut Ast, name: &str, init: Option<ExprId>) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Var(VarDecl {
                name: Symbol::new(name),
                type_name: None,
                init,
                depth: 0,
                escapes: false,
                read_only: false,
            }),
        )
    }

    fn fun_decl(ast: &mut Ast, name: &str, params: Vec<ExprId>, body: ExprId) -> ExprId {
        ast.add(
            Loc::new(1, 1),
            ExprKind::Fun(FunDecl {
                name: Symbol::new(name),
                params,
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

    #[test]
    fn test_identifier_resolves_to_declaration() {
        let mut ast = Ast::new();
        let three = int(&mut ast, 3);
        let x = var_decl(&mut ast, "x", Some(three));
        let use_x = ident(&mut ast, "x");
        let root = let_in(&mut ast, vec![x], vec![use_x]);

        bind_program(&mut ast, root).unwrap();
        assert_eq!(ast.ident(use_x).decl, Some(x));
        assert_eq!(ast.ident(use_x).depth, 0);
        assert_eq!(ast.var_decl(x).depth, 0);
        assert!(!ast.var_decl(x).escapes);
    }

    #[test]
    fn test_unbound_identifier_is_fatal() {
        let mut ast = Ast::new();
        let root = ident(&mut ast, "nope");
        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].kind, ErrorKind::UnboundReference);
    }

    #[test]
    fn test_redeclaration_is_reported_and_shadows() {
        let mut ast = Ast::new();
        let one = int(&mut ast, 1);
        let first = var_decl(&mut ast, "x", Some(one));
        let two = int(&mut ast, 2);
        let second = var_decl(&mut ast, "x", Some(two));
        let use_x = ident(&mut ast, "x");
        let root = let_in(&mut ast, vec![first, second], vec![use_x]);

        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::Redeclaration);
        // The later declaration wins in the scope.
        assert_eq!(ast.ident(use_x).decl, Some(second));
    }

    #[test]
    fn test_break_outside_loop_is_fatal() {
        let mut ast = Ast::new();
        let root = ast.add(Loc::new(1, 1), ExprKind::Break { target: None });
        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::BreakOutsideLoop);
    }

    #[test]
    fn test_break_binds_to_innermost_loop() {
        let mut ast = Ast::new();
        let brk = ast.add(Loc::new(1, 1), ExprKind::Break { target: None });
        let one = int(&mut ast, 1);
        let inner_body = ast.add(Loc::new(1, 1), ExprKind::Seq(vec![brk]));
        let inner = ast.add(
            Loc::new(1, 1),
            ExprKind::While {
                cond: one,
                body: inner_body,
            },
        );
        let one2 = int(&mut ast, 1);
        let outer_body = ast.add(Loc::new(1, 1), ExprKind::Seq(vec![inner]));
        let outer = ast.add(
            Loc::new(1, 1),
            ExprKind::While {
                cond: one2,
                body: outer_body,
            },
        );

        bind_program(&mut ast, outer).unwrap();
        match ast.kind(brk) {
            ExprKind::Break { target } => assert_eq!(*target, Some(inner)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_break_does_not_cross_function_boundary() {
        // while 1 do let function f() = break in f() end  -- rejected
        let mut ast = Ast::new();
        let brk = ast.add(Loc::new(1, 1), ExprKind::Break { target: None });
        let f = fun_decl(&mut ast, "f", vec![], brk);
        let call_f = call(&mut ast, "f", vec![]);
        let body = let_in(&mut ast, vec![f], vec![call_f]);
        let one = int(&mut ast, 1);
        let root = ast.add(Loc::new(1, 1), ExprKind::While { cond: one, body });

        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::BreakOutsideLoop);
    }

    #[test]
    fn test_break_in_nested_function_binds_to_its_own_loop() {
        // while 1 do let function f() = while 1 do break in f() end
        let mut ast = Ast::new();
        let brk = ast.add(Loc::new(1, 1), ExprKind::Break { target: None });
        let inner_cond = int(&mut ast, 1);
        let inner_while = ast.add(
            Loc::new(1, 1),
            ExprKind::While {
                cond: inner_cond,
                body: brk,
            },
        );
        let f = fun_decl(&mut ast, "f", vec![], inner_while);
        let call_f = call(&mut ast, "f", vec![]);
        let outer_body = let_in(&mut ast, vec![f], vec![call_f]);
        let outer_cond = int(&mut ast, 1);
        let root = ast.add(
            Loc::new(1, 1),
            ExprKind::While {
                cond: outer_cond,
                body: outer_body,
            },
        );

        bind_program(&mut ast, root).unwrap();
        match ast.kind(brk) {
            ExprKind::Break { target } => assert_eq!(*target, Some(inner_while)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_break_does_not_cross_a_let_boundary() {
        // while 1 do let var x := 1 in break end  -- rejected
        let mut ast = Ast::new();
        let one = int(&mut ast, 1);
        let x = var_decl(&mut ast, "x", Some(one));
        let brk = ast.add(Loc::new(1, 1), ExprKind::Break { target: None });
        let body = let_in(&mut ast, vec![x], vec![brk]);
        let cond = int(&mut ast, 1);
        let root = ast.add(Loc::new(1, 1), ExprKind::While { cond, body });

        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::BreakOutsideLoop);
    }

    #[test]
    fn test_escape_is_marked_across_function_boundary() {
        // let var v := 0 function f() = v in f() end
        let mut ast = Ast::new();
        let zero = int(&mut ast, 0);
        let v = var_decl(&mut ast, "v", Some(zero));
        let use_v = ident(&mut ast, "v");
        let f = fun_decl(&mut ast, "f", vec![], use_v);
        let call_f = call(&mut ast, "f", vec![]);
        let root = let_in(&mut ast, vec![v, f], vec![call_f]);

        bind_program(&mut ast, root).unwrap();
        assert!(ast.var_decl(v).escapes);
        assert_eq!(ast.var_decl(v).depth, 0);
        assert_eq!(ast.ident(use_v).depth, 1);
        assert_eq!(ast.fun_decl(f).depth, 1);
    }

    #[test]
    fn test_external_names_are_qualified_and_unique() {
        // Two sibling scopes each declaring f: main.f then main.f_
        let mut ast = Ast::new();
        let one = int(&mut ast, 1);
        let f1 = fun_decl(&mut ast, "f", vec![], one);
        let two = int(&mut ast, 2);
        let f2 = fun_decl(&mut ast, "f", vec![], two);
        let call2 = call(&mut ast, "f", vec![]);
        let inner = let_in(&mut ast, vec![f2], vec![call2]);
        let root = let_in(&mut ast, vec![f1], vec![inner]);

        let main = bind_program(&mut ast, root).unwrap();
        assert_eq!(
            ast.fun_decl(main).external_name,
            Some(Symbol::new("main"))
        );
        assert_eq!(
            ast.fun_decl(f1).external_name,
            Some(Symbol::new("main.f"))
        );
        assert_eq!(
            ast.fun_decl(f2).external_name,
            Some(Symbol::new("main.f_"))
        );
        assert_eq!(ast.fun_decl(f1).parent, Some(main));
        assert_eq!(ast.fun_decl(f2).parent, Some(main));
    }

    #[test]
    fn test_parameter_shadowing_function_is_fatal() {
        let mut ast = Ast::new();
        let param = var_decl(&mut ast, "f", None);
        let one = int(&mut ast, 1);
        let f = fun_decl(&mut ast, "f", vec![param], one);
        let arg = int(&mut ast, 2);
        let call_f = call(&mut ast, "f", vec![arg]);
        let root = let_in(&mut ast, vec![f], vec![call_f]);

        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::ParameterShadowsFunction);
    }

    #[test]
    fn test_assignment_to_loop_index_is_rejected() {
        // for i := 1 to 3 do i := i + 1
        let mut ast = Ast::new();
        let low = int(&mut ast, 1);
        let i = var_decl(&mut ast, "i", Some(low));
        let high = int(&mut ast, 3);
        let lhs = ident(&mut ast, "i");
        let i_use = ident(&mut ast, "i");
        let one = int(&mut ast, 1);
        let plus = ast.add(
            Loc::new(1, 1),
            ExprKind::Binary {
                op: BinOp::Add,
                left: i_use,
                right: one,
            },
        );
        let assign = ast.add(Loc::new(1, 1), ExprKind::Assign { lhs, rhs: plus });
        let body = ast.add(Loc::new(1, 1), ExprKind::Seq(vec![assign]));
        let root = ast.add(
            Loc::new(1, 1),
            ExprKind::For {
                var: i,
                high,
                body,
            },
        );

        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::ReadOnlyViolation);
        assert!(ast.var_decl(i).read_only);
    }

    #[test]
    fn test_primitives_are_in_scope() {
        let mut ast = Ast::new();
        let n = int(&mut ast, 65);
        let root = call(&mut ast, "chr", vec![n]);
        bind_program(&mut ast, root).unwrap();
        match ast.kind(root) {
            ExprKind::Call(c) => {
                let decl = c.decl.expect("chr resolved");
                let fun = ast.fun_decl(decl);
                assert!(fun.external);
                assert_eq!(fun.external_name, Some(Symbol::new("__chr")));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_call_arity_is_checked() {
        let mut ast = Ast::new();
        let one = int(&mut ast, 1);
        let root = call(&mut ast, "flush", vec![one]);
        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::ArityMismatch);
    }

    #[test]
    fn test_calling_a_variable_is_fatal() {
        let mut ast = Ast::new();
        let one = int(&mut ast, 1);
        let x = var_decl(&mut ast, "x", Some(one));
        let bad = call(&mut ast, "x", vec![]);
        let root = let_in(&mut ast, vec![x], vec![bad]);
        let err = bind_program(&mut ast, root).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::WrongKindOfName);
    }

    #[test]
    fn test_mutual_recursion_headers_visible() {
        // let function even(n:int):int = odd(n) function odd(n:int):int = even(n) in even(4) end
        let mut ast = Ast::new();
        let p1 = ast.add(
            Loc::new(1, 1),
            ExprKind::Var(VarDecl {
                name: Symbol::new("n"),
                type_name: Some(Symbol::new("int")),
                init: None,
                depth: 0,
                escapes: false,
                read_only: false,
            }),
        );
        let n1 = ident(&mut ast, "n");
        let call_odd = call(&mut ast, "odd", vec![n1]);
        let even = fun_decl(&mut ast, "even", vec![p1], call_odd);

        let p2 = ast.add(
            Loc::new(1, 1),
            ExprKind::Var(VarDecl {
                name: Symbol::new("n"),
                type_name: Some(Symbol::new("int")),
                init: None,
                depth: 0,
                escapes: false,
                read_only: false,
            }),
        );
        let n2 = ident(&mut ast, "n");
        let call_even = call(&mut ast, "even", vec![n2]);
        let odd = fun_decl(&mut ast, "odd", vec![p2], call_even);

        let four = int(&mut ast, 4);
        let entry = call(&mut ast, "even", vec![four]);
        let root = let_in(&mut ast, vec![even, odd], vec![entry]);

        bind_program(&mut ast, root).unwrap();
        match ast.kind(call_odd) {
            ExprKind::Call(c) => assert_eq!(c.decl, Some(odd)),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
