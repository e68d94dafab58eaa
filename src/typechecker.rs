//! Type checking.
//!
//! Assigns an element of {int, string, void} to every expression node and
//! rejects programs that break the typing rules. Runs after the binder;
//! every identifier and call already carries its declaration.
//!
//! Mutually recursive `let` groups are checked in two phases: first the
//! signature of every function in the group (parameter types and return
//! type, no body descent), then each body against the full set of
//! signatures. The grouping itself is shared with the binder through
//! `decl_groups`, so the two passes can never disagree on what is in a
//! group.

use crate::ast::{Ast, ExprId, ExprKind, Loc};
use crate::decl_groups::{self, DeclGroup};
use crate::error::{Diagnostic, Diagnostics, ErrorKind};
use crate::symbol::Symbol;
use crate::types::Ty;

/// Check a bound program, starting from the synthetic `main`.
pub fn check_program(ast: &mut Ast, main: ExprId) -> Result<(), Diagnostics> {
    let mut checker = TypeChecker {
        ast,
        diags: Diagnostics::new(),
    };
    match checker.check_main(main) {
        Ok(()) => checker.diags.finish_with(()),
        Err(fatal) => {
            checker.diags.report(fatal);
            Err(checker.diags)
        }
    }
}

struct TypeChecker<'a> {
    ast: &'a mut Ast,
    diags: Diagnostics,
}

impl TypeChecker<'_> {
    fn check_main(&mut self, main: ExprId) -> Result<(), Diagnostic> {
        self.resolve_signature(main)?;
        self.check_fun_body(main)
    }

    /// Resolve a declared type name to a value type.
    fn value_type_from_name(&self, name: Symbol, loc: Loc) -> Result<Ty, Diagnostic> {
        match name.as_str() {
            "int" => Ok(Ty::Int),
            "string" => Ok(Ty::String),
            other => Err(Diagnostic::new(
                ErrorKind::UnknownTypeName,
                loc,
                format!("{} does not name a type", other),
            )),
        }
    }

    /// Phase a of function checking: fix the signature without entering
    /// the body. Parameter types come from their declared names; the
    /// return type defaults to void when undeclared, and `void` may only
    /// be written on primitives.
    fn resolve_signature(&mut self, fun: ExprId) -> Result<(), Diagnostic> {
        let decl = self.ast.fun_decl(fun);
        let name = decl.name;
        let params = decl.params.clone();
        let result_name = decl.result_name;
        let external = decl.external;
        let loc = self.ast.loc(fun);

        for param in params {
            let var = self.ast.var_decl(param);
            let param_loc = self.ast.loc(param);
            let ty = match var.type_name {
                Some(type_name) => self.value_type_from_name(type_name, param_loc)?,
                None => {
                    return Err(Diagnostic::new(
                        ErrorKind::UnknownTypeName,
                        param_loc,
                        format!("parameter {} has no declared type", var.name),
                    ));
                }
            };
            self.ast.set_ty(param, ty);
        }

        let result = match result_name {
            Some(type_name) if type_name.as_str() == "void" => {
                if external {
                    Ty::Void
                } else {
                    return Err(Diagnostic::new(
                        ErrorKind::UnknownTypeName,
                        loc,
                        format!("{} cannot declare the void return type", name),
                    ));
                }
            }
            Some(type_name) => self.value_type_from_name(type_name, loc)?,
            None => Ty::Void,
        };
        self.ast.set_ty(fun, result);
        Ok(())
    }

    /// Phase b: the body's type must equal the declared return type.
    /// Primitives have no body and skip this entirely.
    fn check_fun_body(&mut self, fun: ExprId) -> Result<(), Diagnostic> {
        let decl = self.ast.fun_decl(fun);
        let name = decl.name;
        let loc = self.ast.loc(fun);
        let result = self.ast.ty(fun);
        if let Some(body) = decl.body {
            let body_ty = self.check_expr(body)?;
            if body_ty != result {
                self.diags.report(Diagnostic::new(
                    ErrorKind::TypeMismatch,
                    loc,
                    format!(
                        "body of {} has type {} but {} is expected",
                        name, body_ty, result
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_var_decl(&mut self, id: ExprId) -> Result<(), Diagnostic> {
        let var = self.ast.var_decl(id);
        let name = var.name;
        let type_name = var.type_name;
        let init = var.init;
        let loc = self.ast.loc(id);

        let declared = match type_name {
            Some(n) => Some(self.value_type_from_name(n, loc)?),
            None => None,
        };
        let init_ty = match init {
            Some(expr) => Some(self.check_expr(expr)?),
            None => None,
        };

        let ty = match (declared, init_ty) {
            (Some(declared), Some(init_ty)) => {
                if declared != init_ty {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!(
                            "{} is declared {} but initialized with {}",
                            name, declared, init_ty
                        ),
                    ));
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(Ty::Void)) => {
                return Err(Diagnostic::new(
                    ErrorKind::VoidInitializer,
                    loc,
                    format!("{} is initialized with an expression of no value", name),
                ));
            }
            (None, Some(init_ty)) => init_ty,
            (None, None) => {
                return Err(Diagnostic::new(
                    ErrorKind::UnknownTypeName,
                    loc,
                    format!("{} has neither a declared type nor an initializer", name),
                ));
            }
        };
        self.ast.set_ty(id, ty);
        Ok(())
    }

    fn check_expr(&mut self, id: ExprId) -> Result<Ty, Diagnostic> {
        let loc = self.ast.loc(id);
        let ty = match self.ast.expr(id).kind.clone() {
            ExprKind::Int(_) => Ty::Int,
            ExprKind::Str(_) => Ty::String,
            ExprKind::Binary { op, left, right } => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                if op.takes_ints() {
                    if left_ty != Ty::Int || right_ty != Ty::Int {
                        self.diags.report(Diagnostic::new(
                            ErrorKind::TypeMismatch,
                            loc,
                            format!(
                                "operands of {} must be int, got {} and {}",
                                op, left_ty, right_ty
                            ),
                        ));
                    }
                } else if left_ty != right_ty {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!(
                            "operands of {} must have the same type, got {} and {}",
                            op, left_ty, right_ty
                        ),
                    ));
                } else if left_ty == Ty::Void {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("operands of {} cannot be void", op),
                    ));
                }
                Ty::Int
            }
            ExprKind::Seq(exprs) => {
                let mut ty = Ty::Void;
                for expr in exprs {
                    ty = self.check_expr(expr)?;
                }
                ty
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.check_expr(cond)?;
                if cond_ty != Ty::Int {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("condition of if must be int, got {}", cond_ty),
                    ));
                }
                let then_ty = self.check_expr(then_branch)?;
                let else_ty = self.check_expr(else_branch)?;
                if then_ty != else_ty {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!(
                            "branches of if have different types, {} and {}",
                            then_ty, else_ty
                        ),
                    ));
                }
                then_ty
            }
            ExprKind::While { cond, body } => {
                let cond_ty = self.check_expr(cond)?;
                if cond_ty != Ty::Int {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("condition of while must be int, got {}", cond_ty),
                    ));
                }
                let body_ty = self.check_expr(body)?;
                if body_ty != Ty::Void {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        "body of while must produce no value",
                    ));
                }
                Ty::Void
            }
            ExprKind::For { var, high, body } => {
                self.check_var_decl(var)?;
                if self.ast.ty(var) != Ty::Int {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        self.ast.loc(var),
                        "index of a for loop must be int",
                    ));
                }
                let high_ty = self.check_expr(high)?;
                if high_ty != Ty::Int {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("high bound of for must be int, got {}", high_ty),
                    ));
                }
                let body_ty = self.check_expr(body)?;
                if body_ty != Ty::Void {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        "body of for must produce no value",
                    ));
                }
                Ty::Void
            }
            ExprKind::Break { .. } => Ty::Void,
            ExprKind::Ident(ident) => {
                let decl = ident.decl.expect("identifier bound before type checking");
                self.ast.ty(decl)
            }
            ExprKind::Call(call) => {
                let decl = call.decl.expect("call bound before type checking");
                let params = self.ast.fun_decl(decl).params.clone();
                let name = self.ast.fun_decl(decl).name;
                if params.len() != call.args.len() {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::ArityMismatch,
                        loc,
                        format!(
                            "{} expects {} arguments, got {}",
                            name,
                            params.len(),
                            call.args.len()
                        ),
                    ));
                }
                for (i, &arg) in call.args.iter().enumerate() {
                    let arg_ty = self.check_expr(arg)?;
                    if let Some(&param) = params.get(i) {
                        let param_ty = self.ast.ty(param);
                        if arg_ty != param_ty {
                            self.diags.report(Diagnostic::new(
                                ErrorKind::TypeMismatch,
                                self.ast.loc(arg),
                                format!(
                                    "argument {} of {} must be {}, got {}",
                                    i + 1,
                                    name,
                                    param_ty,
                                    arg_ty
                                ),
                            ));
                        }
                    }
                }
                self.ast.ty(decl)
            }
            ExprKind::Assign { lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                if lhs_ty != rhs_ty {
                    self.diags.report(Diagnostic::new(
                        ErrorKind::TypeMismatch,
                        loc,
                        format!("cannot assign {} to a {} variable", rhs_ty, lhs_ty),
                    ));
                }
                Ty::Void
            }
            ExprKind::Let { decls, body } => {
                for group in decl_groups::split(self.ast, &decls) {
                    match group {
                        DeclGroup::Functions(run) => {
                            for &fun in &run {
                                self.resolve_signature(fun)?;
                            }
                            for &fun in &run {
                                self.check_fun_body(fun)?;
                            }
                        }
                        DeclGroup::Variable(decl) => self.check_var_decl(decl)?,
                    }
                }
                self.check_expr(body)?
            }
            // Declarations are typed where they are declared; they are
            // not expressions.
            ExprKind::Var(_) => {
                self.check_var_decl(id)?;
                return Ok(Ty::Void);
            }
            ExprKind::Fun(_) => {
                self.resolve_signature(id)?;
                self.check_fun_body(id)?;
                return Ok(Ty::Void);
            }
        };
        self.ast.set_ty(id, ty);
        Ok(ty)
    }
}
