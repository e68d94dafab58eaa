//! Expression emission.
//!
//! Each operation returns the IR value of its node, or `None` for void
//! nodes. Control flow synthesizes explicit basic blocks; conditional
//! results travel through an entry-block slot rather than phi nodes, so
//! branches that end in a `break` need no special merging.

use super::{CodeGenError, IRGenerator, Value, value_type};
use crate::ast::{BinOp, ExprId, ExprKind};
use crate::symbol::Symbol;
use crate::types::Ty;
use std::fmt::Write as _;

impl IRGenerator<'_> {
    pub(super) fn visit_expr(&mut self, id: ExprId) -> Result<Option<Value>, CodeGenError> {
        match self.ast.expr(id).kind.clone() {
            ExprKind::Int(value) => Ok(Some(Value {
                repr: value.to_string(),
                ty: "i32",
            })),
            ExprKind::Str(content) => {
                let global = self.string_global(content.as_str())?;
                Ok(Some(Value {
                    repr: global,
                    ty: "ptr",
                }))
            }
            ExprKind::Binary { op, left, right } => self.visit_binary(op, left, right),
            ExprKind::Seq(exprs) => {
                let mut last = None;
                for expr in exprs {
                    last = self.visit_expr(expr)?;
                }
                Ok(last)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.visit_if(id, cond, then_branch, else_branch),
            ExprKind::While { cond, body } => self.visit_while(id, cond, body),
            ExprKind::For { var, high, body } => self.visit_for(id, var, high, body),
            ExprKind::Break { target } => {
                let target = target.expect("breaks are bound to a loop");
                let exit = self
                    .loop_exits
                    .get(&target)
                    .expect("loop exits are recorded before their bodies")
                    .clone();
                self.branch(&exit)?;
                // Anything emitted after the break lands in a dead block.
                let dead = self.fresh_block("after_break");
                self.start_block(&dead)?;
                Ok(None)
            }
            ExprKind::Ident(_) => {
                let ty = value_type(self.ast.ty(id))?;
                let address = self.address_of(id)?;
                let value = self.fresh_temp();
                self.emit(&format!("{} = load {}, ptr {}", value, ty, address))?;
                Ok(Some(Value { repr: value, ty }))
            }
            ExprKind::Call(call) => {
                let decl = call.decl.expect("calls are bound before IR generation");
                self.visit_call(decl, call.depth, &call.args)
            }
            ExprKind::Assign { lhs, rhs } => {
                if let Some(value) = self.visit_expr(rhs)? {
                    let address = self.address_of(lhs)?;
                    self.emit(&format!("store {} {}, ptr {}", value.ty, value.repr, address))?;
                }
                Ok(None)
            }
            ExprKind::Let { decls, body } => {
                for decl in decls {
                    match self.ast.kind(decl) {
                        ExprKind::Var(_) => self.generate_var_decl(decl)?,
                        ExprKind::Fun(_) => self.declare_function(decl)?,
                        other => {
                            return Err(CodeGenError::Logic(format!(
                                "let declares a non-declaration node {:?}",
                                other
                            )));
                        }
                    }
                }
                self.visit_expr(body)
            }
            ExprKind::Var(_) | ExprKind::Fun(_) => Err(CodeGenError::Logic(
                "a declaration node outside a let reached IR generation".to_string(),
            )),
        }
    }

    fn visit_binary(
        &mut self,
        op: BinOp,
        left: ExprId,
        right: ExprId,
    ) -> Result<Option<Value>, CodeGenError> {
        let left_value = self.visit_expr(left)?.expect("operands yield values");
        let right_value = self.visit_expr(right)?.expect("operands yield values");
        let mut l = left_value.repr;
        let mut r = right_value.repr;

        // String comparisons go through the runtime: the operator is
        // rewritten to `strcmp(l, r) <op> 0`.
        if self.ast.ty(left) == Ty::String {
            if self.declared.insert(Symbol::new("__strcmp")) {
                writeln!(self.declarations, "declare i32 @__strcmp(ptr, ptr)")?;
            }
            let compared = self.fresh_temp();
            self.emit(&format!(
                "{} = call i32 @__strcmp(ptr {}, ptr {})",
                compared, l, r
            ))?;
            l = compared;
            r = "0".to_string();
        }

        let instruction = match op {
            BinOp::Add => Some("add"),
            BinOp::Sub => Some("sub"),
            BinOp::Mul => Some("mul"),
            BinOp::Div => Some("sdiv"),
            _ => None,
        };
        if let Some(instruction) = instruction {
            let result = self.fresh_temp();
            self.emit(&format!("{} = {} i32 {}, {}", result, instruction, l, r))?;
            return Ok(Some(Value {
                repr: result,
                ty: "i32",
            }));
        }

        if matches!(op, BinOp::And | BinOp::Or) {
            let instruction = if op == BinOp::And { "and" } else { "or" };
            let left_bool = self.fresh_temp();
            self.emit(&format!("{} = icmp ne i32 {}, 0", left_bool, l))?;
            let right_bool = self.fresh_temp();
            self.emit(&format!("{} = icmp ne i32 {}, 0", right_bool, r))?;
            let combined = self.fresh_temp();
            self.emit(&format!(
                "{} = {} i1 {}, {}",
                combined, instruction, left_bool, right_bool
            ))?;
            let result = self.fresh_temp();
            self.emit(&format!("{} = zext i1 {} to i32", result, combined))?;
            return Ok(Some(Value {
                repr: result,
                ty: "i32",
            }));
        }

        // Comparisons produce an i1 which is sign-extended to i32.
        let condition = match op {
            BinOp::Eq => "eq",
            BinOp::Neq => "ne",
            BinOp::Lt => "slt",
            BinOp::Le => "sle",
            BinOp::Gt => "sgt",
            BinOp::Ge => "sge",
            _ => unreachable!("arithmetic and logical operators handled above"),
        };
        let compared = self.fresh_temp();
        self.emit(&format!("{} = icmp {} i32 {}, {}", compared, condition, l, r))?;
        let result = self.fresh_temp();
        self.emit(&format!("{} = sext i1 {} to i32", result, compared))?;
        Ok(Some(Value {
            repr: result,
            ty: "i32",
        }))
    }

    fn visit_if(
        &mut self,
        id: ExprId,
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    ) -> Result<Option<Value>, CodeGenError> {
        let result_ty = self.ast.ty(id);
        let slot = if result_ty == Ty::Void {
            None
        } else {
            let ty = value_type(result_ty)?;
            Some((self.alloca_in_entry("if_result", ty)?, ty))
        };

        let then_block = self.fresh_block("if_then");
        let else_block = self.fresh_block("if_else");
        let end_block = self.fresh_block("if_end");

        let cond_value = self.visit_expr(cond)?.expect("conditions yield values");
        let flag = self.fresh_temp();
        self.emit(&format!("{} = icmp ne i32 {}, 0", flag, cond_value.repr))?;
        self.cond_branch(&flag, &then_block, &else_block)?;

        self.start_block(&then_block)?;
        let then_value = self.visit_expr(then_branch)?;
        if !self.block_terminated() {
            if let (Some((slot, _)), Some(value)) = (&slot, &then_value) {
                let line = format!("store {} {}, ptr {}", value.ty, value.repr, slot);
                self.emit(&line)?;
            }
            self.branch(&end_block)?;
        }

        self.start_block(&else_block)?;
        let else_value = self.visit_expr(else_branch)?;
        if !self.block_terminated() {
            if let (Some((slot, _)), Some(value)) = (&slot, &else_value) {
                let line = format!("store {} {}, ptr {}", value.ty, value.repr, slot);
                self.emit(&line)?;
            }
            self.branch(&end_block)?;
        }

        self.start_block(&end_block)?;
        match slot {
            Some((slot, ty)) => {
                let value = self.fresh_temp();
                self.emit(&format!("{} = load {}, ptr {}", value, ty, slot))?;
                Ok(Some(Value { repr: value, ty }))
            }
            None => Ok(None),
        }
    }

    fn visit_while(
        &mut self,
        id: ExprId,
        cond: ExprId,
        body: ExprId,
    ) -> Result<Option<Value>, CodeGenError> {
        let test_block = self.fresh_block("while_test");
        let body_block = self.fresh_block("while_body");
        let end_block = self.fresh_block("while_end");
        self.loop_exits.insert(id, end_block.clone());

        self.branch(&test_block)?;
        self.start_block(&test_block)?;
        let cond_value = self.visit_expr(cond)?.expect("conditions yield values");
        let flag = self.fresh_temp();
        self.emit(&format!("{} = icmp ne i32 {}, 0", flag, cond_value.repr))?;
        self.cond_branch(&flag, &body_block, &end_block)?;

        self.start_block(&body_block)?;
        self.visit_expr(body)?;
        if !self.block_terminated() {
            self.branch(&test_block)?;
        }

        self.start_block(&end_block)?;
        Ok(None)
    }

    fn visit_for(
        &mut self,
        id: ExprId,
        var: ExprId,
        high: ExprId,
        body: ExprId,
    ) -> Result<Option<Value>, CodeGenError> {
        let test_block = self.fresh_block("for_test");
        let body_block = self.fresh_block("for_body");
        let end_block = self.fresh_block("for_end");

        // Index slot with the low bound stored, high bound evaluated once.
        self.generate_var_decl(var)?;
        let index = self
            .allocations
            .get(&var)
            .expect("the loop index has a recorded slot")
            .clone();
        let high_value = self.visit_expr(high)?.expect("bounds yield values");
        self.loop_exits.insert(id, end_block.clone());
        self.branch(&test_block)?;

        self.start_block(&test_block)?;
        let current = self.fresh_temp();
        self.emit(&format!("{} = load i32, ptr {}", current, index))?;
        let flag = self.fresh_temp();
        self.emit(&format!(
            "{} = icmp sle i32 {}, {}",
            flag, current, high_value.repr
        ))?;
        self.cond_branch(&flag, &body_block, &end_block)?;

        self.start_block(&body_block)?;
        self.visit_expr(body)?;
        if !self.block_terminated() {
            let reloaded = self.fresh_temp();
            self.emit(&format!("{} = load i32, ptr {}", reloaded, index))?;
            let incremented = self.fresh_temp();
            self.emit(&format!("{} = add i32 {}, 1", incremented, reloaded))?;
            self.emit(&format!("store i32 {}, ptr {}", incremented, index))?;
            self.branch(&test_block)?;
        }

        self.start_block(&end_block)?;
        Ok(None)
    }

    fn visit_call(
        &mut self,
        decl: ExprId,
        call_depth: i32,
        args: &[ExprId],
    ) -> Result<Option<Value>, CodeGenError> {
        // Primitives are declared on first use; for user functions this
        // is a no-op since their declaring let runs first.
        self.declare_function(decl)?;

        let (external, fun_depth, external_name) = {
            let fun = self.ast.fun_decl(decl);
            (
                fun.external,
                fun.depth,
                fun.external_name
                    .expect("functions are named by the binder"),
            )
        };

        let mut call_args = Vec::with_capacity(args.len() + 1);
        if !external {
            // The hidden static link: the frame of the callee's parent,
            // found caller_depth - callee_parent_depth levels up.
            let levels = call_depth - (fun_depth - 1);
            let (_, frame) = self.frame_up(levels)?;
            call_args.push(format!("ptr {}", frame));
        }
        for &arg in args {
            let value = self.visit_expr(arg)?.expect("arguments yield values");
            call_args.push(format!("{} {}", value.ty, value.repr));
        }

        let result_ty = self.ast.ty(decl);
        if result_ty == Ty::Void {
            self.emit(&format!(
                "call void @{}({})",
                external_name,
                call_args.join(", ")
            ))?;
            Ok(None)
        } else {
            let ty = value_type(result_ty)?;
            let result = self.fresh_temp();
            self.emit(&format!(
                "{} = call {} @{}({})",
                result,
                ty,
                external_name,
                call_args.join(", ")
            ))?;
            Ok(Some(Value { repr: result, ty }))
        }
    }
}
