//! Frame records and variable slots.
//!
//! Escaping declarations live in the owning function's frame record;
//! everything else gets an entry-block alloca. Reaching a variable of an
//! outer function walks static links: frame field 0 of each function on
//! the way holds the pointer to its parent's frame.

use super::{CodeGenError, IRGenerator, value_type};
use crate::ast::{ExprId, FunDecl};
use std::fmt::Write as _;

impl IRGenerator<'_> {
    /// Define this function's frame record, allocate the frame instance
    /// in the entry block, and fix the frame field index of every
    /// escaping declaration.
    pub(super) fn synthesize_frame(
        &mut self,
        fun_id: ExprId,
        fun: &FunDecl,
    ) -> Result<(), CodeGenError> {
        let external_name = fun
            .external_name
            .expect("functions are named by the binder");

        let mut fields: Vec<&'static str> = Vec::new();
        if fun.parent.is_some() {
            fields.push("ptr");
        }
        for &decl in &fun.escaping {
            fields.push(value_type(self.ast.ty(decl))?);
        }
        let type_name = format!("%ft_{}", external_name);
        if fields.is_empty() {
            writeln!(self.frame_types, "{} = type {{}}", type_name)?;
        } else {
            writeln!(self.frame_types, "{} = type {{ {} }}", type_name, fields.join(", "))?;
        }
        self.frame_type_names.insert(fun_id, type_name.clone());

        let offset = usize::from(fun.parent.is_some());
        for (i, &decl) in fun.escaping.iter().enumerate() {
            self.frame_positions.insert(decl, i + offset);
        }

        if self.verbose {
            writeln!(
                self.body,
                "  ; frame {} ({} escaping)",
                type_name,
                fun.escaping.len()
            )?;
        }
        let frame = self.fresh_name("frame");
        writeln!(self.entry, "  {} = alloca {}", frame, type_name)?;
        self.frame_var = frame;
        Ok(())
    }

    /// Choose and record the slot for a declaration of the current
    /// function: a frame field for escaping declarations, a fresh
    /// entry-block alloca otherwise.
    pub(super) fn variable_slot(&mut self, decl: ExprId) -> Result<String, CodeGenError> {
        let escapes = self.ast.var_decl(decl).escapes;
        let slot = if escapes {
            let position = *self
                .frame_positions
                .get(&decl)
                .expect("escaping declarations have a frame position");
            let frame_type = self.frame_type_names[&self.current_function()].clone();
            let slot = self.fresh_temp();
            let line = format!(
                "{} = getelementptr {}, ptr {}, i32 0, i32 {}",
                slot, frame_type, self.frame_var, position
            );
            self.emit(&line)?;
            slot
        } else {
            let name = self.ast.var_decl(decl).name.to_string();
            let ty = value_type(self.ast.ty(decl))?;
            self.alloca_in_entry(&name, ty)?
        };
        self.allocations.insert(decl, slot.clone());
        Ok(slot)
    }

    /// Materialize a variable declaration: slot first, then the
    /// initializer value stored into it.
    pub(super) fn generate_var_decl(&mut self, decl: ExprId) -> Result<(), CodeGenError> {
        let slot = self.variable_slot(decl)?;
        if let Some(init) = self.ast.var_decl(decl).init {
            if let Some(value) = self.visit_expr(init)? {
                let line = format!("store {} {}, ptr {}", value.ty, value.repr, slot);
                self.emit(&line)?;
            }
        }
        Ok(())
    }

    /// Walk `levels` static links up from the current frame. Returns the
    /// function owning the resulting frame and the pointer to it.
    pub(super) fn frame_up(&mut self, levels: i32) -> Result<(ExprId, String), CodeGenError> {
        let mut fun = self.current_function();
        let mut frame = self.frame_var.clone();
        for _ in 0..levels {
            let frame_type = self.frame_type_names[&fun].clone();
            let field = self.fresh_temp();
            let line = format!(
                "{} = getelementptr {}, ptr {}, i32 0, i32 0",
                field, frame_type, frame
            );
            self.emit(&line)?;
            let parent = self.fresh_temp();
            let line = format!("{} = load ptr, ptr {}", parent, field);
            self.emit(&line)?;
            frame = parent;
            fun = self
                .ast
                .fun_decl(fun)
                .parent
                .expect("static link walks stay within bound functions");
        }
        Ok((fun, frame))
    }

    /// Address of an identifier: its local slot when declared in the
    /// current function, otherwise a frame field reached through the
    /// static-link chain.
    pub(super) fn address_of(&mut self, id: ExprId) -> Result<String, CodeGenError> {
        let ident = self.ast.ident(id).clone();
        let decl = ident.decl.expect("identifiers are bound before IR generation");
        let levels = ident.depth - self.ast.var_decl(decl).depth;
        if levels == 0 {
            return Ok(self
                .allocations
                .get(&decl)
                .expect("local variables have a recorded slot")
                .clone());
        }
        let (owner, frame) = self.frame_up(levels)?;
        let position = *self
            .frame_positions
            .get(&decl)
            .expect("escaping declarations have a frame position");
        let frame_type = self.frame_type_names[&owner].clone();
        let slot = self.fresh_temp();
        let line = format!(
            "{} = getelementptr {}, ptr {}, i32 0, i32 {}",
            slot, frame_type, frame, position
        );
        self.emit(&line)?;
        Ok(slot)
    }
}
