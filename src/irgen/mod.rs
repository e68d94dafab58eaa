//! LLVM IR generation.
//!
//! Emits the annotated AST as textual LLVM IR (opaque pointers, LLVM 15+),
//! one function at a time. The physical back-end — assembling, linking
//! against the runtime library — is external; this module stops at
//! verified IR text.
//!
//! # Frames and static links
//!
//! Every emitted function gets a named frame record `%ft_<name>`: a
//! pointer to the parent's frame first (when there is a parent), then one
//! field per escaping declaration in the order collected by the escaper.
//! Non-escaping variables live in plain entry-block allocas and never
//! touch the frame. Non-external functions take a hidden leading `ptr`
//! parameter, the static link, stored into frame field 0 on entry; a call
//! walks `caller depth − callee parent depth` links from the current
//! frame to build that argument.
//!
//! # Emission model
//!
//! Instructions are written into per-function `entry`/`body` buffers with
//! fresh-temp and fresh-block counters. Every block is terminated exactly
//! once: a `break` branches to its loop's recorded exit block and then
//! opens a fresh unreachable continuation block, so nothing is ever
//! emitted after a terminator. Each finished function runs through the
//! textual verifier before it joins the module.
//!
//! # Module structure
//!
//! - `expr.rs`: the expression visitor (literals, operators, control
//!   flow, calls, declarations)
//! - `frame.rs`: frame records, variable slots, static-link walks
//! - `runtime.rs`: the primitive ABI table shared with the binder
//! - `globals.rs`: deduplicated string-literal globals
//! - `verify.rs`: per-function block-structure verification
//! - `error.rs`: error type

mod error;
mod expr;
mod frame;
mod globals;
pub(crate) mod runtime;
mod verify;

pub use error::CodeGenError;

use crate::ast::{Ast, ExprId};
use crate::config::CompileOptions;
use crate::symbol::Symbol;
use crate::types::Ty;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;
use std::io;

/// An SSA value paired with its lowered type. Void expressions produce no
/// value at all (`None` at the visitor level).
#[derive(Debug, Clone)]
pub(super) struct Value {
    /// Register or literal text, e.g. `%t3` or `7`.
    pub repr: String,
    /// `i32` or `ptr`.
    pub ty: &'static str,
}

/// Lower a value type. Void has no value representation.
pub(super) fn value_type(ty: Ty) -> Result<&'static str, CodeGenError> {
    match ty {
        Ty::Int => Ok("i32"),
        Ty::String => Ok("ptr"),
        Ty::Void | Ty::Undefined => Err(CodeGenError::Logic(format!(
            "no value representation for the {} type",
            ty
        ))),
    }
}

/// Lower a return type.
pub(super) fn return_type(ty: Ty) -> Result<&'static str, CodeGenError> {
    match ty {
        Ty::Int => Ok("i32"),
        Ty::String => Ok("ptr"),
        Ty::Void => Ok("void"),
        Ty::Undefined => Err(CodeGenError::Logic(
            "an undefined type reached IR generation".to_string(),
        )),
    }
}

pub struct IRGenerator<'a> {
    ast: &'a Ast,
    verbose: bool,

    // Module-level buffers, assembled by module_text.
    frame_types: String,
    declarations: String,
    functions: String,
    string_globals: String,
    pub(super) string_constants: HashMap<String, String>,
    pub(super) string_counter: usize,

    temp_counter: usize,
    block_counter: usize,

    // Per-function state, reset by emit_function.
    entry: String,
    body: String,
    terminated: bool,
    current_fun: Option<ExprId>,
    frame_var: String,
    /// Variable declaration -> slot pointer, for the current function.
    allocations: HashMap<ExprId, String>,
    /// Loop node -> exit block label, for the current function.
    loop_exits: HashMap<ExprId, String>,

    /// Function bodies waiting for emission. Nested declarations are
    /// queued here so the current function finishes first.
    pending: VecDeque<ExprId>,
    /// External names already declared or defined in the module.
    declared: HashSet<Symbol>,
    /// Escaping declaration -> frame field index. Kept across functions:
    /// inner functions index their ancestors' frames.
    frame_positions: HashMap<ExprId, usize>,
    /// Function -> its frame record type name.
    frame_type_names: HashMap<ExprId, String>,
}

impl<'a> IRGenerator<'a> {
    pub fn new(ast: &'a Ast, options: &CompileOptions) -> IRGenerator<'a> {
        IRGenerator {
            ast,
            verbose: options.verbose,
            frame_types: String::new(),
            declarations: String::new(),
            functions: String::new(),
            string_globals: String::new(),
            string_constants: HashMap::new(),
            string_counter: 0,
            temp_counter: 0,
            block_counter: 0,
            entry: String::new(),
            body: String::new(),
            terminated: false,
            current_fun: None,
            frame_var: String::new(),
            allocations: HashMap::new(),
            loop_exits: HashMap::new(),
            pending: VecDeque::new(),
            declared: HashSet::new(),
            frame_positions: HashMap::new(),
            frame_type_names: HashMap::new(),
        }
    }

    /// Generate the whole module from the synthetic `main` declaration.
    pub fn generate_program(&mut self, main: ExprId) -> Result<(), CodeGenError> {
        self.declare_function(main)?;
        while let Some(fun) = self.pending.pop_front() {
            self.emit_function(fun)?;
        }
        Ok(())
    }

    /// The assembled module: string globals, frame types, runtime
    /// declarations, then function definitions.
    pub fn module_text(&self) -> String {
        let mut ir = String::new();
        if self.verbose {
            ir.push_str("; vela module\n\n");
        }
        if !self.string_globals.is_empty() {
            ir.push_str(&self.string_globals);
            ir.push('\n');
        }
        if !self.frame_types.is_empty() {
            ir.push_str(&self.frame_types);
            ir.push('\n');
        }
        if !self.declarations.is_empty() {
            ir.push_str(&self.declarations);
            ir.push('\n');
        }
        ir.push_str(&self.functions);
        ir
    }

    /// Print the module to a stream.
    pub fn print_ir(&self, out: &mut dyn io::Write) -> io::Result<()> {
        out.write_all(self.module_text().as_bytes())
    }

    /// Register a function in the module. Functions with a body are
    /// queued for emission; primitives get a `declare` line for their
    /// runtime symbol. Idempotent, so call sites may declare on demand.
    pub(super) fn declare_function(&mut self, fun_id: ExprId) -> Result<(), CodeGenError> {
        let (external_name, has_body, params, result) = {
            let fun = self.ast.fun_decl(fun_id);
            (
                fun.external_name
                    .expect("functions are named by the binder"),
                fun.body.is_some(),
                fun.params.clone(),
                self.ast.ty(fun_id),
            )
        };
        if !self.declared.insert(external_name) {
            return Ok(());
        }
        if has_body {
            self.pending.push_back(fun_id);
            return Ok(());
        }
        let mut param_types = Vec::with_capacity(params.len());
        for &param in &params {
            param_types.push(value_type(self.ast.ty(param))?);
        }
        writeln!(
            self.declarations,
            "declare {} @{}({})",
            return_type(result)?,
            external_name,
            param_types.join(", ")
        )?;
        Ok(())
    }

    /// Emit one function body: frame, parameter stores, body expression,
    /// return; then verify the text.
    fn emit_function(&mut self, fun_id: ExprId) -> Result<(), CodeGenError> {
        let fun = self.ast.fun_decl(fun_id).clone();
        let external_name = fun
            .external_name
            .expect("functions are named by the binder");

        self.allocations.clear();
        self.loop_exits.clear();
        self.entry.clear();
        self.body.clear();
        self.current_fun = Some(fun_id);
        self.terminated = false;

        if self.verbose {
            writeln!(self.body, "  ; {} at depth {}", external_name, fun.depth)?;
        }

        self.synthesize_frame(fun_id, &fun)?;

        let has_static_link = !fun.external && fun.parent.is_some();
        let mut args = Vec::new();
        let static_link = if has_static_link {
            let reg = self.fresh_name("sl");
            args.push(format!("ptr {}", reg));
            Some(reg)
        } else {
            None
        };
        let mut param_regs = Vec::with_capacity(fun.params.len());
        for &param in &fun.params {
            let name = self.ast.var_decl(param).name.to_string();
            let reg = self.fresh_name(&name);
            let ty = value_type(self.ast.ty(param))?;
            args.push(format!("{} {}", ty, reg));
            param_regs.push((reg, ty));
        }

        if let Some(link) = &static_link {
            let frame_type = self.frame_type_names[&fun_id].clone();
            let field = self.fresh_temp();
            writeln!(
                self.body,
                "  {} = getelementptr {}, ptr {}, i32 0, i32 0",
                field, frame_type, self.frame_var
            )?;
            writeln!(self.body, "  store ptr {}, ptr {}", link, field)?;
        }

        for (&param, (reg, ty)) in fun.params.iter().zip(&param_regs) {
            let slot = self.variable_slot(param)?;
            writeln!(self.body, "  store {} {}, ptr {}", ty, reg, slot)?;
        }

        let body_expr = fun.body.expect("only functions with bodies are emitted");
        let result = self.visit_expr(body_expr)?;

        let ret = return_type(self.ast.ty(fun_id))?;
        if ret == "void" {
            writeln!(self.body, "  ret void")?;
        } else {
            let value = result.expect("a non-void body yields a value");
            writeln!(self.body, "  ret {} {}", value.ty, value.repr)?;
        }

        let linkage = if fun.external { "" } else { "internal " };
        let mut text = String::new();
        writeln!(
            text,
            "define {}{} @{}({}) {{",
            linkage,
            ret,
            external_name,
            args.join(", ")
        )?;
        writeln!(text, "entry:")?;
        text.push_str(&self.entry);
        writeln!(text, "  br label %body")?;
        writeln!(text, "body:")?;
        text.push_str(&self.body);
        writeln!(text, "}}")?;

        verify::verify_function(&text).map_err(CodeGenError::Logic)?;

        self.functions.push_str(&text);
        self.functions.push('\n');
        self.current_fun = None;
        Ok(())
    }

    pub(super) fn current_function(&self) -> ExprId {
        self.current_fun
            .expect("IR emission happens inside a function")
    }

    pub(super) fn fresh_temp(&mut self) -> String {
        let temp = format!("%t{}", self.temp_counter);
        self.temp_counter += 1;
        temp
    }

    /// A unique register carrying a readable name hint.
    pub(super) fn fresh_name(&mut self, base: &str) -> String {
        let name = format!("%{}{}", base, self.temp_counter);
        self.temp_counter += 1;
        name
    }

    pub(super) fn fresh_block(&mut self, base: &str) -> String {
        let label = format!("{}{}", base, self.block_counter);
        self.block_counter += 1;
        label
    }

    pub(super) fn start_block(&mut self, label: &str) -> Result<(), CodeGenError> {
        writeln!(self.body, "{}:", label)?;
        self.terminated = false;
        Ok(())
    }

    pub(super) fn branch(&mut self, label: &str) -> Result<(), CodeGenError> {
        writeln!(self.body, "  br label %{}", label)?;
        self.terminated = true;
        Ok(())
    }

    pub(super) fn cond_branch(
        &mut self,
        cond: &str,
        then_label: &str,
        else_label: &str,
    ) -> Result<(), CodeGenError> {
        writeln!(
            self.body,
            "  br i1 {}, label %{}, label %{}",
            cond, then_label, else_label
        )?;
        self.terminated = true;
        Ok(())
    }

    /// Whether the current block already ended in a terminator (after a
    /// `break` branch, emission continues in a dead continuation block).
    pub(super) fn block_terminated(&self) -> bool {
        self.terminated
    }

    pub(super) fn emit(&mut self, line: &str) -> Result<(), CodeGenError> {
        writeln!(self.body, "  {}", line)?;
        Ok(())
    }

    pub(super) fn alloca_in_entry(&mut self, name: &str, ty: &str) -> Result<String, CodeGenError> {
        let slot = self.fresh_name(name);
        writeln!(self.entry, "  {} = alloca {}", slot, ty)?;
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_lowering() {
        assert_eq!(value_type(Ty::Int).unwrap(), "i32");
        assert_eq!(value_type(Ty::String).unwrap(), "ptr");
        assert!(value_type(Ty::Void).is_err());
        assert!(value_type(Ty::Undefined).is_err());
    }

    #[test]
    fn test_return_type_lowering() {
        assert_eq!(return_type(Ty::Void).unwrap(), "void");
        assert_eq!(return_type(Ty::Int).unwrap(), "i32");
        assert!(return_type(Ty::Undefined).is_err());
    }

    #[test]
    fn test_fresh_counters_do_not_collide() {
        let ast = Ast::new();
        let options = CompileOptions::new();
        let mut irgen = IRGenerator::new(&ast, &options);
        let a = irgen.fresh_temp();
        let b = irgen.fresh_name("x");
        let c = irgen.fresh_temp();
        assert_ne!(a, c);
        assert_ne!(a, b);
        assert_eq!(a, "%t0");
        assert_eq!(b, "%x1");
    }
}
