//! Vela compiler core.
//!
//! Semantic analysis and IR generation for Vela, a small statically-typed
//! expression language with nested functions. The surface parser is an
//! external collaborator: it hands over an [`ast::Ast`] (directly or
//! through the serde interchange format) and this crate runs the four
//! passes over it, in place:
//!
//! ```text
//! AST -> binder -> escaper -> type checker -> IR generator -> LLVM IR text
//! ```
//!
//! The binder resolves names, computes depths and escape flags, and wraps
//! the program in a synthetic `int`-returning `main`. The escaper collects
//! each function's escaping declarations in lexical order. The type
//! checker assigns int/string/void everywhere. The generator lowers the
//! annotated tree to textual LLVM IR with per-function frame records and
//! static-link chains, ready to link against the Vela runtime library.
//!
//! ```rust,ignore
//! use velac::{ast::Ast, CompileOptions};
//!
//! let mut ast = Ast::new();
//! let root = /* parser output */;
//! let ir = velac::compile_ast(&mut ast, root, &CompileOptions::new())?;
//! ```

pub mod ast;
pub mod binder;
pub mod config;
mod decl_groups;
pub mod error;
pub mod escaper;
pub mod eval;
pub mod irgen;
pub mod symbol;
pub mod typechecker;
pub mod types;

pub use ast::{Ast, ExprId};
pub use config::CompileOptions;
pub use error::{Diagnostic, Diagnostics, ErrorKind};
pub use irgen::{CodeGenError, IRGenerator};
pub use symbol::Symbol;
pub use types::Ty;

use std::fmt;

/// Everything `compile_ast` can fail with: user errors from the analysis
/// passes, or a generator invariant violation.
#[derive(Debug)]
pub enum CompileError {
    Analysis(Diagnostics),
    CodeGen(CodeGenError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Analysis(diags) => write!(f, "{}", diags),
            CompileError::CodeGen(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<Diagnostics> for CompileError {
    fn from(diags: Diagnostics) -> CompileError {
        CompileError::Analysis(diags)
    }
}

impl From<CodeGenError> for CompileError {
    fn from(e: CodeGenError) -> CompileError {
        CompileError::CodeGen(e)
    }
}

/// Run the analysis passes over a program root. On success the tree is
/// fully annotated and the returned id is the synthetic `main`
/// declaration wrapping the program.
pub fn analyze(ast: &mut Ast, root: ExprId) -> Result<ExprId, Diagnostics> {
    let main = binder::bind_program(ast, root)?;
    escaper::collect_escapes(ast, main);
    typechecker::check_program(ast, main)?;
    Ok(main)
}

/// Lower an analyzed program to LLVM IR text.
pub fn generate_ir(
    ast: &Ast,
    main: ExprId,
    options: &CompileOptions,
) -> Result<String, CodeGenError> {
    let mut irgen = IRGenerator::new(ast, options);
    irgen.generate_program(main)?;
    Ok(irgen.module_text())
}

/// Analyze and lower in one step.
pub fn compile_ast(
    ast: &mut Ast,
    root: ExprId,
    options: &CompileOptions,
) -> Result<String, CompileError> {
    let main = analyze(ast, root)?;
    Ok(generate_ir(ast, main, options)?)
}
