//! Abstract syntax tree for Vela.
//!
//! The tree is produced by an external parser and handed to this core as
//! the interchange format defined here (serde). Nodes live in a single
//! arena (`Ast`) and refer to each other through `ExprId` indices, so the
//! back-pointers created by binding — declaration references, function
//! parents, break targets — never form owning cycles.
//!
//! Every node carries annotation slots next to its syntactic fields.
//! Annotations start empty (`#[serde(skip)]` in the interchange format)
//! and are filled in place by the passes: the binder writes references,
//! depths, escape flags and external names; the escaper writes the
//! per-function escaping lists; the type checker writes `ty`. Later passes
//! read earlier passes' slots and never rewrite them.

use crate::symbol::Symbol;
use crate::types::Ty;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source position for diagnostics, 1-based. Synthesized nodes (the
/// top-level `main` wrapper, primitive declarations) carry `Loc::none()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub fn new(line: u32, column: u32) -> Loc {
        Loc { line, column }
    }

    /// Location of a synthesized node.
    pub fn none() -> Loc {
        Loc { line: 0, column: 0 }
    }

    pub fn is_none(self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "<builtin>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprId(pub(crate) u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Operators that require int operands (arithmetic and logical).
    pub fn takes_ints(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::And | BinOp::Or
        )
    }

    /// Comparison operators, including equality.
    pub fn is_comparison(self) -> bool {
        !self.takes_ints()
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "=",
            BinOp::Neq => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&",
            BinOp::Or => "|",
        };
        f.write_str(s)
    }
}

/// A node: location, syntactic kind, and the inferred type slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub loc: Loc,
    pub kind: ExprKind,
    /// Written by the type checker. `Undefined` until then. For `Var`
    /// nodes this is the variable's type; for `Fun` nodes the return type.
    #[serde(skip)]
    pub ty: Ty,
}

/// An identifier use. `decl` and `depth` are written by the binder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub name: Symbol,
    #[serde(skip)]
    pub decl: Option<ExprId>,
    #[serde(skip)]
    pub depth: i32,
}

/// A function call. `decl` and `depth` are written by the binder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub func: Symbol,
    pub args: Vec<ExprId>,
    #[serde(skip)]
    pub decl: Option<ExprId>,
    #[serde(skip)]
    pub depth: i32,
}

/// A variable declaration, also used for function parameters and the
/// induction variable of a `for` loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Symbol,
    /// Declared type name, if any (`int` or `string`).
    pub type_name: Option<Symbol>,
    /// Initializer; the low bound for a `for` induction variable.
    pub init: Option<ExprId>,
    #[serde(skip)]
    pub depth: i32,
    /// Set by the binder when the variable is read or written from a
    /// deeper function.
    #[serde(skip)]
    pub escapes: bool,
    /// Set by the binder for `for` induction variables.
    #[serde(skip)]
    pub read_only: bool,
}

/// A function declaration. Primitives and the synthetic `main` wrapper are
/// `external`; primitives have no body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunDecl {
    pub name: Symbol,
    /// Parameter `Var` nodes.
    pub params: Vec<ExprId>,
    /// Declared return type name; `None` means void.
    pub result_name: Option<Symbol>,
    pub body: Option<ExprId>,
    pub external: bool,
    /// Innermost enclosing function, written by the binder. `None` only
    /// for the synthetic `main` and for primitives.
    #[serde(skip)]
    pub parent: Option<ExprId>,
    /// Globally unique linker-visible name, written by the binder.
    #[serde(skip)]
    pub external_name: Option<Symbol>,
    /// This function's own index on the binder's function stack
    /// (`main` = 0, its children 1, ...).
    #[serde(skip)]
    pub depth: i32,
    /// Escaping locals and parameters in lexical order, written by the
    /// escaper. Frame-slot indices are derived from this order.
    #[serde(skip)]
    pub escaping: Vec<ExprId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// 32-bit signed integer literal.
    Int(i32),
    /// String literal, interned.
    Str(Symbol),
    Binary {
        op: BinOp,
        left: ExprId,
        right: ExprId,
    },
    /// Ordered sequence; empty sequences are allowed and type as void.
    Seq(Vec<ExprId>),
    /// `if`/`then`/`else`. A syntactic `if-then` carries an empty
    /// sequence as its else branch.
    If {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },
    While {
        cond: ExprId,
        body: ExprId,
    },
    /// `for <var> := <low> to <high> do <body>`; the low bound is the
    /// induction variable's initializer.
    For {
        var: ExprId,
        high: ExprId,
        body: ExprId,
    },
    Break {
        /// Target loop, written by the binder.
        #[serde(skip)]
        target: Option<ExprId>,
    },
    Ident(Ident),
    Call(Call),
    /// `<ident> := <expr>`; the left-hand side is an `Ident` node.
    Assign {
        lhs: ExprId,
        rhs: ExprId,
    },
    Let {
        decls: Vec<ExprId>,
        /// Body sequence.
        body: ExprId,
    },
    Var(VarDecl),
    Fun(FunDecl),
}

/// The arena. Owns every node for the duration of the pipeline; passes
/// annotate nodes in place and never move or drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    exprs: Vec<Expr>,
    /// Program root, set by the producer of the interchange format.
    #[serde(default)]
    pub root: Option<ExprId>,
}

impl Ast {
    pub fn new() -> Ast {
        Ast::default()
    }

    /// Append a node and return its id.
    pub fn add(&mut self, loc: Loc, kind: ExprKind) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            loc,
            kind,
            ty: Ty::Undefined,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.expr(id).kind
    }

    pub fn loc(&self, id: ExprId) -> Loc {
        self.expr(id).loc
    }

    pub fn ty(&self, id: ExprId) -> Ty {
        self.expr(id).ty
    }

    pub fn set_ty(&mut self, id: ExprId, ty: Ty) {
        self.expr_mut(id).ty = ty;
    }

    /// The node as a variable declaration. Dispatch on node kinds is
    /// exhaustive; calling this on another kind is a programming error.
    pub fn var_decl(&self, id: ExprId) -> &VarDecl {
        match &self.expr(id).kind {
            ExprKind::Var(v) => v,
            other => panic!("expected a variable declaration, found {:?}", other),
        }
    }

    pub fn var_decl_mut(&mut self, id: ExprId) -> &mut VarDecl {
        match &mut self.expr_mut(id).kind {
            ExprKind::Var(v) => v,
            other => panic!("expected a variable declaration, found {:?}", other),
        }
    }

    /// The node as a function declaration; panics on any other kind.
    pub fn fun_decl(&self, id: ExprId) -> &FunDecl {
        match &self.expr(id).kind {
            ExprKind::Fun(f) => f,
            other => panic!("expected a function declaration, found {:?}", other),
        }
    }

    pub fn fun_decl_mut(&mut self, id: ExprId) -> &mut FunDecl {
        match &mut self.expr_mut(id).kind {
            ExprKind::Fun(f) => f,
            other => panic!("expected a function declaration, found {:?}", other),
        }
    }

    /// The node as an identifier; panics on any other kind.
    pub fn ident(&self, id: ExprId) -> &Ident {
        match &self.expr(id).kind {
            ExprKind::Ident(i) => i,
            other => panic!("expected an identifier, found {:?}", other),
        }
    }

    /// Name of a declaration node (`Var` or `Fun`).
    pub fn decl_name(&self, id: ExprId) -> Symbol {
        match &self.expr(id).kind {
            ExprKind::Var(v) => v.name,
            ExprKind::Fun(f) => f.name,
            other => panic!("expected a declaration, found {:?}", other),
        }
    }
}
