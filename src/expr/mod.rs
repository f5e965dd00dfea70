//! Restricted metric expressions
//!
//! Metric formulas come from user-authored assumptions documents, so they are
//! never handed to a general-purpose evaluator. Instead each formula goes
//! through three stages:
//!
//! 1. [`check_safe`]: reject forbidden substrings outright (`__`, `import`,
//!    `;`, ...)
//! 2. [`parse`]: tokenize with the `sqlparser` tokenizer and build an
//!    [`Expr`] tree with a recursive-descent parser for a small grammar
//! 3. [`CompiledExpr::evaluate`]: walk the tree against a [`Scope`] of named
//!    columns
//!
//! ## Grammar
//!
//! ```text
//! expr       := comparison
//! comparison := additive (("<" | "<=" | ">" | ">=" | "==" | "=" | "!=") additive)?
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := ("-" | "+") unary | power
//! power      := primary ("**" unary)?
//! primary    := NUMBER | NAME | FUNC "(" args ")" | "(" expr ")"
//! ```
//!
//! Functions: `min(a, b)`, `max(a, b)`, `clip(x, lo, hi)`, `abs(x)`,
//! `sqrt(x)`, `log1p(x)`, `exp(x)`.
//!
//! ## Example
//!
//! ```rust
//! use ecoproxy::expr::{CompiledExpr, Scope};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let expr = CompiledExpr::compile("clip(1 - (0.6*energy + 0.4*y_pred_n), 0, 1)", &["energy", "y_pred_n"])?;
//!
//! let mut scope = Scope::new(2);
//! scope.insert("energy", vec![0.0, 1.0]);
//! scope.insert("y_pred_n", vec![0.0, 1.0]);
//!
//! assert_eq!(expr.evaluate(&scope)?, vec![1.0, 0.0]);
//! # Ok(())
//! # }
//! ```

mod eval;
mod guard;
mod parser;

use std::fmt;

pub use eval::Scope;
pub use guard::{check_safe, FORBIDDEN_PATTERNS};
pub use parser::parse;

use crate::{Error, Result};

/// Binary operators, arithmetic and comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `**`
    Pow,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==` or `=`
    Eq,
    /// `!=`
    Ne,
}

impl BinaryOp {
    /// Apply the operator to two scalars; comparisons yield 1.0 or 0.0.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        let truth = |cond: bool| if cond { 1.0 } else { 0.0 };
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
            Self::Lt => truth(a < b),
            Self::Le => truth(a <= b),
            Self::Gt => truth(a > b),
            Self::Ge => truth(a >= b),
            Self::Eq => truth(a == b),
            Self::Ne => truth(a != b),
        }
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// The fixed function library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Element-wise minimum of two arguments
    Min,
    /// Element-wise maximum of two arguments
    Max,
    /// `clip(x, lo, hi)`
    Clip,
    /// Absolute value
    Abs,
    /// Square root (NaN for negative input)
    Sqrt,
    /// `ln(1 + x)`
    Log1p,
    /// `e^x`
    Exp,
}

impl Function {
    /// Every callable function
    pub const ALL: [Self; 7] = [
        Self::Min,
        Self::Max,
        Self::Clip,
        Self::Abs,
        Self::Sqrt,
        Self::Log1p,
        Self::Exp,
    ];

    /// Look up a function by its expression name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Name as written in expressions
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Clip => "clip",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Log1p => "log1p",
            Self::Exp => "exp",
        }
    }

    /// Number of arguments the function takes
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Min | Self::Max => 2,
            Self::Clip => 3,
            Self::Abs | Self::Sqrt | Self::Log1p | Self::Exp => 1,
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Reference to a scope column
    Name(String),
    /// Unary minus
    Neg(Box<Expr>),
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Call into the function library (arity already checked)
    Call {
        /// Function
        func: Function,
        /// Arguments
        args: Vec<Expr>,
    },
}

impl Expr {
    pub(crate) fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Names referenced anywhere in the tree, in first-seen order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Name(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Neg(inner) => inner.collect_names(out),
            Self::Binary { left, right, .. } => {
                left.collect_names(out);
                right.collect_names(out);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_names(out);
                }
            }
        }
    }
}

/// Fully parenthesized rendering, handy for checking precedence.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
            Self::Neg(inner) => write!(f, "(-{inner})"),
            Self::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Self::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A checked expression ready to run against a [`Scope`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    tree: Expr,
}

impl CompiledExpr {
    /// Safety-check, parse and name-check `source`.
    ///
    /// `names` lists every column the expression may reference.
    ///
    /// # Errors
    /// - [`Error::UnsafeExpression`] if a forbidden pattern appears
    /// - [`Error::InvalidExpression`] on syntax errors, unknown functions,
    ///   wrong arity or names missing from `names`
    pub fn compile<S: AsRef<str>>(source: &str, names: &[S]) -> Result<Self> {
        check_safe(source)?;
        let tree = parse(source)?;

        if let Some(unknown) = tree
            .names()
            .into_iter()
            .find(|name| !names.iter().any(|n| n.as_ref() == *name))
        {
            return Err(Error::invalid_expression(
                source,
                format!("unknown name '{unknown}'"),
            ));
        }

        Ok(Self {
            source: source.to_string(),
            tree,
        })
    }

    /// Original expression text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed tree
    #[must_use]
    pub const fn tree(&self) -> &Expr {
        &self.tree
    }

    /// Evaluate against `scope`, broadcasting scalars to the scope's row count.
    ///
    /// # Errors
    /// Returns [`Error::InvalidExpression`] if the scope lacks a referenced
    /// name or holds a column of the wrong length.
    pub fn evaluate(&self, scope: &Scope) -> Result<Vec<f64>> {
        scope.evaluate(&self.source, &self.tree)
    }
}
