//! Tree-walking evaluation over named `f64` columns.

use std::borrow::Cow;

use super::{BinaryOp, Expr, Function};
use crate::normalize::{clip, maximum, minimum};
use crate::{Error, Result};

/// Named columns an expression can read, all of one row count.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    rows: usize,
    columns: Vec<(String, Vec<f64>)>,
}

/// Intermediate result: scalars stay scalar until combined with a column.
#[derive(Debug)]
enum Value<'s> {
    Scalar(f64),
    Column(Cow<'s, [f64]>),
}

impl Value<'_> {
    fn at(&self, row: usize) -> f64 {
        match self {
            Self::Scalar(x) => *x,
            Self::Column(values) => values[row],
        }
    }

    const fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

impl Scope {
    /// Create an empty scope for `rows` rows.
    #[must_use]
    pub const fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    /// Row count every column must have
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Bind `name` to `values`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = values,
            None => self.columns.push((name, values)),
        }
    }

    /// Look up a bound column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Bound names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub(super) fn evaluate(&self, source: &str, tree: &Expr) -> Result<Vec<f64>> {
        for name in tree.names() {
            match self.get(name) {
                Some(values) if values.len() == self.rows => {}
                Some(values) => {
                    return Err(Error::invalid_expression(
                        source,
                        format!(
                            "column '{name}' has {} rows, expected {}",
                            values.len(),
                            self.rows
                        ),
                    ));
                }
                None => {
                    return Err(Error::invalid_expression(
                        source,
                        format!("unknown name '{name}'"),
                    ));
                }
            }
        }

        Ok(match self.eval(tree) {
            Value::Scalar(x) => vec![x; self.rows],
            Value::Column(values) => values.into_owned(),
        })
    }

    /// Names were checked by `evaluate`, so lookups cannot miss here.
    fn eval<'s>(&'s self, expr: &Expr) -> Value<'s> {
        match expr {
            Expr::Number(n) => Value::Scalar(*n),
            Expr::Name(name) => self
                .get(name)
                .map_or(Value::Scalar(f64::NAN), |values| Value::Column(Cow::Borrowed(values))),
            Expr::Neg(inner) => self.map(self.eval(inner), |x| -x),
            Expr::Binary { op, left, right } => {
                let (a, b) = (self.eval(left), self.eval(right));
                self.zip(&[a, b], |v| op.apply(v[0], v[1]))
            }
            Expr::Call { func, args } => {
                let args: Vec<Value<'s>> = args.iter().map(|arg| self.eval(arg)).collect();
                match func {
                    Function::Min => self.zip(&args, |v| minimum(v[0], v[1])),
                    Function::Max => self.zip(&args, |v| maximum(v[0], v[1])),
                    Function::Clip => self.zip(&args, |v| clip(v[0], v[1], v[2])),
                    Function::Abs => self.zip(&args, |v| v[0].abs()),
                    Function::Sqrt => self.zip(&args, |v| v[0].sqrt()),
                    Function::Log1p => self.zip(&args, |v| v[0].ln_1p()),
                    Function::Exp => self.zip(&args, |v| v[0].exp()),
                }
            }
        }
    }

    fn map<'s>(&self, value: Value<'s>, f: impl Fn(f64) -> f64) -> Value<'s> {
        match value {
            Value::Scalar(x) => Value::Scalar(f(x)),
            Value::Column(values) => Value::Column(Cow::Owned(values.iter().map(|&x| f(x)).collect())),
        }
    }

    /// Apply `f` row by row, broadcasting scalar arguments.
    fn zip<'s>(&self, args: &[Value<'_>], f: impl Fn(&[f64]) -> f64) -> Value<'s> {
        let mut row = vec![0.0; args.len()];
        if args.iter().all(Value::is_scalar) {
            for (slot, arg) in row.iter_mut().zip(args) {
                *slot = arg.at(0);
            }
            return Value::Scalar(f(&row));
        }

        let out = (0..self.rows)
            .map(|i| {
                for (slot, arg) in row.iter_mut().zip(args) {
                    *slot = arg.at(i);
                }
                f(&row)
            })
            .collect();
        Value::Column(Cow::Owned(out))
    }
}
