use std::fmt;

use crate::compiler::tokens::Literal;

/// A single stack or memory cell. Integers and floats share one cell size;
/// mixing them in arithmetic promotes the integer operand.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Int(v) => Value::Int(v),
            Literal::Float(v) => Value::Float(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
        }
    }
}

/// Binary operations the machine knows how to apply to two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    Neq,
}

/// The only way applying an operator can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DivideByZero;

impl Value {
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
        }
    }

    fn from_bool(b: bool) -> Value {
        Value::Int(if b { 1 } else { 0 })
    }
}

/// Applies `lhs op rhs`. Integer arithmetic wraps on overflow and integer
/// division truncates towards zero. Comparisons yield `1` or `0`.
pub(crate) fn apply_arithmetic(lhs: Value, op: ArithmeticOp, rhs: Value) -> Result<Value, DivideByZero> {
    use ArithmeticOp as AO;

    if op == AO::Div && rhs.is_zero() {
        return Err(DivideByZero);
    }

    let result = match (lhs, rhs) {
        (Value::Int(l), Value::Int(r)) => match op {
            AO::Add => Value::Int(l.wrapping_add(r)),
            AO::Sub => Value::Int(l.wrapping_sub(r)),
            AO::Mul => Value::Int(l.wrapping_mul(r)),
            AO::Div => Value::Int(l.wrapping_div(r)),
            AO::Lt => Value::from_bool(l < r),
            AO::Gt => Value::from_bool(l > r),
            AO::Eq => Value::from_bool(l == r),
            AO::Neq => Value::from_bool(l != r),
        },
        _ => {
            let l = lhs.as_float();
            let r = rhs.as_float();
            match op {
                AO::Add => Value::Float(l + r),
                AO::Sub => Value::Float(l - r),
                AO::Mul => Value::Float(l * r),
                AO::Div => Value::Float(l / r),
                AO::Lt => Value::from_bool(l < r),
                AO::Gt => Value::from_bool(l > r),
                AO::Eq => Value::from_bool(l == r),
                AO::Neq => Value::from_bool(l != r),
            }
        }
    };
    Ok(result)
}
