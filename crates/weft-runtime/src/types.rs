//! Runtime values and identifier newtypes

use crate::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use weft_ast::{BinaryOp, UnaryOp};

/// Index of a component type in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Index of a component instance in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

/// Index of an action within its component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u32);

/// Index of a reaction within its component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionId(pub u32);

/// Index of a getter within its component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GetterId(pub u32);

/// Index of a push or pull port within its component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub u32);

/// Index of a state field within an instance's heap block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSlot(pub u32);

/// A runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "Unit",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::TypeMismatch {
                expected: "Bool",
                found: other.type_name(),
            }),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(RuntimeError::TypeMismatch {
                expected: "Int",
                found: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

/// Apply a binary operator to two values
///
/// Arithmetic stays within one numeric type; the lowering collaborator has
/// already inserted any conversions, so mixed operands are a type error here.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    use BinaryOp::*;
    match op {
        Add | Sub | Mul | Div | Mod => match (left, right) {
            (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
            (Value::Float(a), Value::Float(b)) => Ok(float_arith(op, *a, *b)),
            (Value::Int(_), other) => Err(mismatch("Int", other)),
            (Value::Float(_), other) => Err(mismatch("Float", other)),
            (other, _) => Err(mismatch("Int or Float", other)),
        },
        Eq => Ok(Value::Bool(left == right)),
        Ne => Ok(Value::Bool(left != right)),
        Lt | Le | Gt | Ge => compare(op, left, right),
        And | Or => {
            let a = left.as_bool()?;
            let b = right.as_bool()?;
            Ok(Value::Bool(if op == And { a && b } else { a || b }))
        }
    }
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    use BinaryOp::*;
    let v = match op {
        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Mul => a.wrapping_mul(b),
        Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        Mod => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        _ => unreachable!("non-arithmetic operator"),
    };
    Ok(Value::Int(v))
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Value {
    use BinaryOp::*;
    Value::Float(match op {
        Add => a + b,
        Sub => a - b,
        Mul => a * b,
        Div => a / b,
        Mod => a % b,
        _ => unreachable!("non-arithmetic operator"),
    })
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    use BinaryOp::*;
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (Value::Int(_), other) => return Err(mismatch("Int", other)),
        (Value::Float(_), other) => return Err(mismatch("Float", other)),
        (Value::Str(_), other) => return Err(mismatch("Str", other)),
        (other, _) => return Err(mismatch("comparable value", other)),
    };
    let Some(ordering) = ordering else {
        // NaN comparisons are false for every ordering operator
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        Lt => ordering.is_lt(),
        Le => ordering.is_le(),
        Gt => ordering.is_gt(),
        Ge => ordering.is_ge(),
        _ => unreachable!("non-comparison operator"),
    }))
}

/// Apply a unary operator to a value
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Neg, other) => Err(mismatch("Int or Float", other)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(mismatch("Bool", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_division_by_zero_is_an_error() {
        let err = binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero));
        let err = binary(BinaryOp::Mod, &Value::Int(1), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero));
    }

    #[test]
    fn mixed_arithmetic_is_a_type_error() {
        let err = binary(BinaryOp::Add, &Value::Int(1), &Value::Float(2.0)).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeMismatch { .. }));
    }

    #[test]
    fn comparisons_yield_bools() {
        assert_eq!(
            binary(BinaryOp::Lt, &Value::Int(1), &Value::Int(2)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::Eq, &Value::Str("a".into()), &Value::Str("b".into())).unwrap(),
            Value::Bool(false)
        );
    }
}
