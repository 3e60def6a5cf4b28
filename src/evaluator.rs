//! Evaluator module - interprets backend IR directly
//!
//! This is the executable counterpart of the interpreted (`.py`) variant:
//! it runs an `ir::Function` on concrete arguments without any toolchain.
//! Integer arithmetic follows the native forms, so `int` wraps at 32 bits.
use crate::ir::{BinaryOp, Expr, Function, ScalarType};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("arity error in '{0}': expected {1} arguments, got {2}")]
    ArityError(String, usize, usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid slot {0}")]
    InvalidSlot(usize),
}

impl Value {
    /// Convert a host-supplied number to the declared parameter type.
    pub fn from_f64(value: f64, ty: ScalarType) -> Value {
        match ty {
            ScalarType::Bool => Value::Boolean(value != 0.0),
            ScalarType::Int | ScalarType::Long => Value::Integer(narrow(value as i64, ty)),
            ScalarType::Float | ScalarType::Double => Value::Real(value),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Value::Integer(n) => n as f64,
            Value::Real(n) => n,
            Value::Boolean(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Value::Integer(n) => n,
            Value::Real(n) => n as i64,
            Value::Boolean(b) => b as i64,
        }
    }

    fn truthy(self) -> bool {
        match self {
            Value::Integer(n) => n != 0,
            Value::Real(n) => n != 0.0,
            Value::Boolean(b) => b,
        }
    }

    fn cast(self, ty: ScalarType) -> Value {
        match ty {
            ScalarType::Bool => Value::Boolean(self.truthy()),
            ScalarType::Int | ScalarType::Long => Value::Integer(narrow(self.as_i64(), ty)),
            ScalarType::Float | ScalarType::Double => Value::Real(self.as_f64()),
        }
    }
}

/// Wrap `n` to the width of `ty`: `int` is 32 bits in the generated C++ and CUDA.
fn narrow(n: i64, ty: ScalarType) -> i64 {
    match ty {
        ScalarType::Int => n as i32 as i64,
        _ => n,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(n) => write!(f, "{:?}", n),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

struct Frame {
    params: Vec<Value>,
    locals: Vec<Value>,
}

/// Evaluate `function` on `args`, returning a value of the declared result type.
pub fn eval_function(function: &Function, args: &[f64]) -> Result<Value, EvalError> {
    if args.len() != function.arity() {
        return Err(EvalError::ArityError(function.name.clone(), function.arity(), args.len()));
    }

    let mut frame = Frame {
        params: function
            .params
            .iter()
            .zip(args)
            .map(|(param, arg)| Value::from_f64(*arg, param.ty))
            .collect(),
        locals: Vec::with_capacity(function.locals.len()),
    };

    for local in &function.locals {
        let value = eval_expr(&local.value, &frame)?.cast(local.ty);
        frame.locals.push(value);
    }

    Ok(eval_expr(&function.body, &frame)?.cast(function.result))
}

fn eval_expr(expr: &Expr, frame: &Frame) -> Result<Value, EvalError> {
    match expr {
        Expr::Integer(n) => Ok(Value::Integer(*n)),
        Expr::Decimal(n) => Ok(Value::Real(*n)),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Param(index) => frame.params.get(*index).copied().ok_or(EvalError::InvalidSlot(*index)),
        Expr::Local(index) => frame.locals.get(*index).copied().ok_or(EvalError::InvalidSlot(*index)),
        Expr::Not(operand) => Ok(Value::Boolean(!eval_expr(operand, frame)?.truthy())),
        Expr::If {
            condition,
            then_branch,
            else_branch,
            ty,
        } => {
            let ty = *ty;
            let taken = if eval_expr(condition, frame)?.truthy() {
                then_branch
            } else {
                else_branch
            };
            Ok(eval_expr(taken, frame)?.cast(ty))
        }
        Expr::Binary { op, lhs, rhs, ty } => eval_binary(*op, lhs, rhs, *ty, frame),
    }
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, ty: ScalarType, frame: &Frame) -> Result<Value, EvalError> {
    // Short-circuit like the generated sources do.
    match op {
        BinaryOp::And => {
            return Ok(Value::Boolean(
                eval_expr(lhs, frame)?.truthy() && eval_expr(rhs, frame)?.truthy(),
            ))
        }
        BinaryOp::Or => {
            return Ok(Value::Boolean(
                eval_expr(lhs, frame)?.truthy() || eval_expr(rhs, frame)?.truthy(),
            ))
        }
        _ => {}
    }

    let left = eval_expr(lhs, frame)?;
    let right = eval_expr(rhs, frame)?;
    if op.is_arithmetic() {
        if ty.is_floating() {
            let (a, b) = (left.as_f64(), right.as_f64());
            return Ok(Value::Real(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            }));
        }

        let (a, b) = (left.as_i64(), right.as_i64());
        let n = match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            _ if b == 0 => return Err(EvalError::DivisionByZero),
            _ => a.wrapping_div(b),
        };
        return Ok(Value::Integer(narrow(n, ty)));
    }

    let (a, b) = (left.as_f64(), right.as_f64());
    Ok(Value::Boolean(match op {
        BinaryOp::Equal => a == b,
        BinaryOp::Less => a < b,
        BinaryOp::Greater => a > b,
        BinaryOp::LessEqual => a <= b,
        _ => a >= b,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstParser;
    use crate::lowering::{AstConverter, SexpLowering};

    fn parse_and_eval(source: &str, args: &[f64]) -> Result<Value, EvalError> {
        let node = AstParser::parse_expression(source.as_bytes(), &mut 0).unwrap();
        let function = SexpLowering.convert(&node).unwrap();
        eval_function(&function, args)
    }

    #[test]
    fn test_arithmetic_operations() {
        let axpy = "(defn axpy [a x y] (+ (* a x) y))";
        assert_eq!(parse_and_eval(axpy, &[2.0, 3.0, 1.5]), Ok(Value::Real(7.5)));
    }

    #[test]
    fn test_integer_division_truncates() {
        let half = "(defn half:int [n:int] (/ n 2))";
        assert_eq!(parse_and_eval(half, &[7.0]), Ok(Value::Integer(3)));
        assert_eq!(parse_and_eval(half, &[-7.0]), Ok(Value::Integer(-3)));
    }

    #[test]
    fn test_int_arithmetic_wraps_at_32_bits() {
        let double_it = "(defn f:int [n:int] (* n 2))";
        assert_eq!(parse_and_eval(double_it, &[2147483647.0]), Ok(Value::Integer(-2)));

        let bump = "(defn f:long [n:long] (+ n 1))";
        assert_eq!(parse_and_eval(bump, &[2147483647.0]), Ok(Value::Integer(2147483648)));

        // Arguments are narrowed on entry like a C `int` parameter.
        assert_eq!(parse_and_eval("(defn f:long [n:int] n)", &[4294967297.0]), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_result_is_cast_to_declared_type() {
        assert_eq!(parse_and_eval("(defn f:int [x] (* x 2))", &[1.75]), Ok(Value::Integer(3)));
        assert_eq!(parse_and_eval("(defn f [n:int] n)", &[4.0]), Ok(Value::Real(4.0)));
    }

    #[test]
    fn test_comparison_and_logic() {
        let clamp = "(defn inside:bool [x lo hi] (and (>= x lo) (not (> x hi))))";
        assert_eq!(parse_and_eval(clamp, &[0.5, 0.0, 1.0]), Ok(Value::Boolean(true)));
        assert_eq!(parse_and_eval(clamp, &[1.5, 0.0, 1.0]), Ok(Value::Boolean(false)));
        assert_eq!(
            parse_and_eval("(defn f:bool [a:bool b:bool] (or a b))", &[0.0, 1.0]),
            Ok(Value::Boolean(true))
        );
    }

    #[test]
    fn test_if_conditional() {
        let relu = "(defn relu [x] (if (< x 0) 0 x))";
        assert_eq!(parse_and_eval(relu, &[-3.0]), Ok(Value::Real(0.0)));
        assert_eq!(parse_and_eval(relu, &[2.5]), Ok(Value::Real(2.5)));
    }

    #[test]
    fn test_let_binding() {
        let poly = "(defn poly [x] (let [sq (* x x) cube (* sq x)] (+ cube sq)))";
        assert_eq!(parse_and_eval(poly, &[2.0]), Ok(Value::Real(12.0)));
    }

    #[test]
    fn test_error_cases() {
        assert_eq!(
            parse_and_eval("(defn f [a b] a)", &[1.0]),
            Err(EvalError::ArityError("f".to_string(), 2, 1))
        );
        assert_eq!(
            parse_and_eval("(defn f:int [n:int] (/ 1 n))", &[0.0]),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Real(2.0).to_string(), "2.0");
        assert_eq!(Value::Integer(-4).to_string(), "-4");
        assert_eq!(Value::Boolean(true).to_string(), "true");
    }
}
