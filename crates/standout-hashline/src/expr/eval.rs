//! Tree-walking evaluation of parsed expressions.

use std::cmp::Ordering;

use serde_json::Value;

use super::parse::{BinOp, Expr, LogicalOp, UnaryOp};
use super::value::{compare, concat_text, loose_eq, number, to_number, truthy, type_name};
use super::Scope;
use crate::error::EvalError;

/// Evaluates an [`Expr`] AST node against a scope.
pub fn eval_expr(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Var(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable { name: name.clone() }),

        Expr::Array(items) => items
            .iter()
            .map(|item| eval_expr(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),

        Expr::Member(target, name) => {
            let target = eval_expr(target, scope)?;
            member(&target, name)
        }

        Expr::Index(target, index) => {
            let target = eval_expr(target, scope)?;
            let index = eval_expr(index, scope)?;
            match (&target, &index) {
                (Value::String(_), Value::String(key)) | (Value::Array(_), Value::String(key)) => {
                    member(&target, key)
                }
                (Value::Object(map), key) => {
                    Ok(map.get(&concat_text(key)).cloned().unwrap_or(Value::Null))
                }
                (Value::Array(items), idx) => Ok(position(idx)
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or(Value::Null)),
                (Value::String(s), idx) => Ok(position(idx)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Value::Null, |c| Value::String(c.to_string()))),
                (Value::Null, _) => Err(EvalError::type_error(format!(
                    "cannot index null with {}",
                    concat_text(&index)
                ))),
                _ => Ok(Value::Null),
            }
        }

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!truthy(&v)),
                UnaryOp::Neg => number(-to_number(&v)?),
                UnaryOp::Plus => number(to_number(&v)?),
            })
        }

        Expr::Logical(op, lhs, rhs) => {
            let l = eval_expr(lhs, scope)?;
            match (op, truthy(&l)) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(l),
                _ => eval_expr(rhs, scope),
            }
        }

        Expr::Ternary(cond, then, else_) => {
            if truthy(&eval_expr(cond, scope)?) {
                eval_expr(then, scope)
            } else {
                eval_expr(else_, scope)
            }
        }

        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, scope)?;
            let r = eval_expr(rhs, scope)?;
            binary(*op, &l, &r)
        }
    }
}

fn binary(op: BinOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let ordered = |test: fn(Ordering) -> bool| -> Result<Value, EvalError> {
        Ok(Value::Bool(compare(l, r)?.map_or(false, test)))
    };

    match op {
        BinOp::Add if concatenates(l) || concatenates(r) => {
            Ok(Value::String(concat_text(l) + &concat_text(r)))
        }
        BinOp::Add => Ok(number(to_number(l)? + to_number(r)?)),
        BinOp::Sub => Ok(number(to_number(l)? - to_number(r)?)),
        BinOp::Mul => Ok(number(to_number(l)? * to_number(r)?)),
        BinOp::Div | BinOp::Rem => {
            let divisor = to_number(r)?;
            if divisor == 0.0 {
                return Err(EvalError::type_error("division by zero"));
            }
            let dividend = to_number(l)?;
            Ok(number(if op == BinOp::Div {
                dividend / divisor
            } else {
                dividend % divisor
            }))
        }
        BinOp::Eq => Ok(Value::Bool(loose_eq(l, r))),
        BinOp::Ne => Ok(Value::Bool(!loose_eq(l, r))),
        BinOp::Lt => ordered(Ordering::is_lt),
        BinOp::Le => ordered(Ordering::is_le),
        BinOp::Gt => ordered(Ordering::is_gt),
        BinOp::Ge => ordered(Ordering::is_ge),
    }
}

fn concatenates(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn member(target: &Value, name: &str) -> Result<Value, EvalError> {
    match (target, name) {
        (Value::Array(items), "length") => Ok(Value::from(items.len())),
        (Value::String(s), "length") => Ok(Value::from(s.chars().count())),
        (Value::Object(map), _) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        (Value::Null, _) => Err(EvalError::type_error(format!(
            "cannot read property `{}` of null",
            name
        ))),
        (_, _) => {
            log::trace!("property `{}` of {} is null", name, type_name(target));
            Ok(Value::Null)
        }
    }
}

fn position(index: &Value) -> Option<usize> {
    let n = index.as_f64()?;
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}
