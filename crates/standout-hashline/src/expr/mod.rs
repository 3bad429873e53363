//! Expression evaluation.
//!
//! The template compiler never interprets the text inside `#{...}` or after
//! `#if`, `#for ... in` and `#block`. It hands that text to an [`Evaluator`]
//! at render time, together with a [`Scope`] resolving variable names.
//!
//! [`ExprEvaluator`] is the built-in implementation, a small JavaScript-like
//! expression language:
//!
//! - literals: numbers, `'single'`/`"double"` quoted strings, `true`,
//!   `false`, `null`, arrays `[1, 2, 3]`
//! - variables, member access `a.b`, indexing `a[0]`, `.length`
//! - arithmetic `+ - * / %` (`+` concatenates when a string is involved)
//! - comparison `< <= > >=`, equality `== != === !==`
//! - logic `&& || !` and the conditional operator `c ? a : b`
//!
//! Any function with the right shape is an evaluator too:
//!
//! ```rust
//! use serde_json::{json, Value};
//! use standout_hashline::{template, EvalError, Scope};
//!
//! fn upper(expr: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
//!     let value = scope
//!         .get(expr.trim())
//!         .ok_or_else(|| EvalError::UndefinedVariable { name: expr.trim().into() })?;
//!     Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
//! }
//!
//! let tpl = template("Hello #{name}!").unwrap();
//! assert_eq!(tpl.render_with(&json!({"name": "ana"}), &upper).unwrap(), "Hello ANA!");
//! ```

mod eval;
mod parse;
mod value;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::error::EvalError;

pub use value::{to_text, truthy};

static NULL: Value = Value::Null;

/// Evaluates expression text to a value.
pub trait Evaluator {
    fn evaluate(&self, expr: &str, scope: &Scope<'_>) -> Result<Value, EvalError>;
}

impl<F> Evaluator for F
where
    F: Fn(&str, &Scope<'_>) -> Result<Value, EvalError>,
{
    fn evaluate(&self, expr: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        self(expr, scope)
    }
}

/// Variable lookup for one evaluation.
///
/// Names resolve, in order, to: a template-local variable that has been
/// assigned (e.g. a `#for` loop variable), a caller binding, or a declared
/// but not yet assigned template-local (which reads as `null`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    bindings: Option<&'a Map<String, Value>>,
    locals: Option<&'a HashMap<String, Option<Value>>>,
}

impl<'a> Scope<'a> {
    /// A scope over caller bindings only.
    pub fn new(bindings: Option<&'a Map<String, Value>>) -> Self {
        Self {
            bindings,
            locals: None,
        }
    }

    pub(crate) fn with_locals(
        bindings: Option<&'a Map<String, Value>>,
        locals: &'a HashMap<String, Option<Value>>,
    ) -> Self {
        Self {
            bindings,
            locals: Some(locals),
        }
    }

    /// Resolves a variable name.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let local = self.locals.and_then(|locals| locals.get(name));
        if let Some(Some(value)) = local {
            return Some(value);
        }
        if let Some(value) = self.bindings.and_then(|bindings| bindings.get(name)) {
            return Some(value);
        }
        local.map(|_| &NULL)
    }

    /// Whether `name` resolves to anything.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// The built-in expression evaluator.
///
/// Parsed expressions are cached, so rendering a template repeatedly parses
/// each expression once.
#[derive(Default)]
pub struct ExprEvaluator {
    cache: Mutex<HashMap<String, Arc<parse::Expr>>>,
}

impl ExprEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn parsed(&self, expr: &str) -> Result<Arc<parse::Expr>, EvalError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parsed) = cache.get(expr) {
            return Ok(Arc::clone(parsed));
        }

        let parsed = parse::parse_expr(expr)
            .map(Arc::new)
            .map_err(|message| EvalError::Syntax {
                expr: expr.to_string(),
                message,
            })?;
        log::trace!("parsed expression `{}`", expr);
        cache.insert(expr.to_string(), Arc::clone(&parsed));
        Ok(parsed)
    }

    fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, expr: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        let parsed = self.parsed(expr)?;
        eval::eval_expr(&parsed, scope)
    }
}

impl Clone for ExprEvaluator {
    fn clone(&self) -> Self {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Self {
            cache: Mutex::new(cache.clone()),
        }
    }
}

impl fmt::Debug for ExprEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExprEvaluator")
            .field("cached", &self.cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_scope_resolution_order() {
        let outer = bindings(json!({"a": 1, "b": 2}));
        let mut locals = HashMap::new();
        locals.insert("a".to_string(), Some(json!(10)));
        locals.insert("c".to_string(), None);
        locals.insert("b".to_string(), None);

        let scope = Scope::with_locals(Some(&outer), &locals);
        assert_eq!(scope.get("a"), Some(&json!(10)));
        assert_eq!(scope.get("b"), Some(&json!(2)));
        assert_eq!(scope.get("c"), Some(&Value::Null));
        assert_eq!(scope.get("d"), None);
        assert!(!scope.contains("d"));
    }

    #[test]
    fn test_empty_scope() {
        let scope = Scope::default();
        assert_eq!(scope.get("anything"), None);
    }

    #[test]
    fn test_evaluator_caches_parsed_expressions() {
        let evaluator = ExprEvaluator::new();
        let map = bindings(json!({"x": 2}));
        let scope = Scope::new(Some(&map));

        assert_eq!(evaluator.evaluate("x * 21", &scope).unwrap(), json!(42));
        assert_eq!(evaluator.evaluate("x * 21", &scope).unwrap(), json!(42));
        assert_eq!(evaluator.cached(), 1);
    }

    #[test]
    fn test_syntax_errors_report_expression() {
        let evaluator = ExprEvaluator::new();
        let err = evaluator.evaluate("1 +", &Scope::default()).unwrap_err();
        assert!(matches!(err, EvalError::Syntax { ref expr, .. } if expr == "1 +"));
        let err = evaluator.evaluate("(1", &Scope::default()).unwrap_err();
        assert!(matches!(err, EvalError::Syntax { ref expr, .. } if expr == "(1"));
    }

    fn constant(_: &str, _: &Scope<'_>) -> Result<Value, EvalError> {
        Ok(json!(7))
    }

    #[test]
    fn test_fn_evaluator() {
        assert_eq!(constant.evaluate("ignored", &Scope::default()).unwrap(), json!(7));
    }
}
