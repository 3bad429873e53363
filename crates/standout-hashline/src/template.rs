//! Compiled templates.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::expr::{Evaluator, ExprEvaluator};
use crate::program::Program;
use crate::render::execute;

/// A compiled template, ready to render any number of times.
///
/// Rendering never mutates the template; every call starts from a fresh
/// output buffer and fresh template-local variables.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use standout_hashline::template;
///
/// let tpl = template("#if user\n  Hi #{user}!\n#else\n  Who are you?\n#end").unwrap();
///
/// assert_eq!(tpl.render(&json!({"user": "ana"})).unwrap(), "Hi ana!");
/// assert_eq!(tpl.render(&json!({"user": null})).unwrap(), "Who are you?");
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    program: Program,
    evaluator: ExprEvaluator,
}

impl Template {
    pub(crate) fn new(program: Program) -> Self {
        Self {
            program,
            evaluator: ExprEvaluator::new(),
        }
    }

    /// Renders with the built-in expression evaluator.
    ///
    /// `bindings` must be a JSON object (its keys become variables) or
    /// `null` (no variables).
    pub fn render(&self, bindings: &Value) -> Result<String, RenderError> {
        self.render_with(bindings, &self.evaluator)
    }

    /// Renders with a caller-supplied evaluator.
    pub fn render_with(
        &self,
        bindings: &Value,
        evaluator: &dyn Evaluator,
    ) -> Result<String, RenderError> {
        let bindings = as_bindings(bindings)?;
        log::debug!(
            "rendering {} instructions with {} bindings",
            self.program.instructions().len(),
            bindings.map_or(0, Map::len)
        );
        execute(&self.program, bindings, evaluator)
    }

    /// Renders any serializable value, converted to JSON first.
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use standout_hashline::template;
    ///
    /// #[derive(Serialize)]
    /// struct Order {
    ///     id: u32,
    ///     items: Vec<String>,
    /// }
    ///
    /// let tpl = template("Order #{id}:\n#for item in items\n  - #{item}\n#end").unwrap();
    /// let order = Order { id: 7, items: vec!["tea".into(), "cake".into()] };
    ///
    /// assert_eq!(tpl.render_serialize(&order).unwrap(), "Order 7:\n- tea\n- cake");
    /// ```
    pub fn render_serialize<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, RenderError> {
        let bindings = serde_json::to_value(data)?;
        self.render(&bindings)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Human-readable listing of the compiled program.
    pub fn listing(&self) -> String {
        self.program.to_string()
    }
}

fn as_bindings(value: &Value) -> Result<Option<&Map<String, Value>>, RenderError> {
    match value {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        _ => Err(RenderError::InvalidBindings),
    }
}
