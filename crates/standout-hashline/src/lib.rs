//! Hashline - a line-oriented template compiler.
//!
//! Templates are plain text with two kinds of directives:
//!
//! - `#{expr}` anywhere in a line interpolates the text form of `expr`
//! - `#name params` on a line of its own runs the command `name`
//!
//! Templates compile once into a [`Program`], a flat instruction sequence
//! with resolved jump targets, and render any number of times against JSON
//! bindings.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use standout_hashline::template;
//!
//! let tpl = template(
//!     "#for item in items\n  #if item.done\n    [x] #{item.name}\n  #else\n    [ ] #{item.name}\n  #end\n#end",
//! )
//! .unwrap();
//!
//! let output = tpl
//!     .render(&json!({
//!         "items": [
//!             {"name": "write docs", "done": true},
//!             {"name": "fix bug", "done": false},
//!         ]
//!     }))
//!     .unwrap();
//!
//! assert_eq!(output, "[x] write docs\n[ ] fix bug");
//! ```
//!
//! # Indentation
//!
//! Block bodies are indented for readability; every open block strips
//! `indent_step` characters (2 by default, see [`CompileOptions`]) from the
//! start of each body line. Leading and trailing newlines of the rendered
//! output are removed.
//!
//! # Commands
//!
//! | Command | Meaning |
//! |---------|---------|
//! | `#if <expr>` / `#else` / `#end` | conditional |
//! | `#for <name> in <expr>` / `#end` | loop over an array, or the characters of a string |
//! | `#block <expr>` | emit a multi-line value, every line prefixed with the directive's indentation |
//!
//! New commands implement [`Command`] and are registered on a [`Compiler`].
//!
//! # Expressions
//!
//! The compiler passes expression text through untouched. At render time an
//! [`Evaluator`] turns it into a value; the default is [`ExprEvaluator`], a
//! small JavaScript-like expression language (see the [`expr`] module).

mod command;
mod compiler;
mod error;
mod escape;
pub mod expr;
pub mod indent;
mod program;
mod render;
pub mod scanner;
mod state;
mod template;

// Re-export public API
pub use command::{Block, Command, CommandRegistry, Else, End, For, ForNesting, If, StackOp};
pub use compiler::{CompileOptions, Compiler};
pub use error::{CompileError, EvalError, RenderError, UnescapeError};
pub use escape::{escape, unescape};
pub use expr::{to_text, truthy, Evaluator, ExprEvaluator, Scope};
pub use program::{Assembler, Fragment, Instruction, LoopSlot, Program};
pub use state::CompileState;
pub use template::Template;

/// Compiles `source` with the default options and built-in commands.
pub fn template(source: &str) -> Result<Template, CompileError> {
    Compiler::new().compile(source)
}
