//! Error types for compiling and rendering templates.
//!
//! Compilation and rendering fail fast: every error aborts the whole call and
//! no partial output is produced.

use thiserror::Error;

/// Structural errors raised while compiling a template.
///
/// The display strings are part of the public contract and are matched
/// verbatim by callers and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A `#name` directive names no registered command.
    #[error("Unknown command: #{name}.")]
    UnknownCommand { name: String },

    /// The parameter text does not match the command's grammar.
    #[error("Invalid params for command #{name}: {params}.")]
    InvalidParams { name: String, params: String },

    /// `#else` directly following another `#else` branch.
    #[error("Multiple #elses.")]
    MultipleElses,

    /// `#else` whose innermost open block is not an `#if`.
    #[error("Using #else outside of #if.")]
    ElseOutsideIf,

    /// `#end` with no open block.
    #[error("Too many #ends.")]
    TooManyEnds,

    /// Input ended while blocks were still open.
    #[error("Missing #end.")]
    MissingEnd,

    /// The lowered instruction stream does not nest properly.
    ///
    /// Built-in commands never produce this; it guards against custom
    /// commands whose instructions disagree with their stack operation.
    #[error("unbalanced block structure at instruction {index}")]
    UnbalancedBlocks { index: usize },
}

impl CompileError {
    /// Create an invalid-params error.
    pub fn invalid_params(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self::InvalidParams {
            name: name.into(),
            params: params.into(),
        }
    }
}

/// Errors produced by an [`Evaluator`](crate::Evaluator).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// An identifier could not be resolved in the current scope.
    #[error("{name} is not defined")]
    UndefinedVariable { name: String },

    /// The expression text could not be parsed.
    #[error("syntax error in `{expr}`: {message}")]
    Syntax { expr: String, message: String },

    /// An operator was applied to values it does not support.
    #[error("type error: {message}")]
    Type { message: String },

    /// Error raised by an embedder-supplied evaluator.
    #[error("{0}")]
    Custom(String),
}

impl EvalError {
    /// Create a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    /// Create a custom error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Errors raised while rendering a compiled template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The evaluator failed; passed through unchanged.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A `#for` collection evaluated to `null`.
    #[error("#for collection `{expr}` is null")]
    NotIterable { expr: String },

    /// Bindings must be a JSON object or `null`.
    #[error("bindings must be an object or null")]
    InvalidBindings,

    /// Serializing render data to JSON failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A malformed escape sequence passed to [`unescape`](crate::unescape).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid escape at byte {offset}: {message}")]
pub struct UnescapeError {
    /// Byte offset of the backslash starting the bad sequence.
    pub offset: usize,
    /// What was wrong with it.
    pub message: String,
}
