//! The `#`-command protocol and the built-in commands.
//!
//! A command is looked up by the name following `#` on a directive line. It
//! declares:
//!
//! - a parameter grammar ([`Command::params`]), matched against the text
//!   after the name; its capture groups are passed to `compile`
//! - how it lowers to a [`Fragment`] ([`Command::compile`])
//! - what it does to the nesting stack ([`Command::stack_op`])
//! - optional hooks run at the start of every compilation
//!   ([`Command::init`]) and when an `#end` closes its block
//!   ([`Command::exit`])
//!
//! # Built-in commands
//!
//! | Command | Params | Stack |
//! |---------|--------|-------|
//! | `#if <expr>` | non-empty text | push |
//! | `#else` | none | replace |
//! | `#for <name> in <expr>` | identifier, `in`, non-empty text | push |
//! | `#end` | none | pop |
//! | `#block <expr>` | non-empty text | none |
//!
//! # Custom commands
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use regex::Regex;
//! use serde_json::json;
//! use standout_hashline::{
//!     Command, CompileError, CompileState, Compiler, Fragment, Instruction, StackOp,
//! };
//!
//! struct Unless;
//!
//! static ANY: Lazy<Regex> = Lazy::new(|| Regex::new("^(.+)$").unwrap());
//!
//! impl Command for Unless {
//!     fn params(&self) -> &Regex {
//!         &ANY
//!     }
//!
//!     fn compile(
//!         &self,
//!         _state: &mut CompileState<'_>,
//!         _prefix: &str,
//!         params: &[&str],
//!     ) -> Result<Fragment, CompileError> {
//!         let negated = format!("!({})", params[0]);
//!         Ok(Fragment::new(Instruction::BeginConditional(negated)))
//!     }
//!
//!     fn stack_op(&self) -> StackOp {
//!         StackOp::Push
//!     }
//! }
//!
//! let compiler = Compiler::new().register("unless", Unless);
//! let template = compiler.compile("#unless done\n  pending\n#end").unwrap();
//! assert_eq!(template.render(&json!({"done": false})).unwrap(), "pending");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CompileError;
use crate::program::{Fragment, Instruction, LoopSlot};
use crate::state::CompileState;

static EXPR_PARAMS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+)$").expect("valid pattern"));
static NO_PARAMS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^$").expect("valid pattern"));
static FOR_PARAMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)[ \t]+in[ \t]+(.+)$").expect("valid pattern")
});

/// Effect of a command on the nesting stack, applied after it compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOp {
    /// Open a block named after the command.
    Push,
    /// Rename the innermost block, keeping the depth.
    Replace,
    /// Close the innermost block.
    Pop,
    /// Leave the stack alone.
    None,
}

/// A `#`-command definition.
pub trait Command: Send + Sync {
    /// Grammar for the parameter text; must match the whole text.
    fn params(&self) -> &Regex;

    /// Lowers the directive.
    ///
    /// `prefix` is the whitespace preceding the `#` and `params` holds the
    /// grammar's capture groups (unmatched groups are empty strings).
    fn compile(
        &self,
        state: &mut CompileState<'_>,
        prefix: &str,
        params: &[&str],
    ) -> Result<Fragment, CompileError>;

    fn stack_op(&self) -> StackOp {
        StackOp::None
    }

    /// Runs once at the start of every compilation.
    fn init(&self, _state: &mut CompileState<'_>) {}

    /// Runs when `#end` closes a block opened by this command.
    fn exit(&self, _state: &mut CompileState<'_>) {}
}

/// Table of commands available to a [`Compiler`](crate::Compiler).
#[derive(Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// A registry holding `if`, `else`, `for`, `end` and `block`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("if", If);
        registry.register("else", Else);
        registry.register("for", For);
        registry.register("end", End);
        registry.register("block", Block);
        registry
    }

    /// Adds a command, replacing any command with the same name.
    pub fn register(&mut self, name: impl Into<String>, command: impl Command + 'static) {
        self.commands.insert(name.into(), Arc::new(command));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub(crate) fn commands(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.commands.values()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// `#if <expr>`
#[derive(Debug, Clone, Copy)]
pub struct If;

impl Command for If {
    fn params(&self) -> &Regex {
        &EXPR_PARAMS
    }

    fn compile(
        &self,
        _state: &mut CompileState<'_>,
        _prefix: &str,
        params: &[&str],
    ) -> Result<Fragment, CompileError> {
        Ok(Fragment::new(Instruction::BeginConditional(
            params[0].to_string(),
        )))
    }

    fn stack_op(&self) -> StackOp {
        StackOp::Push
    }
}

/// `#else`
#[derive(Debug, Clone, Copy)]
pub struct Else;

impl Command for Else {
    fn params(&self) -> &Regex {
        &NO_PARAMS
    }

    fn compile(
        &self,
        state: &mut CompileState<'_>,
        _prefix: &str,
        _params: &[&str],
    ) -> Result<Fragment, CompileError> {
        match state.top() {
            Some("else") => Err(CompileError::MultipleElses),
            Some("if") => Ok(Fragment::new(Instruction::BeginAlternate)),
            _ => Err(CompileError::ElseOutsideIf),
        }
    }

    fn stack_op(&self) -> StackOp {
        StackOp::Replace
    }
}

/// Loop nesting counters owned by `#for`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForNesting {
    /// Loops open at the current position.
    pub current: usize,
    /// Deepest nesting seen so far in this compilation.
    pub max: usize,
}

/// `#for <name> in <expr>`
#[derive(Debug, Clone, Copy)]
pub struct For;

impl Command for For {
    fn params(&self) -> &Regex {
        &FOR_PARAMS
    }

    fn init(&self, state: &mut CompileState<'_>) {
        state.insert_ext(ForNesting::default());
    }

    fn compile(
        &self,
        state: &mut CompileState<'_>,
        _prefix: &str,
        params: &[&str],
    ) -> Result<Fragment, CompileError> {
        let nesting = state.ext_mut::<ForNesting>();
        let slot = LoopSlot::at_depth(nesting.current);
        nesting.current += 1;
        nesting.max = nesting.max.max(nesting.current);

        let var = params[0].to_string();
        let declares = [var.as_str()]
            .into_iter()
            .chain(slot.names())
            .map(str::to_string)
            .collect::<Vec<_>>();

        Ok(Fragment::new(Instruction::BeginLoop {
            var,
            collection: params[1].to_string(),
            slot,
        })
        .declaring(declares))
    }

    fn exit(&self, state: &mut CompileState<'_>) {
        let nesting = state.ext_mut::<ForNesting>();
        nesting.current = nesting.current.saturating_sub(1);
    }

    fn stack_op(&self) -> StackOp {
        StackOp::Push
    }
}

/// `#end`
#[derive(Debug, Clone, Copy)]
pub struct End;

impl Command for End {
    fn params(&self) -> &Regex {
        &NO_PARAMS
    }

    fn compile(
        &self,
        state: &mut CompileState<'_>,
        _prefix: &str,
        _params: &[&str],
    ) -> Result<Fragment, CompileError> {
        let closing = state
            .top()
            .map(str::to_string)
            .ok_or(CompileError::TooManyEnds)?;
        state.exit_command(&closing);
        Ok(Fragment::new(Instruction::EndBlock))
    }

    fn stack_op(&self) -> StackOp {
        StackOp::Pop
    }
}

/// `#block <expr>`
#[derive(Debug, Clone, Copy)]
pub struct Block;

impl Command for Block {
    fn params(&self) -> &Regex {
        &EXPR_PARAMS
    }

    fn compile(
        &self,
        state: &mut CompileState<'_>,
        prefix: &str,
        params: &[&str],
    ) -> Result<Fragment, CompileError> {
        let prefix = prefix.chars().skip(state.indent_level()).collect();
        Ok(Fragment::new(Instruction::EmitBlockValue {
            prefix,
            expr: params[0].to_string(),
        }))
    }
}
