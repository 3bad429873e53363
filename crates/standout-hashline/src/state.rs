//! Per-compilation mutable state.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::command::{CommandRegistry, StackOp};
use crate::indent::indent_width;

/// State threaded through one compilation.
///
/// Holds the stack of open block commands, whether scanning is at the
/// beginning of a line, and typed slots where commands keep their own
/// counters between directives (see [`CompileState::ext_mut`]). A fresh
/// state is created for every [`Compiler::compile`](crate::Compiler::compile)
/// call and dropped when it returns.
pub struct CompileState<'r> {
    registry: &'r CommandRegistry,
    indent_step: usize,
    command_stack: Vec<String>,
    at_bol: bool,
    extensions: HashMap<TypeId, Box<dyn Any>>,
}

impl<'r> CompileState<'r> {
    pub(crate) fn new(registry: &'r CommandRegistry, indent_step: usize) -> Self {
        Self {
            registry,
            indent_step,
            command_stack: Vec::new(),
            at_bol: true,
            extensions: HashMap::new(),
        }
    }

    /// Names of the currently open block commands, outermost first.
    pub fn command_stack(&self) -> &[String] {
        &self.command_stack
    }

    /// Innermost open block command.
    pub fn top(&self) -> Option<&str> {
        self.command_stack.last().map(String::as_str)
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.command_stack.len()
    }

    pub fn indent_step(&self) -> usize {
        self.indent_step
    }

    /// Number of leading characters stripped from literals at this depth.
    pub fn indent_level(&self) -> usize {
        indent_width(self.indent_step, self.depth())
    }

    /// Whether the next literal starts at the beginning of a line.
    pub fn at_bol(&self) -> bool {
        self.at_bol
    }

    pub(crate) fn set_at_bol(&mut self, at_bol: bool) {
        self.at_bol = at_bol;
    }

    pub(crate) fn apply(&mut self, op: StackOp, name: &str) {
        match op {
            StackOp::Push => self.command_stack.push(name.to_string()),
            StackOp::Replace => {
                if let Some(top) = self.command_stack.last_mut() {
                    *top = name.to_string();
                }
            }
            StackOp::Pop => {
                self.command_stack.pop();
            }
            StackOp::None => {}
        }
    }

    /// Runs the `exit` hook of the named command, if it is registered.
    ///
    /// Called by `#end` for the block it closes.
    pub fn exit_command(&mut self, name: &str) {
        let registry = self.registry;
        if let Some(command) = registry.get(name) {
            command.exit(self);
        }
    }

    /// Stores a command-owned value, replacing any previous one of its type.
    pub fn insert_ext<T: Any>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn ext<T: Any>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref())
    }

    /// Mutable access to a command-owned value, created with its default
    /// when absent.
    pub fn ext_mut<T: Any + Default>(&mut self) -> &mut T {
        self.extensions
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut()
            .expect("extension slot holds the type it is keyed by")
    }
}

impl fmt::Debug for CompileState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileState")
            .field("indent_step", &self.indent_step)
            .field("command_stack", &self.command_stack)
            .field("at_bol", &self.at_bol)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
