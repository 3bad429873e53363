//! The compiler driver.
//!
//! Compilation is a single forward pass over the template:
//!
//! 1. every registered command's `init` hook runs
//! 2. the scanner finds the next directive; the literal text before it is
//!    unindented for the current nesting depth and lowered to a push
//! 3. commands are looked up, their parameters checked against their
//!    grammar, and lowered; interpolations lower to an evaluated push
//! 4. leftover text is flushed, open blocks are reported, and the fragments
//!    are assembled into a [`Program`](crate::Program)

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandRegistry};
use crate::error::CompileError;
use crate::indent::unindent;
use crate::program::{Assembler, Fragment, Instruction};
use crate::scanner::{scan, Directive};
use crate::state::CompileState;
use crate::template::Template;

/// Options for one compilation.
///
/// Deserializes from partial input; missing fields take their defaults.
///
/// ```rust
/// use standout_hashline::CompileOptions;
///
/// let options: CompileOptions = serde_json::from_str(r#"{"indent_step": 4}"#).unwrap();
/// assert_eq!(options.indent_step, 4);
///
/// let options: CompileOptions = serde_json::from_str("{}").unwrap();
/// assert_eq!(options, CompileOptions::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Characters of indentation each open block adds to its body.
    pub indent_step: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { indent_step: 2 }
    }
}

/// Compiles template source into [`Template`]s.
///
/// A compiler is configured once and can compile any number of templates;
/// each compilation gets its own [`CompileState`].
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use standout_hashline::Compiler;
///
/// let compiler = Compiler::new().indent_step(4);
/// let template = compiler
///     .compile("#for n in numbers\n    #{n * n}\n#end")
///     .unwrap();
///
/// let output = template.render(&json!({"numbers": [1, 2, 3]})).unwrap();
/// assert_eq!(output, "1\n4\n9");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
    registry: CommandRegistry,
}

impl Compiler {
    /// A compiler with default options and the built-in commands.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            registry: CommandRegistry::builtin(),
        }
    }

    /// Sets the per-level indentation width.
    pub fn indent_step(mut self, indent_step: usize) -> Self {
        self.options.indent_step = indent_step;
        self
    }

    /// Adds or replaces a command.
    pub fn register(mut self, name: impl Into<String>, command: impl Command + 'static) -> Self {
        self.registry.register(name, command);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Compiles template source.
    pub fn compile(&self, source: &str) -> Result<Template, CompileError> {
        log::debug!(
            "compiling template ({} bytes, indent step {})",
            source.len(),
            self.options.indent_step
        );

        let mut state = CompileState::new(&self.registry, self.options.indent_step);
        for command in self.registry.commands() {
            command.init(&mut state);
        }

        let mut asm = Assembler::new();
        let mut rest = source;

        while let Some(step) = scan(rest) {
            asm.push(literal(&state, step.literal));
            let fragment = match step.directive {
                Directive::Command {
                    prefix,
                    name,
                    params,
                } => self.compile_command(&mut state, prefix, name, params)?,
                Directive::Interpolation { expr } => {
                    state.set_at_bol(false);
                    if expr.trim().is_empty() {
                        Fragment::empty()
                    } else {
                        Fragment::new(Instruction::PushEvaluated(expr.to_string()))
                    }
                }
            };
            asm.push(fragment);
            rest = step.rest;
        }
        asm.push(literal(&state, rest));

        if state.depth() > 0 {
            log::debug!("unclosed blocks: {:?}", state.command_stack());
            return Err(CompileError::MissingEnd);
        }

        let program = asm.finish()?;
        log::debug!(
            "compiled {} instructions, {} frame variables",
            program.instructions().len(),
            program.declared().len()
        );
        log::trace!("program listing:\n{}", program);

        Ok(Template::new(program))
    }

    fn compile_command(
        &self,
        state: &mut CompileState<'_>,
        prefix: &str,
        name: &str,
        params: &str,
    ) -> Result<Fragment, CompileError> {
        log::trace!("#{} {:?} at depth {}", name, params, state.depth());

        let command = self
            .registry
            .get(name)
            .ok_or_else(|| CompileError::UnknownCommand {
                name: name.to_string(),
            })?;

        let captures = command
            .params()
            .captures(params)
            .ok_or_else(|| CompileError::invalid_params(name, params))?;
        let groups: Vec<&str> = captures
            .iter()
            .skip(1)
            .map(|group| group.map_or("", |m| m.as_str()))
            .collect();

        let fragment = command.compile(state, prefix, &groups)?;
        state.apply(command.stack_op(), name);
        state.set_at_bol(true);
        Ok(fragment)
    }
}

/// Lowers a literal span, unindented for the current depth.
fn literal(state: &CompileState<'_>, text: &str) -> Fragment {
    Fragment::literal(unindent(text, state.indent_level(), state.at_bol()))
}
