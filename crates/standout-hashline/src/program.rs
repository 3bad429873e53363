//! Lowered template programs.
//!
//! Commands and interpolations lower to [`Fragment`]s: a few
//! [`Instruction`]s plus the names of the frame variables they need. The
//! [`Assembler`] concatenates fragments, pools their variables and resolves
//! block structure into jump targets, producing a [`Program`] the renderer
//! can execute directly.

use std::fmt;

use crate::error::CompileError;
use crate::escape::escape;

/// A single step of a lowered template.
///
/// Expressions are kept as source text and handed to the
/// [`Evaluator`](crate::Evaluator) at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Append literal text to the output.
    PushLiteral(String),
    /// Evaluate an expression and append its text form.
    PushEvaluated(String),
    /// Open a block that runs only when the expression is truthy.
    BeginConditional(String),
    /// Close the taken branch of a conditional and open the other one.
    BeginAlternate,
    /// Open a block that runs once per element of a collection.
    BeginLoop {
        /// Frame variable receiving the current element.
        var: String,
        /// Expression producing the collection.
        collection: String,
        /// Frame variables holding the loop's control state.
        slot: LoopSlot,
    },
    /// Close the innermost open block.
    EndBlock,
    /// Evaluate an expression and emit each line of its text form after
    /// `prefix`, terminated by a newline.
    EmitBlockValue { prefix: String, expr: String },
}

/// Names of the frame variables that hold one loop's control state.
///
/// Loops are namespaced by nesting depth so a loop never overwrites the
/// state of the loop enclosing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoopSlot {
    pub collection: String,
    pub length: String,
    pub index: String,
}

impl LoopSlot {
    /// Slot names for a loop opened at `depth` loops deep.
    pub fn at_depth(depth: usize) -> Self {
        Self {
            collection: format!("__c{}", depth),
            length: format!("__l{}", depth),
            index: format!("__i{}", depth),
        }
    }

    /// All three names, in declaration order.
    pub fn names(&self) -> [&str; 3] {
        [&self.collection, &self.length, &self.index]
    }
}

/// The output of lowering one directive or literal span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub instructions: Vec<Instruction>,
    /// Frame variables the instructions assign to.
    pub declares: Vec<String>,
}

impl Fragment {
    /// A fragment made of one instruction and no variables.
    pub fn new(instruction: Instruction) -> Self {
        Self {
            instructions: vec![instruction],
            declares: Vec::new(),
        }
    }

    /// A fragment that produces nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds frame variable declarations.
    pub fn declaring<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declares.extend(names.into_iter().map(Into::into));
        self
    }

    /// Literal text; empty text lowers to nothing.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::empty()
        } else {
            Self::new(Instruction::PushLiteral(text))
        }
    }
}

/// Accumulates fragments into a [`Program`].
#[derive(Debug, Default)]
pub struct Assembler {
    instructions: Vec<Instruction>,
    declared: Vec<String>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment's instructions and pools its declarations.
    pub fn push(&mut self, fragment: Fragment) {
        self.instructions.extend(fragment.instructions);
        self.declared.extend(fragment.declares);
    }

    /// Deduplicates declarations and resolves block jump targets.
    pub fn finish(self) -> Result<Program, CompileError> {
        let mut declared = self.declared;
        declared.sort();
        declared.dedup();

        let targets = resolve_blocks(&self.instructions)?;

        Ok(Program {
            instructions: self.instructions,
            declared,
            targets,
        })
    }
}

/// Pairs every block opener with its alternate/end.
///
/// - `BeginConditional` targets its `BeginAlternate` if it has one, otherwise
///   its `EndBlock`.
/// - `BeginAlternate` and `BeginLoop` target their `EndBlock`.
/// - `EndBlock` targets its opener.
fn resolve_blocks(instructions: &[Instruction]) -> Result<Vec<usize>, CompileError> {
    let mut targets = vec![0; instructions.len()];
    // (opener, alternate)
    let mut open: Vec<(usize, Option<usize>)> = Vec::new();

    for (index, instruction) in instructions.iter().enumerate() {
        match instruction {
            Instruction::BeginConditional(_) | Instruction::BeginLoop { .. } => {
                open.push((index, None));
            }
            Instruction::BeginAlternate => {
                let (opener, alternate) = open
                    .last_mut()
                    .filter(|(opener, alternate)| {
                        alternate.is_none()
                            && matches!(instructions[*opener], Instruction::BeginConditional(_))
                    })
                    .ok_or(CompileError::UnbalancedBlocks { index })?;
                targets[*opener] = index;
                *alternate = Some(index);
            }
            Instruction::EndBlock => {
                let (opener, alternate) = open
                    .pop()
                    .ok_or(CompileError::UnbalancedBlocks { index })?;
                targets[index] = opener;
                match alternate {
                    Some(alternate) => targets[alternate] = index,
                    None => targets[opener] = index,
                }
            }
            Instruction::PushLiteral(_)
            | Instruction::PushEvaluated(_)
            | Instruction::EmitBlockValue { .. } => {}
        }
    }

    match open.first() {
        Some((opener, _)) => Err(CompileError::UnbalancedBlocks { index: *opener }),
        None => Ok(targets),
    }
}

/// A compiled, executable template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    declared: Vec<String>,
    targets: Vec<usize>,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Sorted, deduplicated frame variables.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Jump target of the block instruction at `index`.
    pub(crate) fn target(&self, index: usize) -> usize {
        self.targets[index]
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.declared.is_empty() {
            writeln!(f, "vars {}", self.declared.join(", "))?;
        }
        for (index, instruction) in self.instructions.iter().enumerate() {
            write!(f, "{:04} ", index)?;
            match instruction {
                Instruction::PushLiteral(text) => writeln!(f, "push \"{}\"", escape(text))?,
                Instruction::PushEvaluated(expr) => writeln!(f, "eval {}", expr)?,
                Instruction::BeginConditional(expr) => {
                    writeln!(f, "if {} -> {:04}", expr, self.targets[index])?
                }
                Instruction::BeginAlternate => writeln!(f, "else -> {:04}", self.targets[index])?,
                Instruction::BeginLoop {
                    var,
                    collection,
                    slot,
                } => writeln!(
                    f,
                    "for {} in {} [{}] -> {:04}",
                    var,
                    collection,
                    slot.names().join(" "),
                    self.targets[index]
                )?,
                Instruction::EndBlock => writeln!(f, "end -> {:04}", self.targets[index])?,
                Instruction::EmitBlockValue { prefix, expr } => {
                    writeln!(f, "block \"{}\" {}", escape(prefix), expr)?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(instructions: Vec<Instruction>) -> Result<Program, CompileError> {
        let mut asm = Assembler::new();
        for instruction in instructions {
            asm.push(Fragment::new(instruction));
        }
        asm.finish()
    }

    #[test]
    fn test_literal_fragment_skips_empty_text() {
        assert_eq!(Fragment::literal(""), Fragment::empty());
        assert_eq!(
            Fragment::literal("x").instructions,
            vec![Instruction::PushLiteral("x".into())]
        );
    }

    #[test]
    fn test_declarations_are_sorted_and_deduplicated() {
        let mut asm = Assembler::new();
        asm.push(Fragment::empty().declaring(["a", "__c0", "__l0", "__i0"]));
        asm.push(Fragment::empty().declaring(["b", "__c0", "__l0", "__i0"]));
        let program = asm.finish().unwrap();
        assert_eq!(program.declared(), ["__c0", "__i0", "__l0", "a", "b"]);
    }

    #[test]
    fn test_resolve_conditional_with_alternate() {
        let program = assemble(vec![
            Instruction::BeginConditional("x".into()),
            Instruction::PushLiteral("a".into()),
            Instruction::BeginAlternate,
            Instruction::PushLiteral("b".into()),
            Instruction::EndBlock,
        ])
        .unwrap();
        assert_eq!(program.target(0), 2);
        assert_eq!(program.target(2), 4);
        assert_eq!(program.target(4), 0);
    }

    #[test]
    fn test_resolve_nested_loop() {
        let program = assemble(vec![
            Instruction::BeginLoop {
                var: "a".into(),
                collection: "xs".into(),
                slot: LoopSlot::at_depth(0),
            },
            Instruction::BeginConditional("a".into()),
            Instruction::EndBlock,
            Instruction::EndBlock,
        ])
        .unwrap();
        assert_eq!(program.target(0), 3);
        assert_eq!(program.target(1), 2);
        assert_eq!(program.target(2), 1);
        assert_eq!(program.target(3), 0);
    }

    #[test]
    fn test_unbalanced_streams_rejected() {
        assert_eq!(
            assemble(vec![Instruction::EndBlock]),
            Err(CompileError::UnbalancedBlocks { index: 0 })
        );
        assert_eq!(
            assemble(vec![
                Instruction::PushLiteral("x".into()),
                Instruction::BeginConditional("x".into()),
            ]),
            Err(CompileError::UnbalancedBlocks { index: 1 })
        );
        assert_eq!(
            assemble(vec![
                Instruction::BeginLoop {
                    var: "a".into(),
                    collection: "xs".into(),
                    slot: LoopSlot::at_depth(0),
                },
                Instruction::BeginAlternate,
                Instruction::EndBlock,
            ]),
            Err(CompileError::UnbalancedBlocks { index: 1 })
        );
    }

    #[test]
    fn test_listing_escapes_literals() {
        let program = assemble(vec![
            Instruction::PushLiteral("a\"b\n".into()),
            Instruction::EmitBlockValue {
                prefix: "\t".into(),
                expr: "1+2".into(),
            },
        ])
        .unwrap();
        assert_eq!(
            program.to_string(),
            "0000 push \"a\\\"b\\n\"\n0001 block \"\\t\" 1+2\n"
        );
    }

    #[test]
    fn test_loop_slot_names() {
        let slot = LoopSlot::at_depth(1);
        assert_eq!(slot.names(), ["__c1", "__l1", "__i1"]);
    }
}
