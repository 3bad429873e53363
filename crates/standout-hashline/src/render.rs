//! Program execution.
//!
//! Runs a [`Program`] against caller bindings: literal and evaluated text is
//! appended to a fresh output buffer, blocks jump through the program's
//! resolved targets, and loops keep their control state in the frame
//! variables named by their [`LoopSlot`].

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::expr::{to_text, truthy, Evaluator, Scope};
use crate::program::{Instruction, LoopSlot, Program};

/// Template-local variables; `None` until first assigned.
type Frame = HashMap<String, Option<Value>>;

/// Executes `program` and returns the output with leading and trailing
/// newlines removed.
pub(crate) fn execute(
    program: &Program,
    bindings: Option<&Map<String, Value>>,
    evaluator: &dyn Evaluator,
) -> Result<String, RenderError> {
    let instructions = program.instructions();
    let mut frame: Frame = program
        .declared()
        .iter()
        .map(|name| (name.clone(), None))
        .collect();
    let mut out = String::new();
    let mut pc = 0;

    while pc < instructions.len() {
        match &instructions[pc] {
            Instruction::PushLiteral(text) => out.push_str(text),

            Instruction::PushEvaluated(expr) => {
                let value = eval(evaluator, expr, bindings, &frame)?;
                out.push_str(&to_text(&value));
            }

            Instruction::BeginConditional(expr) => {
                if !truthy(&eval(evaluator, expr, bindings, &frame)?) {
                    pc = program.target(pc) + 1;
                    continue;
                }
            }

            // Only reached by falling off the end of the taken branch.
            Instruction::BeginAlternate => {
                pc = program.target(pc) + 1;
                continue;
            }

            Instruction::BeginLoop {
                var,
                collection,
                slot,
            } => {
                let items = match eval(evaluator, collection, bindings, &frame)? {
                    Value::Array(items) => items,
                    Value::String(text) => text
                        .chars()
                        .map(|c| Value::String(c.to_string()))
                        .collect(),
                    Value::Null => {
                        return Err(RenderError::NotIterable {
                            expr: collection.clone(),
                        })
                    }
                    // numbers, booleans and objects have no elements
                    _ => Vec::new(),
                };
                let len = items.len();
                let first = items.first().cloned();
                frame.insert(slot.collection.clone(), Some(Value::Array(items)));
                frame.insert(slot.length.clone(), Some(Value::from(len)));
                frame.insert(slot.index.clone(), Some(Value::from(0)));

                match first {
                    Some(item) => {
                        frame.insert(var.clone(), Some(item));
                    }
                    None => {
                        pc = program.target(pc) + 1;
                        continue;
                    }
                }
            }

            Instruction::EndBlock => {
                let opener = program.target(pc);
                if let Instruction::BeginLoop { var, slot, .. } = &instructions[opener] {
                    if let Some(item) = advance_loop(&mut frame, slot) {
                        frame.insert(var.clone(), Some(item));
                        pc = opener + 1;
                        continue;
                    }
                }
            }

            Instruction::EmitBlockValue { prefix, expr } => {
                let value = eval(evaluator, expr, bindings, &frame)?;
                for line in to_text(&value).split('\n') {
                    out.push_str(prefix);
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        pc += 1;
    }

    Ok(out.trim_matches('\n').to_string())
}

fn eval(
    evaluator: &dyn Evaluator,
    expr: &str,
    bindings: Option<&Map<String, Value>>,
    frame: &Frame,
) -> Result<Value, RenderError> {
    let scope = Scope::with_locals(bindings, frame);
    Ok(evaluator.evaluate(expr, &scope)?)
}

/// Moves a loop to its next element, returning it; `None` once exhausted.
fn advance_loop(frame: &mut Frame, slot: &LoopSlot) -> Option<Value> {
    let read = |frame: &Frame, name: &str| {
        frame
            .get(name)
            .and_then(Option::as_ref)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    };

    let index = read(frame, &slot.index) + 1;
    if index >= read(frame, &slot.length) {
        return None;
    }

    let item = match frame.get(&slot.collection) {
        Some(Some(Value::Array(items))) => items.get(index).cloned(),
        _ => None,
    }?;
    frame.insert(slot.index.clone(), Some(Value::from(index)));
    Some(item)
}
