//! Instruction stream assembly.
//!
//! The builder collects instructions with symbolic labels, patches branch
//! targets once every label is bound, and computes the maximum operand
//! stack depth by walking the finished control flow graph.

use crate::error::CodegenError;
use crate::instruction::Instruction;
use crate::output::ExceptionEntry;

/// A forward-referencable position in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub(crate) u32);

#[derive(Debug)]
struct PendingException {
    start: LabelId,
    end: LabelId,
    handler: LabelId,
    class: String,
}

/// The assembled body of one method.
#[derive(Debug)]
pub struct CodeBody {
    pub code: Vec<Instruction>,
    pub exceptions: Vec<ExceptionEntry>,
    pub max_stack: u16,
}

/// Builds one method body.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<Instruction>,
    labels: Vec<Option<u32>>,
    /// Instructions whose branch target is a still-symbolic label.
    fixups: Vec<(usize, LabelId)>,
    exceptions: Vec<PendingException>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next emitted instruction will get.
    pub fn next_index(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(None);
        id
    }

    /// Bind a label to the current position.
    pub fn bind(&mut self, label: LabelId) {
        self.labels[label.0 as usize] = Some(self.next_index());
    }

    /// Emit a branch whose target is patched when `label` is bound.
    pub fn emit_branch(&mut self, instruction: Instruction, label: LabelId) {
        debug_assert!(instruction.branch_target().is_some());
        self.fixups.push((self.code.len(), label));
        self.code.push(instruction);
    }

    /// Cover `[start, end)` with a handler at `handler` for the named
    /// throwable class. Entries are matched in registration order.
    pub fn add_exception(&mut self, start: LabelId, end: LabelId, handler: LabelId, class: String) {
        self.exceptions.push(PendingException {
            start,
            end,
            handler,
            class,
        });
    }

    fn resolve(&self, label: LabelId) -> Result<u32, CodegenError> {
        self.labels[label.0 as usize]
            .ok_or(CodegenError::UnboundLabel { label: label.0 })
    }

    /// Patch all branches, resolve exception ranges and compute the
    /// maximum stack depth.
    pub fn finish(mut self) -> Result<CodeBody, CodegenError> {
        for (index, label) in std::mem::take(&mut self.fixups) {
            let target = self.resolve(label)?;
            match &mut self.code[index] {
                Instruction::Jump { target: t }
                | Instruction::JumpIfTrue { target: t }
                | Instruction::JumpIfFalse { target: t }
                | Instruction::JumpIfNull { target: t }
                | Instruction::JumpIfNonNull { target: t } => *t = target,
                _ => unreachable!("fixup on a non-branch instruction"),
            }
        }
        let mut exceptions = Vec::with_capacity(self.exceptions.len());
        for pending in &self.exceptions {
            exceptions.push(ExceptionEntry {
                start: self.resolve(pending.start)?,
                end: self.resolve(pending.end)?,
                handler: self.resolve(pending.handler)?,
                class: pending.class.clone(),
            });
        }
        let max_stack = compute_max_stack(&self.code, &exceptions)?;
        Ok(CodeBody {
            code: self.code,
            exceptions,
            max_stack,
        })
    }
}

/// Worklist walk over all reachable paths. Each instruction must be
/// reached at one consistent depth; handlers start with the thrown
/// reference as the only stack entry.
fn compute_max_stack(
    code: &[Instruction],
    exceptions: &[ExceptionEntry],
) -> Result<u16, CodegenError> {
    let mut depth_at: Vec<Option<u16>> = vec![None; code.len()];
    let mut work: Vec<(usize, u16)> = vec![(0, 0)];
    for entry in exceptions {
        work.push((entry.handler as usize, 1));
    }
    let mut max = 0u16;

    while let Some((mut pc, mut depth)) = work.pop() {
        loop {
            if pc >= code.len() {
                break;
            }
            match depth_at[pc] {
                Some(seen) if seen == depth => break,
                Some(seen) => {
                    return Err(CodegenError::InconsistentStack {
                        at: pc,
                        first: seen,
                        second: depth,
                    });
                }
                None => depth_at[pc] = Some(depth),
            }
            let instruction = &code[pc];
            let (pops, pushes) = instruction.stack_effect();
            if depth < pops {
                return Err(CodegenError::StackUnderflow { at: pc });
            }
            depth = depth - pops + pushes;
            max = max.max(depth);
            if let Some(target) = instruction.branch_target() {
                if target as usize > code.len() {
                    return Err(CodegenError::BranchOutOfBounds { target });
                }
                work.push((target as usize, depth));
            }
            if instruction.is_terminator() {
                break;
            }
            pc += 1;
        }
    }
    Ok(max)
}
