//! This module contains a builder for constructing [`Program`]s by hand, as
//! done by decompiler adapters and throughout the tests.

use ethnum::U256;

use crate::program::{Instruction, InstructionId, Operation, Program, Variable, VariableId};

/// Incrementally assembles a [`Program`].
///
/// Instructions are appended in program order. Each appended instruction is
/// linked as the sequential successor of the previous one, unless the previous
/// instruction does not fall through or the new one is a method head.
///
/// Non-virtual instructions receive their arena index as their raw instruction
/// number unless told otherwise.
#[derive(Clone, Debug, Default)]
pub struct ProgramBuilder {
    variables:    Vec<Variable>,
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with an unknown value.
    pub fn variable(&mut self) -> VariableId {
        self.push_variable(Variable::unknown())
    }

    /// Adds a variable known to hold `value`.
    pub fn constant(&mut self, value: impl Into<U256>) -> VariableId {
        self.push_variable(Variable::constant(value.into()))
    }

    /// Appends an instruction performing `operation` on `inputs`, writing
    /// `outputs`.
    pub fn add(
        &mut self,
        operation: Operation,
        inputs: &[VariableId],
        outputs: &[VariableId],
    ) -> InstructionId {
        let id = self.next_instruction_id();
        let mut instruction = Instruction::new(operation, inputs.to_vec(), outputs.to_vec());
        if !operation.is_virtual() {
            instruction.raw = Some(id.index());
        }

        if let Some(previous) = self.instructions.last_mut() {
            if previous.operation.falls_through() && operation != Operation::MethodHead {
                previous.next = Some(id);
                instruction.prev = Some(InstructionId(id.0 - 1));
            }
        }

        self.instructions.push(instruction);
        id
    }

    /// Records a control transfer from the branch `from` to `to`.
    ///
    /// # Panics
    ///
    /// If either instruction has not been added to this builder.
    pub fn branch(&mut self, from: InstructionId, to: InstructionId) {
        self.instructions[from.0 as usize].branches.push(to);
        self.instructions[to.0 as usize].incoming.push(from);
    }

    /// Records `merge` as the point at which both arms of the conditional
    /// branch `branch` meet again.
    ///
    /// # Panics
    ///
    /// If `branch` has not been added to this builder.
    pub fn merge(&mut self, branch: InstructionId, merge: InstructionId) {
        self.instructions[branch.0 as usize].merge = Some(merge);
    }

    /// Overrides the raw instruction number of `id`.
    ///
    /// # Panics
    ///
    /// If `id` has not been added to this builder.
    pub fn raw(&mut self, id: InstructionId, raw: Option<u32>) {
        self.instructions[id.0 as usize].raw = raw;
    }

    /// Finishes building, producing the program.
    #[must_use]
    pub fn build(self) -> Program {
        Program {
            variables:    self.variables,
            instructions: self.instructions,
        }
    }

    fn push_variable(&mut self, variable: Variable) -> VariableId {
        #[allow(clippy::cast_possible_truncation)]
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(variable);
        id
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_instruction_id(&self) -> InstructionId {
        InstructionId(self.instructions.len() as u32)
    }
}

#[cfg(test)]
mod test {
    use crate::program::{InstructionId, Operation, ProgramBuilder};

    #[test]
    fn links_sequential_instructions() {
        let mut builder = ProgramBuilder::new();
        let a = builder.add(Operation::Caller, &[], &[]);
        let b = builder.add(Operation::Stop, &[], &[]);
        let c = builder.add(Operation::JumpDest, &[], &[]);
        let program = builder.build();

        assert_eq!(program.instruction(a).next(), Some(b));
        assert_eq!(program.instruction(b).prev(), Some(a));
        assert_eq!(program.instruction(b).next(), None);
        assert_eq!(program.instruction(c).prev(), None);
    }

    #[test]
    fn method_heads_start_unlinked_and_virtual() {
        let mut builder = ProgramBuilder::new();
        builder.add(Operation::CallValue, &[], &[]);
        let head = builder.add(Operation::MethodHead, &[], &[]);
        let program = builder.build();

        assert_eq!(program.instruction(head).prev(), None);
        assert_eq!(program.instruction(head).raw(), None);
        assert_eq!(program.instruction(InstructionId::new(0)).next(), None);
    }

    #[test]
    fn branches_record_both_directions() {
        let mut builder = ProgramBuilder::new();
        let jump = builder.add(Operation::Jump, &[], &[]);
        let dest = builder.add(Operation::JumpDest, &[], &[]);
        builder.branch(jump, dest);
        let program = builder.build();

        assert_eq!(program.instruction(jump).branches(), &[dest]);
        assert_eq!(program.instruction(dest).incoming(), &[jump]);
    }
}
