//! This module contains the representation of a decompiled program that the
//! analysis consumes.
//!
//! The program is an arena: instructions and variables live in flat vectors and
//! refer to one another by index. The analysis never mutates a program once it
//! has been built.

pub mod builder;
pub mod operation;

use std::{
    fmt::{Display, Formatter},
    fs,
    path::Path,
};

use ethnum::U256;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use self::{builder::ProgramBuilder, operation::Operation};
use crate::{error::decompile, utility::U256W};

/// The identity of an instruction within its [`Program`].
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct InstructionId(u32);

impl InstructionId {
    /// Creates an identifier referring to the instruction at `index` in the
    /// arena.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Gets the arena index of the instruction.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Display for InstructionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// The identity of a variable within its [`Program`].
///
/// Two variables are distinct even if they carry the same constant value.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct VariableId(u32);

impl VariableId {
    /// Creates an identifier referring to the variable at `index` in the arena.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Gets the arena index of the variable.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Display for VariableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// An operand of an instruction.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Variable {
    /// The statically-known value of the variable, if constant propagation
    /// could determine one.
    #[serde(default)]
    value: Option<U256W>,
}

impl Variable {
    /// Creates a variable whose value is not known.
    #[must_use]
    pub fn unknown() -> Self {
        Self { value: None }
    }

    /// Creates a variable that is known to hold `value`.
    #[must_use]
    pub fn constant(value: U256) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    /// Gets the constant value of the variable, if known.
    #[must_use]
    pub fn value(&self) -> Option<U256> {
        self.value.map(Into::into)
    }
}

/// A node in the instruction graph.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Instruction {
    operation: Operation,
    #[serde(default)]
    inputs:    Vec<VariableId>,
    #[serde(default)]
    outputs:   Vec<VariableId>,
    #[serde(default)]
    next:      Option<InstructionId>,
    #[serde(default)]
    prev:      Option<InstructionId>,
    #[serde(default)]
    branches:  Vec<InstructionId>,
    #[serde(default)]
    incoming:  Vec<InstructionId>,
    #[serde(default)]
    merge:     Option<InstructionId>,
    #[serde(default)]
    raw:       Option<u32>,
}

impl Instruction {
    /// Creates a new, unlinked instruction performing `operation`.
    #[must_use]
    pub fn new(operation: Operation, inputs: Vec<VariableId>, outputs: Vec<VariableId>) -> Self {
        Self {
            operation,
            inputs,
            outputs,
            next: None,
            prev: None,
            branches: Vec::new(),
            incoming: Vec::new(),
            merge: None,
            raw: None,
        }
    }

    /// Gets the operation performed by the instruction.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Gets the variables read by the instruction.
    #[must_use]
    pub fn inputs(&self) -> &[VariableId] {
        &self.inputs
    }

    /// Gets the variables written by the instruction.
    #[must_use]
    pub fn outputs(&self) -> &[VariableId] {
        &self.outputs
    }

    /// Gets the input at `index`, if present.
    #[must_use]
    pub fn input(&self, index: usize) -> Option<VariableId> {
        self.inputs.get(index).copied()
    }

    /// Gets the output at `index`, if present.
    #[must_use]
    pub fn output(&self, index: usize) -> Option<VariableId> {
        self.outputs.get(index).copied()
    }

    /// Gets the sequentially-next instruction.
    #[must_use]
    pub fn next(&self) -> Option<InstructionId> {
        self.next
    }

    /// Gets the sequentially-previous instruction.
    #[must_use]
    pub fn prev(&self) -> Option<InstructionId> {
        self.prev
    }

    /// Gets the explicit targets of the instruction if it is a branch.
    #[must_use]
    pub fn branches(&self) -> &[InstructionId] {
        &self.branches
    }

    /// Gets the branches that target this instruction.
    #[must_use]
    pub fn incoming(&self) -> &[InstructionId] {
        &self.incoming
    }

    /// Gets the instruction at which both arms of a conditional branch meet
    /// again, if the decompiler resolved one.
    #[must_use]
    pub fn merge(&self) -> Option<InstructionId> {
        self.merge
    }

    /// Gets the number of the instruction in the original bytecode.
    ///
    /// Virtual instructions have none.
    #[must_use]
    pub fn raw(&self) -> Option<u32> {
        self.raw
    }

    /// Gets the target taken by a conditional branch when its condition holds.
    #[must_use]
    pub fn target(&self) -> Option<InstructionId> {
        self.branches.first().copied()
    }

    /// Gets the condition of a conditional branch.
    #[must_use]
    pub fn condition(&self) -> Option<VariableId> {
        match self.operation {
            Operation::JumpI => self.input(1),
            _ => None,
        }
    }

    /// Checks whether the instruction performs `operation`.
    #[must_use]
    pub fn is(&self, operation: Operation) -> bool {
        self.operation == operation
    }
}

/// A decompiled program.
///
/// Deserializing a program validates it in the same way as [`Program::new`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "RawProgram")]
pub struct Program {
    variables:    Vec<Variable>,
    instructions: Vec<Instruction>,
}

/// The arenas of a program as they appear on the wire, before validation.
#[derive(Deserialize)]
struct RawProgram {
    #[serde(default)]
    variables:    Vec<Variable>,
    #[serde(default)]
    instructions: Vec<Instruction>,
}

impl TryFrom<RawProgram> for Program {
    type Error = decompile::Error;

    fn try_from(raw: RawProgram) -> decompile::Result<Self> {
        Self::new(raw.variables, raw.instructions)
    }
}

impl Program {
    /// Creates a program from its arenas, validating that every reference
    /// between them resolves.
    ///
    /// # Errors
    ///
    /// If an instruction refers to a variable or instruction that does not
    /// exist.
    pub fn new(variables: Vec<Variable>, instructions: Vec<Instruction>) -> decompile::Result<Self> {
        let program = Self {
            variables,
            instructions,
        };
        program.validate()?;
        Ok(program)
    }

    /// Parses a program from the JSON document produced by an external
    /// decompiler.
    ///
    /// # Errors
    ///
    /// If the document is not a valid program.
    pub fn from_json(json: &str) -> decompile::Result<Self> {
        let raw: RawProgram = serde_json::from_str(json).map_err(|e| decompile::Error::Malformed {
            message: e.to_string(),
        })?;
        Self::try_from(raw)
    }

    /// Reads a program from the JSON file at `path`.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or does not contain a valid program.
    pub fn from_file(path: impl AsRef<Path>) -> decompile::Result<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| decompile::Error::Malformed {
            message: format!("{:?}: {e}", path.as_ref()),
        })?;
        Self::from_json(&json)
    }

    /// Gets the number of instructions in the program.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Checks if the program has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Gets the instruction identified by `id`.
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this program. Identifiers handed out by the
    /// program and its builder always do.
    #[must_use]
    pub fn instruction(&self, id: InstructionId) -> &Instruction {
        &self.instructions[id.0 as usize]
    }

    /// Gets the variable identified by `id`.
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this program. Identifiers handed out by the
    /// program and its builder always do.
    #[must_use]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    /// Gets the constant value of the variable identified by `id`, if known.
    #[must_use]
    pub fn value_of(&self, id: VariableId) -> Option<U256> {
        self.variable(id).value()
    }

    /// Iterates over the identifiers of every instruction in program order.
    pub fn ids(&self) -> impl Iterator<Item = InstructionId> {
        (0..self.arena_len()).map(InstructionId)
    }

    /// Checks whether the decompiler recovered any methods.
    #[must_use]
    pub fn has_method_heads(&self) -> bool {
        self.instructions.iter().any(|i| i.is(Operation::MethodHead))
    }

    /// Renders the instruction identified by `id` for human consumption.
    #[must_use]
    pub fn describe(&self, id: InstructionId) -> String {
        let instruction = self.instruction(id);
        let operand = |v: &VariableId| match self.value_of(*v) {
            Some(value) => format!("{v}({})", U256W::from(value)),
            None => v.to_string(),
        };
        let inputs = instruction.inputs.iter().map(operand).join(", ");
        let outputs = instruction.outputs.iter().map(operand).join(", ");
        let raw = instruction.raw.map_or_else(|| "-".to_string(), |r| r.to_string());

        if outputs.is_empty() {
            format!("{id} [{raw}]: {}({inputs})", instruction.operation)
        } else {
            format!("{id} [{raw}]: {outputs} = {}({inputs})", instruction.operation)
        }
    }

    /// Renders the whole program, one instruction per line.
    #[must_use]
    pub fn listing(&self) -> String {
        self.ids().map(|id| self.describe(id)).join("\n")
    }

    #[allow(clippy::cast_possible_truncation)] // Arenas are built with u32 indices
    fn arena_len(&self) -> u32 {
        self.instructions.len() as u32
    }

    fn validate(&self) -> decompile::Result<()> {
        let instruction_count = self.instructions.len();
        let variable_count = self.variables.len();

        for (index, instruction) in self.instructions.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let index = index as u32;
            let dangling = |kind, target: u32| decompile::Error::DanglingReference {
                instruction: index,
                kind,
                index: target,
            };

            for variable in instruction.inputs.iter().chain(&instruction.outputs) {
                if variable.0 as usize >= variable_count {
                    return Err(dangling("variable", variable.0));
                }
            }

            let edges = instruction
                .next
                .iter()
                .chain(&instruction.prev)
                .chain(&instruction.branches)
                .chain(&instruction.incoming)
                .chain(&instruction.merge);
            for edge in edges {
                if edge.0 as usize >= instruction_count {
                    return Err(dangling("instruction", edge.0));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        error::decompile,
        program::{InstructionId, Operation, Program, ProgramBuilder},
    };

    #[test]
    fn loads_programs_from_json() -> anyhow::Result<()> {
        let json = r#"{
            "variables": [{ "value": "0x2a" }, {}],
            "instructions": [
                { "operation": "Push", "outputs": [0], "next": 1, "raw": 0 },
                { "operation": "IsZero", "inputs": [0], "outputs": [1], "prev": 0, "raw": 2 }
            ]
        }"#;
        let program = Program::from_json(json)?;

        assert_eq!(program.len(), 2);
        let push = program.instruction(InstructionId::new(0));
        assert!(push.is(Operation::Push));
        assert_eq!(program.value_of(push.outputs()[0]), Some(U256::new(0x2a)));
        assert_eq!(program.instruction(InstructionId::new(1)).raw(), Some(2));

        Ok(())
    }

    #[test]
    fn rejects_dangling_edges() {
        let json = r#"{
            "variables": [],
            "instructions": [{ "operation": "Jump", "branches": [4] }]
        }"#;

        assert_eq!(
            Program::from_json(json),
            Err(decompile::Error::DanglingReference {
                instruction: 0,
                kind:        "instruction",
                index:       4,
            })
        );
    }

    #[test]
    fn deserializing_validates_operands() {
        let json = r#"{
            "variables": [],
            "instructions": [{ "operation": "Add", "inputs": [5], "outputs": [] }]
        }"#;

        let error = serde_json::from_str::<Program>(json)
            .expect_err("the operand refers to a missing variable");
        assert!(error.to_string().contains("refers to variable 5"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            Program::from_json("{ \"instructions\": 3 }"),
            Err(decompile::Error::Malformed { .. })
        ));
    }

    #[test]
    fn listings_show_constants_and_raw_numbers() {
        let mut builder = ProgramBuilder::new();
        let one = builder.constant(U256::ONE);
        let out = builder.variable();
        builder.add(Operation::Not, &[one], &[out]);
        let program = builder.build();

        assert_eq!(program.listing(), "i0 [0]: v1 = NOT(v0(0x1))");
    }
}
