//! This module contains the derivation passes that translate the instructions
//! of an analysis unit into facts.
//!
//! # Passes
//!
//! Each [`DerivationPass`] is handed every instruction of the unit in program
//! order and may emit any number of facts for it. The passes themselves run in
//! the fixed order of their container, as the order in which entities are first
//! seen determines the codes that they are allocated.

pub mod assignment;
pub mod conditional;
pub mod constants;
pub mod control_flow;
pub mod structure;
pub mod typing;

use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    fmt::Debug,
    ops::Deref,
};

use derivative::Derivative;
use ethnum::U256;

use crate::{
    constant::UNRESOLVED_MERGE_LABEL,
    error::{
        container::Locatable,
        derivation::{Error, Result},
    },
    facts::{
        derive::{
            assignment::AssignmentPass,
            conditional::ConditionalPass,
            constants::ConstantPass,
            control_flow::ControlFlowPass,
            structure::StructurePass,
            typing::TypingPass,
        },
        FactBase,
        Field,
        Relation,
    },
    program::{Instruction, InstructionId, Operation, Program, VariableId},
    registry::{Code, Node, Registry},
    unit::AnalysisUnit,
};

/// Derives the facts for `unit` using the default passes, allocating codes in
/// `registry`.
///
/// # Errors
///
/// If any pass fails, in which case no facts are returned.
pub fn derive(unit: &AnalysisUnit<'_>, registry: &mut Registry) -> Result<FactBase> {
    DerivationPasses::default().derive(unit, registry)
}

/// A trait representing a translation from instructions to facts.
pub trait DerivationPass
where
    Self: Any + Debug,
{
    /// Gets a short name for the pass, used when logging.
    fn name(&self) -> &'static str;

    /// Emits the facts for the instruction `id` into `context`.
    ///
    /// Passes may keep state across instructions only through the `context`,
    /// which lives for the duration of one unit.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the instruction is malformed or a code cannot be
    /// allocated.
    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>)
        -> std::result::Result<(), Error>;
}

/// A container for derivation passes that will be run in the **order in which
/// they were added**.
#[derive(Debug)]
pub struct DerivationPasses {
    passes: Vec<PassItem>,
}

impl DerivationPasses {
    /// Constructs a new, empty container.
    #[must_use]
    pub fn new() -> Self {
        let passes = Vec::new();
        Self { passes }
    }

    /// Adds the `pass` to the end of the ordering.
    ///
    /// If a pass of the given type already exists in the ordering, it will not
    /// be added.
    pub fn add<P: DerivationPass>(&mut self, pass: P) {
        let item = PassItem::new(pass);
        if !self.passes.contains(&item) {
            self.passes.push(item);
        }
    }

    /// Gets the number of passes in the container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Checks whether the container holds no passes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Runs every pass over every instruction of `unit`, returning the facts
    /// that they derive.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any pass fails, located at the instruction being
    /// processed.
    pub fn derive(&self, unit: &AnalysisUnit<'_>, registry: &mut Registry) -> Result<FactBase> {
        let mut context = DerivationContext::new(unit, registry);
        let unknown = context.unknown().locate(0)?;
        context.add(Relation::Unk, [unknown.into()]);

        for pass in &self.passes {
            context.registry.mark_section().map_err(Error::from).locate(0)?;
            for id in unit.instructions() {
                pass.derive(id, &mut context).locate(id.index())?;
            }
            tracing::debug!(pass = pass.name(), "derivation pass complete");
        }
        context.registry.flush().map_err(Error::from).locate(0)?;

        let facts = context.facts;
        tracing::debug!(facts = facts.len(), instructions = unit.len(), "derived facts");
        Ok(facts)
    }
}

impl Default for DerivationPasses {
    fn default() -> Self {
        // The order here fixes the order of code allocation
        let mut passes = Self::new();
        passes.add(AssignmentPass);
        passes.add(TypingPass);
        passes.add(StructurePass);
        passes.add(ConstantPass);
        passes.add(ControlFlowPass);
        passes.add(ConditionalPass);

        passes
    }
}

/// An internal type that lets the container recognise passes of the same type.
#[derive(Debug, Derivative)]
#[derivative(Eq, PartialEq)]
struct PassItem {
    /// A field used to compare the derivation passes.
    pub key: TypeId,

    /// The derivation pass itself.
    #[derivative(PartialEq = "ignore")]
    pub pass: Box<dyn DerivationPass>,
}

impl PassItem {
    /// Constructs a new derivation pass item.
    pub fn new<P: DerivationPass>(pass: P) -> Self {
        let key = TypeId::of::<P>();
        let pass = Box::new(pass);

        Self { key, pass }
    }
}

/// Allow deref-coercions from the pass item to the pass it contains for ease
/// of use internally.
impl Deref for PassItem {
    type Target = Box<dyn DerivationPass>;

    fn deref(&self) -> &Self::Target {
        &self.pass
    }
}

/// The state shared by the derivation passes while they process one analysis
/// unit.
#[derive(Debug)]
pub struct DerivationContext<'a, 'p> {
    program:  &'p Program,
    registry: &'a mut Registry,
    facts:    FactBase,

    /// The sentinel merge node allocated for each conditional branch without
    /// a resolved merge point.
    sentinels: HashMap<InstructionId, Node>,

    /// The jump destinations whose join chain has been emitted.
    joined: HashSet<InstructionId>,

    /// The constant variables for which facts have been emitted.
    constants: HashSet<VariableId>,
}

impl<'a, 'p> DerivationContext<'a, 'p> {
    /// Creates a context for deriving the facts of `unit`.
    pub fn new(unit: &AnalysisUnit<'p>, registry: &'a mut Registry) -> Self {
        Self {
            program: unit.program(),
            registry,
            facts: FactBase::new(),
            sentinels: HashMap::new(),
            joined: HashSet::new(),
            constants: HashSet::new(),
        }
    }

    /// Gets the program being translated.
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Gets the instruction identified by `id`.
    #[must_use]
    pub fn instruction(&self, id: InstructionId) -> &'p Instruction {
        self.program.instruction(id)
    }

    /// Gets the constant value of `variable`, if known.
    #[must_use]
    pub fn value(&self, variable: VariableId) -> Option<U256> {
        self.program.value_of(variable)
    }

    /// Gets the facts derived so far.
    #[must_use]
    pub fn facts(&self) -> &FactBase {
        &self.facts
    }

    /// Appends a fact to `relation`.
    pub fn add(&mut self, relation: Relation, fields: impl IntoIterator<Item = Field>) {
        self.facts.add(relation, fields);
    }

    /// Gets the code of `variable`.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn var(&mut self, variable: VariableId) -> std::result::Result<Code, Error> {
        Ok(self.registry.variable(variable)?)
    }

    /// Gets the code of `node`.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn node(&mut self, node: impl Into<Node>) -> std::result::Result<Code, Error> {
        Ok(self.registry.node(node)?)
    }

    /// Gets the code of the type tag for `operation`.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn type_tag(&mut self, operation: Operation) -> std::result::Result<Code, Error> {
        Ok(self.registry.type_tag(operation)?)
    }

    /// Gets the code of the "unknown" constant.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn unknown(&mut self) -> std::result::Result<Code, Error> {
        Ok(self.registry.unknown()?)
    }

    /// Creates a new synthetic node described by `label`.
    pub fn synthetic(&mut self, label: impl Into<String>) -> Node {
        self.registry.synthetic(label)
    }

    /// Gets the sentinel merge node standing in for the unresolved merge point
    /// of the conditional branch `branch`.
    ///
    /// Each branch receives its own sentinel.
    pub fn sentinel(&mut self, branch: InstructionId) -> Node {
        if let Some(node) = self.sentinels.get(&branch) {
            return *node;
        }
        let node = self.registry.synthetic(UNRESOLVED_MERGE_LABEL);
        self.sentinels.insert(branch, node);
        node
    }

    /// Gets the merge node for the conditional branch `branch`: its resolved
    /// merge instruction or, failing that, its sentinel.
    pub fn merge_or_sentinel(&mut self, branch: InstructionId) -> Node {
        match self.instruction(branch).merge() {
            Some(merge) => merge.into(),
            None => self.sentinel(branch),
        }
    }

    /// Records that the join chain for `destination` is being emitted,
    /// returning `false` if it already was.
    pub fn mark_joined(&mut self, destination: InstructionId) -> bool {
        self.joined.insert(destination)
    }

    /// Records that the facts for the constant `variable` are being emitted,
    /// returning `false` if they already were.
    pub fn mark_constant(&mut self, variable: VariableId) -> bool {
        self.constants.insert(variable)
    }

    /// Gets the input of `id` at `index`, named `role` should it be missing.
    ///
    /// # Errors
    ///
    /// If the instruction has no such input.
    pub fn input(
        &self,
        id: InstructionId,
        index: usize,
        role: &'static str,
    ) -> std::result::Result<VariableId, Error> {
        let instruction = self.instruction(id);
        instruction.input(index).ok_or(Error::MissingOperand {
            operation: instruction.operation(),
            role,
        })
    }

    /// Gets the output of `id` at `index`, named `role` should it be missing.
    ///
    /// # Errors
    ///
    /// If the instruction has no such output.
    pub fn output(
        &self,
        id: InstructionId,
        index: usize,
        role: &'static str,
    ) -> std::result::Result<VariableId, Error> {
        let instruction = self.instruction(id);
        instruction.output(index).ok_or(Error::MissingOperand {
            operation: instruction.operation(),
            role,
        })
    }
}


#[cfg(test)]
mod test {
    use crate::{
        facts::{
            derive::{assignment::AssignmentPass, DerivationPasses},
            Relation,
        },
        program::{Operation, ProgramBuilder},
        registry::Registry,
        unit::AnalysisUnit,
    };

    #[test]
    fn passes_are_not_duplicated() {
        let mut passes = DerivationPasses::default();
        let count = passes.len();
        passes.add(AssignmentPass);
        assert_eq!(passes.len(), count);
    }

    #[test]
    fn always_emits_the_unknown_constant() -> anyhow::Result<()> {
        let program = ProgramBuilder::new().build();
        let mut registry = Registry::new()?;
        let facts = DerivationPasses::new().derive(&AnalysisUnit::contract(&program), &mut registry)?;

        let unknown = registry.unknown()?;
        assert!(facts.contains(Relation::Unk, &[unknown.into()]));
        assert_eq!(facts.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_operands_are_located() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        builder.add(Operation::Stop, &[], &[]);
        builder.add(Operation::JumpI, &[], &[]);
        let program = builder.build();
        let mut registry = Registry::new()?;

        let result = DerivationPasses::default().derive(&AnalysisUnit::contract(&program), &mut registry);
        let error = result.expect_err("a branch without a condition is malformed");
        assert_eq!(error.location, 1);
        Ok(())
    }
}
