//! This module contains the identifier registry, which hands out the integer
//! codes under which every entity of a program is known to the solver.
//!
//! The registry owns four bijections, one per entity category: variables, nodes
//! (instructions and synthetic merge nodes), operation type tags, and integer
//! constants. Codes are drawn from a single monotonic counter shared by all
//! categories, so the mapping from entities to codes is injective across the
//! whole registry. Code `0` is reserved for the integer constant `0`.

use std::{
    fmt::{Display, Formatter},
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use bimap::BiMap;
use derivative::Derivative;

use crate::{
    constant::{FIRST_ALLOCATED_CODE, MAX_CODE, UNKNOWN_CONSTANT, ZERO_CONSTANT_CODE},
    error::registry::{Error, Result},
    program::{InstructionId, Operation, VariableId},
};

/// The operation type tags that are allocated codes when a registry is created,
/// in allocation order.
pub const SEEDED_TYPE_TAGS: [Operation; 4] = [
    Operation::CallDataLoad,
    Operation::SLoad,
    Operation::Balance,
    Operation::Caller,
];

/// An integer identifier, as understood by the solver.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Code(u32);

impl Code {
    /// The code of the integer constant `0`.
    pub const ZERO: Code = Code(ZERO_CONSTANT_CODE);

    /// Gets the numeric value of the code.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Interprets a number reported by the solver as a code.
    #[must_use]
    pub fn from_solver(number: i64) -> Option<Self> {
        u32::try_from(number).ok().map(Self)
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a synthetic node created during fact derivation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SyntheticId(u32);

impl SyntheticId {
    /// Creates the identity of the synthetic node numbered `index`.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Gets the number of the synthetic node.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// A point in the control-flow graph as seen by the solver.
///
/// Synthetic nodes stand in for merge points that do not exist in the program
/// and never correspond to a raw instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Node {
    Instruction(InstructionId),
    Synthetic(SyntheticId),
}

impl Node {
    /// Gets the instruction that this node refers to, if it is not synthetic.
    #[must_use]
    pub fn instruction(&self) -> Option<InstructionId> {
        match self {
            Self::Instruction(id) => Some(*id),
            Self::Synthetic(_) => None,
        }
    }
}

impl From<InstructionId> for Node {
    fn from(value: InstructionId) -> Self {
        Self::Instruction(value)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instruction(id) => write!(f, "{id}"),
            Self::Synthetic(SyntheticId(id)) => write!(f, "s{id}"),
        }
    }
}

/// The registry of codes for a single analysis unit.
///
/// # Auditing
///
/// When created with [`Registry::with_audit_log`], every first-time allocation
/// is appended to a plain-text code map so that the facts handed to the solver
/// can be related back to the program by hand.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Registry {
    /// The next code to be allocated.
    counter: u32,

    /// The largest value that the counter may reach.
    limit: u32,

    variables: BiMap<VariableId, Code>,
    nodes:     BiMap<Node, Code>,
    types:     BiMap<Operation, Code>,
    constants: BiMap<i64, Code>,

    /// The human-readable labels of the synthetic nodes, indexed by their
    /// identifiers.
    synthetic_labels: Vec<String>,

    #[derivative(Debug = "ignore")]
    audit: Option<AuditLog>,
}

impl Registry {
    /// Creates a new registry, seeding it with the reserved and well-known
    /// codes.
    ///
    /// # Errors
    ///
    /// Only if the seed codes cannot be allocated, which requires a limit far
    /// below the default.
    pub fn new() -> Result<Self> {
        Self::create(MAX_CODE, None)
    }

    /// Creates a new registry that records each allocation in a code map at
    /// `path`.
    ///
    /// # Errors
    ///
    /// If the code map cannot be created.
    pub fn with_audit_log(path: impl AsRef<Path>) -> Result<Self> {
        let audit = AuditLog::create(path.as_ref())?;
        Self::create(MAX_CODE, Some(audit))
    }

    fn create(limit: u32, audit: Option<AuditLog>) -> Result<Self> {
        let mut constants = BiMap::new();
        constants.insert(0, Code::ZERO);

        let mut registry = Self {
            counter: FIRST_ALLOCATED_CODE,
            limit,
            variables: BiMap::new(),
            nodes: BiMap::new(),
            types: BiMap::new(),
            constants,
            synthetic_labels: Vec::new(),
            audit,
        };

        for tag in SEEDED_TYPE_TAGS {
            registry.type_tag(tag)?;
        }
        registry.constant(UNKNOWN_CONSTANT)?;

        Ok(registry)
    }

    /// Gets the code of the variable `id`, allocating one if needed.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn variable(&mut self, id: VariableId) -> Result<Code> {
        if let Some(code) = self.variables.get_by_left(&id) {
            return Ok(*code);
        }
        let code = self.allocate(&id, "variable")?;
        self.variables.insert(id, code);
        Ok(code)
    }

    /// Gets the code of the node `node`, allocating one if needed.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn node(&mut self, node: impl Into<Node>) -> Result<Code> {
        let node = node.into();
        if let Some(code) = self.nodes.get_by_left(&node) {
            return Ok(*code);
        }
        let label = self.describe(node);
        let code = self.allocate(&label, "node")?;
        self.nodes.insert(node, code);
        Ok(code)
    }

    /// Gets the code of the type tag for `operation`, allocating one if
    /// needed.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn type_tag(&mut self, operation: Operation) -> Result<Code> {
        if let Some(code) = self.types.get_by_left(&operation) {
            return Ok(*code);
        }
        let code = self.allocate(&operation, "type")?;
        self.types.insert(operation, code);
        Ok(code)
    }

    /// Gets the code of the integer constant `value`, allocating one if
    /// needed.
    ///
    /// # Errors
    ///
    /// If the code space is exhausted.
    pub fn constant(&mut self, value: i64) -> Result<Code> {
        if let Some(code) = self.constants.get_by_left(&value) {
            return Ok(*code);
        }
        let code = self.allocate(&value, "constant")?;
        self.constants.insert(value, code);
        Ok(code)
    }

    /// Gets the code of the "unknown" constant.
    ///
    /// # Errors
    ///
    /// Never in practice, as the constant is seeded on creation.
    pub fn unknown(&mut self) -> Result<Code> {
        self.constant(UNKNOWN_CONSTANT)
    }

    /// Creates a new synthetic node described by `label`.
    ///
    /// The node receives its code on first use, like any other node.
    pub fn synthetic(&mut self, label: impl Into<String>) -> Node {
        #[allow(clippy::cast_possible_truncation)]
        let id = SyntheticId(self.synthetic_labels.len() as u32);
        self.synthetic_labels.push(label.into());
        Node::Synthetic(id)
    }

    /// Gets the label of the synthetic node `id`.
    #[must_use]
    pub fn synthetic_label(&self, id: SyntheticId) -> Option<&str> {
        self.synthetic_labels.get(id.0 as usize).map(String::as_str)
    }

    /// Gets the node to which `code` was allocated, if any.
    #[must_use]
    pub fn node_for(&self, code: Code) -> Option<Node> {
        self.nodes.get_by_right(&code).copied()
    }

    /// Gets the variable to which `code` was allocated, if any.
    #[must_use]
    pub fn variable_for(&self, code: Code) -> Option<VariableId> {
        self.variables.get_by_right(&code).copied()
    }

    /// Gets the number of codes allocated so far, including the reserved code
    /// for `0`.
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.counter
    }

    /// Writes a separator to the code map, delimiting the allocations made by
    /// successive derivation passes.
    ///
    /// # Errors
    ///
    /// If the code map cannot be written.
    pub fn mark_section(&mut self) -> Result<()> {
        match self.audit.as_mut() {
            Some(audit) => audit.separator(),
            None => Ok(()),
        }
    }

    /// Flushes any buffered audit output.
    ///
    /// # Errors
    ///
    /// If the code map cannot be written.
    pub fn flush(&mut self) -> Result<()> {
        match self.audit.as_mut() {
            Some(audit) => audit.flush(),
            None => Ok(()),
        }
    }

    fn allocate(&mut self, entity: &dyn Display, category: &str) -> Result<Code> {
        if self.counter >= self.limit {
            return Err(Error::Exhausted { limit: self.limit });
        }
        let code = Code(self.counter);
        self.counter += 1;

        tracing::trace!(%entity, %code, category, "allocated code");
        if let Some(audit) = self.audit.as_mut() {
            audit.record(entity, code, category)?;
        }

        Ok(code)
    }

    fn describe(&self, node: Node) -> String {
        match node {
            Node::Instruction(id) => id.to_string(),
            Node::Synthetic(id) => match self.synthetic_label(id) {
                Some(label) => format!("{node}<{label}>"),
                None => node.to_string(),
            },
        }
    }
}

/// The plain-text code map written alongside a solver run.
struct AuditLog {
    path:   PathBuf,
    writer: BufWriter<File>,
}

impl AuditLog {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| Self::error(path, &e))?;
        Ok(Self {
            path:   path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn record(&mut self, entity: &dyn Display, code: Code, category: &str) -> Result<()> {
        writeln!(self.writer, "{entity} {code} {category}").map_err(|e| Self::error(&self.path, &e))
    }

    fn separator(&mut self) -> Result<()> {
        writeln!(self.writer, "{}", "-".repeat(40)).map_err(|e| Self::error(&self.path, &e))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Self::error(&self.path, &e))
    }

    fn error(path: &Path, error: &std::io::Error) -> Error {
        Error::AuditLog {
            path:    path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
impl Registry {
    /// Creates a registry whose counter may not reach `limit`.
    pub(crate) fn with_limit(limit: u32) -> Result<Self> {
        Self::create(limit, None)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::{
        error::registry::Error,
        program::{InstructionId, Operation, VariableId},
        registry::{Code, Node, Registry},
    };

    #[test]
    fn zero_is_always_code_zero() -> anyhow::Result<()> {
        let mut registry = Registry::new()?;
        assert_eq!(registry.constant(0)?, Code::ZERO);
        assert_eq!(registry.constant(0)?.value(), 0);
        Ok(())
    }

    #[test]
    fn seeds_are_allocated_in_order() -> anyhow::Result<()> {
        let mut registry = Registry::new()?;
        assert_eq!(registry.type_tag(Operation::CallDataLoad)?.value(), 1);
        assert_eq!(registry.type_tag(Operation::SLoad)?.value(), 2);
        assert_eq!(registry.type_tag(Operation::Balance)?.value(), 3);
        assert_eq!(registry.type_tag(Operation::Caller)?.value(), 4);
        assert_eq!(registry.unknown()?.value(), 5);
        assert_eq!(registry.allocated(), 6);
        Ok(())
    }

    #[test]
    fn codes_are_stable_and_injective() -> anyhow::Result<()> {
        let mut registry = Registry::new()?;
        let mut seen = HashSet::new();

        for i in 0..50 {
            let variable = registry.variable(VariableId::new(i))?;
            let node = registry.node(InstructionId::new(i))?;
            let constant = registry.constant(i64::from(i) + 100)?;
            assert!(seen.insert(variable));
            assert!(seen.insert(node));
            assert!(seen.insert(constant));
        }

        for i in 0..50 {
            let node = registry.node(InstructionId::new(i))?;
            assert_eq!(registry.node_for(node), Some(Node::Instruction(InstructionId::new(i))));
            let variable = registry.variable(VariableId::new(i))?;
            assert_eq!(registry.variable_for(variable), Some(VariableId::new(i)));
        }

        Ok(())
    }

    #[test]
    fn synthetic_nodes_are_distinct() -> anyhow::Result<()> {
        let mut registry = Registry::new()?;
        let a = registry.synthetic("BLACKHOLE");
        let b = registry.synthetic("BLACKHOLE");
        assert_ne!(a, b);
        assert_ne!(registry.node(a)?, registry.node(b)?);
        assert_eq!(a.instruction(), None);
        Ok(())
    }

    #[test]
    fn exhaustion_is_reported() -> anyhow::Result<()> {
        let mut registry = Registry::with_limit(7)?;
        registry.variable(VariableId::new(0))?;
        assert_eq!(
            registry.variable(VariableId::new(1)),
            Err(Error::Exhausted { limit: 7 })
        );

        // Existing entities are still resolvable.
        assert_eq!(registry.variable(VariableId::new(0))?.value(), 6);
        Ok(())
    }

    #[test]
    fn audit_log_records_allocations() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("codes.txt");
        let mut registry = Registry::with_audit_log(&path)?;
        registry.mark_section()?;
        registry.node(InstructionId::new(3))?;
        registry.flush()?;

        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.contains("CALLDATALOAD 1 type"));
        assert!(contents.contains("i3 6 node"));
        assert!(contents.contains("-----"));
        Ok(())
    }
}
