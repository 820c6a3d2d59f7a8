//! This module contains the catalogue of vulnerability patterns that the
//! analyzer checks.
//!
//! # Classification
//!
//! How a pattern is scheduled is decided once, when it is registered with the
//! [`Catalogue`], from the [`PatternKind`] it reports:
//!
//! - Instruction-local patterns are checked against each recovered method on
//!   its own.
//! - Contract-global patterns are always checked against the whole contract.
//! - Patterns that require method recovery cannot be checked on contracts
//!   whose methods were not recovered.

pub mod relational;

use std::fmt::Debug;

use itertools::Itertools;

pub use self::relational::RelationalPattern;
use crate::{
    constant::{DEFAULT_CONTRACT_GLOBAL_PATTERNS, DEFAULT_METHOD_RECOVERY_PATTERNS},
    dataflow::Dataflow,
    error::{pattern::Result, solver},
    solver::{read_pattern_names, Verdicts},
    unit::AnalysisUnit,
};

/// The portion of the program that a pattern needs to see at once.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scope {
    /// The pattern can be decided within a single method.
    InstructionLocal,

    /// The pattern must see the whole contract.
    ContractGlobal,
}

/// The scheduling requirements of a pattern.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PatternKind {
    /// The portion of the program the pattern is checked against.
    pub scope: Scope,

    /// Whether the pattern can only be checked once methods are recovered.
    pub requires_method_recovery: bool,
}

impl PatternKind {
    /// A pattern checked per method that also works without methods.
    #[must_use]
    pub fn instruction_local() -> Self {
        Self {
            scope:                    Scope::InstructionLocal,
            requires_method_recovery: false,
        }
    }

    /// A pattern checked against the whole contract.
    #[must_use]
    pub fn contract_global() -> Self {
        Self {
            scope:                    Scope::ContractGlobal,
            requires_method_recovery: false,
        }
    }

    /// Marks the pattern as requiring recovered methods.
    #[must_use]
    pub fn with_method_recovery(mut self) -> Self {
        self.requires_method_recovery = true;
        self
    }
}

/// A trait representing a vulnerability pattern that classifies the
/// instructions of an analysis unit.
pub trait Pattern
where
    Self: Debug,
{
    /// Gets the name of the pattern, under which its results are reported.
    fn name(&self) -> &str;

    /// Gets the scheduling requirements of the pattern.
    ///
    /// This is consulted once, when the pattern is registered.
    fn kind(&self) -> PatternKind;

    /// Checks the pattern against `unit`, using the solver results in
    /// `dataflow`, and records the classified nodes in `findings`.
    ///
    /// Findings recorded before an error is returned are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the pattern cannot be checked against the unit.
    fn check(
        &self,
        unit: &AnalysisUnit<'_>,
        dataflow: &Dataflow,
        findings: &mut Verdicts,
    ) -> Result<()>;
}

/// A pattern registered in a [`Catalogue`], along with its classification.
#[derive(Debug)]
pub struct Entry {
    kind:    PatternKind,
    pattern: Box<dyn Pattern>,
}

impl Entry {
    /// Gets the name of the pattern.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pattern.name()
    }

    /// Gets the classification captured when the pattern was registered.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Gets the pattern itself.
    #[must_use]
    pub fn pattern(&self) -> &dyn Pattern {
        self.pattern.as_ref()
    }
}

/// The set of patterns available to the analyzer, in registration order.
#[derive(Debug, Default)]
pub struct Catalogue {
    entries: Vec<Entry>,
}

impl Catalogue {
    /// Constructs an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalogue of [`RelationalPattern`]s for every name in `names`,
    /// classifying those named in `contract_global` and `method_recovery`
    /// accordingly.
    #[must_use]
    pub fn relational(
        names: impl IntoIterator<Item = impl Into<String>>,
        contract_global: &[&str],
        method_recovery: &[&str],
    ) -> Self {
        let mut catalogue = Self::new();
        for name in names {
            let name = name.into();
            let mut kind = if contract_global.contains(&name.as_str()) {
                PatternKind::contract_global()
            } else {
                PatternKind::instruction_local()
            };
            if method_recovery.contains(&name.as_str()) {
                kind = kind.with_method_recovery();
            }
            catalogue.add(RelationalPattern::new(name, kind));
        }

        catalogue
    }

    /// Builds the catalogue of every pattern declared by the solver configured
    /// in `config`, using the default classification.
    ///
    /// # Errors
    ///
    /// If the pattern name registry cannot be read.
    pub fn from_solver(config: &crate::solver::Config) -> solver::Result<Self> {
        let names = read_pattern_names(&config.pattern_names)?;
        Ok(Self::relational(
            names,
            &DEFAULT_CONTRACT_GLOBAL_PATTERNS,
            &DEFAULT_METHOD_RECOVERY_PATTERNS,
        ))
    }

    /// Registers `pattern`, capturing its classification.
    ///
    /// If a pattern with the same name is already registered, it will not be
    /// added.
    pub fn add<P: Pattern + 'static>(&mut self, pattern: P) {
        if self.get(pattern.name()).is_some() {
            tracing::warn!(name = pattern.name(), "pattern registered twice");
            return;
        }
        let kind = pattern.kind();
        let pattern = Box::new(pattern);
        self.entries.push(Entry { kind, pattern });
    }

    /// Gets the entry for the pattern called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Gets the registered patterns.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Gets the names of the registered patterns.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Entry::name).collect()
    }

    /// Gets the number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether no patterns are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the entries selected by `filter`, compared case-insensitively, or
    /// every entry if there is no filter.
    ///
    /// Names in the filter that match no pattern are reported and ignored.
    #[must_use]
    pub fn select(&self, filter: Option<&[String]>) -> Vec<&Entry> {
        let Some(filter) = filter else {
            return self.entries.iter().collect();
        };

        let wanted = filter.iter().map(|n| n.to_lowercase()).collect_vec();
        for name in &wanted {
            if !self.entries.iter().any(|e| &e.name().to_lowercase() == name) {
                tracing::warn!(%name, "no pattern matches the requested name");
            }
        }

        self.entries
            .iter()
            .filter(|e| wanted.contains(&e.name().to_lowercase()))
            .collect()
    }
}
