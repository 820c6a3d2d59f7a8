//! This module contains the [`Dataflow`]: the result of evaluating the
//! vulnerability patterns over the facts of one analysis unit.

use std::{collections::BTreeMap, time::Duration};

use crate::{
    constant::CODE_MAP_FILE_NAME,
    error,
    facts::derive::derive,
    registry::Registry,
    solver,
    solver::{read_pattern_names, read_verdicts, Verdicts, Workspace},
    unit::AnalysisUnit,
};

/// A completed solver run over one analysis unit.
///
/// The dataflow owns the registry that assigned the unit's codes, so that the
/// solver's results can be mapped back to the program, and the workspace
/// holding those results. The workspace is removed when the dataflow is
/// dropped.
#[derive(Debug)]
pub struct Dataflow {
    registry:      Registry,
    pattern_names: Vec<String>,
    fact_count:    usize,
    elapsed:       Duration,
    workspace:     Workspace,
}

impl Dataflow {
    /// Derives the facts of `unit` and runs the solver configured by `config`
    /// over them.
    ///
    /// # Errors
    ///
    /// If the facts cannot be derived or written, or if the solver fails.
    pub fn compute(unit: &AnalysisUnit<'_>, config: &solver::Config) -> error::Result<Self> {
        let workspace = Workspace::create(&config.workspace_root)?;
        let mut registry = if config.code_map {
            Registry::with_audit_log(workspace.output().join(CODE_MAP_FILE_NAME))?
        } else {
            Registry::new()?
        };

        let facts = derive(unit, &mut registry)?;
        facts.write_to(workspace.input())?;
        let elapsed = solver::run(config, &workspace)?;
        let pattern_names = read_pattern_names(&config.pattern_names)?;

        tracing::debug!(
            instructions = unit.len(),
            facts = facts.len(),
            codes = registry.allocated(),
            "computed dataflow"
        );

        Ok(Self {
            registry,
            pattern_names,
            fact_count: facts.len(),
            elapsed,
            workspace,
        })
    }

    /// Gets the names of the patterns that the solver declares.
    #[must_use]
    pub fn pattern_names(&self) -> &[String] {
        &self.pattern_names
    }

    /// Checks whether the solver declares the pattern `name`.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.pattern_names.iter().any(|n| n == name)
    }

    /// Reads the verdicts that the solver reached for the pattern `name`.
    ///
    /// # Errors
    ///
    /// If the pattern is not declared by the solver, or its results cannot be
    /// read.
    pub fn verdicts(&self, name: &str) -> error::solver::Result<Verdicts> {
        if !self.declares(name) {
            return Err(error::solver::Error::UndeclaredPattern {
                name: name.to_string(),
            });
        }
        read_verdicts(self.workspace.output(), name, &self.registry)
    }

    /// Reads the verdicts for every pattern that the solver declares.
    ///
    /// # Errors
    ///
    /// If any pattern's results cannot be read.
    pub fn all_verdicts(&self) -> error::solver::Result<BTreeMap<String, Verdicts>> {
        self.pattern_names
            .iter()
            .map(|name| Ok((name.clone(), self.verdicts(name)?)))
            .collect()
    }

    /// Gets the registry that assigned the codes of this dataflow.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gets the number of facts handed to the solver.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.fact_count
    }

    /// Gets the time the solver took.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Gets the workspace holding the solver's inputs and results.
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}
