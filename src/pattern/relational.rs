//! This module contains the pattern whose verdicts are computed entirely by
//! the solver's rules.

use crate::{
    dataflow::Dataflow,
    error::pattern::Result,
    pattern::{Pattern, PatternKind},
    solver::Verdicts,
    unit::AnalysisUnit,
};

/// A pattern evaluated by the solver, whose verdicts are read from the result
/// partitions named after it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationalPattern {
    name: String,
    kind: PatternKind,
}

impl RelationalPattern {
    /// Creates a pattern reading the solver's results for `name`.
    pub fn new(name: impl Into<String>, kind: PatternKind) -> Self {
        let name = name.into();
        Self { name, kind }
    }
}

impl Pattern for RelationalPattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PatternKind {
        self.kind
    }

    fn check(
        &self,
        unit: &AnalysisUnit<'_>,
        dataflow: &Dataflow,
        findings: &mut Verdicts,
    ) -> Result<()> {
        let verdicts = dataflow.verdicts(&self.name)?;
        tracing::debug!(
            pattern = %self.name,
            instructions = unit.len(),
            violations = verdicts.violations.len(),
            warnings = verdicts.warnings.len(),
            "checked pattern"
        );
        findings.extend(verdicts);
        Ok(())
    }
}
