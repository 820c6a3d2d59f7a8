//! This module contains the ingestion of the solver's results, mapping the
//! codes it reports back to the nodes of the program.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    constant::{
        COMPLIANCE_SUFFIX,
        FIELD_SEPARATOR,
        PATTERN_NAME_SEPARATOR,
        RESULT_FILE_EXTENSION,
        VIOLATION_SUFFIX,
        WARNINGS_SUFFIX,
    },
    error::solver::{Error, Result},
    registry::{Code, Node, Registry},
};

/// The classification of nodes that the solver produced for one pattern.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Verdicts {
    /// Nodes at which the pattern is known to hold.
    pub compliant: BTreeSet<Node>,

    /// Nodes at which the pattern is violated.
    pub violations: BTreeSet<Node>,

    /// Nodes at which the pattern may be violated.
    pub warnings: BTreeSet<Node>,

    /// Nodes reported as both compliant and violating.
    pub conflicts: BTreeSet<Node>,
}

impl Verdicts {
    /// Builds the verdicts from the three partitions reported by the solver,
    /// computing the conflicts between them.
    #[must_use]
    pub fn new(
        compliant: BTreeSet<Node>,
        violations: BTreeSet<Node>,
        warnings: BTreeSet<Node>,
    ) -> Self {
        let conflicts = violations.intersection(&compliant).copied().collect();
        Self {
            compliant,
            violations,
            warnings,
            conflicts,
        }
    }

    /// Merges the verdicts in `other` into these.
    pub fn extend(&mut self, other: Verdicts) {
        self.compliant.extend(other.compliant);
        self.violations.extend(other.violations);
        self.warnings.extend(other.warnings);
        self.conflicts.extend(other.conflicts);
    }

    /// Checks whether no node was classified at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compliant.is_empty() && self.violations.is_empty() && self.warnings.is_empty()
    }
}

/// Reads the verdicts for the pattern `name` from the solver's `output`
/// directory, translating codes through `registry`.
///
/// # Errors
///
/// If a partition cannot be read, holds a malformed record, or reports a code
/// that was never allocated to a node.
pub fn read_verdicts(output: &Path, name: &str, registry: &Registry) -> Result<Verdicts> {
    let partition = |suffix: &str| -> Result<BTreeSet<Node>> {
        let path = output.join(format!("{name}{suffix}.{RESULT_FILE_EXTENSION}"));
        read_codes(&path)?
            .into_iter()
            .map(|number| {
                Code::from_solver(number)
                    .and_then(|code| registry.node_for(code))
                    .ok_or(Error::UnregisteredCode { code: number })
            })
            .collect()
    };

    let compliant = partition(COMPLIANCE_SUFFIX)?;
    let violations = partition(VIOLATION_SUFFIX)?;
    let warnings = partition(WARNINGS_SUFFIX)?;

    Ok(Verdicts::new(compliant, violations, warnings))
}

/// Reads the first field of every record in the result file at `path`.
///
/// # Errors
///
/// If the file cannot be read or a record does not start with an integer.
pub fn read_codes(path: &Path) -> Result<Vec<i64>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::ReadResults {
        path:    path.to_path_buf(),
        message: e.to_string(),
    })?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let field = line.split(FIELD_SEPARATOR).next().unwrap_or_default();
            field.trim().parse().map_err(|_| Error::MalformedRecord {
                path:   path.to_path_buf(),
                line:   index + 1,
                record: line.to_string(),
            })
        })
        .collect()
}

/// Reads the names of the patterns that the solver's rules declare from the
/// registry file at `path`.
///
/// # Errors
///
/// If the file cannot be read or declares no names.
pub fn read_pattern_names(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::ReadResults {
        path:    path.to_path_buf(),
        message: e.to_string(),
    })?;
    let no_names = || Error::NoPatternNames {
        path: PathBuf::from(path),
    };

    let line = contents.lines().next().ok_or_else(no_names)?;
    let names: Vec<String> = line
        .split(PATTERN_NAME_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    if names.is_empty() {
        return Err(no_names());
    }
    Ok(names)
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::{
        error::solver::Error,
        program::InstructionId,
        registry::{Node, Registry},
        solver::results::{read_codes, read_pattern_names, read_verdicts},
    };

    #[test]
    fn reads_the_first_field_of_each_record() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("PCompliance.csv");
        fs::write(&path, "12\t4\n\n7\n")?;

        assert_eq!(read_codes(&path)?, vec![12, 7]);
        Ok(())
    }

    #[test]
    fn rejects_malformed_records() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("PCompliance.csv");
        fs::write(&path, "1\nabc\n")?;

        assert!(matches!(
            read_codes(&path),
            Err(Error::MalformedRecord { line: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn computes_conflicts_between_partitions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut registry = Registry::new()?;
        let a = registry.node(InstructionId::new(0))?;
        let b = registry.node(InstructionId::new(1))?;
        let c = registry.node(InstructionId::new(2))?;

        fs::write(dir.path().join("PCompliance.csv"), format!("{a}\n{b}\n"))?;
        fs::write(dir.path().join("PViolation.csv"), format!("{b}\n{c}\n"))?;
        fs::write(dir.path().join("PWarnings.csv"), "")?;

        let verdicts = read_verdicts(dir.path(), "P", &registry)?;
        let node = |i| Node::Instruction(InstructionId::new(i));
        assert_eq!(verdicts.conflicts.iter().copied().collect::<Vec<_>>(), vec![node(1)]);
        assert_eq!(verdicts.violations.len(), 2);
        assert!(verdicts.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_codes_are_lookup_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let registry = Registry::new()?;
        fs::write(dir.path().join("PCompliance.csv"), "999\n")?;
        fs::write(dir.path().join("PViolation.csv"), "")?;
        fs::write(dir.path().join("PWarnings.csv"), "")?;

        assert_eq!(
            read_verdicts(dir.path(), "P", &registry),
            Err(Error::UnregisteredCode { code: 999 })
        );
        Ok(())
    }

    #[test]
    fn pattern_names_are_separated_by_commas() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("names.txt");
        fs::write(&path, "DAO , LockedEther , TODAmount\nignored\n")?;
        assert_eq!(read_pattern_names(&path)?, vec!["DAO", "LockedEther", "TODAmount"]);

        fs::write(&path, "")?;
        assert!(matches!(read_pattern_names(&path), Err(Error::NoPatternNames { .. })));
        Ok(())
    }
}
