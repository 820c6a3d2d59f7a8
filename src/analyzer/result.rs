//! This module contains the record of the analysis of a single contract, as
//! reported to the user and mirrored to the progress snapshot.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use serde::{Deserialize, Serialize};

use crate::{program::Program, registry::Node, solver::Verdicts};

/// The result of analysing one contract.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractResult {
    /// Whether the contract's bytecode was decompiled.
    pub decompiled: bool,

    /// Whether the analysis has run to its end.
    pub finished: bool,

    /// The results of each selected pattern, by name.
    pub pattern_results: BTreeMap<String, PatternResult>,

    /// The errors encountered along the way, in the order they occurred.
    pub errors: Vec<CapturedError>,
}

impl ContractResult {
    /// Adds every pattern in `names` to the record as not yet completed.
    ///
    /// Patterns already present are left as they are.
    pub fn open_patterns<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.pattern_mut(name);
        }
    }

    /// Gets the result of the pattern called `name`.
    #[must_use]
    pub fn pattern(&self, name: &str) -> Option<&PatternResult> {
        self.pattern_results.get(name)
    }

    /// Gets the result of the pattern called `name`, creating it if it is not
    /// yet present.
    pub fn pattern_mut(&mut self, name: &str) -> &mut PatternResult {
        self.pattern_results.entry(name.to_string()).or_default()
    }

    /// Records `error` as having occurred during `stage`.
    pub fn capture(&mut self, stage: impl Into<String>, error: &impl Display) {
        let stage = stage.into();
        let summary = error.to_string();
        self.errors.push(CapturedError { stage, summary });
    }
}

/// The result of checking one pattern against a contract.
///
/// Instructions are reported by their raw instruction number in the bytecode.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternResult {
    /// Whether the pattern has been checked against every unit that it
    /// applies to.
    pub completed: bool,

    /// The first error reported for the pattern, if any.
    pub error: Option<String>,

    pub violations: BTreeSet<u32>,
    pub warnings:   BTreeSet<u32>,
    pub safe:       BTreeSet<u32>,
    pub conflicts:  BTreeSet<u32>,
}

impl PatternResult {
    /// Adds the nodes classified in `findings` to the result.
    ///
    /// Nodes without a raw instruction number in `program` are not reported.
    pub fn record(&mut self, program: &Program, findings: &Verdicts) {
        let raw = |nodes: &BTreeSet<Node>| -> Vec<u32> {
            nodes
                .iter()
                .filter_map(Node::instruction)
                .filter_map(|id| program.instruction(id).raw())
                .collect()
        };

        self.violations.extend(raw(&findings.violations));
        self.warnings.extend(raw(&findings.warnings));
        self.safe.extend(raw(&findings.compliant));
        self.conflicts.extend(raw(&findings.conflicts));
    }

    /// Sets the error of the pattern to `message`, unless one has already been
    /// set.
    pub fn set_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }
}

/// An error captured during the analysis of a contract.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CapturedError {
    /// The tag of the stage in which the error occurred.
    pub stage: String,

    /// A human-readable description of the error.
    pub summary: String,
}
