//! This module contains the analysis units into which a program is divided
//! before its facts are derived.
//!
//! A unit is either the whole contract or the body of a single recovered
//! method. Bodies are contiguous runs of the program, each beginning at a
//! method head, so that every instruction belongs to exactly one body.

use std::ops::Range;

use crate::program::{InstructionId, Operation, Program};

/// The scope covered by an [`AnalysisUnit`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnitKind {
    /// Every instruction of the program.
    Contract,

    /// The body of one method.
    ///
    /// The body preceding the first method head has no head of its own and
    /// holds the contract's entry code.
    Method { head: Option<InstructionId> },
}

/// A set of instructions that is analysed with a single solver run.
#[derive(Clone, Debug)]
pub struct AnalysisUnit<'p> {
    program: &'p Program,
    range:   Range<u32>,
    kind:    UnitKind,
}

impl<'p> AnalysisUnit<'p> {
    /// Creates a unit covering all of `program`.
    #[must_use]
    pub fn contract(program: &'p Program) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let range = 0..program.len() as u32;
        let kind = UnitKind::Contract;
        Self {
            program,
            range,
            kind,
        }
    }

    /// Gets the program that the unit is a part of.
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Gets the kind of the unit.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Iterates over the instructions of the unit in program order.
    pub fn instructions(&self) -> impl Iterator<Item = InstructionId> {
        self.range.clone().map(InstructionId::new)
    }

    /// Checks whether the unit contains the instruction `id`.
    #[must_use]
    pub fn contains(&self, id: InstructionId) -> bool {
        self.range.contains(&id.index())
    }

    /// Gets the number of instructions in the unit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Checks whether the unit has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Splits `program` into the bodies of its recovered methods.
///
/// A new body starts at every method head. Instructions preceding the first
/// head form the entry body. A program without method heads yields a single
/// unit covering the whole contract.
#[must_use]
pub fn split_into_methods(program: &Program) -> Vec<AnalysisUnit<'_>> {
    let heads: Vec<u32> = program
        .ids()
        .filter(|id| program.instruction(*id).is(Operation::MethodHead))
        .map(|id| id.index())
        .collect();
    if heads.is_empty() {
        return vec![AnalysisUnit::contract(program)];
    }

    #[allow(clippy::cast_possible_truncation)]
    let end = program.len() as u32;
    let boundaries = std::iter::once(0).chain(heads).chain(std::iter::once(end));

    let mut units = Vec::new();
    let mut start = None;
    for boundary in boundaries {
        if let Some(start) = start {
            if boundary > start {
                let first = InstructionId::new(start);
                let head = program.instruction(first).is(Operation::MethodHead).then_some(first);
                units.push(AnalysisUnit {
                    program,
                    range: start..boundary,
                    kind: UnitKind::Method { head },
                });
            }
        }
        start = Some(boundary);
    }

    if units.is_empty() {
        return vec![AnalysisUnit::contract(program)];
    }
    units
}
