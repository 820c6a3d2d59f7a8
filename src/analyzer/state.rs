//! This module contains the state tracking functionality for the analyzer.

use std::fmt::Debug;

use crate::{
    analyzer::{context::AnalysisContext, result::ContractResult},
    program::Program,
};

/// A marker trait that says that the type implementing it is an analyzer state.
pub trait State
where
    Self: Clone + Debug + Sized,
{
}

/// The initial state for the analyzer.
#[derive(Clone, Debug)]
pub struct HasContract {
    /// The context of the analysis, with every selected pattern pending.
    pub context: AnalysisContext,
}
impl State for HasContract {}

/// The analyzer has attempted to decompile the contract's bytecode.
#[derive(Clone, Debug)]
pub struct DecompilationAttempted {
    pub context: AnalysisContext,

    /// The decompiled program, or [`None`] if decompilation failed.
    pub program: Option<Program>,
}
impl State for DecompilationAttempted {}

/// The analyzer has checked every selected pattern that could be checked.
#[derive(Clone, Debug)]
pub struct PatternsChecked {
    pub context: AnalysisContext,
}
impl State for PatternsChecked {}

/// The analysis of the contract is complete.
#[derive(Clone, Debug)]
pub struct Finished {
    /// The final result record of the contract.
    pub result: ContractResult,
}
impl State for Finished {}
