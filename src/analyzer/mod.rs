//! This module contains the definition of the analyzer itself.

pub mod check;
pub mod config;
pub mod context;
pub mod result;
pub mod snapshot;
pub mod state;

use std::{collections::BTreeMap, fs, rc::Rc};

pub use self::{
    config::Config,
    result::{CapturedError, ContractResult, PatternResult},
};
use crate::{
    analyzer::{context::AnalysisContext, snapshot::Snapshot, state::State},
    constant::{DECOMPILATION_STAGE, PATTERN_ERROR_STAGE},
    contract::Contract,
    decompiler::DynDecompiler,
    error,
    error::Error,
    pattern::Catalogue,
};

/// Creates a new analyzer wrapping the provided `contract`, which will be
/// decompiled by `decompiler` and checked against the patterns in `catalogue`
/// selected by `config`.
///
/// # Errors
///
/// If the initial progress snapshot cannot be written.
pub fn new(
    contract: Contract,
    config: Config,
    decompiler: DynDecompiler,
    catalogue: Rc<Catalogue>,
) -> error::Result<Analyzer<state::HasContract>> {
    let snapshot = Snapshot::new(config.snapshot.clone());
    let context = AnalysisContext::new(snapshot)?;

    tracing::info!(contract = contract.name(), "started analysis");
    let state = state::HasContract { context };
    Ok(Analyzer {
        contract,
        config,
        decompiler,
        catalogue,
        state,
    })
}

/// Analyzes each of `contracts` in turn, returning their results by name.
///
/// # Errors
///
/// If the analysis of any contract has to be aborted.
pub fn analyze_all(
    contracts: impl IntoIterator<Item = Contract>,
    config: &Config,
    decompiler: &DynDecompiler,
    catalogue: &Rc<Catalogue>,
) -> error::Result<BTreeMap<String, ContractResult>> {
    let mut results = BTreeMap::new();
    for contract in contracts {
        let name = contract.name().to_string();
        let analyzer = new(contract, config.clone(), decompiler.clone(), catalogue.clone())?;
        let result = analyzer.analyze()?.into_result();
        results.insert(name, result);
    }

    Ok(results)
}

/// The driver of the analysis of a single contract, the `Analyzer` takes its
/// bytecode through decompilation and the checking of each selected pattern,
/// producing a [`ContractResult`].
///
/// # Basic Usage
///
/// For the most basic usage of the library, it is sufficient to construct an
/// `Analyzer` and call the `.analyze` method.
///
/// # Enforcing Valid State Transitions
///
/// The analyzer enforces that only correct state transitions can occur through
/// use of structs that implement the exact state required by it at any given
/// point.
///
/// There is the [`Self::state`] function that provides access to the state data
/// of whichever state it is in.
pub struct Analyzer<S: State> {
    /// The contract that is being analyzed.
    contract: Contract,

    /// The configuration of the analysis.
    config: Config,

    /// The decompiler that turns the contract into a program.
    decompiler: DynDecompiler,

    /// The patterns available for checking.
    catalogue: Rc<Catalogue>,

    /// The internal state of the analyzer.
    state: S,
}

/// Safe operations available in all states.
impl<S: State> Analyzer<S> {
    /// Gets a reference to the contract being analyzed.
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Gets a reference to the configuration of the analysis.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets a reference to the current state of the analyzer.
    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Unsafe operations available in all states.
///
/// These operations are capable of **violating the state invariants** of the
/// analyzer, and must be used with the _utmost_ care.
impl<S: State> Analyzer<S> {
    /// Gets a mutable reference to the current state of the analyzer.
    ///
    /// # Safety
    ///
    /// Do not mutate the state instance unless you totally understand the
    /// state that the analyzer is in, and the implications of doing so.
    pub unsafe fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Forces the analyzer into `new_state`, disregarding any safety with
    /// regards to state transitions.
    ///
    /// # Safety
    ///
    /// Do not force a state transition for the analyzer unless you totally
    /// understand the state that the analyzer is in, and the implications
    /// of doing so.
    pub unsafe fn set_state<NS: State>(self, new_state: NS) -> Analyzer<NS> {
        Analyzer {
            contract:   self.contract,
            config:     self.config,
            decompiler: self.decompiler,
            catalogue:  self.catalogue,
            state:      new_state,
        }
    }

    /// Forces the analyzer into the state `NS`, with the value of the state
    /// created by applying `transform` to the analyzer's current state and
    /// disregarding any safety with regard to state transitions.
    ///
    /// # Safety
    ///
    /// Do not force a state transition for the analyzer unless you totally
    /// understand the state that the analyzer is in, and the implications
    /// of doing so.
    pub unsafe fn transform_state<NS: State>(
        self,
        transform: impl FnOnce(S) -> error::Result<NS>,
    ) -> error::Result<Analyzer<NS>> {
        let state = transform(self.state)?;
        Ok(Analyzer {
            contract:   self.contract,
            config:     self.config,
            decompiler: self.decompiler,
            catalogue:  self.catalogue,
            state,
        })
    }
}

/// Operations available on a newly-created analyzer.
impl Analyzer<state::HasContract> {
    /// Executes the analysis process from beginning to end, performing all the
    /// intermediate steps automatically.
    ///
    /// # Errors
    ///
    /// If the analysis has to be aborted, which happens only when the progress
    /// snapshot or the decompilation listing cannot be written.
    pub fn analyze(self) -> error::Result<Analyzer<state::Finished>> {
        let analyzer = self.decompile()?;
        let analyzer = analyzer.check_patterns()?;
        let analyzer = analyzer.finish()?;

        Ok(analyzer)
    }

    /// Decompiles the contract's bytecode into a program.
    ///
    /// A failure to decompile is recorded in the result rather than returned,
    /// and finishes the analysis of the contract.
    ///
    /// # Errors
    ///
    /// If the snapshot or the decompilation listing cannot be written.
    pub fn decompile(self) -> error::Result<Analyzer<state::DecompilationAttempted>> {
        let outcome = self.decompiler.decompile(self.contract.bytecode());
        let listing = self.config.listing.clone();

        unsafe {
            self.transform_state(|mut old_state| {
                let program = match outcome {
                    Ok(program) => program,
                    Err(e) => {
                        old_state.context.record_error(DECOMPILATION_STAGE, &Error::from(e));
                        old_state.context.mark_finished()?;
                        return Ok(state::DecompilationAttempted {
                            context: old_state.context,
                            program: None,
                        });
                    }
                };

                tracing::info!(instructions = program.len(), "decompiled contract");
                old_state.context.mark_decompiled()?;
                if let Some(path) = listing {
                    fs::write(&path, program.listing()).map_err(|e| Error::Io {
                        path,
                        message: e.to_string(),
                    })?;
                }

                Ok(state::DecompilationAttempted {
                    context: old_state.context,
                    program: Some(program),
                })
            })
        }
    }
}

/// Operations available on an analyzer that has attempted decompilation.
impl Analyzer<state::DecompilationAttempted> {
    /// Checks the selected patterns against the decompiled program.
    ///
    /// The selected patterns enter the result as pending before any of them is
    /// checked. Failures of individual patterns are recorded against them. An error that
    /// prevents checking the remaining patterns is recorded against the
    /// contract. If the contract could not be decompiled, nothing is checked.
    ///
    /// # Errors
    ///
    /// If the progress snapshot cannot be written.
    pub fn check_patterns(self) -> error::Result<Analyzer<state::PatternsChecked>> {
        let catalogue = self.catalogue.clone();
        let entries = catalogue.select(self.config.patterns.as_deref());
        let solver = self.config.solver.clone();

        unsafe {
            self.transform_state(|mut old_state| {
                if let Some(program) = &old_state.program {
                    old_state.context.open_patterns(entries.iter().map(|e| e.name()))?;
                    let outcome =
                        check::check_patterns(&mut old_state.context, program, &entries, &solver);
                    match outcome {
                        Err(e @ (Error::Snapshot { .. } | Error::Io { .. })) => return Err(e),
                        Err(e) => old_state.context.record_error(PATTERN_ERROR_STAGE, &e),
                        Ok(()) => (),
                    }
                }

                Ok(state::PatternsChecked {
                    context: old_state.context,
                })
            })
        }
    }
}

/// Operations available on an analyzer that has checked its patterns.
impl Analyzer<state::PatternsChecked> {
    /// Marks the analysis as finished.
    ///
    /// # Errors
    ///
    /// If the progress snapshot cannot be written.
    pub fn finish(self) -> error::Result<Analyzer<state::Finished>> {
        let name = self.contract.name().to_string();
        unsafe {
            self.transform_state(|old_state| {
                let result = old_state.context.finish()?;
                tracing::info!(contract = %name, errors = result.errors.len(), "finished analysis");
                Ok(state::Finished { result })
            })
        }
    }
}

/// Operations available on an analyzer that has finished.
impl Analyzer<state::Finished> {
    /// Gets the result of the analysis.
    pub fn result(&self) -> &ContractResult {
        &self.state.result
    }

    /// Consumes the analyzer, yielding the result of the analysis.
    pub fn into_result(self) -> ContractResult {
        self.state.result
    }
}
