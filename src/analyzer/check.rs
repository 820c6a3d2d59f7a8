//! This module contains the scheduling of pattern checks over the analysis
//! units of a decompiled program.
//!
//! Contracts without recovered methods are analysed as a whole. Otherwise each
//! method body gets its own dataflow for the instruction-local patterns, and a
//! single dataflow over the whole contract serves the contract-global ones.

use itertools::Itertools;

use crate::{
    analyzer::context::AnalysisContext,
    constant::{CHECK_INSTRUCTIONS_STAGE_PREFIX, CHECK_PATTERN_STAGE_PREFIX},
    dataflow::Dataflow,
    error::{Error, Result},
    pattern::{Entry, Scope},
    program::Program,
    solver,
    solver::Verdicts,
    unit::{split_into_methods, AnalysisUnit},
};

/// Checks every pattern in `entries` against `program`, recording the outcome
/// of each in `context`.
///
/// # Errors
///
/// If an error occurs that must abort the analysis of the contract, such as the
/// registry running out of codes or the snapshot becoming unwritable.
pub fn check_patterns(
    context: &mut AnalysisContext,
    program: &Program,
    entries: &[&Entry],
    config: &solver::Config,
) -> Result<()> {
    if program.has_method_heads() {
        let (local, global): (Vec<&Entry>, Vec<&Entry>) = entries
            .iter()
            .copied()
            .partition(|e| e.kind().scope == Scope::InstructionLocal);

        let bodies = split_into_methods(program);
        tracing::info!(methods = bodies.len(), "checking recovered methods");
        run_group(context, &bodies, &local, config)?;
        run_group(context, &[AnalysisUnit::contract(program)], &global, config)
    } else {
        let (runnable, unsupported): (Vec<&Entry>, Vec<&Entry>) = entries
            .iter()
            .copied()
            .partition(|e| !e.kind().requires_method_recovery);

        for entry in unsupported {
            tracing::debug!(pattern = entry.name(), "pattern requires recovered methods");
            context.unsupported(entry.name());
            context.milestone()?;
        }

        tracing::info!("checking the contract as a whole");
        run_group(context, &[AnalysisUnit::contract(program)], &runnable, config)
    }
}

/// Checks each of `entries` against every unit in `units`, completing the
/// patterns once all the units have been seen.
fn run_group(
    context: &mut AnalysisContext,
    units: &[AnalysisUnit<'_>],
    entries: &[&Entry],
    config: &solver::Config,
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    for unit in units {
        run_unit(context, unit, entries, config)?;
    }
    for entry in entries {
        context.complete(entry.name());
    }

    context.milestone()
}

/// Computes the dataflow of `unit` and checks each of `entries` against it in
/// isolation.
fn run_unit(
    context: &mut AnalysisContext,
    unit: &AnalysisUnit<'_>,
    entries: &[&Entry],
    config: &solver::Config,
) -> Result<()> {
    let dataflow = match Dataflow::compute(unit, config) {
        Ok(dataflow) => dataflow,
        Err(error) if error.is_fatal() => return Err(error),
        Err(error) => {
            tracing::debug!(
                %error,
                patterns = entries.iter().map(|e| e.name()).join(", "),
                "dataflow failed"
            );
            for entry in entries {
                let stage = format!("{CHECK_PATTERN_STAGE_PREFIX}{}", entry.name());
                context.fail(entry.name(), stage, &error);
            }
            return context.milestone();
        }
    };

    for entry in entries {
        let mut findings = Verdicts::default();
        let outcome = entry.pattern().check(unit, &dataflow, &mut findings);
        context.record_findings(entry.name(), unit.program(), &findings);

        if let Err(error) = outcome {
            let stage = format!("{CHECK_INSTRUCTIONS_STAGE_PREFIX}{}", entry.name());
            context.fail(entry.name(), stage, &Error::from(error));
        }
        context.milestone()?;
    }

    Ok(())
}
