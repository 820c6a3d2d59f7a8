//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]
#![allow(unused)] // Not every test uses every utility

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::Path,
    rc::Rc,
    time::Duration,
};

use evm_fact_analyzer::{
    analyzer,
    contract::Contract,
    decompiler::{DynDecompiler, FnDecompiler},
    error::decompile,
    pattern::Catalogue,
    program::{Operation, Program, ProgramBuilder},
    solver,
};

/// Writes a stand-in for the solver into `dir` that runs the shell `script`,
/// and declares the patterns in `names`.
///
/// The script is invoked as the real solver would be, so `$2` is the directory
/// holding the facts and `$4` the directory that the results go into.
pub fn scripted_solver(dir: &Path, script: &str, names: &[&str]) -> anyhow::Result<solver::Config> {
    let executable = dir.join("solver.sh");
    fs::write(&executable, format!("#!/bin/sh\nset -e\n{script}\n"))?;
    fs::set_permissions(&executable, fs::Permissions::from_mode(0o755))?;

    let pattern_names = dir.join("pattern_names.txt");
    fs::write(&pattern_names, format!("{}\n", names.join(" , ")))?;

    let workspace_root = dir.join("work");
    fs::create_dir_all(&workspace_root)?;

    Ok(solver::Config::default()
        .with_executable(executable)
        .with_pattern_names(pattern_names)
        .with_workspace_root(workspace_root)
        .with_timeout(Duration::from_secs(10)))
}

/// Gets the shell commands that write the three result partitions of the
/// pattern `name`, each filled by `compliance`, `violation` and `warnings`
/// respectively.
///
/// Each argument is a command whose output becomes the partition, or an empty
/// string for an empty partition.
pub fn partitions(name: &str, compliance: &str, violation: &str, warnings: &str) -> String {
    [("Compliance", compliance), ("Violation", violation), ("Warnings", warnings)]
        .iter()
        .map(|(suffix, command)| {
            if command.is_empty() {
                format!(": > \"$4/{name}{suffix}.csv\"")
            } else {
                format!("{command} > \"$4/{name}{suffix}.csv\"")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Gets a shell command appending a line to the file at `path` each time the
/// solver runs.
pub fn count_runs(path: &Path) -> String {
    format!("echo run >> \"{}\"", path.display())
}

/// Counts the lines written by [`count_runs`].
pub fn runs(path: &Path) -> usize {
    fs::read_to_string(path).map_or(0, |s| s.lines().count())
}

/// Creates a decompiler that yields `program` for any non-empty bytecode, and
/// fails on empty bytecode.
pub fn decompiler_for(program: Program) -> DynDecompiler {
    FnDecompiler(move |bytecode: &[u8]| -> decompile::Result<Program> {
        if bytecode.is_empty() {
            return Err(decompile::Error::failed("no bytecode"));
        }
        Ok(program.clone())
    })
    .in_rc()
}

/// Analyzes a contract decompiled to `program` against the patterns in
/// `catalogue`.
pub fn analyze(
    program: Program,
    catalogue: Catalogue,
    config: analyzer::Config,
) -> anyhow::Result<analyzer::ContractResult> {
    let contract = Contract::new("Test", vec![0x00]);
    let analyzer = evm_fact_analyzer::new(
        contract,
        config,
        decompiler_for(program),
        Rc::new(catalogue),
    )?;

    Ok(analyzer.analyze()?.into_result())
}

/// Builds a contract that conditionally writes to storage:
///
/// ```text
/// 0: x = CALLDATALOAD(0)
/// 1: JUMPI(t, x) -> 3, merging at 3
/// 2: SSTORE(0, x)
/// 3: JUMPDEST
/// 4: STOP
/// ```
pub fn conditional_store() -> Program {
    let mut builder = ProgramBuilder::new();
    let zero = builder.constant(0_u32);
    let target = builder.constant(3_u32);
    let x = builder.variable();

    builder.add(Operation::CallDataLoad, &[zero], &[x]);
    let branch = builder.add(Operation::JumpI, &[target, x], &[]);
    builder.add(Operation::SStore, &[zero, x], &[]);
    let dest = builder.add(Operation::JumpDest, &[], &[]);
    builder.add(Operation::Stop, &[], &[]);
    builder.branch(branch, dest);
    builder.merge(branch, dest);

    builder.build()
}

/// Builds a contract with an entry body and two recovered methods:
///
/// ```text
/// 0: CALLVALUE
/// 1: STOP
/// 2: METHODHEAD
/// 3: SSTORE(0, 1)
/// 4: STOP
/// 5: METHODHEAD
/// 6: JUMPDEST
/// 7: SSTORE(0, 1)
/// 8: STOP
/// ```
pub fn two_methods() -> Program {
    let mut builder = ProgramBuilder::new();
    let zero = builder.constant(0_u32);
    let one = builder.constant(1_u32);
    let value = builder.variable();

    builder.add(Operation::CallValue, &[], &[value]);
    builder.add(Operation::Stop, &[], &[]);
    builder.add(Operation::MethodHead, &[], &[]);
    builder.add(Operation::SStore, &[zero, one], &[]);
    builder.add(Operation::Stop, &[], &[]);
    builder.add(Operation::MethodHead, &[], &[]);
    builder.add(Operation::JumpDest, &[], &[]);
    builder.add(Operation::SStore, &[zero, one], &[]);
    builder.add(Operation::Stop, &[], &[]);

    builder.build()
}
