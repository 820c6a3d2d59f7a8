//! This library implements a security analysis of [EVM](https://ethereum.org/en/developers/docs/evm/)
//! bytecode that checks a contract against a catalogue of vulnerability
//! patterns, classifying its instructions as violating, possibly violating, or
//! safe with respect to each. It is a _best effort_ analysis.
//!
//! Note that this library neither decompiles bytecode nor evaluates the
//! patterns itself. Both are delegated to external tools.
//!
//! # How it Works
//!
//! From a very high level, the analysis of a contract is performed as follows:
//!
//! 1. The contract's bytecode is handed to a [`decompiler::Decompiler`], which
//!    reconstructs its instruction graph as a [`program::Program`].
//! 2. The program is split into [`unit::AnalysisUnit`]s: one per recovered
//!    method, or the whole contract if no methods were recovered.
//! 3. For each unit, the passes of the [`facts::derive`] engine translate the
//!    instructions into relational facts, naming every entity with a code
//!    drawn from a [`registry::Registry`].
//! 4. The facts are written to a fresh [`solver::Workspace`] and the solver is
//!    run over them, computing the verdicts of every pattern.
//! 5. Each [`pattern::Pattern`] reads its verdicts back, translated to the
//!    program's instructions, and they are collected into an
//!    [`analyzer::ContractResult`].
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct an
//! `Analyzer` and call the `.analyze` method, passing your contract.
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use evm_fact_analyzer::{
//!     analyzer::Config,
//!     contract::Contract,
//!     decompiler::CommandDecompiler,
//!     pattern::Catalogue,
//!     solver,
//! };
//!
//! let solver = solver::Config::default()
//!     .with_executable("./build/dl-solver")
//!     .with_pattern_names("./build/pattern_names.txt");
//! let catalogue = Rc::new(Catalogue::from_solver(&solver).unwrap());
//! let decompiler = CommandDecompiler::new("./build/decompile").in_rc();
//! let config = Config::default()
//!     .with_solver(solver)
//!     .with_snapshot("./out/live.json");
//!
//! let contract = Contract::from_hex_file("./contracts/Wallet.hex").unwrap();
//! let analyzer = evm_fact_analyzer::new(contract, config, decompiler, catalogue)
//!     .unwrap()
//!     .analyze()
//!     .unwrap();
//!
//! for (name, result) in &analyzer.result().pattern_results {
//!     println!("{name}: {:?}", result.violations);
//! }
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod analyzer;
pub mod constant;
pub mod contract;
pub mod dataflow;
pub mod decompiler;
pub mod error;
pub mod facts;
pub mod pattern;
pub mod program;
pub mod registry;
pub mod solver;
pub mod unit;
pub mod utility;

// Re-exports to provide the library interface.
pub use analyzer::{analyze_all, new, ContractResult};
