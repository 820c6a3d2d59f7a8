//! This module contains types useful for dealing with concrete contracts that
//! you want to analyze.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

/// A representation of a contract that is passed to the library.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contract {
    name:     String,
    bytecode: Vec<u8>,
}

impl Contract {
    /// Creates a new contract called `name` from its runtime `bytecode`.
    pub fn new(name: impl Into<String>, bytecode: Vec<u8>) -> Self {
        let name = name.into();
        Self { name, bytecode }
    }

    /// Creates a new contract called `name` from hex-encoded bytecode, with or
    /// without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// If `hex` is not valid hexadecimal.
    pub fn from_hex(name: impl Into<String>, hex: &str) -> anyhow::Result<Self> {
        let trimmed = hex.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytecode = hex::decode(digits).map_err(|e| anyhow!("Could not decode hex: {e}"))?;

        Ok(Self::new(name, bytecode))
    }

    /// Creates a new contract from the file at `path`, which must contain the
    /// hex-encoded runtime bytecode.
    ///
    /// The contract is named after the file.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or does not contain valid hexadecimal.
    pub fn from_hex_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("File {path:?} not available"))?;
        let name = path
            .file_stem()
            .map_or_else(|| "contract".to_string(), |s| s.to_string_lossy().into_owned());

        Self::from_hex(name, &contents)
    }

    /// Reads every contract with runtime bytecode from the compiler output at
    /// `path`, ordered by name.
    ///
    /// The output must be a JSON object mapping each contract name to an
    /// object with a `bin-runtime` field. Contracts without one are skipped.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed.
    pub fn from_compilation_output(path: impl AsRef<Path>) -> anyhow::Result<Vec<Self>> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("File {path:?} not available"))?;
        let output: BTreeMap<String, CompiledContract> = serde_json::from_str(&contents)
            .map_err(|e| anyhow!("Could not parse compilation output: {e}"))?;

        output
            .into_iter()
            .filter_map(|(name, compiled)| compiled.bin_runtime.map(|bin| (name, bin)))
            .filter(|(_, bin)| !bin.trim().is_empty())
            .map(|(name, bin)| Self::from_hex(name, &bin))
            .collect()
    }

    /// Gets the name of the contract.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets a reference to the bytecode of the contract.
    #[must_use]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }
}

/// A wrapper for the parts of a contract's entry in the compiler output that
/// we care about.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CompiledContract {
    #[serde(rename = "bin-runtime", default)]
    bin_runtime: Option<String>,
}
