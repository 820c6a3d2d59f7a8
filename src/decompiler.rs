//! This module contains the interface to the decompiler that turns a
//! contract's bytecode into a [`Program`].
//!
//! Decompilation itself is not performed by this library. The analyzer is
//! handed any implementation of [`Decompiler`], which may wrap an external tool
//! or an in-process implementation.

use std::{
    fmt::{Debug, Formatter},
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
    rc::Rc,
};

use crate::{
    error::decompile::{Error, Result},
    program::Program,
};

/// A dynamically dispatched [`Decompiler`] instance.
pub type DynDecompiler = Rc<dyn Decompiler>;

/// The interface to an object that can reconstruct the instruction graph of a
/// contract.
pub trait Decompiler
where
    Self: Debug,
{
    /// Decompiles `bytecode` into a program.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the bytecode cannot be decompiled.
    fn decompile(&self, bytecode: &[u8]) -> Result<Program>;
}

/// A [`Decompiler`] that runs an external command, passing the hex-encoded
/// bytecode on its standard input and reading the program as JSON from its
/// standard output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandDecompiler {
    executable: PathBuf,
    arguments:  Vec<String>,
}

impl CommandDecompiler {
    /// Creates a decompiler that runs `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let arguments = Vec::new();
        Self {
            executable,
            arguments,
        }
    }

    /// Adds `argument` to the arguments passed to the executable.
    #[must_use]
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Wraps `self` into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynDecompiler {
        Rc::new(self)
    }
}

impl Decompiler for CommandDecompiler {
    fn decompile(&self, bytecode: &[u8]) -> Result<Program> {
        let failed = |e: std::io::Error| Error::failed(format!("{:?}: {e}", self.executable));

        let mut child = Command::new(&self.executable)
            .args(&self.arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(failed)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(hex::encode(bytecode).as_bytes()).map_err(failed)?;
        }

        let output = child.wait_with_output().map_err(failed)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::failed(stderr.trim()));
        }

        let json = String::from_utf8_lossy(&output.stdout);
        Program::from_json(&json)
    }
}

/// A [`Decompiler`] backed by a function.
pub struct FnDecompiler<F>(pub F);

impl<F> FnDecompiler<F>
where
    F: Fn(&[u8]) -> Result<Program> + 'static,
{
    /// Wraps `self` into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynDecompiler {
        Rc::new(self)
    }
}

impl<F> Debug for FnDecompiler<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnDecompiler")
    }
}

impl<F> Decompiler for FnDecompiler<F>
where
    F: Fn(&[u8]) -> Result<Program>,
{
    fn decompile(&self, bytecode: &[u8]) -> Result<Program> {
        (self.0)(bytecode)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        decompiler::{Decompiler, FnDecompiler},
        error::decompile::Error,
        program::ProgramBuilder,
    };

    #[test]
    fn functions_can_decompile() -> anyhow::Result<()> {
        let decompiler = FnDecompiler(|bytes: &[u8]| {
            if bytes.is_empty() {
                return Err(Error::failed("empty"));
            }
            Ok(ProgramBuilder::new().build())
        });

        assert!(decompiler.decompile(&[0x00])?.is_empty());
        assert_eq!(decompiler.decompile(&[]), Err(Error::failed("empty")));
        Ok(())
    }
}
