//! This module contains the fact base: the typed relations derived from a
//! program that are handed to the solver.

pub mod derive;
pub mod relation;

use std::{
    fmt::{Display, Formatter},
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use itertools::Itertools;

pub use self::relation::Relation;
use crate::{
    constant::{FACT_FILE_EXTENSION, FIELD_SEPARATOR},
    error::solver,
    registry::Code,
};

/// A single field of a fact.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    /// The code of an entity in the registry.
    Code(Code),

    /// A raw number, such as an address or a constant's value.
    Number(i32),
}

impl From<Code> for Field {
    fn from(value: Code) -> Self {
        Self::Code(value)
    }
}

impl From<i32> for Field {
    fn from(value: i32) -> Self {
        Self::Number(value)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// A tuple of a relation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Fact {
    fields: Vec<Field>,
}

impl Fact {
    /// Gets the fields of the fact.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl Display for Fact {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fields.iter().join(&FIELD_SEPARATOR.to_string()))
    }
}

/// The facts derived for a single analysis unit, partitioned by relation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FactBase {
    relations: Vec<Vec<Fact>>,
}

impl FactBase {
    /// Creates an empty fact base holding every relation.
    #[must_use]
    pub fn new() -> Self {
        let relations = vec![Vec::new(); Relation::ALL.len()];
        Self { relations }
    }

    /// Appends a fact made of `fields` to `relation`.
    ///
    /// Facts are kept in insertion order, duplicates included.
    pub fn add(&mut self, relation: Relation, fields: impl IntoIterator<Item = Field>) {
        let fields = fields.into_iter().collect_vec();
        debug_assert_eq!(
            fields.len(),
            relation.arity(),
            "{relation} takes {} fields",
            relation.arity()
        );
        self.relations[relation.index()].push(Fact { fields });
    }

    /// Gets the facts of `relation`.
    #[must_use]
    pub fn get(&self, relation: Relation) -> &[Fact] {
        &self.relations[relation.index()]
    }

    /// Checks whether `relation` holds a fact with exactly `fields`.
    #[must_use]
    pub fn contains(&self, relation: Relation, fields: &[Field]) -> bool {
        self.get(relation).iter().any(|f| f.fields == fields)
    }

    /// Gets the total number of facts across all relations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.iter().map(Vec::len).sum()
    }

    /// Checks whether no facts have been derived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes each relation to its own file in `directory`, one fact per line.
    ///
    /// Every relation is written, even when it holds no facts, as the solver
    /// expects a file for each of its inputs.
    ///
    /// # Errors
    ///
    /// If any of the files cannot be written.
    pub fn write_to(&self, directory: &Path) -> solver::Result<()> {
        for relation in Relation::ALL {
            let error = |e: std::io::Error| solver::Error::WriteFacts {
                relation: relation.name(),
                message:  e.to_string(),
            };
            let path = directory.join(format!("{}.{FACT_FILE_EXTENSION}", relation.name()));
            let mut writer = BufWriter::new(File::create(path).map_err(error)?);

            for fact in self.get(*relation) {
                writeln!(writer, "{fact}").map_err(error)?;
            }
            writer.flush().map_err(error)?;
        }

        Ok(())
    }
}

impl Default for FactBase {
    fn default() -> Self {
        Self::new()
    }
}
