//! This module contains the catalogue of relations handed to the solver.

use std::fmt::{Display, Formatter};

/// Declares the [`Relation`] enum alongside the solver-facing name and the
/// arity of each relation.
macro_rules! relations {
    ($($(#[$meta:meta])* $variant:ident => ($name:literal, $arity:literal)),* $(,)?) => {
        /// A relation of the fact base.
        ///
        /// Each relation has a fixed arity, and is written to its own file named
        /// after it.
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum Relation {
            $($(#[$meta])* $variant),*
        }

        impl Relation {
            /// Every relation, in the order in which they are written.
            pub const ALL: &'static [Relation] = &[$(Relation::$variant),*];

            /// Gets the name of the relation as declared in the solver's rules.
            #[must_use]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Relation::$variant => $name),*
                }
            }

            /// Gets the number of fields in each fact of the relation.
            #[must_use]
            pub fn arity(&self) -> usize {
                match self {
                    $(Relation::$variant => $arity),*
                }
            }
        }
    };
}

relations! {
    /// `(instr, out, in)`: `out` is computed from `in`.
    AssignVar => ("assignVar", 3),
    /// `(instr, var, type)`: `var` carries the type or raw address `type`.
    AssignType => ("assignType", 3),
    /// `(branch, target, condition)`: `target` executes depending on
    /// `condition`.
    Taint => ("taint", 3),
    FollowsMayImplicit => ("followsMayImplicit", 2),
    FollowsMustExplicit => ("followsMustExplicit", 2),
    /// `(from, to, merge)`
    Jump => ("jump", 3),
    JumpDest => ("jumpDest", 1),
    OneBranchJumpDest => ("oneBranchJumpDest", 1),
    /// `(left, right, merge)`: control from `left` and `right` meets at
    /// `merge`.
    Join => ("join", 3),
    /// `(branch, merge)`
    EndIf => ("endIf", 2),
    MLoad => ("mload", 3),
    MStore => ("mstore", 3),
    SLoad => ("sload", 3),
    SStore => ("sstore", 3),
    /// `(instr, offset, out)`
    MLoadInstr => ("mloadInstr", 3),
    /// `(instr, offset, value)`
    MStoreInstr => ("mstoreInstr", 3),
    /// `(instr, key, out)`
    SLoadInstr => ("sloadInstr", 3),
    /// `(instr, key, value)`
    SStoreInstr => ("sstoreInstr", 3),
    VirtualMethodHead => ("virtualMethodHead", 1),
    NoArgsVirtualMethodHead => ("noArgsVirtualMethodHead", 1),
    /// `(branch, condition, else)`
    Goto => ("goto", 3),
    IsConst => ("isConst", 1),
    /// `(var, value)`
    HasValue => ("hasValue", 2),
    /// `(var, head)`
    IsArg => ("isArg", 2),
    IsStorageVar => ("isStorageVar", 1),
    /// `(instr, out, offset)`: `out` hashes the word at `offset`.
    Sha3 => ("sha3", 3),
    /// `(instr, return, gas, value)`
    Call => ("call", 4),
    Unk => ("unk", 1),
    AssignVarMayImplicit => ("assignVarMayImplicit", 3),
}

impl Relation {
    /// Gets the position of the relation in [`Self::ALL`].
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
