//! This module contains the [`Operation`] performed by an instruction in a
//! decompiled program.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Declares the [`Operation`] enum alongside the textual code of each of its
/// variants.
macro_rules! operations {
    ($($(#[$meta:meta])* $variant:ident => $text:literal),* $(,)?) => {
        /// The operation performed by an instruction.
        ///
        /// These are the operations of the EVM that survive decompilation (the
        /// stack manipulation opcodes do not), plus the virtual operations
        /// that the decompiler introduces to describe the program's
        /// structure.
        #[derive(
            Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        pub enum Operation {
            $($(#[$meta])* $variant),*
        }

        impl Operation {
            /// Every operation, in declaration order.
            pub const ALL: &'static [Operation] = &[$(Operation::$variant),*];

            /// Gets a textual representation of the operation to aid in
            /// debugging.
            #[must_use]
            pub fn as_text_code(&self) -> &'static str {
                match self {
                    $(Operation::$variant => $text),*
                }
            }
        }
    };
}

operations! {
    Stop => "STOP",
    Add => "ADD",
    Mul => "MUL",
    Sub => "SUB",
    Div => "DIV",
    SDiv => "SDIV",
    Mod => "MOD",
    SMod => "SMOD",
    AddMod => "ADDMOD",
    MulMod => "MULMOD",
    Exp => "EXP",
    SignExtend => "SIGNEXTEND",
    Lt => "LT",
    Gt => "GT",
    SLt => "SLT",
    SGt => "SGT",
    Eq => "EQ",
    IsZero => "ISZERO",
    And => "AND",
    Or => "OR",
    Xor => "XOR",
    Not => "NOT",
    Byte => "BYTE",
    Shl => "SHL",
    Shr => "SHR",
    Sar => "SAR",
    Sha3 => "SHA3",
    Address => "ADDRESS",
    Balance => "BALANCE",
    Origin => "ORIGIN",
    Caller => "CALLER",
    CallValue => "CALLVALUE",
    CallDataLoad => "CALLDATALOAD",
    CallDataSize => "CALLDATASIZE",
    CallDataCopy => "CALLDATACOPY",
    CodeSize => "CODESIZE",
    CodeCopy => "CODECOPY",
    GasPrice => "GASPRICE",
    ExtCodeSize => "EXTCODESIZE",
    ExtCodeCopy => "EXTCODECOPY",
    ReturnDataSize => "RETURNDATASIZE",
    ReturnDataCopy => "RETURNDATACOPY",
    ExtCodeHash => "EXTCODEHASH",
    BlockHash => "BLOCKHASH",
    Coinbase => "COINBASE",
    Timestamp => "TIMESTAMP",
    Number => "NUMBER",
    Difficulty => "DIFFICULTY",
    GasLimit => "GASLIMIT",
    ChainId => "CHAINID",
    SelfBalance => "SELFBALANCE",
    BaseFee => "BASEFEE",
    MLoad => "MLOAD",
    MStore => "MSTORE",
    MStore8 => "MSTORE8",
    SLoad => "SLOAD",
    SStore => "SSTORE",
    Jump => "JUMP",
    JumpI => "JUMPI",
    Pc => "PC",
    MSize => "MSIZE",
    Gas => "GAS",
    JumpDest => "JUMPDEST",
    Push => "PUSH",
    Log => "LOG",
    Create => "CREATE",
    Call => "CALL",
    CallCode => "CALLCODE",
    Return => "RETURN",
    DelegateCall => "DELEGATECALL",
    Create2 => "CREATE2",
    StaticCall => "STATICCALL",
    Revert => "REVERT",
    Invalid => "INVALID",
    SelfDestruct => "SELFDESTRUCT",

    /// Copies its input into its output, as introduced when the decompiler
    /// resolves stack slots into variables.
    Assign => "_ASSIGN",

    /// Marks the entry point of a recovered method, its outputs being the
    /// method's arguments.
    MethodHead => "_METHOD_HEAD",
}

impl Operation {
    /// Checks whether control may continue to the sequentially-next
    /// instruction after this operation.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Self::Stop
                | Self::Jump
                | Self::Return
                | Self::Revert
                | Self::Invalid
                | Self::SelfDestruct
        )
    }

    /// Checks whether this operation transfers control to an explicit target.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Jump | Self::JumpI)
    }

    /// Checks whether this operation is a call out to another contract that
    /// produces a return value.
    #[must_use]
    pub fn is_external_call(&self) -> bool {
        matches!(self, Self::Call | Self::StaticCall)
    }

    /// Checks whether this operation is introduced by the decompiler rather
    /// than present in the bytecode.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Assign | Self::MethodHead)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_text_code())
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;

    use crate::program::Operation;

    #[test]
    fn text_codes_are_unique() {
        let codes = Operation::ALL.iter().map(Operation::as_text_code).collect_vec();
        assert_eq!(codes.iter().unique().count(), codes.len());
    }

    #[test]
    fn terminators_do_not_fall_through() {
        assert!(!Operation::Jump.falls_through());
        assert!(!Operation::Return.falls_through());
        assert!(Operation::JumpI.falls_through());
        assert!(Operation::MethodHead.falls_through());
    }
}
