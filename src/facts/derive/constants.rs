//! This module contains the pass that records which variables hold constants.

use crate::{
    error::derivation::Error,
    facts::{
        derive::{DerivationContext, DerivationPass},
        Field,
        Relation,
    },
    program::InstructionId,
    utility::solver_number,
};

/// Emits `isConst` once for every variable with a known value, and `hasValue`
/// when that value fits the solver's integers.
///
/// Values are read as two's complement, so small negative constants keep their
/// sign.
#[derive(Debug)]
pub struct ConstantPass;

impl DerivationPass for ConstantPass {
    fn name(&self) -> &'static str {
        "constants"
    }

    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
        let instruction = context.instruction(id);

        for variable in instruction.inputs().iter().chain(instruction.outputs()) {
            let Some(value) = context.value(*variable) else {
                continue;
            };
            if !context.mark_constant(*variable) {
                continue;
            }

            let code = context.var(*variable)?;
            context.add(Relation::IsConst, [code.into()]);
            if let Some(number) = solver_number(value) {
                context.add(Relation::HasValue, [code.into(), Field::Number(number)]);
            }
        }

        Ok(())
    }
}
