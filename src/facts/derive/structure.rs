//! This module contains the pass that records the memory, storage, call and
//! method structure of a program.

use crate::{
    error::derivation::Error,
    facts::{
        derive::{DerivationContext, DerivationPass},
        Relation,
    },
    program::{InstructionId, Operation, VariableId},
};

/// Emits the facts describing memory and storage accesses, external calls and
/// recovered method heads.
#[derive(Debug)]
pub struct StructurePass;

impl DerivationPass for StructurePass {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
        let instruction = context.instruction(id);

        match instruction.operation() {
            Operation::MStore | Operation::MStore8 => {
                let offset = context.input(id, 0, "offset")?;
                let value = context.input(id, 1, "value")?;
                access(id, context, Relation::MStoreInstr, offset, value)?;
            }
            Operation::MLoad => {
                let offset = context.input(id, 0, "offset")?;
                let out = context.output(id, 0, "result")?;
                access(id, context, Relation::MLoadInstr, offset, out)?;
            }
            Operation::SStore => {
                let key = context.input(id, 0, "key")?;
                let value = context.input(id, 1, "value")?;
                access(id, context, Relation::SStoreInstr, key, value)?;
            }
            Operation::SLoad => {
                let key = context.input(id, 0, "key")?;
                let out = context.output(id, 0, "result")?;
                access(id, context, Relation::SLoadInstr, key, out)?;
            }
            Operation::Call => {
                let gas = context.input(id, 0, "gas")?;
                let value = context.input(id, 2, "value")?;
                let out = context.output(id, 0, "result")?;
                let fields = [
                    context.node(id)?.into(),
                    context.var(out)?.into(),
                    context.var(gas)?.into(),
                    context.var(value)?.into(),
                ];
                context.add(Relation::Call, fields);
            }
            Operation::MethodHead => {
                let head = context.node(id)?;
                context.add(Relation::VirtualMethodHead, [head.into()]);

                if instruction.outputs().is_empty() {
                    context.add(Relation::NoArgsVirtualMethodHead, [head.into()]);
                }
                for argument in instruction.outputs() {
                    let argument = context.var(*argument)?;
                    context.add(Relation::IsArg, [argument.into(), head.into()]);
                }
            }
            _ => {}
        }

        Ok(())
    }
}

/// Emits a memory or storage access fact of the form `(instr, address, value)`.
fn access(
    id: InstructionId,
    context: &mut DerivationContext<'_, '_>,
    relation: Relation,
    address: VariableId,
    value: VariableId,
) -> Result<(), Error> {
    let fields = [
        context.node(id)?.into(),
        context.var(address)?.into(),
        context.var(value)?.into(),
    ];
    context.add(relation, fields);
    Ok(())
}
