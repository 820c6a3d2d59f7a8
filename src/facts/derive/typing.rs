//! This module contains the pass that ascribes types to the values produced by
//! instructions whose results have a fixed meaning.

use ethnum::U256;

use crate::{
    error::derivation::Error,
    facts::{
        derive::{DerivationContext, DerivationPass},
        Relation,
    },
    program::{InstructionId, Operation},
};

/// Emits `assignType` for values whose meaning is fixed by the operation that
/// produces them, such as the caller's address or the call value.
///
/// Method arguments are typed as unknown, as themselves, and as call data.
/// External call results are typed as unknown and as themselves.
#[derive(Debug)]
pub struct TypingPass;

impl DerivationPass for TypingPass {
    fn name(&self) -> &'static str {
        "typing"
    }

    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
        let instruction = context.instruction(id);
        let operation = instruction.operation();

        match operation {
            Operation::Push
            | Operation::CallValue
            | Operation::Caller
            | Operation::CallDataLoad
            | Operation::CallDataSize
            | Operation::Coinbase
            | Operation::Gas
            | Operation::IsZero
            | Operation::Not
            | Operation::Timestamp
            | Operation::Number
            | Operation::GasLimit
            | Operation::GasPrice
            | Operation::Balance
            | Operation::Difficulty
            | Operation::SLoad
            | Operation::Address => tag_result(id, operation, context)?,
            Operation::Div => {
                let divisor = context.input(id, 1, "divisor")?;
                if !context.value(divisor).is_some_and(is_scaling_divisor) {
                    tag_result(id, operation, context)?;
                }
            }
            Operation::MethodHead => {
                let head = context.node(id)?;
                let unknown = context.unknown()?;
                let call_data = context.type_tag(Operation::CallDataLoad)?;
                for argument in instruction.outputs() {
                    let argument = context.var(*argument)?;
                    for ty in [unknown, argument, call_data] {
                        context.add(Relation::AssignType, [head.into(), argument.into(), ty.into()]);
                    }
                }
            }
            Operation::Call | Operation::StaticCall => {
                let out = context.output(id, 0, "result")?;
                let call = context.node(id)?;
                let unknown = context.unknown()?;
                let out = context.var(out)?;
                for ty in [unknown, out] {
                    context.add(Relation::AssignType, [call.into(), out.into(), ty.into()]);
                }
            }
            Operation::BlockHash => {
                tag_result(id, operation, context)?;
                let number = context.input(id, 0, "block number")?;
                let out = context.output(id, 0, "hash")?;
                let fields = [
                    context.node(id)?.into(),
                    context.var(out)?.into(),
                    context.var(number)?.into(),
                ];
                context.add(Relation::AssignVar, fields);
            }
            _ => {}
        }

        Ok(())
    }
}

/// Types the first output of `id` with the tag for `operation`.
fn tag_result(
    id: InstructionId,
    operation: Operation,
    context: &mut DerivationContext<'_, '_>,
) -> Result<(), Error> {
    let out = context.output(id, 0, "result")?;
    let fields = [
        context.node(id)?.into(),
        context.var(out)?.into(),
        context.type_tag(operation)?.into(),
    ];
    context.add(Relation::AssignType, fields);
    Ok(())
}

/// Checks whether dividing by `divisor` merely rescales a value, as done when
/// unpacking words or extracting a function selector, rather than computing a
/// new quantity.
fn is_scaling_divisor(divisor: U256) -> bool {
    divisor == U256::ONE
        || divisor == U256::new(2)
        || divisor == U256::new(32)
        || divisor >> 224 == U256::ONE
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        facts::{
            derive::{
                test_util::{derive_all, instr, var},
                typing::is_scaling_divisor,
            },
            Relation,
        },
        program::{Operation, ProgramBuilder},
    };

    #[test]
    fn environment_reads_are_typed() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let out = builder.variable();
        builder.add(Operation::Caller, &[], &[out]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let out = var(&mut registry, out);
        let caller = registry.type_tag(Operation::Caller)?.into();
        assert!(facts.contains(Relation::AssignType, &[i0, out, caller]));
        Ok(())
    }

    #[test]
    fn scaling_divisions_are_not_typed() -> anyhow::Result<()> {
        for divisor in [1_u32, 2, 32] {
            let mut builder = ProgramBuilder::new();
            let value = builder.variable();
            let divisor = builder.constant(divisor);
            let out = builder.variable();
            builder.add(Operation::Div, &[value, divisor], &[out]);
            let program = builder.build();

            let (facts, _) = derive_all(&program)?;
            assert!(facts.get(Relation::AssignType).is_empty());
        }
        Ok(())
    }

    #[test]
    fn other_divisions_are_typed() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let value = builder.variable();
        let divisor = builder.constant(3_u32);
        let out = builder.variable();
        builder.add(Operation::Div, &[value, divisor], &[out]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let out = var(&mut registry, out);
        let div = registry.type_tag(Operation::Div)?.into();
        assert!(facts.contains(Relation::AssignType, &[i0, out, div]));
        Ok(())
    }

    #[test]
    fn selector_shifts_are_scaling() {
        assert!(is_scaling_divisor(U256::ONE << 224));
        assert!(is_scaling_divisor((U256::ONE << 224) + U256::new(5)));
        assert!(!is_scaling_divisor(U256::ONE << 225));
        assert!(!is_scaling_divisor(U256::new(4)));
    }

    #[test]
    fn method_arguments_are_typed_three_ways() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let arg = builder.variable();
        builder.add(Operation::MethodHead, &[], &[arg]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let head = instr(&mut registry, 0);
        let arg = var(&mut registry, arg);
        let unknown = registry.unknown()?.into();
        let call_data = registry.type_tag(Operation::CallDataLoad)?.into();
        assert_eq!(facts.get(Relation::AssignType).len(), 3);
        assert!(facts.contains(Relation::AssignType, &[head, arg, unknown]));
        assert!(facts.contains(Relation::AssignType, &[head, arg, arg]));
        assert!(facts.contains(Relation::AssignType, &[head, arg, call_data]));
        Ok(())
    }

    #[test]
    fn block_hashes_are_typed_and_assigned() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let number = builder.variable();
        let hash = builder.variable();
        builder.add(Operation::BlockHash, &[number], &[hash]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let (number, hash) = (var(&mut registry, number), var(&mut registry, hash));
        let tag = registry.type_tag(Operation::BlockHash)?.into();
        assert!(facts.contains(Relation::AssignType, &[i0, hash, tag]));
        assert!(facts.contains(Relation::AssignVar, &[i0, hash, number]));
        Ok(())
    }
}
