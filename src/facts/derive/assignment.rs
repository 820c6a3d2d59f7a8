//! This module contains the pass that relates the outputs of instructions to
//! the inputs they are computed from.

use std::{iter::StepBy, ops::Range};

use ethnum::U256;

use crate::{
    constant::HASHED_WORD_STRIDE,
    error::derivation::Error,
    facts::{
        derive::{DerivationContext, DerivationPass},
        Field,
        Relation,
    },
    program::{InstructionId, Operation},
    utility::{small_word, solver_number},
};

/// Emits `assignVar` for every value an instruction computes from its
/// operands.
///
/// Memory and storage accesses, external calls and hashing do not propagate
/// their operands generically:
///
/// - Loads type their result with the address they read, when it is known.
/// - `CALL` and `STATICCALL` relate their result to their third operand.
/// - `SHA3` relates its result to each word of the region it hashes.
#[derive(Debug)]
pub struct AssignmentPass;

impl DerivationPass for AssignmentPass {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
        let instruction = context.instruction(id);

        match instruction.operation() {
            Operation::SLoad | Operation::MLoad => {
                let address = context.input(id, 0, "address")?;
                let out = context.output(id, 0, "result")?;
                let slot = match context.value(address).and_then(solver_number) {
                    Some(address) => Field::Number(address),
                    None => context.unknown()?.into(),
                };
                let fields = [context.node(id)?.into(), context.var(out)?.into(), slot];
                context.add(Relation::AssignType, fields);
            }
            Operation::Call | Operation::StaticCall => {
                let out = context.output(id, 0, "result")?;
                let value = context.input(id, 2, "value")?;
                let fields = [
                    context.node(id)?.into(),
                    context.var(out)?.into(),
                    context.var(value)?.into(),
                ];
                context.add(Relation::AssignVar, fields);
            }
            Operation::Sha3 => {
                let offset = context.input(id, 0, "offset")?;
                let length = context.input(id, 1, "length")?;
                let out = context.output(id, 0, "hash")?;
                let Some(words) = hashed_words(context.value(offset), context.value(length)) else {
                    return Ok(());
                };

                let instruction = context.node(id)?;
                let out = context.var(out)?;
                for word in words {
                    context.add(
                        Relation::Sha3,
                        [instruction.into(), out.into(), Field::Number(word)],
                    );
                }
            }
            Operation::MStore | Operation::MStore8 | Operation::SStore => {}
            operation => {
                for out in instruction.outputs() {
                    for input in instruction.inputs() {
                        // An OR with zero leaves the other operand unchanged
                        if operation == Operation::Or && context.value(*input) == Some(U256::ZERO) {
                            continue;
                        }
                        let fields = [
                            context.node(id)?.into(),
                            context.var(*out)?.into(),
                            context.var(*input)?.into(),
                        ];
                        context.add(Relation::AssignVar, fields);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Computes the offsets of the words in the hashed region starting at `offset`
/// and spanning `length` bytes, if both are known and representable.
///
/// The offsets are produced lazily, as the region may be arbitrarily large.
fn hashed_words(offset: Option<U256>, length: Option<U256>) -> Option<StepBy<Range<i32>>> {
    let start = i32::try_from(small_word(offset?)?).ok()?;
    let length = i32::try_from(small_word(length?)?).ok()?;
    let end = start.checked_add(length)?;
    Some((start..end).step_by(HASHED_WORD_STRIDE as usize))
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::{
        facts::{
            derive::{
                assignment::hashed_words,
                test_util::{derive_all, instr, var},
            },
            Field,
            Relation,
        },
        program::{Operation, ProgramBuilder},
    };

    #[test]
    fn relates_every_output_to_every_input() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let a = builder.variable();
        let b = builder.variable();
        let out = builder.variable();
        builder.add(Operation::Add, &[a, b], &[out]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let (a, b, out) = (var(&mut registry, a), var(&mut registry, b), var(&mut registry, out));
        assert!(facts.contains(Relation::AssignVar, &[i0, out, a]));
        assert!(facts.contains(Relation::AssignVar, &[i0, out, b]));
        assert_eq!(facts.get(Relation::AssignVar).len(), 2);
        Ok(())
    }

    #[test]
    fn or_with_zero_is_transparent() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let zero = builder.constant(U256::ZERO);
        let x = builder.variable();
        let out = builder.variable();
        builder.add(Operation::Or, &[zero, x], &[out]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let (x, out) = (var(&mut registry, x), var(&mut registry, out));
        assert_eq!(facts.get(Relation::AssignVar).len(), 1);
        assert!(facts.contains(Relation::AssignVar, &[i0, out, x]));
        Ok(())
    }

    #[test]
    fn stores_do_not_assign() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let key = builder.variable();
        let value = builder.variable();
        builder.add(Operation::SStore, &[key, value], &[]);
        builder.add(Operation::MStore, &[key, value], &[]);
        let program = builder.build();

        let (facts, _) = derive_all(&program)?;
        assert!(facts.get(Relation::AssignVar).is_empty());
        Ok(())
    }

    #[test]
    fn static_calls_assign_their_third_operand() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let args: Vec<_> = (0..6).map(|_| builder.variable()).collect();
        let ret = builder.variable();
        builder.add(Operation::StaticCall, &args, &[ret]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let (ret, operand) = (var(&mut registry, ret), var(&mut registry, args[2]));
        assert_eq!(facts.get(Relation::AssignVar).len(), 1);
        assert!(facts.contains(Relation::AssignVar, &[i0, ret, operand]));
        Ok(())
    }

    #[test]
    fn calls_assign_the_transferred_value() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let args: Vec<_> = (0..7).map(|_| builder.variable()).collect();
        let ret = builder.variable();
        builder.add(Operation::Call, &args, &[ret]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let (ret, amount) = (var(&mut registry, ret), var(&mut registry, args[2]));
        assert_eq!(facts.get(Relation::AssignVar).len(), 1);
        assert!(facts.contains(Relation::AssignVar, &[i0, ret, amount]));
        Ok(())
    }

    #[test]
    fn loads_are_typed_with_their_address() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let slot = builder.constant(3_u32);
        let unknown = builder.variable();
        let a = builder.variable();
        let b = builder.variable();
        builder.add(Operation::SLoad, &[slot], &[a]);
        builder.add(Operation::MLoad, &[unknown], &[b]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let (i0, i1) = (instr(&mut registry, 0), instr(&mut registry, 1));
        let (a, b) = (var(&mut registry, a), var(&mut registry, b));
        let unk = registry.unknown()?.into();
        assert!(facts.contains(Relation::AssignType, &[i0, a, Field::Number(3)]));
        assert!(facts.contains(Relation::AssignType, &[i1, b, unk]));
        Ok(())
    }

    #[test]
    fn hashes_relate_to_each_word_of_their_region() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let offset = builder.constant(64_u32);
        let length = builder.constant(10_u32);
        let hash = builder.variable();
        builder.add(Operation::Sha3, &[offset, length], &[hash]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let i0 = instr(&mut registry, 0);
        let hash = var(&mut registry, hash);
        let words: Vec<_> = facts.get(Relation::Sha3).iter().map(|f| f.fields()[2]).collect();
        assert_eq!(words, vec![Field::Number(64), Field::Number(68), Field::Number(72)]);
        assert!(facts.contains(Relation::Sha3, &[i0, hash, Field::Number(64)]));
        assert!(facts.get(Relation::AssignVar).is_empty());
        Ok(())
    }

    #[test]
    fn hashed_region_word_count_is_rounded_up() {
        for length in 0..40_u32 {
            let words = hashed_words(Some(U256::new(8)), Some(U256::from(length)));
            assert_eq!(words.map(|w| w.count()), Some(length.div_ceil(4) as usize));
        }
        assert!(hashed_words(None, Some(U256::new(4))).is_none());
        assert!(hashed_words(Some(U256::MAX), Some(U256::new(4))).is_none());
    }

    #[test]
    fn huge_hashed_regions_are_not_materialised() {
        let length = 0x7fff_fff0_u32;
        let words = hashed_words(Some(U256::ZERO), Some(U256::from(length)));
        assert_eq!(words.as_ref().map(ExactSizeIterator::len), Some(length as usize / 4));

        let first: Vec<_> = words.into_iter().flatten().take(3).collect();
        assert_eq!(first, vec![0, 4, 8]);
    }
}
