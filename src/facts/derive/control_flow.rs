//! This module contains the pass that describes how control moves between the
//! instructions of a program.

use itertools::Itertools;

use crate::{
    constant::SYNTHETIC_JOIN_LABEL,
    error::derivation::Error,
    facts::{
        derive::{DerivationContext, DerivationPass},
        Relation,
    },
    program::{InstructionId, Operation},
    registry::Node,
};

/// Emits the control-flow facts of the program.
///
/// # May and Must Flow
///
/// Every edge is a `followsMayImplicit` fact. Edges that are taken whenever
/// their source executes are also `followsMustExplicit` facts; this excludes
/// the edges of a conditional branch that lead to a jump destination. Branches
/// additionally emit `jump` facts carrying the point at which their arms meet.
///
/// # Joins
///
/// Where control from several predecessors meets at a jump destination, the
/// predecessors are folded pairwise from the left into a chain of `join`
/// facts. The intermediate results are synthetic nodes and the final result
/// is the destination itself, so `N` predecessors produce `N - 1` facts.
#[derive(Debug)]
pub struct ControlFlowPass;

impl DerivationPass for ControlFlowPass {
    fn name(&self) -> &'static str {
        "control flow"
    }

    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
        let instruction = context.instruction(id);

        if instruction.is(Operation::JumpDest) {
            let dest = context.node(id)?;
            context.add(Relation::JumpDest, [dest.into()]);
            if instruction.incoming().len() == 1 && instruction.prev().is_none() {
                context.add(Relation::OneBranchJumpDest, [dest.into()]);
            }
        }

        if instruction.operation().is_branch() {
            let program = context.program();
            for target in instruction.branches() {
                if !program.instruction(*target).is(Operation::MethodHead) {
                    follows(id, *target, context)?;
                }
            }
        }

        if let Some(next) = instruction.next() {
            follows(id, next, context)?;
        }

        Ok(())
    }
}

/// Emits the facts for the edge from `from` to `to`.
fn follows(
    from: InstructionId,
    to: InstructionId,
    context: &mut DerivationContext<'_, '_>,
) -> Result<(), Error> {
    let source = context.instruction(from);
    let target = context.instruction(to);
    let to_dest = target.is(Operation::JumpDest);

    let from_code = context.node(from)?;
    let to_code = context.node(to)?;
    context.add(Relation::FollowsMayImplicit, [from_code.into(), to_code.into()]);

    match source.operation() {
        Operation::JumpI => {
            let merge = context.merge_or_sentinel(from);
            let merge = context.node(merge)?;
            if !to_dest {
                context.add(Relation::FollowsMustExplicit, [from_code.into(), to_code.into()]);
            }
            context.add(Relation::Jump, [from_code.into(), to_code.into(), merge.into()]);
        }
        Operation::Jump => {
            context.add(Relation::Jump, [from_code.into(), to_code.into(), to_code.into()]);
        }
        _ => {
            context.add(Relation::FollowsMustExplicit, [from_code.into(), to_code.into()]);
        }
    }

    if to_dest && context.mark_joined(to) {
        join(to, context)?;
    }

    Ok(())
}

/// Emits the chain of `join` facts for the jump destination `dest`.
///
/// A destination with a single predecessor joins that predecessor with
/// itself.
fn join(dest: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
    let instruction = context.instruction(dest);
    let predecessors = instruction
        .incoming()
        .iter()
        .copied()
        .chain(instruction.prev())
        .map(Node::from)
        .collect_vec();
    let Some((first, rest)) = predecessors.split_first() else {
        return Ok(());
    };
    let Some((last_pred, middle)) = rest.split_last() else {
        let first = context.node(*first)?;
        let dest = context.node(dest)?;
        context.add(Relation::Join, [first.into(), first.into(), dest.into()]);
        return Ok(());
    };

    let mut accumulated = *first;
    for (i, pred) in middle.iter().enumerate() {
        let merged = context.synthetic(format!("{dest}_{SYNTHETIC_JOIN_LABEL}_{}", i + 1));
        let fields = [
            context.node(accumulated)?.into(),
            context.node(*pred)?.into(),
            context.node(merged)?.into(),
        ];
        context.add(Relation::Join, fields);
        accumulated = merged;
    }

    let fields = [
        context.node(accumulated)?.into(),
        context.node(*last_pred)?.into(),
        context.node(dest)?.into(),
    ];
    context.add(Relation::Join, fields);

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        facts::{
            derive::test_util::{derive_all, instr, node},
            Field,
            Relation,
        },
        program::{Operation, ProgramBuilder},
        registry::Node,
    };

    #[test]
    fn sequential_edges_must_follow() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        builder.add(Operation::Caller, &[], &[]);
        builder.add(Operation::Stop, &[], &[]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let (i0, i1) = (instr(&mut registry, 0), instr(&mut registry, 1));
        assert!(facts.contains(Relation::FollowsMayImplicit, &[i0, i1]));
        assert!(facts.contains(Relation::FollowsMustExplicit, &[i0, i1]));
        assert!(facts.get(Relation::Jump).is_empty());
        Ok(())
    }

    #[test]
    fn unconditional_jumps_merge_at_their_target() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let jump = builder.add(Operation::Jump, &[], &[]);
        let dest = builder.add(Operation::JumpDest, &[], &[]);
        builder.branch(jump, dest);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let (jump, dest) = (node(&mut registry, jump), node(&mut registry, dest));
        assert!(facts.contains(Relation::Jump, &[jump, dest, dest]));
        assert!(!facts.contains(Relation::FollowsMustExplicit, &[jump, dest]));
        assert!(facts.contains(Relation::OneBranchJumpDest, &[dest]));
        assert!(facts.contains(Relation::Join, &[jump, jump, dest]));
        Ok(())
    }

    #[test]
    fn conditional_edges_into_destinations_are_not_must() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let target = builder.variable();
        let condition = builder.variable();
        let branch = builder.add(Operation::JumpI, &[target, condition], &[]);
        let fallthrough = builder.add(Operation::Stop, &[], &[]);
        let dest = builder.add(Operation::JumpDest, &[], &[]);
        builder.branch(branch, dest);
        builder.merge(branch, dest);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let (branch, fallthrough, dest) = (
            node(&mut registry, branch),
            node(&mut registry, fallthrough),
            node(&mut registry, dest),
        );
        assert!(facts.contains(Relation::FollowsMayImplicit, &[branch, dest]));
        assert!(!facts.contains(Relation::FollowsMustExplicit, &[branch, dest]));
        assert!(facts.contains(Relation::FollowsMustExplicit, &[branch, fallthrough]));
        assert!(facts.contains(Relation::Jump, &[branch, dest, dest]));
        assert!(facts.contains(Relation::Jump, &[branch, fallthrough, dest]));
        Ok(())
    }

    #[test]
    fn unresolved_merges_use_one_sentinel_per_branch() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let target = builder.variable();
        let condition = builder.variable();
        builder.add(Operation::JumpI, &[target, condition], &[]);
        builder.add(Operation::JumpI, &[target, condition], &[]);
        builder.add(Operation::Stop, &[], &[]);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let merges: Vec<_> = facts.get(Relation::Jump).iter().map(|f| f.fields()[2]).collect();
        assert_eq!(merges.len(), 2);
        assert_ne!(merges[0], merges[1]);
        for merge in merges {
            let Field::Code(code) = merge else {
                panic!("merge nodes are codes");
            };
            let Some(Node::Synthetic(id)) = registry.node_for(code) else {
                panic!("unresolved merges are synthetic");
            };
            assert_eq!(registry.synthetic_label(id), Some("BLACKHOLE"));
        }
        Ok(())
    }

    #[test]
    fn joins_fold_predecessors_from_the_left() -> anyhow::Result<()> {
        for sources in 1..6 {
            let mut builder = ProgramBuilder::new();
            let jumps: Vec<_> = (0..sources)
                .map(|_| builder.add(Operation::Jump, &[], &[]))
                .collect();
            let dest = builder.add(Operation::JumpDest, &[], &[]);
            for jump in &jumps {
                builder.branch(*jump, dest);
            }
            let program = builder.build();

            let (facts, mut registry) = derive_all(&program)?;
            let joins = facts.get(Relation::Join);
            let expected = if sources == 1 { 1 } else { sources - 1 };
            assert_eq!(joins.len(), expected);

            let dest = node(&mut registry, dest);
            let first = node(&mut registry, jumps[0]);
            assert_eq!(joins.last().map(|f| f.fields()[2]), Some(dest));
            assert_eq!(joins[0].fields()[0], first);

            // Each synthetic result feeds the next join.
            for pair in joins.windows(2) {
                assert_eq!(pair[0].fields()[2], pair[1].fields()[0]);
            }
        }
        Ok(())
    }

    #[test]
    fn sequential_predecessor_joins_last() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let jump = builder.add(Operation::Jump, &[], &[]);
        let caller = builder.add(Operation::Caller, &[], &[]);
        let dest = builder.add(Operation::JumpDest, &[], &[]);
        builder.branch(jump, dest);
        let program = builder.build();

        let (facts, mut registry) = derive_all(&program)?;
        let (jump, caller, dest) = (
            node(&mut registry, jump),
            node(&mut registry, caller),
            node(&mut registry, dest),
        );
        assert_eq!(facts.get(Relation::Join).len(), 1);
        assert!(facts.contains(Relation::Join, &[jump, caller, dest]));
        assert!(!facts.contains(Relation::OneBranchJumpDest, &[dest]));
        Ok(())
    }

    #[test]
    fn method_heads_are_not_branch_targets() -> anyhow::Result<()> {
        let mut builder = ProgramBuilder::new();
        let jump = builder.add(Operation::Jump, &[], &[]);
        let head = builder.add(Operation::MethodHead, &[], &[]);
        builder.branch(jump, head);
        let program = builder.build();

        let (facts, _) = derive_all(&program)?;
        assert!(facts.get(Relation::FollowsMayImplicit).is_empty());
        Ok(())
    }
}
