//! This module contains the pass that describes the region controlled by each
//! conditional branch.

use crate::{
    error::derivation::Error,
    facts::{
        derive::{DerivationContext, DerivationPass},
        Relation,
    },
    program::{InstructionId, Operation},
    registry::Node,
};

/// Emits the facts relating each conditional branch to its condition and to
/// the code it controls.
///
/// Each arm that does not lead straight to the merge point is tainted by the
/// condition. The merge point, when resolved, ends the conditional region. A
/// `goto` fact always records the condition and the else-arm, with the
/// branch's sentinel standing in for a missing else-arm.
#[derive(Debug)]
pub struct ConditionalPass;

impl DerivationPass for ConditionalPass {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn derive(&self, id: InstructionId, context: &mut DerivationContext<'_, '_>) -> Result<(), Error> {
        let instruction = context.instruction(id);
        if !instruction.is(Operation::JumpI) {
            return Ok(());
        }

        let condition = context.input(id, 1, "condition")?;
        let then_arm = instruction.target();
        let else_arm = instruction.next();
        let merge = instruction.merge();

        let branch = context.node(id)?;
        let condition = context.var(condition)?;

        for arm in [then_arm, else_arm].into_iter().flatten() {
            if Some(arm) != merge {
                let arm = context.node(arm)?;
                context.add(Relation::Taint, [branch.into(), arm.into(), condition.into()]);
            }
        }

        if let Some(merge) = merge {
            let merge = context.node(merge)?;
            context.add(Relation::EndIf, [branch.into(), merge.into()]);
        }

        let else_node = match else_arm {
            Some(arm) => Node::from(arm),
            None => context.sentinel(id),
        };
        let else_code = context.node(else_node)?;
        context.add(Relation::Goto, [branch.into(), condition.into(), else_code.into()]);

        Ok(())
    }
}
