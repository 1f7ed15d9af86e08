//! The conditions under which terminators transfer control along an edge.

use crate::{
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, Sort},
    ir::{BlockId, InstKind, Instruction},
    opcode::{operand, to_sort},
    vm::{state::Context, value::as_bv, OpSem},
};

/// Builds the condition under which `terminator` transfers control to the
/// block `dst`.
///
/// Returns [`None`] when the edge is taken unconditionally, which is the case
/// for unconditional branches and for conditional branches whose targets are
/// both `dst`. A switch takes the edge when its condition equals any case
/// that targets `dst`, or, if `dst` is the default, when it equals none of
/// the cases.
///
/// # Errors
///
/// Returns [`Err`] if `dst` is not a successor of `terminator`, or the branch
/// condition has no symbolic representation.
pub fn edge_condition(
    terminator: &Instruction,
    dst: BlockId,
    sem: &OpSem,
    ctx: &Context,
) -> Result<Option<Expr>> {
    let b = sem.builder();
    let not_a_successor = || {
        Err(Error::NotASuccessor {
            src: ctx.cursor().map_or(0, |c| c.block.0),
            dst: dst.0,
        })
        .locate(terminator.id.0)
    };

    match &terminator.kind {
        InstKind::Br(br) if br.dest == dst => Ok(None),
        InstKind::CondBr(br) if br.then_dest == dst && br.else_dest == dst => Ok(None),
        InstKind::CondBr(br) if br.then_dest == dst || br.else_dest == dst => {
            let condition = operand(sem, terminator, &br.condition, ctx)?;
            let condition = to_sort(b, condition, Sort::Bool);
            if br.then_dest == dst {
                Ok(Some(condition))
            } else {
                Ok(Some(b.not(condition)))
            }
        }
        InstKind::Switch(switch) if terminator.successors().contains(&dst) => {
            let condition = as_bv(b, operand(sem, terminator, &switch.condition, ctx)?);
            let case_value = |value| b.resize_unsigned(b.bv(value), condition.bv_width().unwrap_or(1));

            let mut taken: Vec<Expr> = switch
                .cases
                .iter()
                .filter(|(_, target)| *target == dst)
                .map(|(value, _)| b.eq(condition.clone(), case_value(*value)))
                .collect();
            if switch.default == dst {
                let none = switch
                    .cases
                    .iter()
                    .map(|(value, _)| b.ne(condition.clone(), case_value(*value)))
                    .collect();
                taken.push(b.and(none));
            }

            Ok(Some(b.or(taken)))
        }
        _ => not_a_successor(),
    }
}

#[cfg(test)]
mod test {
    use crate::{
        expr::Sort,
        ir::{BlockId, Constant, Type},
        layout::DataLayout,
        library::TargetLibraryInfo,
        opcode::{control::edge_condition, test_util::switch_module},
        vm::{Config, OpSem},
    };

    #[test]
    fn switch_edges_partition_the_condition() -> anyhow::Result<()> {
        let module = switch_module()?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let b = sem.builder();
        let function = module.function("pick").expect("function exists");
        let entry = function.entry().expect("entry exists");
        let terminator = entry.terminator().expect("entry is terminated");
        let mut ctx = sem.mk_context();
        ctx.enter(entry);
        let x = b.var("%x!0", Sort::Bv(8));
        let is = |v| b.eq(x.clone(), b.bv_u64(8, v));
        let is_not = |v| b.ne(x.clone(), b.bv_u64(8, v));

        let one_or_two = edge_condition(terminator, BlockId(1), &sem, &ctx)?;
        assert_eq!(one_or_two, Some(b.or(vec![is(1), is(2)])));

        let three = edge_condition(terminator, BlockId(2), &sem, &ctx)?;
        assert_eq!(three, Some(b.or(vec![is(3)])));

        let default = edge_condition(terminator, BlockId(3), &sem, &ctx)?;
        let expected = b.or(vec![b.and(vec![is_not(1), is_not(2), is_not(3)])]);
        assert_eq!(default, Some(expected));

        assert!(edge_condition(terminator, BlockId(0), &sem, &ctx).is_err());

        Ok(())
    }

    #[test]
    fn branches_to_the_same_block_are_unconditional() -> anyhow::Result<()> {
        let module = crate::opcode::test_util::single_block("same", &[], Type::Void, |f| {
            let exit = f.new_block("exit");
            f.cond_br(Constant::bool(true).into(), exit, exit);
            f.position_at_end(exit);
            f.ret(None);
        })?;
        let layout = DataLayout::default();
        let library = TargetLibraryInfo::default();
        let sem = OpSem::new(&module, &layout, &library, Config::default());
        let entry = module.function("same").and_then(|f| f.entry()).expect("entry exists");
        let terminator = entry.terminator().expect("entry is terminated");

        let ctx = sem.mk_context();
        assert_eq!(edge_condition(terminator, BlockId(1), &sem, &ctx)?, None);

        Ok(())
    }
}
