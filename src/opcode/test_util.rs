//! Small programs and helpers shared by the unit tests.

use crate::{
    ir::{BasicBlock, BlockId, Constant, FunctionBuilder, IntPredicate, Module, Type},
    vm::{state::Context, value::known::KnownInt, OpSem},
};

/// Builds a module containing the function `name` whose entry block, labelled
/// `entry`, is filled in by `body`.
///
/// The body may add further blocks, but must leave every block terminated.
pub fn single_block(
    name: &str,
    params: &[(&str, Type)],
    return_type: Type,
    body: impl FnOnce(&mut FunctionBuilder),
) -> anyhow::Result<Module> {
    let mut module = Module::new("test");
    let mut function = module.build_function(name, params, return_type);
    let entry = function.new_block("entry");
    function.position_at_end(entry);
    body(&mut function);
    function.finish()?;

    Ok(module)
}

/// Executes the entry block of the function `name` in a fresh context.
pub fn run_function(sem: &OpSem, name: &str) -> anyhow::Result<Context> {
    let entry = sem
        .module()
        .function(name)
        .and_then(|f| f.entry())
        .ok_or_else(|| anyhow::anyhow!("No function {name} with an entry block"))?;
    let mut ctx = sem.mk_context();
    sem.exec(entry, &mut ctx)?;

    Ok(ctx)
}

/// A function `count` with a run of straight-line arithmetic in its entry
/// block.
pub fn counting_module() -> anyhow::Result<Module> {
    single_block("count", &[("n", Type::Int(32))], Type::Int(32), |f| {
        let n = f.param(0);
        let one = f.add(n.clone(), Constant::int(32, 1u8).into(), "one");
        let two = f.add(one.clone(), Constant::int(32, 1u8).into(), "two");
        let both = f.add(one, two, "both");
        f.fence();
        let doubled = f.add(both.clone(), both, "doubled");
        f.ret(Some(doubled));
    })
}

/// A function `branch(x)` that branches on `x < 10` from `entry` to `then`
/// (block 1) or `else` (block 2).
pub fn branching_module() -> anyhow::Result<Module> {
    single_block("branch", &[("x", Type::Int(32))], Type::Int(32), |f| {
        let x = f.param(0);
        let small = f.icmp(IntPredicate::Slt, x, Constant::int(32, 10u8).into(), "small");
        let then_block = f.new_block("then");
        let else_block = f.new_block("else");
        f.cond_br(small, then_block, else_block);

        f.position_at_end(then_block);
        f.ret(Some(Constant::int(32, 1u8).into()));
        f.position_at_end(else_block);
        f.ret(Some(Constant::int(32, 2u8).into()));
    })
}

/// A function `pick(x: i8)` that switches from `entry` to block 1 on 1 or 2,
/// to block 2 on 3, and to block 3 otherwise.
pub fn switch_module() -> anyhow::Result<Module> {
    single_block("pick", &[("x", Type::Int(8))], Type::Void, |f| {
        let x = f.param(0);
        let low = f.new_block("low");
        let three = f.new_block("three");
        let other = f.new_block("other");
        let cases = vec![
            (KnownInt::new(8, 1u8), low),
            (KnownInt::new(8, 2u8), low),
            (KnownInt::new(8, 3u8), three),
        ];
        f.switch(x, other, cases);
        for block in [low, three, other] {
            f.position_at_end(block);
            f.ret(None);
        }
    })
}

/// A function `diamond(x)` in which `entry` branches on `x == 0` to `left`
/// (block 1) or `right` (block 2), both of which jump to `join` (block 3).
/// The join block selects 10 from `left` and 20 from `right`.
pub fn diamond_module() -> anyhow::Result<Module> {
    single_block("diamond", &[("x", Type::Int(32))], Type::Int(32), |f| {
        let x = f.param(0);
        let zero = f.icmp(IntPredicate::Eq, x, Constant::int(32, 0u8).into(), "zero");
        let left = f.new_block("left");
        let right = f.new_block("right");
        let join = f.new_block("join");
        f.cond_br(zero, left, right);

        f.position_at_end(left);
        f.br(join);
        f.position_at_end(right);
        f.br(join);

        f.position_at_end(join);
        let incoming = vec![
            (Constant::int(32, 10u8).into(), left),
            (Constant::int(32, 20u8).into(), right),
        ];
        let merged = f.phi(Type::Int(32), incoming, "merged");
        f.ret(Some(merged));
    })
}

/// Gets the block `id` of the function `name`.
///
/// # Panics
///
/// Panics if there is no such block.
pub fn block<'m>(module: &'m Module, name: &str, id: BlockId) -> &'m BasicBlock {
    module
        .function(name)
        .and_then(|f| f.block(id))
        .unwrap_or_else(|| panic!("No block {} in {name}", id.0))
}
