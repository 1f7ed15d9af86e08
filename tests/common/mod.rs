//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use bv_opsem::{
    ir::{BasicBlock, BlockId, Constant, IntPredicate, Module, Type},
    layout::DataLayout,
    library::TargetLibraryInfo,
    vm::{Config, OpSem},
};

/// The immutable inputs that an [`OpSem`] borrows.
pub struct Program {
    pub module:  Module,
    pub layout:  DataLayout,
    pub library: TargetLibraryInfo,
}

impl Program {
    /// Wraps `module` with the default little-endian, 64-bit layout and the
    /// full library.
    pub fn new(module: Module) -> Self {
        Self {
            module,
            layout: DataLayout::default(),
            library: TargetLibraryInfo::default(),
        }
    }

    /// Creates the semantics of the program with `config`.
    pub fn sem(&self, config: Config) -> OpSem<'_> {
        OpSem::new(&self.module, &self.layout, &self.library, config)
    }

    /// Gets block `id` of the function `name`.
    pub fn block(&self, name: &str, id: u32) -> anyhow::Result<&BasicBlock> {
        self.module
            .function(name)
            .and_then(|f| f.block(BlockId(id)))
            .ok_or_else(|| anyhow::anyhow!("No block {id} in function {name}"))
    }
}

/// Builds a function `chain(x: i32) -> i32` over four blocks:
///
/// ```text
/// a:    %inc = add %x, 1
///       %big = icmp sgt %inc, 5
///       br %big, b, exit
/// b:    %twice = add %inc, %inc
///       br c
/// c:    %out = phi [%twice, b]
///       ret %out
/// exit: ret 0
/// ```
#[allow(unused)] // Not every test binary uses every fixture
pub fn chain_module() -> anyhow::Result<Module> {
    let mut module = Module::new("chain");
    let mut f = module.build_function("chain", &[("x", Type::Int(32))], Type::Int(32));
    let a = f.new_block("a");
    let b = f.new_block("b");
    let c = f.new_block("c");
    let exit = f.new_block("exit");

    f.position_at_end(a);
    let x = f.param(0);
    let inc = f.add(x, Constant::int(32, 1u8).into(), "inc");
    let big = f.icmp(IntPredicate::Sgt, inc.clone(), Constant::int(32, 5u8).into(), "big");
    f.cond_br(big, b, exit);

    f.position_at_end(b);
    let twice = f.add(inc.clone(), inc, "twice");
    f.br(c);

    f.position_at_end(c);
    let out = f.phi(Type::Int(32), vec![(twice, b)], "out");
    f.ret(Some(out));

    f.position_at_end(exit);
    f.ret(Some(Constant::int(32, 0u8).into()));
    f.finish()?;

    Ok(module)
}

/// Builds a function `join(x: i32, y: i32) -> i32` in which `entry` (block
/// 0) branches on `x < y` to `from_x` (block 1) or `from_y` (block 2), both of
/// which jump to `merge` (block 3), where `%pick = phi [%x, from_x], [%y,
/// from_y]` is returned.
#[allow(unused)] // Not every test binary uses every fixture
pub fn join_module() -> anyhow::Result<Module> {
    let mut module = Module::new("join");
    let mut f = module.build_function(
        "join",
        &[("x", Type::Int(32)), ("y", Type::Int(32))],
        Type::Int(32),
    );
    let entry = f.new_block("entry");
    let from_x = f.new_block("from_x");
    let from_y = f.new_block("from_y");
    let merge = f.new_block("merge");
    let x = f.param(0);
    let y = f.param(1);

    f.position_at_end(entry);
    let less = f.icmp(IntPredicate::Slt, x.clone(), y.clone(), "less");
    f.cond_br(less, from_x, from_y);
    f.position_at_end(from_x);
    f.br(merge);
    f.position_at_end(from_y);
    f.br(merge);

    f.position_at_end(merge);
    let pick = f.phi(Type::Int(32), vec![(x, from_x), (y, from_y)], "pick");
    f.ret(Some(pick));
    f.finish()?;

    Ok(module)
}

/// Builds a function `spin() -> i32` whose `body` (block 1) loops on itself:
///
/// ```text
/// entry: br body
/// body:  %i = phi [0, entry], [7, body]
///        %more = icmp ult %i, 100
///        br %more, body, exit
/// exit:  ret %i
/// ```
#[allow(unused)] // Not every test binary uses every fixture
pub fn loop_module() -> anyhow::Result<Module> {
    let mut module = Module::new("spin");
    let mut f = module.build_function("spin", &[], Type::Int(32));
    let entry = f.new_block("entry");
    let body = f.new_block("body");
    let exit = f.new_block("exit");

    f.position_at_end(entry);
    f.br(body);

    f.position_at_end(body);
    let i = f.phi(
        Type::Int(32),
        vec![
            (Constant::int(32, 0u8).into(), entry),
            (Constant::int(32, 7u8).into(), body),
        ],
        "i",
    );
    let more = f.icmp(IntPredicate::Ult, i.clone(), Constant::int(32, 100u8).into(), "more");
    f.cond_br(more, body, exit);

    f.position_at_end(exit);
    f.ret(Some(i));
    f.finish()?;

    Ok(module)
}
