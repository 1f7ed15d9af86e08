//! This module is an integration test that drives the semantics along paths
//! through small functions, the way a symbolic executor would.
#![cfg(test)]

use bv_opsem::{
    expr::Sort,
    ir::{Constant, Module, Type},
    vm::{state::Context, Config, TrackLevel},
};

mod common;

use common::{chain_module, join_module, loop_module, Program};

#[test]
fn intra_step_visits_each_instruction_once() -> anyhow::Result<()> {
    let program = Program::new(chain_module()?);
    let sem = program.sem(Config::default());
    let a = program.block("chain", 0)?;

    let mut ctx = sem.mk_context();
    ctx.enter(a);
    let mut positions = Vec::new();
    loop {
        let index = ctx.cursor().map(|c| c.index);
        if !sem.intra_step(&mut ctx)? {
            break;
        }
        positions.push(index);
    }

    assert_eq!(positions, vec![Some(0), Some(1)]);
    assert!(!sem.intra_step(&mut ctx)?);
    assert!(ctx.cursor().is_some_and(|c| c.is_at_terminator(a)));

    Ok(())
}

#[test]
fn edge_composition_matches_a_single_traversal() -> anyhow::Result<()> {
    let program = Program::new(chain_module()?);
    let sem = program.sem(Config::default());
    let (a, b, c) = (program.block("chain", 0)?, program.block("chain", 1)?, program.block("chain", 2)?);

    let mut composed = sem.mk_context();
    sem.exec_edg(a, b, &mut composed)?;
    sem.exec_edg(b, c, &mut composed)?;
    sem.exec(c, &mut composed)?;

    let mut traversed = sem.mk_context();
    sem.exec(a, &mut traversed)?;
    sem.exec_br(a, b, &mut traversed)?;
    sem.exec_phi(b, a, &mut traversed)?;
    sem.exec(b, &mut traversed)?;
    sem.exec_br(b, c, &mut traversed)?;
    sem.exec_phi(c, b, &mut traversed)?;
    sem.exec(c, &mut traversed)?;

    assert_eq!(composed.into_result(), traversed.into_result());

    Ok(())
}

#[test]
fn phis_read_the_value_from_the_predecessor() -> anyhow::Result<()> {
    let program = Program::new(join_module()?);
    let sem = program.sem(Config::default());
    let bld = sem.builder();
    let entry = program.block("join", 0)?;
    let merge = program.block("join", 3)?;
    let x = bld.var("%x!0", Sort::Bv(32));
    let y = bld.var("%y!1", Sort::Bv(32));

    for (arm, expected, other) in [(1, &x, &y), (2, &y, &x)] {
        let arm = program.block("join", arm)?;
        let mut ctx = sem.mk_context();
        sem.exec_edg(entry, arm, &mut ctx)?;
        sem.exec(arm, &mut ctx)?;
        sem.exec_br(arm, merge, &mut ctx)?;
        sem.exec_phi(merge, arm, &mut ctx)?;

        let pick = merge.phis().next().map(|phi| phi.as_local());
        let register = pick
            .and_then(|local| sem.get_symb_reg(&local, &ctx))
            .ok_or_else(|| anyhow::anyhow!("the PHI has a register"))?;
        assert_eq!(&ctx.read(&register), expected);
        assert_ne!(&ctx.read(&register), other);
    }

    Ok(())
}

#[test]
fn back_edges_resolve_phis_on_every_trip() -> anyhow::Result<()> {
    let program = Program::new(loop_module()?);
    let sem = program.sem(Config::default());
    let bld = sem.builder();
    let entry = program.block("spin", 0)?;
    let body = program.block("spin", 1)?;
    let i = body
        .phis()
        .next()
        .map(|phi| phi.as_local())
        .ok_or_else(|| anyhow::anyhow!("the loop has a PHI"))?;

    let mut ctx = sem.mk_context();
    sem.exec_edg(entry, body, &mut ctx)?;
    sem.exec(body, &mut ctx)?;
    let register = sem
        .get_symb_reg(&i, &ctx)
        .ok_or_else(|| anyhow::anyhow!("the PHI has a register"))?;
    assert_eq!(ctx.read(&register), bld.bv_u64(32, 0));

    for _ in 0..2 {
        sem.exec_br(body, body, &mut ctx)?;
        sem.exec(body, &mut ctx)?;
        assert_eq!(ctx.read(&register), bld.bv_u64(32, 7));

        // Clobber the register so that a skipped resolution would show.
        ctx.write(register.clone(), bld.bv_u64(32, 99));
    }

    Ok(())
}

#[test]
fn unhandled_instructions_do_not_stop_the_block() -> anyhow::Result<()> {
    let mut module = Module::new("isolation");
    let mut f = module.build_function("isolation", &[("p", Type::Pointer)], Type::Int(32));
    let entry = f.new_block("entry");
    f.position_at_end(entry);
    let p = f.param(0);
    let swapped = f
        .other("cmpxchg", vec![p], Type::Int(32), "swapped")
        .ok_or_else(|| anyhow::anyhow!("cmpxchg produces a value"))?;
    let next = f.add(swapped, Constant::int(32, 1u8).into(), "next");
    f.ret(Some(next));
    f.finish()?;

    let program = Program::new(module);
    let sem = program.sem(Config::default());
    let bld = sem.builder();
    let entry = program.block("isolation", 0)?;

    let mut ctx = sem.mk_context();
    sem.exec(entry, &mut ctx)?;

    let unconstrained = bld.var("nd!0", Sort::Bv(32));
    let expected = bld.bvadd(unconstrained, bld.bv_u64(32, 1));
    assert_eq!(ctx.return_value(), Some(&expected));
    assert_eq!(ctx.trace().unhandled().count(), 1);
    assert!(!ctx.is_sound());

    Ok(())
}

#[test]
fn paths_can_be_explored_on_separate_threads() -> anyhow::Result<()> {
    let program = Program::new(join_module()?);
    let program = &program;

    let contexts = std::thread::scope(|scope| {
        let handles: Vec<_> = [1, 2]
            .into_iter()
            .map(|arm| {
                scope.spawn(move || -> anyhow::Result<Context> {
                    let sem = program.sem(Config::default());
                    let entry = program.block("join", 0)?;
                    let arm = program.block("join", arm)?;
                    let merge = program.block("join", 3)?;
                    let mut ctx = sem.mk_context();
                    sem.exec_edg(entry, arm, &mut ctx)?;
                    sem.exec_edg(arm, merge, &mut ctx)?;
                    sem.exec(merge, &mut ctx)?;
                    Ok(ctx)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow::anyhow!("path thread panicked"))?)
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let bld = *program.sem(Config::default()).builder();
    let returned: Vec<_> = contexts.iter().map(|ctx| ctx.return_value().cloned()).collect();
    assert_eq!(
        returned,
        vec![
            Some(bld.var("%x!0", Sort::Bv(32))),
            Some(bld.var("%y!1", Sort::Bv(32))),
        ]
    );

    Ok(())
}

#[test]
fn configuration_can_be_read_from_json() -> anyhow::Result<()> {
    let config: Config = serde_json::from_str(
        r#"{
            "track_level": "Ptr",
            "simplify": false,
            "max_symbolic_alloc_bytes": 64,
            "max_concrete_copy_bytes": 32,
            "havoc_memory_on_unknown_call": false
        }"#,
    )?;

    assert_eq!(
        config,
        Config::default()
            .with_track_level(TrackLevel::Ptr)
            .with_simplify(false)
            .with_max_symbolic_alloc_bytes(64)
            .with_max_concrete_copy_bytes(32)
            .with_havoc_memory_on_unknown_call(false)
    );

    Ok(())
}
