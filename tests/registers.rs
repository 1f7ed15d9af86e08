//! This module is an integration test that checks how program values are
//! mapped to symbolic registers and how instructions are classified.
#![cfg(test)]

use bv_opsem::{
    ir::{BinaryOp, Constant, Local, Module, Type, Value, ValueId},
    vm::{trace::Classification, Config, TrackLevel},
};
use proptest::prelude::*;

mod common;

use common::Program;

/// Builds a function `mixed(x: i32, f: float) -> i32` whose entry block holds
/// one tracked, one skipped and one unhandled instruction, followed by a
/// tracked use of the unhandled result.
fn mixed_module() -> anyhow::Result<Module> {
    let mut module = Module::new("mixed");
    let mut f = module.build_function(
        "mixed",
        &[("x", Type::Int(32)), ("f", Type::Float)],
        Type::Int(32),
    );
    let entry = f.new_block("entry");
    f.position_at_end(entry);
    let x = f.param(0);
    let float = f.param(1);

    let inc = f.add(x.clone(), Constant::int(32, 1u8).into(), "inc");
    f.binary(BinaryOp::FAdd, float.clone(), float, "sum");
    let old = f
        .other("atomicrmw", vec![x], Type::Int(32), "old")
        .ok_or_else(|| anyhow::anyhow!("atomicrmw produces a value"))?;
    let after = f.add(old, inc, "after");
    f.ret(Some(after));
    f.finish()?;

    Ok(module)
}

#[test]
fn registers_are_created_once_per_value() -> anyhow::Result<()> {
    let program = Program::new(Module::new("registers"));
    let sem = program.sem(Config::default());
    let mut ctx = sem.mk_context();
    let local = Local {
        id:   ValueId(3),
        ty:   Type::Int(16),
        name: Some("n".into()),
    };

    assert!(sem.get_symb_reg(&local, &ctx).is_none());
    let first = sem.mk_symb_reg(&local, &mut ctx)?;
    let second = sem.mk_symb_reg(&local, &mut ctx)?;
    assert_eq!(first, second);
    assert_eq!(first.var_name(), Some("%n!3"));
    assert_eq!(sem.get_symb_reg(&local, &ctx), Some(first.clone()));
    assert_eq!(sem.conc(&first, &ctx), ValueId(3));
    assert!(sem.is_sym_reg(&first, &ctx));
    assert!(!sem.is_sym_reg(&sem.builder().bv_u64(16, 3), &ctx));

    Ok(())
}

#[test]
fn every_instruction_has_exactly_one_classification() -> anyhow::Result<()> {
    let program = Program::new(mixed_module()?);
    let sem = program.sem(Config::default());
    let entry = program.block("mixed", 0)?;

    let mut ctx = sem.mk_context();
    sem.exec(entry, &mut ctx)?;

    let body = &entry.instructions[..entry.instructions.len() - 1];
    let mut seen = Vec::new();
    for instruction in body {
        let classification = ctx
            .classification(instruction.id)
            .ok_or_else(|| anyhow::anyhow!("{instruction} was not classified"))?;
        let location = Some(instruction.id.0);
        let skipped = ctx.trace().skipped().any(|r| r.location == location);
        let unhandled = ctx.trace().unhandled().any(|r| r.location == location);

        match classification {
            Classification::Tracked => assert!(!skipped && !unhandled),
            Classification::Skipped => assert!(skipped && !unhandled),
            Classification::Unhandled => assert!(unhandled && !skipped),
        }
        if let Some(result) = instruction.result() {
            assert_eq!(sem.is_skipped(&result), classification == Classification::Skipped);
        }
        seen.push(classification);
    }

    assert_eq!(
        seen,
        vec![
            Classification::Tracked,
            Classification::Skipped,
            Classification::Unhandled,
            Classification::Tracked,
        ]
    );
    assert!(!ctx.is_sound());

    Ok(())
}

#[test]
fn pointer_values_follow_the_track_level() {
    let program = Program::new(Module::new("levels"));
    let pointer = Value::Constant(Constant::Null);
    let int = Value::Constant(Constant::int(8, 1u8));

    let registers_only = program.sem(Config::default().with_track_level(TrackLevel::Reg));
    assert!(registers_only.is_skipped(&pointer));
    assert!(registers_only.is_tracked(&int));

    let pointers = program.sem(Config::default().with_track_level(TrackLevel::Ptr));
    assert!(pointers.is_tracked(&pointer));
    assert!(!pointers.is_skipped(&pointer));
}

proptest! {
    #[test]
    fn register_creation_is_idempotent(id in 0u32..1000, width in 1u32..=128, named: bool) {
        let program = Program::new(Module::new("registers"));
        let sem = program.sem(Config::default());
        let mut ctx = sem.mk_context();
        let local = Local {
            id:   ValueId(id),
            ty:   Type::Int(width),
            name: named.then(|| "v".into()),
        };

        let first = sem.mk_symb_reg(&local, &mut ctx).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let second = sem.mk_symb_reg(&local, &mut ctx).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(ctx.registers().len(), 1);
        prop_assert_eq!(sem.conc(&first, &ctx), ValueId(id));
    }
}
