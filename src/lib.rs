//! This library implements a bit-precise symbolic operational semantics for
//! an SSA intermediate representation modelled on LLVM's. Executing a path
//! through a function produces logical constraints over fixed-width
//! bit-vectors, booleans and a byte-addressed memory array, which can then be
//! handed to an SMT solver.
//!
//! Note that this library does not choose paths, unroll loops or solve the
//! constraints it produces. It is the engine underneath a symbolic executor
//! or bounded model checker, not a replacement for one.
//!
//! # How it Works
//!
//! From a very high level, executing a path proceeds as follows:
//!
//! 1. A program is described as an [`ir::Module`], usually built with the
//!    [`ir::FunctionBuilder`], along with the [`layout::DataLayout`] of the
//!    target and the [`library::TargetLibraryInfo`] describing its library.
//! 2. An [`vm::OpSem`] is created over them, and asked for a fresh
//!    [`vm::state::Context`] for each path to be explored.
//! 3. The driver executes blocks and edges on the path with
//!    [`vm::OpSem::exec`] and [`vm::OpSem::exec_edg`]. Each instruction is
//!    translated into register bindings over [`expr::Expr`] terms, updates of
//!    the memory array and side assertions.
//! 4. Instructions that cannot be modelled are recorded in the
//!    [`vm::trace::Trace`] of the context and leave their results
//!    unconstrained, so execution always continues and the driver can tell
//!    whether the result is exact.
//!
//! # Basic Usage
//!
//! ```
//! use bv_opsem::{
//!     ir::{BlockId, Constant, IntPredicate, Module, Type},
//!     layout::DataLayout,
//!     library::TargetLibraryInfo,
//!     vm::{Config, OpSem},
//! };
//!
//! let mut module = Module::new("example");
//! let mut f = module.build_function("clamp", &[("x", Type::Int(32))], Type::Int(32));
//! let entry = f.new_block("entry");
//! let small = f.new_block("small");
//! let large = f.new_block("large");
//! f.position_at_end(entry);
//! let x = f.param(0);
//! let fits = f.icmp(IntPredicate::Ult, x.clone(), Constant::int(32, 100u8).into(), "fits");
//! f.cond_br(fits, small, large);
//! f.position_at_end(small);
//! f.ret(Some(x));
//! f.position_at_end(large);
//! f.ret(Some(Constant::int(32, 100u8).into()));
//! f.finish().unwrap();
//!
//! let layout = DataLayout::default();
//! let library = TargetLibraryInfo::default();
//! let sem = OpSem::new(&module, &layout, &library, Config::default());
//! let function = module.function("clamp").unwrap();
//!
//! let mut ctx = sem.mk_context();
//! sem.exec_edg(function.block(BlockId(0)).unwrap(), function.block(large).unwrap(), &mut ctx)
//!     .unwrap();
//! sem.exec(function.block(large).unwrap(), &mut ctx).unwrap();
//!
//! assert_eq!(ctx.side().len(), 1);
//! assert!(ctx.is_sound());
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod constant;
pub mod error;
pub mod expr;
pub mod ir;
pub mod layout;
pub mod library;
pub mod opcode;
pub mod vm;

// Re-exports to provide the library interface.
pub use vm::{Config, OpSem, OperationalSemantics, TrackLevel};
