//! This module contains the operational semantics: the engine that turns the
//! instructions of basic blocks into logical constraints over an execution
//! [`Context`].
//!
//! The engine is driven from the outside. A driver picks a path through the
//! control-flow graph and asks the engine to execute each block or edge on
//! it, one [`Context`] per path. The engine itself never chooses a successor.

pub mod constant;
pub mod offset;
pub mod register;
pub mod state;
pub mod trace;
pub mod value;

use std::{cell::RefCell, collections::HashMap, sync::Arc};

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    constant::{
        DEFAULT_HAVOC_MEMORY_ON_UNKNOWN_CALL,
        DEFAULT_MAX_CONCRETE_COPY_BYTES,
        DEFAULT_MAX_SYMBOLIC_ALLOC_BYTES,
        DEFAULT_SIMPLIFY_ENABLED,
        ERROR_FLAG_PREFIX,
        MEMORY_REGISTER_NAME,
        NAME_SEPARATOR,
        SKIPPED_CALL_PREFIXES,
    },
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, ExprBuilder, Sort},
    ir::{BasicBlock, BlockId, Callee, Global, InstKind, Instruction, Module, Value},
    layout::DataLayout,
    library::{LibFunc, TargetLibraryInfo},
    opcode,
    vm::{
        state::{
            memory::{Memory, Region},
            Context,
            Cursor,
            DriverState,
            OpSemContext,
        },
        trace::{Classification, TraceRecord},
        value::to_bytes,
    },
};

/// The bit-precise operational semantics of the IR.
///
/// The engine borrows the module it executes along with the data layout and
/// library oracles, all of which are immutable. Everything that changes
/// during execution lives in a [`Context`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct OpSem<'a> {
    /// The program being executed.
    module: &'a Module,

    /// The layout of values in memory.
    layout: &'a DataLayout,

    /// The library functions that calls may be resolved to.
    library: &'a TargetLibraryInfo,

    /// The configuration of the semantics.
    config: Config,

    /// A builder for new terms with configuration.
    builder: ExprBuilder,

    /// The error flag of every block that has been asked for one.
    #[derivative(Debug = "ignore")]
    error_flags: RefCell<HashMap<(Arc<str>, BlockId), Expr>>,
}

impl<'a> OpSem<'a> {
    /// Constructs the semantics of `module` on a target described by `layout`
    /// and `library`.
    #[must_use]
    pub fn new(
        module: &'a Module,
        layout: &'a DataLayout,
        library: &'a TargetLibraryInfo,
        config: Config,
    ) -> Self {
        let builder = ExprBuilder::new(config.simplify);
        let error_flags = RefCell::new(HashMap::new());
        Self {
            module,
            layout,
            library,
            config,
            builder,
            error_flags,
        }
    }

    /// Gets the module being executed.
    #[must_use]
    pub fn module(&self) -> &'a Module {
        self.module
    }

    /// Gets the data layout of the target.
    #[must_use]
    pub fn layout(&self) -> &'a DataLayout {
        self.layout
    }

    /// Gets the library functions of the target.
    #[must_use]
    pub fn library(&self) -> &'a TargetLibraryInfo {
        self.library
    }

    /// Gets the configuration of the semantics.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the builder used for every term the semantics creates.
    #[must_use]
    pub fn builder(&self) -> &ExprBuilder {
        &self.builder
    }

    /// Creates a fresh context for executing the module.
    ///
    /// Every global and every function whose address is used receives an
    /// address, and when memory is tracked the initial contents of every
    /// global with an initialiser are written into memory. Memory that no
    /// initialiser covers is unconstrained.
    #[must_use]
    pub fn mk_context(&self) -> Context {
        let b = &self.builder;
        let array = b.var(
            MEMORY_REGISTER_NAME,
            Sort::Array {
                index:   self.pointer_size_in_bits(),
                element: 8,
            },
        );
        let mut ctx = Context::new(Memory::new(array));

        for global in self.module.globals() {
            let size = self.alloc_size(&global.value_type).unwrap_or_else(|error| {
                warn!(global = %global.reference, %error, "global has no size");
                0
            });
            let align = self.layout.abi_align(&global.value_type).unwrap_or(1);
            match ctx.memory_mut().allocate(Region::Global, size, align) {
                Some(address) => ctx.set_global_address(global.reference.id, address),
                None => warn!(global = %global.reference, size, "global does not fit in memory"),
            }
        }
        for name in self.module.referenced_functions() {
            match ctx.memory_mut().allocate(Region::Global, 1, 1) {
                Some(address) => ctx.set_function_address(name, address),
                None => warn!(function = %name, "function does not fit in memory"),
            }
        }

        if self.config.track_level == TrackLevel::Mem {
            for global in self.module.globals() {
                self.initialise_global(global, &mut ctx);
            }
        }

        ctx
    }

    /// Writes the initial contents of `global` into the memory of `ctx`.
    fn initialise_global(&self, global: &Global, ctx: &mut Context) {
        let (Some(initializer), Some(address)) =
            (&global.initializer, ctx.global_address(global.reference.id))
        else {
            return;
        };
        let b = &self.builder;
        let ty = initializer.ty();
        let size = match self.storage_size(&ty) {
            Ok(size) if size <= self.config.max_concrete_copy_bytes => size,
            Ok(size) => {
                warn!(global = %global.reference, size, "initialiser too large, leaving it unconstrained");
                return;
            }
            Err(error) => {
                self.unhandled_value(&initializer.clone().into(), &error.to_string(), ctx);
                return;
            }
        };

        let mut buffer = vec![0u8; usize::try_from(size).unwrap_or_default()];
        if self.init_memory(initializer, &mut buffer).is_ok() {
            ctx.memory_mut().store_concrete(b, address, &buffer);
            return;
        }

        // Initialisers that refer to other addresses are built symbolically.
        let bytes = self
            .constant_term(initializer, ctx)
            .and_then(|term| to_bytes(b, term, &ty, self.layout));
        match bytes {
            Ok(bytes) => {
                let base = b.bv_u64(self.pointer_size_in_bits(), address);
                ctx.memory_mut().store(b, &base, bytes);
            }
            Err(error) => {
                self.unhandled_value(&initializer.clone().into(), &error.to_string(), ctx);
            }
        }
    }

    /// Finds the block that `cursor` points into.
    pub(crate) fn block_at(&self, cursor: &Cursor) -> Result<&'a BasicBlock> {
        self.module
            .function(&cursor.function)
            .and_then(|f| f.block(cursor.block))
            .ok_or(Error::NoSuchBlock {
                block: cursor.block.0,
            })
            .locate(0)
    }

    /// Finds the block `id` in the function containing `sibling`.
    fn sibling_block(&self, sibling: &BasicBlock, id: BlockId) -> Result<&'a BasicBlock> {
        self.module
            .function(&sibling.parent)
            .and_then(|f| f.block(id))
            .ok_or(Error::NoSuchBlock { block: id.0 })
            .locate(sibling.terminator().map_or(0, |t| t.id.0))
    }

    /// Executes the instruction at the cursor of `ctx` and advances the
    /// cursor past it.
    ///
    /// PHI nodes are consumed without being executed, as they are resolved by
    /// [`Self::intra_phi`] when the block is entered. Instructions that
    /// cannot be modelled are recorded as unhandled and leave their result
    /// unconstrained, so execution always continues.
    ///
    /// Returns `true` if an instruction was consumed, and `false` once the
    /// cursor has reached the terminator of the block.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the cursor does not point into the module.
    pub fn intra_step(&self, ctx: &mut Context) -> Result<bool> {
        let Some(cursor) = ctx.cursor().cloned() else {
            return Ok(false);
        };
        let block = self.block_at(&cursor)?;
        let Some(instruction) = block
            .instruction(cursor.index)
            .filter(|i| !i.is_terminator())
        else {
            ctx.set_state(DriverState::AtTerminator);
            return Ok(false);
        };

        if !instruction.is_phi() {
            self.translate(instruction, ctx);
        }
        ctx.advance();

        Ok(true)
    }

    /// Translates a single non-PHI instruction.
    fn translate(&self, instruction: &Instruction, ctx: &mut Context) {
        if self.classify(instruction, ctx) == Classification::Skipped {
            self.skip_inst(instruction, ctx);
            return;
        }

        debug!(%instruction, "translating");
        if let Err(error) = opcode::translate(instruction, self, ctx) {
            self.unhandled_inst(instruction, &error.payload.to_string(), ctx);
        }
    }

    /// Gets the classification of `instruction`, deciding it on first use.
    fn classify(&self, instruction: &Instruction, ctx: &mut Context) -> Classification {
        if let Some(classification) = ctx.classification(instruction.id) {
            return classification;
        }
        let classification = if self.is_skipped_inst(instruction) {
            Classification::Skipped
        } else {
            Classification::Tracked
        };
        ctx.classify(instruction.id, classification);

        classification
    }

    /// Checks whether `instruction` is ignored by the semantics because it
    /// has no effect on tracked state.
    #[must_use]
    pub fn is_skipped_inst(&self, instruction: &Instruction) -> bool {
        match &instruction.kind {
            InstKind::Fence => true,
            InstKind::Store(_) => self.config.track_level < TrackLevel::Mem,
            InstKind::Call(call) => match &call.callee {
                Callee::Direct(name) => {
                    SKIPPED_CALL_PREFIXES.iter().any(|p| name.starts_with(p))
                        || self
                            .library
                            .get_lib_func(name)
                            .is_some_and(LibFunc::is_deallocation)
                }
                Callee::Indirect(_) => false,
            },
            kind if kind.is_terminator() => false,
            _ => !instruction.ty.is_void() && !self.is_type_tracked(&instruction.ty),
        }
    }

    /// Resolves the PHI nodes of the block at the cursor of `ctx` for the
    /// edge from the recorded previous block.
    ///
    /// The PHI nodes are evaluated in parallel: every incoming value is read
    /// before any PHI register is written, so PHIs that refer to each other
    /// see the values from the end of the previous block.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the cursor does not point into the module.
    pub fn intra_phi(&self, ctx: &mut Context) -> Result<()> {
        let (Some(cursor), Some(from)) = (ctx.cursor().cloned(), ctx.prev()) else {
            return Ok(());
        };
        let block = self.block_at(&cursor)?;

        let mut writes = Vec::new();
        for instruction in block.phis() {
            let InstKind::Phi(phi) = &instruction.kind else {
                continue;
            };
            if self.classify(instruction, ctx) == Classification::Skipped {
                self.skip_inst(instruction, ctx);
                continue;
            }

            let register = self.mk_symb_reg(&instruction.as_local(), ctx);
            let value = phi
                .incoming_for(from)
                .ok_or(Error::NotASuccessor {
                    src: from.0,
                    dst: block.id.0,
                })
                .and_then(|incoming| self.get_operand_value(incoming, ctx));
            match (register, value) {
                (Ok(register), Ok(value)) if register.sort() == value.sort() => {
                    writes.push((register, value));
                }
                (Ok(register), Ok(value)) => {
                    let error = Error::SortMismatch {
                        expected: register.sort(),
                        found:    value.sort(),
                    };
                    self.record_unhandled(instruction, &error.to_string(), ctx);
                    writes.push((register.clone(), ctx.fresh(&self.builder, register.sort())));
                }
                (Ok(register), Err(error)) => {
                    self.record_unhandled(instruction, &error.to_string(), ctx);
                    writes.push((register.clone(), ctx.fresh(&self.builder, register.sort())));
                }
                (Err(error), _) => self.record_unhandled(instruction, &error.to_string(), ctx),
            }
        }

        for (register, value) in writes {
            ctx.write(register, value);
        }
        ctx.mark_phis_resolved(block.id, from);

        Ok(())
    }

    /// Takes the edge from the block at the cursor of `ctx` to `dst`,
    /// asserting the condition under which the terminator transfers control
    /// there and recording the current block as the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if there is no current block, the current block does
    /// not end in a terminator or `dst` is not one of its successors.
    pub fn intra_br(&self, dst: &BasicBlock, ctx: &mut Context) -> Result<()> {
        let Some(cursor) = ctx.cursor().cloned() else {
            return Err(Error::NoSuchBlock { block: dst.id.0 }).locate(0);
        };
        let block = self.block_at(&cursor)?;
        let terminator = block
            .terminator()
            .ok_or(Error::NoTerminator { block: block.id.0 })
            .locate(block.instructions.last().map_or(0, |i| i.id.0))?;
        if dst.parent != block.parent {
            return Err(Error::NotASuccessor {
                src: block.id.0,
                dst: dst.id.0,
            })
            .locate(terminator.id.0);
        }

        if let Some(condition) = opcode::control::edge_condition(terminator, dst.id, self, ctx)? {
            ctx.add_side(condition);
        }
        ctx.set_prev(block.id);
        ctx.set_state(DriverState::EdgeResolved);

        Ok(())
    }

    /// Executes `block` up to its terminator.
    ///
    /// If control reached the block along an edge whose PHI nodes have not
    /// been resolved yet, they are resolved first. An `unreachable`
    /// terminator makes the path infeasible, and a `ret` terminator records
    /// the returned value in the context.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `block` is not part of the module or does not end
    /// in a terminator.
    pub fn exec(&self, block: &BasicBlock, ctx: &mut Context) -> Result<()> {
        debug!(function = %block.parent, block = %block.label, "executing block");
        ctx.enter(block);
        if let Some(from) = ctx.prev() {
            if !ctx.phis_resolved(block.id, from) {
                self.intra_phi(ctx)?;
            }
        }
        while self.intra_step(ctx)? {}

        let terminator = block
            .terminator()
            .ok_or(Error::NoTerminator { block: block.id.0 })
            .locate(block.instructions.last().map_or(0, |i| i.id.0))?;
        match &terminator.kind {
            InstKind::Unreachable => ctx.add_side(self.builder.bool(false)),
            InstKind::Ret(ret) => {
                let value = match &ret.value {
                    Some(value) => match self.get_operand_value(value, ctx) {
                        Ok(value) => Some(value),
                        Err(error) => {
                            self.record_unhandled(terminator, &error.to_string(), ctx);
                            None
                        }
                    },
                    None => None,
                };
                ctx.set_return_value(value);
            }
            _ => (),
        }

        Ok(())
    }

    /// Enters `block` along the edge from `from`, resolving its PHI nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `block` is not part of the module.
    pub fn exec_phi(&self, block: &BasicBlock, from: &BasicBlock, ctx: &mut Context) -> Result<()> {
        ctx.enter(block);
        ctx.set_prev(from.id);
        self.intra_phi(ctx)
    }

    /// Takes the edge from `src` to `dst` without executing the body of
    /// `src`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `dst` is not a successor of `src`.
    pub fn exec_br(&self, src: &BasicBlock, dst: &BasicBlock, ctx: &mut Context) -> Result<()> {
        ctx.enter_at_terminator(src);
        self.intra_br(dst, ctx)
    }

    /// Executes `src` and then follows the edge to `dst`, leaving `ctx` at
    /// the start of `dst` with its PHI nodes resolved.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if either block is not part of the module or `dst` is
    /// not a successor of `src`.
    pub fn exec_edg(&self, src: &BasicBlock, dst: &BasicBlock, ctx: &mut Context) -> Result<()> {
        self.exec(src, ctx)?;
        self.exec_br(src, dst, ctx)?;
        let dst = self.sibling_block(src, dst.id)?;
        self.exec_phi(dst, src, ctx)
    }

    /// Gets the error flag of `block`: a boolean register that holds whether
    /// a failure has been reached in the block.
    ///
    /// The same block always gets the same flag.
    #[must_use]
    pub fn error_flag(&self, block: &BasicBlock) -> Expr {
        let key = (block.parent.clone(), block.id);
        self.error_flags
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| {
                let name = format!(
                    "{ERROR_FLAG_PREFIX}{NAME_SEPARATOR}{}{NAME_SEPARATOR}{}",
                    block.parent, block.label
                );
                self.builder.var(&name, Sort::Bool)
            })
            .clone()
    }

    /// Gets the value of the error flag of `block` in `ctx`, which is `false`
    /// until a failure in the block sets it.
    #[must_use]
    pub fn error_flag_value(&self, block: &BasicBlock, ctx: &Context) -> Expr {
        let flag = self.error_flag(block);
        ctx.registers()
            .binding(&flag)
            .cloned()
            .unwrap_or_else(|| self.builder.bool(false))
    }

    /// Records that `instruction` was skipped.
    pub fn skip_inst(&self, instruction: &Instruction, ctx: &mut Context) {
        let record = TraceRecord {
            location: Some(instruction.id.0),
            text:     instruction.to_string(),
            kind:     Classification::Skipped,
            reason:   "no effect on tracked state".into(),
        };
        if ctx.record(record) {
            trace!(%instruction, "skipped");
        }
    }

    /// Records that `instruction` could not be modelled for `reason`, and
    /// leaves its result unconstrained.
    pub fn unhandled_inst(&self, instruction: &Instruction, reason: &str, ctx: &mut Context) {
        self.record_unhandled(instruction, reason, ctx);
        self.havoc_result(instruction, ctx);
    }

    /// Records that `instruction` could not be modelled, without touching its
    /// result.
    fn record_unhandled(&self, instruction: &Instruction, reason: &str, ctx: &mut Context) {
        ctx.classify(instruction.id, Classification::Unhandled);
        let record = TraceRecord {
            location: Some(instruction.id.0),
            text:     instruction.to_string(),
            kind:     Classification::Unhandled,
            reason:   reason.into(),
        };
        if ctx.record(record) {
            warn!(%instruction, reason, "unhandled instruction");
        }
    }

    /// Records that `value` could not be modelled for `reason`, returning an
    /// unconstrained stand-in for it if its type has a symbolic
    /// representation.
    pub fn unhandled_value(&self, value: &Value, reason: &str, ctx: &mut Context) -> Option<Expr> {
        let record = TraceRecord {
            location: value.id().map(|id| id.0),
            text:     value.to_string(),
            kind:     Classification::Unhandled,
            reason:   reason.into(),
        };
        if ctx.record(record) {
            warn!(%value, reason, "unhandled value");
        }

        let sort = self.register_sort(&value.ty()).ok()?;
        Some(ctx.fresh(&self.builder, sort))
    }
}

/// The generic interface to an operational semantics, for drivers that work
/// with more than one semantics.
///
/// Contexts are passed as trait objects. Each semantics only accepts the
/// contexts it created itself.
pub trait OperationalSemantics {
    /// Creates a fresh context.
    fn mk_context(&self) -> Box<dyn OpSemContext>;

    /// Executes `block` up to its terminator.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the block cannot be executed.
    fn exec(&self, block: &BasicBlock, ctx: &mut dyn OpSemContext) -> Result<()>;

    /// Enters `block` from `from`, resolving its PHI nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the block cannot be entered.
    fn exec_phi(&self, block: &BasicBlock, from: &BasicBlock, ctx: &mut dyn OpSemContext)
        -> Result<()>;

    /// Takes the edge from `src` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `dst` is not a successor of `src`.
    fn exec_br(&self, src: &BasicBlock, dst: &BasicBlock, ctx: &mut dyn OpSemContext)
        -> Result<()>;

    /// Executes `src` and follows the edge to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the edge cannot be executed.
    fn exec_edg(&self, src: &BasicBlock, dst: &BasicBlock, ctx: &mut dyn OpSemContext)
        -> Result<()>;

    /// Executes the next instruction, returning `false` at the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the context is not positioned in the program.
    fn intra_step(&self, ctx: &mut dyn OpSemContext) -> Result<bool>;

    /// Gets the error flag of `block`.
    fn error_flag(&self, block: &BasicBlock) -> Expr;

    /// Checks whether `value` is tracked.
    fn is_tracked(&self, value: &Value) -> bool;

    /// Checks whether `value` is skipped.
    fn is_skipped(&self, value: &Value) -> bool {
        !self.is_tracked(value)
    }
}

/// Recovers the engine's own context from a generic one.
///
/// # Panics
///
/// Panics if `ctx` was created by a different semantics. This is a programmer
/// bug.
fn own_context(ctx: &mut dyn OpSemContext) -> &mut Context {
    ctx.as_any_mut()
        .downcast_mut::<Context>()
        .unwrap_or_else(|| panic!("OpSem can only execute contexts created by OpSem"))
}

impl OperationalSemantics for OpSem<'_> {
    fn mk_context(&self) -> Box<dyn OpSemContext> {
        Box::new(OpSem::mk_context(self))
    }

    fn exec(&self, block: &BasicBlock, ctx: &mut dyn OpSemContext) -> Result<()> {
        OpSem::exec(self, block, own_context(ctx))
    }

    fn exec_phi(
        &self,
        block: &BasicBlock,
        from: &BasicBlock,
        ctx: &mut dyn OpSemContext,
    ) -> Result<()> {
        OpSem::exec_phi(self, block, from, own_context(ctx))
    }

    fn exec_br(&self, src: &BasicBlock, dst: &BasicBlock, ctx: &mut dyn OpSemContext) -> Result<()> {
        OpSem::exec_br(self, src, dst, own_context(ctx))
    }

    fn exec_edg(&self, src: &BasicBlock, dst: &BasicBlock, ctx: &mut dyn OpSemContext) -> Result<()> {
        OpSem::exec_edg(self, src, dst, own_context(ctx))
    }

    fn intra_step(&self, ctx: &mut dyn OpSemContext) -> Result<bool> {
        OpSem::intra_step(self, own_context(ctx))
    }

    fn error_flag(&self, block: &BasicBlock) -> Expr {
        OpSem::error_flag(self, block)
    }

    fn is_tracked(&self, value: &Value) -> bool {
        OpSem::is_tracked(self, value)
    }
}

/// How much of the program state the semantics tracks.
///
/// Each level includes the ones before it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TrackLevel {
    /// Integer registers only.
    Reg,

    /// Integer and pointer registers.
    Ptr,

    /// Registers and the contents of memory.
    Mem,
}

/// The configuration for the operational semantics.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Config {
    /// How much of the program state is tracked.
    ///
    /// Defaults to [`TrackLevel::Mem`].
    pub track_level: TrackLevel,

    /// Whether terms are simplified beyond constant folding as they are
    /// built.
    ///
    /// Defaults to [`DEFAULT_SIMPLIFY_ENABLED`].
    pub simplify: bool,

    /// The number of bytes reserved for an allocation whose size is not a
    /// constant.
    ///
    /// Defaults to [`DEFAULT_MAX_SYMBOLIC_ALLOC_BYTES`].
    pub max_symbolic_alloc_bytes: u64,

    /// The largest `memcpy`, `memmove` or `memset` that is expanded into
    /// individual byte operations. Larger ones are unhandled.
    ///
    /// Defaults to [`DEFAULT_MAX_CONCRETE_COPY_BYTES`].
    pub max_concrete_copy_bytes: u64,

    /// Whether calls to functions the semantics does not model forget the
    /// contents of memory.
    ///
    /// Defaults to [`DEFAULT_HAVOC_MEMORY_ON_UNKNOWN_CALL`].
    pub havoc_memory_on_unknown_call: bool,
}

impl Config {
    /// Sets the `track_level` config parameter to `value`.
    #[must_use]
    pub fn with_track_level(mut self, value: TrackLevel) -> Self {
        self.track_level = value;
        self
    }

    /// Sets the `simplify` config parameter to `value`.
    #[must_use]
    pub fn with_simplify(mut self, value: bool) -> Self {
        self.simplify = value;
        self
    }

    /// Sets the `max_symbolic_alloc_bytes` config parameter to `value`.
    #[must_use]
    pub fn with_max_symbolic_alloc_bytes(mut self, value: u64) -> Self {
        self.max_symbolic_alloc_bytes = value;
        self
    }

    /// Sets the `max_concrete_copy_bytes` config parameter to `value`.
    #[must_use]
    pub fn with_max_concrete_copy_bytes(mut self, value: u64) -> Self {
        self.max_concrete_copy_bytes = value;
        self
    }

    /// Sets the `havoc_memory_on_unknown_call` config parameter to `value`.
    #[must_use]
    pub fn with_havoc_memory_on_unknown_call(mut self, value: bool) -> Self {
        self.havoc_memory_on_unknown_call = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let track_level = TrackLevel::Mem;
        let simplify = DEFAULT_SIMPLIFY_ENABLED;
        let max_symbolic_alloc_bytes = DEFAULT_MAX_SYMBOLIC_ALLOC_BYTES;
        let max_concrete_copy_bytes = DEFAULT_MAX_CONCRETE_COPY_BYTES;
        let havoc_memory_on_unknown_call = DEFAULT_HAVOC_MEMORY_ON_UNKNOWN_CALL;
        Self {
            track_level,
            simplify,
            max_symbolic_alloc_bytes,
            max_concrete_copy_bytes,
            havoc_memory_on_unknown_call,
        }
    }
}
