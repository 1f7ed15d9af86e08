//! The execution context of the operational semantics, and utilities for
//! dealing with it.
//!
//! A context holds everything that one path of execution has accumulated:
//! register bindings, the path condition, memory, the position of the
//! execution within its current block and the record of everything that was
//! skipped or could not be modelled.

pub mod memory;
pub mod registers;

use std::{collections::BTreeMap, collections::HashMap, fmt::Debug, sync::Arc};

use downcast_rs::Downcast;
use serde::{Deserialize, Serialize};

use crate::{
    constant::{ERROR_FLAG_PREFIX, FRESH_SYMBOL_PREFIX, NAME_SEPARATOR},
    expr::{Expr, ExprBuilder, Sort},
    ir::{BasicBlock, BlockId, Instruction, ValueId},
    vm::{
        state::{memory::Memory, registers::Registers},
        trace::{Classification, Trace, TraceRecord},
    },
};

/// The interface through which a generic driver sees a context, without
/// knowing which semantics created it.
///
/// A semantics recovers its own context type from a `dyn OpSemContext` by
/// downcasting.
pub trait OpSemContext
where
    Self: Debug + Downcast,
{
    /// Gets the side assertions accumulated so far, in order.
    fn side(&self) -> &[Expr];

    /// Adds `condition` to the side assertions.
    fn add_side(&mut self, condition: Expr);

    /// Gets the term describing the current contents of memory.
    fn memory_term(&self) -> &Expr;

    /// Checks whether everything executed in the context has been modelled.
    fn is_sound(&self) -> bool;
}

/// The position of execution within a basic block.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Cursor {
    /// The function containing the block.
    pub function: Arc<str>,

    /// The block being executed.
    pub block: BlockId,

    /// The index of the next instruction to execute.
    pub index: usize,
}

impl Cursor {
    /// Creates a cursor at the first instruction of `block`.
    #[must_use]
    pub fn at_start(block: &BasicBlock) -> Self {
        Self {
            function: block.parent.clone(),
            block:    block.id,
            index:    0,
        }
    }

    /// Checks whether the cursor, which must point into `block`, has reached
    /// the block's terminator.
    #[must_use]
    pub fn is_at_terminator(&self, block: &BasicBlock) -> bool {
        block
            .instruction(self.index)
            .map_or(true, Instruction::is_terminator)
    }

    /// Checks whether the cursor points into `block`.
    #[must_use]
    pub fn is_in(&self, block: &BasicBlock) -> bool {
        self.function == block.parent && self.block == block.id
    }
}

/// The stage that the driver has reached in the current block.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum DriverState {
    /// No block has been entered yet.
    #[default]
    Idle,

    /// A block has been entered but none of its instructions executed.
    BlockEntry,

    /// Some of the block's instructions have been executed.
    IntraExecuting,

    /// Every instruction before the terminator has been executed.
    AtTerminator,

    /// The edge out of the block has been taken.
    EdgeResolved,
}

/// The execution context of the [`super::OpSem`].
#[derive(Clone, Debug)]
pub struct Context {
    /// The registers and their bindings.
    registers: Registers,

    /// The side assertions (the path condition), in order.
    side: Vec<Expr>,

    /// The position of execution.
    cursor: Option<Cursor>,

    /// The block that control came from to reach the current block.
    prev: Option<BlockId>,

    /// The edge `(block, from)` whose PHI nodes have already been resolved.
    phis_resolved: Option<(BlockId, BlockId)>,

    /// The stage the driver has reached.
    state: DriverState,

    /// The memory of the program.
    memory: Memory,

    /// The skip and unhandled records.
    trace: Trace,

    /// The classification of every instruction executed so far.
    classifications: HashMap<ValueId, Classification>,

    /// The number of fresh symbols created so far.
    fresh_counter: u64,

    /// The addresses of the globals of the module.
    global_addresses: HashMap<ValueId, u64>,

    /// The addresses of the functions of the module.
    function_addresses: HashMap<Arc<str>, u64>,

    /// The value returned by the last `ret` executed.
    return_value: Option<Expr>,
}

impl Context {
    /// Creates a context with no registers, an empty path condition and the
    /// provided `memory`.
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self {
            registers: Registers::new(),
            side: Vec::new(),
            cursor: None,
            prev: None,
            phis_resolved: None,
            state: DriverState::default(),
            memory,
            trace: Trace::new(),
            classifications: HashMap::new(),
            fresh_counter: 0,
            global_addresses: HashMap::new(),
            function_addresses: HashMap::new(),
            return_value: None,
        }
    }

    /// Gets the register store.
    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Gets the register store.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Gets the current value of `register`.
    #[must_use]
    pub fn read(&self, register: &Expr) -> Expr {
        self.registers.read(register)
    }

    /// Sets the current value of `register`.
    pub fn write(&mut self, register: Expr, value: Expr) {
        self.registers.write(register, value);
    }

    /// Gets the side assertions.
    #[must_use]
    pub fn side(&self) -> &[Expr] {
        &self.side
    }

    /// Adds `condition` to the side assertions, dropping trivially true
    /// conditions.
    ///
    /// # Panics
    ///
    /// Panics if `condition` is not a boolean. This is a programmer bug.
    pub fn add_side(&mut self, condition: Expr) {
        assert_eq!(condition.sort(), Sort::Bool, "Side assertions must be boolean");
        if !condition.is_true() {
            self.side.push(condition);
        }
    }

    /// Gets the conjunction of the side assertions.
    #[must_use]
    pub fn path_condition(&self, b: &ExprBuilder) -> Expr {
        b.and(self.side.clone())
    }

    /// Gets the position of execution.
    #[must_use]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Moves execution to the start of `block`.
    pub fn enter(&mut self, block: &BasicBlock) {
        self.cursor = Some(Cursor::at_start(block));
        self.state = DriverState::BlockEntry;
    }

    /// Moves execution to the terminator of `block` without executing
    /// anything before it.
    pub fn enter_at_terminator(&mut self, block: &BasicBlock) {
        let mut cursor = Cursor::at_start(block);
        cursor.index = block.instructions.len().saturating_sub(1);
        self.cursor = Some(cursor);
        self.state = DriverState::AtTerminator;
    }

    /// Moves the cursor past the current instruction.
    pub fn advance(&mut self) {
        if let Some(cursor) = &mut self.cursor {
            cursor.index += 1;
        }
        self.state = DriverState::IntraExecuting;
    }

    /// Gets the block that control came from.
    #[must_use]
    pub fn prev(&self) -> Option<BlockId> {
        self.prev
    }

    /// Records that control came from `block`.
    ///
    /// Taking an edge invalidates any earlier resolution of PHI nodes, even
    /// along the same edge.
    pub fn set_prev(&mut self, block: BlockId) {
        self.prev = Some(block);
        self.phis_resolved = None;
    }

    /// Checks whether the PHI nodes of `block` have been resolved for the
    /// edge from `from`.
    #[must_use]
    pub fn phis_resolved(&self, block: BlockId, from: BlockId) -> bool {
        self.phis_resolved == Some((block, from))
    }

    /// Records that the PHI nodes of `block` have been resolved for the edge
    /// from `from`.
    pub fn mark_phis_resolved(&mut self, block: BlockId, from: BlockId) {
        self.phis_resolved = Some((block, from));
    }

    /// Gets the stage the driver has reached.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Sets the stage the driver has reached.
    pub fn set_state(&mut self, state: DriverState) {
        self.state = state;
    }

    /// Gets the memory.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Gets the memory.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Gets the skip and unhandled records.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Adds `record` to the trace, returning whether it was new.
    pub fn record(&mut self, record: TraceRecord) -> bool {
        self.trace.record(record)
    }

    /// Gets the cached classification of the instruction `id`.
    #[must_use]
    pub fn classification(&self, id: ValueId) -> Option<Classification> {
        self.classifications.get(&id).copied()
    }

    /// Caches the classification of the instruction `id`.
    pub fn classify(&mut self, id: ValueId, classification: Classification) {
        self.classifications.insert(id, classification);
    }

    /// Checks whether everything executed in the context has been modelled.
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.trace.is_sound()
    }

    /// Creates a fresh, unconstrained symbol of `sort`.
    ///
    /// Symbols are numbered in creation order, so two contexts that execute
    /// the same instructions create the same symbols.
    pub fn fresh(&mut self, b: &ExprBuilder, sort: Sort) -> Expr {
        let name = format!("{FRESH_SYMBOL_PREFIX}{NAME_SEPARATOR}{}", self.fresh_counter);
        self.fresh_counter += 1;
        b.var(&name, sort)
    }

    /// Gets the address of the global `id`.
    #[must_use]
    pub fn global_address(&self, id: ValueId) -> Option<u64> {
        self.global_addresses.get(&id).copied()
    }

    /// Records the address of the global `id`.
    pub fn set_global_address(&mut self, id: ValueId, address: u64) {
        self.global_addresses.insert(id, address);
    }

    /// Gets the address of the function `name`.
    #[must_use]
    pub fn function_address(&self, name: &str) -> Option<u64> {
        self.function_addresses.get(name).copied()
    }

    /// Records the address of the function `name`.
    pub fn set_function_address(&mut self, name: Arc<str>, address: u64) {
        self.function_addresses.insert(name, address);
    }

    /// Gets the value returned by the last `ret` executed.
    #[must_use]
    pub fn return_value(&self) -> Option<&Expr> {
        self.return_value.as_ref()
    }

    /// Records the value returned by a `ret`.
    pub fn set_return_value(&mut self, value: Option<Expr>) {
        self.return_value = value;
    }

    /// Consumes the context, producing a printable summary of what it
    /// accumulated.
    #[must_use]
    pub fn into_result(self) -> ExecutionResult {
        let mut registers = BTreeMap::new();
        let mut error_flags = BTreeMap::new();
        for (register, value) in self.registers.bindings() {
            let name = register.var_name().map_or_else(|| register.to_string(), str::to_string);
            if name.starts_with(ERROR_FLAG_PREFIX) {
                error_flags.insert(name, value.to_string());
            } else {
                registers.insert(name, value.to_string());
            }
        }
        let is_sound = self.is_sound();

        ExecutionResult {
            registers,
            error_flags,
            side: self.side.iter().map(ToString::to_string).collect(),
            memory: self.memory.array().to_string(),
            return_value: self.return_value.map(|v| v.to_string()),
            trace: self.trace,
            is_sound,
        }
    }
}

impl OpSemContext for Context {
    fn side(&self) -> &[Expr] {
        Context::side(self)
    }

    fn add_side(&mut self, condition: Expr) {
        Context::add_side(self, condition);
    }

    fn memory_term(&self) -> &Expr {
        self.memory.array()
    }

    fn is_sound(&self) -> bool {
        Context::is_sound(self)
    }
}

/// A summary of a context, with every term printed in SMT-LIB syntax.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// The value of every written register, by register name.
    pub registers: BTreeMap<String, String>,

    /// The value of every written error flag, by flag name.
    pub error_flags: BTreeMap<String, String>,

    /// The side assertions, in order.
    pub side: Vec<String>,

    /// The final contents of memory.
    pub memory: String,

    /// The value returned by the last `ret`, if any.
    pub return_value: Option<String>,

    /// The skip and unhandled records.
    pub trace: Trace,

    /// Whether everything executed was modelled.
    pub is_sound: bool,
}
