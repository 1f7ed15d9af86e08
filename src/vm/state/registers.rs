//! This module contains the register store of an execution context.

use std::collections::HashMap;

use bimap::BiMap;

use crate::{expr::Expr, ir::ValueId};

/// The registers of a context and their current values.
///
/// Every program value that has been given a register is related to it one
/// to one, so the store can answer both which register a value lives in and
/// which value a register stands for. Registers that stand for no program
/// value, such as error flags, may still be bound.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registers {
    /// The registers of program values.
    table: BiMap<ValueId, Expr>,

    /// The current value of every register that has been written.
    bindings: HashMap<Expr, Expr>,
}

impl Registers {
    /// Creates an empty register store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the value `id` lives in `register`, returning the
    /// register that the value actually lives in.
    ///
    /// If the value already has a register, that register is kept.
    pub fn declare(&mut self, id: ValueId, register: Expr) -> Expr {
        if let Some(existing) = self.table.get_by_left(&id) {
            return existing.clone();
        }
        self.table.insert(id, register.clone());

        register
    }

    /// Gets the register of the value `id` without creating one.
    #[must_use]
    pub fn register_of(&self, id: ValueId) -> Option<&Expr> {
        self.table.get_by_left(&id)
    }

    /// Gets the value that `register` stands for.
    #[must_use]
    pub fn value_of(&self, register: &Expr) -> Option<ValueId> {
        self.table.get_by_right(register).copied()
    }

    /// Gets the current value of `register`, which is the register itself
    /// if it has never been written.
    #[must_use]
    pub fn read(&self, register: &Expr) -> Expr {
        self.bindings
            .get(register)
            .cloned()
            .unwrap_or_else(|| register.clone())
    }

    /// Gets the value written to `register`, if any.
    #[must_use]
    pub fn binding(&self, register: &Expr) -> Option<&Expr> {
        self.bindings.get(register)
    }

    /// Sets the current value of `register` to `value`.
    pub fn write(&mut self, register: Expr, value: Expr) {
        self.bindings.insert(register, value);
    }

    /// Gets every register that has been written, with its value.
    pub fn bindings(&self) -> impl Iterator<Item = (&Expr, &Expr)> {
        self.bindings.iter()
    }

    /// Gets the number of program values that have a register.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        expr::{ExprBuilder, Sort},
        ir::ValueId,
        vm::state::registers::Registers,
    };

    #[test]
    fn declaring_twice_keeps_the_first_register() {
        let b = ExprBuilder::new(true);
        let mut registers = Registers::new();
        let first = registers.declare(ValueId(1), b.var("%1", Sort::Bv(8)));
        let second = registers.declare(ValueId(1), b.var("%other", Sort::Bv(8)));

        assert_eq!(first, second);
        assert_eq!(registers.len(), 1);
        assert_eq!(registers.value_of(&first), Some(ValueId(1)));
    }

    #[test]
    fn unwritten_registers_read_as_themselves() {
        let b = ExprBuilder::new(true);
        let mut registers = Registers::new();
        let register = registers.declare(ValueId(3), b.var("%3", Sort::Bv(8)));

        assert_eq!(registers.read(&register), register);
        registers.write(register.clone(), b.bv_u64(8, 9));
        assert_eq!(registers.read(&register), b.bv_u64(8, 9));
    }
}
