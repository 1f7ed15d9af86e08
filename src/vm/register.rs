//! This module contains the symbolic register model: which values the
//! semantics tracks, the registers that hold them and how operands are read.

use crate::{
    constant::NAME_SEPARATOR,
    error::execution::Error,
    expr::{Expr, Sort},
    ir::{Instruction, Local, Type, Value, ValueId},
    layout::QueryResult,
    vm::{state::Context, value::sort_of, OpSem, TrackLevel},
};

impl OpSem<'_> {
    /// Checks whether values of type `ty` are tracked at the configured
    /// track level.
    #[must_use]
    pub fn is_type_tracked(&self, ty: &Type) -> bool {
        match ty {
            Type::Int(_) => true,
            Type::Pointer => self.config.track_level >= TrackLevel::Ptr,
            Type::Array(..) | Type::Struct(_) => {
                let leaves = ty.leaves();
                !leaves.is_empty() && leaves.into_iter().all(|leaf| self.is_type_tracked(leaf))
            }
            _ => false,
        }
    }

    /// Checks whether `value` is tracked.
    ///
    /// The decision depends only on the type of the value and the configured
    /// track level, so it is the same every time it is asked.
    #[must_use]
    pub fn is_tracked(&self, value: &Value) -> bool {
        self.is_type_tracked(&value.ty())
    }

    /// Checks whether `value` is skipped, which is exactly when it is not
    /// tracked.
    #[must_use]
    pub fn is_skipped(&self, value: &Value) -> bool {
        !self.is_tracked(value)
    }

    /// Gets the sort of a register holding a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if values of type `ty` have no symbolic representation.
    pub fn register_sort(&self, ty: &Type) -> QueryResult<Sort> {
        sort_of(ty, self.layout)
    }

    /// Builds the register term for `local` without recording it anywhere.
    ///
    /// The name is derived from the identity of the value, and from its
    /// source name where it has one, so that the same value always has the
    /// same register.
    fn register_term(&self, local: &Local) -> QueryResult<Expr> {
        let sort = self.register_sort(&local.ty)?;
        let name = match &local.name {
            Some(name) => format!("%{name}{NAME_SEPARATOR}{}", local.id.0),
            None => format!("%{}", local.id.0),
        };

        Ok(self.builder.var(&name, sort))
    }

    /// Gets the register for `local` in `ctx`, creating it if it does not
    /// exist yet.
    ///
    /// Calling this again for the same value returns the same register.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the type of `local` has no symbolic representation.
    pub fn mk_symb_reg(&self, local: &Local, ctx: &mut Context) -> QueryResult<Expr> {
        if let Some(register) = ctx.registers().register_of(local.id) {
            return Ok(register.clone());
        }
        let register = self.register_term(local)?;

        Ok(ctx.registers_mut().declare(local.id, register))
    }

    /// Gets the register for `local` in `ctx` if one has been created.
    #[must_use]
    pub fn get_symb_reg(&self, local: &Local, ctx: &Context) -> Option<Expr> {
        ctx.registers().register_of(local.id).cloned()
    }

    /// Checks whether `expr` is the register of some program value in `ctx`.
    #[must_use]
    pub fn is_sym_reg(&self, expr: &Expr, ctx: &Context) -> bool {
        ctx.registers().value_of(expr).is_some()
    }

    /// Gets the program value that the register `expr` stands for.
    ///
    /// # Panics
    ///
    /// Panics if `expr` is not a register of `ctx`. Only registers have a
    /// program value, so asking for that of any other term is a programmer
    /// bug.
    #[must_use]
    pub fn conc(&self, expr: &Expr, ctx: &Context) -> ValueId {
        ctx.registers()
            .value_of(expr)
            .unwrap_or_else(|| panic!("{expr} is not a register of the context"))
    }

    /// Gets the current value of the operand `value` in `ctx`.
    ///
    /// Constants are materialised, and local values read from their
    /// register. A register that has never been written reads as itself.
    /// Reading never changes the context.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the value has no symbolic representation.
    pub fn get_operand_value(&self, value: &Value, ctx: &Context) -> QueryResult<Expr> {
        match value {
            Value::Constant(constant) => self.constant_term(constant, ctx),
            Value::Local(local) => {
                let register = match self.get_symb_reg(local, ctx) {
                    Some(register) => register,
                    None => self.register_term(local)?,
                };
                Ok(ctx.read(&register))
            }
        }
    }

    /// Binds the result register of `instruction` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the instruction's result has no symbolic
    /// representation or `value` has the wrong sort for it.
    pub(crate) fn bind(
        &self,
        instruction: &Instruction,
        value: Expr,
        ctx: &mut Context,
    ) -> QueryResult<()> {
        let register = self.mk_symb_reg(&instruction.as_local(), ctx)?;
        if register.sort() != value.sort() {
            return Err(Error::SortMismatch {
                expected: register.sort(),
                found:    value.sort(),
            });
        }
        ctx.write(register, value);

        Ok(())
    }

    /// Binds the result register of `instruction`, if it has one that can be
    /// represented, to a fresh unconstrained symbol.
    pub(crate) fn havoc_result(&self, instruction: &Instruction, ctx: &mut Context) {
        if instruction.ty.is_void() {
            return;
        }
        if let Ok(register) = self.mk_symb_reg(&instruction.as_local(), ctx) {
            let value = ctx.fresh(&self.builder, register.sort());
            ctx.write(register, value);
        }
    }

    /// Forgets the contents of memory in `ctx`.
    pub(crate) fn havoc_memory(&self, ctx: &mut Context) {
        let sort = ctx.memory().array().sort();
        let array = ctx.fresh(&self.builder, sort);
        ctx.memory_mut().havoc(array);
    }
}
