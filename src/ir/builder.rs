//! A builder for constructing functions programmatically.

use std::sync::Arc;

use crate::{
    error::execution::Result,
    ir::{
        function::{BasicBlock, Function, Module},
        instruction::{
            Alloca,
            Binary,
            BinaryOp,
            Br,
            Call,
            Callee,
            Cast,
            CastOp,
            CondBr,
            ExtractValue,
            FCmp,
            FloatPredicate,
            Freeze,
            Gep,
            ICmp,
            InsertValue,
            InstKind,
            Instruction,
            IntPredicate,
            Load,
            Other,
            Phi,
            Ret,
            Select,
            Store,
            Switch,
        },
        types::Type,
        value::{Constant, Local, Value},
        BlockId,
    },
    vm::value::known::KnownInt,
};

/// Builds a [`Function`] one instruction at a time, appending to the end of
/// the current block.
///
/// Value names are optional; passing an empty name leaves the value unnamed.
///
/// # Panics
///
/// The instruction-adding methods panic if no block has been selected with
/// [`Self::position_at_end`]. This is a programmer bug.
#[derive(Debug)]
pub struct FunctionBuilder<'m> {
    module:      &'m mut Module,
    name:        Arc<str>,
    params:      Vec<Local>,
    return_type: Type,
    blocks:      Vec<BasicBlock>,
    current:     Option<BlockId>,
}

impl<'m> FunctionBuilder<'m> {
    /// Creates a builder for a function in `module`.
    pub fn new(
        module: &'m mut Module,
        name: &str,
        params: &[(&str, Type)],
        return_type: Type,
    ) -> Self {
        let params = params
            .iter()
            .map(|(param_name, ty)| Local {
                id:   module.fresh_id(),
                ty:   ty.clone(),
                name: non_empty(param_name),
            })
            .collect();

        Self {
            module,
            name: name.into(),
            params,
            return_type,
            blocks: Vec::new(),
            current: None,
        }
    }

    /// Gets the parameter at `index` as a value.
    ///
    /// # Panics
    ///
    /// Panics if the function has no such parameter.
    #[must_use]
    pub fn param(&self, index: usize) -> Value {
        Value::Local(self.params[index].clone())
    }

    /// Appends a new, empty block labelled `label`.
    pub fn new_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(BasicBlock {
            id,
            label: label.into(),
            parent: self.name.clone(),
            instructions: Vec::new(),
        });
        id
    }

    /// Makes `block` the block that instructions are appended to.
    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    /// Appends a binary operation.
    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value, name: &str) -> Value {
        let ty = lhs.ty();
        self.push_value(ty, name, InstKind::Binary(Binary { op, lhs, rhs }))
    }

    /// Appends an integer addition.
    pub fn add(&mut self, lhs: Value, rhs: Value, name: &str) -> Value {
        self.binary(BinaryOp::Add, lhs, rhs, name)
    }

    /// Appends an integer comparison.
    pub fn icmp(&mut self, predicate: IntPredicate, lhs: Value, rhs: Value, name: &str) -> Value {
        let kind = InstKind::ICmp(ICmp {
            predicate,
            lhs,
            rhs,
        });
        self.push_value(Type::bool(), name, kind)
    }

    /// Appends a floating-point comparison.
    pub fn fcmp(&mut self, predicate: FloatPredicate, lhs: Value, rhs: Value, name: &str) -> Value {
        let kind = InstKind::FCmp(FCmp {
            predicate,
            lhs,
            rhs,
        });
        self.push_value(Type::bool(), name, kind)
    }

    /// Appends a select.
    pub fn select(
        &mut self,
        condition: Value,
        then_value: Value,
        else_value: Value,
        name: &str,
    ) -> Value {
        let ty = then_value.ty();
        let kind = InstKind::Select(Select {
            condition,
            then_value,
            else_value,
        });
        self.push_value(ty, name, kind)
    }

    /// Appends a conversion of `value` to `ty`.
    pub fn cast(&mut self, op: CastOp, value: Value, ty: Type, name: &str) -> Value {
        self.push_value(ty, name, InstKind::Cast(Cast { op, value }))
    }

    /// Appends a freeze.
    pub fn freeze(&mut self, value: Value, name: &str) -> Value {
        let ty = value.ty();
        self.push_value(ty, name, InstKind::Freeze(Freeze { value }))
    }

    /// Appends a stack allocation of a single value of type `allocated`.
    pub fn alloca(&mut self, allocated: Type, name: &str) -> Value {
        let count = Constant::int(32, 1u8).into();
        self.alloca_array(allocated, count, name)
    }

    /// Appends a stack allocation of `count` values of type `allocated`.
    pub fn alloca_array(&mut self, allocated: Type, count: Value, name: &str) -> Value {
        let kind = InstKind::Alloca(Alloca { allocated, count });
        self.push_value(Type::Pointer, name, kind)
    }

    /// Appends a load of a value of type `ty` from `pointer`.
    pub fn load(&mut self, ty: Type, pointer: Value, name: &str) -> Value {
        self.push_value(ty, name, InstKind::Load(Load { pointer }))
    }

    /// Appends a store of `value` to `pointer`.
    pub fn store(&mut self, value: Value, pointer: Value) {
        self.push(Type::Void, "", InstKind::Store(Store { value, pointer }));
    }

    /// Appends an address computation.
    pub fn gep(&mut self, source: Type, base: Value, indices: Vec<Value>, name: &str) -> Value {
        let kind = InstKind::Gep(Gep {
            source,
            base,
            indices,
        });
        self.push_value(Type::Pointer, name, kind)
    }

    /// Appends a read of the member of `aggregate` at the path `indices`.
    ///
    /// # Panics
    ///
    /// Panics if `indices` does not name a member of the aggregate's type.
    pub fn extract_value(&mut self, aggregate: Value, indices: Vec<u32>, name: &str) -> Value {
        let ty = member_type(&aggregate.ty(), &indices);
        let kind = InstKind::ExtractValue(ExtractValue { aggregate, indices });
        self.push_value(ty, name, kind)
    }

    /// Appends a replacement of the member of `aggregate` at the path
    /// `indices`.
    pub fn insert_value(
        &mut self,
        aggregate: Value,
        element: Value,
        indices: Vec<u32>,
        name: &str,
    ) -> Value {
        let ty = aggregate.ty();
        let kind = InstKind::InsertValue(InsertValue {
            aggregate,
            element,
            indices,
        });
        self.push_value(ty, name, kind)
    }

    /// Appends a direct call to `callee`, returning its result if
    /// `return_type` is not void.
    pub fn call(
        &mut self,
        callee: &str,
        args: Vec<Value>,
        return_type: Type,
        name: &str,
    ) -> Option<Value> {
        let kind = InstKind::Call(Call {
            callee: Callee::Direct(callee.into()),
            args,
        });
        self.push(return_type, name, kind).result()
    }

    /// Appends a call through the function pointer `target`.
    pub fn call_indirect(
        &mut self,
        target: Value,
        args: Vec<Value>,
        return_type: Type,
        name: &str,
    ) -> Option<Value> {
        let kind = InstKind::Call(Call {
            callee: Callee::Indirect(target),
            args,
        });
        self.push(return_type, name, kind).result()
    }

    /// Appends a PHI node of type `ty`.
    pub fn phi(&mut self, ty: Type, incoming: Vec<(Value, BlockId)>, name: &str) -> Value {
        self.push_value(ty, name, InstKind::Phi(Phi { incoming }))
    }

    /// Appends a memory fence.
    pub fn fence(&mut self) {
        self.push(Type::Void, "", InstKind::Fence);
    }

    /// Appends an instruction without a dedicated payload, such as
    /// `atomicrmw`.
    pub fn other(&mut self, opcode: &str, operands: Vec<Value>, ty: Type, name: &str) -> Option<Value> {
        let kind = InstKind::Other(Other {
            opcode: opcode.into(),
            operands,
        });
        self.push(ty, name, kind).result()
    }

    /// Appends an unconditional branch.
    pub fn br(&mut self, dest: BlockId) {
        self.push(Type::Void, "", InstKind::Br(Br { dest }));
    }

    /// Appends a conditional branch.
    pub fn cond_br(&mut self, condition: Value, then_dest: BlockId, else_dest: BlockId) {
        let kind = InstKind::CondBr(CondBr {
            condition,
            then_dest,
            else_dest,
        });
        self.push(Type::Void, "", kind);
    }

    /// Appends a switch.
    pub fn switch(&mut self, condition: Value, default: BlockId, cases: Vec<(KnownInt, BlockId)>) {
        let kind = InstKind::Switch(Switch {
            condition,
            default,
            cases,
        });
        self.push(Type::Void, "", kind);
    }

    /// Appends a return.
    pub fn ret(&mut self, value: Option<Value>) {
        self.push(Type::Void, "", InstKind::Ret(Ret { value }));
    }

    /// Appends an `unreachable`.
    pub fn unreachable(&mut self) {
        self.push(Type::Void, "", InstKind::Unreachable);
    }

    /// Finishes the function and adds it to the module.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any block does not end in exactly one terminator.
    pub fn finish(self) -> Result<()> {
        for block in &self.blocks {
            block.validate()?;
        }
        self.module.add_function(Function {
            name:        self.name,
            params:      self.params,
            return_type: self.return_type,
            blocks:      self.blocks,
        });

        Ok(())
    }

    /// Appends an instruction that is known to produce a value.
    fn push_value(&mut self, ty: Type, name: &str, kind: InstKind) -> Value {
        Value::Local(self.push(ty, name, kind).as_local())
    }

    /// Appends an instruction to the current block.
    fn push(&mut self, ty: Type, name: &str, kind: InstKind) -> &Instruction {
        let current = self
            .current
            .unwrap_or_else(|| panic!("No block selected in function {}", self.name));
        let instruction = Instruction {
            id: self.module.fresh_id(),
            name: non_empty(name),
            ty,
            kind,
        };
        let block = &mut self.blocks[current.index()];
        block.instructions.push(instruction);
        &block.instructions[block.instructions.len() - 1]
    }
}

/// Gets the type reached by following `indices` into `ty`.
fn member_type(ty: &Type, indices: &[u32]) -> Type {
    indices
        .iter()
        .try_fold(ty, |ty, index| ty.indexed(u64::from(*index)))
        .unwrap_or_else(|| panic!("Indices {indices:?} do not name a member of {ty}"))
        .clone()
}

/// Converts an empty name into the absence of a name.
fn non_empty(name: &str) -> Option<Arc<str>> {
    if name.is_empty() {
        None
    } else {
        Some(name.into())
    }
}
