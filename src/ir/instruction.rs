//! Instructions of the IR.
//!
//! Each instruction kind has a payload structure holding its operands. The
//! result type of the instruction is kept on the [`Instruction`] itself, so
//! casts and loads do not repeat it in their payload.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use itertools::Itertools;

use crate::{
    ir::{
        types::Type,
        value::{Local, Value},
        BlockId,
        ValueId,
    },
    vm::value::known::KnownInt,
};

/// A single instruction in a basic block.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Instruction {
    /// The identity of the instruction, and of the value it produces.
    pub id: ValueId,

    /// The source name of the result, if any.
    pub name: Option<Arc<str>>,

    /// The type of the result, which is [`Type::Void`] for instructions that
    /// produce no value.
    pub ty: Type,

    /// The kind-specific operands.
    pub kind: InstKind,
}

impl Instruction {
    /// Gets the value produced by the instruction, if it produces one.
    #[must_use]
    pub fn result(&self) -> Option<Value> {
        if self.ty.is_void() {
            None
        } else {
            Some(Value::Local(self.as_local()))
        }
    }

    /// Gets the instruction as a local value, regardless of its type.
    #[must_use]
    pub fn as_local(&self) -> Local {
        Local {
            id:   self.id,
            ty:   self.ty.clone(),
            name: self.name.clone(),
        }
    }

    /// Checks whether the instruction ends a basic block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    /// Checks whether the instruction is a PHI node.
    #[must_use]
    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InstKind::Phi(_))
    }

    /// Gets the blocks that control can transfer to from this instruction.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match &self.kind {
            InstKind::Br(br) => vec![br.dest],
            InstKind::CondBr(br) => vec![br.then_dest, br.else_dest],
            InstKind::Switch(switch) => std::iter::once(switch.default)
                .chain(switch.cases.iter().map(|(_, dest)| *dest))
                .collect(),
            _ => vec![],
        }
    }

    /// Gets the name of the called function if this is a direct call.
    #[must_use]
    pub fn called_function(&self) -> Option<&str> {
        match &self.kind {
            InstKind::Call(Call {
                callee: Callee::Direct(name),
                ..
            }) => Some(name.as_ref()),
            _ => None,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.ty.is_void() {
            write!(f, "{} = ", self.as_local())?;
        }
        write!(f, "{}", self.kind.as_text_code())?;
        let operands = self.kind.operands();
        if !operands.is_empty() {
            write!(f, " {}", operands.iter().join(", "))?;
        }
        let targets = self.successors();
        if !targets.is_empty() {
            write!(f, " [{}]", targets.iter().join(", "))?;
        }

        Ok(())
    }
}

/// The kinds of instruction, each with its operands.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum InstKind {
    Binary(Binary),
    ICmp(ICmp),
    FCmp(FCmp),
    Select(Select),
    Cast(Cast),
    Freeze(Freeze),
    Alloca(Alloca),
    Load(Load),
    Store(Store),
    Gep(Gep),
    ExtractValue(ExtractValue),
    InsertValue(InsertValue),
    Call(Call),
    Phi(Phi),
    Fence,
    Other(Other),
    Br(Br),
    CondBr(CondBr),
    Switch(Switch),
    Ret(Ret),
    Unreachable,
}

impl InstKind {
    /// Checks whether this kind ends a basic block.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Br(_) | Self::CondBr(_) | Self::Switch(_) | Self::Ret(_) | Self::Unreachable
        )
    }

    /// Gets a textual representation of the instruction kind to aid in
    /// debugging.
    #[must_use]
    pub fn as_text_code(&self) -> String {
        match self {
            Self::Binary(binary) => binary.op.as_text_code().into(),
            Self::ICmp(icmp) => format!("icmp {}", icmp.predicate.as_text_code()),
            Self::FCmp(fcmp) => format!("fcmp {}", fcmp.predicate.as_text_code()),
            Self::Select(_) => "select".into(),
            Self::Cast(cast) => cast.op.as_text_code().into(),
            Self::Freeze(_) => "freeze".into(),
            Self::Alloca(_) => "alloca".into(),
            Self::Load(_) => "load".into(),
            Self::Store(_) => "store".into(),
            Self::Gep(_) => "getelementptr".into(),
            Self::ExtractValue(_) => "extractvalue".into(),
            Self::InsertValue(_) => "insertvalue".into(),
            Self::Call(Call {
                callee: Callee::Direct(name),
                ..
            }) => format!("call @{name}"),
            Self::Call(_) => "call".into(),
            Self::Phi(_) => "phi".into(),
            Self::Fence => "fence".into(),
            Self::Other(other) => other.opcode.to_string(),
            Self::Br(_) | Self::CondBr(_) => "br".into(),
            Self::Switch(_) => "switch".into(),
            Self::Ret(_) => "ret".into(),
            Self::Unreachable => "unreachable".into(),
        }
    }

    /// Gets the value operands of the instruction in order.
    #[must_use]
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Self::Binary(Binary { lhs, rhs, .. })
            | Self::ICmp(ICmp { lhs, rhs, .. })
            | Self::FCmp(FCmp { lhs, rhs, .. }) => vec![lhs, rhs],
            Self::Select(select) => {
                vec![&select.condition, &select.then_value, &select.else_value]
            }
            Self::Cast(Cast { value, .. })
            | Self::Freeze(Freeze { value })
            | Self::Load(Load { pointer: value }) => vec![value],
            Self::Alloca(alloca) => vec![&alloca.count],
            Self::Store(store) => vec![&store.value, &store.pointer],
            Self::Gep(gep) => std::iter::once(&gep.base).chain(&gep.indices).collect(),
            Self::ExtractValue(extract) => vec![&extract.aggregate],
            Self::InsertValue(insert) => vec![&insert.aggregate, &insert.element],
            Self::Call(call) => match &call.callee {
                Callee::Direct(_) => call.args.iter().collect(),
                Callee::Indirect(target) => std::iter::once(target).chain(&call.args).collect(),
            },
            Self::Phi(phi) => phi.incoming.iter().map(|(value, _)| value).collect(),
            Self::Other(other) => other.operands.iter().collect(),
            Self::CondBr(br) => vec![&br.condition],
            Self::Switch(switch) => vec![&switch.condition],
            Self::Ret(Ret { value: Some(value) }) => vec![value],
            Self::Fence | Self::Br(_) | Self::Ret(_) | Self::Unreachable => vec![],
        }
    }
}

/// Integer and floating-point binary operators.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    /// Checks whether the operator works on floating-point operands.
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(
            self,
            Self::FAdd | Self::FSub | Self::FMul | Self::FDiv | Self::FRem
        )
    }

    /// Gets the IR mnemonic of the operator.
    #[must_use]
    pub fn as_text_code(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::UDiv => "udiv",
            Self::SDiv => "sdiv",
            Self::URem => "urem",
            Self::SRem => "srem",
            Self::Shl => "shl",
            Self::LShr => "lshr",
            Self::AShr => "ashr",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::FAdd => "fadd",
            Self::FSub => "fsub",
            Self::FMul => "fmul",
            Self::FDiv => "fdiv",
            Self::FRem => "frem",
        }
    }
}

/// The predicates of integer comparisons.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntPredicate {
    /// Gets the IR mnemonic of the predicate.
    #[must_use]
    pub fn as_text_code(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Ugt => "ugt",
            Self::Uge => "uge",
            Self::Ult => "ult",
            Self::Ule => "ule",
            Self::Sgt => "sgt",
            Self::Sge => "sge",
            Self::Slt => "slt",
            Self::Sle => "sle",
        }
    }

    /// Evaluates the predicate on two concrete integers of equal width.
    #[must_use]
    pub fn evaluate(self, lhs: KnownInt, rhs: KnownInt) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Ugt => rhs.ult(lhs),
            Self::Uge => rhs.ule(lhs),
            Self::Ult => lhs.ult(rhs),
            Self::Ule => lhs.ule(rhs),
            Self::Sgt => rhs.slt(lhs),
            Self::Sge => rhs.sle(lhs),
            Self::Slt => lhs.slt(rhs),
            Self::Sle => lhs.sle(rhs),
        }
    }
}

/// The predicates of floating-point comparisons.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FloatPredicate {
    False,
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
    Uno,
    True,
}

impl FloatPredicate {
    /// Gets the IR mnemonic of the predicate.
    #[must_use]
    pub fn as_text_code(self) -> &'static str {
        match self {
            Self::False => "false",
            Self::Oeq => "oeq",
            Self::Ogt => "ogt",
            Self::Oge => "oge",
            Self::Olt => "olt",
            Self::Ole => "ole",
            Self::One => "one",
            Self::Ord => "ord",
            Self::Ueq => "ueq",
            Self::Ugt => "ugt",
            Self::Uge => "uge",
            Self::Ult => "ult",
            Self::Ule => "ule",
            Self::Une => "une",
            Self::Uno => "uno",
            Self::True => "true",
        }
    }
}

/// The conversion operators.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
}

impl CastOp {
    /// Checks whether the conversion reads or produces a floating-point
    /// value.
    #[must_use]
    pub fn involves_floating_point(self) -> bool {
        matches!(
            self,
            Self::FPTrunc
                | Self::FPExt
                | Self::FPToUI
                | Self::FPToSI
                | Self::UIToFP
                | Self::SIToFP
        )
    }

    /// Gets the IR mnemonic of the operator.
    #[must_use]
    pub fn as_text_code(self) -> &'static str {
        match self {
            Self::Trunc => "trunc",
            Self::ZExt => "zext",
            Self::SExt => "sext",
            Self::FPTrunc => "fptrunc",
            Self::FPExt => "fpext",
            Self::FPToUI => "fptoui",
            Self::FPToSI => "fptosi",
            Self::UIToFP => "uitofp",
            Self::SIToFP => "sitofp",
            Self::PtrToInt => "ptrtoint",
            Self::IntToPtr => "inttoptr",
            Self::BitCast => "bitcast",
            Self::AddrSpaceCast => "addrspacecast",
        }
    }
}

/// `lhs op rhs`
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Binary {
    pub op:  BinaryOp,
    pub lhs: Value,
    pub rhs: Value,
}

/// An integer comparison producing an `i1`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ICmp {
    pub predicate: IntPredicate,
    pub lhs:       Value,
    pub rhs:       Value,
}

/// A floating-point comparison producing an `i1`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FCmp {
    pub predicate: FloatPredicate,
    pub lhs:       Value,
    pub rhs:       Value,
}

/// `condition ? then_value : else_value`
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Select {
    pub condition:  Value,
    pub then_value: Value,
    pub else_value: Value,
}

/// A conversion of `value` to the type of the instruction.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Cast {
    pub op:    CastOp,
    pub value: Value,
}

/// Stops the propagation of undefined values.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Freeze {
    pub value: Value,
}

/// Allocates `count` elements of type `allocated` on the stack.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Alloca {
    pub allocated: Type,
    pub count:     Value,
}

/// Reads a value of the instruction's type from `pointer`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Load {
    pub pointer: Value,
}

/// Writes `value` to `pointer`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Store {
    pub value:   Value,
    pub pointer: Value,
}

/// Computes an address from `base` by indexing into `source`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Gep {
    pub source:  Type,
    pub base:    Value,
    pub indices: Vec<Value>,
}

/// Reads a member of an aggregate register.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ExtractValue {
    pub aggregate: Value,
    pub indices:   Vec<u32>,
}

/// Replaces a member of an aggregate register.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct InsertValue {
    pub aggregate: Value,
    pub element:   Value,
    pub indices:   Vec<u32>,
}

/// The target of a call.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Callee {
    /// A call to a function known by name.
    Direct(Arc<str>),

    /// A call through a function pointer.
    Indirect(Value),
}

/// A function call.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Call {
    pub callee: Callee,
    pub args:   Vec<Value>,
}

/// Selects a value depending on the predecessor block.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Phi {
    pub incoming: Vec<(Value, BlockId)>,
}

impl Phi {
    /// Gets the value that flows in from the block `from`.
    #[must_use]
    pub fn incoming_for(&self, from: BlockId) -> Option<&Value> {
        self.incoming
            .iter()
            .find(|(_, block)| *block == from)
            .map(|(value, _)| value)
    }
}

/// An instruction the IR carries but that has no dedicated payload, such as
/// `atomicrmw`, `cmpxchg` or `va_arg`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Other {
    pub opcode:   Arc<str>,
    pub operands: Vec<Value>,
}

/// An unconditional branch.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Br {
    pub dest: BlockId,
}

/// A two-way conditional branch on an `i1`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CondBr {
    pub condition: Value,
    pub then_dest: BlockId,
    pub else_dest: BlockId,
}

/// A multi-way branch on an integer.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Switch {
    pub condition: Value,
    pub default:   BlockId,
    pub cases:     Vec<(KnownInt, BlockId)>,
}

/// A return from the function.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Ret {
    pub value: Option<Value>,
}

#[cfg(test)]
mod test {
    use crate::{
        ir::{
            instruction::{
                Binary,
                BinaryOp,
                InstKind,
                Instruction,
                IntPredicate,
                Phi,
                Switch,
            },
            types::Type,
            value::Constant,
            BlockId,
            ValueId,
        },
        vm::value::known::KnownInt,
    };

    #[test]
    fn lists_successors() {
        let switch = Instruction {
            id:   ValueId(4),
            name: None,
            ty:   Type::Void,
            kind: InstKind::Switch(Switch {
                condition: Constant::int(8, 1u8).into(),
                default:   BlockId(1),
                cases:     vec![(KnownInt::new(8, 1u8), BlockId(2))],
            }),
        };

        assert!(switch.is_terminator());
        assert_eq!(switch.successors(), vec![BlockId(1), BlockId(2)]);
    }

    #[test]
    fn finds_incoming_phi_values() {
        let phi = Phi {
            incoming: vec![
                (Constant::int(32, 1u8).into(), BlockId(0)),
                (Constant::int(32, 2u8).into(), BlockId(3)),
            ],
        };

        assert_eq!(phi.incoming_for(BlockId(3)), Some(&Constant::int(32, 2u8).into()));
        assert_eq!(phi.incoming_for(BlockId(1)), None);
    }

    #[test]
    fn evaluates_integer_predicates() {
        let minus_one = KnownInt::ones(8);
        let one = KnownInt::new(8, 1u8);

        assert!(IntPredicate::Slt.evaluate(minus_one, one));
        assert!(IntPredicate::Ugt.evaluate(minus_one, one));
        assert!(IntPredicate::Ne.evaluate(minus_one, one));
        assert!(!IntPredicate::Sge.evaluate(minus_one, one));
    }

    #[test]
    fn displays_instructions() {
        let add = Instruction {
            id:   ValueId(7),
            name: Some("sum".into()),
            ty:   Type::Int(32),
            kind: InstKind::Binary(Binary {
                op:  BinaryOp::Add,
                lhs: Constant::int(32, 1u8).into(),
                rhs: Constant::int(32, 2u8).into(),
            }),
        };

        assert_eq!(add.to_string(), "%sum = add 1, 2");
    }
}
