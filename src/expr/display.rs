//! Printing of terms in SMT-LIB v2 syntax.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::{
    expr::{Expr, Op, Sort, Term},
    vm::value::known::KnownInt,
};

impl Op {
    /// Gets the SMT-LIB head of an application of the operator.
    #[must_use]
    pub fn as_text_code(&self, sort: Sort) -> String {
        match self {
            Self::Not => "not".into(),
            Self::And => "and".into(),
            Self::Or => "or".into(),
            Self::Xor => "xor".into(),
            Self::Implies => "=>".into(),
            Self::Eq => "=".into(),
            Self::Ite => "ite".into(),
            Self::BvNot => "bvnot".into(),
            Self::BvNeg => "bvneg".into(),
            Self::BvAdd => "bvadd".into(),
            Self::BvSub => "bvsub".into(),
            Self::BvMul => "bvmul".into(),
            Self::BvUDiv => "bvudiv".into(),
            Self::BvSDiv => "bvsdiv".into(),
            Self::BvURem => "bvurem".into(),
            Self::BvSRem => "bvsrem".into(),
            Self::BvShl => "bvshl".into(),
            Self::BvLShr => "bvlshr".into(),
            Self::BvAShr => "bvashr".into(),
            Self::BvAnd => "bvand".into(),
            Self::BvOr => "bvor".into(),
            Self::BvXor => "bvxor".into(),
            Self::BvUlt => "bvult".into(),
            Self::BvUle => "bvule".into(),
            Self::BvSlt => "bvslt".into(),
            Self::BvSle => "bvsle".into(),
            Self::Extract { high, low } => format!("(_ extract {high} {low})"),
            Self::ZeroExtend(by) => format!("(_ zero_extend {by})"),
            Self::SignExtend(by) => format!("(_ sign_extend {by})"),
            Self::Concat => "concat".into(),
            Self::Select => "select".into(),
            Self::Store => "store".into(),
            Self::ConstArray { .. } => format!("(as const {sort})"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.term() {
            Term::Bool(value) => write!(f, "{value}"),
            Term::Bv(value) => write!(f, "{}", bv_literal(value)),
            Term::Var { name, .. } => write!(f, "{}", quote_symbol(name)),
            Term::App { op, args } => {
                let args = args.iter().join(" ");
                write!(f, "({} {args})", op.as_text_code(self.sort()))
            }
        }
    }
}

/// Formats a bit-vector literal, in hexadecimal where the width allows it
/// and in binary otherwise.
#[must_use]
pub fn bv_literal(value: &KnownInt) -> String {
    let width = value.width();
    if width % 4 == 0 {
        let digits = hex::encode(value.bytes_be());
        let skip = digits.len() - (width / 4) as usize;
        format!("#x{}", &digits[skip..])
    } else {
        let bits: String = value
            .bits_le()
            .iter()
            .rev()
            .map(|bit| if *bit { '1' } else { '0' })
            .collect();
        format!("#b{bits}")
    }
}

/// Quotes `name` with bars unless it is a simple SMT-LIB symbol.
#[must_use]
pub fn quote_symbol(name: &str) -> String {
    let is_simple = |c: char| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c);
    let starts_with_digit = name.chars().next().map_or(true, |c| c.is_ascii_digit());
    if !starts_with_digit && name.chars().all(is_simple) {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

#[cfg(test)]
mod test {
    use crate::{
        expr::{
            display::{bv_literal, quote_symbol},
            ExprBuilder,
            Op,
            Sort,
        },
        vm::value::known::KnownInt,
    };

    #[test]
    fn prints_literals() {
        assert_eq!(bv_literal(&KnownInt::new(8, 0x0au8)), "#x0a");
        assert_eq!(bv_literal(&KnownInt::new(12, 0xabcu16)), "#xabc");
        assert_eq!(bv_literal(&KnownInt::new(3, 0b101u8)), "#b101");
        assert_eq!(bv_literal(&KnownInt::from_bool(true)), "#b1");
    }

    #[test]
    fn quotes_complex_symbols() {
        assert_eq!(quote_symbol("mem"), "mem");
        assert_eq!(quote_symbol("%x!3"), "%x!3");
        assert_eq!(quote_symbol("error.flag!main!entry"), "error.flag!main!entry");
        assert_eq!(quote_symbol("has space"), "|has space|");
        assert_eq!(quote_symbol("0day"), "|0day|");
    }

    #[test]
    fn prints_applications() {
        let b = ExprBuilder::new(false);
        let x = b.var("x", Sort::Bv(16));
        let low = b.extract(7, 0, x.clone());
        let sum = b.bv_binary(Op::BvAdd, x, b.bv_u64(16, 1));
        let memory = b.const_array(64, b.bv_u64(8, 0));

        assert_eq!(low.to_string(), "((_ extract 7 0) x)");
        assert_eq!(sum.to_string(), "(bvadd x #x0001)");
        assert_eq!(
            memory.to_string(),
            "((as const (Array (_ BitVec 64) (_ BitVec 8))) #x00)"
        );
    }
}
