//! The builder through which every term is constructed.
//!
//! Constants are always folded using the same arithmetic as the concrete
//! interpretation, so a term over literals is always a literal. When
//! simplification is enabled the builder additionally applies local
//! identities (`x + 0 = x`, `ite(c, x, x) = x`, read-over-write on arrays and
//! so on) that never change the meaning of a term.

use std::sync::Arc;

use crate::{
    constant::MAX_CONSTANT_WIDTH_BITS,
    expr::{Expr, Op, Sort, Term},
    vm::value::known::KnownInt,
};

/// A structure that provides an interface to building new [`Expr`]s with
/// access to the simplification configuration.
///
/// # Panics
///
/// The builder methods panic if their arguments have sorts that the
/// operation does not accept. Callers are expected to have checked the sorts
/// of terms derived from the program, so this is a programmer bug.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExprBuilder {
    simplify: bool,
}

impl ExprBuilder {
    /// Constructs a new builder, with local simplification enabled if
    /// `simplify` is set.
    #[must_use]
    pub fn new(simplify: bool) -> Self {
        Self { simplify }
    }

    /// Checks whether local simplification is enabled.
    #[must_use]
    pub fn simplifies(&self) -> bool {
        self.simplify
    }

    /// Creates a boolean literal.
    #[must_use]
    pub fn bool(&self, value: bool) -> Expr {
        Expr::from_parts(Term::Bool(value), Sort::Bool)
    }

    /// Creates a bit-vector literal.
    #[must_use]
    pub fn bv(&self, value: KnownInt) -> Expr {
        Expr::from_parts(Term::Bv(value), Sort::Bv(value.width()))
    }

    /// Creates the bit-vector literal of `width` bits with value `value`.
    #[must_use]
    pub fn bv_u64(&self, width: u32, value: u64) -> Expr {
        self.bv(KnownInt::new(width, value))
    }

    /// Creates a free variable.
    #[must_use]
    pub fn var(&self, name: &str, sort: Sort) -> Expr {
        let name: Arc<str> = name.into();
        Expr::from_parts(Term::Var { name, sort }, sort)
    }

    /// Creates the negation of a boolean.
    #[must_use]
    pub fn not(&self, arg: Expr) -> Expr {
        assert_sort(&arg, Sort::Bool);
        if let Some(value) = arg.as_bool() {
            return self.bool(!value);
        }
        if self.simplify {
            if let Some((Op::Not, [inner])) = arg.as_app() {
                return inner.clone();
            }
        }

        app(Op::Not, vec![arg], Sort::Bool)
    }

    /// Creates the conjunction of `args`, which is `true` when empty.
    #[must_use]
    pub fn and(&self, args: Vec<Expr>) -> Expr {
        self.junction(Op::And, args)
    }

    /// Creates the disjunction of `args`, which is `false` when empty.
    #[must_use]
    pub fn or(&self, args: Vec<Expr>) -> Expr {
        self.junction(Op::Or, args)
    }

    /// Creates the conjunction of two booleans.
    #[must_use]
    pub fn and2(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.and(vec![lhs, rhs])
    }

    /// Creates the disjunction of two booleans.
    #[must_use]
    pub fn or2(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.or(vec![lhs, rhs])
    }

    /// Creates the implication `lhs => rhs`.
    #[must_use]
    pub fn implies(&self, lhs: Expr, rhs: Expr) -> Expr {
        assert_sort(&lhs, Sort::Bool);
        assert_sort(&rhs, Sort::Bool);
        if lhs.is_false() || rhs.is_true() {
            return self.bool(true);
        }
        if lhs.is_true() {
            return rhs;
        }

        app(Op::Implies, vec![lhs, rhs], Sort::Bool)
    }

    /// Creates the exclusive or of two booleans.
    #[must_use]
    pub fn xor(&self, lhs: Expr, rhs: Expr) -> Expr {
        assert_sort(&lhs, Sort::Bool);
        assert_sort(&rhs, Sort::Bool);
        match (lhs.as_bool(), rhs.as_bool()) {
            (Some(l), Some(r)) => self.bool(l ^ r),
            (Some(false), None) => rhs,
            (None, Some(false)) => lhs,
            (Some(true), None) => self.not(rhs),
            (None, Some(true)) => self.not(lhs),
            _ if self.simplify && lhs == rhs => self.bool(false),
            _ => app(Op::Xor, vec![lhs, rhs], Sort::Bool),
        }
    }

    /// Creates the equality of two terms of the same sort.
    #[must_use]
    pub fn eq(&self, lhs: Expr, rhs: Expr) -> Expr {
        assert_same_sort(&lhs, &rhs);
        if lhs.is_const() && rhs.is_const() {
            return self.bool(lhs == rhs);
        }
        if self.simplify {
            if lhs == rhs {
                return self.bool(true);
            }
            match (lhs.as_bool(), rhs.as_bool()) {
                (Some(true), _) => return rhs,
                (_, Some(true)) => return lhs,
                (Some(false), _) => return self.not(rhs),
                (_, Some(false)) => return self.not(lhs),
                _ => (),
            }
        }

        app(Op::Eq, vec![lhs, rhs], Sort::Bool)
    }

    /// Creates the disequality of two terms of the same sort.
    #[must_use]
    pub fn ne(&self, lhs: Expr, rhs: Expr) -> Expr {
        let eq = self.eq(lhs, rhs);
        self.not(eq)
    }

    /// Creates the conditional `if condition then then_expr else else_expr`.
    #[must_use]
    pub fn ite(&self, condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        assert_sort(&condition, Sort::Bool);
        assert_same_sort(&then_expr, &else_expr);
        if let Some(value) = condition.as_bool() {
            return if value { then_expr } else { else_expr };
        }
        if self.simplify {
            if then_expr == else_expr {
                return then_expr;
            }
            if then_expr.is_true() && else_expr.is_false() {
                return condition;
            }
            if then_expr.is_false() && else_expr.is_true() {
                return self.not(condition);
            }
        }

        let sort = then_expr.sort();
        app(Op::Ite, vec![condition, then_expr, else_expr], sort)
    }

    /// Creates the bitwise complement of a bit-vector.
    #[must_use]
    pub fn bvnot(&self, arg: Expr) -> Expr {
        let sort = assert_bv(&arg);
        if let Some(value) = arg.as_bv() {
            return self.bv(!value);
        }
        if self.simplify {
            if let Some((Op::BvNot, [inner])) = arg.as_app() {
                return inner.clone();
            }
        }

        app(Op::BvNot, vec![arg], sort)
    }

    /// Creates the two's complement negation of a bit-vector.
    #[must_use]
    pub fn bvneg(&self, arg: Expr) -> Expr {
        let sort = assert_bv(&arg);
        if let Some(value) = arg.as_bv() {
            return self.bv(-value);
        }

        app(Op::BvNeg, vec![arg], sort)
    }

    /// Creates a binary bit-vector operation whose result has the sort of
    /// its operands.
    ///
    /// # Panics
    ///
    /// Panics if `op` is not a binary bit-vector operation.
    #[must_use]
    pub fn bv_binary(&self, op: Op, lhs: Expr, rhs: Expr) -> Expr {
        assert_same_sort(&lhs, &rhs);
        let sort = assert_bv(&lhs);

        if let (Some(l), Some(r)) = (lhs.as_bv(), rhs.as_bv()) {
            let value = match op {
                Op::BvAdd => l + r,
                Op::BvSub => l - r,
                Op::BvMul => l * r,
                Op::BvUDiv => l.udiv(r),
                Op::BvSDiv => l.sdiv(r),
                Op::BvURem => l.urem(r),
                Op::BvSRem => l.srem(r),
                Op::BvShl => l.shl(r),
                Op::BvLShr => l.lshr(r),
                Op::BvAShr => l.ashr(r),
                Op::BvAnd => l & r,
                Op::BvOr => l | r,
                Op::BvXor => l ^ r,
                _ => panic!("{op:?} is not a binary bit-vector operation"),
            };
            return self.bv(value);
        }

        if self.simplify {
            if let Some(simplified) = self.simplify_bv_binary(op, &lhs, &rhs) {
                return simplified;
            }
        }

        app(op, vec![lhs, rhs], sort)
    }

    /// Applies the identities of binary bit-vector operations.
    fn simplify_bv_binary(&self, op: Op, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
        let is_zero = |e: &Expr| e.as_bv().is_some_and(|v| v.is_zero());
        let is_one = |e: &Expr| e.as_bv().is_some_and(|v| v.to_u64() == Some(1));
        let is_ones = |e: &Expr| e.as_bv().is_some_and(|v| v.is_ones());
        let width = lhs.bv_width().unwrap_or(1);
        let zero = || self.bv(KnownInt::zero(width));

        let result = match op {
            Op::BvAdd | Op::BvOr | Op::BvXor if is_zero(lhs) => rhs.clone(),
            Op::BvAdd | Op::BvSub | Op::BvOr | Op::BvXor if is_zero(rhs) => lhs.clone(),
            Op::BvShl | Op::BvLShr | Op::BvAShr if is_zero(rhs) => lhs.clone(),
            Op::BvSub | Op::BvXor if lhs == rhs => zero(),
            Op::BvMul | Op::BvAnd if is_zero(lhs) || is_zero(rhs) => zero(),
            Op::BvMul if is_one(lhs) => rhs.clone(),
            Op::BvMul | Op::BvUDiv | Op::BvSDiv if is_one(rhs) => lhs.clone(),
            Op::BvURem | Op::BvSRem if is_one(rhs) => zero(),
            Op::BvAnd if is_ones(lhs) => rhs.clone(),
            Op::BvAnd if is_ones(rhs) => lhs.clone(),
            Op::BvOr if is_ones(lhs) || is_ones(rhs) => self.bv(KnownInt::ones(width)),
            Op::BvAnd | Op::BvOr if lhs == rhs => lhs.clone(),
            _ => return None,
        };

        Some(result)
    }

    /// Creates `lhs + rhs`.
    #[must_use]
    pub fn bvadd(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.bv_binary(Op::BvAdd, lhs, rhs)
    }

    /// Creates `lhs - rhs`.
    #[must_use]
    pub fn bvsub(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.bv_binary(Op::BvSub, lhs, rhs)
    }

    /// Creates `lhs * rhs`.
    #[must_use]
    pub fn bvmul(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.bv_binary(Op::BvMul, lhs, rhs)
    }

    /// Creates a bit-vector comparison.
    ///
    /// # Panics
    ///
    /// Panics if `op` is not a bit-vector comparison.
    #[must_use]
    pub fn bv_compare(&self, op: Op, lhs: Expr, rhs: Expr) -> Expr {
        assert_same_sort(&lhs, &rhs);
        assert_bv(&lhs);

        if let (Some(l), Some(r)) = (lhs.as_bv(), rhs.as_bv()) {
            let value = match op {
                Op::BvUlt => l.ult(r),
                Op::BvUle => l.ule(r),
                Op::BvSlt => l.slt(r),
                Op::BvSle => l.sle(r),
                _ => panic!("{op:?} is not a bit-vector comparison"),
            };
            return self.bool(value);
        }
        if self.simplify && lhs == rhs {
            return self.bool(matches!(op, Op::BvUle | Op::BvSle));
        }

        app(op, vec![lhs, rhs], Sort::Bool)
    }

    /// Creates the bits `high` down to `low` of `arg`.
    #[must_use]
    pub fn extract(&self, high: u32, low: u32, arg: Expr) -> Expr {
        let width = assert_bv(&arg).bv_width().unwrap_or(0);
        assert!(
            low <= high && high < width,
            "Cannot extract bits {high}..{low} from a {width}-bit term"
        );

        if let Some(value) = arg.as_bv() {
            return self.bv(value.extract(high, low));
        }
        if self.simplify {
            if low == 0 && high + 1 == width {
                return arg;
            }
            match arg.as_app() {
                Some((Op::Extract { low: inner_low, .. }, [inner])) => {
                    return self.extract(high + inner_low, low + inner_low, inner.clone());
                }
                Some((Op::Concat, [upper, lower])) => {
                    let split = lower.bv_width().unwrap_or(0);
                    if high < split {
                        return self.extract(high, low, lower.clone());
                    }
                    if low >= split {
                        return self.extract(high - split, low - split, upper.clone());
                    }
                }
                Some((Op::ZeroExtend(_), [inner])) => {
                    let inner_width = inner.bv_width().unwrap_or(0);
                    if high < inner_width {
                        return self.extract(high, low, inner.clone());
                    }
                    if low >= inner_width {
                        return self.bv(KnownInt::zero(high - low + 1));
                    }
                }
                _ => (),
            }
        }

        app(Op::Extract { high, low }, vec![arg], Sort::Bv(high - low + 1))
    }

    /// Zero-extends `arg` to `width` bits.
    #[must_use]
    pub fn zext(&self, arg: Expr, width: u32) -> Expr {
        let from = assert_bv(&arg).bv_width().unwrap_or(0);
        assert!(width >= from, "Cannot extend a {from}-bit term to {width} bits");
        if width == from {
            return arg;
        }
        if let Some(value) = arg.as_bv() {
            if width <= MAX_CONSTANT_WIDTH_BITS {
                return self.bv(value.zext(width));
            }
        }

        app(Op::ZeroExtend(width - from), vec![arg], Sort::Bv(width))
    }

    /// Sign-extends `arg` to `width` bits.
    #[must_use]
    pub fn sext(&self, arg: Expr, width: u32) -> Expr {
        let from = assert_bv(&arg).bv_width().unwrap_or(0);
        assert!(width >= from, "Cannot extend a {from}-bit term to {width} bits");
        if width == from {
            return arg;
        }
        if let Some(value) = arg.as_bv() {
            if width <= MAX_CONSTANT_WIDTH_BITS {
                return self.bv(value.sext(width));
            }
        }

        app(Op::SignExtend(width - from), vec![arg], Sort::Bv(width))
    }

    /// Truncates or zero-extends `arg` to `width` bits.
    #[must_use]
    pub fn resize_unsigned(&self, arg: Expr, width: u32) -> Expr {
        let from = assert_bv(&arg).bv_width().unwrap_or(0);
        if width < from {
            self.extract(width - 1, 0, arg)
        } else {
            self.zext(arg, width)
        }
    }

    /// Truncates or sign-extends `arg` to `width` bits.
    #[must_use]
    pub fn resize_signed(&self, arg: Expr, width: u32) -> Expr {
        let from = assert_bv(&arg).bv_width().unwrap_or(0);
        if width < from {
            self.extract(width - 1, 0, arg)
        } else {
            self.sext(arg, width)
        }
    }

    /// Creates the concatenation of `high` above `low`.
    #[must_use]
    pub fn concat(&self, high: Expr, low: Expr) -> Expr {
        let high_width = assert_bv(&high).bv_width().unwrap_or(0);
        let low_width = assert_bv(&low).bv_width().unwrap_or(0);
        let width = high_width + low_width;

        if let (Some(h), Some(l)) = (high.as_bv(), low.as_bv()) {
            if width <= MAX_CONSTANT_WIDTH_BITS {
                return self.bv(h.concat(l));
            }
        }
        if self.simplify {
            // Adjacent slices of the same term recombine.
            if let (
                Some((Op::Extract { high: hh, low: hl }, [h_inner])),
                Some((Op::Extract { high: lh, low: ll }, [l_inner])),
            ) = (high.as_app(), low.as_app())
            {
                if h_inner == l_inner && hl == lh + 1 {
                    return self.extract(hh, ll, h_inner.clone());
                }
            }
            // The same, when the lower slice heads a longer concatenation.
            if let (
                Some((Op::Extract { high: hh, low: hl }, [h_inner])),
                Some((Op::Concat, [upper, rest])),
            ) = (high.as_app(), low.as_app())
            {
                if let Some((Op::Extract { high: lh, low: ll }, [l_inner])) = upper.as_app() {
                    if h_inner == l_inner && hl == lh + 1 {
                        let joined = self.extract(hh, ll, h_inner.clone());
                        return self.concat(joined, rest.clone());
                    }
                }
            }
        }

        app(Op::Concat, vec![high, low], Sort::Bv(width))
    }

    /// Concatenates `parts`, the first of which is the least significant.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is empty.
    #[must_use]
    pub fn concat_le(&self, parts: Vec<Expr>) -> Expr {
        parts
            .into_iter()
            .reduce(|low, high| self.concat(high, low))
            .unwrap_or_else(|| panic!("Cannot concatenate zero terms"))
    }

    /// Converts a boolean into a one-bit bit-vector.
    #[must_use]
    pub fn bool_to_bv(&self, arg: Expr) -> Expr {
        assert_sort(&arg, Sort::Bool);
        self.ite(arg, self.bv_u64(1, 1), self.bv_u64(1, 0))
    }

    /// Converts a one-bit bit-vector into a boolean.
    #[must_use]
    pub fn bv_to_bool(&self, arg: Expr) -> Expr {
        assert_sort(&arg, Sort::Bv(1));
        if self.simplify {
            // Undo a previous conversion in the other direction.
            if let Some((Op::Ite, [condition, then_expr, else_expr])) = arg.as_app() {
                if then_expr.as_bv() == Some(KnownInt::new(1, 1u8))
                    && else_expr.as_bv() == Some(KnownInt::zero(1))
                {
                    return condition.clone();
                }
            }
        }
        self.eq(arg, self.bv_u64(1, 1))
    }

    /// Creates the array that maps every index of `index` bits to `value`.
    #[must_use]
    pub fn const_array(&self, index: u32, value: Expr) -> Expr {
        let element = assert_bv(&value).bv_width().unwrap_or(0);
        app(Op::ConstArray { index }, vec![value], Sort::Array { index, element })
    }

    /// Creates the read of `array` at `index`.
    #[must_use]
    pub fn select(&self, array: Expr, index: Expr) -> Expr {
        let Sort::Array {
            index: index_width,
            element,
        } = array.sort()
        else {
            panic!("Cannot select from a term of sort {}", array.sort());
        };
        assert_sort(&index, Sort::Bv(index_width));

        if self.simplify {
            let mut current = array.clone();
            loop {
                match current.as_app() {
                    Some((Op::Store, [inner, stored_at, value])) => {
                        match same_address(stored_at, &index) {
                            Some(true) => return value.clone(),
                            Some(false) => current = inner.clone(),
                            None => break,
                        }
                    }
                    Some((Op::ConstArray { .. }, [value])) => return value.clone(),
                    _ => break,
                }
            }
            return app(Op::Select, vec![current, index], Sort::Bv(element));
        }

        app(Op::Select, vec![array, index], Sort::Bv(element))
    }

    /// Creates the array that is `array` except that `index` maps to
    /// `value`.
    #[must_use]
    pub fn store(&self, array: Expr, index: Expr, value: Expr) -> Expr {
        let Sort::Array {
            index: index_width,
            element,
        } = array.sort()
        else {
            panic!("Cannot store into a term of sort {}", array.sort());
        };
        assert_sort(&index, Sort::Bv(index_width));
        assert_sort(&value, Sort::Bv(element));

        let sort = array.sort();
        if self.simplify {
            if let Some((Op::Store, [inner, stored_at, _])) = array.as_app() {
                if same_address(stored_at, &index) == Some(true) {
                    return app(Op::Store, vec![inner.clone(), index, value], sort);
                }
            }
        }

        app(Op::Store, vec![array, index, value], sort)
    }

    /// Builds a conjunction or disjunction, folding the literals.
    fn junction(&self, op: Op, args: Vec<Expr>) -> Expr {
        let (unit, zero) = if op == Op::And {
            (true, false)
        } else {
            (false, true)
        };

        let mut kept: Vec<Expr> = Vec::with_capacity(args.len());
        for arg in args {
            assert_sort(&arg, Sort::Bool);
            match arg.as_bool() {
                Some(value) if value == zero => return self.bool(zero),
                Some(_) => (),
                None => {
                    if self.simplify {
                        if let Some((inner_op, inner_args)) = arg.as_app() {
                            if inner_op == op {
                                kept.extend(inner_args.iter().cloned());
                                continue;
                            }
                        }
                        if kept.contains(&arg) {
                            continue;
                        }
                    }
                    kept.push(arg);
                }
            }
        }

        match kept.len() {
            0 => self.bool(unit),
            1 => kept.remove(0),
            _ => app(op, kept, Sort::Bool),
        }
    }
}

/// Decides whether two addresses are the same, if that can be determined
/// syntactically.
///
/// Addresses are compared as a base plus a constant offset, so `p + 4` and
/// `p + 8` are known to differ even when `p` is symbolic.
fn same_address(lhs: &Expr, rhs: &Expr) -> Option<bool> {
    if lhs == rhs {
        return Some(true);
    }
    let (lhs_base, lhs_offset) = split_offset(lhs);
    let (rhs_base, rhs_offset) = split_offset(rhs);
    if lhs_base == rhs_base {
        Some(lhs_offset == rhs_offset)
    } else {
        None
    }
}

/// Splits an address into a symbolic base and a constant offset, where a
/// missing base stands for the null pointer.
fn split_offset(address: &Expr) -> (Option<&Expr>, KnownInt) {
    if let Some(value) = address.as_bv() {
        return (None, value);
    }
    if let Some((Op::BvAdd, [base, offset])) = address.as_app() {
        if let Some(value) = offset.as_bv() {
            return (Some(base), value);
        }
        if let Some(value) = base.as_bv() {
            return (Some(offset), value);
        }
    }
    let width = address.bv_width().unwrap_or(1);
    (Some(address), KnownInt::zero(width))
}

fn app(op: Op, args: Vec<Expr>, sort: Sort) -> Expr {
    Expr::from_parts(Term::App { op, args }, sort)
}

fn assert_sort(expr: &Expr, sort: Sort) {
    assert_eq!(
        expr.sort(),
        sort,
        "Expected a term of sort {sort} but found {}",
        expr.sort()
    );
}

fn assert_same_sort(lhs: &Expr, rhs: &Expr) {
    assert_eq!(
        lhs.sort(),
        rhs.sort(),
        "Operands have different sorts {} and {}",
        lhs.sort(),
        rhs.sort()
    );
}

fn assert_bv(expr: &Expr) -> Sort {
    let sort = expr.sort();
    assert!(
        matches!(sort, Sort::Bv(_)),
        "Expected a bit-vector term but found one of sort {sort}"
    );
    sort
}
