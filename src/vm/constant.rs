//! This module contains the materialisation of constants, both as concrete
//! values for initialising memory and as terms for use as operands.

use ethnum::{I256, U256};

use crate::{
    constant::MAX_CONSTANT_WIDTH_BITS,
    error::execution::Error,
    expr::Expr,
    ir::{
        BinaryOp,
        CastOp,
        Constant,
        ConstantExpr,
        GepStep,
        GepTypeIter,
        IntPredicate,
        Type,
        Value,
    },
    layout::QueryResult,
    opcode::{arithmetic::binary_term, cast::cast_term, logic::icmp_term},
    vm::{
        state::Context,
        value::{generic::GenericValue, known::KnownInt, to_bytes, zero_of_sort},
        OpSem,
    },
};

impl OpSem<'_> {
    /// Evaluates `constant` to a concrete value.
    ///
    /// Integer arithmetic wraps in two's complement, floating-point
    /// arithmetic follows IEEE-754, and `undef` evaluates to zero. Returns
    /// [`None`] for constants whose value depends on where globals or
    /// functions are placed in memory.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the constant is malformed or of a type that has no
    /// concrete representation.
    pub fn get_constant_value(&self, constant: &Constant) -> QueryResult<Option<GenericValue>> {
        if constant.is_relocatable() {
            return Ok(None);
        }

        self.evaluate(constant).map(Some)
    }

    /// Writes the value of `constant` into `buffer` as it would be laid out
    /// in the memory of the target.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the constant has no concrete value or `buffer` is
    /// smaller than the store size of its type.
    pub fn init_memory(&self, constant: &Constant, buffer: &mut [u8]) -> QueryResult<()> {
        let value = self
            .get_constant_value(constant)?
            .ok_or_else(|| Error::RelocatableConstant {
                constant: constant.to_string(),
            })?;
        self.store_value_to_memory(&value, buffer, &constant.ty())
    }

    /// Writes `value`, of type `ty`, into `buffer` in the byte order of the
    /// target.
    ///
    /// Exactly `storage_size(ty)` bytes are written, with padding zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `value` is not a value of `ty` or `buffer` is too
    /// small.
    pub fn store_value_to_memory(
        &self,
        value: &GenericValue,
        buffer: &mut [u8],
        ty: &Type,
    ) -> QueryResult<()> {
        let size = self.storage_size(ty)?;
        let available = buffer.len() as u64;
        if available < size {
            return Err(Error::BufferTooSmall {
                required: size,
                available,
            });
        }
        let buffer = &mut buffer[..usize::try_from(size).unwrap_or(usize::MAX)];
        buffer.fill(0);
        let mismatch = || Error::ValueTypeMismatch {
            value: value.to_string(),
            ty:    ty.clone(),
        };

        match (value, ty) {
            (GenericValue::Int(known), Type::Int(width)) if known.width() == *width => {
                self.write_scalar(&known.bytes_le(), buffer);
            }
            (GenericValue::Pointer(address), Type::Pointer) => {
                let address = KnownInt::new(self.pointer_size_in_bits(), *address);
                self.write_scalar(&address.bytes_le(), buffer);
            }
            (GenericValue::Float(float), Type::Float) => {
                self.write_scalar(&float.to_le_bytes(), buffer);
            }
            (GenericValue::Double(double), Type::Double) => {
                self.write_scalar(&double.to_le_bytes(), buffer);
            }
            (GenericValue::Aggregate(elements), _) => {
                let members = self.members(ty)?;
                if elements.len() != members.len() {
                    return Err(mismatch());
                }
                for (element, (offset, member)) in elements.iter().zip(members) {
                    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
                    let slot = buffer.get_mut(offset..).ok_or_else(mismatch)?;
                    self.store_value_to_memory(element, slot, &member)?;
                }
            }
            _ => return Err(mismatch()),
        }

        Ok(())
    }

    /// Reads a value of type `ty` from `buffer`, which holds it as laid out
    /// in the memory of the target.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `ty` has no concrete representation or `buffer` is
    /// too small.
    pub fn load_value_from_memory(&self, buffer: &[u8], ty: &Type) -> QueryResult<GenericValue> {
        let size = self.storage_size(ty)?;
        let available = buffer.len() as u64;
        if available < size {
            return Err(Error::BufferTooSmall {
                required: size,
                available,
            });
        }
        let buffer = &buffer[..usize::try_from(size).unwrap_or(usize::MAX)];
        let mut le = buffer.to_vec();
        if !self.layout.is_little_endian() {
            le.reverse();
        }

        let value = match ty {
            Type::Int(width) if *width <= MAX_CONSTANT_WIDTH_BITS => {
                GenericValue::Int(KnownInt::from_le_bytes(*width, &le))
            }
            Type::Int(width) => return Err(Error::ConstantTooWide { width: *width }),
            Type::Pointer => {
                let address = KnownInt::from_le_bytes(self.pointer_size_in_bits(), &le);
                GenericValue::Pointer(address.as_u64())
            }
            Type::Float => {
                let bits = KnownInt::from_le_bytes(32, &le).as_u64();
                GenericValue::Float(f32::from_bits(u32::try_from(bits).unwrap_or_default()))
            }
            Type::Double => {
                GenericValue::Double(f64::from_bits(KnownInt::from_le_bytes(64, &le).as_u64()))
            }
            _ => {
                let mut elements = Vec::new();
                for (offset, member) in self.members(ty)? {
                    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
                    let slot = buffer.get(offset..).unwrap_or_default();
                    elements.push(self.load_value_from_memory(slot, &member)?);
                }
                GenericValue::Aggregate(elements)
            }
        };

        Ok(value)
    }

    /// Copies the little-endian `bytes` of a scalar into `buffer` in the
    /// target's byte order.
    fn write_scalar(&self, bytes: &[u8], buffer: &mut [u8]) {
        let count = bytes.len().min(buffer.len());
        if self.layout.is_little_endian() {
            buffer[..count].copy_from_slice(&bytes[..count]);
        } else {
            for (slot, byte) in buffer[..count].iter_mut().zip(bytes[..count].iter().rev()) {
                *slot = *byte;
            }
        }
    }

    /// Gets the byte offset and type of every member of the aggregate `ty`.
    fn members(&self, ty: &Type) -> QueryResult<Vec<(u64, Type)>> {
        let members = match ty {
            Type::Struct(body) => {
                let layout = self.layout.struct_layout(body)?;
                layout.offsets.into_iter().zip(body.fields.iter().cloned()).collect()
            }
            Type::Array(element, count) => {
                let stride = self.alloc_size(element)?;
                (0..*count).map(|i| (i * stride, element.as_ref().clone())).collect()
            }
            Type::Vector(element, count) => {
                let bits = self.size_in_bits_of_type(element)?;
                if bits % 8 != 0 {
                    return Err(Error::UnsupportedType { ty: ty.clone() });
                }
                (0..u64::from(*count))
                    .map(|i| (i * bits / 8, element.as_ref().clone()))
                    .collect()
            }
            _ => return Err(Error::UnsupportedType { ty: ty.clone() }),
        };

        Ok(members)
    }

    /// Evaluates a constant that does not depend on any address.
    fn evaluate(&self, constant: &Constant) -> QueryResult<GenericValue> {
        let value = match constant {
            Constant::Int(known) => GenericValue::Int(*known),
            Constant::Float(bits) => GenericValue::Float(f32::from_bits(*bits)),
            Constant::Double(bits) => GenericValue::Double(f64::from_bits(*bits)),
            Constant::Null => GenericValue::Pointer(0),
            Constant::Undef(ty) | Constant::Zero(ty) => self.zero_value(ty)?,
            Constant::Aggregate { elements, .. } => GenericValue::Aggregate(
                elements
                    .iter()
                    .map(|e| self.evaluate(e))
                    .collect::<QueryResult<_>>()?,
            ),
            Constant::Global(_) | Constant::Function(_) => {
                return Err(Error::RelocatableConstant {
                    constant: constant.to_string(),
                })
            }
            Constant::Expr(expr) => self.evaluate_expr(expr)?,
        };

        Ok(value)
    }

    /// Builds the all-zero value of type `ty`.
    fn zero_value(&self, ty: &Type) -> QueryResult<GenericValue> {
        let value = match ty {
            Type::Int(width) => GenericValue::Int(known_zero(*width)?),
            Type::Float => GenericValue::Float(0.0),
            Type::Double => GenericValue::Double(0.0),
            Type::Pointer => GenericValue::Pointer(0),
            Type::Array(..) | Type::Struct(_) | Type::Vector(..) => GenericValue::Aggregate(
                self.members(ty)?
                    .iter()
                    .map(|(_, member)| self.zero_value(member))
                    .collect::<QueryResult<_>>()?,
            ),
            _ => return Err(Error::UnsupportedType { ty: ty.clone() }),
        };

        Ok(value)
    }

    /// Evaluates a constant expression that does not depend on any address.
    fn evaluate_expr(&self, expr: &ConstantExpr) -> QueryResult<GenericValue> {
        let mismatch = |value: &GenericValue| Error::ValueTypeMismatch {
            value: value.to_string(),
            ty:    expr.ty(),
        };

        match expr {
            ConstantExpr::Cast { op, value, ty } => {
                let value = self.evaluate(value)?;
                self.evaluate_cast(*op, &value, ty)?.ok_or_else(|| mismatch(&value))
            }
            ConstantExpr::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                evaluate_binary(*op, &lhs, &rhs).ok_or_else(|| mismatch(&lhs))
            }
            ConstantExpr::ICmp {
                predicate,
                lhs,
                rhs,
            } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                self.evaluate_icmp(*predicate, &lhs, &rhs)
                    .map(|result| GenericValue::Int(KnownInt::from_bool(result)))
                    .ok_or_else(|| mismatch(&lhs))
            }
            ConstantExpr::Gep {
                source,
                base,
                indices,
            } => {
                let base = self.evaluate(base)?;
                let address = base.as_pointer().ok_or_else(|| mismatch(&base))?;
                let offset = self.constant_offset(source, indices)?;
                let address = KnownInt::new(self.pointer_size_in_bits(), address.wrapping_add(offset));
                Ok(GenericValue::Pointer(address.as_u64()))
            }
        }
    }

    /// Evaluates a conversion, returning [`None`] if `value` cannot be
    /// converted by `op`.
    fn evaluate_cast(
        &self,
        op: CastOp,
        value: &GenericValue,
        ty: &Type,
    ) -> QueryResult<Option<GenericValue>> {
        let target_width = || -> QueryResult<u32> {
            match ty {
                Type::Int(width) if *width <= MAX_CONSTANT_WIDTH_BITS => Ok(*width),
                Type::Int(width) => Err(Error::ConstantTooWide { width: *width }),
                _ => Err(Error::UnsupportedType { ty: ty.clone() }),
            }
        };
        let to_float = |negative: bool, magnitude: U256| {
            let (mantissa, scale) = narrow_magnitude(magnitude);
            let sign: f64 = if negative { -1.0 } else { 1.0 };
            match ty {
                Type::Float => Some(GenericValue::Float(sign as f32 * (mantissa as f32) * 2f32.powi(scale))),
                Type::Double => Some(GenericValue::Double(sign * (mantissa as f64) * 2f64.powi(scale))),
                _ => None,
            }
        };

        let result = match (op, value) {
            (CastOp::Trunc, GenericValue::Int(known)) => {
                Some(GenericValue::Int(known.trunc(target_width()?)))
            }
            (CastOp::ZExt, GenericValue::Int(known)) => {
                Some(GenericValue::Int(known.zext(target_width()?)))
            }
            (CastOp::SExt, GenericValue::Int(known)) => {
                Some(GenericValue::Int(known.sext(target_width()?)))
            }
            (CastOp::FPTrunc, GenericValue::Double(double)) => {
                Some(GenericValue::Float(*double as f32))
            }
            (CastOp::FPExt, GenericValue::Float(float)) => {
                Some(GenericValue::Double(f64::from(*float)))
            }
            (CastOp::FPToUI | CastOp::FPToSI, GenericValue::Float(_) | GenericValue::Double(_)) => {
                let float = match value {
                    GenericValue::Float(float) => f64::from(*float),
                    GenericValue::Double(double) => *double,
                    _ => return Ok(None),
                };
                let width = target_width()?;
                Some(GenericValue::Int(saturating_float_to_int(float, width, op == CastOp::FPToSI)))
            }
            (CastOp::UIToFP, GenericValue::Int(known)) => to_float(false, known.value()),
            (CastOp::SIToFP, GenericValue::Int(known)) => {
                let signed = known.value_signed();
                to_float(signed < I256::ZERO, signed.unsigned_abs())
            }
            (CastOp::PtrToInt, GenericValue::Pointer(address)) => {
                Some(GenericValue::Int(KnownInt::new(target_width()?, *address)))
            }
            (CastOp::IntToPtr, GenericValue::Int(known)) => {
                let address = KnownInt::new(self.pointer_size_in_bits(), known.value());
                Some(GenericValue::Pointer(address.as_u64()))
            }
            (CastOp::BitCast | CastOp::AddrSpaceCast, _) => bitcast(value, ty),
            _ => None,
        };

        Ok(result)
    }

    /// Evaluates an integer comparison of integers or pointers.
    fn evaluate_icmp(
        &self,
        predicate: IntPredicate,
        lhs: &GenericValue,
        rhs: &GenericValue,
    ) -> Option<bool> {
        let as_int = |value: &GenericValue| match value {
            GenericValue::Int(known) => Some(*known),
            GenericValue::Pointer(address) => {
                Some(KnownInt::new(self.pointer_size_in_bits(), *address))
            }
            _ => None,
        };
        let (lhs, rhs) = (as_int(lhs)?, as_int(rhs)?);

        (lhs.width() == rhs.width()).then(|| predicate.evaluate(lhs, rhs))
    }

    /// Computes the concrete byte offset of a constant address computation.
    fn constant_offset(&self, source: &Type, indices: &[Constant]) -> QueryResult<u64> {
        let indices: Vec<Value> = indices.iter().cloned().map(Value::from).collect();
        let mut offset: u64 = 0;

        for step in GepTypeIter::new(source, &indices) {
            let index_ty = step.index().ty();
            let index = match step.index().as_constant() {
                Some(constant) => self.evaluate(constant)?.as_int(),
                None => None,
            };
            match step {
                GepStep::Sequential { element, .. } => {
                    let index = index.ok_or(Error::UnsupportedType { ty: index_ty })?;
                    let index = if index.width() < 64 {
                        index.sext(64)
                    } else {
                        index.trunc(64)
                    };
                    let stride = self.alloc_size(&element)?;
                    offset = offset.wrapping_add(index.as_u64().wrapping_mul(stride));
                }
                GepStep::Field { structure, .. } => {
                    let field = index
                        .and_then(|k| k.to_u64())
                        .ok_or(Error::NonConstantStructIndex)?;
                    offset = offset.wrapping_add(self.field_off(&structure, field)?);
                }
                GepStep::Invalid { ty, .. } => return Err(Error::UnsupportedType { ty }),
            }
        }

        Ok(offset)
    }

    /// Builds the term for `constant`, using the addresses that `ctx` has
    /// given to globals and functions.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the constant is floating-point, refers to an
    /// address the context does not know, or is malformed.
    pub fn constant_term(&self, constant: &Constant, ctx: &Context) -> QueryResult<Expr> {
        let b = &self.builder;
        let pointer_width = self.pointer_size_in_bits();
        let unknown_address = || Error::RelocatableConstant {
            constant: constant.to_string(),
        };

        let term = match constant {
            Constant::Int(known) if known.width() == 1 => b.bool(!known.is_zero()),
            Constant::Int(known) => b.bv(*known),
            Constant::Float(_) | Constant::Double(_) => {
                return Err(Error::UnsupportedType { ty: constant.ty() })
            }
            Constant::Null => b.bv_u64(pointer_width, 0),
            Constant::Undef(ty) | Constant::Zero(ty) => zero_of_sort(b, self.register_sort(ty)?),
            Constant::Aggregate { ty, elements } => self.aggregate_term(ty, elements, ctx)?,
            Constant::Global(global) => {
                let address = ctx.global_address(global.id).ok_or_else(unknown_address)?;
                b.bv_u64(pointer_width, address)
            }
            Constant::Function(name) => {
                let address = ctx.function_address(name).ok_or_else(unknown_address)?;
                b.bv_u64(pointer_width, address)
            }
            Constant::Expr(expr) => self.constant_expr_term(expr, ctx)?,
        };

        Ok(term)
    }

    /// Builds the memory image of an aggregate constant.
    fn aggregate_term(&self, ty: &Type, elements: &[Constant], ctx: &Context) -> QueryResult<Expr> {
        let b = &self.builder;
        self.register_sort(ty)?;
        let members = self.members(ty)?;
        if members.len() != elements.len() {
            return Err(Error::ValueTypeMismatch {
                value: format!("{} elements", elements.len()),
                ty:    ty.clone(),
            });
        }

        let size = usize::try_from(self.storage_size(ty)?).unwrap_or(usize::MAX);
        let mut bytes = vec![b.bv_u64(8, 0); size];
        for (element, (offset, member)) in elements.iter().zip(members) {
            let term = self.constant_term(element, ctx)?;
            let offset = usize::try_from(offset).unwrap_or(usize::MAX);
            for (k, byte) in to_bytes(b, term, &member, self.layout)?.into_iter().enumerate() {
                if let Some(slot) = bytes.get_mut(offset + k) {
                    *slot = byte;
                }
            }
        }

        Ok(b.concat_le(bytes))
    }

    /// Builds the term for a constant expression.
    fn constant_expr_term(&self, expr: &ConstantExpr, ctx: &Context) -> QueryResult<Expr> {
        match expr {
            ConstantExpr::Cast { op, value, ty } => {
                let term = self.constant_term(value, ctx)?;
                cast_term(self, *op, term, &value.ty(), ty)
            }
            ConstantExpr::Binary { op, lhs, rhs } => {
                let lhs = self.constant_term(lhs, ctx)?;
                let rhs = self.constant_term(rhs, ctx)?;
                binary_term(&self.builder, *op, lhs, rhs)
            }
            ConstantExpr::ICmp {
                predicate,
                lhs,
                rhs,
            } => {
                let lhs = self.constant_term(lhs, ctx)?;
                let rhs = self.constant_term(rhs, ctx)?;
                icmp_term(&self.builder, *predicate, lhs, rhs)
            }
            ConstantExpr::Gep {
                source,
                base,
                indices,
            } => {
                let base = self.constant_term(base, ctx)?;
                let indices: Vec<Value> = indices.iter().cloned().map(Value::from).collect();
                let offset = self.symbolic_indexed_offset(GepTypeIter::new(source, &indices), ctx)?;
                Ok(self.builder.bvadd(base, offset))
            }
        }
    }
}

/// Builds the integer zero of `width` bits.
fn known_zero(width: u32) -> QueryResult<KnownInt> {
    if width == 0 || width > MAX_CONSTANT_WIDTH_BITS {
        return Err(Error::ConstantTooWide { width });
    }
    Ok(KnownInt::zero(width))
}

/// Evaluates a binary operation on two concrete values of the same type.
fn evaluate_binary(op: BinaryOp, lhs: &GenericValue, rhs: &GenericValue) -> Option<GenericValue> {
    let result = match (lhs, rhs) {
        (GenericValue::Int(l), GenericValue::Int(r)) if l.width() == r.width() => {
            let (l, r) = (*l, *r);
            GenericValue::Int(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::UDiv => l.udiv(r),
                BinaryOp::SDiv => l.sdiv(r),
                BinaryOp::URem => l.urem(r),
                BinaryOp::SRem => l.srem(r),
                BinaryOp::Shl => l.shl(r),
                BinaryOp::LShr => l.lshr(r),
                BinaryOp::AShr => l.ashr(r),
                BinaryOp::And => l & r,
                BinaryOp::Or => l | r,
                BinaryOp::Xor => l ^ r,
                _ => return None,
            })
        }
        (GenericValue::Float(l), GenericValue::Float(r)) => GenericValue::Float(match op {
            BinaryOp::FAdd => l + r,
            BinaryOp::FSub => l - r,
            BinaryOp::FMul => l * r,
            BinaryOp::FDiv => l / r,
            BinaryOp::FRem => l % r,
            _ => return None,
        }),
        (GenericValue::Double(l), GenericValue::Double(r)) => GenericValue::Double(match op {
            BinaryOp::FAdd => l + r,
            BinaryOp::FSub => l - r,
            BinaryOp::FMul => l * r,
            BinaryOp::FDiv => l / r,
            BinaryOp::FRem => l % r,
            _ => return None,
        }),
        _ => return None,
    };

    Some(result)
}

/// Reinterprets the bits of `value` as a value of type `ty`.
fn bitcast(value: &GenericValue, ty: &Type) -> Option<GenericValue> {
    let result = match (value, ty) {
        (GenericValue::Int(known), Type::Float) if known.width() == 32 => {
            GenericValue::Float(f32::from_bits(u32::try_from(known.as_u64()).ok()?))
        }
        (GenericValue::Int(known), Type::Double) if known.width() == 64 => {
            GenericValue::Double(f64::from_bits(known.as_u64()))
        }
        (GenericValue::Float(float), Type::Int(32)) => {
            GenericValue::Int(KnownInt::new(32, float.to_bits()))
        }
        (GenericValue::Double(double), Type::Int(64)) => {
            GenericValue::Int(KnownInt::new(64, double.to_bits()))
        }
        (GenericValue::Int(known), Type::Int(width)) if known.width() == *width => value.clone(),
        (GenericValue::Pointer(_), Type::Pointer)
        | (GenericValue::Float(_), Type::Float)
        | (GenericValue::Double(_), Type::Double) => value.clone(),
        _ => return None,
    };

    Some(result)
}

/// Narrows `magnitude` to at most 128 significant bits and a power-of-two
/// scale, such that converting the narrowed value to a float and scaling it
/// rounds exactly as converting `magnitude` directly would.
///
/// Discarded bits are folded into the lowest bit of the result, which lies
/// below the rounding position of every float format.
fn narrow_magnitude(magnitude: U256) -> (u128, i32) {
    let bits = 256 - magnitude.leading_zeros();
    if bits <= 128 {
        return (magnitude.as_u128(), 0);
    }
    let shift = bits - 128;
    let sticky = magnitude & ((U256::ONE << shift) - U256::ONE) != U256::ZERO;
    let mantissa = (magnitude >> shift).as_u128() | u128::from(sticky);

    (mantissa, i32::try_from(shift).unwrap_or(i32::MAX))
}

/// Converts `float` to a `width`-bit integer, rounding towards zero.
///
/// Values outside the range of the target saturate to its nearest bound, and
/// NaN converts to zero.
fn saturating_float_to_int(float: f64, width: u32, signed: bool) -> KnownInt {
    if float.is_nan() {
        return KnownInt::zero(width);
    }
    let float = float.trunc();
    let exponent = i32::try_from(width).unwrap_or(i32::MAX);

    if signed {
        let min = KnownInt::new(width, U256::ONE << (width - 1));
        let bound = 2f64.powi(exponent - 1);
        if float >= bound {
            !min
        } else if float < -bound {
            min
        } else if float < 0.0 {
            -KnownInt::new(width, integral_magnitude(-float))
        } else {
            KnownInt::new(width, integral_magnitude(float))
        }
    } else if float <= 0.0 {
        KnownInt::zero(width)
    } else if float >= 2f64.powi(exponent) {
        KnownInt::ones(width)
    } else {
        KnownInt::new(width, integral_magnitude(float))
    }
}

/// Converts a non-negative integral `float` below 2^256 to an integer.
fn integral_magnitude(float: f64) -> U256 {
    if float < 2f64.powi(128) {
        return U256::from(float as u128);
    }
    let bits = float.to_bits();
    let mantissa = (bits & ((1 << 52) - 1)) | (1 << 52);
    let shift = ((bits >> 52) & 0x7ff).saturating_sub(1075);

    U256::from(mantissa) << u32::try_from(shift).unwrap_or_default()
}
