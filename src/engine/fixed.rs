//! The fixed-point multiplication engine.
//!
//! Two finite doubles with minimal significands multiply exactly in 64-bit
//! integer arithmetic whenever their combined width fits; the product is
//! handed to the context in `m * 2^exp` form and rounded through the
//! kernel's integer entry, skipping the FPU entirely.

use super::{MulEngine, RoundInto};
use crate::bits::to_fixed;
use crate::context::Context;
use crate::engine::FpExact;

/// Marker for the fixed-point engine. Supports mul only.
#[derive(Debug, Clone, Copy)]
pub struct Fixed;

/// Intermediate of a fixed-point multiplication.
///
/// Finite operands produce an exact scaled-integer product; non-finite
/// operands fall back to the native (exact) multiplication, which handles
/// the special-value algebra.
#[derive(Debug, Clone, Copy)]
pub enum FixedMul {
    Product { m: i64, exp: i32 },
    Native(f64),
}

impl RoundInto for FixedMul {
    #[inline]
    fn round_into<C: Context + ?Sized>(self, ctx: &C) -> f64 {
        match self {
            FixedMul::Product { m, exp } => ctx.round_fixed(m, exp),
            FixedMul::Native(r) => ctx.round(r),
        }
    }
}

impl MulEngine for Fixed {
    type Output = FixedMul;

    fn mul(x: f64, y: f64, p: u32) -> FixedMul {
        debug_assert!(p <= 63, "mul: requested precision exceeds the fixed-point capability");
        // non-finite values have no fixed-point form, and a zero product
        // would lose its sign in one
        if !x.is_finite() || !y.is_finite() || x == 0.0 || y == 0.0 {
            return FixedMul::Native(<FpExact as MulEngine>::mul(x, y, p.min(crate::bits::P)));
        }

        let (mx, ex) = to_fixed(x);
        let (my, ey) = to_fixed(y);
        // the product may wrap; the precision contract makes that a caller
        // error, not a checked condition
        FixedMul::Product { m: mx.wrapping_mul(my), exp: ex + ey }
    }
}
