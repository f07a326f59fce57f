//! Round-to-odd arithmetic through error-free transformations.
//!
//! Each primitive is computed as an exact pair `(hi, lo)` with `hi` the
//! round-to-nearest result and `hi + lo` the mathematical result. The pair
//! determines the round-to-zero result exactly, and from there the
//! round-to-odd result is one sticky bit away. No FP environment access is
//! needed, which can beat the status-flag engine on hosts where reading
//! MXCSR/FPSR stalls the pipeline.

use super::{AddEngine, DivEngine, FmaEngine, MulEngine, SqrtEngine, SubEngine};
use crate::bits;

/// Marker for the error-free-transform engine. Supports every primitive.
#[derive(Debug, Clone, Copy)]
pub struct Eft;

/// Exact sum: `s` is the rounded sum, `s + t` the true sum.
#[inline]
fn two_sum(x: f64, y: f64) -> (f64, f64) {
    // the classical branch-based variant; operands ordered by magnitude
    let (a, b) = if x.abs() < y.abs() { (y, x) } else { (x, y) };
    let s = a + b;
    let t = b - (s - a);
    (s, t)
}

/// Exact product: `p` is the rounded product, `p + e` the true product.
#[inline]
fn two_prod(x: f64, y: f64) -> (f64, f64) {
    let p = x * y;
    let e = x.mul_add(y, -p);
    (p, e)
}

/// Division with error: `q` is the rounded quotient and `r` the rounded
/// remainder term `(x - q*y) / y`; `q + r` determines the rounding of the
/// true quotient.
#[inline]
fn two_div(x: f64, y: f64) -> (f64, f64) {
    let q = x / y;
    let r = -q.mul_add(y, -x) / y;
    (q, r)
}

/// Square root with error: `r1` is the rounded root and `r2` the rounded
/// correction `(x - r1^2) / (2 r1)`.
#[inline]
fn two_sqrt(x: f64) -> (f64, f64) {
    let r1 = x.sqrt();
    let r2 = (-r1).mul_add(r1, x) / (2.0 * r1);
    (r1, r2)
}

/// Fused multiply-add with error, after Boldo and Muller: `r1` is the
/// rounded result, `r2` the (rounded pair of the) residue.
#[inline]
fn fma_err(x: f64, y: f64, z: f64) -> (f64, f64) {
    let r1 = x.mul_add(y, z);
    let (u1, u2) = two_prod(x, y);
    let (a1, a2) = two_sum(z, u2);
    let (b1, b2) = two_sum(u1, a1);
    let g = (b1 - r1) + b2;
    let r2 = g + a2;
    (r1, r2)
}

/// Turns an error-free pair into the round-to-odd result.
///
/// `hi` is round-to-nearest. A zero `lo` means the result is exact and must
/// not be perturbed — that check has to come before the sign comparison,
/// since the sign of a zero `lo` says nothing. Otherwise: when the error has
/// the same sign as `hi`, the nearest result undershot and already equals
/// the round-to-zero result; when the signs differ it overshot by one unit,
/// so step one representable value toward zero. Jamming the low bit then
/// yields round-to-odd.
#[inline]
fn finalize_odd(hi: f64, lo: f64) -> f64 {
    debug_assert!(hi.is_finite(), "finalize_odd: high part is not finite");
    debug_assert!(lo.is_finite(), "finalize_odd: low part is not finite");

    if lo == 0.0 {
        return hi;
    }

    let bh = hi.to_bits();
    let bl = lo.to_bits();
    let rtz = if (bh ^ bl) & bits::SIGN_MASK != 0 { bh - 1 } else { bh };
    f64::from_bits(rtz | 1)
}

impl AddEngine for Eft {
    type Output = f64;

    fn add(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "add: requested precision exceeds the host double");
        if !x.is_finite() || !y.is_finite() {
            return x + y;
        }
        let (s, t) = two_sum(x, y);
        finalize_odd(s, t)
    }
}

impl SubEngine for Eft {
    type Output = f64;

    fn sub(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "sub: requested precision exceeds the host double");
        if !x.is_finite() || !y.is_finite() {
            return x - y;
        }
        let (s, t) = two_sum(x, -y);
        finalize_odd(s, t)
    }
}

impl MulEngine for Eft {
    type Output = f64;

    fn mul(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "mul: requested precision exceeds the host double");
        if !x.is_finite() || !y.is_finite() {
            return x * y;
        }
        let (prod, err) = two_prod(x, y);
        finalize_odd(prod, err)
    }
}

impl DivEngine for Eft {
    type Output = f64;

    fn div(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "div: requested precision exceeds the host double");
        if !x.is_finite() || !y.is_finite() || y == 0.0 {
            return x / y;
        }
        let (q, r) = two_div(x, y);
        finalize_odd(q, r)
    }
}

impl SqrtEngine for Eft {
    type Output = f64;

    fn sqrt(x: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "sqrt: requested precision exceeds the host double");
        if !x.is_finite() || x <= 0.0 {
            return x.sqrt();
        }
        let (r1, r2) = two_sqrt(x);
        finalize_odd(r1, r2)
    }
}

impl FmaEngine for Eft {
    type Output = f64;

    fn fma(x: f64, y: f64, z: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "fma: requested precision exceeds the host double");
        if !x.is_finite() || !y.is_finite() || !z.is_finite() {
            return x.mul_add(y, z);
        }
        let (r1, r2) = fma_err(x, y, z);
        finalize_odd(r1, r2)
    }
}
