//! Round-to-odd arithmetic on the host FPU.
//!
//! Commodity hardware has no round-to-odd mode, so it is synthesized: run
//! the primitive in round-toward-zero with cleared exception flags, and if
//! the inexact flag comes back set, jam the low bit of the result encoding
//! to 1. The FP control state is held by a scoped guard for the duration of
//! the primitive.
//!
//! On targets without MXCSR/FPCR access this engine computes through the
//! error-free-transform engine, which produces the same intermediates.

use super::{AddEngine, DivEngine, FmaEngine, MulEngine, SqrtEngine, SubEngine};
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
use super::Eft;
use crate::bits;

/// Marker for the host-FPU round-to-odd engine. Supports every primitive.
#[derive(Debug, Clone, Copy)]
pub struct FpRto;

/// Runs one primitive under the round-to-odd environment discipline.
///
/// The `black_box` walls keep the primitive from being hoisted out of the
/// guarded region; without them the compiler is free to schedule a pure FP
/// operation across the control-register writes.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
fn odd_rounded(op: impl FnOnce() -> f64) -> f64 {
    let scope = super::env::RtoScope::enter();
    let r = core::hint::black_box(op());
    let inexact = scope.inexact();
    debug_assert!(!scope.range_error(), "round-to-odd: intermediate left the double range");
    drop(scope);

    if inexact { f64::from_bits(r.to_bits() | 1) } else { r }
}

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
macro_rules! rto_op {
    ($body:expr) => {
        odd_rounded(|| $body)
    };
}

impl AddEngine for FpRto {
    type Output = f64;

    fn add(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "add: requested precision exceeds the host double");
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        return rto_op!(core::hint::black_box(x) + core::hint::black_box(y));
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        return <Eft as AddEngine>::add(x, y, p);
    }
}

impl SubEngine for FpRto {
    type Output = f64;

    fn sub(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "sub: requested precision exceeds the host double");
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        return rto_op!(core::hint::black_box(x) - core::hint::black_box(y));
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        return <Eft as SubEngine>::sub(x, y, p);
    }
}

impl MulEngine for FpRto {
    type Output = f64;

    fn mul(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "mul: requested precision exceeds the host double");
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        return rto_op!(core::hint::black_box(x) * core::hint::black_box(y));
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        return <Eft as MulEngine>::mul(x, y, p);
    }
}

impl DivEngine for FpRto {
    type Output = f64;

    fn div(x: f64, y: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "div: requested precision exceeds the host double");
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        return rto_op!(core::hint::black_box(x) / core::hint::black_box(y));
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        return <Eft as DivEngine>::div(x, y, p);
    }
}

impl SqrtEngine for FpRto {
    type Output = f64;

    fn sqrt(x: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "sqrt: requested precision exceeds the host double");
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        return rto_op!(core::hint::black_box(x).sqrt());
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        return <Eft as SqrtEngine>::sqrt(x, p);
    }
}

impl FmaEngine for FpRto {
    type Output = f64;

    fn fma(x: f64, y: f64, z: f64, p: u32) -> f64 {
        debug_assert!(p <= bits::P, "fma: requested precision exceeds the host double");
        // The environment trick needs a fused *instruction*: a software fma
        // runs its internal arithmetic in whatever mode the scope installed
        // and would miscompute under toward-zero. aarch64 always fuses;
        // x86_64 only with the fma feature. Everything else goes through
        // the error-free transforms.
        #[cfg(any(
            all(target_arch = "x86_64", target_feature = "fma"),
            target_arch = "aarch64"
        ))]
        return rto_op!(
            core::hint::black_box(x).mul_add(core::hint::black_box(y), core::hint::black_box(z))
        );
        #[cfg(not(any(
            all(target_arch = "x86_64", target_feature = "fma"),
            target_arch = "aarch64"
        )))]
        return super::Eft::fma(x, y, z, p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_results_are_untouched() {
        assert_eq!(<FpRto as AddEngine>::add(1.0, 0.5, 53), 1.5);
        assert_eq!(<FpRto as MulEngine>::mul(3.0, 4.0, 53), 12.0);
        assert_eq!(<FpRto as DivEngine>::div(1.0, 4.0, 53), 0.25);
        assert_eq!(<FpRto as SqrtEngine>::sqrt(2.25, 53), 1.5);
        assert_eq!(<FpRto as SubEngine>::sub(1.5, 0.25, 53), 1.25);
        assert_eq!(<FpRto as FmaEngine>::fma(2.0, 3.0, 4.0, 53), 10.0);
    }

    #[test]
    fn inexact_results_are_odd() {
        // 1 + 2^-60 truncates to 1.0 and must come back jammed
        let r = <FpRto as AddEngine>::add(1.0, 2f64.powi(-60), 53);
        assert_eq!(r, f64::from_bits(1.0f64.to_bits() | 1));
        // 1/3 and sqrt(2) are inexact
        assert_eq!(<FpRto as DivEngine>::div(1.0, 3.0, 53).to_bits() & 1, 1);
        assert_eq!(<FpRto as SqrtEngine>::sqrt(2.0, 53).to_bits() & 1, 1);
    }

    #[test]
    fn truncation_goes_toward_zero() {
        // 1 - 2^-60: round-to-nearest gives 1.0, round-to-zero must not
        let r = <FpRto as SubEngine>::sub(1.0, 2f64.powi(-60), 53);
        assert_eq!(r, f64::from_bits(1.0f64.to_bits() - 1));
        let r = <FpRto as AddEngine>::add(-1.0, 2f64.powi(-60), 53);
        assert_eq!(r, f64::from_bits((-1.0f64).to_bits() - 1));
    }

    #[test]
    fn environment_is_restored() {
        // a rounding pass must leave ordinary arithmetic in nearest mode:
        // 1 + 3*2^-54 is above halfway and rounds up under nearest, but
        // truncates to 1.0 if toward-zero were to leak out of the scope
        let _ = <FpRto as DivEngine>::div(1.0, 3.0, 53);
        let x = core::hint::black_box(1.0) + core::hint::black_box(3.0 * 2f64.powi(-54));
        assert_eq!(x, 1.0 + 2f64.powi(-52));
    }

    #[test]
    fn specials_pass_through() {
        assert!(<FpRto as AddEngine>::add(f64::INFINITY, f64::NEG_INFINITY, 53).is_nan());
        assert_eq!(<FpRto as MulEngine>::mul(f64::INFINITY, 2.0, 53), f64::INFINITY);
        assert!(<FpRto as SqrtEngine>::sqrt(-4.0, 53).is_nan());
    }
}
