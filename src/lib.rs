//! Correctly rounded arithmetic in narrow floating-point formats, emulated
//! on host doubles.
//!
//! Every IEEE 754-style binary format whose precision fits strictly inside
//! the host `f64` (at most 53 significand bits, at most 11 exponent bits)
//! can be emulated exactly: given operands as doubles, each primitive —
//! negate, absolute value, add, sub, mul, div, sqrt, fused multiply-add,
//! and stand-alone rounding — produces the double that the target format
//! would produce, and raises the IEEE 754 status flags the target format
//! would raise.
//!
//! The design splits into four layers:
//!
//! - [`bits`]: packing and unpacking of the host encoding;
//! - [`round`]: the rounding kernel — eight rounding modes,
//!   subnormalization with exact tininess detection, and flag reporting,
//!   over a `(sign, exponent, significand)` triple;
//! - [`engine`]: interchangeable ways of computing a primitive as a
//!   *round-to-odd* intermediate with two digits of headroom, which makes
//!   the subsequent re-rounding immune to double rounding;
//! - [`context`] and [`ops`]: target-format descriptions and the public
//!   arithmetic entry points.
//!
//! ```
//! use fpemu::{FpRto, Ieee754Context, RoundingMode};
//!
//! // IEEE 754 binary16 under round-to-nearest-even
//! let ctx = Ieee754Context::new(5, 16, RoundingMode::NearestEven);
//! assert_eq!(fpemu::add::<FpRto, _>(1.0, 2f64.powi(-11), &ctx), 1.0);
//! assert_eq!(fpemu::round(65519.0, &ctx), 65504.0);
//! assert_eq!(fpemu::round(65520.0, &ctx), f64::INFINITY);
//! ```
//!
//! Status flags accumulate in a thread-local word; see [`flags`]. Callers
//! that inspect flags reset them before the operation of interest:
//!
//! ```
//! use fpemu::{MpsContext, RoundingMode, flags};
//!
//! let ctx = MpsContext::new(8, -14, RoundingMode::NearestEven);
//! flags::reset();
//! let _ = fpemu::round(3.0e-5, &ctx);
//! assert!(flags::inexact() && flags::underflow_after_rounding());
//! ```

pub mod bits;
pub mod context;
pub mod engine;
pub mod flags;
pub mod ops;
pub mod real;
pub mod round;

pub use context::{Context, Ieee754Context, MpContext, MpbContext, MpsContext};
pub use engine::{
    AddEngine, DivEngine, Eft, Fixed, FixedMul, FmaEngine, FpExact, FpRto, MulEngine, RoundInto,
    SqrtEngine, SubEngine,
};
pub use flags::Status;
pub use ops::{abs, add, div, fma, mul, neg, round, sqrt, sub};
pub use real::RealFloat;
pub use round::{RoundingBits, RoundingDirection, RoundingMode, round_f64, round_fixed};
