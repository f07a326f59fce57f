//! The rounding kernel.
//!
//! Both kernel entries normalize their input to a fixed-width integer
//! significand and hand it to a single finalizer, which performs
//! subnormalization, the increment decision, carry propagation and
//! re-encoding, raising status flags along the way.
//!
//! The finalizer is monomorphized over a flag mask so that callers which do
//! not need flag tracking get code with the bookkeeping compiled out; the
//! no-flags and all-flags specializations compute bit-identical values.

use crate::bits::{self, bit_width, unpack};
use crate::flags::{self, Status};

/// Rounding modes.
///
/// When a value is not representable in the target format, the mode selects
/// which neighboring representable value to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round to nearest, ties to even (RNE).
    NearestEven,
    /// Round to nearest, ties away from zero (RNA).
    NearestAway,
    /// Round toward positive infinity (RTP).
    ToPositive,
    /// Round toward negative infinity (RTN).
    ToNegative,
    /// Round toward zero (RTZ).
    ToZero,
    /// Round away from zero (RAZ).
    AwayZero,
    /// Round to odd (RTO): an inexact result gets its last digit forced
    /// to 1, which makes later re-rounding at lower precision safe.
    ToOdd,
    /// Round to even (RTE): an inexact result gets its last digit forced
    /// to 0.
    ToEven,
}

/// The direction a rounding mode moves an inexact value, resolved against
/// the value's sign. For nearest modes this is the tie-breaking direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    ToZero,
    AwayZero,
    ToEven,
    ToOdd,
}

impl RoundingMode {
    /// Whether this is one of the round-to-nearest modes.
    #[inline]
    pub fn is_nearest(self) -> bool {
        matches!(self, RoundingMode::NearestEven | RoundingMode::NearestAway)
    }

    /// The [`RoundingDirection`] for a value with sign `sign` (true for
    /// negative). Only the directed modes depend on the sign.
    pub fn direction(self, sign: bool) -> RoundingDirection {
        match self {
            RoundingMode::NearestEven => RoundingDirection::ToEven,
            RoundingMode::NearestAway => RoundingDirection::AwayZero,
            RoundingMode::ToPositive => {
                if sign { RoundingDirection::ToZero } else { RoundingDirection::AwayZero }
            }
            RoundingMode::ToNegative => {
                if sign { RoundingDirection::AwayZero } else { RoundingDirection::ToZero }
            }
            RoundingMode::ToZero => RoundingDirection::ToZero,
            RoundingMode::AwayZero => RoundingDirection::AwayZero,
            RoundingMode::ToOdd => RoundingDirection::ToOdd,
            RoundingMode::ToEven => RoundingDirection::ToEven,
        }
    }
}

/// Position of an inexact value relative to its two neighbors, summarized
/// from the first discarded digit (half bit) and the OR of the rest
/// (sticky bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingBits {
    Exact,
    BelowHalfway,
    Halfway,
    AboveHalfway,
}

impl RoundingBits {
    /// Classifies discarded digits by their half and sticky bits.
    pub fn classify(half_bit: bool, sticky_bit: bool) -> RoundingBits {
        match (half_bit, sticky_bit) {
            (false, false) => RoundingBits::Exact,
            (false, true) => RoundingBits::BelowHalfway,
            (true, false) => RoundingBits::Halfway,
            (true, true) => RoundingBits::AboveHalfway,
        }
    }
}

/// Rounds `x` to `p` significand digits, with digits at or below position
/// `n` unrepresentable when `n` is given, under rounding mode `rm`.
///
/// NaN and infinities are returned unchanged without raising flags. All
/// flags are tracked; see [`round_f64_with`] for the masked form.
#[inline]
pub fn round_f64(x: f64, p: u32, n: Option<i32>, rm: RoundingMode) -> f64 {
    round_f64_with::<{ flags::ALL }>(x, p, n, rm)
}

/// Rounds `m * 2^exp` to `p` significand digits, with digits at or below
/// position `n` unrepresentable when `n` is given, under rounding mode `rm`.
#[inline]
pub fn round_fixed(m: i64, exp: i32, p: u32, n: Option<i32>, rm: RoundingMode) -> f64 {
    round_fixed_with::<{ flags::ALL }>(m, exp, p, n, rm)
}

/// [`round_f64`] specialized over a flag mask: only the [`Status`] bits in
/// `MASK` are tracked, and `MASK = 0` compiles the tracking away entirely.
/// The returned value does not depend on the mask.
pub fn round_f64_with<const MASK: u32>(x: f64, p: u32, n: Option<i32>, rm: RoundingMode) -> f64 {
    if !x.is_finite() {
        return x;
    }

    // normalize the significand to exactly P bits
    let (s, exp, c) = unpack(x);
    let (e, sig) = if c == 0 {
        (0, 0)
    } else {
        let lz = bits::P - bit_width(c);
        (exp - lz as i32 + (bits::P as i32 - 1), c << lz)
    };

    finalize::<MASK, { bits::P }>(s, e, sig, p, n, rm)
}

/// [`round_fixed`] specialized over a flag mask; see [`round_f64_with`].
pub fn round_fixed_with<const MASK: u32>(
    m: i64,
    mut exp: i32,
    p: u32,
    n: Option<i32>,
    rm: RoundingMode,
) -> f64 {
    const W: u32 = 63;

    // decode into sign-magnitude; |i64::MIN| does not fit the 63-bit
    // magnitude field, so it sheds one trailing zero into the exponent
    let (s, c) = if m == i64::MIN {
        exp += 1;
        (true, 1u64 << (W - 1))
    } else if m < 0 {
        (true, m.unsigned_abs())
    } else {
        (false, m as u64)
    };

    // normalize the significand to exactly 63 bits
    let (e, sig) = if c == 0 {
        (0, 0)
    } else {
        let lz = W - bit_width(c);
        (exp - lz as i32 + (W as i32 - 1), c << lz)
    };

    finalize::<MASK, W>(s, e, sig, p, n, rm)
}

#[inline(always)]
fn set<const MASK: u32>(status: Status) {
    let bits = MASK & status.bits();
    if bits != 0 {
        flags::raise_bits(bits);
    }
}

/// Whether rounding should add one unit in the last kept place.
///
/// `overshift` forces the below-halfway branch of the nearest modes: when
/// every significant digit sits below the last representable position, the
/// discarded field no longer encodes the distance to halfway.
#[inline]
fn wants_increment(
    rm: RoundingMode,
    s: bool,
    overshift: bool,
    sig_lost: u64,
    halfway: u64,
    kept_odd: bool,
) -> bool {
    match rm {
        RoundingMode::NearestEven => {
            !overshift && (sig_lost > halfway || (sig_lost == halfway && kept_odd))
        }
        RoundingMode::NearestAway => !overshift && sig_lost >= halfway,
        RoundingMode::ToPositive => !s,
        RoundingMode::ToNegative => s,
        RoundingMode::ToZero => false,
        RoundingMode::AwayZero => true,
        RoundingMode::ToOdd => !kept_odd,
        RoundingMode::ToEven => kept_odd,
    }
}

/// Re-normalizes a rounded `W`-wide significand to [`bits::P`] bits and
/// assembles the result. The low `W - P` bits are zero by construction
/// after rounding, so narrowing drops nothing.
#[inline]
fn encode<const W: u32>(s: bool, e: i32, sig: u64) -> f64 {
    let sig = if W > bits::P {
        debug_assert!(sig & bits::bitmask(W - bits::P) == 0);
        sig >> (W - bits::P)
    } else {
        sig << bits::P.saturating_sub(W)
    };
    bits::pack(s, e, sig)
}

/// The shared finalizer.
///
/// The input value is `(-1)^s * sig * 2^(e - (W - 1))`: `e` is the exponent
/// of the leading significand bit and `sig` is either zero or exactly `W`
/// bits wide. `p` is the target precision and `n`, when given, the highest
/// unrepresentable digit position.
fn finalize<const MASK: u32, const W: u32>(
    s: bool,
    mut e: i32,
    sig: u64,
    p: u32,
    n: Option<i32>,
    rm: RoundingMode,
) -> f64 {
    debug_assert!(p >= 1 && p <= bits::P, "finalize: unsupported precision");
    debug_assert!(sig == 0 || bit_width(sig) == W, "finalize: unnormalized significand");

    // A rounded zero is tiny on both sides of the rounding.
    if sig == 0 {
        set::<MASK>(Status::TINY_BEFORE | Status::TINY_AFTER);
        return bits::pack(s, 0, 0);
    }

    // Subnormalization: below 2^emin the kept precision shrinks with the
    // exponent. Tininess after rounding is predicted here, before the
    // significand is touched, and from the unpinned exponent.
    let mut p_kept = p;
    let mut overshift = false;
    let mut tiny_before = false;
    let mut tiny_after = false;
    let mut hard_tiny_check = false;
    if let Some(n) = n {
        let emin = n + p as i32;
        if e < emin {
            tiny_before = true;
            if e < emin - 1 {
                tiny_after = true;
            } else {
                // One binade below 2^emin: the value stays tiny unless it
                // rounds up into the next binade. `cutoff` is the largest
                // p-digit significand pattern, i.e. the last representable
                // value below 2^emin.
                let cutoff = bits::bitmask(p) << (W - p);
                if sig <= cutoff {
                    tiny_after = true;
                } else {
                    hard_tiny_check = true;
                }
            }

            let shift = emin - e;
            if shift > p as i32 {
                // every significant digit is below the last representable
                // position; pin the exponent there so an increment lands on
                // the smallest representable magnitude
                overshift = true;
                p_kept = 0;
                e = n;
            } else {
                p_kept = p - shift as u32;
            }
        }
    }

    // Split the significand at the rounding position.
    let p_lost = W - p_kept;
    let lost_mask = bits::bitmask(p_lost);
    let sig_lost = sig & lost_mask;
    let mut sig_kept = sig & !lost_mask;

    if sig_lost == 0 {
        // representable: tininess is the only reportable condition, and the
        // value does not move, so both sides agree
        if tiny_before {
            set::<MASK>(Status::TINY_BEFORE | Status::TINY_AFTER);
        }
        return encode::<W>(s, e, sig_kept);
    }

    // Hard tininess case: just below 2^emin yet above the last representable
    // value there. The rounded value stays tiny exactly when rounding with
    // one more kept digit (the split one bit lower, at precision p) would
    // not increment.
    if MASK & (Status::TINY_AFTER.bits() | Status::UNDERFLOW_AFTER.bits()) != 0 && hard_tiny_check
    {
        let lost = W - p;
        let kept_odd = (sig >> lost) & 1 != 0;
        let up = wants_increment(rm, s, false, sig & bits::bitmask(lost), 1 << (lost - 1), kept_odd);
        if !up {
            tiny_after = true;
        }
    }

    set::<MASK>(Status::INEXACT);
    if tiny_before {
        set::<MASK>(Status::TINY_BEFORE | Status::UNDERFLOW_BEFORE);
    }
    if tiny_after {
        set::<MASK>(Status::TINY_AFTER | Status::UNDERFLOW_AFTER);
    }

    // Decide whether to add one unit in the last kept place.
    let ulp = 1u64 << p_lost;
    let halfway = 1u64 << (p_lost - 1);
    if wants_increment(rm, s, overshift, sig_lost, halfway, sig_kept & ulp != 0) {
        sig_kept += ulp;
        if sig_kept == 1u64 << W {
            // carried into the next binade; promotion out of the subnormal
            // range does not count as a carry
            sig_kept >>= 1;
            e += 1;
            if !tiny_before {
                set::<MASK>(Status::CARRY);
            }
        }
    }

    encode::<W>(s, e, sig_kept)
}
