//! IEEE 754-style status flags.
//!
//! Rounding and arithmetic operations report exceptional conditions by
//! OR-ing bits into a per-thread accumulator; they never read it. Callers
//! that care about a particular operation's flags reset the accumulator
//! first and inspect it afterwards.

use std::cell::Cell;

bitflags::bitflags! {
    /// Status flags raised by rounding and arithmetic operations.
    ///
    /// `OVERFLOW`, `UNDERFLOW_BEFORE` and `UNDERFLOW_AFTER` are only ever
    /// raised together with `INEXACT`. The two `TINY_*` flags track
    /// magnitude below the smallest normalized value, measured on the
    /// pre-rounding and (unbounded-range) post-rounding value respectively.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// An operation had no usefully definable result.
        const INVALID = 1 << 0;
        /// Exact division of a finite non-zero value by zero.
        const DIV_BY_ZERO = 1 << 1;
        /// The magnitude bound of the context was exceeded.
        const OVERFLOW = 1 << 2;
        /// The value was below `2^emin` before rounding.
        const TINY_BEFORE = 1 << 3;
        /// The value would be below `2^emin` after rounding with an
        /// unbounded exponent range.
        const TINY_AFTER = 1 << 4;
        /// Tiny before rounding and inexact.
        const UNDERFLOW_BEFORE = 1 << 5;
        /// Tiny after rounding and inexact.
        const UNDERFLOW_AFTER = 1 << 6;
        /// The rounded result differs from the unbounded result.
        const INEXACT = 1 << 7;
        /// Rounding carried into the next binade (for a value that was not
        /// tiny before rounding).
        const CARRY = 1 << 8;
    }
}

/// Mask selecting every flag; the default kernel specialization.
pub const ALL: u32 = Status::all().bits();
/// Empty mask; compiles all flag tracking out of the kernel.
pub const NONE: u32 = 0;

thread_local! {
    static STATUS: Cell<u32> = const { Cell::new(0) };
}

/// Raises `status` in the current thread's accumulator.
#[inline]
pub fn raise(status: Status) {
    raise_bits(status.bits());
}

#[inline]
pub(crate) fn raise_bits(bits: u32) {
    STATUS.with(|s| s.set(s.get() | bits));
}

/// Reads the current thread's accumulated flags.
#[inline]
pub fn read() -> Status {
    Status::from_bits_truncate(STATUS.with(Cell::get))
}

/// Clears every flag in the current thread's accumulator.
#[inline]
pub fn reset() {
    STATUS.with(|s| s.set(0));
}

macro_rules! accessors {
    ($($(#[$attr:meta])* $name:ident => $flag:ident;)*) => {
        $(
            $(#[$attr])*
            #[inline]
            pub fn $name() -> bool {
                read().contains(Status::$flag)
            }
        )*
    };
}

accessors! {
    /// Whether [`Status::INVALID`] is raised.
    invalid => INVALID;
    /// Whether [`Status::DIV_BY_ZERO`] is raised.
    div_by_zero => DIV_BY_ZERO;
    /// Whether [`Status::OVERFLOW`] is raised.
    overflow => OVERFLOW;
    /// Whether [`Status::TINY_BEFORE`] is raised.
    tiny_before_rounding => TINY_BEFORE;
    /// Whether [`Status::TINY_AFTER`] is raised.
    tiny_after_rounding => TINY_AFTER;
    /// Whether [`Status::UNDERFLOW_BEFORE`] is raised.
    underflow_before_rounding => UNDERFLOW_BEFORE;
    /// Whether [`Status::UNDERFLOW_AFTER`] is raised.
    underflow_after_rounding => UNDERFLOW_AFTER;
    /// Whether [`Status::INEXACT`] is raised.
    inexact => INEXACT;
    /// Whether [`Status::CARRY`] is raised.
    carry => CARRY;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_accumulates() {
        reset();
        assert_eq!(read(), Status::empty());

        raise(Status::INEXACT);
        raise(Status::OVERFLOW | Status::INEXACT);
        assert_eq!(read(), Status::OVERFLOW | Status::INEXACT);
        assert!(inexact());
        assert!(overflow());
        assert!(!invalid());

        reset();
        assert_eq!(read(), Status::empty());
    }

    #[test]
    fn accessors_cover_every_flag() {
        reset();
        raise(Status::all());
        assert!(invalid());
        assert!(div_by_zero());
        assert!(overflow());
        assert!(tiny_before_rounding());
        assert!(tiny_after_rounding());
        assert!(underflow_before_rounding());
        assert!(underflow_after_rounding());
        assert!(inexact());
        assert!(carry());
        reset();
    }
}
