//! Engine equivalence: every engine supporting an operation must produce
//! the same rounded result (and the same flags) for inputs in its range.

use fpemu::bits::make_float;
use fpemu::context::MpsContext;
use fpemu::engine::{Eft, Fixed, FpExact, FpRto};
use fpemu::flags::{self, Status};
use fpemu::round::RoundingMode;
use fpemu::{add, div, fma, mul, sqrt, sub};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

const MODES: [RoundingMode; 8] = [
    RoundingMode::NearestEven,
    RoundingMode::NearestAway,
    RoundingMode::ToPositive,
    RoundingMode::ToNegative,
    RoundingMode::ToZero,
    RoundingMode::AwayZero,
    RoundingMode::ToOdd,
    RoundingMode::ToEven,
];

const ROUNDS: usize = 20_000;

fn sample_mode(rng: &mut impl Rng) -> RoundingMode {
    MODES[rng.random_range(0..MODES.len())]
}

fn sample_value(rng: &mut impl Rng, max_p: u32) -> f64 {
    let s = rng.random::<bool>();
    let c = rng.random_range(0..1u64 << max_p);
    let exp = rng.random_range(-20..=20);
    make_float(s, exp, c)
}

fn sample_ctx(rng: &mut impl Rng) -> MpsContext {
    MpsContext::new(rng.random_range(2..=12), rng.random_range(-24..=4), sample_mode(rng))
}

/// Runs `op` with clean flags, returning the result and the flags raised.
fn observed(op: impl FnOnce() -> f64) -> (u64, Status) {
    flags::reset();
    let r = op();
    let status = flags::read();
    flags::reset();
    (r.to_bits(), status)
}

#[test]
fn additive_engines_agree() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xadd);
    for _ in 0..ROUNDS {
        let ctx = sample_ctx(&mut rng);
        let x = sample_value(&mut rng, 16);
        let y = sample_value(&mut rng, 16);

        let rto = observed(|| add::<FpRto, _>(x, y, &ctx));
        let eft = observed(|| add::<Eft, _>(x, y, &ctx));
        assert_eq!(rto, eft, "add: x={x:e} y={y:e}");

        let rto = observed(|| sub::<FpRto, _>(x, y, &ctx));
        let eft = observed(|| sub::<Eft, _>(x, y, &ctx));
        assert_eq!(rto, eft, "sub: x={x:e} y={y:e}");
    }
}

#[test]
fn multiplicative_engines_agree() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x3a1);
    for _ in 0..ROUNDS {
        let ctx = sample_ctx(&mut rng);
        // 16-bit significands keep the integer product within 63 bits, the
        // fixed engine's range
        let x = sample_value(&mut rng, 16);
        let y = sample_value(&mut rng, 16);

        let rto = observed(|| mul::<FpRto, _>(x, y, &ctx));
        let eft = observed(|| mul::<Eft, _>(x, y, &ctx));
        let fixed = observed(|| mul::<Fixed, _>(x, y, &ctx));
        assert_eq!(rto, eft, "mul: x={x:e} y={y:e}");
        assert_eq!(rto, fixed, "mul: x={x:e} y={y:e}");
    }
}

#[test]
fn exact_engine_agrees_where_it_applies() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xe8ac7);
    for _ in 0..ROUNDS {
        let ctx = sample_ctx(&mut rng);

        // like-scaled 20-bit addends: sums stay within 21 bits, exact
        let exp = rng.random_range(-20..=20);
        let x = make_float(rng.random::<bool>(), exp, rng.random_range(0..1u64 << 20));
        let y = make_float(rng.random::<bool>(), exp, rng.random_range(0..1u64 << 20));
        assert_eq!(
            observed(|| add::<FpExact, _>(x, y, &ctx)),
            observed(|| add::<FpRto, _>(x, y, &ctx)),
            "add: x={x:e} y={y:e}"
        );
        assert_eq!(
            observed(|| sub::<FpExact, _>(x, y, &ctx)),
            observed(|| sub::<FpRto, _>(x, y, &ctx)),
            "sub: x={x:e} y={y:e}"
        );

        // 26-bit factors: products stay within 52 bits, exact
        let x = sample_value(&mut rng, 26);
        let y = sample_value(&mut rng, 26);
        assert_eq!(
            observed(|| mul::<FpExact, _>(x, y, &ctx)),
            observed(|| mul::<FpRto, _>(x, y, &ctx)),
            "mul: x={x:e} y={y:e}"
        );
    }
}

#[test]
fn division_engines_agree() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xd1f);
    for _ in 0..ROUNDS {
        let ctx = sample_ctx(&mut rng);
        let x = sample_value(&mut rng, 16);
        let y = {
            let y = sample_value(&mut rng, 16);
            if y == 0.0 { 1.0 } else { y }
        };

        let rto = observed(|| div::<FpRto, _>(x, y, &ctx));
        let eft = observed(|| div::<Eft, _>(x, y, &ctx));
        assert_eq!(rto, eft, "div: x={x:e} y={y:e}");
    }
}

#[test]
fn sqrt_engines_agree() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5a47);
    for _ in 0..ROUNDS {
        let ctx = sample_ctx(&mut rng);
        let x = sample_value(&mut rng, 16).abs();

        let rto = observed(|| sqrt::<FpRto, _>(x, &ctx));
        let eft = observed(|| sqrt::<Eft, _>(x, &ctx));
        assert_eq!(rto, eft, "sqrt: x={x:e}");
    }
}

#[test]
fn fma_engines_agree() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0xf3a);
    for _ in 0..ROUNDS {
        let ctx = sample_ctx(&mut rng);
        let x = sample_value(&mut rng, 12);
        let y = sample_value(&mut rng, 12);
        let z = sample_value(&mut rng, 12);

        let rto = observed(|| fma::<FpRto, _>(x, y, z, &ctx));
        let eft = observed(|| fma::<Eft, _>(x, y, z, &ctx));
        assert_eq!(rto, eft, "fma: x={x:e} y={y:e} z={z:e}");
    }
}

#[test]
fn engines_agree_on_special_values() {
    let ctx = MpsContext::new(8, -16, RoundingMode::NearestEven);
    let specials = [0.0, -0.0, 1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN];
    for &x in &specials {
        for &y in &specials {
            let rto = observed(|| add::<FpRto, _>(x, y, &ctx));
            let eft = observed(|| add::<Eft, _>(x, y, &ctx));
            assert_eq!(rto.1, eft.1, "add flags: x={x:e} y={y:e}");
            // NaN payloads may differ between paths; compare NaN-ness
            assert_eq!(f64::from_bits(rto.0).is_nan(), f64::from_bits(eft.0).is_nan());
            if !f64::from_bits(rto.0).is_nan() {
                assert_eq!(rto.0, eft.0, "add: x={x:e} y={y:e}");
            }

            let rto = observed(|| mul::<FpRto, _>(x, y, &ctx));
            let fixed = observed(|| mul::<Fixed, _>(x, y, &ctx));
            assert_eq!(rto.1, fixed.1, "mul flags: x={x:e} y={y:e}");
            assert_eq!(f64::from_bits(rto.0).is_nan(), f64::from_bits(fixed.0).is_nan());
            if !f64::from_bits(rto.0).is_nan() {
                assert_eq!(rto.0, fixed.0, "mul: x={x:e} y={y:e}");
            }
        }
    }
}
