//! Reference distributions for standardized cumulative statistics.
//!
//! Under the null hypothesis that two subpopulations share a calibration
//! curve, the cumulative deviation path divided by its length scale behaves
//! like standard Brownian motion `W` on `[0, 1]`. The two statistics then
//! follow:
//!
//! | Distribution | Functional | Small-x series | Tail series |
//! |---|---|---|---|
//! | [`Kuiper`] | max W − min W (with W₀ = 0) | theta series in exp(−π²(2j+1)²/2x²) | 8 Σ (−1)ᵏ⁻¹ k Q(kx) |
//! | [`KolmogorovSmirnov`] | max \|W\| | theta series in exp(−π²(2k+1)²/8x²) | 2 Σ (−1)ᵏ erfc((2k+1)x/√2) |
//!
//! Both series are exact; each converges in a handful of terms on its side
//! of [`CROSSOVER`]. The CDF is evaluated directly below the crossover and
//! the survival function directly above it, so p-values keep relative
//! precision far into the tail.

use std::f64::consts::{PI, SQRT_2};

use crate::special;

/// Switch point between the small-x and tail expansions.
pub const CROSSOVER: f64 = 2.0;

const MAX_TERMS: usize = 100;

// ============================================================================
// Kuiper
// ============================================================================

/// Distribution of the range of standard Brownian motion on `[0, 1]`.
///
/// This is the null distribution of the standardized Kuiper statistic.
///
/// # Examples
/// ```
/// use u_subpop::distributions::Kuiper;
/// let p = Kuiper.sf(1.5);
/// assert!((p - 0.512_940_754_2).abs() < 1e-7);
/// assert_eq!(Kuiper.sf(f64::INFINITY), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Kuiper;

impl Kuiper {
    /// P(range ≤ x).
    pub fn cdf(&self, x: f64) -> f64 {
        match classify(x) {
            Domain::Nan => f64::NAN,
            Domain::NonPositive => 0.0,
            Domain::Infinite => 1.0,
            Domain::Small => kuiper_small(x),
            Domain::Tail => 1.0 - kuiper_tail(x),
        }
    }

    /// P(range > x).
    pub fn sf(&self, x: f64) -> f64 {
        match classify(x) {
            Domain::Nan => f64::NAN,
            Domain::NonPositive => 1.0,
            Domain::Infinite => 0.0,
            Domain::Small => 1.0 - kuiper_small(x),
            Domain::Tail => kuiper_tail(x),
        }
    }

    /// Inverse CDF by bisection.
    ///
    /// Returns `None` if `p` is outside `[0, 1]`.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        invert(p, |x| self.cdf(x), |x| self.sf(x))
    }
}

// F(x) = Σ_{j≥0} (8/x² + 8/(π²(2j+1)²)) · exp(−π²(2j+1)²/(2x²))
fn kuiper_small(x: f64) -> f64 {
    let x2 = x * x;
    let mut total = 0.0;
    for j in 0..MAX_TERMS {
        let odd = (2 * j + 1) as f64;
        let decay = (-PI * PI * odd * odd / (2.0 * x2)).exp();
        if decay == 0.0 {
            break;
        }
        let term = (8.0 / x2 + 8.0 / (PI * PI * odd * odd)) * decay;
        total += term;
        if term < f64::EPSILON * total {
            break;
        }
    }
    total.min(1.0)
}

// 1 − F(x) = 8 Σ_{k≥1} (−1)^{k−1} k Q(kx)
fn kuiper_tail(x: f64) -> f64 {
    let mut total = 0.0;
    for k in 1..=MAX_TERMS {
        let kf = k as f64;
        let term = 8.0 * kf * special::standard_normal_sf(kf * x);
        if term == 0.0 {
            break;
        }
        total += if k % 2 == 1 { term } else { -term };
        if term < f64::EPSILON * total.abs() {
            break;
        }
    }
    total.clamp(0.0, 1.0)
}

// ============================================================================
// Kolmogorov-Smirnov
// ============================================================================

/// Distribution of `max |W|` for standard Brownian motion on `[0, 1]`.
///
/// This is the null distribution of the standardized Kolmogorov-Smirnov
/// statistic.
///
/// # Examples
/// ```
/// use u_subpop::distributions::KolmogorovSmirnov;
/// assert!((KolmogorovSmirnov.cdf(1.0) - 0.370_777_429_8).abs() < 1e-7);
/// assert!((KolmogorovSmirnov.sf(3.0) - 5.399_592_1e-3).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KolmogorovSmirnov;

impl KolmogorovSmirnov {
    /// P(max |W| ≤ x).
    pub fn cdf(&self, x: f64) -> f64 {
        match classify(x) {
            Domain::Nan => f64::NAN,
            Domain::NonPositive => 0.0,
            Domain::Infinite => 1.0,
            Domain::Small => ks_small(x),
            Domain::Tail => 1.0 - ks_tail(x),
        }
    }

    /// P(max |W| > x).
    pub fn sf(&self, x: f64) -> f64 {
        match classify(x) {
            Domain::Nan => f64::NAN,
            Domain::NonPositive => 1.0,
            Domain::Infinite => 0.0,
            Domain::Small => 1.0 - ks_small(x),
            Domain::Tail => ks_tail(x),
        }
    }

    /// Inverse CDF by bisection.
    ///
    /// Returns `None` if `p` is outside `[0, 1]`.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        invert(p, |x| self.cdf(x), |x| self.sf(x))
    }
}

// F(x) = (4/π) Σ_{k≥0} (−1)^k/(2k+1) · exp(−π²(2k+1)²/(8x²))
fn ks_small(x: f64) -> f64 {
    let x2 = x * x;
    let mut total = 0.0;
    for k in 0..MAX_TERMS {
        let odd = (2 * k + 1) as f64;
        let term = (-PI * PI * odd * odd / (8.0 * x2)).exp() / odd;
        if term == 0.0 {
            break;
        }
        total += if k % 2 == 0 { term } else { -term };
        if term < f64::EPSILON * total.abs() {
            break;
        }
    }
    (4.0 / PI * total).clamp(0.0, 1.0)
}

// 1 − F(x) = 2 Σ_{k≥0} (−1)^k erfc((2k+1)x/√2)
fn ks_tail(x: f64) -> f64 {
    let mut total = 0.0;
    for k in 0..MAX_TERMS {
        let odd = (2 * k + 1) as f64;
        let term = 2.0 * special::erfc(odd * x / SQRT_2);
        if term == 0.0 {
            break;
        }
        total += if k % 2 == 0 { term } else { -term };
        if term < f64::EPSILON * total.abs() {
            break;
        }
    }
    total.clamp(0.0, 1.0)
}

// ============================================================================
// Shared helpers
// ============================================================================

enum Domain {
    Nan,
    NonPositive,
    Infinite,
    Small,
    Tail,
}

fn classify(x: f64) -> Domain {
    if x.is_nan() {
        Domain::Nan
    } else if x <= 0.0 {
        Domain::NonPositive
    } else if x.is_infinite() {
        Domain::Infinite
    } else if x < CROSSOVER {
        Domain::Small
    } else {
        Domain::Tail
    }
}

/// Bisection on whichever of `cdf`/`sf` is small at the target, so upper
/// quantiles resolve through the survival function.
fn invert(p: f64, cdf: impl Fn(f64) -> f64, sf: impl Fn(f64) -> f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&p) {
        return None;
    }
    if p == 0.0 {
        return Some(0.0);
    }
    if p == 1.0 {
        return Some(f64::INFINITY);
    }
    // Both distributions have sf(40) far below f64::EPSILON.
    let (mut lo, mut hi) = (0.0_f64, 40.0_f64);
    let below = |x: f64| {
        if p <= 0.5 {
            cdf(x) < p
        } else {
            sf(x) > 1.0 - p
        }
    };
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if below(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * hi {
            break;
        }
    }
    Some(0.5 * (lo + hi))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn kuiper_cdf_monotone(x1 in 0.0_f64..10.0, x2 in 0.0_f64..10.0) {
            let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
            prop_assert!(Kuiper.cdf(lo) <= Kuiper.cdf(hi) + 1e-7);
        }

        #[test]
        fn ks_cdf_monotone(x1 in 0.0_f64..10.0, x2 in 0.0_f64..10.0) {
            let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
            prop_assert!(KolmogorovSmirnov.cdf(lo) <= KolmogorovSmirnov.cdf(hi) + 1e-7);
        }

        #[test]
        fn cdf_plus_sf_is_one(x in 0.0_f64..10.0) {
            prop_assert!((Kuiper.cdf(x) + Kuiper.sf(x) - 1.0).abs() < 1e-12);
            prop_assert!((KolmogorovSmirnov.cdf(x) + KolmogorovSmirnov.sf(x) - 1.0).abs() < 1e-12);
        }

        #[test]
        fn quantile_inverts_cdf(p in 0.01_f64..0.99) {
            let q = Kuiper.quantile(p).unwrap();
            prop_assert!((Kuiper.cdf(q) - p).abs() < 1e-6);
            let q = KolmogorovSmirnov.quantile(p).unwrap();
            prop_assert!((KolmogorovSmirnov.cdf(q) - p).abs() < 1e-6);
        }
    }
}
