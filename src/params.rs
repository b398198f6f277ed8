//! Table-size and hash-multiplier selection.
//!
//! One build is parameterized by two table shapes and three small prime
//! multipliers. The value table holds `m = m̄^d` slots, just enough for the
//! `n` input points; the offset table holds `r = r̄^d` entries and is the
//! knob the retry loop turns: every failed attempt grows `r̄` by `d`,
//! shrinking bucket populations and widening the offset search space until
//! construction succeeds.

use crate::point::Point;
use rand::Rng;
use rand_core::RngCore;
use tracing::debug;

/// Fixed pool of hash multipliers: a roughly doubling sequence of primes.
const PRIME_POOL: [u32; 18] = [
    53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613, 393241, 786433,
    1572869, 3145739, 6291469,
];

/// Table shapes and hash multipliers for one build.
///
/// Frozen into the finished map once an attempt succeeds; only `r_bar`/`r`
/// change across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Params {
    /// Value-table side length, the integer ceiling of `n^(1/d)`
    pub(crate) m_bar: u32,
    /// Value-table cardinality, `m̄^d`
    pub(crate) m: u32,
    /// Offset-table side length; grows by `d` before every attempt
    pub(crate) r_bar: u32,
    /// Offset-table cardinality, `r̄^d`
    pub(crate) r: u32,
    /// Primary-hash multiplier, mixed into the slot index
    pub(crate) m0: u32,
    /// Secondary-hash multiplier, selects the offset-table bucket
    pub(crate) m1: u32,
    /// Witness-hash multiplier, fixed through every rehash of a build
    pub(crate) m2: u32,
}

impl Params {
    /// Choose initial parameters for `n` points in `d` dimensions.
    ///
    /// `r_bar` is left one growth step *below* its first usable value; the
    /// retry loop grows it before every attempt, including the first.
    pub(crate) fn choose<R: RngCore>(n: u32, d: u32, rng: &mut R) -> Self {
        let m_bar = int_root_ceil(n, d);
        let m = m_bar.pow(d);

        // Integer division first, matching the original sizing rule; the
        // subtraction saturates so that n < d starts from zero.
        let r_bar = int_root_ceil(n / d, d).saturating_sub(1);
        let r = r_bar.pow(d);

        let m0 = draw_prime(rng);
        let mut m1 = draw_prime(rng);
        while m1 == m0 {
            m1 = draw_prime(rng);
        }
        let m2 = draw_prime(rng);

        debug!(n, m_bar, m, m0, m1, m2, "chose hash parameters");
        Self {
            m_bar,
            m,
            r_bar,
            r,
            m0,
            m1,
            m2,
        }
    }

    /// Grow the offset table for the next attempt.
    pub(crate) fn grow(&mut self, d: u32) {
        self.r_bar += d;
        self.r = self.r_bar.pow(d);
    }

    /// Known-pathological ratio of value-table to offset-table side length.
    ///
    /// When `m̄ ≡ 1 (mod r̄)` neighboring buckets see translated copies of
    /// the same slot pattern and the offset search degenerates, so the
    /// attempt is rejected up front. The second comparison is against the
    /// full cardinality `r − 1`, kept as the original computes it. With
    /// `m̄ = 1` the first test would hold for every `r̄ ≥ 2` and no attempt
    /// could ever be accepted, so the predicate only applies to wider
    /// tables.
    pub(crate) fn bad_ratio(&self) -> bool {
        if self.m_bar <= 1 {
            return false;
        }
        let m_mod_r = self.m_bar % self.r_bar;
        m_mod_r == 1 || m_mod_r == self.r.wrapping_sub(1)
    }

    /// Index into the offset table for `p`: flatten the secondary hash.
    #[inline(always)]
    pub(crate) fn bucket_index<const D: usize>(&self, p: &Point<D>) -> usize {
        (self.m1 * *p).to_index(self.r_bar, self.r) as usize
    }

    /// Index into the value table for `p` under the given offset table.
    #[inline(always)]
    pub(crate) fn slot_index<const D: usize>(&self, p: &Point<D>, phi: &[Point<D>]) -> usize {
        let h0 = self.m0 * *p;
        (h0 + phi[self.bucket_index(p)]).to_index(self.m_bar, self.m) as usize
    }
}

/// Draw one multiplier uniformly from the pool.
fn draw_prime<R: RngCore>(rng: &mut R) -> u32 {
    PRIME_POOL[rng.gen_range(0..PRIME_POOL.len())]
}

/// Exact integer `⌈x^(1/d)⌉`.
///
/// The float root is only a guess; `powf` is not correctly rounded and can
/// land one off in either direction, so the guess is corrected until
/// `root^d ≥ x > (root−1)^d` holds exactly.
fn int_root_ceil(x: u32, d: u32) -> u32 {
    if x == 0 {
        return 0;
    }
    let mut root = f64::from(x).powf(1.0 / f64::from(d)).ceil() as u32;
    while (u64::from(root)).pow(d) < u64::from(x) {
        root += 1;
    }
    while root > 1 && (u64::from(root - 1)).pow(d) >= u64::from(x) {
        root -= 1;
    }
    root
}
