//! Seeded generators and random permutations.
//!
//! Every randomized operation in this crate takes the generator as a
//! `&mut R: Rng` argument; nothing draws from a global source. The helpers
//! here are the only places permutations are produced, so the order in
//! which a comparison consumes randomness is easy to audit.
//!
//! # Reproducibility
//!
//! Use [`create_rng`] with a fixed seed to replay binning, dithering, or
//! matched-ATE tie-breaking exactly. The underlying algorithm (SmallRng) is
//! deterministic for a given seed on the same platform.

use rand::Rng;

/// Creates a fast, seeded random number generator.
///
/// Uses `SmallRng` (Xoshiro256++). The sequence is deterministic for a
/// given seed on the same platform.
///
/// # Examples
/// ```
/// use u_subpop::random::create_rng;
/// use rand::Rng;
/// let mut rng = create_rng(987654321);
/// let x: f64 = rng.random();
/// assert!(x >= 0.0 && x < 1.0);
/// ```
pub fn create_rng(seed: u64) -> rand::rngs::SmallRng {
    use rand::SeedableRng;
    rand::rngs::SmallRng::seed_from_u64(seed)
}

/// Fisher-Yates (Durstenfeld) in-place shuffle.
///
/// Each of the n! permutations is equally likely.
///
/// Reference: Knuth (1997), *TAOCP* Vol. 2, §3.4.2, Algorithm P.
///
/// # Complexity
/// Time: O(n), Space: O(1) (in-place)
///
/// # Examples
/// ```
/// use u_subpop::random::{create_rng, shuffle};
/// let mut v = vec![1, 2, 3, 4, 5];
/// let mut rng = create_rng(42);
/// shuffle(&mut v, &mut rng);
/// v.sort();
/// assert_eq!(v, vec![1, 2, 3, 4, 5]);
/// ```
pub fn shuffle<T, R: Rng>(slice: &mut [T], rng: &mut R) {
    let n = slice.len();
    if n <= 1 {
        return;
    }
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        slice.swap(i, j);
    }
}

/// A uniformly random permutation of `[0, n)`.
///
/// # Examples
/// ```
/// use u_subpop::random::{create_rng, shuffled_indices};
/// let mut rng = create_rng(42);
/// let mut perm = shuffled_indices(5, &mut rng);
/// perm.sort();
/// assert_eq!(perm, vec![0, 1, 2, 3, 4]);
/// ```
pub fn shuffled_indices<R: Rng>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    shuffle(&mut indices, rng);
    indices
}

/// `k` distinct positions from `[0, n)`, drawn uniformly and returned in
/// ascending order.
///
/// Consumes one full permutation of `n` and keeps its first `k` entries,
/// so the draw depends only on `n` and the generator state. `k` is clamped
/// to `n`.
pub fn sorted_sample<R: Rng>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let mut picked = shuffled_indices(n, rng);
    picked.truncate(k.min(n));
    picked.sort_unstable();
    picked
}

/// Rearranges `items` by a fresh uniform permutation, `items[i] ← old[π(i)]`.
pub fn permute<T: Clone, R: Rng>(items: &mut Vec<T>, rng: &mut R) {
    let perm = shuffled_indices(items.len(), rng);
    let old = std::mem::take(items);
    items.extend(perm.into_iter().map(|p| old[p].clone()));
}

// ============================================================================
// Tests
// ============================================================================
